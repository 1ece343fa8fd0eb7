use std::error::Error;
use std::fs::{self, File};
use std::path::Path;
use std::process;

use serde::Deserialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use model::base_types::EmployeeId;
use model::census::{Census, Employee, Workplace};
use model::geo::GeoPoint;

#[derive(Deserialize)]
struct CsvEmployee {
    employee_id: String,
    home_lat: f64,
    home_lng: f64,
    #[serde(default)]
    willing_driver: bool,
    #[serde(default)]
    arrival_min: Option<f64>,
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(path) = args.get(1) else {
        eprintln!("usage: internal <census.csv> [office_lat office_lng]");
        process::exit(1);
    };
    if !Path::new(path).exists() {
        eprintln!("ERROR: census file {} does not exist", path);
        process::exit(1);
    }

    let workplace = match (args.get(2), args.get(3)) {
        (Some(lat), Some(lng)) => {
            let lat: f64 = lat.parse().unwrap_or_else(|_| bail("office_lat must be a number"));
            let lng: f64 = lng.parse().unwrap_or_else(|_| bail("office_lng must be a number"));
            Workplace::new(GeoPoint::new(lat, lng), 3)
        }
        _ => Workplace::default(),
    };

    let employees = match load_employees(path) {
        Ok(employees) => employees,
        Err(error) => {
            eprintln!("ERROR: cannot read census from {}: {}", path, error);
            process::exit(2);
        }
    };
    let census = match Census::new(employees) {
        Ok(census) => census,
        Err(error) => {
            eprintln!("ERROR: {}", error);
            process::exit(2);
        }
    };

    let date = server::today_date_string();
    println!("\n---------- RUN: {} ----------", path);

    let output = match internal::run(&census, &workplace, &date) {
        Ok(output) => output,
        Err(error) => {
            eprintln!("ERROR: {}", error);
            process::exit(2);
        }
    };

    let output_path = format!("output/plan_{}.json", date);
    if let Some(parent_dir) = Path::new(&output_path).parent() {
        fs::create_dir_all(parent_dir).expect("Error creating directories");
    }
    let file = File::create(&output_path).expect("Error creating file");
    serde_json::to_writer_pretty(file, &output).expect("Error writing JSON");
    println!("Plan written to {}", output_path);
}

fn load_employees(path: &str) -> Result<Vec<Employee>, Box<dyn Error>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut employees = Vec::new();
    for result in reader.deserialize() {
        let record: CsvEmployee = result?;
        let id = EmployeeId::try_from_str(record.employee_id.trim())?;
        employees.push(Employee::new(
            id,
            GeoPoint::new(record.home_lat, record.home_lng),
            record.willing_driver,
            record.arrival_min,
        ));
    }
    Ok(employees)
}

fn bail(message: &str) -> ! {
    eprintln!("ERROR: {}", message);
    process::exit(2);
}
