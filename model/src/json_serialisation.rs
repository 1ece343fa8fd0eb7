#[cfg(test)]
#[path = "json_serialisation_tests.rs"]
mod json_serialisation_tests;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::base_types::{EmployeeId, Minutes};
use crate::census::{Census, Employee, Workplace};
use crate::config::{CarpoolMatchConfig, StructuralConstraints};
use crate::errors::PlanError;
use crate::geo::GeoPoint;

#[derive(Serialize, Deserialize, Debug)]
struct JsonInput {
    employees: Vec<EmployeeRecord>,
    #[serde(default)]
    employee_overrides: Option<Vec<OverrideRecord>>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    workplace: Option<WorkplaceRecord>,
    #[serde(default)]
    constraints: Option<StructuralConstraints>,
    #[serde(default)]
    match_config: Option<CarpoolMatchConfig>,
    #[serde(default)]
    include_shadow_metrics: bool,
}

/// The wire shape also carries `work_lat`/`work_lng` and
/// `arrival_window_end` per employee; the planner works against a single
/// workplace and the window start, so those fields pass through unread.
#[derive(Serialize, Deserialize, Debug)]
struct EmployeeRecord {
    employee_id: String,
    home_lat: f64,
    home_lng: f64,
    #[serde(default)]
    arrival_window_start: String,
    #[serde(default)]
    willing_driver: bool,
}

/// Per-employee override (e.g. sent from the employee app). Only the fields
/// present on a record are applied; they take priority over the base census.
#[derive(Serialize, Deserialize, Debug)]
struct OverrideRecord {
    employee_id: String,
    #[serde(default)]
    home_lat: Option<f64>,
    #[serde(default)]
    home_lng: Option<f64>,
    #[serde(default)]
    willing_driver: Option<bool>,
    #[serde(default)]
    arrival_window_start: Option<String>,
    /// minutes from midnight; takes priority over arrival_window_start
    #[serde(default)]
    target_arrival_min: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug)]
struct WorkplaceRecord {
    lat: f64,
    lng: f64,
    #[serde(default)]
    default_seats_driver: Option<u32>,
    #[serde(default)]
    shuttle_speed_kmh: Option<f64>,
}

/// Everything one planning call needs, loaded and validated.
pub struct PlanningInstance {
    pub census: Census,
    pub workplace: Workplace,
    pub constraints: StructuralConstraints,
    pub match_config: CarpoolMatchConfig,
    pub date: Option<String>,
    pub include_shadow_metrics: bool,
}

pub fn load_planning_instance_from_json(
    input_data: serde_json::Value,
) -> Result<PlanningInstance, PlanError> {
    let json_input: JsonInput = serde_json::from_value(input_data)
        .map_err(|e| PlanError::InvalidInput(format!("malformed request: {}", e)))?;

    let constraints = json_input.constraints.unwrap_or_default();
    constraints.validate()?;
    let match_config = json_input.match_config.unwrap_or_default();
    match_config.validate()?;

    let workplace = match json_input.workplace {
        Some(record) => {
            let location = GeoPoint::new(record.lat, record.lng);
            if !location.is_finite() {
                return Err(PlanError::InvalidInput(format!(
                    "workplace has non-finite coordinates {:?}",
                    location
                )));
            }
            let mut workplace = Workplace::new(location, record.default_seats_driver.unwrap_or(3));
            if let Some(speed) = record.shuttle_speed_kmh {
                if !speed.is_finite() || speed <= 0.0 {
                    return Err(PlanError::InvalidInput(format!(
                        "shuttle_speed_kmh must be a positive number, got {}",
                        speed
                    )));
                }
                workplace = workplace.with_shuttle_speed(speed);
            }
            workplace
        }
        None => Workplace::default(),
    };

    if let Some(date) = &json_input.date {
        validate_date(date)?;
    }

    let overrides_by_id = collect_overrides(json_input.employee_overrides)?;

    let mut employees = Vec::with_capacity(json_input.employees.len());
    for record in &json_input.employees {
        let id = EmployeeId::try_from_str(record.employee_id.trim())
            .map_err(PlanError::InvalidInput)?;

        let mut home = GeoPoint::new(record.home_lat, record.home_lng);
        let mut willing_driver = record.willing_driver;
        let mut target_arrival_min = parse_arrival_window_start(&record.arrival_window_start)?;

        if let Some(ovr) = overrides_by_id.get(&id) {
            if let Some(lat) = ovr.home_lat {
                home.lat = lat;
            }
            if let Some(lng) = ovr.home_lng {
                home.lng = lng;
            }
            if let Some(driver) = ovr.willing_driver {
                willing_driver = driver;
            }
            if let Some(window_start) = &ovr.arrival_window_start {
                target_arrival_min = parse_arrival_window_start(window_start)?;
            }
            if let Some(minutes) = ovr.target_arrival_min {
                target_arrival_min = Some(minutes);
            }
        }

        employees.push(Employee::new(id, home, willing_driver, target_arrival_min));
    }

    let census = Census::new(employees)?;

    Ok(PlanningInstance {
        census,
        workplace,
        constraints,
        match_config,
        date: json_input.date,
        include_shadow_metrics: json_input.include_shadow_metrics,
    })
}

fn collect_overrides(
    records: Option<Vec<OverrideRecord>>,
) -> Result<HashMap<EmployeeId, OverrideRecord>, PlanError> {
    let mut by_id = HashMap::new();
    for record in records.into_iter().flatten() {
        let id = EmployeeId::try_from_str(record.employee_id.trim())
            .map_err(PlanError::InvalidInput)?;
        // overrides for unknown employees are ignored at census build time
        by_id.insert(id, record);
    }
    Ok(by_id)
}

/// "HH:MM" -> minutes from midnight. An empty string means no preference.
fn parse_arrival_window_start(window_start: &str) -> Result<Option<Minutes>, PlanError> {
    if window_start.is_empty() {
        return Ok(None);
    }
    let invalid = || {
        PlanError::InvalidInput(format!(
            "arrival window must be \"HH:MM\", got {:?}",
            window_start
        ))
    };
    let (hours, minutes) = window_start.split_once(':').ok_or_else(invalid)?;
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(Some((hours * 60 + minutes) as Minutes))
}

/// Plan dates travel as "YYYY-MM-DD" strings; the datetime parser does the
/// calendar validation (month ranges, leap years). It asserts on bad input,
/// so the probe runs under catch_unwind to surface `InvalidInput` instead.
fn validate_date(date: &str) -> Result<(), PlanError> {
    let iso = format!("{}T00:00:00", date);
    std::panic::catch_unwind(move || rapid_time::DateTime::new(&iso))
        .map(|_| ())
        .map_err(|_| {
            PlanError::InvalidInput(format!("date must be \"YYYY-MM-DD\", got {:?}", date))
        })
}
