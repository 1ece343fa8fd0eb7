use std::time as stdtime;

use model::census::{Census, Workplace};
use model::config::{CarpoolMatchConfig, StructuralConstraints};
use model::errors::PlanError;
use model::geo::HaversineAdapter;
use solver::CancelToken;

/// Run one planning call with the default configuration, print the
/// structural KPI block and return the output document.
pub fn run(census: &Census, workplace: &Workplace, date: &str) -> Result<serde_json::Value, PlanError> {
    let start_time = stdtime::Instant::now();

    let constraints = StructuralConstraints::default();
    let match_config = CarpoolMatchConfig::default();
    let adapter = HaversineAdapter::new(workplace.shuttle_speed_kmh());

    println!(
        "Census with {} employees loaded, planning for {}",
        census.len(),
        date
    );
    println!(
        "VRP parameters: bus_capacity={}, detour_cap={}, backfill_max_delta_min={}",
        constraints.bus_capacity, constraints.detour_cap, constraints.backfill_max_delta_min
    );

    let plan = solver::plan(
        census,
        date,
        workplace,
        &constraints,
        &match_config,
        true,
        &adapter,
        &CancelToken::new(),
    )?;

    let runtime_duration = start_time.elapsed();

    let num_routes = plan.bus_routes().len();
    let served_stops: usize = plan.bus_routes().iter().map(|r| r.len()).sum();
    let unserved_stops = plan.stops().len() - served_stops;
    let served_employees: u32 = plan.bus_routes().iter().map(|r| r.load()).sum();
    let effective_occupancy = if num_routes > 0 {
        100.0 * served_employees as f64 / (constraints.bus_capacity as f64 * num_routes as f64)
    } else {
        0.0
    };

    println!("\n*** Planned ***");
    println!("\n--- Structural KPIs ---");
    println!("  Shuttle routes:       {}", num_routes);
    println!("  Stops served:         {}", served_stops);
    println!("  Stops left out:       {}", unserved_stops);
    println!("  Employees on buses:   {}", served_employees);
    println!("  Effective occupancy:  {:.1}%", effective_occupancy);
    println!("  Carpool matches:      {}", plan.matches().len());
    println!("  Driver routes:        {}", plan.driver_routes().len());
    println!("  Unassigned:           {}", plan.unassigned().len());
    if let Some(metrics) = plan.shadow_metrics() {
        println!(
            "  Shadow clustering:    {} clusters, {:.1}% coverage",
            metrics.n_clusters, metrics.coverage_pct
        );
    }
    println!("\nRunning time: {:0.2}sec", runtime_duration.as_secs_f32());

    Ok(server::create_output_json(&plan, runtime_duration))
}
