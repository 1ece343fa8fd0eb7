pub mod carpool;
pub mod stores;
pub mod today;

use gethostname::gethostname;
use std::time as stdtime;

use model::errors::PlanError;
use model::geo::HaversineAdapter;
use model::json_serialisation::load_planning_instance_from_json;
use rapid_time::{DateTime, Duration};
use solution::json_serialisation::plan_to_json;
use solution::DailyPlan;
use solver::CancelToken;

/// Parse a planning request, run the planner and serialise the plan. The
/// whole call is synchronous and CPU-bound; the HTTP layer decides how to
/// schedule it.
pub fn plan_instance(input_data: serde_json::Value) -> Result<serde_json::Value, PlanError> {
    let start_time = stdtime::Instant::now();

    let instance = load_planning_instance_from_json(input_data)?;
    let date = instance.date.clone().unwrap_or_else(today_date_string);
    let adapter = HaversineAdapter::new(instance.workplace.shuttle_speed_kmh());
    let cancel = CancelToken::new();

    let plan = solver::plan(
        &instance.census,
        &date,
        &instance.workplace,
        &instance.constraints,
        &instance.match_config,
        instance.include_shadow_metrics,
        &adapter,
        &cancel,
    )?;

    Ok(create_output_json(&plan, start_time.elapsed()))
}

pub fn create_output_json(plan: &DailyPlan, runtime_duration: stdtime::Duration) -> serde_json::Value {
    let mut output = plan_to_json(plan);
    output["info"] = serde_json::json!({
        "runningTime": format!("{:0.2}sec", runtime_duration.as_secs_f32()),
        "numberOfThreads": rayon::current_num_threads(),
        "timestamp(UTC)": now_utc().as_iso(),
        "hostname": gethostname().into_string().unwrap_or("unknown".to_string()),
    });
    output
}

/// today's date as "YYYY-MM-DD"
pub fn today_date_string() -> String {
    now_utc().as_iso()[..10].to_string()
}

fn now_utc() -> DateTime {
    DateTime::new("1970-01-01T00:00:00")
        + Duration::from_seconds(
            stdtime::SystemTime::now()
                .duration_since(stdtime::UNIX_EPOCH)
                .unwrap()
                .as_secs(),
        )
}

/// HTTP status for a planning error: bad requests are the caller's fault,
/// cancellation maps to the nginx-style 499, a broken adapter is an upstream
/// failure.
pub fn status_for_error(error: &PlanError) -> u16 {
    match error {
        PlanError::InvalidConfig(_) | PlanError::InvalidInput(_) => 400,
        PlanError::Cancelled => 499,
        PlanError::Adapter(_) => 502,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_instance_runs_end_to_end() {
        let input = serde_json::json!({
            "employees": [
                {"employee_id": "emp_1", "home_lat": 40.4618, "home_lng": -3.7038},
                {"employee_id": "emp_2", "home_lat": 40.4620, "home_lng": -3.7040},
            ],
            "date": "2024-05-13"
        });

        let output = plan_instance(input).unwrap();

        assert_eq!(output["date"], "2024-05-13");
        assert!(output.get("shuttle_routes").is_some());
        assert!(output.get("carpool_routes").is_some());
        assert!(output.get("unassigned").is_some());
        assert!(output["info"].get("runningTime").is_some());
    }

    #[test]
    fn malformed_request_maps_to_400() {
        let error = plan_instance(serde_json::json!({"employees": "nope"})).unwrap_err();
        assert_eq!(status_for_error(&error), 400);
    }

    #[test]
    fn error_statuses_cover_the_taxonomy() {
        assert_eq!(
            status_for_error(&PlanError::InvalidConfig("x".to_string())),
            400
        );
        assert_eq!(status_for_error(&PlanError::Cancelled), 499);
        assert_eq!(status_for_error(&PlanError::Adapter("x".to_string())), 502);
    }
}
