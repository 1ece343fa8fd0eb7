use std::{fs::File, io::Read};

use crate::base_types::EmployeeId;
use crate::errors::PlanError;
use crate::json_serialisation::load_planning_instance_from_json;

fn load_fixture(path: &str) -> serde_json::Value {
    let mut file = File::open(path).unwrap();
    let mut input_data = String::new();
    file.read_to_string(&mut input_data).unwrap();
    serde_json::from_str(&input_data).unwrap()
}

#[test]
fn test_load_from_json() {
    // ACT
    let instance = load_planning_instance_from_json(load_fixture("resources/small_census.json"))
        .unwrap();

    // ASSERT
    let census = &instance.census;
    assert_eq!(census.len(), 3);
    assert_eq!(census.id_of(0), EmployeeId::from("emp_001"));
    assert_eq!(census.id_of(1), EmployeeId::from("emp_002"));
    assert_eq!(census.id_of(2), EmployeeId::from("emp_003"));

    // base record fields
    let emp1 = census.get(0);
    assert!(!emp1.willing_driver());
    assert_eq!(emp1.target_arrival_min(), Some(540.0)); // "09:00"

    // override replaces home_lat only, and the direct minute value wins
    let emp2 = census.get(1);
    assert!(emp2.willing_driver());
    assert_eq!(emp2.home().lat, 40.4600);
    assert_eq!(emp2.home().lng, -3.6910);
    assert_eq!(emp2.target_arrival_min(), Some(555.0));

    // override via arrival window
    let emp3 = census.get(2);
    assert_eq!(emp3.target_arrival_min(), Some(495.0)); // "08:15"

    // partial parameter records fall back to defaults per field
    assert_eq!(instance.constraints.assign_radius_m, 1000.0);
    assert_eq!(instance.constraints.min_ok, 5);
    assert_eq!(instance.constraints.bus_capacity, 50);
    assert_eq!(instance.match_config.max_walk_m, 600.0);
    assert_eq!(instance.match_config.k_mp_pax, 5);

    assert_eq!(instance.workplace.location().lat, 40.4168);
    assert_eq!(instance.workplace.default_seats_driver(), 4);
    assert_eq!(instance.workplace.shuttle_speed_kmh(), 25.0);
    assert_eq!(instance.date.as_deref(), Some("2024-05-13"));
    assert!(instance.include_shadow_metrics);
}

#[test]
fn test_duplicate_employee_id_is_invalid_input() {
    let input = serde_json::json!({
        "employees": [
            {"employee_id": "emp_001", "home_lat": 40.0, "home_lng": -3.0},
            {"employee_id": "emp_001", "home_lat": 41.0, "home_lng": -3.5}
        ]
    });
    let result = load_planning_instance_from_json(input);
    assert!(matches!(result, Err(PlanError::InvalidInput(_))));
}

#[test]
fn test_empty_employee_id_is_invalid_input() {
    let input = serde_json::json!({
        "employees": [
            {"employee_id": "  ", "home_lat": 40.0, "home_lng": -3.0}
        ]
    });
    let result = load_planning_instance_from_json(input);
    assert!(matches!(result, Err(PlanError::InvalidInput(_))));
}

#[test]
fn test_bad_window_is_invalid_input() {
    let input = serde_json::json!({
        "employees": [
            {"employee_id": "emp_001", "home_lat": 40.0, "home_lng": -3.0,
             "arrival_window_start": "25:99"}
        ]
    });
    let result = load_planning_instance_from_json(input);
    assert!(matches!(result, Err(PlanError::InvalidInput(_))));
}

#[test]
fn test_bad_date_is_invalid_input() {
    let input = serde_json::json!({
        "employees": [],
        "date": "13/05/2024"
    });
    let result = load_planning_instance_from_json(input);
    assert!(matches!(result, Err(PlanError::InvalidInput(_))));
}

#[test]
fn test_bad_shuttle_speed_is_invalid_input() {
    let input = serde_json::json!({
        "employees": [],
        "workplace": {"lat": 40.0, "lng": -3.0, "shuttle_speed_kmh": 0.0}
    });
    let result = load_planning_instance_from_json(input);
    assert!(matches!(result, Err(PlanError::InvalidInput(_))));
}

#[test]
fn test_invalid_constraints_are_invalid_config() {
    let input = serde_json::json!({
        "employees": [],
        "constraints": {"min_ok": 60, "max_cluster_size": 50}
    });
    let result = load_planning_instance_from_json(input);
    assert!(matches!(result, Err(PlanError::InvalidConfig(_))));
}

#[test]
fn test_overrides_for_unknown_employees_are_ignored() {
    let input = serde_json::json!({
        "employees": [
            {"employee_id": "emp_001", "home_lat": 40.0, "home_lng": -3.0}
        ],
        "employee_overrides": [
            {"employee_id": "emp_999", "willing_driver": true}
        ]
    });
    let instance = load_planning_instance_from_json(input).unwrap();
    assert_eq!(instance.census.len(), 1);
    assert!(!instance.census.get(0).willing_driver());
}
