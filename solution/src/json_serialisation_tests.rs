use model::base_types::{EmployeeId, MeetingPointId};
use model::geo::GeoPoint;

use crate::json_serialisation::plan_to_json;
use crate::{BusRoute, CarpoolMatch, DailyPlan, DriverRoute, MeetingPoint, ShadowMetrics, Stop};

fn sample_plan() -> DailyPlan {
    let stops = vec![
        Stop::new(
            GeoPoint::new(40.45, -3.69),
            vec![EmployeeId::from("emp_1"), EmployeeId::from("emp_2")],
        ),
        Stop::new(GeoPoint::new(40.47, -3.68), vec![EmployeeId::from("emp_3")]),
    ];
    let bus_routes = vec![BusRoute::new(vec![1, 0], 3, 900.0)];

    let mp = MeetingPoint::new(MeetingPointId::from("MP_1"), GeoPoint::new(40.40, -3.72));
    let matches = vec![CarpoolMatch::new(
        EmployeeId::from("emp_5"),
        EmployeeId::from("emp_4"),
        mp.id(),
        300.0,
        4.0,
        1.2,
        22.0,
        540.0,
    )];
    let driver_routes = vec![DriverRoute::new(
        EmployeeId::from("emp_5"),
        vec![mp.id()],
        22.0,
        4.0,
        1.2,
        1,
    )];

    DailyPlan::new(
        "2024-05-13".to_string(),
        stops,
        bus_routes,
        vec![mp],
        matches,
        driver_routes,
        vec![EmployeeId::from("emp_6")],
        Some(ShadowMetrics {
            n_clusters: 2,
            coverage_pct: 83.3,
        }),
    )
}

#[test]
fn test_plan_to_json_shape() {
    // ACT
    let output = plan_to_json(&sample_plan());

    // ASSERT
    assert_eq!(output["date"], "2024-05-13");

    let shuttle = &output["shuttle_routes"][0];
    assert_eq!(shuttle["option_id"], "shuttle_0");
    assert_eq!(
        shuttle["stop_ids"],
        serde_json::json!(["stop_1", "stop_0"])
    );
    // members follow the stop sequence order of the route
    assert_eq!(
        shuttle["employee_ids"],
        serde_json::json!(["emp_3", "emp_1", "emp_2"])
    );
    assert_eq!(shuttle["estimated_size"], 3);

    let carpool = &output["carpool_routes"][0];
    assert_eq!(carpool["option_id"], "carpool_0");
    assert_eq!(carpool["driver_id"], "emp_5");
    assert_eq!(carpool["passenger_ids"], serde_json::json!(["emp_4"]));
    assert_eq!(carpool["estimated_size"], 2);

    assert_eq!(output["unassigned"], serde_json::json!(["emp_6"]));
    assert_eq!(output["shuttle_shadow_metrics"]["n_clusters"], 2);
}

#[test]
fn test_route_centroid_is_member_weighted() {
    let plan = sample_plan();
    let output = plan_to_json(&plan);
    let lat = output["shuttle_routes"][0]["centroid_lat"].as_f64().unwrap();
    // two members at 40.45, one at 40.47
    assert!((lat - (40.45 * 2.0 + 40.47) / 3.0).abs() < 1e-9);
}

#[test]
fn test_shadow_metrics_are_omitted_when_absent() {
    let plan = DailyPlan::new(
        "2024-05-13".to_string(),
        vec![],
        vec![],
        vec![],
        vec![],
        vec![],
        vec![],
        None,
    );
    let output = plan_to_json(&plan);
    assert!(output.get("shuttle_shadow_metrics").is_none());
    assert_eq!(output["shuttle_routes"], serde_json::json!([]));
}
