use std::collections::HashSet;

use model::base_types::EmployeeId;
use model::census::{Census, Employee, Workplace};
use model::config::{CarpoolMatchConfig, StructuralConstraints};
use model::errors::PlanError;
use model::geo::{haversine_m, GeoPoint, HaversineAdapter, TravelTimeAdapter};
use solution::json_serialisation::plan_to_json;
use solution::DailyPlan;

use super::{plan, CancelToken};

const OFFICE: (f64, f64) = (40.4168, -3.7038);

fn office() -> Workplace {
    Workplace::new(GeoPoint::new(OFFICE.0, OFFICE.1), 3)
}

fn point_at(north_m: f64, east_m: f64) -> GeoPoint {
    GeoPoint::new(
        OFFICE.0 + north_m / 111_320.0,
        OFFICE.1 + east_m / (111_320.0 * OFFICE.0.to_radians().cos()),
    )
}

fn employee_at(id: &str, north_m: f64, east_m: f64, driver: bool) -> Employee {
    Employee::new(EmployeeId::from(id), point_at(north_m, east_m), driver, None)
}

fn cluster_at(prefix: &str, north_m: f64, east_m: f64, count: usize) -> Vec<Employee> {
    (0..count)
        .map(|i| {
            employee_at(
                &format!("{}_{:02}", prefix, i),
                north_m + (i % 4) as f64 * 40.0,
                east_m + (i / 4) as f64 * 40.0,
                false,
            )
        })
        .collect()
}

fn run(census: &Census, constraints: &StructuralConstraints, match_config: &CarpoolMatchConfig) -> DailyPlan {
    plan(
        census,
        "2024-05-13",
        &office(),
        constraints,
        match_config,
        false,
        &HaversineAdapter::default(),
        &CancelToken::new(),
    )
    .unwrap()
}

/// bus members, match passengers, routed drivers and unassigned must cover
/// the census without overlap
fn assert_disjoint_cover(plan: &DailyPlan, census: &Census) {
    let mut seen: HashSet<EmployeeId> = HashSet::new();
    let mut count = 0usize;
    for route in plan.bus_routes() {
        for id in plan.route_members(route) {
            assert!(seen.insert(id), "{} appears twice", id);
            count += 1;
        }
    }
    for m in plan.matches() {
        assert!(seen.insert(m.passenger_id()), "{} appears twice", m.passenger_id());
        count += 1;
    }
    for route in plan.driver_routes() {
        assert!(seen.insert(route.driver_id()), "{} appears twice", route.driver_id());
        count += 1;
    }
    for &id in plan.unassigned() {
        assert!(seen.insert(id), "{} appears twice", id);
        count += 1;
    }
    assert_eq!(count, census.len());
}

#[test]
fn empty_census_yields_empty_plan() {
    let census = Census::new(vec![]).unwrap();

    let plan = run(&census, &StructuralConstraints::default(), &CarpoolMatchConfig::default());

    assert_eq!(plan.date(), "2024-05-13");
    assert!(plan.bus_routes().is_empty());
    assert!(plan.matches().is_empty());
    assert!(plan.unassigned().is_empty());
}

#[test]
fn single_non_driver_ends_up_unassigned() {
    let census = Census::new(vec![employee_at("emp_solo", 5000.0, 0.0, false)]).unwrap();

    let plan = run(&census, &StructuralConstraints::default(), &CarpoolMatchConfig::default());

    assert!(plan.bus_routes().is_empty());
    assert!(plan.matches().is_empty());
    assert_eq!(plan.unassigned(), &[EmployeeId::from("emp_solo")]);
    assert_disjoint_cover(&plan, &census);
}

#[test]
fn dense_cluster_rides_one_bus() {
    // ten employees within ~200 m, 5 km from the office, nobody drives
    let census = Census::new(cluster_at("emp", 5000.0, 0.0, 10)).unwrap();

    let plan = run(&census, &StructuralConstraints::default(), &CarpoolMatchConfig::default());

    assert_eq!(plan.stops().len(), 1);
    assert_eq!(plan.bus_routes().len(), 1);
    assert_eq!(plan.bus_routes()[0].load(), 10);
    assert!(plan.matches().is_empty());
    assert!(plan.driver_routes().is_empty());
    assert!(plan.unassigned().is_empty());
    assert_disjoint_cover(&plan, &census);
}

#[test]
fn two_neighbours_form_a_carpool() {
    // two employees 100 m apart, 5 km out; too few for a stop
    let census = Census::new(vec![
        employee_at("emp_drv", 5000.0, 0.0, true),
        employee_at("emp_pax", 5000.0, 100.0, false),
    ])
    .unwrap();
    let match_config = CarpoolMatchConfig {
        dbscan_min_samples: 2,
        ..CarpoolMatchConfig::default()
    };

    let plan = run(&census, &StructuralConstraints::default(), &match_config);

    assert!(plan.bus_routes().is_empty());
    assert_eq!(plan.matches().len(), 1);
    let m = &plan.matches()[0];
    assert_eq!(m.driver_id(), EmployeeId::from("emp_drv"));
    assert_eq!(m.passenger_id(), EmployeeId::from("emp_pax"));
    assert!(m.walk_m() <= match_config.max_walk_m);
    assert_eq!(plan.driver_routes().len(), 1);
    assert!(plan.unassigned().is_empty());
    assert_disjoint_cover(&plan, &census);
}

#[test]
fn stops_near_the_office_are_excluded() {
    // fifty employees spread over a 2 km square centred on the office
    let employees = (0..50)
        .map(|i| {
            employee_at(
                &format!("emp_{:02}", i),
                -1000.0 + (i % 10) as f64 * 222.0,
                -1000.0 + (i / 10) as f64 * 500.0,
                false,
            )
        })
        .collect();
    let census = Census::new(employees).unwrap();
    let constraints = StructuralConstraints {
        exclude_radius_m: 1000.0,
        ..StructuralConstraints::default()
    };

    let plan = run(&census, &constraints, &CarpoolMatchConfig::default());

    // every surviving stop has its member centroid at least 1 km out
    for stop in plan.stops() {
        let centroid_dist = {
            let mut lat = 0.0;
            let mut lng = 0.0;
            for id in stop.members() {
                let idx = census.idx_of(*id).unwrap();
                lat += census.get(idx).home().lat;
                lng += census.get(idx).home().lng;
            }
            let n = stop.members().len() as f64;
            haversine_m(GeoPoint::new(lat / n, lng / n), office().location())
        };
        assert!(centroid_dist >= 990.0, "stop centroid {} m from office", centroid_dist);
    }
    assert_disjoint_cover(&plan, &census);
}

#[test]
fn adaptive_floor_keeps_far_clusters() {
    // fifteen employees 4 km out in two knots of 8 and 7; the 7-cluster
    // survives because the floor relaxes to 6 beyond 3 km
    let mut employees = cluster_at("big", 4000.0, 0.0, 8);
    employees.extend(cluster_at("small", 4000.0, 3000.0, 7));
    let census = Census::new(employees).unwrap();
    let constraints = StructuralConstraints {
        min_ok: 8,
        min_ok_far: Some(6),
        min_ok_far_m: Some(3000.0),
        ..StructuralConstraints::default()
    };

    let plan = run(&census, &constraints, &CarpoolMatchConfig::default());

    assert_eq!(plan.stops().len(), 2);
    let loads: Vec<u32> = plan.stops().iter().map(|s| s.load()).collect();
    assert!(loads.contains(&8));
    assert!(loads.contains(&7));
    assert_disjoint_cover(&plan, &census);
}

#[test]
fn mixed_population_partitions_cleanly() {
    let mut employees = cluster_at("bus", 5000.0, 0.0, 20);
    employees.push(employee_at("pool_drv", 3000.0, -4000.0, true));
    employees.push(employee_at("pool_pax", 3000.0, -3900.0, false));
    employees.push(employee_at("loner", -10_000.0, 8000.0, false));
    let census = Census::new(employees).unwrap();
    let match_config = CarpoolMatchConfig {
        dbscan_min_samples: 2,
        ..CarpoolMatchConfig::default()
    };

    let plan = run(&census, &StructuralConstraints::default(), &match_config);

    assert_eq!(plan.bus_routes().len(), 1);
    assert_eq!(plan.matches().len(), 1);
    assert!(plan.unassigned().contains(&EmployeeId::from("loner")));
    assert_disjoint_cover(&plan, &census);
}

#[test]
fn plans_are_bit_for_bit_deterministic() {
    let mut employees = cluster_at("bus", 5000.0, 0.0, 20);
    employees.push(employee_at("pool_drv", 3000.0, -4000.0, true));
    employees.push(employee_at("pool_pax", 3000.0, -3900.0, false));
    let census = Census::new(employees).unwrap();
    let match_config = CarpoolMatchConfig {
        dbscan_min_samples: 2,
        ..CarpoolMatchConfig::default()
    };

    let a = run(&census, &StructuralConstraints::default(), &match_config);
    let b = run(&census, &StructuralConstraints::default(), &match_config);

    assert_eq!(
        serde_json::to_string(&plan_to_json(&a)).unwrap(),
        serde_json::to_string(&plan_to_json(&b)).unwrap()
    );
}

#[test]
fn shadow_metrics_are_reported_on_request() {
    let census = Census::new(cluster_at("emp", 5000.0, 0.0, 10)).unwrap();

    let plan = plan_with_shadow(&census, true);
    let metrics = plan.shadow_metrics().unwrap();
    assert_eq!(metrics.n_clusters, 1);
    assert_eq!(metrics.coverage_pct, 100.0);

    assert!(plan_with_shadow(&census, false).shadow_metrics().is_none());
}

fn plan_with_shadow(census: &Census, include: bool) -> DailyPlan {
    plan(
        census,
        "2024-05-13",
        &office(),
        &StructuralConstraints::default(),
        &CarpoolMatchConfig::default(),
        include,
        &HaversineAdapter::default(),
        &CancelToken::new(),
    )
    .unwrap()
}

#[test]
fn cancellation_stops_the_pipeline() {
    let census = Census::new(cluster_at("emp", 5000.0, 0.0, 10)).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();

    let result = plan(
        &census,
        "2024-05-13",
        &office(),
        &StructuralConstraints::default(),
        &CarpoolMatchConfig::default(),
        false,
        &HaversineAdapter::default(),
        &cancel,
    );

    assert!(matches!(result, Err(PlanError::Cancelled)));
}

struct BrokenAdapter;

impl TravelTimeAdapter for BrokenAdapter {
    fn drive_minutes(&self, _: GeoPoint, _: GeoPoint) -> f64 {
        f64::NAN
    }

    fn walk_meters(&self, _: GeoPoint, _: GeoPoint) -> f64 {
        f64::NAN
    }
}

#[test]
fn broken_adapter_surfaces_as_adapter_error() {
    let census = Census::new(cluster_at("emp", 5000.0, 0.0, 10)).unwrap();

    let result = plan(
        &census,
        "2024-05-13",
        &office(),
        &StructuralConstraints::default(),
        &CarpoolMatchConfig::default(),
        false,
        &BrokenAdapter,
        &CancelToken::new(),
    );

    assert!(matches!(result, Err(PlanError::Adapter(_))));
}

#[test]
fn bus_routes_respect_their_bounds() {
    let mut employees = Vec::new();
    for g in 0..4 {
        employees.extend(cluster_at(
            &format!("g{}", g),
            4000.0 + g as f64 * 900.0,
            g as f64 * 700.0,
            12,
        ));
    }
    let census = Census::new(employees).unwrap();
    let constraints = StructuralConstraints::default();

    let plan = run(&census, &constraints, &CarpoolMatchConfig::default());

    for route in plan.bus_routes() {
        assert!(route.load() <= constraints.bus_capacity);
        assert!(route.len() <= constraints.max_stops);
        assert!(route.duration() <= constraints.max_route_duration);
    }
    for route in plan.driver_routes() {
        assert!(route.detour_min() <= CarpoolMatchConfig::default().max_detour_min);
        assert!(route.detour_ratio() <= CarpoolMatchConfig::default().max_detour_ratio);
    }
    assert_disjoint_cover(&plan, &census);
}
