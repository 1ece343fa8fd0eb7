#[cfg(test)]
#[path = "json_serialisation_tests.rs"]
mod json_serialisation_tests;

use itertools::Itertools;
use serde_json::json;

use crate::DailyPlan;

/// Serialise a plan into the response shape of the service boundary:
/// `{date, shuttle_routes, carpool_routes, unassigned, shuttle_shadow_metrics?}`.
pub fn plan_to_json(plan: &DailyPlan) -> serde_json::Value {
    let shuttle_routes = plan
        .bus_routes()
        .iter()
        .enumerate()
        .map(|(route_idx, route)| {
            let employee_ids = plan
                .route_members(route)
                .iter()
                .map(|id| id.to_string())
                .collect_vec();
            let (centroid_lat, centroid_lng) = route_centroid(plan, route);
            json!({
                "option_id": format!("shuttle_{}", route_idx),
                "stop_ids": route.seq().iter().map(|s| format!("stop_{}", s)).collect_vec(),
                "employee_ids": employee_ids,
                "centroid_lat": centroid_lat,
                "centroid_lng": centroid_lng,
                "estimated_size": route.load(),
            })
        })
        .collect_vec();

    let carpool_routes = plan
        .driver_routes()
        .iter()
        .enumerate()
        .map(|(route_idx, route)| {
            let passenger_ids = plan
                .route_passengers(route)
                .iter()
                .map(|id| id.to_string())
                .collect_vec();
            json!({
                "option_id": format!("carpool_{}", route_idx),
                "driver_id": route.driver_id().to_string(),
                "passenger_ids": passenger_ids,
                "estimated_size": 1 + route.passenger_count(),
            })
        })
        .collect_vec();

    let mut output = json!({
        "date": plan.date(),
        "shuttle_routes": shuttle_routes,
        "carpool_routes": carpool_routes,
        "unassigned": plan.unassigned().iter().map(|id| id.to_string()).collect_vec(),
    });

    if let Some(metrics) = plan.shadow_metrics() {
        output["shuttle_shadow_metrics"] = json!({
            "n_clusters": metrics.n_clusters,
            "coverage_pct": metrics.coverage_pct,
        });
    }

    output
}

/// centroid of a bus route: member-weighted mean over its stop centers
fn route_centroid(plan: &DailyPlan, route: &crate::BusRoute) -> (f64, f64) {
    let mut lat_sum = 0.0;
    let mut lng_sum = 0.0;
    let mut weight = 0.0;
    for &stop_idx in route.seq() {
        let stop = &plan.stops()[stop_idx];
        let load = stop.load() as f64;
        lat_sum += stop.center().lat * load;
        lng_sum += stop.center().lng * load;
        weight += load;
    }
    if weight == 0.0 {
        return (0.0, 0.0);
    }
    (lat_sum / weight, lng_sum / weight)
}
