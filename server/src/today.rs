use serde_json::json;

use crate::stores::{CarpoolRouteStore, ValidationStore};

/// Demo itinerary points served while no personalised plan is stored for the
/// user (the behaviour of the legacy day-status service).
fn office_point() -> serde_json::Value {
    json!({"name": "Office", "lat": 40.4379, "lng": -3.6796})
}

fn pickup_point() -> serde_json::Value {
    json!({"name": "Plaza Castilla stop", "lat": 40.4669, "lng": -3.6883})
}

/// The operational day summary for one user: the day's trips with stored
/// validations applied, the aggregated day status, and the user's carpool
/// route when they drive that day.
pub fn get_today(
    user_id: &str,
    date: &str,
    role: &str,
    validations: &ValidationStore,
    carpool_routes: &CarpoolRouteStore,
) -> serde_json::Value {
    // a user who owns a carpool route for the requested date operates as a
    // driver regardless of the requested role
    let own_route = carpool_routes
        .get(user_id)
        .filter(|route| route.date == date);
    let role = if own_route.is_some() {
        "carpool_driver"
    } else {
        role
    };

    let mut trips = if role == "carpool_driver" {
        vec![json!({
            "type": "outbound",
            "status": "pending",
            "mode": "carpool",
            "time": "08:15",
            "from": pickup_point(),
            "to": office_point(),
            "vehicle": {"type": "car", "capacity": 4, "occupied": 2},
            "route": null,
        })]
    } else {
        vec![
            json!({
                "type": "outbound",
                "status": "pending",
                "mode": "shuttle",
                "time": "08:15",
                "from": pickup_point(),
                "to": office_point(),
                "route": null,
            }),
            json!({
                "type": "return",
                "status": "pending",
                "mode": "shuttle",
                "time": "18:00",
                "from": office_point(),
                "to": pickup_point(),
                "route": null,
            }),
        ]
    };

    for trip in trips.iter_mut() {
        let trip_type = trip["type"].as_str().unwrap_or_default().to_string();
        if let Some(status) = validations.status_of(user_id, &trip_type) {
            trip["status"] = json!(status);
        }
    }

    // the day is confirmed only once every trip is
    let day_status = if trips.iter().all(|t| t["status"] == "confirmed") {
        "confirmed"
    } else {
        "pending"
    };

    let mut result = json!({
        "date": date,
        "user_id": user_id,
        "role": role,
        "status": day_status,
        "trips": trips,
    });
    if let Some(route) = own_route {
        result["carpool_route"] = serde_json::to_value(route).expect("route serialises");
    }
    result
}
