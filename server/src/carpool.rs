use thiserror::Error;

use crate::stores::{
    CarpoolRouteRecord, CarpoolRouteStore, PassengerStatus, RoutePassenger, RouteStatus, RouteStop,
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CarpoolError {
    #[error("no carpool route found for driver {0}")]
    RouteNotFound(String),

    #[error("passenger {0} is not on this route")]
    PassengerNotFound(String),

    #[error("{0}")]
    InvalidTransition(String),
}

/// Create (or replace) the driver's route for a day. One driver owns at most
/// one active route.
pub fn create_carpool_route(
    store: &CarpoolRouteStore,
    driver_id: &str,
    capacity: u32,
    stops: Vec<RouteStop>,
    date: &str,
    time: &str,
) -> CarpoolRouteRecord {
    let record = CarpoolRouteRecord {
        route_id: format!("carpool_{}", driver_id),
        driver_id: driver_id.to_string(),
        capacity,
        stops,
        status: RouteStatus::Active,
        date: date.to_string(),
        time: time.to_string(),
        passengers: Vec::new(),
    };
    store.insert(record.clone());
    record
}

/// Assign passengers to the driver's route, each entering as `pending`.
/// Passengers beyond the remaining seats are dropped.
pub fn assign_passengers(
    store: &CarpoolRouteStore,
    driver_id: &str,
    passengers: &[String],
) -> Result<CarpoolRouteRecord, CarpoolError> {
    store
        .update(driver_id, |route| {
            let slots_left = (route.capacity as usize).saturating_sub(route.passengers.len());
            for user_id in passengers.iter().take(slots_left) {
                route.passengers.push(RoutePassenger {
                    user_id: user_id.clone(),
                    status: PassengerStatus::Pending,
                });
            }
            route.clone()
        })
        .ok_or_else(|| CarpoolError::RouteNotFound(driver_id.to_string()))
}

/// The passenger accepts or rejects the assigned seat; the route status is
/// recalculated afterwards.
pub fn passenger_respond(
    store: &CarpoolRouteStore,
    driver_id: &str,
    passenger_id: &str,
    accept: bool,
) -> Result<CarpoolRouteRecord, CarpoolError> {
    store
        .update(driver_id, |route| {
            let passenger = route
                .passengers
                .iter_mut()
                .find(|p| p.user_id == passenger_id)
                .ok_or_else(|| CarpoolError::PassengerNotFound(passenger_id.to_string()))?;
            passenger.status = if accept {
                PassengerStatus::Accepted
            } else {
                PassengerStatus::Rejected
            };
            recalculate_route_status(route);
            Ok(route.clone())
        })
        .ok_or_else(|| CarpoolError::RouteNotFound(driver_id.to_string()))?
}

/// The driver confirms a pickup. Requires the route to be in progress and
/// the passenger to have accepted.
pub fn confirm_pickup(
    store: &CarpoolRouteStore,
    driver_id: &str,
    passenger_id: &str,
) -> Result<CarpoolRouteRecord, CarpoolError> {
    store
        .update(driver_id, |route| {
            if route.status != RouteStatus::InProgress {
                return Err(CarpoolError::InvalidTransition(
                    "route must be in_progress to confirm a pickup".to_string(),
                ));
            }
            let passenger = route
                .passengers
                .iter_mut()
                .find(|p| p.user_id == passenger_id)
                .ok_or_else(|| CarpoolError::PassengerNotFound(passenger_id.to_string()))?;
            if passenger.status != PassengerStatus::Accepted {
                return Err(CarpoolError::InvalidTransition(
                    "passenger must have accepted to be picked up".to_string(),
                ));
            }
            passenger.status = PassengerStatus::PickedUp;
            recalculate_route_status(route);
            Ok(route.clone())
        })
        .ok_or_else(|| CarpoolError::RouteNotFound(driver_id.to_string()))?
}

/// Route status follows the passenger lifecycle: any accepted seat puts the
/// route in progress, pickups without open accepts complete it, a fully
/// rejected or empty roster resets it to active.
fn recalculate_route_status(route: &mut CarpoolRouteRecord) {
    let statuses: Vec<PassengerStatus> = route.passengers.iter().map(|p| p.status).collect();
    route.status = if statuses.is_empty() {
        RouteStatus::Active
    } else if statuses.iter().all(|&s| s == PassengerStatus::Rejected) {
        RouteStatus::Active
    } else if statuses.iter().any(|&s| s == PassengerStatus::Accepted) {
        RouteStatus::InProgress
    } else if statuses.iter().any(|&s| s == PassengerStatus::PickedUp) {
        RouteStatus::Completed
    } else {
        RouteStatus::Active
    };
}
