use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Trip validations keyed by (user, trip type). The legacy service kept this
/// in a process-global dict; here it is an explicit repository handed to the
/// read/write handlers.
#[derive(Default)]
pub struct ValidationStore {
    inner: Mutex<HashMap<(String, String), String>>,
}

impl ValidationStore {
    pub fn new() -> ValidationStore {
        ValidationStore::default()
    }

    pub fn record(&self, user_id: &str, trip_type: &str, status: &str) {
        self.inner
            .lock()
            .expect("validation store poisoned")
            .insert(
                (user_id.to_string(), trip_type.to_string()),
                status.to_string(),
            );
    }

    pub fn status_of(&self, user_id: &str, trip_type: &str) -> Option<String> {
        self.inner
            .lock()
            .expect("validation store poisoned")
            .get(&(user_id.to_string(), trip_type.to_string()))
            .cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Active,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassengerStatus {
    Pending,
    Accepted,
    Rejected,
    PickedUp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStop {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePassenger {
    pub user_id: String,
    pub status: PassengerStatus,
}

/// One driver's carpool route for a day, including its passenger lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarpoolRouteRecord {
    pub route_id: String,
    pub driver_id: String,
    pub capacity: u32,
    pub stops: Vec<RouteStop>,
    pub status: RouteStatus,
    pub date: String,
    pub time: String,
    pub passengers: Vec<RoutePassenger>,
}

/// Carpool routes keyed by driver id. Writers serialise per driver: the
/// outer map lock is held only to fetch the per-driver cell, every mutation
/// runs under that driver's own lock.
#[derive(Default)]
pub struct CarpoolRouteStore {
    inner: Mutex<HashMap<String, Arc<Mutex<CarpoolRouteRecord>>>>,
}

impl CarpoolRouteStore {
    pub fn new() -> CarpoolRouteStore {
        CarpoolRouteStore::default()
    }

    pub fn insert(&self, record: CarpoolRouteRecord) {
        self.inner
            .lock()
            .expect("carpool store poisoned")
            .insert(record.driver_id.clone(), Arc::new(Mutex::new(record)));
    }

    fn cell(&self, driver_id: &str) -> Option<Arc<Mutex<CarpoolRouteRecord>>> {
        self.inner
            .lock()
            .expect("carpool store poisoned")
            .get(driver_id)
            .cloned()
    }

    pub fn get(&self, driver_id: &str) -> Option<CarpoolRouteRecord> {
        self.cell(driver_id)
            .map(|cell| cell.lock().expect("route cell poisoned").clone())
    }

    /// Run a mutation under the driver's lock. Returns `None` when the
    /// driver owns no route.
    pub fn update<T>(
        &self,
        driver_id: &str,
        mutate: impl FnOnce(&mut CarpoolRouteRecord) -> T,
    ) -> Option<T> {
        let cell = self.cell(driver_id)?;
        let mut record = cell.lock().expect("route cell poisoned");
        Some(mutate(&mut record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(driver: &str) -> CarpoolRouteRecord {
        CarpoolRouteRecord {
            route_id: format!("carpool_{}", driver),
            driver_id: driver.to_string(),
            capacity: 3,
            stops: vec![],
            status: RouteStatus::Active,
            date: "2024-05-13".to_string(),
            time: "08:15".to_string(),
            passengers: vec![],
        }
    }

    #[test]
    fn validations_overlay_by_user_and_trip() {
        let store = ValidationStore::new();
        store.record("user_1", "outbound", "confirmed");

        assert_eq!(
            store.status_of("user_1", "outbound").as_deref(),
            Some("confirmed")
        );
        assert_eq!(store.status_of("user_1", "return"), None);
        assert_eq!(store.status_of("user_2", "outbound"), None);
    }

    #[test]
    fn updates_run_under_the_driver_cell() {
        let store = CarpoolRouteStore::new();
        store.insert(record("drv_1"));

        let capacity = store.update("drv_1", |route| {
            route.capacity = 4;
            route.capacity
        });

        assert_eq!(capacity, Some(4));
        assert_eq!(store.get("drv_1").unwrap().capacity, 4);
        assert!(store.update("drv_unknown", |_| ()).is_none());
    }
}
