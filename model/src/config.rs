use serde::{Deserialize, Serialize};

use crate::base_types::{Meters, Minutes, PassengerCount, Seconds};
use crate::errors::PlanError;

/// Structural constraints for shuttle network design: stop opening (the
/// facility-location pass) and shuttle routing (the open VRP pass).
///
/// All fields can be overridden per request; missing fields fall back to the
/// coverage preset below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuralConstraints {
    // stop opening
    pub assign_radius_m: Meters,
    pub max_cluster_size: usize,
    pub min_shuttle: usize,
    pub min_stop_sep_m: Meters,
    pub fallback_min: usize,
    pub pair_radius_m: Meters,
    pub min_ok: usize,
    pub min_ok_far: Option<usize>,
    pub min_ok_far_m: Option<Meters>,
    pub max_ok: usize,
    pub fusion_radius: Meters,
    pub diameter_max_m: Meters,
    pub exclude_radius_m: Meters,

    // shuttle routing
    pub bus_capacity: PassengerCount,
    pub min_shuttle_occupancy: f64,
    pub detour_cap: f64,
    pub backfill_max_delta_min: Minutes,
    pub min_emp_shuttle: PassengerCount,
    pub max_stops: usize,
    pub max_route_duration: Seconds,
}

impl Default for StructuralConstraints {
    fn default() -> StructuralConstraints {
        StructuralConstraints {
            assign_radius_m: 1200.0,
            max_cluster_size: 50,
            min_shuttle: 6,
            min_stop_sep_m: 350.0,
            fallback_min: 8,
            pair_radius_m: 450.0,
            min_ok: 8,
            min_ok_far: Some(6),
            min_ok_far_m: Some(3000.0),
            max_ok: 40,
            fusion_radius: 150.0,
            diameter_max_m: 1500.0,
            exclude_radius_m: 1000.0,
            bus_capacity: 50,
            min_shuttle_occupancy: 0.7,
            detour_cap: 2.2,
            backfill_max_delta_min: 1.35,
            min_emp_shuttle: 15,
            max_stops: 8,
            max_route_duration: 5400.0,
        }
    }
}

impl StructuralConstraints {
    pub fn validate(&self) -> Result<(), PlanError> {
        for (name, value) in [
            ("assign_radius_m", self.assign_radius_m),
            ("min_stop_sep_m", self.min_stop_sep_m),
            ("pair_radius_m", self.pair_radius_m),
            ("fusion_radius", self.fusion_radius),
            ("diameter_max_m", self.diameter_max_m),
            ("exclude_radius_m", self.exclude_radius_m),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PlanError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.min_ok > self.max_cluster_size {
            return Err(PlanError::InvalidConfig(format!(
                "min_ok ({}) must not exceed max_cluster_size ({})",
                self.min_ok, self.max_cluster_size
            )));
        }
        if self.max_ok == 0 {
            return Err(PlanError::InvalidConfig("max_ok must be positive".to_string()));
        }
        if self.bus_capacity == 0 {
            return Err(PlanError::InvalidConfig(
                "bus_capacity must be positive".to_string(),
            ));
        }
        if self.max_stops == 0 {
            return Err(PlanError::InvalidConfig(
                "max_stops must be positive".to_string(),
            ));
        }
        if !self.max_route_duration.is_finite() || self.max_route_duration <= 0.0 {
            return Err(PlanError::InvalidConfig(
                "max_route_duration must be positive".to_string(),
            ));
        }
        if !self.detour_cap.is_finite() || self.detour_cap <= 0.0 {
            return Err(PlanError::InvalidConfig(
                "detour_cap must be positive".to_string(),
            ));
        }
        if !self.backfill_max_delta_min.is_finite() || self.backfill_max_delta_min < 0.0 {
            return Err(PlanError::InvalidConfig(
                "backfill_max_delta_min must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tuning knobs of the carpool match engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarpoolMatchConfig {
    pub dbscan_eps_m: Meters,
    pub dbscan_min_samples: usize,
    pub mp_cluster_eps_m: Meters,
    pub max_walk_m: Meters,
    pub k_mp_pax: usize,
    pub max_detour_min: Minutes,
    pub max_detour_ratio: f64,
    /// cost weight per walking meter
    pub alpha_walk: f64,
    /// cost weight per detour minute
    pub beta_detour: f64,
    /// cost weight per minute of arrival-time mismatch
    pub gamma_eta: f64,
    /// cost bonus per passenger already matched on the same driver
    pub delta_occupancy_bonus: f64,
    pub max_drivers_per_mp: usize,
    pub do_2opt: bool,
}

impl Default for CarpoolMatchConfig {
    fn default() -> CarpoolMatchConfig {
        CarpoolMatchConfig {
            dbscan_eps_m: 500.0,
            dbscan_min_samples: 3,
            mp_cluster_eps_m: 300.0,
            max_walk_m: 800.0,
            k_mp_pax: 5,
            max_detour_min: 25.0,
            max_detour_ratio: 1.6,
            alpha_walk: 1.0,
            beta_detour: 60.0,
            gamma_eta: 2.0,
            delta_occupancy_bonus: 50.0,
            max_drivers_per_mp: 40,
            do_2opt: true,
        }
    }
}

impl CarpoolMatchConfig {
    pub fn validate(&self) -> Result<(), PlanError> {
        for (name, value) in [
            ("dbscan_eps_m", self.dbscan_eps_m),
            ("mp_cluster_eps_m", self.mp_cluster_eps_m),
            ("max_walk_m", self.max_walk_m),
            ("max_detour_min", self.max_detour_min),
            ("alpha_walk", self.alpha_walk),
            ("beta_detour", self.beta_detour),
            ("gamma_eta", self.gamma_eta),
            ("delta_occupancy_bonus", self.delta_occupancy_bonus),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PlanError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.dbscan_eps_m <= 0.0 || self.mp_cluster_eps_m <= 0.0 {
            return Err(PlanError::InvalidConfig(
                "dbscan radii must be positive".to_string(),
            ));
        }
        if self.dbscan_min_samples == 0 {
            return Err(PlanError::InvalidConfig(
                "dbscan_min_samples must be at least 1".to_string(),
            ));
        }
        if self.k_mp_pax == 0 {
            return Err(PlanError::InvalidConfig(
                "k_mp_pax must be at least 1".to_string(),
            ));
        }
        if self.max_drivers_per_mp == 0 {
            return Err(PlanError::InvalidConfig(
                "max_drivers_per_mp must be at least 1".to_string(),
            ));
        }
        if !self.max_detour_ratio.is_finite() || self.max_detour_ratio <= 0.0 {
            return Err(PlanError::InvalidConfig(
                "max_detour_ratio must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
