use model::base_types::EmployeeId;

use crate::carpool::{CarpoolMatch, DriverRoute, MeetingPoint};
use crate::routes::BusRoute;
use crate::stop::Stop;

/// Observational metrics of the legacy radius clustering, reported next to
/// the real plan for comparison. Never feeds back into planning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowMetrics {
    pub n_clusters: usize,
    pub coverage_pct: f64,
}

/// The result of one planning call. Immutable after emission; handed to the
/// caller by value.
///
/// The employee partition invariant holds by construction: every employee is
/// a member of exactly one of {some bus route, some carpool match, the
/// unassigned list}.
#[derive(Debug)]
pub struct DailyPlan {
    date: String,
    stops: Vec<Stop>,
    bus_routes: Vec<BusRoute>,
    meeting_points: Vec<MeetingPoint>,
    matches: Vec<CarpoolMatch>,
    driver_routes: Vec<DriverRoute>,
    unassigned: Vec<EmployeeId>,
    shadow_metrics: Option<ShadowMetrics>,
}

impl DailyPlan {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        date: String,
        stops: Vec<Stop>,
        bus_routes: Vec<BusRoute>,
        meeting_points: Vec<MeetingPoint>,
        matches: Vec<CarpoolMatch>,
        driver_routes: Vec<DriverRoute>,
        unassigned: Vec<EmployeeId>,
        shadow_metrics: Option<ShadowMetrics>,
    ) -> DailyPlan {
        DailyPlan {
            date,
            stops,
            bus_routes,
            meeting_points,
            matches,
            driver_routes,
            unassigned,
            shadow_metrics,
        }
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn bus_routes(&self) -> &[BusRoute] {
        &self.bus_routes
    }

    pub fn meeting_points(&self) -> &[MeetingPoint] {
        &self.meeting_points
    }

    pub fn matches(&self) -> &[CarpoolMatch] {
        &self.matches
    }

    pub fn driver_routes(&self) -> &[DriverRoute] {
        &self.driver_routes
    }

    pub fn unassigned(&self) -> &[EmployeeId] {
        &self.unassigned
    }

    pub fn shadow_metrics(&self) -> Option<ShadowMetrics> {
        self.shadow_metrics
    }

    /// member employees of one bus route, in stop-sequence order
    pub fn route_members(&self, route: &BusRoute) -> Vec<EmployeeId> {
        route
            .seq()
            .iter()
            .flat_map(|&stop_idx| self.stops[stop_idx].members().iter().copied())
            .collect()
    }

    /// passengers of one driver, in match order
    pub fn route_passengers(&self, route: &DriverRoute) -> Vec<EmployeeId> {
        self.matches
            .iter()
            .filter(|m| m.driver_id() == route.driver_id())
            .map(|m| m.passenger_id())
            .collect()
    }
}
