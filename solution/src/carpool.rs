use model::base_types::{EmployeeId, MeetingPointId, Meters, Minutes, PassengerCount};
use model::geo::GeoPoint;

/// A pickup location discovered from density clusters of home coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct MeetingPoint {
    id: MeetingPointId,
    location: GeoPoint,
}

impl MeetingPoint {
    pub fn new(id: MeetingPointId, location: GeoPoint) -> MeetingPoint {
        MeetingPoint { id, location }
    }

    pub fn id(&self) -> MeetingPointId {
        self.id
    }

    pub fn location(&self) -> GeoPoint {
        self.location
    }
}

/// A selected (driver, passenger, meeting point) triple with its metrics.
#[derive(Debug, Clone)]
pub struct CarpoolMatch {
    driver_id: EmployeeId,
    passenger_id: EmployeeId,
    meeting_point_id: MeetingPointId,
    walk_m: Meters,
    detour_min: Minutes,
    detour_ratio: f64,
    eta_min: Minutes,
    cost: f64,
}

impl CarpoolMatch {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        driver_id: EmployeeId,
        passenger_id: EmployeeId,
        meeting_point_id: MeetingPointId,
        walk_m: Meters,
        detour_min: Minutes,
        detour_ratio: f64,
        eta_min: Minutes,
        cost: f64,
    ) -> CarpoolMatch {
        CarpoolMatch {
            driver_id,
            passenger_id,
            meeting_point_id,
            walk_m,
            detour_min,
            detour_ratio,
            eta_min,
            cost,
        }
    }

    pub fn driver_id(&self) -> EmployeeId {
        self.driver_id
    }

    pub fn passenger_id(&self) -> EmployeeId {
        self.passenger_id
    }

    pub fn meeting_point_id(&self) -> MeetingPointId {
        self.meeting_point_id
    }

    pub fn walk_m(&self) -> Meters {
        self.walk_m
    }

    pub fn detour_min(&self) -> Minutes {
        self.detour_min
    }

    pub fn detour_ratio(&self) -> f64 {
        self.detour_ratio
    }

    /// arrival at the workplace via the matched meeting point, in minutes
    pub fn eta_min(&self) -> Minutes {
        self.eta_min
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }
}

/// The pickup tour of one driver: meeting points in visit order, tightened
/// by the detour-trim phase.
#[derive(Debug, Clone)]
pub struct DriverRoute {
    driver_id: EmployeeId,
    meeting_point_ids: Vec<MeetingPointId>,
    total_duration_min: Minutes,
    detour_min: Minutes,
    detour_ratio: f64,
    passenger_count: PassengerCount,
}

impl DriverRoute {
    pub fn new(
        driver_id: EmployeeId,
        meeting_point_ids: Vec<MeetingPointId>,
        total_duration_min: Minutes,
        detour_min: Minutes,
        detour_ratio: f64,
        passenger_count: PassengerCount,
    ) -> DriverRoute {
        DriverRoute {
            driver_id,
            meeting_point_ids,
            total_duration_min,
            detour_min,
            detour_ratio,
            passenger_count,
        }
    }

    pub fn driver_id(&self) -> EmployeeId {
        self.driver_id
    }

    pub fn meeting_point_ids(&self) -> &[MeetingPointId] {
        &self.meeting_point_ids
    }

    pub fn total_duration_min(&self) -> Minutes {
        self.total_duration_min
    }

    pub fn detour_min(&self) -> Minutes {
        self.detour_min
    }

    pub fn detour_ratio(&self) -> f64 {
        self.detour_ratio
    }

    pub fn passenger_count(&self) -> PassengerCount {
        self.passenger_count
    }
}

/// Output of the carpool match engine.
#[derive(Debug, Clone, Default)]
pub struct CarpoolOutcome {
    meeting_points: Vec<MeetingPoint>,
    matches: Vec<CarpoolMatch>,
    driver_routes: Vec<DriverRoute>,
    unmatched: Vec<EmployeeId>,
}

impl CarpoolOutcome {
    pub fn new(
        meeting_points: Vec<MeetingPoint>,
        matches: Vec<CarpoolMatch>,
        driver_routes: Vec<DriverRoute>,
        unmatched: Vec<EmployeeId>,
    ) -> CarpoolOutcome {
        CarpoolOutcome {
            meeting_points,
            matches,
            driver_routes,
            unmatched,
        }
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

    pub fn unmatched(&self) -> &[EmployeeId] {
        &self.unmatched
    }

    #[allow(clippy::type_complexity)]
    pub fn into_parts(
        self,
    ) -> (
        Vec<MeetingPoint>,
        Vec<CarpoolMatch>,
        Vec<DriverRoute>,
        Vec<EmployeeId>,
    ) {
        (
            self.meeting_points,
            self.matches,
            self.driver_routes,
            self.unmatched,
        )
    }
}
