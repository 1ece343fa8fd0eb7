use model::base_types::{EmployeeId, PassengerCount};
use model::geo::GeoPoint;

/// An opened shuttle stop: the boarding point and the employees assigned to
/// it. For stops that survived opening unchanged the center is the medoid
/// member's home; stops reshaped by splitting or fusion carry the member
/// centroid instead. Stops are immutable once the stop engine has emitted
/// them.
#[derive(Debug, Clone)]
pub struct Stop {
    center: GeoPoint,
    members: Vec<EmployeeId>,
}

impl Stop {
    pub fn new(center: GeoPoint, members: Vec<EmployeeId>) -> Stop {
        Stop { center, members }
    }

    pub fn center(&self) -> GeoPoint {
        self.center
    }

    pub fn members(&self) -> &[EmployeeId] {
        &self.members
    }

    pub fn load(&self) -> PassengerCount {
        self.members.len() as PassengerCount
    }
}
