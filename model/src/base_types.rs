pub use crate::utilities::CopyStr;

pub type EmployeeId = CopyStr<32>;
pub type MeetingPointId = CopyStr<16>;

/// position of an employee within the census vector
pub type EmployeeIdx = usize;
/// position of an opened stop within the stop vector
pub type StopIdx = usize;

pub type Meters = f64;
pub type Minutes = f64;
pub type Seconds = f64;

pub type PassengerCount = u32;
pub type SeatCount = u32;
