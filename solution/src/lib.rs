pub mod json_serialisation;

mod carpool;
mod plan;
mod routes;
mod stop;

pub use carpool::{CarpoolMatch, CarpoolOutcome, DriverRoute, MeetingPoint};
pub use plan::{DailyPlan, ShadowMetrics};
pub use routes::{BusRoute, VrpOutcome};
pub use stop::Stop;
