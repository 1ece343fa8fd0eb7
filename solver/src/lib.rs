pub mod carpool_prep;
pub mod match_engine;
pub mod planner;
pub mod shadow;
pub mod stop_engine;
pub mod vrp_engine;

mod dbscan;
mod kmeans;
mod sequencing;
mod spatial;

pub use planner::{plan, CancelToken, Planner};
