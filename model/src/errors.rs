use thiserror::Error;

/// Error taxonomy of the planning core. Everything else is recovered in
/// place: empty candidate sets, infeasible merges and zero-gain openings all
/// yield an empty or unchanged intermediate structure and the pipeline
/// continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// constraints or match config violate their preconditions
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// malformed census: bad coordinates, duplicate or empty employee ids
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// cancellation observed at a phase boundary; no partial plan is emitted
    #[error("planning cancelled")]
    Cancelled,

    /// the travel-time adapter returned a non-numeric value for a required query
    #[error("adapter error: {0}")]
    Adapter(String),
}
