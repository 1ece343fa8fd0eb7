#[cfg(test)]
#[path = "planner_tests.rs"]
mod planner_tests;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, info};

use model::base_types::EmployeeId;
use model::census::{Census, Workplace};
use model::config::{CarpoolMatchConfig, StructuralConstraints};
use model::errors::PlanError;
use model::geo::TravelTimeAdapter;
use solution::{CarpoolOutcome, DailyPlan, Stop, VrpOutcome};

use crate::carpool_prep::prepare_carpool_census;
use crate::match_engine::run_carpool_match;
use crate::shadow::shadow_cluster_metrics;
use crate::stop_engine::open_stops;
use crate::vrp_engine::run_shuttle_vrp;

/// Caller-supplied cancellation flag, observed at phase boundaries. A
/// deadline is expressed by the caller flipping the flag; the planner runs
/// no timer of its own.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self) -> Result<(), PlanError> {
        if self.is_cancelled() {
            Err(PlanError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Orchestrates one planning call: stop opening, then shuttle routing and
/// carpool matching on disjoint inputs (fanned out in parallel), then plan
/// assembly. Stateless with respect to its borrowed inputs; independent
/// planning calls share nothing.
pub struct Planner<'a> {
    census: &'a Census,
    workplace: &'a Workplace,
    constraints: &'a StructuralConstraints,
    match_config: &'a CarpoolMatchConfig,
    adapter: &'a dyn TravelTimeAdapter,
}

impl<'a> Planner<'a> {
    pub fn new(
        census: &'a Census,
        workplace: &'a Workplace,
        constraints: &'a StructuralConstraints,
        match_config: &'a CarpoolMatchConfig,
        adapter: &'a dyn TravelTimeAdapter,
    ) -> Planner<'a> {
        Planner {
            census,
            workplace,
            constraints,
            match_config,
            adapter,
        }
    }

    pub fn plan(
        &self,
        date: &str,
        include_shadow_metrics: bool,
        cancel: &CancelToken,
    ) -> Result<DailyPlan, PlanError> {
        self.constraints.validate()?;
        self.match_config.validate()?;
        cancel.check()?;

        let (stops, residual) = open_stops(self.census, self.workplace, self.constraints)?;
        info!(
            stops = stops.len(),
            residual = residual.len(),
            "stop opening finished"
        );
        cancel.check()?;

        let (vrp, carpool) = rayon::join(
            || self.shuttle_phase(&stops, cancel),
            || self.carpool_phase(&residual, cancel),
        );
        let vrp = vrp?;
        let carpool = carpool?;
        cancel.check()?;

        let shadow = include_shadow_metrics.then(|| shadow_cluster_metrics(self.census));

        Ok(self.assemble(date, stops, vrp, carpool, shadow))
    }

    fn shuttle_phase(&self, stops: &[Stop], cancel: &CancelToken) -> Result<VrpOutcome, PlanError> {
        if stops.is_empty() {
            return Ok(VrpOutcome::new(Vec::new(), Vec::new(), Vec::new()));
        }
        let matrix = self.build_duration_matrix(stops)?;
        cancel.check()?;
        let demands = stops.iter().map(|s| s.load()).collect_vec();
        let outcome = run_shuttle_vrp(&demands, &matrix, stops.len(), self.constraints)?;
        info!(
            routes = outcome.routes().len(),
            unserved_stops = outcome.unserved().len(),
            "shuttle routing finished"
        );
        cancel.check()?;
        Ok(outcome)
    }

    fn carpool_phase(
        &self,
        residual: &[EmployeeId],
        cancel: &CancelToken,
    ) -> Result<CarpoolOutcome, PlanError> {
        let persons = prepare_carpool_census(self.census, residual, self.workplace);
        debug!(persons = persons.len(), "carpool census prepared");
        let outcome = run_carpool_match(
            &persons,
            self.workplace,
            self.adapter,
            self.match_config,
            cancel,
        )?;
        info!(
            matches = outcome.matches().len(),
            unmatched = outcome.unmatched().len(),
            "carpool matching finished"
        );
        Ok(outcome)
    }

    /// Driving seconds between all opened stop centers plus the workplace as
    /// the last index. A non-finite adapter value here is fatal: the whole
    /// shuttle phase depends on this matrix.
    fn build_duration_matrix(&self, stops: &[Stop]) -> Result<Vec<Vec<f64>>, PlanError> {
        let nodes = stops
            .iter()
            .map(|s| s.center())
            .chain(std::iter::once(self.workplace.location()))
            .collect_vec();
        let n = nodes.len();
        let mut matrix = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let minutes = self.adapter.drive_minutes(nodes[i], nodes[j]);
                if !minutes.is_finite() {
                    return Err(PlanError::Adapter(format!(
                        "non-finite driving time between {} and {}",
                        nodes[i], nodes[j]
                    )));
                }
                matrix[i][j] = minutes * 60.0;
            }
        }
        Ok(matrix)
    }

    fn assemble(
        &self,
        date: &str,
        stops: Vec<Stop>,
        vrp: VrpOutcome,
        carpool: CarpoolOutcome,
        shadow: Option<solution::ShadowMetrics>,
    ) -> DailyPlan {
        let (meeting_points, matches, driver_routes, _unmatched) = carpool.into_parts();
        let bus_routes = vrp.into_routes();

        let mut assigned: HashSet<EmployeeId> = HashSet::new();
        for route in &bus_routes {
            for &stop_idx in route.seq() {
                assigned.extend(stops[stop_idx].members().iter().copied());
            }
        }
        for m in &matches {
            assigned.insert(m.passenger_id());
        }
        for route in &driver_routes {
            assigned.insert(route.driver_id());
        }

        let unassigned = self
            .census
            .iter()
            .map(|e| e.id())
            .filter(|id| !assigned.contains(id))
            .collect_vec();

        DailyPlan::new(
            date.to_string(),
            stops,
            bus_routes,
            meeting_points,
            matches,
            driver_routes,
            unassigned,
            shadow,
        )
    }
}

/// One-shot planning entry point over a borrowed instance.
#[allow(clippy::too_many_arguments)]
pub fn plan(
    census: &Census,
    date: &str,
    workplace: &Workplace,
    constraints: &StructuralConstraints,
    match_config: &CarpoolMatchConfig,
    include_shadow_metrics: bool,
    adapter: &dyn TravelTimeAdapter,
    cancel: &CancelToken,
) -> Result<DailyPlan, PlanError> {
    Planner::new(census, workplace, constraints, match_config, adapter).plan(
        date,
        include_shadow_metrics,
        cancel,
    )
}
