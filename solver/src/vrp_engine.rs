#[cfg(test)]
#[path = "vrp_engine_tests.rs"]
mod vrp_engine_tests;

use std::cmp::Ordering;

use itertools::Itertools;
use rayon::prelude::*;
use tracing::debug;

use model::base_types::{PassengerCount, Seconds, StopIdx};
use model::config::StructuralConstraints;
use model::errors::PlanError;
use solution::{BusRoute, VrpOutcome};

/// An open route under construction: stop sequence, cached load and cached
/// duration in seconds (stop-to-stop legs plus the final leg to the office).
#[derive(Debug, Clone)]
struct OpenRoute {
    seq: Vec<StopIdx>,
    load: PassengerCount,
    dur: Seconds,
}

impl OpenRoute {
    fn head(&self) -> StopIdx {
        self.seq[0]
    }

    fn tail(&self) -> StopIdx {
        *self.seq.last().expect("routes are never empty")
    }
}

#[derive(Debug, Clone, Copy)]
struct MergeEval {
    saving: f64,
    new_dur: Seconds,
    new_load: PassengerCount,
}

/// Build open bus routes over the stops of the duration matrix via
/// Clarke–Wright savings merges, absorb under-filled routes, then backfill
/// unserved stops at route tails under a bounded per-passenger delta.
///
/// The matrix is in seconds; its `office_index` row/column is the workplace.
pub fn run_shuttle_vrp(
    stops_demands: &[PassengerCount],
    duration_matrix: &[Vec<f64>],
    office_index: usize,
    constraints: &StructuralConstraints,
) -> Result<VrpOutcome, PlanError> {
    if stops_demands.is_empty() {
        return Ok(VrpOutcome::new(Vec::new(), Vec::new(), Vec::new()));
    }
    let n = duration_matrix.len();
    if duration_matrix.iter().any(|row| row.len() != n) {
        return Err(PlanError::InvalidConfig(
            "duration matrix must be square".to_string(),
        ));
    }
    if office_index >= n {
        return Err(PlanError::InvalidConfig(format!(
            "office index {} out of range for a {}x{} matrix",
            office_index, n, n
        )));
    }
    if stops_demands.len() >= n {
        return Err(PlanError::InvalidConfig(
            "duration matrix too small for the number of stops".to_string(),
        ));
    }

    let ctx = VrpContext {
        demands: stops_demands,
        matrix: duration_matrix,
        office: office_index,
        t_to_office: (0..stops_demands.len())
            .map(|i| duration_matrix[i][office_index])
            .collect(),
        constraints,
    };

    let mut routes: Vec<OpenRoute> = (0..stops_demands.len())
        .map(|i| ctx.single_stop_route(i))
        .collect();

    savings_merges(&ctx, &mut routes);
    debug!(routes = routes.len(), "savings merges done");
    absorb_small_routes(&ctx, &mut routes);
    backfill(&ctx, &mut routes);
    debug!(routes = routes.len(), "absorption and backfill done");

    let served = routes.iter().flat_map(|r| r.seq.iter().copied()).collect_vec();
    let unserved = (0..stops_demands.len())
        .filter(|i| !served.contains(i))
        .collect_vec();
    let bus_routes = routes
        .into_iter()
        .map(|r| BusRoute::new(r.seq, r.load, r.dur))
        .collect_vec();

    Ok(VrpOutcome::new(bus_routes, served, unserved))
}

struct VrpContext<'a> {
    demands: &'a [PassengerCount],
    matrix: &'a [Vec<f64>],
    office: usize,
    t_to_office: Vec<f64>,
    constraints: &'a StructuralConstraints,
}

impl VrpContext<'_> {
    fn single_stop_route(&self, i: StopIdx) -> OpenRoute {
        OpenRoute {
            seq: vec![i],
            load: self.demands[i],
            dur: self.matrix[i][self.office],
        }
    }

    /// Feasibility of appending route `b` after route `a`. Merges may only
    /// flow towards the office: the tail of `a` must be strictly further out
    /// than the head of `b`.
    fn feasible_merge(&self, a: &OpenRoute, b: &OpenRoute) -> Option<MergeEval> {
        let c = self.constraints;
        if self.t_to_office[a.tail()] <= self.t_to_office[b.head()] {
            return None;
        }

        let new_load = a.load + b.load;
        let new_len = a.seq.len() + b.seq.len();
        if new_load > c.bus_capacity || new_len > c.max_stops {
            return None;
        }

        let new_dur = a.dur - self.matrix[a.tail()][self.office]
            + self.matrix[a.tail()][b.head()]
            + b.dur;
        if new_dur > c.max_route_duration {
            return None;
        }

        let base_mean = self.mean_direct_time(a.seq.iter().chain(b.seq.iter()).copied());
        if base_mean > 0.0 && new_dur / base_mean > c.detour_cap {
            return None;
        }

        let saving = self.matrix[a.tail()][self.office] - self.matrix[a.tail()][b.head()];
        Some(MergeEval {
            saving,
            new_dur,
            new_load,
        })
    }

    fn mean_direct_time(&self, stops: impl Iterator<Item = StopIdx>) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for i in stops {
            sum += self.t_to_office[i];
            count += 1;
        }
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }
}

/// Globally best merge first: maximise `(saving, combined_load)`, break ties
/// towards the lower route index pair. Candidate evaluation runs in parallel;
/// the reduction key is total, so the result does not depend on the split.
fn savings_merges(ctx: &VrpContext, routes: &mut Vec<OpenRoute>) {
    while routes.len() > 1 {
        let best = {
            let snapshot: &[OpenRoute] = routes;
            (0..snapshot.len())
                .into_par_iter()
                .flat_map_iter(|a| {
                    (0..snapshot.len())
                        .filter(move |&b| b != a)
                        .filter_map(move |b| {
                            ctx.feasible_merge(&snapshot[a], &snapshot[b])
                                .map(|eval| (eval, a, b))
                        })
                })
                .max_by(compare_merge_candidates)
        };

        match best {
            Some((eval, a, b)) => {
                let absorbed = routes[b].seq.clone();
                routes[a].seq.extend(absorbed);
                routes[a].load = eval.new_load;
                routes[a].dur = eval.new_dur;
                routes.remove(b);
            }
            None => break,
        }
    }
}

fn compare_merge_candidates(
    x: &(MergeEval, usize, usize),
    y: &(MergeEval, usize, usize),
) -> Ordering {
    x.0.saving
        .total_cmp(&y.0.saving)
        .then_with(|| x.0.new_load.cmp(&y.0.new_load))
        .then_with(|| y.1.cmp(&x.1))
        .then_with(|| y.2.cmp(&x.2))
}

/// Routes below the shuttle occupancy floor are appended, in descending
/// index order, to the first feasible host (largest load first). Routes that
/// cannot be absorbed stay as they are.
fn absorb_small_routes(ctx: &VrpContext, routes: &mut Vec<OpenRoute>) {
    let min_load = ctx.constraints.min_emp_shuttle;
    let small = (0..routes.len())
        .filter(|&r| routes[r].load < min_load)
        .collect_vec();

    for &r_idx in small.iter().rev() {
        let hosts = (0..routes.len())
            .filter(|&k| k != r_idx)
            .sorted_by_key(|&k| std::cmp::Reverse(routes[k].load))
            .collect_vec();
        for k in hosts {
            if let Some(eval) = ctx.feasible_merge(&routes[k], &routes[r_idx]) {
                let absorbed = routes[r_idx].seq.clone();
                routes[k].seq.extend(absorbed);
                routes[k].load = eval.new_load;
                routes[k].dur = eval.new_dur;
                routes.remove(r_idx);
                break;
            }
        }
    }
}

/// Insert still-unserved stops at route tails, cheapest per-passenger delta
/// first, while every VRP constraint keeps holding and the delta stays
/// within `backfill_max_delta_min`. Iterates until a full pass places
/// nothing; running it again on its own output changes nothing.
fn backfill(ctx: &VrpContext, routes: &mut [OpenRoute]) {
    let c = ctx.constraints;
    let served: Vec<StopIdx> = routes.iter().flat_map(|r| r.seq.iter().copied()).collect();
    let mut pending = (0..ctx.demands.len())
        .filter(|i| !served.contains(i))
        .collect_vec();
    pending.sort_by(|&a, &b| {
        ctx.demands[b]
            .cmp(&ctx.demands[a])
            .then_with(|| ctx.t_to_office[b].total_cmp(&ctx.t_to_office[a]))
    });

    let mut changed = true;
    while changed && !pending.is_empty() {
        changed = false;
        for &i in &pending.clone() {
            let mut best: Option<((f64, i64, i64), usize, f64)> = None;
            for (r_id, route) in routes.iter().enumerate() {
                if route.load + ctx.demands[i] > c.bus_capacity {
                    continue;
                }
                if route.seq.len() + 1 > c.max_stops {
                    continue;
                }
                // strict direction towards the office
                if ctx.t_to_office[i] >= ctx.t_to_office[route.tail()] {
                    continue;
                }
                let t_new = route.dur - ctx.matrix[route.tail()][ctx.office]
                    + ctx.matrix[route.tail()][i]
                    + ctx.matrix[i][ctx.office];
                if t_new > c.max_route_duration {
                    continue;
                }
                let base_mean =
                    ctx.mean_direct_time(route.seq.iter().copied().chain(std::iter::once(i)));
                if base_mean <= 0.0 {
                    continue;
                }
                if t_new / base_mean > c.detour_cap {
                    continue;
                }

                let delta_per_pax =
                    ((t_new - route.dur) / 60.0) / 1.0_f64.max(ctx.demands[i] as f64);
                if delta_per_pax > c.backfill_max_delta_min {
                    continue;
                }

                let key = (
                    delta_per_pax,
                    -(ctx.demands[i] as i64),
                    -((route.load + ctx.demands[i]) as i64),
                );
                let better = match &best {
                    None => true,
                    Some((best_key, _, _)) => {
                        key.0
                            .total_cmp(&best_key.0)
                            .then_with(|| key.1.cmp(&best_key.1))
                            .then_with(|| key.2.cmp(&best_key.2))
                            == Ordering::Less
                    }
                };
                if better {
                    best = Some((key, r_id, t_new));
                }
            }

            if let Some((_, r_id, t_new)) = best {
                routes[r_id].seq.push(i);
                routes[r_id].load += ctx.demands[i];
                routes[r_id].dur = t_new;
                pending.retain(|&p| p != i);
                changed = true;
            }
        }
    }
}
