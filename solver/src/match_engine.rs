#[cfg(test)]
#[path = "match_engine_tests.rs"]
mod match_engine_tests;

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use rayon::prelude::*;
use tracing::debug;

use model::base_types::{EmployeeId, MeetingPointId};
use model::census::Workplace;
use model::config::CarpoolMatchConfig;
use model::errors::PlanError;
use model::geo::{haversine_m, GeoPoint, TravelTimeAdapter};
use solution::{CarpoolMatch, CarpoolOutcome, DriverRoute, MeetingPoint};

use crate::carpool_prep::CarpoolPerson;
use crate::dbscan::{cluster_count, dbscan};
use crate::planner::CancelToken;
use crate::sequencing::{cheapest_insertion_order, route_time, two_opt};

const TWO_OPT_SEED: u64 = 42;
const TWO_OPT_ITERS: usize = 200;
/// floor for the direct driving time, so detour ratios stay defined
const MIN_DIRECT_MIN: f64 = 1e-6;

/// A feasible (driver, passenger, meeting point) triple. Indices are local:
/// drivers and passengers index their respective sub-census, `mp` indexes
/// the meeting-point vector.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    driver: usize,
    passenger: usize,
    mp: usize,
    walk_m: f64,
    detour_min: f64,
    detour_ratio: f64,
    eta_min: f64,
    cost: f64,
}

/// Match the carpool census at shared meeting points: discover MPs by
/// density clustering, enumerate feasible triples under walk/detour bounds,
/// select greedily with an occupancy bonus, sequence each driver's pickups
/// and trim routes back under the detour caps.
pub fn run_carpool_match(
    census: &[CarpoolPerson],
    workplace: &Workplace,
    adapter: &dyn TravelTimeAdapter,
    config: &CarpoolMatchConfig,
    cancel: &CancelToken,
) -> Result<CarpoolOutcome, PlanError> {
    let drivers = census.iter().positions(|p| p.is_driver()).collect_vec();
    let passengers = census.iter().positions(|p| !p.is_driver()).collect_vec();

    if passengers.is_empty() {
        return Ok(CarpoolOutcome::default());
    }
    let all_unmatched = |mps: Vec<MeetingPoint>| {
        CarpoolOutcome::new(
            mps,
            Vec::new(),
            Vec::new(),
            passengers.iter().map(|&p| census[p].id()).collect(),
        )
    };
    if drivers.is_empty() {
        return Ok(all_unmatched(Vec::new()));
    }

    // phase 1: meeting point discovery
    let mps = discover_meeting_points(census, config);
    debug!(meeting_points = mps.len(), "meeting point discovery done");
    if mps.is_empty() {
        return Ok(all_unmatched(mps));
    }
    cancel.check()?;

    // phase 2: adapter matrices
    let office = workplace.location();
    let matrices = Matrices::build(census, &drivers, &passengers, &mps, office, adapter, config);
    cancel.check()?;

    // phase 3: per-MP driver shortlists by great-circle distance
    let shortlists = driver_shortlists(census, &drivers, &mps, config);

    // phase 4: candidate triples, enumerated in parallel per passenger
    let per_passenger: Vec<Vec<Candidate>> = (0..passengers.len())
        .into_par_iter()
        .map(|p| {
            enumerate_candidates(
                p,
                census[passengers[p]].target_arrival_min(),
                &matrices,
                &shortlists,
                config,
            )
        })
        .collect();
    cancel.check()?;

    let candidates = per_passenger.concat();
    debug!(candidates = candidates.len(), "candidate enumeration done");
    if candidates.is_empty() {
        return Ok(all_unmatched(mps));
    }

    // phase 5: greedy selection with occupancy bonus
    let selected = greedy_select(candidates, census, &drivers, config);
    cancel.check()?;

    // phases 6-8: per-driver sequencing, detour trim, final filter
    let (driver_routes, kept_pairs) =
        sequence_and_trim(&selected, census, &drivers, &mps, &matrices, config);

    let final_matches = selected
        .iter()
        .filter(|c| kept_pairs.contains(&(c.driver, c.mp)))
        .map(|c| {
            CarpoolMatch::new(
                census[drivers[c.driver]].id(),
                census[passengers[c.passenger]].id(),
                mps[c.mp].id(),
                c.walk_m,
                c.detour_min,
                c.detour_ratio,
                c.eta_min,
                c.cost,
            )
        })
        .collect_vec();

    let matched: HashSet<EmployeeId> = final_matches.iter().map(|m| m.passenger_id()).collect();
    let unmatched = passengers
        .iter()
        .map(|&p| census[p].id())
        .filter(|id| !matched.contains(id))
        .collect_vec();

    debug!(
        matches = final_matches.len(),
        unmatched = unmatched.len(),
        "carpool matching done"
    );
    Ok(CarpoolOutcome::new(
        mps,
        final_matches,
        driver_routes,
        unmatched,
    ))
}

/// DBSCAN over all census homes with a great-circle metric; each cluster
/// contributes its centroid. A second, looser pass with `min_samples = 1`
/// deduplicates centroids that landed close together. Ids are assigned in
/// cluster order: `MP_1`, `MP_2`, ...
fn discover_meeting_points(
    census: &[CarpoolPerson],
    config: &CarpoolMatchConfig,
) -> Vec<MeetingPoint> {
    let coords = census.iter().map(|p| p.home()).collect_vec();
    let labels = dbscan(&coords, config.dbscan_eps_m, config.dbscan_min_samples);

    let raw = (0..cluster_count(&labels))
        .map(|k| {
            geo_mean(
                labels
                    .iter()
                    .positions(|&l| l == k as i32)
                    .map(|i| coords[i]),
            )
        })
        .collect_vec();

    if raw.is_empty() {
        return Vec::new();
    }
    if raw.len() == 1 {
        return vec![MeetingPoint::new(MeetingPointId::from("MP_1"), raw[0])];
    }

    let dedup_labels = dbscan(&raw, config.mp_cluster_eps_m, 1);
    (0..cluster_count(&dedup_labels))
        .map(|k| {
            let centroid = geo_mean(
                dedup_labels
                    .iter()
                    .positions(|&l| l == k as i32)
                    .map(|i| raw[i]),
            );
            MeetingPoint::new(MeetingPointId::from(&format!("MP_{}", k + 1)), centroid)
        })
        .collect_vec()
}

fn geo_mean(points: impl Iterator<Item = GeoPoint>) -> GeoPoint {
    let mut lat = 0.0;
    let mut lng = 0.0;
    let mut count = 0usize;
    for p in points {
        lat += p.lat;
        lng += p.lng;
        count += 1;
    }
    GeoPoint::new(lat / count as f64, lng / count as f64)
}

/// All adapter-derived travel matrices, indexed by local driver/passenger/MP
/// position.
struct Matrices {
    t_drv_mp: Vec<Vec<f64>>,
    t_mp_off: Vec<f64>,
    t_drv_off: Vec<f64>,
    t_mp_mp: Vec<Vec<f64>>,
    walk_pax_mp: Vec<Vec<f64>>,
}

impl Matrices {
    fn build(
        census: &[CarpoolPerson],
        drivers: &[usize],
        passengers: &[usize],
        mps: &[MeetingPoint],
        office: GeoPoint,
        adapter: &dyn TravelTimeAdapter,
        config: &CarpoolMatchConfig,
    ) -> Matrices {
        let t_mp_off = mps
            .iter()
            .map(|mp| adapter.drive_minutes(mp.location(), office))
            .collect_vec();
        let t_drv_off = drivers
            .iter()
            .map(|&d| adapter.drive_minutes(census[d].home(), office))
            .collect_vec();
        let t_drv_mp = drivers
            .iter()
            .map(|&d| {
                mps.iter()
                    .map(|mp| adapter.drive_minutes(census[d].home(), mp.location()))
                    .collect_vec()
            })
            .collect_vec();
        let t_mp_mp = mps
            .iter()
            .enumerate()
            .map(|(i, a)| {
                mps.iter()
                    .enumerate()
                    .map(|(j, b)| {
                        if i == j {
                            0.0
                        } else {
                            adapter.drive_minutes(a.location(), b.location())
                        }
                    })
                    .collect_vec()
            })
            .collect_vec();
        // walking distances above the cap (or non-finite) are unreachable
        let walk_pax_mp = passengers
            .iter()
            .map(|&p| {
                mps.iter()
                    .map(|mp| {
                        let w = adapter.walk_meters(census[p].home(), mp.location());
                        if w.is_finite() && w <= config.max_walk_m {
                            w
                        } else {
                            f64::INFINITY
                        }
                    })
                    .collect_vec()
            })
            .collect_vec();

        Matrices {
            t_drv_mp,
            t_mp_off,
            t_drv_off,
            t_mp_mp,
            walk_pax_mp,
        }
    }
}

/// the `max_drivers_per_mp` drivers nearest to each MP, great-circle
fn driver_shortlists(
    census: &[CarpoolPerson],
    drivers: &[usize],
    mps: &[MeetingPoint],
    config: &CarpoolMatchConfig,
) -> Vec<Vec<usize>> {
    let k = config.max_drivers_per_mp.min(drivers.len());
    mps.iter()
        .map(|mp| {
            let mut order = (0..drivers.len()).collect_vec();
            order.sort_by(|&a, &b| {
                haversine_m(census[drivers[a]].home(), mp.location())
                    .total_cmp(&haversine_m(census[drivers[b]].home(), mp.location()))
            });
            order.truncate(k);
            order
        })
        .collect_vec()
}

fn enumerate_candidates(
    p: usize,
    target_arrival_min: Option<f64>,
    matrices: &Matrices,
    shortlists: &[Vec<usize>],
    config: &CarpoolMatchConfig,
) -> Vec<Candidate> {
    let walk_row = &matrices.walk_pax_mp[p];
    let mut reachable = (0..walk_row.len())
        .filter(|&m| walk_row[m].is_finite())
        .collect_vec();
    reachable.sort_by(|&a, &b| walk_row[a].total_cmp(&walk_row[b]));
    reachable.truncate(config.k_mp_pax);

    let mut candidates = Vec::new();
    for &m in &reachable {
        let walk_m = walk_row[m];
        for &d in &shortlists[m] {
            if !matrices.t_drv_off[d].is_finite() {
                continue;
            }
            let t_route = matrices.t_drv_mp[d][m] + matrices.t_mp_off[m];
            if !t_route.is_finite() {
                continue;
            }
            let t_direct = matrices.t_drv_off[d].max(MIN_DIRECT_MIN);
            let detour_min = (t_route - t_direct).max(0.0);
            let detour_ratio = t_route / t_direct;
            if detour_min > config.max_detour_min || detour_ratio > config.max_detour_ratio {
                continue;
            }
            let eta_pen = target_arrival_min.map_or(0.0, |t| (t_route - t).abs());
            let cost =
                config.alpha_walk * walk_m + config.beta_detour * detour_min + config.gamma_eta * eta_pen;
            candidates.push(Candidate {
                driver: d,
                passenger: p,
                mp: m,
                walk_m,
                detour_min,
                detour_ratio,
                eta_min: t_route,
                cost,
            });
        }
    }
    candidates
}

/// Passengers are served in ascending order of their best candidate cost;
/// each picks the unexhausted driver minimising
/// `cost − δ · already_matched_on_driver`.
fn greedy_select(
    mut candidates: Vec<Candidate>,
    census: &[CarpoolPerson],
    drivers: &[usize],
    config: &CarpoolMatchConfig,
) -> Vec<Candidate> {
    candidates.sort_by(|a, b| a.cost.total_cmp(&b.cost));

    let mut passenger_order = Vec::new();
    let mut by_passenger: HashMap<usize, Vec<Candidate>> = HashMap::new();
    for c in &candidates {
        let entry = by_passenger.entry(c.passenger).or_default();
        if entry.is_empty() {
            passenger_order.push(c.passenger);
        }
        entry.push(*c);
    }

    let mut cap_left = drivers
        .iter()
        .map(|&d| census[d].effective_capacity())
        .collect_vec();
    let mut matched_on_driver = vec![0u32; drivers.len()];
    let mut selected = Vec::new();

    for &p in &passenger_order {
        let mut best: Option<Candidate> = None;
        let mut best_score = f64::INFINITY;
        for c in &by_passenger[&p] {
            if cap_left[c.driver] == 0 {
                continue;
            }
            let score = c.cost - config.delta_occupancy_bonus * matched_on_driver[c.driver] as f64;
            if score < best_score {
                best_score = score;
                best = Some(*c);
            }
        }
        if let Some(c) = best {
            cap_left[c.driver] -= 1;
            matched_on_driver[c.driver] += 1;
            selected.push(c);
        }
    }
    selected
}

/// Cheapest insertion plus optional bounded 2-opt per driver, then drop
/// trailing meeting points while either detour bound is violated. Returns
/// the surviving routes and the surviving `(driver, mp)` pairs.
fn sequence_and_trim(
    selected: &[Candidate],
    census: &[CarpoolPerson],
    drivers: &[usize],
    mps: &[MeetingPoint],
    matrices: &Matrices,
    config: &CarpoolMatchConfig,
) -> (Vec<DriverRoute>, HashSet<(usize, usize)>) {
    let driver_order = selected.iter().map(|c| c.driver).unique().collect_vec();

    let mut routes = Vec::new();
    let mut kept_pairs: HashSet<(usize, usize)> = HashSet::new();

    for d in driver_order {
        let mp_local = selected
            .iter()
            .filter(|c| c.driver == d)
            .map(|c| c.mp)
            .unique()
            .collect_vec();

        let t_src = mp_local
            .iter()
            .map(|&m| matrices.t_drv_mp[d][m])
            .collect_vec();
        let t_off = mp_local.iter().map(|&m| matrices.t_mp_off[m]).collect_vec();
        let t_mm = mp_local
            .iter()
            .map(|&a| mp_local.iter().map(|&b| matrices.t_mp_mp[a][b]).collect_vec())
            .collect_vec();

        let mut order = cheapest_insertion_order(&t_src, &t_off, &t_mm);
        if config.do_2opt {
            order = two_opt(order, &t_src, &t_off, &t_mm, TWO_OPT_ITERS, TWO_OPT_SEED);
        }

        let t_direct = matrices.t_drv_off[d].max(MIN_DIRECT_MIN);
        let mut t_route = route_time(&order, &t_src, &t_off, &t_mm);
        let mut detour_min = (t_route - t_direct).max(0.0);
        let mut detour_ratio = t_route / t_direct;
        while !order.is_empty()
            && !(detour_min <= config.max_detour_min && detour_ratio <= config.max_detour_ratio)
        {
            order.pop();
            t_route = route_time(&order, &t_src, &t_off, &t_mm);
            detour_min = (t_route - t_direct).max(0.0);
            detour_ratio = t_route / t_direct;
        }
        if order.is_empty() {
            continue;
        }

        for &local in &order {
            kept_pairs.insert((d, mp_local[local]));
        }
        let passenger_count = selected
            .iter()
            .filter(|c| c.driver == d && kept_pairs.contains(&(d, c.mp)))
            .count() as u32;

        routes.push(DriverRoute::new(
            census[drivers[d]].id(),
            order.iter().map(|&local| mps[mp_local[local]].id()).collect(),
            t_route,
            detour_min,
            detour_ratio,
            passenger_count,
        ));
    }

    (routes, kept_pairs)
}
