use itertools::Itertools;

use model::census::Census;
use model::geo::haversine_km;
use solution::ShadowMetrics;

/// clustering radius of the legacy shuttle candidate generator
const SHUTTLE_CLUSTER_RADIUS_KM: f64 = 1.5;

/// The legacy radius clustering, retained purely as an observability shadow:
/// seed clusters in employee-id order, attach every unassigned employee
/// within the radius, and report how many clusters formed and what share of
/// the census they absorbed. Nothing downstream consumes this.
pub fn shadow_cluster_metrics(census: &Census) -> ShadowMetrics {
    let n = census.len();
    if n == 0 {
        return ShadowMetrics {
            n_clusters: 0,
            coverage_pct: 0.0,
        };
    }

    let order = (0..n).sorted_by_key(|&i| census.id_of(i)).collect_vec();

    let mut assigned = vec![false; n];
    let mut n_clusters = 0;
    let mut covered = 0usize;
    for &seed in &order {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        covered += 1;
        n_clusters += 1;
        for &other in &order {
            if assigned[other] {
                continue;
            }
            let d = haversine_km(census.get(seed).home(), census.get(other).home());
            if d <= SHUTTLE_CLUSTER_RADIUS_KM {
                assigned[other] = true;
                covered += 1;
            }
        }
    }

    ShadowMetrics {
        n_clusters,
        coverage_pct: covered as f64 / n as f64 * 100.0,
    }
}
