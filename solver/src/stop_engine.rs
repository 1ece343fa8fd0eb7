#[cfg(test)]
#[path = "stop_engine_tests.rs"]
mod stop_engine_tests;

use std::collections::HashSet;

use itertools::Itertools;
use tracing::debug;

use model::base_types::EmployeeId;
use model::census::{Census, Workplace};
use model::config::StructuralConstraints;
use model::errors::PlanError;
use model::geo::{GeoPoint, PlanarPoint, Projector};
use solution::Stop;

use crate::kmeans::kmeans_labels;
use crate::spatial::SpatialGrid;

const KMEANS_SEED: u64 = 42;
const KMEANS_RESTARTS: usize = 10;
/// above this member count the cluster diameter falls back to the
/// bounding-box diagonal
const DIAMETER_EXACT_LIMIT: usize = 400;

/// Choose shuttle stop centers among the census and assign each employee to
/// a stop or to the carpool residual.
///
/// Returns the surviving stops in creation order and the residual employee
/// ids in census order. Deterministic: equal inputs yield equal outputs.
pub fn open_stops(
    census: &Census,
    workplace: &Workplace,
    constraints: &StructuralConstraints,
) -> Result<(Vec<Stop>, Vec<EmployeeId>), PlanError> {
    constraints.validate()?;
    if census.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let projector = Projector::new(workplace.location());
    let points: Vec<PlanarPoint> = census
        .iter()
        .map(|e| projector.project(e.home()))
        .collect();
    let grid = SpatialGrid::build(points.clone(), constraints.assign_radius_m);

    let opener = StopOpener {
        census,
        constraints,
        points,
        grid,
    };
    Ok(opener.run())
}

/// One cluster while it moves through the opening pipeline. The center
/// starts at the greedy seed, is replaced by the medoid, and degrades to the
/// member centroid once splitting or fusion reshapes the member set
/// (`medoid: None`).
struct Cluster {
    members: Vec<usize>,
    medoid: Option<usize>,
}

struct StopOpener<'a> {
    census: &'a Census,
    constraints: &'a StructuralConstraints,
    points: Vec<PlanarPoint>,
    grid: SpatialGrid,
}

impl StopOpener<'_> {
    fn run(&self) -> (Vec<Stop>, Vec<EmployeeId>) {
        let n = self.points.len();
        let c = self.constraints;

        // greedy opening; if the first pass opens nothing, retry with the
        // fallback threshold on a fresh mask
        let mut clusters = self.greedy_open(c.min_shuttle);
        if clusters.is_empty() {
            clusters = self.greedy_open(c.fallback_min);
        }
        debug!(opened = clusters.len(), "greedy stop opening done");

        for cluster in clusters.iter_mut() {
            if !cluster.members.is_empty() {
                cluster.medoid = Some(self.best_medoid(&cluster.members));
            }
        }

        self.attach_residual_by_pair_radius(&mut clusters);

        let clusters = self.filter_and_split(clusters);
        let clusters = self.fuse(clusters);

        // office-proximity exclusion and final assembly
        let mut kept_members: HashSet<usize> = HashSet::new();
        let mut stops = Vec::new();
        for cluster in &clusters {
            if self.centroid(&cluster.members).norm() < c.exclude_radius_m {
                continue;
            }
            kept_members.extend(cluster.members.iter().copied());
            stops.push(self.to_stop(cluster));
        }

        let residual = (0..n)
            .filter(|i| !kept_members.contains(i))
            .map(|i| self.census.id_of(i))
            .collect_vec();

        debug!(
            stops = stops.len(),
            residual = residual.len(),
            "stop opening finished"
        );
        (stops, residual)
    }

    /// Greedy opening with minimum separation between centers: repeatedly
    /// commit the unassigned employee whose radius neighbourhood covers the
    /// most unassigned employees, while the best gain stays at or above
    /// `threshold`. Equal gain goes to the smaller employee index.
    fn greedy_open(&self, threshold: usize) -> Vec<Cluster> {
        let n = self.points.len();
        let min_sep = self.constraints.min_stop_sep_m;
        let mut unassigned = vec![true; n];
        let mut centers: Vec<PlanarPoint> = Vec::new();
        let mut clusters: Vec<Cluster> = Vec::new();

        loop {
            let mut best_gain = 0;
            let mut best: Option<(usize, Vec<usize>)> = None;
            for i in (0..n).filter(|&i| unassigned[i]) {
                if self.too_close(self.points[i], &centers, min_sep) {
                    continue;
                }
                let take = self.coverage_for_center(i, &unassigned);
                let gain = take.len();
                if gain > best_gain || (gain == best_gain && best.is_none()) {
                    best_gain = gain;
                    best = Some((i, take));
                }
            }
            match best {
                Some((center, take)) if best_gain >= threshold => {
                    centers.push(self.points[center]);
                    for &j in &take {
                        unassigned[j] = false;
                    }
                    clusters.push(Cluster {
                        members: take,
                        medoid: Some(center),
                    });
                }
                _ => break,
            }
        }
        clusters
    }

    /// Unassigned neighbours within the assignment radius, closest first,
    /// truncated to the cluster-size cap.
    fn coverage_for_center(&self, i: usize, unassigned: &[bool]) -> Vec<usize> {
        let center = self.points[i];
        let mut neighbours = self
            .grid
            .within_radius(center, self.constraints.assign_radius_m)
            .into_iter()
            .filter(|&j| unassigned[j])
            .collect_vec();
        neighbours.sort_by(|&a, &b| {
            self.points[a]
                .distance(center)
                .total_cmp(&self.points[b].distance(center))
        });
        neighbours.truncate(self.constraints.max_cluster_size);
        neighbours
    }

    fn too_close(&self, point: PlanarPoint, centers: &[PlanarPoint], min_sep: f64) -> bool {
        centers.iter().any(|c| c.distance(point) <= min_sep)
    }

    /// member minimising the sum of distances to all other members
    fn best_medoid(&self, members: &[usize]) -> usize {
        let mut best = members[0];
        let mut best_sum = f64::INFINITY;
        for &candidate in members {
            let sum: f64 = members
                .iter()
                .map(|&other| self.points[candidate].distance(self.points[other]))
                .sum();
            if sum < best_sum {
                best_sum = sum;
                best = candidate;
            }
        }
        best
    }

    /// Still-unassigned employees attach, in census order, to the first
    /// cluster with remaining capacity that holds a member within the pair
    /// radius.
    fn attach_residual_by_pair_radius(&self, clusters: &mut [Cluster]) {
        let n = self.points.len();
        let cap = self.constraints.max_cluster_size;
        let mut assigned = vec![false; n];
        for cluster in clusters.iter() {
            for &j in &cluster.members {
                assigned[j] = true;
            }
        }
        let mut cap_left = clusters
            .iter()
            .map(|cl| cap.saturating_sub(cl.members.len()))
            .collect_vec();

        for i in 0..n {
            if assigned[i] {
                continue;
            }
            let neighbours: HashSet<usize> = self
                .grid
                .within_radius(self.points[i], self.constraints.pair_radius_m)
                .into_iter()
                .collect();
            for (k, cluster) in clusters.iter_mut().enumerate() {
                if cap_left[k] == 0 {
                    continue;
                }
                if cluster.members.iter().any(|j| neighbours.contains(j)) {
                    cluster.members.push(i);
                    cap_left[k] -= 1;
                    assigned[i] = true;
                    break;
                }
            }
        }
    }

    /// Adaptive minimum size: clusters far from the office may use the
    /// relaxed floor `min_ok_far` instead of `min_ok`.
    fn effective_min_ok(&self, members: &[usize]) -> usize {
        let c = self.constraints;
        match (c.min_ok_far_m, c.min_ok_far) {
            (Some(far_m), Some(far)) if far_m > 0.0 && far < c.min_ok => {
                if self.centroid(members).norm() > far_m {
                    far
                } else {
                    c.min_ok
                }
            }
            _ => c.min_ok,
        }
    }

    /// Discard undersized clusters; split oversized ones into `⌈n/max_ok⌉`
    /// sub-groups via seeded k-means and re-apply the adaptive floor per
    /// sub-group.
    fn filter_and_split(&self, clusters: Vec<Cluster>) -> Vec<Cluster> {
        let c = self.constraints;
        let mut kept = Vec::new();
        for cluster in clusters {
            let n = cluster.members.len();
            if n < self.effective_min_ok(&cluster.members) {
                continue;
            }
            if n <= c.max_ok {
                kept.push(cluster);
                continue;
            }

            let k = n.div_ceil(c.max_ok);
            let member_points = cluster
                .members
                .iter()
                .map(|&i| self.points[i])
                .collect_vec();
            let labels = kmeans_labels(&member_points, k, KMEANS_RESTARTS, KMEANS_SEED);
            for label in 0..k {
                let sub = cluster
                    .members
                    .iter()
                    .zip(&labels)
                    .filter(|(_, &l)| l == label)
                    .map(|(&m, _)| m)
                    .collect_vec();
                if sub.is_empty() {
                    continue;
                }
                if sub.len() >= self.effective_min_ok(&sub) {
                    kept.push(Cluster {
                        members: sub,
                        medoid: None,
                    });
                }
            }
        }
        kept
    }

    /// Repeatedly merge cluster pairs whose centroids lie within the fusion
    /// radius, as long as the merged set respects the size cap and the
    /// diameter cap.
    fn fuse(&self, mut clusters: Vec<Cluster>) -> Vec<Cluster> {
        let c = self.constraints;
        let mut changed = true;
        while changed {
            changed = false;
            let centroids = clusters
                .iter()
                .map(|cl| self.centroid(&cl.members))
                .collect_vec();
            let mut to_remove: HashSet<usize> = HashSet::new();
            for i in 0..clusters.len() {
                if to_remove.contains(&i) {
                    continue;
                }
                for j in (i + 1)..clusters.len() {
                    if to_remove.contains(&j) {
                        continue;
                    }
                    if centroids[i].distance(centroids[j]) > c.fusion_radius {
                        continue;
                    }
                    let merged = clusters[i]
                        .members
                        .iter()
                        .chain(clusters[j].members.iter())
                        .copied()
                        .unique()
                        .sorted()
                        .collect_vec();
                    if merged.len() <= c.max_ok
                        && self.cluster_diameter(&merged) <= c.diameter_max_m
                    {
                        clusters[i] = Cluster {
                            members: merged,
                            medoid: None,
                        };
                        to_remove.insert(j);
                        changed = true;
                    }
                }
            }
            if !to_remove.is_empty() {
                clusters = clusters
                    .into_iter()
                    .enumerate()
                    .filter(|(k, _)| !to_remove.contains(k))
                    .map(|(_, cl)| cl)
                    .collect();
            }
        }
        clusters
    }

    /// max pairwise distance; bounding-box diagonal for very large clusters
    fn cluster_diameter(&self, members: &[usize]) -> f64 {
        if members.len() <= 1 {
            return 0.0;
        }
        if members.len() <= DIAMETER_EXACT_LIMIT {
            let mut max = 0.0f64;
            for (a, b) in members.iter().tuple_combinations() {
                max = max.max(self.points[*a].distance(self.points[*b]));
            }
            return max;
        }
        let xs = members.iter().map(|&i| self.points[i].x);
        let ys = members.iter().map(|&i| self.points[i].y);
        let (min_x, max_x) = xs.minmax().into_option().unwrap();
        let (min_y, max_y) = ys.minmax().into_option().unwrap();
        (max_x - min_x).hypot(max_y - min_y)
    }

    fn centroid(&self, members: &[usize]) -> PlanarPoint {
        let n = members.len() as f64;
        let (sx, sy) = members.iter().fold((0.0, 0.0), |(sx, sy), &i| {
            (sx + self.points[i].x, sy + self.points[i].y)
        });
        PlanarPoint {
            x: sx / n,
            y: sy / n,
        }
    }

    fn to_stop(&self, cluster: &Cluster) -> Stop {
        let center = match cluster.medoid {
            Some(medoid) => self.census.get(medoid).home(),
            None => self.geo_centroid(&cluster.members),
        };
        let members = cluster
            .members
            .iter()
            .map(|&i| self.census.id_of(i))
            .collect_vec();
        Stop::new(center, members)
    }

    fn geo_centroid(&self, members: &[usize]) -> GeoPoint {
        let n = members.len() as f64;
        let (lat, lng) = members.iter().fold((0.0, 0.0), |(lat, lng), &i| {
            let home = self.census.get(i).home();
            (lat + home.lat, lng + home.lng)
        });
        GeoPoint::new(lat / n, lng / n)
    }
}
