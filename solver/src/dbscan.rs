use std::collections::VecDeque;

use model::base_types::Meters;
use model::geo::{haversine_m, GeoPoint};

pub(crate) const NOISE: i32 = -1;
const UNVISITED: i32 = -2;

/// Density clustering over geographic points with a great-circle metric.
/// A point is a core point when its eps-neighbourhood (including itself)
/// holds at least `min_samples` points; clusters grow from core points in
/// ascending index order, so labels are deterministic.
pub(crate) fn dbscan(points: &[GeoPoint], eps_m: Meters, min_samples: usize) -> Vec<i32> {
    let n = points.len();
    let mut labels = vec![UNVISITED; n];
    let mut next_cluster = 0;

    for i in 0..n {
        if labels[i] != UNVISITED {
            continue;
        }
        let neighbours = region_query(points, i, eps_m);
        if neighbours.len() < min_samples {
            labels[i] = NOISE;
            continue;
        }

        let cluster = next_cluster;
        next_cluster += 1;
        labels[i] = cluster;

        let mut queue: VecDeque<usize> = neighbours.into();
        while let Some(j) = queue.pop_front() {
            if labels[j] == NOISE {
                // border point reached from a core point
                labels[j] = cluster;
            }
            if labels[j] != UNVISITED {
                continue;
            }
            labels[j] = cluster;
            let j_neighbours = region_query(points, j, eps_m);
            if j_neighbours.len() >= min_samples {
                queue.extend(j_neighbours);
            }
        }
    }

    labels
}

/// number of clusters found (labels are 0..n_clusters)
pub(crate) fn cluster_count(labels: &[i32]) -> usize {
    labels.iter().copied().max().map_or(0, |m| (m + 1).max(0) as usize)
}

fn region_query(points: &[GeoPoint], center: usize, eps_m: Meters) -> Vec<usize> {
    let c = points[center];
    (0..points.len())
        .filter(|&j| haversine_m(c, points[j]) <= eps_m)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ~111.32 m per 0.001 degrees of latitude
    fn p(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng)
    }

    #[test]
    fn dense_cluster_is_found_and_outlier_is_noise() {
        let points = vec![
            p(40.4000, -3.7000),
            p(40.4002, -3.7000),
            p(40.4004, -3.7001),
            p(40.4001, -3.7003),
            p(40.5000, -3.7000), // ~11 km away
        ];
        let labels = dbscan(&points, 200.0, 3);
        assert_eq!(labels[..4], [0, 0, 0, 0]);
        assert_eq!(labels[4], NOISE);
        assert_eq!(cluster_count(&labels), 1);
    }

    #[test]
    fn min_samples_one_forms_connected_components() {
        let points = vec![
            p(40.4000, -3.7000),
            p(40.4001, -3.7000), // chained to the first
            p(40.4100, -3.7000), // ~1.1 km away, own component
        ];
        let labels = dbscan(&points, 200.0, 1);
        assert_eq!(labels, vec![0, 0, 1]);
    }

    #[test]
    fn two_separate_clusters_get_increasing_labels() {
        let points = vec![
            p(40.4000, -3.7000),
            p(40.4001, -3.7000),
            p(40.4002, -3.7000),
            p(40.4500, -3.7000),
            p(40.4501, -3.7000),
            p(40.4502, -3.7000),
        ];
        let labels = dbscan(&points, 200.0, 3);
        assert_eq!(labels, vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn empty_input_yields_no_labels() {
        assert!(dbscan(&[], 100.0, 3).is_empty());
    }
}
