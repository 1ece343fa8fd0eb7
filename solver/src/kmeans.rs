use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use model::geo::PlanarPoint;

/// Seeded Lloyd k-means over planar points, used to split oversized stop
/// clusters. Runs `n_init` restarts and keeps the labelling with the lowest
/// inertia; ties keep the earlier restart. Fully deterministic for a given
/// seed.
pub(crate) fn kmeans_labels(
    points: &[PlanarPoint],
    k: usize,
    n_init: usize,
    seed: u64,
) -> Vec<usize> {
    let n = points.len();
    if k == 0 || n == 0 {
        return vec![0; n];
    }
    if k >= n {
        return (0..n).collect();
    }

    let mut best_labels: Option<(f64, Vec<usize>)> = None;
    for restart in 0..n_init.max(1) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed + restart as u64);
        let seeds = rand::seq::index::sample(&mut rng, n, k).into_vec();
        let mut centers: Vec<PlanarPoint> = seeds.iter().map(|&i| points[i]).collect();

        let mut labels = vec![0usize; n];
        for _ in 0..300 {
            let mut changed = false;
            for (i, p) in points.iter().enumerate() {
                let nearest = nearest_center(*p, &centers);
                if labels[i] != nearest {
                    labels[i] = nearest;
                    changed = true;
                }
            }
            recompute_centers(points, &labels, &mut centers);
            if !changed {
                break;
            }
        }

        let inertia: f64 = points
            .iter()
            .zip(&labels)
            .map(|(p, &lab)| {
                let d = p.distance(centers[lab]);
                d * d
            })
            .sum();

        match &best_labels {
            Some((best_inertia, _)) if inertia >= *best_inertia => {}
            _ => best_labels = Some((inertia, labels)),
        }
    }

    best_labels.expect("at least one restart ran").1
}

fn nearest_center(p: PlanarPoint, centers: &[PlanarPoint]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (c_idx, c) in centers.iter().enumerate() {
        let d = p.distance(*c);
        if d < best_dist {
            best_dist = d;
            best = c_idx;
        }
    }
    best
}

fn recompute_centers(points: &[PlanarPoint], labels: &[usize], centers: &mut [PlanarPoint]) {
    let k = centers.len();
    let mut sums = vec![(0.0, 0.0, 0usize); k];
    for (p, &lab) in points.iter().zip(labels) {
        sums[lab].0 += p.x;
        sums[lab].1 += p.y;
        sums[lab].2 += 1;
    }
    for (lab, (sx, sy, count)) in sums.into_iter().enumerate() {
        // a cluster that lost all its points keeps its previous center
        if count > 0 {
            centers[lab] = PlanarPoint {
                x: sx / count as f64,
                y: sy / count as f64,
            };
        }
    }
}
