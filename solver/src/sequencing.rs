use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Cheapest-insertion ordering of meeting points for one driver. Costs are
/// driving minutes: `t_src` from the driver's home, `t_off` to the office,
/// `t_mm` between meeting points (all indexed locally, 0..n).
pub(crate) fn cheapest_insertion_order(
    t_src: &[f64],
    t_off: &[f64],
    t_mm: &[Vec<f64>],
) -> Vec<usize> {
    let n = t_off.len();
    if n <= 1 {
        return (0..n).collect();
    }

    // seed with the point minimising the solo trip home -> mp -> office
    let start = (0..n)
        .min_by(|&a, &b| (t_src[a] + t_off[a]).total_cmp(&(t_src[b] + t_off[b])))
        .expect("n > 1");
    let mut route = vec![start];
    let mut remaining: Vec<usize> = (0..n).filter(|&i| i != start).collect();

    let inc_cost = |route: &[usize], pos: usize, i: usize| -> f64 {
        if pos == 0 {
            return t_src[i] + t_mm[i][route[0]] - t_src[route[0]];
        }
        if pos == route.len() {
            return t_mm[route[route.len() - 1]][i] + t_off[i] - t_off[route[route.len() - 1]];
        }
        let (a, b) = (route[pos - 1], route[pos]);
        t_mm[a][i] + t_mm[i][b] - t_mm[a][b]
    };

    while !remaining.is_empty() {
        let mut best: Option<(usize, usize)> = None;
        let mut best_inc = f64::INFINITY;
        for &i in &remaining {
            for pos in 0..=route.len() {
                let inc = inc_cost(&route, pos, i);
                if inc < best_inc {
                    best_inc = inc;
                    best = Some((i, pos));
                }
            }
        }
        let Some((i, pos)) = best else {
            break;
        };
        route.insert(pos, i);
        remaining.retain(|&r| r != i);
    }
    route
}

/// Bounded random 2-opt: a fixed number of random segment reversals, keeping
/// every improvement. Seeded, so the result is deterministic.
pub(crate) fn two_opt(
    route: Vec<usize>,
    t_src: &[f64],
    t_off: &[f64],
    t_mm: &[Vec<f64>],
    iters: usize,
    seed: u64,
) -> Vec<usize> {
    let n = route.len();
    if n < 3 {
        return route;
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut best = route;
    let mut best_cost = route_time(&best, t_src, t_off, t_mm);
    for _ in 0..iters {
        let i = rng.gen_range(0..1.max(n - 2));
        let mut k = rng.gen_range((i + 1)..(i + 2).max(n - 1));
        if k >= n {
            k = n - 1;
        }
        let mut candidate = best.clone();
        candidate[i..=k].reverse();
        let cost = route_time(&candidate, t_src, t_off, t_mm);
        if cost < best_cost {
            best = candidate;
            best_cost = cost;
        }
    }
    best
}

/// total driving time of home -> mps in order -> office
pub(crate) fn route_time(order: &[usize], t_src: &[f64], t_off: &[f64], t_mm: &[Vec<f64>]) -> f64 {
    let Some((&first, rest)) = order.split_first() else {
        return 0.0;
    };
    let mut t = t_src[first];
    let mut prev = first;
    for &next in rest {
        t += t_mm[prev][next];
        prev = next;
    }
    t + t_off[prev]
}
