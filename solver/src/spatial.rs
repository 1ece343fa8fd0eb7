use std::collections::HashMap;

use model::base_types::Meters;
use model::geo::PlanarPoint;

/// Uniform-grid index over planar points for radius queries. Cells are keyed
/// by integer coordinates; a query scans the cell rectangle covering the
/// search circle and filters by exact distance.
///
/// Results are returned in ascending point-index order so that every caller
/// observes the same deterministic neighbourhood ordering.
pub(crate) struct SpatialGrid {
    points: Vec<PlanarPoint>,
    cell_size: Meters,
    buckets: HashMap<(i64, i64), Vec<usize>>,
}

impl SpatialGrid {
    pub(crate) fn build(points: Vec<PlanarPoint>, cell_size: Meters) -> SpatialGrid {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        let mut buckets: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (idx, p) in points.iter().enumerate() {
            buckets.entry(cell_key(*p, cell_size)).or_default().push(idx);
        }
        SpatialGrid {
            points,
            cell_size,
            buckets,
        }
    }

    /// indices of all points within `radius` of `center` (inclusive), sorted
    pub(crate) fn within_radius(&self, center: PlanarPoint, radius: Meters) -> Vec<usize> {
        if !(radius >= 0.0) {
            return Vec::new();
        }
        let reach = (radius / self.cell_size).ceil() as i64;
        let (cx, cy) = cell_key(center, self.cell_size);
        let mut hits = Vec::new();
        for gx in (cx - reach)..=(cx + reach) {
            for gy in (cy - reach)..=(cy + reach) {
                if let Some(bucket) = self.buckets.get(&(gx, gy)) {
                    for &idx in bucket {
                        if self.points[idx].distance(center) <= radius {
                            hits.push(idx);
                        }
                    }
                }
            }
        }
        hits.sort_unstable();
        hits
    }
}

fn cell_key(p: PlanarPoint, cell_size: Meters) -> (i64, i64) {
    (
        (p.x / cell_size).floor() as i64,
        (p.y / cell_size).floor() as i64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points_on_a_line(n: usize, spacing: f64) -> Vec<PlanarPoint> {
        (0..n)
            .map(|i| PlanarPoint {
                x: i as f64 * spacing,
                y: 0.0,
            })
            .collect()
    }

    #[test]
    fn radius_query_matches_brute_force() {
        let points = points_on_a_line(20, 130.0);
        let grid = SpatialGrid::build(points.clone(), 400.0);
        let center = points[7];
        let radius = 500.0;

        let expected: Vec<usize> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.distance(center) <= radius)
            .map(|(i, _)| i)
            .collect();

        assert_eq!(grid.within_radius(center, radius), expected);
    }

    #[test]
    fn boundary_points_are_included() {
        let points = vec![
            PlanarPoint { x: 0.0, y: 0.0 },
            PlanarPoint { x: 300.0, y: 0.0 },
        ];
        let grid = SpatialGrid::build(points.clone(), 100.0);
        assert_eq!(grid.within_radius(points[0], 300.0), vec![0, 1]);
        assert_eq!(grid.within_radius(points[0], 299.9), vec![0]);
    }

    #[test]
    fn empty_grid_returns_nothing() {
        let grid = SpatialGrid::build(Vec::new(), 100.0);
        assert!(grid
            .within_radius(PlanarPoint { x: 0.0, y: 0.0 }, 1000.0)
            .is_empty());
    }
}
