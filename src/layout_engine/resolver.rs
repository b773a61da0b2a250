//! Pointer-to-zone resolution.
//!
//! Given the pixel rectangles of a layout and a pointer position, decide what
//! a dragged window should snap to. The function is pure so it can run on
//! every pointer tick and be tested without a window system.

use serde::{Deserialize, Serialize};

use crate::model::geometry::{Point, Rect};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedTarget {
    #[default]
    None,
    Zone {
        index: usize,
        rect: Rect,
    },
    /// Several adjacent zones combined because the pointer is near their
    /// shared boundary. `indices` is sorted.
    Merged {
        indices: Vec<usize>,
        rect: Rect,
    },
}

impl ResolvedTarget {
    pub fn rect(&self) -> Option<Rect> {
        match self {
            ResolvedTarget::None => None,
            ResolvedTarget::Zone { rect, .. } | ResolvedTarget::Merged { rect, .. } => Some(*rect),
        }
    }

    pub fn is_none(&self) -> bool { matches!(self, ResolvedTarget::None) }

    pub fn indices(&self) -> Vec<usize> {
        match self {
            ResolvedTarget::None => vec![],
            ResolvedTarget::Zone { index, .. } => vec![*index],
            ResolvedTarget::Merged { indices, .. } => indices.clone(),
        }
    }
}

/// Resolves the snap target for `pointer`.
///
/// A pointer outside every zone resolves to nothing. When `tolerance` is
/// positive and the pointer is within `tolerance` of the outlines of two or
/// more zones that form one adjacency-connected group, those zones merge into
/// their bounding box; this also covers corners where several zones meet.
/// Otherwise the smallest containing zone wins, lowest index first on ties.
pub fn resolve(zones: &[Rect], pointer: Point, tolerance: f64) -> ResolvedTarget {
    let containing: Vec<usize> =
        zones.iter().enumerate().filter(|(_, z)| z.contains(pointer)).map(|(i, _)| i).collect();
    if containing.is_empty() {
        return ResolvedTarget::None;
    }

    if tolerance > 0.0 {
        let band: Vec<usize> = zones
            .iter()
            .enumerate()
            .filter(|(_, z)| z.distance_to_perimeter(pointer) <= tolerance)
            .map(|(i, _)| i)
            .collect();
        if band.len() >= 2 && is_connected(zones, &band, tolerance) {
            let rect = band.iter().skip(1).fold(zones[band[0]], |acc, &i| acc.union(&zones[i]));
            return ResolvedTarget::Merged { indices: band, rect };
        }
    }

    let index = containing
        .into_iter()
        .min_by(|&a, &b| zones[a].area().total_cmp(&zones[b].area()).then(a.cmp(&b)))
        .unwrap_or_default();
    ResolvedTarget::Zone { index, rect: zones[index] }
}

/// Two zones are adjacent when an edge of one lies within `tolerance` of the
/// facing edge of the other and the two edges overlap along their length.
pub fn adjacent(a: &Rect, b: &Rect, tolerance: f64) -> bool {
    let overlap_y = a.max_y().min(b.max_y()) - a.y.max(b.y);
    let overlap_x = a.max_x().min(b.max_x()) - a.x.max(b.x);
    let side_by_side = overlap_y > 0.0
        && ((a.max_x() - b.x).abs() <= tolerance || (b.max_x() - a.x).abs() <= tolerance);
    let stacked = overlap_x > 0.0
        && ((a.max_y() - b.y).abs() <= tolerance || (b.max_y() - a.y).abs() <= tolerance);
    side_by_side || stacked
}

fn is_connected(zones: &[Rect], members: &[usize], tolerance: f64) -> bool {
    let mut seen = vec![false; members.len()];
    let mut stack = vec![0];
    seen[0] = true;
    while let Some(current) = stack.pop() {
        for (other, visited) in seen.iter_mut().enumerate() {
            if !*visited && adjacent(&zones[members[current]], &zones[members[other]], tolerance) {
                *visited = true;
                stack.push(other);
            }
        }
    }
    seen.into_iter().all(|v| v)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn halves() -> Vec<Rect> {
        vec![Rect::new(0.0, 0.0, 500.0, 1080.0), Rect::new(500.0, 0.0, 500.0, 1080.0)]
    }

    fn quadrants() -> Vec<Rect> {
        vec![
            Rect::new(0.0, 0.0, 500.0, 500.0),
            Rect::new(500.0, 0.0, 500.0, 500.0),
            Rect::new(0.0, 500.0, 500.0, 500.0),
            Rect::new(500.0, 500.0, 500.0, 500.0),
        ]
    }

    #[test]
    fn interior_points_resolve_to_their_zone() {
        let zones = halves();
        for x in [50.0, 250.0, 480.0] {
            for y in [20.0, 540.0, 1050.0] {
                assert_eq!(resolve(&zones, Point::new(x, y), 10.0), ResolvedTarget::Zone {
                    index: 0,
                    rect: zones[0]
                });
                assert_eq!(resolve(&zones, Point::new(x + 500.0, y), 10.0), ResolvedTarget::Zone {
                    index: 1,
                    rect: zones[1]
                });
            }
        }
    }

    #[test]
    fn points_outside_every_zone_resolve_to_none() {
        let zones = halves();
        for p in [
            Point::new(-1.0, 10.0),
            Point::new(1000.5, 10.0),
            Point::new(300.0, 1080.1),
            Point::new(-20.0, -20.0),
        ] {
            assert_eq!(resolve(&zones, p, 10.0), ResolvedTarget::None);
        }
        assert_eq!(resolve(&[], Point::ZERO, 10.0), ResolvedTarget::None);
    }

    #[test]
    fn shared_boundary_merges_two_halves() {
        let zones = halves();
        let expected = ResolvedTarget::Merged {
            indices: vec![0, 1],
            rect: Rect::new(0.0, 0.0, 1000.0, 1080.0),
        };
        assert_eq!(resolve(&zones, Point::new(500.0, 540.0), 10.0), expected);
        assert_eq!(resolve(&zones, Point::new(491.0, 540.0), 10.0), expected);
        assert_eq!(resolve(&zones, Point::new(509.0, 200.0), 10.0), expected);
        assert_eq!(
            resolve(&zones, Point::new(489.0, 540.0), 10.0),
            ResolvedTarget::Zone { index: 0, rect: zones[0] }
        );
    }

    #[test]
    fn zero_tolerance_disables_merging() {
        let zones = halves();
        assert_eq!(
            resolve(&zones, Point::new(500.0, 540.0), 0.0),
            ResolvedTarget::Zone { index: 0, rect: zones[0] }
        );
    }

    #[test]
    fn outer_edges_do_not_merge() {
        let zones = halves();
        assert_eq!(
            resolve(&zones, Point::new(2.0, 540.0), 10.0),
            ResolvedTarget::Zone { index: 0, rect: zones[0] }
        );
    }

    #[test]
    fn corners_merge_every_touching_zone() {
        let zones = quadrants();
        assert_eq!(resolve(&zones, Point::new(503.0, 497.0), 10.0), ResolvedTarget::Merged {
            indices: vec![0, 1, 2, 3],
            rect: Rect::new(0.0, 0.0, 1000.0, 1000.0),
        });
        assert_eq!(resolve(&zones, Point::new(250.0, 505.0), 10.0), ResolvedTarget::Merged {
            indices: vec![0, 2],
            rect: Rect::new(0.0, 0.0, 500.0, 1000.0),
        });
    }

    #[test]
    fn smallest_zone_wins_when_nested() {
        let zones = vec![Rect::new(0.0, 0.0, 1000.0, 1000.0), Rect::new(250.0, 250.0, 500.0, 500.0)];
        assert_eq!(
            resolve(&zones, Point::new(500.0, 500.0), 10.0),
            ResolvedTarget::Zone { index: 1, rect: zones[1] }
        );
        // Near the inner zone's edge the bands disagree: the zones overlap
        // rather than abut, so there is no merge.
        assert_eq!(
            resolve(&zones, Point::new(252.0, 500.0), 10.0),
            ResolvedTarget::Zone { index: 1, rect: zones[1] }
        );
    }

    #[test]
    fn equal_overlapping_zones_prefer_lower_index() {
        let zones = vec![Rect::new(0.0, 0.0, 100.0, 100.0), Rect::new(0.0, 0.0, 100.0, 100.0)];
        assert_eq!(
            resolve(&zones, Point::new(50.0, 50.0), 10.0),
            ResolvedTarget::Zone { index: 0, rect: zones[0] }
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let zones = quadrants();
        let p = Point::new(499.0, 120.0);
        assert_eq!(resolve(&zones, p, 10.0), resolve(&zones, p, 10.0));
    }

    #[test]
    fn adjacency_requires_overlapping_spans() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(adjacent(&a, &Rect::new(100.0, 50.0, 100.0, 100.0), 1.0));
        assert!(adjacent(&a, &Rect::new(104.0, 0.0, 10.0, 10.0), 5.0));
        assert!(!adjacent(&a, &Rect::new(100.0, 100.0, 100.0, 100.0), 1.0));
        assert!(!adjacent(&a, &Rect::new(20.0, 20.0, 10.0, 10.0), 1.0));
    }
}
