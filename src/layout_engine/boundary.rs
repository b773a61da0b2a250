//! Internal dividers of a layout and moving them.
//!
//! A boundary is a run of collinear zone edges with zones on both sides. In a
//! 2x2 grid the middle column line is a single boundary shared by all four
//! zones, so dragging it keeps the grid aligned.

use serde::{Deserialize, Serialize};

use crate::common::error::{Result, ZoneError};
use crate::model::geometry::EPSILON;
use crate::model::layout::{Axis, Zone};

const ALIGN: f64 = 1e-6;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Boundary {
    pub axis: Axis,
    /// Normalized coordinate of the divider: x for vertical, y for horizontal.
    pub position: f64,
    /// Extent along the divider.
    pub span: (f64, f64),
    /// Zones whose far edge lies on the divider (left of or above it).
    pub before: Vec<usize>,
    /// Zones whose near edge lies on the divider (right of or below it).
    pub after: Vec<usize>,
}

impl Boundary {
    /// The positions the divider may move to while keeping every
    /// participating zone at least `buffer` wide. `None` if there is no room.
    pub fn range(&self, zones: &[Zone], buffer: f64) -> Option<(f64, f64)> {
        let lo = self
            .before
            .iter()
            .map(|&i| near(&zones[i], self.axis) + buffer)
            .fold(f64::NEG_INFINITY, f64::max);
        let hi = self
            .after
            .iter()
            .map(|&i| far(&zones[i], self.axis) - buffer)
            .fold(f64::INFINITY, f64::min);
        (lo <= hi).then_some((lo, hi))
    }
}

fn near(zone: &Zone, axis: Axis) -> f64 {
    match axis {
        Axis::Vertical => zone.rect.x,
        Axis::Horizontal => zone.rect.y,
    }
}

fn far(zone: &Zone, axis: Axis) -> f64 {
    match axis {
        Axis::Vertical => zone.rect.max_x(),
        Axis::Horizontal => zone.rect.max_y(),
    }
}

fn extent(zone: &Zone, axis: Axis) -> (f64, f64) {
    match axis {
        Axis::Vertical => (zone.rect.y, zone.rect.max_y()),
        Axis::Horizontal => (zone.rect.x, zone.rect.max_x()),
    }
}

struct Edge {
    zone: usize,
    position: f64,
    start: f64,
    end: f64,
    before: bool,
}

pub fn boundaries(zones: &[Zone]) -> Vec<Boundary> {
    let mut out = boundaries_along(zones, Axis::Vertical);
    out.extend(boundaries_along(zones, Axis::Horizontal));
    out
}

fn boundaries_along(zones: &[Zone], axis: Axis) -> Vec<Boundary> {
    let on_perimeter = |p: f64| p.abs() < ALIGN || (p - 1.0).abs() < ALIGN;
    let mut edges: Vec<Edge> = Vec::new();
    for (zone_index, zone) in zones.iter().enumerate() {
        let (start, end) = extent(zone, axis);
        for (position, before) in [(far(zone, axis), true), (near(zone, axis), false)] {
            if !on_perimeter(position) {
                edges.push(Edge { zone: zone_index, position, start, end, before });
            }
        }
    }
    edges.sort_by(|a, b| a.position.total_cmp(&b.position).then(a.start.total_cmp(&b.start)));

    let mut out = Vec::new();
    let mut rest = edges.as_slice();
    while let Some(first) = rest.first() {
        let line = rest.iter().take_while(|e| (e.position - first.position).abs() < ALIGN).count();
        let (group, tail) = rest.split_at(line);
        rest = tail;

        let mut group: Vec<&Edge> = group.iter().collect();
        group.sort_by(|a, b| a.start.total_cmp(&b.start));
        let mut current: Option<Boundary> = None;
        for edge in group {
            if let Some(b) = current.as_mut()
                && edge.start <= b.span.1 + ALIGN
            {
                b.span.1 = b.span.1.max(edge.end);
                push_side(b, edge);
                continue;
            }
            out.extend(current.take().filter(is_internal));
            let mut b = Boundary {
                axis,
                position: edge.position,
                span: (edge.start, edge.end),
                before: vec![],
                after: vec![],
            };
            push_side(&mut b, edge);
            current = Some(b);
        }
        out.extend(current.filter(is_internal));
    }
    for b in &mut out {
        b.before.sort_unstable();
        b.after.sort_unstable();
    }
    out
}

fn push_side(boundary: &mut Boundary, edge: &Edge) {
    if edge.before {
        boundary.before.push(edge.zone);
    } else {
        boundary.after.push(edge.zone);
    }
}

fn is_internal(b: &Boundary) -> bool { !b.before.is_empty() && !b.after.is_empty() }

/// Moves `boundary` to `position`, resizing every zone on either side.
pub fn move_boundary(
    zones: &mut [Zone],
    boundary: &Boundary,
    position: f64,
    buffer: f64,
) -> Result<()> {
    let len = zones.len();
    if let Some(&index) = boundary.before.iter().chain(&boundary.after).find(|&&i| i >= len) {
        return Err(ZoneError::IndexOutOfRange { index, len });
    }
    let Some((lo, hi)) = boundary.range(zones, buffer) else {
        return Err(out_of_range(boundary, position, "boundary cannot move"));
    };
    if position < lo - EPSILON || position > hi + EPSILON {
        return Err(out_of_range(boundary, position, &format!("allowed range is {lo}..{hi}")));
    }
    for &i in &boundary.before {
        let r = &mut zones[i].rect;
        match boundary.axis {
            Axis::Vertical => r.width = position - r.x,
            Axis::Horizontal => r.height = position - r.y,
        }
    }
    for &i in &boundary.after {
        let r = &mut zones[i].rect;
        match boundary.axis {
            Axis::Vertical => {
                r.width = r.max_x() - position;
                r.x = position;
            }
            Axis::Horizontal => {
                r.height = r.max_y() - position;
                r.y = position;
            }
        }
    }
    Ok(())
}

fn out_of_range(boundary: &Boundary, position: f64, detail: &str) -> ZoneError {
    ZoneError::InvalidZone {
        layout: String::new(),
        index: boundary.before.first().copied().unwrap_or_default(),
        reason: format!("cannot move {:?} boundary to {position}: {detail}", boundary.axis),
    }
}
