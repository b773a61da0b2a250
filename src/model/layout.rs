//! Zone layouts and the operations the zone editor performs on them.

use serde::{Deserialize, Serialize};

use super::geometry::{EPSILON, Rect, Size, UNIT_RECT};
use crate::common::error::{Result, ZoneError};

const ASPECT_SLACK: f64 = 0.02;

/// A rectangular region a window can snap to, in coordinates normalized to
/// the work area of the monitor (`0.0..=1.0` on both axes).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    pub rect: Rect,
}

impl Zone {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { rect: Rect::new(x, y, width, height) }
    }

    /// Returns why the zone is invalid, if it is.
    pub fn check(&self) -> Option<String> {
        let r = &self.rect;
        if ![r.x, r.y, r.width, r.height].iter().all(|v| v.is_finite()) {
            return Some("coordinates must be finite".to_string());
        }
        if r.width <= 0.0 || r.height <= 0.0 {
            return Some(format!("size must be positive, got {}x{}", r.width, r.height));
        }
        if !UNIT_RECT.contains_rect(r) {
            return Some(format!("{r:?} lies outside the work area"));
        }
        None
    }

    pub fn scaled_to(&self, work_area: &Rect) -> Rect { self.rect.scale_from_unit(work_area) }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// A vertical divider; splits along x.
    Vertical,
    /// A horizontal divider; splits along y.
    Horizontal,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Layout {
    pub name: String,
    /// Resolution of the monitor the layout was designed on. Zones are
    /// normalized, so this only flags layouts that look stretched elsewhere.
    pub authored_for: Size,
    pub zones: Vec<Zone>,
}

impl Layout {
    pub fn new(name: impl Into<String>, authored_for: Size, zones: Vec<Zone>) -> Self {
        Self { name: name.into(), authored_for, zones }
    }

    /// Whether `work_area` has roughly the aspect ratio the layout was
    /// authored for. Layouts with no recorded size always match.
    pub fn matches_aspect(&self, work_area: &Rect) -> bool {
        let Size { width, height } = self.authored_for;
        if !(width > 0.0 && height > 0.0) || work_area.is_empty() {
            return true;
        }
        let authored = width / height;
        let actual = work_area.width / work_area.height;
        (authored - actual).abs() <= ASPECT_SLACK * authored
    }

    /// An evenly spaced `columns` x `rows` grid.
    pub fn grid(name: impl Into<String>, columns: usize, rows: usize) -> Self {
        let columns = columns.max(1);
        let rows = rows.max(1);
        let w = 1.0 / columns as f64;
        let h = 1.0 / rows as f64;
        let zones = (0..rows)
            .flat_map(|row| {
                (0..columns).map(move |col| Zone::new(col as f64 * w, row as f64 * h, w, h))
            })
            .collect();
        Self::new(name, Size::new(1920.0, 1080.0), zones)
    }

    /// Columns with the given relative widths.
    pub fn columns(name: impl Into<String>, weights: &[f64]) -> Self {
        let total: f64 = weights.iter().sum();
        let mut x = 0.0;
        let zones = weights
            .iter()
            .map(|weight| {
                let w = weight / total;
                let zone = Zone::new(x, 0.0, w, 1.0);
                x += w;
                zone
            })
            .collect();
        Self::new(name, Size::new(1920.0, 1080.0), zones)
    }

    pub fn validate(&self) -> Result<()> {
        if self.zones.is_empty() {
            return Err(ZoneError::InvalidZone {
                layout: self.name.clone(),
                index: 0,
                reason: "layout has no zones".to_string(),
            });
        }
        for (index, zone) in self.zones.iter().enumerate() {
            if let Some(reason) = zone.check() {
                return Err(ZoneError::InvalidZone { layout: self.name.clone(), index, reason });
            }
        }
        Ok(())
    }

    /// Pixel rectangles of every zone on the given work area, in zone order.
    pub fn zone_rects(&self, work_area: &Rect) -> Vec<Rect> {
        self.zones.iter().map(|z| z.scaled_to(work_area)).collect()
    }

    /// Splits zone `index` in two at the normalized `position` along `axis`.
    /// The first half keeps its index; the second half is appended.
    pub fn divide(&mut self, index: usize, axis: Axis, position: f64) -> Result<()> {
        let len = self.zones.len();
        let zone = self.zones.get(index).ok_or(ZoneError::IndexOutOfRange { index, len })?;
        let r = zone.rect;
        let (start, end) = match axis {
            Axis::Vertical => (r.x, r.max_x()),
            Axis::Horizontal => (r.y, r.max_y()),
        };
        if !(position > start + EPSILON && position < end - EPSILON) {
            return Err(ZoneError::InvalidZone {
                layout: self.name.clone(),
                index,
                reason: format!("divider at {position} is not inside {start}..{end}"),
            });
        }
        let (first, second) = match axis {
            Axis::Vertical => (
                Rect::new(r.x, r.y, position - r.x, r.height),
                Rect::new(position, r.y, r.max_x() - position, r.height),
            ),
            Axis::Horizontal => (
                Rect::new(r.x, r.y, r.width, position - r.y),
                Rect::new(r.x, position, r.width, r.max_y() - position),
            ),
        };
        self.zones[index] = Zone { rect: first };
        self.zones.push(Zone { rect: second });
        Ok(())
    }
}

/// Layouts shipped with the program and offered on first run.
pub fn templates() -> Vec<Layout> {
    vec![
        Layout::columns("halves", &[1.0, 1.0]),
        Layout::columns("thirds", &[1.0, 1.0, 1.0]),
        Layout::grid("grid", 2, 2),
        Layout::new(
            "center-right-bias",
            Size::new(1920.0, 1080.0),
            vec![
                Zone::new(0.0, 0.0, 0.25, 1.0),
                Zone::new(0.25, 0.0, 0.45, 1.0),
                Zone::new(0.7, 0.0, 0.3, 0.5),
                Zone::new(0.7, 0.5, 0.3, 0.5),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn grid_covers_the_unit_square() {
        let layout = Layout::grid("g", 3, 2);
        assert_eq!(layout.zones.len(), 6);
        layout.validate().unwrap();
        let area: f64 = layout.zones.iter().map(|z| z.rect.area()).sum();
        assert!((area - 1.0).abs() < EPSILON);
    }

    #[test]
    fn templates_are_valid() {
        for layout in templates() {
            layout.validate().unwrap();
        }
    }

    #[test]
    fn validation_rejects_degenerate_and_escaping_zones() {
        let mut layout = Layout::grid("g", 2, 1);
        layout.zones.push(Zone::new(0.5, 0.5, 0.0, 0.2));
        assert!(matches!(layout.validate(), Err(ZoneError::InvalidZone { index: 2, .. })));

        layout.zones[2] = Zone::new(0.8, 0.0, 0.5, 1.0);
        assert!(matches!(layout.validate(), Err(ZoneError::InvalidZone { index: 2, .. })));

        layout.zones[2] = Zone::new(f64::NAN, 0.0, 0.5, 1.0);
        assert!(layout.validate().is_err());

        let empty = Layout::new("e", Size::new(1.0, 1.0), vec![]);
        assert!(empty.validate().is_err());
    }

    #[test]
    fn overlapping_zones_are_allowed() {
        let layout = Layout::new(
            "nested",
            Size::new(1920.0, 1080.0),
            vec![Zone::new(0.0, 0.0, 1.0, 1.0), Zone::new(0.25, 0.25, 0.5, 0.5)],
        );
        layout.validate().unwrap();
    }

    #[test]
    fn divide_splits_a_zone_in_place() {
        let mut layout = Layout::grid("g", 1, 1);
        layout.divide(0, Axis::Vertical, 0.25).unwrap();
        assert_eq!(layout.zones, vec![Zone::new(0.0, 0.0, 0.25, 1.0), Zone::new(0.25, 0.0, 0.75, 1.0)]);

        layout.divide(1, Axis::Horizontal, 0.5).unwrap();
        assert_eq!(layout.zones[1], Zone::new(0.25, 0.0, 0.75, 0.5));
        assert_eq!(layout.zones[2], Zone::new(0.25, 0.5, 0.75, 0.5));
        layout.validate().unwrap();
    }

    #[test]
    fn divide_rejects_bad_requests() {
        let mut layout = Layout::grid("g", 2, 1);
        assert!(matches!(
            layout.divide(4, Axis::Vertical, 0.1),
            Err(ZoneError::IndexOutOfRange { index: 4, len: 2 })
        ));
        assert!(layout.divide(0, Axis::Vertical, 0.5).is_err());
        assert!(layout.divide(0, Axis::Vertical, 0.75).is_err());
        assert_eq!(layout.zones.len(), 2);
    }

    #[test]
    fn aspect_ratio_mismatch_is_detected() {
        let layout = Layout::grid("g", 2, 1);
        assert!(layout.matches_aspect(&Rect::new(0.0, 0.0, 3840.0, 2160.0)));
        assert!(!layout.matches_aspect(&Rect::new(0.0, 0.0, 1280.0, 1024.0)));
        let unsized_layout = Layout::new("u", Size::new(0.0, 0.0), layout.zones.clone());
        assert!(unsized_layout.matches_aspect(&Rect::new(0.0, 0.0, 1280.0, 1024.0)));
    }

    #[test]
    fn zone_rects_scale_to_the_work_area() {
        let layout = Layout::grid("g", 2, 1);
        let rects = layout.zone_rects(&Rect::new(0.0, 0.0, 1000.0, 1080.0));
        assert_eq!(rects, vec![Rect::new(0.0, 0.0, 500.0, 1080.0), Rect::new(500.0, 0.0, 500.0, 1080.0)]);
    }
}
