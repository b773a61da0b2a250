use crate::layout_engine::resolver::ResolvedTarget;
use crate::model::geometry::Rect;

/// The translucent zone preview drawn while a drag is in progress.
///
/// Implementations only draw; they never decide what is highlighted.
pub trait Overlay {
    fn show(&mut self, zones: &[Rect], monitor_bounds: Rect);

    fn update_highlight(&mut self, target: &ResolvedTarget);

    /// Hiding an overlay that is not shown is a no-op.
    fn hide(&mut self);
}
