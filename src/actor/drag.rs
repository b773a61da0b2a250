//! Drag session state machine.
//!
//! A session starts when the drag modifier goes down over a focused window
//! and ends when the window is released into a zone, the drag is cancelled,
//! or the window disappears. The session owns a snapshot of the layout it
//! started with; preset switches during a drag take effect on the next one.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::common::config::{GapSettings, Settings};
use crate::common::error::ZoneError;
use crate::layout_engine::resolver::{self, ResolvedTarget};
use crate::model::geometry::{Point, Rect};
use crate::model::layout::Layout;
use crate::model::preset::PresetCollection;
use crate::sys::hotkey::{KeyCode, Modifiers};
use crate::sys::overlay::Overlay;
use crate::sys::window_system::{KeyEvent, PointerEvent, WindowId, WindowSystem};

#[derive(Debug, Clone, PartialEq)]
pub struct DragSettings {
    pub modifier: Modifiers,
    pub merge_tolerance: f64,
    pub jitter_threshold: f64,
    pub gaps: GapSettings,
}

impl Default for DragSettings {
    fn default() -> Self { Self::from(&Settings::default()) }
}

impl From<&Settings> for DragSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            modifier: settings.drag_modifier,
            merge_tolerance: settings.merge_tolerance,
            jitter_threshold: settings.jitter_threshold,
            gaps: settings.gaps.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub window: WindowId,
    pub layout: Arc<Layout>,
    pub work_area: Rect,
    /// Pixel rectangles of `layout` on `work_area`.
    pub zones: Vec<Rect>,
    /// Where the button went down, once it has.
    pub origin: Option<Point>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Armed(Session),
    Dragging {
        session: Session,
        target: ResolvedTarget,
    },
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    Escape,
    ModifierReleased,
    Requested,
    WindowGone,
}

/// How a drag that reached the dragging state ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    Snapped { window: WindowId, target: ResolvedTarget, frame: Rect },
    /// Released outside every zone; the window keeps its geometry.
    Released { window: WindowId },
    Cancelled { window: WindowId, reason: CancelReason },
    /// The window system refused the new geometry. Not retried.
    Failed { window: WindowId, reason: String },
}

impl DragOutcome {
    pub fn window(&self) -> WindowId {
        match self {
            DragOutcome::Snapped { window, .. }
            | DragOutcome::Released { window }
            | DragOutcome::Cancelled { window, .. }
            | DragOutcome::Failed { window, .. } => *window,
        }
    }

    pub fn error(&self) -> Option<ZoneError> {
        match self {
            DragOutcome::Failed { window, reason } => {
                Some(ZoneError::GeometryApplyFailed { window: *window, reason: reason.clone() })
            }
            DragOutcome::Cancelled { window, reason: CancelReason::WindowGone } => {
                Some(ZoneError::WindowGone(*window))
            }
            _ => None,
        }
    }
}

pub struct DragController {
    settings: DragSettings,
    state: DragState,
    modifiers: Modifiers,
    pointer: Point,
    button_down: bool,
}

impl DragController {
    pub fn new(settings: DragSettings) -> Self {
        Self {
            settings,
            state: DragState::Idle,
            modifiers: Modifiers::empty(),
            pointer: Point::ZERO,
            button_down: false,
        }
    }

    pub fn state(&self) -> &DragState { &self.state }

    pub fn is_idle(&self) -> bool { matches!(self.state, DragState::Idle) }

    fn modifier_held(&self) -> bool { self.modifiers.contains(self.settings.modifier) }

    pub fn handle_key(
        &mut self,
        event: KeyEvent,
        presets: &PresetCollection,
        ws: &mut dyn WindowSystem,
        overlay: &mut dyn Overlay,
    ) -> Option<DragOutcome> {
        self.modifiers = event.modifiers;

        if event.pressed && event.key == KeyCode::Escape {
            return self.cancel(overlay, CancelReason::Escape);
        }

        let held = self.modifier_held();
        if self.is_idle() {
            if held {
                self.arm(presets, &*ws);
            }
            None
        } else if held {
            None
        } else {
            self.cancel(overlay, CancelReason::ModifierReleased)
        }
    }

    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
        presets: &PresetCollection,
        ws: &mut dyn WindowSystem,
        overlay: &mut dyn Overlay,
    ) -> Option<DragOutcome> {
        let position = event.position();
        self.pointer = position;
        match event {
            PointerEvent::ButtonPressed(_) => {
                self.button_down = true;
                if let DragState::Armed(session) = &mut self.state {
                    session.origin = Some(position);
                } else if self.is_idle() && self.modifier_held() {
                    self.arm(presets, &*ws);
                }
                None
            }
            PointerEvent::Moved(_) => {
                self.pointer_moved(position, overlay);
                None
            }
            PointerEvent::ButtonReleased(_) => {
                self.button_down = false;
                if let DragState::Armed(session) = &mut self.state {
                    session.origin = None;
                    return None;
                }
                self.pointer_moved(position, overlay);
                let DragState::Dragging { session, target } = std::mem::take(&mut self.state)
                else {
                    return None;
                };
                Some(self.release(session, target, ws, overlay))
            }
        }
    }

    pub fn handle_window_destroyed(
        &mut self,
        window: WindowId,
        overlay: &mut dyn Overlay,
    ) -> Option<DragOutcome> {
        let affected = match &self.state {
            DragState::Idle => false,
            DragState::Armed(session) | DragState::Dragging { session, .. } => {
                session.window == window
            }
        };
        if affected {
            debug!(%window, "window destroyed during drag");
            self.cancel(overlay, CancelReason::WindowGone)
        } else {
            None
        }
    }

    /// Ends any session without touching the window. Returns an outcome only
    /// when a drag was actually in progress; calling it again is a no-op.
    pub fn cancel(&mut self, overlay: &mut dyn Overlay, reason: CancelReason) -> Option<DragOutcome> {
        match std::mem::take(&mut self.state) {
            DragState::Idle => None,
            DragState::Armed(session) => {
                trace!(window = %session.window, ?reason, "disarmed");
                None
            }
            DragState::Dragging { session, .. } => {
                overlay.hide();
                info!(window = %session.window, ?reason, "drag cancelled");
                Some(DragOutcome::Cancelled { window: session.window, reason })
            }
        }
    }

    fn arm(&mut self, presets: &PresetCollection, ws: &dyn WindowSystem) {
        let Some(window) = ws.active_window() else {
            trace!("drag modifier down with no active window");
            return;
        };
        let layout = presets.active();
        let work_area = ws.work_area(Some(window));
        if !layout.matches_aspect(&work_area) {
            debug!(
                layout = %layout.name,
                authored_for = ?layout.authored_for,
                ?work_area,
                "layout was authored for a different aspect ratio"
            );
        }
        let zones = layout.zone_rects(&work_area);
        let origin = self.button_down.then_some(self.pointer);
        debug!(%window, layout = %layout.name, "armed");
        self.state = DragState::Armed(Session { window, layout, work_area, zones, origin });
    }

    fn pointer_moved(&mut self, position: Point, overlay: &mut dyn Overlay) {
        let tolerance = self.settings.merge_tolerance;
        match &mut self.state {
            DragState::Idle => {}
            DragState::Armed(session) => {
                let Some(origin) = session.origin else { return };
                if !self.button_down || origin.distance_to(position) <= self.settings.jitter_threshold
                {
                    return;
                }
                let session = session.clone();
                overlay.show(&session.zones, session.work_area);
                let target = resolver::resolve(&session.zones, position, tolerance);
                if !target.is_none() {
                    overlay.update_highlight(&target);
                }
                debug!(window = %session.window, "dragging");
                self.state = DragState::Dragging { session, target };
            }
            DragState::Dragging { session, target } => {
                let next = resolver::resolve(&session.zones, position, tolerance);
                if next != *target {
                    trace!(?next, "target changed");
                    overlay.update_highlight(&next);
                    *target = next;
                }
            }
        }
    }

    fn release(
        &self,
        session: Session,
        target: ResolvedTarget,
        ws: &mut dyn WindowSystem,
        overlay: &mut dyn Overlay,
    ) -> DragOutcome {
        overlay.hide();
        let window = session.window;
        let Some(rect) = target.rect() else {
            debug!(%window, "released outside every zone");
            return DragOutcome::Released { window };
        };
        let frame = self.settings.gaps.apply(rect, session.work_area);
        match ws.set_window_geometry(window, frame) {
            Ok(()) => {
                info!(%window, ?frame, zones = ?target.indices(), "snapped");
                DragOutcome::Snapped { window, target, frame }
            }
            Err(ZoneError::WindowGone(_)) => {
                debug!(%window, "window vanished before it could be placed");
                DragOutcome::Cancelled { window, reason: CancelReason::WindowGone }
            }
            Err(e) => {
                warn!(%window, "failed to place window: {e}");
                DragOutcome::Failed {
                    window,
                    reason: match e {
                        ZoneError::GeometryApplyFailed { reason, .. } => reason,
                        other => other.to_string(),
                    },
                }
            }
        }
    }
}
