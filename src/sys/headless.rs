//! In-memory window system, overlay and hotkey registrar.
//!
//! Used when there is no desktop to talk to: replaying recorded sessions,
//! dry runs from the command line, and tests. Each type is a cheap handle
//! around shared state, so a clone kept by the caller can drive events and
//! inspect what the reactor did.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::hotkey::{Hotkey, HotkeyCallback, HotkeyRegistrar, Registration};
use super::overlay::Overlay;
use super::window_system::{
    EventSink, KeyEvent, PointerEvent, Subscription, WindowEvent, WindowId, WindowInfo,
    WindowSystem,
};
use crate::common::error::{Result, ZoneError};
use crate::layout_engine::resolver::ResolvedTarget;
use crate::model::geometry::Rect;

struct WindowState {
    windows: BTreeMap<WindowId, WindowInfo>,
    active: Option<WindowId>,
    work_area: Rect,
    reject_geometry: bool,
    geometry_calls: Vec<(WindowId, Rect)>,
    pointer_sinks: Vec<(Subscription, EventSink<PointerEvent>)>,
    key_sinks: Vec<(Subscription, EventSink<KeyEvent>)>,
    window_sinks: Vec<(Subscription, EventSink<WindowEvent>)>,
    next_subscription: u64,
}

#[derive(Clone)]
pub struct HeadlessWindowSystem(Arc<Mutex<WindowState>>);

impl HeadlessWindowSystem {
    pub fn new(work_area: Rect) -> Self {
        Self(Arc::new(Mutex::new(WindowState {
            windows: BTreeMap::new(),
            active: None,
            work_area,
            reject_geometry: false,
            geometry_calls: Vec::new(),
            pointer_sinks: Vec::new(),
            key_sinks: Vec::new(),
            window_sinks: Vec::new(),
            next_subscription: 1,
        })))
    }

    /// Adds a window and focuses it.
    pub fn add_window(&self, id: WindowId, title: impl Into<String>, frame: Rect) {
        let mut state = self.0.lock();
        state.windows.insert(id, WindowInfo { id, title: title.into(), frame });
        state.active = Some(id);
    }

    /// Removes the window and tells window-event subscribers it is gone.
    pub fn close_window(&self, id: WindowId) {
        let mut state = self.0.lock();
        if state.active == Some(id) {
            state.active = None;
        }
        if state.windows.remove(&id).is_none() {
            return;
        }
        debug!(window = %id, "window closed");
        for (_, sink) in &mut state.window_sinks {
            sink(WindowEvent::Destroyed(id));
        }
    }

    pub fn focus(&self, id: Option<WindowId>) { self.0.lock().active = id; }

    /// Makes every subsequent `set_window_geometry` fail.
    pub fn reject_geometry(&self, reject: bool) { self.0.lock().reject_geometry = reject; }

    pub fn geometry_calls(&self) -> Vec<(WindowId, Rect)> { self.0.lock().geometry_calls.clone() }

    pub fn subscriber_count(&self) -> usize {
        let state = self.0.lock();
        state.pointer_sinks.len() + state.key_sinks.len() + state.window_sinks.len()
    }

    pub fn emit_pointer(&self, event: PointerEvent) {
        for (_, sink) in &mut self.0.lock().pointer_sinks {
            sink(event);
        }
    }

    pub fn emit_key(&self, event: KeyEvent) {
        for (_, sink) in &mut self.0.lock().key_sinks {
            sink(event);
        }
    }
}

impl WindowSystem for HeadlessWindowSystem {
    fn list_windows(&self) -> Vec<WindowInfo> { self.0.lock().windows.values().cloned().collect() }

    fn active_window(&self) -> Option<WindowId> { self.0.lock().active }

    fn window_geometry(&self, window: WindowId) -> Result<Rect> {
        self.0.lock().windows.get(&window).map(|w| w.frame).ok_or(ZoneError::WindowGone(window))
    }

    fn set_window_geometry(&mut self, window: WindowId, frame: Rect) -> Result<()> {
        let mut state = self.0.lock();
        state.geometry_calls.push((window, frame));
        if state.reject_geometry {
            return Err(ZoneError::GeometryApplyFailed {
                window,
                reason: "rejected by window system".to_string(),
            });
        }
        let info = state.windows.get_mut(&window).ok_or(ZoneError::WindowGone(window))?;
        debug!(%window, ?frame, "moved window");
        info.frame = frame;
        Ok(())
    }

    fn work_area(&self, _window: Option<WindowId>) -> Rect { self.0.lock().work_area }

    fn subscribe_pointer_events(&mut self, sink: EventSink<PointerEvent>) -> Subscription {
        let mut state = self.0.lock();
        let sub = Subscription(state.next_subscription);
        state.next_subscription += 1;
        state.pointer_sinks.push((sub, sink));
        sub
    }

    fn subscribe_key_events(&mut self, sink: EventSink<KeyEvent>) -> Subscription {
        let mut state = self.0.lock();
        let sub = Subscription(state.next_subscription);
        state.next_subscription += 1;
        state.key_sinks.push((sub, sink));
        sub
    }

    fn subscribe_window_events(&mut self, sink: EventSink<WindowEvent>) -> Subscription {
        let mut state = self.0.lock();
        let sub = Subscription(state.next_subscription);
        state.next_subscription += 1;
        state.window_sinks.push((sub, sink));
        sub
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        let mut state = self.0.lock();
        state.pointer_sinks.retain(|(s, _)| *s != subscription);
        state.key_sinks.retain(|(s, _)| *s != subscription);
        state.window_sinks.retain(|(s, _)| *s != subscription);
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OverlayCall {
    Show { zones: Vec<Rect>, monitor_bounds: Rect },
    Highlight(ResolvedTarget),
    Hide,
}

#[derive(Default)]
struct OverlayState {
    visible: bool,
    calls: Vec<OverlayCall>,
}

#[derive(Clone, Default)]
pub struct HeadlessOverlay(Arc<Mutex<OverlayState>>);

impl HeadlessOverlay {
    pub fn new() -> Self { Self::default() }

    pub fn is_visible(&self) -> bool { self.0.lock().visible }

    pub fn calls(&self) -> Vec<OverlayCall> { self.0.lock().calls.clone() }
}

impl Overlay for HeadlessOverlay {
    fn show(&mut self, zones: &[Rect], monitor_bounds: Rect) {
        trace!(zones = zones.len(), "overlay shown");
        let mut state = self.0.lock();
        state.visible = true;
        state.calls.push(OverlayCall::Show { zones: zones.to_vec(), monitor_bounds });
    }

    fn update_highlight(&mut self, target: &ResolvedTarget) {
        trace!(?target, "overlay highlight");
        self.0.lock().calls.push(OverlayCall::Highlight(target.clone()));
    }

    fn hide(&mut self) {
        let mut state = self.0.lock();
        if state.visible {
            trace!("overlay hidden");
            state.visible = false;
            state.calls.push(OverlayCall::Hide);
        }
    }
}

#[derive(Default)]
struct HotkeyState {
    next: u64,
    registered: Vec<(Registration, Hotkey, HotkeyCallback)>,
}

#[derive(Clone, Default)]
pub struct HeadlessHotkeys(Arc<Mutex<HotkeyState>>);

impl HeadlessHotkeys {
    pub fn new() -> Self { Self::default() }

    pub fn registered(&self) -> Vec<Hotkey> {
        self.0.lock().registered.iter().map(|(_, h, _)| h.clone()).collect()
    }

    /// Fires the callbacks bound to `hotkey`. Returns whether any were bound.
    pub fn press(&self, hotkey: &Hotkey) -> bool {
        let mut fired = false;
        for (_, bound, callback) in &mut self.0.lock().registered {
            if *bound == *hotkey {
                callback();
                fired = true;
            }
        }
        fired
    }
}

impl HotkeyRegistrar for HeadlessHotkeys {
    fn register(
        &mut self,
        hotkey: &Hotkey,
        callback: HotkeyCallback,
    ) -> anyhow::Result<Registration> {
        let mut state = self.0.lock();
        if state.registered.iter().any(|(_, h, _)| h == hotkey) {
            anyhow::bail!("{hotkey} is already registered");
        }
        state.next += 1;
        let registration = Registration(state.next);
        debug!(%hotkey, ?registration, "registered hotkey");
        state.registered.push((registration, hotkey.clone(), callback));
        Ok(registration)
    }

    fn unregister(&mut self, registration: Registration) {
        self.0.lock().registered.retain(|(r, _, _)| *r != registration);
    }
}
