//! The boundary between zone management and the desktop's window system.
//!
//! Everything that talks to X11, Wayland compositors or a test double sits
//! behind [`WindowSystem`]. Event sources are push-based: the window system
//! calls the registered sink from whatever thread it reads events on, and the
//! sink forwards them into the reactor's channel.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::hotkey::{KeyCode, Modifiers};
use crate::common::error::Result;
use crate::model::geometry::{Point, Rect};

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:#x}", self.0) }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WindowInfo {
    pub id: WindowId,
    pub title: String,
    pub frame: Rect,
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PointerEvent {
    Moved(Point),
    ButtonPressed(Point),
    ButtonReleased(Point),
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match *self {
            PointerEvent::Moved(p) | PointerEvent::ButtonPressed(p) | PointerEvent::ButtonReleased(p) => p,
        }
    }
}

/// A key transition. `modifiers` is the modifier state after the transition,
/// so releasing Alt reports a state without `ALT`.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub pressed: bool,
    pub modifiers: Modifiers,
}

/// Lifecycle changes of top-level windows.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WindowEvent {
    Destroyed(WindowId),
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Subscription(pub u64);

pub type EventSink<E> = Box<dyn FnMut(E) + Send>;

pub trait WindowSystem {
    fn list_windows(&self) -> Vec<WindowInfo>;

    /// The window that currently has input focus.
    fn active_window(&self) -> Option<WindowId>;

    /// Fails with `WindowGone` if the window no longer exists.
    fn window_geometry(&self, window: WindowId) -> Result<Rect>;

    fn set_window_geometry(&mut self, window: WindowId, frame: Rect) -> Result<()>;

    /// Usable area of the monitor showing `window` (or the primary monitor),
    /// excluding panels and docks.
    fn work_area(&self, window: Option<WindowId>) -> Rect;

    fn subscribe_pointer_events(&mut self, sink: EventSink<PointerEvent>) -> Subscription;

    fn subscribe_key_events(&mut self, sink: EventSink<KeyEvent>) -> Subscription;

    fn subscribe_window_events(&mut self, sink: EventSink<WindowEvent>) -> Subscription;

    /// Unknown subscriptions are ignored.
    fn unsubscribe(&mut self, subscription: Subscription);
}
