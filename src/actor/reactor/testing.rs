use std::path::Path;

use tempfile::TempDir;

use super::{Backend, Event, Reactor, Receiver, Record};
use crate::actor::drag::DragOutcome;
use crate::actor::{self};
use crate::common::config::Config;
use crate::model::geometry::{Point, Rect};
use crate::model::preset::PresetCollection;
use crate::model::store::LayoutStore;
use crate::sys::headless::{HeadlessHotkeys, HeadlessOverlay, HeadlessWindowSystem};
use crate::sys::hotkey::{KeyCode, Modifiers};
use crate::sys::window_system::{KeyEvent, PointerEvent, WindowId};

pub const WINDOW: WindowId = WindowId(1);

/// A reactor wired to headless collaborators, plus handles to inspect them.
pub struct Harness {
    pub reactor: Reactor,
    pub events: Receiver,
    pub config: Config,
    pub ws: HeadlessWindowSystem,
    pub overlay: HeadlessOverlay,
    pub hotkeys: HeadlessHotkeys,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self { Self::build(Record::new(None).unwrap()) }

    pub fn recording(path: &Path) -> Self { Self::build(Record::new(Some(path)).unwrap()) }

    fn build(record: Record) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let ws = HeadlessWindowSystem::new(Rect::new(0.0, 0.0, 1000.0, 1080.0));
        ws.add_window(WINDOW, "editor", Rect::new(100.0, 100.0, 300.0, 300.0));
        let overlay = HeadlessOverlay::new();
        let hotkeys = HeadlessHotkeys::new();
        let store =
            LayoutStore::with_presets(dir.path().join("presets.ron"), PresetCollection::templates());
        let backend = Backend {
            window_system: Box::new(ws.clone()),
            overlay: Box::new(overlay.clone()),
            hotkeys: Box::new(hotkeys.clone()),
        };
        let (events_tx, events) = actor::channel();
        let reactor = Reactor::new(&config, store, backend, events_tx, record);
        Harness { reactor, events, config, ws, overlay, hotkeys, dir }
    }

    pub fn handle_events(&mut self, events: impl IntoIterator<Item = Event>) -> Vec<DragOutcome> {
        events.into_iter().filter_map(|event| self.reactor.handle_event(event)).collect()
    }

    /// Handles whatever the reactor's own callbacks have queued.
    pub fn pump(&mut self) -> Vec<DragOutcome> {
        let mut outcomes = Vec::new();
        while let Ok((_, event)) = self.events.try_recv() {
            outcomes.extend(self.reactor.handle_event(event));
        }
        outcomes
    }
}

pub fn modifier_key(down: bool) -> KeyEvent {
    KeyEvent {
        key: KeyCode::SuperLeft,
        pressed: down,
        modifiers: if down { Modifiers::SUPER } else { Modifiers::empty() },
    }
}

/// Holds the drag modifier, presses at `from`, moves to `to` and releases.
pub fn drag_gesture(from: Point, to: Point) -> Vec<Event> {
    vec![
        Event::Key(modifier_key(true)),
        Event::Pointer(PointerEvent::ButtonPressed(from)),
        Event::Pointer(PointerEvent::Moved(to)),
        Event::Pointer(PointerEvent::ButtonReleased(to)),
    ]
}
