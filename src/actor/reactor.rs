//! The reactor ties input events to zone behaviour.
//!
//! Pointer and key events from the window system, hotkey commands and file
//! change notifications all arrive on one channel and are handled strictly in
//! order on the reactor thread. The reactor owns the drag session and the
//! preset store, so neither needs locking.

mod replay;

#[cfg(test)]
mod testing;

use std::thread::{self, JoinHandle};

pub use replay::{Record, replay};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};

use crate::actor::drag::{CancelReason, DragController, DragOutcome, DragSettings};
use crate::actor::preset_switcher::{PresetSwitcher, SwitchOutcome};
use crate::actor::{self};
use crate::common::config::Config;
use crate::model::store::LayoutStore;
use crate::sys::hotkey::{Hotkey, HotkeyRegistrar, Registration};
use crate::sys::overlay::Overlay;
use crate::sys::window_system::{
    KeyEvent, PointerEvent, Subscription, WindowEvent, WindowId, WindowSystem,
};

pub type Sender = actor::Sender<Event>;
pub type Receiver = actor::Receiver<Event>;

/// Actions that can be bound to hotkeys in the `[keys]` table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    NextPreset,
    PreviousPreset,
    /// 0-based position in the preset collection.
    SelectPreset(usize),
    SelectPresetNamed(String),
    CancelDrag,
    ReloadPresets,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    Pointer(PointerEvent),
    Key(KeyEvent),
    WindowDestroyed(WindowId),
    Command(Command),
    /// The preset file changed on disk.
    PresetsChanged,
    Shutdown,
}

/// The desktop-facing collaborators the reactor drives.
pub struct Backend {
    pub window_system: Box<dyn WindowSystem + Send>,
    pub overlay: Box<dyn Overlay + Send>,
    pub hotkeys: Box<dyn HotkeyRegistrar + Send>,
}

pub struct Reactor {
    keys: Vec<(Hotkey, Command)>,
    drag: DragController,
    switcher: PresetSwitcher,
    window_system: Box<dyn WindowSystem + Send>,
    overlay: Box<dyn Overlay + Send>,
    hotkeys: Box<dyn HotkeyRegistrar + Send>,
    registrations: Vec<Registration>,
    subscriptions: Vec<Subscription>,
    events_tx: Sender,
    record: Record,
    stopped: bool,
}

impl Reactor {
    /// Starts the reactor on its own thread and returns the sender for its
    /// events.
    pub fn spawn(
        config: Config,
        store: LayoutStore,
        backend: Backend,
        record: Record,
    ) -> std::io::Result<(Sender, JoinHandle<()>)> {
        let (events_tx, events) = actor::channel();
        let events_tx_clone = events_tx.clone();
        let handle = thread::Builder::new().name("reactor".to_string()).spawn(move || {
            let mut reactor = Reactor::new(&config, store, backend, events_tx_clone, record);
            if let Err(e) = reactor.start() {
                warn!("reactor failed to start: {e:#}");
                reactor.shutdown();
                return;
            }
            match tokio::runtime::Builder::new_current_thread().build() {
                Ok(rt) => rt.block_on(reactor.run(events)),
                Err(e) => {
                    warn!("could not build reactor runtime: {e}");
                    reactor.shutdown();
                }
            }
        })?;
        Ok((events_tx, handle))
    }

    pub fn new(
        config: &Config,
        store: LayoutStore,
        backend: Backend,
        events_tx: Sender,
        mut record: Record,
    ) -> Reactor {
        record.start(&config.settings, store.presets(), &*backend.window_system);
        Reactor {
            keys: config.keys.clone(),
            drag: DragController::new(DragSettings::from(&config.settings)),
            switcher: PresetSwitcher::new(store),
            window_system: backend.window_system,
            overlay: backend.overlay,
            hotkeys: backend.hotkeys,
            registrations: Vec::new(),
            subscriptions: Vec::new(),
            events_tx,
            record,
            stopped: false,
        }
    }

    /// Registers the configured hotkeys and subscribes to input. A hotkey
    /// that cannot be registered is skipped with a warning.
    pub fn start(&mut self) -> anyhow::Result<()> {
        for (hotkey, command) in &self.keys {
            let tx = self.events_tx.clone();
            let command_clone = command.clone();
            let callback = Box::new(move || tx.send(Event::Command(command_clone.clone())));
            match self.hotkeys.register(hotkey, callback) {
                Ok(registration) => self.registrations.push(registration),
                Err(e) => warn!(%hotkey, "could not register hotkey: {e:#}"),
            }
        }

        let tx = self.events_tx.clone();
        self.subscriptions.push(
            self.window_system.subscribe_pointer_events(Box::new(move |e| tx.send(Event::Pointer(e)))),
        );
        let tx = self.events_tx.clone();
        self.subscriptions
            .push(self.window_system.subscribe_key_events(Box::new(move |e| tx.send(Event::Key(e)))));
        let tx = self.events_tx.clone();
        self.subscriptions.push(self.window_system.subscribe_window_events(Box::new(
            move |e| match e {
                WindowEvent::Destroyed(window) => tx.send(Event::WindowDestroyed(window)),
            },
        )));

        info!(hotkeys = self.registrations.len(), "reactor started");
        Ok(())
    }

    pub async fn run(mut self, mut events: Receiver) {
        while let Some((span, event)) = events.recv().await {
            let _guard = span.enter();
            self.handle_event(event);
            if self.stopped {
                break;
            }
        }
        self.shutdown();
    }

    /// Unregisters everything `start` set up, ends any drag and flushes the
    /// store. Safe to call more than once.
    pub fn shutdown(&mut self) {
        for registration in self.registrations.drain(..) {
            self.hotkeys.unregister(registration);
        }
        for subscription in self.subscriptions.drain(..) {
            self.window_system.unsubscribe(subscription);
        }
        self.drag.cancel(&mut *self.overlay, CancelReason::Requested);
        if !self.stopped {
            self.switcher.store().flush();
            self.stopped = true;
            info!("reactor stopped");
        }
    }

    pub fn is_stopped(&self) -> bool { self.stopped }

    pub fn store(&self) -> &LayoutStore { self.switcher.store() }

    pub fn drag(&self) -> &DragController { &self.drag }

    fn log_event(&self, event: &Event) {
        match event {
            Event::Pointer(PointerEvent::Moved(_)) => trace!(?event, "Event"),
            _ => debug!(?event, "Event"),
        }
    }

    /// Handles one event and returns how a drag ended, if it did.
    #[instrument(name = "reactor::handle_event", skip(self), fields(event = ?event))]
    pub fn handle_event(&mut self, event: Event) -> Option<DragOutcome> {
        self.log_event(&event);
        if self.record.is_enabled() {
            self.record.on_event(&event, self.window_system.active_window());
        }
        let presets = self.switcher.store().presets();
        match event {
            Event::Pointer(e) => {
                self.drag.handle_pointer(e, presets, &mut *self.window_system, &mut *self.overlay)
            }
            Event::Key(e) => {
                self.drag.handle_key(e, presets, &mut *self.window_system, &mut *self.overlay)
            }
            Event::WindowDestroyed(window) => {
                self.drag.handle_window_destroyed(window, &mut *self.overlay)
            }
            Event::Command(command) => self.handle_command(command),
            Event::PresetsChanged => {
                self.reload_presets();
                None
            }
            Event::Shutdown => {
                self.shutdown();
                None
            }
        }
    }

    fn handle_command(&mut self, command: Command) -> Option<DragOutcome> {
        let outcome = match command {
            Command::NextPreset => self.switcher.cycle_next(),
            Command::PreviousPreset => self.switcher.cycle_previous(),
            Command::SelectPreset(n) => self.switcher.select_by_shortcut_index(n),
            Command::SelectPresetNamed(name) => self.switcher.select_by_name(&name),
            Command::CancelDrag => {
                return self.drag.cancel(&mut *self.overlay, CancelReason::Requested);
            }
            Command::ReloadPresets => {
                self.reload_presets();
                return None;
            }
        };
        if outcome == SwitchOutcome::NoOp {
            trace!("preset unchanged");
        }
        None
    }

    fn reload_presets(&mut self) {
        match self.switcher.store_mut().reload() {
            Ok(true) => info!("presets changed on disk"),
            Ok(false) => trace!("preset file matches memory"),
            Err(e) => warn!("ignoring unreadable preset file: {e}"),
        }
    }
}
