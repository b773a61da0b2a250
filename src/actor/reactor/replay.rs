use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{Backend, Event, Reactor};
use crate::actor::drag::DragOutcome;
use crate::actor::{self};
use crate::common::config::{Config, Settings};
use crate::model::geometry::Rect;
use crate::model::preset::PresetCollection;
use crate::model::store::LayoutStore;
use crate::sys::headless::{HeadlessHotkeys, HeadlessOverlay, HeadlessWindowSystem};
use crate::sys::window_system::{WindowId, WindowInfo, WindowSystem};

/// First line of a recording: everything needed to rebuild the reactor.
#[derive(Serialize, Deserialize)]
struct Header {
    settings: Settings,
    presets: PresetCollection,
    work_area: Rect,
    windows: Vec<WindowInfo>,
}

/// One line per handled event.
#[derive(Serialize, Deserialize)]
struct Entry {
    active_window: Option<WindowId>,
    event: Event,
}

/// Writes the events the reactor handles to a JSON-lines file so a session
/// can be replayed without a desktop.
pub struct Record {
    file: Option<BufWriter<File>>,
}

impl Record {
    pub fn new(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => Some(BufWriter::new(
                File::create(path).with_context(|| format!("creating {}", path.display()))?,
            )),
            None => None,
        };
        Ok(Record { file })
    }

    pub fn is_enabled(&self) -> bool { self.file.is_some() }

    pub(super) fn start(
        &mut self,
        settings: &Settings,
        presets: &PresetCollection,
        ws: &dyn WindowSystem,
    ) {
        let header = Header {
            settings: settings.clone(),
            presets: presets.clone(),
            work_area: ws.work_area(ws.active_window()),
            windows: ws.list_windows(),
        };
        self.write_line(&header);
    }

    pub(super) fn on_event(&mut self, event: &Event, active_window: Option<WindowId>) {
        self.write_line(&Entry { active_window, event: event.clone() });
    }

    fn write_line(&mut self, value: &impl Serialize) {
        let Some(file) = &mut self.file else { return };
        let result = serde_json::to_writer(&mut *file, value)
            .map_err(std::io::Error::from)
            .and_then(|()| file.write_all(b"\n"))
            .and_then(|()| file.flush());
        if let Err(e) = result {
            warn!("stopped recording: {e}");
            self.file = None;
        }
    }
}

/// Runs a recorded session against headless collaborators and returns the
/// drag outcomes in the order they happened.
///
/// The recording's presets are loaded into a scratch store, so replaying
/// never touches the user's preset file.
pub fn replay(path: &Path) -> anyhow::Result<Vec<DragOutcome>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();
    let Some(header) = lines.next() else {
        bail!("{} is empty", path.display());
    };
    let header: Header = serde_json::from_str(&header?).context("reading recording header")?;

    let ws = HeadlessWindowSystem::new(header.work_area);
    for window in header.windows {
        ws.add_window(window.id, window.title, window.frame);
    }
    let scratch = tempfile::tempdir()?;
    let store = LayoutStore::with_presets(scratch.path().join("presets.ron"), header.presets);
    let config = Config { settings: header.settings, keys: Vec::new() };
    let backend = Backend {
        window_system: Box::new(ws.clone()),
        overlay: Box::new(HeadlessOverlay::new()),
        hotkeys: Box::new(HeadlessHotkeys::new()),
    };
    let (events_tx, _events) = actor::channel();
    let mut reactor = Reactor::new(&config, store, backend, events_tx, Record::new(None)?);

    let mut outcomes = Vec::new();
    for (n, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: Entry =
            serde_json::from_str(&line).with_context(|| format!("reading event {}", n + 1))?;
        if let Event::WindowDestroyed(window) = entry.event {
            ws.close_window(window);
        }
        ws.focus(entry.active_window);
        outcomes.extend(reactor.handle_event(entry.event));
        if reactor.is_stopped() {
            break;
        }
    }
    reactor.shutdown();
    info!(outcomes = outcomes.len(), "replay finished");
    Ok(outcomes)
}
