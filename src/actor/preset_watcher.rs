use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config as NotifyConfig, Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::actor::reactor::{self, Event as ReactorEvent};

/// Polls the preset file and tells the reactor when it changes.
///
/// The parent directory is watched rather than the file itself so that a
/// file which does not exist yet, or one replaced by an atomic rename, is
/// still picked up. Dropping the watcher stops it.
pub struct PresetWatcher {
    _watcher: PollWatcher,
}

impl PresetWatcher {
    pub fn spawn(file: PathBuf, events_tx: reactor::Sender, poll: Duration) -> notify::Result<Self> {
        let dir = match file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(notify::Error::io)?;

        let watched = file.clone();
        let mut watcher = PollWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_relevant(&watched, &event) => {
                    debug!("change detected: {:?}", event.kind);
                    events_tx.send(ReactorEvent::PresetsChanged);
                }
                Ok(event) => debug!("ignoring unrelated event: {:?}", event.kind),
                Err(e) => warn!("watch error: {e:?}"),
            },
            NotifyConfig::default().with_poll_interval(poll).with_compare_contents(true),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        info!("watching {:?}", file);

        Ok(PresetWatcher { _watcher: watcher })
    }
}

fn is_relevant(file: &Path, event: &Event) -> bool {
    match event.kind {
        EventKind::Modify(_) | EventKind::Create(_) => event
            .paths
            .iter()
            .any(|p| p == file || (p.file_name().is_some() && p.file_name() == file.file_name())),
        _ => false,
    }
}
