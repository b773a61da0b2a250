//! Persistent storage for the preset collection.
//!
//! The store is the only writer of the preset file. Writes go through a
//! temporary file in the same directory that is renamed over the target, so a
//! crash mid-write leaves the previous file intact and a concurrent `load`
//! sees either the old or the new collection, never a mix.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use super::layout::Layout;
use super::preset::PresetCollection;
use crate::actor::persister::Persister;
use crate::common::error::{Result, ZoneError};

pub fn load(path: &Path) -> Result<PresetCollection> {
    let buf = fs::read_to_string(path).map_err(|e| ZoneError::io(path, e))?;
    let presets: PresetCollection = ron::from_str(&buf).map_err(|e| {
        ZoneError::CorruptLayoutData { path: path.to_path_buf(), reason: e.to_string() }
    })?;
    presets.validate().map_err(|e| ZoneError::CorruptLayoutData {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(presets)
}

pub fn save(path: &Path, presets: &PresetCollection) -> Result<()> {
    let text = ron::ser::to_string_pretty(presets, ron::ser::PrettyConfig::default())
        .map_err(|e| ZoneError::io(path, std::io::Error::other(e)))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| ZoneError::io(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ZoneError::io(dir, e))?;
    tmp.write_all(text.as_bytes()).map_err(|e| ZoneError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| ZoneError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| ZoneError::io(path, e.error))?;
    Ok(())
}

pub struct LayoutStore {
    path: PathBuf,
    presets: PresetCollection,
    persister: Option<Persister>,
}

impl LayoutStore {
    /// Loads the preset file, substituting built-in layouts when it is
    /// missing or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let presets = match load(&path) {
            Ok(presets) => {
                debug!(?path, count = presets.len(), "loaded presets");
                presets
            }
            Err(ZoneError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                info!(?path, "no preset file yet, starting from templates");
                PresetCollection::templates()
            }
            Err(e) => {
                warn!("{e}; falling back to the default layout");
                PresetCollection::fallback()
            }
        };
        Self::with_presets(path, presets)
    }

    pub fn with_presets(path: impl Into<PathBuf>, presets: PresetCollection) -> Self {
        Self { path: path.into(), presets, persister: None }
    }

    /// Routes future commits through a background writer.
    pub fn attach_persister(&mut self, persister: Persister) { self.persister = Some(persister); }

    pub fn path(&self) -> &Path { &self.path }

    pub fn presets(&self) -> &PresetCollection { &self.presets }

    pub fn active_layout(&self) -> Arc<Layout> { self.presets.active() }

    pub fn set_active(&mut self, index: usize) -> Result<()> {
        self.presets.set_active(index)?;
        self.commit();
        Ok(())
    }

    pub fn edit_active<R>(&mut self, edit: impl FnOnce(&mut Layout) -> Result<R>) -> Result<R> {
        let out = self.presets.edit_active(edit)?;
        self.commit();
        Ok(out)
    }

    /// Adds `layout`, replacing any preset with the same name, and returns
    /// its position.
    pub fn upsert(&mut self, layout: Layout) -> Result<usize> {
        let index = self.presets.upsert(layout)?;
        self.commit();
        Ok(index)
    }

    /// Writes the collection synchronously.
    pub fn save(&self) -> Result<()> { save(&self.path, &self.presets) }

    /// Persists the current collection, in the background when a persister
    /// is attached. Failures are logged, never propagated.
    pub fn commit(&self) {
        match &self.persister {
            Some(persister) => persister.submit(self.presets.clone()),
            None => {
                if let Err(e) = self.save() {
                    warn!("failed to save presets: {e}");
                }
            }
        }
    }

    /// Re-reads the file after an external change and reports whether the
    /// collection changed. While one of our own writes is still queued the
    /// file is stale, so the change is ignored; the pending write wins. A
    /// corrupt file keeps the in-memory collection.
    pub fn reload(&mut self) -> Result<bool> {
        if self.persister.as_ref().is_some_and(Persister::is_pending) {
            trace!("own write pending, ignoring file change");
            return Ok(false);
        }
        let presets = load(&self.path)?;
        if presets == self.presets {
            return Ok(false);
        }
        info!(count = presets.len(), "reloaded presets");
        self.presets = presets;
        Ok(true)
    }

    pub fn flush(&self) {
        if let Some(persister) = &self.persister {
            persister.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use std::time::{Duration, Instant};

    use super::*;
    use crate::model::layout::Axis;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.ron");
        let mut presets = PresetCollection::templates();
        presets.set_active(3).unwrap();
        presets.edit_active(|l| l.divide(0, Axis::Horizontal, 0.5)).unwrap();

        save(&path, &presets).unwrap();
        assert_eq!(load(&path).unwrap(), presets);
    }

    #[test]
    fn save_leaves_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.ron");
        save(&path, &PresetCollection::templates()).unwrap();
        save(&path, &PresetCollection::fallback()).unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn malformed_data_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.ron");
        fs::write(&path, "(layouts: [, active: nope").unwrap();
        assert!(matches!(load(&path), Err(ZoneError::CorruptLayoutData { .. })));
    }

    #[test]
    fn semantically_invalid_data_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.ron");
        let presets = PresetCollection::new(vec![Layout::grid("a", 1, 1)], 0).unwrap();
        save(&path, &presets).unwrap();
        let text = fs::read_to_string(&path).unwrap().replace("active: 0", "active: 7");
        fs::write(&path, text).unwrap();
        assert!(matches!(load(&path), Err(ZoneError::CorruptLayoutData { .. })));
    }

    #[test]
    fn open_falls_back_on_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.ron");
        fs::write(&path, "garbage").unwrap();
        let store = LayoutStore::open(&path);
        assert_eq!(store.presets(), &PresetCollection::fallback());
        // The broken file is not overwritten until something is committed.
        assert_eq!(fs::read_to_string(&path).unwrap(), "garbage");
    }

    #[test]
    fn open_uses_templates_on_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = LayoutStore::open(dir.path().join("missing.ron"));
        assert_eq!(store.presets(), &PresetCollection::templates());
    }

    #[test]
    fn set_active_commits_and_rejects_bad_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.ron");
        let mut store = LayoutStore::with_presets(&path, PresetCollection::templates());
        store.set_active(1).unwrap();
        assert_eq!(load(&path).unwrap().active_index(), 1);

        assert!(matches!(store.set_active(9), Err(ZoneError::IndexOutOfRange { .. })));
        assert_eq!(store.presets().active_index(), 1);
        assert_eq!(store.active_layout().name, "thirds");
    }

    #[test]
    fn reload_keeps_state_when_file_is_broken() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.ron");
        let mut store = LayoutStore::with_presets(&path, PresetCollection::templates());
        store.save().unwrap();

        let mut other = PresetCollection::templates();
        other.set_active(2).unwrap();
        save(&path, &other).unwrap();
        assert!(store.reload().unwrap());
        assert!(!store.reload().unwrap());
        assert_eq!(store.presets().active_index(), 2);

        fs::write(&path, "(").unwrap();
        assert!(store.reload().is_err());
        assert_eq!(store.presets().active_index(), 2);
    }

    #[test]
    fn failed_save_leaves_existing_data_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.ron");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "old").unwrap();

        assert!(matches!(
            save(&path, &PresetCollection::templates()),
            Err(ZoneError::Io { .. })
        ));
        assert!(path.is_dir());
        assert_eq!(fs::read_to_string(path.join("keep")).unwrap(), "old");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn reload_does_not_wait_for_pending_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.ron");
        let mut store = LayoutStore::with_presets(&path, PresetCollection::templates());
        store.attach_persister(Persister::spawn(path.clone(), Duration::from_secs(60)).unwrap());
        store.set_active(1).unwrap();

        let mut other = PresetCollection::templates();
        other.set_active(3).unwrap();
        save(&path, &other).unwrap();
        let started = Instant::now();
        assert!(!store.reload().unwrap());
        assert!(started.elapsed() < Duration::from_secs(30));
        assert_eq!(store.presets().active_index(), 1);

        store.flush();
        assert!(!store.reload().unwrap());
        assert_eq!(load(&path).unwrap().active_index(), 1);

        save(&path, &other).unwrap();
        assert!(store.reload().unwrap());
        assert_eq!(store.presets().active_index(), 3);
    }

    #[test]
    fn upsert_adds_and_replaces_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.ron");
        let mut store = LayoutStore::with_presets(&path, PresetCollection::templates());
        let index = store.upsert(Layout::grid("mine", 3, 2)).unwrap();
        assert_eq!(index, 4);
        assert_eq!(store.upsert(Layout::grid("mine", 1, 1)).unwrap(), 4);
        let saved = load(&path).unwrap();
        assert_eq!(saved.len(), 5);
        assert_eq!(saved.get(4).unwrap().zones.len(), 1);
    }
}
