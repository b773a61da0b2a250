use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::layout::{self, Layout};
use crate::common::error::{Result, ZoneError};

/// The ordered set of saved layouts and which of them is active.
///
/// Layouts are shared behind `Arc` so a drag session can hold on to the
/// layout it started with while the collection is edited.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PresetCollection {
    layouts: Vec<Arc<Layout>>,
    active: usize,
}

impl PresetCollection {
    pub fn new(layouts: Vec<Layout>, active: usize) -> Result<Self> {
        let collection = Self {
            layouts: layouts.into_iter().map(Arc::new).collect(),
            active,
        };
        collection.validate()?;
        Ok(collection)
    }

    /// Fallback used when persisted data cannot be read.
    pub fn fallback() -> Self {
        Self {
            layouts: vec![Arc::new(Layout::grid("default", 1, 1))],
            active: 0,
        }
    }

    pub fn templates() -> Self {
        Self {
            layouts: layout::templates().into_iter().map(Arc::new).collect(),
            active: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.layouts.is_empty() {
            return Err(ZoneError::IndexOutOfRange { index: self.active, len: 0 });
        }
        if self.active >= self.layouts.len() {
            return Err(ZoneError::IndexOutOfRange {
                index: self.active,
                len: self.layouts.len(),
            });
        }
        for layout in &self.layouts {
            layout.validate()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize { self.layouts.len() }

    pub fn is_empty(&self) -> bool { self.layouts.is_empty() }

    pub fn active_index(&self) -> usize { self.active }

    pub fn active(&self) -> Arc<Layout> { Arc::clone(&self.layouts[self.active]) }

    pub fn get(&self, index: usize) -> Option<&Arc<Layout>> { self.layouts.get(index) }

    pub fn iter(&self) -> impl Iterator<Item = &Layout> { self.layouts.iter().map(|l| &**l) }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.layouts.iter().position(|l| l.name == name)
    }

    /// Rejects out-of-range indices and leaves the active layout unchanged.
    pub fn set_active(&mut self, index: usize) -> Result<()> {
        if index >= self.layouts.len() {
            return Err(ZoneError::IndexOutOfRange { index, len: self.layouts.len() });
        }
        self.active = index;
        Ok(())
    }

    pub fn next_index(&self) -> usize { (self.active + 1) % self.layouts.len() }

    pub fn previous_index(&self) -> usize {
        (self.active + self.layouts.len() - 1) % self.layouts.len()
    }

    /// Applies `edit` to the active layout. Snapshots handed out earlier keep
    /// seeing the old layout. The edit is discarded if it leaves the layout
    /// invalid.
    pub fn edit_active<R>(&mut self, edit: impl FnOnce(&mut Layout) -> Result<R>) -> Result<R> {
        let mut draft = (*self.layouts[self.active]).clone();
        let out = edit(&mut draft)?;
        draft.validate()?;
        self.layouts[self.active] = Arc::new(draft);
        Ok(out)
    }

    /// Appends a layout, replacing any existing layout with the same name.
    pub fn upsert(&mut self, layout: Layout) -> Result<usize> {
        layout.validate()?;
        let layout = Arc::new(layout);
        match self.position_of(&layout.name) {
            Some(index) => {
                self.layouts[index] = layout;
                Ok(index)
            }
            None => {
                self.layouts.push(layout);
                Ok(self.layouts.len() - 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::layout::Axis;

    fn three() -> PresetCollection {
        PresetCollection::new(
            vec![Layout::grid("a", 1, 1), Layout::grid("b", 2, 1), Layout::grid("c", 2, 2)],
            0,
        )
        .unwrap()
    }

    #[test]
    fn set_active_rejects_out_of_range() {
        let mut presets = three();
        presets.set_active(2).unwrap();
        assert!(matches!(
            presets.set_active(3),
            Err(ZoneError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert_eq!(presets.active_index(), 2);
    }

    #[test]
    fn next_and_previous_wrap() {
        let mut presets = three();
        assert_eq!(presets.previous_index(), 2);
        presets.set_active(2).unwrap();
        assert_eq!(presets.next_index(), 0);
    }

    #[test]
    fn edits_do_not_touch_existing_snapshots() {
        let mut presets = three();
        let before = presets.active();
        presets.edit_active(|layout| layout.divide(0, Axis::Vertical, 0.5)).unwrap();
        assert_eq!(before.zones.len(), 1);
        assert_eq!(presets.active().zones.len(), 2);
    }

    #[test]
    fn invalid_edits_are_discarded() {
        let mut presets = three();
        let result = presets.edit_active(|layout| {
            layout.zones[0].rect.width = 2.0;
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(presets.active().zones[0].rect.width, 1.0);
    }

    #[test]
    fn construction_validates() {
        assert!(PresetCollection::new(vec![], 0).is_err());
        assert!(PresetCollection::new(vec![Layout::grid("a", 1, 1)], 1).is_err());
    }

    #[test]
    fn upsert_replaces_by_name() {
        let mut presets = three();
        assert_eq!(presets.upsert(Layout::grid("b", 3, 1)).unwrap(), 1);
        assert_eq!(presets.get(1).unwrap().zones.len(), 3);
        assert_eq!(presets.upsert(Layout::grid("d", 1, 2)).unwrap(), 3);
        assert_eq!(presets.len(), 4);
    }
}
