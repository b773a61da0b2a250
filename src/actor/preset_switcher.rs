use std::sync::Arc;

use tracing::{debug, info};

use crate::model::layout::Layout;
use crate::model::store::LayoutStore;

#[derive(Debug, Clone, PartialEq)]
pub enum SwitchOutcome {
    Switched { index: usize, name: String },
    /// The request named no preset, or the named preset is already active.
    NoOp,
}

/// Changes the active preset in response to hotkeys and commands.
///
/// Every successful switch is committed through the store. A drag that is
/// already running keeps using the layout it captured when it armed.
pub struct PresetSwitcher {
    store: LayoutStore,
}

impl PresetSwitcher {
    pub fn new(store: LayoutStore) -> Self { Self { store } }

    pub fn store(&self) -> &LayoutStore { &self.store }

    pub fn store_mut(&mut self) -> &mut LayoutStore { &mut self.store }

    pub fn active_layout(&self) -> Arc<Layout> { self.store.active_layout() }

    pub fn cycle_next(&mut self) -> SwitchOutcome {
        let index = self.store.presets().next_index();
        self.switch_to(index)
    }

    pub fn cycle_previous(&mut self) -> SwitchOutcome {
        let index = self.store.presets().previous_index();
        self.switch_to(index)
    }

    /// `n` is a 0-based position in the collection.
    pub fn select_by_shortcut_index(&mut self, n: usize) -> SwitchOutcome {
        if n >= self.store.presets().len() {
            debug!(n, len = self.store.presets().len(), "no preset bound to shortcut");
            return SwitchOutcome::NoOp;
        }
        self.switch_to(n)
    }

    pub fn select_by_name(&mut self, name: &str) -> SwitchOutcome {
        match self.store.presets().position_of(name) {
            Some(index) => self.switch_to(index),
            None => {
                debug!(name, "no preset with that name");
                SwitchOutcome::NoOp
            }
        }
    }

    fn switch_to(&mut self, index: usize) -> SwitchOutcome {
        if index == self.store.presets().active_index() {
            return SwitchOutcome::NoOp;
        }
        if self.store.set_active(index).is_err() {
            return SwitchOutcome::NoOp;
        }
        let name = self.store.active_layout().name.clone();
        info!(index, %name, "switched preset");
        SwitchOutcome::Switched { index, name }
    }
}
