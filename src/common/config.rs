use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::bail;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::actor::reactor::Command;
use crate::model::geometry::Rect;
use crate::sys::hotkey::{Hotkey, Modifiers};

const MAX_MERGE_TOLERANCE: f64 = 200.0;

pub fn config_dir() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("linuxzones")
}
pub fn presets_file() -> PathBuf { config_dir().join("presets.ron") }
pub fn config_file() -> PathBuf { config_dir().join("config.toml") }

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    keys: FxHashMap<String, Command>,
    #[serde(default)]
    modifier_combinations: FxHashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub keys: Vec<(Hotkey, Command)>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Modifier that must be held for a drag to snap into zones.
    #[serde(default = "default_drag_modifier")]
    pub drag_modifier: Modifiers,
    /// Distance in pixels from a shared zone edge within which neighbouring
    /// zones merge into one target. Zero disables merging.
    #[serde(default = "default_merge_tolerance")]
    pub merge_tolerance: f64,
    /// Pointer travel in pixels before a held button counts as a drag.
    #[serde(default = "default_jitter_threshold")]
    pub jitter_threshold: f64,
    /// Quiet period before queued preset changes are written to disk.
    #[serde(default = "default_persist_debounce_ms")]
    pub persist_debounce_ms: u64,
    /// Smallest normalized zone extent the editor leaves when moving a divider.
    #[serde(default = "default_boundary_buffer")]
    pub boundary_buffer: f64,
    /// Overrides the default preset file location.
    #[serde(default)]
    pub presets_path: Option<PathBuf>,
    /// Watch the preset file and reload it when another program edits it.
    #[serde(default = "yes")]
    pub watch_presets: bool,
    #[serde(default)]
    pub gaps: GapSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            drag_modifier: default_drag_modifier(),
            merge_tolerance: default_merge_tolerance(),
            jitter_threshold: default_jitter_threshold(),
            persist_debounce_ms: default_persist_debounce_ms(),
            boundary_buffer: default_boundary_buffer(),
            presets_path: None,
            watch_presets: true,
            gaps: GapSettings::default(),
        }
    }
}

/// Gap configuration for snapped windows
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct GapSettings {
    /// Space between zones and the edges of the work area
    #[serde(default)]
    pub outer: OuterGaps,
    /// Space between neighbouring zones
    #[serde(default)]
    pub inner: InnerGaps,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct OuterGaps {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub right: f64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct InnerGaps {
    /// Gap between horizontally adjacent zones
    #[serde(default)]
    pub horizontal: f64,
    /// Gap between vertically adjacent zones
    #[serde(default)]
    pub vertical: f64,
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.drag_modifier.is_empty() {
            issues.push("drag_modifier must name at least one modifier".to_string());
        }

        if !(0.0..=MAX_MERGE_TOLERANCE).contains(&self.merge_tolerance) {
            issues.push(format!(
                "merge_tolerance must be between 0 and {MAX_MERGE_TOLERANCE}, got {}",
                self.merge_tolerance
            ));
        }

        if !(self.jitter_threshold >= 0.0) {
            issues.push(format!(
                "jitter_threshold must be non-negative, got {}",
                self.jitter_threshold
            ));
        }

        if !(self.boundary_buffer > 0.0 && self.boundary_buffer < 0.5) {
            issues.push(format!(
                "boundary_buffer must be between 0 and 0.5 exclusive, got {}",
                self.boundary_buffer
            ));
        }

        issues.extend(self.gaps.validate());

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if self.drag_modifier.is_empty() {
            self.drag_modifier = default_drag_modifier();
            fixes += 1;
        }

        if !(0.0..=MAX_MERGE_TOLERANCE).contains(&self.merge_tolerance) {
            self.merge_tolerance = default_merge_tolerance();
            fixes += 1;
        }

        if !(self.jitter_threshold >= 0.0) {
            self.jitter_threshold = default_jitter_threshold();
            fixes += 1;
        }

        if !(self.boundary_buffer > 0.0 && self.boundary_buffer < 0.5) {
            self.boundary_buffer = default_boundary_buffer();
            fixes += 1;
        }

        fixes += self.gaps.auto_fix_values();

        fixes
    }

    pub fn presets_path(&self) -> PathBuf {
        self.presets_path.clone().unwrap_or_else(presets_file)
    }
}

impl GapSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.outer.validate();
        issues.extend(self.inner.validate());
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        self.outer.auto_fix_values() + self.inner.auto_fix_values()
    }

    /// Shrinks a snapped zone by the configured gaps. Edges on the work area
    /// border get the outer gap; edges shared with other zones get half the
    /// inner gap so two neighbours end up one full gap apart.
    pub fn apply(&self, zone: Rect, work_area: Rect) -> Rect {
        const EDGE: f64 = 0.5;
        let on_edge = |a: f64, b: f64| (a - b).abs() < EDGE;
        let top = if on_edge(zone.y, work_area.y) {
            self.outer.top
        } else {
            self.inner.vertical / 2.0
        };
        let bottom = if on_edge(zone.max_y(), work_area.max_y()) {
            self.outer.bottom
        } else {
            self.inner.vertical / 2.0
        };
        let left = if on_edge(zone.x, work_area.x) {
            self.outer.left
        } else {
            self.inner.horizontal / 2.0
        };
        let right = if on_edge(zone.max_x(), work_area.max_x()) {
            self.outer.right
        } else {
            self.inner.horizontal / 2.0
        };
        zone.inset(top, left, bottom, right).round()
    }
}

impl OuterGaps {
    /// Validates outer gap configuration values and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for (name, value) in
            [("top", self.top), ("left", self.left), ("bottom", self.bottom), ("right", self.right)]
        {
            if value < 0.0 {
                issues.push(format!("outer.{name} gap must be non-negative, got {value}"));
            }
        }
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;
        for value in [&mut self.top, &mut self.left, &mut self.bottom, &mut self.right] {
            if *value < 0.0 {
                *value = 0.0;
                fixes += 1;
            }
        }
        fixes
    }
}

impl InnerGaps {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.horizontal < 0.0 {
            issues.push(format!(
                "inner.horizontal gap must be non-negative, got {}",
                self.horizontal
            ));
        }
        if self.vertical < 0.0 {
            issues.push(format!("inner.vertical gap must be non-negative, got {}", self.vertical));
        }
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;
        if self.horizontal < 0.0 {
            self.horizontal = 0.0;
            fixes += 1;
        }
        if self.vertical < 0.0 {
            self.vertical = 0.0;
            fixes += 1;
        }
        fixes
    }
}

fn yes() -> bool { true }

fn default_drag_modifier() -> Modifiers { Modifiers::SUPER }

fn default_merge_tolerance() -> f64 { 10.0 }

fn default_jitter_threshold() -> f64 { 4.0 }

fn default_persist_debounce_ms() -> u64 { 250 }

fn default_boundary_buffer() -> f64 { 0.05 }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    /// Reads `path` if it exists, otherwise the built-in defaults.
    pub fn read_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() { Self::read(path) } else { Self::parse(DEFAULT_CONFIG) }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let config_file = ConfigFile {
            settings: self.settings.clone(),
            keys: self.keys.iter().map(|(hotkey, command)| (hotkey.to_string(), command.clone())).collect(),
            modifier_combinations: FxHashMap::default(),
        };

        let toml_string = toml::to_string_pretty(&config_file)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml_string.as_bytes())?;

        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.settings.validate();

        let mut seen = FxHashSet::default();
        for (hotkey, _) in &self.keys {
            if !seen.insert(hotkey) {
                issues.push(format!("{hotkey} is bound more than once"));
            }
        }

        issues
    }

    /// Attempts to fix configuration values automatically.
    /// Returns the number of fixes applied.
    pub fn auto_fix_values(&mut self) -> usize { self.settings.auto_fix_values() }

    fn expand_modifier_combinations(key: &str, combinations: &FxHashMap<String, String>) -> String {
        if let Some(plus_pos) = key.find(" + ") {
            let potential_combo = &key[..plus_pos];
            if let Some(combo_value) = combinations.get(potential_combo) {
                let rest = &key[plus_pos + 3..];
                return format!("{} + {}", combo_value, rest);
            }
        }
        key.to_string()
    }

    fn parse(buf: &str) -> anyhow::Result<Config> {
        let c: ConfigFile = toml::from_str(buf)?;
        let mut keys = Vec::new();
        for (key, cmd) in c.keys {
            let expanded_key = Self::expand_modifier_combinations(&key, &c.modifier_combinations);
            let Ok(hotkey) = Hotkey::from_str(&expanded_key) else {
                bail!("Could not parse hotkey: {key}");
            };
            keys.push((hotkey, cmd));
        }
        // Map iteration order is unspecified; keep registration order stable.
        keys.sort_by_cached_key(|(hotkey, _)| hotkey.to_string());
        Ok(Config { settings: c.settings, keys })
    }
}

const DEFAULT_CONFIG: &str = include_str!("../../linuxzones.default.toml");

impl Default for Config {
    fn default() -> Self {
        Self::parse(DEFAULT_CONFIG).unwrap_or_else(|_| Config {
            settings: Settings::default(),
            keys: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sys::hotkey::KeyCode;

    #[test]
    fn default_config_parses() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert!(config.validate().is_empty());
        assert_eq!(config.settings, Settings::default());
        assert!(!config.keys.is_empty());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.settings.merge_tolerance, 10.0);
        assert_eq!(config.settings.jitter_threshold, 4.0);
        assert_eq!(config.settings.drag_modifier, Modifiers::SUPER);
        assert!(config.keys.is_empty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Config::parse("[settings]\nanimate = true\n").is_err());
        assert!(Config::parse("[bogus]\n").is_err());
    }

    #[test]
    fn test_expand_modifier_combinations() {
        let mut combinations = FxHashMap::default();
        combinations.insert("comb1".to_string(), "Alt + Shift".to_string());
        combinations.insert("leader".to_string(), "Ctrl + Alt".to_string());

        assert_eq!(
            Config::expand_modifier_combinations("comb1 + C", &combinations),
            "Alt + Shift + C"
        );
        assert_eq!(
            Config::expand_modifier_combinations("leader + Tab", &combinations),
            "Ctrl + Alt + Tab"
        );
        assert_eq!(Config::expand_modifier_combinations("Alt + H", &combinations), "Alt + H");
        assert_eq!(
            Config::expand_modifier_combinations("unknown + X", &combinations),
            "unknown + X"
        );
    }

    #[test]
    fn keys_and_combinations_parse() {
        let config = Config::parse(
            r#"
            [settings]
            drag_modifier = "Ctrl + Alt"
            merge_tolerance = 0

            [modifier_combinations]
            hyper = "Ctrl + Alt + Super"

            [keys]
            "hyper + N" = "next_preset"
            "hyper + P" = "previous_preset"
            "Super + 2" = { select_preset = 1 }
            "Super + G" = { select_preset_named = "grid" }
        "#,
        )
        .unwrap();

        assert_eq!(config.settings.drag_modifier, Modifiers::CONTROL | Modifiers::ALT);
        assert_eq!(config.settings.merge_tolerance, 0.0);
        assert_eq!(config.keys.len(), 4);
        let hyper_n =
            Hotkey::new(Modifiers::CONTROL | Modifiers::ALT | Modifiers::SUPER, KeyCode::KeyN);
        assert!(config.keys.contains(&(hyper_n, Command::NextPreset)));
        assert!(config.keys.contains(&(
            Hotkey::new(Modifiers::SUPER, KeyCode::Digit2),
            Command::SelectPreset(1)
        )));
        assert!(config.keys.contains(&(
            Hotkey::new(Modifiers::SUPER, KeyCode::KeyG),
            Command::SelectPresetNamed("grid".to_string())
        )));
    }

    #[test]
    fn bad_hotkeys_fail_parsing() {
        assert!(Config::parse("[keys]\n\"Super + Nope\" = \"next_preset\"\n").is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_empty());

        config.settings.merge_tolerance = -1.0;
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("merge_tolerance"));

        let fixes = config.auto_fix_values();
        assert_eq!(fixes, 1);
        assert_eq!(config.settings.merge_tolerance, 10.0);

        config.settings.gaps.outer.left = -3.0;
        config.settings.gaps.inner.vertical = -1.0;
        assert_eq!(config.validate().len(), 2);
        assert_eq!(config.auto_fix_values(), 2);
        assert_eq!(config.settings.gaps.outer.left, 0.0);
    }

    #[test]
    fn duplicate_bindings_are_reported() {
        let mut config = Config::default();
        let hotkey = Hotkey::new(Modifiers::SUPER, KeyCode::KeyN);
        config.keys = vec![
            (hotkey.clone(), Command::NextPreset),
            (hotkey, Command::PreviousPreset),
            (Hotkey::new(Modifiers::SUPER, KeyCode::KeyP), Command::PreviousPreset),
        ];
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("bound more than once"));
    }

    #[test]
    fn save_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.settings.jitter_threshold = 9.0;
        config.save(&path).unwrap();

        let read = Config::read(&path).unwrap();
        assert_eq!(read.settings, config.settings);
        assert_eq!(read.keys, config.keys);
    }

    #[test]
    fn gaps_shrink_zones() {
        let gaps = GapSettings {
            outer: OuterGaps { top: 10.0, left: 10.0, bottom: 10.0, right: 10.0 },
            inner: InnerGaps { horizontal: 8.0, vertical: 8.0 },
        };
        let work_area = Rect::new(0.0, 0.0, 1000.0, 1000.0);
        let left = gaps.apply(Rect::new(0.0, 0.0, 500.0, 1000.0), work_area);
        assert_eq!(left, Rect::new(10.0, 10.0, 486.0, 980.0));
        let right = gaps.apply(Rect::new(500.0, 0.0, 500.0, 1000.0), work_area);
        assert_eq!(right, Rect::new(504.0, 10.0, 486.0, 980.0));
        assert_eq!(GapSettings::default().apply(left, work_area), left);
    }
}
