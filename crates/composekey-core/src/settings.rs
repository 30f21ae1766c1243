// Composekey Settings Module
// Handles the user-configurable behavior of the compose engine

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::layout::{KeyboardLayout, LayoutInput, TableLayout};
use crate::table::{SequenceTable, TableError};
use crate::window::{WindowClassifier, WindowPatterns};
use crate::KeyCode;

/// Settings for the compose engine
///
/// These settings are loaded from a TOML file (default:
/// ~/.config/composekey/settings.toml). Every field has a default, so an
/// empty or missing file yields a working configuration with right Alt as
/// the compose key.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposerSettings {
    /// Keys that start a compose sequence, in priority order
    pub compose_keys: Vec<KeyCode>,

    /// Keys that start a Unicode code point sequence
    pub unicode_prefix_keys: Vec<String>,

    /// Idle time after which a pending sequence is dropped; 0 or less disables
    pub reset_delay_ms: i64,

    /// Retry unmatched sequences with case folded
    pub case_insensitive: bool,

    /// Retry unmatched two-key sequences with the keys swapped
    pub swap_on_invalid: bool,

    /// Drop the keys of an unmatched sequence instead of typing them
    pub discard_on_invalid: bool,

    /// Sound an alert on an unmatched sequence
    pub beep_on_invalid: bool,

    /// Compose key also keeps working as the key it replaces in combinations
    pub keep_original_key: bool,

    /// Caps Lock also capitalizes non-ASCII letters
    pub caps_lock_capitalizes: bool,

    /// Pressing both Shift keys toggles Caps Lock
    pub emulate_caps_lock: bool,

    /// Pressing Shift turns Caps Lock off
    pub shift_disables_caps_lock: bool,

    /// Bracket output with a zero-width space in office applications
    pub insert_zwsp: bool,

    /// Start with composing disabled
    pub disabled: bool,

    pub layout: LayoutSettings,
    pub sequences: SequenceSources,
    pub windows: WindowPatterns,
    pub output: OutputSettings,

    /// Path to the settings file (for reload)
    pub source_path: Option<PathBuf>,
}

/// Overrides applied on top of the US base layout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutSettings {
    pub has_altgr: Option<bool>,
    pub altgr_chord: Vec<KeyCode>,
    pub levels: Vec<(KeyCode, String, String)>,
    pub altgr: Vec<(KeyCode, String, String)>,
}

/// Where sequence definitions come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceSources {
    /// XCompose files, loaded in order; later definitions win
    pub files: Vec<PathBuf>,
    /// Load the built-in table before the files
    pub include_default: bool,
}

impl Default for SequenceSources {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            include_default: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputSettings {
    pub clipboard: ClipboardBackend,
}

/// Clipboard used by the clipboard round-trip output strategy
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    serde::Deserialize,
    strum_macros::EnumString,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ClipboardBackend {
    /// No clipboard access; the strategy falls back to direct typing
    #[default]
    None,
    /// The desktop clipboard
    System,
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Unknown key name: {0}")]
    UnknownKey(String),

    #[error("Invalid window pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

/// TOML representation for deserializing settings
#[derive(Debug, Clone, serde::Deserialize, Default)]
struct SettingsToml {
    #[serde(default)]
    compose: Option<ComposeToml>,

    #[serde(default)]
    behavior: Option<BehaviorToml>,

    #[serde(default)]
    layout: Option<LayoutToml>,

    #[serde(default)]
    sequences: Option<SequencesToml>,

    #[serde(default)]
    windows: Option<WindowPatterns>,

    #[serde(default)]
    output: Option<OutputToml>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct ComposeToml {
    #[serde(default)]
    keys: Option<Vec<String>>,

    #[serde(default)]
    reset_delay_ms: Option<i64>,

    #[serde(default)]
    unicode_prefix_keys: Option<Vec<String>>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct BehaviorToml {
    case_insensitive: Option<bool>,
    swap_on_invalid: Option<bool>,
    discard_on_invalid: Option<bool>,
    beep_on_invalid: Option<bool>,
    keep_original_key: Option<bool>,
    caps_lock_capitalizes: Option<bool>,
    emulate_caps_lock: Option<bool>,
    shift_disables_caps_lock: Option<bool>,
    insert_zwsp: Option<bool>,
    disabled: Option<bool>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct LayoutToml {
    #[serde(default)]
    has_altgr: Option<bool>,

    #[serde(default)]
    altgr_chord: Option<Vec<String>>,

    /// Key name -> [base, shifted]
    #[serde(default)]
    levels: Option<HashMap<String, Vec<String>>>,

    /// Key name -> [altgr, shift+altgr]
    #[serde(default)]
    altgr: Option<HashMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct SequencesToml {
    #[serde(default)]
    files: Option<Vec<String>>,

    #[serde(default)]
    include_default: Option<bool>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct OutputToml {
    #[serde(default)]
    clipboard: Option<ClipboardBackend>,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            compose_keys: vec![KeyCode::RIGHT_ALT],
            unicode_prefix_keys: vec!["u".to_string(), "U".to_string()],
            reset_delay_ms: 0,
            case_insensitive: false,
            swap_on_invalid: false,
            discard_on_invalid: false,
            beep_on_invalid: false,
            keep_original_key: false,
            caps_lock_capitalizes: false,
            emulate_caps_lock: false,
            shift_disables_caps_lock: false,
            insert_zwsp: false,
            disabled: false,
            layout: LayoutSettings::default(),
            sequences: SequenceSources::default(),
            windows: WindowPatterns::default(),
            output: OutputSettings::default(),
            source_path: None,
        }
    }
}

fn parse_key(name: &str) -> Result<KeyCode, SettingsError> {
    KeyCode::from_name(name).ok_or_else(|| SettingsError::UnknownKey(name.to_string()))
}

fn parse_levels(
    table: HashMap<String, Vec<String>>,
) -> Result<Vec<(KeyCode, String, String)>, SettingsError> {
    let mut levels = Vec::with_capacity(table.len());
    for (name, values) in table {
        let code = parse_key(&name)?;
        let (base, shifted) = match values.as_slice() {
            [base] => (base.clone(), base.clone()),
            [base, shifted] => (base.clone(), shifted.clone()),
            _ => {
                return Err(SettingsError::InvalidValue(format!(
                    "layout entry {name} needs one or two strings"
                )))
            }
        };
        levels.push((code, base, shifted));
    }
    levels.sort_by_key(|(code, _, _)| *code);
    Ok(levels)
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

impl ComposerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(&path)?;
        let mut settings = Self::from_toml(&content)?;
        settings.source_path = Some(path.as_ref().to_path_buf());
        Ok(settings)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let toml_settings: SettingsToml =
            toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))?;

        let mut settings = Self::new();

        if let Some(compose) = toml_settings.compose {
            if let Some(keys) = compose.keys {
                settings.compose_keys = keys
                    .iter()
                    .map(|name| parse_key(name))
                    .collect::<Result<_, _>>()?;
            }
            if let Some(delay) = compose.reset_delay_ms {
                settings.reset_delay_ms = delay;
            }
            if let Some(prefix_keys) = compose.unicode_prefix_keys {
                settings.unicode_prefix_keys = prefix_keys;
            }
        }

        if let Some(behavior) = toml_settings.behavior {
            let flags = [
                (behavior.case_insensitive, &mut settings.case_insensitive),
                (behavior.swap_on_invalid, &mut settings.swap_on_invalid),
                (behavior.discard_on_invalid, &mut settings.discard_on_invalid),
                (behavior.beep_on_invalid, &mut settings.beep_on_invalid),
                (behavior.keep_original_key, &mut settings.keep_original_key),
                (behavior.caps_lock_capitalizes, &mut settings.caps_lock_capitalizes),
                (behavior.emulate_caps_lock, &mut settings.emulate_caps_lock),
                (
                    behavior.shift_disables_caps_lock,
                    &mut settings.shift_disables_caps_lock,
                ),
                (behavior.insert_zwsp, &mut settings.insert_zwsp),
                (behavior.disabled, &mut settings.disabled),
            ];
            for (value, slot) in flags {
                if let Some(value) = value {
                    *slot = value;
                }
            }
        }

        if let Some(layout) = toml_settings.layout {
            settings.layout.has_altgr = layout.has_altgr;
            if let Some(chord) = layout.altgr_chord {
                settings.layout.altgr_chord = chord
                    .iter()
                    .map(|name| parse_key(name))
                    .collect::<Result<_, _>>()?;
            }
            if let Some(levels) = layout.levels {
                settings.layout.levels = parse_levels(levels)?;
            }
            if let Some(altgr) = layout.altgr {
                settings.layout.altgr = parse_levels(altgr)?;
            }
        }

        if let Some(sequences) = toml_settings.sequences {
            if let Some(files) = sequences.files {
                settings.sequences.files = files.iter().map(|f| expand_home(f)).collect();
            }
            if let Some(include_default) = sequences.include_default {
                settings.sequences.include_default = include_default;
            }
        }

        if let Some(windows) = toml_settings.windows {
            settings.windows = windows;
        }

        if let Some(output) = toml_settings.output {
            if let Some(clipboard) = output.clipboard {
                settings.output.clipboard = clipboard;
            }
        }

        Ok(settings)
    }

    /// Get the default settings path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("composekey").join("settings.toml"))
    }

    /// Load from default location (~/.config/composekey/settings.toml)
    pub fn load_default() -> Result<Self, SettingsError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        // Return default settings if file doesn't exist
        Ok(Self::new())
    }

    /// Reload settings from the original file
    pub fn reload(&mut self) -> Result<(), SettingsError> {
        if let Some(ref path) = self.source_path {
            let new_settings = Self::from_file(path)?;
            *self = new_settings;
            Ok(())
        } else {
            Err(SettingsError::InvalidValue("No source path set".to_string()))
        }
    }

    /// Expiry delay for pending sequences, `None` when disabled
    pub fn reset_delay(&self) -> Option<Duration> {
        u64::try_from(self.reset_delay_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    pub fn is_compose_key(&self, code: KeyCode) -> bool {
        self.compose_keys.contains(&code)
    }

    /// Build the layout described by the `[layout]` section
    pub fn build_layout(&self) -> TableLayout {
        let mut layout = TableLayout::us().with_altgr_chord(self.layout.altgr_chord.clone());
        for (code, base, shifted) in &self.layout.levels {
            layout = layout.with_level(*code, base, shifted);
        }
        for (code, base, shifted) in &self.layout.altgr {
            layout = layout.with_altgr(*code, base, shifted);
        }
        if let Some(has_altgr) = self.layout.has_altgr {
            layout = layout.with_has_altgr(has_altgr);
        }
        layout
    }

    /// Build the window classifier described by the `[windows]` section
    pub fn build_classifier(&self) -> Result<WindowClassifier, SettingsError> {
        WindowClassifier::new(&self.windows)
            .map_err(|e| SettingsError::InvalidPattern(e.to_string()))
    }

    /// Load the built-in table and configured files.
    ///
    /// Missing files are skipped with a warning; unreadable or malformed
    /// files are errors.
    pub fn load_sequences(&self) -> Result<SequenceTable, TableError> {
        let mut table = if self.sequences.include_default {
            SequenceTable::builtin()?
        } else {
            SequenceTable::new()
        };

        for path in &self.sequences.files {
            match table.load_file(path) {
                Ok(_) => {}
                Err(TableError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    log::warn!("Sequence file {} not found, skipping", path.display());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(table)
    }

    /// Check settings that cannot be expressed in the TOML schema.
    ///
    /// A compose key that types text would swallow that text forever, so such
    /// keys are rejected.
    pub fn validate(&self, layout: &dyn KeyboardLayout) -> Result<(), SettingsError> {
        for code in &self.compose_keys {
            let key = layout.resolve(&LayoutInput::plain(*code));
            if key.is_printable() {
                return Err(SettingsError::InvalidValue(format!(
                    "compose key {} types \"{}\"",
                    code,
                    key.as_text().unwrap_or_default()
                )));
            }
        }

        if let Some(bad) = self.unicode_prefix_keys.iter().find(|k| k.is_empty()) {
            return Err(SettingsError::InvalidValue(format!(
                "unicode prefix key {bad:?} is empty"
            )));
        }

        self.build_classifier()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ComposerSettings::from_toml("").unwrap();
        assert_eq!(settings.compose_keys, vec![KeyCode::RIGHT_ALT]);
        assert_eq!(settings.reset_delay(), None);
        assert!(settings.sequences.include_default);
        assert_eq!(settings.output.clipboard, ClipboardBackend::None);
    }

    #[test]
    fn test_parse_sections() {
        let settings = ComposerSettings::from_toml(
            r#"
            [compose]
            keys = ["RIGHT_ALT", "CapsLock"]
            reset_delay_ms = 2000

            [behavior]
            case_insensitive = true
            swap_on_invalid = true
            beep_on_invalid = true

            [output]
            clipboard = "system"
            "#,
        )
        .unwrap();

        assert_eq!(
            settings.compose_keys,
            vec![KeyCode::RIGHT_ALT, KeyCode::CAPSLOCK]
        );
        assert_eq!(settings.reset_delay(), Some(Duration::from_millis(2000)));
        assert!(settings.case_insensitive);
        assert!(settings.swap_on_invalid);
        assert!(settings.beep_on_invalid);
        assert!(!settings.discard_on_invalid);
        assert_eq!(settings.output.clipboard, ClipboardBackend::System);
    }

    #[test]
    fn test_negative_delay_disables_expiry() {
        let settings = ComposerSettings::from_toml("[compose]\nreset_delay_ms = -1").unwrap();
        assert_eq!(settings.reset_delay(), None);
    }

    #[test]
    fn test_unknown_compose_key() {
        let err = ComposerSettings::from_toml("[compose]\nkeys = [\"HYPERSPACE\"]").unwrap_err();
        assert!(matches!(err, SettingsError::UnknownKey(name) if name == "HYPERSPACE"));
    }

    #[test]
    fn test_layout_overrides() {
        let settings = ComposerSettings::from_toml(
            r#"
            [layout]
            has_altgr = true

            [layout.altgr]
            E = ["€", "¢"]

            [layout.levels]
            SEMICOLON = ["é", "É"]
            "#,
        )
        .unwrap();

        let layout = settings.build_layout();
        assert!(layout.has_altgr());
        let semicolon = layout.resolve(&LayoutInput::plain(KeyCode::SEMICOLON));
        assert_eq!(semicolon.as_text(), Some("é"));
    }

    #[test]
    fn test_validate_rejects_printable_compose_key() {
        let settings = ComposerSettings {
            compose_keys: vec![KeyCode::A],
            ..ComposerSettings::default()
        };
        let err = settings.validate(&TableLayout::us()).unwrap_err();
        assert!(err.to_string().contains("compose key A"));

        assert!(ComposerSettings::default()
            .validate(&TableLayout::us())
            .is_ok());
    }

    #[test]
    fn test_invalid_toml() {
        let result = ComposerSettings::from_toml("[compose\nkeys = ");
        assert!(matches!(result, Err(SettingsError::TomlParse(_))));
    }
}
