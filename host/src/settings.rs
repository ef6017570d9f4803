//! The rows/cols/drop-limit form: parsing, clamping, and persistence between runs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::GameConfig;

/// File name the record is stored under; the logical key of the persisted settings.
pub const SETTINGS_FILE_NAME: &str = "tetris-settings.json";

/// Resolved, in-bounds settings handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsRecord {
    pub rows: i64,
    pub cols: i64,
    pub drops: i64,
}

/// A previously saved record; each field may be missing or unreadable on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct StoredSettings {
    #[serde(default)]
    pub rows: Option<i64>,
    #[serde(default)]
    pub cols: Option<i64>,
    #[serde(default)]
    pub drops: Option<i64>,
}

/// The three free-text inputs, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsForm {
    pub rows: String,
    pub cols: String,
    pub drops: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Rows,
    Cols,
    Drops,
}

impl FormField {
    pub const ALL: [FormField; 3] = [FormField::Rows, FormField::Cols, FormField::Drops];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Rows => "ROWS",
            FormField::Cols => "COLS",
            FormField::Drops => "DROPS",
        }
    }
}

impl SettingsForm {
    pub fn field(&self, field: FormField) -> &str {
        match field {
            FormField::Rows => &self.rows,
            FormField::Cols => &self.cols,
            FormField::Drops => &self.drops,
        }
    }

    pub fn field_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Rows => &mut self.rows,
            FormField::Cols => &mut self.cols,
            FormField::Drops => &mut self.drops,
        }
    }
}

/// `min(max(value, min), max)`; when `min > max` the result is `max`.
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    let lower = if value < min { min } else { value };
    if lower > max { max } else { lower }
}

/// Parses the leading integer of `text`: optional whitespace, an optional sign, then digits.
/// Trailing garbage is ignored; no digits at all means not-a-number. Saturates on overflow.
pub fn parse_leading_int(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit);
    let mut value: i64 = 0;
    let mut seen = false;
    for d in digits {
        seen = true;
        let d = i64::from(d - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(d)
        } else {
            value.saturating_mul(10).saturating_add(d)
        };
    }
    seen.then_some(value)
}

/// A zero or unparsable entry counts as absent and takes `fallback`.
fn parse_or(text: &str, fallback: i64) -> i64 {
    match parse_leading_int(text) {
        Some(0) | None => fallback,
        Some(v) => v,
    }
}

/// Reads the form into bounded settings. Total: any text yields an in-bounds record.
pub fn read_settings(form: &SettingsForm, config: &GameConfig) -> SettingsRecord {
    let rows = clamp(
        parse_or(&form.rows, config.min_size),
        config.min_size,
        config.max_rows,
    );
    let cols = clamp(
        parse_or(&form.cols, config.min_size),
        config.min_size,
        config.max_cols,
    );
    let drops = parse_or(&form.drops, config.default_max_drops).max(1);
    SettingsRecord { rows, cols, drops }
}

/// Pre-fills the form from the saved record, field by field, else from config defaults.
pub fn hydrate_form(config: &GameConfig, saved: Option<StoredSettings>) -> SettingsForm {
    let saved = saved.unwrap_or_default();
    SettingsForm {
        rows: saved.rows.unwrap_or(config.default_rows).to_string(),
        cols: saved.cols.unwrap_or(config.default_cols).to_string(),
        drops: saved.drops.unwrap_or(config.default_max_drops).to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        if let Some(explicit) = std::env::var_os("TETRIS_HOST_SETTINGS_PATH") {
            return Self::at(explicit);
        }

        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|home| {
                    let mut p = PathBuf::from(home);
                    p.push(".config");
                    p
                })
            })
            .unwrap_or_else(|| PathBuf::from("."));

        let mut path = base;
        path.push("wasm-tetris-host");
        path.push(SETTINGS_FILE_NAME);
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved record, or `None` when there is none or it is not valid JSON.
    pub fn load(&self) -> Option<StoredSettings> {
        let bytes = fs::read(&self.path).ok()?;
        serde_json::from_slice::<StoredSettings>(&bytes).ok()
    }

    pub fn save(&self, settings: &SettingsRecord) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(settings)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, text)
    }

    /// `save`, logging instead of failing: losing the record only costs a pre-filled form.
    pub fn save_or_warn(&self, settings: &SettingsRecord) {
        if let Err(err) = self.save(settings) {
            warn!(path = %self.path.display(), "failed to persist settings: {err}");
        }
    }
}
