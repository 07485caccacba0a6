//! Colour themes loaded from JSON files.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::RenderError;

/// Colour keys a theme may set, with the value used when it does not.
pub const COLOR_DEFAULTS: &[(&str, &str)] = &[
    ("bg", "#FFFFFF"),
    ("text", "#000000"),
    ("gradient_color", "#FFFFFF"),
    ("water", "#C0C0C0"),
    ("parks", "#F0F0F0"),
    ("building", "#D0D0D0"),
    ("railway", "#888888"),
    ("road_motorway", "#0A0A0A"),
    ("road_primary", "#1A1A1A"),
    ("road_secondary", "#2A2A2A"),
    ("road_tertiary", "#3A3A3A"),
    ("road_residential", "#4A4A4A"),
    ("road_default", "#3A3A3A"),
];

/// Colours shown on theme cards.
const PREVIEW_KEYS: &[&str] = &["bg", "text", "water", "parks", "road_motorway", "road_primary"];

/// Returns true if `key` is a colour a theme or request may override.
pub fn is_color_key(key: &str) -> bool {
    COLOR_DEFAULTS.iter().any(|(k, _)| *k == key)
}

/// Parse a `#RRGGBB` string.
pub fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// A named colour theme.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    /// File stem, used in requests.
    pub name: String,
    pub display_name: String,
    pub description: String,
    #[serde(skip)]
    colors: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct ThemeFile {
    name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(flatten)]
    rest: BTreeMap<String, Value>,
}

impl Theme {
    /// Parse a theme file body. Unknown keys are ignored; known colour keys
    /// must hold `#RRGGBB` strings.
    pub fn from_json(name: &str, body: &[u8]) -> Result<Self, RenderError> {
        let file: ThemeFile =
            serde_json::from_slice(body).map_err(|e| RenderError::InvalidTheme {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        let mut colors = BTreeMap::new();
        for (key, value) in file.rest {
            if !is_color_key(&key) {
                continue;
            }
            match value.as_str() {
                Some(hex) if parse_hex_color(hex).is_some() => {
                    colors.insert(key, hex.to_string());
                }
                _ => {
                    return Err(RenderError::InvalidTheme {
                        name: name.to_string(),
                        reason: format!("'{key}' is not a #RRGGBB colour"),
                    })
                }
            }
        }

        Ok(Self {
            name: name.to_string(),
            display_name: file.name.unwrap_or_else(|| name.to_string()),
            description: file.description,
            colors,
        })
    }

    /// Colour for `key`, falling back to the built-in default.
    ///
    /// `gradient_color` falls back to the background so fades blend in.
    pub fn color(&self, key: &str) -> &str {
        if let Some(value) = self.colors.get(key) {
            return value;
        }
        if key == "gradient_color" {
            return self.color("bg");
        }
        COLOR_DEFAULTS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .unwrap_or("#000000")
    }

    pub fn rgb(&self, key: &str) -> [u8; 3] {
        parse_hex_color(self.color(key)).unwrap_or([0, 0, 0])
    }

    /// Replace colours with per-request overrides. Unknown keys and malformed
    /// values are ignored.
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, String>) {
        for (key, value) in overrides {
            if is_color_key(key) && parse_hex_color(value).is_some() {
                self.colors.insert(key.clone(), value.clone());
            }
        }
    }

    /// Colours shown when listing themes.
    pub fn preview_colors(&self) -> BTreeMap<&'static str, String> {
        PREVIEW_KEYS
            .iter()
            .map(|key| (*key, self.color(key).to_string()))
            .collect()
    }
}

/// Source of colour themes.
pub trait ThemeProvider: Send + Sync {
    /// Every loadable theme, sorted by name.
    fn list_themes(&self) -> Result<Vec<Theme>, RenderError>;

    fn load_theme(&self, name: &str) -> Result<Theme, RenderError>;

    fn has_theme(&self, name: &str) -> bool {
        self.load_theme(name).is_ok()
    }
}

/// Themes stored as `<name>.json` files in one directory.
#[derive(Debug, Clone)]
pub struct DirectoryThemes {
    dir: PathBuf,
}

impl DirectoryThemes {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn dir_error(&self, source: io::Error) -> RenderError {
        RenderError::ThemesDirectory {
            path: self.dir.clone(),
            source,
        }
    }
}

impl ThemeProvider for DirectoryThemes {
    fn list_themes(&self) -> Result<Vec<Theme>, RenderError> {
        let mut names: Vec<String> = fs::read_dir(&self.dir)
            .map_err(|e| self.dir_error(e))?
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    return None;
                }
                path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
            })
            .collect();
        names.sort();

        let mut themes = Vec::with_capacity(names.len());
        for name in names {
            match self.load_theme(&name) {
                Ok(theme) => themes.push(theme),
                Err(e) => warn!(theme = %name, error = %e, "skipping unreadable theme"),
            }
        }
        Ok(themes)
    }

    fn load_theme(&self, name: &str) -> Result<Theme, RenderError> {
        let safe = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !safe {
            return Err(RenderError::UnknownTheme(name.to_string()));
        }

        let path = self.dir.join(format!("{name}.json"));
        let body = match fs::read(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RenderError::UnknownTheme(name.to_string()))
            }
            Err(e) => return Err(self.dir_error(e)),
        };
        Theme::from_json(name, &body)
    }
}
