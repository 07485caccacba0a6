//! Poster request payload and the file names derived from it.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::osm::Layer;

pub const DEFAULT_THEME: &str = "feature_based";
pub const DEFAULT_DISTANCE: u32 = 29_000;
pub const DEFAULT_WIDTH: u32 = 12;
pub const DEFAULT_HEIGHT: u32 = 16;
pub const DEFAULT_DPI: u32 = 300;

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}
fn default_distance() -> u32 {
    DEFAULT_DISTANCE
}
fn default_width() -> u32 {
    DEFAULT_WIDTH
}
fn default_height() -> u32 {
    DEFAULT_HEIGHT
}
fn default_dpi() -> u32 {
    DEFAULT_DPI
}
fn default_true() -> bool {
    true
}

/// A request to render one poster.
///
/// Field names follow the frontend's camelCase; the snake_case spellings are
/// accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterRequest {
    pub city: String,
    pub country: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Half the side of the mapped square, in meters.
    #[serde(default = "default_distance")]
    pub distance: u32,
    /// Poster width in inches.
    #[serde(default = "default_width")]
    pub width: u32,
    /// Poster height in inches.
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    #[serde(default = "default_true", alias = "show_water")]
    pub show_water: bool,
    #[serde(default = "default_true", alias = "show_parks")]
    pub show_parks: bool,
    #[serde(default, alias = "show_buildings")]
    pub show_buildings: bool,
    #[serde(default, alias = "show_railways")]
    pub show_railways: bool,
    #[serde(default, alias = "custom_colors", skip_serializing_if = "Option::is_none")]
    pub custom_colors: Option<BTreeMap<String, String>>,
}

impl PosterRequest {
    /// Request for `city` with every other field at its default.
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
            theme: default_theme(),
            distance: DEFAULT_DISTANCE,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            dpi: DEFAULT_DPI,
            show_water: true,
            show_parks: true,
            show_buildings: false,
            show_railways: false,
            custom_colors: None,
        }
    }

    /// Optional layers the request asked for, in drawing order.
    pub fn optional_layers(&self) -> Vec<Layer> {
        [
            (Layer::Water, self.show_water),
            (Layer::Parks, self.show_parks),
            (Layer::Buildings, self.show_buildings),
            (Layer::Railways, self.show_railways),
        ]
        .into_iter()
        .filter_map(|(layer, on)| on.then_some(layer))
        .collect()
    }

    /// File name for a finished artifact.
    ///
    /// `tag` disambiguates two renders of the same place and theme finishing
    /// within the same second.
    pub fn artifact_name<Tz: TimeZone>(&self, at: &DateTime<Tz>, tag: &str) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        format!(
            "{}_{}_{}_{}.png",
            slugify(&self.city),
            slugify(&self.theme),
            at.format("%Y%m%d_%H%M%S"),
            slugify(tag)
        )
    }
}

/// Name offered to clients downloading the artifact of `snapshot`.
///
/// Works on the raw request snapshot so that any stored job can be served.
pub fn download_file_name(snapshot: &Value) -> String {
    let city = snapshot.get("city").and_then(Value::as_str).unwrap_or("poster");
    let theme = snapshot.get("theme").and_then(Value::as_str).unwrap_or("default");
    format!("{}_{}_poster.png", slugify(city), slugify(theme))
}

/// Lowercase `input`, turn whitespace into `_` and drop anything that is not
/// safe in a file name.
pub fn slugify(input: &str) -> String {
    let slug: String = input
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .filter_map(|c| match c {
            c if c.is_whitespace() => Some('_'),
            c if c.is_alphanumeric() || c == '_' || c == '-' => Some(c),
            _ => None,
        })
        .collect();
    if slug.is_empty() {
        "poster".to_string()
    } else {
        slug
    }
}
