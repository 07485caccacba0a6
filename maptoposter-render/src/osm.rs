//! OpenStreetMap feature download through the Overpass API.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::RenderError;
use crate::geocode::Coordinates;
use crate::http::HttpClient;

const METERS_PER_DEGREE: f64 = 111_320.0;

/// A group of map features fetched and drawn together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Streets,
    Water,
    Parks,
    Buildings,
    Railways,
}

impl Layer {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Streets => "street network",
            Self::Water => "water features",
            Self::Parks => "parks",
            Self::Buildings => "buildings",
            Self::Railways => "railways",
        }
    }

    /// Progress recorded once this layer is downloaded.
    pub const fn progress(self) -> u8 {
        match self {
            Self::Streets => 35,
            Self::Water => 45,
            Self::Parks => 50,
            Self::Buildings => 55,
            Self::Railways => 60,
        }
    }

    /// Whether features of this layer are areas rather than lines.
    pub const fn is_area(self) -> bool {
        matches!(self, Self::Water | Self::Parks | Self::Buildings)
    }

    fn selectors(self) -> &'static [&'static str] {
        match self {
            Self::Streets => &[r#"way["highway"]"#],
            Self::Water => &[
                r#"way["natural"="water"]"#,
                r#"relation["natural"="water"]"#,
                r#"way["waterway"="riverbank"]"#,
                r#"relation["waterway"="riverbank"]"#,
            ],
            Self::Parks => &[
                r#"way["leisure"="park"]"#,
                r#"relation["leisure"="park"]"#,
                r#"way["landuse"="grass"]"#,
                r#"relation["landuse"="grass"]"#,
            ],
            Self::Buildings => &[r#"way["building"]"#],
            Self::Railways => &[r#"way["railway"="rail"]"#],
        }
    }
}

/// Latitude/longitude bounds of the mapped area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Square of `distance` meters in each direction around `center`.
    pub fn around(center: Coordinates, distance: f64) -> Self {
        let dlat = distance / METERS_PER_DEGREE;
        let cos = center.lat.to_radians().cos().max(0.01);
        let dlon = distance / (METERS_PER_DEGREE * cos);
        Self {
            south: (center.lat - dlat).max(-90.0),
            west: center.lon - dlon,
            north: (center.lat + dlat).min(90.0),
            east: center.lon + dlon,
        }
    }

    fn overpass(&self) -> String {
        format!(
            "{:.6},{:.6},{:.6},{:.6}",
            self.south, self.west, self.north, self.east
        )
    }
}

/// One line or ring of a map feature.
#[derive(Debug, Clone, PartialEq)]
pub struct MapFeature {
    /// `highway` class for streets, otherwise `None`.
    pub class: Option<String>,
    pub points: Vec<Coordinates>,
}

/// Source of map features for an area.
pub trait MapDataSource: Send + Sync {
    fn fetch(&self, layer: Layer, bbox: &BoundingBox) -> Result<Vec<MapFeature>, RenderError>;
}

/// [`MapDataSource`] querying an Overpass interpreter endpoint.
#[derive(Debug, Clone)]
pub struct OverpassSource {
    http: HttpClient,
    url: String,
    timeout: Duration,
}

impl OverpassSource {
    pub fn new(http: HttpClient, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            url: url.into(),
            timeout,
        }
    }
}

impl MapDataSource for OverpassSource {
    fn fetch(&self, layer: Layer, bbox: &BoundingBox) -> Result<Vec<MapFeature>, RenderError> {
        let query = build_query(layer, bbox, self.timeout);
        debug!(layer = layer.label(), %query, "overpass query");

        let response: OverpassResponse = self
            .http
            .post_form(&self.url, &[("data", query.as_str())])
            .map_err(|e| RenderError::DataSource {
                layer: layer.label(),
                message: e.to_string(),
            })?;

        let features = response.into_features();
        info!(layer = layer.label(), count = features.len(), "map features downloaded");
        Ok(features)
    }
}

fn build_query(layer: Layer, bbox: &BoundingBox, timeout: Duration) -> String {
    let area = bbox.overpass();
    let mut query = format!("[out:json][timeout:{}];\n(\n", timeout.as_secs().max(1));
    for selector in layer.selectors() {
        let _ = writeln!(query, "  {selector}({area});");
    }
    query.push_str(");\nout geom;");
    query
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    geometry: Vec<Option<Point>>,
    #[serde(default)]
    members: Vec<Member>,
}

#[derive(Debug, Deserialize)]
struct Member {
    #[serde(default)]
    role: String,
    #[serde(default)]
    geometry: Vec<Option<Point>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct Point {
    lat: f64,
    lon: f64,
}

fn to_coordinates(points: Vec<Option<Point>>) -> Vec<Coordinates> {
    points
        .into_iter()
        .flatten()
        .map(|p| Coordinates::new(p.lat, p.lon))
        .collect()
}

impl OverpassResponse {
    fn into_features(self) -> Vec<MapFeature> {
        let mut features = Vec::new();
        for element in self.elements {
            match element.kind.as_str() {
                "way" => {
                    let points = to_coordinates(element.geometry);
                    if points.len() >= 2 {
                        features.push(MapFeature {
                            class: element.tags.get("highway").cloned(),
                            points,
                        });
                    }
                }
                "relation" => {
                    // only outer rings; inner rings would need hole-aware filling
                    for member in element.members {
                        if !(member.role == "outer" || member.role.is_empty()) {
                            continue;
                        }
                        let points = to_coordinates(member.geometry);
                        if points.len() >= 2 {
                            features.push(MapFeature {
                                class: None,
                                points,
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        features
    }
}
