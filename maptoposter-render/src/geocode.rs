//! Place name to coordinates.

use serde::Deserialize;
use tracing::info;

use crate::error::RenderError;
use crate::http::HttpClient;

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

pub trait Geocoder: Send + Sync {
    fn locate(&self, city: &str, country: &str) -> Result<Coordinates, RenderError>;
}

/// Geocoder backed by a Nominatim search endpoint.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    http: HttpClient,
    base_url: String,
}

#[derive(Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

impl Geocoder for NominatimGeocoder {
    fn locate(&self, city: &str, country: &str) -> Result<Coordinates, RenderError> {
        let place = format!("{city}, {country}");
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let hits: Vec<SearchHit> = self.http.get_json(
            &url,
            &[("q", place.as_str()), ("format", "json"), ("limit", "1")],
        )?;

        let hit = hits
            .into_iter()
            .next()
            .ok_or_else(|| RenderError::Geocode(place.clone()))?;
        let coords = parse_hit(&hit).ok_or_else(|| RenderError::Geocode(place.clone()))?;
        info!(%place, lat = coords.lat, lon = coords.lon, "location geocoded");
        Ok(coords)
    }
}

fn parse_hit(hit: &SearchHit) -> Option<Coordinates> {
    let lat: f64 = hit.lat.parse().ok()?;
    let lon: f64 = hit.lon.parse().ok()?;
    let valid = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon);
    valid.then_some(Coordinates::new(lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nominatim_hit() {
        let hits: Vec<SearchHit> =
            serde_json::from_str(r#"[{"lat": "48.8588897", "lon": "2.3200410", "display_name": "Paris"}]"#)
                .unwrap();
        let coords = parse_hit(&hits[0]).unwrap();
        assert!((coords.lat - 48.8588897).abs() < 1e-9);
        assert!((coords.lon - 2.320041).abs() < 1e-9);
    }

    #[test]
    fn rejects_out_of_range_hit() {
        let hit = SearchHit {
            lat: "123.0".into(),
            lon: "0".into(),
        };
        assert!(parse_hit(&hit).is_none());
        let hit = SearchHit {
            lat: "north".into(),
            lon: "0".into(),
        };
        assert!(parse_hit(&hit).is_none());
    }
}
