//! Poster rendering for the map poster service.
//!
//! [`PosterPipeline`] implements the job queue's
//! [`RenderPipeline`](maptoposter_job_queue::RenderPipeline): it loads a theme,
//! geocodes the place, downloads OpenStreetMap layers, draws them with
//! tiny-skia and stores the PNG through an
//! [`ArtifactStore`](maptoposter_artifacts::ArtifactStore).
//!
//! Network access sits behind the [`Geocoder`] and [`MapDataSource`] traits
//! so the pipeline can run against fixtures.
//!
//! # Stages
//!
//! | Progress | Step |
//! |---|---|
//! | 10 | Theme and geocoding |
//! | 15 - 35 | Street network |
//! | 45 - 60 | Water, parks, buildings, railways (each optional, best effort) |
//! | 80 | Drawing, then the caption when a [`Typeface`] is set |
//! | 90 | Saving |

mod draw;
mod error;
mod geocode;
mod http;
mod osm;
mod pipeline;
mod request;
mod themes;
mod typography;

pub use draw::{paint, render_png, CanvasSize, Scene};
pub use error::RenderError;
pub use geocode::{Coordinates, Geocoder, NominatimGeocoder};
pub use http::HttpClient;
pub use osm::{BoundingBox, Layer, MapDataSource, MapFeature, OverpassSource};
pub use pipeline::{NetworkSettings, PosterPipeline, DEFAULT_MAX_PIXELS};
pub use request::{
    download_file_name, slugify, PosterRequest, DEFAULT_DISTANCE, DEFAULT_DPI, DEFAULT_HEIGHT,
    DEFAULT_THEME, DEFAULT_WIDTH,
};
pub use themes::{
    is_color_key, parse_hex_color, DirectoryThemes, Theme, ThemeProvider, COLOR_DEFAULTS,
};
pub use typography::{format_coordinates, spaced_city, Caption, Typeface, ATTRIBUTION};
