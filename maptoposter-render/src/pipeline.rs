//! The default render pipeline: theme, geocode, download, draw, save.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use maptoposter_artifacts::ArtifactStore;
use maptoposter_job_queue::{JobQueueError, ProgressReporter, RenderPipeline};
use serde_json::Value;
use tracing::{info, warn};

use crate::draw::{self, CanvasSize, Scene};
use crate::error::RenderError;
use crate::geocode::{Geocoder, NominatimGeocoder};
use crate::http::HttpClient;
use crate::osm::{BoundingBox, Layer, MapDataSource, OverpassSource};
use crate::request::PosterRequest;
use crate::themes::ThemeProvider;
use crate::typography::{Caption, Typeface};

/// Default cap on output image size.
pub const DEFAULT_MAX_PIXELS: u64 = 120_000_000;

/// Network settings for [`PosterPipeline::with_network`].
#[derive(Debug, Clone)]
pub struct NetworkSettings {
    pub nominatim_url: String,
    pub overpass_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

/// Renders posters and stores them as artifacts.
pub struct PosterPipeline {
    themes: Arc<dyn ThemeProvider>,
    geocoder: Arc<dyn Geocoder>,
    source: Arc<dyn MapDataSource>,
    store: ArtifactStore,
    max_pixels: u64,
    typeface: Option<Typeface>,
}

impl fmt::Debug for PosterPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PosterPipeline")
            .field("store", &self.store)
            .field("max_pixels", &self.max_pixels)
            .field("typeface", &self.typeface)
            .finish_non_exhaustive()
    }
}

impl PosterPipeline {
    pub fn new(
        themes: Arc<dyn ThemeProvider>,
        geocoder: Arc<dyn Geocoder>,
        source: Arc<dyn MapDataSource>,
        store: ArtifactStore,
    ) -> Self {
        Self {
            themes,
            geocoder,
            source,
            store,
            max_pixels: DEFAULT_MAX_PIXELS,
            typeface: None,
        }
    }

    /// Pipeline talking to Nominatim and Overpass.
    pub fn with_network(
        themes: Arc<dyn ThemeProvider>,
        store: ArtifactStore,
        settings: &NetworkSettings,
    ) -> Result<Self, RenderError> {
        let http = HttpClient::new(&settings.user_agent, settings.timeout)?;
        let geocoder = NominatimGeocoder::new(http.clone(), settings.nominatim_url.clone());
        let source = OverpassSource::new(http, settings.overpass_url.clone(), settings.timeout);
        Ok(Self::new(themes, Arc::new(geocoder), Arc::new(source), store))
    }

    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels.max(1);
        self
    }

    /// Font for the caption. Without one, posters carry no text.
    pub fn with_typeface(mut self, typeface: Option<Typeface>) -> Self {
        self.typeface = typeface;
        self
    }

    /// Render `request` and return the stored artifact path.
    pub fn generate(
        &self,
        request: &PosterRequest,
        progress: &ProgressReporter,
    ) -> Result<PathBuf, RenderError> {
        progress.report(10, "Geocoding location...");
        let mut theme = self.themes.load_theme(&request.theme)?;
        if let Some(overrides) = &request.custom_colors {
            theme.apply_overrides(overrides);
        }

        let center = self.geocoder.locate(&request.city, &request.country)?;
        progress.report(15, "Downloading street network...");

        let distance = f64::from(request.distance);
        let bbox = BoundingBox::around(center, distance);
        let mut scene = Scene::new(center, distance);
        scene.insert(Layer::Streets, self.source.fetch(Layer::Streets, &bbox)?);
        progress.report(Layer::Streets.progress(), "Downloading street network...");

        for layer in request.optional_layers() {
            let message = format!("Downloading {}...", layer.label());
            progress.note(message.as_str());
            match self.source.fetch(layer, &bbox) {
                Ok(features) => {
                    scene.insert(layer, features);
                    progress.report(layer.progress(), message);
                }
                Err(e) => {
                    warn!(layer = layer.label(), error = %e, "skipping optional layer");
                    progress.note(format!("Skipped {}: {e}", layer.label()));
                }
            }
        }

        progress.report(80, "Rendering map...");
        if let Some(face) = &self.typeface {
            scene.set_caption(Caption::new(&request.city, &request.country, face.clone()));
        }
        let size = CanvasSize::for_print(request.width, request.height, request.dpi, self.max_pixels);
        let png = draw::render_png(&scene, &theme, size)?;

        progress.report(90, "Saving poster...");
        let tag: String = progress.job_id().simple().to_string().chars().take(8).collect();
        let name = request.artifact_name(&Local::now(), &tag);
        let path = self.store.write(&name, &png)?;

        info!(
            path = %path.display(),
            width = size.width,
            height = size.height,
            "poster saved"
        );
        Ok(path)
    }
}

impl RenderPipeline for PosterPipeline {
    fn render(&self, request: &Value, progress: &ProgressReporter) -> Result<PathBuf, JobQueueError> {
        let request: PosterRequest =
            serde_json::from_value(request.clone()).map_err(RenderError::from)?;
        Ok(self.generate(&request, progress)?)
    }
}
