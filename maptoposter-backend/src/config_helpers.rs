use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use axum::http::HeaderValue;
use maptoposter_artifacts::{ArtifactError, ArtifactStore};
use maptoposter_render::NetworkSettings;
use tower_http::cors::{Any, CorsLayer};

/// Parse host:port into a SocketAddr, with fallback to 0.0.0.0.
pub fn parse_bind_address(host: &str, port: u16) -> SocketAddr {
    host.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, port))
        .or_else(|_| host.parse::<SocketAddr>())
        .or_else(|_| host.parse::<Ipv6Addr>().map(|ip| SocketAddr::new(IpAddr::V6(ip), port)))
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], port)))
}

/// Build the CORS layer from configuration.
///
/// Origins that are not valid header values are skipped with a warning.
pub fn cors_layer_from_config(cfg: &maptoposter_config::CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if cfg.allow_all_origins || cfg.allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = cfg
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

pub fn network_settings_from_config(cfg: &maptoposter_config::RenderConfig) -> NetworkSettings {
    NetworkSettings {
        nominatim_url: cfg.nominatim_url.clone(),
        overpass_url: cfg.overpass_url.clone(),
        user_agent: cfg.user_agent.clone(),
        timeout: Duration::from_secs(cfg.http_timeout_secs),
    }
}

/// Open the configured artifact directory, or a fresh temporary one.
pub fn artifact_store_from_config(
    cfg: &maptoposter_config::ArtifactsConfig,
) -> Result<ArtifactStore, ArtifactError> {
    match &cfg.directory {
        Some(dir) => ArtifactStore::open(dir),
        None => ArtifactStore::temporary(),
    }
}

pub fn static_dir_from_config(cfg: &maptoposter_config::FrontendConfig) -> Option<PathBuf> {
    let dir = PathBuf::from(&cfg.static_dir);
    if dir.is_dir() {
        Some(dir)
    } else {
        tracing::info!(static_dir = %dir.display(), "static directory missing; frontend not served");
        None
    }
}
