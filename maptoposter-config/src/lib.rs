use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Pre-compiled regex for hostname validation (compiled once at first use)
static HOSTNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][-a-zA-Z0-9\.]*[a-zA-Z0-9]$").unwrap());

#[derive(Debug, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub logging: Option<LoggingSection>,
    #[serde(default)]
    pub cors: Option<CorsSection>,
    #[serde(default)]
    pub artifacts: Option<ArtifactsSection>,
    #[serde(default)]
    pub themes: Option<ThemesSection>,
    #[serde(default)]
    pub render: Option<RenderSection>,
    #[serde(default)]
    pub frontend: Option<FrontendSection>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub json: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct CorsSection {
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,
    #[serde(default)]
    pub allow_all_origins: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ArtifactsSection {
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub ttl_minutes: Option<u64>,
    #[serde(default)]
    pub sweep_interval_secs: Option<u64>,
    #[serde(default)]
    pub remove_on_shutdown: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ThemesSection {
    #[serde(default)]
    pub directory: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenderSection {
    #[serde(default)]
    pub nominatim_url: Option<String>,
    #[serde(default)]
    pub overpass_url: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub http_timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_pixels: Option<u64>,
    #[serde(default)]
    pub font_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FrontendSection {
    #[serde(default)]
    pub static_dir: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Load a RawConfigFile from a path. The format is inferred from the extension: .toml, .yaml/.yml, .json
pub fn load_raw_from_file<P: AsRef<Path>>(path: P) -> Result<RawConfigFile, ConfigError> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());
    parse_config_str(&s, ext.as_deref())
}

#[inline]
fn parse_config_str(s: &str, ext: Option<&str>) -> Result<RawConfigFile, ConfigError> {
    match ext {
        #[cfg(feature = "toml")]
        Some("toml") => toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string())),
        #[cfg(feature = "yaml")]
        Some("yaml" | "yml") => {
            serde_yaml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
        }
        #[cfg(feature = "json")]
        Some("json") => serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string())),
        _ => parse_config_auto(s),
    }
}

/// Try each enabled format in turn when the extension gives no hint.
#[inline]
fn parse_config_auto(s: &str) -> Result<RawConfigFile, ConfigError> {
    #[cfg(feature = "yaml")]
    if let Ok(cfg) = serde_yaml::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(feature = "toml")]
    if let Ok(cfg) = toml::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(feature = "json")]
    if let Ok(cfg) = serde_json::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(any(feature = "yaml", feature = "toml", feature = "json"))]
    {
        Err(ConfigError::Parse(
            "failed to parse config as any supported format".into(),
        ))
    }

    #[cfg(not(any(feature = "yaml", feature = "toml", feature = "json")))]
    {
        let _ = s;
        Err(ConfigError::Parse("no config format enabled".into()))
    }
}

/// Concrete application configuration with defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
    pub artifacts: ArtifactsConfig,
    pub themes: ThemesConfig,
    pub render: RenderConfig,
    pub frontend: FrontendConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_all_origins: bool,
}

/// Where generated posters live and how long they are kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactsConfig {
    /// Output directory. `None` means a fresh temporary directory per process.
    pub directory: Option<String>,
    pub ttl_minutes: u64,
    pub sweep_interval_secs: u64,
    pub remove_on_shutdown: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemesConfig {
    pub directory: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderConfig {
    pub nominatim_url: String,
    pub overpass_url: String,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    /// Upper bound on output pixels; larger requests are rendered at reduced scale.
    pub max_pixels: u64,
    /// TrueType/OpenType font for the poster caption. When unset, common
    /// system fonts are tried.
    pub font_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrontendConfig {
    pub static_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
            cors: CorsConfig {
                allowed_origins: Vec::new(),
                allow_all_origins: true,
            },
            artifacts: ArtifactsConfig {
                directory: None,
                ttl_minutes: 120,
                sweep_interval_secs: 3600,
                remove_on_shutdown: false,
            },
            themes: ThemesConfig {
                directory: "themes".to_string(),
            },
            render: RenderConfig {
                nominatim_url: "https://nominatim.openstreetmap.org".to_string(),
                overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
                user_agent: concat!("maptoposter/", env!("CARGO_PKG_VERSION")).to_string(),
                http_timeout_secs: 180,
                max_pixels: 120_000_000,
                font_path: None,
            },
            frontend: FrontendConfig {
                static_dir: "static".to_string(),
            },
        }
    }
}

#[inline]
fn parse_bool(s: &str) -> Result<bool, ()> {
    let bytes = s.as_bytes();
    match bytes {
        b"1" | b"true" | b"TRUE" | b"True" | b"yes" | b"YES" | b"Yes" | b"y" | b"Y" => Ok(true),
        b"0" | b"false" | b"FALSE" | b"False" | b"no" | b"NO" | b"No" | b"n" | b"N" => Ok(false),
        _ => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" => Ok(true),
            "false" | "no" | "n" => Ok(false),
            _ => Err(()),
        },
    }
}

#[inline]
fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .filter_map(|p| {
            let trimmed = p.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Helper macro to apply optional value if present
macro_rules! apply_opt {
    ($target:expr, $source:expr) => {
        if let Some(v) = $source {
            $target = v;
        }
    };
    ($target:expr, $source:expr, wrap) => {
        if let Some(v) = $source {
            $target = Some(v);
        }
    };
}

/// Load concrete `Config` from optional file and environment variables.
/// Environment variables take precedence over file values and defaults.
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();

    if let Some(p) = path {
        let raw = load_raw_from_file(p)?;
        if let Some(server) = raw.server {
            apply_opt!(cfg.server.host, server.host);
            apply_opt!(cfg.server.port, server.port);
        }
        if let Some(logging) = raw.logging {
            apply_opt!(cfg.logging.level, logging.level);
            apply_opt!(cfg.logging.json, logging.json);
        }
        if let Some(cors) = raw.cors {
            apply_opt!(cfg.cors.allowed_origins, cors.allowed_origins);
            apply_opt!(cfg.cors.allow_all_origins, cors.allow_all_origins);
        }
        if let Some(a) = raw.artifacts {
            apply_opt!(cfg.artifacts.directory, a.directory, wrap);
            apply_opt!(cfg.artifacts.ttl_minutes, a.ttl_minutes);
            apply_opt!(cfg.artifacts.sweep_interval_secs, a.sweep_interval_secs);
            apply_opt!(cfg.artifacts.remove_on_shutdown, a.remove_on_shutdown);
        }
        if let Some(t) = raw.themes {
            apply_opt!(cfg.themes.directory, t.directory);
        }
        if let Some(r) = raw.render {
            apply_opt!(cfg.render.nominatim_url, r.nominatim_url);
            apply_opt!(cfg.render.overpass_url, r.overpass_url);
            apply_opt!(cfg.render.user_agent, r.user_agent);
            apply_opt!(cfg.render.http_timeout_secs, r.http_timeout_secs);
            apply_opt!(cfg.render.max_pixels, r.max_pixels);
            apply_opt!(cfg.render.font_path, r.font_path, wrap);
        }
        if let Some(f) = raw.frontend {
            apply_opt!(cfg.frontend.static_dir, f.static_dir);
        }
    }

    apply_env_overrides(&mut cfg)?;

    Ok(cfg)
}

#[inline]
fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Parse(format!("invalid {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

#[inline]
fn env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(v) => parse_bool(&v)
            .map(Some)
            .map_err(|_| ConfigError::Parse(format!("invalid {}", key))),
        Err(_) => Ok(None),
    }
}

#[inline]
fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Apply all environment variable overrides to config
fn apply_env_overrides(cfg: &mut Config) -> Result<(), ConfigError> {
    // Server
    if let Some(v) = env_str("MAPTOPOSTER_SERVER_HOST") {
        cfg.server.host = v;
    }
    if let Some(v) = env_parse::<u16>("MAPTOPOSTER_SERVER_PORT")? {
        cfg.server.port = v;
    }

    // Logging
    if let Some(v) = env_str("MAPTOPOSTER_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = env_bool("MAPTOPOSTER_LOG_JSON")? {
        cfg.logging.json = v;
    }

    // CORS
    if let Some(v) = env_str("MAPTOPOSTER_CORS_ALLOWED_ORIGINS") {
        cfg.cors.allowed_origins = split_csv(&v);
    }
    if let Some(v) = env_bool("MAPTOPOSTER_CORS_ALLOW_ALL_ORIGINS")? {
        cfg.cors.allow_all_origins = v;
    }

    // Artifacts
    if let Some(v) = env_str("MAPTOPOSTER_ARTIFACTS_DIRECTORY") {
        cfg.artifacts.directory = Some(v);
    }
    if let Some(v) = env_parse::<u64>("MAPTOPOSTER_ARTIFACTS_TTL_MINUTES")? {
        cfg.artifacts.ttl_minutes = v;
    }
    if let Some(v) = env_parse::<u64>("MAPTOPOSTER_ARTIFACTS_SWEEP_INTERVAL_SECS")? {
        cfg.artifacts.sweep_interval_secs = v;
    }
    if let Some(v) = env_bool("MAPTOPOSTER_ARTIFACTS_REMOVE_ON_SHUTDOWN")? {
        cfg.artifacts.remove_on_shutdown = v;
    }

    // Themes
    if let Some(v) = env_str("MAPTOPOSTER_THEMES_DIRECTORY") {
        cfg.themes.directory = v;
    }

    // Render
    if let Some(v) = env_str("MAPTOPOSTER_NOMINATIM_URL") {
        cfg.render.nominatim_url = v;
    }
    if let Some(v) = env_str("MAPTOPOSTER_OVERPASS_URL") {
        cfg.render.overpass_url = v;
    }
    if let Some(v) = env_str("MAPTOPOSTER_USER_AGENT") {
        cfg.render.user_agent = v;
    }
    if let Some(v) = env_parse::<u64>("MAPTOPOSTER_HTTP_TIMEOUT_SECS")? {
        cfg.render.http_timeout_secs = v;
    }
    if let Some(v) = env_parse::<u64>("MAPTOPOSTER_MAX_PIXELS")? {
        cfg.render.max_pixels = v;
    }
    if let Some(v) = env_str("MAPTOPOSTER_FONT_PATH") {
        cfg.render.font_path = Some(v);
    }

    // Frontend
    if let Some(v) = env_str("MAPTOPOSTER_STATIC_DIR") {
        cfg.frontend.static_dir = v;
    }

    Ok(())
}

/// Longest artifact TTL accepted: one year.
pub const MAX_TTL_MINUTES: u64 = 365 * 24 * 60;

/// Validate higher-level constraints on the resolved configuration.
pub fn validate_config(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.server.port == 0 {
        return Err(ConfigError::Validation("server.port must be > 0".into()));
    }
    let host_ok = cfg.server.host.parse::<std::net::IpAddr>().is_ok()
        || HOSTNAME_REGEX.is_match(&cfg.server.host);
    if !host_ok {
        return Err(ConfigError::Validation(format!(
            "invalid server.host: {}",
            cfg.server.host
        )));
    }

    if cfg.artifacts.ttl_minutes == 0 {
        return Err(ConfigError::Validation(
            "artifacts.ttl_minutes must be > 0".into(),
        ));
    }
    if cfg.artifacts.ttl_minutes > MAX_TTL_MINUTES {
        return Err(ConfigError::Validation(format!(
            "artifacts.ttl_minutes must be <= {MAX_TTL_MINUTES}"
        )));
    }
    if cfg.artifacts.sweep_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "artifacts.sweep_interval_secs must be > 0".into(),
        ));
    }
    if cfg.themes.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "themes.directory must not be empty".into(),
        ));
    }
    if cfg.render.max_pixels == 0 {
        return Err(ConfigError::Validation(
            "render.max_pixels must be > 0".into(),
        ));
    }

    for (key, value) in [
        ("render.nominatim_url", &cfg.render.nominatim_url),
        ("render.overpass_url", &cfg.render.overpass_url),
    ] {
        match url::Url::parse(value) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            _ => {
                return Err(ConfigError::Validation(format!(
                    "{key} must be an http(s) URL: {value}"
                )))
            }
        }
    }

    for origin in &cfg.cors.allowed_origins {
        if origin == "*" {
            continue;
        }
        match url::Url::parse(origin) {
            Ok(u) => {
                let scheme = u.scheme();
                if scheme != "http" && scheme != "https" {
                    return Err(ConfigError::Validation(format!(
                        "CORS origin must be http or https: {}",
                        origin
                    )));
                }
            }
            Err(_) => {
                return Err(ConfigError::Validation(format!(
                    "invalid CORS origin: {}",
                    origin
                )))
            }
        }
    }
    Ok(())
}
