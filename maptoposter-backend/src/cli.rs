use clap::Parser;

/// Map poster generation server.
#[derive(Parser, Debug, Default)]
#[command(name = "maptoposter-backend", version, about)]
pub struct CliArgs {
    /// Path to a configuration file (TOML, YAML or JSON).
    #[arg(short = 'c', long = "config-path", env = "MAPTOPOSTER_CONFIG_PATH")]
    pub config_path: Option<String>,

    /// Override `server.host`.
    #[arg(long)]
    pub host: Option<String>,

    /// Override `server.port`.
    #[arg(long)]
    pub port: Option<u16>,
}

impl CliArgs {
    /// Apply command-line overrides on top of loaded configuration.
    pub fn apply(&self, cfg: &mut maptoposter_config::Config) {
        if let Some(host) = &self.host {
            cfg.server.host = host.clone();
        }
        if let Some(port) = self.port {
            cfg.server.port = port;
        }
    }
}
