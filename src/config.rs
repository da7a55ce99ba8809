//! Layered runtime configuration.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, `BRENT_API_*`
//! environment variables, command-line flags.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::data::DataSources;

pub const DEFAULT_CONFIG_FILE: &str = "brent-api.toml";
pub const ENV_PREFIX: &str = "BRENT_API";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "brent-api", version, about = "Read-only HTTP API over Brent oil price data")]
pub struct Cli {
    /// Config file (TOML). Defaults to ./brent-api.toml when present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    /// Directory the data files are resolved against
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[arg(long)]
    pub prices_file: Option<PathBuf>,

    #[arg(long)]
    pub events_file: Option<PathBuf>,

    #[arg(long)]
    pub model_results_file: Option<PathBuf>,

    /// tracing filter, e.g. "info" or "brent_api=debug"
    #[arg(long = "log")]
    pub log_filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub prices_file: PathBuf,
    pub events_file: PathBuf,
    pub model_results_file: PathBuf,
    pub log_filter: String,
    pub metrics_addr: SocketAddr,
}

impl AppConfig {
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let file = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let settings = Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 5000)?
            .set_default("data_dir", "data")?
            .set_default("prices_file", "BrentOilPrices.csv")?
            .set_default("events_file", "historical_events.csv")?
            .set_default("model_results_file", "model_results.json")?
            .set_default("log_filter", "info")?
            .set_default("metrics_addr", "0.0.0.0:9000")?
            // an explicitly named file must exist, the default one is optional
            .add_source(File::from(file).required(cli.config.is_some()))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option("host", cli.host.clone())?
            .set_override_option("port", cli.port.map(i64::from))?
            .set_override_option("data_dir", path_override(&cli.data_dir))?
            .set_override_option("prices_file", path_override(&cli.prices_file))?
            .set_override_option("events_file", path_override(&cli.events_file))?
            .set_override_option("model_results_file", path_override(&cli.model_results_file))?
            .set_override_option("log_filter", cli.log_filter.clone())?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// File locations with relative names resolved against `data_dir`.
    pub fn data_sources(&self) -> DataSources {
        DataSources::new(
            self.resolve(&self.prices_file),
            self.resolve(&self.events_file),
            self.resolve(&self.model_results_file),
        )
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.data_dir.join(file)
        }
    }
}

fn path_override(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.to_string_lossy().into_owned())
}
