//! Process settings.
//!
//! Values are layered: built-in defaults, then an optional TOML file
//! (`cptac.toml` in the working directory, or the path given on the command
//! line), then environment variables prefixed with `CPTAC_`, e.g.
//! `CPTAC_BIND=0.0.0.0:4000`.

use std::path::PathBuf;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::Result;
use crate::expression::DEFAULT_ASSAY_TYPE;

pub const DEFAULT_CONFIG_FILE: &str = "cptac.toml";
const PREFIX: &str = "CPTAC";

pub const DEFAULT_DATA_PATH: &str = "data/cptac_data.json";
pub const DEFAULT_BIND: &str = "127.0.0.1:4000";
pub const DEFAULT_LOG_FILTER: &str = "cptac_analytics=info,info";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// JSON snapshot the store is loaded from.
    pub data_path: PathBuf,
    /// Address the HTTP surface listens on.
    pub bind: String,
    /// Default tracing filter, used when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Assay read by the single-assay expression operations.
    pub assay_type: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            bind: DEFAULT_BIND.to_owned(),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            assay_type: DEFAULT_ASSAY_TYPE.to_owned(),
        }
    }
}

impl Settings {
    /// Reads defaults, the settings file and the environment, in that order.
    /// An explicitly given file has to exist; the default one may be absent.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let settings = Self::base(path)?
            .add_source(Environment::with_prefix(PREFIX).ignore_empty(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Defaults plus the settings file, without the environment layer.
    pub fn base(path: Option<&str>) -> Result<ConfigBuilder<DefaultState>> {
        let file = match path {
            Some(path) => File::new(path, FileFormat::Toml).required(true),
            None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
        };
        let defaults = Settings::default();
        let builder = Config::builder()
            .set_default("data_path", defaults.data_path.to_string_lossy().into_owned())?
            .set_default("bind", defaults.bind)?
            .set_default("log_filter", defaults.log_filter)?
            .set_default("assay_type", defaults.assay_type)?
            .add_source(file);
        Ok(builder)
    }
}
