use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Data integrity violated: {0}")]
    DataIntegrity(String),
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Load error: {0}")]
    Load(String),
}

impl AnalyticsError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound { entity, key: key.into() }
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

// Helper conversions
impl From<serde_json::Error> for AnalyticsError {
    fn from(e: serde_json::Error) -> Self { Self::Load(e.to_string()) }
}
impl From<std::io::Error> for AnalyticsError {
    fn from(e: std::io::Error) -> Self { Self::Load(e.to_string()) }
}
impl From<config::ConfigError> for AnalyticsError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
