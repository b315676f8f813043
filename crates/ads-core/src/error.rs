use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse {key}: {details}")]
    Parse { key: String, details: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Missing required setting: {0}")]
    Missing(String),
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed config file: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
