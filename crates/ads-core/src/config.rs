//! Service configuration: defaults, an optional JSON file, then environment
//! overrides. Fixed for the lifetime of the process.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdsConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub vectordb: VectorDbConfig,
    pub embedding: EmbeddingConfig,
    pub timeouts: TimeoutConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            other => Err(ConfigError::Parse { key: "APP_ENV".into(), details: format!("unknown environment `{other}`") }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".into(), port: 8080 }
    }
}

/// Read consistency used by searches unless a caller asks otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadConsistency {
    Strong,
    #[default]
    Bounded,
    Eventually,
}

impl FromStr for ReadConsistency {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "strong" => Ok(Self::Strong),
            "bounded" => Ok(Self::Bounded),
            "eventually" | "eventual" => Ok(Self::Eventually),
            other => Err(ConfigError::Parse {
                key: "ADS_CONSISTENCY".into(),
                details: format!("unknown consistency level `{other}`"),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    pub collection: String,
    pub dimension: usize,
    /// IVF partitions built at index time.
    pub nlist: usize,
    /// IVF partitions scanned per query.
    pub nprobe: usize,
    pub top_k: usize,
    pub consistency: ReadConsistency,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            collection: "ads".into(),
            dimension: 1536,
            nlist: 128,
            nprobe: 32,
            top_k: 3,
            consistency: ReadConsistency::Bounded,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    #[default]
    OpenAi,
    Hashing,
}

impl fmt::Display for EmbeddingProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Hashing => write!(f, "hashing"),
        }
    }
}

impl FromStr for EmbeddingProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "hashing" | "hash" => Ok(Self::Hashing),
            other => Err(ConfigError::Parse {
                key: "ADS_EMBEDDING_PROVIDER".into(),
                details: format!("unknown provider `{other}`"),
            }),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub model: String,
    pub base_url: String,
    /// Taken from `OPENAI_API_KEY`; never written back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub normalize_text: bool,
}

impl fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("normalize_text", &self.normalize_text)
            .finish()
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::OpenAi,
            model: "text-embedding-ada-002".into(),
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            normalize_text: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub embed_ms: u64,
    pub store_ms: u64,
    pub index_ms: u64,
}

impl TimeoutConfig {
    pub fn embed(&self) -> Duration {
        Duration::from_millis(self.embed_ms)
    }

    pub fn store(&self) -> Duration {
        Duration::from_millis(self.store_ms)
    }

    pub fn index(&self) -> Duration {
        Duration::from_millis(self.index_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { embed_ms: 10_000, store_ms: 5_000, index_ms: 60_000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, initial_backoff_ms: 100, max_backoff_ms: 2_000 }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    env_var(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::Parse { key: key.to_string(), details: e.to_string() })
        })
        .transpose()
}

impl AdsConfig {
    /// Load from a JSON file; absent sections keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Defaults, then the file named by `ADS_CONFIG` if set, then env overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = match env_var("ADS_CONFIG") {
            Some(path) => {
                tracing::debug!(path = %path, "loading config file");
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_parse("APP_ENV")? {
            self.environment = v;
        }
        if let Some(v) = env_var("HOST") {
            self.server.host = v;
        }
        if let Some(v) = env_parse("PORT")? {
            self.server.port = v;
        }
        if let Some(v) = env_var("ADS_COLLECTION") {
            self.vectordb.collection = v;
        }
        if let Some(v) = env_parse("ADS_DIMENSION")? {
            self.vectordb.dimension = v;
        }
        if let Some(v) = env_parse("ADS_NLIST")? {
            self.vectordb.nlist = v;
        }
        if let Some(v) = env_parse("ADS_NPROBE")? {
            self.vectordb.nprobe = v;
        }
        if let Some(v) = env_parse("ADS_TOP_K")? {
            self.vectordb.top_k = v;
        }
        if let Some(v) = env_parse("ADS_CONSISTENCY")? {
            self.vectordb.consistency = v;
        }
        if let Some(v) = env_parse("ADS_EMBEDDING_PROVIDER")? {
            self.embedding.provider = v;
        }
        if let Some(v) = env_var("ADS_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Some(v) = env_var("OPENAI_BASE_URL") {
            self.embedding.base_url = v;
        }
        if let Some(v) = env_var("OPENAI_API_KEY") {
            self.embedding.api_key = Some(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let db = &self.vectordb;
        if db.collection.is_empty() {
            return Err(ConfigError::Invalid("vectordb.collection must not be empty".into()));
        }
        if db.dimension == 0 {
            return Err(ConfigError::Invalid("vectordb.dimension must be positive".into()));
        }
        if db.nlist == 0 {
            return Err(ConfigError::Invalid("vectordb.nlist must be positive".into()));
        }
        if db.nprobe == 0 || db.nprobe > db.nlist {
            return Err(ConfigError::Invalid(format!(
                "vectordb.nprobe must be in 1..={}, got {}",
                db.nlist, db.nprobe
            )));
        }
        if db.top_k == 0 {
            return Err(ConfigError::Invalid("vectordb.top_k must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        if self.embedding.provider == EmbeddingProviderKind::OpenAi && self.embedding.api_key.is_none() {
            return Err(ConfigError::Missing("OPENAI_API_KEY".into()));
        }
        Ok(())
    }
}
