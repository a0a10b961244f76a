use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::inference::{ContentTypePolicy, DEFAULT_CONTENT_TYPE};

pub const DEFAULT_ENDPOINT_NAME: &str = "image-classification-2025-09-20-08-00-11-224";
pub const DEFAULT_THRESHOLD: f64 = 0.93;
/// Synchronous invocation payload ceiling on the serverless platform.
pub const DEFAULT_MAX_EVENT_BYTES: usize = 6 * 1024 * 1024;

const CONFIG_PATH_VAR: &str = "PIPELINE_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub endpoint_name: String,
    /// A MIME type, or `auto` to detect it from the image bytes.
    pub content_type: String,
    pub threshold: f64,
    pub scratch_dir: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub max_event_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            endpoint_name: DEFAULT_ENDPOINT_NAME.to_string(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            threshold: DEFAULT_THRESHOLD,
            scratch_dir: std::env::temp_dir(),
            bind_address: "0.0.0.0".to_string(),
            port: 8081,
            max_event_bytes: DEFAULT_MAX_EVENT_BYTES,
        }
    }
}

impl PipelineConfig {
    /// `.env`, then the YAML file named by `PIPELINE_CONFIG` (if any), then
    /// individual environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => {
                log::info!("Loading pipeline config from {}", path);
                Self::from_yaml_file(Path::new(&path))?
            }
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&config_str)
    }

    pub fn from_yaml_str(config_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(config_str)?)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("INFERENCE_ENDPOINT_NAME") {
            self.endpoint_name = value;
        }
        if let Some(value) = lookup("INFERENCE_CONTENT_TYPE") {
            self.content_type = value;
        }
        if let Some(value) = lookup("CONFIDENCE_THRESHOLD") {
            self.threshold = parse_var("CONFIDENCE_THRESHOLD", &value)?;
        }
        if let Some(value) = lookup("SCRATCH_DIR") {
            self.scratch_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("BIND_ADDRESS") {
            self.bind_address = value;
        }
        if let Some(value) = lookup("PORT") {
            self.port = parse_var("PORT", &value)?;
        }
        if let Some(value) = lookup("MAX_EVENT_BYTES") {
            self.max_event_bytes = parse_var("MAX_EVENT_BYTES", &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "endpoint_name",
                value: self.endpoint_name.clone(),
            });
        }
        if self.content_type.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "content_type",
                value: self.content_type.clone(),
            });
        }
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::InvalidValue {
                key: "threshold",
                value: self.threshold.to_string(),
            });
        }
        if self.max_event_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_event_bytes",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn content_type_policy(&self) -> ContentTypePolicy {
        ContentTypePolicy::parse(&self.content_type)
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

fn parse_var<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
}
