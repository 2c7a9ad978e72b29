use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_CONFIG_PATH: &str = "SIR_AI_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const DEFAULT_PORT: u16 = 5001;
const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 30;

/// HSV thresholds for the rust-color mask
///
/// All channels are on a 0-255 scale. These are tuned constants for
/// brown/orange corrosion tones, not derived values; override them via the
/// `corrosion` section of the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorrosionThresholds {
    pub hue_min: u8,
    pub hue_max: u8,
    pub saturation_min: u8,
    pub value_min: u8,
}

impl Default for CorrosionThresholds {
    fn default() -> Self {
        Self {
            hue_min: 10,
            hue_max: 25,
            saturation_min: 100,
            value_min: 20,
        }
    }
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub corrosion: CorrosionThresholds,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Root directory that `/analyze` file paths are resolved against
    pub data_root: PathBuf,
    /// Custom trained detector weights (ONNX)
    pub model_path: PathBuf,
    /// Generic pretrained weights used when the custom model is absent
    pub fallback_model_path: PathBuf,
    /// Optional sidecar file with one class label per line
    pub labels_path: PathBuf,
    /// Line-oriented knowledge document for the chat endpoint
    pub knowledge_base_path: PathBuf,
    /// Upper bound on detector inference per request
    pub inference_timeout: Duration,
    pub corrosion: CorrosionThresholds,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            data_root: PathBuf::from("data"),
            model_path: PathBuf::from("models/defect_model.onnx"),
            fallback_model_path: PathBuf::from("models/yolov8n.onnx"),
            labels_path: PathBuf::from("models/labels.txt"),
            knowledge_base_path: PathBuf::from("knowledge_base.txt"),
            inference_timeout: Duration::from_secs(DEFAULT_INFERENCE_TIMEOUT_SECS),
            corrosion: CorrosionThresholds::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let defaults = Config::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let host = std::env::var("HOST").unwrap_or(defaults.host);

        let timeout_secs = std::env::var("INFERENCE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_INFERENCE_TIMEOUT_SECS);

        let config_path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let corrosion = Self::load_config_file(&config_path)
            .map(|cf| cf.corrosion)
            .unwrap_or_default();

        Self {
            host,
            port,
            data_root: env_path("DATA_ROOT", defaults.data_root),
            model_path: env_path("MODEL_PATH", defaults.model_path),
            fallback_model_path: env_path("FALLBACK_MODEL_PATH", defaults.fallback_model_path),
            labels_path: env_path("LABELS_PATH", defaults.labels_path),
            knowledge_base_path: env_path("KNOWLEDGE_BASE_PATH", defaults.knowledge_base_path),
            inference_timeout: Duration::from_secs(timeout_secs),
            corrosion,
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                let contents = contents.trim();
                if contents.is_empty() {
                    tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
                    return Some(ConfigFile::default());
                }

                match serde_yaml::from_str(contents) {
                    Ok(config) => {
                        tracing::info!(path = %path.display(), "Loaded configuration from file");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_path(var: &str, default: PathBuf) -> PathBuf {
    std::env::var(var).map(PathBuf::from).unwrap_or(default)
}
