use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::ingest::SourceSettings;
use crate::threshold::ThresholdPolicy;

const DEFAULT_DB_PATH: &str = "wastewatch.db";
const DEFAULT_ARTIFACT_DIR: &str = "artifacts";
const DEFAULT_SOURCE_URI: &str = "stub://camera";
const DEFAULT_TARGET_FPS: u32 = 10;
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_THRESHOLD: f64 = 0.5;
const DEFAULT_DETECTOR_BACKEND: &str = "stub";

#[derive(Debug, Deserialize, Default)]
struct WatchConfigFile {
    db_path: Option<String>,
    artifact_dir: Option<String>,
    source: Option<SourceConfigFile>,
    thresholds: Option<ThresholdConfigFile>,
    detector: Option<DetectorConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    uri: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    frame_limit: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct ThresholdConfigFile {
    default: Option<f64>,
    overrides: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<String>,
    labels: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub db_path: String,
    pub artifact_dir: String,
    pub source: SourceSettings,
    pub thresholds: ThresholdSettings,
    pub detector: DetectorSettings,
}

#[derive(Debug, Clone)]
pub struct ThresholdSettings {
    pub default: f64,
    pub overrides: BTreeMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: Option<String>,
    pub labels: Vec<String>,
}

impl WatchConfig {
    /// Load configuration: JSON file (if `WASTEWATCH_CONFIG` points at one),
    /// then env overrides, then validation.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("WASTEWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: WatchConfigFile) -> Self {
        let db_path = file.db_path.unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let artifact_dir = file
            .artifact_dir
            .unwrap_or_else(|| DEFAULT_ARTIFACT_DIR.to_string());
        let source = SourceSettings {
            uri: file
                .source
                .as_ref()
                .and_then(|source| source.uri.clone())
                .unwrap_or_else(|| DEFAULT_SOURCE_URI.to_string()),
            target_fps: file
                .source
                .as_ref()
                .and_then(|source| source.target_fps)
                .unwrap_or(DEFAULT_TARGET_FPS),
            width: file
                .source
                .as_ref()
                .and_then(|source| source.width)
                .unwrap_or(DEFAULT_WIDTH),
            height: file
                .source
                .as_ref()
                .and_then(|source| source.height)
                .unwrap_or(DEFAULT_HEIGHT),
            frame_limit: file.source.as_ref().and_then(|source| source.frame_limit),
        };
        let thresholds = ThresholdSettings {
            default: file
                .thresholds
                .as_ref()
                .and_then(|thresholds| thresholds.default)
                .unwrap_or(DEFAULT_THRESHOLD),
            overrides: file
                .thresholds
                .and_then(|thresholds| thresholds.overrides)
                .unwrap_or_default(),
        };
        let detector = DetectorSettings {
            backend: file
                .detector
                .as_ref()
                .and_then(|detector| detector.backend.clone())
                .unwrap_or_else(|| DEFAULT_DETECTOR_BACKEND.to_string()),
            model_path: file
                .detector
                .as_ref()
                .and_then(|detector| detector.model_path.clone()),
            labels: file
                .detector
                .and_then(|detector| detector.labels)
                .unwrap_or_default(),
        };
        Self {
            db_path,
            artifact_dir,
            source,
            thresholds,
            detector,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("WASTEWATCH_DB_PATH") {
            if !path.trim().is_empty() {
                self.db_path = path;
            }
        }
        if let Ok(dir) = std::env::var("WASTEWATCH_ARTIFACT_DIR") {
            if !dir.trim().is_empty() {
                self.artifact_dir = dir;
            }
        }
        if let Ok(uri) = std::env::var("WASTEWATCH_SOURCE_URI") {
            if !uri.trim().is_empty() {
                self.source.uri = uri;
            }
        }
        if let Ok(threshold) = std::env::var("WASTEWATCH_DEFAULT_THRESHOLD") {
            let value: f64 = threshold.parse().map_err(|_| {
                anyhow!("WASTEWATCH_DEFAULT_THRESHOLD must be a number in [0, 1]")
            })?;
            self.thresholds.default = value;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        // ThresholdPolicy re-checks ranges; building it here surfaces config
        // errors at load time instead of at pipeline start.
        self.threshold_policy()?;

        if self.source.target_fps == 0 {
            return Err(anyhow!("source target_fps must be greater than zero"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source dimensions must be greater than zero"));
        }
        match self.detector.backend.as_str() {
            "stub" => {}
            "tract" => {
                if self.detector.model_path.is_none() {
                    return Err(anyhow!("detector backend 'tract' requires model_path"));
                }
                if self.detector.labels.is_empty() {
                    return Err(anyhow!("detector backend 'tract' requires labels"));
                }
            }
            other => return Err(anyhow!("unknown detector backend '{}'", other)),
        }
        Ok(())
    }

    pub fn threshold_policy(&self) -> Result<ThresholdPolicy> {
        ThresholdPolicy::from_table(self.thresholds.default, &self.thresholds.overrides)
    }
}

fn read_config_file(path: &Path) -> Result<WatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
