//! Configuration module for shopsense-rs
//!
//! This module handles study configuration:
//! - Session identity and experiment conditions
//! - Recorder, sampler and export settings
//! - Store layout needed by the sampler (zones and product anchors)
//!
//! # App Data Location
//!
//! Exports default to the platform-appropriate data directory under
//! `dev.shopsense.shopsense-rs/exports`:
//! - **Linux**: `~/.local/share/dev.shopsense.shopsense-rs/`
//! - **macOS**: `~/Library/Application Support/dev.shopsense.shopsense-rs/`
//! - **Windows**: `%APPDATA%\dev.shopsense.shopsense-rs\`
//!
//! # Files
//!
//! Study files may be TOML (`.toml`) or JSON (any other extension).
//!
//! # Example
//!
//! ```ignore
//! use shopsense_rs::config::StudyConfig;
//! use shopsense_rs::session::SessionRecorder;
//!
//! let study = StudyConfig::load("study.toml")?;
//! let recorder = SessionRecorder::with_settings(study.session.clone(), study.recorder.clone());
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{Result, ShopSenseError};
use crate::sampler::{ProductAnchor, Zone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.shopsense.shopsense-rs";

/// Subdirectory of the app data dir that receives exports
pub const EXPORTS_DIR: &str = "exports";

/// Experiment condition values (pattern id, environment id, ...)
pub type ExperimentConditions = BTreeMap<String, serde_json::Value>;

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Default directory for exported session files
pub fn default_export_dir() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(EXPORTS_DIR))
}

// ==================== Session Config ====================

/// Identity and initial conditions for one recording session
///
/// Missing identifiers are generated when the recorder is constructed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Participant identifier
    #[serde(default)]
    pub participant_id: Option<String>,

    /// Session identifier
    #[serde(default)]
    pub session_id: Option<String>,

    /// Initial experiment conditions
    #[serde(default)]
    pub experiment_conditions: ExperimentConditions,
}

impl SessionConfig {
    /// Create a config for a known participant
    pub fn new(participant_id: impl Into<String>) -> Self {
        Self {
            participant_id: Some(participant_id.into()),
            ..Default::default()
        }
    }

    /// Set the session identifier
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Add an experiment condition
    pub fn with_condition(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.experiment_conditions.insert(key.into(), value.into());
        self
    }

    /// Participant id, generating one if absent
    pub fn resolve_participant_id(&self) -> String {
        self.participant_id.clone().unwrap_or_else(generate_id)
    }

    /// Session id, generating one if absent
    pub fn resolve_session_id(&self) -> String {
        self.session_id.clone().unwrap_or_else(generate_id)
    }
}

/// Generate a random identifier
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ==================== Study Config ====================

/// Complete configuration for a study run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Config format version for future compatibility
    #[serde(default = "default_study_version")]
    pub version: u32,

    /// Study name
    #[serde(default = "default_study_name")]
    pub name: String,

    /// Session identity and conditions
    #[serde(default)]
    pub session: SessionConfig,

    /// Recorder settings
    #[serde(default)]
    pub recorder: RecorderSettings,

    /// Sampler settings
    #[serde(default)]
    pub sampler: SamplerSettings,

    /// Export settings
    #[serde(default)]
    pub export: ExportSettings,

    /// Store zones used for dwell tracking
    #[serde(default)]
    pub zones: Vec<Zone>,

    /// Product positions used for distance tracking
    #[serde(default)]
    pub products: Vec<ProductAnchor>,
}

fn default_study_version() -> u32 {
    1
}

fn default_study_name() -> String {
    "Untitled Study".to_string()
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            version: 1,
            name: default_study_name(),
            session: SessionConfig::default(),
            recorder: RecorderSettings::default(),
            sampler: SamplerSettings::default(),
            export: ExportSettings::default(),
            zones: Vec::new(),
            products: Vec::new(),
        }
    }
}

impl StudyConfig {
    /// Load a study file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ShopSenseError::Config(format!("Failed to read study file {:?}: {}", path, e))
        })?;

        Self::parse(&content, is_toml(path)).map_err(|e| e.with_context(format!("{:?}", path)))
    }

    /// Parse study content as TOML or JSON
    pub fn parse(content: &str, toml: bool) -> Result<Self> {
        let config: Self = if toml {
            toml::from_str(content)
                .map_err(|e| ShopSenseError::Config(format!("Failed to parse study TOML: {}", e)))?
        } else {
            serde_json::from_str(content)
                .map_err(|e| ShopSenseError::Config(format!("Failed to parse study JSON: {}", e)))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a study file, returning defaults if any error occurs
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load study config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the study as TOML or pretty JSON depending on the extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ShopSenseError::Config(format!("Failed to create study directory: {}", e))
            })?;
        }

        let content = if is_toml(path) {
            toml::to_string_pretty(self)
                .map_err(|e| ShopSenseError::Config(format!("Failed to serialize study: {}", e)))?
        } else {
            serde_json::to_string_pretty(self)
                .map_err(|e| ShopSenseError::Config(format!("Failed to serialize study: {}", e)))?
        };

        std::fs::write(path, content).map_err(|e| {
            ShopSenseError::Config(format!("Failed to write study file {:?}: {}", path, e))
        })
    }

    /// Reject settings the recorder cannot work with
    pub fn validate(&self) -> Result<()> {
        let threshold = self.recorder.proximity_threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ShopSenseError::Config(format!(
                "proximity_threshold must be positive, got {}",
                threshold
            )));
        }
        let range = self.sampler.max_gaze_distance;
        if !range.is_finite() || range <= 0.0 {
            return Err(ShopSenseError::Config(format!(
                "max_gaze_distance must be positive, got {}",
                range
            )));
        }
        if self.sampler.interval_ms == 0 {
            return Err(ShopSenseError::Config(
                "sampler interval_ms must be non-zero".to_string(),
            ));
        }
        for zone in &self.zones {
            if zone.id.is_empty() {
                return Err(ShopSenseError::Config("zone with empty id".to_string()));
            }
        }
        Ok(())
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vec3;

    #[test]
    fn test_generated_ids_when_absent() {
        let config = SessionConfig::default();
        let a = config.resolve_session_id();
        let b = config.resolve_session_id();
        assert!(!a.is_empty());
        assert_ne!(a, b);
    }

    #[test]
    fn test_explicit_ids_kept() {
        let config = SessionConfig::new("P01").with_session_id("S01");
        assert_eq!(config.resolve_participant_id(), "P01");
        assert_eq!(config.resolve_session_id(), "S01");
    }

    #[test]
    fn test_parse_toml() {
        let content = r#"
name = "cake shelf"

[session]
participant_id = "P07"

[session.experiment_conditions]
pattern = "A"
lighting = 2

[recorder]
proximity_threshold = 6.5
gate_policy = "legacy"

[[zones]]
id = "entrance"
min = { x = -5.0, y = 0.0, z = 0.0 }
max = { x = 5.0, y = 3.0, z = 10.0 }

[[products]]
id = "cake1"
position = { x = -2.4, y = 1.0, z = -10.0 }
"#;
        let study = StudyConfig::parse(content, true).unwrap();
        assert_eq!(study.name, "cake shelf");
        assert_eq!(study.session.participant_id.as_deref(), Some("P07"));
        assert_eq!(study.session.experiment_conditions["lighting"], 2);
        assert_eq!(study.recorder.proximity_threshold, 6.5);
        assert_eq!(study.recorder.gate_policy, GatePolicy::Legacy);
        assert_eq!(study.sampler.interval_ms, DEFAULT_SAMPLING_INTERVAL_MS);
        assert_eq!(study.zones[0].id, "entrance");
        assert_eq!(study.products[0].position, Vec3::new(-2.4, 1.0, -10.0));
    }

    #[test]
    fn test_parse_empty_json_uses_defaults() {
        let study = StudyConfig::parse("{}", false).unwrap();
        assert_eq!(study.version, 1);
        assert_eq!(study.recorder.proximity_threshold, DEFAULT_PROXIMITY_THRESHOLD);
        assert!(study.zones.is_empty());
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let err = StudyConfig::parse(r#"{"recorder":{"proximity_threshold":-1}}"#, false).unwrap_err();
        assert!(err.to_string().contains("proximity_threshold"));
    }

    #[test]
    fn test_rejects_bad_gaze_range() {
        for bad in ["-5", "0"] {
            let json = format!(r#"{{"sampler":{{"max_gaze_distance":{}}}}}"#, bad);
            let err = StudyConfig::parse(&json, false).unwrap_err();
            assert!(err.to_string().contains("max_gaze_distance"));
        }

        let mut study = StudyConfig::default();
        study.sampler.max_gaze_distance = f64::NAN;
        assert!(study.validate().is_err());
        study.sampler.max_gaze_distance = 30.0;
        study.recorder.proximity_threshold = f64::INFINITY;
        assert!(study.validate().is_err());
    }

    #[test]
    fn test_missing_name_matches_default() {
        let study = StudyConfig::parse("{}", false).unwrap();
        assert_eq!(study.name, StudyConfig::default().name);

        let study = StudyConfig::parse("version = 1\n", true).unwrap();
        assert_eq!(study.name, "Untitled Study");
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("study.json");

        let mut study = StudyConfig::default();
        study.session = SessionConfig::new("P02").with_condition("pattern", "B");
        study.save(&path).unwrap();

        let loaded = StudyConfig::load(&path).unwrap();
        assert_eq!(loaded.session, study.session);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let study = StudyConfig::load_or_default("/definitely/not/here.toml");
        assert_eq!(study.name, "Untitled Study");
    }
}
