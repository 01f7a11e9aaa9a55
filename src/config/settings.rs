//! Tunable settings for recording, sampling and export
//!
//! These are the knobs an experimenter may change between studies without
//! touching the recorded data model.
//!
//! # Main Types
//!
//! - [`RecorderSettings`] - Proximity cap and active-state gating
//! - [`GatePolicy`] - Which record operations honor the recording state
//! - [`SamplerSettings`] - Tick interval and gaze ray range
//! - [`ExportSettings`] - Where and how exports are written

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::session::delivery::ExportFormat;

/// Default distance below which product distance records are kept
pub const DEFAULT_PROXIMITY_THRESHOLD: f64 = 10.0;

/// Default sampling interval in milliseconds (10 Hz)
pub const DEFAULT_SAMPLING_INTERVAL_MS: u64 = 100;

/// Default maximum gaze ray length in scene units
pub const DEFAULT_MAX_GAZE_DISTANCE: f64 = 50.0;

/// Which record operations are ignored while the session is not recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GatePolicy {
    /// Every behavioral record operation (pose, gaze, view, area, distance,
    /// selection) requires an active recording.
    #[default]
    Unified,
    /// Pose, gaze and distance require an active recording; product views,
    /// area transitions and selections are accepted at any time. Matches
    /// datasets collected with the browser-only recorder.
    Legacy,
}

impl GatePolicy {
    /// Whether area, view and selection records require an active recording
    pub fn gates_interactions(&self) -> bool {
        matches!(self, GatePolicy::Unified)
    }
}

impl std::fmt::Display for GatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatePolicy::Unified => write!(f, "unified"),
            GatePolicy::Legacy => write!(f, "legacy"),
        }
    }
}

/// Settings consumed by the session recorder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderSettings {
    /// Product distance records are only kept strictly below this distance
    #[serde(default = "default_proximity_threshold")]
    pub proximity_threshold: f64,

    /// Active-state gating policy
    #[serde(default)]
    pub gate_policy: GatePolicy,
}

fn default_proximity_threshold() -> f64 {
    DEFAULT_PROXIMITY_THRESHOLD
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            proximity_threshold: DEFAULT_PROXIMITY_THRESHOLD,
            gate_policy: GatePolicy::default(),
        }
    }
}

impl RecorderSettings {
    /// Use a different gate policy
    pub fn with_gate_policy(mut self, policy: GatePolicy) -> Self {
        self.gate_policy = policy;
        self
    }

    /// Use a different proximity threshold
    pub fn with_proximity_threshold(mut self, threshold: f64) -> Self {
        self.proximity_threshold = threshold;
        self
    }
}

/// Settings for the fixed-rate scene sampler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerSettings {
    /// Milliseconds between ticks
    #[serde(default = "default_sampling_interval_ms")]
    pub interval_ms: u64,

    /// Gaze rays stop after this distance
    #[serde(default = "default_max_gaze_distance")]
    pub max_gaze_distance: f64,
}

fn default_sampling_interval_ms() -> u64 {
    DEFAULT_SAMPLING_INTERVAL_MS
}

fn default_max_gaze_distance() -> f64 {
    DEFAULT_MAX_GAZE_DISTANCE
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_SAMPLING_INTERVAL_MS,
            max_gaze_distance: DEFAULT_MAX_GAZE_DISTANCE,
        }
    }
}

impl SamplerSettings {
    /// Sampling rate in Hz
    pub fn rate_hz(&self) -> f64 {
        if self.interval_ms == 0 {
            0.0
        } else {
            1000.0 / self.interval_ms as f64
        }
    }
}

/// Export output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Directory for exported files (app data dir when unset)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Format used when none is requested explicitly
    #[serde(default)]
    pub default_format: ExportFormat,

    /// Pretty-print JSON exports
    #[serde(default = "default_true")]
    pub pretty: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: None,
            default_format: ExportFormat::Json,
            pretty: true,
        }
    }
}

impl ExportSettings {
    /// Resolve the output directory, falling back to the app exports dir
    pub fn resolve_output_dir(&self) -> Option<PathBuf> {
        self.output_dir.clone().or_else(super::default_export_dir)
    }
}
