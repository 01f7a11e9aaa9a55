//! Session data types
//!
//! Every record the recorder appends, plus the lifecycle state and the
//! summary statistics. Field names serialize in camelCase because the
//! exported JSON is consumed by existing analysis scripts.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ExperimentConditions;
use crate::types::{Timestamp, Vec3};

/// State of the recording lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Created or reset, not yet recording
    #[default]
    Idle,
    /// Currently recording
    Recording,
    /// Recording stopped; the session is closed
    Stopped,
}

impl SessionState {
    /// Check if currently recording
    pub fn is_recording(&self) -> bool {
        matches!(self, SessionState::Recording)
    }

    /// Check if the session has been closed
    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Stopped)
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Recording => "Recording",
            SessionState::Stopped => "Stopped",
        }
    }
}

/// Identity and timing of one recording run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub participant_id: String,
    pub session_id: String,
    pub start_time: Timestamp,
    /// `None` while the session is still open
    pub end_time: Option<Timestamp>,
    pub experiment_conditions: ExperimentConditions,
}

/// Observer position and rotation at one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    pub timestamp: Timestamp,
    pub position: Vec3,
    pub rotation: Vec3,
}

/// Gaze direction and what it hit at one tick
///
/// A `None` target means the observer was looking at nothing of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GazeSample {
    pub timestamp: Timestamp,
    pub direction: Vec3,
    pub target_product_id: Option<String>,
    pub target_position: Option<Vec3>,
}

/// A product entering gaze focus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub timestamp: Timestamp,
    pub product_id: String,
}

/// Distance from the observer to a nearby product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDistance {
    pub timestamp: Timestamp,
    pub product_id: String,
    pub distance: f64,
    /// Closer than the previous record for the same product
    pub is_approaching: bool,
}

/// How a product was selected
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SelectionMethod {
    /// Pointer click
    #[default]
    Click,
    /// Dwell-based gaze selection
    Gaze,
    /// Any other input tagged by the viewer
    Other(String),
}

impl SelectionMethod {
    pub fn as_str(&self) -> &str {
        match self {
            SelectionMethod::Click => "click",
            SelectionMethod::Gaze => "gaze",
            SelectionMethod::Other(tag) => tag,
        }
    }
}

impl From<String> for SelectionMethod {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "click" => SelectionMethod::Click,
            "gaze" => SelectionMethod::Gaze,
            _ => SelectionMethod::Other(tag),
        }
    }
}

impl From<&str> for SelectionMethod {
    fn from(tag: &str) -> Self {
        SelectionMethod::from(tag.to_string())
    }
}

impl From<SelectionMethod> for String {
    fn from(method: SelectionMethod) -> Self {
        method.as_str().to_string()
    }
}

impl fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discrete product selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSelection {
    pub timestamp: Timestamp,
    /// Milliseconds since the session started
    pub time_from_start: i64,
    pub product_id: String,
    pub selection_method: SelectionMethod,
}

/// The session's terminal choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalSelection {
    pub product_id: String,
    pub timestamp: Timestamp,
    /// Selection events logged before finalizing
    pub total_selections: usize,
    /// Distinct products viewed before finalizing
    pub compared_products: usize,
}

/// A questionnaire answer: numeric scale or free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvaluationValue {
    Number(f64),
    Text(String),
}

impl EvaluationValue {
    /// Numbers must be finite to survive a JSON round trip
    pub fn is_valid(&self) -> bool {
        match self {
            EvaluationValue::Number(n) => n.is_finite(),
            EvaluationValue::Text(_) => true,
        }
    }
}

impl From<f64> for EvaluationValue {
    fn from(v: f64) -> Self {
        EvaluationValue::Number(v)
    }
}

impl From<i32> for EvaluationValue {
    fn from(v: i32) -> Self {
        EvaluationValue::Number(v as f64)
    }
}

impl From<&str> for EvaluationValue {
    fn from(v: &str) -> Self {
        EvaluationValue::Text(v.to_string())
    }
}

impl From<String> for EvaluationValue {
    fn from(v: String) -> Self {
        EvaluationValue::Text(v)
    }
}

impl fmt::Display for EvaluationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationValue::Number(n) => write!(f, "{}", n),
            EvaluationValue::Text(s) => f.write_str(s),
        }
    }
}

/// Subjective rating for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectiveEvaluation {
    pub value: EvaluationValue,
    pub comment: String,
    pub timestamp: Timestamp,
}

/// Fixed-shape session summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatistics {
    pub session_duration: i64,
    pub trajectory_points: usize,
    pub gaze_records: usize,
    pub unique_products_viewed: usize,
    pub total_product_selections: usize,
    pub total_product_views: usize,
    pub areas_visited: usize,
}
