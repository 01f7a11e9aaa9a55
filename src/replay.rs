//! Replay of recorded interaction traces
//!
//! A trace is a JSON-lines log of everything the viewer told the recorder,
//! each line stamped with the wall-clock millisecond it happened at:
//!
//! ```text
//! {"t": 1700000000000, "event": "start"}
//! {"t": 1700000000100, "event": "pose", "position": {"x":0,"y":1.6,"z":5}, "rotation": {"x":0,"y":0,"z":0}}
//! {"t": 1700000000100, "event": "gaze", "direction": {"x":0,"y":0,"z":-1}, "target": "cake1"}
//! {"t": 1700000000900, "event": "select", "productId": "cake1", "method": "click"}
//! {"t": 1700000001000, "event": "stop"}
//! ```
//!
//! Replaying drives a [`ManualClock`], so the resulting export is identical
//! to the one the live session would have produced.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use crate::clock::ManualClock;
use crate::config::{ExperimentConditions, RecorderSettings, SessionConfig};
use crate::error::{Result, ResultExt, ShopSenseError};
use crate::session::{EvaluationValue, SelectionMethod, SessionRecorder};
use crate::types::{Timestamp, Vec3};

/// One line of a trace
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TraceEntry {
    /// Epoch milliseconds
    pub t: Timestamp,
    #[serde(flatten)]
    pub event: TraceEvent,
}

/// Recorder call captured in a trace
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TraceEvent {
    Start,
    Stop,
    Reset,
    Pose {
        position: Vec3,
        rotation: Vec3,
    },
    Gaze {
        direction: Vec3,
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        point: Option<Vec3>,
    },
    #[serde(rename_all = "camelCase")]
    View {
        product_id: String,
    },
    AreaEnter {
        zone: String,
    },
    AreaExit,
    #[serde(rename_all = "camelCase")]
    Distance {
        product_id: String,
        distance: f64,
    },
    #[serde(rename_all = "camelCase")]
    Select {
        product_id: String,
        #[serde(default)]
        method: SelectionMethod,
    },
    #[serde(rename_all = "camelCase")]
    FinalSelection {
        product_id: String,
    },
    Evaluation {
        category: String,
        value: EvaluationValue,
        #[serde(default)]
        comment: String,
    },
    Conditions {
        conditions: ExperimentConditions,
    },
}

/// Parse a JSON-lines trace, skipping blank lines and `#` comments
pub fn parse_trace(content: &str) -> Result<Vec<TraceEntry>> {
    let mut entries = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry = serde_json::from_str(line).map_err(|e| ShopSenseError::Trace {
            line: idx + 1,
            message: e.to_string(),
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Read and parse a trace file
pub fn load_trace(path: impl AsRef<Path>) -> Result<Vec<TraceEntry>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read trace {:?}", path))?;
    parse_trace(&content).with_context(|| format!("Failed to parse trace {:?}", path))
}

/// Apply one event to a recorder
pub fn apply(recorder: &mut SessionRecorder, event: &TraceEvent) {
    match event {
        TraceEvent::Start => recorder.start(),
        TraceEvent::Stop => recorder.stop(),
        TraceEvent::Reset => recorder.reset(),
        TraceEvent::Pose { position, rotation } => recorder.record_pose(*position, *rotation),
        TraceEvent::Gaze {
            direction,
            target,
            point,
        } => recorder.record_gaze(*direction, target.as_deref(), *point),
        TraceEvent::View { product_id } => recorder.record_product_view(product_id),
        TraceEvent::AreaEnter { zone } => recorder.record_area_enter(zone),
        TraceEvent::AreaExit => recorder.record_area_exit(),
        TraceEvent::Distance {
            product_id,
            distance,
        } => recorder.record_product_distance(product_id, *distance),
        TraceEvent::Select { product_id, method } => {
            recorder.record_selection(product_id, method.clone())
        }
        TraceEvent::FinalSelection { product_id } => recorder.set_final_selection(product_id),
        TraceEvent::Evaluation {
            category,
            value,
            comment,
        } => recorder.record_subjective_evaluation(category, value.clone(), comment),
        TraceEvent::Conditions { conditions } => {
            recorder.update_experiment_conditions(conditions.clone())
        }
    }
}

/// Build a recorder on a manual clock and feed it the whole trace
///
/// The clock starts at the first entry's timestamp (or 0 for an empty
/// trace) and is moved to each entry's `t` before it is applied.
pub fn replay(
    config: SessionConfig,
    settings: RecorderSettings,
    entries: &[TraceEntry],
) -> SessionRecorder {
    let clock = ManualClock::new(entries.first().map(|e| e.t).unwrap_or(0));
    let mut recorder = SessionRecorder::with_clock(config, settings, Arc::new(clock.clone()));

    for entry in entries {
        clock.set(entry.t);
        apply(&mut recorder, &entry.event);
    }
    tracing::info!(
        "Replayed {} trace entries into session {}",
        entries.len(),
        recorder.session_id()
    );
    recorder
}
