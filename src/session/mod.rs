//! Session recording and export module
//!
//! This module provides the behavioral recorder for a virtual-store
//! shopping task and everything needed to get its data out again.
//!
//! # Features
//!
//! - Record observer poses, gaze samples and ray-cast targets per tick
//! - Derive product views, zone dwell times and approach/retreat events
//! - Log selections, the final choice and questionnaire answers
//! - Export a structured JSON report or a `Category,Metric,Value` summary
//! - Deliver exports through a pluggable sink

pub mod delivery;
pub mod recorder;
pub mod report;
pub mod types;

pub use delivery::{ExportArtifact, ExportFormat, ExportSink, FileSink, MemorySink};
pub use recorder::SessionRecorder;
pub use report::{StructuredReport, SummaryRow};
pub use types::{
    EvaluationValue, FinalSelection, GazeSample, PoseSample, ProductDistance, ProductSelection,
    ProductView, SelectionMethod, SessionInfo, SessionState, SessionStatistics,
    SubjectiveEvaluation,
};
