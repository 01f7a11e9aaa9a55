//! # shopsense-rs: Virtual-Store Behavior Recorder
//!
//! Records what a participant does during a simulated shopping task in an
//! immersive 3D store and turns it into analysis-ready exports. The viewer
//! renders the store; this crate measures.
//!
//! ## Architecture
//!
//! - **Session**: [`SessionRecorder`] owns all buffers, derives product views,
//!   zone dwell times and approach events, and exports reports
//! - **Sampler**: [`SceneSampler`] drives the recorder at a fixed rate from
//!   observer poses and the viewer's ray-intersection query
//! - **Replay**: feeds a recorded JSON-lines trace back through a recorder
//! - **Config**: study files (TOML or JSON) with identity, settings and layout
//!
//! ## Example
//!
//! ```ignore
//! use shopsense_rs::{config::SessionConfig, session::{FileSink, SessionRecorder}, types::Vec3};
//!
//! let mut recorder = SessionRecorder::new(SessionConfig::new("P01"));
//! recorder.start();
//! recorder.record_pose(Vec3::new(0.0, 1.6, 5.0), Vec3::ZERO);
//! recorder.record_gaze(Vec3::new(0.0, 0.0, -1.0), Some("cake1"), None);
//! recorder.record_selection("cake1", "click");
//! recorder.stop();
//!
//! let mut sink = FileSink::new("exports");
//! recorder.download("json", None, &mut sink)?;
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod replay;
pub mod sampler;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{GatePolicy, RecorderSettings, SessionConfig, StudyConfig};
pub use error::{Result, ShopSenseError};
pub use sampler::{ObserverPose, RayCaster, RayHit, SceneSampler};
pub use session::{ExportFormat, SessionRecorder, StructuredReport};
pub use types::Vec3;
