//! Session recorder for capturing shopping-task behavior
//!
//! The recorder owns every buffer of a session and is driven synchronously:
//! a sampler calls it once per tick with the observer pose and ray-query
//! result, UI handlers call it for discrete interactions, and exports can be
//! taken at any moment without side effects.
//!
//! Derived events are computed here:
//! - product views are run-length deduplicated against the previous view
//! - dwell time is folded into a per-zone total whenever a span closes
//! - distance records are capped by the proximity threshold and flagged as
//!   approaching when closer than the last record for the same product

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::{ExperimentConditions, RecorderSettings, SessionConfig};
use crate::types::{Timestamp, Vec3};

use super::types::{
    EvaluationValue, FinalSelection, GazeSample, PoseSample, ProductDistance, ProductSelection,
    ProductView, SelectionMethod, SessionInfo, SessionState, SessionStatistics,
    SubjectiveEvaluation,
};

/// A zone the observer is currently inside
#[derive(Debug, Clone, PartialEq)]
struct OpenZone {
    zone_id: String,
    entered_at: Timestamp,
}

/// Everything collected during a session
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionBuffers {
    pub trajectory: Vec<PoseSample>,
    pub gaze: Vec<GazeSample>,
    pub area_stay_time: BTreeMap<String, i64>,
    pub product_distances: Vec<ProductDistance>,
    pub product_selections: Vec<ProductSelection>,
    pub product_views: Vec<ProductView>,
    pub final_selection: Option<FinalSelection>,
    pub subjective_evaluations: BTreeMap<String, SubjectiveEvaluation>,
}

/// Session recorder for capturing behavioral data
#[derive(Debug)]
pub struct SessionRecorder {
    /// Identity and timing
    pub(crate) info: SessionInfo,
    /// Current lifecycle state
    state: SessionState,
    /// Threshold and gating
    settings: RecorderSettings,
    /// Time source
    clock: Arc<dyn Clock>,
    /// Collected data
    pub(crate) data: SessionBuffers,
    /// Dwell span not yet folded into `area_stay_time`
    open_zone: Option<OpenZone>,
    /// Last retained distance per product
    last_distance: HashMap<String, f64>,
    /// Latest timestamp handed out; stamps never go backwards
    last_stamp: Timestamp,
}

impl Default for SessionRecorder {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl SessionRecorder {
    /// Create a recorder with default settings and the system clock
    pub fn new(config: SessionConfig) -> Self {
        Self::with_settings(config, RecorderSettings::default())
    }

    /// Create a recorder with explicit settings
    pub fn with_settings(config: SessionConfig, settings: RecorderSettings) -> Self {
        Self::with_clock(config, settings, Arc::new(SystemClock))
    }

    /// Create a recorder with an injected clock
    pub fn with_clock(
        config: SessionConfig,
        settings: RecorderSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let now = clock.now_ms();
        let info = SessionInfo {
            participant_id: config.resolve_participant_id(),
            session_id: config.resolve_session_id(),
            start_time: now,
            end_time: None,
            experiment_conditions: config.experiment_conditions,
        };
        tracing::debug!(
            "Created recorder for participant {} session {}",
            info.participant_id,
            info.session_id
        );

        Self {
            info,
            state: SessionState::Idle,
            settings,
            clock,
            data: SessionBuffers::default(),
            open_zone: None,
            last_distance: HashMap::new(),
            last_stamp: now,
        }
    }

    // ==================== Accessors ====================

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if recording
    pub fn is_recording(&self) -> bool {
        self.state.is_recording()
    }

    /// Session identity and timing
    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn participant_id(&self) -> &str {
        &self.info.participant_id
    }

    pub fn session_id(&self) -> &str {
        &self.info.session_id
    }

    /// Active settings
    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    /// Zone whose dwell span is currently open
    pub fn current_zone(&self) -> Option<&str> {
        self.open_zone.as_ref().map(|z| z.zone_id.as_str())
    }

    pub fn trajectory(&self) -> &[PoseSample] {
        &self.data.trajectory
    }

    pub fn gaze(&self) -> &[GazeSample] {
        &self.data.gaze
    }

    pub fn product_views(&self) -> &[ProductView] {
        &self.data.product_views
    }

    pub fn product_distances(&self) -> &[ProductDistance] {
        &self.data.product_distances
    }

    pub fn product_selections(&self) -> &[ProductSelection] {
        &self.data.product_selections
    }

    /// Closed dwell totals per zone, in milliseconds
    pub fn area_stay_time(&self) -> &BTreeMap<String, i64> {
        &self.data.area_stay_time
    }

    pub fn final_selection(&self) -> Option<&FinalSelection> {
        self.data.final_selection.as_ref()
    }

    pub fn subjective_evaluations(&self) -> &BTreeMap<String, SubjectiveEvaluation> {
        &self.data.subjective_evaluations
    }

    // ==================== Lifecycle ====================

    /// Start recording
    ///
    /// Ignored (with a warning) while already recording or once the session
    /// has been closed; call [`reset`](Self::reset) to reuse a closed session.
    pub fn start(&mut self) {
        match self.state {
            SessionState::Recording => {
                tracing::warn!("Recording already started for session {}", self.info.session_id);
            }
            SessionState::Stopped => {
                tracing::warn!(
                    "Session {} is closed; reset it before starting again",
                    self.info.session_id
                );
            }
            SessionState::Idle => {
                let now = self.stamp();
                self.info.start_time = now;
                self.info.end_time = None;
                self.state = SessionState::Recording;
                tracing::info!("Recording started: session {}", self.info.session_id);
            }
        }
    }

    /// Stop recording
    ///
    /// Folds any open dwell span so no dwell time is lost.
    pub fn stop(&mut self) {
        if !self.is_recording() {
            tracing::warn!(
                "Cannot stop session {}: state is {}",
                self.info.session_id,
                self.state.display_name()
            );
            return;
        }

        let now = self.stamp();
        self.state = SessionState::Stopped;
        self.info.end_time = Some(now);
        self.close_zone(now);

        tracing::info!(
            "Recording stopped: session {} lasted {}ms",
            self.info.session_id,
            self.session_duration()
        );
    }

    /// Clear all collected data and restart the session clock
    ///
    /// Identifiers and experiment conditions are kept. A closed session
    /// returns to idle; a running one keeps recording.
    pub fn reset(&mut self) {
        self.data = SessionBuffers::default();
        self.open_zone = None;
        self.last_distance.clear();
        self.info.start_time = self.stamp();
        self.info.end_time = None;
        if self.state.is_closed() {
            self.state = SessionState::Idle;
        }
        tracing::info!("Session {} data reset", self.info.session_id);
    }

    // ==================== Recording ====================

    /// Record the observer pose
    ///
    /// Samples with non-finite components are dropped.
    pub fn record_pose(&mut self, position: Vec3, rotation: Vec3) {
        if !self.is_recording() {
            return;
        }
        if !position.is_finite() || !rotation.is_finite() {
            tracing::warn!("Dropping non-finite pose {} / {}", position, rotation);
            return;
        }

        let timestamp = self.stamp();
        self.data.trajectory.push(PoseSample {
            timestamp,
            position,
            rotation,
        });
    }

    /// Record the gaze direction and what it hit
    ///
    /// A hit also counts as a product view (subject to deduplication).
    /// Samples with a non-finite direction or hit point are dropped.
    pub fn record_gaze(
        &mut self,
        direction: Vec3,
        target_id: Option<&str>,
        target_point: Option<Vec3>,
    ) {
        if !self.is_recording() {
            return;
        }
        if !direction.is_finite() || target_point.is_some_and(|p| !p.is_finite()) {
            tracing::warn!("Dropping non-finite gaze sample {} -> {:?}", direction, target_id);
            return;
        }

        let timestamp = self.stamp();
        self.data.gaze.push(GazeSample {
            timestamp,
            direction,
            target_product_id: target_id.map(str::to_string),
            target_position: target_point,
        });
        tracing::trace!("gaze {} -> {:?}", direction, target_id);

        if let Some(id) = target_id {
            self.push_view(id);
        }
    }

    /// Record that a product entered focus
    ///
    /// Consecutive views of the same product collapse into the first one.
    pub fn record_product_view(&mut self, product_id: &str) {
        if !self.accepts_interaction() {
            return;
        }
        self.push_view(product_id);
    }

    /// Record entering a zone, closing the previous span first
    pub fn record_area_enter(&mut self, zone_id: &str) {
        if !self.accepts_interaction() {
            return;
        }

        let now = self.stamp();
        self.close_zone(now);
        self.open_zone = Some(OpenZone {
            zone_id: zone_id.to_string(),
            entered_at: now,
        });
        tracing::debug!("Entered zone {}", zone_id);
    }

    /// Record leaving the current zone
    pub fn record_area_exit(&mut self) {
        if !self.accepts_interaction() || self.open_zone.is_none() {
            return;
        }

        let now = self.stamp();
        self.close_zone(now);
    }

    /// Record the distance to a product
    ///
    /// Dropped unless strictly below the proximity threshold. The
    /// approaching flag compares against the last retained record for the
    /// same product.
    pub fn record_product_distance(&mut self, product_id: &str, distance: f64) {
        if !self.is_recording() {
            return;
        }
        if distance.is_nan() || distance >= self.settings.proximity_threshold {
            return;
        }

        let is_approaching = self
            .last_distance
            .get(product_id)
            .is_some_and(|&previous| distance < previous);
        self.last_distance.insert(product_id.to_string(), distance);

        let timestamp = self.stamp();
        self.data.product_distances.push(ProductDistance {
            timestamp,
            product_id: product_id.to_string(),
            distance,
            is_approaching,
        });
    }

    /// Record a discrete product selection
    pub fn record_selection(&mut self, product_id: &str, method: impl Into<SelectionMethod>) {
        if !self.accepts_interaction() {
            return;
        }

        let timestamp = self.stamp();
        let time_from_start = timestamp - self.info.start_time;
        let selection_method = method.into();
        tracing::info!(
            "Product selected: {} ({}), {}ms into session",
            product_id,
            selection_method,
            time_from_start
        );

        self.data.product_selections.push(ProductSelection {
            timestamp,
            time_from_start,
            product_id: product_id.to_string(),
            selection_method,
        });
    }

    /// Set the final choice, snapshotting the current selection and view counts
    pub fn set_final_selection(&mut self, product_id: &str) {
        let timestamp = self.stamp();
        let selection = FinalSelection {
            product_id: product_id.to_string(),
            timestamp,
            total_selections: self.data.product_selections.len(),
            compared_products: self.unique_products_viewed().len(),
        };
        tracing::info!(
            "Final selection: {}, compared {} products",
            product_id,
            selection.compared_products
        );
        self.data.final_selection = Some(selection);
    }

    /// Record a questionnaire answer; replaces any earlier answer for the category
    pub fn record_subjective_evaluation(
        &mut self,
        category: &str,
        value: impl Into<EvaluationValue>,
        comment: &str,
    ) {
        let value: EvaluationValue = value.into();
        if !value.is_valid() {
            tracing::warn!("Ignoring non-finite evaluation for {}", category);
            return;
        }

        let timestamp = self.stamp();
        self.data.subjective_evaluations.insert(
            category.to_string(),
            SubjectiveEvaluation {
                value,
                comment: comment.to_string(),
                timestamp,
            },
        );
    }

    /// Shallow-merge experiment conditions
    pub fn update_experiment_conditions(&mut self, conditions: ExperimentConditions) {
        self.info.experiment_conditions.extend(conditions);
    }

    // ==================== Queries ====================

    /// Milliseconds from start to end, or to now while the session is open
    pub fn session_duration(&self) -> i64 {
        let end = self.info.end_time.unwrap_or_else(|| self.clock.now_ms());
        (end - self.info.start_time).max(0)
    }

    /// Distinct viewed products in first-seen order
    pub fn unique_products_viewed(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.data
            .product_views
            .iter()
            .filter(|view| seen.insert(view.product_id.as_str()))
            .map(|view| view.product_id.clone())
            .collect()
    }

    /// Summary counts for the session
    pub fn statistics(&self) -> SessionStatistics {
        SessionStatistics {
            session_duration: self.session_duration(),
            trajectory_points: self.data.trajectory.len(),
            gaze_records: self.data.gaze.len(),
            unique_products_viewed: self.unique_products_viewed().len(),
            total_product_selections: self.data.product_selections.len(),
            total_product_views: self.data.product_views.len(),
            areas_visited: self.data.area_stay_time.len(),
        }
    }

    /// Write the summary statistics to the log
    pub fn log_statistics(&self) {
        let stats = self.statistics();
        tracing::info!(
            session = %self.info.session_id,
            duration_ms = stats.session_duration,
            trajectory_points = stats.trajectory_points,
            gaze_records = stats.gaze_records,
            unique_products_viewed = stats.unique_products_viewed,
            selections = stats.total_product_selections,
            areas_visited = stats.areas_visited,
            "Session statistics"
        );
    }

    // ==================== Internals ====================

    /// Current time, clamped so stamps never decrease
    fn stamp(&mut self) -> Timestamp {
        let now = self.clock.now_ms().max(self.last_stamp);
        self.last_stamp = now;
        now
    }

    fn accepts_interaction(&self) -> bool {
        !self.settings.gate_policy.gates_interactions() || self.is_recording()
    }

    fn push_view(&mut self, product_id: &str) {
        let repeated = self
            .data
            .product_views
            .last()
            .is_some_and(|last| last.product_id == product_id);
        if repeated {
            return;
        }

        let timestamp = self.stamp();
        self.data.product_views.push(ProductView {
            timestamp,
            product_id: product_id.to_string(),
        });
        tracing::debug!("Product view: {}", product_id);
    }

    /// Fold the open dwell span, if any, into its zone total
    fn close_zone(&mut self, now: Timestamp) {
        let Some(open) = self.open_zone.take() else {
            return;
        };

        let stay = (now - open.entered_at).max(0);
        *self.data.area_stay_time.entry(open.zone_id.clone()).or_insert(0) += stay;
        tracing::debug!("Left zone {} after {}ms", open.zone_id, stay);
    }
}
