//! Test data builders for creating test objects

use shopsense_rs::{
    config::{GatePolicy, RecorderSettings, SessionConfig},
    ManualClock, SessionRecorder,
};
use std::sync::Arc;

use super::TEST_EPOCH_MS;

/// Builder for recorders on a manual clock
pub struct RecorderBuilder {
    config: SessionConfig,
    settings: RecorderSettings,
    start_ms: i64,
    started: bool,
}

impl RecorderBuilder {
    pub fn new(participant_id: &str) -> Self {
        Self {
            config: SessionConfig::new(participant_id).with_session_id("S-TEST"),
            settings: RecorderSettings::default(),
            start_ms: TEST_EPOCH_MS,
            started: false,
        }
    }

    pub fn session_id(mut self, session_id: &str) -> Self {
        self.config = self.config.with_session_id(session_id);
        self
    }

    pub fn condition(mut self, key: &str, value: &str) -> Self {
        self.config = self.config.with_condition(key, value);
        self
    }

    pub fn gate_policy(mut self, policy: GatePolicy) -> Self {
        self.settings = self.settings.with_gate_policy(policy);
        self
    }

    pub fn proximity_threshold(mut self, threshold: f64) -> Self {
        self.settings = self.settings.with_proximity_threshold(threshold);
        self
    }

    /// Start recording right after construction
    pub fn started(mut self) -> Self {
        self.started = true;
        self
    }

    pub fn build(self) -> (SessionRecorder, ManualClock) {
        let clock = ManualClock::new(self.start_ms);
        let mut recorder =
            SessionRecorder::with_clock(self.config, self.settings, Arc::new(clock.clone()));
        if self.started {
            recorder.start();
        }
        (recorder, clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_builder() {
        let (recorder, _clock) = RecorderBuilder::new("P09")
            .session_id("S09")
            .condition("pattern", "C")
            .started()
            .build();

        assert_eq!(recorder.participant_id(), "P09");
        assert_eq!(recorder.session_id(), "S09");
        assert!(recorder.is_recording());
        assert_eq!(recorder.info().experiment_conditions["pattern"], "C");
    }
}
