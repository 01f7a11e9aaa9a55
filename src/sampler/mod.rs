//! Fixed-rate scene sampler
//!
//! The sampler is the glue between the 3D viewer and the
//! [`SessionRecorder`]: once per tick it records the observer pose, casts
//! the gaze ray through a [`RayCaster`], records the gaze sample, keeps zone
//! membership in sync and records the distance to every product anchor.
//! Discrete clicks and hovers go through [`SceneSampler::handle_interaction`].
//!
//! The ray caster is the viewer's own intersection query; this crate never
//! does geometry beyond point-in-box and point distance.

use serde::{Deserialize, Serialize};

use crate::config::{SamplerSettings, StudyConfig};
use crate::session::{SelectionMethod, SessionRecorder};
use crate::types::{Timestamp, Vec3};

/// Nearest intersection reported by the viewer
#[derive(Debug, Clone, PartialEq)]
pub struct RayHit {
    /// Identifier of the object that was hit
    pub object_id: String,
    /// World-space hit point
    pub point: Vec3,
    /// Distance from the ray origin
    pub distance: f64,
}

/// Ray-intersection query provided by the viewer
#[cfg_attr(test, mockall::automock)]
pub trait RayCaster {
    /// Nearest hit along `direction` from `origin`, or `None` if nothing is
    /// hit within `max_distance`
    fn cast(&self, origin: Vec3, direction: Vec3, max_distance: f64) -> Option<RayHit>;
}

/// Observer position and Euler rotation in degrees (x = pitch, y = yaw)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ObserverPose {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl ObserverPose {
    pub fn new(position: Vec3, rotation: Vec3) -> Self {
        Self { position, rotation }
    }

    /// Unit view direction; the camera looks down -Z at zero rotation
    pub fn forward(&self) -> Vec3 {
        let pitch = self.rotation.x.to_radians();
        let yaw = self.rotation.y.to_radians();
        Vec3::new(
            -yaw.sin() * pitch.cos(),
            pitch.sin(),
            -yaw.cos() * pitch.cos(),
        )
    }
}

/// Axis-aligned store area used for dwell tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub min: Vec3,
    pub max: Vec3,
}

impl Zone {
    pub fn new(id: impl Into<String>, min: Vec3, max: Vec3) -> Self {
        Self {
            id: id.into(),
            min,
            max,
        }
    }

    /// Whether `point` lies inside the box (bounds inclusive)
    pub fn contains(&self, point: Vec3) -> bool {
        (self.min.x..=self.max.x).contains(&point.x)
            && (self.min.y..=self.max.y).contains(&point.y)
            && (self.min.z..=self.max.z).contains(&point.z)
    }
}

/// Product position used for distance tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductAnchor {
    pub id: String,
    pub position: Vec3,
}

impl ProductAnchor {
    pub fn new(id: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            position,
        }
    }
}

/// Discrete viewer interaction tagged with an object id
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    /// The participant picked an object
    Select {
        object_id: String,
        method: SelectionMethod,
    },
    /// The cursor rests on an object
    Hover { object_id: String },
}

/// Drives a recorder from viewer state at a fixed interval
#[derive(Debug, Clone)]
pub struct SceneSampler {
    settings: SamplerSettings,
    zones: Vec<Zone>,
    products: Vec<ProductAnchor>,
    last_tick: Option<Timestamp>,
    tick_count: u64,
}

impl SceneSampler {
    pub fn new(settings: SamplerSettings, zones: Vec<Zone>, products: Vec<ProductAnchor>) -> Self {
        tracing::debug!(
            "Sampler at {:.1} Hz with {} zones and {} products",
            settings.rate_hz(),
            zones.len(),
            products.len()
        );
        Self {
            settings,
            zones,
            products,
            last_tick: None,
            tick_count: 0,
        }
    }

    /// Build a sampler from a study's layout and settings
    pub fn from_study(study: &StudyConfig) -> Self {
        Self::new(
            study.sampler.clone(),
            study.zones.clone(),
            study.products.clone(),
        )
    }

    pub fn settings(&self) -> &SamplerSettings {
        &self.settings
    }

    /// Number of ticks taken so far
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Whether a tick is due at `now`
    ///
    /// The first tick always is, and so is any tick after the clock stepped
    /// backwards past the last one.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.last_tick
            .map(|last| now < last || now - last >= self.settings.interval_ms as i64)
            .unwrap_or(true)
    }

    /// Tick if due, returning whether a tick was taken
    pub fn poll(
        &mut self,
        now: Timestamp,
        recorder: &mut SessionRecorder,
        pose: ObserverPose,
        caster: &dyn RayCaster,
    ) -> bool {
        if !self.is_due(now) {
            return false;
        }
        if let Some(last) = self.last_tick.filter(|&last| now < last) {
            tracing::warn!("Clock stepped back {}ms; resuming sampling from {}", last - now, now);
        }
        self.last_tick = Some(now);
        self.tick(recorder, pose, caster);
        true
    }

    /// Sample the scene once
    ///
    /// Returns the gaze hit so the viewer can highlight it.
    pub fn tick(
        &mut self,
        recorder: &mut SessionRecorder,
        pose: ObserverPose,
        caster: &dyn RayCaster,
    ) -> Option<RayHit> {
        self.tick_count += 1;
        recorder.record_pose(pose.position, pose.rotation);

        let direction = pose.forward();
        let max_distance = self.settings.max_gaze_distance;
        let hit = caster
            .cast(pose.position, direction, max_distance)
            .filter(|hit| hit.distance <= max_distance);
        recorder.record_gaze(
            direction,
            hit.as_ref().map(|h| h.object_id.as_str()),
            hit.as_ref().map(|h| h.point),
        );

        self.sync_zone(recorder, pose.position);

        for product in &self.products {
            recorder.record_product_distance(&product.id, pose.position.distance(product.position));
        }

        hit
    }

    /// Forward a click or hover to the recorder
    pub fn handle_interaction(&self, recorder: &mut SessionRecorder, event: InteractionEvent) {
        match event {
            InteractionEvent::Select { object_id, method } => {
                recorder.record_selection(&object_id, method);
            }
            InteractionEvent::Hover { object_id } => {
                recorder.record_product_view(&object_id);
            }
        }
    }

    /// First zone containing `point`
    pub fn zone_at(&self, point: Vec3) -> Option<&Zone> {
        self.zones.iter().find(|zone| zone.contains(point))
    }

    /// Emit enter/exit only when membership changes
    fn sync_zone(&self, recorder: &mut SessionRecorder, position: Vec3) {
        let zone = self.zone_at(position).map(|z| z.id.as_str());
        if zone == recorder.current_zone() {
            return;
        }
        match zone {
            Some(id) => recorder.record_area_enter(id),
            None => recorder.record_area_exit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{RecorderSettings, SessionConfig};
    use mockall::predicate::*;
    use std::sync::Arc;

    const EPS: f64 = 1e-9;

    fn recorder(clock: &ManualClock) -> SessionRecorder {
        let mut recorder = SessionRecorder::with_clock(
            SessionConfig::new("P01"),
            RecorderSettings::default(),
            Arc::new(clock.clone()),
        );
        recorder.start();
        recorder
    }

    fn sampler() -> SceneSampler {
        SceneSampler::new(
            SamplerSettings::default(),
            vec![
                Zone::new("entrance", Vec3::new(-5.0, 0.0, 0.0), Vec3::new(5.0, 3.0, 10.0)),
                Zone::new("showcase", Vec3::new(-5.0, 0.0, -12.0), Vec3::new(5.0, 3.0, -0.5)),
            ],
            vec![ProductAnchor::new("cake1", Vec3::new(-2.4, 1.0, -10.0))],
        )
    }

    fn miss_caster() -> MockRayCaster {
        let mut caster = MockRayCaster::new();
        caster.expect_cast().returning(|_, _, _| None);
        caster
    }

    #[test]
    fn test_forward_direction() {
        let ahead = ObserverPose::default().forward();
        assert!((ahead.z + 1.0).abs() < EPS);

        let left = ObserverPose::new(Vec3::ZERO, Vec3::new(0.0, 90.0, 0.0)).forward();
        assert!((left.x + 1.0).abs() < EPS);
        assert!(left.z.abs() < EPS);

        let up = ObserverPose::new(Vec3::ZERO, Vec3::new(90.0, 0.0, 0.0)).forward();
        assert!((up.y - 1.0).abs() < EPS);
    }

    #[test]
    fn test_zone_contains_inclusive() {
        let zone = Zone::new("z", Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0));
        assert!(zone.contains(Vec3::new(1.0, 0.0, 0.5)));
        assert!(!zone.contains(Vec3::new(1.01, 0.0, 0.5)));
    }

    #[test]
    fn test_tick_records_hit() {
        let clock = ManualClock::new(0);
        let mut recorder = recorder(&clock);
        let mut sampler = sampler();

        let mut caster = MockRayCaster::new();
        caster
            .expect_cast()
            .with(eq(Vec3::new(0.0, 1.6, 5.0)), always(), eq(50.0))
            .times(1)
            .returning(|_, _, _| {
                Some(RayHit {
                    object_id: "cake1".to_string(),
                    point: Vec3::new(-2.4, 1.0, -10.0),
                    distance: 15.2,
                })
            });

        let pose = ObserverPose::new(Vec3::new(0.0, 1.6, 5.0), Vec3::ZERO);
        let hit = sampler.tick(&mut recorder, pose, &caster);

        assert_eq!(hit.unwrap().object_id, "cake1");
        assert_eq!(recorder.trajectory().len(), 1);
        assert_eq!(recorder.gaze()[0].target_product_id.as_deref(), Some("cake1"));
        assert_eq!(recorder.product_views().len(), 1);
        assert_eq!(recorder.current_zone(), Some("entrance"));
        // cake1 is ~15.2 away, beyond the proximity cap
        assert!(recorder.product_distances().is_empty());
        assert_eq!(sampler.tick_count(), 1);
    }

    #[test]
    fn test_hits_beyond_range_are_dropped() {
        let clock = ManualClock::new(0);
        let mut recorder = recorder(&clock);
        let mut sampler = sampler();

        let mut caster = MockRayCaster::new();
        caster.expect_cast().returning(|_, _, _| {
            Some(RayHit {
                object_id: "back-wall".to_string(),
                point: Vec3::new(0.0, 1.6, -80.0),
                distance: 85.0,
            })
        });

        let hit = sampler.tick(&mut recorder, ObserverPose::default(), &caster);
        assert!(hit.is_none());
        assert_eq!(recorder.gaze()[0].target_product_id, None);
        assert!(recorder.product_views().is_empty());
    }

    #[test]
    fn test_walk_through_zones() {
        let clock = ManualClock::new(0);
        let mut recorder = recorder(&clock);
        let mut sampler = sampler();
        let caster = miss_caster();

        let path = [
            (Vec3::new(0.0, 1.6, 5.0), 0),
            (Vec3::new(0.0, 1.6, 4.0), 100),
            (Vec3::new(0.0, 1.6, -3.0), 100),
            (Vec3::new(0.0, 1.6, -8.0), 100),
            (Vec3::new(20.0, 1.6, -8.0), 100),
        ];
        for (position, dt) in path {
            clock.advance(dt);
            sampler.tick(&mut recorder, ObserverPose::new(position, Vec3::ZERO), &caster);
        }
        recorder.stop();

        assert_eq!(recorder.area_stay_time().get("entrance"), Some(&200));
        assert_eq!(recorder.area_stay_time().get("showcase"), Some(&200));
        assert_eq!(recorder.current_zone(), None);

        // Approaching cake1 while in the showcase zone
        let distances = recorder.product_distances();
        assert_eq!(distances.len(), 2);
        assert!(!distances[0].is_approaching);
        assert!(distances[1].is_approaching);
    }

    #[test]
    fn test_poll_respects_interval() {
        let clock = ManualClock::new(0);
        let mut recorder = recorder(&clock);
        let mut sampler = sampler();
        let caster = miss_caster();
        let pose = ObserverPose::default();

        assert!(sampler.poll(1_000, &mut recorder, pose, &caster));
        assert!(!sampler.poll(1_050, &mut recorder, pose, &caster));
        assert!(sampler.poll(1_100, &mut recorder, pose, &caster));
        assert_eq!(sampler.tick_count(), 2);
        assert_eq!(recorder.trajectory().len(), 2);
    }

    #[test]
    fn test_poll_resumes_after_clock_regression() {
        let clock = ManualClock::new(0);
        let mut recorder = recorder(&clock);
        let mut sampler = sampler();
        let caster = miss_caster();
        let pose = ObserverPose::default();

        let before = 10_000_000;
        assert!(sampler.poll(before, &mut recorder, pose, &caster));

        // Wall clock jumps back an hour; sampling continues at the normal rate
        let after = before - 3_600_000;
        let taken = (0..100)
            .filter(|i| sampler.poll(after + i * 100, &mut recorder, pose, &caster))
            .count();
        assert_eq!(taken, 100);
        assert!(!sampler.poll(after + 9_950, &mut recorder, pose, &caster));
        assert_eq!(sampler.tick_count(), 101);
    }

    #[test]
    fn test_interactions() {
        let clock = ManualClock::new(0);
        let mut recorder = recorder(&clock);
        let sampler = sampler();

        sampler.handle_interaction(
            &mut recorder,
            InteractionEvent::Hover {
                object_id: "cake2".to_string(),
            },
        );
        sampler.handle_interaction(
            &mut recorder,
            InteractionEvent::Select {
                object_id: "cake2".to_string(),
                method: SelectionMethod::Click,
            },
        );

        assert_eq!(recorder.product_views()[0].product_id, "cake2");
        assert_eq!(recorder.product_selections()[0].product_id, "cake2");
    }
}
