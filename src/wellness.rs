//! Driver wellness monitoring.
//!
//! Each enrolled driver carries a simulated profile that drifts with every
//! monitoring tick. Profiles that cross a risk threshold get one pending
//! intervention at a time; the engagement tick delivers them.

use crate::errors::AppError;
use crate::models::*;
use crate::registry::Registry;
use crate::simulation::SimRng;
use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

pub const STRESS_THRESHOLD: f64 = 7.0;
pub const SLEEP_THRESHOLD: f64 = 4.0;
pub const FATIGUE_THRESHOLD: f64 = 7.0;
pub const HOURS_THRESHOLD: f64 = 11.0;
/// Duty period length; simulated hours wrap back to zero past it.
pub const DUTY_PERIOD_HOURS: f64 = 14.0;
/// Largest per-tick change of any simulated metric.
pub const MAX_DRIFT: f64 = 1.5;
pub const ACKNOWLEDGE_PROBABILITY: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WellnessSummary {
    pub enrolled_drivers: usize,
    pub drivers_at_risk: usize,
    pub average_wellness_score: f64,
    pub pending_interventions: usize,
    pub delivered_interventions: usize,
    pub acknowledged_interventions: usize,
}

// ============ Pure decision functions ============

pub fn assess_risk(stress: f64, sleep: f64, fatigue: f64, hours_driven: f64) -> Vec<RiskFactor> {
    let mut factors = Vec::new();
    if stress > STRESS_THRESHOLD {
        factors.push(RiskFactor::HighStress);
    }
    if sleep < SLEEP_THRESHOLD {
        factors.push(RiskFactor::SleepDeprivation);
    }
    if fatigue > FATIGUE_THRESHOLD {
        factors.push(RiskFactor::Fatigue);
    }
    if hours_driven > HOURS_THRESHOLD {
        factors.push(RiskFactor::ExtendedHours);
    }
    factors
}

/// Score in `[0, 100]`; 100 is a rested, unstressed driver.
pub fn wellness_score(stress: f64, sleep: f64, fatigue: f64) -> f64 {
    let penalty = stress * 4.0 + (10.0 - sleep) * 3.0 + fatigue * 3.0;
    (100.0 - penalty).clamp(0.0, 100.0)
}

/// Applies `delta` to a 0-10 metric. A non-finite delta leaves it unchanged.
fn metric(current: f64, delta: f64) -> f64 {
    let next = current + delta;
    if next.is_finite() {
        next.clamp(0.0, 10.0)
    } else {
        current
    }
}

/// Applies `reading` to `profile`, clamping every metric and recomputing the
/// derived fields.
pub fn apply_reading(profile: &WellnessProfile, reading: &WellnessReading) -> WellnessProfile {
    let stress_level = metric(profile.stress_level, reading.stress_delta);
    let sleep_quality = metric(profile.sleep_quality, reading.sleep_delta);
    let fatigue_level = metric(profile.fatigue_level, reading.fatigue_delta);
    let hours_driven = if reading.hours_driven.is_finite() {
        reading.hours_driven.clamp(0.0, 24.0)
    } else {
        profile.hours_driven
    };

    WellnessProfile {
        driver_id: profile.driver_id.clone(),
        stress_level,
        sleep_quality,
        fatigue_level,
        hours_driven,
        risk_factors: assess_risk(stress_level, sleep_quality, fatigue_level, hours_driven),
        wellness_score: wellness_score(stress_level, sleep_quality, fatigue_level),
        last_updated: Utc::now(),
    }
}

/// Strongest applicable intervention, if the driver needs one.
pub fn recommend_intervention(profile: &WellnessProfile) -> Option<InterventionKind> {
    let has = |factor: RiskFactor| profile.risk_factors.contains(&factor);

    if profile.stress_level > 8.0 && profile.sleep_quality < SLEEP_THRESHOLD {
        Some(InterventionKind::CounselorCheckIn)
    } else if has(RiskFactor::HighStress) {
        Some(InterventionKind::BreathingExercise)
    } else if has(RiskFactor::Fatigue) || has(RiskFactor::ExtendedHours) {
        Some(InterventionKind::RestBreak)
    } else if has(RiskFactor::SleepDeprivation) {
        Some(InterventionKind::SleepHygiene)
    } else {
        None
    }
}

pub fn intervention_message(kind: InterventionKind, profile: &WellnessProfile) -> String {
    match kind {
        InterventionKind::BreathingExercise => format!(
            "Stress is running high ({:.1}/10). At your next stop, try four rounds of box breathing: in for 4, hold for 4, out for 4.",
            profile.stress_level
        ),
        InterventionKind::RestBreak => format!(
            "You've been driving {:.1} hours and fatigue is at {:.1}/10. Pull over at the next safe spot for a 30 minute break.",
            profile.hours_driven, profile.fatigue_level
        ),
        InterventionKind::SleepHygiene => format!(
            "Sleep quality is down to {:.1}/10. Tonight, aim for a dark cab and no screens for 30 minutes before lights out.",
            profile.sleep_quality
        ),
        InterventionKind::CounselorCheckIn => {
            "High stress and poor sleep together. A wellness counselor will reach out today; reply STOP to opt out.".to_string()
        }
    }
}

fn baseline_profile(driver_id: String, stress: f64, sleep: f64, fatigue: f64) -> WellnessProfile {
    WellnessProfile {
        driver_id,
        stress_level: stress,
        sleep_quality: sleep,
        fatigue_level: fatigue,
        hours_driven: 0.0,
        risk_factors: assess_risk(stress, sleep, fatigue, 0.0),
        wellness_score: wellness_score(stress, sleep, fatigue),
        last_updated: Utc::now(),
    }
}

// ============ Engine ============

pub struct WellnessEngine {
    profiles: Registry<String, WellnessProfile>,
    interventions: Registry<Uuid, Intervention>,
    rng: SimRng,
}

impl WellnessEngine {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            profiles: Registry::new(),
            interventions: Registry::new(),
            rng: SimRng::new(seed, 3),
        }
    }

    /// Enrolls a driver with a healthy baseline. Enrolling twice returns the
    /// existing profile unchanged.
    pub fn enroll_driver(&self, driver_id: &str) -> Result<WellnessProfile, AppError> {
        let driver_id = driver_id.trim();
        if driver_id.is_empty() {
            return Err(AppError::BadRequest("Driver id is required".to_string()));
        }
        if let Some(existing) = self.profiles.get(&driver_id.to_string()) {
            return Ok(existing);
        }

        let (stress, sleep, fatigue) = self.rng.with(|rng| {
            (
                rng.random_range(2.0..6.0),
                rng.random_range(5.0..9.0),
                rng.random_range(1.0..5.0),
            )
        });
        let profile = baseline_profile(driver_id.to_string(), stress, sleep, fatigue);
        if !self.profiles.insert_new(profile.driver_id.clone(), profile.clone()) {
            // Lost a race with a concurrent enrollment; keep theirs.
            return self.profiles.get(&profile.driver_id).ok_or_else(|| {
                AppError::InternalError(format!("Driver {} vanished during enrollment", driver_id))
            });
        }

        tracing::info!(driver_id, score = profile.wellness_score, "Driver enrolled");
        Ok(profile)
    }

    pub fn seed_drivers(&self, driver_ids: &[&str]) {
        for id in driver_ids {
            if let Err(e) = self.enroll_driver(id) {
                tracing::warn!("Skipping driver '{}': {}", id, e);
            }
        }
    }

    /// Applies an externally supplied reading.
    ///
    /// # Errors
    ///
    /// `BadRequest` for non-finite values, `NotFound` for unknown drivers.
    pub fn record_reading(
        &self,
        driver_id: &str,
        reading: WellnessReading,
    ) -> Result<WellnessProfile, AppError> {
        let driver_id = driver_id.trim();
        let values = [
            reading.stress_delta,
            reading.sleep_delta,
            reading.fatigue_delta,
            reading.hours_driven,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AppError::BadRequest(
                "Reading values must be finite numbers".to_string(),
            ));
        }

        let updated = self
            .profiles
            .update(&driver_id.to_string(), |profile| {
                *profile = apply_reading(profile, &reading);
                profile.clone()
            })
            .ok_or_else(|| AppError::NotFound(format!("Driver {} not enrolled", driver_id)))?;

        self.open_intervention_if_needed(&updated);
        Ok(updated)
    }

    /// Drifts every profile by a bounded random reading and opens
    /// interventions where needed. Returns how many were opened.
    pub fn monitoring_tick(&self) -> usize {
        let mut needing_help = Vec::new();

        self.profiles.update_all(|profile| {
            let reading = self.rng.with(|rng| {
                let mut hours = profile.hours_driven + rng.random_range(0.5..1.5);
                if hours > DUTY_PERIOD_HOURS {
                    hours = 0.0;
                }
                WellnessReading {
                    stress_delta: rng.random_range(-MAX_DRIFT..=MAX_DRIFT),
                    sleep_delta: rng.random_range(-MAX_DRIFT..=MAX_DRIFT),
                    fatigue_delta: rng.random_range(-MAX_DRIFT..=MAX_DRIFT),
                    hours_driven: hours,
                }
            });
            *profile = apply_reading(profile, &reading);
            if recommend_intervention(profile).is_some() {
                needing_help.push(profile.clone());
            }
        });

        let opened = needing_help
            .iter()
            .filter(|profile| self.open_intervention_if_needed(profile))
            .count();

        tracing::info!(
            drivers = self.profiles.len(),
            at_risk = needing_help.len(),
            opened,
            "Wellness monitoring complete"
        );
        opened
    }

    /// Delivers pending interventions. Returns `(delivered, acknowledged)`.
    pub fn engagement_tick(&self) -> (usize, usize) {
        let mut delivered = 0;
        let mut acknowledged = 0;

        self.interventions.update_all(|intervention| {
            if intervention.delivered {
                return;
            }
            intervention.delivered = true;
            intervention.engagement.delivered += 1;
            delivered += 1;
            if self.rng.draw() < ACKNOWLEDGE_PROBABILITY {
                intervention.engagement.acknowledged += 1;
                acknowledged += 1;
            }
        });

        tracing::info!(delivered, acknowledged, "Wellness engagement complete");
        (delivered, acknowledged)
    }

    /// Opens an intervention unless the driver already has one pending.
    fn open_intervention_if_needed(&self, profile: &WellnessProfile) -> bool {
        let Some(kind) = recommend_intervention(profile) else {
            return false;
        };

        let intervention = Intervention {
            id: self.rng.id(),
            driver_id: profile.driver_id.clone(),
            kind,
            message: intervention_message(kind, profile),
            created_at: Utc::now(),
            delivered: false,
            engagement: InterventionMetrics::default(),
        };
        let opened = self
            .interventions
            .insert_unless(intervention.id, intervention, |existing| {
                existing.driver_id == profile.driver_id && !existing.delivered
            });
        if opened {
            tracing::debug!(driver_id = %profile.driver_id, ?kind, "Intervention opened");
        }
        opened
    }

    // ============ Accessors ============

    pub fn wellness_profile(&self, driver_id: &str) -> Option<WellnessProfile> {
        self.profiles.get(&driver_id.trim().to_string())
    }

    /// Drivers with at least one risk factor, lowest score first.
    pub fn drivers_at_risk(&self) -> Vec<WellnessProfile> {
        let mut at_risk = self.profiles.filter(|p| !p.risk_factors.is_empty());
        at_risk.sort_by(|a, b| {
            a.wellness_score
                .total_cmp(&b.wellness_score)
                .then_with(|| a.driver_id.cmp(&b.driver_id))
        });
        at_risk
    }

    /// Interventions for one driver, newest first.
    pub fn interventions_for(&self, driver_id: &str) -> Vec<Intervention> {
        let driver_id = driver_id.trim();
        let mut interventions = self.interventions.filter(|i| i.driver_id == driver_id);
        interventions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        interventions
    }

    pub fn driver_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn summary(&self) -> WellnessSummary {
        let profiles = self.profiles.values();
        let interventions = self.interventions.values();
        let enrolled_drivers = profiles.len();
        let average_wellness_score = if enrolled_drivers == 0 {
            0.0
        } else {
            profiles.iter().map(|p| p.wellness_score).sum::<f64>() / enrolled_drivers as f64
        };
        let pending: HashSet<&str> = interventions
            .iter()
            .filter(|i| !i.delivered)
            .map(|i| i.driver_id.as_str())
            .collect();

        WellnessSummary {
            enrolled_drivers,
            drivers_at_risk: profiles.iter().filter(|p| !p.risk_factors.is_empty()).count(),
            average_wellness_score,
            pending_interventions: pending.len(),
            delivered_interventions: interventions.iter().filter(|i| i.delivered).count(),
            acknowledged_interventions: interventions
                .iter()
                .filter(|i| i.engagement.acknowledged > 0)
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(stress: f64, sleep: f64, fatigue: f64, hours: f64) -> WellnessProfile {
        let mut p = baseline_profile("DRV-T".to_string(), stress, sleep, fatigue);
        p.hours_driven = hours;
        p.risk_factors = assess_risk(stress, sleep, fatigue, hours);
        p
    }

    #[test]
    fn test_risk_thresholds_are_strict() {
        assert!(assess_risk(7.0, 4.0, 7.0, 11.0).is_empty());
        assert_eq!(
            assess_risk(7.1, 3.9, 7.1, 11.5),
            vec![
                RiskFactor::HighStress,
                RiskFactor::SleepDeprivation,
                RiskFactor::Fatigue,
                RiskFactor::ExtendedHours
            ]
        );
    }

    #[test]
    fn test_wellness_score_bounds() {
        assert_eq!(wellness_score(0.0, 10.0, 0.0), 100.0);
        assert_eq!(wellness_score(10.0, 0.0, 10.0), 0.0);
        assert!((wellness_score(5.0, 5.0, 5.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_apply_reading_clamps() {
        let p = profile(9.5, 1.0, 5.0, 3.0);
        let next = apply_reading(
            &p,
            &WellnessReading {
                stress_delta: 4.0,
                sleep_delta: -4.0,
                fatigue_delta: f64::NAN,
                hours_driven: 30.0,
            },
        );
        assert_eq!(next.stress_level, 10.0);
        assert_eq!(next.sleep_quality, 0.0);
        assert_eq!(next.fatigue_level, 5.0);
        assert_eq!(next.hours_driven, 24.0);
        assert!(next.risk_factors.contains(&RiskFactor::ExtendedHours));
    }

    #[test]
    fn test_non_finite_delta_keeps_metric() {
        let p = profile(8.0, 6.0, 2.0, 4.0);
        let next = apply_reading(
            &p,
            &WellnessReading {
                stress_delta: f64::NEG_INFINITY,
                sleep_delta: f64::NAN,
                fatigue_delta: 1.0,
                hours_driven: f64::NAN,
            },
        );
        assert_eq!(next.stress_level, 8.0);
        assert_eq!(next.sleep_quality, 6.0);
        assert_eq!(next.fatigue_level, 3.0);
        assert_eq!(next.hours_driven, 4.0);
        assert!(next.risk_factors.contains(&RiskFactor::HighStress));
    }

    #[test]
    fn test_padded_driver_id_resolves_everywhere() {
        let engine = WellnessEngine::new(Some(5));
        engine.enroll_driver(" DRV-005 ").unwrap();

        let reading = WellnessReading {
            stress_delta: 10.0,
            ..Default::default()
        };
        let updated = engine.record_reading(" DRV-005 ", reading).unwrap();
        assert_eq!(updated.driver_id, "DRV-005");
        assert!(engine.wellness_profile(" DRV-005").is_some());
        assert_eq!(engine.interventions_for("DRV-005 ").len(), 1);
    }

    #[test]
    fn test_concurrent_readings_open_one_intervention() {
        let engine = WellnessEngine::new(Some(6));
        engine.enroll_driver("DRV-006").unwrap();
        let reading = WellnessReading {
            fatigue_delta: 10.0,
            ..Default::default()
        };

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..20 {
                        engine.record_reading("DRV-006", reading).unwrap();
                    }
                });
            }
        });

        assert_eq!(engine.interventions_for("DRV-006").len(), 1);
    }

    #[test]
    fn test_recommendation_priority() {
        assert_eq!(
            recommend_intervention(&profile(8.5, 3.0, 8.0, 12.0)),
            Some(InterventionKind::CounselorCheckIn)
        );
        assert_eq!(
            recommend_intervention(&profile(7.5, 6.0, 8.0, 2.0)),
            Some(InterventionKind::BreathingExercise)
        );
        assert_eq!(
            recommend_intervention(&profile(3.0, 6.0, 3.0, 12.0)),
            Some(InterventionKind::RestBreak)
        );
        assert_eq!(
            recommend_intervention(&profile(3.0, 2.0, 3.0, 2.0)),
            Some(InterventionKind::SleepHygiene)
        );
        assert_eq!(recommend_intervention(&profile(3.0, 7.0, 3.0, 2.0)), None);
    }

    #[test]
    fn test_enroll_is_idempotent() {
        let engine = WellnessEngine::new(Some(1));
        let first = engine.enroll_driver("DRV-001").unwrap();
        let second = engine.enroll_driver(" DRV-001 ").unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.driver_count(), 1);
        assert!(first.risk_factors.is_empty());

        assert!(matches!(engine.enroll_driver("  "), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_record_reading_paths() {
        let engine = WellnessEngine::new(Some(2));
        engine.enroll_driver("DRV-002").unwrap();

        let err = engine.record_reading("DRV-404", WellnessReading::default());
        assert!(matches!(err, Err(AppError::NotFound(_))));

        let bad = WellnessReading {
            stress_delta: f64::INFINITY,
            ..Default::default()
        };
        assert!(matches!(
            engine.record_reading("DRV-002", bad),
            Err(AppError::BadRequest(_))
        ));

        let stressed = WellnessReading {
            stress_delta: 10.0,
            hours_driven: 2.0,
            ..Default::default()
        };
        let updated = engine.record_reading("DRV-002", stressed).unwrap();
        assert_eq!(updated.stress_level, 10.0);
        assert_eq!(engine.interventions_for("DRV-002").len(), 1);

        // Still pending, so a second bad reading opens nothing new
        engine.record_reading("DRV-002", stressed).unwrap();
        assert_eq!(engine.interventions_for("DRV-002").len(), 1);
    }

    #[test]
    fn test_engagement_delivers_once() {
        let engine = WellnessEngine::new(Some(3));
        engine.enroll_driver("DRV-003").unwrap();
        engine
            .record_reading(
                "DRV-003",
                WellnessReading {
                    fatigue_delta: 10.0,
                    ..Default::default()
                },
            )
            .unwrap();

        let (delivered, acknowledged) = engine.engagement_tick();
        assert_eq!(delivered, 1);
        assert!(acknowledged <= 1);
        assert_eq!(engine.engagement_tick(), (0, 0));

        let summary = engine.summary();
        assert_eq!(summary.pending_interventions, 0);
        assert_eq!(summary.delivered_interventions, 1);
    }

    #[test]
    fn test_monitoring_keeps_metrics_in_range() {
        let engine = WellnessEngine::new(Some(4));
        engine.seed_drivers(&["DRV-010", "DRV-011", "DRV-012"]);
        for _ in 0..50 {
            engine.monitoring_tick();
            engine.engagement_tick();
        }
        for id in ["DRV-010", "DRV-011", "DRV-012"] {
            let p = engine.wellness_profile(id).unwrap();
            for v in [p.stress_level, p.sleep_quality, p.fatigue_level] {
                assert!((0.0..=10.0).contains(&v));
            }
            assert!((0.0..=DUTY_PERIOD_HOURS).contains(&p.hours_driven));
            assert!((0.0..=100.0).contains(&p.wellness_score));
            let pending = engine
                .interventions_for(id)
                .iter()
                .filter(|i| !i.delivered)
                .count();
            assert!(pending <= 1);
        }

        let at_risk = engine.drivers_at_risk();
        assert!(at_risk
            .windows(2)
            .all(|w| w[0].wellness_score <= w[1].wellness_score));
    }
}
