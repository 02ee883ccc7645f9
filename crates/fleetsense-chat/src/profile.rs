//! Telemetry profile adapter.
//!
//! Normalizes a loosely-typed trip summary (metric name -> number or string)
//! into the fixed [`TelemetryProfile`] vocabulary the composer reads.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChatError;

/// Trips that qualify for the efficient-driving streak.
const STREAK_MIN_SPEED: f64 = 40.0;
const STREAK_MAX_SPEED: f64 = 80.0;
const STREAK_MAX_RPM: f64 = 3000.0;
const STREAK_MAX_BRAKES: u32 = 8;

// =============================================================================
// RawSummary
// =============================================================================

/// Upstream trip aggregation output, keyed by metric name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawSummary(BTreeMap<String, Value>);

impl RawSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Aggregate individual trips (most recent first) into a summary.
    ///
    /// An empty slice yields an empty summary, which [`adapt`] rejects.
    pub fn from_trips(trips: &[TripRecord]) -> Self {
        let mut summary = RawSummary::new();
        if trips.is_empty() {
            return summary;
        }
        let n = trips.len() as f64;

        let avg_speed = trips.iter().map(|t| t.avg_speed_kmph).sum::<f64>() / n;
        let max_speed = trips
            .iter()
            .map(|t| t.max_speed_kmph.unwrap_or(t.avg_speed_kmph))
            .fold(0.0, f64::max);
        let max_rpm = trips.iter().map(|t| t.max_rpm).fold(0.0, f64::max);
        // Trips without an average RPM contribute their peak instead.
        let avg_rpm = trips
            .iter()
            .map(|t| t.avg_rpm.unwrap_or(t.max_rpm))
            .sum::<f64>()
            / n;

        summary.insert("avg_speed", avg_speed);
        summary.insert("max_speed", max_speed);
        summary.insert("avg_rpm", avg_rpm);
        summary.insert("max_rpm", max_rpm);
        summary.insert(
            "mean_max_rpm",
            trips.iter().map(|t| t.max_rpm).sum::<f64>() / n,
        );
        summary.insert("distance", trips.iter().map(|t| t.distance_km).sum::<f64>());
        summary.insert(
            "fuel_consumed",
            trips.iter().map(|t| t.fuel_consumed).sum::<f64>(),
        );
        summary.insert(
            "brake_events",
            trips.iter().map(|t| u64::from(t.brake_events)).sum::<u64>(),
        );
        summary.insert("trip_count", trips.len() as u64);
        summary.insert(
            "efficient_streak",
            trips.iter().take_while(|t| t.is_efficient()).count() as u64,
        );

        if let (Some(latest), Some(oldest)) = (trips.first(), trips.last()) {
            if trips.len() >= 2 {
                summary.insert("speed_change", latest.avg_speed_kmph - oldest.avg_speed_kmph);
                summary.insert("fuel_change", latest.fuel_consumed - oldest.fuel_consumed);
                summary.insert("rpm_change", latest.max_rpm - oldest.max_rpm);
            }
        }

        summary
    }
}

/// One recorded trip, as stored by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    #[serde(default)]
    pub distance_km: f64,
    #[serde(default)]
    pub avg_speed_kmph: f64,
    #[serde(default)]
    pub max_speed_kmph: Option<f64>,
    #[serde(default)]
    pub avg_rpm: Option<f64>,
    #[serde(default)]
    pub max_rpm: f64,
    #[serde(default)]
    pub fuel_consumed: f64,
    #[serde(default)]
    pub brake_events: u32,
}

impl TripRecord {
    fn is_efficient(&self) -> bool {
        (STREAK_MIN_SPEED..=STREAK_MAX_SPEED).contains(&self.avg_speed_kmph)
            && self.max_rpm <= STREAK_MAX_RPM
            && self.brake_events <= STREAK_MAX_BRAKES
    }
}

// =============================================================================
// TelemetryProfile
// =============================================================================

/// Driving-behavior label produced by the upstream classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorLabel {
    Safe,
    Moderate,
    Risky,
}

impl BehaviorLabel {
    /// Parse a label string; "Aggressive" is accepted for `Risky`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "safe" => Some(BehaviorLabel::Safe),
            "moderate" => Some(BehaviorLabel::Moderate),
            "risky" | "aggressive" => Some(BehaviorLabel::Risky),
            _ => None,
        }
    }

    /// Label implied by a 0-100 driving score.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            BehaviorLabel::Safe
        } else if score >= 60.0 {
            BehaviorLabel::Moderate
        } else {
            BehaviorLabel::Risky
        }
    }
}

impl fmt::Display for BehaviorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BehaviorLabel::Safe => "Safe",
            BehaviorLabel::Moderate => "Moderate",
            BehaviorLabel::Risky => "Risky",
        })
    }
}

/// Latest trip minus oldest trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub speed_change: f64,
    pub fuel_change: f64,
    pub rpm_change: f64,
}

/// Read-only snapshot of a driver's trip metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryProfile {
    pub avg_speed: f64,
    pub max_speed: f64,
    pub avg_rpm: f64,
    pub max_rpm: f64,
    pub distance: f64,
    pub fuel_consumed: f64,
    /// km per litre; `None` when no fuel was consumed.
    pub fuel_efficiency: Option<f64>,
    pub brake_events: u32,
    pub trip_count: u32,
    pub efficient_streak: u32,
    pub behavior: BehaviorLabel,
    /// 0-100.
    pub driving_score: f64,
    pub trend: Option<Trend>,
    pub vehicle: Option<String>,
}

impl TelemetryProfile {
    /// Brake events per trip, treating an unknown trip count as one trip.
    pub fn brakes_per_trip(&self) -> f64 {
        f64::from(self.brake_events) / f64::from(self.trip_count.max(1))
    }
}

// =============================================================================
// Adapter
// =============================================================================

/// Normalize a raw summary into a [`TelemetryProfile`].
///
/// Average speed, distance and fuel consumed are required. Optional counts
/// default to zero; fuel efficiency stays undefined when fuel consumed is zero
/// or too small to give a finite ratio.
pub fn adapt(raw: &RawSummary) -> Result<TelemetryProfile, ChatError> {
    let avg_speed = required(raw, "avg_speed", &["avg_speed", "avg_speed_kmph", "average_speed"])?;
    let distance = required(raw, "distance", &["distance", "distance_km", "total_distance"])?;
    let fuel_consumed = required(
        raw,
        "fuel_consumed",
        &["fuel_consumed", "fuel", "total_fuel"],
    )?;

    let max_speed = optional(raw, "max_speed", &["max_speed", "max_speed_kmph"])?.unwrap_or(0.0);
    let reported_avg_rpm = optional(raw, "avg_rpm", &["avg_rpm"])?;
    let avg_rpm = reported_avg_rpm.unwrap_or(0.0);
    let max_rpm = optional(raw, "max_rpm", &["max_rpm"])?.unwrap_or(0.0);
    // Scoring looks at typical revs: the per-trip peak averaged over trips
    // when known, else the average, else the single peak.
    let scoring_rpm = optional(raw, "mean_max_rpm", &["mean_max_rpm"])?
        .or(reported_avg_rpm)
        .unwrap_or(max_rpm);
    let brake_events = count(raw, "brake_events", &["brake_events", "brakes"])?;
    let trip_count = count(raw, "trip_count", &["trip_count", "trips"])?;
    let efficient_streak = count(raw, "efficient_streak", &["efficient_streak", "streak"])?;

    let fuel_efficiency = Some(distance / fuel_consumed)
        .filter(|eff| fuel_consumed > 0.0 && eff.is_finite());

    let speed_change = optional(raw, "speed_change", &["speed_change"])?;
    let fuel_change = optional(raw, "fuel_change", &["fuel_change"])?;
    let rpm_change = optional(raw, "rpm_change", &["rpm_change"])?;
    let trend = if speed_change.is_some() || fuel_change.is_some() || rpm_change.is_some() {
        Some(Trend {
            speed_change: speed_change.unwrap_or(0.0),
            fuel_change: fuel_change.unwrap_or(0.0),
            rpm_change: rpm_change.unwrap_or(0.0),
        })
    } else {
        None
    };

    let driving_score = match optional(raw, "driving_score", &["driving_score", "score"])? {
        Some(score) => score.clamp(0.0, 100.0),
        None => estimate_score(avg_speed, scoring_rpm, brake_events, trip_count),
    };

    let behavior = match lookup(raw, &["behavior", "behavior_label", "driving_behavior"]) {
        Some(Value::String(label)) => BehaviorLabel::parse(label).unwrap_or_else(|| {
            tracing::warn!(label = %label, "Unrecognized behavior label, deriving from score");
            BehaviorLabel::from_score(driving_score)
        }),
        Some(other) => {
            return Err(ChatError::validation(
                "behavior",
                format!("expected a label string, got {}", other),
            ))
        }
        None => BehaviorLabel::from_score(driving_score),
    };

    let vehicle = match lookup(raw, &["vehicle", "vehicle_number"]) {
        Some(Value::String(v)) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    };

    Ok(TelemetryProfile {
        avg_speed,
        max_speed,
        avg_rpm,
        max_rpm,
        distance,
        fuel_consumed,
        fuel_efficiency,
        brake_events,
        trip_count,
        efficient_streak,
        behavior,
        driving_score,
        trend,
        vehicle,
    })
}

/// Ten-point deduction score scaled to 0-100, used when upstream sends none.
fn estimate_score(avg_speed: f64, rpm: f64, brake_events: u32, trip_count: u32) -> f64 {
    let mut score: i32 = 10;
    if avg_speed > 90.0 {
        score -= 2;
    } else if avg_speed > 80.0 {
        score -= 1;
    }
    if rpm > 4000.0 {
        score -= 2;
    } else if rpm > 3000.0 {
        score -= 1;
    }
    let brakes_per_trip = f64::from(brake_events) / f64::from(trip_count.max(1));
    if brakes_per_trip > 15.0 {
        score -= 2;
    } else if brakes_per_trip > 10.0 {
        score -= 1;
    }
    f64::from(score.clamp(1, 10) * 10)
}

fn lookup<'a>(raw: &'a RawSummary, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| raw.get(k))
        .find(|v| !v.is_null())
}

fn required(raw: &RawSummary, field: &str, keys: &[&str]) -> Result<f64, ChatError> {
    optional(raw, field, keys)?.ok_or_else(|| ChatError::validation(field, "missing"))
}

fn optional(raw: &RawSummary, field: &str, keys: &[&str]) -> Result<Option<f64>, ChatError> {
    let Some(value) = lookup(raw, keys) else {
        return Ok(None);
    };
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() && n >= 0.0 => Ok(Some(n)),
        Some(n) if n.is_finite() && is_signed(field) => Ok(Some(n)),
        Some(n) => Err(ChatError::validation(
            field,
            format!("{} is out of range", n),
        )),
        None => Err(ChatError::validation(
            field,
            format!("expected a number, got {}", value),
        )),
    }
}

fn count(raw: &RawSummary, field: &str, keys: &[&str]) -> Result<u32, ChatError> {
    Ok(optional(raw, field, keys)?
        .map(|n| n.round().min(f64::from(u32::MAX)) as u32)
        .unwrap_or(0))
}

/// Trend deltas may be negative; everything else is a magnitude.
fn is_signed(field: &str) -> bool {
    matches!(field, "speed_change" | "fuel_change" | "rpm_change")
}
