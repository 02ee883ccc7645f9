//! Shared types for the conversational engine.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Intent
// =============================================================================

/// Closed set of things a driver can ask the assistant.
///
/// Adding an intent means adding a classifier rule, a template family and a
/// suggestion list; there is no catch-all besides `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Gratitude,
    Help,
    DrivingTips,
    FuelEfficiencyQuery,
    SafetyAdviceQuery,
    MaintenanceQuery,
    TripAnalysisQuery,
    SpeedQuery,
    RpmQuery,
    DrivingScoreQuery,
    Comparison,
    TripSummary,
    StreakQuery,
    FollowUp,
    Clarification,
    Unknown,
}

impl Intent {
    /// Every intent, in declaration order.
    pub const ALL: [Intent; 17] = [
        Intent::Greeting,
        Intent::Gratitude,
        Intent::Help,
        Intent::DrivingTips,
        Intent::FuelEfficiencyQuery,
        Intent::SafetyAdviceQuery,
        Intent::MaintenanceQuery,
        Intent::TripAnalysisQuery,
        Intent::SpeedQuery,
        Intent::RpmQuery,
        Intent::DrivingScoreQuery,
        Intent::Comparison,
        Intent::TripSummary,
        Intent::StreakQuery,
        Intent::FollowUp,
        Intent::Clarification,
        Intent::Unknown,
    ];

    /// Stable snake_case name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::Gratitude => "gratitude",
            Intent::Help => "help",
            Intent::DrivingTips => "driving_tips",
            Intent::FuelEfficiencyQuery => "fuel_efficiency_query",
            Intent::SafetyAdviceQuery => "safety_advice_query",
            Intent::MaintenanceQuery => "maintenance_query",
            Intent::TripAnalysisQuery => "trip_analysis_query",
            Intent::SpeedQuery => "speed_query",
            Intent::RpmQuery => "rpm_query",
            Intent::DrivingScoreQuery => "driving_score_query",
            Intent::Comparison => "comparison",
            Intent::TripSummary => "trip_summary",
            Intent::StreakQuery => "streak_query",
            Intent::FollowUp => "follow_up",
            Intent::Clarification => "clarification",
            Intent::Unknown => "unknown",
        }
    }

    /// Intents that point back at an earlier turn instead of naming a topic.
    pub fn is_referential(&self) -> bool {
        matches!(self, Intent::FollowUp | Intent::Clarification)
    }

    /// Whether a turn with this intent can anchor a later follow-up.
    pub fn can_anchor(&self) -> bool {
        !self.is_referential() && *self != Intent::Unknown
    }

    /// Whether answering needs the driver's telemetry profile.
    pub fn requires_profile(&self) -> bool {
        !matches!(
            self,
            Intent::Greeting
                | Intent::Gratitude
                | Intent::Help
                | Intent::DrivingTips
                | Intent::FollowUp
                | Intent::Clarification
                | Intent::Unknown
        )
    }

    /// Slot schema attached to this intent.
    pub fn slot_schema(&self) -> SlotSchema {
        match self {
            Intent::FollowUp | Intent::Clarification => SlotSchema {
                required: &[SlotKind::Reference],
                optional: &[SlotKind::Metric, SlotKind::Quantity, SlotKind::Tone],
            },
            Intent::Comparison => SlotSchema {
                required: &[],
                optional: &[SlotKind::Metric, SlotKind::Tone],
            },
            Intent::Greeting | Intent::Gratitude | Intent::Help | Intent::Unknown => SlotSchema {
                required: &[],
                optional: &[SlotKind::Tone],
            },
            _ => SlotSchema {
                required: &[],
                optional: &[SlotKind::Metric, SlotKind::Quantity, SlotKind::Tone],
            },
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Slots
// =============================================================================

/// A telemetry metric the driver can name explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Speed,
    Fuel,
    Rpm,
    Brakes,
    Distance,
    Score,
}

impl Metric {
    /// The concrete intent that answers a question about this metric.
    pub fn intent(&self) -> Intent {
        match self {
            Metric::Speed => Intent::SpeedQuery,
            Metric::Fuel => Intent::FuelEfficiencyQuery,
            Metric::Rpm => Intent::RpmQuery,
            Metric::Brakes => Intent::SafetyAdviceQuery,
            Metric::Distance => Intent::TripAnalysisQuery,
            Metric::Score => Intent::DrivingScoreQuery,
        }
    }
}

/// Unit attached to a number the driver typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    KilometresPerHour,
    MilesPerHour,
    Litres,
    Rpm,
    Kilometres,
}

impl Unit {
    pub fn suffix(&self) -> &'static str {
        match self {
            Unit::KilometresPerHour => "km/h",
            Unit::MilesPerHour => "mph",
            Unit::Litres => "L",
            Unit::Rpm => "RPM",
            Unit::Kilometres => "km",
        }
    }
}

/// A number with a unit extracted from the message, e.g. "90 km/h".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.fract() == 0.0 {
            write!(f, "{:.0} {}", self.value, self.unit.suffix())
        } else {
            write!(f, "{:.1} {}", self.value, self.unit.suffix())
        }
    }
}

/// Rough sentiment of the message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Neutral,
    Positive,
    Negative,
}

/// Named parameters extracted from a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slots {
    /// Metric the driver named, if any.
    pub metric: Option<Metric>,
    /// First number-with-unit in the message.
    pub quantity: Option<Quantity>,
    pub tone: Tone,
    /// Intent of the earlier turn a follow-up was resolved against.
    pub reference: Option<Intent>,
}

/// Kinds of slot an intent can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Metric,
    Quantity,
    Tone,
    Reference,
}

/// Required and optional slots for one intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSchema {
    pub required: &'static [SlotKind],
    pub optional: &'static [SlotKind],
}

impl SlotSchema {
    /// Whether every required slot is filled.
    pub fn is_satisfied_by(&self, slots: &Slots) -> bool {
        self.required.iter().all(|kind| match kind {
            SlotKind::Metric => slots.metric.is_some(),
            SlotKind::Quantity => slots.quantity.is_some(),
            SlotKind::Tone => true,
            SlotKind::Reference => slots.reference.is_some(),
        })
    }
}

// =============================================================================
// Turns and sessions
// =============================================================================

/// One user message plus the engine's interpretation and reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Raw user text.
    pub message: String,
    /// Resolved, concrete intent (never `FollowUp`/`Clarification`).
    pub intent: Intent,
    pub slots: Slots,
    /// Reply text, in the lightweight markup convention.
    pub response: String,
    pub suggestions: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Ordered conversation history for one conversation id.
///
/// Turns can only be appended; the oldest is dropped once the retention
/// window is full.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    turns: VecDeque<Turn>,
}

impl Session {
    /// Create an empty session.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            last_activity: now,
            turns: VecDeque::new(),
        }
    }

    /// Turns in time order, oldest first.
    pub fn turns(&self) -> impl DoubleEndedIterator<Item = &Turn> + ExactSizeIterator {
        self.turns.iter()
    }

    /// The most recent `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Turn> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip).cloned().collect()
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.back()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a turn, evicting from the front beyond `max_turns`.
    ///
    /// The timestamp is clamped so it never precedes the previous turn.
    pub(crate) fn push(&mut self, mut turn: Turn, max_turns: usize) {
        if let Some(last) = self.turns.back() {
            if turn.timestamp < last.timestamp {
                turn.timestamp = last.timestamp;
            }
        }
        self.last_activity = turn.timestamp.max(self.last_activity);
        self.turns.push_back(turn);
        while self.turns.len() > max_turns {
            self.turns.pop_front();
        }
    }

    pub(crate) fn clear(&mut self) {
        self.turns.clear();
        self.last_activity = Utc::now();
    }
}

// =============================================================================
// Replies
// =============================================================================

/// What the engine hands back for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub conversation_id: String,
    pub response: String,
    pub suggestions: Vec<String>,
    /// Resolved intent, for logging and tests.
    pub intent: Intent,
}
