//! Declarative response templates.
//!
//! Each intent owns a family of text blocks. A block is emitted when its
//! condition holds for the telemetry profile; placeholders such as
//! `{avg_speed}` are substituted afterwards by [`render`]. Text uses the
//! lightweight markup convention only: `**bold**`, `• ` bullets and line
//! breaks.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::profile::{BehaviorLabel, TelemetryProfile};
use crate::types::Intent;

// =============================================================================
// Thresholds
// =============================================================================

pub const FUEL_HIGH_SPEED_KMH: f64 = 80.0;
pub const EFFICIENT_RPM: f64 = 3000.0;
pub const SPEED_HIGH_KMH: f64 = 90.0;
pub const SPEED_CITY_KMH: f64 = 30.0;
pub const RPM_HIGH: f64 = 4000.0;
pub const RPM_LOW: f64 = 2500.0;
pub const RPM_SHIFT_EARLY: f64 = 3500.0;
pub const BRAKES_PER_TRIP_HIGH: f64 = 10.0;
pub const TREND_SPEED_DELTA: f64 = 5.0;
pub const SUMMARY_CONSISTENT_TRIPS: f64 = 5.0;
pub const SUMMARY_GOOD_EFFICIENCY: f64 = 10.0;

// =============================================================================
// Conditions
// =============================================================================

/// Profile value a condition can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    AvgSpeed,
    MaxSpeed,
    AvgRpm,
    MaxRpm,
    FuelEfficiency,
    BrakesPerTrip,
    Score,
    TripCount,
    Streak,
    SpeedTrend,
}

impl Field {
    /// Value of the field, or `None` when the profile leaves it undefined.
    pub fn value(&self, profile: &TelemetryProfile) -> Option<f64> {
        match self {
            Field::AvgSpeed => Some(profile.avg_speed),
            Field::MaxSpeed => Some(profile.max_speed),
            Field::AvgRpm => Some(profile.avg_rpm),
            Field::MaxRpm => Some(profile.max_rpm),
            Field::FuelEfficiency => profile.fuel_efficiency,
            Field::BrakesPerTrip => Some(profile.brakes_per_trip()),
            Field::Score => Some(profile.driving_score),
            Field::TripCount => Some(f64::from(profile.trip_count)),
            Field::Streak => Some(f64::from(profile.efficient_streak)),
            Field::SpeedTrend => profile.trend.map(|t| t.speed_change),
        }
    }
}

/// When a template block applies. Comparisons against an undefined field
/// are false.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    Always,
    Above(Field, f64),
    Below(Field, f64),
    AtLeast(Field, f64),
    AtMost(Field, f64),
    /// Inclusive on both ends.
    Between(Field, f64, f64),
    Label(BehaviorLabel),
    Available(Field),
    Unavailable(Field),
    All(&'static [Condition]),
}

impl Condition {
    pub fn holds(&self, profile: &TelemetryProfile) -> bool {
        match self {
            Condition::Always => true,
            Condition::Above(field, x) => test(field, profile, |v| v > *x),
            Condition::Below(field, x) => test(field, profile, |v| v < *x),
            Condition::AtLeast(field, x) => test(field, profile, |v| v >= *x),
            Condition::AtMost(field, x) => test(field, profile, |v| v <= *x),
            Condition::Between(field, lo, hi) => test(field, profile, |v| v >= *lo && v <= *hi),
            Condition::Label(label) => profile.behavior == *label,
            Condition::Available(field) => field.value(profile).is_some(),
            Condition::Unavailable(field) => field.value(profile).is_none(),
            Condition::All(conds) => conds.iter().all(|c| c.holds(profile)),
        }
    }
}

fn test(field: &Field, profile: &TelemetryProfile, pred: impl FnOnce(f64) -> bool) -> bool {
    field.value(profile).is_some_and(pred)
}

/// One parameterized text block of a template family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateBlock {
    pub when: Condition,
    pub text: &'static str,
}

const fn always(text: &'static str) -> TemplateBlock {
    TemplateBlock {
        when: Condition::Always,
        text,
    }
}

const fn when(when: Condition, text: &'static str) -> TemplateBlock {
    TemplateBlock { when, text }
}

// =============================================================================
// Families
// =============================================================================

static GREETING: &[TemplateBlock] = &[always(
    "Hello! I'm your vehicle assistant. Ask me about your driving performance, fuel use, safety or maintenance.",
)];

static GRATITUDE: &[TemplateBlock] = &[always(
    "You're welcome! Drive safely, and ask me anytime you want to check on your trips.",
)];

static HELP: &[TemplateBlock] = &[always(
    "**I can help you with:**\n\
     • Driving tips and techniques\n\
     • Fuel efficiency advice\n\
     • Maintenance schedules\n\
     • Trip data analysis and comparisons\n\
     • Your driving score and efficient-trip streak\n\
     • Safety reminders\n\
     Just ask me anything about your vehicle!",
)];

static DRIVING_TIPS: &[TemplateBlock] = &[
    always(
        "**Eco-driving tips**\n\
         • Maintain steady speeds (50-80 km/h is optimal)\n\
         • Avoid rapid acceleration and hard braking\n\
         • Keep tyres properly inflated\n\
         • Remove excess weight from your vehicle",
    ),
    always(
        "**In the city**\n\
         • Anticipate traffic lights and coast to stops\n\
         • Use gentle acceleration from standstill",
    ),
    always(
        "**On the highway**\n\
         • Use cruise control when possible\n\
         • Keep a 3-second following distance",
    ),
];

static FUEL: &[TemplateBlock] = &[
    always(
        "**Fuel efficiency**\n\
         You've covered {distance} km on {fuel_consumed} L of fuel. Efficiency: **{fuel_efficiency}**.",
    ),
    when(
        Condition::Unavailable(Field::FuelEfficiency),
        "No fuel use is recorded yet, so efficiency can't be calculated.",
    ),
    when(
        Condition::Above(Field::AvgSpeed, FUEL_HIGH_SPEED_KMH),
        "• Your average speed of {avg_speed} km/h is on the high side. Easing to 70-80 km/h can improve efficiency by around 15%.",
    ),
    when(
        Condition::AtMost(Field::AvgSpeed, FUEL_HIGH_SPEED_KMH),
        "• Your average speed of {avg_speed} km/h is in a fuel-friendly range. Keep speeds steady between 50-80 km/h.",
    ),
    when(
        Condition::Above(Field::AvgRpm, EFFICIENT_RPM),
        "• Try to keep RPM under 3000 for better engine efficiency (yours averages {avg_rpm}).",
    ),
    always("• Avoid excessive idling and keep tyres at the recommended pressure."),
];

static SPEED: &[TemplateBlock] = &[
    always("**Speed**\nAverage speed: **{avg_speed} km/h**, top speed {max_speed} km/h."),
    when(
        Condition::Above(Field::AvgSpeed, SPEED_HIGH_KMH),
        "• Consider slowing down. Averages above 90 km/h cost both fuel and safety margin.",
    ),
    when(
        Condition::Below(Field::AvgSpeed, SPEED_CITY_KMH),
        "• Your low average suggests city driving, which is great for efficiency.",
    ),
    when(
        Condition::Between(Field::AvgSpeed, SPEED_CITY_KMH, SPEED_HIGH_KMH),
        "• Your average speed is in the efficient range.",
    ),
];

static RPM: &[TemplateBlock] = &[
    always("**Engine RPM**\nAverage RPM: **{avg_rpm}**, peak {max_rpm}."),
    when(
        Condition::Above(Field::AvgRpm, RPM_HIGH),
        "• Your RPM is quite high. Try gentler acceleration.",
    ),
    when(
        Condition::Below(Field::AvgRpm, RPM_LOW),
        "• Excellent RPM management for fuel efficiency!",
    ),
    when(
        Condition::Between(Field::AvgRpm, RPM_LOW, RPM_HIGH),
        "• Good RPM range for balanced performance.",
    ),
    when(
        Condition::Above(Field::AvgRpm, RPM_SHIFT_EARLY),
        "• Shift up earlier to keep revs down.",
    ),
    always("• Keep RPM between 1500-3000 where you can; higher revs burn more fuel."),
];

static SAFETY: &[TemplateBlock] = &[
    always(
        "**Safety check**\n\
         You logged {brake_events} brake events across your recent {trips}, about {brakes_per_trip} per trip.",
    ),
    when(
        Condition::Above(Field::BrakesPerTrip, BRAKES_PER_TRIP_HIGH),
        "• Work on smoother driving: anticipate traffic and leave more following distance.",
    ),
    when(
        Condition::AtMost(Field::BrakesPerTrip, BRAKES_PER_TRIP_HIGH),
        "• Great job on smooth driving with minimal hard braking!",
    ),
    when(
        Condition::Label(BehaviorLabel::Risky),
        "• Your driving is currently rated **Risky**. Slow down and avoid sudden manoeuvres.",
    ),
    always(
        "• Always wear your seatbelt and avoid phone use while driving\n\
         • Reduce speed in rain or snow and use headlights in poor visibility",
    ),
];

static MAINTENANCE: &[TemplateBlock] = &[
    always(
        "**Maintenance for {vehicle}**\n\
         • Oil change: every 8,000-12,000 km\n\
         • Tyre rotation: every 10,000-13,000 km\n\
         • Brake inspection: every 20,000 km\n\
         • Air filter: every 20,000-25,000 km",
    ),
    when(
        Condition::Above(Field::MaxRpm, RPM_HIGH),
        "• Peaks of {max_rpm} RPM add engine wear. Consider an earlier oil change.",
    ),
    when(
        Condition::Above(Field::BrakesPerTrip, BRAKES_PER_TRIP_HIGH),
        "• Frequent braking wears pads faster. Have your brakes inspected soon.",
    ),
    always("Watch for dashboard warning lights, unusual noises or fluid leaks."),
];

static TRIP_ANALYSIS: &[TemplateBlock] = &[
    always(
        "**Analysis of your recent {trips}**\n\
         • Total distance: {distance} km\n\
         • Average speed: {avg_speed} km/h\n\
         • Fuel consumed: {fuel_consumed} L ({fuel_efficiency})\n\
         • Average RPM: {avg_rpm}\n\
         • Brake events: {brake_events}",
    ),
    always("**Recommendations**"),
    when(
        Condition::Above(Field::AvgSpeed, FUEL_HIGH_SPEED_KMH),
        "• Consider reducing speed to 70-80 km/h for better fuel efficiency",
    ),
    when(
        Condition::Below(Field::AvgSpeed, 40.0),
        "• Your city driving speeds are excellent for fuel economy",
    ),
    when(
        Condition::Above(Field::AvgRpm, EFFICIENT_RPM),
        "• Try to keep RPM under 3000 for better engine efficiency",
    ),
    when(
        Condition::Above(Field::BrakesPerTrip, BRAKES_PER_TRIP_HIGH),
        "• Work on smoother driving to reduce brake events",
    ),
    when(
        Condition::AtMost(Field::BrakesPerTrip, BRAKES_PER_TRIP_HIGH),
        "• Great job on smooth driving with minimal braking!",
    ),
];

static DRIVING_SCORE: &[TemplateBlock] = &[
    always("**Your driving score: {score}/100** ({behavior})"),
    when(
        Condition::Label(BehaviorLabel::Safe),
        "You're driving safely and efficiently. Keep it up!",
    ),
    when(
        Condition::Label(BehaviorLabel::Moderate),
        "Solid driving with room to improve. Steadier speeds and smoother acceleration will lift your score.",
    ),
    when(
        Condition::Label(BehaviorLabel::Risky),
        "Your score needs improvement. Focus on lower speeds, gentler revs and fewer hard stops.",
    ),
    always("Based on your speed, RPM and braking patterns."),
];

static COMPARISON: &[TemplateBlock] = &[
    when(
        Condition::Unavailable(Field::SpeedTrend),
        "I need at least 2 trips for a comparison. Keep driving to see trends!",
    ),
    when(
        Condition::Available(Field::SpeedTrend),
        "**Trip comparison (latest vs oldest)**\n\
         • Speed: {speed_change} km/h\n\
         • Fuel: {fuel_change} L\n\
         • RPM: {rpm_change}",
    ),
    when(
        Condition::Above(Field::SpeedTrend, TREND_SPEED_DELTA),
        "You're driving faster lately. Consider slowing down for efficiency.",
    ),
    when(
        Condition::Below(Field::SpeedTrend, -TREND_SPEED_DELTA),
        "Good job reducing speed for better fuel economy.",
    ),
    when(
        Condition::Between(Field::SpeedTrend, -TREND_SPEED_DELTA, TREND_SPEED_DELTA),
        "Your speed has stayed consistent.",
    ),
];

static TRIP_SUMMARY: &[TemplateBlock] = &[
    always(
        "**Recent summary**\n\
         • Trips: {trip_count}\n\
         • Distance: {distance} km\n\
         • Fuel: {fuel_consumed} L\n\
         • Efficiency: {fuel_efficiency}",
    ),
    when(
        Condition::AtLeast(Field::TripCount, SUMMARY_CONSISTENT_TRIPS),
        "Great consistency!",
    ),
    when(
        Condition::All(&[
            Condition::Below(Field::TripCount, SUMMARY_CONSISTENT_TRIPS),
            Condition::Above(Field::FuelEfficiency, SUMMARY_GOOD_EFFICIENCY),
        ]),
        "Excellent efficiency!",
    ),
    when(
        Condition::All(&[
            Condition::Below(Field::TripCount, SUMMARY_CONSISTENT_TRIPS),
            Condition::AtMost(Field::FuelEfficiency, SUMMARY_GOOD_EFFICIENCY),
        ]),
        "Try steady speeds for better efficiency.",
    ),
    when(
        Condition::All(&[
            Condition::Below(Field::TripCount, SUMMARY_CONSISTENT_TRIPS),
            Condition::Unavailable(Field::FuelEfficiency),
        ]),
        "Log some fuel use to track your efficiency.",
    ),
];

static STREAK: &[TemplateBlock] = &[
    when(
        Condition::AtLeast(Field::Streak, 5.0),
        "**Amazing!** {streak} efficient trips in a row!",
    ),
    when(
        Condition::Between(Field::Streak, 3.0, 4.0),
        "**Good streak!** {streak} efficient trips.",
    ),
    when(
        Condition::Between(Field::Streak, 1.0, 2.0),
        "{streak} efficient trip(s) so far. Build a longer streak!",
    ),
    when(
        Condition::Below(Field::Streak, 1.0),
        "No efficient streak yet. Focus on steady speeds (40-80 km/h) and smooth driving!",
    ),
    always("An efficient trip keeps speed between 40-80 km/h, RPM at or under 3000 and brake events at or under 8."),
];

static UNKNOWN: &[TemplateBlock] = &[always(
    "I'm not sure I understood that. Could you rephrase? You can ask me about fuel efficiency, safety, maintenance or your recent trips.",
)];

/// Reply when a follow-up has nothing earlier in the conversation to refer to.
pub const CLARIFICATION_REQUEST: &str =
    "I'm not sure what you're referring to. Could you tell me which topic you mean, for example fuel, speed or safety?";

/// Reply when the driver's telemetry cannot be read.
pub const DATA_UNAVAILABLE: &str =
    "I couldn't access your trip data right now. Please try again in a moment, or ask me for general driving tips.";

/// Template family for an intent.
///
/// Referential intents are resolved before composing; they share the
/// `Unknown` family.
pub fn family(intent: Intent) -> &'static [TemplateBlock] {
    match intent {
        Intent::Greeting => GREETING,
        Intent::Gratitude => GRATITUDE,
        Intent::Help => HELP,
        Intent::DrivingTips => DRIVING_TIPS,
        Intent::FuelEfficiencyQuery => FUEL,
        Intent::SafetyAdviceQuery => SAFETY,
        Intent::MaintenanceQuery => MAINTENANCE,
        Intent::TripAnalysisQuery => TRIP_ANALYSIS,
        Intent::SpeedQuery => SPEED,
        Intent::RpmQuery => RPM,
        Intent::DrivingScoreQuery => DRIVING_SCORE,
        Intent::Comparison => COMPARISON,
        Intent::TripSummary => TRIP_SUMMARY,
        Intent::StreakQuery => STREAK,
        Intent::FollowUp | Intent::Clarification | Intent::Unknown => UNKNOWN,
    }
}

/// Blocks of `blocks` that apply to `profile`, in table order.
pub fn select<'a>(
    blocks: &'a [TemplateBlock],
    profile: &'a TelemetryProfile,
) -> impl Iterator<Item = &'a TemplateBlock> + 'a {
    blocks.iter().filter(move |b| b.when.holds(profile))
}

// =============================================================================
// Rendering
// =============================================================================

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("Invalid placeholder regex"));

/// Substitute `{placeholder}` parameters from the profile.
///
/// Unrecognized placeholders are left untouched.
pub fn render(template: &str, profile: &TelemetryProfile) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| {
            let key = &caps[1];
            placeholder(key, profile).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn placeholder(key: &str, p: &TelemetryProfile) -> Option<String> {
    let trend = |f: fn(&crate::profile::Trend) -> f64, digits: usize| {
        p.trend
            .as_ref()
            .map(|t| format!("{:+.*}", digits, f(t)))
            .unwrap_or_else(|| "n/a".to_string())
    };
    let value = match key {
        "avg_speed" => format!("{:.1}", p.avg_speed),
        "max_speed" => format!("{:.1}", p.max_speed),
        "avg_rpm" => format!("{:.0}", p.avg_rpm),
        "max_rpm" => format!("{:.0}", p.max_rpm),
        "distance" => format!("{:.1}", p.distance),
        "fuel_consumed" => format!("{:.1}", p.fuel_consumed),
        "fuel_efficiency" => match p.fuel_efficiency {
            Some(eff) => format!("{:.1} km/L", eff),
            None => "not available".to_string(),
        },
        "brake_events" => p.brake_events.to_string(),
        "brakes_per_trip" => format!("{:.1}", p.brakes_per_trip()),
        "behavior" => p.behavior.to_string(),
        "score" => format!("{:.0}", p.driving_score),
        "trip_count" => match p.trip_count {
            0 => "not recorded".to_string(),
            n => n.to_string(),
        },
        "trips" => match p.trip_count {
            0 => "trips".to_string(),
            1 => "1 trip".to_string(),
            n => format!("{} trips", n),
        },
        "streak" => p.efficient_streak.to_string(),
        "speed_change" => trend(|t| t.speed_change, 1),
        "fuel_change" => trend(|t| t.fuel_change, 1),
        "rpm_change" => trend(|t| t.rpm_change, 0),
        "vehicle" => p
            .vehicle
            .clone()
            .unwrap_or_else(|| "your vehicle".to_string()),
        _ => return None,
    };
    Some(value)
}

// =============================================================================
// Tests
// =============================================================================
