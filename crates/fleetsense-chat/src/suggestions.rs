//! Follow-up question suggestions.

use crate::classifier::normalize;
use crate::profile::BehaviorLabel;
use crate::types::Intent;

/// Offered before the first turn of a conversation.
const DEFAULTS: &[&str] = &[
    "How can I save fuel?",
    "Analyze my trips",
    "Give me safety tips",
    "What maintenance do I need?",
];

fn candidates(intent: Intent) -> &'static [&'static str] {
    match intent {
        Intent::Greeting | Intent::Help => DEFAULTS,
        Intent::Gratitude => &[
            "Show my driving score",
            "Give me a weekly summary",
            "Any driving tips?",
        ],
        Intent::DrivingTips => &[
            "How can I save fuel?",
            "Give me safety tips",
            "Is my RPM too high?",
            "What's my driving score?",
        ],
        Intent::FuelEfficiencyQuery => &[
            "What about my speed?",
            "Is my RPM too high?",
            "Compare my trips",
            "Any driving tips?",
            "Give me a weekly summary",
        ],
        Intent::SafetyAdviceQuery => &[
            "What's my driving score?",
            "What about my speed?",
            "Driving in the rain",
            "What maintenance do I need?",
        ],
        Intent::MaintenanceQuery => &[
            "When is my next oil change?",
            "Give me safety tips",
            "Is my RPM too high?",
            "How can I save fuel?",
        ],
        Intent::TripAnalysisQuery => &[
            "Compare my trips",
            "How can I save fuel?",
            "What's my driving score?",
            "How is my streak?",
        ],
        Intent::SpeedQuery => &[
            "How can I save fuel?",
            "Is my RPM too high?",
            "Compare my trips",
            "Give me safety tips",
        ],
        Intent::RpmQuery => &[
            "What about my speed?",
            "How can I save fuel?",
            "What maintenance do I need?",
            "What's my driving score?",
        ],
        Intent::DrivingScoreQuery => &[
            "How can I improve my driving score?",
            "How is my streak?",
            "Compare my trips",
            "Give me safety tips",
        ],
        Intent::Comparison => &[
            "Analyze my trips",
            "What about my speed?",
            "Give me a weekly summary",
            "How can I save fuel?",
        ],
        Intent::TripSummary => &[
            "Compare my trips",
            "How is my streak?",
            "What's my driving score?",
            "How can I save fuel?",
        ],
        Intent::StreakQuery => &[
            "Any driving tips?",
            "What's my driving score?",
            "Give me a weekly summary",
        ],
        Intent::FollowUp | Intent::Clarification | Intent::Unknown => &[],
    }
}

/// Extra lead suggestion for drivers in each behavior band.
fn for_label(label: BehaviorLabel) -> &'static str {
    match label {
        BehaviorLabel::Safe => "How is my streak?",
        BehaviorLabel::Moderate => "How can I improve my driving score?",
        BehaviorLabel::Risky => "Give me safety tips",
    }
}

/// Derives follow-up questions from the resolved intent.
pub struct SuggestionGenerator {
    pub max_suggestions: usize,
}

impl Default for SuggestionGenerator {
    fn default() -> Self {
        Self { max_suggestions: 4 }
    }
}

impl SuggestionGenerator {
    pub fn new(max_suggestions: usize) -> Self {
        Self {
            max_suggestions: max_suggestions.min(4),
        }
    }

    /// Suggestions for a reply to `asked`.
    ///
    /// Deterministic for a given intent and behavior label. Anything matching
    /// the question just asked is dropped; `Unknown` yields nothing.
    pub fn suggest(&self, intent: Intent, label: Option<BehaviorLabel>, asked: &str) -> Vec<String> {
        let base = candidates(intent);
        if base.is_empty() {
            return Vec::new();
        }

        let asked = normalize(asked);
        let lead = label.filter(|_| intent.requires_profile()).map(for_label);
        let mut out: Vec<String> = Vec::with_capacity(self.max_suggestions);
        for candidate in lead.into_iter().chain(base.iter().copied()) {
            if out.len() >= self.max_suggestions {
                break;
            }
            let key = normalize(candidate);
            if key == asked || out.iter().any(|s| normalize(s) == key) {
                continue;
            }
            out.push(candidate.to_string());
        }
        out
    }

    /// Suggestions offered before any turn exists.
    pub fn defaults(&self) -> Vec<String> {
        DEFAULTS
            .iter()
            .take(self.max_suggestions)
            .map(|s| s.to_string())
            .collect()
    }
}
