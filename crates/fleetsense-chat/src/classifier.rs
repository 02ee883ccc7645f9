//! Rule-based intent classifier.
//!
//! Normalizes the message, scores it against an ordered rule table and
//! extracts slots (named metric, quantity with unit, tone).

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Intent, Metric, Quantity, Slots, Tone, Turn, Unit};

// =============================================================================
// Rule table
// =============================================================================

/// One intent rule: every `required` group must match; each matched
/// `any_of` group adds to the score. Groups are regex alternatives matched
/// as whole words against normalized text.
struct RuleDef {
    intent: Intent,
    weight: u32,
    required: &'static [&'static [&'static str]],
    any_of: &'static [&'static [&'static str]],
}

/// Ordered by priority: on a score tie the earlier rule wins, so specific
/// topics sit above generic ones.
static RULE_DEFS: &[RuleDef] = &[
    RuleDef {
        intent: Intent::FuelEfficiencyQuery,
        weight: 1,
        required: &[&[
            "fuel", "gas", "petrol", "diesel", "mileage", "mpg", "economy", "consumption",
            "efficiency", "efficient", "kmpl", "km per litre", "km per liter",
        ]],
        any_of: &[&["save", "saving", "improve", "reduce", "better", "lower", "cut", "tips?"]],
    },
    RuleDef {
        intent: Intent::RpmQuery,
        weight: 1,
        required: &[&[
            "rpm", "revs?", "revolutions?", "engine speed", "rev counter", "tachometer",
        ]],
        any_of: &[&["high", "keep", "shift\\w*", "gears?"]],
    },
    RuleDef {
        intent: Intent::SpeedQuery,
        weight: 1,
        required: &[&[
            "speed", "speeding", "fast", "faster", "slow", "slower", "km h", "kmh", "kph",
            "mph", "velocity",
        ]],
        any_of: &[&["average", "top", "max\\w*", "my"]],
    },
    RuleDef {
        intent: Intent::SafetyAdviceQuery,
        weight: 1,
        required: &[&[
            "safety", "safe", "safer", "safely", "accidents?", "crash\\w*", "seatbelts?",
            "emergency", "braking", "brakes", "brake events", "hard brak\\w*", "weather",
            "rain", "snow", "fog",
        ]],
        any_of: &[&["tips?", "advice", "remind\\w*"]],
    },
    RuleDef {
        intent: Intent::MaintenanceQuery,
        weight: 1,
        required: &[&[
            "maintenance", "service", "servicing", "oil", "oil change", "tyres?", "tires?",
            "battery", "repairs?", "filters?", "coolant", "inspection", "brake pads",
            "warning lights?", "alerts?", "check engine",
        ]],
        any_of: &[&["schedule", "due", "when", "check", "next"]],
    },
    RuleDef {
        intent: Intent::DrivingScoreQuery,
        weight: 1,
        required: &[&[
            "score", "rating", "grade", "rank\\w*", "how am i doing", "how good",
        ]],
        any_of: &[&["my"], &["driving"]],
    },
    RuleDef {
        intent: Intent::Comparison,
        weight: 1,
        required: &[&[
            "compare", "comparison", "compared", "vs", "versus", "difference", "trend",
            "changed?", "lately", "improving",
        ]],
        any_of: &[&["trips?", "last", "before", "previous", "oldest", "latest"]],
    },
    RuleDef {
        intent: Intent::TripSummary,
        weight: 1,
        required: &[&[
            "summary", "summari[sz]e", "week", "weekly", "overview", "recap", "totals?",
        ]],
        any_of: &[&["trips?", "my"]],
    },
    RuleDef {
        intent: Intent::StreakQuery,
        weight: 1,
        required: &[&["streak", "consistent", "consistency", "in a row", "progress"]],
        any_of: &[&["efficient", "my"]],
    },
    RuleDef {
        intent: Intent::TripAnalysisQuery,
        weight: 1,
        required: &[&[
            "trips?", "journeys?", "drives", "data", "distance", "analy\\w*", "stats",
            "statistics", "performance", "metrics",
        ]],
        any_of: &[&["my", "recent", "last", "show"], &["analy\\w*", "breakdown"]],
    },
    RuleDef {
        intent: Intent::DrivingTips,
        weight: 1,
        required: &[&[
            "driving tips", "drive better", "improve (?:my )?driving", "how to drive",
            "tips?", "techniques?", "eco driving", "acceleration", "accelerate",
            "drive smarter",
        ]],
        any_of: &[&["better", "improve", "eco", "city", "highway"]],
    },
    RuleDef {
        intent: Intent::Help,
        weight: 1,
        required: &[&[
            "help", "what can you do", "capabilities", "what do you know", "options", "menu",
        ]],
        any_of: &[],
    },
    RuleDef {
        intent: Intent::Gratitude,
        weight: 1,
        required: &[&["thanks", "thank you", "thank", "thx", "cheers", "appreciate\\w*"]],
        any_of: &[],
    },
    RuleDef {
        intent: Intent::Greeting,
        weight: 1,
        required: &[&[
            "hi", "hello", "hey", "hiya", "howdy", "greetings", "good morning",
            "good afternoon", "good evening",
        ]],
        any_of: &[],
    },
    RuleDef {
        intent: Intent::FollowUp,
        weight: 2,
        required: &[&[
            "what about", "how about", "^and", "^also", "^but", "same for", "what if",
            "instead",
        ]],
        any_of: &[&["instead", "too", "also", "as well", "then", "that", "it", "this"]],
    },
    RuleDef {
        intent: Intent::Clarification,
        weight: 2,
        required: &[&[
            "what do you mean", "explain", "elaborate", "tell me more", "more details?",
            "clarify", "go on", "why", "what does that mean", "dont understand",
            "do not understand",
        ]],
        any_of: &[&["that", "it", "this", "more"]],
    },
];

struct CompiledRule {
    intent: Intent,
    weight: u32,
    required: Vec<Regex>,
    any_of: Vec<Regex>,
}

fn compile_group(alternatives: &[&str]) -> Regex {
    Regex::new(&format!(r"\b(?:{})\b", alternatives.join("|"))).expect("Invalid intent regex")
}

static RULES: LazyLock<Vec<CompiledRule>> = LazyLock::new(|| {
    RULE_DEFS
        .iter()
        .map(|def| CompiledRule {
            intent: def.intent,
            weight: def.weight,
            required: def.required.iter().map(|g| compile_group(g)).collect(),
            any_of: def.any_of.iter().map(|g| compile_group(g)).collect(),
        })
        .collect()
});

// Slot extraction patterns
static METRIC_PATTERNS: LazyLock<Vec<(Metric, Regex)>> = LazyLock::new(|| {
    [
        (Metric::Speed, r"\b(?:speed\w*|fast\w*|slow\w*|kmh|kph|mph)\b"),
        (
            Metric::Fuel,
            r"\b(?:fuel|gas|petrol|diesel|mileage|mpg|consumption|efficiency|economy)\b",
        ),
        (Metric::Rpm, r"\b(?:rpm|revs?|revolutions?)\b"),
        (Metric::Brakes, r"\b(?:brake|brakes|braking)\b"),
        (Metric::Distance, r"\b(?:distance|kilomet\w+|miles)\b"),
        (Metric::Score, r"\b(?:score|rating|grade)\b"),
    ]
    .into_iter()
    .map(|(metric, pat)| (metric, Regex::new(pat).expect("Invalid metric regex")))
    .collect()
});

static QUANTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(km/h|kmh|kph|mph|rpm|litres?|liters?|l|km)\b")
        .expect("Invalid quantity regex")
});

static POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "love", "like", "amazing", "perfect", "awesome", "thanks",
    "nice", "happy",
];

static NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "hate", "problem", "issue", "wrong", "broken", "frustrated",
    "worried", "annoyed", "poor", "worse",
];

/// Words that carry no topic of their own ("that one?", "this?").
static REFERENCE_WORDS: &[&str] = &[
    "it", "that", "this", "those", "these", "them", "they", "one", "ones", "the", "a", "an",
    "same", "so", "what", "about", "and",
];

// =============================================================================
// IntentClassifier
// =============================================================================

/// Outcome of classifying one message.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    pub slots: Slots,
    /// Weighted score of the winning rule; zero for fallbacks.
    pub score: u32,
}

/// History-aware, rule-based intent classifier.
pub struct IntentClassifier {
    /// Keyword groups a rule must match to be considered at all.
    pub min_confidence_groups: u32,
    /// Messages with fewer words may be read as follow-ups.
    pub short_message_words: usize,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(1, 4)
    }
}

impl IntentClassifier {
    pub fn new(min_confidence_groups: u32, short_message_words: usize) -> Self {
        Self {
            min_confidence_groups: min_confidence_groups.max(1),
            short_message_words,
        }
    }

    /// Classify a message given the session's recent turns.
    ///
    /// Never fails: anything unrecognized is `Unknown`, or `FollowUp` when
    /// the message is short and there is history to lean on.
    pub fn classify(&self, text: &str, recent_turns: &[Turn]) -> Classification {
        let normalized = normalize(text);
        let slots = extract_slots(text, &normalized);

        if normalized.is_empty() {
            return Classification {
                intent: Intent::Unknown,
                slots,
                score: 0,
            };
        }

        if let Some((intent, score)) = self.best_rule(&normalized) {
            tracing::debug!(intent = %intent, score, "Intent rule matched");
            return Classification {
                intent,
                slots,
                score,
            };
        }

        let intent = if self.looks_elliptical(&normalized) && !recent_turns.is_empty() {
            Intent::FollowUp
        } else {
            Intent::Unknown
        };
        tracing::debug!(intent = %intent, "No intent rule cleared the threshold");
        Classification {
            intent,
            slots,
            score: 0,
        }
    }

    /// Highest-scoring rule above the confidence threshold; ties keep the
    /// earlier rule.
    fn best_rule(&self, normalized: &str) -> Option<(Intent, u32)> {
        let mut best: Option<(Intent, u32)> = None;
        for rule in RULES.iter() {
            if !rule.required.iter().all(|re| re.is_match(normalized)) {
                continue;
            }
            let groups = rule.required.len()
                + rule.any_of.iter().filter(|re| re.is_match(normalized)).count();
            let groups = groups as u32;
            if groups < self.min_confidence_groups {
                continue;
            }
            let score = groups * rule.weight;
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((rule.intent, score));
            }
        }
        best
    }

    fn looks_elliptical(&self, normalized: &str) -> bool {
        let words: Vec<&str> = normalized.split_whitespace().collect();
        words.len() < self.short_message_words
            || words.iter().all(|w| REFERENCE_WORDS.contains(w))
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Lowercase, drop apostrophes, turn other punctuation into spaces and
/// collapse whitespace.
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| *c != '\'' && *c != '\u{2019}')
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_slots(raw: &str, normalized: &str) -> Slots {
    Slots {
        metric: extract_metric(normalized),
        quantity: extract_quantity(raw),
        tone: detect_tone(normalized),
        reference: None,
    }
}

/// The metric mentioned earliest in the message.
fn extract_metric(normalized: &str) -> Option<Metric> {
    METRIC_PATTERNS
        .iter()
        .filter_map(|(metric, re)| re.find(normalized).map(|m| (m.start(), *metric)))
        .min_by_key(|(start, _)| *start)
        .map(|(_, metric)| metric)
}

fn extract_quantity(raw: &str) -> Option<Quantity> {
    let caps = QUANTITY_RE.captures(raw)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = match caps.get(2)?.as_str().to_lowercase().as_str() {
        "km/h" | "kmh" | "kph" => Unit::KilometresPerHour,
        "mph" => Unit::MilesPerHour,
        "rpm" => Unit::Rpm,
        "km" => Unit::Kilometres,
        _ => Unit::Litres,
    };
    Some(Quantity { value, unit })
}

fn detect_tone(normalized: &str) -> Tone {
    let words: Vec<&str> = normalized.split_whitespace().collect();
    let pos = words.iter().filter(|w| POSITIVE_WORDS.contains(w)).count();
    let neg = words.iter().filter(|w| NEGATIVE_WORDS.contains(w)).count();
    match pos.cmp(&neg) {
        std::cmp::Ordering::Greater => Tone::Positive,
        std::cmp::Ordering::Less => Tone::Negative,
        std::cmp::Ordering::Equal => Tone::Neutral,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn classifier() -> IntentClassifier {
        IntentClassifier::default()
    }

    fn intent_of(text: &str) -> Intent {
        classifier().classify(text, &[]).intent
    }

    fn prior(intent: Intent) -> Vec<Turn> {
        vec![Turn {
            message: "earlier".to_string(),
            intent,
            slots: Slots::default(),
            response: "earlier reply".to_string(),
            suggestions: vec![],
            timestamp: Utc::now(),
        }]
    }

    // ---- Normalization ----

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("  How can I SAVE fuel?! "), "how can i save fuel");
        assert_eq!(normalize("What's my score"), "whats my score");
        assert_eq!(normalize("km/h"), "km h");
        assert_eq!(normalize("?!..."), "");
    }

    // ---- Core intents ----

    #[test]
    fn test_intent_hello() {
        assert_eq!(intent_of("hello"), Intent::Greeting);
        assert_eq!(intent_of("Good morning!"), Intent::Greeting);
    }

    #[test]
    fn test_intent_save_fuel() {
        let c = classifier().classify("how can I save fuel?", &[]);
        assert_eq!(c.intent, Intent::FuelEfficiencyQuery);
        assert_eq!(c.score, 2);
        assert_eq!(c.slots.metric, Some(Metric::Fuel));
    }

    #[test]
    fn test_intent_fuel_efficiency() {
        assert_eq!(
            intent_of("How is my fuel efficiency?"),
            Intent::FuelEfficiencyQuery
        );
    }

    #[test]
    fn test_intent_safety() {
        assert_eq!(intent_of("give me safety tips"), Intent::SafetyAdviceQuery);
        assert_eq!(intent_of("driving in the rain"), Intent::SafetyAdviceQuery);
    }

    #[test]
    fn test_intent_maintenance() {
        assert_eq!(
            intent_of("when is my next oil change due"),
            Intent::MaintenanceQuery
        );
        assert_eq!(intent_of("What maintenance do I need?"), Intent::MaintenanceQuery);
    }

    #[test]
    fn test_intent_trip_analysis() {
        assert_eq!(intent_of("Analyze my trips"), Intent::TripAnalysisQuery);
    }

    #[test]
    fn test_intent_speed_and_rpm() {
        assert_eq!(intent_of("what is my average speed"), Intent::SpeedQuery);
        assert_eq!(intent_of("is my rpm too high"), Intent::RpmQuery);
    }

    #[test]
    fn test_intent_score_beats_tips() {
        assert_eq!(
            intent_of("how can I improve my driving score"),
            Intent::DrivingScoreQuery
        );
    }

    #[test]
    fn test_intent_comparison_summary_streak() {
        assert_eq!(intent_of("compare my trips"), Intent::Comparison);
        assert_eq!(intent_of("give me a weekly summary"), Intent::TripSummary);
        assert_eq!(intent_of("how is my streak"), Intent::StreakQuery);
    }

    #[test]
    fn test_intent_help_and_thanks() {
        assert_eq!(intent_of("what can you do"), Intent::Help);
        assert_eq!(intent_of("thank you"), Intent::Gratitude);
    }

    #[test]
    fn test_intent_driving_tips() {
        assert_eq!(intent_of("any eco driving tips for the city"), Intent::DrivingTips);
    }

    #[test]
    fn test_intent_case_insensitive() {
        assert_eq!(intent_of("HELLO"), Intent::Greeting);
        assert_eq!(intent_of("FUEL ECONOMY"), Intent::FuelEfficiencyQuery);
    }

    // ---- Priority and ties ----

    #[test]
    fn test_specific_intent_outranks_greeting() {
        assert_eq!(
            intent_of("hi, how can I save fuel"),
            Intent::FuelEfficiencyQuery
        );
    }

    #[test]
    fn test_tie_breaks_toward_earlier_rule() {
        // Comparison and trip analysis both score 2; comparison is listed first.
        assert_eq!(intent_of("compare my trips"), Intent::Comparison);
        assert_eq!(intent_of("safe driving tips"), Intent::SafetyAdviceQuery);
    }

    #[test]
    fn test_min_confidence_threshold() {
        let strict = IntentClassifier::new(2, 4);
        // Greeting only ever matches one group.
        assert_eq!(strict.classify("hello", &[]).intent, Intent::Unknown);
        assert_eq!(
            strict.classify("how can I save fuel", &[]).intent,
            Intent::FuelEfficiencyQuery
        );
    }

    #[test]
    fn test_zero_threshold_is_clamped() {
        let c = IntentClassifier::new(0, 4);
        assert_eq!(c.min_confidence_groups, 1);
    }

    // ---- Follow-ups and fallbacks ----

    #[test]
    fn test_what_about_that_is_follow_up() {
        let c = classifier().classify("what about that?", &prior(Intent::FuelEfficiencyQuery));
        assert_eq!(c.intent, Intent::FollowUp);
        assert_eq!(c.slots.metric, None);
    }

    #[test]
    fn test_follow_up_with_metric_slot() {
        let c = classifier().classify(
            "what about speed instead?",
            &prior(Intent::FuelEfficiencyQuery),
        );
        assert_eq!(c.intent, Intent::FollowUp);
        assert_eq!(c.slots.metric, Some(Metric::Speed));
    }

    #[test]
    fn test_leading_and_is_follow_up() {
        let c = classifier().classify("and fuel?", &prior(Intent::SpeedQuery));
        assert_eq!(c.intent, Intent::FollowUp);
        assert_eq!(c.slots.metric, Some(Metric::Fuel));
    }

    #[test]
    fn test_clarification() {
        assert_eq!(intent_of("what do you mean?"), Intent::Clarification);
        assert_eq!(intent_of("tell me more"), Intent::Clarification);
    }

    #[test]
    fn test_empty_is_unknown_even_with_history() {
        assert_eq!(intent_of(""), Intent::Unknown);
        assert_eq!(
            classifier()
                .classify("   ", &prior(Intent::SpeedQuery))
                .intent,
            Intent::Unknown
        );
    }

    #[test]
    fn test_unmatched_without_history_is_unknown() {
        assert_eq!(intent_of("purple elephants dancing"), Intent::Unknown);
    }

    #[test]
    fn test_short_unmatched_with_history_is_follow_up() {
        let c = classifier().classify("really?", &prior(Intent::SpeedQuery));
        assert_eq!(c.intent, Intent::FollowUp);
        assert_eq!(c.score, 0);
    }

    #[test]
    fn test_pronoun_only_with_history_is_follow_up() {
        let c = IntentClassifier::new(1, 1).classify("that one", &prior(Intent::SpeedQuery));
        assert_eq!(c.intent, Intent::FollowUp);
    }

    #[test]
    fn test_long_unmatched_with_history_is_unknown() {
        let c = classifier().classify(
            "purple elephants dancing on the moon tonight",
            &prior(Intent::SpeedQuery),
        );
        assert_eq!(c.intent, Intent::Unknown);
    }

    // ---- Slots ----

    #[test]
    fn test_quantity_extraction() {
        let c = classifier().classify("is 90 km/h too fast?", &[]);
        assert_eq!(
            c.slots.quantity,
            Some(Quantity {
                value: 90.0,
                unit: Unit::KilometresPerHour
            })
        );

        let c = classifier().classify("I used 4.5 litres", &[]);
        assert_eq!(
            c.slots.quantity,
            Some(Quantity {
                value: 4.5,
                unit: Unit::Litres
            })
        );

        let c = classifier().classify("hit 3500rpm", &[]);
        assert_eq!(c.slots.quantity.map(|q| q.unit), Some(Unit::Rpm));
    }

    #[test]
    fn test_metric_is_earliest_mention() {
        let c = classifier().classify("compare speed and fuel", &[]);
        assert_eq!(c.slots.metric, Some(Metric::Speed));
    }

    #[test]
    fn test_tone_detection() {
        assert_eq!(
            classifier()
                .classify("my fuel use is terrible, big problem", &[])
                .slots
                .tone,
            Tone::Negative
        );
        assert_eq!(
            classifier().classify("great, thanks", &[]).slots.tone,
            Tone::Positive
        );
        assert_eq!(
            classifier().classify("show my trips", &[]).slots.tone,
            Tone::Neutral
        );
    }

    #[test]
    fn test_every_rule_compiles() {
        assert_eq!(RULES.len(), RULE_DEFS.len());
        assert!(!METRIC_PATTERNS.is_empty());
    }
}
