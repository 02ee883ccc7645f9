//! Response composition.
//!
//! Picks the template family for a resolved intent, keeps the blocks whose
//! thresholds apply, substitutes profile values and adds slot-driven
//! touches (empathetic opener, acknowledgement of a mentioned value).

use crate::profile::TelemetryProfile;
use crate::templates::{self, CLARIFICATION_REQUEST, DATA_UNAVAILABLE};
use crate::types::{Intent, Quantity, Slots, Tone, Unit};

const CONCERN_OPENER: &str = "I understand your concern. ";
const DETAIL_OPENER: &str = "Here's a closer look.\n";

// =============================================================================
// ResponseComposer
// =============================================================================

/// Builds reply text from templates.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseComposer;

impl ResponseComposer {
    /// Compose a data-grounded reply.
    ///
    /// Never fails for a well-formed profile. `Unknown` yields the fixed
    /// rephrase fallback.
    pub fn compose(&self, intent: Intent, slots: &Slots, profile: &TelemetryProfile) -> String {
        if intent == Intent::Unknown {
            return self.unknown_fallback();
        }
        let body = templates::select(templates::family(intent), profile)
            .map(|block| templates::render(block.text, profile))
            .collect::<Vec<_>>()
            .join("\n");
        let body = match slots.quantity {
            Some(q) => format!("{}\n{}", body, acknowledge(q, Some(profile))),
            None => body,
        };
        with_tone(body, slots.tone)
    }

    /// Compose a reply for an intent that needs no trip data.
    ///
    /// Data-bound intents get the data-unavailable reply instead.
    pub fn compose_general(&self, intent: Intent, slots: &Slots) -> String {
        if intent == Intent::Unknown {
            return self.unknown_fallback();
        }
        if intent.requires_profile() {
            return self.data_unavailable();
        }
        let body = templates::family(intent)
            .iter()
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");
        let body = match slots.quantity {
            Some(q) => format!("{}\n{}", body, acknowledge(q, None)),
            None => body,
        };
        with_tone(body, slots.tone)
    }

    /// Prefix a reply to a clarification request.
    pub fn elaborate(&self, body: String) -> String {
        format!("{}{}", DETAIL_OPENER, body)
    }

    /// Fixed reply for messages that could not be understood.
    pub fn unknown_fallback(&self) -> String {
        templates::family(Intent::Unknown)
            .iter()
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Reply for a follow-up with nothing to refer back to.
    pub fn clarification_fallback(&self) -> String {
        CLARIFICATION_REQUEST.to_string()
    }

    /// Reply when the driver's telemetry cannot be read.
    pub fn data_unavailable(&self) -> String {
        DATA_UNAVAILABLE.to_string()
    }
}

fn with_tone(body: String, tone: Tone) -> String {
    match tone {
        Tone::Negative => format!("{}{}", CONCERN_OPENER, body),
        Tone::Neutral | Tone::Positive => body,
    }
}

/// One line acknowledging a value the driver typed, compared with their
/// own figure where one exists.
fn acknowledge(q: Quantity, profile: Option<&TelemetryProfile>) -> String {
    let own = profile.and_then(|p| match q.unit {
        Unit::KilometresPerHour => Some(format!("your average speed is {:.1} km/h", p.avg_speed)),
        Unit::Rpm => Some(format!("your average RPM is {:.0}", p.avg_rpm)),
        Unit::Litres => Some(format!("you've used {:.1} L in total", p.fuel_consumed)),
        Unit::Kilometres => Some(format!("you've driven {:.1} km in total", p.distance)),
        Unit::MilesPerHour => None,
    });
    match own {
        Some(own) => format!("You mentioned **{}**; {}.", q, own),
        None => format!("You mentioned **{}**.", q),
    }
}

// =============================================================================
// Tests
// =============================================================================
