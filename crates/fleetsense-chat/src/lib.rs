//! Conversational intent and context engine for Fleetsense.
//!
//! Classifies driver messages, resolves follow-ups against the conversation
//! history, and answers from the driver's telemetry profile using template
//! families and suggested next questions.

pub mod classifier;
pub mod context;
pub mod error;
pub mod markup;
pub mod orchestrator;
pub mod profile;
pub mod response;
pub mod suggestions;
pub mod templates;
pub mod types;

pub use classifier::{Classification, IntentClassifier};
pub use context::{run_sweeper, ConversationStore, ReferenceResolver, Resolution};
pub use error::ChatError;
pub use orchestrator::ChatEngine;
pub use profile::{adapt, BehaviorLabel, RawSummary, TelemetryProfile, TripRecord, Trend};
pub use response::ResponseComposer;
pub use suggestions::SuggestionGenerator;
pub use types::{
    ChatReply, Intent, Metric, Quantity, Session, SlotKind, SlotSchema, Slots, Tone, Turn, Unit,
};
