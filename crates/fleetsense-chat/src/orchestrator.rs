//! Chat engine: central coordinator wiring classifier, context and response.
//!
//! One message is handled as a single synchronous unit of work while the
//! session's lock is held, so replies on one conversation are appended in
//! the order their requests acquired the session.

use std::sync::Arc;

use chrono::Utc;
use fleetsense_core::config::ChatConfig;
use uuid::Uuid;

use crate::classifier::IntentClassifier;
use crate::context::{lock_recover, ConversationStore, ReferenceResolver};
use crate::error::ChatError;
use crate::profile::{adapt, BehaviorLabel, RawSummary};
use crate::response::ResponseComposer;
use crate::suggestions::SuggestionGenerator;
use crate::types::{ChatReply, Intent, Session, Turn};

/// Recent turns handed to the classifier.
const CLASSIFIER_HISTORY: usize = 5;

/// Coordinates classification, reference resolution, composition and
/// suggestions over a shared conversation store.
pub struct ChatEngine {
    classifier: IntentClassifier,
    resolver: ReferenceResolver,
    composer: ResponseComposer,
    suggester: SuggestionGenerator,
    store: Arc<ConversationStore>,
    config: ChatConfig,
}

impl ChatEngine {
    /// Create an engine with its own conversation store.
    pub fn new(config: ChatConfig) -> Self {
        let store = Arc::new(ConversationStore::new(
            config.max_turns,
            config.session_timeout_minutes,
        ));
        Self::with_store(config, store)
    }

    /// Create an engine over an existing store.
    pub fn with_store(config: ChatConfig, store: Arc<ConversationStore>) -> Self {
        Self {
            classifier: IntentClassifier::new(
                config.min_confidence_groups,
                config.short_message_words,
            ),
            resolver: ReferenceResolver,
            composer: ResponseComposer,
            suggester: SuggestionGenerator::new(config.max_suggestions),
            store,
            config,
        }
    }

    /// The conversation store, shared with the idle-session sweeper.
    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Handle one user message.
    ///
    /// A missing or blank `conversation_id` starts a new conversation; an
    /// unknown one is created. Every failure inside the pipeline degrades to
    /// a well-formed reply, so the only error is [`ChatError::Disabled`].
    pub fn handle_message(
        &self,
        conversation_id: Option<&str>,
        message: &str,
        summary: Option<&RawSummary>,
    ) -> Result<ChatReply, ChatError> {
        if !self.config.enabled {
            return Err(ChatError::Disabled);
        }

        let conversation_id = match conversation_id.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        let text = self.truncate(message);

        let slot = self.store.slot(&conversation_id);
        let mut session = lock_recover(&slot, "session");

        let classification = self
            .classifier
            .classify(&text, &session.recent(CLASSIFIER_HISTORY));
        let resolution = self
            .resolver
            .resolve(classification.intent, &classification.slots, &session);

        let mut slots = classification.slots;
        if classification.intent.is_referential() {
            slots.reference = resolution.anchor;
        }

        let mut intent = resolution.intent;
        let mut label: Option<BehaviorLabel> = None;
        let response = if intent == Intent::Unknown {
            if classification.intent.is_referential() {
                self.composer.clarification_fallback()
            } else {
                self.composer.unknown_fallback()
            }
        } else if intent.requires_profile() {
            match self.profile_for(summary) {
                Ok(profile) => {
                    label = Some(profile.behavior);
                    self.composer.compose(intent, &slots, &profile)
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %conversation_id,
                        intent = %intent,
                        error = %e,
                        "Trip data unavailable"
                    );
                    intent = Intent::Unknown;
                    self.composer.data_unavailable()
                }
            }
        } else {
            self.composer.compose_general(intent, &slots)
        };

        let response = if classification.intent == Intent::Clarification && intent != Intent::Unknown
        {
            self.composer.elaborate(response)
        } else {
            response
        };

        let suggestions = self.suggester.suggest(intent, label, &text);

        tracing::info!(
            session_id = %conversation_id,
            classified = %classification.intent,
            intent = %intent,
            turns = session.len() + 1,
            "Handled chat message"
        );

        session.push(
            Turn {
                message: text,
                intent,
                slots,
                response: response.clone(),
                suggestions: suggestions.clone(),
                timestamp: Utc::now(),
            },
            self.store.max_turns(),
        );

        Ok(ChatReply {
            conversation_id,
            response,
            suggestions,
            intent,
        })
    }

    /// Clear a conversation's history. Idempotent.
    pub fn clear(&self, conversation_id: &str) {
        self.store.clear(conversation_id);
    }

    /// Suggestions from the conversation's latest turn, or the default set
    /// when there is none yet.
    pub fn suggestions(&self, conversation_id: Option<&str>) -> Vec<String> {
        conversation_id
            .and_then(|id| self.session(id))
            .and_then(|session| session.last_turn().map(|t| t.suggestions.clone()))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.suggester.defaults())
    }

    /// Snapshot of a conversation, if it exists.
    pub fn session(&self, conversation_id: &str) -> Option<Session> {
        if self.store.contains(conversation_id) {
            Some(self.store.get(conversation_id))
        } else {
            None
        }
    }

    fn profile_for(
        &self,
        summary: Option<&RawSummary>,
    ) -> Result<crate::profile::TelemetryProfile, ChatError> {
        match summary {
            Some(raw) => adapt(raw),
            None => Err(ChatError::validation("summary", "no trip data supplied")),
        }
    }

    fn truncate(&self, message: &str) -> String {
        let max = self.config.max_message_chars;
        if message.chars().count() > max {
            tracing::warn!(max_chars = max, "Message truncated");
            message.chars().take(max).collect()
        } else {
            message.to_string()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
