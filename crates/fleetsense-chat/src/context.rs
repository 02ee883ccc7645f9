//! Conversation context management.
//!
//! Keeps per-session turn history behind a per-key lock, sweeps idle
//! sessions, and resolves follow-up messages against prior turns.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

use crate::types::{Intent, Session, Slots, Turn};

/// Lock a mutex, recovering the inner value if a previous holder panicked.
pub(crate) fn lock_recover<'a, T>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        tracing::warn!(lock = what, "Recovering poisoned lock");
        poisoned.into_inner()
    })
}

// =============================================================================
// ConversationStore
// =============================================================================

/// Shared store of conversation sessions.
///
/// The outer map lock is held only to look up or insert a session slot.
/// Each session has its own lock, so work on different ids runs in
/// parallel while work on one id is serialized.
pub struct ConversationStore {
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
    max_turns: usize,
    session_timeout: Duration,
}

impl ConversationStore {
    pub fn new(max_turns: usize, session_timeout_minutes: u32) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_turns: max_turns.max(1),
            session_timeout: Duration::minutes(i64::from(session_timeout_minutes)),
        }
    }

    /// Retention window per session.
    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// The lockable slot for `session_id`, created empty on first access.
    ///
    /// Holding the returned `Arc` marks the session as in use; the sweeper
    /// never evicts it meanwhile.
    pub fn slot(&self, session_id: &str) -> Arc<Mutex<Session>> {
        let mut sessions = lock_recover(&self.sessions, "sessions");
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::info!(session_id = %session_id, "Session created");
                Arc::new(Mutex::new(Session::new(session_id)))
            })
            .clone()
    }

    /// Snapshot of a session, creating it if needed.
    pub fn get(&self, session_id: &str) -> Session {
        let slot = self.slot(session_id);
        let session = lock_recover(&slot, "session");
        session.clone()
    }

    /// Append a turn to a session, evicting the oldest beyond the window.
    pub fn append(&self, session_id: &str, turn: Turn) {
        let slot = self.slot(session_id);
        let mut session = lock_recover(&slot, "session");
        session.push(turn, self.max_turns);
    }

    /// Drop every turn of a session. Clearing an unknown or already empty
    /// session is a no-op.
    pub fn clear(&self, session_id: &str) {
        let slot = {
            let sessions = lock_recover(&self.sessions, "sessions");
            sessions.get(session_id).cloned()
        };
        if let Some(slot) = slot {
            lock_recover(&slot, "session").clear();
            tracing::info!(session_id = %session_id, "Session cleared");
        }
    }

    /// Whether a session exists.
    pub fn contains(&self, session_id: &str) -> bool {
        lock_recover(&self.sessions, "sessions").contains_key(session_id)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        lock_recover(&self.sessions, "sessions").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions idle for longer than the timeout as of `now`.
    ///
    /// A session that is referenced elsewhere or currently locked has a
    /// request in flight and is kept. Returns the number removed.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = lock_recover(&self.sessions, "sessions");
        let before = sessions.len();
        let timeout = self.session_timeout;
        sessions.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(session) => now - session.last_activity <= timeout,
                Err(TryLockError::Poisoned(poisoned)) => {
                    now - poisoned.into_inner().last_activity <= timeout
                }
                Err(TryLockError::WouldBlock) => true,
            }
        });
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, remaining = sessions.len(), "Evicted idle sessions");
        }
        removed
    }
}

/// Periodically evict idle sessions until the task is dropped.
pub async fn run_sweeper(store: Arc<ConversationStore>, every: StdDuration) {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        store.evict_idle(Utc::now());
    }
}

// =============================================================================
// ReferenceResolver
// =============================================================================

/// Outcome of resolving a message's intent against history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Concrete intent to answer; never `FollowUp` or `Clarification`.
    pub intent: Intent,
    /// Intent of the earlier turn the message pointed back to.
    pub anchor: Option<Intent>,
}

/// Resolves follow-up and clarification messages to a concrete intent.
pub struct ReferenceResolver;

impl ReferenceResolver {
    /// Resolve `intent` using only the turns of `session`.
    ///
    /// Concrete intents pass through. A follow-up or clarification needs an
    /// anchoring turn; without one it resolves to `Unknown`. With an anchor, a
    /// named metric ("what about speed instead?") takes that metric's intent,
    /// otherwise the anchor's intent is reused.
    pub fn resolve(&self, intent: Intent, slots: &Slots, session: &Session) -> Resolution {
        if !intent.is_referential() {
            return Resolution {
                intent,
                anchor: None,
            };
        }

        let anchor = Self::anchor(session.turns().rev());
        let resolved = match (slots.metric, anchor) {
            (Some(metric), Some(_)) => metric.intent(),
            (None, Some(anchor)) => anchor,
            (_, None) => Intent::Unknown,
        };
        tracing::debug!(
            session_id = %session.id,
            from = %intent,
            to = %resolved,
            anchor = ?anchor,
            slot_override = slots.metric.is_some(),
            "Resolved reference"
        );
        Resolution {
            intent: resolved,
            anchor,
        }
    }

    fn anchor<'a>(mut newest_first: impl Iterator<Item = &'a Turn>) -> Option<Intent> {
        newest_first
            .find(|turn| turn.intent.can_anchor())
            .map(|turn| turn.intent)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metric;

    fn turn(message: &str, intent: Intent) -> Turn {
        Turn {
            message: message.to_string(),
            intent,
            slots: Slots::default(),
            response: format!("reply to {}", message),
            suggestions: vec![],
            timestamp: Utc::now(),
        }
    }

    fn session_with(intents: &[Intent]) -> Session {
        let mut session = Session::new("s");
        for (i, intent) in intents.iter().enumerate() {
            session.push(turn(&format!("m{}", i), *intent), 20);
        }
        session
    }

    // ---- Store ----

    #[test]
    fn test_get_creates_empty_session() {
        let store = ConversationStore::new(20, 30);
        assert!(!store.contains("abc"));
        let session = store.get("abc");
        assert_eq!(session.id, "abc");
        assert!(session.is_empty());
        assert!(store.contains("abc"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_append_respects_retention_window() {
        let store = ConversationStore::new(3, 30);
        for i in 0..5 {
            store.append("s", turn(&format!("m{}", i), Intent::Greeting));
        }
        let session = store.get("s");
        let messages: Vec<_> = session.turns().map(|t| t.message.clone()).collect();
        assert_eq!(messages, vec!["m2", "m3", "m4"]);
        let stamps: Vec<_> = session.turns().map(|t| t.timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = ConversationStore::new(20, 30);
        store.append("a", turn("hello", Intent::Greeting));
        assert_eq!(store.get("a").len(), 1);
        assert!(store.get("b").is_empty());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = ConversationStore::new(20, 30);
        store.append("s", turn("hello", Intent::Greeting));
        store.clear("s");
        assert!(store.get("s").is_empty());
        store.clear("s");
        assert!(store.get("s").is_empty());
        // Unknown ids are a no-op.
        store.clear("never-seen");
        assert!(!store.contains("never-seen"));
    }

    #[test]
    fn test_evict_idle_removes_only_stale_sessions() {
        let store = ConversationStore::new(20, 30);
        store.append("old", turn("hello", Intent::Greeting));
        store.append("fresh", turn("hello", Intent::Greeting));

        {
            let slot = store.slot("old");
            lock_recover(&slot, "session").last_activity = Utc::now() - Duration::minutes(45);
        }

        let removed = store.evict_idle(Utc::now());
        assert_eq!(removed, 1);
        assert!(!store.contains("old"));
        assert!(store.contains("fresh"));
    }

    #[test]
    fn test_evict_idle_keeps_in_flight_sessions() {
        let store = ConversationStore::new(20, 30);
        let slot = store.slot("busy");
        lock_recover(&slot, "session").last_activity = Utc::now() - Duration::hours(2);

        // Slot still held: treated as an in-flight request.
        assert_eq!(store.evict_idle(Utc::now()), 0);
        assert!(store.contains("busy"));

        drop(slot);
        assert_eq!(store.evict_idle(Utc::now()), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_evicts_in_background() {
        let store = Arc::new(ConversationStore::new(20, 0));
        {
            let slot = store.slot("s");
            lock_recover(&slot, "session").last_activity = Utc::now() - Duration::minutes(1);
        }
        let handle = tokio::spawn(run_sweeper(store.clone(), StdDuration::from_millis(10)));
        tokio::time::sleep(StdDuration::from_millis(200)).await;
        assert!(store.is_empty());
        handle.abort();
    }

    // ---- Resolver ----

    #[test]
    fn test_concrete_intent_passes_through() {
        let session = session_with(&[Intent::SpeedQuery]);
        let res = ReferenceResolver.resolve(Intent::Greeting, &Slots::default(), &session);
        assert_eq!(res.intent, Intent::Greeting);
        assert_eq!(res.anchor, None);
    }

    #[test]
    fn test_follow_up_resolves_to_anchor() {
        let session = session_with(&[Intent::FuelEfficiencyQuery]);
        let res = ReferenceResolver.resolve(Intent::FollowUp, &Slots::default(), &session);
        assert_eq!(res.intent, Intent::FuelEfficiencyQuery);
        assert_eq!(res.anchor, Some(Intent::FuelEfficiencyQuery));
    }

    #[test]
    fn test_anchor_skips_referential_and_unknown_turns() {
        let session = session_with(&[
            Intent::SafetyAdviceQuery,
            Intent::Unknown,
            Intent::Unknown,
        ]);
        let res = ReferenceResolver.resolve(Intent::Clarification, &Slots::default(), &session);
        assert_eq!(res.intent, Intent::SafetyAdviceQuery);
    }

    #[test]
    fn test_anchor_is_most_recent() {
        let session = session_with(&[Intent::SpeedQuery, Intent::RpmQuery]);
        let res = ReferenceResolver.resolve(Intent::FollowUp, &Slots::default(), &session);
        assert_eq!(res.intent, Intent::RpmQuery);
    }

    #[test]
    fn test_follow_up_without_anchor_is_unknown() {
        let session = Session::new("empty");
        let res = ReferenceResolver.resolve(Intent::FollowUp, &Slots::default(), &session);
        assert_eq!(res.intent, Intent::Unknown);
        assert_eq!(res.anchor, None);

        let session = session_with(&[Intent::Unknown]);
        let res = ReferenceResolver.resolve(Intent::FollowUp, &Slots::default(), &session);
        assert_eq!(res.intent, Intent::Unknown);
    }

    #[test]
    fn test_metric_slot_overrides_anchor() {
        let session = session_with(&[Intent::FuelEfficiencyQuery]);
        let slots = Slots {
            metric: Some(Metric::Speed),
            ..Slots::default()
        };
        let res = ReferenceResolver.resolve(Intent::FollowUp, &slots, &session);
        assert_eq!(res.intent, Intent::SpeedQuery);
        assert_eq!(res.anchor, Some(Intent::FuelEfficiencyQuery));
    }

    #[test]
    fn test_metric_slot_needs_an_anchor() {
        let slots = Slots {
            metric: Some(Metric::Rpm),
            ..Slots::default()
        };
        let res = ReferenceResolver.resolve(Intent::FollowUp, &slots, &Session::new("s"));
        assert_eq!(res.intent, Intent::Unknown);
        assert_eq!(res.anchor, None);
    }
}
