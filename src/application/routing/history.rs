//! Recent user turns per session, fed to transfer detection.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::domain::foundation::SessionId;

pub const DEFAULT_TURNS_PER_SESSION: usize = 10;
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

#[derive(Debug, Default)]
struct HistoryState {
    turns: HashMap<SessionId, VecDeque<String>>,
    /// Least recently touched first.
    order: VecDeque<SessionId>,
}

/// Bounded conversation memory.
///
/// Keeps the last `turns_per_session` turns for at most `max_sessions`
/// sessions; the least recently active session is dropped first.
#[derive(Debug)]
pub struct SessionHistory {
    turns_per_session: usize,
    max_sessions: usize,
    state: Mutex<HistoryState>,
}

impl SessionHistory {
    pub fn new(turns_per_session: usize, max_sessions: usize) -> Self {
        Self {
            turns_per_session: turns_per_session.max(1),
            max_sessions: max_sessions.max(1),
            state: Mutex::new(HistoryState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HistoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends `turn` and returns the turns recorded before it, oldest first.
    pub fn record(&self, session_id: &SessionId, turn: &str) -> Vec<String> {
        let mut state = self.lock();

        if let Some(pos) = state.order.iter().position(|s| s == session_id) {
            state.order.remove(pos);
        } else if state.order.len() == self.max_sessions {
            if let Some(evicted) = state.order.pop_front() {
                state.turns.remove(&evicted);
            }
        }
        state.order.push_back(session_id.clone());

        let turns = state.turns.entry(session_id.clone()).or_default();
        let previous: Vec<String> = turns.iter().cloned().collect();
        if turns.len() == self.turns_per_session {
            turns.pop_front();
        }
        turns.push_back(turn.to_string());
        previous
    }

    pub fn session_count(&self) -> usize {
        self.lock().turns.len()
    }
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_TURNS_PER_SESSION, DEFAULT_MAX_SESSIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sid(s: &str) -> SessionId {
        SessionId::new(s).unwrap()
    }

    #[test]
    fn returns_prior_turns_only() {
        let h = SessionHistory::default();
        assert!(h.record(&sid("a"), "one").is_empty());
        assert_eq!(h.record(&sid("a"), "two"), ["one"]);
        assert_eq!(h.record(&sid("b"), "x"), Vec::<String>::new());
        assert_eq!(h.record(&sid("a"), "three"), ["one", "two"]);
    }

    #[test]
    fn keeps_last_turns_per_session() {
        let h = SessionHistory::new(2, 8);
        for t in ["1", "2", "3"] {
            h.record(&sid("a"), t);
        }
        assert_eq!(h.record(&sid("a"), "4"), ["2", "3"]);
    }

    #[test]
    fn evicts_least_recently_active_session() {
        let h = SessionHistory::new(4, 2);
        h.record(&sid("a"), "a1");
        h.record(&sid("b"), "b1");
        h.record(&sid("a"), "a2");
        h.record(&sid("c"), "c1");

        assert_eq!(h.session_count(), 2);
        assert!(h.record(&sid("b"), "b2").is_empty());
        assert_eq!(h.record(&sid("c"), "c2"), ["c1"]);
    }

    proptest! {
        #[test]
        fn bounds_always_hold(ops in proptest::collection::vec((0u8..20, "[a-z]{1,3}"), 0..200)) {
            let h = SessionHistory::new(3, 5);
            for (session, turn) in ops {
                let prior = h.record(&sid(&format!("s{}", session)), &turn);
                prop_assert!(prior.len() <= 3);
                prop_assert!(h.session_count() <= 5);
            }
        }
    }
}
