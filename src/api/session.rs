//! Last search result per session, bounded in the number of sessions

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use tracing::debug;

use crate::models::Report;

/// Sessions kept when nothing else is configured
pub const DEFAULT_MAX_SESSIONS: usize = 64;

struct CachedSearch {
    reports: Vec<Report>,
    /// Insertion sequence; the smallest is evicted first
    seq: u64,
}

/// Remembers each session's last search so an analyze request can reuse it
///
/// Holds at most `max_sessions` entries. Storing a search for a new session
/// beyond that evicts the session whose search was stored longest ago.
pub struct SearchCache {
    entries: DashMap<String, CachedSearch>,
    next_seq: AtomicU64,
    max_sessions: usize,
}

impl SearchCache {
    #[must_use]
    pub fn new(max_sessions: usize) -> Self {
        Self {
            entries: DashMap::new(),
            next_seq: AtomicU64::new(0),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Store a search result, replacing the session's previous one
    pub fn insert(&self, session: String, reports: Vec<Report>) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(session, CachedSearch { reports, seq });

        while self.entries.len() > self.max_sessions {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().seq)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                    debug!("Evicted cached search of session {}", key);
                }
                None => break,
            }
        }
    }

    #[must_use]
    pub fn get(&self, session: &str) -> Option<Vec<Report>> {
        self.entries
            .get(session)
            .map(|entry| entry.value().reports.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn max_sessions(&self) -> usize {
        self.max_sessions
    }
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS)
    }
}
