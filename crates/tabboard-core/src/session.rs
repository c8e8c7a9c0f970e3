//! Browsing-session detection.
//!
//! A session is delimited by the lifetime of the ephemeral store. The first
//! check in a session plants a marker; every later check finds it.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, warn};

use crate::storage::KeyValueStore;

/// Ephemeral key holding the session marker
pub const SESSION_KEY: &str = "dashboardSession";

/// Outcome of [`SessionTracker::check_and_mark_session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WasNew(pub bool);

impl WasNew {
    pub fn is_new(self) -> bool {
        self.0
    }
}

impl From<WasNew> for bool {
    fn from(was_new: WasNew) -> bool {
        was_new.0
    }
}

pub struct SessionTracker {
    ephemeral: Arc<dyn KeyValueStore>,
}

impl SessionTracker {
    pub fn new(ephemeral: Arc<dyn KeyValueStore>) -> Self {
        Self { ephemeral }
    }

    /// Report whether this is the first activation of the session, marking the
    /// session as seen if it was.
    ///
    /// This is a state transition, not a query: only the first call in a
    /// session writes. A failed read counts as "no marker"; a failed write
    /// still reports the call as new.
    pub fn check_and_mark_session(&self) -> WasNew {
        match self.ephemeral.get_item(SESSION_KEY) {
            Ok(Some(_)) => return WasNew(false),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to read session marker, assuming new session"),
        }

        let marker = Utc::now().timestamp_millis().to_string();
        match self.ephemeral.set_item(SESSION_KEY, &marker) {
            Ok(()) => debug!(marker = %marker, "Started new session"),
            Err(e) => warn!(error = %e, "Failed to persist session marker"),
        }
        WasNew(true)
    }

    /// Convenience form of [`check_and_mark_session`](Self::check_and_mark_session).
    pub fn is_new_session(&self) -> bool {
        self.check_and_mark_session().into()
    }

    /// When the current session was first seen, if a readable marker exists.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.ephemeral.get_item(SESSION_KEY).ok().flatten()?;
        let millis: i64 = raw.trim().parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }
}
