//! Retention caps for the message log and document history.
//!
//! The engine only reports overruns. `compact` is the single place that
//! removes entries, and it always removes the oldest first.

use serde::Serialize;

use crate::workflow::state::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_messages: usize,
    pub max_versions: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_messages: 200,
            max_versions: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompactionReport {
    pub messages_removed: usize,
    pub versions_removed: usize,
}

impl CompactionReport {
    pub fn is_empty(&self) -> bool {
        self.messages_removed == 0 && self.versions_removed == 0
    }
}

impl RetentionPolicy {
    pub fn exceeded(&self, state: &SessionState) -> bool {
        state.messages.len() > self.max_messages
            || state.document_versions.len() > self.max_versions
    }

    /// Drops the oldest entries beyond the caps. The working document and
    /// the newest version are never touched.
    pub fn compact(&self, state: &mut SessionState) -> CompactionReport {
        let messages_removed = state.messages.len().saturating_sub(self.max_messages);
        state.messages.drain(..messages_removed);

        let keep_versions = self.max_versions.max(1);
        let versions_removed = state.document_versions.len().saturating_sub(keep_versions);
        state.document_versions.drain(..versions_removed);

        CompactionReport {
            messages_removed,
            versions_removed,
        }
    }
}
