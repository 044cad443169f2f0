//! In-memory conversation transcript.
//!
//! Append-only ordered list of role-tagged entries, with one exception:
//! `rewrite_last_human`, which swaps the mention-expanded prompt back to
//! the compact display text after a generation completes.

use culina_types::chat::{MessageRole, TranscriptEntry};

/// Ordered, role-tagged conversation transcript.
#[derive(Debug, Default)]
pub struct ConversationMemory {
    entries: Vec<TranscriptEntry>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to the end of the transcript.
    pub fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replace the whole transcript (used when loading a persisted session).
    pub fn replace_all(&mut self, entries: Vec<TranscriptEntry>) {
        self.entries = entries;
    }

    /// Replace the content of the most recent human entry in place.
    ///
    /// Scans backward from the end; no-op when no human entry exists.
    /// Returns whether a rewrite happened.
    pub fn rewrite_last_human(&mut self, new_content: &str) -> bool {
        for entry in self.entries.iter_mut().rev() {
            if entry.role == MessageRole::Human {
                entry.content = new_content.to_string();
                return true;
            }
        }
        false
    }

    /// All entries in order.
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Owned copy of the transcript, for building a runtime request or a
    /// summary without borrowing the memory across a task boundary.
    pub fn snapshot(&self) -> Vec<TranscriptEntry> {
        self.entries.clone()
    }

    /// Whether the transcript holds a system entry.
    pub fn has_system_prompt(&self) -> bool {
        self.entries.iter().any(|e| e.role == MessageRole::System)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
