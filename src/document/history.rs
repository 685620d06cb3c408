//! Bounded undo/redo history
//!
//! A linear log of document snapshots with a cursor at the "current" entry.
//! Pushing while the cursor is behind the end prunes the redo branch;
//! pushing at capacity evicts the oldest entry. Entries are coarse: one push
//! per completed structural mutation, not per keystroke.

use super::Document;

const MAX_HISTORY_SIZE: usize = 50;

/// Fixed-capacity snapshot log with undo/redo cursor.
///
/// Invariant: `cursor < entries.len()` whenever entries is non-empty.
#[derive(Debug)]
pub struct HistoryStack {
    entries: Vec<Document>,
    cursor: usize,
    capacity: usize,
}

impl HistoryStack {
    /// Create a history seeded with the opening document state.
    pub fn new(initial: Document) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            capacity: MAX_HISTORY_SIZE,
        }
    }

    #[cfg(test)]
    fn with_capacity(initial: Document, capacity: usize) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            capacity,
        }
    }

    /// Record a snapshot after a completed mutation.
    ///
    /// Any redo entries beyond the cursor are discarded first. If the log
    /// would exceed capacity, the oldest entry is evicted and the cursor
    /// shifts back to keep pointing at the same snapshot.
    pub fn push(&mut self, snapshot: Document) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(snapshot);

        if self.entries.len() > self.capacity {
            self.entries.remove(0);
            self.cursor = self.entries.len() - 1;
        } else {
            self.cursor += 1;
        }
    }

    /// Step back one entry. Returns `None` at the earliest retained entry.
    pub fn undo(&mut self) -> Option<Document> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.entries[self.cursor].clone())
    }

    /// Step forward one entry. Returns `None` at the latest entry.
    pub fn redo(&mut self) -> Option<Document> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.entries[self.cursor].clone())
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
