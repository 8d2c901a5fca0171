//! Bounded linear undo/redo history.
//!
//! Entries are deep copies of the global adjustments and the mask list.
//! Committing after an undo discards the redo branch; history is never a
//! tree. When the entry count exceeds the limit the oldest entry is dropped
//! and the cursor shifts down with it.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::mask::Mask;
use crate::Adjustments;

/// Default maximum number of entries.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Snapshot of the editable state at one commit boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub adjustments: Adjustments,
    pub masks: Vec<Mask>,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl HistoryEntry {
    /// Deep-copy the live state into a new entry.
    pub fn capture(adjustments: &Adjustments, masks: &[Mask], timestamp: u64) -> Self {
        Self {
            adjustments: adjustments.clone(),
            masks: masks.to_vec(),
            timestamp,
        }
    }
}

/// Wall-clock milliseconds since the Unix epoch.
///
/// Returns 0 where the platform has no system clock (wasm32 without WASI);
/// hosts there supply their own clock to the session.
pub fn system_time_ms() -> u64 {
    if cfg!(all(target_arch = "wasm32", not(target_os = "wasi"))) {
        return 0;
    }
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryManager {
    entries: Vec<HistoryEntry>,
    /// Index of the entry matching the live state, `None` when empty
    cursor: Option<usize>,
    limit: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryManager {
    /// Create an empty history. A zero limit is raised to 1.
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// The entry the cursor points at.
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.cursor.and_then(|i| self.entries.get(i))
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(i) if i > 0)
    }

    pub fn can_redo(&self) -> bool {
        match self.cursor {
            Some(i) => i + 1 < self.entries.len(),
            None => false,
        }
    }

    /// Record a new entry after the cursor, discarding any redo branch.
    pub fn commit(&mut self, entry: HistoryEntry) {
        let keep = self.cursor.map_or(0, |i| i + 1);
        if keep < self.entries.len() {
            log::debug!("Discarding {} redo entries", self.entries.len() - keep);
            self.entries.truncate(keep);
        }

        self.entries.push(entry);
        if self.entries.len() > self.limit {
            let overflow = self.entries.len() - self.limit;
            self.entries.drain(..overflow);
        }
        self.cursor = Some(self.entries.len() - 1);
        log::debug!("History commit, {} entries", self.entries.len());
    }

    /// Step back one entry.
    ///
    /// # Returns
    ///
    /// A copy of the entry to restore, or `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<HistoryEntry> {
        let cursor = self.cursor.filter(|&i| i > 0)?;
        self.cursor = Some(cursor - 1);
        log::debug!("Undo to entry {}", cursor - 1);
        self.entries.get(cursor - 1).cloned()
    }

    /// Step forward one entry.
    ///
    /// # Returns
    ///
    /// A copy of the entry to restore, or `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<HistoryEntry> {
        if !self.can_redo() {
            return None;
        }
        let next = self.cursor.map_or(0, |i| i + 1);
        self.cursor = Some(next);
        log::debug!("Redo to entry {}", next);
        self.entries.get(next).cloned()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
