//! Edit history: one immutable entry per successful apply, plus a cursor
//! for undo and redo.
//!
//! The history is append-only. Each entry remembers the entry it was applied
//! on top of, so an edit made after an undo starts a new branch and the
//! undone entries stay addressable.

use serde::{Deserialize, Serialize};

use crate::assets::AssetRef;
use crate::buffer::Region;
use crate::params::ParameterSet;

/// Record of one edit. A root entry (a loaded file) has no effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditHistoryEntry {
    /// Human-readable label, e.g. "Compressor".
    pub label: String,
    pub effect_id: Option<String>,
    pub parameters: ParameterSet,
    pub region: Option<Region>,
    /// Seed the render ran with, so the entry can be reproduced.
    pub seed: Option<u64>,
    /// Encoded audio produced by this edit.
    pub result_ref: AssetRef,
    /// Index of the entry this edit was applied to. Set by [`EditHistory`].
    #[serde(default)]
    pub parent: Option<usize>,
}

impl EditHistoryEntry {
    /// Entry for freshly loaded audio.
    pub fn root(label: impl Into<String>, result_ref: AssetRef) -> Self {
        EditHistoryEntry {
            label: label.into(),
            effect_id: None,
            parameters: ParameterSet::new(),
            region: None,
            seed: None,
            result_ref,
            parent: None,
        }
    }
}

/// Branching history with a cursor.
///
/// Undo moves to the current entry's parent and redo to its newest child.
/// Entries are never modified or removed once pushed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditHistory {
    entries: Vec<EditHistoryEntry>,
    cursor: Option<usize>,
}

impl EditHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an edit on top of the current entry and move the cursor to it.
    pub fn push(&mut self, entry: EditHistoryEntry) -> &EditHistoryEntry {
        let parent = self.cursor;
        self.append(entry, parent)
    }

    /// Append an entry with no parent, e.g. a newly loaded file.
    pub fn push_root(&mut self, entry: EditHistoryEntry) -> &EditHistoryEntry {
        self.append(entry, None)
    }

    fn append(&mut self, mut entry: EditHistoryEntry, parent: Option<usize>) -> &EditHistoryEntry {
        entry.parent = parent;
        self.entries.push(entry);
        let index = self.entries.len() - 1;
        self.cursor = Some(index);
        &self.entries[index]
    }

    /// Step back to the parent entry. A root cannot be undone.
    pub fn undo(&mut self) -> Option<&EditHistoryEntry> {
        let parent = self.current()?.parent?;
        self.cursor = Some(parent);
        self.entries.get(parent)
    }

    /// Step forward to the newest edit made on top of the current entry.
    pub fn redo(&mut self) -> Option<&EditHistoryEntry> {
        let child = self.newest_child()?;
        self.cursor = Some(child);
        self.entries.get(child)
    }

    /// Move the cursor to any retained entry.
    pub fn select(&mut self, index: usize) -> Option<&EditHistoryEntry> {
        let entry = self.entries.get(index)?;
        self.cursor = Some(index);
        Some(entry)
    }

    fn newest_child(&self) -> Option<usize> {
        let cursor = self.cursor?;
        self.entries.iter().rposition(|e| e.parent == Some(cursor))
    }

    pub fn current(&self) -> Option<&EditHistoryEntry> {
        self.cursor.and_then(|c| self.entries.get(c))
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn can_undo(&self) -> bool {
        self.current().is_some_and(|e| e.parent.is_some())
    }

    pub fn can_redo(&self) -> bool {
        self.newest_child().is_some()
    }

    pub fn entries(&self) -> &[EditHistoryEntry] {
        &self.entries
    }
}
