//! Row selection by identity.
//!
//! The selection survives sorting, filtering and paging because it stores row
//! ids, never positions.

use std::collections::BTreeSet;
use std::fmt;

use crate::store::RowId;

/// Action requested on every selected row. Applying it is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkAction {
    Delete,
    Export,
    UpdateStatus,
    Custom(String),
}

impl fmt::Display for BulkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkAction::Delete => f.write_str("delete"),
            BulkAction::Export => f.write_str("export"),
            BulkAction::UpdateStatus => f.write_str("update status"),
            BulkAction::Custom(name) => f.write_str(name),
        }
    }
}

/// Set of selected row ids, kept in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: BTreeSet<RowId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership of `id`. Returns true if the row is now selected.
    pub fn toggle(&mut self, id: RowId) -> bool {
        if self.selected.remove(&id) {
            false
        } else {
            self.selected.insert(id);
            true
        }
    }

    pub fn is_selected(&self, id: RowId) -> bool {
        self.selected.contains(&id)
    }

    /// Replaces the selection with exactly `visible`.
    pub fn select_all<I: IntoIterator<Item = RowId>>(&mut self, visible: I) {
        self.selected = visible.into_iter().collect();
    }

    /// True when `visible` is non-empty and every id in it is selected.
    pub fn is_all_selected(&self, visible: &[RowId]) -> bool {
        !visible.is_empty() && visible.iter().all(|id| self.selected.contains(id))
    }

    /// Header checkbox: clears when everything visible is selected, selects
    /// all visible rows otherwise.
    pub fn toggle_all(&mut self, visible: &[RowId]) {
        if self.is_all_selected(visible) {
            self.clear();
        } else {
            self.select_all(visible.iter().copied());
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn remove(&mut self, id: RowId) -> bool {
        self.selected.remove(&id)
    }

    /// Drops every id for which `keep` returns false.
    pub fn retain<F: FnMut(RowId) -> bool>(&mut self, mut keep: F) {
        self.selected.retain(|&id| keep(id));
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn ids(&self) -> Vec<RowId> {
        self.selected.iter().copied().collect()
    }
}
