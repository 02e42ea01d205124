use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::domain::ViewError;
use crate::store::RowStore;

/// Grouping column plus the set of expanded group keys.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupSpec {
    pub column_key: Option<String>,
    pub expanded: HashSet<String>,
}

impl GroupSpec {
    pub fn by(key: impl Into<String>) -> Self {
        GroupSpec {
            column_key: Some(key.into()),
            expanded: HashSet::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.column_key.is_some()
    }

    pub fn is_expanded(&self, group_key: &str) -> bool {
        self.expanded.contains(group_key)
    }

    /// Flips a single group and returns its new state.
    pub fn toggle(&mut self, group_key: &str) -> bool {
        if self.expanded.remove(group_key) {
            false
        } else {
            self.expanded.insert(group_key.to_string());
            true
        }
    }

    /// Switching to another column forgets the expanded groups of the old one.
    pub fn set_column(&mut self, key: Option<String>) {
        if self.column_key != key {
            self.column_key = key;
            self.expanded.clear();
        }
    }

    pub fn expand_all<I: IntoIterator<Item = String>>(&mut self, group_keys: I) {
        self.expanded.extend(group_keys);
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub key: String,
    pub rows: Vec<usize>,
    pub expanded: bool,
}

impl Group {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Partitions rows by the display value of the grouping column. Groups appear
/// in the order their key is first seen and members keep their incoming order.
pub fn group(store: &RowStore, rows: &[usize], spec: &GroupSpec) -> Result<Vec<Group>, ViewError> {
    let Some(column_key) = spec.column_key.as_deref() else {
        return Ok(vec![Group {
            key: String::new(),
            rows: rows.to_vec(),
            expanded: true,
        }]);
    };
    let column_idx = store.column_idx(column_key)?;

    let mut groups: Vec<Group> = Vec::new();
    let mut lookup: HashMap<String, usize> = HashMap::new();
    for &pos in rows {
        let key = store.row(pos).value(column_idx).to_string();
        match lookup.get(&key) {
            Some(&idx) => groups[idx].rows.push(pos),
            None => {
                lookup.insert(key.clone(), groups.len());
                groups.push(Group {
                    expanded: spec.is_expanded(&key),
                    key,
                    rows: vec![pos],
                });
            }
        }
    }

    trace!("Grouped {} rows by {column_key} into {} groups", rows.len(), groups.len());
    Ok(groups)
}
