use std::cmp::Ordering;

use tracing::trace;

use crate::domain::ViewError;
use crate::store::{ColumnType, RowStore, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Active sort column and direction. No column means natural order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub column_key: Option<String>,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(key: impl Into<String>) -> Self {
        SortSpec {
            column_key: Some(key.into()),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(key: impl Into<String>) -> Self {
        SortSpec {
            column_key: Some(key.into()),
            direction: SortDirection::Descending,
        }
    }

    pub fn is_active(&self) -> bool {
        self.column_key.is_some()
    }

    /// Header click: the active column cycles asc -> desc -> asc, any other
    /// column starts ascending.
    pub fn toggle(&mut self, key: &str) {
        if self.column_key.as_deref() == Some(key) {
            self.direction = self.direction.reversed();
        } else {
            self.column_key = Some(key.to_string());
            self.direction = SortDirection::Ascending;
        }
    }

    pub fn clear(&mut self) {
        *self = SortSpec::default();
    }
}

#[derive(Debug)]
enum SortKey {
    Number(f64),
    Text(String),
}

impl SortKey {
    fn from_value(value: &Value, column_type: ColumnType) -> Option<Self> {
        match (column_type, value) {
            (_, Value::Null) => None,
            (ColumnType::Numeric, Value::Number(n)) => Some(SortKey::Number(*n)),
            (ColumnType::Numeric, Value::Text(s)) => s.trim().parse().ok().map(SortKey::Number),
            (ColumnType::Numeric, Value::Date(_)) => None,
            (_, v) => Some(SortKey::Text(v.to_string())),
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
            (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
        }
    }
}

/// Orders row positions by `spec`. The sort is stable so ties keep their
/// incoming relative order. Missing or unparseable values go last in both
/// directions.
pub fn sort(store: &RowStore, rows: &[usize], spec: &SortSpec) -> Result<Vec<usize>, ViewError> {
    let Some(key) = spec.column_key.as_deref() else {
        return Ok(rows.to_vec());
    };
    let column_idx = store.column_idx(key)?;
    let column_type = store.columns()[column_idx].column_type;

    let mut keyed: Vec<(usize, Option<SortKey>)> = rows
        .iter()
        .map(|&pos| (pos, SortKey::from_value(store.row(pos).value(column_idx), column_type)))
        .collect();

    keyed.sort_by(|(_, a), (_, b)| match (a, b) {
        (Some(a), Some(b)) => spec.direction.apply(a.compare(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    trace!("Sorted {} rows by {key} {:?}", keyed.len(), spec.direction);
    Ok(keyed.into_iter().map(|(pos, _)| pos).collect())
}
