use std::collections::HashSet;

use rayon::prelude::*;
use tracing::trace;

use crate::domain::{ALL_CATEGORIES, ViewError};
use crate::store::RowStore;

/// Free-text query plus an optional `column == value` predicate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSpec {
    pub query: String,
    pub category_key: Option<String>,
    pub category_value: Option<String>,
}

impl FilterSpec {
    pub fn query(query: impl Into<String>) -> Self {
        FilterSpec {
            query: query.into(),
            ..FilterSpec::default()
        }
    }

    pub fn category(key: impl Into<String>, value: impl Into<String>) -> Self {
        FilterSpec {
            query: String::new(),
            category_key: Some(key.into()),
            category_value: Some(value.into()),
        }
    }

    fn needle(&self) -> Option<String> {
        if self.query.trim().is_empty() {
            None
        } else {
            Some(self.query.to_lowercase())
        }
    }

    fn category_predicate(&self) -> Option<(&str, &str)> {
        match (self.category_key.as_deref(), self.category_value.as_deref()) {
            (Some(key), Some(value)) if value != ALL_CATEGORIES => Some((key, value)),
            _ => None,
        }
    }

    /// False when the spec lets every row through.
    pub fn is_active(&self) -> bool {
        self.needle().is_some() || self.category_predicate().is_some()
    }
}

/// Keeps the rows matching both predicates, in their incoming order.
pub fn filter(store: &RowStore, rows: &[usize], spec: &FilterSpec) -> Result<Vec<usize>, ViewError> {
    let needle = spec.needle();
    let category = match spec.category_predicate() {
        Some((key, value)) => Some((store.column_idx(key)?, value)),
        None => None,
    };
    if needle.is_none() && category.is_none() {
        return Ok(rows.to_vec());
    }
    trace!("Starting filter for {:?} / {:?} ...", needle, category);

    // rayon's collect into a Vec keeps the input order.
    let matches: Vec<usize> = rows
        .par_iter()
        .copied()
        .filter(|&pos| {
            let row = store.row(pos);
            let category_match = category
                .map(|(idx, value)| row.value(idx).to_string() == value)
                .unwrap_or(true);
            category_match
                && needle.as_deref().is_none_or(|needle| {
                    row.values()
                        .iter()
                        .any(|v| v.to_string().to_lowercase().contains(needle))
                })
        })
        .collect();

    trace!("Filter kept {} of {} rows", matches.len(), rows.len());
    Ok(matches)
}

/// Choices for a category picker: the "all" sentinel followed by the distinct
/// non-empty values of `key` in first-seen order.
pub fn category_options(store: &RowStore, key: &str) -> Result<Vec<String>, ViewError> {
    let column_idx = store.column_idx(key)?;
    let mut seen = HashSet::new();
    let mut options = vec![ALL_CATEGORIES.to_string()];
    for row in store.rows() {
        let value = row.value(column_idx);
        if value.is_null() {
            continue;
        }
        let value = value.to_string();
        if seen.insert(value.clone()) {
            options.push(value);
        }
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Column, Row, RowId, Value};
    use pretty_assertions::assert_eq;

    fn store() -> RowStore {
        RowStore::with_rows(
            vec![
                Column::text("sku", "SKU"),
                Column::text("name", "Name"),
                Column::text("category", "Category"),
                Column::numeric("stock", "Stock"),
            ],
            vec![
                Row::new(RowId(1), vec!["SKU-001".into(), "Wireless Mouse".into(), "Electronics".into(), 45.into()]),
                Row::new(RowId(2), vec!["SKU-002".into(), "Desk Lamp".into(), "Furniture".into(), 12.into()]),
                Row::new(RowId(3), vec!["SKU-003".into(), "USB Cable".into(), "Electronics".into(), 0.into()]),
                Row::new(RowId(4), vec!["SKU-004".into(), "Office Chair".into(), "Furniture".into(), Value::Null]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn empty_spec_returns_rows_unchanged() {
        let store = store();
        let rows = vec![3, 1, 2];
        assert_eq!(filter(&store, &rows, &FilterSpec::default()).unwrap(), rows);
        assert_eq!(filter(&store, &rows, &FilterSpec::query("   ")).unwrap(), rows);
        assert_eq!(filter(&store, &rows, &FilterSpec::category("category", "all")).unwrap(), rows);
    }

    #[test]
    fn query_matches_any_column_case_insensitive() {
        let store = store();
        let all = store.natural_order();
        assert_eq!(filter(&store, &all, &FilterSpec::query("usb")).unwrap(), vec![2]);
        assert_eq!(filter(&store, &all, &FilterSpec::query("ELECTRONICS")).unwrap(), vec![0, 2]);
        // numbers are searched in their display form
        assert_eq!(filter(&store, &all, &FilterSpec::query("45")).unwrap(), vec![0]);
    }

    #[test]
    fn query_and_category_combine() {
        let store = store();
        let spec = FilterSpec {
            query: "sku-00".into(),
            category_key: Some("category".into()),
            category_value: Some("Furniture".into()),
        };
        assert_eq!(filter(&store, &store.natural_order(), &spec).unwrap(), vec![1, 3]);
    }

    #[test]
    fn filter_is_idempotent_and_keeps_order() {
        let store = store();
        let rows = vec![3, 2, 1, 0];
        let spec = FilterSpec::query("e");
        let once = filter(&store, &rows, &spec).unwrap();
        let twice = filter(&store, &once, &spec).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, vec![3, 2, 1, 0]);
    }

    #[test]
    fn unknown_category_column_is_an_error() {
        let store = store();
        assert_eq!(
            filter(&store, &[0], &FilterSpec::category("color", "red")),
            Err(ViewError::UnknownColumn("color".into()))
        );
    }

    #[test]
    fn category_options_start_with_sentinel() {
        let store = store();
        assert_eq!(
            category_options(&store, "category").unwrap(),
            vec!["all", "Electronics", "Furniture"]
        );
        assert_eq!(category_options(&store, "stock").unwrap(), vec!["all", "45", "12", "0"]);
    }
}
