//! Inline cell editing.
//!
//! `Editor` is a two state machine: `Idle` or editing exactly one cell. A
//! commit validates the pending text against the column type, asks the caller
//! for approval and only then writes to the [`RowStore`].

use chrono::NaiveDate;
use tracing::{debug, trace};

use crate::domain::ViewError;
use crate::store::{ColumnType, DATE_FORMAT, RowId, RowStore, Value};

/// Parses user input into a value of `column_type`.
pub fn validate(input: &str, column_type: ColumnType) -> Result<Value, String> {
    match column_type {
        ColumnType::Text => Ok(Value::Text(input.to_string())),
        ColumnType::Numeric => match input.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Value::Number(n)),
            _ => Err(format!("\"{input}\" is not a valid number")),
        },
        ColumnType::Date => NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
            .map(Value::Date)
            .map_err(|_| format!("\"{input}\" is not a valid date (expected YYYY-MM-DD)")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditingCell {
    pub row_id: RowId,
    pub column_key: String,
    pub pending: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Idle,
    Editing(EditingCell),
}

impl EditState {
    pub fn is_idle(&self) -> bool {
        matches!(self, EditState::Idle)
    }

    pub fn cell(&self) -> Option<&EditingCell> {
        match self {
            EditState::Idle => None,
            EditState::Editing(cell) => Some(cell),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Committed {
        row_id: RowId,
        column_key: String,
        previous: Value,
        value: Value,
    },
    /// The pending text does not fit the column type.
    Invalid(String),
    /// The caller refused the change or the row is gone.
    Rejected(String),
    NotEditing,
}

#[derive(Debug, Clone, Default)]
pub struct Editor {
    state: EditState,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn is_editing_row(&self, row_id: RowId) -> bool {
        self.state.cell().is_some_and(|cell| cell.row_id == row_id)
    }

    /// Starts editing a cell, seeding the pending text with the current value.
    /// Non-editable columns and unknown rows are ignored. A different cell that
    /// is still being edited is cancelled first. Returns true when the given
    /// cell is being edited afterwards.
    pub fn activate(&mut self, store: &RowStore, row_id: RowId, column_key: &str) -> Result<bool, ViewError> {
        let column_idx = store.column_idx(column_key)?;
        if !store.columns()[column_idx].editable {
            trace!("Column {column_key} is not editable");
            return Ok(false);
        }
        let Some(row) = store.get(row_id) else {
            trace!("Row {row_id} does not exist");
            return Ok(false);
        };
        if let EditState::Editing(cell) = &self.state {
            if cell.row_id == row_id && cell.column_key == column_key {
                return Ok(true);
            }
            debug!(
                "Cancelling edit of {}:{} for {row_id}:{column_key}",
                cell.row_id, cell.column_key
            );
        }
        self.state = EditState::Editing(EditingCell {
            row_id,
            column_key: column_key.to_string(),
            pending: row.value(column_idx).to_string(),
            error: None,
        });
        Ok(true)
    }

    /// Replaces the pending text and clears a previous error.
    pub fn change_value(&mut self, value: impl Into<String>) -> bool {
        match &mut self.state {
            EditState::Idle => false,
            EditState::Editing(cell) => {
                cell.pending = value.into();
                cell.error = None;
                true
            }
        }
    }

    pub fn cancel(&mut self) -> bool {
        let was_editing = !self.state.is_idle();
        self.state = EditState::Idle;
        was_editing
    }

    /// Validates and writes the pending value. `approve` runs after validation
    /// and before the store is touched; an `Err` from it keeps the cell in
    /// editing with the returned message.
    pub fn commit<F>(&mut self, store: &mut RowStore, approve: F) -> Result<EditOutcome, ViewError>
    where
        F: FnOnce(RowId, &str, &Value) -> Result<(), String>,
    {
        let EditState::Editing(cell) = &mut self.state else {
            return Ok(EditOutcome::NotEditing);
        };
        let column_type = store.columns()[store.column_idx(&cell.column_key)?].column_type;

        let value = match validate(&cell.pending, column_type) {
            Ok(value) => value,
            Err(message) => {
                debug!("Rejecting edit of {}:{}: {message}", cell.row_id, cell.column_key);
                cell.error = Some(message.clone());
                return Ok(EditOutcome::Invalid(message));
            }
        };

        if !store.contains(cell.row_id) {
            let message = format!("row {} no longer exists", cell.row_id);
            cell.error = Some(message.clone());
            return Ok(EditOutcome::Rejected(message));
        }

        if let Err(message) = approve(cell.row_id, &cell.column_key, &value) {
            debug!("Caller rejected edit of {}:{}: {message}", cell.row_id, cell.column_key);
            cell.error = Some(message.clone());
            return Ok(EditOutcome::Rejected(message));
        }

        let previous = store.update(cell.row_id, &cell.column_key, value.clone())?;
        let outcome = EditOutcome::Committed {
            row_id: cell.row_id,
            column_key: cell.column_key.clone(),
            previous,
            value,
        };
        self.state = EditState::Idle;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Column, Row};
    use pretty_assertions::assert_eq;

    fn store() -> RowStore {
        RowStore::with_rows(
            vec![
                Column::text("sku", "SKU"),
                Column::numeric("price", "Price").editable(true),
                Column::numeric("stock", "Stock").editable(true),
                Column::date("restock", "Restock").editable(true),
                Column::text("note", "Note").editable(true),
            ],
            vec![
                Row::new(RowId(1), vec!["SKU-1".into(), 10.into(), 4.into(), Value::Null, "".into()]),
                Row::new(RowId(2), vec!["SKU-2".into(), 20.into(), 7.into(), Value::Null, "".into()]),
            ],
        )
        .unwrap()
    }

    fn accept(_: RowId, _: &str, _: &Value) -> Result<(), String> {
        Ok(())
    }

    fn error(editor: &Editor) -> Option<String> {
        editor.state().cell().and_then(|c| c.error.clone())
    }

    #[test]
    fn validation_by_column_type() {
        assert_eq!(validate(" 12.5 ", ColumnType::Numeric), Ok(Value::Number(12.5)));
        assert!(validate("abc", ColumnType::Numeric).is_err());
        assert!(validate("NaN", ColumnType::Numeric).is_err());
        assert!(validate("", ColumnType::Numeric).is_err());
        assert_eq!(validate("", ColumnType::Text), Ok(Value::Text(String::new())));
        assert_eq!(
            validate("2024-02-29", ColumnType::Date),
            Ok(Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()))
        );
        assert!(validate("2023-02-29", ColumnType::Date).is_err());
    }

    #[test]
    fn activation_requires_an_editable_column_and_live_row() {
        let store = store();
        let mut editor = Editor::new();
        assert_eq!(editor.activate(&store, RowId(1), "sku"), Ok(false));
        assert_eq!(editor.activate(&store, RowId(99), "price"), Ok(false));
        assert!(editor.state().is_idle());
        assert_eq!(
            editor.activate(&store, RowId(1), "nope"),
            Err(ViewError::UnknownColumn("nope".into()))
        );
    }

    #[test]
    fn activation_seeds_pending_value() {
        let store = store();
        let mut editor = Editor::new();
        assert_eq!(editor.activate(&store, RowId(2), "price"), Ok(true));
        assert_eq!(editor.state().cell().unwrap().pending, "20");
    }

    #[test]
    fn commit_writes_valid_value() {
        let mut store = store();
        let mut editor = Editor::new();
        editor.activate(&store, RowId(1), "price").unwrap();
        editor.change_value("12.99");
        let outcome = editor.commit(&mut store, accept).unwrap();
        assert_eq!(
            outcome,
            EditOutcome::Committed {
                row_id: RowId(1),
                column_key: "price".into(),
                previous: Value::Number(10.0),
                value: Value::Number(12.99),
            }
        );
        assert!(editor.state().is_idle());
        assert_eq!(store.get(RowId(1)).unwrap().value(1), &Value::Number(12.99));
    }

    #[test]
    fn invalid_commit_keeps_editing_and_store() {
        let mut store = store();
        let mut editor = Editor::new();
        editor.activate(&store, RowId(1), "price").unwrap();
        editor.change_value("abc");
        let outcome = editor.commit(&mut store, accept).unwrap();
        assert!(matches!(outcome, EditOutcome::Invalid(ref m) if !m.is_empty()));
        assert!(error(&editor).is_some_and(|m| !m.is_empty()));
        assert_eq!(store.get(RowId(1)).unwrap().value(1), &Value::Number(10.0));

        // typing clears the error
        editor.change_value("11");
        assert_eq!(error(&editor), None);
    }

    #[test]
    fn caller_rejection_keeps_editing() {
        let mut store = store();
        let mut editor = Editor::new();
        editor.activate(&store, RowId(2), "stock").unwrap();
        editor.change_value("3");
        let outcome = editor
            .commit(&mut store, |_, _, _| Err("stock is locked".to_string()))
            .unwrap();
        assert_eq!(outcome, EditOutcome::Rejected("stock is locked".into()));
        assert_eq!(error(&editor).as_deref(), Some("stock is locked"));
        assert_eq!(store.get(RowId(2)).unwrap().value(2), &Value::Number(7.0));
    }

    #[test]
    fn activating_another_cell_cancels_the_first() {
        let mut store = store();
        let mut editor = Editor::new();
        editor.activate(&store, RowId(1), "price").unwrap();
        editor.change_value("999");
        editor.activate(&store, RowId(2), "stock").unwrap();

        let cell = editor.state().cell().unwrap();
        assert_eq!((cell.row_id, cell.column_key.as_str()), (RowId(2), "stock"));
        assert_eq!(store.get(RowId(1)).unwrap().value(1), &Value::Number(10.0));

        editor.commit(&mut store, accept).unwrap();
        assert_eq!(store.get(RowId(1)).unwrap().value(1), &Value::Number(10.0));
        assert_eq!(store.get(RowId(2)).unwrap().value(2), &Value::Number(7.0));
    }

    #[test]
    fn reactivating_same_cell_keeps_pending_text() {
        let store = store();
        let mut editor = Editor::new();
        editor.activate(&store, RowId(1), "note").unwrap();
        editor.change_value("fragile");
        editor.activate(&store, RowId(1), "note").unwrap();
        assert_eq!(editor.state().cell().unwrap().pending, "fragile");
    }

    #[test]
    fn cancel_discards_pending_value() {
        let mut store = store();
        let mut editor = Editor::new();
        assert!(!editor.cancel());
        editor.activate(&store, RowId(1), "restock").unwrap();
        editor.change_value("2025-01-01");
        assert!(editor.cancel());
        assert_eq!(editor.commit(&mut store, accept), Ok(EditOutcome::NotEditing));
        assert_eq!(store.get(RowId(1)).unwrap().value(3), &Value::Null);
    }

    #[test]
    fn commit_on_removed_row_is_rejected() {
        let mut store = store();
        let mut editor = Editor::new();
        editor.activate(&store, RowId(2), "price").unwrap();
        store.remove(RowId(2)).unwrap();
        let outcome = editor.commit(&mut store, accept).unwrap();
        assert!(matches!(outcome, EditOutcome::Rejected(_)));
    }
}
