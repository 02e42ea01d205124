use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use derive_setters::Setters;
use tracing::trace;

use crate::domain::ViewError;

/// Canonical textual format of date values.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Numeric,
    Date,
}

#[derive(Debug, Clone, PartialEq, Setters)]
pub struct Column {
    #[setters(skip)]
    pub key: String,
    #[setters(into)]
    pub label: String,
    pub column_type: ColumnType,
    pub sortable: bool,
    pub editable: bool,
}

impl Column {
    /// Sortable, read-only column. Use the setters to change the flags.
    pub fn new(key: impl Into<String>, label: impl Into<String>, column_type: ColumnType) -> Self {
        Column {
            key: key.into(),
            label: label.into(),
            column_type,
            sortable: true,
            editable: false,
        }
    }

    pub fn text(key: impl Into<String>, label: impl Into<String>) -> Self {
        Column::new(key, label, ColumnType::Text)
    }

    pub fn numeric(key: impl Into<String>, label: impl Into<String>) -> Self {
        Column::new(key, label, ColumnType::Numeric)
    }

    pub fn date(key: impl Into<String>, label: impl Into<String>) -> Self {
        Column::new(key, label, ColumnType::Date)
    }
}

static NULL: Value = Value::Null;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{n}"),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Stable identity of a row, independent of its position in any view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RowId {
    fn from(id: u64) -> Self {
        RowId(id)
    }
}

/// A record. Values are stored in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    id: RowId,
    values: Vec<Value>,
}

impl Row {
    pub fn new(id: RowId, values: Vec<Value>) -> Self {
        Row { id, values }
    }

    pub fn id(&self) -> RowId {
        self.id
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, column_idx: usize) -> &Value {
        self.values.get(column_idx).unwrap_or(&NULL)
    }
}

/// The canonical ordered rows of a view. Insertion order is the natural order.
///
/// Engines address rows by position (`0..len()`), positions are only valid
/// until the next `insert`/`push`/`remove`.
#[derive(Debug, Clone)]
pub struct RowStore {
    columns: Vec<Column>,
    column_index: HashMap<String, usize>,
    rows: Vec<Row>,
    positions: HashMap<RowId, usize>,
    next_id: u64,
}

impl RowStore {
    pub fn new(columns: Vec<Column>) -> Result<Self, ViewError> {
        let mut column_index = HashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            if column_index.insert(column.key.clone(), idx).is_some() {
                return Err(ViewError::DuplicateColumn(column.key.clone()));
            }
        }
        Ok(RowStore {
            columns,
            column_index,
            rows: Vec::new(),
            positions: HashMap::new(),
            next_id: 1,
        })
    }

    pub fn with_rows(columns: Vec<Column>, rows: Vec<Row>) -> Result<Self, ViewError> {
        let mut store = RowStore::new(columns)?;
        store.rows.reserve(rows.len());
        for row in rows {
            store.insert(row)?;
        }
        Ok(store)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, key: &str) -> Option<&Column> {
        self.column_index.get(key).map(|&idx| &self.columns[idx])
    }

    pub fn column_idx(&self, key: &str) -> Result<usize, ViewError> {
        self.column_index
            .get(key)
            .copied()
            .ok_or_else(|| ViewError::UnknownColumn(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Row at a position. Panics on positions not produced from this store.
    pub fn row(&self, pos: usize) -> &Row {
        &self.rows[pos]
    }

    pub fn get(&self, id: RowId) -> Option<&Row> {
        self.positions.get(&id).map(|&pos| &self.rows[pos])
    }

    pub fn position(&self, id: RowId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn contains(&self, id: RowId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = RowId> + '_ {
        self.rows.iter().map(Row::id)
    }

    /// All positions in natural order.
    pub fn natural_order(&self) -> Vec<usize> {
        (0..self.rows.len()).collect()
    }

    /// Appends a row with a store-assigned id.
    pub fn push(&mut self, values: Vec<Value>) -> Result<RowId, ViewError> {
        let id = RowId(self.next_id);
        self.insert(Row::new(id, values))
    }

    /// Appends a row keeping its caller-assigned id.
    pub fn insert(&mut self, row: Row) -> Result<RowId, ViewError> {
        if row.values.len() != self.columns.len() {
            return Err(ViewError::SchemaMismatch {
                expected: self.columns.len(),
                found: row.values.len(),
            });
        }
        if self.positions.contains_key(&row.id) {
            return Err(ViewError::DuplicateRowId(row.id));
        }
        let id = row.id;
        self.positions.insert(id, self.rows.len());
        self.rows.push(row);
        self.next_id = self.next_id.max(id.0.saturating_add(1));
        trace!("Inserted row {id}");
        Ok(id)
    }

    /// Replaces one cell and returns the previous value.
    pub fn update(&mut self, id: RowId, key: &str, value: Value) -> Result<Value, ViewError> {
        let column_idx = self.column_idx(key)?;
        let pos = self.position(id).ok_or(ViewError::UnknownRow(id))?;
        let previous = std::mem::replace(&mut self.rows[pos].values[column_idx], value);
        trace!("Updated row {id} column {key}: {previous} -> {}", self.rows[pos].values[column_idx]);
        Ok(previous)
    }

    pub fn remove(&mut self, id: RowId) -> Result<Row, ViewError> {
        let pos = self.positions.remove(&id).ok_or(ViewError::UnknownRow(id))?;
        let row = self.rows.remove(pos);
        for (idx, r) in self.rows.iter().enumerate().skip(pos) {
            self.positions.insert(r.id, idx);
        }
        trace!("Removed row {id} at position {pos}");
        Ok(row)
    }
}
