use std::fmt;

use derive_setters::Setters;

use crate::filter::FilterSpec;
use crate::selection::BulkAction;
use crate::sort::SortSpec;
use crate::store::RowId;

/// Category value that disables the categorical filter.
pub const ALL_CATEGORIES: &str = "all";
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, PartialEq)]
pub enum ViewError {
    UnknownColumn(String),
    DuplicateColumn(String),
    UnknownRow(RowId),
    DuplicateRowId(RowId),
    SchemaMismatch { expected: usize, found: usize },
    InvalidPageSize,
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewError::UnknownColumn(key) => write!(f, "unknown column \"{key}\""),
            ViewError::DuplicateColumn(key) => write!(f, "column key \"{key}\" is used twice"),
            ViewError::UnknownRow(id) => write!(f, "no row with id {id}"),
            ViewError::DuplicateRowId(id) => write!(f, "row id {id} is already in use"),
            ViewError::SchemaMismatch { expected, found } => {
                write!(f, "row has {found} values but the view has {expected} columns")
            }
            ViewError::InvalidPageSize => write!(f, "page size must be greater than zero"),
        }
    }
}

impl std::error::Error for ViewError {}

/// Initial state of a view. Passed explicitly to [`crate::Model::new`].
#[derive(Debug, Clone, Setters)]
#[setters(into)]
pub struct ViewConfig {
    pub page_size: usize,
    pub sort: SortSpec,
    pub filter: FilterSpec,
    #[setters(strip_option)]
    pub group_column: Option<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        ViewConfig {
            page_size: DEFAULT_PAGE_SIZE,
            sort: SortSpec::default(),
            filter: FilterSpec::default(),
            group_column: None,
        }
    }
}

/// User actions understood by [`crate::Model::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    SetSort(String),
    ClearSort,
    SetFilter {
        query: String,
        category_key: Option<String>,
        category_value: Option<String>,
    },
    ClearFilter,
    ToggleGroup(String),
    ExpandAllGroups,
    CollapseAllGroups,
    SetGroupColumn(Option<String>),
    GoToPage(usize),
    NextPage,
    PreviousPage,
    FirstPage,
    LastPage,
    SetPageSize(usize),
    ToggleSelect(RowId),
    SelectAll,
    ToggleSelectAll,
    ClearSelection,
    BulkAction(BulkAction),
    StartEdit { row_id: RowId, column_key: String },
    ChangeEditValue(String),
    CommitEdit,
    CancelEdit,
}
