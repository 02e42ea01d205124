//! Interactive tabular data view engine.
//!
//! Rows live in a [`RowStore`] and are shown through a derived pipeline:
//! filter, then sort, then either group or paginate. Selection and inline
//! editing sit on top and refer to rows by [`RowId`]. [`Model`] owns all of it
//! and is driven through [`Model::update`] or its individual methods; a
//! renderer reads one [`ViewData`] snapshot per frame.

pub mod domain;
pub mod edit;
pub mod filter;
pub mod group;
pub mod model;
pub mod page;
pub mod selection;
pub mod sort;
pub mod store;

pub use domain::{ALL_CATEGORIES, DEFAULT_PAGE_SIZE, Message, ViewConfig, ViewError};
pub use edit::{EditOutcome, EditState, EditingCell};
pub use filter::FilterSpec;
pub use group::GroupSpec;
pub use model::{
    GroupView, Model, NoopListener, PageInfo, RowView, SelectionInfo, ViewData, ViewListener, ViewMode,
};
pub use page::PageSpec;
pub use selection::{BulkAction, Selection};
pub use sort::{SortDirection, SortSpec};
pub use store::{Column, ColumnType, DATE_FORMAT, Row, RowId, RowStore, Value};
