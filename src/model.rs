use tracing::{debug, info, instrument, trace, warn};

use crate::domain::{Message, ViewConfig, ViewError};
use crate::edit::{EditOutcome, EditState, Editor};
use crate::filter::{self, FilterSpec};
use crate::group::{self, Group, GroupSpec};
use crate::page::{self, PageSpec};
use crate::selection::{BulkAction, Selection};
use crate::sort::{self, SortSpec};
use crate::store::{Column, Row, RowId, RowStore, Value};

/// Callbacks into the caller. Both default to accepting / ignoring.
pub trait ViewListener {
    /// Called with a validated value before it is written to the store.
    /// Returning `Err` keeps the cell in editing and shows the message.
    fn on_row_updated(&mut self, _row_id: RowId, _column_key: &str, _value: &Value) -> Result<(), String> {
        Ok(())
    }

    /// The engine never applies bulk actions itself.
    fn on_bulk_action(&mut self, _action: &BulkAction, _selected: &[RowId]) {}
}

#[derive(Debug, Default)]
pub struct NoopListener;

impl ViewListener for NoopListener {}

/// Grouped views are not paginated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Paginated,
    Grouped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub id: RowId,
    pub values: Vec<Value>,
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub current: usize,
    pub total: usize,
    pub page_size: usize,
    pub start_index: usize,
    pub end_index: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupView {
    pub key: String,
    pub row_ids: Vec<RowId>,
    pub count: usize,
    pub expanded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionInfo {
    pub selected_ids: Vec<RowId>,
    pub is_all_selected: bool,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewData {
    pub mode: ViewMode,
    pub visible_rows: Vec<RowView>,
    pub total_count: usize,
    pub filtered_count: usize,
    pub page: PageInfo,
    pub groups: Option<Vec<GroupView>>,
    pub selection: SelectionInfo,
    pub edit: EditState,
}

/// Owns the rows and every piece of view state. Derived row orders are
/// recomputed after each mutation along Filter -> Sort -> Group | Paginate.
pub struct Model {
    store: RowStore,
    sort: SortSpec,
    filter: FilterSpec,
    group: GroupSpec,
    page: PageSpec,
    selection: Selection,
    editor: Editor,
    listener: Box<dyn ViewListener>,
    // Positions passing the filter, natural order.
    filtered: Vec<usize>,
    // `filtered` after sorting.
    ordered: Vec<usize>,
    groups: Vec<Group>,
}

impl Model {
    pub fn new(
        columns: Vec<Column>,
        rows: Vec<Row>,
        config: &ViewConfig,
        listener: impl ViewListener + 'static,
    ) -> Result<Self, ViewError> {
        let store = RowStore::with_rows(columns, rows)?;
        Model::with_store(store, config, listener)
    }

    pub fn with_store(
        store: RowStore,
        config: &ViewConfig,
        listener: impl ViewListener + 'static,
    ) -> Result<Self, ViewError> {
        let mut group = GroupSpec::default();
        group.set_column(config.group_column.clone());
        let mut model = Model {
            store,
            sort: config.sort.clone(),
            filter: config.filter.clone(),
            group,
            page: PageSpec::new(config.page_size)?,
            selection: Selection::new(),
            editor: Editor::new(),
            listener: Box::new(listener),
            filtered: Vec::new(),
            ordered: Vec::new(),
            groups: Vec::new(),
        };
        model.recompute()?;
        info!(
            "View ready: {} columns, {} rows, {} visible",
            model.store.columns().len(),
            model.store.len(),
            model.filtered.len()
        );
        Ok(model)
    }

    // ------------------------------ Accessors ------------------------------ //

    pub fn store(&self) -> &RowStore {
        &self.store
    }

    pub fn columns(&self) -> &[Column] {
        self.store.columns()
    }

    pub fn sort_spec(&self) -> &SortSpec {
        &self.sort
    }

    pub fn filter_spec(&self) -> &FilterSpec {
        &self.filter
    }

    pub fn group_spec(&self) -> &GroupSpec {
        &self.group
    }

    pub fn page_spec(&self) -> &PageSpec {
        &self.page
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn edit_state(&self) -> &EditState {
        self.editor.state()
    }

    pub fn mode(&self) -> ViewMode {
        if self.group.is_active() {
            ViewMode::Grouped
        } else {
            ViewMode::Paginated
        }
    }

    /// Ids of every row passing the filter, in display order.
    pub fn visible_ids(&self) -> Vec<RowId> {
        self.ids_of(&self.ordered)
    }

    pub fn category_options(&self, key: &str) -> Result<Vec<String>, ViewError> {
        filter::category_options(&self.store, key)
    }

    // ------------------------------- Pipeline ------------------------------ //

    fn recompute(&mut self) -> Result<(), ViewError> {
        self.filtered = filter::filter(&self.store, &self.store.natural_order(), &self.filter)?;
        self.ordered = sort::sort(&self.store, &self.filtered, &self.sort)?;
        self.groups = if self.group.is_active() {
            group::group(&self.store, &self.ordered, &self.group)?
        } else {
            Vec::new()
        };
        self.page.clamp(self.ordered.len());
        trace!(
            "Recomputed view: {} of {} rows, page {}/{}",
            self.ordered.len(),
            self.store.len(),
            self.page.current_page(),
            self.page.total_pages(self.ordered.len())
        );
        Ok(())
    }

    fn ids_of(&self, positions: &[usize]) -> Vec<RowId> {
        positions.iter().map(|&pos| self.store.row(pos).id()).collect()
    }

    fn row_views(&self, positions: &[usize]) -> Vec<RowView> {
        positions
            .iter()
            .map(|&pos| {
                let row = self.store.row(pos);
                RowView {
                    id: row.id(),
                    values: row.values().to_vec(),
                    selected: self.selection.is_selected(row.id()),
                }
            })
            .collect()
    }

    pub fn view_data(&self) -> ViewData {
        let visible_ids = self.visible_ids();
        let (visible_rows, page, groups) = match self.mode() {
            ViewMode::Paginated => {
                let page = page::paginate(&self.ordered, &self.page);
                let info = PageInfo {
                    current: page.current,
                    total: page.total_pages,
                    page_size: self.page.page_size(),
                    start_index: page.start_index,
                    end_index: page.end_index,
                    has_next: page.has_next,
                    has_previous: page.has_previous,
                };
                (self.row_views(&page.rows), info, None)
            }
            ViewMode::Grouped => {
                let info = PageInfo {
                    current: 1,
                    total: 1,
                    page_size: self.page.page_size(),
                    start_index: 0,
                    end_index: self.ordered.len(),
                    has_next: false,
                    has_previous: false,
                };
                let groups = self
                    .groups
                    .iter()
                    .map(|g| GroupView {
                        key: g.key.clone(),
                        row_ids: self.ids_of(&g.rows),
                        count: g.len(),
                        expanded: g.expanded,
                    })
                    .collect();
                (self.row_views(&self.ordered), info, Some(groups))
            }
        };

        ViewData {
            mode: self.mode(),
            visible_rows,
            total_count: self.store.len(),
            filtered_count: self.filtered.len(),
            page,
            groups,
            selection: SelectionInfo {
                selected_ids: self.selection.ids(),
                is_all_selected: self.selection.is_all_selected(&visible_ids),
            },
            edit: self.editor.state().clone(),
        }
    }

    // ---------------------------- Message handling -------------------------- //

    #[instrument(level = "debug", skip(self))]
    pub fn update(&mut self, message: Message) -> Result<(), ViewError> {
        match message {
            Message::SetSort(key) => self.set_sort(&key),
            Message::ClearSort => self.clear_sort(),
            Message::SetFilter {
                query,
                category_key,
                category_value,
            } => self.set_filter(query, category_key, category_value),
            Message::ClearFilter => self.clear_filter(),
            Message::ToggleGroup(key) => {
                self.toggle_group(&key);
                Ok(())
            }
            Message::ExpandAllGroups => {
                self.expand_all_groups();
                Ok(())
            }
            Message::CollapseAllGroups => {
                self.collapse_all_groups();
                Ok(())
            }
            Message::SetGroupColumn(key) => self.set_group_column(key),
            Message::GoToPage(n) => {
                self.go_to_page(n);
                Ok(())
            }
            Message::NextPage => {
                self.next_page();
                Ok(())
            }
            Message::PreviousPage => {
                self.previous_page();
                Ok(())
            }
            Message::FirstPage => {
                self.first_page();
                Ok(())
            }
            Message::LastPage => {
                self.last_page();
                Ok(())
            }
            Message::SetPageSize(size) => self.set_page_size(size),
            Message::ToggleSelect(id) => self.toggle_select(id).map(|_| ()),
            Message::SelectAll => {
                self.select_all();
                Ok(())
            }
            Message::ToggleSelectAll => {
                self.toggle_select_all();
                Ok(())
            }
            Message::ClearSelection => {
                self.clear_selection();
                Ok(())
            }
            Message::BulkAction(action) => {
                self.bulk_action(action);
                Ok(())
            }
            Message::StartEdit { row_id, column_key } => self.start_edit(row_id, &column_key).map(|_| ()),
            Message::ChangeEditValue(value) => {
                self.change_edit_value(value);
                Ok(())
            }
            Message::CommitEdit => self.commit_edit().map(|_| ()),
            Message::CancelEdit => {
                self.cancel_edit();
                Ok(())
            }
        }
    }

    // --------------------------------- Sort -------------------------------- //

    /// Header click on `key`. Non-sortable columns are ignored.
    pub fn set_sort(&mut self, key: &str) -> Result<(), ViewError> {
        let column = self
            .store
            .column(key)
            .ok_or_else(|| ViewError::UnknownColumn(key.to_string()))?;
        if !column.sortable {
            debug!("Column {key} is not sortable");
            return Ok(());
        }
        self.sort.toggle(key);
        debug!("Sorting by {key} {:?}", self.sort.direction);
        self.recompute()
    }

    pub fn clear_sort(&mut self) -> Result<(), ViewError> {
        self.sort.clear();
        self.recompute()
    }

    // -------------------------------- Filter ------------------------------- //

    pub fn set_filter(
        &mut self,
        query: impl Into<String>,
        category_key: Option<String>,
        category_value: Option<String>,
    ) -> Result<(), ViewError> {
        if let Some(key) = category_key.as_deref() {
            self.store.column_idx(key)?;
        }
        self.filter = FilterSpec {
            query: query.into(),
            category_key,
            category_value,
        };
        debug!("Filter set to {:?}", self.filter);
        self.recompute()
    }

    pub fn clear_filter(&mut self) -> Result<(), ViewError> {
        self.filter = FilterSpec::default();
        self.recompute()
    }

    // -------------------------------- Group -------------------------------- //

    /// Switches between grouped (`Some`) and paginated (`None`) mode.
    pub fn set_group_column(&mut self, key: Option<String>) -> Result<(), ViewError> {
        if let Some(key) = key.as_deref() {
            self.store.column_idx(key)?;
        }
        self.group.set_column(key);
        self.recompute()
    }

    /// Ignored outside grouped mode.
    pub fn toggle_group(&mut self, group_key: &str) -> bool {
        if !self.group.is_active() {
            debug!("Not grouped, ignoring toggle of {group_key}");
            return false;
        }
        let expanded = self.group.toggle(group_key);
        if let Some(g) = self.groups.iter_mut().find(|g| g.key == group_key) {
            g.expanded = expanded;
        }
        expanded
    }

    pub fn expand_all_groups(&mut self) {
        let keys: Vec<String> = self.groups.iter().map(|g| g.key.clone()).collect();
        self.group.expand_all(keys);
        self.groups.iter_mut().for_each(|g| g.expanded = true);
    }

    pub fn collapse_all_groups(&mut self) {
        self.group.collapse_all();
        self.groups.iter_mut().for_each(|g| g.expanded = false);
    }

    // ------------------------------ Pagination ----------------------------- //

    pub fn go_to_page(&mut self, page: usize) {
        self.page.go_to(page, self.ordered.len());
    }

    pub fn next_page(&mut self) -> bool {
        self.page.next(self.ordered.len())
    }

    pub fn previous_page(&mut self) -> bool {
        self.page.previous()
    }

    pub fn first_page(&mut self) {
        self.page.first();
    }

    pub fn last_page(&mut self) {
        self.page.last(self.ordered.len());
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), ViewError> {
        self.page.set_page_size(page_size, self.ordered.len())
    }

    // ------------------------------- Selection ----------------------------- //

    pub fn toggle_select(&mut self, id: RowId) -> Result<bool, ViewError> {
        if !self.store.contains(id) {
            return Err(ViewError::UnknownRow(id));
        }
        Ok(self.selection.toggle(id))
    }

    /// Selects every row passing the filter, on every page.
    pub fn select_all(&mut self) {
        let visible = self.visible_ids();
        self.selection.select_all(visible);
    }

    pub fn toggle_select_all(&mut self) {
        let visible = self.visible_ids();
        self.selection.toggle_all(&visible);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Hands the selected ids to the listener. Returns how many rows the
    /// action was issued for.
    pub fn bulk_action(&mut self, action: BulkAction) -> usize {
        let store = &self.store;
        self.selection.retain(|id| store.contains(id));
        if self.selection.is_empty() {
            debug!("Ignoring bulk action {action}: nothing selected");
            return 0;
        }
        let ids = self.selection.ids();
        info!("Bulk action {action} on {} rows", ids.len());
        self.listener.on_bulk_action(&action, &ids);
        ids.len()
    }

    // --------------------------------- Edit -------------------------------- //

    pub fn start_edit(&mut self, row_id: RowId, column_key: &str) -> Result<bool, ViewError> {
        self.editor.activate(&self.store, row_id, column_key)
    }

    pub fn change_edit_value(&mut self, value: impl Into<String>) -> bool {
        self.editor.change_value(value)
    }

    pub fn commit_edit(&mut self) -> Result<EditOutcome, ViewError> {
        let listener = &mut self.listener;
        let outcome = self.editor.commit(&mut self.store, |row_id, key, value| {
            listener.on_row_updated(row_id, key, value)
        })?;
        if let EditOutcome::Committed { row_id, column_key, value, .. } = &outcome {
            info!("Committed {row_id}:{column_key} = {value}");
            self.recompute()?;
        }
        Ok(outcome)
    }

    pub fn cancel_edit(&mut self) -> bool {
        self.editor.cancel()
    }

    // ---------------------------- Row mutations ---------------------------- //

    /// Appends a row with a caller-assigned id.
    pub fn insert_row(&mut self, row: Row) -> Result<RowId, ViewError> {
        let id = self.store.insert(row)?;
        self.recompute()?;
        Ok(id)
    }

    /// Appends a row with a store-assigned id.
    pub fn push_row(&mut self, values: Vec<Value>) -> Result<RowId, ViewError> {
        let id = self.store.push(values)?;
        self.recompute()?;
        Ok(id)
    }

    pub fn update_cell(&mut self, id: RowId, column_key: &str, value: Value) -> Result<Value, ViewError> {
        if self.editor.is_editing_row(id) {
            warn!("Row {id} changed while one of its cells is being edited");
        }
        let previous = self.store.update(id, column_key, value)?;
        self.recompute()?;
        Ok(previous)
    }

    /// Removes a row, dropping it from the selection and ending an edit on it.
    pub fn remove_row(&mut self, id: RowId) -> Result<Row, ViewError> {
        let row = self.store.remove(id)?;
        self.selection.remove(id);
        if self.editor.is_editing_row(id) {
            debug!("Cancelling edit of removed row {id}");
            self.editor.cancel();
        }
        self.recompute()?;
        Ok(row)
    }
}
