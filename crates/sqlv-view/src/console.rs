//! The console controller.
//!
//! Every public operation validates its input, calls the gateway, folds the
//! response into the view state or catalog and re-renders the affected
//! regions. Failures are shown on the surface before they are returned, and
//! leave state and regions as they were.

use sqlv_core::{
    ColumnType, DatabasePayload, Error, ExportFormat, IndexSummary, Page, Result, Row, RowId,
    StructurePayload, TableSummary, ViewConfig,
};
use sqlv_gateway::{RemoteGateway, StructureAction};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::dispatch::{decode, Action, Listener, UiEvent};
use crate::forms::{ColumnGroup, DynamicForm, GroupId, IndexColumnGroup};
use crate::render;
use crate::rows::{delete_request, RowForm};
use crate::state::{LoadOutcome, ViewState, ViewStateStore};
use crate::surface::{Dialog, Panel, Region, Surface};

/// What the console knows about the open database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub db_path: Option<String>,
    pub tables: Vec<TableSummary>,
    pub indexes: Vec<IndexSummary>,
}

impl Catalog {
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.name == name)
    }
}

#[derive(Debug, Default)]
struct IndexForm {
    table: Option<String>,
    /// Columns of `table`, `None` until they are known
    choices: Option<Vec<String>>,
    columns: DynamicForm<IndexColumnGroup>,
}

impl IndexForm {
    /// Point every unset or unknown column at the first choice.
    fn normalize(&mut self) {
        let Some(choices) = self.choices.clone() else {
            return;
        };
        let ids: Vec<GroupId> = self.columns.groups().map(|(id, _)| id).collect();
        for id in ids {
            if let Some(group) = self.columns.group_mut(id) {
                let known = group
                    .column
                    .as_ref()
                    .is_some_and(|c| choices.contains(c));
                if !known {
                    group.column = choices.first().cloned();
                }
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn required(value: &str, message: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::validation(message))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Console controller bound to one gateway and one surface.
///
/// Locks are only taken between awaits.
pub struct Console {
    gateway: Arc<dyn RemoteGateway>,
    surface: Arc<dyn Surface>,
    store: ViewStateStore,
    catalog: Mutex<Catalog>,
    columns_form: Mutex<DynamicForm<ColumnGroup>>,
    index_form: Mutex<IndexForm>,
    add_row_form: Mutex<Option<RowForm>>,
    row_editor: Mutex<Option<RowForm>>,
}

impl Console {
    pub fn new(gateway: Arc<dyn RemoteGateway>, surface: Arc<dyn Surface>) -> Self {
        Self {
            gateway,
            surface,
            store: ViewStateStore::new(),
            catalog: Mutex::new(Catalog::default()),
            columns_form: Mutex::new(DynamicForm::new()),
            index_form: Mutex::new(IndexForm::default()),
            add_row_form: Mutex::new(None),
            row_editor: Mutex::new(None),
        }
    }

    /// Apply load ordering and page size from configuration.
    pub fn with_view_config(mut self, config: &ViewConfig) -> Self {
        self.store = ViewStateStore::with_ordering(config.load_ordering)
            .with_page(Page::first(config.page_size));
        self
    }

    /// Override the row window of table loads.
    pub fn with_page(mut self, page: Page) -> Self {
        self.store = ViewStateStore::with_ordering(self.store.ordering()).with_page(page);
        self
    }

    pub fn store(&self) -> &ViewStateStore {
        &self.store
    }

    pub fn view(&self) -> Arc<ViewState> {
        self.store.get()
    }

    pub fn catalog(&self) -> Catalog {
        lock(&self.catalog).clone()
    }

    pub fn add_row_form(&self) -> Option<RowForm> {
        lock(&self.add_row_form).clone()
    }

    pub fn row_editor(&self) -> Option<RowForm> {
        lock(&self.row_editor).clone()
    }

    fn report(&self, err: &Error, fallback: &str) {
        match err {
            Error::Validation(msg) => debug!(reason = %msg, "Action rejected"),
            Error::Server(msg) => warn!(error = %msg, "{}", fallback),
            other => error!(error = %other, "{}", fallback),
        }
        self.surface.alert(err.user_message(fallback));
    }

    fn checked<T>(&self, result: Result<T>, fallback: &str) -> Result<T> {
        result.inspect_err(|e| self.report(e, fallback))
    }

    // ---- database ----

    /// Upload a database file and make it the open database.
    pub async fn open_database(&self, file_name: &str, contents: Vec<u8>) -> Result<()> {
        let fallback = "Failed to open database";
        let file_name = self.checked(required(file_name, "No selected file"), fallback)?;

        let payload = self.checked(
            self.gateway.open_database(&file_name, contents).await,
            fallback,
        )?;

        self.surface.hide_dialog(Dialog::OpenDatabase);
        self.apply_database(payload).await;
        Ok(())
    }

    pub async fn create_database(&self, db_name: &str) -> Result<()> {
        let fallback = "Failed to create database";
        let db_name = self.checked(required(db_name, "Database name is required"), fallback)?;

        let payload = self.checked(self.gateway.create_database(&db_name).await, fallback)?;

        self.surface.hide_dialog(Dialog::CreateDatabase);
        self.apply_database(payload).await;
        Ok(())
    }

    /// Replace the catalog with a freshly opened database.
    async fn apply_database(&self, payload: DatabasePayload) {
        info!(db_path = %payload.db_path, tables = payload.tables.len(), "Database opened");

        self.store.invalidate();
        self.surface
            .render(Region::TableView, render::table_view_placeholder());
        lock(&self.add_row_form).take();
        lock(&self.row_editor).take();

        {
            let mut catalog = lock(&self.catalog);
            catalog.db_path = Some(payload.db_path.clone());
            catalog.indexes.clear();
        }
        self.surface.render(Region::DatabasePath, payload.db_path);
        self.apply_tables(payload.tables);

        self.refresh_indexes().await;
    }

    fn apply_tables(&self, tables: Vec<TableSummary>) {
        self.surface
            .render(Region::TablesList, render::table_list(&tables));
        self.surface
            .render(Region::IndexTableSelect, render::index_table_options(&tables));

        let stale_index_table = {
            let index_form = lock(&self.index_form);
            index_form
                .table
                .as_ref()
                .is_some_and(|t| !tables.iter().any(|s| &s.name == t))
        };
        if stale_index_table {
            let mut index_form = lock(&self.index_form);
            index_form.table = None;
            index_form.choices = None;
            self.surface.render(
                Region::IndexColumnsForm,
                render::index_column_groups(&index_form.columns, None),
            );
        }

        lock(&self.catalog).tables = tables;
    }

    fn apply_indexes(&self, indexes: Vec<IndexSummary>) {
        self.surface
            .render(Region::IndexesList, render::index_list(&indexes));
        lock(&self.catalog).indexes = indexes;
    }

    /// Fold a `/structure` response into the catalog.
    pub fn apply_structure(&self, payload: StructurePayload) {
        if let Some(tables) = payload.tables {
            self.apply_tables(tables);
        }
        if let Some(indexes) = payload.indexes {
            self.apply_indexes(indexes);
        }
    }

    async fn apply_structure_change(&self, payload: StructurePayload) {
        let has_indexes = payload.indexes.is_some();
        self.apply_structure(payload);
        if !has_indexes {
            self.refresh_indexes().await;
        }
    }

    /// Re-read the index list. Failures are logged and otherwise ignored.
    pub async fn refresh_indexes(&self) {
        match self.gateway.structure(StructureAction::GetIndexes).await {
            Ok(payload) => self.apply_structure(payload),
            Err(e) => warn!(error = %e, "Failed to refresh indexes"),
        }
    }

    // ---- table view ----

    /// Load `table` and render it.
    pub async fn view_table(&self, table: &str) -> Result<()> {
        let outcome = self.checked(
            self.store.load(self.gateway.as_ref(), table).await,
            "Failed to load table data",
        )?;

        match outcome {
            LoadOutcome::Applied(state) => {
                self.surface.render(Region::TableView, render::table_view(&state));
                self.refresh_indexes().await;
            }
            LoadOutcome::Superseded => debug!(table = %table, "Table load superseded"),
        }
        Ok(())
    }

    /// Sidebar selection: switch to the table tab and load the table.
    pub async fn select_table(&self, table: &str) -> Result<()> {
        self.surface.show_panel(Panel::Table);
        self.view_table(table).await
    }

    /// Point the browser at the download endpoint.
    pub fn export_table(&self, table: &str, format: ExportFormat) -> Result<()> {
        let url = self.checked(
            self.gateway.export_url(format, table),
            "Failed to export table",
        )?;
        info!(table = %table, format = %format, "Exporting table");
        self.surface.navigate(&url);
        Ok(())
    }

    // ---- query panel ----

    /// Run ad-hoc SQL and render the result grid. The rows are returned for
    /// hosts that present them differently.
    pub async fn execute_query(&self, query: &str) -> Result<Vec<Row>> {
        let fallback = "Failed to execute query";
        let query = self.checked(required(query, "Please enter a SQL query"), fallback)?;

        let results = self.checked(self.gateway.execute_query(&query).await, fallback)?;
        debug!(rows = results.len(), "Query executed");

        self.surface
            .render(Region::QueryResults, render::query_results(&results));
        Ok(results)
    }

    /// Ask the backend for SQL and put it into the query editor.
    pub async fn generate_sql(&self, prompt: &str, table_name: Option<&str>) -> Result<String> {
        let fallback = "Failed to generate SQL";
        let prompt = self.checked(
            required(prompt, "Please describe what you want to query"),
            fallback,
        )?;
        let table_name = table_name.map(str::trim).filter(|t| !t.is_empty());

        let query = self.checked(
            self.gateway.generate_sql(&prompt, table_name).await,
            fallback,
        )?;

        self.surface.hide_dialog(Dialog::GenerateSql);
        self.surface.render(Region::QueryEditor, query.clone());
        self.surface.show_panel(Panel::Query);
        Ok(query)
    }

    // ---- create table ----

    pub fn add_column_row(&self) -> GroupId {
        let mut form = lock(&self.columns_form);
        let id = form.add_row();
        self.surface
            .render(Region::ColumnsForm, render::column_groups(&form));
        id
    }

    pub fn remove_column_row(&self, group: GroupId) -> bool {
        let mut form = lock(&self.columns_form);
        let removed = form.remove(group);
        if removed {
            self.surface
                .render(Region::ColumnsForm, render::column_groups(&form));
        }
        removed
    }

    /// Mirror the inputs of one column group.
    pub fn update_column(&self, group: GroupId, name: &str, col_type: ColumnType) -> bool {
        match lock(&self.columns_form).group_mut(group) {
            Some(column) => {
                column.name = name.to_string();
                column.col_type = col_type;
                true
            }
            None => false,
        }
    }

    pub async fn create_table(&self, table_name: &str) -> Result<()> {
        let fallback = "Failed to create table";
        let table_name = self.checked(required(table_name, "Table name is required"), fallback)?;
        let columns = self.checked(lock(&self.columns_form).collect(), fallback)?;

        let payload = self.checked(
            self.gateway
                .structure(StructureAction::CreateTable {
                    table_name: table_name.clone(),
                    columns,
                })
                .await,
            fallback,
        )?;
        info!(table = %table_name, "Table created");

        self.surface.hide_dialog(Dialog::CreateTable);
        {
            let mut form = lock(&self.columns_form);
            form.reset();
            self.surface
                .render(Region::ColumnsForm, render::column_groups(&form));
        }
        self.apply_structure_change(payload).await;
        Ok(())
    }

    pub async fn drop_table(&self, table: &str) -> Result<()> {
        let question = format!(
            "Are you sure you want to drop table \"{}\"? This cannot be undone.",
            table
        );
        if !self.surface.confirm(&question) {
            return Ok(());
        }

        let payload = self.checked(
            self.gateway
                .structure(StructureAction::DropTable {
                    table_name: table.to_string(),
                })
                .await,
            "Failed to drop table",
        )?;
        info!(table = %table, "Table dropped");

        self.apply_structure_change(payload).await;

        if self.store.forget_table(table) {
            self.surface
                .render(Region::TableView, render::table_view_placeholder());
            lock(&self.add_row_form).take();
            lock(&self.row_editor).take();
        }
        Ok(())
    }

    /// `ALTER TABLE ... ADD COLUMN` through `/structure`.
    pub async fn add_table_column(
        &self,
        table: &str,
        column_name: &str,
        column_type: ColumnType,
    ) -> Result<()> {
        let fallback = "Failed to add column";
        let table = self.checked(required(table, "Table name is required"), fallback)?;
        let column_name = self.checked(required(column_name, "Column name is required"), fallback)?;

        let payload = self.checked(
            self.gateway
                .structure(StructureAction::AddColumn {
                    table_name: table.clone(),
                    column_name,
                    column_type,
                })
                .await,
            fallback,
        )?;

        self.apply_structure_change(payload).await;
        if self.store.current_table().as_deref() == Some(table.as_str()) {
            self.view_table(&table).await?;
        }
        Ok(())
    }

    // ---- create index ----

    /// Choose the table of the index form and offer its columns.
    pub async fn select_index_table(&self, table: Option<&str>) -> Result<()> {
        let table = table.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string);

        {
            let mut form = lock(&self.index_form);
            form.table = table.clone();
            form.choices = None;
            if table.is_none() {
                self.surface.render(
                    Region::IndexColumnsForm,
                    render::index_column_groups(&form.columns, None),
                );
                return Ok(());
            }
        }
        let Some(table) = table else {
            return Ok(());
        };

        let payload = self.checked(
            self.gateway.fetch_table(&table, Page::first(1)).await,
            "Failed to load table columns",
        )?;
        let choices: Vec<String> = payload.columns.into_iter().map(|c| c.name).collect();

        let mut form = lock(&self.index_form);
        if form.table.as_deref() != Some(table.as_str()) {
            debug!(table = %table, "Index table changed while loading columns");
            return Ok(());
        }
        form.choices = Some(choices);
        form.normalize();
        self.surface.render(
            Region::IndexColumnsForm,
            render::index_column_groups(&form.columns, form.choices.as_deref()),
        );
        Ok(())
    }

    pub fn add_index_column_row(&self) -> GroupId {
        let mut form = lock(&self.index_form);
        let id = form.columns.add_row();
        form.normalize();
        self.surface.render(
            Region::IndexColumnsForm,
            render::index_column_groups(&form.columns, form.choices.as_deref()),
        );
        id
    }

    pub fn remove_index_column_row(&self, group: GroupId) -> bool {
        let mut form = lock(&self.index_form);
        let removed = form.columns.remove(group);
        if removed {
            self.surface.render(
                Region::IndexColumnsForm,
                render::index_column_groups(&form.columns, form.choices.as_deref()),
            );
        }
        removed
    }

    /// Mirror the picker of one index column group.
    pub fn update_index_column(&self, group: GroupId, column: &str) -> bool {
        match lock(&self.index_form).columns.group_mut(group) {
            Some(g) => {
                g.column = Some(column.to_string());
                true
            }
            None => false,
        }
    }

    pub async fn create_index(&self, index_name: &str, unique: bool) -> Result<()> {
        let fallback = "Failed to create index";
        let index_name = self.checked(required(index_name, "Index name is required"), fallback)?;

        let (table_name, columns) = {
            let form = lock(&self.index_form);
            let table = form.table.clone();
            let columns = form.columns.collect();
            (table, columns)
        };
        let table_name = self.checked(
            table_name.ok_or_else(|| Error::validation("Table is required")),
            fallback,
        )?;
        let columns = self.checked(columns, fallback)?;

        let payload = self.checked(
            self.gateway
                .structure(StructureAction::CreateIndex {
                    index_name: index_name.clone(),
                    table_name: table_name.clone(),
                    columns,
                    unique,
                })
                .await,
            fallback,
        )?;
        info!(index = %index_name, table = %table_name, unique, "Index created");

        self.surface.hide_dialog(Dialog::CreateIndex);
        {
            let mut form = lock(&self.index_form);
            form.columns.reset();
            form.normalize();
            self.surface.render(
                Region::IndexColumnsForm,
                render::index_column_groups(&form.columns, form.choices.as_deref()),
            );
        }
        self.apply_structure_change(payload).await;
        Ok(())
    }

    pub async fn drop_index(&self, index: &str) -> Result<()> {
        let question = format!(
            "Are you sure you want to drop index \"{}\"? This cannot be undone.",
            index
        );
        if !self.surface.confirm(&question) {
            return Ok(());
        }

        let payload = self.checked(
            self.gateway
                .structure(StructureAction::DropIndex {
                    index_name: index.to_string(),
                })
                .await,
            "Failed to drop index",
        )?;
        info!(index = %index, "Index dropped");

        self.apply_structure_change(payload).await;
        Ok(())
    }

    // ---- rows ----

    /// Open the add-row dialog for the current table. Returns `false` when no
    /// table is shown.
    pub fn show_add_row(&self) -> bool {
        let Some(form) = RowForm::for_insert(&self.store.get()) else {
            return false;
        };
        self.surface.render(Region::AddRowForm, render::row_form(&form));
        *lock(&self.add_row_form) = Some(form);
        self.surface.show_dialog(Dialog::AddRow);
        true
    }

    pub fn set_add_row_value(&self, column: &str, text: &str) -> bool {
        lock(&self.add_row_form)
            .as_mut()
            .is_some_and(|form| form.set_value(column, text))
    }

    /// Insert the add-row form's values and reload the table.
    pub async fn submit_add_row(&self) -> Result<()> {
        let Some((form, action)) = self
            .add_row_form()
            .and_then(|form| form.submission().map(|action| (form, action)))
        else {
            return Ok(());
        };

        self.checked(
            self.gateway.modify_data(action).await,
            "Failed to add row",
        )?;
        info!(table = %form.table, "Row inserted");

        lock(&self.add_row_form).take();
        self.surface.hide_dialog(Dialog::AddRow);
        self.view_table(&form.table).await
    }

    /// Open the editor for `rows[row_id]`. A row id that no longer resolves
    /// is ignored.
    pub fn edit_row(&self, row_id: RowId) -> Result<()> {
        let state = self.store.get();
        let Some(form) = self.checked(RowForm::for_edit(&state, row_id), "Failed to edit row")?
        else {
            debug!(row_id, "Edit of unknown row ignored");
            return Ok(());
        };

        self.surface.render(Region::EditRowForm, render::row_form(&form));
        *lock(&self.row_editor) = Some(form);
        self.surface.show_dialog(Dialog::EditRow);
        Ok(())
    }

    pub fn set_edit_row_value(&self, column: &str, text: &str) -> bool {
        lock(&self.row_editor)
            .as_mut()
            .is_some_and(|form| form.set_value(column, text))
    }

    /// Apply several field edits at once.
    pub fn set_edit_row_values(&self, values: &BTreeMap<String, String>) -> usize {
        values
            .iter()
            .filter(|(column, text)| self.set_edit_row_value(column, text))
            .count()
    }

    /// Send the editor's changes and reload the table.
    pub async fn submit_edit_row(&self) -> Result<()> {
        let Some(form) = self.row_editor() else {
            return Ok(());
        };
        let Some(action) = form.submission() else {
            debug!(table = %form.table, "Row edit changed nothing");
            lock(&self.row_editor).take();
            self.surface.hide_dialog(Dialog::EditRow);
            return Ok(());
        };

        self.checked(
            self.gateway.modify_data(action).await,
            "Failed to update row",
        )?;
        info!(table = %form.table, "Row updated");

        lock(&self.row_editor).take();
        self.surface.hide_dialog(Dialog::EditRow);
        self.view_table(&form.table).await
    }

    /// Delete `rows[row_id]` by primary key after confirmation, then reload.
    pub async fn delete_row(&self, row_id: RowId) -> Result<()> {
        let state = self.store.get();
        let Some(action) =
            self.checked(delete_request(&state, row_id), "Failed to delete row")?
        else {
            debug!(row_id, "Delete of unknown row ignored");
            return Ok(());
        };

        if !self
            .surface
            .confirm("Are you sure you want to delete this row? This cannot be undone.")
        {
            return Ok(());
        }

        let table = action.table_name().to_string();
        self.checked(
            self.gateway.modify_data(action).await,
            "Failed to delete row",
        )?;
        info!(table = %table, row_id, "Row deleted");

        self.view_table(&table).await
    }

    // ---- events ----

    pub async fn dispatch(&self, action: Action) -> Result<()> {
        debug!(?action, "Dispatching");
        match action {
            Action::ViewTable { table } => self.view_table(&table).await,
            Action::SelectTable { table } => self.select_table(&table).await,
            Action::DropTable { table } => self.drop_table(&table).await,
            Action::DropIndex { index } => self.drop_index(&index).await,
            Action::RemoveColumn { group } => {
                self.remove_column_row(group);
                Ok(())
            }
            Action::RemoveIndexColumn { group } => {
                self.remove_index_column_row(group);
                Ok(())
            }
            Action::EditRow { row_id } => self.edit_row(row_id),
            Action::DeleteRow { row_id } => self.delete_row(row_id).await,
            Action::ExportTable { table, format } => self.export_table(&table, format),
        }
    }

    /// Decode and run a click. Returns whether the click meant anything.
    pub async fn handle_event(&self, listener: Listener, event: &UiEvent) -> Result<bool> {
        match decode(listener, event) {
            Some(action) => self.dispatch(action).await.map(|()| true),
            None => Ok(false),
        }
    }
}
