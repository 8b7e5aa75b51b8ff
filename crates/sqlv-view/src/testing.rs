//! Shared test utilities for console testing
//!
//! [`RecordingSurface`] captures everything the console shows the user and
//! [`MockGateway`] is a small in-memory backend that records each request.
//! Both are used by this crate's unit tests and by workspace integration tests.

use async_trait::async_trait;
use sqlv_core::{
    CellValue, ColumnMeta, DatabasePayload, Error, ExportFormat, IndexSummary, Page, Result,
    Row, StructurePayload, TablePayload, TableSummary,
};
use sqlv_gateway::{DataAction, RemoteGateway, RowCondition, StructureAction};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

use crate::surface::{Dialog, Panel, Region, Surface};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Surface that records renders, alerts, confirmations and navigations.
pub struct RecordingSurface {
    regions: Mutex<HashMap<Region, String>>,
    render_count: Mutex<HashMap<Region, usize>>,
    alerts: Mutex<Vec<String>>,
    confirms: Mutex<Vec<String>>,
    navigations: Mutex<Vec<String>>,
    panels: Mutex<Vec<Panel>>,
    open_dialogs: Mutex<Vec<Dialog>>,
    confirm_answer: AtomicBool,
}

impl RecordingSurface {
    /// Create a surface that answers every confirmation with "yes"
    pub fn new() -> Self {
        Self {
            regions: Mutex::new(HashMap::new()),
            render_count: Mutex::new(HashMap::new()),
            alerts: Mutex::new(Vec::new()),
            confirms: Mutex::new(Vec::new()),
            navigations: Mutex::new(Vec::new()),
            panels: Mutex::new(Vec::new()),
            open_dialogs: Mutex::new(Vec::new()),
            confirm_answer: AtomicBool::new(true),
        }
    }

    pub fn set_confirm(&self, answer: bool) {
        self.confirm_answer.store(answer, Ordering::SeqCst);
    }

    pub fn region(&self, region: Region) -> Option<String> {
        lock(&self.regions).get(&region).cloned()
    }

    pub fn render_count(&self, region: Region) -> usize {
        lock(&self.render_count).get(&region).copied().unwrap_or(0)
    }

    pub fn alerts(&self) -> Vec<String> {
        lock(&self.alerts).clone()
    }

    pub fn last_alert(&self) -> Option<String> {
        lock(&self.alerts).last().cloned()
    }

    pub fn confirms(&self) -> Vec<String> {
        lock(&self.confirms).clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        lock(&self.navigations).clone()
    }

    pub fn panels(&self) -> Vec<Panel> {
        lock(&self.panels).clone()
    }

    pub fn is_dialog_open(&self, dialog: Dialog) -> bool {
        lock(&self.open_dialogs).contains(&dialog)
    }
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for RecordingSurface {
    fn render(&self, region: Region, content: String) {
        lock(&self.regions).insert(region, content);
        *lock(&self.render_count).entry(region).or_insert(0) += 1;
    }

    fn alert(&self, message: &str) {
        lock(&self.alerts).push(message.to_string());
    }

    fn confirm(&self, message: &str) -> bool {
        lock(&self.confirms).push(message.to_string());
        self.confirm_answer.load(Ordering::SeqCst)
    }

    fn navigate(&self, url: &str) {
        lock(&self.navigations).push(url.to_string());
    }

    fn show_panel(&self, panel: Panel) {
        lock(&self.panels).push(panel);
    }

    fn show_dialog(&self, dialog: Dialog) {
        let mut dialogs = lock(&self.open_dialogs);
        if !dialogs.contains(&dialog) {
            dialogs.push(dialog);
        }
    }

    fn hide_dialog(&self, dialog: Dialog) {
        lock(&self.open_dialogs).retain(|d| *d != dialog);
    }
}

/// A request as the mock backend received it.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    OpenDatabase(String),
    CreateDatabase(String),
    FetchTable(String),
    ExecuteQuery(String),
    GenerateSql(String, Option<String>),
    Structure(StructureAction),
    Data(DataAction),
}

#[derive(Default)]
struct Backend {
    tables: BTreeMap<String, TablePayload>,
    indexes: Vec<IndexSummary>,
    query_results: Vec<Row>,
    generated_sql: String,
}

/// In-memory backend behind the [`RemoteGateway`] trait.
///
/// Tables keep insertion-independent (sorted) order like `sqlite_master`
/// listings. Row conditions of the form `a = ? AND b = ?` are evaluated by
/// value equality.
pub struct MockGateway {
    backend: Mutex<Backend>,
    requests: Mutex<Vec<Recorded>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    failure: Mutex<Option<Error>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            backend: Mutex::new(Backend {
                generated_sql: "SELECT 1;".to_string(),
                ..Backend::default()
            }),
            requests: Mutex::new(Vec::new()),
            gates: Mutex::new(HashMap::new()),
            failure: Mutex::new(None),
        }
    }

    /// Add a table with the given columns and rows.
    pub fn with_table(self, name: &str, columns: Vec<ColumnMeta>, rows: Vec<Row>) -> Self {
        let schema = format!(
            "CREATE TABLE {} ({})",
            name,
            columns
                .iter()
                .map(|c| format!("{} {}", c.name, c.col_type))
                .collect::<Vec<_>>()
                .join(", ")
        );
        lock(&self.backend).tables.insert(
            name.to_string(),
            TablePayload {
                table_name: Some(name.to_string()),
                columns,
                data: rows,
                schema,
            },
        );
        self
    }

    pub fn with_index(self, name: &str, table: &str, definition: &str) -> Self {
        lock(&self.backend).indexes.push(IndexSummary {
            name: name.to_string(),
            table_name: table.to_string(),
            definition_text: definition.to_string(),
        });
        self
    }

    pub fn with_query_results(self, rows: Vec<Row>) -> Self {
        lock(&self.backend).query_results = rows;
        self
    }

    pub fn with_generated_sql(self, query: &str) -> Self {
        lock(&self.backend).generated_sql = query.to_string();
        self
    }

    /// Hold `fetch_table(table)` until the returned handle is notified.
    pub fn gate(&self, table: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        lock(&self.gates).insert(table.to_string(), notify.clone());
        notify
    }

    /// Make the next request fail with `error`.
    ///
    /// A gated `fetch_table` picks the failure up once it is released.
    pub fn fail_next(&self, error: Error) {
        *lock(&self.failure) = Some(error);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn rows(&self, table: &str) -> Option<Vec<Row>> {
        lock(&self.backend).tables.get(table).map(|t| t.data.clone())
    }

    fn record(&self, request: Recorded) -> Result<()> {
        self.log(request);
        self.take_failure()
    }

    fn log(&self, request: Recorded) {
        lock(&self.requests).push(request);
    }

    fn take_failure(&self) -> Result<()> {
        match lock(&self.failure).take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn table_names(backend: &Backend) -> Vec<TableSummary> {
        backend.tables.keys().map(TableSummary::new).collect()
    }

    fn catalog(backend: &Backend) -> StructurePayload {
        StructurePayload {
            tables: Some(Self::table_names(backend)),
            indexes: Some(backend.indexes.clone()),
        }
    }

    fn matches(row: &Row, condition: &RowCondition) -> bool {
        let columns: Vec<String> = condition
            .clause
            .split(" AND ")
            .filter_map(|part| part.trim().strip_suffix("= ?"))
            .map(|column| {
                let column = column.trim();
                match column.strip_prefix('"').and_then(|c| c.strip_suffix('"')) {
                    Some(quoted) => quoted.replace("\"\"", "\""),
                    None => column.to_string(),
                }
            })
            .collect();

        columns.len() == condition.params.len()
            && columns
                .iter()
                .zip(&condition.params)
                .all(|(column, param)| row.value(column) == param)
    }

    fn no_such_table(name: &str) -> Error {
        Error::server(format!("no such table: {}", name))
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteGateway for MockGateway {
    async fn open_database(&self, file_name: &str, _contents: Vec<u8>) -> Result<DatabasePayload> {
        self.record(Recorded::OpenDatabase(file_name.to_string()))?;
        let backend = lock(&self.backend);
        Ok(DatabasePayload {
            db_path: format!("/data/{}", file_name),
            tables: Self::table_names(&backend),
        })
    }

    async fn create_database(&self, db_name: &str) -> Result<DatabasePayload> {
        self.record(Recorded::CreateDatabase(db_name.to_string()))?;
        let mut backend = lock(&self.backend);
        backend.tables.clear();
        backend.indexes.clear();
        Ok(DatabasePayload {
            db_path: format!("/data/{}", db_name),
            tables: Vec::new(),
        })
    }

    async fn fetch_table(&self, table: &str, page: Page) -> Result<TablePayload> {
        self.log(Recorded::FetchTable(table.to_string()));

        let gate = lock(&self.gates).get(table).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.take_failure()?;

        let backend = lock(&self.backend);
        let mut payload = backend
            .tables
            .get(table)
            .cloned()
            .ok_or_else(|| Self::no_such_table(table))?;
        payload.data = payload
            .data
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect();
        Ok(payload)
    }

    async fn execute_query(&self, query: &str) -> Result<Vec<Row>> {
        self.record(Recorded::ExecuteQuery(query.to_string()))?;
        Ok(lock(&self.backend).query_results.clone())
    }

    async fn generate_sql(&self, prompt: &str, table_name: Option<&str>) -> Result<String> {
        self.record(Recorded::GenerateSql(
            prompt.to_string(),
            table_name.map(str::to_string),
        ))?;
        Ok(lock(&self.backend).generated_sql.clone())
    }

    async fn structure(&self, action: StructureAction) -> Result<StructurePayload> {
        self.record(Recorded::Structure(action.clone()))?;
        let mut backend = lock(&self.backend);

        match action {
            StructureAction::CreateTable {
                table_name,
                columns,
            } => {
                if backend.tables.contains_key(&table_name) {
                    return Err(Error::server(format!("table {} already exists", table_name)));
                }
                let columns: Vec<ColumnMeta> = columns
                    .iter()
                    .map(|c| ColumnMeta::new(c.name.clone(), c.col_type.as_str()))
                    .collect();
                backend.tables.insert(
                    table_name.clone(),
                    TablePayload {
                        table_name: Some(table_name),
                        columns,
                        data: Vec::new(),
                        schema: String::new(),
                    },
                );
            }
            StructureAction::DropTable { table_name } => {
                if backend.tables.remove(&table_name).is_none() {
                    return Err(Self::no_such_table(&table_name));
                }
                backend.indexes.retain(|i| i.table_name != table_name);
            }
            StructureAction::AddColumn {
                table_name,
                column_name,
                column_type,
            } => {
                let table = backend
                    .tables
                    .get_mut(&table_name)
                    .ok_or_else(|| Self::no_such_table(&table_name))?;
                table
                    .columns
                    .push(ColumnMeta::new(column_name.clone(), column_type.as_str()));
                for row in &mut table.data {
                    row.insert(column_name.clone(), CellValue::Null);
                }
            }
            StructureAction::GetIndexes => {
                return Ok(StructurePayload {
                    tables: None,
                    indexes: Some(backend.indexes.clone()),
                });
            }
            StructureAction::CreateIndex {
                index_name,
                table_name,
                columns,
                unique,
            } => {
                let definition = format!(
                    "CREATE {}INDEX {} ON {} ({})",
                    if unique { "UNIQUE " } else { "" },
                    index_name,
                    table_name,
                    columns.join(", ")
                );
                backend.indexes.push(IndexSummary {
                    name: index_name,
                    table_name,
                    definition_text: definition,
                });
            }
            StructureAction::DropIndex { index_name } => {
                let before = backend.indexes.len();
                backend.indexes.retain(|i| i.name != index_name);
                if backend.indexes.len() == before {
                    return Err(Error::server(format!("no such index: {}", index_name)));
                }
            }
        }

        Ok(Self::catalog(&backend))
    }

    async fn modify_data(&self, action: DataAction) -> Result<()> {
        self.record(Recorded::Data(action.clone()))?;
        let mut backend = lock(&self.backend);
        let table = backend
            .tables
            .get_mut(action.table_name())
            .ok_or_else(|| Self::no_such_table(action.table_name()))?;

        match action {
            DataAction::Insert { data, .. } => table.data.push(data),
            DataAction::Update {
                data, condition, ..
            } => {
                for row in table.data.iter_mut().filter(|r| Self::matches(r, &condition)) {
                    for (column, value) in data.iter() {
                        row.insert(column, value.clone());
                    }
                }
            }
            DataAction::Delete { condition, .. } => {
                table.data.retain(|r| !Self::matches(r, &condition));
            }
        }

        Ok(())
    }

    fn export_url(&self, format: ExportFormat, table: &str) -> Result<String> {
        Ok(format!("/export/{}/{}", format, table))
    }
}
