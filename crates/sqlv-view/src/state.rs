//! The cached table view and the rules for replacing it.

use sqlv_core::{ColumnMeta, LoadOrdering, Page, Result, Row, RowId, TablePayload};
use sqlv_gateway::RemoteGateway;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Snapshot of the displayed table.
///
/// Never edited in place: every applied load builds a new one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub current_table: Option<String>,
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Row>,
    pub schema_text: Option<String>,
}

impl ViewState {
    pub fn from_payload(table: &str, payload: TablePayload) -> Self {
        let schema_text = Some(payload.schema).filter(|s| !s.trim().is_empty());
        Self {
            current_table: Some(table.to_string()),
            columns: payload.columns,
            rows: payload.data,
            schema_text,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current_table.is_none()
    }

    /// Row addressed by `row_id`, if a table is shown and the index is in range.
    pub fn row(&self, row_id: RowId) -> Option<&Row> {
        self.current_table.as_ref()?;
        self.rows.get(row_id)
    }

    /// Primary-key columns ordered by key position.
    pub fn primary_key_columns(&self) -> Vec<&ColumnMeta> {
        let mut keys: Vec<&ColumnMeta> =
            self.columns.iter().filter(|c| c.is_primary_key()).collect();
        keys.sort_by_key(|c| c.pk);
        keys
    }
}

/// Result of resolving a load.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// The payload replaced the view.
    Applied(Arc<ViewState>),
    /// A newer request or an invalidation made this one irrelevant.
    Superseded,
}

impl LoadOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, LoadOutcome::Applied(_))
    }
}

/// Handle for an in-flight load, issued by [`ViewStateStore::begin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    id: u64,
    epoch: u64,
    table: String,
}

impl LoadTicket {
    pub fn table(&self) -> &str {
        &self.table
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    state: Arc<ViewState>,
    next_ticket: u64,
    latest_request: Option<String>,
    epoch: u64,
    /// Dropped table -> last ticket issued before the drop.
    dropped: HashMap<String, u64>,
}

/// Owner of the current [`ViewState`].
///
/// Holds an `Arc` snapshot behind an `RwLock`. The lock is never held across
/// an await: fetching happens between [`begin`](Self::begin) and
/// [`commit`](Self::commit).
#[derive(Debug)]
pub struct ViewStateStore {
    inner: RwLock<StoreInner>,
    ordering: LoadOrdering,
    page: Page,
}

impl ViewStateStore {
    pub fn new() -> Self {
        Self::with_ordering(LoadOrdering::default())
    }

    pub fn with_ordering(ordering: LoadOrdering) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            ordering,
            page: Page::default(),
        }
    }

    /// Set the row window requested by [`load`](Self::load).
    pub fn with_page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }

    pub fn ordering(&self) -> LoadOrdering {
        self.ordering
    }

    pub fn page(&self) -> Page {
        self.page
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current snapshot.
    pub fn get(&self) -> Arc<ViewState> {
        self.read().state.clone()
    }

    /// Table of the current snapshot.
    pub fn current_table(&self) -> Option<String> {
        self.read().state.current_table.clone()
    }

    /// Register a load of `table`. It becomes the most recently requested table.
    pub fn begin(&self, table: &str) -> LoadTicket {
        let mut inner = self.write();
        inner.next_ticket += 1;
        inner.latest_request = Some(table.to_string());
        LoadTicket {
            id: inner.next_ticket,
            epoch: inner.epoch,
            table: table.to_string(),
        }
    }

    fn is_stale(&self, inner: &StoreInner, ticket: &LoadTicket) -> bool {
        if ticket.epoch != inner.epoch {
            return true;
        }
        if inner
            .dropped
            .get(&ticket.table)
            .is_some_and(|&cutoff| ticket.id <= cutoff)
        {
            return true;
        }
        match self.ordering {
            LoadOrdering::Completion => false,
            LoadOrdering::Selection => {
                inner.latest_request.as_deref() != Some(ticket.table.as_str())
            }
        }
    }

    /// Apply a resolved payload for `ticket`, or discard it if it is stale.
    pub fn commit(&self, ticket: &LoadTicket, payload: TablePayload) -> LoadOutcome {
        let mut inner = self.write();

        if self.is_stale(&inner, ticket) {
            warn!(
                table = %ticket.table,
                ticket = ticket.id,
                "Discarding superseded table load"
            );
            return LoadOutcome::Superseded;
        }

        let state = Arc::new(ViewState::from_payload(&ticket.table, payload));
        inner.state = state.clone();

        info!(
            table = %ticket.table,
            rows = state.rows.len(),
            columns = state.columns.len(),
            "Applied table load"
        );
        LoadOutcome::Applied(state)
    }

    /// Fetch `table` through `gateway` and apply it under the ordering policy.
    ///
    /// A failure of a load that has since been superseded is reported as
    /// [`LoadOutcome::Superseded`]. A failure of a live load is returned and
    /// leaves the state untouched.
    pub async fn load(&self, gateway: &dyn RemoteGateway, table: &str) -> Result<LoadOutcome> {
        let ticket = self.begin(table);
        debug!(table = %table, ticket = ticket.id, "Loading table");

        match gateway.fetch_table(table, self.page).await {
            Ok(payload) => Ok(self.commit(&ticket, payload)),
            Err(e) => {
                if self.is_stale(&self.read(), &ticket) {
                    warn!(table = %table, error = %e, "Superseded table load failed");
                    Ok(LoadOutcome::Superseded)
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Forget a dropped table. Its loads begun before this call are discarded
    /// when they resolve, and the view is cleared if it shows the table.
    ///
    /// Returns whether the view was cleared.
    pub fn forget_table(&self, table: &str) -> bool {
        let mut inner = self.write();
        let cutoff = inner.next_ticket;
        inner.dropped.insert(table.to_string(), cutoff);
        if inner.latest_request.as_deref() == Some(table) {
            inner.latest_request = None;
        }

        let shown = inner.state.current_table.as_deref() == Some(table);
        if shown {
            inner.state = Arc::new(ViewState::default());
        }
        info!(table = %table, cleared = shown, "Table forgotten");
        shown
    }

    /// Clear the view. Loads begun before this call are discarded when they resolve.
    pub fn invalidate(&self) {
        let mut inner = self.write();
        inner.epoch += 1;
        inner.latest_request = None;
        inner.state = Arc::new(ViewState::default());
        info!(epoch = inner.epoch, "View state invalidated");
    }
}

impl Default for ViewStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGateway;
    use sqlv_core::{CellValue, Error};

    fn gateway() -> MockGateway {
        MockGateway::new()
            .with_table(
                "slow",
                vec![ColumnMeta::new("id", "INTEGER").primary_key(1)],
                vec![Row::new().with("id", 1)],
            )
            .with_table(
                "fast",
                vec![
                    ColumnMeta::new("id", "INTEGER").primary_key(1),
                    ColumnMeta::new("name", "TEXT"),
                ],
                vec![
                    Row::new().with("id", 1).with("name", "Ann"),
                    Row::new().with("id", 2).with("name", "Bo"),
                ],
            )
    }

    #[tokio::test]
    async fn test_load_replaces_state() {
        let gateway = gateway();
        let store = ViewStateStore::new();

        let outcome = store.load(&gateway, "fast").await.unwrap();
        assert!(outcome.is_applied());

        let state = store.get();
        assert_eq!(state.current_table.as_deref(), Some("fast"));
        assert_eq!(state.columns.len(), 2);
        assert_eq!(state.rows.len(), 2);
        assert_eq!(state.row(1).unwrap().value("name"), &CellValue::text("Bo"));
        assert!(state.row(2).is_none());
    }

    #[tokio::test]
    async fn test_completion_order_last_resolved_wins() {
        let gateway = gateway();
        let store = ViewStateStore::with_ordering(LoadOrdering::Completion);
        let gate = gateway.gate("slow");

        let slow = store.load(&gateway, "slow");
        let fast = async {
            let outcome = store.load(&gateway, "fast").await;
            gate.notify_one();
            outcome
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert!(fast.unwrap().is_applied());
        assert!(slow.unwrap().is_applied());

        let state = store.get();
        assert_eq!(state.current_table.as_deref(), Some("slow"));
        assert_eq!(state.rows, vec![Row::new().with("id", 1)]);
    }

    #[tokio::test]
    async fn test_selection_order_discards_older_request() {
        let gateway = gateway();
        let store = ViewStateStore::with_ordering(LoadOrdering::Selection);
        let gate = gateway.gate("slow");

        let slow = store.load(&gateway, "slow");
        let fast = async {
            let outcome = store.load(&gateway, "fast").await;
            gate.notify_one();
            outcome
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert!(fast.unwrap().is_applied());
        assert!(matches!(slow.unwrap(), LoadOutcome::Superseded));

        let state = store.get();
        assert_eq!(state.current_table.as_deref(), Some("fast"));
        assert_eq!(state.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_discards_in_flight_load() {
        let gateway = gateway();
        let store = ViewStateStore::new();
        let gate = gateway.gate("slow");

        let load = store.load(&gateway, "slow");
        let drop_table = async {
            store.invalidate();
            gate.notify_one();
        };
        let (outcome, ()) = tokio::join!(load, drop_table);

        assert!(matches!(outcome.unwrap(), LoadOutcome::Superseded));
        assert!(store.get().is_empty());
    }

    #[tokio::test]
    async fn test_forgotten_table_load_is_discarded() {
        let gateway = gateway();
        let store = ViewStateStore::with_ordering(LoadOrdering::Completion);
        store.load(&gateway, "fast").await.unwrap();
        let gate = gateway.gate("slow");

        let load = store.load(&gateway, "slow");
        let drop_table = async {
            assert!(!store.forget_table("slow"));
            gate.notify_one();
        };
        let (outcome, ()) = tokio::join!(load, drop_table);

        assert!(matches!(outcome.unwrap(), LoadOutcome::Superseded));
        assert_eq!(store.current_table().as_deref(), Some("fast"));

        // A table created again under the same name loads normally
        gate.notify_one();
        assert!(store.load(&gateway, "slow").await.unwrap().is_applied());
        assert!(store.forget_table("slow"));
        assert!(store.get().is_empty());
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_state() {
        let gateway = gateway();
        let store = ViewStateStore::new();
        store.load(&gateway, "fast").await.unwrap();
        let before = store.get();

        gateway.fail_next(Error::server("database is locked"));
        let result = store.load(&gateway, "slow").await;

        assert!(matches!(result, Err(Error::Server(_))));
        assert_eq!(*store.get(), *before);
    }

    #[tokio::test]
    async fn test_superseded_failure_is_not_an_error() {
        let gateway = gateway();
        let store = ViewStateStore::with_ordering(LoadOrdering::Selection);
        let gate = gateway.gate("slow");

        let slow = store.load(&gateway, "slow");
        let fast = async {
            let outcome = store.load(&gateway, "fast").await;
            gateway.fail_next(Error::server("database is locked"));
            gate.notify_one();
            outcome
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert!(fast.unwrap().is_applied());
        assert!(matches!(slow.unwrap(), LoadOutcome::Superseded));
        assert_eq!(store.current_table().as_deref(), Some("fast"));
    }

    #[test]
    fn test_primary_key_columns_sorted_by_position() {
        let state = ViewState {
            current_table: Some("pairs".to_string()),
            columns: vec![
                ColumnMeta::new("b", "TEXT").primary_key(2),
                ColumnMeta::new("note", "TEXT"),
                ColumnMeta::new("a", "INTEGER").primary_key(1),
            ],
            rows: Vec::new(),
            schema_text: None,
        };

        let names: Vec<&str> = state
            .primary_key_columns()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_blank_schema_is_none() {
        let state = ViewState::from_payload(
            "t",
            TablePayload {
                table_name: None,
                columns: Vec::new(),
                data: Vec::new(),
                schema: "  ".to_string(),
            },
        );
        assert_eq!(state.schema_text, None);
        assert_eq!(state.current_table.as_deref(), Some("t"));
    }
}
