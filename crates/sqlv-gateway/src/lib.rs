//! Remote gateway for the console backend
//!
//! One async method per backend endpoint. Implementations normalize request
//! encoding (form-urlencoded or multipart) and the uniform `{"error": ...}`
//! failure envelope, so callers only ever see typed payloads or a
//! [`sqlv_core::Error`].

mod envelope;
mod http;
mod requests;

pub use envelope::decode_envelope;
pub use http::HttpGateway;
pub use requests::{DataAction, RowCondition, StructureAction};

use async_trait::async_trait;
use sqlv_core::{
    DatabasePayload, ExportFormat, Page, Result, Row, StructurePayload, TablePayload,
};

/// Backend endpoints consumed by the console.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// `POST /open_db` with the database file as multipart `db_file`.
    async fn open_database(&self, file_name: &str, contents: Vec<u8>) -> Result<DatabasePayload>;

    /// `POST /create_db`
    async fn create_database(&self, db_name: &str) -> Result<DatabasePayload>;

    /// `GET /table/{name}?limit=&offset=`
    async fn fetch_table(&self, table: &str, page: Page) -> Result<TablePayload>;

    /// `POST /execute_query`
    async fn execute_query(&self, query: &str) -> Result<Vec<Row>>;

    /// `POST /generate_sql`; returns the generated statement.
    async fn generate_sql(&self, prompt: &str, table_name: Option<&str>) -> Result<String>;

    /// `POST /structure`
    async fn structure(&self, action: StructureAction) -> Result<StructurePayload>;

    /// `POST /data`
    async fn modify_data(&self, action: DataAction) -> Result<()>;

    /// Download location for `GET /export/{format}/{table}`. Hosts navigate to
    /// it rather than fetching it.
    fn export_url(&self, format: ExportFormat, table: &str) -> Result<String>;
}
