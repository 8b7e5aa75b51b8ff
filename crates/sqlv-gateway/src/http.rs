//! HTTP implementation of [`RemoteGateway`] on top of `reqwest`.

use crate::envelope::decode_envelope;
use crate::requests::{DataAction, StructureAction};
use crate::RemoteGateway;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlv_core::{
    DatabasePayload, Error, ExportFormat, GatewayConfig, GeneratedSql, Page, QueryPayload,
    Result, Row, StructurePayload, TablePayload,
};
use sqlv_telemetry::attributes::HTTP_RESPONSE_STATUS;
use sqlv_telemetry::gateway_span;
use tracing::{debug, Instrument};
use url::Url;

/// Talks to the console backend over HTTP.
///
/// No timeout is configured on the default client: a hung request simply
/// never resolves and the caller's view stays as it was.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpGateway {
    /// Create a gateway for the backend at `base_url`.
    ///
    /// # Example
    ///
    /// ```
    /// use sqlv_gateway::HttpGateway;
    ///
    /// let gateway = HttpGateway::new("http://127.0.0.1:5000")?;
    /// # Ok::<(), sqlv_core::Error>(())
    /// ```
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::config_error(format!("Invalid base URL '{}': {}", base_url, e)))?;

        if base_url.cannot_be_a_base() {
            return Err(Error::config_error(format!(
                "Base URL cannot carry a path: {}",
                base_url
            )));
        }

        Ok(Self {
            base_url,
            client: reqwest::Client::new(),
        })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        Self::new(&config.base_url)
    }

    /// Use a preconfigured client (proxies, TLS roots, cookies).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL; each segment is percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config_error(format!("Base URL cannot carry a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Execute the request and decode the envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        method: &str,
        endpoint: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<T> {
        let span = gateway_span(method, endpoint);

        async move {
            let response = builder
                .send()
                .await
                .map_err(|e| Error::transport(endpoint, e))?;
            let status = response.status();

            tracing::Span::current().record(HTTP_RESPONSE_STATUS, status.as_u16());
            debug!("Response status: {}", status);

            let bytes = response
                .bytes()
                .await
                .map_err(|e| Error::transport(endpoint, e))?;

            decode_envelope(endpoint, status, &bytes)
        }
        .instrument(span)
        .await
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        fields: &[(&'static str, String)],
    ) -> Result<T> {
        let url = self.url(&[endpoint.trim_start_matches('/')])?;
        debug!("Request URL: POST {}", url);

        let builder = self.client.post(url).form(fields);
        self.send("POST", endpoint, builder).await
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn open_database(&self, file_name: &str, contents: Vec<u8>) -> Result<DatabasePayload> {
        let url = self.url(&["open_db"])?;
        debug!(file = %file_name, bytes = contents.len(), "Uploading database file");

        let form = Form::new().part("db_file", Part::bytes(contents).file_name(file_name.to_string()));
        let builder = self.client.post(url).multipart(form);
        self.send("POST", "/open_db", builder).await
    }

    async fn create_database(&self, db_name: &str) -> Result<DatabasePayload> {
        self.post_form("/create_db", &[("db_name", db_name.to_string())])
            .await
    }

    async fn fetch_table(&self, table: &str, page: Page) -> Result<TablePayload> {
        let url = self.url(&["table", table])?;
        debug!("Request URL: GET {}", url);

        let builder = self
            .client
            .get(url)
            .query(&[("limit", page.limit), ("offset", page.offset)]);
        self.send("GET", "/table", builder).await
    }

    async fn execute_query(&self, query: &str) -> Result<Vec<Row>> {
        let payload: QueryPayload = self
            .post_form("/execute_query", &[("query", query.to_string())])
            .await?;
        Ok(payload.results)
    }

    async fn generate_sql(&self, prompt: &str, table_name: Option<&str>) -> Result<String> {
        let fields = [
            ("prompt", prompt.to_string()),
            ("table_name", table_name.unwrap_or_default().to_string()),
        ];
        let payload: GeneratedSql = self.post_form("/generate_sql", &fields).await?;
        Ok(payload.query)
    }

    async fn structure(&self, action: StructureAction) -> Result<StructurePayload> {
        debug!(action = action.name(), "Structure request");
        self.post_form("/structure", &action.form_fields()?).await
    }

    async fn modify_data(&self, action: DataAction) -> Result<()> {
        debug!(action = action.name(), table = %action.table_name(), "Data request");
        let _: Value = self.post_form("/data", &action.form_fields()?).await?;
        Ok(())
    }

    fn export_url(&self, format: ExportFormat, table: &str) -> Result<String> {
        Ok(self.url(&["export", format.as_str(), table])?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::RowCondition;
    use mockito::Matcher;
    use sqlv_core::{CellValue, ColumnSpec, ColumnType};

    const JSON: (&str, &str) = ("content-type", "application/json");

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(HttpGateway::new("not a url"), Err(Error::Config(_))));
    }

    #[test]
    fn test_export_url_encodes_table() {
        let gateway = HttpGateway::new("http://localhost:5000/console/").unwrap();
        let url = gateway.export_url(ExportFormat::Csv, "my table").unwrap();
        assert_eq!(url, "http://localhost:5000/console/export/csv/my%20table");
    }

    #[tokio::test]
    async fn test_fetch_table() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/table/users")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("limit".into(), "100".into()),
                Matcher::UrlEncoded("offset".into(), "0".into()),
            ]))
            .with_status(200)
            .with_header(JSON.0, JSON.1)
            .with_body(
                r#"{
                    "success": true,
                    "table_name": "users",
                    "columns": [
                        {"cid": 0, "name": "id", "type": "INTEGER", "notnull": 0, "dflt_value": null, "pk": 1},
                        {"cid": 1, "name": "name", "type": "TEXT", "notnull": 0, "dflt_value": null, "pk": 0}
                    ],
                    "data": [{"id": 1, "name": "Ann"}],
                    "schema": "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)"
                }"#,
            )
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url()).unwrap();
        let payload = gateway.fetch_table("users", Page::default()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(payload.columns.len(), 2);
        assert!(payload.columns[0].is_primary_key());
        assert_eq!(payload.data[0].get("name"), Some(&CellValue::text("Ann")));
    }

    #[tokio::test]
    async fn test_server_error_envelope() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/execute_query")
            .with_status(500)
            .with_header(JSON.0, JSON.1)
            .with_body(r#"{"error": "near \"SELEC\": syntax error"}"#)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url()).unwrap();
        let err = gateway.execute_query("SELEC 1").await.unwrap_err();

        assert!(matches!(err, Error::Server(ref m) if m == "near \"SELEC\": syntax error"));
    }

    #[tokio::test]
    async fn test_execute_query_sends_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/execute_query")
            .match_body(Matcher::UrlEncoded("query".into(), "SELECT * FROM users".into()))
            .with_status(200)
            .with_header(JSON.0, JSON.1)
            .with_body(r#"{"success": true, "results": [{"id": 1}, {"id": 2}]}"#)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url()).unwrap();
        let rows = gateway.execute_query("SELECT * FROM users").await.unwrap();

        mock.assert_async().await;
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_generate_sql_sends_empty_table_name() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/generate_sql")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("prompt".into(), "all users".into()),
                Matcher::UrlEncoded("table_name".into(), "".into()),
            ]))
            .with_status(200)
            .with_header(JSON.0, JSON.1)
            .with_body(r#"{"success": true, "query": "SELECT * FROM users;"}"#)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url()).unwrap();
        let query = gateway.generate_sql("all users", None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(query, "SELECT * FROM users;");
    }

    #[tokio::test]
    async fn test_structure_create_table() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/structure")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("action".into(), "create_table".into()),
                Matcher::UrlEncoded("table_name".into(), "notes".into()),
                Matcher::UrlEncoded("columns".into(), r#"[{"name":"body","type":"TEXT"}]"#.into()),
            ]))
            .with_status(200)
            .with_header(JSON.0, JSON.1)
            .with_body(r#"{"success": true, "tables": ["notes", "users"], "indexes": []}"#)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url()).unwrap();
        let payload = gateway
            .structure(StructureAction::CreateTable {
                table_name: "notes".to_string(),
                columns: vec![ColumnSpec::new("body", ColumnType::Text)],
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(payload.tables.unwrap().len(), 2);
        assert_eq!(payload.indexes, Some(vec![]));
    }

    #[tokio::test]
    async fn test_delete_row_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/data")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("action".into(), "delete".into()),
                Matcher::UrlEncoded("table_name".into(), "users".into()),
                Matcher::UrlEncoded("condition".into(), "id = ?".into()),
                Matcher::UrlEncoded("params".into(), "[1]".into()),
            ]))
            .with_status(200)
            .with_header(JSON.0, JSON.1)
            .with_body(r#"{"success": true}"#)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url()).unwrap();
        gateway
            .modify_data(DataAction::Delete {
                table_name: "users".to_string(),
                condition: RowCondition {
                    clause: "id = ?".to_string(),
                    params: vec![CellValue::Integer(1)],
                },
            })
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_open_database_uploads_multipart() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/open_db")
            .match_body(Matcher::Regex(r#"name="db_file"; filename="shop.db""#.into()))
            .with_status(200)
            .with_header(JSON.0, JSON.1)
            .with_body(r#"{"success": true, "db_path": "/data/shop.db", "tables": ["orders"]}"#)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url()).unwrap();
        let payload = gateway
            .open_database("shop.db", b"SQLite format 3\0".to_vec())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(payload.db_path, "/data/shop.db");
        assert_eq!(payload.tables[0].name, "orders");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport() {
        let gateway = HttpGateway::new("http://127.0.0.1:1").unwrap();
        let err = gateway.create_database("demo").await.unwrap_err();
        assert!(err.is_transport());
    }
}
