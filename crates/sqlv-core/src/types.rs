//! Data model shared by the gateway and the view layer

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single cell as the backend reports it.
///
/// Declared SQL types are advisory in SQLite, so a column may hold any of
/// these. `Json` catches shapes the console does not interpret so that a row
/// never fails to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Json(serde_json::Value),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Text placed in an `<input value="...">`. Null becomes the empty string.
    pub fn to_input_text(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str("NULL"),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Real(r) => write!(f, "{}", r),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Integer(i64::from(value))
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Real(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

/// Positional index into the row list of the last applied table load.
pub type RowId = usize;

/// One row keyed by column name, in the order the backend sent the keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(IndexMap<String, CellValue>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and fixtures.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        self.0.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.0.get(column)
    }

    /// Value for `column`, treating an absent key as NULL.
    pub fn value(&self, column: &str) -> &CellValue {
        static NULL: CellValue = CellValue::Null;
        self.0.get(column).unwrap_or(&NULL)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, CellValue)> for Row {
    fn from_iter<T: IntoIterator<Item = (String, CellValue)>>(iter: T) -> Self {
        Row(iter.into_iter().collect())
    }
}

/// Column metadata as returned by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    #[serde(default)]
    pub cid: Option<i64>,
    pub name: String,
    /// Declared SQL type (may be empty)
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub col_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notnull: i64,
    #[serde(default)]
    pub dflt_value: Option<String>,
    /// 1-based position within the primary key, 0 when not part of it
    #[serde(default, deserialize_with = "null_as_default")]
    pub pk: i64,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, col_type: impl Into<String>) -> Self {
        Self {
            cid: None,
            name: name.into(),
            col_type: col_type.into(),
            notnull: 0,
            dflt_value: None,
            pk: 0,
        }
    }

    /// Mark this column as the `position`-th primary key column.
    pub fn primary_key(mut self, position: i64) -> Self {
        self.pk = position;
        self
    }

    pub fn is_primary_key(&self) -> bool {
        self.pk > 0
    }

    /// `INTEGER PRIMARY KEY` columns alias the rowid and are filled in by SQLite.
    pub fn is_auto_increment(&self) -> bool {
        self.is_primary_key() && self.col_type.eq_ignore_ascii_case("INTEGER")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableSummary {
    pub name: String,
}

impl TableSummary {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub name: String,
    pub table_name: String,
    #[serde(rename = "sql", default, deserialize_with = "null_as_default")]
    pub definition_text: String,
}

/// Column types offered by the create-table form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    #[default]
    Integer,
    Text,
    Real,
    Blob,
    Numeric,
}

impl ColumnType {
    pub const ALL: [ColumnType; 5] = [
        ColumnType::Integer,
        ColumnType::Text,
        ColumnType::Real,
        ColumnType::Blob,
        ColumnType::Numeric,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
            ColumnType::Real => "REAL",
            ColumnType::Blob => "BLOB",
            ColumnType::Numeric => "NUMERIC",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown column type: {}", s))
    }
}

/// A column definition sent with `create_table`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub col_type: ColumnType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, col_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            col_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("Invalid export format: {}", other)),
        }
    }
}

/// Row window requested from `/table/{name}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub fn first(limit: u32) -> Self {
        Self { limit, offset: 0 }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::first(100)
    }
}

/// Response of `/open_db` and `/create_db`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabasePayload {
    pub db_path: String,
    #[serde(default)]
    pub tables: Vec<TableSummary>,
}

/// Response of `/table/{name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePayload {
    #[serde(default)]
    pub table_name: Option<String>,
    pub columns: Vec<ColumnMeta>,
    #[serde(default)]
    pub data: Vec<Row>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub schema: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPayload {
    #[serde(default)]
    pub results: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSql {
    pub query: String,
}

/// Response of `/structure`; each action fills in what it knows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructurePayload {
    #[serde(default)]
    pub tables: Option<Vec<TableSummary>>,
    #[serde(default)]
    pub indexes: Option<Vec<IndexSummary>>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_value_decoding() {
        let row: Row = serde_json::from_value(json!({
            "id": 1,
            "score": 2.5,
            "name": "Ann",
            "note": null
        }))
        .unwrap();

        assert_eq!(row.get("id"), Some(&CellValue::Integer(1)));
        assert_eq!(row.get("score"), Some(&CellValue::Real(2.5)));
        assert_eq!(row.get("name"), Some(&CellValue::text("Ann")));
        assert_eq!(row.get("note"), Some(&CellValue::Null));
    }

    #[test]
    fn test_row_preserves_key_order() {
        let row: Row = serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        let names: Vec<&str> = row.column_names().collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_null_input_text_is_empty() {
        assert_eq!(CellValue::Null.to_input_text(), "");
        assert_eq!(CellValue::text("").to_input_text(), "");
        assert_eq!(CellValue::Integer(7).to_input_text(), "7");
    }

    #[test]
    fn test_missing_cell_reads_as_null() {
        let row = Row::new().with("id", 1);
        assert!(row.value("name").is_null());
    }

    #[test]
    fn test_column_meta_from_pragma_row() {
        let col: ColumnMeta = serde_json::from_value(json!({
            "cid": 0,
            "name": "id",
            "type": "INTEGER",
            "notnull": 0,
            "dflt_value": null,
            "pk": 1
        }))
        .unwrap();

        assert!(col.is_primary_key());
        assert!(col.is_auto_increment());
        assert_eq!(col.col_type, "INTEGER");
    }

    #[test]
    fn test_table_payload_tolerates_null_schema() {
        let payload: TablePayload = serde_json::from_value(json!({
            "columns": [{"name": "id", "type": "INTEGER", "pk": 1}],
            "data": [],
            "schema": null
        }))
        .unwrap();

        assert_eq!(payload.schema, "");
        assert_eq!(payload.columns.len(), 1);
    }

    #[test]
    fn test_index_summary_reads_sql_field() {
        let index: IndexSummary = serde_json::from_value(json!({
            "name": "idx_users_name",
            "table_name": "users",
            "sql": "CREATE INDEX idx_users_name ON users (name)"
        }))
        .unwrap();

        assert_eq!(index.definition_text, "CREATE INDEX idx_users_name ON users (name)");
    }

    #[test]
    fn test_column_spec_wire_form() {
        let spec = ColumnSpec::new("name", ColumnType::Text);
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({"name": "name", "type": "TEXT"})
        );
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!("json".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
