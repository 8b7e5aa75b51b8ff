//! Core types for sqlv
//!
//! This crate holds the data model shared by the gateway and the view layer:
//! cell values, rows, column metadata, server payloads, the error taxonomy and
//! configuration.

pub mod config;
pub mod error;
pub mod types;

// Re-exports
pub use config::{GatewayConfig, LoadOrdering, ObservabilityConfig, SqlvConfig, ViewConfig};
pub use error::{Error, Result};
pub use types::{
    CellValue, ColumnMeta, ColumnSpec, ColumnType, DatabasePayload, ExportFormat,
    GeneratedSql, IndexSummary, Page, QueryPayload, Row, RowId, StructurePayload,
    TablePayload, TableSummary,
};
