//! HTML fragments for the console regions.
//!
//! Every function here is pure: it reads a snapshot or payload and returns
//! markup. All interpolated text goes through [`escape`].

use sqlv_core::{CellValue, ColumnType, IndexSummary, Row, TableSummary};
use std::fmt::Write;

use crate::forms::{ColumnGroup, DynamicForm, IndexColumnGroup};
use crate::rows::{RowForm, RowFormKind};
use crate::state::ViewState;

const NULL_CELL: &str = r#"<span class="text-muted">NULL</span>"#;

/// Escape text for element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn cell(value: &CellValue) -> String {
    match value {
        CellValue::Null => NULL_CELL.to_string(),
        other => escape(&other.to_string()),
    }
}

/// Sidebar entries, one `.table-item` per table with view and drop buttons.
pub fn table_list(tables: &[TableSummary]) -> String {
    let mut html = String::new();
    for table in tables {
        let name = escape(&table.name);
        let _ = write!(
            html,
            r#"<li class="list-group-item d-flex justify-content-between align-items-center table-item" data-table="{name}">{name}<div class="btn-group btn-group-sm"><button class="btn btn-outline-primary view-table" data-table="{name}">View</button><button class="btn btn-outline-danger drop-table" data-table="{name}">Drop</button></div></li>"#
        );
    }
    html
}

/// Options of the create-index table picker.
pub fn index_table_options(tables: &[TableSummary]) -> String {
    let mut html = String::new();
    for table in tables {
        let name = escape(&table.name);
        let _ = write!(html, r#"<option value="{name}">{name}</option>"#);
    }
    html
}

pub fn index_list(indexes: &[IndexSummary]) -> String {
    if indexes.is_empty() {
        return r#"<li class="list-group-item text-muted">No indexes found</li>"#.to_string();
    }

    let mut html = String::new();
    for index in indexes {
        let name = escape(&index.name);
        let _ = write!(
            html,
            r#"<li class="list-group-item d-flex justify-content-between align-items-center"><div><strong>{name}</strong> on {table}<div class="text-muted small">{sql}</div></div><button class="btn btn-outline-danger btn-sm drop-index" data-index="{name}">Drop</button></li>"#,
            table = escape(&index.table_name),
            sql = escape(&index.definition_text),
        );
    }
    html
}

pub fn table_view_placeholder() -> String {
    r#"<div class="alert alert-info">Select a table to view its data</div>"#.to_string()
}

/// Action bar, data grid and hidden schema card for the current table.
pub fn table_view(state: &ViewState) -> String {
    let Some(table) = state.current_table.as_deref() else {
        return table_view_placeholder();
    };
    let table = escape(table);

    let mut html = String::new();
    let _ = write!(
        html,
        r#"<div class="d-flex justify-content-between mb-3"><div><button class="btn btn-sm btn-success me-2" id="addRowBtn">Add Row</button><div class="btn-group"><button class="btn btn-sm btn-outline-secondary export-table" data-table="{table}" data-format="csv">Export CSV</button><button class="btn btn-sm btn-outline-secondary export-table" data-table="{table}" data-format="json">Export JSON</button></div></div><button class="btn btn-sm btn-outline-primary" id="showSchemaBtn">Show Schema</button></div>"#
    );

    html.push_str(r#"<div class="table-responsive"><table class="table table-striped table-hover"><thead><tr>"#);
    for column in &state.columns {
        let _ = write!(
            html,
            r#"<th>{} <small class="text-muted">{}</small></th>"#,
            escape(&column.name),
            escape(&column.col_type)
        );
    }
    html.push_str("<th>Actions</th></tr></thead><tbody>");

    for (row_id, row) in state.rows.iter().enumerate() {
        html.push_str("<tr>");
        for column in &state.columns {
            let _ = write!(html, "<td>{}</td>", cell(row.value(&column.name)));
        }
        let _ = write!(
            html,
            r#"<td><button class="btn btn-sm btn-outline-primary edit-row" data-row-id="{row_id}">Edit</button><button class="btn btn-sm btn-outline-danger delete-row" data-row-id="{row_id}">Delete</button></td></tr>"#
        );
    }
    html.push_str("</tbody></table></div>");

    let _ = write!(
        html,
        r#"<div class="card mt-3 d-none" id="schemaCard"><div class="card-header">Table Schema<button type="button" class="btn-close float-end" id="hideSchemaBtn"></button></div><div class="card-body"><pre><code class="language-sql">{}</code></pre></div></div>"#,
        escape(state.schema_text.as_deref().unwrap_or_default())
    );

    html
}

/// `<thead>` and `<tbody>` of the query results grid. Headers follow the key
/// order of the first row.
pub fn query_results(results: &[Row]) -> String {
    let Some(first) = results.first() else {
        return "<thead><tr><th>Query executed successfully (no results)</th></tr></thead><tbody></tbody>"
            .to_string();
    };

    let headers: Vec<&str> = first.column_names().collect();

    let mut html = String::from("<thead><tr>");
    for header in &headers {
        let _ = write!(html, "<th>{}</th>", escape(header));
    }
    html.push_str("</tr></thead><tbody>");

    for row in results {
        html.push_str("<tr>");
        for header in &headers {
            let _ = write!(html, "<td>{}</td>", cell(row.value(header)));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody>");
    html
}

/// Labelled inputs of an add-row or edit-row form.
pub fn row_form(form: &RowForm) -> String {
    let prefix = match form.kind {
        RowFormKind::Insert => "add",
        RowFormKind::Update { .. } => "edit",
    };

    let mut html = String::new();
    for field in &form.fields {
        let column = escape(&field.column);
        let key_note = if field.primary_key && field.readonly {
            " (PRIMARY KEY)"
        } else {
            ""
        };
        let _ = write!(
            html,
            r#"<div class="mb-3"><label for="{prefix}-{column}" class="form-label">{column} <small class="text-muted">{col_type}{key_note}</small></label><input type="{input_type}" class="form-control" id="{prefix}-{column}" name="{column}" value="{value}"{readonly}></div>"#,
            col_type = escape(&field.col_type),
            input_type = field.input_type.as_str(),
            value = escape(&field.value),
            readonly = if field.readonly { " readonly" } else { "" },
        );
    }
    html
}

/// Column groups of the create-table form.
pub fn column_groups(form: &DynamicForm<ColumnGroup>) -> String {
    let mut html = String::new();
    for (id, group) in form.groups() {
        let _ = write!(
            html,
            r#"<div class="row mb-2 column-row" data-group="{id}"><div class="col-md-5"><input type="text" class="form-control column-name" placeholder="Name" value="{name}" required></div><div class="col-md-5"><select class="form-select column-type">"#,
            name = escape(&group.name),
        );
        for col_type in ColumnType::ALL {
            let selected = if col_type == group.col_type { " selected" } else { "" };
            let _ = write!(
                html,
                r#"<option value="{t}"{selected}>{t}</option>"#,
                t = col_type.as_str()
            );
        }
        html.push_str(r#"</select></div><div class="col-md-2"><button type="button" class="btn btn-danger btn-sm remove-column">×</button></div></div>"#);
    }
    html
}

/// Column pickers of the create-index form.
///
/// `choices` are the columns of the selected table, `None` when no table is
/// selected.
pub fn index_column_groups(form: &DynamicForm<IndexColumnGroup>, choices: Option<&[String]>) -> String {
    let mut html = String::new();
    for (id, group) in form.groups() {
        let _ = write!(
            html,
            r#"<div class="row mb-2 index-column-row" data-group="{id}"><div class="col-md-10"><select class="form-select index-column-name">"#
        );
        match choices {
            None => html.push_str(r#"<option value="">-- Select a table first --</option>"#),
            Some(columns) => {
                for column in columns {
                    let selected = if group.column.as_deref() == Some(column.as_str()) {
                        " selected"
                    } else {
                        ""
                    };
                    let _ = write!(
                        html,
                        r#"<option value="{c}"{selected}>{c}</option>"#,
                        c = escape(column)
                    );
                }
            }
        }
        html.push_str(r#"</select></div><div class="col-md-2"><button type="button" class="btn btn-danger btn-sm remove-index-column">×</button></div></div>"#);
    }
    html
}
