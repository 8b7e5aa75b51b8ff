//! Row add, edit and delete requests built from the current view.

use sqlv_core::{CellValue, ColumnMeta, Error, Result, Row, RowId};
use sqlv_gateway::{DataAction, RowCondition};

use crate::state::ViewState;

/// `<input type>` chosen from a declared SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    Number,
    DateTimeLocal,
    Checkbox,
    Text,
}

impl InputType {
    pub fn for_column_type(declared: &str) -> Self {
        let declared = declared.to_ascii_uppercase();
        if declared.contains("INT") {
            InputType::Number
        } else if ["REAL", "FLOAT", "DOUBLE"].iter().any(|t| declared.contains(t)) {
            InputType::Number
        } else if declared.contains("DATE") || declared.contains("TIME") {
            InputType::DateTimeLocal
        } else if declared.contains("BOOL") {
            InputType::Checkbox
        } else {
            InputType::Text
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Number => "number",
            InputType::DateTimeLocal => "datetime-local",
            InputType::Checkbox => "checkbox",
            InputType::Text => "text",
        }
    }

    /// Turn submitted text back into a cell value.
    pub fn coerce(&self, text: &str) -> CellValue {
        if *self == InputType::Text {
            return CellValue::text(text);
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return CellValue::Null;
        }

        match self {
            InputType::Number => {
                if let Ok(i) = trimmed.parse::<i64>() {
                    CellValue::Integer(i)
                } else if let Ok(r) = trimmed.parse::<f64>() {
                    CellValue::Real(r)
                } else {
                    CellValue::text(text)
                }
            }
            InputType::Checkbox => match trimmed.to_ascii_lowercase().as_str() {
                "on" | "true" | "1" => CellValue::Integer(1),
                "off" | "false" | "0" => CellValue::Integer(0),
                _ => CellValue::text(text),
            },
            InputType::DateTimeLocal | InputType::Text => CellValue::text(text),
        }
    }
}

const SQLITE_KEYWORDS: &[&str] = &[
    "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ALTER", "ALWAYS", "ANALYZE", "AND", "AS",
    "ASC", "ATTACH", "AUTOINCREMENT", "BEFORE", "BEGIN", "BETWEEN", "BY", "CASCADE",
    "CASE", "CAST", "CHECK", "COLLATE", "COLUMN", "COMMIT", "CONFLICT", "CONSTRAINT",
    "CREATE", "CROSS", "CURRENT", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP",
    "DATABASE", "DEFAULT", "DEFERRABLE", "DEFERRED", "DELETE", "DESC", "DETACH",
    "DISTINCT", "DO", "DROP", "EACH", "ELSE", "END", "ESCAPE", "EXCEPT", "EXCLUDE",
    "EXCLUSIVE", "EXISTS", "EXPLAIN", "FAIL", "FILTER", "FIRST", "FOLLOWING", "FOR",
    "FOREIGN", "FROM", "FULL", "GENERATED", "GLOB", "GROUP", "GROUPS", "HAVING", "IF",
    "IGNORE", "IMMEDIATE", "IN", "INDEX", "INDEXED", "INITIALLY", "INNER", "INSERT",
    "INSTEAD", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN", "KEY", "LAST", "LEFT", "LIKE",
    "LIMIT", "MATCH", "MATERIALIZED", "NATURAL", "NO", "NOT", "NOTHING", "NOTNULL",
    "NULL", "NULLS", "OF", "OFFSET", "ON", "OR", "ORDER", "OTHERS", "OUTER", "OVER",
    "PARTITION", "PLAN", "PRAGMA", "PRECEDING", "PRIMARY", "QUERY", "RAISE", "RANGE",
    "RECURSIVE", "REFERENCES", "REGEXP", "REINDEX", "RELEASE", "RENAME", "REPLACE",
    "RESTRICT", "RETURNING", "RIGHT", "ROLLBACK", "ROW", "ROWS", "SAVEPOINT", "SELECT",
    "SET", "TABLE", "TEMP", "TEMPORARY", "THEN", "TIES", "TO", "TRANSACTION", "TRIGGER",
    "UNBOUNDED", "UNION", "UNIQUE", "UPDATE", "USING", "VACUUM", "VALUES", "VIEW",
    "VIRTUAL", "WHEN", "WHERE", "WINDOW", "WITH", "WITHOUT",
];

/// Column name as it may appear in a condition. Plain identifiers stay bare;
/// keywords and anything else are double-quoted with embedded quotes doubled.
pub fn quote_identifier(name: &str) -> String {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    let keyword = SQLITE_KEYWORDS
        .iter()
        .any(|k| k.eq_ignore_ascii_case(name));

    if plain && !keyword {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// `pk1 = ? AND pk2 = ?` in key order with the row's key values, or `None`
/// when the table has no primary key.
pub fn primary_key_condition(columns: &[ColumnMeta], row: &Row) -> Option<RowCondition> {
    let mut keys: Vec<&ColumnMeta> = columns.iter().filter(|c| c.is_primary_key()).collect();
    if keys.is_empty() {
        return None;
    }
    keys.sort_by_key(|c| c.pk);

    let clause = keys
        .iter()
        .map(|c| format!("{} = ?", quote_identifier(&c.name)))
        .collect::<Vec<_>>()
        .join(" AND ");
    let params = keys.iter().map(|c| row.value(&c.name).clone()).collect();

    Some(RowCondition { clause, params })
}

/// One labelled input of a row form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub column: String,
    pub col_type: String,
    pub input_type: InputType,
    pub value: String,
    pub primary_key: bool,
    pub readonly: bool,
    /// Value the field was pre-filled from; `None` on the add-row form.
    pub original: Option<CellValue>,
}

impl FormField {
    fn for_column(column: &ColumnMeta, value: String) -> Self {
        Self {
            column: column.name.clone(),
            col_type: column.col_type.clone(),
            input_type: InputType::for_column_type(&column.col_type),
            value,
            primary_key: column.is_primary_key(),
            readonly: false,
            original: None,
        }
    }

    pub fn cell_value(&self) -> CellValue {
        self.input_type.coerce(&self.value)
    }

    /// Whether the text differs from the pre-filled value. Fields without an
    /// original always count as changed.
    pub fn is_changed(&self) -> bool {
        match &self.original {
            Some(original) => self.value != original.to_input_text(),
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowFormKind {
    Insert,
    /// Edit of an existing row, addressed by the key values it had when the
    /// editor was opened.
    Update { condition: RowCondition },
}

/// Add-row or edit-row form.
#[derive(Debug, Clone, PartialEq)]
pub struct RowForm {
    pub table: String,
    pub kind: RowFormKind,
    pub fields: Vec<FormField>,
}

impl RowForm {
    /// Empty form for a new row of the current table. `INTEGER PRIMARY KEY`
    /// columns are left to SQLite.
    pub fn for_insert(state: &ViewState) -> Option<Self> {
        let table = state.current_table.clone()?;
        let fields = state
            .columns
            .iter()
            .filter(|c| !c.is_auto_increment())
            .map(|c| FormField::for_column(c, String::new()))
            .collect();

        Some(Self {
            table,
            kind: RowFormKind::Insert,
            fields,
        })
    }

    /// Editor for `rows[row_id]`, pre-filled with its current values.
    ///
    /// `Ok(None)` when no table is shown or the row id is out of range.
    pub fn for_edit(state: &ViewState, row_id: RowId) -> Result<Option<Self>> {
        let (Some(table), Some(row)) = (state.current_table.as_ref(), state.row(row_id)) else {
            return Ok(None);
        };

        let condition = primary_key_condition(&state.columns, row)
            .ok_or_else(|| Error::validation("Cannot edit row - no primary key found"))?;

        let fields = state
            .columns
            .iter()
            .map(|c| {
                let original = row.value(&c.name);
                let mut field = FormField::for_column(c, original.to_input_text());
                field.readonly = field.primary_key;
                field.original = Some(original.clone());
                field
            })
            .collect();

        Ok(Some(Self {
            table: table.clone(),
            kind: RowFormKind::Update { condition },
            fields,
        }))
    }

    pub fn field(&self, column: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.column == column)
    }

    /// Set the text of an editable field. Returns `false` for unknown or
    /// read-only fields.
    pub fn set_value(&mut self, column: &str, text: impl Into<String>) -> bool {
        match self.fields.iter_mut().find(|f| f.column == column) {
            Some(field) if !field.readonly => {
                field.value = text.into();
                true
            }
            _ => false,
        }
    }

    /// The `/data` request for the form's current values.
    ///
    /// An edit sends only the non-key fields whose text changed, and yields
    /// `None` when nothing changed.
    pub fn submission(&self) -> Option<DataAction> {
        match &self.kind {
            RowFormKind::Insert => Some(DataAction::Insert {
                table_name: self.table.clone(),
                data: self
                    .fields
                    .iter()
                    .map(|f| (f.column.clone(), f.cell_value()))
                    .collect(),
            }),
            RowFormKind::Update { condition } => {
                let data: Row = self
                    .fields
                    .iter()
                    .filter(|f| !f.primary_key && f.is_changed())
                    .map(|f| (f.column.clone(), f.cell_value()))
                    .collect();
                if data.is_empty() {
                    return None;
                }
                Some(DataAction::Update {
                    table_name: self.table.clone(),
                    data,
                    condition: condition.clone(),
                })
            }
        }
    }
}

/// The `/data` delete request for `rows[row_id]`.
///
/// `Ok(None)` when the row cannot be addressed; a validation error when the
/// table has no primary key.
pub fn delete_request(state: &ViewState, row_id: RowId) -> Result<Option<DataAction>> {
    let (Some(table), Some(row)) = (state.current_table.as_ref(), state.row(row_id)) else {
        return Ok(None);
    };

    let condition = primary_key_condition(&state.columns, row)
        .ok_or_else(|| Error::validation("Cannot delete row - no primary key found"))?;

    Ok(Some(DataAction::Delete {
        table_name: table.clone(),
        condition,
    }))
}
