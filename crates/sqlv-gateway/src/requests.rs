//! Request bodies for the `/structure` and `/data` endpoints.

use sqlv_core::{CellValue, ColumnSpec, ColumnType, Result, Row};

/// A schema change or schema query sent to `/structure`.
#[derive(Debug, Clone, PartialEq)]
pub enum StructureAction {
    CreateTable {
        table_name: String,
        columns: Vec<ColumnSpec>,
    },
    DropTable {
        table_name: String,
    },
    AddColumn {
        table_name: String,
        column_name: String,
        column_type: ColumnType,
    },
    GetIndexes,
    CreateIndex {
        index_name: String,
        table_name: String,
        columns: Vec<String>,
        unique: bool,
    },
    DropIndex {
        index_name: String,
    },
}

impl StructureAction {
    /// Wire name of the action.
    pub fn name(&self) -> &'static str {
        match self {
            StructureAction::CreateTable { .. } => "create_table",
            StructureAction::DropTable { .. } => "drop_table",
            StructureAction::AddColumn { .. } => "add_column",
            StructureAction::GetIndexes => "get_indexes",
            StructureAction::CreateIndex { .. } => "create_index",
            StructureAction::DropIndex { .. } => "drop_index",
        }
    }

    /// Form fields in the order the console sends them.
    pub fn form_fields(&self) -> Result<Vec<(&'static str, String)>> {
        let mut fields = vec![("action", self.name().to_string())];

        match self {
            StructureAction::CreateTable {
                table_name,
                columns,
            } => {
                fields.push(("table_name", table_name.clone()));
                fields.push(("columns", serde_json::to_string(columns)?));
            }
            StructureAction::DropTable { table_name } => {
                fields.push(("table_name", table_name.clone()));
            }
            StructureAction::AddColumn {
                table_name,
                column_name,
                column_type,
            } => {
                fields.push(("table_name", table_name.clone()));
                fields.push(("column_name", column_name.clone()));
                fields.push(("column_type", column_type.as_str().to_string()));
            }
            StructureAction::GetIndexes => {}
            StructureAction::CreateIndex {
                index_name,
                table_name,
                columns,
                unique,
            } => {
                fields.push(("index_name", index_name.clone()));
                fields.push(("table_name", table_name.clone()));
                fields.push(("columns", serde_json::to_string(columns)?));
                fields.push(("unique", unique.to_string()));
            }
            StructureAction::DropIndex { index_name } => {
                fields.push(("index_name", index_name.clone()));
            }
        }

        Ok(fields)
    }
}

/// Parameterized WHERE clause identifying one row by its primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct RowCondition {
    /// e.g. `id = ?` or `a = ? AND b = ?`
    pub clause: String,
    pub params: Vec<CellValue>,
}

/// A row change sent to `/data`.
#[derive(Debug, Clone, PartialEq)]
pub enum DataAction {
    Insert {
        table_name: String,
        data: Row,
    },
    Update {
        table_name: String,
        data: Row,
        condition: RowCondition,
    },
    Delete {
        table_name: String,
        condition: RowCondition,
    },
}

impl DataAction {
    pub fn name(&self) -> &'static str {
        match self {
            DataAction::Insert { .. } => "insert",
            DataAction::Update { .. } => "update",
            DataAction::Delete { .. } => "delete",
        }
    }

    pub fn table_name(&self) -> &str {
        match self {
            DataAction::Insert { table_name, .. }
            | DataAction::Update { table_name, .. }
            | DataAction::Delete { table_name, .. } => table_name,
        }
    }

    pub fn form_fields(&self) -> Result<Vec<(&'static str, String)>> {
        let mut fields = vec![
            ("action", self.name().to_string()),
            ("table_name", self.table_name().to_string()),
        ];

        match self {
            DataAction::Insert { data, .. } => {
                fields.push(("data", serde_json::to_string(data)?));
            }
            DataAction::Update {
                data, condition, ..
            } => {
                fields.push(("data", serde_json::to_string(data)?));
                fields.push(("condition", condition.clause.clone()));
                fields.push(("params", serde_json::to_string(&condition.params)?));
            }
            DataAction::Delete { condition, .. } => {
                fields.push(("condition", condition.clause.clone()));
                fields.push(("params", serde_json::to_string(&condition.params)?));
            }
        }

        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field<'a>(fields: &'a [(&'static str, String)], name: &str) -> Option<&'a str> {
        fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_create_table_fields() {
        let action = StructureAction::CreateTable {
            table_name: "users".to_string(),
            columns: vec![
                ColumnSpec::new("id", ColumnType::Integer),
                ColumnSpec::new("name", ColumnType::Text),
            ],
        };
        let fields = action.form_fields().unwrap();

        assert_eq!(field(&fields, "action"), Some("create_table"));
        assert_eq!(field(&fields, "table_name"), Some("users"));
        assert_eq!(
            field(&fields, "columns"),
            Some(r#"[{"name":"id","type":"INTEGER"},{"name":"name","type":"TEXT"}]"#)
        );
    }

    #[test]
    fn test_create_index_sends_unique_flag() {
        let action = StructureAction::CreateIndex {
            index_name: "idx_name".to_string(),
            table_name: "users".to_string(),
            columns: vec!["name".to_string()],
            unique: true,
        };
        let fields = action.form_fields().unwrap();

        assert_eq!(field(&fields, "columns"), Some(r#"["name"]"#));
        assert_eq!(field(&fields, "unique"), Some("true"));
    }

    #[test]
    fn test_get_indexes_has_only_action() {
        let fields = StructureAction::GetIndexes.form_fields().unwrap();
        assert_eq!(fields, vec![("action", "get_indexes".to_string())]);
    }

    #[test]
    fn test_delete_fields() {
        let action = DataAction::Delete {
            table_name: "users".to_string(),
            condition: RowCondition {
                clause: "id = ?".to_string(),
                params: vec![CellValue::Integer(1)],
            },
        };
        let fields = action.form_fields().unwrap();

        assert_eq!(field(&fields, "action"), Some("delete"));
        assert_eq!(field(&fields, "condition"), Some("id = ?"));
        assert_eq!(field(&fields, "params"), Some("[1]"));
        assert_eq!(field(&fields, "data"), None);
    }

    #[test]
    fn test_update_keeps_data_order() {
        let action = DataAction::Update {
            table_name: "users".to_string(),
            data: Row::new().with("name", "Bo").with("age", CellValue::Null),
            condition: RowCondition {
                clause: "id = ?".to_string(),
                params: vec![CellValue::Integer(3)],
            },
        };
        let fields = action.form_fields().unwrap();

        assert_eq!(field(&fields, "data"), Some(r#"{"name":"Bo","age":null}"#));
        assert_eq!(field(&fields, "params"), Some("[3]"));
    }
}
