//! The host side of the console: where fragments land and how the user is asked.

/// Areas of the page the console re-renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// Plain text: path of the open database
    DatabasePath,
    TablesList,
    IndexesList,
    /// `<option>` list of the index form's table picker
    IndexTableSelect,
    TableView,
    /// `<thead>` + `<tbody>` of the results grid
    QueryResults,
    /// Plain text: content of the SQL editor
    QueryEditor,
    ColumnsForm,
    IndexColumnsForm,
    AddRowForm,
    EditRowForm,
}

impl Region {
    /// Element id of the region in the console page.
    pub fn element_id(&self) -> &'static str {
        match self {
            Region::DatabasePath => "dbPath",
            Region::TablesList => "tablesList",
            Region::IndexesList => "indexesList",
            Region::IndexTableSelect => "indexTable",
            Region::TableView => "tableViewContent",
            Region::QueryResults => "resultsTable",
            Region::QueryEditor => "sqlQuery",
            Region::ColumnsForm => "columnsContainer",
            Region::IndexColumnsForm => "indexColumnsContainer",
            Region::AddRowForm => "addRowForm",
            Region::EditRowForm => "editRowForm",
        }
    }

    /// Regions whose content is text, not markup.
    pub fn is_text(&self) -> bool {
        matches!(self, Region::DatabasePath | Region::QueryEditor)
    }
}

/// Tabs of the main area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Table,
    Query,
}

/// Modal dialogs that collect input for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialog {
    OpenDatabase,
    CreateDatabase,
    GenerateSql,
    CreateTable,
    CreateIndex,
    AddRow,
    EditRow,
}

/// Everything the console needs from its host.
///
/// Calls happen between awaits on the console's task, never concurrently
/// with each other for the same action.
pub trait Surface: Send + Sync {
    /// Replace the content of `region`.
    fn render(&self, region: Region, content: String);

    /// Blocking notification.
    fn alert(&self, message: &str);

    /// Blocking yes/no question; `false` aborts the action.
    fn confirm(&self, message: &str) -> bool;

    /// Leave the page for a download.
    fn navigate(&self, url: &str);

    fn show_panel(&self, _panel: Panel) {}

    fn show_dialog(&self, _dialog: Dialog) {}

    fn hide_dialog(&self, _dialog: Dialog) {}
}
