//! Decoding of host click events into console actions.

use sqlv_core::{ExportFormat, RowId};
use std::collections::BTreeMap;

use crate::forms::GroupId;

/// Class list and `data-*` attributes of one element.
///
/// Dataset keys are the attribute names without the `data-` prefix, so
/// `data-row-id="3"` is stored under `"row-id"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementRef {
    pub classes: Vec<String>,
    pub dataset: BTreeMap<String, String>,
}

impl ElementRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.dataset.insert(key.into(), value.into());
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn data(&self, key: &str) -> Option<&str> {
        self.dataset.get(key).map(String::as_str)
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.data(key)?.trim().parse().ok()
    }
}

/// A click: the element that was hit and its ancestors, innermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiEvent {
    pub target: ElementRef,
    pub ancestors: Vec<ElementRef>,
}

impl UiEvent {
    pub fn new(target: ElementRef) -> Self {
        Self {
            target,
            ancestors: Vec::new(),
        }
    }

    pub fn within(mut self, ancestor: ElementRef) -> Self {
        self.ancestors.push(ancestor);
        self
    }

    /// The target or nearest ancestor carrying `class`.
    pub fn closest(&self, class: &str) -> Option<&ElementRef> {
        std::iter::once(&self.target)
            .chain(self.ancestors.iter())
            .find(|el| el.has_class(class))
    }
}

/// Where the console listens for clicks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listener {
    /// Whole-page delegation
    Document,
    /// The sidebar table list
    Sidebar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ViewTable { table: String },
    DropTable { table: String },
    DropIndex { index: String },
    RemoveColumn { group: GroupId },
    RemoveIndexColumn { group: GroupId },
    EditRow { row_id: RowId },
    DeleteRow { row_id: RowId },
    ExportTable { table: String, format: ExportFormat },
    SelectTable { table: String },
}

/// Decode the action a click means, if any.
///
/// Document clicks are matched on the target's classes, first match wins.
/// Sidebar clicks select the enclosing `.table-item`.
pub fn decode(listener: Listener, event: &UiEvent) -> Option<Action> {
    match listener {
        Listener::Document => decode_document(event),
        Listener::Sidebar => {
            let item = event.closest("table-item")?;
            Some(Action::SelectTable {
                table: non_empty(item.data("table"))?,
            })
        }
    }
}

fn decode_document(event: &UiEvent) -> Option<Action> {
    let target = &event.target;

    if target.has_class("view-table") {
        Some(Action::ViewTable {
            table: non_empty(target.data("table"))?,
        })
    } else if target.has_class("drop-table") {
        Some(Action::DropTable {
            table: non_empty(target.data("table"))?,
        })
    } else if target.has_class("drop-index") {
        Some(Action::DropIndex {
            index: non_empty(target.data("index"))?,
        })
    } else if target.has_class("remove-column") {
        let group = event.closest("column-row")?.parsed("group")?;
        Some(Action::RemoveColumn { group })
    } else if target.has_class("remove-index-column") {
        let group = event.closest("index-column-row")?.parsed("group")?;
        Some(Action::RemoveIndexColumn { group })
    } else if target.has_class("edit-row") {
        Some(Action::EditRow {
            row_id: target.parsed("row-id")?,
        })
    } else if target.has_class("delete-row") {
        Some(Action::DeleteRow {
            row_id: target.parsed("row-id")?,
        })
    } else if target.has_class("export-table") {
        Some(Action::ExportTable {
            table: non_empty(target.data("table"))?,
            format: target.parsed("format")?,
        })
    } else {
        None
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button(class: &str) -> ElementRef {
        ElementRef::new().with_class("btn").with_class(class)
    }

    #[test]
    fn test_view_table() {
        let event = UiEvent::new(button("view-table").with_data("table", "users"));
        assert_eq!(
            decode(Listener::Document, &event),
            Some(Action::ViewTable {
                table: "users".to_string()
            })
        );
    }

    #[test]
    fn test_row_id_parsed() {
        let event = UiEvent::new(button("delete-row").with_data("row-id", "3"));
        assert_eq!(
            decode(Listener::Document, &event),
            Some(Action::DeleteRow { row_id: 3 })
        );
    }

    #[test]
    fn test_invalid_params_decode_to_none() {
        let bad_row = UiEvent::new(button("edit-row").with_data("row-id", "abc"));
        assert_eq!(decode(Listener::Document, &bad_row), None);

        let no_table = UiEvent::new(button("drop-table"));
        assert_eq!(decode(Listener::Document, &no_table), None);

        let bad_format = UiEvent::new(
            button("export-table")
                .with_data("table", "users")
                .with_data("format", "xml"),
        );
        assert_eq!(decode(Listener::Document, &bad_format), None);
    }

    #[test]
    fn test_first_matching_class_wins() {
        let event = UiEvent::new(
            button("drop-table")
                .with_class("view-table")
                .with_data("table", "users"),
        );
        assert_eq!(
            decode(Listener::Document, &event),
            Some(Action::ViewTable {
                table: "users".to_string()
            })
        );
    }

    #[test]
    fn test_remove_column_uses_enclosing_group() {
        let event = UiEvent::new(button("remove-column"))
            .within(ElementRef::new().with_class("col-md-2"))
            .within(
                ElementRef::new()
                    .with_class("column-row")
                    .with_data("group", "4"),
            );
        assert_eq!(
            decode(Listener::Document, &event),
            Some(Action::RemoveColumn { group: 4 })
        );

        let orphan = UiEvent::new(button("remove-index-column"));
        assert_eq!(decode(Listener::Document, &orphan), None);
    }

    #[test]
    fn test_export() {
        let event = UiEvent::new(
            button("export-table")
                .with_data("table", "users")
                .with_data("format", "csv"),
        );
        assert_eq!(
            decode(Listener::Document, &event),
            Some(Action::ExportTable {
                table: "users".to_string(),
                format: ExportFormat::Csv
            })
        );
    }

    #[test]
    fn test_sidebar_selects_enclosing_item() {
        let event = UiEvent::new(ElementRef::new().with_class("list-text")).within(
            ElementRef::new()
                .with_class("table-item")
                .with_data("table", "orders"),
        );
        assert_eq!(
            decode(Listener::Sidebar, &event),
            Some(Action::SelectTable {
                table: "orders".to_string()
            })
        );
        assert_eq!(decode(Listener::Document, &event), None);
    }

    #[test]
    fn test_unrelated_click_is_none() {
        let event = UiEvent::new(button("btn-primary"));
        assert_eq!(decode(Listener::Document, &event), None);
        assert_eq!(decode(Listener::Sidebar, &event), None);
    }
}
