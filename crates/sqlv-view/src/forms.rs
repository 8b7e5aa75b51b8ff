//! Repeating input groups for the create-table and create-index dialogs.

use sqlv_core::{ColumnSpec, ColumnType, Error, Result};

/// Stable id of one input group, carried as `data-group` in the markup.
pub type GroupId = u32;

/// One repeatable group of inputs.
pub trait FieldGroup: Default {
    type Value;

    /// Alert shown when the form has no groups at all.
    const EMPTY_MESSAGE: &'static str = "At least one column is required";

    /// Alert shown when any group is missing a required value.
    const INCOMPLETE_MESSAGE: &'static str;

    /// The group's value, or `None` when a required field is empty.
    fn value(&self) -> Option<Self::Value>;
}

/// Name and type of a new table column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnGroup {
    pub name: String,
    pub col_type: ColumnType,
}

impl FieldGroup for ColumnGroup {
    type Value = ColumnSpec;

    const INCOMPLETE_MESSAGE: &'static str = "All columns must have a name";

    fn value(&self) -> Option<ColumnSpec> {
        let name = self.name.trim();
        if name.is_empty() {
            return None;
        }
        Some(ColumnSpec::new(name, self.col_type))
    }
}

/// One column of a new index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexColumnGroup {
    pub column: Option<String>,
}

impl FieldGroup for IndexColumnGroup {
    type Value = String;

    const INCOMPLETE_MESSAGE: &'static str = "All columns must be selected";

    fn value(&self) -> Option<String> {
        self.column
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    }
}

/// An ordered, editable list of input groups.
///
/// Starts with one empty group. Ids are never reused within a form, so a
/// remove request for a group that is already gone is a no-op.
#[derive(Debug, Clone)]
pub struct DynamicForm<G> {
    groups: Vec<(GroupId, G)>,
    next_id: GroupId,
}

impl<G: FieldGroup> DynamicForm<G> {
    pub fn new() -> Self {
        let mut form = Self {
            groups: Vec::new(),
            next_id: 0,
        };
        form.add_row();
        form
    }

    /// Append an empty group and return its id.
    pub fn add_row(&mut self) -> GroupId {
        let id = self.next_id;
        self.next_id += 1;
        self.groups.push((id, G::default()));
        id
    }

    /// Remove the group with `id`. Returns whether it was present.
    pub fn remove(&mut self, id: GroupId) -> bool {
        let before = self.groups.len();
        self.groups.retain(|(gid, _)| *gid != id);
        self.groups.len() != before
    }

    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut G> {
        self.groups
            .iter_mut()
            .find(|(gid, _)| *gid == id)
            .map(|(_, group)| group)
    }

    pub fn groups(&self) -> impl Iterator<Item = (GroupId, &G)> {
        self.groups.iter().map(|(id, group)| (*id, group))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Values of all groups in order. Fails as a whole if there are no groups
    /// or any group is incomplete.
    pub fn collect(&self) -> Result<Vec<G::Value>> {
        if self.groups.is_empty() {
            return Err(Error::validation(G::EMPTY_MESSAGE));
        }

        self.groups
            .iter()
            .map(|(_, group)| {
                group
                    .value()
                    .ok_or_else(|| Error::validation(G::INCOMPLETE_MESSAGE))
            })
            .collect()
    }

    /// Back to a single empty group.
    pub fn reset(&mut self) {
        self.groups.clear();
        self.add_row();
    }
}

impl<G: FieldGroup> Default for DynamicForm<G> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_form_has_one_group() {
        let form: DynamicForm<ColumnGroup> = DynamicForm::new();
        assert_eq!(form.len(), 1);
    }

    #[test]
    fn test_collect_trims_and_keeps_order() {
        let mut form: DynamicForm<ColumnGroup> = DynamicForm::new();
        let second = form.add_row();
        *form.group_mut(0).unwrap() = ColumnGroup {
            name: " id ".to_string(),
            col_type: ColumnType::Integer,
        };
        *form.group_mut(second).unwrap() = ColumnGroup {
            name: "name".to_string(),
            col_type: ColumnType::Text,
        };

        let columns = form.collect().unwrap();
        assert_eq!(
            columns,
            vec![
                ColumnSpec::new("id", ColumnType::Integer),
                ColumnSpec::new("name", ColumnType::Text),
            ]
        );
    }

    #[test]
    fn test_one_blank_name_rejects_everything() {
        let mut form: DynamicForm<ColumnGroup> = DynamicForm::new();
        form.group_mut(0).unwrap().name = "id".to_string();
        form.add_row();

        let err = form.collect().unwrap_err();
        assert_eq!(err.to_string(), "All columns must have a name");
    }

    #[test]
    fn test_empty_form_rejected() {
        let mut form: DynamicForm<IndexColumnGroup> = DynamicForm::new();
        assert!(form.remove(0));
        assert!(!form.remove(0));

        let err = form.collect().unwrap_err();
        assert_eq!(err.to_string(), "At least one column is required");
    }

    #[test]
    fn test_unselected_index_column_rejected() {
        let mut form: DynamicForm<IndexColumnGroup> = DynamicForm::new();
        form.group_mut(0).unwrap().column = Some("name".to_string());
        let second = form.add_row();
        form.group_mut(second).unwrap().column = Some(String::new());

        let err = form.collect().unwrap_err();
        assert_eq!(err.to_string(), "All columns must be selected");
    }

    #[test]
    fn test_ids_not_reused_after_reset() {
        let mut form: DynamicForm<ColumnGroup> = DynamicForm::new();
        form.add_row();
        form.reset();

        let ids: Vec<GroupId> = form.groups().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![2]);
        assert_eq!(form.groups().next().unwrap().1, &ColumnGroup::default());
    }
}
