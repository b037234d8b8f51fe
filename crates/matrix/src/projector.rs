//! Tri-state projection of a selection onto the catalog tree.
//!
//! Recomputed on every call; catalogs are tens to low hundreds of
//! permissions, so nothing is cached.

use serde::Serialize;

use permatrix_core::PermissionId;

use crate::catalog::{Module, Page, PermissionCatalog};
use crate::permission::{Action, PermissionCode};
use crate::selection::Selection;

/// Group-level checkbox state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupState {
    None,
    Partial,
    All,
}

/// State of an individual permission row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowState {
    /// Granted by an ancestor role; locked.
    Inherited,
    /// Explicitly granted to the edited role.
    Selected,
    Unselected,
}

/// Count how many of `ids` are effective.
///
/// An empty group reports [`GroupState::None`].
pub fn group_state<I>(selection: &Selection, ids: I) -> GroupState
where
    I: IntoIterator<Item = PermissionId>,
{
    let (total, selected) = ids.into_iter().fold((0usize, 0usize), |(total, selected), id| {
        (total + 1, selected + usize::from(selection.is_effective(id)))
    });

    if selected == 0 {
        GroupState::None
    } else if selected == total {
        GroupState::All
    } else {
        GroupState::Partial
    }
}

pub fn row_state(selection: &Selection, id: PermissionId) -> RowState {
    if selection.is_inherited(id) {
        RowState::Inherited
    } else if selection.is_explicit(id) {
        RowState::Selected
    } else {
        RowState::Unselected
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowView {
    pub id: PermissionId,
    pub code: PermissionCode,
    pub action: Action,
    pub depends_on_id: Option<PermissionId>,
    pub description: String,
    pub state: RowState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub page_code: String,
    pub name: String,
    pub state: GroupState,
    pub rows: Vec<RowView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleView {
    pub module_code: String,
    pub name: String,
    pub state: GroupState,
    pub pages: Vec<PageView>,
}

/// Whole-matrix projection handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixView {
    pub modules: Vec<ModuleView>,
}

/// Read-only projector bound to one catalog and selection.
#[derive(Debug, Clone, Copy)]
pub struct TriStateProjector<'a> {
    catalog: &'a PermissionCatalog,
    selection: &'a Selection,
}

impl<'a> TriStateProjector<'a> {
    pub fn new(catalog: &'a PermissionCatalog, selection: &'a Selection) -> Self {
        Self { catalog, selection }
    }

    pub fn group_state<I>(&self, ids: I) -> GroupState
    where
        I: IntoIterator<Item = PermissionId>,
    {
        group_state(self.selection, ids)
    }

    pub fn page_state(&self, page: &Page) -> GroupState {
        self.group_state(page.permission_ids())
    }

    pub fn module_state(&self, module: &Module) -> GroupState {
        self.group_state(module.permission_ids())
    }

    pub fn row_state(&self, id: PermissionId) -> RowState {
        row_state(self.selection, id)
    }

    /// Project the full catalog. Rows are ordered by action, then catalog order.
    pub fn view(&self) -> MatrixView {
        let modules = self
            .catalog
            .modules()
            .iter()
            .map(|module| ModuleView {
                module_code: module.module_code.clone(),
                name: module.name.clone(),
                state: self.module_state(module),
                pages: module.pages.iter().map(|page| self.page_view(page)).collect(),
            })
            .collect();
        MatrixView { modules }
    }

    fn page_view(&self, page: &Page) -> PageView {
        let mut rows: Vec<RowView> = page
            .permissions
            .iter()
            .map(|p| RowView {
                id: p.id,
                code: p.code.clone(),
                action: p.action,
                depends_on_id: p.prerequisite_id(),
                description: p.description.clone(),
                state: self.row_state(p.id),
            })
            .collect();
        rows.sort_by_key(|row| row.action);

        PageView {
            page_code: page.page_code.clone(),
            name: page.name.clone(),
            state: self.page_state(page),
            rows,
        }
    }
}
