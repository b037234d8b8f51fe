//! Editing session: the selection state machine for one role.
//!
//! The session is an aggregate. Toggles are commands; `handle` validates them
//! against the dependency rules and yields at most one [`SelectionChanged`]
//! event, which `apply` folds into the explicit selection. A rejected command
//! never touches state.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use permatrix_core::{Aggregate, AggregateRoot, PermissionId, SessionId};

use crate::catalog::{Page, PermissionCatalog};
use crate::config::MatrixConfig;
use crate::error::MatrixError;
use crate::projector::{GroupState, MatrixView, RowState, TriStateProjector};
use crate::resolver::DependencyResolver;
use crate::roles::EditedRole;
use crate::selection::Selection;
use crate::snapshot::{SelectionDiff, SelectionSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixCommand {
    TogglePermission(PermissionId),
    TogglePage {
        module_code: Option<String>,
        page_code: String,
    },
    ToggleModule(String),
    /// Remove a permission together with everything that depends on it.
    RevokeWithDependents(PermissionId),
}

/// Event: the explicit selection changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionChanged {
    pub added: BTreeSet<PermissionId>,
    pub removed: BTreeSet<PermissionId>,
    /// Group members left selected because something outside the group needs them.
    pub retained: BTreeSet<PermissionId>,
}

impl SelectionChanged {
    fn adding(added: BTreeSet<PermissionId>) -> Self {
        Self {
            added,
            ..Self::default()
        }
    }

    fn removing(removed: BTreeSet<PermissionId>) -> Self {
        Self {
            removed,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// In-memory editing state for one role.
///
/// # Invariants
/// - Every effective permission's prerequisite is effective.
/// - The inherited set never changes after [`MatrixSession::open`].
/// - Explicit and inherited sets are disjoint.
#[derive(Debug, Clone)]
pub struct MatrixSession {
    id: SessionId,
    role: EditedRole,
    catalog: Arc<PermissionCatalog>,
    selection: Selection,
    baseline: BTreeSet<PermissionId>,
    version: u64,
}

impl MatrixSession {
    /// Start editing `role` from its persisted explicit grants.
    ///
    /// Explicit grants that are also inherited are dropped. Grants whose
    /// prerequisites are missing are healed by adding the prerequisites,
    /// or rejected when `config.strict_load` is set.
    #[tracing::instrument(skip_all, fields(role = %role.code))]
    pub fn open<E, I>(
        catalog: Arc<PermissionCatalog>,
        role: EditedRole,
        explicit: E,
        inherited: I,
        config: &MatrixConfig,
    ) -> Result<Self, MatrixError>
    where
        E: IntoIterator<Item = PermissionId>,
        I: IntoIterator<Item = PermissionId>,
    {
        let baseline: BTreeSet<PermissionId> = explicit.into_iter().collect();
        let inherited: BTreeSet<PermissionId> = inherited.into_iter().collect();

        let overlap = baseline.intersection(&inherited).count();
        if overlap > 0 {
            tracing::debug!(overlap, "dropping explicit grants that are already inherited");
        }

        let unknown: Vec<PermissionId> = baseline
            .iter()
            .chain(inherited.iter())
            .filter(|id| !catalog.contains(**id))
            .copied()
            .collect();
        if !unknown.is_empty() {
            tracing::warn!(?unknown, "grants reference permissions missing from the catalog; keeping them as-is");
        }

        let mut selection = Selection::new(
            baseline.difference(&inherited).copied(),
            inherited.iter().copied(),
        );

        let violations = DependencyResolver::new(&catalog, &selection).violations();
        if !violations.is_empty() {
            if config.strict_load {
                return Err(MatrixError::InconsistentSelection(violations));
            }
            tracing::warn!(
                count = violations.len(),
                "persisted grants miss prerequisites; adding them"
            );
            heal(&catalog, &mut selection);
        }

        let id = SessionId::new();
        tracing::info!(
            session_id = %id,
            explicit = selection.explicit().len(),
            inherited = selection.inherited().len(),
            "permission matrix session opened"
        );

        Ok(Self {
            id,
            role,
            catalog,
            selection,
            baseline,
            version: 0,
        })
    }

    pub fn role(&self) -> &EditedRole {
        &self.role
    }

    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn explicit(&self) -> &BTreeSet<PermissionId> {
        self.selection.explicit()
    }

    pub fn inherited(&self) -> &BTreeSet<PermissionId> {
        self.selection.inherited()
    }

    pub fn effective(&self) -> BTreeSet<PermissionId> {
        self.selection.effective()
    }

    pub fn is_selected(&self, id: PermissionId) -> bool {
        self.selection.is_effective(id)
    }

    pub fn resolver(&self) -> DependencyResolver<'_> {
        DependencyResolver::new(&self.catalog, &self.selection)
    }

    pub fn projector(&self) -> TriStateProjector<'_> {
        TriStateProjector::new(&self.catalog, &self.selection)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────

    pub fn toggle_permission(&mut self, id: PermissionId) -> Result<SelectionChanged, MatrixError> {
        self.run(MatrixCommand::TogglePermission(id))
    }

    /// Toggle a page by code alone; fails if the code exists in several modules.
    pub fn toggle_page(&mut self, page_code: &str) -> Result<SelectionChanged, MatrixError> {
        self.run(MatrixCommand::TogglePage {
            module_code: None,
            page_code: page_code.to_string(),
        })
    }

    pub fn toggle_page_in(
        &mut self,
        module_code: &str,
        page_code: &str,
    ) -> Result<SelectionChanged, MatrixError> {
        self.run(MatrixCommand::TogglePage {
            module_code: Some(module_code.to_string()),
            page_code: page_code.to_string(),
        })
    }

    pub fn toggle_module(&mut self, module_code: &str) -> Result<SelectionChanged, MatrixError> {
        self.run(MatrixCommand::ToggleModule(module_code.to_string()))
    }

    pub fn revoke_with_dependents(&mut self, id: PermissionId) -> Result<SelectionChanged, MatrixError> {
        self.run(MatrixCommand::RevokeWithDependents(id))
    }

    fn run(&mut self, command: MatrixCommand) -> Result<SelectionChanged, MatrixError> {
        match self.execute(&command) {
            Ok(events) => Ok(events.into_iter().next().unwrap_or_default()),
            Err(err) => {
                tracing::debug!(session_id = %self.id, ?command, error = %err, "matrix command rejected");
                Err(err)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Projections
    // ─────────────────────────────────────────────────────────────────────

    pub fn group_state<I>(&self, ids: I) -> GroupState
    where
        I: IntoIterator<Item = PermissionId>,
    {
        self.projector().group_state(ids)
    }

    pub fn page_state(&self, module_code: &str, page_code: &str) -> Result<GroupState, MatrixError> {
        let page = self.resolve_page(Some(module_code), page_code)?;
        Ok(self.projector().page_state(page))
    }

    pub fn module_state(&self, module_code: &str) -> Result<GroupState, MatrixError> {
        let module = self
            .catalog
            .module(module_code)
            .ok_or_else(|| MatrixError::UnknownModule(module_code.to_string()))?;
        Ok(self.projector().module_state(module))
    }

    pub fn row_state(&self, id: PermissionId) -> RowState {
        self.projector().row_state(id)
    }

    pub fn view(&self) -> MatrixView {
        self.projector().view()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Save
    // ─────────────────────────────────────────────────────────────────────

    /// Explicit grants to persist for the edited role.
    pub fn snapshot(&self) -> SelectionSnapshot {
        let snapshot = SelectionSnapshot {
            role_id: self.role.id,
            session_id: self.id,
            explicit: self.selection.explicit().iter().copied().collect(),
            version: self.version,
            captured_at: Utc::now(),
        };
        tracing::info!(
            session_id = %self.id,
            role = %self.role.code,
            version = self.version,
            explicit = snapshot.explicit.len(),
            "selection snapshot captured"
        );
        snapshot
    }

    /// Changes relative to the grants the session was opened with.
    pub fn diff(&self) -> SelectionDiff {
        SelectionDiff::between(&self.baseline, self.selection.explicit())
    }

    pub fn is_dirty(&self) -> bool {
        !self.diff().is_empty()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Decisions
    // ─────────────────────────────────────────────────────────────────────

    fn resolve_page(&self, module_code: Option<&str>, page_code: &str) -> Result<&Page, MatrixError> {
        if let Some(module_code) = module_code {
            let module = self
                .catalog
                .module(module_code)
                .ok_or_else(|| MatrixError::UnknownModule(module_code.to_string()))?;
            return module.page(page_code).ok_or_else(|| MatrixError::UnknownPage {
                module: Some(module_code.to_string()),
                page: page_code.to_string(),
            });
        }

        match self.catalog.pages_named(page_code).as_slice() {
            [] => Err(MatrixError::UnknownPage {
                module: None,
                page: page_code.to_string(),
            }),
            [(_, page)] => Ok(*page),
            many => Err(MatrixError::AmbiguousPage {
                page: page_code.to_string(),
                modules: many.iter().map(|(m, _)| m.module_code.clone()).collect(),
            }),
        }
    }

    fn decide_permission(&self, id: PermissionId) -> Result<SelectionChanged, MatrixError> {
        if !self.catalog.contains(id) {
            // A stale grant kept at load: nothing in the catalog depends on it.
            if self.selection.is_explicit(id) {
                return Ok(SelectionChanged::removing(BTreeSet::from([id])));
            }
            return Err(MatrixError::UnknownPermission(id));
        }
        if self.selection.is_inherited(id) {
            return Err(MatrixError::ReadOnlyPermission(id));
        }

        let resolver = self.resolver();
        if self.selection.is_explicit(id) {
            // Inherited dependents pin their prerequisite too, or the effective
            // selection would lose closure.
            let mut blocking = resolver.blocking_dependents(id);
            blocking.extend(resolver.inherited_dependents(id));
            if !blocking.is_empty() {
                return Err(MatrixError::DependencyConflict {
                    requested: BTreeSet::from([id]),
                    blocking,
                });
            }
            return Ok(SelectionChanged::removing(BTreeSet::from([id])));
        }

        Ok(SelectionChanged::adding(resolver.closure_to_add(id)))
    }

    fn decide_group<I>(&self, ids: I) -> Result<SelectionChanged, MatrixError>
    where
        I: IntoIterator<Item = PermissionId>,
    {
        let group: BTreeSet<PermissionId> = ids
            .into_iter()
            .filter(|id| !self.selection.is_inherited(*id))
            .collect();
        if group.is_empty() {
            return Ok(SelectionChanged::default());
        }

        let resolver = self.resolver();
        if !group.iter().all(|id| self.selection.is_explicit(*id)) {
            let added = resolver
                .closure_for_all(group.iter().copied())
                .into_iter()
                .filter(|id| !self.selection.is_inherited(*id))
                .collect();
            return Ok(SelectionChanged::adding(added));
        }

        let plan = resolver.plan_group_removal(&group);
        if plan.removable.is_empty() {
            return Err(MatrixError::DependencyConflict {
                requested: group,
                blocking: plan.external_blockers,
            });
        }
        Ok(SelectionChanged {
            added: BTreeSet::new(),
            removed: plan.removable,
            retained: plan.retained,
        })
    }

    fn decide_cascade(&self, id: PermissionId) -> Result<SelectionChanged, MatrixError> {
        if !self.catalog.contains(id) {
            if self.selection.is_explicit(id) {
                return Ok(SelectionChanged::removing(BTreeSet::from([id])));
            }
            return Err(MatrixError::UnknownPermission(id));
        }
        if self.selection.is_inherited(id) {
            return Err(MatrixError::ReadOnlyPermission(id));
        }
        if !self.selection.is_explicit(id) {
            return Ok(SelectionChanged::default());
        }

        let dependents: BTreeSet<PermissionId> = self
            .resolver()
            .transitive_dependents_of(id)
            .into_iter()
            .filter(|d| self.selection.is_effective(*d))
            .collect();
        let inherited: BTreeSet<PermissionId> = dependents
            .iter()
            .copied()
            .filter(|d| self.selection.is_inherited(*d))
            .collect();
        if !inherited.is_empty() {
            return Err(MatrixError::DependencyConflict {
                requested: BTreeSet::from([id]),
                blocking: inherited,
            });
        }

        let mut removed = dependents;
        removed.insert(id);
        Ok(SelectionChanged::removing(removed))
    }
}

/// Add prerequisites until the effective selection is closed.
fn heal(catalog: &PermissionCatalog, selection: &mut Selection) {
    loop {
        let additions = {
            let resolver = DependencyResolver::new(catalog, selection);
            resolver.closure_for_all(resolver.violations().into_iter().map(|v| v.missing))
        };
        if additions.is_empty() {
            break;
        }
        selection.grant(additions);
    }
}

impl AggregateRoot for MatrixSession {
    type Id = SessionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for MatrixSession {
    type Command = MatrixCommand;
    type Event = SelectionChanged;
    type Error = MatrixError;

    fn apply(&mut self, event: &Self::Event) {
        self.selection.revoke(&event.removed);
        self.selection.grant(event.added.iter().copied());
        self.version += 1;

        tracing::debug!(
            session_id = %self.id,
            version = self.version,
            added = ?event.added,
            removed = ?event.removed,
            retained = ?event.retained,
            "selection changed"
        );
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let change = match command {
            MatrixCommand::TogglePermission(id) => self.decide_permission(*id)?,
            MatrixCommand::TogglePage {
                module_code,
                page_code,
            } => {
                let page = self.resolve_page(module_code.as_deref(), page_code)?;
                self.decide_group(page.permission_ids())?
            }
            MatrixCommand::ToggleModule(module_code) => {
                let module = self
                    .catalog
                    .module(module_code)
                    .ok_or_else(|| MatrixError::UnknownModule(module_code.clone()))?;
                self.decide_group(module.permission_ids())?
            }
            MatrixCommand::RevokeWithDependents(id) => self.decide_cascade(*id)?,
        };

        if change.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(vec![change])
        }
    }
}
