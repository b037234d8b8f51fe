//! Dependency queries over a catalog and a selection.
//!
//! Every function here is pure: the resolver borrows both inputs and never
//! mutates them. The session decides what to do with the answers.

use std::collections::{BTreeSet, VecDeque};

use serde::Serialize;

use permatrix_core::PermissionId;

use crate::catalog::PermissionCatalog;
use crate::selection::Selection;

/// A selected permission whose prerequisite is not selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Violation {
    pub dependent: PermissionId,
    pub missing: PermissionId,
}

impl core::fmt::Display for Violation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} requires {}", self.dependent, self.missing)
    }
}

/// Outcome of planning the removal of a whole group (page or module).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalPlan {
    /// Members that can be removed together.
    pub removable: BTreeSet<PermissionId>,
    /// Members that must stay because something outside the group needs them.
    pub retained: BTreeSet<PermissionId>,
    /// Selected permissions outside the group that pin `retained` in place.
    pub external_blockers: BTreeSet<PermissionId>,
}

#[derive(Debug, Clone, Copy)]
pub struct DependencyResolver<'a> {
    catalog: &'a PermissionCatalog,
    selection: &'a Selection,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(catalog: &'a PermissionCatalog, selection: &'a Selection) -> Self {
        Self { catalog, selection }
    }

    /// True if `id` has no prerequisite or its prerequisite is effective.
    pub fn is_satisfied(&self, id: PermissionId) -> bool {
        match self.catalog.prerequisite_of(id) {
            None => true,
            Some(prerequisite) => self.selection.is_effective(prerequisite),
        }
    }

    /// Permissions whose direct prerequisite is `id`.
    pub fn dependents_of(&self, id: PermissionId) -> BTreeSet<PermissionId> {
        self.catalog.dependents_of(id).collect()
    }

    /// Every permission that reaches `id` through one or more prerequisite hops.
    pub fn transitive_dependents_of(&self, id: PermissionId) -> BTreeSet<PermissionId> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for dependent in self.catalog.dependents_of(current) {
                if dependent != id && seen.insert(dependent) {
                    queue.push_back(dependent);
                }
            }
        }
        seen
    }

    /// Minimal set to add so that `id` is selected with its chain satisfied.
    ///
    /// Walks up the prerequisite chain from `id`, stopping at the first
    /// permission that is already effective. Never contains an effective id.
    pub fn closure_to_add(&self, id: PermissionId) -> BTreeSet<PermissionId> {
        let mut closure = BTreeSet::new();
        let mut current = Some(id);
        while let Some(next) = current {
            if self.selection.is_effective(next) || !closure.insert(next) {
                break;
            }
            current = self.catalog.prerequisite_of(next);
        }
        closure
    }

    /// Union of [`closure_to_add`](Self::closure_to_add) over `ids`.
    pub fn closure_for_all<I>(&self, ids: I) -> BTreeSet<PermissionId>
    where
        I: IntoIterator<Item = PermissionId>,
    {
        ids.into_iter()
            .flat_map(|id| self.closure_to_add(id))
            .collect()
    }

    /// Explicitly selected permissions that directly depend on `id`.
    pub fn blocking_dependents(&self, id: PermissionId) -> BTreeSet<PermissionId> {
        self.catalog
            .dependents_of(id)
            .filter(|d| self.selection.is_explicit(*d))
            .collect()
    }

    /// Inherited permissions that directly depend on `id`.
    pub fn inherited_dependents(&self, id: PermissionId) -> BTreeSet<PermissionId> {
        self.catalog
            .dependents_of(id)
            .filter(|d| self.selection.is_inherited(*d) && !self.selection.is_explicit(*d))
            .collect()
    }

    /// Every effective permission whose prerequisite is not effective.
    pub fn violations(&self) -> Vec<Violation> {
        self.selection
            .effective()
            .into_iter()
            .filter_map(|dependent| {
                let missing = self.catalog.prerequisite_of(dependent)?;
                (!self.selection.is_effective(missing)).then_some(Violation { dependent, missing })
            })
            .collect()
    }

    pub fn is_consistent(&self) -> bool {
        self.violations().is_empty()
    }

    /// Decide which members of `group` can be removed as one batch.
    ///
    /// Members depended on by an effective permission outside the group are
    /// retained, along with their prerequisites inside the group. Dependents
    /// inside the group do not block each other.
    pub fn plan_group_removal(&self, group: &BTreeSet<PermissionId>) -> RemovalPlan {
        let mut plan = RemovalPlan::default();

        for member in group {
            let outside: Vec<PermissionId> = self
                .catalog
                .dependents_of(*member)
                .filter(|d| !group.contains(d) && self.selection.is_effective(*d))
                .collect();
            if outside.is_empty() {
                continue;
            }
            plan.external_blockers.extend(outside);

            let mut current = Some(*member);
            while let Some(id) = current {
                if !group.contains(&id) || !plan.retained.insert(id) {
                    break;
                }
                current = self.catalog.prerequisite_of(id);
            }
        }

        plan.removable = group.difference(&plan.retained).copied().collect();
        plan
    }
}
