//! Explicit and inherited grant sets of the role under edit.

use std::collections::BTreeSet;

use permatrix_core::PermissionId;

/// Explicit and inherited grants for the role being edited.
///
/// The effective selection (`explicit ∪ inherited`) is derived on demand.
/// `inherited` is fixed at construction; only the session mutates `explicit`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    explicit: BTreeSet<PermissionId>,
    inherited: BTreeSet<PermissionId>,
}

impl Selection {
    pub fn new<E, I>(explicit: E, inherited: I) -> Self
    where
        E: IntoIterator<Item = PermissionId>,
        I: IntoIterator<Item = PermissionId>,
    {
        Self {
            explicit: explicit.into_iter().collect(),
            inherited: inherited.into_iter().collect(),
        }
    }

    pub fn explicit(&self) -> &BTreeSet<PermissionId> {
        &self.explicit
    }

    pub fn inherited(&self) -> &BTreeSet<PermissionId> {
        &self.inherited
    }

    pub fn is_explicit(&self, id: PermissionId) -> bool {
        self.explicit.contains(&id)
    }

    pub fn is_inherited(&self, id: PermissionId) -> bool {
        self.inherited.contains(&id)
    }

    pub fn is_effective(&self, id: PermissionId) -> bool {
        self.is_explicit(id) || self.is_inherited(id)
    }

    pub fn effective(&self) -> BTreeSet<PermissionId> {
        self.explicit.union(&self.inherited).copied().collect()
    }

    pub(crate) fn grant<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = PermissionId>,
    {
        self.explicit.extend(ids);
    }

    pub(crate) fn revoke<'a, I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = &'a PermissionId>,
    {
        for id in ids {
            self.explicit.remove(id);
        }
    }
}
