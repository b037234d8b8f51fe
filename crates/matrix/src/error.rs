use std::collections::BTreeSet;

use thiserror::Error;

use permatrix_core::{DomainError, PermissionId};

use crate::catalog::CatalogError;
use crate::resolver::Violation;

fn join_ids(ids: &BTreeSet<PermissionId>) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn join_violations(violations: &[Violation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Signals returned by matrix operations.
///
/// None of these are fatal: a rejected operation leaves the selection exactly
/// as it was.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatrixError {
    #[error("permission {0} is inherited from a parent role and cannot be changed here")]
    ReadOnlyPermission(PermissionId),

    #[error("cannot remove [{}]: still required by [{}]", join_ids(.requested), join_ids(.blocking))]
    DependencyConflict {
        requested: BTreeSet<PermissionId>,
        blocking: BTreeSet<PermissionId>,
    },

    #[error("unknown permission {0}")]
    UnknownPermission(PermissionId),

    #[error("unknown page '{page}'")]
    UnknownPage { module: Option<String>, page: String },

    #[error("page code '{page}' exists in several modules: {modules:?}")]
    AmbiguousPage { page: String, modules: Vec<String> },

    #[error("unknown module '{0}'")]
    UnknownModule(String),

    #[error("persisted selection breaks dependency closure: {}", join_violations(.0))]
    InconsistentSelection(Vec<Violation>),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl From<MatrixError> for DomainError {
    fn from(err: MatrixError) -> Self {
        let msg = err.to_string();
        match err {
            MatrixError::ReadOnlyPermission(_) => DomainError::read_only(msg),
            MatrixError::DependencyConflict { .. } => DomainError::conflict(msg),
            MatrixError::UnknownPermission(_)
            | MatrixError::UnknownPage { .. }
            | MatrixError::UnknownModule(_) => DomainError::not_found(msg),
            MatrixError::AmbiguousPage { .. } | MatrixError::Catalog(_) => DomainError::validation(msg),
            MatrixError::InconsistentSelection(_) => DomainError::invariant(msg),
        }
    }
}
