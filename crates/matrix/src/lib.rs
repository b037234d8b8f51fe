//! `permatrix-matrix` — role permission matrix engine.
//!
//! Maintains the explicit grants of one role over a module → page →
//! permission catalog, keeping every granted permission's prerequisite
//! granted and never touching permissions inherited from a parent role.
//!
//! This crate is intentionally decoupled from rendering, HTTP and storage.

pub mod catalog;
pub mod config;
pub mod error;
pub mod permission;
pub mod projector;
pub mod resolver;
pub mod roles;
pub mod selection;
pub mod session;
pub mod snapshot;

pub use catalog::{CatalogBuilder, CatalogError, Module, Page, PermissionCatalog};
pub use config::{ConfigError, MatrixConfig};
pub use error::MatrixError;
pub use permission::{Action, Permission, PermissionCode, Prerequisite};
pub use projector::{GroupState, MatrixView, RowState, TriStateProjector, group_state};
pub use resolver::{DependencyResolver, RemovalPlan, Violation};
pub use roles::{EditedRole, RoleCode};
pub use selection::Selection;
pub use session::{MatrixCommand, MatrixSession, SelectionChanged};
pub use snapshot::{SelectionDiff, SelectionSnapshot};

pub use permatrix_core::{PermissionId, RoleId, SessionId};
