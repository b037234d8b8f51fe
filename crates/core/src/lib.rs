//! `permatrix-core` — shared primitives for the permission matrix.
//!
//! This crate contains **pure domain** primitives (no rendering, no storage).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{PermissionId, RoleId, SessionId};
