//! Entity trait: identity + a label for catalog nodes.

/// Entity marker + minimal interface.
///
/// Modules, pages and permissions are all entities: two nodes with the same
/// identifier are the same node even if their display data differs.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Human-readable label for logs and error messages.
    fn label(&self) -> &str;
}
