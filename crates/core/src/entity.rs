//! Entity trait: identity that persists across state changes.

/// Entity marker + minimal interface.
///
/// A movement record is an entity (its id names one event forever); the
/// pricing attached to a product is not (see [`crate::ValueObject`]).
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
