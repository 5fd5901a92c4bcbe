//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. Two value
/// objects with the same attribute values are the same value; to "modify"
/// one, build a new one. `Pricing { cost_price: 100, .. }` is a value
/// object; a product with an id is an entity.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
