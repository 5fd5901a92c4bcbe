//! Products domain module.
//!
//! This crate contains business rules for the product catalog, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod diff;
pub mod patch;
pub mod product;

pub use diff::{FieldChange, changed_fields};
pub use patch::ProductPatch;
pub use product::{Dimensions, Pricing, Product, ProductDraft};
