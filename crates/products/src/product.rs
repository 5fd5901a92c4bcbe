use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kardex_core::{AggregateRoot, DomainError, DomainResult, ProductId, ValueObject};

/// Purchase/sale pricing for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub cost_price: u64, // Price in smallest currency unit (e.g., cents)
    pub sale_price: Option<u64>,
    pub currency: Option<String>, // ISO currency code (e.g., "USD", "EUR")
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            cost_price: 0,
            sale_price: None,
            currency: None,
        }
    }
}

impl ValueObject for Pricing {}

impl Pricing {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(sale_price) = self.sale_price {
            if sale_price < self.cost_price {
                return Err(DomainError::validation(
                    "sale_price cannot be below cost_price",
                ));
            }
        }
        Ok(())
    }
}

/// Physical dimensions of a product. All fields optional; when present they
/// must be strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Dimensions {
    pub length_mm: Option<u32>,
    pub width_mm: Option<u32>,
    pub height_mm: Option<u32>,
    pub weight_g: Option<u32>,
}

impl ValueObject for Dimensions {}

impl Dimensions {
    pub fn validate(&self) -> DomainResult<()> {
        let fields = [
            ("length_mm", self.length_mm),
            ("width_mm", self.width_mm),
            ("height_mm", self.height_mm),
            ("weight_g", self.weight_g),
        ];
        for (name, value) in fields {
            if value == Some(0) {
                return Err(DomainError::validation(format!("{name} must be positive")));
            }
        }
        Ok(())
    }
}

/// Aggregate root: Product.
///
/// `stock_current` is a materialized view of the movement ledger; every change
/// to it goes through the ledger engine or the catalog service, never through
/// ad-hoc writes. Deactivation (`active = false`) hides a product from normal
/// operation while keeping its movement history intact; deletion is a separate,
/// guarded operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub code: String,
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub supplier: Option<String>,
    pub unit: Option<String>,
    pub pricing: Pricing,
    pub dimensions: Dimensions,
    pub stock_current: i64,
    pub stock_min: Option<i64>,
    pub stock_max: Option<i64>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

/// Input for creating a product. Missing optional fields default to empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub pricing: Option<Pricing>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub stock_current: Option<i64>,
    #[serde(default)]
    pub stock_min: Option<i64>,
    #[serde(default)]
    pub stock_max: Option<i64>,
}

/// Trim an optional text field, treating blank values as absent.
pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Product {
    /// Build a new product from a draft. Fails with `Validation` if any field
    /// rule is violated. Uniqueness of `code`/`barcode` is checked by the
    /// catalog service against the store, not here.
    pub fn create(id: ProductId, draft: ProductDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        let product = Self {
            id,
            code: draft.code.trim().to_string(),
            barcode: normalize_optional(draft.barcode),
            name: draft.name.trim().to_string(),
            description: normalize_optional(draft.description),
            category: normalize_optional(draft.category),
            location: normalize_optional(draft.location),
            supplier: normalize_optional(draft.supplier),
            unit: normalize_optional(draft.unit),
            pricing: draft.pricing.unwrap_or_default(),
            dimensions: draft.dimensions.unwrap_or_default(),
            stock_current: draft.stock_current.unwrap_or(0),
            stock_min: draft.stock_min,
            stock_max: draft.stock_max,
            active: true,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        product.validate()?;
        Ok(product)
    }

    /// Check every field-level rule. Called on creation and after every patch.
    pub fn validate(&self) -> DomainResult<()> {
        if self.code.trim().is_empty() {
            return Err(DomainError::validation("code cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if let Some(barcode) = &self.barcode {
            if barcode.trim().is_empty() {
                return Err(DomainError::validation("barcode cannot be empty"));
            }
        }
        if self.stock_current < 0 {
            return Err(DomainError::validation("stock_current cannot be negative"));
        }
        if let Some(stock_min) = self.stock_min {
            if stock_min < 0 {
                return Err(DomainError::validation("stock_min cannot be negative"));
            }
        }
        if let Some(stock_max) = self.stock_max {
            if stock_max < 0 {
                return Err(DomainError::validation("stock_max cannot be negative"));
            }
        }
        if let (Some(stock_min), Some(stock_max)) = (self.stock_min, self.stock_max) {
            if stock_max < stock_min {
                return Err(DomainError::validation("stock_max cannot be below stock_min"));
            }
        }
        self.pricing.validate()?;
        self.dimensions.validate()?;
        Ok(())
    }

    /// Replace the stock level. Only the ledger engine and the catalog call
    /// this; both hold the per-product write lock when they do.
    pub fn set_stock_level(&mut self, level: i64) -> DomainResult<()> {
        if level < 0 {
            return Err(DomainError::validation("stock level cannot be negative"));
        }
        self.stock_current = level;
        Ok(())
    }

    /// Mark a persisted change: bump the version and refresh `updated_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }

    pub fn activate(&mut self) -> DomainResult<()> {
        if self.active {
            return Err(DomainError::conflict("product is already active"));
        }
        self.active = true;
        Ok(())
    }

    pub fn deactivate(&mut self) -> DomainResult<()> {
        if !self.active {
            return Err(DomainError::conflict("product is already inactive"));
        }
        self.active = false;
        Ok(())
    }

    /// Check if the product sits at or below its configured minimum.
    /// Products without a `stock_min` are never low.
    pub fn is_low_stock(&self) -> bool {
        matches!(self.stock_min, Some(min) if self.stock_current <= min)
    }

    /// Case-insensitive substring match over the searchable text fields.
    pub fn matches_search(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        self.code.to_lowercase().contains(&needle)
            || self.name.to_lowercase().contains(&needle)
            || matches_optional(&self.barcode, &needle)
            || matches_optional(&self.category, &needle)
            || matches_optional(&self.location, &needle)
    }
}

fn matches_optional(field: &Option<String>, needle: &str) -> bool {
    field
        .as_deref()
        .is_some_and(|v| v.to_lowercase().contains(needle))
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
