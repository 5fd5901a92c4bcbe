use serde::{Deserialize, Deserializer};

use crate::product::{Dimensions, Product, normalize_optional};

/// Partial update for a product.
///
/// Every field distinguishes three states on the wire: absent (leave the
/// stored value untouched), `null` (clear the stored value), and a concrete
/// value (replace it). Clearable fields use `Option<Option<T>>` for that;
/// required fields plainly use `Option<T>`.
///
/// `active` is deliberately not part of the patch. Activation and
/// deactivation are separate operations with their own rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductPatch {
    pub code: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub barcode: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub supplier: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub unit: Option<Option<String>>,
    pub stock_current: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub stock_min: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub stock_max: Option<Option<i64>>,
    pub cost_price: Option<u64>,
    #[serde(default, deserialize_with = "double_option")]
    pub sale_price: Option<Option<u64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub currency: Option<Option<String>>,
    pub dimensions: Option<Dimensions>,
}

/// Deserialize a field that was present, keeping `null` as `Some(None)`.
/// Combined with `#[serde(default)]`, an absent field stays `None`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl Product {
    /// Apply a partial update in place. Validation runs afterwards on the
    /// patched state, so an invalid patch never reaches the store.
    pub fn apply_patch(&mut self, patch: &ProductPatch) {
        if let Some(code) = &patch.code {
            self.code = code.trim().to_string();
        }
        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(barcode) = &patch.barcode {
            self.barcode = normalize_optional(barcode.clone());
        }
        if let Some(description) = &patch.description {
            self.description = normalize_optional(description.clone());
        }
        if let Some(category) = &patch.category {
            self.category = normalize_optional(category.clone());
        }
        if let Some(location) = &patch.location {
            self.location = normalize_optional(location.clone());
        }
        if let Some(supplier) = &patch.supplier {
            self.supplier = normalize_optional(supplier.clone());
        }
        if let Some(unit) = &patch.unit {
            self.unit = normalize_optional(unit.clone());
        }
        if let Some(stock_current) = patch.stock_current {
            self.stock_current = stock_current;
        }
        if let Some(stock_min) = patch.stock_min {
            self.stock_min = stock_min;
        }
        if let Some(stock_max) = patch.stock_max {
            self.stock_max = stock_max;
        }
        if let Some(cost_price) = patch.cost_price {
            self.pricing.cost_price = cost_price;
        }
        if let Some(sale_price) = patch.sale_price {
            self.pricing.sale_price = sale_price;
        }
        if let Some(currency) = &patch.currency {
            self.pricing.currency = normalize_optional(currency.clone());
        }
        if let Some(dimensions) = patch.dimensions {
            self.dimensions = dimensions;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kardex_core::ProductId;

    use crate::product::ProductDraft;

    fn test_product() -> Product {
        let draft = ProductDraft {
            code: "PRD-001".to_string(),
            name: "Test Product".to_string(),
            barcode: Some("8412345678905".to_string()),
            description: None,
            category: None,
            location: Some("A-1".to_string()),
            supplier: None,
            unit: None,
            pricing: None,
            dimensions: None,
            stock_current: Some(10),
            stock_min: Some(2),
            stock_max: None,
        };
        Product::create(ProductId::new(), draft, Utc::now()).unwrap()
    }

    #[test]
    fn empty_patch_is_identity() {
        let mut product = test_product();
        let before = product.clone();

        product.apply_patch(&ProductPatch::default());
        assert_eq!(product, before);
    }

    #[test]
    fn absent_field_deserializes_to_untouched() {
        let patch: ProductPatch = serde_json::from_str(r#"{"name":"Renamed"}"#).unwrap();
        assert_eq!(patch.name, Some("Renamed".to_string()));
        assert_eq!(patch.barcode, None);
        assert_eq!(patch.stock_min, None);
    }

    #[test]
    fn null_field_deserializes_to_clear() {
        let patch: ProductPatch =
            serde_json::from_str(r#"{"barcode":null,"stock_min":null}"#).unwrap();
        assert_eq!(patch.barcode, Some(None));
        assert_eq!(patch.stock_min, Some(None));

        let mut product = test_product();
        product.apply_patch(&patch);
        assert_eq!(product.barcode, None);
        assert_eq!(product.stock_min, None);
    }

    #[test]
    fn concrete_field_deserializes_to_replace() {
        let patch: ProductPatch =
            serde_json::from_str(r#"{"barcode":"1111111111111","stock_current":25}"#).unwrap();

        let mut product = test_product();
        product.apply_patch(&patch);
        assert_eq!(product.barcode, Some("1111111111111".to_string()));
        assert_eq!(product.stock_current, 25);
    }

    #[test]
    fn blank_text_value_clears_like_null() {
        let patch: ProductPatch = serde_json::from_str(r#"{"location":"   "}"#).unwrap();

        let mut product = test_product();
        product.apply_patch(&patch);
        assert_eq!(product.location, None);
    }

    #[test]
    fn patched_state_still_goes_through_validation() {
        let patch: ProductPatch = serde_json::from_str(r#"{"stock_current":-5}"#).unwrap();

        let mut product = test_product();
        product.apply_patch(&patch);
        assert!(product.validate().is_err());
    }

    #[test]
    fn pricing_fields_patch_individually() {
        let patch: ProductPatch =
            serde_json::from_str(r#"{"cost_price":500,"sale_price":750,"currency":"EUR"}"#)
                .unwrap();

        let mut product = test_product();
        product.apply_patch(&patch);
        assert_eq!(product.pricing.cost_price, 500);
        assert_eq!(product.pricing.sale_price, Some(750));
        assert_eq!(product.pricing.currency, Some("EUR".to_string()));
    }
}
