//! Field-level comparison of two product states.
//!
//! Used to consolidate a manual product edit into a single audit movement:
//! the comparison yields one entry per changed field with its old and new
//! value rendered as text.

use crate::product::Product;

/// A single changed field, with both values rendered for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: &'static str,
    pub old: String,
    pub new: String,
}

impl FieldChange {
    pub fn describe(&self) -> String {
        format!("{}: {} -> {}", self.field, self.old, self.new)
    }
}

/// Compare two states of the same product, field by field.
///
/// Absent and blank text values are treated as equal so that a round trip
/// through a form (where missing values come back as empty strings) does not
/// produce phantom changes.
pub fn changed_fields(before: &Product, after: &Product) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    compare_text(&mut changes, "code", &before.code, &after.code);
    compare_text(&mut changes, "name", &before.name, &after.name);
    compare_opt_text(&mut changes, "barcode", &before.barcode, &after.barcode);
    compare_opt_text(
        &mut changes,
        "description",
        &before.description,
        &after.description,
    );
    compare_opt_text(&mut changes, "category", &before.category, &after.category);
    compare_opt_text(&mut changes, "location", &before.location, &after.location);
    compare_opt_text(&mut changes, "supplier", &before.supplier, &after.supplier);
    compare_opt_text(&mut changes, "unit", &before.unit, &after.unit);

    compare_value(
        &mut changes,
        "stock_current",
        Some(before.stock_current),
        Some(after.stock_current),
    );
    compare_value(&mut changes, "stock_min", before.stock_min, after.stock_min);
    compare_value(&mut changes, "stock_max", before.stock_max, after.stock_max);

    compare_value(
        &mut changes,
        "cost_price",
        Some(before.pricing.cost_price),
        Some(after.pricing.cost_price),
    );
    compare_value(
        &mut changes,
        "sale_price",
        before.pricing.sale_price,
        after.pricing.sale_price,
    );
    compare_opt_text(
        &mut changes,
        "currency",
        &before.pricing.currency,
        &after.pricing.currency,
    );

    compare_value(
        &mut changes,
        "length_mm",
        before.dimensions.length_mm,
        after.dimensions.length_mm,
    );
    compare_value(
        &mut changes,
        "width_mm",
        before.dimensions.width_mm,
        after.dimensions.width_mm,
    );
    compare_value(
        &mut changes,
        "height_mm",
        before.dimensions.height_mm,
        after.dimensions.height_mm,
    );
    compare_value(
        &mut changes,
        "weight_g",
        before.dimensions.weight_g,
        after.dimensions.weight_g,
    );

    compare_value(
        &mut changes,
        "active",
        Some(before.active),
        Some(after.active),
    );

    changes
}

fn compare_text(changes: &mut Vec<FieldChange>, field: &'static str, old: &str, new: &str) {
    if old != new {
        changes.push(FieldChange {
            field,
            old: render_text(old),
            new: render_text(new),
        });
    }
}

fn compare_opt_text(
    changes: &mut Vec<FieldChange>,
    field: &'static str,
    old: &Option<String>,
    new: &Option<String>,
) {
    let old = old.as_deref().map(str::trim).filter(|v| !v.is_empty());
    let new = new.as_deref().map(str::trim).filter(|v| !v.is_empty());
    if old != new {
        changes.push(FieldChange {
            field,
            old: render_text(old.unwrap_or("")),
            new: render_text(new.unwrap_or("")),
        });
    }
}

fn compare_value<T>(changes: &mut Vec<FieldChange>, field: &'static str, old: Option<T>, new: Option<T>)
where
    T: PartialEq + ToString,
{
    if old != new {
        changes.push(FieldChange {
            field,
            old: render_value(&old),
            new: render_value(&new),
        });
    }
}

fn render_text(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

fn render_value<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}
