//! Subtotal, discount, tax and total for a set of line items.
//!
//! Every figure shown anywhere (draft preview, list rows, printouts,
//! portfolio stats) comes from [`compute_totals`]. Nothing is rounded here.

use serde::Serialize;

use crate::model::LineItem;
use crate::numeric;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Totals {
    pub subtotal: f64,
    pub discount_applied: f64,
    pub taxed_base: f64,
    pub tax: f64,
    pub total: f64,
}

/// Compute totals for `items` with an absolute `discount` and a percentage
/// `tax_rate`. The discount is clamped to `[0, subtotal]`.
pub fn compute_totals(items: &[LineItem], discount: f64, tax_rate: f64) -> Totals {
    let subtotal = items.iter().fold(0.0, |acc, it| acc + it.amount());
    let discount_applied = numeric::coerce(discount).min(subtotal);
    // Clamp away -0.0 so printed figures never read "-0.00".
    let taxed_base = (subtotal - discount_applied).max(0.0);
    let tax = numeric::coerce(tax_rate) / 100.0 * taxed_base;

    Totals {
        subtotal,
        discount_applied,
        taxed_base,
        tax,
        total: taxed_base + tax,
    }
}
