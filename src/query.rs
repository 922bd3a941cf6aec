//! Read-only projections over the invoice collection.
//!
//! Nothing here mutates its input, and every figure is produced by
//! [`compute_totals`](crate::totals::compute_totals) via [`Invoice::totals`].

use std::collections::{BTreeMap, HashMap};

use chrono::Datelike;
use serde::Serialize;

use crate::model::{Invoice, InvoiceStatus};
use crate::totals::Totals;

/// Placeholder shown for invoices without a client name.
pub const UNTITLED_CLIENT: &str = "Untitled Client";

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PortfolioStats {
    pub count: usize,
    pub total_billed: f64,
    pub total_paid: f64,
}

/// One row of the invoice list.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRow<'a> {
    pub invoice: &'a Invoice,
    pub totals: Totals,
}

/// Billed total split into paid and everything else.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Breakdown {
    pub paid: f64,
    pub unpaid: f64,
}

impl Breakdown {
    pub fn billed(&self) -> f64 {
        self.paid + self.unpaid
    }

    fn add(&mut self, invoice: &Invoice) {
        let total = invoice.totals().total;
        if invoice.status == InvoiceStatus::Paid {
            self.paid += total;
        } else {
            self.unpaid += total;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    pub year: i32,
    /// `(month, breakdown)`, most recent month first. Months without
    /// invoices are omitted.
    pub months: Vec<(u32, Breakdown)>,
    pub total: Breakdown,
}

/// Sorted by invoice date, most recent first. Equal dates keep collection
/// order.
pub fn list_for_display(invoices: &[Invoice]) -> Vec<&Invoice> {
    let mut sorted: Vec<&Invoice> = invoices.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}

/// [`list_for_display`] with totals precomputed per row.
pub fn display_rows(invoices: &[Invoice]) -> Vec<DisplayRow<'_>> {
    list_for_display(invoices)
        .into_iter()
        .map(|invoice| DisplayRow {
            invoice,
            totals: invoice.totals(),
        })
        .collect()
}

pub fn filter_by_status(invoices: &[Invoice], status: InvoiceStatus) -> Vec<&Invoice> {
    list_for_display(invoices)
        .into_iter()
        .filter(|inv| inv.status == status)
        .collect()
}

pub fn portfolio_stats(invoices: &[Invoice]) -> PortfolioStats {
    let mut stats = PortfolioStats {
        count: invoices.len(),
        ..PortfolioStats::default()
    };
    for invoice in invoices {
        let total = invoice.totals().total;
        stats.total_billed += total;
        if invoice.status == InvoiceStatus::Paid {
            stats.total_paid += total;
        }
    }
    stats
}

/// Per-month paid/unpaid totals for invoices dated in `year`.
pub fn monthly_summary(invoices: &[Invoice], year: i32) -> MonthlySummary {
    let mut by_month: BTreeMap<u32, Breakdown> = BTreeMap::new();
    let mut total = Breakdown::default();

    for invoice in invoices.iter().filter(|inv| inv.date.year() == year) {
        by_month.entry(invoice.date.month()).or_default().add(invoice);
        total.add(invoice);
    }

    MonthlySummary {
        year,
        months: by_month.into_iter().rev().collect(),
        total,
    }
}

/// Per-client totals, largest billed first. Clients are grouped by their
/// trimmed name.
pub fn client_summary(invoices: &[Invoice]) -> Vec<(String, Breakdown)> {
    let mut by_client: HashMap<String, Breakdown> = HashMap::new();
    for invoice in invoices {
        let name = invoice.client.name.trim();
        let name = if name.is_empty() { UNTITLED_CLIENT } else { name };
        by_client.entry(name.to_string()).or_default().add(invoice);
    }

    let mut rows: Vec<_> = by_client.into_iter().collect();
    rows.sort_by(|a, b| {
        b.1.billed()
            .total_cmp(&a.1.billed())
            .then_with(|| a.0.cmp(&b.0))
    });
    rows
}
