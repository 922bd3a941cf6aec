//! Printable HTML for a single invoice.

use serde::Serialize;
use slug::slugify;
use tera::{Context, Tera};

use crate::error::RenderError;
use crate::model::{ClientInfo, Invoice, InvoiceId};

// Embedded so the binary works without a templates directory on disk.
const INVOICE_TEMPLATE: &str = include_str!("../templates/invoice.html.tera");
// The .html suffix turns on Tera's autoescaping.
const TEMPLATE_NAME: &str = "invoice.html";

/// Two decimals, the only money formatting this crate does.
pub fn money(value: f64) -> String {
    format!("{value:.2}")
}

/// File name for the printout of `id`. Ids come from storage and may have
/// been edited by hand, so only the slug is used, never the raw id.
pub fn output_file_name(id: &InvoiceId) -> String {
    let stem = slugify(id.as_str());
    let stem = if stem.is_empty() { "invoice".to_string() } else { stem };
    format!("{stem}.html")
}

#[derive(Serialize)]
struct LineView<'a> {
    description: &'a str,
    qty: String,
    price: String,
    amount: String,
}

#[derive(Serialize)]
struct InvoiceView<'a> {
    id: &'a str,
    date: String,
    due_date: String,
    status: &'static str,
    client: &'a ClientInfo,
    lines: Vec<LineView<'a>>,
    notes: &'a str,
    tax_rate: String,
    subtotal: String,
    discount: String,
    tax: String,
    total: String,
}

impl<'a> InvoiceView<'a> {
    fn new(invoice: &'a Invoice) -> Self {
        let totals = invoice.totals();
        Self {
            id: invoice.id().as_str(),
            date: invoice.date.to_string(),
            due_date: invoice.due_date.to_string(),
            status: invoice.status.as_str(),
            client: &invoice.client,
            lines: invoice
                .items
                .iter()
                .map(|it| LineView {
                    description: &it.description,
                    qty: it.qty.to_string(),
                    price: money(it.price),
                    amount: money(it.amount()),
                })
                .collect(),
            notes: &invoice.notes,
            tax_rate: invoice.tax_rate.to_string(),
            subtotal: money(totals.subtotal),
            discount: money(totals.discount_applied),
            tax: money(totals.tax),
            total: money(totals.total),
        }
    }
}

pub struct InvoiceRenderer {
    tera: Tera,
}

impl InvoiceRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, INVOICE_TEMPLATE)?;
        Ok(Self { tera })
    }

    pub fn render(&self, invoice: &Invoice) -> Result<String, RenderError> {
        let context = Context::from_serialize(InvoiceView::new(invoice))?;
        Ok(self.tera.render(TEMPLATE_NAME, &context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InvoiceStatus, LineItem, LineItemId};
    use chrono::NaiveDate;

    fn sample() -> Invoice {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut inv = Invoice::with_id("inv_7".into(), day);
        inv.client.name = "Acme <Ltd>".into();
        inv.client.address = "1 Main St\nSpringfield".into();
        inv.items = vec![LineItem {
            id: LineItemId(1),
            description: "Widgets".into(),
            qty: 2.0,
            price: 50.0,
        }];
        inv.tax_rate = 10.0;
        inv.status = InvoiceStatus::Sent;
        inv
    }

    #[test]
    fn money_rounds_to_two_places() {
        assert_eq!(money(110.0), "110.00");
        assert_eq!(money(1234.5), "1234.50");
        assert_eq!(money(2.0 / 3.0), "0.67");
    }

    #[test]
    fn output_file_name_stays_inside_the_output_dir() {
        assert_eq!(output_file_name(&"inv_1700000000000".into()), "inv-1700000000000.html");
        assert_eq!(output_file_name(&"../../x".into()), "x.html");
        assert_eq!(output_file_name(&"/etc/passwd".into()), "etc-passwd.html");
        assert_eq!(output_file_name(&"..\\..".into()), "invoice.html");

        let out = std::path::Path::new("/tmp/out");
        let path = out.join(output_file_name(&"../../x".into()));
        assert_eq!(path.parent(), Some(out));
    }

    #[test]
    fn renders_totals_from_the_engine() {
        let html = InvoiceRenderer::new().unwrap().render(&sample()).unwrap();
        assert!(html.contains("Invoice inv_7"));
        assert!(html.contains("Due: 2024-03-08"));
        assert!(html.contains("<span>Subtotal</span><span>100.00</span>"));
        assert!(html.contains("<span>-0.00</span>"));
        assert!(html.contains("Tax (10%)"));
        assert!(html.contains("<span>Total</span><span>110.00</span>"));
        assert!(!html.contains("Notes:"));
    }

    #[test]
    fn escapes_user_text() {
        let html = InvoiceRenderer::new().unwrap().render(&sample()).unwrap();
        assert!(html.contains("Acme &lt;Ltd&gt;"));
        assert!(!html.contains("Acme <Ltd>"));
    }

    #[test]
    fn blank_client_name_shows_dash_and_notes_render() {
        let mut inv = sample();
        inv.client.name.clear();
        inv.notes = "Pay by wire".into();
        let html = InvoiceRenderer::new().unwrap().render(&inv).unwrap();
        assert!(html.contains("<div>-</div>"));
        assert!(html.contains("Notes: Pay by wire"));
    }
}
