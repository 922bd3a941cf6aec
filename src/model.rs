use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Days, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::numeric;
use crate::totals::{Totals, compute_totals};

/// Days between an invoice date and its default due date.
pub const DEFAULT_TERMS_DAYS: u64 = 7;

// Last issued id sequence (milliseconds since the epoch, bumped on collision).
static LAST_INVOICE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Invoice identifier. Stable once created; there is no way to change the
/// id of an existing [`Invoice`]. Outside this crate an id comes either from
/// [`InvoiceId::generate`] or from deserializing a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(String);

impl InvoiceId {
    /// Generate an id that is unique within this process. Ids are the
    /// current epoch milliseconds, or one past the last id handed out if
    /// the clock has not moved since.
    pub fn generate() -> Self {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let prev = LAST_INVOICE_SEQ
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        Self(format!("inv_{}", now.max(prev + 1)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
impl From<&str> for InvoiceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Line item identifier, unique within one invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemId(pub u64);

impl fmt::Display for LineItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "numeric::deserialize_lenient")]
    pub qty: f64,
    #[serde(default, deserialize_with = "numeric::deserialize_lenient")]
    pub price: f64,
}

impl LineItem {
    pub fn blank(id: LineItemId) -> Self {
        Self {
            id,
            description: String::new(),
            qty: 1.0,
            price: 0.0,
        }
    }

    /// qty × price. Derived on every call, never stored.
    pub fn amount(&self) -> f64 {
        numeric::coerce(self.qty) * numeric::coerce(self.price)
    }

    /// Empty description, no quantity and no price.
    pub fn is_blank(&self) -> bool {
        self.description.trim().is_empty()
            && numeric::coerce(self.qty) <= 0.0
            && numeric::coerce(self.price) <= 0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientInfo {
    pub name: String,
    pub email: String,
    pub address: String,
}

/// Invoice status. Any status may be assigned from any other; there is no
/// enforced workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Saved,
    Sent,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 5] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Saved,
        InvoiceStatus::Sent,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "Draft",
            InvoiceStatus::Saved => "Saved",
            InvoiceStatus::Sent => "Sent",
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Overdue => "Overdue",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown invoice status: {0}")]
pub struct ParseStatusError(String);

impl FromStr for InvoiceStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    id: InvoiceId,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub client: ClientInfo,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default, deserialize_with = "numeric::deserialize_lenient")]
    pub tax_rate: f64,
    #[serde(default, deserialize_with = "numeric::deserialize_lenient")]
    pub discount: f64,
    #[serde(default)]
    pub notes: String,
}

/// A single edit coming from the front end, carrying raw input.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    ClientName(String),
    ClientEmail(String),
    ClientAddress(String),
    Date(String),
    DueDate(String),
    Status(InvoiceStatus),
    Notes(String),
    TaxRate(String),
    Discount(String),
    AddItem,
    RemoveItem(LineItemId),
    ItemDescription(LineItemId, String),
    ItemQty(LineItemId, String),
    ItemPrice(LineItemId, String),
}

impl Invoice {
    /// A fresh draft dated today.
    pub fn new_draft() -> Self {
        Self::draft_on(Local::now().date_naive())
    }

    /// A fresh draft dated `today`, due [`DEFAULT_TERMS_DAYS`] later, with
    /// one blank line item.
    pub fn draft_on(today: NaiveDate) -> Self {
        Self::with_id(InvoiceId::generate(), today)
    }

    /// Same as [`Invoice::draft_on`] with a caller-chosen id.
    pub(crate) fn with_id(id: InvoiceId, today: NaiveDate) -> Self {
        let due_date = today
            .checked_add_days(Days::new(DEFAULT_TERMS_DAYS))
            .unwrap_or(today);
        Self {
            id,
            date: today,
            due_date,
            status: InvoiceStatus::Draft,
            client: ClientInfo::default(),
            items: vec![LineItem::blank(LineItemId(1))],
            tax_rate: 0.0,
            discount: 0.0,
            notes: String::new(),
        }
    }

    pub fn id(&self) -> &InvoiceId {
        &self.id
    }

    pub fn totals(&self) -> Totals {
        compute_totals(&self.items, self.discount, self.tax_rate)
    }

    /// Append a blank item and return its id.
    pub fn add_item(&mut self) -> LineItemId {
        let next = self.items.iter().map(|it| it.id.0).max().unwrap_or(0) + 1;
        let id = LineItemId(next);
        self.items.push(LineItem::blank(id));
        id
    }

    pub fn remove_item(&mut self, id: LineItemId) {
        self.items.retain(|it| it.id != id);
    }

    pub fn item_mut(&mut self, id: LineItemId) -> Option<&mut LineItem> {
        self.items.iter_mut().find(|it| it.id == id)
    }

    pub fn apply(&mut self, edit: Edit) {
        match edit {
            Edit::ClientName(v) => self.client.name = v,
            Edit::ClientEmail(v) => self.client.email = v,
            Edit::ClientAddress(v) => self.client.address = v,
            Edit::Date(raw) => {
                if let Some(date) = parse_date(&raw) {
                    self.date = date;
                }
            }
            Edit::DueDate(raw) => {
                if let Some(date) = parse_date(&raw) {
                    self.due_date = date;
                }
            }
            Edit::Status(status) => self.status = status,
            Edit::Notes(v) => self.notes = v,
            Edit::TaxRate(raw) => self.tax_rate = numeric::parse_or_zero(&raw),
            Edit::Discount(raw) => self.discount = numeric::parse_or_zero(&raw),
            Edit::AddItem => {
                self.add_item();
            }
            Edit::RemoveItem(id) => self.remove_item(id),
            Edit::ItemDescription(id, v) => {
                if let Some(item) = self.item_mut(id) {
                    item.description = v;
                }
            }
            Edit::ItemQty(id, raw) => {
                if let Some(item) = self.item_mut(id) {
                    item.qty = numeric::parse_or_zero(&raw);
                }
            }
            Edit::ItemPrice(id, raw) => {
                if let Some(item) = self.item_mut(id) {
                    item.price = numeric::parse_or_zero(&raw);
                }
            }
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::debug!(input = raw, error = %e, "ignoring unparseable date");
            None
        }
    }
}

/// Normalize an invoice before it is persisted: trim client fields, drop
/// blank items, and promote `Draft` to `Saved`. Other statuses are kept.
pub fn sanitize_for_save(mut invoice: Invoice) -> Invoice {
    invoice.client = ClientInfo {
        name: invoice.client.name.trim().to_string(),
        email: invoice.client.email.trim().to_string(),
        address: invoice.client.address.trim().to_string(),
    };
    invoice.items.retain(|it| !it.is_blank());
    if invoice.status == InvoiceStatus::Draft {
        invoice.status = InvoiceStatus::Saved;
    }
    invoice
}
