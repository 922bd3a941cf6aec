//! Invoice records, their totals, and a persisted store for them.
//!
//! [`totals::compute_totals`] is the only place money is computed.
//! [`store::InvoiceStore`] holds the working set and writes it through an
//! [`storage::InvoiceBackend`] after every change. [`query`] derives the
//! sorted listing and the aggregate figures.

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod numeric;
pub mod query;
pub mod render;
pub mod storage;
pub mod store;
pub mod totals;

pub use error::{ConfigError, RenderError, StorageError};
pub use model::{
    ClientInfo, Edit, Invoice, InvoiceId, InvoiceStatus, LineItem, LineItemId, sanitize_for_save,
};
pub use query::{PortfolioStats, list_for_display, portfolio_stats};
pub use storage::{InvoiceBackend, JsonFileBackend, MemoryBackend};
pub use store::InvoiceStore;
pub use totals::{Totals, compute_totals};
