//! In-memory invoice collection mirrored to a storage backend.

use crate::error::StorageError;
use crate::model::{Invoice, InvoiceId, InvoiceStatus, sanitize_for_save};
use crate::storage::InvoiceBackend;

/// Ordered invoice collection with a single optional selection.
///
/// Construction loads whatever the backend holds. A missing or unreadable
/// slot yields an empty store. Single unreadable records are skipped.
/// Every mutation writes the whole collection back. When that write fails
/// the in-memory change is kept and the error is returned so the caller can
/// report it.
#[derive(Debug)]
pub struct InvoiceStore<B: InvoiceBackend> {
    invoices: Vec<Invoice>,
    selected: Option<InvoiceId>,
    backend: B,
}

impl<B: InvoiceBackend> InvoiceStore<B> {
    pub fn open(backend: B) -> Self {
        let invoices = match backend.load() {
            Ok(Some(invoices)) => {
                tracing::debug!(count = invoices.len(), "loaded invoices");
                invoices
            }
            Ok(None) => {
                tracing::debug!("no stored invoices, starting empty");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "stored invoices unreadable, starting empty");
                Vec::new()
            }
        };
        Self {
            invoices,
            selected: None,
            backend,
        }
    }

    /// Replace the invoice with the same id in place, or insert it at the
    /// front. The upserted invoice becomes the selection.
    pub fn upsert(&mut self, invoice: Invoice) -> Result<(), StorageError> {
        let id = invoice.id().clone();
        match self.position(&id) {
            Some(idx) => {
                tracing::debug!(invoice = %id, "replacing invoice");
                self.invoices[idx] = invoice;
            }
            None => {
                tracing::info!(invoice = %id, "adding invoice");
                self.invoices.insert(0, invoice);
            }
        }
        self.selected = Some(id);
        self.persist()
    }

    /// Remove the invoice with `id`. Absent ids are a no-op and do not touch
    /// storage.
    pub fn delete(&mut self, id: &InvoiceId) -> Result<(), StorageError> {
        let Some(idx) = self.position(id) else {
            tracing::debug!(invoice = %id, "delete of unknown invoice ignored");
            return Ok(());
        };
        self.invoices.remove(idx);
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        tracing::info!(invoice = %id, "deleted invoice");
        self.persist()
    }

    pub fn get(&self, id: &InvoiceId) -> Option<&Invoice> {
        self.invoices.iter().find(|inv| inv.id() == id)
    }

    /// Every invoice in store order (most recently inserted first).
    pub fn all(&self) -> &[Invoice] {
        &self.invoices
    }

    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }

    /// Select `id`, or clear the selection if no such invoice exists.
    pub fn select(&mut self, id: &InvoiceId) {
        self.selected = self.get(id).map(|inv| inv.id().clone());
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&Invoice> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    /// A detached copy to edit: the selected invoice, or a new draft.
    pub fn edit_draft(&self) -> Invoice {
        self.selected().cloned().unwrap_or_else(Invoice::new_draft)
    }

    /// Sanitize `draft` and upsert it.
    pub fn save_draft(&mut self, draft: Invoice) -> Result<(), StorageError> {
        self.upsert(sanitize_for_save(draft))
    }

    /// Give the stored invoice `id` exactly `status`, normalizing the rest
    /// of the record the same way [`save_draft`](Self::save_draft) does.
    /// Returns `Ok(false)` when no such invoice exists.
    pub fn set_status(
        &mut self,
        id: &InvoiceId,
        status: InvoiceStatus,
    ) -> Result<bool, StorageError> {
        let Some(current) = self.get(id).cloned() else {
            tracing::debug!(invoice = %id, "status change for unknown invoice ignored");
            return Ok(false);
        };
        let mut invoice = sanitize_for_save(current);
        invoice.status = status;
        tracing::info!(invoice = %id, %status, "status changed");
        self.upsert(invoice).map(|()| true)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn position(&self, id: &InvoiceId) -> Option<usize> {
        self.invoices.iter().position(|inv| inv.id() == id)
    }

    fn persist(&mut self) -> Result<(), StorageError> {
        self.backend.save(&self.invoices).inspect_err(|e| {
            tracing::error!(error = %e, "failed to persist invoices");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InvoiceStatus;
    use crate::storage::MemoryBackend;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(id: &str) -> Invoice {
        Invoice::with_id(id.into(), date(2024, 1, 1))
    }

    fn ids<B: InvoiceBackend>(store: &InvoiceStore<B>) -> Vec<&str> {
        store.all().iter().map(|inv| inv.id().as_str()).collect()
    }

    struct FailingBackend;

    impl InvoiceBackend for FailingBackend {
        fn load(&self) -> Result<Option<Vec<Invoice>>, StorageError> {
            Ok(None)
        }

        fn save(&mut self, _invoices: &[Invoice]) -> Result<(), StorageError> {
            Err(StorageError::Io {
                path: "/dev/full".into(),
                source: std::io::Error::other("disk full"),
            })
        }
    }

    #[test]
    fn new_invoices_go_to_the_front() {
        let mut store = InvoiceStore::open(MemoryBackend::new());
        store.upsert(invoice("a")).unwrap();
        store.upsert(invoice("b")).unwrap();
        assert_eq!(ids(&store), vec!["b", "a"]);
    }

    #[test]
    fn upsert_then_get_returns_same_value() {
        let mut store = InvoiceStore::open(MemoryBackend::new());
        let mut inv = invoice("a");
        inv.notes = "net 30".into();
        store.upsert(inv.clone()).unwrap();
        assert_eq!(store.get(inv.id()), Some(&inv));
    }

    #[test]
    fn upsert_existing_id_replaces_in_place() {
        let mut store = InvoiceStore::open(MemoryBackend::new());
        store.upsert(invoice("a")).unwrap();
        store.upsert(invoice("b")).unwrap();
        store.upsert(invoice("c")).unwrap();

        let mut second = invoice("b");
        second.client.name = "Second payload".into();
        store.upsert(second).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(ids(&store), vec!["c", "b", "a"]);
        assert_eq!(store.get(&"b".into()).unwrap().client.name, "Second payload");
    }

    #[test]
    fn upsert_selects_the_invoice() {
        let mut store = InvoiceStore::open(MemoryBackend::new());
        store.upsert(invoice("a")).unwrap();
        assert_eq!(store.selected().map(|i| i.id().as_str()), Some("a"));
    }

    #[test]
    fn delete_removes_and_clears_selection() {
        let mut store = InvoiceStore::open(MemoryBackend::new());
        store.upsert(invoice("a")).unwrap();
        store.delete(&"a".into()).unwrap();
        assert!(store.get(&"a".into()).is_none());
        assert!(store.selected().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn delete_of_other_invoice_keeps_selection() {
        let mut store = InvoiceStore::open(MemoryBackend::new());
        store.upsert(invoice("a")).unwrap();
        store.upsert(invoice("b")).unwrap();
        store.delete(&"a".into()).unwrap();
        assert_eq!(store.selected().map(|i| i.id().as_str()), Some("b"));
    }

    #[test]
    fn delete_of_absent_id_is_a_noop() {
        let mut store = InvoiceStore::open(MemoryBackend::new());
        store.upsert(invoice("a")).unwrap();
        let writes = store.backend().writes();

        store.delete(&"missing".into()).unwrap();
        assert_eq!(ids(&store), vec!["a"]);
        assert_eq!(store.backend().writes(), writes);
    }

    #[test]
    fn every_mutation_persists_the_whole_collection() {
        let mut store = InvoiceStore::open(MemoryBackend::new());
        store.upsert(invoice("a")).unwrap();
        store.upsert(invoice("b")).unwrap();
        store.delete(&"a".into()).unwrap();
        assert_eq!(store.backend().writes(), 3);

        let reloaded = InvoiceStore::open(store.backend().clone());
        assert_eq!(reloaded.all(), store.all());
    }

    #[test]
    fn corrupt_storage_opens_empty() {
        let store = InvoiceStore::open(MemoryBackend::with_raw("[{\"id\": 3"));
        assert!(store.is_empty());
        assert!(store.selected().is_none());
    }

    #[test]
    fn wrong_shape_storage_opens_empty() {
        let store = InvoiceStore::open(MemoryBackend::with_raw("{\"invoices\": []}"));
        assert!(store.is_empty());
    }

    #[test]
    fn one_unreadable_record_does_not_wipe_the_others() {
        let raw = r#"[
            { "id": "good", "date": "2024-01-01", "dueDate": "2024-01-08", "status": "Paid",
              "items": [{ "id": 1, "description": "Work", "qty": 1, "price": 100 }] },
            { "id": "cleared", "date": "", "dueDate": "", "status": "Draft" }
        ]"#;
        let mut store = InvoiceStore::open(MemoryBackend::with_raw(raw));
        assert_eq!(ids(&store), vec!["good"]);

        store.upsert(invoice("new")).unwrap();
        let reloaded = InvoiceStore::open(store.backend().clone());
        assert_eq!(ids(&reloaded), vec!["new", "good"]);
    }

    #[test]
    fn failed_write_keeps_memory_change() {
        let mut store = InvoiceStore::open(FailingBackend);
        let err = store.upsert(invoice("a"));
        assert!(err.is_err());
        assert!(store.get(&"a".into()).is_some());
    }

    #[test]
    fn select_unknown_id_clears_selection() {
        let mut store = InvoiceStore::open(MemoryBackend::new());
        store.upsert(invoice("a")).unwrap();
        store.select(&"nope".into());
        assert!(store.selected().is_none());
        store.select(&"a".into());
        assert!(store.selected().is_some());
        store.clear_selection();
        assert!(store.selected().is_none());
    }

    #[test]
    fn editing_a_draft_leaves_store_untouched() {
        let mut store = InvoiceStore::open(MemoryBackend::new());
        store.upsert(invoice("a")).unwrap();

        let mut draft = store.edit_draft();
        assert_eq!(draft.id().as_str(), "a");
        draft.notes = "changed".into();
        assert_eq!(store.get(&"a".into()).unwrap().notes, "");

        store.save_draft(draft).unwrap();
        assert_eq!(store.get(&"a".into()).unwrap().notes, "changed");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn edit_draft_without_selection_is_fresh() {
        let store = InvoiceStore::open(MemoryBackend::new());
        let draft = store.edit_draft();
        assert_eq!(draft.status, InvoiceStatus::Draft);
        assert!(store.get(draft.id()).is_none());
    }

    #[test]
    fn save_draft_sanitizes() {
        let mut store = InvoiceStore::open(MemoryBackend::new());
        let mut draft = invoice("a");
        draft.client.name = "  Acme  ".into();
        draft.items[0].qty = 0.0;
        store.save_draft(draft).unwrap();

        let saved = store.get(&"a".into()).unwrap();
        assert_eq!(saved.client.name, "Acme");
        assert!(saved.items.is_empty());
        assert_eq!(saved.status, InvoiceStatus::Saved);
    }

    #[test]
    fn edit_draft_without_selection_never_repeats_an_id() {
        let mut store = InvoiceStore::open(MemoryBackend::new());
        let first = store.edit_draft();
        let second = store.edit_draft();
        assert_ne!(first.id(), second.id());

        store.save_draft(first).unwrap();
        store.clear_selection();
        store.save_draft(second).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn set_status_normalizes_and_keeps_the_chosen_status() {
        let raw = r#"[{
            "id": "legacy", "date": "2024-01-01", "dueDate": "2024-01-08", "status": "Sent",
            "client": { "name": "  Acme  ", "email": " a@acme.test" },
            "items": [
                { "id": 1, "description": "Work", "qty": 1, "price": 10 },
                { "id": 2, "description": " ", "qty": 0, "price": 0 }
            ]
        }]"#;
        let mut store = InvoiceStore::open(MemoryBackend::with_raw(raw));
        let id = store.all()[0].id().clone();

        assert!(store.set_status(&id, InvoiceStatus::Draft).unwrap());
        let inv = store.get(&id).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Draft);
        assert_eq!(inv.client.name, "Acme");
        assert_eq!(inv.client.email, "a@acme.test");
        assert_eq!(inv.items.len(), 1);
        assert_eq!(store.backend().writes(), 1);

        assert!(store.set_status(&id, InvoiceStatus::Paid).unwrap());
        assert_eq!(store.get(&id).unwrap().status, InvoiceStatus::Paid);
    }

    #[test]
    fn set_status_of_unknown_invoice_is_a_noop() {
        let mut store = InvoiceStore::open(MemoryBackend::new());
        assert!(!store.set_status(&"missing".into(), InvoiceStatus::Paid).unwrap());
        assert_eq!(store.backend().writes(), 0);
    }
}
