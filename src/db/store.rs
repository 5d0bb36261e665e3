//! Atomic persistence of an invoice header and its line items.

use sqlx::error::BoxDynError;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::backend::{Backend, WriteTx};
use super::schema::{self, ProvisionError};
use crate::models::{round_cents, Invoice, LineItem, StoredInvoice};

#[derive(Debug, Error)]
pub enum SaveError {
    /// Provisioning failed; nothing was written
    #[error("save failed")]
    SchemaFailure(#[from] ProvisionError),

    /// An insert or the commit failed; the transaction was rolled back
    #[error("save failed")]
    WriteFailure(#[source] BoxDynError),
}

#[derive(Debug, Error)]
#[error("failed to load invoice {id}")]
pub struct LoadError {
    pub id: i32,
    #[source]
    pub source: BoxDynError,
}

/// Writes invoices through a [`Backend`]
pub struct InvoiceStore<B> {
    backend: B,
}

impl<B: Backend> InvoiceStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Provision the schema on its own, without writing anything
    pub async fn ensure_schema(&self) -> Result<schema::Provisioned, ProvisionError> {
        let mut session = self
            .backend
            .acquire()
            .await
            .map_err(ProvisionError::Unavailable)?;

        schema::ensure_schema(session.as_mut()).await
    }

    /// Save an invoice header with all of its line items as one unit.
    ///
    /// Either the header and every line item become visible, or nothing does.
    /// The stored total is the caller-supplied `total_amount` (0 when absent);
    /// each line amount is taken from [`LineItem::amount`]. Every money value is
    /// rounded with [`round_cents`] before it is bound, as it is before printing.
    pub async fn save_invoice(&self, invoice: &Invoice) -> Result<i32, SaveError> {
        // One connection for the whole call, released when `session` drops
        let mut session = self
            .backend
            .acquire()
            .await
            .map_err(ProvisionError::Unavailable)?;

        let provisioned = schema::ensure_schema(session.as_mut()).await?;
        debug!(created = provisioned.created, "Schema checked");

        let total_amount = round_cents(invoice.total_amount.unwrap_or(0.0));
        let line_items_total = invoice.line_items_total();
        if (total_amount - line_items_total).abs() > 0.005 {
            warn!(
                invoice_number = %invoice.invoice_number,
                total_amount,
                line_items_total,
                "Supplied total does not match the line items"
            );
        }

        let mut tx = session.begin().await.map_err(SaveError::WriteFailure)?;

        match write_invoice(tx.as_mut(), invoice, total_amount).await {
            Ok(invoice_id) => {
                tx.commit().await.map_err(SaveError::WriteFailure)?;
                info!(
                    invoice_id,
                    invoice_number = %invoice.invoice_number,
                    line_items = invoice.line_items.len(),
                    "Invoice saved"
                );
                Ok(invoice_id)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                warn!(
                    invoice_number = %invoice.invoice_number,
                    error = %err,
                    "Invoice save rolled back"
                );
                Err(SaveError::WriteFailure(err))
            }
        }
    }

    /// Read back a stored invoice with its line items in insertion order
    pub async fn load_invoice(&self, id: i32) -> Result<Option<StoredInvoice>, LoadError> {
        let mut session = self
            .backend
            .acquire()
            .await
            .map_err(|source| LoadError { id, source })?;

        session
            .fetch_invoice(id)
            .await
            .map_err(|source| LoadError { id, source })
    }
}

/// Insert the header, then each line item in input order
async fn write_invoice(
    tx: &mut dyn WriteTx,
    invoice: &Invoice,
    total_amount: f64,
) -> Result<i32, BoxDynError> {
    let invoice_id = tx.insert_invoice(invoice, total_amount).await?;

    for (index, item) in invoice.line_items.iter().enumerate() {
        debug!(invoice_id, index, description = %item.description, "Inserting line item");
        let priced = LineItem {
            unit_price: round_cents(item.unit_price),
            ..item.clone()
        };
        tx.insert_line_item(invoice_id, &priced, round_cents(item.amount())).await?;
    }

    Ok(invoice_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryBackend;
    use crate::layout::format::format_money;
    use crate::layout::{layout, DrawInstruction};
    use crate::models::sample_invoice;

    fn store() -> (MemoryBackend, InvoiceStore<MemoryBackend>) {
        let backend = MemoryBackend::new();
        (backend.clone(), InvoiceStore::new(backend))
    }

    #[tokio::test]
    async fn test_save_persists_header_and_line_items() {
        let (_, store) = store();
        let mut invoice = sample_invoice();
        invoice.line_items = vec![
            LineItem::new("Design", 2, 150.0),
            LineItem::new("Build", 10, 95.5),
            LineItem::new("Support", 1, 0.0),
        ];

        let id = store.save_invoice(&invoice).await.unwrap();
        let stored = store.load_invoice(id).await.unwrap().unwrap();

        assert_eq!(stored.line_items.len(), 3);
        for (row, item) in stored.line_items.iter().zip(&invoice.line_items) {
            assert_eq!(row.invoice_id, id);
            assert_eq!(row.description, item.description);
            assert_eq!(row.amount, f64::from(item.quantity) * item.unit_price);
        }
    }

    #[tokio::test]
    async fn test_acme_widget_scenario() {
        let (_, store) = store();
        let invoice = sample_invoice();

        let id = store.save_invoice(&invoice).await.unwrap();
        let stored = store.load_invoice(id).await.unwrap().unwrap();

        assert_eq!(stored.invoice.company_name, "Acme");
        assert_eq!(stored.invoice.total_amount, 30.0);
        assert_eq!(stored.invoice.status, "draft");
        let row = &stored.line_items[0];
        assert_eq!((row.quantity, row.unit_price, row.amount), (3, 10.0, 30.0));
    }

    #[tokio::test]
    async fn test_zero_line_items() {
        let (backend, store) = store();
        let mut invoice = sample_invoice();
        invoice.line_items.clear();
        invoice.total_amount = Some(0.0);

        let id = store.save_invoice(&invoice).await.unwrap();
        let stored = store.load_invoice(id).await.unwrap().unwrap();

        assert!(stored.line_items.is_empty());
        assert_eq!(backend.invoice_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_line_item_rolls_back_everything() {
        let (backend, store) = store();
        backend.fail_line_item_insert(1);
        let mut invoice = sample_invoice();
        invoice.line_items = vec![
            LineItem::new("First", 1, 1.0),
            LineItem::new("Second", 1, 2.0),
            LineItem::new("Third", 1, 3.0),
        ];

        let err = store.save_invoice(&invoice).await.unwrap_err();

        assert!(matches!(err, SaveError::WriteFailure(_)));
        assert_eq!(
            format!("{:#}", anyhow::Error::from(err)),
            "save failed: connection reset by peer"
        );
        assert_eq!(backend.invoice_count(), 0);
        assert_eq!(backend.line_item_count(), 0);
        assert_eq!(backend.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_schema_failure_aborts_before_writing() {
        let (backend, store) = store();
        backend.fail_ddl();

        let err = store.save_invoice(&sample_invoice()).await.unwrap_err();

        assert!(matches!(err, SaveError::SchemaFailure(ProvisionError::Ddl { .. })));
        assert_eq!(backend.invoice_count(), 0);
        assert_eq!(backend.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_schema_is_provisioned_once_across_saves() {
        let (backend, store) = store();

        store.save_invoice(&sample_invoice()).await.unwrap();
        store.save_invoice(&sample_invoice()).await.unwrap();

        assert_eq!(backend.ddl_statements(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_invoice_numbers_get_distinct_ids() {
        let (backend, store) = store();
        let invoice = sample_invoice();

        let first = store.save_invoice(&invoice).await.unwrap();
        let second = store.save_invoice(&invoice).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(backend.invoice_count(), 2);
        assert_eq!(backend.line_item_count(), 2);
    }

    #[tokio::test]
    async fn test_supplied_total_is_stored_unchanged() {
        let (_, store) = store();
        let mut invoice = sample_invoice();
        invoice.total_amount = None;

        let id = store.save_invoice(&invoice).await.unwrap();
        let stored = store.load_invoice(id).await.unwrap().unwrap();

        assert_eq!(stored.invoice.total_amount, 0.0);
        assert_eq!(stored.line_items[0].amount, 30.0);
    }

    #[tokio::test]
    async fn test_load_missing_invoice() {
        let (_, store) = store();
        store.ensure_schema().await.unwrap();

        assert!(store.load_invoice(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_schema_failure_message_names_cause_once() {
        let (backend, store) = store();
        backend.fail_ddl();

        let err = store.save_invoice(&sample_invoice()).await.unwrap_err();

        assert_eq!(
            format!("{:#}", anyhow::Error::from(err)),
            "save failed: failed to create invoices table: permission denied for schema public"
        );
    }

    fn money_texts(invoice: &Invoice) -> Vec<String> {
        layout(invoice)
            .into_iter()
            .filter_map(|instruction| match instruction {
                DrawInstruction::Text { text, .. } if text.starts_with('$') => Some(text),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_half_cent_amounts_match_rendered_text() {
        let (_, store) = store();

        for (price, expected) in [(1.005, "$1.00"), (9.005, "$9.01")] {
            let mut invoice = sample_invoice();
            invoice.line_items = vec![LineItem::new("Stamp", 1, price)];
            invoice.total_amount = Some(price);

            let id = store.save_invoice(&invoice).await.unwrap();
            let stored = store.load_invoice(id).await.unwrap().unwrap();
            let row = &stored.line_items[0];

            // unit price, amount, total
            assert_eq!(money_texts(&invoice), [expected, expected, expected]);
            assert_eq!(format_money(row.unit_price), expected);
            assert_eq!(format_money(row.amount), expected);
            assert_eq!(format_money(stored.invoice.total_amount), expected);
        }
    }

    #[tokio::test]
    async fn test_stored_values_are_whole_cents() {
        let (_, store) = store();
        let mut invoice = sample_invoice();
        invoice.line_items = vec![LineItem::new("Stamp", 1, 1.005), LineItem::new("Pin", 1, 9.005)];
        invoice.total_amount = Some(invoice.line_items_total());

        let id = store.save_invoice(&invoice).await.unwrap();
        let stored = store.load_invoice(id).await.unwrap().unwrap();

        assert_eq!(stored.line_items[0].unit_price, 1.0);
        assert_eq!(stored.line_items[1].amount, 9.01);
        assert_eq!(stored.invoice.total_amount, 10.01);
        assert_eq!(money_texts(&invoice).last().map(String::as_str), Some("$10.01"));
    }
}
