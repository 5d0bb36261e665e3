//! Storage seam between the invoice core and a relational backend.
//!
//! A [`Backend`] hands out one [`Session`] per unit of work. The session owns a
//! single connection for its whole lifetime and gives it back when dropped.

use async_trait::async_trait;
use sqlx::error::BoxDynError;

use crate::models::{Invoice, LineItem, StoredInvoice};

/// Source of database sessions
#[async_trait]
pub trait Backend: Send + Sync {
    /// Acquire a connection for the duration of one session
    async fn acquire(&self) -> Result<Box<dyn Session>, BoxDynError>;
}

/// A single acquired connection
#[async_trait]
pub trait Session: Send {
    /// Catalog query: does `table` exist in the current schema?
    async fn table_exists(&mut self, table: &str) -> Result<bool, BoxDynError>;

    /// Open a transaction on this session's connection
    async fn begin<'s>(&'s mut self) -> Result<Box<dyn WriteTx + 's>, BoxDynError>;

    /// Read an invoice header and its line items
    async fn fetch_invoice(&mut self, id: i32) -> Result<Option<StoredInvoice>, BoxDynError>;
}

/// An open write transaction.
///
/// Dropping it without calling [`WriteTx::commit`] rolls it back.
#[async_trait]
pub trait WriteTx: Send {
    /// Run one statement without parameters (DDL)
    async fn execute(&mut self, sql: &str) -> Result<(), BoxDynError>;

    /// Insert the header row and return its generated id
    async fn insert_invoice(&mut self, invoice: &Invoice, total_amount: f64) -> Result<i32, BoxDynError>;

    async fn insert_line_item(
        &mut self,
        invoice_id: i32,
        item: &LineItem,
        amount: f64,
    ) -> Result<(), BoxDynError>;

    async fn commit(&mut self) -> Result<(), BoxDynError>;

    async fn rollback(&mut self) -> Result<(), BoxDynError>;
}
