//! In-memory implementation of the storage seam for tests.
//!
//! Rows and tables created inside a transaction stay private to it until commit. Sequence
//! values are consumed even when the transaction rolls back, as in Postgres.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::error::BoxDynError;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::backend::{Backend, Session, WriteTx};
use super::schema::{INVOICES_TABLE, LINE_ITEMS_TABLE};
use crate::models::{Invoice, InvoiceRecord, LineItem, LineItemRecord, StoredInvoice};

#[derive(Default)]
struct MemoryState {
    tables: HashSet<String>,
    ddl_statements: usize,
    fail_catalog: bool,
    fail_ddl_at: Option<usize>,
    fail_line_item_at: Option<usize>,
    invoices: Vec<InvoiceRecord>,
    line_items: Vec<LineItemRecord>,
    next_invoice_id: i32,
    next_line_item_id: i32,
    open_sessions: usize,
}

#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the catalog probe fail
    pub fn fail_catalog(&self) {
        lock(&self.state).fail_catalog = true;
    }

    /// Make the first DDL statement of every transaction fail
    pub fn fail_ddl(&self) {
        self.fail_ddl_at(0);
    }

    /// Make the DDL statement at zero-based position `index` of each transaction fail
    pub fn fail_ddl_at(&self, index: usize) {
        lock(&self.state).fail_ddl_at = Some(index);
    }

    pub fn clear_ddl_failure(&self) {
        lock(&self.state).fail_ddl_at = None;
    }

    /// Make the line-item insert at zero-based position `index` of each transaction fail
    pub fn fail_line_item_insert(&self, index: usize) {
        lock(&self.state).fail_line_item_at = Some(index);
    }

    pub fn has_table(&self, table: &str) -> bool {
        lock(&self.state).tables.contains(table)
    }

    pub fn ddl_statements(&self) -> usize {
        lock(&self.state).ddl_statements
    }

    pub fn invoice_count(&self) -> usize {
        lock(&self.state).invoices.len()
    }

    pub fn line_item_count(&self) -> usize {
        lock(&self.state).line_items.len()
    }

    pub fn open_sessions(&self) -> usize {
        lock(&self.state).open_sessions
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn acquire(&self) -> Result<Box<dyn Session>, BoxDynError> {
        lock(&self.state).open_sessions += 1;
        Ok(Box::new(MemorySession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MemorySession {
    state: Arc<Mutex<MemoryState>>,
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        lock(&self.state).open_sessions -= 1;
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn table_exists(&mut self, table: &str) -> Result<bool, BoxDynError> {
        let state = lock(&self.state);
        if state.fail_catalog {
            return Err("canceling statement due to statement timeout".into());
        }
        Ok(state.tables.contains(table))
    }

    async fn begin<'s>(&'s mut self) -> Result<Box<dyn WriteTx + 's>, BoxDynError> {
        Ok(Box::new(MemoryTx {
            state: Arc::clone(&self.state),
            tables: Vec::new(),
            ddl_statements: 0,
            invoices: Vec::new(),
            line_items: Vec::new(),
        }))
    }

    async fn fetch_invoice(&mut self, id: i32) -> Result<Option<StoredInvoice>, BoxDynError> {
        let state = lock(&self.state);
        let Some(invoice) = state.invoices.iter().find(|invoice| invoice.id == id) else {
            return Ok(None);
        };

        let line_items = state
            .line_items
            .iter()
            .filter(|item| item.invoice_id == id)
            .cloned()
            .collect();

        Ok(Some(StoredInvoice {
            invoice: invoice.clone(),
            line_items,
        }))
    }
}

/// Staged rows of one transaction; dropping it discards them
struct MemoryTx {
    state: Arc<Mutex<MemoryState>>,
    tables: Vec<String>,
    ddl_statements: usize,
    invoices: Vec<InvoiceRecord>,
    line_items: Vec<LineItemRecord>,
}

#[async_trait]
impl WriteTx for MemoryTx {
    async fn execute(&mut self, sql: &str) -> Result<(), BoxDynError> {
        let mut state = lock(&self.state);
        if state.fail_ddl_at == Some(self.ddl_statements) {
            return Err("permission denied for schema public".into());
        }
        self.ddl_statements += 1;
        state.ddl_statements += 1;

        if let Some(rest) = sql.trim().strip_prefix("CREATE TABLE IF NOT EXISTS ") {
            if let Some(table) = rest.split_whitespace().next() {
                self.tables.push(table.to_string());
            }
        }
        Ok(())
    }

    async fn insert_invoice(&mut self, invoice: &Invoice, total_amount: f64) -> Result<i32, BoxDynError> {
        let mut state = lock(&self.state);
        if !state.tables.contains(INVOICES_TABLE) {
            return Err("relation \"invoices\" does not exist".into());
        }

        state.next_invoice_id += 1;
        let now = Utc::now();
        let record = InvoiceRecord {
            id: state.next_invoice_id,
            invoice_number: invoice.invoice_number.clone(),
            invoice_date: invoice.invoice_date,
            due_date: invoice.due_date,
            company_name: invoice.company_name.clone(),
            company_address: invoice.company_address.clone(),
            company_email: invoice.company_email.clone(),
            company_phone: invoice.company_phone.clone(),
            client_name: invoice.client_name.clone(),
            client_address: invoice.client_address.clone(),
            client_email: invoice.client_email.clone(),
            notes: invoice.notes().map(str::to_string),
            total_amount,
            status: "draft".to_string(),
            created_at: now,
            updated_at: now,
        };

        let id = record.id;
        self.invoices.push(record);
        Ok(id)
    }

    async fn insert_line_item(
        &mut self,
        invoice_id: i32,
        item: &LineItem,
        amount: f64,
    ) -> Result<(), BoxDynError> {
        let mut state = lock(&self.state);
        if !state.tables.contains(LINE_ITEMS_TABLE) {
            return Err("relation \"line_items\" does not exist".into());
        }
        if state.fail_line_item_at == Some(self.line_items.len()) {
            return Err("connection reset by peer".into());
        }

        let parent_visible = self.invoices.iter().any(|invoice| invoice.id == invoice_id)
            || state.invoices.iter().any(|invoice| invoice.id == invoice_id);
        if !parent_visible {
            return Err("insert on table \"line_items\" violates foreign key constraint".into());
        }

        state.next_line_item_id += 1;
        self.line_items.push(LineItemRecord {
            id: state.next_line_item_id,
            invoice_id,
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            amount,
        });
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), BoxDynError> {
        let mut state = lock(&self.state);
        state.tables.extend(self.tables.drain(..));
        state.invoices.append(&mut self.invoices);
        state.line_items.append(&mut self.line_items);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), BoxDynError> {
        self.tables.clear();
        self.invoices.clear();
        self.line_items.clear();
        Ok(())
    }
}
