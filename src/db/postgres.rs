//! PostgreSQL implementation of the storage seam using sqlx.

use async_trait::async_trait;
use sqlx::error::BoxDynError;
use sqlx::pool::PoolConnection;
use sqlx::{Connection, Postgres, Transaction};

use super::backend::{Backend, Session, WriteTx};
use super::Database;
use crate::models::{Invoice, InvoiceRecord, LineItem, LineItemRecord, StoredInvoice};

#[async_trait]
impl Backend for Database {
    async fn acquire(&self) -> Result<Box<dyn Session>, BoxDynError> {
        let conn = self.get_pool().acquire().await?;
        Ok(Box::new(PgSession { conn }))
    }
}

/// A pooled connection; returned to the pool on drop
struct PgSession {
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl Session for PgSession {
    async fn table_exists(&mut self, table: &str) -> Result<bool, BoxDynError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM information_schema.tables
                WHERE table_schema = current_schema()
                AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(exists)
    }

    async fn begin<'s>(&'s mut self) -> Result<Box<dyn WriteTx + 's>, BoxDynError> {
        let tx = self.conn.begin().await?;
        Ok(Box::new(PgTx { tx: Some(tx) }))
    }

    async fn fetch_invoice(&mut self, id: i32) -> Result<Option<StoredInvoice>, BoxDynError> {
        let invoice = sqlx::query_as::<_, InvoiceRecord>(
            r#"
            SELECT
                id,
                invoice_number,
                invoice_date,
                due_date,
                company_name,
                company_address,
                company_email,
                company_phone,
                client_name,
                client_address,
                client_email,
                notes,
                total_amount::float8 AS total_amount,
                status,
                created_at,
                updated_at
            FROM invoices
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        let Some(invoice) = invoice else {
            return Ok(None);
        };

        let line_items = sqlx::query_as::<_, LineItemRecord>(
            r#"
            SELECT
                id,
                invoice_id,
                description,
                quantity,
                unit_price::float8 AS unit_price,
                amount::float8 AS amount
            FROM line_items
            WHERE invoice_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(Some(StoredInvoice { invoice, line_items }))
    }
}

/// An open transaction; sqlx rolls it back if it is dropped unfinished
struct PgTx<'c> {
    tx: Option<Transaction<'c, Postgres>>,
}

impl<'c> PgTx<'c> {
    fn open(&mut self) -> Result<&mut Transaction<'c, Postgres>, BoxDynError> {
        self.tx
            .as_mut()
            .ok_or_else(|| "transaction already finished".into())
    }
}

#[async_trait]
impl<'c> WriteTx for PgTx<'c> {
    async fn execute(&mut self, sql: &str) -> Result<(), BoxDynError> {
        let tx = self.open()?;
        sqlx::query(sql).execute(&mut **tx).await?;
        Ok(())
    }

    async fn insert_invoice(&mut self, invoice: &Invoice, total_amount: f64) -> Result<i32, BoxDynError> {
        let tx = self.open()?;
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO invoices (
                invoice_number,
                invoice_date,
                due_date,
                company_name,
                company_address,
                company_email,
                company_phone,
                client_name,
                client_address,
                client_email,
                notes,
                total_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12::float8)
            RETURNING id
            "#,
        )
        .bind(&invoice.invoice_number)
        .bind(invoice.invoice_date)
        .bind(invoice.due_date)
        .bind(&invoice.company_name)
        .bind(&invoice.company_address)
        .bind(&invoice.company_email)
        .bind(&invoice.company_phone)
        .bind(&invoice.client_name)
        .bind(&invoice.client_address)
        .bind(&invoice.client_email)
        .bind(invoice.notes())
        .bind(total_amount)
        .fetch_one(&mut **tx)
        .await?;

        Ok(id)
    }

    async fn insert_line_item(
        &mut self,
        invoice_id: i32,
        item: &LineItem,
        amount: f64,
    ) -> Result<(), BoxDynError> {
        let tx = self.open()?;
        sqlx::query(
            r#"
            INSERT INTO line_items (invoice_id, description, quantity, unit_price, amount)
            VALUES ($1, $2, $3, $4::float8, $5::float8)
            "#,
        )
        .bind(invoice_id)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(amount)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn commit(&mut self) -> Result<(), BoxDynError> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), BoxDynError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}
