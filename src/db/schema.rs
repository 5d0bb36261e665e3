//! On-demand provisioning of the `invoices` and `line_items` tables.

use sqlx::error::BoxDynError;
use thiserror::Error;
use tracing::{info, warn};

use super::backend::Session;

pub const INVOICES_TABLE: &str = "invoices";
pub const LINE_ITEMS_TABLE: &str = "line_items";

const CREATE_INVOICES: &str = r#"
    CREATE TABLE IF NOT EXISTS invoices (
        id SERIAL PRIMARY KEY,
        invoice_number VARCHAR(50) NOT NULL,
        invoice_date DATE NOT NULL,
        due_date DATE NOT NULL,

        company_name VARCHAR(255) NOT NULL,
        company_address TEXT NOT NULL,
        company_email VARCHAR(255) NOT NULL,
        company_phone VARCHAR(50) NOT NULL,

        client_name VARCHAR(255) NOT NULL,
        client_address TEXT NOT NULL,
        client_email VARCHAR(255) NOT NULL,

        notes TEXT,
        total_amount NUMERIC(10, 2) NOT NULL,
        status VARCHAR(50) NOT NULL DEFAULT 'draft',

        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const CREATE_LINE_ITEMS: &str = r#"
    CREATE TABLE IF NOT EXISTS line_items (
        id SERIAL PRIMARY KEY,
        invoice_id INTEGER NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
        description TEXT NOT NULL,
        quantity INTEGER NOT NULL,
        unit_price NUMERIC(10, 2) NOT NULL,
        amount NUMERIC(10, 2) NOT NULL,

        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const CREATE_LINE_ITEMS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_line_items_invoice_id ON line_items(invoice_id)";

/// DDL in the order it must run: header table, line-item table, index
pub const SCHEMA_STATEMENTS: [(&str, &str); 3] = [
    ("create invoices table", CREATE_INVOICES),
    ("create line_items table", CREATE_LINE_ITEMS),
    ("create line_items index", CREATE_LINE_ITEMS_INDEX),
];

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("database unavailable")]
    Unavailable(#[source] BoxDynError),

    #[error("failed to check for existing tables")]
    Catalog(#[source] BoxDynError),

    #[error("failed to {step}")]
    Ddl {
        step: &'static str,
        #[source]
        source: BoxDynError,
    },
}

/// Outcome of a provisioning run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provisioned {
    /// `true` when the tables were missing and DDL was issued
    pub created: bool,
}

/// Make sure both tables and the index exist.
///
/// Only the header table is probed. When it is missing, all statements run in one
/// transaction with `IF NOT EXISTS`, so a failure part-way leaves no header table
/// behind and two first-time callers racing each other both succeed.
pub async fn ensure_schema(session: &mut dyn Session) -> Result<Provisioned, ProvisionError> {
    let exists = session
        .table_exists(INVOICES_TABLE)
        .await
        .map_err(ProvisionError::Catalog)?;

    if exists {
        return Ok(Provisioned { created: false });
    }

    let mut tx = session.begin().await.map_err(|source| ProvisionError::Ddl {
        step: "begin schema transaction",
        source,
    })?;

    for (step, statement) in SCHEMA_STATEMENTS {
        if let Err(source) = tx.execute(statement).await {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Schema rollback failed");
            }
            return Err(ProvisionError::Ddl { step, source });
        }
    }

    tx.commit().await.map_err(|source| ProvisionError::Ddl {
        step: "commit schema",
        source,
    })?;

    info!(tables = ?[INVOICES_TABLE, LINE_ITEMS_TABLE], "Database tables created");
    Ok(Provisioned { created: true })
}
