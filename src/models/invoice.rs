use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::line_item::{LineItem, LineItemRecord};

/// Days between the issue date and the due date of a fresh draft
const DEFAULT_PAYMENT_TERM_DAYS: i64 = 30;

/// An invoice as composed by the user, before it is rendered or saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,

    pub company_name: String,
    pub company_address: String,
    pub company_email: String,
    pub company_phone: String,

    pub client_name: String,
    pub client_address: String,
    pub client_email: String,

    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    /// Caller-supplied total, persisted as given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
}

/// Reasons an invoice payload is rejected before it reaches the core
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("line item {index}: quantity must be greater than zero, got {quantity}")]
    InvalidQuantity { index: usize, quantity: i32 },

    #[error("line item {index}: unit price must be a finite, non-negative number, got {unit_price}")]
    InvalidUnitPrice { index: usize, unit_price: f64 },
}

impl Invoice {
    /// Create a blank invoice pre-filled the way a new form starts out
    pub fn draft(today: NaiveDate) -> Self {
        Self {
            invoice_number: format!("INV-{}-001", today.format("%Y%m%d")),
            invoice_date: today,
            due_date: today + Duration::days(DEFAULT_PAYMENT_TERM_DAYS),
            company_name: String::new(),
            company_address: String::new(),
            company_email: String::new(),
            company_phone: String::new(),
            client_name: String::new(),
            client_address: String::new(),
            client_email: String::new(),
            notes: None,
            line_items: vec![LineItem::new("", 1, 0.0)],
            total_amount: None,
        }
    }

    /// Sum of `quantity × unit_price` over all line items
    pub fn line_items_total(&self) -> f64 {
        self.line_items.iter().map(LineItem::amount).sum()
    }

    /// Notes, if any were entered
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref().filter(|notes| !notes.is_empty())
    }

    /// Check the payload is structurally valid for layout and persistence
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("invoiceNumber", &self.invoice_number),
            ("companyName", &self.company_name),
            ("companyAddress", &self.company_address),
            ("companyEmail", &self.company_email),
            ("companyPhone", &self.company_phone),
            ("clientName", &self.client_name),
            ("clientAddress", &self.client_address),
            ("clientEmail", &self.client_email),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::EmptyField(name));
            }
        }

        for (index, item) in self.line_items.iter().enumerate() {
            if item.quantity <= 0 {
                return Err(ValidationError::InvalidQuantity {
                    index,
                    quantity: item.quantity,
                });
            }
            if !item.unit_price.is_finite() || item.unit_price < 0.0 {
                return Err(ValidationError::InvalidUnitPrice {
                    index,
                    unit_price: item.unit_price,
                });
            }
        }

        Ok(())
    }
}

/// A persisted row of the `invoices` table
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceRecord {
    pub id: i32,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub company_name: String,
    pub company_address: String,
    pub company_email: String,
    pub company_phone: String,
    pub client_name: String,
    pub client_address: String,
    pub client_email: String,
    pub notes: Option<String>,
    pub total_amount: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored invoice header together with its line items, in insertion order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredInvoice {
    pub invoice: InvoiceRecord,
    pub line_items: Vec<LineItemRecord>,
}

#[cfg(test)]
pub(crate) fn sample_invoice() -> Invoice {
    Invoice {
        invoice_number: "INV-20250304-001".to_string(),
        invoice_date: NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
        due_date: NaiveDate::from_ymd_opt(2025, 4, 3).unwrap(),
        company_name: "Acme".to_string(),
        company_address: "1 Main Street\nSpringfield".to_string(),
        company_email: "billing@acme.test".to_string(),
        company_phone: "555-0100".to_string(),
        client_name: "Globex".to_string(),
        client_address: "42 Side Road".to_string(),
        client_email: "ap@globex.test".to_string(),
        notes: None,
        line_items: vec![LineItem::new("Widget", 3, 10.0)],
        total_amount: Some(30.0),
    }
}
