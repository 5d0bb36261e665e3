use serde::{Deserialize, Serialize};

/// A single billable line on an invoice, as entered by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    pub quantity: i32,
    pub unit_price: f64,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: i32, unit_price: f64) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    /// Line amount, `quantity × unit_price`
    pub fn amount(&self) -> f64 {
        f64::from(self.quantity) * self.unit_price
    }
}

/// A persisted row of the `line_items` table
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct LineItemRecord {
    pub id: i32,
    pub invoice_id: i32,
    pub description: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub amount: f64,
}
