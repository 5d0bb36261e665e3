mod invoice;
mod line_item;
mod money;

pub use invoice::{Invoice, InvoiceRecord, StoredInvoice};
pub use line_item::{LineItem, LineItemRecord};
pub use money::round_cents;

#[cfg(test)]
pub(crate) use invoice::sample_invoice;
