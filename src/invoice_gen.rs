use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::layout::{layout, A4};
use crate::models::Invoice;
use crate::render::{DocumentRenderer, PdfRenderer, RenderedDocument};

/// Service for rendering invoices to document files
pub struct InvoiceGenerator<R = PdfRenderer> {
    output_dir: PathBuf,
    renderer: R,
}

impl InvoiceGenerator {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_renderer(output_dir, PdfRenderer::new())
    }
}

impl<R: DocumentRenderer> InvoiceGenerator<R> {
    pub fn with_renderer(output_dir: impl AsRef<Path>, renderer: R) -> Result<Self> {
        // Create the output directory if it doesn't exist
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;

        Ok(Self { output_dir, renderer })
    }

    /// Lay out and render the invoice without touching the filesystem
    pub fn render(&self, invoice: &Invoice) -> Result<RenderedDocument> {
        let instructions = layout(invoice);
        let document = self
            .renderer
            .render(A4, &instructions)
            .context("failed to render invoice")?;

        Ok(document)
    }

    /// Render the invoice and write it as `invoice-<number>.pdf`
    pub fn generate_invoice(&self, invoice: &Invoice) -> Result<PathBuf> {
        let document = self.render(invoice)?;
        let path = self.output_dir.join(file_name(&invoice.invoice_number));

        fs::write(&path, &document.bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;

        info!(
            path = %path.display(),
            bytes = document.bytes.len(),
            content_type = %document.content_type,
            "Invoice rendered"
        );
        Ok(path)
    }
}

/// Download name for an invoice, with path separators and other unsafe characters replaced
pub fn file_name(invoice_number: &str) -> String {
    let safe: String = invoice_number
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("invoice-{}.pdf", safe)
}
