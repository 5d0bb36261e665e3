//! Turning laid-out draw instructions into document bytes.

mod pdf;

use thiserror::Error;

use crate::layout::{DrawInstruction, PageSize};

pub use pdf::PdfRenderer;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to encode page content")]
    Encode(#[from] lopdf::Error),

    #[error("failed to write document")]
    Io(#[from] std::io::Error),
}

/// Rendered output, ready to hand to a user for download
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub content_type: mime::Mime,
}

/// Anything that can paint a single page of instructions into a document
pub trait DocumentRenderer {
    fn render(&self, page: PageSize, instructions: &[DrawInstruction]) -> Result<RenderedDocument, RenderError>;
}
