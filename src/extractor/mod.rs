// Document extraction
// Pulls page text out of uploaded PDFs


use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::{debug, warn};

use crate::{ChatError, Result};

/// An uploaded document: a name and its pages in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub pages: Vec<Page>,
}

/// One page of a document. Text is empty when nothing could be extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub text: String,
}

impl Page {
    /// Whitespace-only output counts as no text
    #[inline]
    pub fn new(text: String) -> Self {
        if text.trim().is_empty() {
            Self::default()
        } else {
            Self { text }
        }
    }
}

/// The concatenated text of one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentText {
    pub name: String,
    pub text: String,
}

impl Document {
    #[inline]
    pub fn from_pages<N, I, S>(name: N, pages: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            pages: pages
                .into_iter()
                .map(|text| Page { text: text.into() })
                .collect(),
        }
    }

    /// Load a PDF from disk
    #[inline]
    pub fn from_pdf_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        let bytes = fs::read(path)
            .map_err(|e| ChatError::Extraction(format!("Failed to read PDF {}: {}", name, e)))?;

        Self::from_pdf_bytes(name, &bytes)
    }

    /// Load a PDF from an in-memory upload
    #[inline]
    pub fn from_pdf_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let name = name.into();
        let pdf = lopdf::Document::load_mem(bytes)
            .map_err(|e| ChatError::Extraction(format!("Failed to load PDF {}: {}", name, e)))?;
        let page_count = pdf.get_pages().len();

        let pages: Vec<Page> = match pdf_extract_pages(&name, bytes) {
            Some(texts) if texts.len() == page_count => texts.into_iter().map(Page::new).collect(),
            Some(texts) => {
                warn!(
                    "pdf-extract found {} pages in {} but the document has {}, using lopdf",
                    texts.len(),
                    name,
                    page_count
                );
                lopdf_pages(&name, &pdf)
            }
            None => lopdf_pages(&name, &pdf),
        };

        debug!("Extracted {} pages from {}", pages.len(), name);
        Ok(Self { name, pages })
    }

    /// Concatenated text of all pages
    #[inline]
    pub fn text(&self) -> String {
        self.pages.iter().map(|p| p.text.as_str()).collect()
    }

    #[inline]
    pub fn extract(&self) -> DocumentText {
        DocumentText {
            name: self.name.clone(),
            text: self.text(),
        }
    }
}

/// Per-page text via pdf-extract, which decodes font encodings better than
/// lopdf. `None` when it errors or panics on the file.
fn pdf_extract_pages(name: &str, bytes: &[u8]) -> Option<Vec<String>> {
    match panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    })) {
        Ok(Ok(pages)) => Some(pages),
        Ok(Err(e)) => {
            warn!("pdf-extract failed for {}, falling back to lopdf: {}", name, e);
            None
        }
        Err(_) => {
            warn!("pdf-extract panicked on {}, falling back to lopdf", name);
            None
        }
    }
}

/// Page by page lopdf extraction. A page that fails yields an empty page.
fn lopdf_pages(name: &str, pdf: &lopdf::Document) -> Vec<Page> {
    pdf.get_pages()
        .into_keys()
        .map(|page_number| match pdf.extract_text(&[page_number]) {
            Ok(text) => Page::new(text),
            Err(e) => {
                warn!(
                    "No text extracted from page {} of {}: {}",
                    page_number, name, e
                );
                Page::default()
            }
        })
        .collect()
}

/// Extract the text of every document, in upload order
#[inline]
pub fn extract_all(documents: &[Document]) -> Vec<DocumentText> {
    documents.iter().map(Document::extract).collect()
}

/// True when none of the extracted documents has any visible text
#[inline]
pub fn is_empty_input(texts: &[DocumentText]) -> bool {
    texts.iter().all(|t| t.text.trim().is_empty())
}
