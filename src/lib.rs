//! pdforge: a from-scratch, self-contained reader/writer for PDF 1.7
//! (ISO 32000-1:2008) documents.
//!
//! The crate is layered L1-L6 (§2): the object model (`object`), the
//! shared tokenizer and serializer (`lexer`, `parser`, `serializer`),
//! the document writer (`document`) and reader (`reader`), the
//! content-stream interpreter (`interpreter`), the font and image
//! subsystems (`font`, `image`), and the Standard Security Handler
//! (`security`).

pub mod color;
pub mod content;
pub mod date;
pub mod document;
pub mod error;
pub mod filters;
pub mod font;
pub mod image;
pub mod interpreter;
pub mod lexer;
pub mod matrix;
pub mod metadata;
pub mod object;
pub mod page_size;
pub mod parser;
pub mod reader;
pub mod resources;
pub mod security;
pub mod serializer;
pub mod units;

pub use document::{Document, FontIndex, ImageIndex, PageIndex, WriteOptions};
pub use error::{Error, Result};
pub use interpreter::{ImageBlock, ImageInfo, PageLayout, TextBlock, TextElement};
pub use reader::{ReadOptions, Reader};

/// Creates an empty document (§6.3 `new_document`).
pub fn new_document() -> Document {
    Document::new()
}

/// Reads a PDF document from an in-memory buffer (§6.3 `open_reader`).
/// For reading from disk, load the file's bytes and pass them here —
/// the reader itself needs only a byte buffer, not a live file handle.
pub fn open_reader(buf: Vec<u8>) -> Result<Reader> {
    Reader::open(buf, &ReadOptions::default())
}

/// Reads a PDF document from a file path (§6.3 `open`).
pub fn open(path: impl AsRef<std::path::Path>) -> Result<Reader> {
    let buf = std::fs::read(path)?;
    open_reader(buf)
}
