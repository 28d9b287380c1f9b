//! Error types for slide deck cleanup.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a cleanup procedure.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a host document file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The comment metadata service rejected or failed a call.
    #[error("Comment service error: {0}")]
    CommentError(String),

    /// The host document model rejected or failed a call.
    #[error("Document error: {0}")]
    DocumentError(String),

    /// A command identifier did not match any registered command.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// ZIP archive error (for PPTX hosts).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error (for PPTX hosts).
    #[error("XML parsing error: {0}")]
    XmlError(String),
}
