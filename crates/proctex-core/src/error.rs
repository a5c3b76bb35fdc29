//! Error types for proctex

use thiserror::Error;

/// Result type alias using proctex's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in proctex operations
///
/// Only document-level failures are reported here. Problems with a single
/// input, output or node are logged and the element is skipped instead.
#[derive(Error, Debug)]
pub enum Error {
    /// A required glTF extension marker is absent
    #[error("Missing required extension: {0}")]
    MissingExtension(String),

    /// The procedural extension block has no `procedurals` array
    #[error("Missing procedurals in extension: {0}")]
    MissingProcedurals(String),

    /// Nothing in the source document could be converted
    #[error("Nothing to export: {0}")]
    NothingToExport(String),

    /// The native document failed structural validation
    #[error("Invalid MaterialX document: {0}")]
    InvalidDocument(String),

    /// JSON parse or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML parse error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML was well formed but not a MaterialX document
    #[error("XML structure error: {0}")]
    XmlStructure(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
