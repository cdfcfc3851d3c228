//! Error types for reading and cross-referencing the DiGA FHIR documents.

use thiserror::Error;

use crate::document::DocumentKind;

/// Result type alias for catalog parsing
pub type DigaResult<T> = Result<T, DigaError>;

/// Errors raised while turning the four FHIR documents into a [`DigaCatalog`].
///
/// Every variant names the document it originated from so that the message
/// logged by the command-line tool points at the offending file.
///
/// [`DigaCatalog`]: crate::model::DigaCatalog
#[derive(Debug, Error)]
pub enum DigaError {
    /// Reading the input stream failed.
    #[error("Failed to read {document}: {source}")]
    Read {
        document: DocumentKind,
        #[source]
        source: std::io::Error,
    },

    /// The document is not UTF-8 encoded.
    #[error("{document} is not UTF-8 encoded: {source}")]
    Encoding {
        document: DocumentKind,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// The document is not well-formed XML.
    #[error("Malformed XML in {document}: {source}")]
    Xml {
        document: DocumentKind,
        #[source]
        source: roxmltree::Error,
    },

    /// The root element is neither a `Bundle` nor the expected resource type.
    #[error("Unexpected root element <{found}> in {document}, expected <Bundle> or <{expected}>")]
    UnexpectedRoot {
        document: DocumentKind,
        expected: &'static str,
        found: String,
    },

    /// A primitive value could not be converted to its target type.
    #[error("Invalid value '{value}' for {element} in {document}")]
    InvalidValue {
        document: DocumentKind,
        element: String,
        value: String,
    },
}

impl DigaError {
    /// The document the error was raised for.
    pub fn document(&self) -> DocumentKind {
        match self {
            DigaError::Read { document, .. }
            | DigaError::Encoding { document, .. }
            | DigaError::Xml { document, .. }
            | DigaError::UnexpectedRoot { document, .. }
            | DigaError::InvalidValue { document, .. } => *document,
        }
    }
}
