/*!
 * Error types for the xlate pipeline.
 *
 * `PipelineError` covers everything the XML translation core can fail with,
 * `AppError` classifies what made one input file fail in the controller.
 * Both use thiserror.
 */

use thiserror::Error;

/// Errors raised by the parsing, segmentation, extraction and translation passes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The parser rejected the input document or a translated message
    #[error("Malformed XML at line {line}: {message}")]
    MalformedXml {
        /// Line of the offending construct
        line: usize,
        /// Parser diagnostic
        message: String,
    },

    /// No schema could be found for an element
    #[error("Unknown element '{name}' in namespace '{uri}' at line {line}")]
    UnknownElement {
        /// Namespace URI, empty for no namespace
        uri: String,
        /// Local name of the element
        name: String,
        /// Line of the start tag
        line: usize,
    },

    /// An attribute has no datatype in its element or namespace schema
    #[error("Unknown attribute '{attribute}' on element '{element}' at line {line}")]
    UnknownAttribute {
        /// Local name of the element
        element: String,
        /// Local name of the attribute
        attribute: String,
        /// Line of the start tag
        line: usize,
    },

    /// A message was flushed with an open inline format
    #[error("Format {id} opened at line {line} is never closed")]
    UnmatchedFormat {
        /// Message-local format id
        id: usize,
        /// Line where the message starts
        line: usize,
    },

    /// A serialized message does not describe balanced, well-numbered formats
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// A translation refers to a format id its source does not have
    #[error("Translation of the message at line {line} references unknown format id {id}")]
    TranslationError {
        /// Format id found in the translation
        id: usize,
        /// Line of the source message
        line: usize,
    },

    /// Cutting a message produced unbalanced pieces
    #[error("Segmentation failed at line {line}: {message}")]
    SegmentationError {
        /// Line of the message being segmented
        line: usize,
        /// What went wrong
        message: String,
    },

    /// A namespace URI is already registered with different metadata
    #[error("Namespace '{0}' is already registered with a different definition")]
    NamespaceConflict(String),

    /// The SRX document could not be loaded or one of its rules does not compile
    #[error("Invalid SRX document: {0}")]
    InvalidSrx(String),

    /// A catalog file could not be read
    #[error("Invalid catalog at line {line}: {message}")]
    InvalidCatalog {
        /// Line in the catalog file
        line: usize,
        /// What went wrong
        message: String,
    },
}

impl PipelineError {
    /// Source line number carried by the error, when known
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::MalformedXml { line, .. }
            | Self::UnknownElement { line, .. }
            | Self::UnknownAttribute { line, .. }
            | Self::UnmatchedFormat { line, .. }
            | Self::TranslationError { line, .. }
            | Self::SegmentationError { line, .. }
            | Self::InvalidCatalog { line, .. } => Some(*line),
            Self::MalformedMessage(_) | Self::NamespaceConflict(_) | Self::InvalidSrx(_) => None,
        }
    }
}

/// Result alias used by the pipeline modules
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Why an input file could not be processed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the translation pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Error from configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        if err.downcast_ref::<std::io::Error>().is_some() {
            return AppError::File(format!("{:#}", err));
        }
        match err.downcast::<PipelineError>() {
            Ok(pipeline) => AppError::Pipeline(pipeline),
            Err(other) => AppError::Unknown(format!("{:#}", other)),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(err.to_string())
    }
}
