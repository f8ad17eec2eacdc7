//! Error types for I/O operations

use thiserror::Error;

/// Errors that can occur during I/O operations
#[derive(Error, Debug)]
pub enum IoError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid file format: {format}")]
    InvalidFormat { format: String },

    #[error("Unsupported {what}: {value}")]
    Unsupported { what: &'static str, value: String },

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Write error: {message}")]
    WriteError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IoError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        IoError::ParseError { message: message.into() }
    }

    pub(crate) fn invalid(format: impl Into<String>) -> Self {
        IoError::InvalidFormat { format: format.into() }
    }
}

impl From<quick_xml::Error> for IoError {
    fn from(err: quick_xml::Error) -> Self {
        IoError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for IoError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        IoError::Xml(err.to_string())
    }
}

impl From<base64::DecodeError> for IoError {
    fn from(err: base64::DecodeError) -> Self {
        IoError::ParseError { message: format!("invalid base64 payload: {}", err) }
    }
}

impl From<IoError> for isoviz_core::Error {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Io(e) => isoviz_core::Error::Io(e),
            IoError::FileNotFound { path } => isoviz_core::Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path),
            )),
            IoError::Unsupported { .. } => isoviz_core::Error::UnsupportedFormat(err.to_string()),
            other => isoviz_core::Error::InvalidData(other.to_string()),
        }
    }
}
