//! Error types for proxysieve core

use thiserror::Error;

/// Main error type for descriptor handling
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Descriptor {descriptor} is missing {attribute}")]
    MissingAttribute {
        descriptor: String,
        attribute: &'static str,
    },
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid descriptor error
    pub fn invalid_descriptor(msg: impl Into<String>) -> Self {
        Error::InvalidDescriptor(msg.into())
    }

    /// Create a missing attribute error
    pub fn missing(descriptor: impl Into<String>, attribute: &'static str) -> Self {
        Error::MissingAttribute {
            descriptor: descriptor.into(),
            attribute,
        }
    }
}
