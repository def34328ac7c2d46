//! Error types and result types for connector operations.
//!
//! Use [`SearchLayerResult<T>`] as the return type for fallible operations.
//!
//! Not every irregular input is an error: documents that cannot be mapped degrade
//! to `None` and unparsable numbers degrade to a NaN marker. Only conditions the
//! caller must act on (a missing identifier, an unknown model, a failed request)
//! surface through [`SearchLayerError`].

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors raised by the connector and its backends.
#[derive(Error, Debug)]
pub enum SearchLayerError {
    /// Serialization/deserialization error when converting between models and JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during backend construction or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The connector settings could not be turned into a transport configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// An operation that addresses a single document received no identifier.
    /// The argument is the model name.
    #[error("Missing identifier for model {0}")]
    MissingIdentifier(String),
    /// The identifier has no scalar string form usable as a document id.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    /// The model has not been defined on the connector.
    #[error("Model not found: {0}")]
    ModelNotFound(String),
    /// The document has an invalid structure (e.g. is not a JSON object).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The operation is intentionally not supported by the connector.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    /// An error occurred in the underlying search backend.
    #[error("Backend error: {0}")]
    Backend(String),
    /// An unknown error occurred.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// A specialized `Result` type for connector operations.
pub type SearchLayerResult<T> = Result<T, SearchLayerError>;

impl From<SerdeJsonError> for SearchLayerError {
    fn from(err: SerdeJsonError) -> Self {
        SearchLayerError::Serialization(err.to_string())
    }
}
