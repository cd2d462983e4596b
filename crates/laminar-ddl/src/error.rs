//! Error types for descriptor building and source construction.
//!
//! - `ConnectorError`: Top-level error for parsing table definitions and
//!   constructing sources
//! - `SerdeError`: Record decoding errors

use thiserror::Error;

/// Errors that can occur while turning a table definition into a source.
///
/// Every variant is a configuration-time failure: retrying with the same
/// input produces the same error.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Malformed or uncoercible configuration, or an invalid field list.
    #[error("validation error: {0}")]
    Validation(String),

    /// Required configuration key is missing.
    #[error("missing required config: {0}")]
    MissingConfig(String),

    /// The payload format cannot be decoded with the given configuration.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The offset reset specification is neither a keyword nor a
    /// well-formed per-partition offset object.
    #[error("unsupported offset reset spec: {0}")]
    UnsupportedOffsetSpec(String),

    /// Registry population or lookup failed.
    #[error("registry error: {0}")]
    Registry(String),

    /// The execution environment rejected the operator or table.
    #[error("environment error: {0}")]
    Environment(String),

    /// Record decoding error.
    #[error("serde error: {0}")]
    Serde(#[from] SerdeError),
}

/// Errors that occur while decoding a record into a `RecordBatch`.
#[derive(Debug, Error)]
pub enum SerdeError {
    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(String),

    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(String),

    /// A required field is missing from the input.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A field value could not be converted to the target Arrow type.
    #[error("type conversion error: field '{field}', expected {expected}: {message}")]
    TypeConversion {
        /// The field name.
        field: String,
        /// The expected Arrow data type.
        expected: String,
        /// Details about the conversion failure.
        message: String,
    },

    /// A delimited row did not carry the declared number of fields.
    #[error("field count mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        /// Number of declared fields.
        expected: usize,
        /// Number of fields found in the row.
        got: usize,
    },

    /// The Arrow type has no decoder support.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// The input data is malformed.
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

impl From<serde_json::Error> for SerdeError {
    fn from(e: serde_json::Error) -> Self {
        SerdeError::Json(e.to_string())
    }
}
