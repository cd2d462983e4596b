//! Record decoding framework.
//!
//! Converts raw message payloads into Arrow `RecordBatch`es shaped by the
//! table's declared row type:
//!
//! - [`RecordDeserializer`]: Converts raw bytes to `RecordBatch`
//! - [`Format`]: Declared payload format
//! - [`DecoderKind`]: Fully resolved decoder configuration
//!
//! ## Implementations
//!
//! - [`json`]: One JSON object per record, fields by name
//! - [`csv`]: Delimited text, fields by position
//! - [`raw`]: Payload text in the first column, no structural decoding

mod columns;
pub mod csv;
pub mod json;
pub mod raw;

use std::str::FromStr;

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;

use crate::error::{ConnectorError, SerdeError};

/// Declared payload format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// JSON objects.
    Json,

    /// Delimited text.
    Csv,

    /// Anything else: raw payload, no structural decoding.
    Raw,
}

impl Format {
    /// Returns the format name as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Csv => "csv",
            Format::Raw => "raw",
        }
    }

    /// Resolves a declared format name.
    ///
    /// Matching is case-insensitive; unknown or absent names fall back to
    /// [`Format::Raw`].
    #[must_use]
    pub fn resolve(declared: Option<&str>) -> Self {
        match declared.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("json") => Format::Json,
            Some(s) if s.eq_ignore_ascii_case("csv") => Format::Csv,
            _ => Format::Raw,
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a delimited decoder does when a row's field count differs from
/// the declared field count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthCheckPolicy {
    /// Pad short rows with nulls, drop extra fields.
    Pad,
    /// Drop extra fields, reject short rows.
    Truncate,
    /// Reject any mismatch.
    Reject,
    /// Drop mismatched rows.
    Skip,
}

impl LengthCheckPolicy {
    /// Returns the policy name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LengthCheckPolicy::Pad => "pad",
            LengthCheckPolicy::Truncate => "truncate",
            LengthCheckPolicy::Reject => "reject",
            LengthCheckPolicy::Skip => "skip",
        }
    }
}

impl FromStr for LengthCheckPolicy {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pad" => Ok(LengthCheckPolicy::Pad),
            "truncate" => Ok(LengthCheckPolicy::Truncate),
            "reject" | "exception" => Ok(LengthCheckPolicy::Reject),
            "skip" => Ok(LengthCheckPolicy::Skip),
            other => Err(ConnectorError::Validation(format!(
                "invalid lengthcheckpolicy: '{other}' (expected pad/truncate/reject/skip)"
            ))),
        }
    }
}

impl std::fmt::Display for LengthCheckPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved decoder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderKind {
    /// Raw payload decoder.
    Raw,
    /// Delimited-text decoder.
    Csv {
        /// Single-byte field delimiter.
        delimiter: u8,
        /// Field count mismatch handling.
        length_policy: LengthCheckPolicy,
    },
    /// JSON decoder.
    Json,
}

impl DecoderKind {
    /// Returns the payload format this decoder handles.
    #[must_use]
    pub fn format(&self) -> Format {
        match self {
            DecoderKind::Raw => Format::Raw,
            DecoderKind::Csv { .. } => Format::Csv,
            DecoderKind::Json => Format::Json,
        }
    }
}

/// Trait for deserializing raw bytes into Arrow `RecordBatch`.
pub trait RecordDeserializer: Send + Sync {
    /// Deserializes a single record from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `SerdeError` if the input cannot be parsed or doesn't
    /// match the expected schema.
    fn deserialize(&self, data: &[u8], schema: &SchemaRef) -> Result<RecordBatch, SerdeError>;

    /// Deserializes a batch of records from raw bytes.
    ///
    /// The default implementation calls `deserialize` for each record
    /// and concatenates the results.
    ///
    /// # Errors
    ///
    /// Returns `SerdeError` if any record cannot be parsed.
    fn deserialize_batch(
        &self,
        records: &[&[u8]],
        schema: &SchemaRef,
    ) -> Result<RecordBatch, SerdeError> {
        if records.is_empty() {
            return Ok(RecordBatch::new_empty(schema.clone()));
        }

        let batches = records
            .iter()
            .map(|data| self.deserialize(data, schema))
            .collect::<Result<Vec<_>, _>>()?;

        arrow_select::concat::concat_batches(schema, &batches).map_err(|e| {
            SerdeError::MalformedInput(format!("failed to concat batches: {e}"))
        })
    }

    /// Returns the format this deserializer handles.
    fn format(&self) -> Format;
}

/// Creates a deserializer for a resolved decoder configuration.
#[must_use]
pub fn create_deserializer(kind: &DecoderKind) -> Box<dyn RecordDeserializer> {
    match *kind {
        DecoderKind::Json => Box::new(json::JsonDeserializer::new()),
        DecoderKind::Csv {
            delimiter,
            length_policy,
        } => Box::new(csv::CsvDeserializer::new(delimiter, length_policy)),
        DecoderKind::Raw => Box::new(raw::RawBytesDeserializer::new()),
    }
}
