//! Delimited-text deserialization.
//!
//! Maps delimited fields by position to the schema fields. Rows whose
//! field count differs from the schema are handled by a
//! [`LengthCheckPolicy`].

use arrow_array::{ArrayRef, RecordBatch};
use arrow_schema::SchemaRef;
use serde_json::Value;

use super::columns::build_column;
use super::{Format, LengthCheckPolicy, RecordDeserializer};
use crate::error::SerdeError;

/// Delimited-text record deserializer.
///
/// Each record is one line. Empty fields and the literal `null` decode
/// as null.
#[derive(Debug, Clone)]
pub struct CsvDeserializer {
    delimiter: u8,
    length_policy: LengthCheckPolicy,
}

impl CsvDeserializer {
    /// Creates a deserializer with the given delimiter and length policy.
    #[must_use]
    pub fn new(delimiter: u8, length_policy: LengthCheckPolicy) -> Self {
        Self {
            delimiter,
            length_policy,
        }
    }

    /// Returns the field delimiter.
    #[must_use]
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Returns the length check policy.
    #[must_use]
    pub fn length_policy(&self) -> LengthCheckPolicy {
        self.length_policy
    }

    /// Splits a line into fields, respecting quoted values.
    fn split_fields<'a>(&self, line: &'a str) -> Vec<&'a str> {
        let delim = self.delimiter as char;
        let mut fields = Vec::new();
        let mut start = 0;
        let mut in_quotes = false;

        for (i, ch) in line.char_indices() {
            if ch == '"' {
                in_quotes = !in_quotes;
            } else if ch == delim && !in_quotes {
                fields.push(line[start..i].trim().trim_matches('"'));
                start = i + delim.len_utf8();
            }
        }
        fields.push(line[start..].trim().trim_matches('"'));
        fields
    }

    /// Fits `fields` to `expected` columns, or returns `None` if the row
    /// is to be skipped.
    fn fit<'a>(
        &self,
        mut fields: Vec<&'a str>,
        expected: usize,
    ) -> Result<Option<Vec<&'a str>>, SerdeError> {
        let got = fields.len();
        if got == expected {
            return Ok(Some(fields));
        }
        match self.length_policy {
            LengthCheckPolicy::Skip => Ok(None),
            LengthCheckPolicy::Reject => Err(SerdeError::LengthMismatch { expected, got }),
            LengthCheckPolicy::Truncate if got < expected => {
                Err(SerdeError::LengthMismatch { expected, got })
            }
            LengthCheckPolicy::Truncate | LengthCheckPolicy::Pad => {
                // Short rows are padded with empty (null) fields
                fields.resize(expected, "");
                Ok(Some(fields))
            }
        }
    }
}

impl RecordDeserializer for CsvDeserializer {
    fn deserialize(&self, data: &[u8], schema: &SchemaRef) -> Result<RecordBatch, SerdeError> {
        let line = std::str::from_utf8(data)
            .map_err(|e| SerdeError::Csv(format!("invalid UTF-8: {e}")))?;
        let line = line.trim_end_matches(['\r', '\n']);
        // A blank line is a row with no fields; the length policy decides
        let fields = if line.trim().is_empty() {
            Vec::new()
        } else {
            self.split_fields(line)
        };

        let expected = schema.fields().len();
        let Some(fields) = self.fit(fields, expected)? else {
            return Ok(RecordBatch::new_empty(schema.clone()));
        };

        let mut columns: Vec<ArrayRef> = Vec::with_capacity(expected);
        for (raw, field) in fields.iter().zip(schema.fields()) {
            let cell = if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
                None
            } else {
                Some(Value::String((*raw).to_string()))
            };
            columns.push(build_column(field, &[cell.as_ref()])?);
        }

        RecordBatch::try_new(schema.clone(), columns)
            .map_err(|e| SerdeError::Csv(format!("failed to create RecordBatch: {e}")))
    }

    fn format(&self) -> Format {
        Format::Csv
    }
}
