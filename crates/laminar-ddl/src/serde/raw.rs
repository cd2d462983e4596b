//! Raw payload pass-through.
//!
//! Stores each record's text in the first declared column; the remaining
//! columns are null.

use std::sync::Arc;

use arrow_array::builder::StringBuilder;
use arrow_array::{new_null_array, ArrayRef, RecordBatch};
use arrow_schema::{DataType, SchemaRef};

use super::{Format, RecordDeserializer};
use crate::error::SerdeError;

/// Raw payload deserializer.
///
/// The first schema field must be `Utf8`. Other fields must be nullable.
#[derive(Debug, Clone)]
pub struct RawBytesDeserializer {
    _private: (),
}

impl RawBytesDeserializer {
    /// Creates a new raw payload deserializer.
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for RawBytesDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks that `schema` can hold raw payloads.
pub(crate) fn check_schema(schema: &SchemaRef) -> Result<(), SerdeError> {
    let Some(first) = schema.fields().first() else {
        return Err(SerdeError::UnsupportedType(
            "raw decoding needs at least one column".into(),
        ));
    };
    if first.data_type() != &DataType::Utf8 {
        return Err(SerdeError::UnsupportedType(format!(
            "raw decoding writes to column '{}', which must be Utf8 (is {})",
            first.name(),
            first.data_type()
        )));
    }
    if let Some(f) = schema.fields().iter().skip(1).find(|f| !f.is_nullable()) {
        return Err(SerdeError::MissingField(f.name().clone()));
    }
    Ok(())
}

impl RecordDeserializer for RawBytesDeserializer {
    fn deserialize(&self, data: &[u8], schema: &SchemaRef) -> Result<RecordBatch, SerdeError> {
        self.deserialize_batch(&[data], schema)
    }

    fn deserialize_batch(
        &self,
        records: &[&[u8]],
        schema: &SchemaRef,
    ) -> Result<RecordBatch, SerdeError> {
        check_schema(schema)?;

        let total_bytes: usize = records.iter().map(|r| r.len()).sum();
        let mut builder = StringBuilder::with_capacity(records.len(), total_bytes);
        for data in records {
            let s = std::str::from_utf8(data)
                .map_err(|e| SerdeError::MalformedInput(format!("invalid UTF-8: {e}")))?;
            builder.append_value(s);
        }

        let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
        columns.push(Arc::new(builder.finish()));
        for field in schema.fields().iter().skip(1) {
            columns.push(new_null_array(field.data_type(), records.len()));
        }

        RecordBatch::try_new(schema.clone(), columns)
            .map_err(|e| SerdeError::MalformedInput(format!("failed to create batch: {e}")))
    }

    fn format(&self) -> Format {
        Format::Raw
    }
}
