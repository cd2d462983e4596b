//! JSON deserialization.
//!
//! Converts JSON objects into Arrow `RecordBatch` using `serde_json`.

use arrow_array::{ArrayRef, RecordBatch};
use arrow_schema::SchemaRef;
use serde_json::{Map, Value};

use super::columns::build_column;
use super::{Format, RecordDeserializer};
use crate::error::SerdeError;

/// JSON record deserializer.
///
/// Parses one JSON object per record and maps its members to Arrow
/// columns by field name. Members not declared in the schema are
/// ignored; declared fields missing from the object decode as null.
#[derive(Debug, Clone)]
pub struct JsonDeserializer {
    _private: (),
}

impl JsonDeserializer {
    /// Creates a new JSON deserializer.
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for JsonDeserializer {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_object(data: &[u8]) -> Result<Map<String, Value>, SerdeError> {
    match serde_json::from_slice(data)? {
        Value::Object(obj) => Ok(obj),
        other => Err(SerdeError::MalformedInput(format!(
            "expected JSON object, got {other}"
        ))),
    }
}

fn build_batch(objects: &[Map<String, Value>], schema: &SchemaRef) -> Result<RecordBatch, SerdeError> {
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        let cells: Vec<Option<&Value>> = objects.iter().map(|o| o.get(field.name())).collect();
        columns.push(build_column(field, &cells)?);
    }

    RecordBatch::try_new(schema.clone(), columns)
        .map_err(|e| SerdeError::MalformedInput(format!("failed to create RecordBatch: {e}")))
}

impl RecordDeserializer for JsonDeserializer {
    fn deserialize(&self, data: &[u8], schema: &SchemaRef) -> Result<RecordBatch, SerdeError> {
        let obj = parse_object(data)?;
        build_batch(std::slice::from_ref(&obj), schema)
    }

    fn deserialize_batch(
        &self,
        records: &[&[u8]],
        schema: &SchemaRef,
    ) -> Result<RecordBatch, SerdeError> {
        if records.is_empty() {
            return Ok(RecordBatch::new_empty(schema.clone()));
        }

        // Parse all JSON values first
        let objects = records
            .iter()
            .map(|data| parse_object(data))
            .collect::<Result<Vec<_>, _>>()?;
        build_batch(&objects, schema)
    }

    fn format(&self) -> Format {
        Format::Json
    }
}
