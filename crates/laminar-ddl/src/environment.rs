//! Execution environment seam.
//!
//! Constructed sources are attached to a [`StreamEnvironment`], which
//! owns the running pipeline. This crate only describes operators; the
//! environment decides how to run them.

use std::fmt;

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;

use crate::error::{ConnectorError, SerdeError};
use crate::kafka::ConsumerSpec;
use crate::serde::RecordDeserializer;

/// Identifier of a stream inside an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// A stream registered as a named table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHandle {
    /// Table name.
    pub table_name: String,
    /// Underlying stream.
    pub stream: StreamId,
    /// Column names in declared order.
    pub field_names: Vec<String>,
}

/// A fully configured source operator, ready to be attached.
pub struct SourceOperator {
    name: String,
    parallelism: Option<u32>,
    schema: SchemaRef,
    consumer: ConsumerSpec,
    deserializer: Box<dyn RecordDeserializer>,
}

impl SourceOperator {
    /// Creates an operator.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        parallelism: Option<u32>,
        schema: SchemaRef,
        consumer: ConsumerSpec,
        deserializer: Box<dyn RecordDeserializer>,
    ) -> Self {
        Self {
            name: name.into(),
            parallelism,
            schema,
            consumer,
            deserializer,
        }
    }

    /// Operator name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parallelism, or `None` to inherit the environment default.
    #[must_use]
    pub fn parallelism(&self) -> Option<u32> {
        self.parallelism
    }

    /// Row type produced by the operator.
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    /// Consumer settings.
    #[must_use]
    pub fn consumer(&self) -> &ConsumerSpec {
        &self.consumer
    }

    /// Record decoder.
    #[must_use]
    pub fn deserializer(&self) -> &dyn RecordDeserializer {
        self.deserializer.as_ref()
    }

    /// Decodes raw payloads into rows of the operator's row type.
    ///
    /// # Errors
    ///
    /// Returns `SerdeError` if a payload cannot be decoded.
    pub fn decode(&self, records: &[&[u8]]) -> Result<RecordBatch, SerdeError> {
        self.deserializer.deserialize_batch(records, &self.schema)
    }
}

impl fmt::Debug for SourceOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceOperator")
            .field("name", &self.name)
            .field("parallelism", &self.parallelism)
            .field("format", &self.deserializer.format())
            .field("consumer", &self.consumer)
            .finish_non_exhaustive()
    }
}

/// The pipeline a source is attached to.
pub trait StreamEnvironment {
    /// Attaches a source operator and returns its output stream.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Environment` if the operator is rejected.
    fn add_source(&mut self, operator: SourceOperator) -> Result<StreamId, ConnectorError>;

    /// Detaches a source that was added but never registered as a table.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Environment` if the stream is unknown or
    /// already backs a table.
    fn remove_source(&mut self, stream: StreamId) -> Result<SourceOperator, ConnectorError>;

    /// Registers a stream as a named table with the given column names.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Environment` if the name is taken or the
    /// stream is unknown.
    fn register_table(
        &mut self,
        stream: StreamId,
        table_name: &str,
        field_names: &[String],
    ) -> Result<TableHandle, ConnectorError>;
}
