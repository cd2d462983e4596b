//! Testing utilities.
//!
//! Provides an in-memory [`StreamEnvironment`] that records attached
//! operators and registered tables, plus small helpers for building
//! table options.

use crate::config::TableProperties;
use crate::environment::{SourceOperator, StreamEnvironment, StreamId, TableHandle};
use crate::error::ConnectorError;

/// Builds table options from string pairs.
#[must_use]
pub fn properties(pairs: &[(&str, &str)]) -> TableProperties {
    pairs.iter().copied().collect()
}

/// Environment that records everything attached to it.
///
/// Stream ids are assigned sequentially from zero and never reused, even
/// after a source is removed. Registering the same table name twice, or a
/// stream that was never added, is rejected.
#[derive(Debug, Default)]
pub struct RecordingEnvironment {
    sources: Vec<SourceOperator>,
    // Stream id of each entry in `sources`
    ids: Vec<StreamId>,
    next_id: u64,
    tables: Vec<TableHandle>,
}

impl RecordingEnvironment {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attached operators in attachment order.
    #[must_use]
    pub fn sources(&self) -> &[SourceOperator] {
        &self.sources
    }

    /// Registered tables in registration order.
    #[must_use]
    pub fn tables(&self) -> &[TableHandle] {
        &self.tables
    }

    /// Operator behind a stream.
    #[must_use]
    pub fn source(&self, stream: StreamId) -> Option<&SourceOperator> {
        self.position(stream).map(|idx| &self.sources[idx])
    }

    fn position(&self, stream: StreamId) -> Option<usize> {
        self.ids.iter().position(|id| *id == stream)
    }

    /// Registered table by name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableHandle> {
        self.tables.iter().find(|t| t.table_name == name)
    }
}

impl StreamEnvironment for RecordingEnvironment {
    fn add_source(&mut self, operator: SourceOperator) -> Result<StreamId, ConnectorError> {
        let id = StreamId(self.next_id);
        self.next_id += 1;
        self.sources.push(operator);
        self.ids.push(id);
        Ok(id)
    }

    fn remove_source(&mut self, stream: StreamId) -> Result<SourceOperator, ConnectorError> {
        let idx = self
            .position(stream)
            .ok_or_else(|| ConnectorError::Environment(format!("unknown {stream}")))?;
        if let Some(table) = self.tables.iter().find(|t| t.stream == stream) {
            return Err(ConnectorError::Environment(format!(
                "{stream} backs table '{}'",
                table.table_name
            )));
        }
        self.ids.remove(idx);
        Ok(self.sources.remove(idx))
    }

    fn register_table(
        &mut self,
        stream: StreamId,
        table_name: &str,
        field_names: &[String],
    ) -> Result<TableHandle, ConnectorError> {
        if self.source(stream).is_none() {
            return Err(ConnectorError::Environment(format!("unknown {stream}")));
        }
        if self.table(table_name).is_some() {
            return Err(ConnectorError::Environment(format!(
                "table '{table_name}' already registered"
            )));
        }

        let handle = TableHandle {
            table_name: table_name.to_string(),
            stream,
            field_names: field_names.to_vec(),
        };
        self.tables.push(handle.clone());
        Ok(handle)
    }
}
