//! Kafka source tables.
//!
//! Parses Kafka source table definitions into descriptors and builds the
//! source operators that read them.
//!
//! # Features
//!
//! - Single-topic or pattern subscriptions
//! - JSON, delimited-text and raw payload decoding
//! - Start from earliest, latest or explicit per-partition offsets
//! - Pass-through `kafka.*` client properties
//!
//! # Usage
//!
//! ```rust,ignore
//! use laminar_ddl::kafka::{KafkaSourceFactory, KafkaSourceParser};
//!
//! let desc = KafkaSourceParser::new().parse("t1", "id BIGINT, msg VARCHAR", &props)?;
//! let handle = KafkaSourceFactory::new().construct(&desc, &mut env)?;
//! ```

pub mod config;
pub mod consumer;
pub mod offsets;
pub mod source;

use std::sync::Arc;

pub use config::{KafkaSourceSettings, TopicPattern, TopicSubscription};
pub use consumer::ConsumerSpec;
pub use offsets::{StartOffsets, StartupMode, TopicPartition};
pub use source::{KafkaSourceFactory, SourceRuntimeConfig};

use crate::config::{ConfigKeySpec, TableProperties};
use crate::descriptor::{ConnectorKind, DescriptorBuilder, TableDescriptor, TableParser};
use crate::error::ConnectorError;
use crate::registry::MarkerRegistry;

/// Named settings of a Kafka source table.
pub const KAFKA_SOURCE_CONFIG_KEYS: &[ConfigKeySpec] = &[
    ConfigKeySpec::string("bootstrapservers", "Kafka broker addresses"),
    ConfigKeySpec::string("groupid", "Consumer group identifier"),
    ConfigKeySpec::string("topic", "Topic name, or pattern with topicispattern"),
    ConfigKeySpec::boolean("topicispattern", "Treat topic as a regular expression"),
    ConfigKeySpec::string(
        "offsetreset",
        "Start position: earliest, latest or {\"partition\": offset}",
    ),
    ConfigKeySpec::string("sourcedatatype", "Payload format: json, csv, anything else raw"),
    ConfigKeySpec::string("fielddelimiter", "Delimiter for csv payloads"),
    ConfigKeySpec::string(
        "lengthcheckpolicy",
        "Field count mismatch handling for csv: pad, truncate, reject or skip",
    ),
];

/// Parser for `kafka` source tables.
#[derive(Debug, Clone)]
pub struct KafkaSourceParser {
    markers: Arc<MarkerRegistry>,
}

impl KafkaSourceParser {
    /// Creates a parser with the source marker rules.
    #[must_use]
    pub fn new() -> Self {
        Self::with_markers(Arc::new(MarkerRegistry::source()))
    }

    /// Creates a parser over a caller-supplied marker registry.
    #[must_use]
    pub fn with_markers(markers: Arc<MarkerRegistry>) -> Self {
        Self { markers }
    }
}

impl Default for KafkaSourceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TableParser for KafkaSourceParser {
    fn parse(
        &self,
        table_name: &str,
        fields_text: &str,
        props: &TableProperties,
    ) -> Result<TableDescriptor, ConnectorError> {
        DescriptorBuilder::new(&self.markers, KAFKA_SOURCE_CONFIG_KEYS).build(
            table_name,
            fields_text,
            props,
            |p| Ok(ConnectorKind::KafkaSource(KafkaSourceSettings::from_properties(p)?)),
        )
    }

    fn config_keys(&self) -> &'static [ConfigKeySpec] {
        KAFKA_SOURCE_CONFIG_KEYS
    }
}
