//! Cassandra side-table definitions.
//!
//! Parses connection and pool-sizing options for a Cassandra lookup
//! table. Connection pooling and request queuing are configured here
//! but enforced by the lookup runtime.

use std::sync::Arc;

use crate::config::{ConfigKeySpec, TableProperties};
use crate::descriptor::{ConnectorKind, DescriptorBuilder, TableDescriptor, TableParser};
use crate::error::ConnectorError;
use crate::registry::MarkerRegistry;

use super::cache::{
    CacheSettings, ASYNC_CAPACITY_KEY, ASYNC_TIMEOUT_KEY, CACHE_KEY, CACHE_SIZE_KEY,
    CACHE_TTL_MS_KEY, PARTITIONED_JOIN_KEY,
};

/// Named settings of a Cassandra side table.
pub const CASSANDRA_SIDE_CONFIG_KEYS: &[ConfigKeySpec] = &[
    ConfigKeySpec::string("address", "Comma-separated contact points (host:port)"),
    ConfigKeySpec::string("tablename", "Target table"),
    ConfigKeySpec::string("database", "Target keyspace"),
    ConfigKeySpec::string("username", "Authentication user"),
    ConfigKeySpec::string("password", "Authentication password"),
    ConfigKeySpec::integer("maxrequestsperconnection", "Max in-flight requests per connection"),
    ConfigKeySpec::integer("coreconnectionsperhost", "Core connections per host"),
    ConfigKeySpec::integer("maxconnectionsperhost", "Max connections per host"),
    ConfigKeySpec::integer("maxqueuesize", "Max queued requests"),
    ConfigKeySpec::integer("readtimeoutmillis", "Read timeout in milliseconds"),
    ConfigKeySpec::integer("connecttimeoutmillis", "Connect timeout in milliseconds"),
    ConfigKeySpec::integer("pooltimeoutmillis", "Pool acquisition timeout in milliseconds"),
    ConfigKeySpec::string(CACHE_KEY, "Cache strategy: none, lru or all"),
    ConfigKeySpec::integer(CACHE_SIZE_KEY, "Maximum cached rows (lru)"),
    ConfigKeySpec::integer(CACHE_TTL_MS_KEY, "Cache entry TTL in milliseconds"),
    ConfigKeySpec::boolean(PARTITIONED_JOIN_KEY, "Partition the stream by join key"),
    ConfigKeySpec::integer(ASYNC_CAPACITY_KEY, "Maximum in-flight async lookups"),
    ConfigKeySpec::integer(ASYNC_TIMEOUT_KEY, "Async lookup timeout in milliseconds"),
];

/// Cassandra side-table settings.
///
/// Every field is optional: absent options stay unset and the lookup
/// runtime applies its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CassandraSideSettings {
    /// Contact points.
    pub address: Option<String>,
    /// Target table.
    pub table_name: Option<String>,
    /// Target keyspace.
    pub database: Option<String>,
    /// Authentication user.
    pub user_name: Option<String>,
    /// Authentication password.
    pub password: Option<String>,
    /// Max in-flight requests per connection.
    pub max_requests_per_connection: Option<i32>,
    /// Core connections per host.
    pub core_connections_per_host: Option<i32>,
    /// Max connections per host.
    pub max_connections_per_host: Option<i32>,
    /// Max queued requests.
    pub max_queue_size: Option<i32>,
    /// Read timeout in milliseconds.
    pub read_timeout_millis: Option<i32>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_millis: Option<i32>,
    /// Pool acquisition timeout in milliseconds.
    pub pool_timeout_millis: Option<i32>,
    /// Lookup cache options.
    pub cache: CacheSettings,
}

impl CassandraSideSettings {
    /// Reads the Cassandra settings from table options.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Validation` if a numeric option is not an integer.
    pub fn from_properties(props: &TableProperties) -> Result<Self, ConnectorError> {
        Ok(Self {
            address: props.get_string("address"),
            table_name: props.get_string("tablename"),
            database: props.get_string("database"),
            user_name: props.get_string("username"),
            password: props.get_string("password"),
            max_requests_per_connection: props.get_integer("maxrequestsperconnection")?,
            core_connections_per_host: props.get_integer("coreconnectionsperhost")?,
            max_connections_per_host: props.get_integer("maxconnectionsperhost")?,
            max_queue_size: props.get_integer("maxqueuesize")?,
            read_timeout_millis: props.get_integer("readtimeoutmillis")?,
            connect_timeout_millis: props.get_integer("connecttimeoutmillis")?,
            pool_timeout_millis: props.get_integer("pooltimeoutmillis")?,
            cache: CacheSettings::from_properties(props)?,
        })
    }

    /// Contact points split on commas.
    #[must_use]
    pub fn contact_points(&self) -> Vec<String> {
        self.address
            .as_deref()
            .map(|a| {
                a.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Parser for `cassandra` side tables.
#[derive(Debug, Clone)]
pub struct CassandraSideParser {
    markers: Arc<MarkerRegistry>,
}

impl CassandraSideParser {
    /// Creates a parser with the side-table marker rules.
    #[must_use]
    pub fn new() -> Self {
        Self::with_markers(Arc::new(MarkerRegistry::side_table()))
    }

    /// Creates a parser over a caller-supplied marker registry.
    #[must_use]
    pub fn with_markers(markers: Arc<MarkerRegistry>) -> Self {
        Self { markers }
    }
}

impl Default for CassandraSideParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TableParser for CassandraSideParser {
    fn parse(
        &self,
        table_name: &str,
        fields_text: &str,
        props: &TableProperties,
    ) -> Result<TableDescriptor, ConnectorError> {
        DescriptorBuilder::new(&self.markers, CASSANDRA_SIDE_CONFIG_KEYS).build(
            table_name,
            fields_text,
            props,
            |p| Ok(ConnectorKind::CassandraSide(CassandraSideSettings::from_properties(p)?)),
        )
    }

    fn config_keys(&self) -> &'static [ConfigKeySpec] {
        CASSANDRA_SIDE_CONFIG_KEYS
    }
}
