//! Side (lookup) table definitions.
//!
//! Side tables enrich a stream through lookup joins. This module turns
//! their table definitions into descriptors; the join, cache and
//! connection-pool runtime is provided elsewhere.

pub mod cache;
pub mod cassandra;

pub use cache::{CacheSettings, CacheType};
pub use cassandra::{CassandraSideParser, CassandraSideSettings, CASSANDRA_SIDE_CONFIG_KEYS};
