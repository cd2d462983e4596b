//! Side-table cache options.
//!
//! These settings are parsed and validated here; the lookup join runtime
//! that honors them lives outside this crate.

use std::str::FromStr;

use crate::config::TableProperties;
use crate::error::ConnectorError;

/// Cache strategy key.
pub const CACHE_KEY: &str = "cache";
/// Maximum cached rows key.
pub const CACHE_SIZE_KEY: &str = "cachesize";
/// Cache entry TTL key.
pub const CACHE_TTL_MS_KEY: &str = "cachettlms";
/// Partitioned join key.
pub const PARTITIONED_JOIN_KEY: &str = "partitionedjoin";
/// Async lookup capacity key.
pub const ASYNC_CAPACITY_KEY: &str = "asynccapacity";
/// Async lookup timeout key.
pub const ASYNC_TIMEOUT_KEY: &str = "asynctimeout";

/// Side-table cache strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheType {
    /// Every lookup goes to the external system.
    #[default]
    None,
    /// Least-recently-used cache of looked-up rows.
    Lru,
    /// Whole table loaded and refreshed periodically.
    All,
}

impl FromStr for CacheType {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(CacheType::None),
            "lru" => Ok(CacheType::Lru),
            "all" => Ok(CacheType::All),
            other => Err(ConnectorError::Validation(format!(
                "invalid cache type: '{other}' (expected none/lru/all)"
            ))),
        }
    }
}

/// Parsed side-table cache options.
///
/// Unset numeric options stay `None`; the lookup runtime picks defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSettings {
    /// Cache strategy.
    pub cache_type: CacheType,
    /// Maximum cached rows.
    pub cache_size: Option<u64>,
    /// Entry TTL in milliseconds.
    pub cache_ttl_ms: Option<u64>,
    /// Whether to partition the stream by join key.
    pub partitioned_join: Option<bool>,
    /// Maximum in-flight async lookups.
    pub async_capacity: Option<u32>,
    /// Async lookup timeout in milliseconds.
    pub async_timeout_ms: Option<u64>,
}

impl CacheSettings {
    /// Parses cache options.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Validation` for an unknown cache type or
    /// non-positive sizes.
    pub fn from_properties(props: &TableProperties) -> Result<Self, ConnectorError> {
        let cache_type = match props.get_string(CACHE_KEY) {
            Some(s) => s.parse()?,
            None => CacheType::None,
        };
        let settings = Self {
            cache_type,
            cache_size: props.get_integer(CACHE_SIZE_KEY)?,
            cache_ttl_ms: props.get_integer(CACHE_TTL_MS_KEY)?,
            partitioned_join: props.get_bool(PARTITIONED_JOIN_KEY)?,
            async_capacity: props.get_integer(ASYNC_CAPACITY_KEY)?,
            async_timeout_ms: props.get_integer(ASYNC_TIMEOUT_KEY)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Validation` if a size is zero.
    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.cache_size == Some(0) {
            return Err(ConnectorError::Validation("cachesize must be > 0".into()));
        }
        if self.cache_ttl_ms == Some(0) {
            return Err(ConnectorError::Validation("cachettlms must be > 0".into()));
        }
        if self.async_capacity == Some(0) {
            return Err(ConnectorError::Validation(
                "asynccapacity must be > 0".into(),
            ));
        }
        Ok(())
    }
}
