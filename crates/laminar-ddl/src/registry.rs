//! Marker and parser registries.
//!
//! - [`MarkerRegistry`]: per-subtype table of structural marker rules
//!   (`PERIOD FOR SYSTEM_TIME`, `PRIMARY KEY(..)`, `WATERMARK FOR ..`)
//!   recognized inside a field list.
//! - [`ParserRegistry`]: catalog of table parsers keyed by connector type.
//!
//! Both are populated up front and read-only afterwards. The process-wide
//! parser registry is installed by an explicit startup call to
//! [`install_defaults`]; tests build isolated registries instead.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::{Captures, Regex};

use crate::config::TableProperties;
use crate::descriptor::{Annotations, TableDescriptor, TableParser, WatermarkSpec};
use crate::error::ConnectorError;
use crate::kafka::KafkaSourceParser;
use crate::lookup::CassandraSideParser;

/// Kind of structural annotation a marker records.
///
/// Each variant has a pure handler, [`MarkerKind::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    /// `PERIOD FOR SYSTEM_TIME`: the table has temporal-validity semantics.
    PeriodForSystemTime,
    /// `PRIMARY KEY(col, ...)`: key columns.
    PrimaryKey,
    /// `WATERMARK FOR col AS withOffset(col, millis)`: event-time column
    /// with bounded out-of-orderness.
    Watermark,
}

impl MarkerKind {
    /// Returns the recognition pattern for this marker.
    #[must_use]
    pub fn pattern(&self) -> &'static str {
        match self {
            MarkerKind::PeriodForSystemTime => r"(?i)^PERIOD\s+FOR\s+SYSTEM_TIME$",
            MarkerKind::PrimaryKey => r"(?i)^PRIMARY\s+KEY\s*\((.+)\)$",
            MarkerKind::Watermark => {
                r"(?i)^WATERMARK\s+FOR\s+(\S+)\s+AS\s+withOffset\(\s*(\S+)\s*,\s*(\d+)\s*\)$"
            }
        }
    }

    /// Records the annotation for a matched marker.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Validation` if the marker was already
    /// recorded or its captures are inconsistent.
    pub fn apply(&self, caps: &Captures<'_>, annotations: &mut Annotations) -> Result<(), ConnectorError> {
        match self {
            MarkerKind::PeriodForSystemTime => {
                if annotations.period_for_system_time {
                    return Err(duplicate_marker("PERIOD FOR SYSTEM_TIME"));
                }
                annotations.period_for_system_time = true;
            }
            MarkerKind::PrimaryKey => {
                if !annotations.primary_key.is_empty() {
                    return Err(duplicate_marker("PRIMARY KEY"));
                }
                let columns: Vec<String> = caps[1]
                    .split(',')
                    .map(|c| c.trim().trim_matches('`').to_string())
                    .collect();
                if columns.iter().any(String::is_empty) {
                    return Err(ConnectorError::Validation(format!(
                        "invalid primary key column list: '{}'",
                        &caps[1]
                    )));
                }
                annotations.primary_key = columns;
            }
            MarkerKind::Watermark => {
                if annotations.watermark.is_some() {
                    return Err(duplicate_marker("WATERMARK"));
                }
                let column = &caps[1];
                if !column.eq_ignore_ascii_case(&caps[2]) {
                    return Err(ConnectorError::Validation(format!(
                        "watermark for '{column}' must offset the same column, got '{}'",
                        &caps[2]
                    )));
                }
                let max_out_of_orderness_ms = caps[3].parse::<u64>().map_err(|e| {
                    ConnectorError::Validation(format!("invalid watermark offset: {e}"))
                })?;
                annotations.watermark = Some(WatermarkSpec {
                    column: column.to_string(),
                    max_out_of_orderness_ms,
                });
            }
        }
        Ok(())
    }
}

fn duplicate_marker(marker: &str) -> ConnectorError {
    ConnectorError::Validation(format!("{marker} declared more than once"))
}

/// A registered marker rule.
#[derive(Debug, Clone)]
pub struct MarkerRule {
    key: String,
    pattern: Regex,
    kind: MarkerKind,
}

impl MarkerRule {
    /// Returns the rule key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the annotation kind.
    #[must_use]
    pub fn kind(&self) -> MarkerKind {
        self.kind
    }
}

/// Ordered, append-only set of marker rules for one connector subtype.
///
/// Rules are tested in registration order.
#[derive(Debug, Clone, Default)]
pub struct MarkerRegistry {
    rules: Vec<MarkerRule>,
}

impl MarkerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for streaming sources: primary key and watermark.
    #[must_use]
    pub fn source() -> Self {
        Self::with_kinds(&[
            ("primaryKey", MarkerKind::PrimaryKey),
            ("watermark", MarkerKind::Watermark),
        ])
    }

    /// Rules for side (lookup) tables: temporal sign and primary key.
    #[must_use]
    pub fn side_table() -> Self {
        Self::with_kinds(&[
            ("sideSignKey", MarkerKind::PeriodForSystemTime),
            ("primaryKey", MarkerKind::PrimaryKey),
        ])
    }

    fn with_kinds(kinds: &[(&str, MarkerKind)]) -> Self {
        let mut registry = Self::new();
        for (key, kind) in kinds {
            // Built-in keys are distinct and built-in patterns compile.
            if let Err(e) = registry.register(*key, *kind) {
                unreachable!("built-in marker rule '{key}' rejected: {e}");
            }
        }
        registry
    }

    /// Appends a rule using the built-in pattern of `kind`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Registry` if `key` is already registered.
    pub fn register(&mut self, key: impl Into<String>, kind: MarkerKind) -> Result<(), ConnectorError> {
        let pattern = Regex::new(kind.pattern())
            .map_err(|e| ConnectorError::Registry(format!("invalid marker pattern: {e}")))?;
        self.register_pattern(key, pattern, kind)
    }

    /// Appends a rule with a custom recognition pattern.
    ///
    /// The pattern must expose the capture groups `kind` expects.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Registry` if `key` is already registered.
    pub fn register_pattern(
        &mut self,
        key: impl Into<String>,
        pattern: Regex,
        kind: MarkerKind,
    ) -> Result<(), ConnectorError> {
        let key = key.into();
        if self.rules.iter().any(|r| r.key == key) {
            return Err(ConnectorError::Registry(format!(
                "marker rule '{key}' already registered"
            )));
        }
        self.rules.push(MarkerRule { key, pattern, kind });
        Ok(())
    }

    /// Returns the registered rules in order.
    #[must_use]
    pub fn rules(&self) -> &[MarkerRule] {
        &self.rules
    }

    /// Tests `entry` against each rule in registration order and applies
    /// the first match.
    ///
    /// Returns `Ok(true)` if the entry was a marker.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`MarkerKind::apply`].
    pub fn dispatch(&self, entry: &str, annotations: &mut Annotations) -> Result<bool, ConnectorError> {
        for rule in &self.rules {
            if let Some(caps) = rule.pattern.captures(entry) {
                rule.kind.apply(&caps, annotations)?;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Catalog of table parsers keyed by lowercase connector type.
#[derive(Clone, Default)]
pub struct ParserRegistry {
    parsers: HashMap<String, Arc<dyn TableParser>>,
}

impl ParserRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in parsers:
    /// `kafka` / `kafka11` sources and `cassandra` side tables.
    #[must_use]
    pub fn with_defaults() -> Self {
        let kafka: Arc<dyn TableParser> = Arc::new(KafkaSourceParser::new());
        let mut parsers: HashMap<String, Arc<dyn TableParser>> = HashMap::new();
        parsers.insert("kafka".into(), Arc::clone(&kafka));
        parsers.insert("kafka11".into(), kafka);
        parsers.insert("cassandra".into(), Arc::new(CassandraSideParser::new()));
        Self { parsers }
    }

    /// Registers a parser under a connector type.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Registry` if the type is already taken.
    pub fn register(
        &mut self,
        connector_type: &str,
        parser: Arc<dyn TableParser>,
    ) -> Result<(), ConnectorError> {
        let key = connector_type.to_lowercase();
        if self.parsers.contains_key(&key) {
            return Err(ConnectorError::Registry(format!(
                "parser for '{key}' already registered"
            )));
        }
        self.parsers.insert(key, parser);
        Ok(())
    }

    /// Returns the parser for a connector type.
    #[must_use]
    pub fn get(&self, connector_type: &str) -> Option<&Arc<dyn TableParser>> {
        self.parsers.get(&connector_type.to_lowercase())
    }

    /// Lists registered connector types, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.parsers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Parses a table definition with the parser for `connector_type`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Registry` for an unknown connector type,
    /// or the parser's error.
    pub fn parse(
        &self,
        connector_type: &str,
        table_name: &str,
        fields_text: &str,
        props: &TableProperties,
    ) -> Result<TableDescriptor, ConnectorError> {
        let parser = self.get(connector_type).ok_or_else(|| {
            ConnectorError::Registry(format!("unknown connector type: '{connector_type}'"))
        })?;
        parser.parse(table_name, fields_text, props)
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("parsers", &self.list())
            .finish()
    }
}

static GLOBAL_PARSERS: OnceLock<ParserRegistry> = OnceLock::new();

/// Installs the built-in parsers as the process-wide registry.
///
/// Call once during startup; later calls return the installed registry.
pub fn install_defaults() -> &'static ParserRegistry {
    GLOBAL_PARSERS.get_or_init(ParserRegistry::with_defaults)
}

/// Returns the process-wide parser registry.
///
/// # Errors
///
/// Returns `ConnectorError::Registry` if [`install_defaults`] has not run.
pub fn global() -> Result<&'static ParserRegistry, ConnectorError> {
    GLOBAL_PARSERS
        .get()
        .ok_or_else(|| ConnectorError::Registry("parser registry not installed".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatch(registry: &MarkerRegistry, entry: &str) -> (bool, Annotations) {
        let mut annotations = Annotations::default();
        let matched = registry.dispatch(entry, &mut annotations).unwrap();
        (matched, annotations)
    }

    #[test]
    fn test_period_for_system_time() {
        let registry = MarkerRegistry::side_table();
        let (matched, ann) = dispatch(&registry, "period for  SYSTEM_TIME");
        assert!(matched);
        assert!(ann.period_for_system_time);

        // Source tables do not recognize the side sign.
        let (matched, _) = dispatch(&MarkerRegistry::source(), "PERIOD FOR SYSTEM_TIME");
        assert!(!matched);
    }

    #[test]
    fn test_primary_key() {
        let (matched, ann) = dispatch(&MarkerRegistry::source(), "PRIMARY KEY (id, `name`)");
        assert!(matched);
        assert_eq!(ann.primary_key, vec!["id", "name"]);
    }

    #[test]
    fn test_watermark() {
        let (matched, ann) = dispatch(
            &MarkerRegistry::source(),
            "WATERMARK FOR ts AS withOffset(ts, 1000)",
        );
        assert!(matched);
        let wm = ann.watermark.unwrap();
        assert_eq!(wm.column, "ts");
        assert_eq!(wm.max_out_of_orderness_ms, 1000);
    }

    #[test]
    fn test_watermark_column_mismatch() {
        let mut ann = Annotations::default();
        let res = MarkerRegistry::source()
            .dispatch("WATERMARK FOR ts AS withOffset(other, 10)", &mut ann);
        assert!(matches!(res, Err(ConnectorError::Validation(_))));
    }

    #[test]
    fn test_plain_field_is_not_a_marker() {
        let (matched, ann) = dispatch(&MarkerRegistry::side_table(), "id INT");
        assert!(!matched);
        assert_eq!(ann, Annotations::default());
    }

    #[test]
    fn test_duplicate_marker_rejected() {
        let registry = MarkerRegistry::side_table();
        let mut ann = Annotations::default();
        registry
            .dispatch("PERIOD FOR SYSTEM_TIME", &mut ann)
            .unwrap();
        assert!(registry
            .dispatch("PERIOD FOR SYSTEM_TIME", &mut ann)
            .is_err());
    }

    #[test]
    fn test_registration_order() {
        let registry = MarkerRegistry::side_table();
        let keys: Vec<&str> = registry.rules().iter().map(MarkerRule::key).collect();
        assert_eq!(keys, vec!["sideSignKey", "primaryKey"]);
    }

    #[test]
    fn test_duplicate_rule_key_rejected() {
        let mut registry = MarkerRegistry::new();
        registry
            .register("sign", MarkerKind::PeriodForSystemTime)
            .unwrap();
        let res = registry.register("sign", MarkerKind::PrimaryKey);
        assert!(matches!(res, Err(ConnectorError::Registry(_))));
        assert_eq!(registry.rules().len(), 1);
    }

    #[test]
    fn test_parser_registry_defaults() {
        let registry = ParserRegistry::with_defaults();
        assert_eq!(registry.list(), vec!["cassandra", "kafka", "kafka11"]);
        assert!(registry.get("KAFKA11").is_some());
        assert!(registry.get("redis").is_none());
    }

    #[test]
    fn test_parser_registry_unknown_type() {
        let registry = ParserRegistry::new();
        let res = registry.parse("kafka", "t", "id INT", &TableProperties::new());
        assert!(matches!(res, Err(ConnectorError::Registry(_))));
    }

    #[test]
    fn test_parser_registry_duplicate() {
        let mut registry = ParserRegistry::with_defaults();
        let res = registry.register("Kafka", Arc::new(KafkaSourceParser::new()));
        assert!(res.is_err());
    }

    #[test]
    fn test_global_install() {
        let installed = install_defaults();
        assert!(global().is_ok());
        assert!(std::ptr::eq(installed, global().unwrap()));
    }
}
