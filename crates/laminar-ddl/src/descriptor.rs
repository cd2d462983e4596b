//! Typed table descriptors and the shared descriptor-building algorithm.
//!
//! A [`TableDescriptor`] is the validated form of one table definition:
//! a common header (name, fields, parallelism, structural annotations),
//! a connector-specific payload ([`ConnectorKind`]) and the options no
//! named setting covered.
//!
//! Connector subtypes implement [`TableParser`] and delegate the common
//! work to [`DescriptorBuilder`].

use std::collections::BTreeMap;

use arrow_schema::SchemaRef;
use tracing::debug;

use crate::config::{self, ConfigKeySpec, PropertyValue, TableProperties, PARALLELISM_KEY};
use crate::error::ConnectorError;
use crate::kafka::KafkaSourceSettings;
use crate::lookup::CassandraSideSettings;
use crate::registry::MarkerRegistry;
use crate::schema::{self, FieldDef};

/// Event-time column with bounded out-of-orderness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkSpec {
    /// Event-time column.
    pub column: String,
    /// Maximum expected out-of-orderness in milliseconds.
    pub max_out_of_orderness_ms: u64,
}

/// Structural annotations recognized in a field list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    /// `PERIOD FOR SYSTEM_TIME` was declared.
    pub period_for_system_time: bool,
    /// Primary key columns, empty if none was declared.
    pub primary_key: Vec<String>,
    /// Watermark declaration.
    pub watermark: Option<WatermarkSpec>,
}

/// Connector-specific part of a descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorKind {
    /// Kafka streaming source.
    KafkaSource(KafkaSourceSettings),
    /// Cassandra side (lookup) table.
    CassandraSide(CassandraSideSettings),
}

impl ConnectorKind {
    /// Short name of the connector subtype.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ConnectorKind::KafkaSource(_) => "kafka-source",
            ConnectorKind::CassandraSide(_) => "cassandra-side",
        }
    }
}

/// Validated, immutable connector descriptor for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDescriptor {
    name: String,
    fields: Vec<FieldDef>,
    parallelism: Option<u32>,
    annotations: Annotations,
    connector: ConnectorKind,
    raw_params: BTreeMap<String, PropertyValue>,
}

impl TableDescriptor {
    /// Logical table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields in order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Declared field names in order.
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Arrow row type of the declared fields.
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        schema::to_arrow_schema(&self.fields)
    }

    /// Operator parallelism, if declared.
    #[must_use]
    pub fn parallelism(&self) -> Option<u32> {
        self.parallelism
    }

    /// Structural annotations.
    #[must_use]
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Connector-specific settings.
    #[must_use]
    pub fn connector(&self) -> &ConnectorKind {
        &self.connector
    }

    /// Options not covered by a named setting, keyed by lowercase name.
    #[must_use]
    pub fn raw_params(&self) -> &BTreeMap<String, PropertyValue> {
        &self.raw_params
    }

    /// Raw options with a given prefix, prefix stripped, values rendered.
    #[must_use]
    pub fn raw_params_with_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        self.raw_params
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(prefix).map(|s| (s.to_string(), v.render())))
            .collect()
    }
}

/// Parses table definitions of one connector subtype.
pub trait TableParser: Send + Sync {
    /// Builds a descriptor from a table name, its field list text and its options.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Validation` if the field list is invalid or
    /// a named setting cannot be coerced.
    fn parse(
        &self,
        table_name: &str,
        fields_text: &str,
        props: &TableProperties,
    ) -> Result<TableDescriptor, ConnectorError>;

    /// Named settings this subtype recognizes.
    fn config_keys(&self) -> &'static [ConfigKeySpec];
}

/// Shared descriptor-building steps for a connector subtype.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorBuilder<'a> {
    markers: &'a MarkerRegistry,
    settings: &'a [ConfigKeySpec],
}

impl<'a> DescriptorBuilder<'a> {
    /// Creates a builder over a marker registry and the subtype's settings.
    #[must_use]
    pub fn new(markers: &'a MarkerRegistry, settings: &'a [ConfigKeySpec]) -> Self {
        Self { markers, settings }
    }

    /// Parses a field list, dispatching structural markers to the registry.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Validation` for malformed entries, an empty
    /// or duplicate field list, or annotations naming unknown columns.
    pub fn parse_fields(&self, text: &str) -> Result<(Vec<FieldDef>, Annotations), ConnectorError> {
        let mut fields = Vec::new();
        let mut annotations = Annotations::default();

        for entry in schema::split_entries(text) {
            if self.markers.dispatch(entry, &mut annotations)? {
                continue;
            }
            fields.push(FieldDef::parse(entry)?);
        }

        schema::validate_fields(&fields)?;
        check_annotation_columns(&fields, &annotations)?;
        Ok((fields, annotations))
    }

    /// Returns `true` if `key` is a named setting of this subtype.
    #[must_use]
    pub fn is_named(&self, key: &str) -> bool {
        key == PARALLELISM_KEY || self.settings.iter().any(|s| s.key == key)
    }

    /// Copies every option that is not a named setting.
    #[must_use]
    pub fn passthrough(&self, props: &TableProperties) -> BTreeMap<String, PropertyValue> {
        props
            .properties()
            .iter()
            .filter(|(k, _)| !self.is_named(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Runs all building steps.
    ///
    /// `connector` reads the subtype-specific settings once the common
    /// header has been validated.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn build<F>(
        &self,
        table_name: &str,
        fields_text: &str,
        props: &TableProperties,
        connector: F,
    ) -> Result<TableDescriptor, ConnectorError>
    where
        F: FnOnce(&TableProperties) -> Result<ConnectorKind, ConnectorError>,
    {
        if table_name.trim().is_empty() {
            return Err(ConnectorError::Validation("table name is empty".into()));
        }
        let (fields, annotations) = self.parse_fields(fields_text)?;

        for spec in self.settings {
            spec.check(props)?;
        }
        let parallelism = config::parallelism(props)?;
        let connector = connector(props)?;
        let raw_params = self.passthrough(props);

        debug!(
            table = table_name,
            connector = connector.name(),
            fields = fields.len(),
            passthrough = raw_params.len(),
            "built table descriptor"
        );

        Ok(TableDescriptor {
            name: table_name.to_string(),
            fields,
            parallelism,
            annotations,
            connector,
            raw_params,
        })
    }
}

fn check_annotation_columns(
    fields: &[FieldDef],
    annotations: &Annotations,
) -> Result<(), ConnectorError> {
    let known = |col: &str| fields.iter().any(|f| f.name.eq_ignore_ascii_case(col));

    if let Some(col) = annotations.primary_key.iter().find(|c| !known(c)) {
        return Err(ConnectorError::Validation(format!(
            "primary key column '{col}' is not a declared field"
        )));
    }
    if let Some(wm) = &annotations.watermark {
        if !known(&wm.column) {
            return Err(ConnectorError::Validation(format!(
                "watermark column '{}' is not a declared field",
                wm.column
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    const SETTINGS: &[ConfigKeySpec] = &[
        ConfigKeySpec::string("address", "Host list"),
        ConfigKeySpec::integer("maxqueuesize", "Queue size"),
    ];

    fn build(text: &str, props: &TableProperties) -> Result<TableDescriptor, ConnectorError> {
        let markers = MarkerRegistry::side_table();
        DescriptorBuilder::new(&markers, SETTINGS).build("t", text, props, |p| {
            Ok(ConnectorKind::CassandraSide(CassandraSideSettings::from_properties(p)?))
        })
    }

    #[test]
    fn test_parse_fields_with_markers() {
        let markers = MarkerRegistry::side_table();
        let builder = DescriptorBuilder::new(&markers, SETTINGS);
        let (fields, ann) = builder
            .parse_fields("id INT, name VARCHAR, PRIMARY KEY(id), PERIOD FOR SYSTEM_TIME")
            .unwrap();

        assert_eq!(
            fields,
            vec![
                FieldDef::new("id", FieldType::Int),
                FieldDef::new("name", FieldType::Varchar),
            ]
        );
        assert!(ann.period_for_system_time);
        assert_eq!(ann.primary_key, vec!["id"]);
    }

    #[test]
    fn test_empty_field_list() {
        let res = build("", &TableProperties::new());
        assert!(matches!(res, Err(ConnectorError::Validation(_))));

        // Markers alone do not make a field list.
        let res = build("PERIOD FOR SYSTEM_TIME", &TableProperties::new());
        assert!(matches!(res, Err(ConnectorError::Validation(_))));
    }

    #[test]
    fn test_duplicate_field() {
        let res = build("id INT, id BIGINT", &TableProperties::new());
        assert!(matches!(res, Err(ConnectorError::Validation(_))));
    }

    #[test]
    fn test_primary_key_unknown_column() {
        let res = build("id INT, PRIMARY KEY(uid)", &TableProperties::new());
        assert!(matches!(res, Err(ConnectorError::Validation(_))));
    }

    #[test]
    fn test_passthrough_and_named_settings() {
        let props: TableProperties = [
            ("address", "10.0.0.1:9042"),
            ("maxQueueSize", "5"),
            ("parallelism", "2"),
            ("custom.flag", "on"),
        ]
        .into_iter()
        .collect();

        let desc = build("id INT", &props).unwrap();
        assert_eq!(desc.parallelism(), Some(2));
        assert_eq!(desc.raw_params().len(), 1);
        assert_eq!(
            desc.raw_params().get("custom.flag"),
            Some(&PropertyValue::from("on"))
        );
    }

    #[test]
    fn test_uncoercible_setting() {
        let props: TableProperties = [("maxqueuesize", "abc")].into_iter().collect();
        let res = build("id INT", &props);
        assert!(matches!(res, Err(ConnectorError::Validation(_))));
    }

    #[test]
    fn test_empty_table_name() {
        let markers = MarkerRegistry::source();
        let res = DescriptorBuilder::new(&markers, SETTINGS).build(
            " ",
            "id INT",
            &TableProperties::new(),
            |p| Ok(ConnectorKind::CassandraSide(CassandraSideSettings::from_properties(p)?)),
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_raw_params_with_prefix() {
        let props: TableProperties = [
            ("kafka.client.id", PropertyValue::from("c1")),
            ("kafka.retries", PropertyValue::from(3_i64)),
        ]
        .into_iter()
        .collect();
        let desc = build("id INT", &props).unwrap();
        let kafka = desc.raw_params_with_prefix("kafka.");
        assert_eq!(kafka.get("retries"), Some(&"3".to_string()));
        assert_eq!(kafka.get("client.id"), Some(&"c1".to_string()));
    }
}
