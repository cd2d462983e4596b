//! Table option types.
//!
//! Provides the loosely typed input model for table definitions:
//! - [`PropertyValue`]: A scalar option value as written in DDL
//! - [`TableProperties`]: Lowercase-keyed option map with coercing getters
//! - [`ConfigKeySpec`]: Specification for a named setting of a connector

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ConnectorError;

/// A scalar option value from a `WITH (...)` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// A string literal.
    String(String),
    /// An integer literal.
    Integer(i64),
    /// A floating point literal.
    Float(f64),
    /// A boolean literal.
    Boolean(bool),
}

impl PropertyValue {
    /// Renders the value as a string.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "{s}"),
            PropertyValue::Integer(i) => write!(f, "{i}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

/// Options of a table definition.
///
/// Keys are normalized to lowercase on insertion, so lookups by the
/// lowercase setting name always succeed regardless of how the DDL
/// spelled the key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableProperties {
    properties: BTreeMap<String, PropertyValue>,
}

impl TableProperties {
    /// Creates an empty property map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a property, lowercasing the key.
    pub fn set(&mut self, key: impl AsRef<str>, value: impl Into<PropertyValue>) {
        self.properties
            .insert(key.as_ref().to_lowercase(), value.into());
    }

    /// Gets a raw property value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Returns `true` if the key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Gets a property rendered as a string.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(PropertyValue::render)
    }

    /// Gets a property coerced to an integer type.
    ///
    /// Accepts integer values, integral floats and numeric strings.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Validation` if the value is not numeric or
    /// does not fit in `T`.
    pub fn get_integer<T>(&self, key: &str) -> Result<Option<T>, ConnectorError>
    where
        T: TryFrom<i64>,
    {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let wide = match value {
            PropertyValue::Integer(i) => *i,
            // i64::MAX rounds up to 2^63 as f64, so the upper bound is exclusive
            #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
            PropertyValue::Float(v)
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 =>
            {
                *v as i64
            }
            PropertyValue::String(s) => s.trim().parse::<i64>().map_err(|e| {
                ConnectorError::Validation(format!("invalid integer for '{key}': '{s}' ({e})"))
            })?,
            other => {
                return Err(ConnectorError::Validation(format!(
                    "invalid integer for '{key}': '{other}'"
                )))
            }
        };
        T::try_from(wide).map(Some).map_err(|_| {
            ConnectorError::Validation(format!("value for '{key}' out of range: {wide}"))
        })
    }

    /// Gets a property coerced to a boolean.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Validation` for anything other than a
    /// boolean or the strings `true`/`false`.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConnectorError> {
        match self.get(key) {
            None => Ok(None),
            Some(PropertyValue::Boolean(b)) => Ok(Some(*b)),
            Some(PropertyValue::String(s)) if s.trim().eq_ignore_ascii_case("true") => {
                Ok(Some(true))
            }
            Some(PropertyValue::String(s)) if s.trim().eq_ignore_ascii_case("false") => {
                Ok(Some(false))
            }
            Some(other) => Err(ConnectorError::Validation(format!(
                "invalid boolean for '{key}': '{other}'"
            ))),
        }
    }

    /// Returns all properties.
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }

    /// Returns properties with a given prefix, with the prefix stripped.
    #[must_use]
    pub fn properties_with_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        self.properties
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(prefix)
                    .map(|stripped| (stripped.to_string(), v.render()))
            })
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for TableProperties
where
    K: AsRef<str>,
    V: Into<PropertyValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Self::new();
        for (k, v) in iter {
            props.set(k, v);
        }
        props
    }
}

/// Expected type of a named setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    /// Rendered as a string.
    String,
    /// Coerced to an integer.
    Integer,
    /// Coerced to a boolean.
    Boolean,
}

/// Specification for a named setting.
///
/// Connector subtypes declare their settings so the descriptor builder
/// can tell recognized keys from passthrough ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigKeySpec {
    /// The lowercase configuration key.
    pub key: &'static str,

    /// Human-readable description.
    pub description: &'static str,

    /// Expected value type.
    pub kind: SettingKind,
}

impl ConfigKeySpec {
    /// Creates a string setting spec.
    #[must_use]
    pub const fn string(key: &'static str, description: &'static str) -> Self {
        Self {
            key,
            description,
            kind: SettingKind::String,
        }
    }

    /// Creates an integer setting spec.
    #[must_use]
    pub const fn integer(key: &'static str, description: &'static str) -> Self {
        Self {
            key,
            description,
            kind: SettingKind::Integer,
        }
    }

    /// Creates a boolean setting spec.
    #[must_use]
    pub const fn boolean(key: &'static str, description: &'static str) -> Self {
        Self {
            key,
            description,
            kind: SettingKind::Boolean,
        }
    }

    /// Checks that the value in `props`, if any, coerces to the declared kind.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Validation` if coercion fails.
    pub fn check(&self, props: &TableProperties) -> Result<(), ConnectorError> {
        match self.kind {
            SettingKind::String => Ok(()),
            SettingKind::Integer => props.get_integer::<i64>(self.key).map(|_| ()),
            SettingKind::Boolean => props.get_bool(self.key).map(|_| ()),
        }
    }
}

/// Common header key for operator parallelism.
pub const PARALLELISM_KEY: &str = "parallelism";

/// Reads the common parallelism setting.
///
/// # Errors
///
/// Returns `ConnectorError::Validation` if the value is not a positive integer.
pub fn parallelism(props: &TableProperties) -> Result<Option<u32>, ConnectorError> {
    match props.get_integer::<u32>(PARALLELISM_KEY)? {
        Some(0) => Err(ConnectorError::Validation(
            "parallelism must be > 0".into(),
        )),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_lowercased() {
        let mut props = TableProperties::new();
        props.set("sourceDataType", "json");
        props.set("TOPIC", "clicks");

        assert_eq!(props.get_string("sourcedatatype"), Some("json".into()));
        assert_eq!(props.get_string("topic"), Some("clicks".into()));
        assert!(props.get("sourceDataType").is_none());
    }

    #[test]
    fn test_integer_coercion() {
        let props: TableProperties = [
            ("a", PropertyValue::from("5")),
            ("b", PropertyValue::from(7_i64)),
            ("c", PropertyValue::from(" 12 ")),
            ("d", PropertyValue::from(3.0)),
        ]
        .into_iter()
        .collect();

        assert_eq!(props.get_integer::<i32>("a").unwrap(), Some(5));
        assert_eq!(props.get_integer::<i32>("b").unwrap(), Some(7));
        assert_eq!(props.get_integer::<i32>("c").unwrap(), Some(12));
        assert_eq!(props.get_integer::<i32>("d").unwrap(), Some(3));
        assert_eq!(props.get_integer::<i32>("missing").unwrap(), None);
    }

    #[test]
    fn test_integer_coercion_rejects_garbage() {
        let props: TableProperties = [
            ("a", PropertyValue::from("abc")),
            ("b", PropertyValue::from(1.5)),
            ("c", PropertyValue::from(true)),
            ("d", PropertyValue::from(-1_i64)),
        ]
        .into_iter()
        .collect();

        assert!(matches!(
            props.get_integer::<i32>("a"),
            Err(ConnectorError::Validation(_))
        ));
        assert!(props.get_integer::<i32>("b").is_err());
        assert!(props.get_integer::<i32>("c").is_err());
        // Negative values do not fit unsigned settings.
        assert!(props.get_integer::<u32>("d").is_err());
    }

    #[test]
    fn test_integer_coercion_rejects_out_of_range_floats() {
        let props: TableProperties = [
            ("huge", PropertyValue::from(1e30)),
            ("tiny", PropertyValue::from(-1e30)),
            ("edge", PropertyValue::from(9_223_372_036_854_775_808.0)),
            ("whole", PropertyValue::from(4096.0)),
        ]
        .into_iter()
        .collect();

        for key in ["huge", "tiny", "edge"] {
            assert!(
                matches!(props.get_integer::<i64>(key), Err(ConnectorError::Validation(_))),
                "{key} should not coerce"
            );
        }
        assert!(props.get_integer::<u64>("huge").is_err());
        assert_eq!(props.get_integer::<u64>("whole").unwrap(), Some(4096));
    }

    #[test]
    fn test_bool_coercion() {
        let props: TableProperties = [
            ("a", PropertyValue::from("TRUE")),
            ("b", PropertyValue::from(false)),
            ("c", PropertyValue::from("yes")),
        ]
        .into_iter()
        .collect();

        assert_eq!(props.get_bool("a").unwrap(), Some(true));
        assert_eq!(props.get_bool("b").unwrap(), Some(false));
        assert!(props.get_bool("c").is_err());
        assert_eq!(props.get_bool("missing").unwrap(), None);
    }

    #[test]
    fn test_string_rendering() {
        let props: TableProperties = [("port", PropertyValue::from(9042_i64))]
            .into_iter()
            .collect();
        assert_eq!(props.get_string("port"), Some("9042".into()));
    }

    #[test]
    fn test_prefix_extraction() {
        let props: TableProperties = [
            ("kafka.session.timeout.ms", "30000"),
            ("kafka.client.id", "laminar"),
            ("topic", "events"),
        ]
        .into_iter()
        .collect();

        let kafka = props.properties_with_prefix("kafka.");
        assert_eq!(kafka.len(), 2);
        assert_eq!(kafka.get("client.id"), Some(&"laminar".to_string()));
    }

    #[test]
    fn test_key_spec_check() {
        let props: TableProperties = [("maxqueuesize", "lots")].into_iter().collect();
        let spec = ConfigKeySpec::integer("maxqueuesize", "Max queue size");
        assert!(spec.check(&props).is_err());

        let spec = ConfigKeySpec::string("maxqueuesize", "Anything goes");
        assert!(spec.check(&props).is_ok());
    }

    #[test]
    fn test_parallelism() {
        let props: TableProperties = [("parallelism", "4")].into_iter().collect();
        assert_eq!(parallelism(&props).unwrap(), Some(4));

        let props: TableProperties = [("parallelism", "0")].into_iter().collect();
        assert!(parallelism(&props).is_err());

        assert_eq!(parallelism(&TableProperties::new()).unwrap(), None);
    }
}
