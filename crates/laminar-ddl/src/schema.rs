//! Field list parsing and row type derivation.
//!
//! A table definition carries its columns as text, e.g.
//! `id INT, name VARCHAR, price DECIMAL(10, 2), PRIMARY KEY(id)`.
//! This module splits that text into entries, parses column entries into
//! [`FieldDef`]s and converts a field list into an Arrow schema.

use std::str::FromStr;
use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema, SchemaRef, TimeUnit};

use crate::error::ConnectorError;

/// Default precision for `DECIMAL` without parameters.
pub const DEFAULT_DECIMAL_PRECISION: u8 = 38;

/// Default scale for `DECIMAL` without parameters.
pub const DEFAULT_DECIMAL_SCALE: i8 = 18;

/// Semantic type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Variable-length string.
    Varchar,
    /// Boolean.
    Boolean,
    /// 8-bit signed integer.
    TinyInt,
    /// 16-bit signed integer.
    SmallInt,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    BigInt,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Fixed-point decimal.
    Decimal {
        /// Total number of digits.
        precision: u8,
        /// Digits after the decimal point.
        scale: i8,
    },
    /// Calendar date.
    Date,
    /// Timestamp with millisecond precision.
    Timestamp,
}

impl FieldType {
    /// Returns the Arrow data type used for this field.
    #[must_use]
    pub fn to_arrow(&self) -> DataType {
        match self {
            FieldType::Varchar => DataType::Utf8,
            FieldType::Boolean => DataType::Boolean,
            FieldType::TinyInt => DataType::Int8,
            FieldType::SmallInt => DataType::Int16,
            FieldType::Int => DataType::Int32,
            FieldType::BigInt => DataType::Int64,
            FieldType::Float => DataType::Float32,
            FieldType::Double => DataType::Float64,
            FieldType::Decimal { precision, scale } => DataType::Decimal128(*precision, *scale),
            FieldType::Date => DataType::Date32,
            FieldType::Timestamp => DataType::Timestamp(TimeUnit::Millisecond, None),
        }
    }
}

impl FromStr for FieldType {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let (base, params) = match normalized.split_once('(') {
            Some((base, rest)) => {
                let inner = rest.strip_suffix(')').ok_or_else(|| {
                    ConnectorError::Validation(format!("unbalanced parentheses in type '{s}'"))
                })?;
                (base.trim(), Some(inner))
            }
            None => (normalized.as_str(), None),
        };

        match base {
            // Length parameters on character types are accepted and ignored.
            "varchar" | "string" | "char" | "text" => Ok(FieldType::Varchar),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            "tinyint" => Ok(FieldType::TinyInt),
            "smallint" => Ok(FieldType::SmallInt),
            "int" | "integer" => Ok(FieldType::Int),
            "bigint" | "long" => Ok(FieldType::BigInt),
            "float" => Ok(FieldType::Float),
            "double" => Ok(FieldType::Double),
            "date" => Ok(FieldType::Date),
            "timestamp" => Ok(FieldType::Timestamp),
            "decimal" => parse_decimal_params(s, params),
            _ => Err(ConnectorError::Validation(format!(
                "unsupported field type: '{s}'"
            ))),
        }
    }
}

fn parse_decimal_params(raw: &str, params: Option<&str>) -> Result<FieldType, ConnectorError> {
    let invalid = || ConnectorError::Validation(format!("invalid decimal type: '{raw}'"));
    let Some(params) = params else {
        return Ok(FieldType::Decimal {
            precision: DEFAULT_DECIMAL_PRECISION,
            scale: DEFAULT_DECIMAL_SCALE,
        });
    };

    let mut parts = params.split(',').map(str::trim);
    let precision: u8 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(invalid)?;
    let scale: i8 = match parts.next() {
        Some(s) => s.parse().map_err(|_| invalid())?,
        None => 0,
    };
    if parts.next().is_some()
        || precision == 0
        || precision > DEFAULT_DECIMAL_PRECISION
        || scale < 0
        || scale.unsigned_abs() > precision
    {
        return Err(invalid());
    }
    Ok(FieldType::Decimal { precision, scale })
}

/// A declared column: name plus semantic type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Column name as written.
    pub name: String,
    /// Semantic type.
    pub field_type: FieldType,
}

impl FieldDef {
    /// Creates a field definition.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    /// Parses a `name type` column entry.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Validation` if the type is missing or unknown.
    pub fn parse(entry: &str) -> Result<Self, ConnectorError> {
        let entry = entry.trim();
        let (name, type_text) = entry
            .split_once(char::is_whitespace)
            .ok_or_else(|| {
                ConnectorError::Validation(format!("field '{entry}' has no type"))
            })?;
        let name = name.trim_matches('`');
        if name.is_empty() {
            return Err(ConnectorError::Validation(format!(
                "field '{entry}' has no name"
            )));
        }
        let field_type = type_text.parse::<FieldType>()?;
        Ok(Self::new(name, field_type))
    }
}

/// Splits a field list on commas that are not nested in parentheses.
///
/// Empty entries are dropped.
#[must_use]
pub fn split_entries(text: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                entries.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(text[start..].trim());
    entries.retain(|e| !e.is_empty());
    entries
}

/// Checks that a field list is non-empty and its names are unique.
///
/// Names are compared case-insensitively, matching how SQL resolves
/// unquoted identifiers.
///
/// # Errors
///
/// Returns `ConnectorError::Validation` on an empty list or a duplicate name.
pub fn validate_fields(fields: &[FieldDef]) -> Result<(), ConnectorError> {
    if fields.is_empty() {
        return Err(ConnectorError::Validation(
            "table must declare at least one field".into(),
        ));
    }
    let mut seen = std::collections::HashSet::with_capacity(fields.len());
    for field in fields {
        if !seen.insert(field.name.to_lowercase()) {
            return Err(ConnectorError::Validation(format!(
                "duplicate field name: '{}'",
                field.name
            )));
        }
    }
    Ok(())
}

/// Builds the Arrow row type for a field list, in declared order.
#[must_use]
pub fn to_arrow_schema(fields: &[FieldDef]) -> SchemaRef {
    Arc::new(Schema::new(
        fields
            .iter()
            .map(|f| Field::new(&f.name, f.field_type.to_arrow(), true))
            .collect::<Vec<_>>(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_entries_respects_parentheses() {
        let entries = split_entries("id INT, price DECIMAL(10, 2), PRIMARY KEY(id, name),");
        assert_eq!(
            entries,
            vec!["id INT", "price DECIMAL(10, 2)", "PRIMARY KEY(id, name)"]
        );
    }

    #[test]
    fn test_split_entries_empty() {
        assert!(split_entries("").is_empty());
        assert!(split_entries("  ,  ").is_empty());
    }

    #[test]
    fn test_field_type_parsing() {
        assert_eq!("VARCHAR".parse::<FieldType>().unwrap(), FieldType::Varchar);
        assert_eq!("varchar(255)".parse::<FieldType>().unwrap(), FieldType::Varchar);
        assert_eq!("Integer".parse::<FieldType>().unwrap(), FieldType::Int);
        assert_eq!("bigint".parse::<FieldType>().unwrap(), FieldType::BigInt);
        assert_eq!("TIMESTAMP".parse::<FieldType>().unwrap(), FieldType::Timestamp);
        assert_eq!(
            "decimal(10, 2)".parse::<FieldType>().unwrap(),
            FieldType::Decimal {
                precision: 10,
                scale: 2
            }
        );
        assert_eq!(
            "decimal".parse::<FieldType>().unwrap(),
            FieldType::Decimal {
                precision: 38,
                scale: 18
            }
        );
    }

    #[test]
    fn test_field_type_rejects_unknown() {
        assert!(matches!(
            "geometry".parse::<FieldType>(),
            Err(ConnectorError::Validation(_))
        ));
        assert!("decimal(0)".parse::<FieldType>().is_err());
        assert!("decimal(5, 9)".parse::<FieldType>().is_err());
        assert!("decimal(10, 2".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_field_def_parse() {
        let f = FieldDef::parse("  user_id   BIGINT ").unwrap();
        assert_eq!(f.name, "user_id");
        assert_eq!(f.field_type, FieldType::BigInt);

        assert!(FieldDef::parse("user_id").is_err());
    }

    #[test]
    fn test_validate_fields() {
        assert!(validate_fields(&[]).is_err());

        let dup = vec![
            FieldDef::new("id", FieldType::Int),
            FieldDef::new("ID", FieldType::BigInt),
        ];
        assert!(matches!(
            validate_fields(&dup),
            Err(ConnectorError::Validation(_))
        ));

        let ok = vec![
            FieldDef::new("id", FieldType::Int),
            FieldDef::new("name", FieldType::Varchar),
        ];
        assert!(validate_fields(&ok).is_ok());
    }

    #[test]
    fn test_to_arrow_schema_keeps_order() {
        let fields = vec![
            FieldDef::new("b", FieldType::Varchar),
            FieldDef::new("a", FieldType::Double),
        ];
        let schema = to_arrow_schema(&fields);
        assert_eq!(schema.field(0).name(), "b");
        assert_eq!(schema.field(1).name(), "a");
        assert_eq!(schema.field(1).data_type(), &DataType::Float64);
    }
}
