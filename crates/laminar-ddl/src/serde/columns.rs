//! Column builders shared by the decoders.
//!
//! Decoders reduce each record to one optional JSON value per declared
//! field (delimited text arrives as strings); this module turns a column
//! of such cells into an Arrow array of the field's type.

use std::sync::Arc;

use arrow_array::builder::{
    BooleanBuilder, Date32Builder, Decimal128Builder, Float32Builder, Float64Builder,
    Int16Builder, Int32Builder, Int64Builder, Int8Builder, StringBuilder,
    TimestampMillisecondBuilder,
};
use arrow_array::ArrayRef;
use arrow_schema::{DataType, Field, TimeUnit};
use serde_json::Value;

use crate::error::SerdeError;

fn non_null(cell: Option<&Value>) -> Option<&Value> {
    match cell {
        None | Some(Value::Null) => None,
        Some(v) => Some(v),
    }
}

fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn conversion_error(field: &Field, expected: &str, got: &Value) -> SerdeError {
    SerdeError::TypeConversion {
        field: field.name().clone(),
        expected: expected.into(),
        message: format!("got {got}"),
    }
}

macro_rules! primitive_column {
    ($builder:expr, $field:expr, $cells:expr, $expected:literal, $convert:expr) => {{
        let mut builder = $builder;
        for cell in $cells {
            match non_null(*cell) {
                Some(v) => {
                    let native = $convert(v).ok_or_else(|| conversion_error($field, $expected, v))?;
                    builder.append_value(native);
                }
                None if $field.is_nullable() => builder.append_null(),
                None => return Err(SerdeError::MissingField($field.name().clone())),
            }
        }
        Ok(Arc::new(builder.finish()) as ArrayRef)
    }};
}

/// Builds one column of `field`'s type from per-record cells.
pub(crate) fn build_column(field: &Field, cells: &[Option<&Value>]) -> Result<ArrayRef, SerdeError> {
    let n = cells.len();
    match field.data_type() {
        DataType::Boolean => {
            primitive_column!(BooleanBuilder::with_capacity(n), field, cells, "Boolean", as_bool)
        }
        DataType::Int8 => primitive_column!(Int8Builder::with_capacity(n), field, cells, "Int8", |v| {
            as_i64(v).and_then(|i| i8::try_from(i).ok())
        }),
        DataType::Int16 => {
            primitive_column!(Int16Builder::with_capacity(n), field, cells, "Int16", |v| {
                as_i64(v).and_then(|i| i16::try_from(i).ok())
            })
        }
        DataType::Int32 => {
            primitive_column!(Int32Builder::with_capacity(n), field, cells, "Int32", |v| {
                as_i64(v).and_then(|i| i32::try_from(i).ok())
            })
        }
        DataType::Int64 => {
            primitive_column!(Int64Builder::with_capacity(n), field, cells, "Int64", as_i64)
        }
        DataType::Float32 => {
            #[allow(clippy::cast_possible_truncation)]
            let narrow = |v: &Value| as_f64(v).map(|f| f as f32);
            primitive_column!(Float32Builder::with_capacity(n), field, cells, "Float32", narrow)
        }
        DataType::Float64 => {
            primitive_column!(Float64Builder::with_capacity(n), field, cells, "Float64", as_f64)
        }
        DataType::Date32 => {
            primitive_column!(Date32Builder::with_capacity(n), field, cells, "Date32", |v| {
                as_i64(v).and_then(|i| i32::try_from(i).ok())
            })
        }
        DataType::Timestamp(TimeUnit::Millisecond, None) => primitive_column!(
            TimestampMillisecondBuilder::with_capacity(n),
            field,
            cells,
            "Timestamp(ms)",
            as_i64
        ),
        DataType::Decimal128(precision, scale) => {
            let scale = *scale;
            let builder = Decimal128Builder::with_capacity(n)
                .with_precision_and_scale(*precision, scale)
                .map_err(|e| SerdeError::UnsupportedType(e.to_string()))?;
            let max = max_unscaled(*precision)?;
            primitive_column!(builder, field, cells, "Decimal128", |v: &Value| {
                match v {
                    Value::Number(num) => parse_decimal(&num.to_string(), scale),
                    Value::String(s) => parse_decimal(s, scale),
                    _ => None,
                }
                .filter(|unscaled: &i128| (-max..=max).contains(unscaled))
            })
        }
        DataType::Utf8 => {
            let mut builder = StringBuilder::with_capacity(n, n * 16);
            for cell in cells {
                match non_null(*cell) {
                    Some(Value::String(s)) => builder.append_value(s),
                    // Coerce non-string values to their JSON text
                    Some(other) => builder.append_value(other.to_string()),
                    None if field.is_nullable() => builder.append_null(),
                    None => return Err(SerdeError::MissingField(field.name().clone())),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        other => Err(SerdeError::UnsupportedType(format!(
            "no decoder for Arrow type {other} (field '{}')",
            field.name()
        ))),
    }
}

/// Largest unscaled value a decimal of `precision` digits can hold.
fn max_unscaled(precision: u8) -> Result<i128, SerdeError> {
    10_i128
        .checked_pow(u32::from(precision))
        .map(|p| p - 1)
        .ok_or_else(|| SerdeError::UnsupportedType(format!("decimal precision {precision}")))
}

/// Parses a plain decimal literal into an unscaled `i128` at `scale`.
///
/// Digits beyond `scale` are accepted only if they are zeros.
fn parse_decimal(text: &str, scale: i8) -> Option<i128> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let scale = usize::try_from(scale).ok()?;
    let (kept, dropped) = frac_part.split_at(frac_part.len().min(scale));
    if dropped.bytes().any(|b| b != b'0') {
        return None;
    }

    let mut value: i128 = 0;
    for b in int_part.bytes().chain(kept.bytes()) {
        value = value.checked_mul(10)?.checked_add(i128::from(b - b'0'))?;
    }
    for _ in kept.len()..scale {
        value = value.checked_mul(10)?;
    }
    Some(if negative { -value } else { value })
}
