//! Schema-agnostic document tree.
//!
//! A [`DynamicEntity`] is one instance of a registered complex type. Field
//! values are keyed by their XML name; the registry decides order, arity and
//! value kinds when the tree is written out again.

use crate::error::ConversionError;
use crate::registry::ValueKind;
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// A typed simple value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Boolean(bool),
    Number(Number),
}

impl Scalar {
    /// Parse XML text into a scalar of the given kind.
    ///
    /// Blank text for a non-string kind means the value is absent. Numbers a
    /// JSON number cannot hold exactly are kept as their lexical text.
    pub fn parse(kind: ValueKind, text: &str, field: &str) -> Result<Option<Self>, ConversionError> {
        if kind == ValueKind::String {
            return Ok(Some(Scalar::String(text.to_owned())));
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let invalid = || ConversionError::invalid_value(field, text, kind);
        let scalar = match kind {
            ValueKind::Boolean => match trimmed {
                "true" | "1" => Scalar::Boolean(true),
                "false" | "0" => Scalar::Boolean(false),
                _ => return Err(invalid()),
            },
            ValueKind::Integer => match parse_integer(trimmed) {
                Some(number) => Scalar::Number(number),
                None if is_integer_lexical(trimmed) => Scalar::String(trimmed.to_owned()),
                None => return Err(invalid()),
            },
            ValueKind::Decimal => match parse_integer(trimmed) {
                Some(number) => Scalar::Number(number),
                None => parse_decimal(trimmed).ok_or_else(invalid)?,
            },
            ValueKind::String => Scalar::String(text.to_owned()),
        };
        Ok(Some(scalar))
    }

    /// Read a JSON scalar leniently: numbers and booleans may arrive as strings.
    pub fn from_json(kind: ValueKind, value: &Value, field: &str) -> Result<Option<Self>, ConversionError> {
        match value {
            Value::Null => Ok(None),
            Value::String(text) => Self::parse(kind, text, field),
            Value::Bool(flag) => match kind {
                ValueKind::Boolean => Ok(Some(Scalar::Boolean(*flag))),
                ValueKind::String => Ok(Some(Scalar::String(flag.to_string()))),
                _ => Err(ConversionError::invalid_value(field, &flag.to_string(), kind)),
            },
            Value::Number(number) => match kind {
                ValueKind::Decimal => Ok(Some(Scalar::Number(number.clone()))),
                ValueKind::Integer if number.is_i64() || number.is_u64() => {
                    Ok(Some(Scalar::Number(number.clone())))
                }
                ValueKind::String => Ok(Some(Scalar::String(number.to_string()))),
                _ => Err(ConversionError::invalid_value(field, &number.to_string(), kind)),
            },
            Value::Array(_) | Value::Object(_) => Err(ConversionError::unmarshal(
                field,
                format!("expected a {kind} value, found {value}"),
            )),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Scalar::String(text) => Value::String(text.clone()),
            Scalar::Boolean(flag) => Value::Bool(*flag),
            Scalar::Number(number) => Value::Number(number.clone()),
        }
    }

    /// Lexical form used for attribute values and element text.
    pub fn to_xml_text(&self) -> String {
        match self {
            Scalar::String(text) => text.clone(),
            Scalar::Boolean(flag) => flag.to_string(),
            Scalar::Number(number) => number.to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(text) => Some(text),
            _ => None,
        }
    }
}

fn parse_integer(text: &str) -> Option<Number> {
    let text = text.strip_prefix('+').unwrap_or(text);
    text.parse::<i64>()
        .map(Number::from)
        .or_else(|_| text.parse::<u64>().map(Number::from))
        .ok()
}

/// Significant digits an `f64` always reproduces exactly
const F64_EXACT_DIGITS: usize = 15;

fn is_integer_lexical(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Count the significant digits of a decimal literal, or `None` if `text`
/// is not one.
fn significant_digits(text: &str) -> Option<usize> {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, Some(exponent)),
        None => (unsigned, None),
    };
    if let Some(exponent) = exponent {
        if !is_integer_lexical(exponent) {
            return None;
        }
    }

    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let digits = format!("{whole}{fraction}");
    Some(digits.trim_start_matches('0').trim_end_matches('0').len())
}

fn parse_decimal(text: &str) -> Option<Scalar> {
    let digits = significant_digits(text)?;
    if digits <= F64_EXACT_DIGITS {
        if let Some(number) = text.parse::<f64>().ok().and_then(Number::from_f64) {
            return Some(Scalar::Number(number));
        }
    }
    Some(Scalar::String(text.to_owned()))
}

#[derive(Debug, Clone, PartialEq)]
pub enum DynamicValue {
    Scalar(Scalar),
    /// Values of a repeated field, in document order
    List(Vec<DynamicValue>),
    Entity(DynamicEntity),
}

impl DynamicValue {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            DynamicValue::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&DynamicEntity> {
        match self {
            DynamicValue::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    /// Repeated values as a slice; a single value is a one-element slice.
    pub fn items(&self) -> &[DynamicValue] {
        match self {
            DynamicValue::List(items) => items,
            single => std::slice::from_ref(single),
        }
    }
}

impl From<Scalar> for DynamicValue {
    fn from(scalar: Scalar) -> Self {
        DynamicValue::Scalar(scalar)
    }
}

impl From<DynamicEntity> for DynamicValue {
    fn from(entity: DynamicEntity) -> Self {
        DynamicValue::Entity(entity)
    }
}

/// Instance of one registered complex type.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicEntity {
    type_name: String,
    fields: BTreeMap<String, DynamicValue>,
    value: Option<Scalar>,
}

impl DynamicEntity {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
            value: None,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, field: &str) -> Option<&DynamicValue> {
        self.fields.get(field)
    }

    /// Set a single-valued field, replacing any previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<DynamicValue>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Append to a repeated field.
    pub fn push(&mut self, field: impl Into<String>, value: impl Into<DynamicValue>) {
        let value = value.into();
        match self.fields.entry(field.into()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(DynamicValue::List(vec![value]));
            }
            std::collections::btree_map::Entry::Occupied(mut slot) => match slot.get_mut() {
                DynamicValue::List(items) => items.push(value),
                single => {
                    let previous = std::mem::replace(single, DynamicValue::List(Vec::new()));
                    *single = DynamicValue::List(vec![previous, value]);
                }
            },
        }
    }

    pub fn remove(&mut self, field: &str) -> Option<DynamicValue> {
        self.fields.remove(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &DynamicValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Text value of a simple-content or mixed type.
    pub fn value(&self) -> Option<&Scalar> {
        self.value.as_ref()
    }

    pub fn set_value(&mut self, value: Option<Scalar>) {
        self.value = value;
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.value.is_none()
    }
}
