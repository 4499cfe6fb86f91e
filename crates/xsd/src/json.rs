//! JSON binding for [`DynamicEntity`] trees.
//!
//! Keys are the XML attribute and element names. Repeated fields are always
//! arrays and never hold `null` items. Booleans and numbers keep their JSON
//! types. The text value of a type that also has attributes or elements is
//! stored under [`VALUE_TAG`].
//! A type that has nothing but a text value is written as a bare scalar.
//!
//! Reading is lenient: a single value is accepted where an array is
//! expected, `null` means absent, numbers and booleans may be strings, and
//! unknown keys are skipped.

use crate::entity::{DynamicEntity, DynamicValue, Scalar};
use crate::error::ConversionError;
use crate::registry::{FieldDescriptor, FieldType, TypeDescriptor, TypeRegistry};
use serde_json::{Map, Value};
use tracing::debug;

/// JSON key holding the text value of an element that also has attributes
/// or child elements.
pub const VALUE_TAG: &str = "__VALUE__";

pub struct JsonMarshaller<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> JsonMarshaller<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self { registry }
    }

    pub fn to_value(&self, entity: &DynamicEntity) -> Result<Value, ConversionError> {
        let descriptor = self.registry.descriptor(entity.type_name())?;
        if descriptor.is_value_only() {
            return Ok(entity.value().map_or(Value::Null, Scalar::to_json));
        }

        let mut object = Map::new();
        for field in descriptor.fields() {
            let Some(value) = entity.get(&field.name) else {
                continue;
            };
            let json = if field.is_many() {
                let mut items = Vec::new();
                for item in value.items() {
                    let item = self.item_to_value(item)?;
                    if !item.is_null() {
                        items.push(item);
                    }
                }
                if items.is_empty() {
                    continue;
                }
                Value::Array(items)
            } else {
                self.item_to_value(value)?
            };
            if !json.is_null() {
                object.insert(field.name.clone(), json);
            }
        }
        if let Some(value) = entity.value() {
            object.insert(VALUE_TAG.to_owned(), value.to_json());
        }

        Ok(Value::Object(object))
    }

    fn item_to_value(&self, value: &DynamicValue) -> Result<Value, ConversionError> {
        match value {
            DynamicValue::Scalar(scalar) => Ok(scalar.to_json()),
            DynamicValue::Entity(entity) => self.to_value(entity),
            DynamicValue::List(items) => items
                .iter()
                .map(|item| self.item_to_value(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
        }
    }

    /// Build an instance of `type_name` from a JSON tree.
    pub fn from_value(
        &self,
        value: &Value,
        type_name: &str,
    ) -> Result<DynamicEntity, ConversionError> {
        let descriptor = self.registry.descriptor(type_name)?;
        if value.is_null() {
            return Err(ConversionError::unmarshal(
                descriptor.qualified_name(),
                "document is null",
            ));
        }
        self.entity_from_value(value, descriptor)
    }

    fn entity_from_value(
        &self,
        value: &Value,
        descriptor: &TypeDescriptor,
    ) -> Result<DynamicEntity, ConversionError> {
        let mut entity = DynamicEntity::new(descriptor.qualified_name());

        let object = match value {
            Value::Object(object) => object,
            scalar => match descriptor.value_kind() {
                Some(kind) if descriptor.is_value_only() => {
                    entity.set_value(Scalar::from_json(kind, scalar, descriptor.qualified_name())?);
                    return Ok(entity);
                }
                _ => {
                    return Err(ConversionError::unmarshal(
                        descriptor.qualified_name(),
                        format!("expected an object, found {scalar}"),
                    ))
                }
            },
        };

        for (key, item) in object {
            if key == VALUE_TAG {
                match descriptor.value_kind() {
                    Some(kind) => {
                        entity.set_value(Scalar::from_json(kind, item, key)?);
                    }
                    None => debug!(
                        "'{}' has no text value; ignoring '{VALUE_TAG}'",
                        descriptor.qualified_name()
                    ),
                }
                continue;
            }

            let Some(field) = descriptor.field(key) else {
                debug!(
                    "skipping key '{key}' not declared by '{}'",
                    descriptor.qualified_name()
                );
                continue;
            };

            if field.is_many() {
                let items = match item {
                    Value::Array(items) => items.as_slice(),
                    single => std::slice::from_ref(single),
                };
                for item in items {
                    if let Some(value) = self.field_from_value(field, item)? {
                        entity.push(key.as_str(), value);
                    }
                }
            } else {
                let item = match item {
                    Value::Array(items) if items.len() == 1 => &items[0],
                    Value::Array(items) => {
                        return Err(ConversionError::unmarshal(
                            key.as_str(),
                            format!("expected a single value, found {} values", items.len()),
                        ))
                    }
                    single => single,
                };
                if let Some(value) = self.field_from_value(field, item)? {
                    entity.set(key.as_str(), value);
                }
            }
        }

        Ok(entity)
    }

    fn field_from_value(
        &self,
        field: &FieldDescriptor,
        value: &Value,
    ) -> Result<Option<DynamicValue>, ConversionError> {
        if value.is_null() {
            return Ok(None);
        }
        match &field.value_type {
            FieldType::Simple(kind) => {
                Ok(Scalar::from_json(*kind, value, &field.name)?.map(DynamicValue::from))
            }
            FieldType::Complex(type_name) => {
                let nested = self.registry.descriptor(type_name)?;
                Ok(Some(self.entity_from_value(value, nested)?.into()))
            }
        }
    }
}
