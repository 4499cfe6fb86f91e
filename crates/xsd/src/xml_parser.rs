//! XML instance documents to [`DynamicEntity`] trees.
//!
//! Binding is by local name only: elements and attributes are matched to
//! descriptor fields regardless of prefix, namespace declarations and
//! `xsi:*` attributes are dropped, and anything the schema does not describe
//! is skipped.

use crate::entity::{DynamicEntity, DynamicValue, Scalar};
use crate::error::ConversionError;
use crate::registry::{FieldType, TypeDescriptor, TypeRegistry, ValueKind};
use crate::xml_tree::{is_namespace_declaration, XmlElement};
use crate::XSI_NAMESPACE;
use std::collections::BTreeMap;
use tracing::debug;

/// Result type for XML binding
pub type ParseResult<T> = std::result::Result<T, ConversionError>;

/// Parser for binding XML documents to registered types
pub struct XmlToEntityParser<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> XmlToEntityParser<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self { registry }
    }

    /// Parse `xml`, whose document element must be `root_element`, as an
    /// instance of `root_type`.
    pub fn parse(
        &self,
        xml: &str,
        root_element: &str,
        root_type: &str,
    ) -> ParseResult<DynamicEntity> {
        let document = XmlElement::parse(xml)?;
        if document.local_name() != root_element {
            return Err(ConversionError::UnexpectedRoot {
                expected: root_element.to_owned(),
                found: document.local_name().to_owned(),
            });
        }

        let descriptor = self.registry.resolve_root_type(root_type)?;
        self.bind(&document, descriptor, &Bindings::default())
    }

    fn bind(
        &self,
        element: &XmlElement,
        descriptor: &TypeDescriptor,
        bindings: &Bindings,
    ) -> ParseResult<DynamicEntity> {
        let bindings = bindings.enter(element);
        let mut entity = DynamicEntity::new(descriptor.qualified_name());

        for (name, text) in &element.attributes {
            if is_namespace_declaration(name) || bindings.is_xsi(name) {
                continue;
            }
            let local = crate::xml_tree::local_part(name);
            match descriptor.attribute(local).map(|f| &f.value_type) {
                Some(FieldType::Simple(kind)) => {
                    if let Some(scalar) = Scalar::parse(*kind, text, local)? {
                        entity.set(local, scalar);
                    }
                }
                _ => debug!(
                    "skipping attribute '{}' not declared by '{}'",
                    name,
                    descriptor.qualified_name()
                ),
            }
        }

        for child in &element.children {
            let local = child.local_name();
            let Some(field) = descriptor.element(local) else {
                debug!(
                    "skipping element '{}' not declared by '{}'",
                    child.name,
                    descriptor.qualified_name()
                );
                continue;
            };

            let value = match &field.value_type {
                FieldType::Simple(kind) => {
                    Scalar::parse(*kind, &child.text, local)?.map(DynamicValue::from)
                }
                FieldType::Complex(type_name) => {
                    let nested = self.registry.descriptor(type_name)?;
                    Some(DynamicValue::from(self.bind(child, nested, &bindings)?))
                }
            };
            let Some(value) = value else {
                continue;
            };

            if field.is_many() {
                entity.push(local, value);
            } else {
                if entity.get(local).is_some() {
                    debug!(
                        "'{}' repeats single-valued element '{}'; keeping the last",
                        descriptor.qualified_name(),
                        local
                    );
                }
                entity.set(local, value);
            }
        }

        match descriptor.value_kind() {
            Some(kind) => {
                let text = if descriptor.is_mixed() {
                    element.text.trim()
                } else {
                    element.text.as_str()
                };
                if !text.is_empty() {
                    entity.set_value(Scalar::parse(kind, text, descriptor.qualified_name())?);
                } else if kind == ValueKind::String && descriptor.is_value_only() {
                    // an empty string is still a value
                    entity.set_value(Some(Scalar::String(String::new())));
                }
            }
            None if !element.text.trim().is_empty() => {
                debug!("ignoring text content of '{}'", element.name);
            }
            None => {}
        }

        Ok(entity)
    }
}

/// Prefix bindings in scope while walking an instance document.
#[derive(Debug, Clone, Default)]
struct Bindings {
    prefixes: BTreeMap<String, String>,
}

impl Bindings {
    fn enter(&self, element: &XmlElement) -> Bindings {
        let mut scope = self.clone();
        for (prefix, uri) in element.namespace_declarations() {
            scope.prefixes.insert(prefix.to_owned(), uri.to_owned());
        }
        scope
    }

    fn is_xsi(&self, attribute: &str) -> bool {
        match attribute.split_once(':') {
            Some((prefix, _)) => {
                prefix == "xsi"
                    || self.prefixes.get(prefix).map(String::as_str) == Some(XSI_NAMESPACE)
            }
            None => false,
        }
    }
}
