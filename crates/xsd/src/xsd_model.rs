//! XSD Model - High-level API for schema-driven document binding
//!
//! This module provides `XsdModel`, a unified interface for:
//! - Loading a schema and selecting its platform namespace
//! - Building the type registry
//! - Binding XML and JSON documents to the schema's root type

use crate::entity::DynamicEntity;
use crate::error::ConversionError;
use crate::json::JsonMarshaller;
use crate::naming::{namespace_to_identifier, root_type_name};
use crate::registry::{TypeDescriptor, TypeRegistry};
use crate::schema_model::XsdSchema;
use crate::xml_parser::XmlToEntityParser;
use crate::xml_writer::EntityXmlWriter;
use crate::{Result, SchemaError};
use serde::Serialize;
use tracing::debug;

/// Substring that identifies the platform's own namespace among those a
/// schema declares.
pub const DEFAULT_NAMESPACE_MARKER: &str = "opennms";

/// A parsed schema together with its platform namespace and root element.
#[derive(Debug, Clone)]
pub struct SchemaDefinition {
    schema: XsdSchema,
    namespace: String,
    root_element: String,
}

impl SchemaDefinition {
    /// Parse `xsd` and select the namespace containing [`DEFAULT_NAMESPACE_MARKER`].
    pub fn load(xsd: &str, root_element: &str) -> Result<Self> {
        Self::load_with_marker(xsd, root_element, DEFAULT_NAMESPACE_MARKER)
    }

    /// Parse `xsd` and select the single declared namespace containing `marker`.
    ///
    /// Declared namespaces are the target namespace plus every `xs:import`.
    pub fn load_with_marker(xsd: &str, root_element: &str, marker: &str) -> Result<Self> {
        let schema = XsdSchema::parse(xsd)?;

        let mut matching: Vec<String> = schema
            .declared_namespaces()
            .into_iter()
            .filter(|namespace| namespace.contains(marker))
            .collect();
        if matching.len() != 1 {
            return Err(SchemaError::AmbiguousNamespace {
                marker: marker.to_owned(),
                found: matching,
            });
        }
        let namespace = matching.remove(0);
        debug!("schema for '{root_element}' uses namespace '{namespace}'");

        Ok(Self {
            schema,
            namespace,
            root_element: root_element.to_owned(),
        })
    }

    pub fn schema(&self) -> &XsdSchema {
        &self.schema
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn root_element(&self) -> &str {
        &self.root_element
    }
}

/// An XSD model containing the parsed schema and its resolved types.
///
/// # Example
///
/// ```no_run
/// use xmlconf_xsd::XsdModel;
///
/// let xsd = std::fs::read_to_string("collectd-configuration.xsd")?;
/// let model = XsdModel::load(xsd, "collectd-configuration")?;
///
/// let root = model.root_type_name().to_owned();
/// let entity = model.parse_xml("<collectd-configuration threads=\"50\"/>", &root)?;
/// assert_eq!(model.write_xml(&entity)?.lines().count(), 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct XsdModel {
    definition: SchemaDefinition,
    registry: TypeRegistry,
    /// Canonical qualified name of the root type
    root_type: String,
}

impl XsdModel {
    /// Build the registry for `definition`.
    ///
    /// The root type is derived from the namespace and root element unless
    /// `root_type` names it explicitly. Either way it must be registered.
    pub fn from_definition(definition: SchemaDefinition, root_type: Option<&str>) -> Result<Self> {
        let package = namespace_to_identifier(definition.namespace())?;
        let registry = TypeRegistry::build(definition.schema(), &package)?;

        let requested = match root_type {
            Some(name) => name.to_owned(),
            None => root_type_name(definition.namespace(), definition.root_element())?,
        };
        let root_type = registry
            .resolve_root_type(&requested)?
            .qualified_name()
            .to_owned();

        debug!(
            "loaded model for '{}' with {} types, root type '{}'",
            definition.root_element(),
            registry.len(),
            root_type
        );

        Ok(Self {
            definition,
            registry,
            root_type,
        })
    }

    /// Load a model from schema text with the default namespace marker.
    pub fn load(xsd: impl AsRef<str>, root_element: &str) -> Result<Self> {
        Self::from_definition(SchemaDefinition::load(xsd.as_ref(), root_element)?, None)
    }

    pub fn definition(&self) -> &SchemaDefinition {
        &self.definition
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn namespace(&self) -> &str {
        self.definition.namespace()
    }

    pub fn root_element(&self) -> &str {
        self.definition.root_element()
    }

    pub fn root_type_name(&self) -> &str {
        &self.root_type
    }

    pub fn resolve_root_type(&self) -> Result<&TypeDescriptor> {
        self.registry.resolve_root_type(&self.root_type)
    }

    /// Bind an XML document to `root_type`.
    pub fn parse_xml(
        &self,
        xml: &str,
        root_type: &str,
    ) -> std::result::Result<DynamicEntity, ConversionError> {
        XmlToEntityParser::new(&self.registry).parse(xml, self.root_element(), root_type)
    }

    /// Write `entity` as a document rooted at the schema's root element.
    pub fn write_xml(
        &self,
        entity: &DynamicEntity,
    ) -> std::result::Result<String, ConversionError> {
        EntityXmlWriter::new(&self.registry).write(
            entity,
            self.root_element(),
            Some(self.namespace()),
        )
    }

    pub fn to_json_value(
        &self,
        entity: &DynamicEntity,
    ) -> std::result::Result<serde_json::Value, ConversionError> {
        JsonMarshaller::new(&self.registry).to_value(entity)
    }

    /// Marshal `entity` to compact JSON text.
    pub fn to_json(&self, entity: &DynamicEntity) -> std::result::Result<String, ConversionError> {
        Ok(serde_json::to_string(&self.to_json_value(entity)?)?)
    }

    /// Unmarshal JSON text as an instance of `root_type`.
    pub fn from_json(
        &self,
        json: &str,
        root_type: &str,
    ) -> std::result::Result<DynamicEntity, ConversionError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        JsonMarshaller::new(&self.registry).from_value(&value, root_type)
    }

    /// Get statistics about the model.
    pub fn stats(&self) -> XsdModelStats {
        let schema = self.definition.schema();
        XsdModelStats {
            namespace: self.namespace().to_owned(),
            root_type: self.root_type.clone(),
            total_complex_types: schema.complex_types.len(),
            total_simple_types: schema.simple_types.len(),
            total_root_elements: schema.root_elements.len(),
            registered_types: self.registry.len(),
            total_fields: self.registry.types().map(|t| t.fields().len()).sum(),
        }
    }
}

/// Statistics about an XSD model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XsdModelStats {
    pub namespace: String,
    pub root_type: String,
    /// Named complex types declared at the top level
    pub total_complex_types: usize,
    pub total_simple_types: usize,
    pub total_root_elements: usize,
    /// Descriptors in the registry, including anonymous nested types
    pub registered_types: usize,
    pub total_fields: usize,
}
