//! XML <-> JSON conversion for one configuration kind.

use crate::definition::ConfigDefinition;
use crate::resolver::SchemaResolver;
use crate::value_tag::{remove_empty_value_tags, rename_value_tags};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};
use xmlconf_xsd::{ConversionError, SchemaDefinition, SchemaError, XsdModel, VALUE_TAG};

/// Converts documents of one configuration kind between XML and JSON.
pub trait ConfigConverter: Send + Sync {
    /// Convert an XML document to root-less JSON.
    fn xml_to_json(&self, xml: &str) -> Result<String, ConversionError>;

    /// Convert root-less JSON back to a complete XML document.
    fn json_to_xml(&self, json: &str) -> Result<String, ConversionError>;
}

/// Schema-driven converter; immutable once built.
#[derive(Debug)]
pub struct XmlConverter {
    model: XsdModel,
    value_names: BTreeMap<String, String>,
}

impl XmlConverter {
    /// Load the definition's schema through `resolver` and build the converter.
    pub fn new(
        definition: &ConfigDefinition,
        resolver: &dyn SchemaResolver,
    ) -> Result<Self, SchemaError> {
        let xsd = resolver.load(&definition.schema)?;
        Self::from_schema(definition, &xsd)
    }

    /// Build the converter from schema text already in hand.
    pub fn from_schema(definition: &ConfigDefinition, xsd: &str) -> Result<Self, SchemaError> {
        let schema =
            SchemaDefinition::load_with_marker(xsd, &definition.root_element, definition.marker())?;
        let model = XsdModel::from_definition(schema, definition.root_type.as_deref())?;

        info!(
            "built converter '{}': namespace {}, root type {}, {} types",
            definition.name,
            model.namespace(),
            model.root_type_name(),
            model.registry().len()
        );

        Ok(Self {
            model,
            value_names: definition.value_names.clone(),
        })
    }

    pub fn model(&self) -> &XsdModel {
        &self.model
    }

    pub fn value_names(&self) -> &BTreeMap<String, String> {
        &self.value_names
    }

    pub fn root_element(&self) -> &str {
        self.model.root_element()
    }
}

impl ConfigConverter for XmlConverter {
    fn xml_to_json(&self, xml: &str) -> Result<String, ConversionError> {
        let entity = self.model.parse_xml(xml, self.model.root_type_name())?;
        let json = self.model.to_json(&entity)?;

        if !json.contains(VALUE_TAG) {
            return Ok(json);
        }

        let mut tree: Value = serde_json::from_str(&json)?;
        if !self.value_names.is_empty() {
            rename_value_tags(&mut tree, &self.value_names);
        }
        remove_empty_value_tags(&mut tree);
        debug!("post-processed '{VALUE_TAG}' keys for '{}'", self.root_element());

        Ok(serde_json::to_string(&tree)?)
    }

    fn json_to_xml(&self, json: &str) -> Result<String, ConversionError> {
        let entity = self.model.from_json(json, self.model.root_type_name())?;
        self.model.write_xml(&entity)
    }
}
