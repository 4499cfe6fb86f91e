//! Per-kind configuration definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use xmlconf_xsd::DEFAULT_NAMESPACE_MARKER;

/// Everything needed to build the converter for one configuration kind.
///
/// ```toml
/// [[kinds]]
/// name = "vacuumd"
/// schema = "vacuumd-configuration.xsd"
/// root_element = "VacuumdConfiguration"
///
/// [kinds.value_names]
/// statement = "sql"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDefinition {
    /// Kind name, used as the cache key
    pub name: String,
    /// Schema resource identifier, resolved by a [`crate::SchemaResolver`]
    pub schema: String,
    pub root_element: String,
    /// Explicit qualified root type; derived from the namespace when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_marker: Option<String>,
    /// Element name -> JSON key replacing `__VALUE__` for that element
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub value_names: BTreeMap<String, String>,
}

impl ConfigDefinition {
    pub fn new(
        name: impl Into<String>,
        schema: impl Into<String>,
        root_element: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            root_element: root_element.into(),
            root_type: None,
            namespace_marker: None,
            value_names: BTreeMap::new(),
        }
    }

    pub fn with_root_type(mut self, root_type: impl Into<String>) -> Self {
        self.root_type = Some(root_type.into());
        self
    }

    pub fn with_namespace_marker(mut self, marker: impl Into<String>) -> Self {
        self.namespace_marker = Some(marker.into());
        self
    }

    pub fn with_value_name(mut self, element: impl Into<String>, key: impl Into<String>) -> Self {
        self.value_names.insert(element.into(), key.into());
        self
    }

    pub fn marker(&self) -> &str {
        self.namespace_marker
            .as_deref()
            .unwrap_or(DEFAULT_NAMESPACE_MARKER)
    }
}
