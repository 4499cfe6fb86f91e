//! Naming conventions that tie schema names to registry type names.
//!
//! Type lookup is keyed by a dotted identifier derived from the target
//! namespace, followed by the UpperCamelCase form of the element or type name:
//!
//! ```text
//! http://xmlns.opennms.org/xsd/config/vacuumd + VacuumdConfiguration
//!   -> org.opennms.xmlns.xsd.config.vacuumd.VacuumdConfiguration
//! ```

use crate::SchemaError;
use heck::ToPascalCase;
use url::Url;

/// Map a namespace URI to its dotted identifier.
///
/// The host is split on `.` and reversed, non-empty path segments are
/// appended in order, and every `-` becomes `_`.
pub fn namespace_to_identifier(namespace: &str) -> Result<String, SchemaError> {
    let malformed = |reason: String| SchemaError::MalformedNamespace {
        uri: namespace.to_owned(),
        reason,
    };

    let url = Url::parse(namespace).map_err(|e| malformed(e.to_string()))?;
    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| malformed("namespace URI has no host".to_owned()))?;

    let mut segments: Vec<&str> = host.split('.').rev().collect();
    segments.extend(url.path().split('/').filter(|segment| !segment.is_empty()));

    Ok(segments.join(".").replace('-', "_"))
}

/// Convert an XML element or type name to the registry's type-naming convention.
pub fn class_name(xml_name: &str) -> String {
    xml_name.to_pascal_case()
}

/// Join a package identifier and a type name.
pub fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_owned()
    } else {
        format!("{package}.{name}")
    }
}

/// Qualified type name of a schema's top-level element.
pub fn root_type_name(namespace: &str, root_element: &str) -> Result<String, SchemaError> {
    Ok(qualify(
        &namespace_to_identifier(namespace)?,
        &class_name(root_element),
    ))
}
