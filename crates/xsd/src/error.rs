//! Error taxonomy shared by schema loading and document conversion.
//!
//! [`SchemaError`] is only raised while a conversion context is being built:
//! the configuration wiring is wrong and nothing usable is produced.
//! [`ConversionError`] is raised per call and always carries its cause.

use crate::registry::ValueKind;
use crate::xml_tree::XmlTreeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    /// Zero, or more than one, declared namespace contains the platform marker.
    #[error("schema must declare exactly one namespace containing '{marker}', found {found:?}")]
    AmbiguousNamespace { marker: String, found: Vec<String> },

    #[error("malformed namespace URI '{uri}': {reason}")]
    MalformedNamespace { uri: String, reason: String },

    #[error("XSD parsing error: {0}")]
    Parsing(String),

    #[error("XSD is not well-formed XML: {0}")]
    Xml(#[from] XmlTreeError),

    /// The namespace-derived (or configured) root type is not in the registry.
    #[error("root type '{type_name}' is not declared by the schema")]
    UnknownRootType { type_name: String },

    #[error("type '{type_name}' is not declared by the schema")]
    UnknownType { type_name: String },

    #[error("type '{type_name}' declares field '{field}', which is reserved for text values")]
    ReservedFieldName { type_name: String, field: String },

    #[error("schema resource '{resource}' could not be loaded: {source}")]
    ResourceNotFound {
        resource: String,
        #[source]
        source: std::io::Error,
    },
}

impl SchemaError {
    pub fn parsing(message: impl Into<String>) -> Self {
        Self::Parsing(message.into())
    }

    pub fn unknown_type(type_name: impl Into<String>) -> Self {
        Self::UnknownType {
            type_name: type_name.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("malformed XML document: {0}")]
    Xml(#[from] XmlTreeError),

    #[error("malformed JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected root element '{expected}' but found '{found}'")]
    UnexpectedRoot { expected: String, found: String },

    #[error("invalid {expected} value '{value}' for '{field}'")]
    InvalidValue {
        field: String,
        value: String,
        expected: ValueKind,
    },

    #[error("cannot unmarshal '{field}': {message}")]
    Unmarshal { field: String, message: String },

    #[error("cannot marshal document: {0}")]
    Marshal(#[from] MarshalError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Failure while serializing an entity tree to XML text.
#[derive(Debug, Error)]
pub enum MarshalError {
    #[error(transparent)]
    Write(#[from] quick_xml::Error),

    #[error("output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl ConversionError {
    pub fn unmarshal(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unmarshal {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_value(field: &str, value: &str, expected: ValueKind) -> Self {
        Self::InvalidValue {
            field: field.to_owned(),
            value: value.to_owned(),
            expected,
        }
    }
}
