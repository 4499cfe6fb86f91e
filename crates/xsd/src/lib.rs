//! # xmlconf-xsd
//!
//! Runtime XSD type model for schema-driven XML <-> JSON transcoding.
//!
//! This crate builds a structural model of a configuration schema at runtime,
//! without generating code per schema. Documents are bound to a generic
//! [`DynamicEntity`] tree that the registry describes, and the same tree can be
//! written back out as XML or marshalled to JSON.
//!
//! ## Architecture
//!
//! 1. **Load XSD** - [`SchemaDefinition`] keeps the schema text, its single
//!    platform namespace and the declared root element
//! 2. **Extract Types** - [`XsdSchema`] parses the raw schema components
//! 3. **Build Registry** - [`TypeRegistry`] derives a descriptor for every
//!    complex type, keyed by qualified name
//! 4. **Bind Documents** - XML and JSON are read into and written from
//!    [`DynamicEntity`] trees
//!
//! ## Usage
//!
//! ```no_run
//! use xmlconf_xsd::XsdModel;
//!
//! let xsd = std::fs::read_to_string("vacuumd-configuration.xsd")?;
//! let model = XsdModel::load(xsd, "VacuumdConfiguration")?;
//! let root = model.resolve_root_type()?.qualified_name().to_owned();
//!
//! let entity = model.parse_xml("<VacuumdConfiguration period=\"86400000\"/>", &root)?;
//! let json = model.to_json(&entity)?;
//! println!("{json}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod entity;
pub mod error;
pub mod json;
pub mod naming;
pub mod registry;
pub mod schema_model;
pub mod xml_parser;
pub mod xml_tree;
pub mod xml_writer;
pub mod xsd_model;

pub use entity::{DynamicEntity, DynamicValue, Scalar};
pub use error::{ConversionError, MarshalError, SchemaError};
pub use json::{JsonMarshaller, VALUE_TAG};
pub use naming::{class_name, namespace_to_identifier, root_type_name};
pub use registry::{
    FieldDescriptor, FieldType, NodeKind, Occurrence, TypeDescriptor, TypeRegistry, ValueKind,
};
pub use schema_model::XsdSchema;
pub use xml_parser::XmlToEntityParser;
pub use xml_writer::EntityXmlWriter;
pub use xsd_model::{SchemaDefinition, XsdModel, XsdModelStats, DEFAULT_NAMESPACE_MARKER};

/// The XML Schema namespace.
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// The XML Schema instance namespace.
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

pub type Result<T> = std::result::Result<T, SchemaError>;
