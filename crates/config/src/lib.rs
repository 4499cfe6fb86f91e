//! Configuration-kind converters built on `xmlconf-xsd`.
//!
//! A [`ConfigDefinition`] names a schema and a root element. The
//! [`XmlConverter`] built from it converts documents of that kind between
//! XML and root-less JSON, renaming or pruning the `__VALUE__` key on the
//! way out. Built converters are shared through a [`ConverterCache`].
//!
//! ```no_run
//! use xmlconf_config::{ConfigConverter, ConfigDefinition, ConverterCache, DirectorySchemaResolver};
//!
//! let resolver = DirectorySchemaResolver::new("/opt/opennms/share/xsds");
//! let definition = ConfigDefinition::new("vacuumd", "vacuumd-configuration.xsd", "VacuumdConfiguration")
//!     .with_value_name("statement", "sql");
//!
//! let converter = ConverterCache::global().get_or_init(&definition, &resolver)?;
//! let json = converter.xml_to_json("<VacuumdConfiguration period=\"86400000\"/>")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod cache;
mod converter;
mod definition;
mod resolver;
mod value_tag;

pub use cache::ConverterCache;
pub use converter::{ConfigConverter, XmlConverter};
pub use definition::ConfigDefinition;
pub use resolver::{DirectorySchemaResolver, SchemaResolver, StaticSchemaResolver};
pub use value_tag::{remove_empty_value_tags, rename_value_tags};

pub use xmlconf_xsd::{ConversionError, SchemaError, VALUE_TAG};
