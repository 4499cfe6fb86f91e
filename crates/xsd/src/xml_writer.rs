//! [`DynamicEntity`] trees back to XML.
//!
//! Output is indented by four spaces and starts with a standalone UTF-8
//! declaration. Attributes come first, then text, then child elements in
//! schema order.
//!
//! When every element of the schema is namespace-qualified, the root carries
//! the schema namespace as its default namespace. Otherwise the namespace is
//! bound to [`NAMESPACE_PREFIX`] and only qualified elements use it, so
//! unqualified local elements stay in no namespace.

use crate::entity::{DynamicEntity, DynamicValue};
use crate::error::{ConversionError, MarshalError};
use crate::registry::{FieldDescriptor, TypeRegistry};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;
use tracing::debug;

/// Prefix bound to the schema namespace for schemas with unqualified elements
pub const NAMESPACE_PREFIX: &str = "ns";

type XmlWriter = Writer<Vec<u8>>;

pub struct EntityXmlWriter<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> EntityXmlWriter<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self { registry }
    }

    /// Serialize `entity` as a document whose root element is `root_element`.
    pub fn write(
        &self,
        entity: &DynamicEntity,
        root_element: &str,
        namespace: Option<&str>,
    ) -> Result<String, ConversionError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
        emit(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))),
        )?;

        match namespace {
            Some(namespace) if self.registry.has_unqualified_elements() => {
                let root = format!("{NAMESPACE_PREFIX}:{root_element}");
                let declaration = format!("xmlns:{NAMESPACE_PREFIX}");
                let context = Some((declaration.as_str(), namespace));
                self.write_entity(&mut writer, entity, &root, context, Some(NAMESPACE_PREFIX))?;
            }
            Some(namespace) => {
                self.write_entity(&mut writer, entity, root_element, Some(("xmlns", namespace)), None)?;
            }
            None => self.write_entity(&mut writer, entity, root_element, None, None)?,
        }

        let xml = String::from_utf8(writer.into_inner()).map_err(MarshalError::from)?;
        Ok(xml)
    }

    fn write_entity(
        &self,
        writer: &mut XmlWriter,
        entity: &DynamicEntity,
        tag: &str,
        declaration: Option<(&str, &str)>,
        prefix: Option<&str>,
    ) -> Result<(), ConversionError> {
        let descriptor = self.registry.descriptor(entity.type_name())?;

        let mut start = BytesStart::new(tag);
        if let Some(declaration) = declaration {
            start.push_attribute(declaration);
        }
        for field in descriptor.attributes() {
            if let Some(scalar) = entity.get(&field.name).and_then(DynamicValue::as_scalar) {
                start.push_attribute((field.name.as_str(), scalar.to_xml_text().as_str()));
            }
        }

        for (field, _) in entity.fields() {
            if descriptor.field(field).is_none() {
                debug!("'{}' has no field '{field}'; not written", descriptor.qualified_name());
            }
        }

        let text = entity.value().map(|value| value.to_xml_text());
        let has_children = descriptor
            .elements()
            .any(|field| entity.get(&field.name).is_some());
        if text.as_deref().map_or(true, str::is_empty) && !has_children {
            return emit(writer, Event::Empty(start));
        }

        emit(writer, Event::Start(start))?;
        if let Some(text) = text.as_deref().filter(|t| !t.is_empty()) {
            emit(writer, Event::Text(BytesText::new(text)))?;
        }
        for field in descriptor.elements() {
            if let Some(value) = entity.get(&field.name) {
                for item in value.items() {
                    self.write_value(writer, field, item, prefix)?;
                }
            }
        }
        emit(writer, Event::End(BytesEnd::new(tag)))
    }

    fn write_value(
        &self,
        writer: &mut XmlWriter,
        field: &FieldDescriptor,
        value: &DynamicValue,
        prefix: Option<&str>,
    ) -> Result<(), ConversionError> {
        let tag = element_tag(field, prefix);
        match value {
            DynamicValue::Entity(entity) => self.write_entity(writer, entity, &tag, None, prefix),
            DynamicValue::Scalar(scalar) => {
                let text = scalar.to_xml_text();
                let start = BytesStart::new(&*tag);
                if text.is_empty() {
                    return emit(writer, Event::Empty(start));
                }
                emit(writer, Event::Start(start))?;
                emit(writer, Event::Text(BytesText::new(&text)))?;
                emit(writer, Event::End(BytesEnd::new(&*tag)))
            }
            DynamicValue::List(items) => {
                for item in items {
                    self.write_value(writer, field, item, prefix)?;
                }
                Ok(())
            }
        }
    }
}

fn element_tag<'f>(field: &'f FieldDescriptor, prefix: Option<&str>) -> Cow<'f, str> {
    match prefix {
        Some(prefix) if field.qualified => Cow::Owned(format!("{prefix}:{}", field.name)),
        _ => Cow::Borrowed(field.name.as_str()),
    }
}

fn emit(writer: &mut XmlWriter, event: Event<'_>) -> Result<(), ConversionError> {
    writer.write_event(event).map_err(MarshalError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Scalar;
    use crate::schema_model::XsdSchema;
    use crate::xml_parser::XmlToEntityParser;
    use pretty_assertions::assert_eq;

    const XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        targetNamespace="http://xmlns.opennms.org/xsd/config/test"
        elementFormDefault="qualified">
      <xs:element name="config">
        <xs:complexType>
          <xs:sequence>
            <xs:element name="name" type="xs:string"/>
            <xs:element name="port" type="xs:int" minOccurs="0" maxOccurs="unbounded"/>
            <xs:element name="statement" minOccurs="0">
              <xs:complexType>
                <xs:simpleContent>
                  <xs:extension base="xs:string">
                    <xs:attribute name="transactional" type="xs:boolean"/>
                  </xs:extension>
                </xs:simpleContent>
              </xs:complexType>
            </xs:element>
          </xs:sequence>
          <xs:attribute name="enabled" type="xs:boolean"/>
        </xs:complexType>
      </xs:element>
    </xs:schema>"#;

    const PKG: &str = "org.opennms.xmlns.xsd.config.test";

    #[test]
    fn test_write_document() {
        let registry = TypeRegistry::build(&XsdSchema::parse(XSD).unwrap(), PKG).unwrap();
        let writer = EntityXmlWriter::new(&registry);

        let mut statement = DynamicEntity::new(format!("{PKG}.Config.Statement"));
        statement.set("transactional", Scalar::Boolean(false));
        statement.set_value(Some(Scalar::String("DELETE FROM t WHERE a < 1".into())));

        let mut config = DynamicEntity::new(format!("{PKG}.Config"));
        config.set("enabled", Scalar::Boolean(true));
        config.push("port", Scalar::Number(162.into()));
        config.push("port", Scalar::Number(161.into()));
        config.set("name", Scalar::String("poller".into()));
        config.set("statement", statement);

        let xml = writer
            .write(&config, "config", Some("http://xmlns.opennms.org/xsd/config/test"))
            .unwrap();

        let expected = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<config xmlns="http://xmlns.opennms.org/xsd/config/test" enabled="true">
    <name>poller</name>
    <port>162</port>
    <port>161</port>
    <statement transactional="false">DELETE FROM t WHERE a &lt; 1</statement>
</config>"#;
        assert_eq!(xml, expected);
    }

    #[test]
    fn test_write_unqualified_elements() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
            xmlns:this="http://xmlns.opennms.org/xsd/config/local"
            targetNamespace="http://xmlns.opennms.org/xsd/config/local">
          <xs:element name="local-config">
            <xs:complexType>
              <xs:sequence>
                <xs:element name="label" type="xs:string"/>
                <xs:element ref="this:note" minOccurs="0"/>
                <xs:element name="entry" form="qualified" minOccurs="0" maxOccurs="unbounded">
                  <xs:complexType>
                    <xs:sequence><xs:element name="value" type="xs:int"/></xs:sequence>
                    <xs:attribute name="key" type="xs:string"/>
                  </xs:complexType>
                </xs:element>
              </xs:sequence>
              <xs:attribute name="period" type="xs:long"/>
            </xs:complexType>
          </xs:element>
          <xs:element name="note" type="xs:string"/>
        </xs:schema>"#;
        let registry = TypeRegistry::build(&XsdSchema::parse(xsd).unwrap(), PKG).unwrap();
        let writer = EntityXmlWriter::new(&registry);

        let mut entry = DynamicEntity::new(format!("{PKG}.LocalConfig.Entry"));
        entry.set("key", Scalar::String("a".into()));
        entry.set("value", Scalar::Number(1.into()));

        let mut config = DynamicEntity::new(format!("{PKG}.LocalConfig"));
        config.set("period", Scalar::Number(5.into()));
        config.set("label", Scalar::String("l".into()));
        config.set("note", Scalar::String("n".into()));
        config.push("entry", entry);

        let xml = writer
            .write(&config, "local-config", Some("http://xmlns.opennms.org/xsd/config/local"))
            .unwrap();

        let expected = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<ns:local-config xmlns:ns="http://xmlns.opennms.org/xsd/config/local" period="5">
    <label>l</label>
    <ns:note>n</ns:note>
    <ns:entry key="a">
        <value>1</value>
    </ns:entry>
</ns:local-config>"#;
        assert_eq!(xml, expected);

        let parsed = XmlToEntityParser::new(&registry)
            .parse(&xml, "local-config", &format!("{PKG}.LocalConfig"))
            .unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_write_empty_root() {
        let registry = TypeRegistry::build(&XsdSchema::parse(XSD).unwrap(), PKG).unwrap();
        let writer = EntityXmlWriter::new(&registry);
        let config = DynamicEntity::new(format!("{PKG}.Config"));

        let xml = writer.write(&config, "config", None).unwrap();
        assert!(xml.ends_with("<config/>"), "{xml}");
    }

    #[test]
    fn test_unknown_entity_type() {
        let registry = TypeRegistry::build(&XsdSchema::parse(XSD).unwrap(), PKG).unwrap();
        let writer = EntityXmlWriter::new(&registry);
        let err = writer
            .write(&DynamicEntity::new("org.example.Nope"), "config", None)
            .unwrap_err();
        assert!(matches!(err, ConversionError::Schema(_)));
    }
}
