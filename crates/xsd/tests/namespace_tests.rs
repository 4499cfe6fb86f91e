//! Namespace selection and schema construction failures
//!
//! Only one declared namespace may contain the platform marker; everything
//! else about the wiring must be right before a model is handed out.

use xmlconf_xsd::{
    namespace_to_identifier, SchemaDefinition, SchemaError, XsdModel, DEFAULT_NAMESPACE_MARKER,
};

fn schema_with(target: &str, imports: &[&str]) -> String {
    let imports: String = imports
        .iter()
        .map(|ns| format!(r#"<xs:import namespace="{ns}"/>"#))
        .collect();
    format!(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="{target}">
            {imports}
            <xs:element name="poll-outages">
              <xs:complexType>
                <xs:attribute name="name" type="xs:string"/>
              </xs:complexType>
            </xs:element>
          </xs:schema>"#
    )
}

#[test]
fn test_single_marker_namespace_is_selected() {
    let xsd = schema_with(
        "http://xmlns.opennms.org/xsd/config/poll-outages",
        &["http://www.w3.org/XML/1998/namespace"],
    );
    let model = XsdModel::load(&xsd, "poll-outages").unwrap();

    assert_eq!(
        model.namespace(),
        "http://xmlns.opennms.org/xsd/config/poll-outages"
    );
    assert_eq!(
        model.root_type_name(),
        "org.opennms.xmlns.xsd.config.poll_outages.PollOutages"
    );
}

#[test]
fn test_marker_namespace_may_come_from_an_import() {
    let xsd = schema_with(
        "http://example.com/wrapper",
        &["http://xmlns.opennms.org/xsd/types"],
    );
    let definition = SchemaDefinition::load(&xsd, "poll-outages").unwrap();
    assert_eq!(definition.namespace(), "http://xmlns.opennms.org/xsd/types");

    // types are qualified under the selected namespace
    let model = XsdModel::from_definition(definition, None).unwrap();
    assert_eq!(
        model.root_type_name(),
        "org.opennms.xmlns.xsd.types.PollOutages"
    );
}

#[test]
fn test_no_marker_namespace_fails() {
    let xsd = schema_with("http://example.com/config", &[]);
    let err = XsdModel::load(&xsd, "poll-outages").unwrap_err();
    match err {
        SchemaError::AmbiguousNamespace { marker, found } => {
            assert_eq!(marker, DEFAULT_NAMESPACE_MARKER);
            assert!(found.is_empty());
        }
        other => panic!("expected AmbiguousNamespace, got {other}"),
    }
}

#[test]
fn test_two_marker_namespaces_fail() {
    let xsd = schema_with(
        "http://xmlns.opennms.org/xsd/config/poll-outages",
        &["http://xmlns.opennms.org/xsd/types"],
    );
    let err = XsdModel::load(&xsd, "poll-outages").unwrap_err();
    match err {
        SchemaError::AmbiguousNamespace { found, .. } => assert_eq!(
            found,
            vec![
                "http://xmlns.opennms.org/xsd/config/poll-outages".to_string(),
                "http://xmlns.opennms.org/xsd/types".to_string(),
            ]
        ),
        other => panic!("expected AmbiguousNamespace, got {other}"),
    }
}

#[test]
fn test_duplicate_declarations_count_once() {
    let xsd = schema_with(
        "http://xmlns.opennms.org/xsd/config/poll-outages",
        &["http://xmlns.opennms.org/xsd/config/poll-outages"],
    );
    assert!(XsdModel::load(&xsd, "poll-outages").is_ok());
}

#[test]
fn test_custom_marker() {
    let xsd = schema_with("http://config.example.com/ns/poll-outages", &[]);
    let definition = SchemaDefinition::load_with_marker(&xsd, "poll-outages", "example").unwrap();
    let model = XsdModel::from_definition(definition, None).unwrap();
    assert_eq!(
        model.root_type_name(),
        "com.example.config.ns.poll_outages.PollOutages"
    );
}

#[test]
fn test_malformed_marker_namespace() {
    let xsd = schema_with("urn:opennms:config", &[]);
    let err = XsdModel::load(&xsd, "poll-outages").unwrap_err();
    assert!(matches!(err, SchemaError::MalformedNamespace { .. }), "{err}");
}

#[test]
fn test_unparsable_schema() {
    assert!(matches!(
        XsdModel::load("<xs:schema xmlns:xs=\"http://www.w3.org/2001/XMLSchema\">", "a"),
        Err(SchemaError::Xml(_))
    ));
    assert!(matches!(
        XsdModel::load("<config/>", "config"),
        Err(SchemaError::Parsing(_))
    ));
}

#[test]
fn test_identifier_examples() {
    assert_eq!(
        namespace_to_identifier("http://xmlns.opennms.org/xsd/config/vacuumd").unwrap(),
        "org.opennms.xmlns.xsd.config.vacuumd"
    );
    assert_eq!(
        namespace_to_identifier("http://xmlns.opennms.org/xsd/config/snmp-thresholds/").unwrap(),
        "org.opennms.xmlns.xsd.config.snmp_thresholds"
    );
}
