//! Converter behaviour against a collector-style configuration schema

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use xmlconf_config::{
    ConfigConverter, ConfigDefinition, ConversionError, ConverterCache, DirectorySchemaResolver,
    SchemaError, XmlConverter,
};

const SCHEMA: &str = "collector-configuration.xsd";
const ROOT: &str = "collector-configuration";

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture(name: &str) -> String {
    let path = fixtures().join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {path:?}: {e}"))
}

fn resolver() -> DirectorySchemaResolver {
    DirectorySchemaResolver::new(fixtures())
}

fn definition() -> ConfigDefinition {
    ConfigDefinition::new("collector", SCHEMA, ROOT)
}

fn converter(definition: &ConfigDefinition) -> XmlConverter {
    XmlConverter::new(definition, &resolver()).expect("collector schema should load")
}

fn parse(json: &str) -> Value {
    serde_json::from_str(json).unwrap()
}

// ============================================================================
// XML -> JSON
// ============================================================================

#[test]
fn test_xml_to_json_with_value_names() {
    let definition = definition()
        .with_value_name("parameter", "value")
        .with_value_name("description", "text");
    let converter = converter(&definition);

    let json = converter
        .xml_to_json(&fixture("collector-configuration.xml"))
        .unwrap();

    assert_eq!(
        parse(&json),
        json!({
            "threads": 50,
            "enabled": false,
            "description": {"lang": "en", "text": "SNMP collection"},
            "parameter": [
                {"key": "retry", "value": "3"},
                {"key": "comment"}
            ],
            "package": [{
                "name": "main",
                "filter": "IPADDR != '0.0.0.0'",
                "interval": 300000,
                "ratio": 0.75,
                "include-range": [{"begin": "10.0.0.1", "end": "10.0.0.254"}],
                "exclude-range": [{"begin": "10.0.0.100", "end": "10.0.0.110"}]
            }]
        })
    );
    assert!(!json.contains("__VALUE__"), "{json}");
}

#[test]
fn test_xml_to_json_keeps_value_tag_without_names() {
    let converter = converter(&definition());

    let json = converter
        .xml_to_json(&fixture("collector-configuration.xml"))
        .unwrap();
    let tree = parse(&json);

    assert_eq!(
        tree["description"],
        json!({"__VALUE__": "SNMP collection", "lang": "en"})
    );
    assert_eq!(
        tree["parameter"],
        json!([{"__VALUE__": "3", "key": "retry"}, {"key": "comment"}])
    );
}

#[test]
fn test_document_without_values_is_passed_through() {
    let converter = converter(&definition().with_value_name("parameter", "value"));

    let json = converter
        .xml_to_json(r#"<collector-configuration threads="5"><package name="p"><filter>x</filter></package></collector-configuration>"#)
        .unwrap();

    assert_eq!(
        json,
        r#"{"package":[{"filter":"x","name":"p"}],"threads":5}"#
    );
}

#[test]
fn test_wrong_root_element() {
    let converter = converter(&definition());
    let err = converter
        .xml_to_json("<poller-configuration threads=\"1\"/>")
        .unwrap_err();

    match err {
        ConversionError::UnexpectedRoot { expected, found } => {
            assert_eq!(expected, ROOT);
            assert_eq!(found, "poller-configuration");
        }
        other => panic!("expected UnexpectedRoot, got {other:?}"),
    }
}

#[test]
fn test_invalid_attribute_value() {
    let converter = converter(&definition());
    let err = converter
        .xml_to_json(r#"<collector-configuration threads="many"/>"#)
        .unwrap_err();
    assert!(
        matches!(err, ConversionError::InvalidValue { ref field, .. } if field == "threads"),
        "{err:?}"
    );
}

// ============================================================================
// JSON -> XML
// ============================================================================

#[test]
fn test_round_trip_preserves_content() {
    let converter = converter(&definition());

    let json = converter
        .xml_to_json(&fixture("collector-configuration.xml"))
        .unwrap();
    let xml = converter.json_to_xml(&json).unwrap();
    let again = converter.xml_to_json(&xml).unwrap();

    assert_eq!(parse(&again), parse(&json));
    assert!(xml.starts_with(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#
    ));
    assert!(xml.contains(
        r#"<collector-configuration xmlns="http://xmlns.opennms.org/xsd/config/collector-test" threads="50" enabled="false">"#
    ), "{xml}");
}

#[test]
fn test_json_to_xml_orders_by_schema() {
    let converter = converter(&definition());

    let xml = converter
        .json_to_xml(
            r#"{
                "package": {"exclude-range": {"begin": "a", "end": "b"}, "filter": "f", "name": "p"},
                "parameter": {"__VALUE__": "v", "key": "k"},
                "threads": "7"
            }"#,
        )
        .unwrap();

    let expected = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<collector-configuration xmlns="http://xmlns.opennms.org/xsd/config/collector-test" threads="7">
    <parameter key="k">v</parameter>
    <package name="p">
        <filter>f</filter>
        <exclude-range begin="a" end="b"/>
    </package>
</collector-configuration>"#;
    assert_eq!(xml, expected);
}

#[test]
fn test_json_to_xml_rejects_bad_json() {
    let converter = converter(&definition());

    assert!(matches!(
        converter.json_to_xml("{not json"),
        Err(ConversionError::Json(_))
    ));
    assert!(matches!(
        converter.json_to_xml(r#"{"threads": true}"#),
        Err(ConversionError::InvalidValue { .. })
    ));
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_missing_schema_resource() {
    let definition = ConfigDefinition::new("poller", "poller-configuration.xsd", "poller-configuration");
    let err = XmlConverter::new(&definition, &resolver()).unwrap_err();

    match err {
        SchemaError::ResourceNotFound { resource, .. } => {
            assert!(resource.ends_with("poller-configuration.xsd"), "{resource}");
        }
        other => panic!("expected ResourceNotFound, got {other:?}"),
    }
}

#[test]
fn test_unknown_root_element() {
    let definition = ConfigDefinition::new("collector", SCHEMA, "collectd-configuration");
    assert!(matches!(
        XmlConverter::new(&definition, &resolver()),
        Err(SchemaError::UnknownRootType { .. })
    ));
}

#[test]
fn test_namespace_marker_must_match_once() {
    let definition = definition().with_namespace_marker("acme");
    match XmlConverter::new(&definition, &resolver()) {
        Err(SchemaError::AmbiguousNamespace { marker, found }) => {
            assert_eq!(marker, "acme");
            assert!(found.is_empty());
        }
        other => panic!("expected AmbiguousNamespace, got {other:?}"),
    }
}

#[test]
fn test_explicit_root_type() {
    let definition =
        definition().with_root_type("org.opennms.xmlns.xsd.config.collector_test.CollectorConfiguration");
    let converter = converter(&definition);
    assert_eq!(
        converter.model().root_type_name(),
        "org.opennms.xmlns.xsd.config.collector_test.CollectorConfiguration"
    );
}

// ============================================================================
// Sharing
// ============================================================================

#[test]
fn test_shared_converter_across_threads() {
    let cache = ConverterCache::new();
    let definition = definition().with_value_name("parameter", "value");

    let results: Vec<(usize, Value, String)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = &cache;
                let definition = &definition;
                scope.spawn(move || {
                    let document = format!(
                        r#"<collector-configuration xmlns="http://xmlns.opennms.org/xsd/config/collector-test" threads="{i}">
    <parameter key="k{i}">v{i}</parameter>
</collector-configuration>"#
                    );
                    let converter: Arc<XmlConverter> =
                        cache.get_or_init(definition, &resolver()).unwrap();
                    let json = converter.xml_to_json(&document).unwrap();
                    let xml = converter.json_to_xml(&json).unwrap();
                    (i, parse(&json), xml)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(cache.len(), 1);
    assert_eq!(results.len(), 8);
    for (i, json, xml) in results {
        assert_eq!(
            json,
            json!({
                "threads": i,
                "parameter": [{"key": format!("k{i}"), "value": format!("v{i}")}]
            })
        );
        assert!(xml.contains(&format!(r#"threads="{i}">"#)), "{xml}");
        assert!(xml.contains(&format!(r#"<parameter key="k{i}">v{i}</parameter>"#)), "{xml}");
    }
}
