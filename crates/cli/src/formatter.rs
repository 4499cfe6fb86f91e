use clap::ValueEnum;
use serde_json::Value;
use xmlconf_xsd::{FieldDescriptor, FieldType, NodeKind, Occurrence, TypeDescriptor, XsdModel};

/// Output format options for `inspect`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Re-indent converted JSON, or pass it through untouched.
pub fn format_json(json: &str, pretty: bool) -> serde_json::Result<String> {
    if !pretty {
        return Ok(json.to_owned());
    }
    let value: Value = serde_json::from_str(json)?;
    serde_json::to_string_pretty(&value)
}

fn format_occurrence(occurrence: Occurrence) -> &'static str {
    match occurrence {
        Occurrence::Required => "required",
        Occurrence::Optional => "optional",
        Occurrence::Many => "many",
    }
}

/// Format a single field line, e.g. `  @period: integer (required)`
pub fn format_field(field: &FieldDescriptor) -> String {
    let marker = match field.node {
        NodeKind::Attribute => "@",
        NodeKind::Element => "",
    };
    let value_type = match &field.value_type {
        FieldType::Simple(kind) => kind.to_string(),
        FieldType::Complex(type_name) => type_name.clone(),
    };

    let mut line = format!(
        "  {}{}: {} ({})",
        marker,
        field.name,
        value_type,
        format_occurrence(field.occurrence)
    );
    if let Some(default) = &field.default {
        line.push_str(&format!(" = {:?}", default));
    }
    line
}

/// Format a type header followed by its fields
pub fn format_type(descriptor: &TypeDescriptor) -> Vec<String> {
    let mut header = descriptor.qualified_name().to_owned();
    if let Some(kind) = descriptor.value_kind() {
        header.push_str(&format!(" [text: {}]", kind));
    }
    if descriptor.is_mixed() {
        header.push_str(" [mixed]");
    }

    let mut lines = vec![header];
    lines.extend(descriptor.fields().iter().map(format_field));
    lines
}

/// Format a model summary: namespace, package, root type, then every type
pub fn format_model(model: &XsdModel) -> String {
    let mut lines = vec![
        format!("namespace: {}", model.namespace()),
        format!("package:   {}", model.registry().package()),
        format!("root:      {} -> {}", model.root_element(), model.root_type_name()),
        String::new(),
    ];

    for descriptor in model.registry().types() {
        lines.extend(format_type(descriptor));
    }

    lines.join("\n")
}

/// Machine-readable form of [`format_model`]
pub fn model_to_json(model: &XsdModel) -> Value {
    let types: serde_json::Map<String, Value> = model
        .registry()
        .types()
        .map(|descriptor| {
            let fields: Vec<String> = descriptor
                .fields()
                .iter()
                .map(|field| format_field(field).trim_start().to_owned())
                .collect();
            (
                descriptor.qualified_name().to_owned(),
                serde_json::json!({
                    "value": descriptor.value_kind().map(|kind| kind.to_string()),
                    "mixed": descriptor.is_mixed(),
                    "fields": fields,
                }),
            )
        })
        .collect();

    serde_json::json!({
        "stats": model.stats(),
        "types": types,
    })
}
