//! Raw XSD component model.
//!
//! This is a faithful, unresolved picture of one schema document: names are
//! kept as written (without prefixes), references are not followed, and
//! nothing is validated beyond well-formedness of the structure we read.
//! [`crate::registry`] turns it into resolved type descriptors.

use crate::xml_tree::XmlElement;
use crate::{Result, SchemaError, XSD_NAMESPACE};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Top-level XSD schema representation
#[derive(Debug, Clone, Default)]
pub struct XsdSchema {
    pub target_namespace: Option<String>,
    /// Namespaces brought in with `xs:import`
    pub imported_namespaces: Vec<String>,
    pub element_form_default: Option<String>,
    pub root_elements: Vec<XsdElement>,
    pub complex_types: Vec<XsdComplexType>,
    pub simple_types: Vec<XsdSimpleType>,
    pub groups: Vec<XsdGroup>,
    pub attribute_groups: Vec<XsdAttributeGroup>,
    pub attributes: Vec<XsdAttribute>,
}

/// XSD element declaration (global, local, or a reference to a global one)
#[derive(Debug, Clone)]
pub struct XsdElement {
    pub name: String,
    /// Set when this declaration is `ref="..."`; `name` then mirrors it.
    pub reference: Option<String>,
    pub type_info: Option<XsdTypeRef>,
    pub min_occurs: u32,
    pub max_occurs: Cardinality,
    pub default: Option<String>,
    /// Explicit `form` of a local declaration (`qualified` or `unqualified`)
    pub form: Option<String>,
}

/// Cardinality for max_occurs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Number(u32),
    Unbounded,
}

/// Reference to a type, either by name or as an inline definition.
#[derive(Debug, Clone)]
pub enum XsdTypeRef {
    /// A type from the XML Schema namespace, by local name (`string`, `int`, ...)
    Builtin(String),
    /// A type declared in this schema (or an import), by local name
    Named(String),
    Complex(Box<XsdComplexType>),
    Simple(Box<XsdSimpleType>),
}

/// XSD complex type
#[derive(Debug, Clone)]
pub struct XsdComplexType {
    /// `None` for anonymous inline types
    pub name: Option<String>,
    pub mixed: bool,
    pub content: XsdContent,
    pub attributes: Vec<XsdAttributeUse>,
}

#[derive(Debug, Clone)]
pub enum XsdContent {
    Empty,
    Particle(XsdParticle),
    /// `xs:simpleContent`: text value typed by `base`, plus attributes
    Simple {
        base: XsdTypeRef,
        derivation: Derivation,
    },
    /// `xs:complexContent`: derived from a named complex type
    Complex {
        base: XsdTypeRef,
        derivation: Derivation,
        particle: Option<XsdParticle>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    Extension,
    Restriction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compositor {
    Sequence,
    Choice,
    All,
}

#[derive(Debug, Clone)]
pub enum XsdParticle {
    Element(XsdElement),
    Group {
        compositor: Compositor,
        min_occurs: u32,
        max_occurs: Cardinality,
        particles: Vec<XsdParticle>,
    },
    GroupRef {
        name: String,
        min_occurs: u32,
        max_occurs: Cardinality,
    },
    Any,
}

/// Named model group (`xs:group name="..."`)
#[derive(Debug, Clone)]
pub struct XsdGroup {
    pub name: String,
    pub particle: Option<XsdParticle>,
}

/// Named attribute group (`xs:attributeGroup name="..."`)
#[derive(Debug, Clone)]
pub struct XsdAttributeGroup {
    pub name: String,
    pub attributes: Vec<XsdAttributeUse>,
}

/// XSD attribute
#[derive(Debug, Clone)]
pub struct XsdAttribute {
    pub name: String,
    pub type_info: Option<XsdTypeRef>,
    pub use_type: String, // "required" | "optional" | "prohibited"
    pub default: Option<String>,
}

#[derive(Debug, Clone)]
pub enum XsdAttributeUse {
    Attribute(XsdAttribute),
    /// `xs:attribute ref="..."`, with the referencing `use`
    Reference { name: String, use_type: String },
    /// `xs:attributeGroup ref="..."`
    GroupRef(String),
}

/// XSD simple type
#[derive(Debug, Clone)]
pub struct XsdSimpleType {
    pub name: Option<String>,
    pub variety: SimpleVariety,
}

#[derive(Debug, Clone)]
pub enum SimpleVariety {
    Restriction {
        base: Option<XsdTypeRef>,
        enumeration: Vec<String>,
    },
    List,
    Union,
}

impl XsdSchema {
    /// Parse an XSD schema document.
    pub fn parse(xsd: &str) -> Result<Self> {
        let root = XmlElement::parse(xsd)?;
        let scope = Scope::default().enter(&root);
        if scope.xsd_local(&root) != Some("schema") {
            return Err(SchemaError::parsing(format!(
                "document element '{}' is not an XML Schema",
                root.name
            )));
        }

        let mut schema = XsdSchema {
            target_namespace: root.attribute("targetNamespace").map(str::to_owned),
            element_form_default: root.attribute("elementFormDefault").map(str::to_owned),
            ..Default::default()
        };

        for child in &root.children {
            let scope = scope.enter(child);
            match scope.xsd_local(child) {
                Some("element") => schema.root_elements.push(parse_element(child, &scope)?),
                Some("complexType") => {
                    let name = required_attribute(child, "name")?;
                    schema
                        .complex_types
                        .push(parse_complex_type(child, &scope, Some(name))?);
                }
                Some("simpleType") => {
                    let name = required_attribute(child, "name")?;
                    schema
                        .simple_types
                        .push(parse_simple_type(child, &scope, Some(name))?);
                }
                Some("group") => schema.groups.push(XsdGroup {
                    name: required_attribute(child, "name")?,
                    particle: first_compositor(child, &scope)?,
                }),
                Some("attributeGroup") => schema.attribute_groups.push(XsdAttributeGroup {
                    name: required_attribute(child, "name")?,
                    attributes: parse_attribute_uses(child, &scope)?,
                }),
                Some("attribute") => schema.attributes.push(parse_attribute(child, &scope)?),
                Some("import") => {
                    if let Some(namespace) = child.attribute("namespace") {
                        schema.imported_namespaces.push(namespace.to_owned());
                    }
                }
                Some("include") | Some("redefine") | Some("override") => {
                    warn!(
                        "xs:{} of '{}' is not followed; its declarations are unavailable",
                        child.local_name(),
                        child.attribute("schemaLocation").unwrap_or_default()
                    );
                }
                Some("annotation") | Some("notation") => {}
                _ => debug!("ignoring top-level schema child '{}'", child.name),
            }
        }

        Ok(schema)
    }

    /// Whether local element declarations without a `form` are namespace-qualified.
    pub fn elements_qualified(&self) -> bool {
        self.element_form_default.as_deref() == Some("qualified")
    }

    /// All namespaces this schema declares: the target namespace plus imports.
    ///
    /// Deduplicated and sorted so the result is stable across documents.
    pub fn declared_namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self
            .target_namespace
            .iter()
            .chain(self.imported_namespaces.iter())
            .cloned()
            .collect();
        namespaces.sort();
        namespaces.dedup();
        namespaces
    }

    /// Get all global element names (useful for quick inspection)
    pub fn element_names(&self) -> Vec<&str> {
        self.root_elements.iter().map(|e| e.name.as_str()).collect()
    }

    /// Get all named complex type names
    pub fn complex_type_names(&self) -> Vec<&str> {
        self.complex_types
            .iter()
            .filter_map(|t| t.name.as_deref())
            .collect()
    }

    pub fn find_element(&self, name: &str) -> Option<&XsdElement> {
        self.root_elements.iter().find(|e| e.name == name)
    }

    pub fn find_complex_type(&self, name: &str) -> Option<&XsdComplexType> {
        self.complex_types
            .iter()
            .find(|t| t.name.as_deref() == Some(name))
    }

    pub fn find_simple_type(&self, name: &str) -> Option<&XsdSimpleType> {
        self.simple_types
            .iter()
            .find(|t| t.name.as_deref() == Some(name))
    }

    pub fn find_group(&self, name: &str) -> Option<&XsdGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn find_attribute_group(&self, name: &str) -> Option<&XsdAttributeGroup> {
        self.attribute_groups.iter().find(|g| g.name == name)
    }

    pub fn find_attribute(&self, name: &str) -> Option<&XsdAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

impl Cardinality {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Cardinality::Unbounded)
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Cardinality::Number(0))
    }

    pub fn is_single(&self) -> bool {
        matches!(self, Cardinality::Number(1))
    }

    pub fn is_multiple(&self) -> bool {
        match self {
            Cardinality::Unbounded => true,
            Cardinality::Number(n) => *n > 1,
        }
    }

    /// Cardinality of a particle nested inside a repeated group.
    pub fn times(self, other: Cardinality) -> Cardinality {
        match (self, other) {
            (Cardinality::Number(a), Cardinality::Number(b)) => Cardinality::Number(a * b),
            _ => Cardinality::Unbounded,
        }
    }
}

impl XsdAttribute {
    pub fn is_required(&self) -> bool {
        self.use_type == "required"
    }

    pub fn is_optional(&self) -> bool {
        self.use_type == "optional"
    }
}

impl XsdElement {
    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }
}

/// In-scope namespace bindings while walking a schema document.
#[derive(Debug, Clone, Default)]
struct Scope {
    bindings: BTreeMap<String, String>,
}

impl Scope {
    fn enter(&self, element: &XmlElement) -> Scope {
        let mut scope = self.clone();
        for (prefix, uri) in element.namespace_declarations() {
            scope.bindings.insert(prefix.to_owned(), uri.to_owned());
        }
        scope
    }

    fn namespace_of(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    /// Local name of `element` if it lives in the XML Schema namespace.
    fn xsd_local<'e>(&self, element: &'e XmlElement) -> Option<&'e str> {
        let prefix = element.prefix().unwrap_or("");
        (self.namespace_of(prefix) == Some(XSD_NAMESPACE)).then(|| element.local_name())
    }

    /// Resolve a QName-valued attribute into a type reference.
    fn type_ref(&self, qname: &str) -> XsdTypeRef {
        let (prefix, local) = match qname.split_once(':') {
            Some((prefix, local)) => (prefix, local),
            None => ("", qname),
        };
        if self.namespace_of(prefix) == Some(XSD_NAMESPACE) {
            XsdTypeRef::Builtin(local.to_owned())
        } else {
            XsdTypeRef::Named(local.to_owned())
        }
    }
}

fn required_attribute(element: &XmlElement, name: &str) -> Result<String> {
    element.attribute(name).map(str::to_owned).ok_or_else(|| {
        SchemaError::parsing(format!("'{}' is missing its '{}' attribute", element.name, name))
    })
}

fn parse_occurs(element: &XmlElement) -> Result<(u32, Cardinality)> {
    let min_occurs = match element.attribute("minOccurs") {
        Some(value) => value.trim().parse().map_err(|_| {
            SchemaError::parsing(format!("invalid minOccurs '{value}' on '{}'", element.name))
        })?,
        None => 1,
    };
    let max_occurs = match element.attribute("maxOccurs").map(str::trim) {
        Some("unbounded") => Cardinality::Unbounded,
        Some(value) => Cardinality::Number(value.parse().map_err(|_| {
            SchemaError::parsing(format!("invalid maxOccurs '{value}' on '{}'", element.name))
        })?),
        None => Cardinality::Number(1),
    };
    Ok((min_occurs, max_occurs))
}

fn parse_element(element: &XmlElement, scope: &Scope) -> Result<XsdElement> {
    let (min_occurs, max_occurs) = parse_occurs(element)?;

    if let Some(reference) = element.attribute("ref") {
        let name = crate::xml_tree::local_part(reference).to_owned();
        return Ok(XsdElement {
            name: name.clone(),
            reference: Some(name),
            type_info: None,
            min_occurs,
            max_occurs,
            default: None,
            form: None,
        });
    }

    let name = required_attribute(element, "name")?;
    let mut type_info = element.attribute("type").map(|t| scope.type_ref(t));
    if type_info.is_none() {
        type_info = inline_type(element, scope)?;
    }

    Ok(XsdElement {
        name,
        reference: None,
        type_info,
        min_occurs,
        max_occurs,
        default: element
            .attribute("default")
            .or_else(|| element.attribute("fixed"))
            .map(str::to_owned),
        form: element.attribute("form").map(str::to_owned),
    })
}

/// Anonymous `xs:complexType` / `xs:simpleType` child of a declaration.
fn inline_type(element: &XmlElement, scope: &Scope) -> Result<Option<XsdTypeRef>> {
    for child in &element.children {
        let scope = scope.enter(child);
        match scope.xsd_local(child) {
            Some("complexType") => {
                return Ok(Some(XsdTypeRef::Complex(Box::new(parse_complex_type(
                    child, &scope, None,
                )?))))
            }
            Some("simpleType") => {
                return Ok(Some(XsdTypeRef::Simple(Box::new(parse_simple_type(
                    child, &scope, None,
                )?))))
            }
            _ => {}
        }
    }
    Ok(None)
}

fn parse_complex_type(
    element: &XmlElement,
    scope: &Scope,
    name: Option<String>,
) -> Result<XsdComplexType> {
    let mut complex_type = XsdComplexType {
        name,
        mixed: is_true(element.attribute("mixed")),
        content: XsdContent::Empty,
        attributes: Vec::new(),
    };

    for child in &element.children {
        let scope = scope.enter(child);
        match scope.xsd_local(child) {
            Some("sequence") | Some("choice") | Some("all") | Some("group") => {
                complex_type.content = XsdContent::Particle(parse_particle(child, &scope)?);
            }
            Some("attribute") | Some("attributeGroup") => {
                complex_type
                    .attributes
                    .push(parse_attribute_use(child, &scope)?);
            }
            Some("simpleContent") => {
                complex_type.content =
                    parse_derived_content(child, &scope, &mut complex_type.attributes, true)?;
            }
            Some("complexContent") => {
                complex_type.mixed |= is_true(child.attribute("mixed"));
                complex_type.content =
                    parse_derived_content(child, &scope, &mut complex_type.attributes, false)?;
            }
            _ => {}
        }
    }

    Ok(complex_type)
}

/// Parse `xs:simpleContent` or `xs:complexContent` and its derivation step.
fn parse_derived_content(
    element: &XmlElement,
    scope: &Scope,
    attributes: &mut Vec<XsdAttributeUse>,
    simple: bool,
) -> Result<XsdContent> {
    for child in &element.children {
        let scope = scope.enter(child);
        let derivation = match scope.xsd_local(child) {
            Some("extension") => Derivation::Extension,
            Some("restriction") => Derivation::Restriction,
            _ => continue,
        };
        let base = scope.type_ref(&required_attribute(child, "base")?);

        let mut particle = None;
        for grandchild in &child.children {
            let scope = scope.enter(grandchild);
            match scope.xsd_local(grandchild) {
                Some("sequence") | Some("choice") | Some("all") | Some("group") => {
                    particle = Some(parse_particle(grandchild, &scope)?);
                }
                Some("attribute") | Some("attributeGroup") => {
                    attributes.push(parse_attribute_use(grandchild, &scope)?);
                }
                _ => {}
            }
        }

        return Ok(if simple {
            XsdContent::Simple { base, derivation }
        } else {
            XsdContent::Complex {
                base,
                derivation,
                particle,
            }
        });
    }

    Err(SchemaError::parsing(format!(
        "'{}' has neither an extension nor a restriction",
        element.name
    )))
}

fn parse_particle(element: &XmlElement, scope: &Scope) -> Result<XsdParticle> {
    let (min_occurs, max_occurs) = parse_occurs(element)?;
    let compositor = match scope.xsd_local(element) {
        Some("sequence") => Compositor::Sequence,
        Some("choice") => Compositor::Choice,
        Some("all") => Compositor::All,
        Some("group") => {
            let reference = required_attribute(element, "ref")?;
            return Ok(XsdParticle::GroupRef {
                name: crate::xml_tree::local_part(&reference).to_owned(),
                min_occurs,
                max_occurs,
            });
        }
        Some("element") => return Ok(XsdParticle::Element(parse_element(element, scope)?)),
        _ => return Ok(XsdParticle::Any),
    };

    let mut particles = Vec::new();
    for child in &element.children {
        let scope = scope.enter(child);
        match scope.xsd_local(child) {
            Some("element") | Some("sequence") | Some("choice") | Some("all") | Some("group") => {
                particles.push(parse_particle(child, &scope)?);
            }
            Some("any") => particles.push(XsdParticle::Any),
            _ => {}
        }
    }

    Ok(XsdParticle::Group {
        compositor,
        min_occurs,
        max_occurs,
        particles,
    })
}

/// The model group inside a named `xs:group` definition.
fn first_compositor(element: &XmlElement, scope: &Scope) -> Result<Option<XsdParticle>> {
    for child in &element.children {
        let scope = scope.enter(child);
        if matches!(
            scope.xsd_local(child),
            Some("sequence") | Some("choice") | Some("all")
        ) {
            return parse_particle(child, &scope).map(Some);
        }
    }
    Ok(None)
}

fn parse_attribute_uses(element: &XmlElement, scope: &Scope) -> Result<Vec<XsdAttributeUse>> {
    let mut uses = Vec::new();
    for child in &element.children {
        let scope = scope.enter(child);
        if matches!(
            scope.xsd_local(child),
            Some("attribute") | Some("attributeGroup")
        ) {
            uses.push(parse_attribute_use(child, &scope)?);
        }
    }
    Ok(uses)
}

fn parse_attribute_use(element: &XmlElement, scope: &Scope) -> Result<XsdAttributeUse> {
    let reference = element
        .attribute("ref")
        .map(|r| crate::xml_tree::local_part(r).to_owned());

    if scope.xsd_local(element) == Some("attributeGroup") {
        return reference.map(XsdAttributeUse::GroupRef).ok_or_else(|| {
            SchemaError::parsing("local xs:attributeGroup must be a reference")
        });
    }

    match reference {
        Some(name) => Ok(XsdAttributeUse::Reference {
            name,
            use_type: element.attribute("use").unwrap_or("optional").to_owned(),
        }),
        None => parse_attribute(element, scope).map(XsdAttributeUse::Attribute),
    }
}

fn parse_attribute(element: &XmlElement, scope: &Scope) -> Result<XsdAttribute> {
    let name = required_attribute(element, "name")?;
    let mut type_info = element.attribute("type").map(|t| scope.type_ref(t));
    if type_info.is_none() {
        type_info = inline_type(element, scope)?;
    }

    Ok(XsdAttribute {
        name,
        type_info,
        use_type: element.attribute("use").unwrap_or("optional").to_owned(),
        default: element
            .attribute("default")
            .or_else(|| element.attribute("fixed"))
            .map(str::to_owned),
    })
}

fn parse_simple_type(
    element: &XmlElement,
    scope: &Scope,
    name: Option<String>,
) -> Result<XsdSimpleType> {
    let mut variety = SimpleVariety::Restriction {
        base: None,
        enumeration: Vec::new(),
    };

    for child in &element.children {
        let scope = scope.enter(child);
        match scope.xsd_local(child) {
            Some("restriction") => {
                let mut base = child.attribute("base").map(|b| scope.type_ref(b));
                if base.is_none() {
                    base = inline_type(child, &scope)?;
                }
                let enumeration = child
                    .children
                    .iter()
                    .filter(|facet| facet.local_name() == "enumeration")
                    .filter_map(|facet| facet.attribute("value"))
                    .map(str::to_owned)
                    .collect();
                variety = SimpleVariety::Restriction { base, enumeration };
            }
            Some("list") => variety = SimpleVariety::List,
            Some("union") => variety = SimpleVariety::Union,
            _ => {}
        }
    }

    Ok(XsdSimpleType { name, variety })
}

fn is_true(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("true") | Some("1"))
}
