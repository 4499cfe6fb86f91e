//! Resolved type descriptors, keyed by qualified type name.
//!
//! Every complex type reachable from the schema gets one [`TypeDescriptor`]:
//!
//! - named complex types become `<package>.<ClassName>`
//! - anonymous types of global elements become `<package>.<ElementClass>`
//! - anonymous types of local elements nest under their parent,
//!   `<Parent>.<ElementClass>`
//!
//! Derivation (`xs:extension` / `xs:restriction`) is flattened so each
//! descriptor lists all of its fields.

use crate::entity::DynamicEntity;
use crate::json::VALUE_TAG;
use crate::naming::{class_name, qualify};
use crate::schema_model::{
    Cardinality, Compositor, Derivation, SimpleVariety, XsdAttribute, XsdAttributeUse,
    XsdComplexType, XsdContent, XsdElement, XsdParticle, XsdSchema, XsdSimpleType, XsdTypeRef,
};
use crate::{Result, SchemaError};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

/// Lexical kind of a simple value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Boolean,
    Integer,
    Decimal,
}

impl ValueKind {
    /// Map a built-in XML Schema type (by local name) to its value kind.
    pub fn from_builtin(name: &str) -> Self {
        match name {
            "boolean" => ValueKind::Boolean,
            "integer" | "int" | "long" | "short" | "byte" | "nonNegativeInteger"
            | "positiveInteger" | "nonPositiveInteger" | "negativeInteger" | "unsignedLong"
            | "unsignedInt" | "unsignedShort" | "unsignedByte" => ValueKind::Integer,
            "decimal" | "float" | "double" => ValueKind::Decimal,
            _ => ValueKind::String,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::String => "string",
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Decimal => "decimal",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Attribute,
    Element,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Occurrence {
    Required,
    Optional,
    /// `maxOccurs` above one, possibly inherited from an enclosing group
    Many,
}

impl Occurrence {
    fn from_bounds(min: u32, max: Cardinality) -> Self {
        if max.is_multiple() {
            Occurrence::Many
        } else if min == 0 {
            Occurrence::Optional
        } else {
            Occurrence::Required
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self, Occurrence::Many)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Simple(ValueKind),
    /// Qualified name of the nested type
    Complex(String),
}

/// One attribute or child element of a complex type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    /// XML attribute or element name, also used as the JSON key
    pub name: String,
    pub node: NodeKind,
    pub occurrence: Occurrence,
    pub value_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Whether the element is written in the target namespace
    pub qualified: bool,
}

impl FieldDescriptor {
    pub fn is_attribute(&self) -> bool {
        self.node == NodeKind::Attribute
    }

    pub fn is_many(&self) -> bool {
        self.occurrence.is_many()
    }

    pub fn complex_type(&self) -> Option<&str> {
        match &self.value_type {
            FieldType::Complex(name) => Some(name),
            FieldType::Simple(_) => None,
        }
    }
}

/// Structural description of one complex type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDescriptor {
    qualified_name: String,
    /// Attributes and child elements, in schema order
    fields: Vec<FieldDescriptor>,
    /// Kind of the text content, for simple-content and mixed types
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<ValueKind>,
    mixed: bool,
}

impl TypeDescriptor {
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&FieldDescriptor> {
        self.attributes().find(|f| f.name == name)
    }

    pub fn element(&self, name: &str) -> Option<&FieldDescriptor> {
        self.elements().find(|f| f.name == name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.node == NodeKind::Attribute)
    }

    pub fn elements(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.node == NodeKind::Element)
    }

    /// Kind of the type's own text value, if it has one.
    pub fn value_kind(&self) -> Option<ValueKind> {
        self.value
    }

    pub fn is_mixed(&self) -> bool {
        self.mixed
    }

    /// A type with a text value and nothing else.
    pub fn is_value_only(&self) -> bool {
        self.value.is_some() && self.fields.is_empty()
    }
}

/// All types declared by one schema.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    package: String,
    types: BTreeMap<String, TypeDescriptor>,
    /// Qualified element-derived names that point at a named type
    aliases: BTreeMap<String, String>,
    /// Global element XML name -> qualified type name
    elements: BTreeMap<String, String>,
}

impl TypeRegistry {
    /// Build the registry for `schema`, qualifying names with `package`.
    pub fn build(schema: &XsdSchema, package: &str) -> Result<Self> {
        let mut builder = Builder {
            schema,
            package,
            types: BTreeMap::new(),
            building: BTreeSet::new(),
            expanding_groups: BTreeSet::new(),
        };
        builder.check_type_names()?;

        for complex_type in &schema.complex_types {
            if let Some(name) = &complex_type.name {
                builder.ensure_named(name)?;
            }
        }

        let mut aliases = BTreeMap::new();
        let mut elements = BTreeMap::new();
        for element in &schema.root_elements {
            let qualified = qualify(package, &class_name(&element.name));
            match &element.type_info {
                Some(XsdTypeRef::Complex(complex_type)) => {
                    builder.build_complex(&qualified, complex_type)?;
                    elements.insert(element.name.clone(), qualified);
                }
                Some(XsdTypeRef::Named(name)) if schema.find_complex_type(name).is_some() => {
                    let target = builder.ensure_named(name)?;
                    if qualified != target && !builder.types.contains_key(&qualified) {
                        aliases.insert(qualified, target.clone());
                    }
                    elements.insert(element.name.clone(), target);
                }
                _ => debug!("global element '{}' has simple content", element.name),
            }
        }

        debug!(
            "registered {} types ({} aliases) under '{}'",
            builder.types.len(),
            aliases.len(),
            package
        );

        Ok(Self {
            package: package.to_owned(),
            types: builder.types,
            aliases,
            elements,
        })
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Look up a type by qualified name or element alias.
    pub fn get(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_name).or_else(|| {
            self.aliases
                .get(type_name)
                .and_then(|target| self.types.get(target))
        })
    }

    pub fn descriptor(&self, type_name: &str) -> Result<&TypeDescriptor> {
        self.get(type_name)
            .ok_or_else(|| SchemaError::unknown_type(type_name))
    }

    /// Like [`Self::descriptor`], but a miss means the root wiring is wrong.
    pub fn resolve_root_type(&self, type_name: &str) -> Result<&TypeDescriptor> {
        self.get(type_name).ok_or_else(|| SchemaError::UnknownRootType {
            type_name: type_name.to_owned(),
        })
    }

    /// Resolve a qualified name, a package-relative class name, or a global
    /// element name to a descriptor.
    pub fn resolve_type(&self, name: &str) -> Option<&TypeDescriptor> {
        self.get(name)
            .or_else(|| self.get(&qualify(&self.package, name)))
            .or_else(|| self.element_type(name).and_then(|q| self.types.get(q)))
            .or_else(|| self.get(&qualify(&self.package, &class_name(name))))
    }

    /// Construct an empty instance of a declared type.
    pub fn instantiate(&self, type_name: &str) -> Result<DynamicEntity> {
        let descriptor = self.descriptor(type_name)?;
        Ok(DynamicEntity::new(descriptor.qualified_name()))
    }

    /// Qualified type bound to a global element.
    pub fn element_type(&self, element_name: &str) -> Option<&str> {
        self.elements.get(element_name).map(String::as_str)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Whether any local element is written outside the target namespace.
    pub fn has_unqualified_elements(&self) -> bool {
        self.types
            .values()
            .flat_map(|descriptor| descriptor.elements())
            .any(|field| !field.qualified)
    }
}

struct Builder<'s> {
    schema: &'s XsdSchema,
    package: &'s str,
    types: BTreeMap<String, TypeDescriptor>,
    /// Named types whose derivation is being resolved
    building: BTreeSet<String>,
    expanding_groups: BTreeSet<String>,
}

impl<'s> Builder<'s> {
    /// Two schema names that fold onto the same class name can't both be registered.
    fn check_type_names(&self) -> Result<()> {
        let mut seen: BTreeMap<String, &str> = BTreeMap::new();
        let named = self.schema.complex_types.iter().filter_map(|t| t.name.as_deref());
        let anonymous = self
            .schema
            .root_elements
            .iter()
            .filter(|e| matches!(e.type_info, Some(XsdTypeRef::Complex(_))))
            .map(|e| e.name.as_str());

        for name in named.chain(anonymous) {
            if let Some(previous) = seen.insert(class_name(name), name) {
                return Err(SchemaError::parsing(format!(
                    "'{previous}' and '{name}' both map to type name '{}'",
                    class_name(name)
                )));
            }
        }
        Ok(())
    }

    fn named_qualified(&self, name: &str) -> String {
        qualify(self.package, &class_name(name))
    }

    /// Build a named complex type (and its bases) if not done yet.
    fn ensure_named(&mut self, name: &str) -> Result<String> {
        let qualified = self.named_qualified(name);
        if self.types.contains_key(&qualified) {
            return Ok(qualified);
        }
        if !self.building.insert(qualified.clone()) {
            return Err(SchemaError::parsing(format!(
                "circular type derivation through '{name}'"
            )));
        }

        let complex_type = self
            .schema
            .find_complex_type(name)
            .ok_or_else(|| SchemaError::unknown_type(qualified.clone()))?;
        self.build_complex(&qualified, complex_type)?;

        self.building.remove(&qualified);
        Ok(qualified)
    }

    fn build_complex(&mut self, qualified: &str, complex_type: &XsdComplexType) -> Result<()> {
        let mut descriptor = TypeDescriptor {
            qualified_name: qualified.to_owned(),
            fields: Vec::new(),
            value: None,
            mixed: complex_type.mixed,
        };

        match &complex_type.content {
            XsdContent::Empty => {}
            XsdContent::Particle(particle) => {
                self.collect_particle(&mut descriptor, particle, 1, Cardinality::Number(1), false)?;
            }
            XsdContent::Simple { base, .. } => match base {
                XsdTypeRef::Named(name) if self.schema.find_complex_type(name).is_some() => {
                    let base = self.ensure_named(name)?;
                    self.inherit(&mut descriptor, &base, true);
                }
                other => descriptor.value = Some(self.simple_kind(Some(other))?),
            },
            XsdContent::Complex {
                base,
                derivation,
                particle,
            } => {
                if let XsdTypeRef::Named(name) = base {
                    if self.schema.find_complex_type(name).is_some() {
                        let base = self.ensure_named(name)?;
                        let keep_elements = *derivation == Derivation::Extension;
                        self.inherit(&mut descriptor, &base, keep_elements);
                    } else {
                        warn!("base type '{name}' of '{qualified}' is not declared; ignoring it");
                    }
                }
                if let Some(particle) = particle {
                    self.collect_particle(
                        &mut descriptor,
                        particle,
                        1,
                        Cardinality::Number(1),
                        false,
                    )?;
                }
            }
        }

        self.collect_attributes(&mut descriptor, &complex_type.attributes)?;

        if descriptor.mixed && descriptor.value.is_none() {
            descriptor.value = Some(ValueKind::String);
        }

        if let Some(clash) = descriptor
            .attributes()
            .find(|attribute| descriptor.element(&attribute.name).is_some())
        {
            return Err(SchemaError::parsing(format!(
                "type '{qualified}' declares both an attribute and an element named '{}'",
                clash.name
            )));
        }

        if descriptor.field(VALUE_TAG).is_some() {
            return Err(SchemaError::ReservedFieldName {
                type_name: qualified.to_owned(),
                field: VALUE_TAG.to_owned(),
            });
        }

        if self.types.contains_key(qualified) {
            return Err(SchemaError::parsing(format!(
                "type '{qualified}' is declared more than once"
            )));
        }
        self.types.insert(qualified.to_owned(), descriptor);
        Ok(())
    }

    /// Copy fields from an already-built base type.
    ///
    /// A restriction redeclares its content model, so only attributes carry over.
    fn inherit(&self, descriptor: &mut TypeDescriptor, base: &str, keep_elements: bool) {
        let Some(base) = self.types.get(base) else {
            return;
        };
        descriptor.value = base.value;
        descriptor.mixed |= base.mixed;
        descriptor.fields.extend(
            base.fields
                .iter()
                .filter(|f| keep_elements || f.is_attribute())
                .cloned(),
        );
    }

    fn collect_particle(
        &mut self,
        descriptor: &mut TypeDescriptor,
        particle: &XsdParticle,
        min: u32,
        max: Cardinality,
        in_choice: bool,
    ) -> Result<()> {
        match particle {
            XsdParticle::Element(element) => {
                let min = if in_choice { 0 } else { min * element.min_occurs };
                let max = max.times(element.max_occurs);
                self.add_element(descriptor, element, min, max)
            }
            XsdParticle::Group {
                compositor,
                min_occurs,
                max_occurs,
                particles,
            } => {
                let min = if in_choice { 0 } else { min * min_occurs };
                let max = max.times(*max_occurs);
                let choice = *compositor == Compositor::Choice && particles.len() > 1;
                for child in particles {
                    self.collect_particle(descriptor, child, min, max, choice)?;
                }
                Ok(())
            }
            XsdParticle::GroupRef {
                name,
                min_occurs,
                max_occurs,
            } => {
                let Some(group) = self.schema.find_group(name) else {
                    warn!("model group '{name}' is not declared; skipping it");
                    return Ok(());
                };
                let Some(group_particle) = &group.particle else {
                    return Ok(());
                };
                if !self.expanding_groups.insert(name.clone()) {
                    return Err(SchemaError::parsing(format!(
                        "model group '{name}' references itself"
                    )));
                }
                let min = if in_choice { 0 } else { min * min_occurs };
                let max = max.times(*max_occurs);
                let result = self.collect_particle(descriptor, group_particle, min, max, false);
                self.expanding_groups.remove(name);
                result
            }
            XsdParticle::Any => {
                debug!("xs:any in '{}' is not bound", descriptor.qualified_name);
                Ok(())
            }
        }
    }

    fn add_element(
        &mut self,
        descriptor: &mut TypeDescriptor,
        element: &XsdElement,
        min: u32,
        max: Cardinality,
    ) -> Result<()> {
        let (declaration, default) = match &element.reference {
            Some(name) => match self.schema.find_element(name) {
                Some(global) => (global, global.default.clone()),
                None => {
                    warn!("referenced element '{name}' is not declared; treating it as text");
                    (element, None)
                }
            },
            None => (element, element.default.clone()),
        };

        let value_type = match &declaration.type_info {
            Some(XsdTypeRef::Complex(complex_type)) => {
                let qualified = if element.is_reference() {
                    // built with the other global elements
                    self.named_qualified(&declaration.name)
                } else {
                    let nested =
                        qualify(&descriptor.qualified_name, &class_name(&declaration.name));
                    self.build_complex(&nested, complex_type)?;
                    nested
                };
                FieldType::Complex(qualified)
            }
            Some(XsdTypeRef::Named(name)) if self.schema.find_complex_type(name).is_some() => {
                FieldType::Complex(self.named_qualified(name))
            }
            other => FieldType::Simple(self.simple_kind(other.as_ref())?),
        };

        let qualified = element.is_reference()
            || match element.form.as_deref() {
                Some(form) => form == "qualified",
                None => self.schema.elements_qualified(),
            };

        push_field(
            descriptor,
            FieldDescriptor {
                name: declaration.name.clone(),
                node: NodeKind::Element,
                occurrence: Occurrence::from_bounds(min, max),
                value_type,
                default,
                qualified,
            },
        );
        Ok(())
    }

    fn collect_attributes(
        &mut self,
        descriptor: &mut TypeDescriptor,
        uses: &[XsdAttributeUse],
    ) -> Result<()> {
        for attribute_use in uses {
            match attribute_use {
                XsdAttributeUse::Attribute(attribute) => {
                    self.add_attribute(descriptor, attribute, &attribute.use_type)?;
                }
                XsdAttributeUse::Reference { name, use_type } => {
                    match self.schema.find_attribute(name) {
                        Some(attribute) => self.add_attribute(descriptor, attribute, use_type)?,
                        None => {
                            warn!("referenced attribute '{name}' is not declared; treating it as text");
                            push_field(descriptor, attribute_field(name, use_type, ValueKind::String, None));
                        }
                    }
                }
                XsdAttributeUse::GroupRef(name) => {
                    let Some(group) = self.schema.find_attribute_group(name) else {
                        warn!("attribute group '{name}' is not declared; skipping it");
                        continue;
                    };
                    let key = format!("@{name}");
                    if !self.expanding_groups.insert(key.clone()) {
                        return Err(SchemaError::parsing(format!(
                            "attribute group '{name}' references itself"
                        )));
                    }
                    let result = self.collect_attributes(descriptor, &group.attributes);
                    self.expanding_groups.remove(&key);
                    result?;
                }
            }
        }
        Ok(())
    }

    fn add_attribute(
        &mut self,
        descriptor: &mut TypeDescriptor,
        attribute: &XsdAttribute,
        use_type: &str,
    ) -> Result<()> {
        if use_type == "prohibited" {
            descriptor
                .fields
                .retain(|f| !(f.is_attribute() && f.name == attribute.name));
            return Ok(());
        }
        let kind = self.simple_kind(attribute.type_info.as_ref())?;
        push_field(
            descriptor,
            attribute_field(&attribute.name, use_type, kind, attribute.default.clone()),
        );
        Ok(())
    }

    fn simple_kind(&self, type_ref: Option<&XsdTypeRef>) -> Result<ValueKind> {
        self.simple_kind_guarded(type_ref, &mut BTreeSet::new())
    }

    fn simple_kind_guarded(
        &self,
        type_ref: Option<&XsdTypeRef>,
        seen: &mut BTreeSet<String>,
    ) -> Result<ValueKind> {
        match type_ref {
            None => Ok(ValueKind::String),
            Some(XsdTypeRef::Builtin(name)) => Ok(ValueKind::from_builtin(name)),
            Some(XsdTypeRef::Simple(simple_type)) => self.simple_type_kind(simple_type, seen),
            Some(XsdTypeRef::Named(name)) => {
                if !seen.insert(name.clone()) {
                    return Err(SchemaError::parsing(format!(
                        "circular simple type derivation through '{name}'"
                    )));
                }
                match self.schema.find_simple_type(name) {
                    Some(simple_type) => self.simple_type_kind(simple_type, seen),
                    None => {
                        warn!("type '{name}' is not declared; treating it as text");
                        Ok(ValueKind::String)
                    }
                }
            }
            Some(XsdTypeRef::Complex(_)) => Err(SchemaError::parsing(
                "complex type used where a simple type is required",
            )),
        }
    }

    fn simple_type_kind(
        &self,
        simple_type: &XsdSimpleType,
        seen: &mut BTreeSet<String>,
    ) -> Result<ValueKind> {
        match &simple_type.variety {
            SimpleVariety::Restriction { base, .. } => self.simple_kind_guarded(base.as_ref(), seen),
            SimpleVariety::List | SimpleVariety::Union => Ok(ValueKind::String),
        }
    }
}

fn attribute_field(
    name: &str,
    use_type: &str,
    kind: ValueKind,
    default: Option<String>,
) -> FieldDescriptor {
    FieldDescriptor {
        name: name.to_owned(),
        node: NodeKind::Attribute,
        occurrence: if use_type == "required" {
            Occurrence::Required
        } else {
            Occurrence::Optional
        },
        value_type: FieldType::Simple(kind),
        default,
        qualified: false,
    }
}

fn push_field(descriptor: &mut TypeDescriptor, field: FieldDescriptor) {
    if let Some(existing) = descriptor
        .fields
        .iter_mut()
        .find(|f| f.name == field.name && f.node == field.node)
    {
        warn!(
            "'{}' declares '{}' more than once; keeping the last declaration",
            descriptor.qualified_name, field.name
        );
        *existing = field;
        return;
    }
    descriptor.fields.push(field);
}
