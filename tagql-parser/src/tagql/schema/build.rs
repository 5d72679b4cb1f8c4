//! Building a [`Schema`] from a parsed SDL document
//!
//! Collects type and directive definitions, merges type extensions into their base types,
//! resolves the root operation types and then checks that every reference points at a type
//! of a suitable kind.

use graphql_parser::query::{Directive, Number, Type, Value};
use graphql_parser::schema::{
    Definition, Document, EnumValue, Field, InputValue, TypeDefinition, TypeExtension,
};
use std::collections::BTreeMap;
use std::fmt;

use super::{
    DirectiveDef, EnumValueDef, FieldDef, InputValueDef, NamedType, Schema, TypeKind, TypeRef,
    BUILTIN_SCALARS, DEFAULT_DEPRECATION_REASON,
};

/// Directives a schema may redeclare on top of the prepended prelude
const REPLACEABLE_DIRECTIVES: [&str; 2] = ["include", "skip"];

/// Errors raised while building a schema from SDL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    DuplicateType(String),
    DuplicateDirective(String),
    DuplicateSchemaDefinition,
    ExtensionOfUnknownType(String),
    ExtensionKindMismatch { name: String, expected: TypeKind },
    UnknownType { name: String, referenced_by: String },
    WrongKind {
        name: String,
        referenced_by: String,
        expected: &'static str,
    },
    MissingQueryType,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::DuplicateType(name) => {
                write!(f, "Type \"{}\" was defined more than once.", name)
            }
            BuildError::DuplicateDirective(name) => {
                write!(f, "Directive \"@{}\" was defined more than once.", name)
            }
            BuildError::DuplicateSchemaDefinition => {
                write!(f, "Must provide only one schema definition.")
            }
            BuildError::ExtensionOfUnknownType(name) => {
                write!(f, "Cannot extend type \"{}\" because it is not defined.", name)
            }
            BuildError::ExtensionKindMismatch { name, expected } => write!(
                f,
                "Cannot extend type \"{}\": it is defined as {} {}.",
                name,
                article(*expected),
                expected
            ),
            BuildError::UnknownType {
                name,
                referenced_by,
            } => write!(
                f,
                "Type \"{}\" not found in document (referenced by {}).",
                name, referenced_by
            ),
            BuildError::WrongKind {
                name,
                referenced_by,
                expected,
            } => write!(
                f,
                "Type \"{}\" referenced by {} must be {}.",
                name, referenced_by, expected
            ),
            BuildError::MissingQueryType => write!(
                f,
                "Must provide schema definition with query type or a type named Query."
            ),
        }
    }
}

impl std::error::Error for BuildError {}

fn article(kind: TypeKind) -> &'static str {
    match kind {
        TypeKind::Object | TypeKind::Interface | TypeKind::Enum | TypeKind::InputObject => "an",
        TypeKind::Scalar | TypeKind::Union => "a",
    }
}

/// Build and validate a schema
pub fn build_schema(document: &Document<'_, String>) -> Result<Schema, BuildError> {
    let mut types: BTreeMap<String, NamedType> = BTreeMap::new();
    let mut directives: BTreeMap<String, DirectiveDef> = BTreeMap::new();
    let mut roots = None;

    for definition in &document.definitions {
        match definition {
            Definition::TypeDefinition(type_definition) => {
                let named = named_type(type_definition);
                if types.contains_key(&named.name) {
                    return Err(BuildError::DuplicateType(named.name));
                }
                types.insert(named.name.clone(), named);
            }
            Definition::DirectiveDefinition(directive) => {
                let name = directive.name.clone();
                if directives.contains_key(&name) && !REPLACEABLE_DIRECTIVES.contains(&name.as_str())
                {
                    return Err(BuildError::DuplicateDirective(name));
                }
                directives.insert(
                    name.clone(),
                    DirectiveDef {
                        name,
                        description: directive.description.clone(),
                        args: directive.arguments.iter().map(input_value).collect(),
                        locations: directive
                            .locations
                            .iter()
                            .map(|location| location.as_str().to_string())
                            .collect(),
                    },
                );
            }
            Definition::SchemaDefinition(schema) => {
                if roots.is_some() {
                    return Err(BuildError::DuplicateSchemaDefinition);
                }
                roots = Some((
                    schema.query.clone(),
                    schema.mutation.clone(),
                    schema.subscription.clone(),
                ));
            }
            Definition::TypeExtension(_) => {}
        }
    }

    for definition in &document.definitions {
        if let Definition::TypeExtension(extension) = definition {
            apply_extension(&mut types, extension)?;
        }
    }

    for scalar in BUILTIN_SCALARS {
        types
            .entry(scalar.to_string())
            .or_insert_with(|| NamedType::new(scalar, TypeKind::Scalar));
    }
    directives
        .entry("deprecated".to_string())
        .or_insert_with(deprecated_directive);

    let (query_type, mutation_type, subscription_type) = match roots {
        Some(roots) => roots,
        None => {
            let default = |name: &str| types.contains_key(name).then(|| name.to_string());
            (default("Query"), default("Mutation"), default("Subscription"))
        }
    };
    let query_type = query_type.ok_or(BuildError::MissingQueryType)?;

    let schema = Schema {
        query_type,
        mutation_type,
        subscription_type,
        types,
        directives,
    };
    validate(&schema)?;
    Ok(schema)
}

fn deprecated_directive() -> DirectiveDef {
    DirectiveDef {
        name: "deprecated".to_string(),
        description: None,
        args: vec![InputValueDef {
            name: "reason".to_string(),
            description: None,
            ty: TypeRef::Named("String".to_string()),
            default_value: Some(format!("\"{}\"", DEFAULT_DEPRECATION_REASON)),
        }],
        locations: vec!["FIELD_DEFINITION".to_string(), "ENUM_VALUE".to_string()],
    }
}

fn named_type(definition: &TypeDefinition<'_, String>) -> NamedType {
    match definition {
        TypeDefinition::Scalar(scalar) => {
            let mut named = NamedType::new(scalar.name.clone(), TypeKind::Scalar);
            named.description = scalar.description.clone();
            named
        }
        TypeDefinition::Object(object) => {
            let mut named = NamedType::new(object.name.clone(), TypeKind::Object);
            named.description = object.description.clone();
            named.interfaces = object.implements_interfaces.clone();
            named.fields = object.fields.iter().map(field).collect();
            named
        }
        TypeDefinition::Interface(interface) => {
            let mut named = NamedType::new(interface.name.clone(), TypeKind::Interface);
            named.description = interface.description.clone();
            named.fields = interface.fields.iter().map(field).collect();
            named
        }
        TypeDefinition::Union(union) => {
            let mut named = NamedType::new(union.name.clone(), TypeKind::Union);
            named.description = union.description.clone();
            named.possible_types = union.types.clone();
            named
        }
        TypeDefinition::Enum(enum_type) => {
            let mut named = NamedType::new(enum_type.name.clone(), TypeKind::Enum);
            named.description = enum_type.description.clone();
            named.enum_values = enum_type.values.iter().map(enum_value).collect();
            named
        }
        TypeDefinition::InputObject(input) => {
            let mut named = NamedType::new(input.name.clone(), TypeKind::InputObject);
            named.description = input.description.clone();
            named.input_fields = input.fields.iter().map(input_value).collect();
            named
        }
    }
}

fn apply_extension(
    types: &mut BTreeMap<String, NamedType>,
    extension: &TypeExtension<'_, String>,
) -> Result<(), BuildError> {
    let (name, kind) = match extension {
        TypeExtension::Scalar(ext) => (&ext.name, TypeKind::Scalar),
        TypeExtension::Object(ext) => (&ext.name, TypeKind::Object),
        TypeExtension::Interface(ext) => (&ext.name, TypeKind::Interface),
        TypeExtension::Union(ext) => (&ext.name, TypeKind::Union),
        TypeExtension::Enum(ext) => (&ext.name, TypeKind::Enum),
        TypeExtension::InputObject(ext) => (&ext.name, TypeKind::InputObject),
    };
    let base = types
        .get_mut(name)
        .ok_or_else(|| BuildError::ExtensionOfUnknownType(name.clone()))?;
    if base.kind != kind {
        return Err(BuildError::ExtensionKindMismatch {
            name: name.clone(),
            expected: base.kind,
        });
    }

    match extension {
        TypeExtension::Scalar(_) => {}
        TypeExtension::Object(ext) => {
            base.interfaces.extend(ext.implements_interfaces.iter().cloned());
            base.fields.extend(ext.fields.iter().map(field));
        }
        TypeExtension::Interface(ext) => base.fields.extend(ext.fields.iter().map(field)),
        TypeExtension::Union(ext) => base.possible_types.extend(ext.types.iter().cloned()),
        TypeExtension::Enum(ext) => base.enum_values.extend(ext.values.iter().map(enum_value)),
        TypeExtension::InputObject(ext) => {
            base.input_fields.extend(ext.fields.iter().map(input_value))
        }
    }
    Ok(())
}

fn field(field: &Field<'_, String>) -> FieldDef {
    FieldDef {
        name: field.name.clone(),
        description: field.description.clone(),
        args: field.arguments.iter().map(input_value).collect(),
        ty: type_ref(&field.field_type),
        deprecation: deprecation(&field.directives),
    }
}

fn enum_value(value: &EnumValue<'_, String>) -> EnumValueDef {
    EnumValueDef {
        name: value.name.clone(),
        description: value.description.clone(),
        deprecation: deprecation(&value.directives),
    }
}

fn input_value(value: &InputValue<'_, String>) -> InputValueDef {
    InputValueDef {
        name: value.name.clone(),
        description: value.description.clone(),
        ty: type_ref(&value.value_type),
        default_value: value.default_value.as_ref().map(print_value),
    }
}

fn type_ref(ty: &Type<'_, String>) -> TypeRef {
    match ty {
        Type::NamedType(name) => TypeRef::Named(name.clone()),
        Type::ListType(inner) => TypeRef::List(Box::new(type_ref(inner))),
        Type::NonNullType(inner) => TypeRef::NonNull(Box::new(type_ref(inner))),
    }
}

fn deprecation(directives: &[Directive<'_, String>]) -> Option<String> {
    let directive = directives
        .iter()
        .find(|directive| directive.name == "deprecated")?;
    let reason = directive
        .arguments
        .iter()
        .find_map(|(name, value)| match value {
            Value::String(reason) if name == "reason" => Some(reason.clone()),
            _ => None,
        });
    Some(reason.unwrap_or_else(|| DEFAULT_DEPRECATION_REASON.to_string()))
}

/// Print a constant value in GraphQL literal syntax
pub fn print_value(value: &Value<'_, String>) -> String {
    match value {
        Value::Variable(name) => format!("${}", name),
        Value::Int(number) => print_number(number),
        Value::Float(float) => float.to_string(),
        Value::String(string) => super::print::quote(string),
        Value::Boolean(boolean) => boolean.to_string(),
        Value::Null => "null".to_string(),
        Value::Enum(name) => name.clone(),
        Value::List(items) => format!(
            "[{}]",
            items.iter().map(print_value).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(fields) => format!(
            "{{{}}}",
            fields
                .iter()
                .map(|(name, value)| format!("{}: {}", name, print_value(value)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn print_number(number: &Number) -> String {
    number
        .as_i64()
        .map(|n| n.to_string())
        .unwrap_or_else(|| "0".to_string())
}

fn validate(schema: &Schema) -> Result<(), BuildError> {
    let root_names = [
        Some(schema.query_type.as_str()),
        schema.mutation_type.as_deref(),
        schema.subscription_type.as_deref(),
    ];
    for root in root_names.into_iter().flatten() {
        expect_kind(schema, root, "the schema definition", "an object type", |kind| {
            kind == TypeKind::Object
        })?;
    }

    for named in schema.types.values() {
        for interface in &named.interfaces {
            expect_kind(schema, interface, &named.name, "an interface type", |kind| {
                kind == TypeKind::Interface
            })?;
        }
        for member in &named.possible_types {
            expect_kind(schema, member, &named.name, "an object type", |kind| {
                kind == TypeKind::Object
            })?;
        }
        for field in &named.fields {
            let owner = format!("{}.{}", named.name, field.name);
            expect_kind(schema, field.ty.named_type(), &owner, "an output type", |kind| {
                kind.is_output()
            })?;
            for arg in &field.args {
                let owner = format!("{}.{}({}:)", named.name, field.name, arg.name);
                expect_input(schema, arg, &owner)?;
            }
        }
        for input_field in &named.input_fields {
            let owner = format!("{}.{}", named.name, input_field.name);
            expect_input(schema, input_field, &owner)?;
        }
    }

    for directive in schema.directives.values() {
        for arg in &directive.args {
            let owner = format!("@{}({}:)", directive.name, arg.name);
            expect_input(schema, arg, &owner)?;
        }
    }
    Ok(())
}

fn expect_input(schema: &Schema, value: &InputValueDef, owner: &str) -> Result<(), BuildError> {
    expect_kind(schema, value.ty.named_type(), owner, "an input type", |kind| {
        kind.is_input()
    })
}

fn expect_kind(
    schema: &Schema,
    name: &str,
    referenced_by: &str,
    expected: &'static str,
    accepts: impl Fn(TypeKind) -> bool,
) -> Result<(), BuildError> {
    let named = schema
        .types
        .get(name)
        .ok_or_else(|| BuildError::UnknownType {
            name: name.to_string(),
            referenced_by: referenced_by.to_string(),
        })?;
    if accepts(named.kind) {
        Ok(())
    } else {
        Err(BuildError::WrongKind {
            name: name.to_string(),
            referenced_by: referenced_by.to_string(),
            expected,
        })
    }
}
