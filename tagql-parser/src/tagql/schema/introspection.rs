//! Introspection query results
//!
//! Accepts the full response (`{"data": {"__schema": ...}}`) or the bare `{"__schema": ...}`
//! object. Introspection types (`__Type`, `__Field`, ...) are dropped.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use super::{
    DirectiveDef, EnumValueDef, FieldDef, InputValueDef, NamedType, Schema, SchemaError, TypeKind,
    TypeRef,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionSchema {
    query_type: TypeName,
    #[serde(default)]
    mutation_type: Option<TypeName>,
    #[serde(default)]
    subscription_type: Option<TypeName>,
    types: Vec<FullType>,
    #[serde(default)]
    directives: Vec<IntrospectionDirective>,
}

#[derive(Debug, Deserialize)]
struct TypeName {
    name: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum IntrospectionKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
    List,
    NonNull,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FullType {
    kind: IntrospectionKind,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    fields: Option<Vec<IntrospectionField>>,
    #[serde(default)]
    input_fields: Option<Vec<IntrospectionInputValue>>,
    #[serde(default)]
    interfaces: Option<Vec<TypeName>>,
    #[serde(default)]
    enum_values: Option<Vec<IntrospectionEnumValue>>,
    #[serde(default)]
    possible_types: Option<Vec<TypeName>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionField {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    args: Vec<IntrospectionInputValue>,
    #[serde(rename = "type")]
    ty: IntrospectionTypeRef,
    #[serde(default)]
    is_deprecated: bool,
    #[serde(default)]
    deprecation_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionInputValue {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "type")]
    ty: IntrospectionTypeRef,
    #[serde(default)]
    default_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionEnumValue {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    is_deprecated: bool,
    #[serde(default)]
    deprecation_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionTypeRef {
    kind: IntrospectionKind,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    of_type: Option<Box<IntrospectionTypeRef>>,
}

#[derive(Debug, Deserialize)]
struct IntrospectionDirective {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    locations: Vec<String>,
    #[serde(default)]
    args: Vec<IntrospectionInputValue>,
}

/// Convert an introspection result into a [`Schema`]
///
/// The result is not validated; it is meant to be printed and rebuilt from SDL.
pub fn schema_from_json(json: &str) -> Result<Schema, SchemaError> {
    let value: JsonValue =
        serde_json::from_str(json).map_err(|err| SchemaError::Json(err.to_string()))?;
    let raw = value
        .pointer("/data/__schema")
        .or_else(|| value.get("__schema"))
        .cloned()
        .ok_or_else(|| {
            SchemaError::Introspection("expected a \"__schema\" object at the top level or under \"data\"".into())
        })?;
    let introspection: IntrospectionSchema =
        serde_json::from_value(raw).map_err(|err| SchemaError::Introspection(err.to_string()))?;
    convert(introspection)
}

fn convert(introspection: IntrospectionSchema) -> Result<Schema, SchemaError> {
    let mut types = BTreeMap::new();
    for full_type in introspection.types {
        if full_type.name.starts_with("__") {
            continue;
        }
        let named = named_type(full_type)?;
        types.insert(named.name.clone(), named);
    }

    let directives = introspection
        .directives
        .into_iter()
        .map(|directive| {
            Ok((
                directive.name.clone(),
                DirectiveDef {
                    name: directive.name,
                    description: directive.description,
                    args: input_values(directive.args)?,
                    locations: directive.locations,
                },
            ))
        })
        .collect::<Result<BTreeMap<_, _>, SchemaError>>()?;

    Ok(Schema {
        query_type: introspection.query_type.name,
        mutation_type: introspection.mutation_type.map(|t| t.name),
        subscription_type: introspection.subscription_type.map(|t| t.name),
        types,
        directives,
    })
}

fn named_type(full_type: FullType) -> Result<NamedType, SchemaError> {
    let kind = match full_type.kind {
        IntrospectionKind::Scalar => TypeKind::Scalar,
        IntrospectionKind::Object => TypeKind::Object,
        IntrospectionKind::Interface => TypeKind::Interface,
        IntrospectionKind::Union => TypeKind::Union,
        IntrospectionKind::Enum => TypeKind::Enum,
        IntrospectionKind::InputObject => TypeKind::InputObject,
        IntrospectionKind::List | IntrospectionKind::NonNull => {
            return Err(SchemaError::Introspection(format!(
                "type \"{}\" has a wrapper kind",
                full_type.name
            )))
        }
    };

    let mut named = NamedType::new(full_type.name, kind);
    named.description = full_type.description;
    named.fields = full_type
        .fields
        .unwrap_or_default()
        .into_iter()
        .map(|field| {
            Ok(FieldDef {
                name: field.name,
                description: field.description,
                args: input_values(field.args)?,
                ty: type_ref(field.ty)?,
                deprecation: deprecation(field.is_deprecated, field.deprecation_reason),
            })
        })
        .collect::<Result<Vec<_>, SchemaError>>()?;
    named.input_fields = input_values(full_type.input_fields.unwrap_or_default())?;
    named.interfaces = names(full_type.interfaces);
    named.possible_types = names(full_type.possible_types);
    named.enum_values = full_type
        .enum_values
        .unwrap_or_default()
        .into_iter()
        .map(|value| EnumValueDef {
            name: value.name,
            description: value.description,
            deprecation: deprecation(value.is_deprecated, value.deprecation_reason),
        })
        .collect();
    Ok(named)
}

fn names(types: Option<Vec<TypeName>>) -> Vec<String> {
    types
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.name)
        .collect()
}

fn input_values(values: Vec<IntrospectionInputValue>) -> Result<Vec<InputValueDef>, SchemaError> {
    values
        .into_iter()
        .map(|value| {
            Ok(InputValueDef {
                name: value.name,
                description: value.description,
                ty: type_ref(value.ty)?,
                default_value: value.default_value,
            })
        })
        .collect()
}

fn type_ref(reference: IntrospectionTypeRef) -> Result<TypeRef, SchemaError> {
    match reference.kind {
        IntrospectionKind::List | IntrospectionKind::NonNull => {
            let inner = reference.of_type.ok_or_else(|| {
                SchemaError::Introspection("wrapper type without \"ofType\"".into())
            })?;
            let inner = Box::new(type_ref(*inner)?);
            Ok(match reference.kind {
                IntrospectionKind::List => TypeRef::List(inner),
                _ => TypeRef::NonNull(inner),
            })
        }
        _ => reference
            .name
            .map(TypeRef::Named)
            .ok_or_else(|| SchemaError::Introspection("named type reference without \"name\"".into())),
    }
}

fn deprecation(is_deprecated: bool, reason: Option<String>) -> Option<String> {
    is_deprecated.then(|| reason.unwrap_or_else(|| super::DEFAULT_DEPRECATION_REASON.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTROSPECTION: &str = r#"{
      "data": {
        "__schema": {
          "queryType": { "name": "Query" },
          "mutationType": null,
          "subscriptionType": null,
          "types": [
            {
              "kind": "OBJECT",
              "name": "Query",
              "description": null,
              "fields": [
                {
                  "name": "user",
                  "description": "Look up a user",
                  "args": [
                    {
                      "name": "id",
                      "description": null,
                      "type": { "kind": "NON_NULL", "name": null, "ofType": { "kind": "SCALAR", "name": "ID", "ofType": null } },
                      "defaultValue": null
                    }
                  ],
                  "type": { "kind": "OBJECT", "name": "User", "ofType": null },
                  "isDeprecated": false,
                  "deprecationReason": null
                }
              ],
              "inputFields": null,
              "interfaces": [],
              "enumValues": null,
              "possibleTypes": null
            },
            {
              "kind": "OBJECT",
              "name": "User",
              "description": null,
              "fields": [
                {
                  "name": "name",
                  "description": null,
                  "args": [],
                  "type": { "kind": "SCALAR", "name": "String", "ofType": null },
                  "isDeprecated": true,
                  "deprecationReason": null
                }
              ],
              "inputFields": null,
              "interfaces": [],
              "enumValues": null,
              "possibleTypes": null
            },
            { "kind": "SCALAR", "name": "ID", "description": null },
            { "kind": "SCALAR", "name": "String", "description": null },
            { "kind": "OBJECT", "name": "__Schema", "description": null, "fields": [] }
          ],
          "directives": [
            { "name": "skip", "description": null, "locations": ["FIELD"], "args": [] }
          ]
        }
      }
    }"#;

    #[test]
    fn test_full_response() {
        let schema = schema_from_json(INTROSPECTION).unwrap();
        assert_eq!(schema.query_type(), "Query");
        assert!(schema.type_named("__Schema").is_none());

        let user = schema.type_named("Query").unwrap().field("user").unwrap();
        assert_eq!(user.description.as_deref(), Some("Look up a user"));
        assert_eq!(user.args[0].ty.to_string(), "ID!");

        let name = schema.type_named("User").unwrap().field("name").unwrap();
        assert_eq!(name.deprecation.as_deref(), Some("No longer supported"));
    }

    #[test]
    fn test_bare_schema_object() {
        let bare = r#"{"__schema": {"queryType": {"name": "Q"}, "types": [
            {"kind": "OBJECT", "name": "Q", "fields": [
                {"name": "n", "args": [], "type": {"kind": "SCALAR", "name": "Int"}}
            ]}
        ]}}"#;
        let schema = schema_from_json(bare).unwrap();
        assert_eq!(schema.query_type(), "Q");
    }

    #[test]
    fn test_missing_schema_key() {
        let err = schema_from_json(r#"{"data": {}}"#).unwrap_err();
        assert!(matches!(err, SchemaError::Introspection(_)));
    }

    #[test]
    fn test_wrapper_without_of_type() {
        let bad = r#"{"__schema": {"queryType": {"name": "Q"}, "types": [
            {"kind": "OBJECT", "name": "Q", "fields": [
                {"name": "n", "args": [], "type": {"kind": "LIST", "name": null}}
            ]}
        ]}}"#;
        assert!(matches!(
            schema_from_json(bad),
            Err(SchemaError::Introspection(_))
        ));
    }
}
