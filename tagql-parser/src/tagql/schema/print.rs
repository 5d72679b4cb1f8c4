//! SDL printing
//!
//! Output is deterministic: directives first, then types, both sorted by name. Built-in
//! scalars, standard directives and introspection types are left out.

use super::{
    DirectiveDef, EnumValueDef, FieldDef, InputValueDef, NamedType, Schema, TypeKind,
    BUILTIN_SCALARS, DEFAULT_DEPRECATION_REASON, STANDARD_DIRECTIVES,
};

pub fn print_schema(schema: &Schema) -> String {
    let mut blocks = Vec::new();

    if let Some(definition) = schema_definition(schema) {
        blocks.push(definition);
    }
    blocks.extend(
        schema
            .directives()
            .filter(|directive| !STANDARD_DIRECTIVES.contains(&directive.name.as_str()))
            .map(print_directive),
    );
    blocks.extend(
        schema
            .types()
            .filter(|named| !is_builtin(named))
            .map(print_type),
    );

    let mut sdl = blocks.join("\n\n");
    sdl.push('\n');
    sdl
}

fn is_builtin(named: &NamedType) -> bool {
    named.name.starts_with("__")
        || (named.kind == TypeKind::Scalar && BUILTIN_SCALARS.contains(&named.name.as_str()))
}

/// Needed only when rebuilding without it would infer different roots
fn schema_definition(schema: &Schema) -> Option<String> {
    let inferred = |name: &str| schema.type_named(name).map(|named| named.name.clone());
    let conventional = schema.query_type() == "Query"
        && schema.mutation_type().map(str::to_string) == inferred("Mutation")
        && schema.subscription_type().map(str::to_string) == inferred("Subscription");
    if conventional {
        return None;
    }

    let mut out = String::from("schema {\n");
    out.push_str(&format!("  query: {}\n", schema.query_type()));
    if let Some(mutation) = schema.mutation_type() {
        out.push_str(&format!("  mutation: {}\n", mutation));
    }
    if let Some(subscription) = schema.subscription_type() {
        out.push_str(&format!("  subscription: {}\n", subscription));
    }
    out.push('}');
    Some(out)
}

fn print_directive(directive: &DirectiveDef) -> String {
    format!(
        "{}directive @{}{} on {}",
        description(&directive.description, ""),
        directive.name,
        print_args(&directive.args),
        directive.locations.join(" | ")
    )
}

fn print_type(named: &NamedType) -> String {
    let head = description(&named.description, "");
    match named.kind {
        TypeKind::Scalar => format!("{}scalar {}", head, named.name),
        TypeKind::Object | TypeKind::Interface => {
            let keyword = if named.kind == TypeKind::Object {
                "type"
            } else {
                "interface"
            };
            let implements = if named.interfaces.is_empty() {
                String::new()
            } else {
                format!(" implements {}", named.interfaces.join(" & "))
            };
            let body: Vec<String> = named.fields.iter().map(print_field).collect();
            format!("{}{} {}{}{}", head, keyword, named.name, implements, block(&body))
        }
        TypeKind::Union => {
            if named.possible_types.is_empty() {
                format!("{}union {}", head, named.name)
            } else {
                format!("{}union {} = {}", head, named.name, named.possible_types.join(" | "))
            }
        }
        TypeKind::Enum => {
            let body: Vec<String> = named.enum_values.iter().map(print_enum_value).collect();
            format!("{}enum {}{}", head, named.name, block(&body))
        }
        TypeKind::InputObject => {
            let body: Vec<String> = named
                .input_fields
                .iter()
                .map(|field| format!("{}  {}", description(&field.description, "  "), input_value(field)))
                .collect();
            format!("{}input {}{}", head, named.name, block(&body))
        }
    }
}

fn block(lines: &[String]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!(" {{\n{}\n}}", lines.join("\n"))
    }
}

fn print_field(field: &FieldDef) -> String {
    format!(
        "{}  {}{}: {}{}",
        description(&field.description, "  "),
        field.name,
        print_args(&field.args),
        field.ty,
        deprecated(&field.deprecation)
    )
}

fn print_enum_value(value: &EnumValueDef) -> String {
    format!(
        "{}  {}{}",
        description(&value.description, "  "),
        value.name,
        deprecated(&value.deprecation)
    )
}

fn print_args(args: &[InputValueDef]) -> String {
    if args.is_empty() {
        return String::new();
    }
    let args: Vec<String> = args.iter().map(input_value).collect();
    format!("({})", args.join(", "))
}

fn input_value(value: &InputValueDef) -> String {
    match &value.default_value {
        Some(default) => format!("{}: {} = {}", value.name, value.ty, default),
        None => format!("{}: {}", value.name, value.ty),
    }
}

fn deprecated(reason: &Option<String>) -> String {
    match reason.as_deref() {
        None => String::new(),
        Some(DEFAULT_DEPRECATION_REASON) => " @deprecated".to_string(),
        Some(reason) => format!(" @deprecated(reason: {})", quote(reason)),
    }
}

fn description(text: &Option<String>, indent: &str) -> String {
    match text {
        Some(text) => format!("{}{}\n", indent, quote(text)),
        None => String::new(),
    }
}

/// Quote as a single-line GraphQL string
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
