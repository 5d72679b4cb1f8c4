//! Schema loading
//!
//! A schema arrives either as SDL text or as the JSON result of an introspection query.
//! Both end up as the same normalized [`Schema`]:
//!
//! ```text
//! .json ──► introspection ──► Schema ──► SDL ─┐
//!                                              ├─► + @include/@skip ──► parse ──► build ──► Schema
//! .graphql ───────────────────────────────────┘
//! ```
//!
//! The two standard directives are always prepended because documents may use them even
//! when the server's schema doesn't declare them. Every failure along the way is reported
//! as one [`SchemaLoadError`] carrying the path and the underlying detail.

pub mod build;
pub mod introspection;
pub mod print;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub use build::{build_schema, BuildError};

/// Declarations prepended to every schema before parsing
pub const STANDARD_DIRECTIVES_SDL: &str = "directive @include(if: Boolean) on FRAGMENT | FIELD\n\
                                           directive @skip(if: Boolean) on FRAGMENT | FIELD\n";

/// Scalars every schema has, declared or not
pub const BUILTIN_SCALARS: [&str; 5] = ["Boolean", "Float", "ID", "Int", "String"];

/// Directives every schema has; omitted when printing
pub const STANDARD_DIRECTIVES: [&str; 3] = ["deprecated", "include", "skip"];

/// Reason recorded for `@deprecated` without an explicit reason
pub const DEFAULT_DEPRECATION_REASON: &str = "No longer supported";

/// Reference to a type, with list and non-null wrappers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// The innermost named type
    pub fn named_type(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.named_type(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{}", name),
            TypeRef::List(inner) => write!(f, "[{}]", inner),
            TypeRef::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl TypeKind {
    /// Can values of this kind be passed as arguments?
    pub fn is_input(&self) -> bool {
        matches!(self, TypeKind::Scalar | TypeKind::Enum | TypeKind::InputObject)
    }

    /// Can fields return this kind?
    pub fn is_output(&self) -> bool {
        !matches!(self, TypeKind::InputObject)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeKind::Scalar => "scalar",
            TypeKind::Object => "object",
            TypeKind::Interface => "interface",
            TypeKind::Union => "union",
            TypeKind::Enum => "enum",
            TypeKind::InputObject => "input object",
        };
        write!(f, "{}", name)
    }
}

/// Argument or input object field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputValueDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    /// Default value in GraphQL literal syntax
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub description: Option<String>,
    pub args: Vec<InputValueDef>,
    pub ty: TypeRef,
    /// Deprecation reason, if deprecated
    pub deprecation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValueDef {
    pub name: String,
    pub description: Option<String>,
    pub deprecation: Option<String>,
}

/// A named type. Only the members matching `kind` are populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedType {
    pub name: String,
    pub description: Option<String>,
    pub kind: TypeKind,
    /// Object and interface fields
    pub fields: Vec<FieldDef>,
    /// Interfaces implemented by an object
    pub interfaces: Vec<String>,
    /// Union members
    pub possible_types: Vec<String>,
    pub enum_values: Vec<EnumValueDef>,
    pub input_fields: Vec<InputValueDef>,
}

impl NamedType {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        NamedType {
            name: name.into(),
            description: None,
            kind,
            fields: Vec::new(),
            interfaces: Vec::new(),
            possible_types: Vec::new(),
            enum_values: Vec::new(),
            input_fields: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveDef {
    pub name: String,
    pub description: Option<String>,
    pub args: Vec<InputValueDef>,
    /// Location names as written in SDL, e.g. `FIELD`
    pub locations: Vec<String>,
}

/// A fully built type system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub(crate) query_type: String,
    pub(crate) mutation_type: Option<String>,
    pub(crate) subscription_type: Option<String>,
    pub(crate) types: BTreeMap<String, NamedType>,
    pub(crate) directives: BTreeMap<String, DirectiveDef>,
}

impl Schema {
    /// Parse and build SDL text as is, without the standard directive prelude
    pub fn from_sdl(sdl: &str) -> Result<Schema, SchemaError> {
        let document = graphql_parser::parse_schema::<String>(sdl)
            .map_err(|err| SchemaError::Syntax(err.to_string()))?;
        Ok(build_schema(&document)?)
    }

    /// Build a schema from the JSON result of an introspection query
    pub fn from_introspection(json: &str) -> Result<Schema, SchemaError> {
        introspection::schema_from_json(json)
    }

    pub fn query_type(&self) -> &str {
        &self.query_type
    }

    pub fn mutation_type(&self) -> Option<&str> {
        self.mutation_type.as_deref()
    }

    pub fn subscription_type(&self) -> Option<&str> {
        self.subscription_type.as_deref()
    }

    pub fn type_named(&self, name: &str) -> Option<&NamedType> {
        self.types.get(name)
    }

    /// All types, built-in scalars included, sorted by name
    pub fn types(&self) -> impl Iterator<Item = &NamedType> {
        self.types.values()
    }

    pub fn directive(&self, name: &str) -> Option<&DirectiveDef> {
        self.directives.get(name)
    }

    pub fn directives(&self) -> impl Iterator<Item = &DirectiveDef> {
        self.directives.values()
    }

    /// Print as SDL, leaving out built-in scalars and standard directives
    pub fn to_sdl(&self) -> String {
        print::print_schema(self)
    }
}

/// Underlying reason a schema failed to load
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaError {
    Io(String),
    Json(String),
    Introspection(String),
    Syntax(String),
    Build(BuildError),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Io(msg) => write!(f, "IO error: {}", msg),
            SchemaError::Json(msg) => write!(f, "Invalid JSON: {}", msg),
            SchemaError::Introspection(msg) => write!(f, "Invalid introspection result: {}", msg),
            SchemaError::Syntax(msg) => write!(f, "{}", msg),
            SchemaError::Build(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for SchemaError {}

impl From<BuildError> for SchemaError {
    fn from(err: BuildError) -> Self {
        SchemaError::Build(err)
    }
}

/// Failure of [load_schema], with the file it concerns
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaLoadError {
    pub path: PathBuf,
    pub error: SchemaError,
}

impl fmt::Display for SchemaLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error loading schema. Expected the schema to be a .graphql or a .json\n\
             file, describing your GraphQL server's API. Error detail:\n\n{}: {}",
            self.path.display(),
            self.error
        )
    }
}

impl std::error::Error for SchemaLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Is `path` an introspection result rather than SDL?
pub fn is_introspection_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

/// Read, normalize and build the schema at `path`
pub fn load_schema(path: &Path) -> Result<Schema, SchemaLoadError> {
    let wrap = |error: SchemaError| SchemaLoadError {
        path: path.to_path_buf(),
        error,
    };

    let source = fs::read_to_string(path).map_err(|err| wrap(SchemaError::Io(err.to_string())))?;
    let sdl = if is_introspection_path(path) {
        Schema::from_introspection(&source).map_err(wrap)?.to_sdl()
    } else {
        source
    };

    let schema = Schema::from_sdl(&with_standard_directives(&sdl)).map_err(wrap)?;
    tracing::debug!(
        path = %path.display(),
        types = schema.types.len(),
        "loaded schema"
    );
    Ok(schema)
}

/// Prepend the `@include` and `@skip` declarations
pub fn with_standard_directives(sdl: &str) -> String {
    format!("{}\n{}", STANDARD_DIRECTIVES_SDL, sdl)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SDL: &str = "type Query { me: User }\ntype User { id: ID! name: String }\n";

    fn write_schema(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_adds_standard_directives() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema(dir.path(), "schema.graphql", SDL);

        let schema = load_schema(&path).unwrap();
        assert!(schema.directive("include").is_some());
        assert!(schema.directive("skip").is_some());
        assert_eq!(schema.directive("skip").unwrap().locations, vec!["FRAGMENT", "FIELD"]);
        assert_eq!(schema.query_type(), "Query");
    }

    #[test]
    fn test_load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema(dir.path(), "schema.graphql", SDL);

        let first = load_schema(&path).unwrap();
        let second = load_schema(&path).unwrap();
        assert_eq!(first.to_sdl(), second.to_sdl());
        assert_eq!(first, second);
    }

    #[test]
    fn test_schema_may_declare_standard_directives_itself() {
        let dir = tempfile::tempdir().unwrap();
        let sdl = format!("{}{}", STANDARD_DIRECTIVES_SDL, SDL);
        let path = write_schema(dir.path(), "schema.graphql", &sdl);
        assert!(load_schema(&path).is_ok());
    }

    #[test]
    fn test_missing_file_is_wrapped() {
        let err = load_schema(Path::new("/definitely/not/here.graphql")).unwrap_err();
        assert!(matches!(err.error, SchemaError::Io(_)));
        let message = err.to_string();
        assert!(message.starts_with("Error loading schema."));
        assert!(message.contains("/definitely/not/here.graphql"));
    }

    #[test]
    fn test_syntax_error_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema(dir.path(), "schema.graphql", "type Query {");
        let err = load_schema(&path).unwrap_err();
        assert!(matches!(err.error, SchemaError::Syntax(_)));
    }

    #[test]
    fn test_malformed_json_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema(dir.path(), "schema.json", "{ not json");
        let err = load_schema(&path).unwrap_err();
        assert!(matches!(err.error, SchemaError::Json(_)));
    }

    #[test]
    fn test_type_ref_display() {
        let ty = TypeRef::NonNull(Box::new(TypeRef::List(Box::new(TypeRef::NonNull(Box::new(
            TypeRef::Named("ID".into()),
        ))))));
        assert_eq!(ty.to_string(), "[ID!]!");
        assert_eq!(ty.named_type(), "ID");
    }
}
