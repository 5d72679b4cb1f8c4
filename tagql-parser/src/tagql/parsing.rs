//! Literal validation and GraphQL parsing
//!
//! Turns the literals of one host file into a [`CompiledDocument`]. For each literal, in
//! order:
//!
//! 1. the tag must be `graphql` or `graphql.experimental`
//! 2. fragment variable directives (`@arguments`, `@argumentDefinitions`) are only allowed
//!    in `graphql.experimental` literals
//! 3. the body must parse as GraphQL and declare at least one definition
//!
//! Definitions of all literals are concatenated in source order. Any violation aborts the
//! file; there is no partial output.

pub mod file_parser;
pub mod validation;

use graphql_parser::query::{Definition, OperationDefinition};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::tagql::extract::{self, EmbeddedTag, ExtractError, SourceLocation};
use crate::tagql::filter;
use crate::tagql::transforms::TransformError;

pub use file_parser::{get_parser, FileParser, ParserFactory};

static ERROR_POSITION: Lazy<Regex> = Lazy::new(|| Regex::new(r"at (\d+):(\d+)").unwrap());

/// The two accepted tag spellings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// graphql``
    Primary,
    /// graphql.experimental``
    Experimental,
}

impl TagKind {
    pub fn from_tag(tag: &str) -> Option<TagKind> {
        match tag {
            "graphql" => Some(TagKind::Primary),
            "graphql.experimental" => Some(TagKind::Experimental),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::Primary => "graphql",
            TagKind::Experimental => "graphql.experimental",
        }
    }
}

/// How fragment variable directives are detected in primary literals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FragmentVariableCheck {
    /// Pattern match on the raw literal text, before parsing. Also trips on the directive
    /// names inside strings and comments.
    #[default]
    Lexical,
    /// Look at the directives of the parsed definitions
    Structural,
}

/// Knobs for [parse_source]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub fragment_variables: FragmentVariableCheck,
}

/// All definitions found in one host file
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDocument {
    pub path: PathBuf,
    pub definitions: Vec<Definition<'static, String>>,
}

impl CompiledDocument {
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Names of the fragment definitions, in order
    pub fn fragment_names(&self) -> Vec<&str> {
        self.definitions
            .iter()
            .filter_map(|definition| match definition {
                Definition::Fragment(fragment) => Some(fragment.name.as_str()),
                Definition::Operation(_) => None,
            })
            .collect()
    }

    /// Names of the named operations, in order
    pub fn operation_names(&self) -> Vec<&str> {
        self.definitions
            .iter()
            .filter_map(|definition| match definition {
                Definition::Operation(OperationDefinition::Query(q)) => q.name.as_deref(),
                Definition::Operation(OperationDefinition::Mutation(m)) => m.name.as_deref(),
                Definition::Operation(OperationDefinition::Subscription(s)) => s.name.as_deref(),
                _ => None,
            })
            .collect()
    }
}

/// Errors raised while turning a host file into a document
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// A file without the keyword reached the parser. This is a bug in the caller, which
    /// should have run the pre-filter, never a problem with the file itself.
    Unfiltered { file: PathBuf },
    /// The host file could not be read
    Io { file: PathBuf, message: String },
    /// The source transform chain failed
    Transform(TransformError),
    Extraction(ExtractError),
    InvalidTag { file: PathBuf, tag: String },
    FragmentVariables { file: PathBuf, template: String },
    /// `location` is the error position in the host file
    Syntax {
        file: PathBuf,
        location: SourceLocation,
        message: String,
    },
    MissingDefinition { file: PathBuf, template: String },
}

impl ParseError {
    /// True for integration bugs, false for problems in user sources
    pub fn is_internal(&self) -> bool {
        matches!(self, ParseError::Unfiltered { .. })
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Unfiltered { file } => write!(
                f,
                "Internal error: files should be filtered before they are passed to the \
                 parser, got unfiltered file `{}`.",
                file.display()
            ),
            ParseError::Io { file, message } => {
                write!(f, "Failed to read {}: {}", file.display(), message)
            }
            ParseError::Transform(err) => write!(f, "Transform error: {}", err),
            ParseError::Extraction(err) => write!(f, "{}", err),
            ParseError::InvalidTag { file, tag } => write!(
                f,
                "Invalid tag {} in {}. Expected graphql`` (common case) or \
                 graphql.experimental`` (if using experimental directives).",
                tag,
                file.display()
            ),
            ParseError::FragmentVariables { file, template } => write!(
                f,
                "Unexpected use of fragment variables in {}: @arguments and \
                 @argumentDefinitions are only supported in graphql.experimental literals. \
                 Source: {}",
                file.display(),
                template
            ),
            ParseError::Syntax {
                file,
                location,
                message,
            } => write!(
                f,
                "GraphQL syntax error in {} at {}: {}",
                file.display(),
                location,
                message
            ),
            ParseError::MissingDefinition { file, template } => write!(
                f,
                "Expected GraphQL text in {} to contain at least one definition (fragment, \
                 mutation, query, subscription), got `{}`.",
                file.display(),
                template
            ),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<ExtractError> for ParseError {
    fn from(err: ExtractError) -> Self {
        ParseError::Extraction(err)
    }
}

impl From<TransformError> for ParseError {
    fn from(err: TransformError) -> Self {
        ParseError::Transform(err)
    }
}

/// Extract and parse every literal of an already transformed host file
pub fn parse_source(
    file: &Path,
    text: &str,
    options: &ParseOptions,
) -> Result<CompiledDocument, ParseError> {
    if !filter::contains_graphql(text) {
        return Err(ParseError::Unfiltered {
            file: file.to_path_buf(),
        });
    }
    let tags = extract::memoized_find(text, file)?;
    parse_tags(file, &tags, options)
}

/// Validate and parse literals that were already extracted from `file`
pub fn parse_tags(
    file: &Path,
    tags: &[EmbeddedTag],
    options: &ParseOptions,
) -> Result<CompiledDocument, ParseError> {
    let mut definitions = Vec::new();
    for tag in tags {
        definitions.extend(parse_tag(file, tag, options)?);
    }
    Ok(CompiledDocument {
        path: file.to_path_buf(),
        definitions,
    })
}

fn parse_tag(
    file: &Path,
    tag: &EmbeddedTag,
    options: &ParseOptions,
) -> Result<Vec<Definition<'static, String>>, ParseError> {
    let kind = TagKind::from_tag(&tag.tag).ok_or_else(|| ParseError::InvalidTag {
        file: file.to_path_buf(),
        tag: tag.tag.clone(),
    })?;

    let fragment_variables_rejected = || ParseError::FragmentVariables {
        file: file.to_path_buf(),
        template: tag.body.clone(),
    };

    if kind == TagKind::Primary
        && options.fragment_variables == FragmentVariableCheck::Lexical
        && validation::mentions_fragment_variables(&tag.body)
    {
        return Err(fragment_variables_rejected());
    }

    let missing_definition = || ParseError::MissingDefinition {
        file: file.to_path_buf(),
        template: tag.body.clone(),
    };

    if validation::is_blank_document(&tag.body) {
        return Err(missing_definition());
    }

    let document = graphql_parser::parse_query::<String>(&tag.body)
        .map_err(|err| {
            let message = err.to_string();
            ParseError::Syntax {
                file: file.to_path_buf(),
                location: error_location(tag, &message),
                message,
            }
        })?
        .into_static();

    if kind == TagKind::Primary
        && options.fragment_variables == FragmentVariableCheck::Structural
        && document
            .definitions
            .iter()
            .any(validation::uses_fragment_variables)
    {
        return Err(fragment_variables_rejected());
    }

    if document.definitions.is_empty() {
        return Err(missing_definition());
    }

    Ok(document.definitions)
}

/// Map the body-relative position in a graphql-parser message onto the host file
fn error_location(tag: &EmbeddedTag, message: &str) -> SourceLocation {
    ERROR_POSITION
        .captures(message)
        .and_then(|captures| {
            let line = captures[1].parse().ok()?;
            let column = captures[2].parse().ok()?;
            Some(tag.location.within(&tag.body, line, column))
        })
        .unwrap_or(tag.location)
}
