//! Watch expressions
//!
//! A [`WatchExpression`] describes which files the continuous build cares about: regular
//! files with one of the configured extensions, outside of the excluded directories.
//! It serializes to the watchman query syntax (`["allof", ["type", "f"], ...]`) so it can
//! be handed to a watchman subscription unchanged, and [`WatchMatcher`] evaluates it
//! locally for the built-in runner.

use globset::{GlobBuilder, GlobMatcher};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::fmt;
use std::path::Path;

/// Directories never watched: dependencies, mocks, tests and generated output
pub const DEFAULT_EXCLUSIONS: [&str; 4] = [
    "**/node_modules/**",
    "**/__mocks__/**",
    "**/__tests__/**",
    "**/__generated__/**",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

impl FileType {
    /// Watchman's one-letter code
    pub fn code(&self) -> &'static str {
        match self {
            FileType::File => "f",
            FileType::Directory => "d",
            FileType::Symlink => "l",
        }
    }

    pub fn of(file_type: std::fs::FileType) -> FileType {
        if file_type.is_symlink() {
            FileType::Symlink
        } else if file_type.is_dir() {
            FileType::Directory
        } else {
            FileType::File
        }
    }
}

/// What a `match` term is applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScope {
    /// The file name only
    Basename,
    /// The path relative to the watch root
    Wholename,
}

impl MatchScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchScope::Basename => "basename",
            MatchScope::Wholename => "wholename",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchExpression {
    AllOf(Vec<WatchExpression>),
    AnyOf(Vec<WatchExpression>),
    Not(Box<WatchExpression>),
    Type(FileType),
    /// File extension without the dot, compared case-insensitively
    Suffix(String),
    Match { pattern: String, scope: MatchScope },
}

impl Serialize for WatchExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            WatchExpression::AllOf(terms) | WatchExpression::AnyOf(terms) => {
                let name = if matches!(self, WatchExpression::AllOf(_)) {
                    "allof"
                } else {
                    "anyof"
                };
                let mut seq = serializer.serialize_seq(Some(terms.len() + 1))?;
                seq.serialize_element(name)?;
                for term in terms {
                    seq.serialize_element(term)?;
                }
                seq.end()
            }
            WatchExpression::Not(term) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element("not")?;
                seq.serialize_element(term.as_ref())?;
                seq.end()
            }
            WatchExpression::Type(file_type) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element("type")?;
                seq.serialize_element(file_type.code())?;
                seq.end()
            }
            WatchExpression::Suffix(suffix) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element("suffix")?;
                seq.serialize_element(suffix)?;
                seq.end()
            }
            WatchExpression::Match { pattern, scope } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element("match")?;
                seq.serialize_element(pattern)?;
                seq.serialize_element(scope.as_str())?;
                seq.end()
            }
        }
    }
}

/// Regular files with one of `extensions`, outside every `exclusions` glob
pub fn build_watch_expression<E: AsRef<str>, X: AsRef<str>>(
    extensions: &[E],
    exclusions: &[X],
) -> WatchExpression {
    let mut terms = vec![
        WatchExpression::Type(FileType::File),
        WatchExpression::AnyOf(
            extensions
                .iter()
                .map(|ext| WatchExpression::Suffix(ext.as_ref().trim_start_matches('.').to_string()))
                .collect(),
        ),
    ];
    terms.extend(exclusions.iter().map(|pattern| {
        WatchExpression::Not(Box::new(WatchExpression::Match {
            pattern: pattern.as_ref().to_string(),
            scope: MatchScope::Wholename,
        }))
    }));
    WatchExpression::AllOf(terms)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchError {
    pub pattern: String,
    pub message: String,
}

impl fmt::Display for WatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid watch pattern \"{}\": {}", self.pattern, self.message)
    }
}

impl std::error::Error for WatchError {}

/// A [`WatchExpression`] with its globs compiled
#[derive(Debug, Clone)]
pub enum WatchMatcher {
    AllOf(Vec<WatchMatcher>),
    AnyOf(Vec<WatchMatcher>),
    Not(Box<WatchMatcher>),
    Type(FileType),
    Suffix(String),
    Match { glob: GlobMatcher, scope: MatchScope },
}

impl WatchExpression {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn matcher(&self) -> Result<WatchMatcher, WatchError> {
        Ok(match self {
            WatchExpression::AllOf(terms) => WatchMatcher::AllOf(
                terms.iter().map(|t| t.matcher()).collect::<Result<_, _>>()?,
            ),
            WatchExpression::AnyOf(terms) => WatchMatcher::AnyOf(
                terms.iter().map(|t| t.matcher()).collect::<Result<_, _>>()?,
            ),
            WatchExpression::Not(term) => WatchMatcher::Not(Box::new(term.matcher()?)),
            WatchExpression::Type(file_type) => WatchMatcher::Type(*file_type),
            WatchExpression::Suffix(suffix) => WatchMatcher::Suffix(suffix.clone()),
            WatchExpression::Match { pattern, scope } => {
                let glob = GlobBuilder::new(pattern)
                    .literal_separator(*scope == MatchScope::Wholename)
                    .build()
                    .map_err(|err| WatchError {
                        pattern: pattern.clone(),
                        message: err.to_string(),
                    })?;
                WatchMatcher::Match {
                    glob: glob.compile_matcher(),
                    scope: *scope,
                }
            }
        })
    }

    /// Evaluate against a path relative to the watch root
    ///
    /// Compiles the globs on every call; use [`WatchExpression::matcher`] for repeated
    /// evaluation.
    pub fn matches(&self, relative_path: &Path, file_type: FileType) -> Result<bool, WatchError> {
        Ok(self.matcher()?.matches(relative_path, file_type))
    }
}

impl WatchMatcher {
    pub fn matches(&self, relative_path: &Path, file_type: FileType) -> bool {
        match self {
            WatchMatcher::AllOf(terms) => terms.iter().all(|t| t.matches(relative_path, file_type)),
            WatchMatcher::AnyOf(terms) => terms.iter().any(|t| t.matches(relative_path, file_type)),
            WatchMatcher::Not(term) => !term.matches(relative_path, file_type),
            WatchMatcher::Type(expected) => *expected == file_type,
            WatchMatcher::Suffix(suffix) => relative_path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(suffix)),
            WatchMatcher::Match { glob, scope } => match scope {
                MatchScope::Wholename => glob.is_match(relative_path),
                MatchScope::Basename => relative_path
                    .file_name()
                    .is_some_and(|name| glob.is_match(Path::new(name))),
            },
        }
    }
}
