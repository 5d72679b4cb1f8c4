//! Parser and writer configurations handed to the orchestrator

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::tagql::filter::FileFilter;
use crate::tagql::parsing::ParserFactory;
use crate::tagql::runner::Writer;
use crate::tagql::schema::{Schema, SchemaLoadError};
use crate::tagql::watch::WatchExpression;

/// Name of the single pipeline the driver configures
pub const DEFAULT_PIPELINE: &str = "default";

/// Loads the schema; called by the orchestrator once per pass
pub type SchemaAccessor = Arc<dyn Fn() -> Result<Schema, SchemaLoadError> + Send + Sync>;

/// How to find and parse the documents of one source tree
#[derive(Clone)]
pub struct ParserConfig {
    pub base_dir: PathBuf,
    pub file_filter: FileFilter,
    pub parser: ParserFactory,
    pub schema: SchemaAccessor,
    pub watch_expression: WatchExpression,
}

impl fmt::Debug for ParserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserConfig")
            .field("base_dir", &self.base_dir)
            .field("watch_expression", &self.watch_expression)
            .finish_non_exhaustive()
    }
}

pub type ParserConfigs = BTreeMap<String, ParserConfig>;

/// Data passed to an extra content generator for one generated artifact
#[derive(Debug, Clone, Copy)]
pub struct ExtraContentContext<'a> {
    /// Fragment or operation name
    pub definition_name: &'a str,
    /// Host file the definition came from, relative to the base directory
    pub source: &'a Path,
    /// Where the artifact would be written
    pub output_path: &'a Path,
}

/// Produces additional text appended to a generated artifact
pub type ExtraContentGenerator = Arc<dyn Fn(&ExtraContentContext<'_>) -> Option<String> + Send + Sync>;

/// Output options for one writer
#[derive(Clone)]
pub struct WriterSettings {
    pub base_dir: PathBuf,
    /// Single directory for every artifact; next to the source in `__generated__` if unset
    pub output_dir: Option<PathBuf>,
    pub output_extension: String,
    pub compiler_transforms: Vec<String>,
    pub extra_content: Option<ExtraContentGenerator>,
}

impl fmt::Debug for WriterSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterSettings")
            .field("base_dir", &self.base_dir)
            .field("output_dir", &self.output_dir)
            .field("output_extension", &self.output_extension)
            .field("compiler_transforms", &self.compiler_transforms)
            .field("extra_content", &self.extra_content.is_some())
            .finish()
    }
}

/// Creates a fresh writer for each pass
pub type WriterFactory = Arc<dyn Fn(&WriterSettings) -> Box<dyn Writer> + Send + Sync>;

/// A writer bound to the parser config it consumes
#[derive(Clone)]
pub struct WriterConfig {
    /// Key into the parser configs
    pub parser: String,
    pub settings: WriterSettings,
    pub writer: WriterFactory,
}

impl WriterConfig {
    pub fn build_writer(&self) -> Box<dyn Writer> {
        (self.writer)(&self.settings)
    }
}

impl fmt::Debug for WriterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterConfig")
            .field("parser", &self.parser)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

pub type WriterConfigs = BTreeMap<String, WriterConfig>;

struct RegisteredGenerator {
    description: String,
    generator: ExtraContentGenerator,
}

/// Named extra content generators, resolved once when the driver starts
#[derive(Default)]
pub struct ExtraContentRegistry {
    generators: HashMap<String, RegisteredGenerator>,
}

impl ExtraContentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in generators
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            "source-banner",
            "Comment naming the definition and the file it was extracted from",
            Arc::new(|context: &ExtraContentContext<'_>| {
                Some(format!(
                    "// {} was extracted from {}",
                    context.definition_name,
                    context.source.display()
                ))
            }),
        );
        registry
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        generator: ExtraContentGenerator,
    ) {
        self.generators.insert(
            name.into(),
            RegisteredGenerator {
                description: description.into(),
                generator,
            },
        );
    }

    pub fn resolve(&self, name: &str) -> Option<ExtraContentGenerator> {
        self.generators
            .get(name)
            .map(|registered| registered.generator.clone())
    }

    pub fn has(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    /// Names and descriptions, sorted by name
    pub fn list_all(&self) -> Vec<(&str, &str)> {
        let mut all: Vec<_> = self
            .generators
            .iter()
            .map(|(name, registered)| (name.as_str(), registered.description.as_str()))
            .collect();
        all.sort();
        all
    }
}
