//! Shared configuration loader for the tagql compiler.
//!
//! `defaults/tagql.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer a project `tagql.toml` and
//! command line overrides on top of those defaults via [`Loader`] before
//! deserializing into [`TagqlConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tagql_parser::tagql::parsing::FragmentVariableCheck;
use tagql_parser::tagql::pipeline::PipelineOptions;

const DEFAULT_TOML: &str = include_str!("../defaults/tagql.default.toml");

/// Project configuration file looked up in the working directory
pub const PROJECT_FILE: &str = "tagql.toml";

/// Top-level configuration consumed by tagql applications.
#[derive(Debug, Clone, Deserialize)]
pub struct TagqlConfig {
    pub compiler: CompilerConfig,
    pub parsing: ParsingConfig,
    pub watch: WatchConfig,
}

/// What to scan and how artifacts are named.
#[derive(Debug, Clone, Deserialize)]
pub struct CompilerConfig {
    pub extensions: Vec<String>,
    pub output_extension: String,
    pub transforms: Vec<String>,
    pub compiler_transforms: Vec<String>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub extra_content_generator: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParsingConfig {
    pub fragment_variables: FragmentVariableCheck,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    pub exclusions: Vec<String>,
    pub root_markers: Vec<String>,
    pub debounce_ms: u64,
}

impl TagqlConfig {
    /// Pipeline options for `schema` and `src`, not yet resolved against a directory
    pub fn pipeline_options(
        &self,
        schema: impl Into<PathBuf>,
        src: impl Into<PathBuf>,
        watch: bool,
    ) -> PipelineOptions {
        let mut options = PipelineOptions::new(schema, src);
        options.extensions = self.compiler.extensions.clone();
        options.output_extension = self.compiler.output_extension.clone();
        options.transforms = self.compiler.transforms.clone();
        options.compiler_transforms = self.compiler.compiler_transforms.clone();
        options.output_dir = self.compiler.output_dir.clone();
        options.extra_content_generator = self.compiler.extra_content_generator.clone();
        options.watch = watch;
        options.fragment_variables = self.parsing.fragment_variables;
        options.exclusions = self.watch.exclusions.clone();
        options.watch_root_markers = self.watch.root_markers.clone();
        options
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<TagqlConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<TagqlConfig, ConfigError> {
    Loader::new().build()
}
