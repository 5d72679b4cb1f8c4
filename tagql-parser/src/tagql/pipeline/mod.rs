//! Pipeline driver
//!
//! Ties the pieces together for one invocation of the compiler:
//!
//! 1. **Options** - [`PipelineOptions`] resolved against the working directory
//! 2. **Preconditions** - schema and source paths exist, and a watch root exists when
//!    watching
//! 3. **Configuration** - one parser config and one writer config, both named `default`
//! 4. **Delegation** - [`Orchestrator::compile_all`] or [`Orchestrator::watch_all`]
//!
//! # Usage
//!
//! ```rust
//! use tagql_parser::tagql::pipeline::{Driver, PipelineOptions};
//! use tagql_parser::tagql::runner::CodegenRunner;
//!
//! let options = PipelineOptions::new("schema.graphql", "src").resolve(&std::env::current_dir().unwrap());
//! let driver = Driver::new(Box::new(CodegenRunner::new()));
//! driver.run(&options).unwrap();
//! ```
//!
//! [`Orchestrator::compile_all`]: crate::tagql::runner::Orchestrator::compile_all
//! [`Orchestrator::watch_all`]: crate::tagql::runner::Orchestrator::watch_all

use std::path::{Component, Path, PathBuf};

use crate::tagql::parsing::FragmentVariableCheck;
use crate::tagql::watch::DEFAULT_EXCLUSIONS;

pub mod config;
pub mod driver;
pub use config::{
    ExtraContentContext, ExtraContentGenerator, ExtraContentRegistry, ParserConfig, ParserConfigs,
    SchemaAccessor, WriterConfig, WriterConfigs, WriterFactory, WriterSettings, DEFAULT_PIPELINE,
};
pub use driver::{Driver, DriverError};

/// Files and directories that make a directory a valid watch root
pub const WATCH_ROOT_MARKERS: [&str; 3] = [".git", ".hg", ".watchmanconfig"];

/// Everything one invocation needs to know
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub schema: PathBuf,
    pub src: PathBuf,
    /// Host file extensions to scan, without the dot
    pub extensions: Vec<String>,
    pub output_extension: String,
    /// Source transform stage names, applied in order
    pub transforms: Vec<String>,
    /// Compiler transform groups handed to the writer
    pub compiler_transforms: Vec<String>,
    pub output_dir: Option<PathBuf>,
    pub extra_content_generator: Option<String>,
    pub watch: bool,
    pub fragment_variables: FragmentVariableCheck,
    /// Directory globs never scanned or watched
    pub exclusions: Vec<String>,
    pub watch_root_markers: Vec<String>,
}

impl PipelineOptions {
    pub fn new(schema: impl Into<PathBuf>, src: impl Into<PathBuf>) -> Self {
        PipelineOptions {
            schema: schema.into(),
            src: src.into(),
            extensions: vec!["js".to_string()],
            output_extension: "js".to_string(),
            transforms: Vec::new(),
            compiler_transforms: Vec::new(),
            output_dir: None,
            extra_content_generator: None,
            watch: false,
            fragment_variables: FragmentVariableCheck::default(),
            exclusions: DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
            watch_root_markers: WATCH_ROOT_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Make every path absolute, relative to `cwd`
    pub fn resolve(mut self, cwd: &Path) -> Self {
        self.schema = resolve_path(cwd, &self.schema);
        self.src = resolve_path(cwd, &self.src);
        self.output_dir = self.output_dir.map(|dir| resolve_path(cwd, &dir));
        self
    }
}

/// `cwd.join(path)` with `.` and `..` folded away, without touching the filesystem
pub fn resolve_path(cwd: &Path, path: &Path) -> PathBuf {
    let joined = cwd.join(path);
    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    resolved
}

/// First directory, from `src` upwards, containing one of `markers`
///
/// The filesystem root itself is never a watch root.
pub fn find_watch_root<S: AsRef<str>>(src: &Path, markers: &[S]) -> Option<PathBuf> {
    let mut dir = src.canonicalize().unwrap_or_else(|_| src.to_path_buf());
    loop {
        let parent = dir.parent().map(Path::to_path_buf)?;
        if markers.iter().any(|marker| dir.join(marker.as_ref()).exists()) {
            return Some(dir);
        }
        dir = parent;
    }
}
