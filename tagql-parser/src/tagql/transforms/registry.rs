//! Named source stage registry
//!
//! Maps stage names (as given on the command line or in `tagql.toml`) to factories. A factory
//! receives the parser's base directory once and returns the stage used for every file.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::stages;
use super::{NamedStage, SourceTransform, TextStage, TransformError};

/// `base dir -> (filename, text) -> text`
pub type StageFactory = Arc<dyn Fn(&Path) -> TextStage + Send + Sync>;

struct RegisteredStage {
    description: String,
    factory: StageFactory,
}

/// Registry of source stages
#[derive(Default)]
pub struct StageRegistry {
    stages: HashMap<String, RegisteredStage>,
}

impl StageRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        StageRegistry {
            stages: HashMap::new(),
        }
    }

    /// Create registry with the built-in stages
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            "strip-bom",
            "Drop a leading byte order mark",
            Arc::new(|_: &Path| Arc::new(|_: &Path, text: &str| stages::strip_bom(text)) as TextStage),
        );
        registry.register(
            "normalize-newlines",
            "Rewrite CRLF and CR line endings to LF",
            Arc::new(|_: &Path| {
                Arc::new(|_: &Path, text: &str| stages::normalize_newlines(text)) as TextStage
            }),
        );
        registry.register(
            "vue-script",
            "Keep only <script> blocks of single file components, preserving line numbers",
            Arc::new(|_: &Path| Arc::new(|_: &Path, text: &str| stages::vue_script(text)) as TextStage),
        );
        registry
    }

    /// Register a stage, replacing any previous stage with the same name
    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        factory: StageFactory,
    ) {
        self.stages.insert(
            name.into(),
            RegisteredStage {
                description: description.into(),
                factory,
            },
        );
    }

    /// Look up a factory by name
    pub fn resolve(&self, name: &str) -> Result<&StageFactory, TransformError> {
        self.stages
            .get(name)
            .map(|stage| &stage.factory)
            .ok_or_else(|| TransformError::UnknownStage(name.to_string()))
    }

    /// Check if a stage exists
    pub fn has(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    /// Stage names and descriptions, sorted by name
    pub fn list_all(&self) -> Vec<(&str, &str)> {
        let mut all: Vec<_> = self
            .stages
            .iter()
            .map(|(name, stage)| (name.as_str(), stage.description.as_str()))
            .collect();
        all.sort();
        all
    }

    /// Compose the named stages, left to right, into one chain for `base_dir`
    ///
    /// Every name is resolved before anything is built, so a typo in the last name is
    /// reported even when earlier names are fine.
    pub fn build_chain<S: AsRef<str>>(
        &self,
        names: &[S],
        base_dir: &Path,
    ) -> Result<SourceTransform, TransformError> {
        let factories = names
            .iter()
            .map(|name| Ok((name.as_ref(), self.resolve(name.as_ref())?)))
            .collect::<Result<Vec<_>, TransformError>>()?;

        let chain = factories
            .into_iter()
            .fold(SourceTransform::identity(), |chain, (name, factory)| {
                chain.then(NamedStage::new(name, factory(base_dir)))
            });
        Ok(chain)
    }
}
