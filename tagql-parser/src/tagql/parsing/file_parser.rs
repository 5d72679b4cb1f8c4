//! Per-directory file parser
//!
//! A [`FileParser`] is built once per base directory: the source transform chain is
//! resolved up front, then every file is read, transformed exactly once and parsed.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{parse_source, CompiledDocument, ParseError, ParseOptions};
use crate::tagql::filter;
use crate::tagql::transforms::{SourceText, SourceTransform, StageRegistry, TransformError};

/// Builds the parser for a base directory
pub type ParserFactory = Arc<dyn Fn(&Path) -> Result<FileParser, TransformError> + Send + Sync>;

/// Reads, transforms and parses host files below one base directory
#[derive(Clone)]
pub struct FileParser {
    base_dir: PathBuf,
    transform: SourceTransform,
    options: ParseOptions,
}

impl FileParser {
    pub fn new(base_dir: impl Into<PathBuf>, transform: SourceTransform, options: ParseOptions) -> Self {
        FileParser {
            base_dir: base_dir.into(),
            transform,
            options,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Parse `filename`, given relative to the base directory or absolute
    ///
    /// Errors are attributed to `filename` as given.
    pub fn parse(&self, filename: &Path) -> Result<CompiledDocument, ParseError> {
        let text = fs::read_to_string(self.base_dir.join(filename)).map_err(|err| ParseError::Io {
            file: filename.to_path_buf(),
            message: err.to_string(),
        })?;
        self.parse_text(filename, text)
    }

    /// Transform and parse text that was already read
    pub fn parse_text(&self, filename: &Path, text: String) -> Result<CompiledDocument, ParseError> {
        let transformed = self.transform.run(SourceText::new(filename, text))?;
        // The pre-filter saw the raw text; a stage may have removed every mention
        if !filter::contains_graphql(&transformed.text) {
            tracing::debug!(file = %filename.display(), "no literals left after transforms");
            return Ok(CompiledDocument {
                path: filename.to_path_buf(),
                definitions: Vec::new(),
            });
        }
        tracing::debug!(file = %filename.display(), "parsing embedded literals");
        parse_source(filename, &transformed.text, &self.options)
    }
}

/// Parser factory for the given stage names
///
/// Stage names are resolved when the factory is called, once per base directory, so an
/// unknown name fails before any file is read.
pub fn get_parser(
    registry: Arc<StageRegistry>,
    stage_names: Vec<String>,
    options: ParseOptions,
) -> ParserFactory {
    Arc::new(move |base_dir: &Path| {
        let transform = registry.build_chain(&stage_names, base_dir)?;
        Ok(FileParser::new(base_dir, transform, options))
    })
}
