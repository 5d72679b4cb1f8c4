//! Built-in orchestrator
//!
//! [`CodegenRunner`] is a small local stand-in for an incremental build system. A pass
//! walks each parser config's base directory, keeps the files its watch expression and
//! pre-filter accept, parses them, loads the schema and hands everything to the writers
//! bound to that parser. The first error aborts the pass.
//!
//! In continuous mode every relevant file change triggers a fresh pass. A failing pass is
//! logged and the runner keeps waiting for the next change.

use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::tagql::parsing::{CompiledDocument, ParseError};
use crate::tagql::pipeline::{ParserConfig, ParserConfigs, WriterConfigs};
use crate::tagql::schema::SchemaLoadError;
use crate::tagql::transforms::TransformError;
use crate::tagql::watch::{FileType, WatchError};

#[cfg(feature = "watch")]
mod watching;
pub mod writer;
pub use writer::{PlannedOutput, SummaryWriter, WriteReport, Writer, WriterError};

/// Runs the configured pipelines once or continuously
pub trait Orchestrator {
    fn compile_all(
        &self,
        parsers: &ParserConfigs,
        writers: &WriterConfigs,
    ) -> Result<RunSummary, RunError>;

    /// Runs until the process is stopped or watching fails
    fn watch_all(&self, parsers: &ParserConfigs, writers: &WriterConfigs) -> Result<(), RunError>;
}

/// Reports of one pass, keyed by writer name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub reports: BTreeMap<String, WriteReport>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    UnknownParser { writer: String, parser: String },
    Transform(TransformError),
    Filter { file: PathBuf, message: String },
    Parse(ParseError),
    Schema(SchemaLoadError),
    Watch(WatchError),
    Writer(WriterError),
    Notify(String),
    WatchUnsupported,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::UnknownParser { writer, parser } => write!(
                f,
                "Writer \"{}\" refers to unknown parser \"{}\"",
                writer, parser
            ),
            RunError::Transform(err) => write!(f, "{}", err),
            RunError::Filter { file, message } => {
                write!(f, "Could not read {}: {}", file.display(), message)
            }
            RunError::Parse(err) => write!(f, "{}", err),
            RunError::Schema(err) => write!(f, "{}", err),
            RunError::Watch(err) => write!(f, "{}", err),
            RunError::Writer(err) => write!(f, "{}", err),
            RunError::Notify(msg) => write!(f, "Watching failed: {}", msg),
            RunError::WatchUnsupported => {
                write!(f, "This build was compiled without the `watch` feature")
            }
        }
    }
}

impl std::error::Error for RunError {}

impl From<TransformError> for RunError {
    fn from(err: TransformError) -> Self {
        RunError::Transform(err)
    }
}

impl From<ParseError> for RunError {
    fn from(err: ParseError) -> Self {
        RunError::Parse(err)
    }
}

impl From<SchemaLoadError> for RunError {
    fn from(err: SchemaLoadError) -> Self {
        RunError::Schema(err)
    }
}

impl From<WatchError> for RunError {
    fn from(err: WatchError) -> Self {
        RunError::Watch(err)
    }
}

impl From<WriterError> for RunError {
    fn from(err: WriterError) -> Self {
        RunError::Writer(err)
    }
}

/// Walks, parses and hands documents to writers
#[derive(Debug, Clone)]
pub struct CodegenRunner {
    /// Quiet period after a change before a pass starts, in milliseconds
    debounce_ms: u64,
}

impl Default for CodegenRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CodegenRunner {
    pub fn new() -> Self {
        CodegenRunner { debounce_ms: 100 }
    }

    pub fn with_debounce(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// Parse every candidate file of one parser config, in path order
    ///
    /// Files without any literal are left out.
    pub fn parse_all(&self, config: &ParserConfig) -> Result<Vec<CompiledDocument>, RunError> {
        let parser = (config.parser)(&config.base_dir)?;
        let mut documents = Vec::new();
        for file in candidate_files(config)? {
            let document = parser.parse(&file)?;
            if !document.is_empty() {
                documents.push(document);
            }
        }
        Ok(documents)
    }
}

/// Files below the base directory accepted by the watch expression and the pre-filter,
/// relative to the base directory and sorted
pub fn candidate_files(config: &ParserConfig) -> Result<Vec<PathBuf>, RunError> {
    let matcher = config.watch_expression.matcher()?;
    let mut files = Vec::new();

    for entry in WalkBuilder::new(&config.base_dir).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        let Some(file_type) = entry.file_type().map(FileType::of) else {
            continue;
        };
        let relative = relative_to(&config.base_dir, entry.path());
        if relative.as_os_str().is_empty() || !matcher.matches(&relative, file_type) {
            continue;
        }
        let keep = (config.file_filter)(&relative).map_err(|err| RunError::Filter {
            file: relative.clone(),
            message: err.to_string(),
        })?;
        if keep {
            files.push(relative);
        }
    }

    files.sort();
    Ok(files)
}

fn relative_to(base: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(base).unwrap_or(path).to_path_buf()
}

impl Orchestrator for CodegenRunner {
    fn compile_all(
        &self,
        parsers: &ParserConfigs,
        writers: &WriterConfigs,
    ) -> Result<RunSummary, RunError> {
        let mut summary = RunSummary::default();
        for (name, writer_config) in writers {
            let parser_config =
                parsers
                    .get(&writer_config.parser)
                    .ok_or_else(|| RunError::UnknownParser {
                        writer: name.clone(),
                        parser: writer_config.parser.clone(),
                    })?;

            let schema = (parser_config.schema)()?;
            let documents = self.parse_all(parser_config)?;
            tracing::info!(
                writer = %name,
                base_dir = %parser_config.base_dir.display(),
                documents = documents.len(),
                "parsed documents"
            );

            let report = writer_config.build_writer().write_all(&schema, &documents)?;
            summary.reports.insert(name.clone(), report);
        }
        Ok(summary)
    }

    #[cfg(feature = "watch")]
    fn watch_all(&self, parsers: &ParserConfigs, writers: &WriterConfigs) -> Result<(), RunError> {
        watching::watch(self, parsers, writers, self.debounce_ms)
    }

    #[cfg(not(feature = "watch"))]
    fn watch_all(&self, _parsers: &ParserConfigs, _writers: &WriterConfigs) -> Result<(), RunError> {
        Err(RunError::WatchUnsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagql::filter::file_filter;
    use crate::tagql::parsing::{get_parser, ParseOptions};
    use crate::tagql::pipeline::{WriterConfig, WriterSettings, DEFAULT_PIPELINE};
    use crate::tagql::schema::load_schema;
    use crate::tagql::transforms::StageRegistry;
    use crate::tagql::watch::{build_watch_expression, DEFAULT_EXCLUSIONS};
    use std::fs;
    use std::sync::Arc;

    fn configs(dir: &Path) -> (ParserConfigs, WriterConfigs) {
        let schema_path = dir.join("schema.graphql");
        let src = dir.join("src");
        let parser = ParserConfig {
            base_dir: src.clone(),
            file_filter: file_filter(&src),
            parser: get_parser(
                Arc::new(StageRegistry::with_defaults()),
                vec![],
                ParseOptions::default(),
            ),
            schema: Arc::new(move || load_schema(&schema_path)),
            watch_expression: build_watch_expression(&["js"], &DEFAULT_EXCLUSIONS),
        };
        let writer = WriterConfig {
            parser: DEFAULT_PIPELINE.to_string(),
            settings: WriterSettings {
                base_dir: src,
                output_dir: None,
                output_extension: "js".into(),
                compiler_transforms: vec![],
                extra_content: None,
            },
            writer: Arc::new(|settings: &WriterSettings| {
                Box::new(SummaryWriter::new(settings.clone())) as Box<dyn Writer>
            }),
        };
        (
            BTreeMap::from([(DEFAULT_PIPELINE.to_string(), parser)]),
            BTreeMap::from([(DEFAULT_PIPELINE.to_string(), writer)]),
        )
    }

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("schema.graphql"),
            "type Query { me: User } type User { id: ID }",
        )
        .unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("components")).unwrap();
        fs::create_dir_all(src.join("__generated__")).unwrap();
        fs::write(
            src.join("components/User.js"),
            "export default graphql`fragment User_user on User { id }`;",
        )
        .unwrap();
        fs::write(src.join("plain.js"), "export const answer = 42;").unwrap();
        fs::write(src.join("notes.md"), "graphql`fragment Md on User { id }`").unwrap();
        fs::write(
            src.join("__generated__/Old.graphql.js"),
            "graphql`fragment Old on User { id }`",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_candidate_files() {
        let dir = project();
        let (parsers, _) = configs(dir.path());
        let files = candidate_files(&parsers[DEFAULT_PIPELINE]).unwrap();
        assert_eq!(files, vec![PathBuf::from("components/User.js")]);
    }

    #[test]
    fn test_compile_all() {
        let dir = project();
        let (parsers, writers) = configs(dir.path());
        let summary = CodegenRunner::new().compile_all(&parsers, &writers).unwrap();

        let report = &summary.reports[DEFAULT_PIPELINE];
        assert_eq!(report.documents, 1);
        assert_eq!(report.outputs[0].definition, "User_user");
    }

    #[test]
    fn test_first_error_aborts_the_pass() {
        let dir = project();
        fs::write(
            dir.path().join("src/broken.js"),
            "graphql`fragment Broken on User {`",
        )
        .unwrap();
        let (parsers, writers) = configs(dir.path());
        let err = CodegenRunner::new().compile_all(&parsers, &writers).unwrap_err();
        assert!(matches!(err, RunError::Parse(ParseError::Syntax { .. })));
    }

    #[test]
    fn test_template_only_mention_does_not_fail_the_pass() {
        let dir = project();
        let src = dir.path().join("src");
        fs::write(
            src.join("Ok.vue"),
            "<template><div/></template>\n<script>\nexport default graphql`fragment Ok_user on User { id }`;\n</script>\n",
        )
        .unwrap();
        fs::write(
            src.join("Docs.vue"),
            "<template><p>Learn graphql</p></template>\n<script>\nexport default {};\n</script>\n",
        )
        .unwrap();

        let (mut parsers, _) = configs(dir.path());
        if let Some(parser) = parsers.get_mut(DEFAULT_PIPELINE) {
            parser.parser = get_parser(
                Arc::new(StageRegistry::with_defaults()),
                vec!["vue-script".into()],
                ParseOptions::default(),
            );
            parser.watch_expression = build_watch_expression(&["vue"], &DEFAULT_EXCLUSIONS);
        }

        let config = &parsers[DEFAULT_PIPELINE];
        assert_eq!(
            candidate_files(config).unwrap(),
            vec![PathBuf::from("Docs.vue"), PathBuf::from("Ok.vue")]
        );
        let documents = CodegenRunner::new().parse_all(config).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].path, PathBuf::from("Ok.vue"));
        assert_eq!(documents[0].fragment_names(), vec!["Ok_user"]);
    }

    #[test]
    fn test_unknown_parser() {
        let dir = project();
        let (parsers, mut writers) = configs(dir.path());
        if let Some(writer) = writers.get_mut(DEFAULT_PIPELINE) {
            writer.parser = "other".into();
        }
        let err = CodegenRunner::new().compile_all(&parsers, &writers).unwrap_err();
        assert_eq!(
            err,
            RunError::UnknownParser {
                writer: DEFAULT_PIPELINE.into(),
                parser: "other".into()
            }
        );
    }
}
