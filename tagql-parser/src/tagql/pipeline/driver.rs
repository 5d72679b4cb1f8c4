//! Precondition checks and configuration assembly

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use super::config::{
    ExtraContentRegistry, ParserConfig, ParserConfigs, WriterConfig, WriterConfigs,
    WriterFactory, WriterSettings, DEFAULT_PIPELINE,
};
use super::{find_watch_root, PipelineOptions};
use crate::tagql::filter::file_filter;
use crate::tagql::parsing::{get_parser, ParseOptions};
use crate::tagql::runner::{Orchestrator, RunError, SummaryWriter, Writer};
use crate::tagql::schema::load_schema;
use crate::tagql::transforms::{StageRegistry, TransformError};
use crate::tagql::watch::build_watch_expression;

/// Configuration problems found before any file is scanned, and failures of the run
#[derive(Debug, Clone, PartialEq)]
pub enum DriverError {
    SchemaNotFound(PathBuf),
    SourceNotFound(PathBuf),
    NoWatchRoot { src: PathBuf, markers: Vec<String> },
    UnknownExtraContentGenerator(String),
    Transform(TransformError),
    Run(RunError),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::SchemaNotFound(path) => {
                write!(f, "--schema path does not exist: {}.", path.display())
            }
            DriverError::SourceNotFound(path) => {
                write!(f, "--source path does not exist: {}.", path.display())
            }
            DriverError::NoWatchRoot { src, markers } => {
                writeln!(
                    f,
                    "--watch requires that the src directory have a valid watchman \"root\" file.\n"
                )?;
                writeln!(f, "Root files can include:")?;
                for marker in markers {
                    writeln!(f, "- {}", describe_marker(marker))?;
                }
                write!(
                    f,
                    "\nEnsure that one such file exists in {} or its parents.",
                    src.display()
                )
            }
            DriverError::UnknownExtraContentGenerator(name) => write!(
                f,
                "Got \"{}\" for generate extra content. Should be one of the registered generators.",
                name
            ),
            DriverError::Transform(err) => write!(f, "{}", err),
            DriverError::Run(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<TransformError> for DriverError {
    fn from(err: TransformError) -> Self {
        DriverError::Transform(err)
    }
}

impl From<RunError> for DriverError {
    fn from(err: RunError) -> Self {
        DriverError::Run(err)
    }
}

fn describe_marker(marker: &str) -> String {
    match marker {
        ".git" => "A .git/ Git folder".to_string(),
        ".hg" => "A .hg/ Mercurial folder".to_string(),
        ".watchmanconfig" => "A .watchmanconfig file".to_string(),
        other => format!("A {} file or folder", other),
    }
}

/// Validates options, builds the configs and delegates to an orchestrator
pub struct Driver {
    orchestrator: Box<dyn Orchestrator>,
    stages: Arc<StageRegistry>,
    extra_content: ExtraContentRegistry,
    writer: WriterFactory,
}

impl Driver {
    /// Driver with the built-in stages, generators and [`SummaryWriter`]
    pub fn new(orchestrator: Box<dyn Orchestrator>) -> Self {
        Driver {
            orchestrator,
            stages: Arc::new(StageRegistry::with_defaults()),
            extra_content: ExtraContentRegistry::with_defaults(),
            writer: Arc::new(|settings: &WriterSettings| {
                Box::new(SummaryWriter::new(settings.clone())) as Box<dyn Writer>
            }),
        }
    }

    pub fn with_stages(mut self, stages: StageRegistry) -> Self {
        self.stages = Arc::new(stages);
        self
    }

    pub fn with_extra_content(mut self, extra_content: ExtraContentRegistry) -> Self {
        self.extra_content = extra_content;
        self
    }

    pub fn with_writer(mut self, writer: WriterFactory) -> Self {
        self.writer = writer;
        self
    }

    /// Check preconditions in order, then build the `default` parser and writer configs
    ///
    /// Paths in `options` are expected to be resolved already.
    pub fn configure(
        &self,
        options: &PipelineOptions,
    ) -> Result<(ParserConfigs, WriterConfigs), DriverError> {
        if !options.schema.exists() {
            return Err(DriverError::SchemaNotFound(options.schema.clone()));
        }
        if !options.src.exists() {
            return Err(DriverError::SourceNotFound(options.src.clone()));
        }
        if options.watch {
            let root = find_watch_root(&options.src, &options.watch_root_markers).ok_or_else(|| {
                DriverError::NoWatchRoot {
                    src: options.src.clone(),
                    markers: options.watch_root_markers.clone(),
                }
            })?;
            tracing::debug!(root = %root.display(), "found watch root");
        }

        let extra_content = match &options.extra_content_generator {
            Some(name) => Some(
                self.extra_content
                    .resolve(name)
                    .ok_or_else(|| DriverError::UnknownExtraContentGenerator(name.clone()))?,
            ),
            None => None,
        };

        // Resolve stage names now so a typo fails before the first pass
        self.stages.build_chain(&options.transforms, &options.src)?;

        let schema_path = options.schema.clone();
        let parser = ParserConfig {
            base_dir: options.src.clone(),
            file_filter: file_filter(&options.src),
            parser: get_parser(
                self.stages.clone(),
                options.transforms.clone(),
                ParseOptions {
                    fragment_variables: options.fragment_variables,
                },
            ),
            schema: Arc::new(move || load_schema(&schema_path)),
            watch_expression: build_watch_expression(&options.extensions, &options.exclusions),
        };
        let writer = WriterConfig {
            parser: DEFAULT_PIPELINE.to_string(),
            settings: WriterSettings {
                base_dir: options.src.clone(),
                output_dir: options.output_dir.clone(),
                output_extension: options.output_extension.clone(),
                compiler_transforms: options.compiler_transforms.clone(),
                extra_content,
            },
            writer: self.writer.clone(),
        };

        Ok((
            BTreeMap::from([(DEFAULT_PIPELINE.to_string(), parser)]),
            BTreeMap::from([(DEFAULT_PIPELINE.to_string(), writer)]),
        ))
    }

    /// One pass, or continuous mode when `options.watch` is set
    pub fn run(&self, options: &PipelineOptions) -> Result<(), DriverError> {
        let (parsers, writers) = self.configure(options)?;
        if options.watch {
            self.orchestrator.watch_all(&parsers, &writers)?;
        } else {
            let summary = self.orchestrator.compile_all(&parsers, &writers)?;
            for (name, report) in &summary.reports {
                tracing::info!(
                    writer = %name,
                    documents = report.documents,
                    definitions = report.definitions,
                    "compiled"
                );
            }
        }
        Ok(())
    }
}
