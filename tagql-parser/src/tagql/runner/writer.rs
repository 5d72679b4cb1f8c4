//! Writers consume the documents of one pass
//!
//! Code generation is not part of this crate. [`SummaryWriter`] validates the documents
//! against the schema and plans the artifacts a generator would produce, without writing
//! anything.

use graphql_parser::query::{Definition, OperationDefinition, TypeCondition};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::tagql::parsing::CompiledDocument;
use crate::tagql::pipeline::{ExtraContentContext, WriterSettings};
use crate::tagql::schema::Schema;

/// Directory holding artifacts next to their source when no output directory is set
pub const GENERATED_DIR: &str = "__generated__";

pub trait Writer {
    fn write_all(
        &mut self,
        schema: &Schema,
        documents: &[CompiledDocument],
    ) -> Result<WriteReport, WriterError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterError {
    AnonymousOperation { file: PathBuf },
    DuplicateDefinition {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
    UnknownType {
        file: PathBuf,
        definition: String,
        type_name: String,
    },
    MissingRootType {
        file: PathBuf,
        definition: String,
        operation: &'static str,
    },
}

impl fmt::Display for WriterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriterError::AnonymousOperation { file } => write!(
                f,
                "{}: operations must be named to generate an artifact for them",
                file.display()
            ),
            WriterError::DuplicateDefinition {
                name,
                first,
                second,
            } => write!(
                f,
                "Definition \"{}\" is declared in both {} and {}",
                name,
                first.display(),
                second.display()
            ),
            WriterError::UnknownType {
                file,
                definition,
                type_name,
            } => write!(
                f,
                "{}: \"{}\" refers to unknown type \"{}\"",
                file.display(),
                definition,
                type_name
            ),
            WriterError::MissingRootType {
                file,
                definition,
                operation,
            } => write!(
                f,
                "{}: \"{}\" is a {} but the schema has no {} type",
                file.display(),
                definition,
                operation,
                operation
            ),
        }
    }
}

impl std::error::Error for WriterError {}

/// An artifact a generator would write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOutput {
    pub definition: String,
    pub source: PathBuf,
    pub path: PathBuf,
    pub extra_content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub documents: usize,
    pub definitions: usize,
    pub outputs: Vec<PlannedOutput>,
}

/// Validates and plans, generates nothing
pub struct SummaryWriter {
    settings: WriterSettings,
}

impl SummaryWriter {
    pub fn new(settings: WriterSettings) -> Self {
        SummaryWriter { settings }
    }

    /// Where the artifact for `definition` extracted from `source` goes
    pub fn output_path(&self, source: &Path, definition: &str) -> PathBuf {
        let file_name = format!("{}.graphql.{}", definition, self.settings.output_extension);
        match &self.settings.output_dir {
            Some(dir) => dir.join(file_name),
            None => {
                let source_dir = source.parent().unwrap_or_else(|| Path::new(""));
                self.settings
                    .base_dir
                    .join(source_dir)
                    .join(GENERATED_DIR)
                    .join(file_name)
            }
        }
    }
}

impl Writer for SummaryWriter {
    fn write_all(
        &mut self,
        schema: &Schema,
        documents: &[CompiledDocument],
    ) -> Result<WriteReport, WriterError> {
        let mut report = WriteReport::default();
        let mut seen: HashMap<String, PathBuf> = HashMap::new();

        for document in documents {
            report.documents += 1;
            for definition in &document.definitions {
                report.definitions += 1;
                let name = check_definition(schema, &document.path, definition)?;
                if let Some(first) = seen.insert(name.clone(), document.path.clone()) {
                    return Err(WriterError::DuplicateDefinition {
                        name,
                        first,
                        second: document.path.clone(),
                    });
                }

                let path = self.output_path(&document.path, &name);
                let extra_content = self.settings.extra_content.as_ref().and_then(|generate| {
                    generate(&ExtraContentContext {
                        definition_name: &name,
                        source: &document.path,
                        output_path: &path,
                    })
                });
                report.outputs.push(PlannedOutput {
                    definition: name,
                    source: document.path.clone(),
                    path,
                    extra_content,
                });
            }
        }

        tracing::info!(
            documents = report.documents,
            definitions = report.definitions,
            transforms = ?self.settings.compiler_transforms,
            "validated documents"
        );
        Ok(report)
    }
}

/// Name of the definition, once its type references check out
fn check_definition(
    schema: &Schema,
    file: &Path,
    definition: &Definition<'static, String>,
) -> Result<String, WriterError> {
    let (name, root, operation) = match definition {
        Definition::Fragment(fragment) => {
            let TypeCondition::On(type_name) = &fragment.type_condition;
            if schema.type_named(type_name).is_none() {
                return Err(WriterError::UnknownType {
                    file: file.to_path_buf(),
                    definition: fragment.name.clone(),
                    type_name: type_name.clone(),
                });
            }
            return Ok(fragment.name.clone());
        }
        Definition::Operation(OperationDefinition::SelectionSet(_)) => {
            return Err(WriterError::AnonymousOperation {
                file: file.to_path_buf(),
            })
        }
        Definition::Operation(OperationDefinition::Query(query)) => {
            (query.name.clone(), Some(schema.query_type()), "query")
        }
        Definition::Operation(OperationDefinition::Mutation(mutation)) => {
            (mutation.name.clone(), schema.mutation_type(), "mutation")
        }
        Definition::Operation(OperationDefinition::Subscription(subscription)) => (
            subscription.name.clone(),
            schema.subscription_type(),
            "subscription",
        ),
    };

    let name = name.ok_or_else(|| WriterError::AnonymousOperation {
        file: file.to_path_buf(),
    })?;
    if root.is_none() {
        return Err(WriterError::MissingRootType {
            file: file.to_path_buf(),
            definition: name,
            operation,
        });
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagql::parsing::{parse_source, ParseOptions};
    use std::sync::Arc;

    fn schema() -> Schema {
        Schema::from_sdl("type Query { me: User } type User { id: ID }").unwrap()
    }

    fn settings() -> WriterSettings {
        WriterSettings {
            base_dir: PathBuf::from("/repo/src"),
            output_dir: None,
            output_extension: "js".into(),
            compiler_transforms: vec![],
            extra_content: None,
        }
    }

    fn document(path: &str, source: &str) -> CompiledDocument {
        parse_source(Path::new(path), source, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn test_plans_outputs_next_to_sources() {
        let docs = vec![document(
            "components/App.js",
            "graphql`query AppQuery { me { ...App_user } }`; graphql`fragment App_user on User { id }`",
        )];
        let report = SummaryWriter::new(settings()).write_all(&schema(), &docs).unwrap();

        assert_eq!(report.documents, 1);
        assert_eq!(report.definitions, 2);
        assert_eq!(
            report.outputs[0].path,
            PathBuf::from("/repo/src/components/__generated__/AppQuery.graphql.js")
        );
        assert_eq!(report.outputs[1].definition, "App_user");
    }

    #[test]
    fn test_output_dir_and_extra_content() {
        let mut settings = settings();
        settings.output_dir = Some(PathBuf::from("/repo/out"));
        settings.output_extension = "ts".into();
        settings.extra_content = Some(Arc::new(|context: &ExtraContentContext<'_>| {
            Some(format!("// {}", context.definition_name))
        }));

        let docs = vec![document("a.js", "graphql`fragment A on User { id }`")];
        let report = SummaryWriter::new(settings).write_all(&schema(), &docs).unwrap();
        assert_eq!(report.outputs[0].path, PathBuf::from("/repo/out/A.graphql.ts"));
        assert_eq!(report.outputs[0].extra_content.as_deref(), Some("// A"));
    }

    #[test]
    fn test_duplicate_definition() {
        let docs = vec![
            document("a.js", "graphql`fragment A on User { id }`"),
            document("b.js", "graphql`fragment A on User { id }`"),
        ];
        let err = SummaryWriter::new(settings()).write_all(&schema(), &docs).unwrap_err();
        assert_eq!(
            err,
            WriterError::DuplicateDefinition {
                name: "A".into(),
                first: "a.js".into(),
                second: "b.js".into(),
            }
        );
    }

    #[test]
    fn test_unknown_type_condition() {
        let docs = vec![document("a.js", "graphql`fragment A on Viewer { id }`")];
        let err = SummaryWriter::new(settings()).write_all(&schema(), &docs).unwrap_err();
        assert!(matches!(err, WriterError::UnknownType { ref type_name, .. } if type_name == "Viewer"));
    }

    #[test]
    fn test_mutation_without_mutation_root() {
        let docs = vec![document("a.js", "graphql`mutation M { me { id } }`")];
        let err = SummaryWriter::new(settings()).write_all(&schema(), &docs).unwrap_err();
        assert!(matches!(err, WriterError::MissingRootType { operation: "mutation", .. }));
    }

    #[test]
    fn test_anonymous_operation() {
        let docs = vec![document("a.js", "graphql`{ me { id } }`")];
        let err = SummaryWriter::new(settings()).write_all(&schema(), &docs).unwrap_err();
        assert_eq!(err, WriterError::AnonymousOperation { file: "a.js".into() });
    }
}
