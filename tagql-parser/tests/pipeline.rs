//! End-to-end runs of the driver against small projects on disk

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tagql_parser::tagql::parsing::{FragmentVariableCheck, ParseError};
use tagql_parser::tagql::pipeline::{Driver, DriverError, PipelineOptions, DEFAULT_PIPELINE};
use tagql_parser::tagql::runner::{CodegenRunner, Orchestrator, RunError};
use tagql_parser::tagql::transforms::{StageRegistry, TextStage};

const SCHEMA: &str = "type Query { me: User }\ntype User { id: ID name: String }\n";

struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("schema.graphql"), SCHEMA).unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        Project { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, relative: &str, contents: &str) -> &Self {
        let path = self.root().join("src").join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
        self
    }

    fn options(&self) -> PipelineOptions {
        PipelineOptions::new("schema.graphql", "src").resolve(self.root())
    }
}

fn parse_project(
    driver: &Driver,
    options: &PipelineOptions,
) -> Result<Vec<tagql_parser::tagql::parsing::CompiledDocument>, RunError> {
    let (parsers, _) = driver.configure(options).unwrap();
    CodegenRunner::new().parse_all(&parsers[DEFAULT_PIPELINE])
}

fn driver() -> Driver {
    Driver::new(Box::new(CodegenRunner::new()))
}

#[test]
fn single_fragment_yields_one_document() {
    let project = Project::new();
    project.write("User.js", "export default graphql`fragment F on User { id }`;\n");

    let documents = parse_project(&driver(), &project.options()).unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].path, PathBuf::from("User.js"));
    assert_eq!(documents[0].definitions.len(), 1);
    assert_eq!(documents[0].fragment_names(), vec!["F"]);

    driver().run(&project.options()).unwrap();
}

#[test]
fn experimental_tag_allows_fragment_arguments() {
    let body = "fragment F on User @argumentDefinitions(size: {type: \"Int\"}) { id }";

    let project = Project::new();
    project.write("User.js", &format!("graphql.experimental`{}`;\n", body));
    let documents = parse_project(&driver(), &project.options()).unwrap();
    assert_eq!(documents[0].fragment_names(), vec!["F"]);

    let project = Project::new();
    project.write("User.js", &format!("graphql`{}`;\n", body));
    let err = parse_project(&driver(), &project.options()).unwrap_err();
    match err {
        RunError::Parse(ParseError::FragmentVariables { file, template }) => {
            assert_eq!(file, PathBuf::from("User.js"));
            assert_eq!(template, body);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn structural_check_ignores_directive_names_in_strings() {
    let project = Project::new();
    project.write(
        "Search.js",
        "graphql`query SearchQuery { me { name(format: \"@arguments\") } }`;\n",
    );
    let mut options = project.options();

    assert!(parse_project(&driver(), &options).is_err());
    options.fragment_variables = FragmentVariableCheck::Structural;
    assert!(parse_project(&driver(), &options).is_ok());
}

#[test]
fn empty_literal_is_missing_definition() {
    let project = Project::new();
    project.write("Empty.js", "graphql`  # nothing here\n`;\n");
    let err = parse_project(&driver(), &project.options()).unwrap_err();
    assert!(matches!(
        err,
        RunError::Parse(ParseError::MissingDefinition { .. })
    ));
}

#[test]
fn missing_schema_fails_before_scanning() {
    let project = Project::new();
    // Would fail to parse if the driver got as far as scanning
    project.write("Broken.js", "graphql`fragment {`");

    let mut options = PipelineOptions::new("does-not-exist.graphql", "src");
    options = options.resolve(project.root());
    let err = driver().run(&options).unwrap_err();

    let expected = project.root().join("does-not-exist.graphql");
    assert!(expected.is_absolute());
    assert_eq!(err, DriverError::SchemaNotFound(expected.clone()));
    assert!(err.to_string().contains(&expected.display().to_string()));
}

#[test]
fn malformed_schema_fails_the_pass() {
    let project = Project::new();
    fs::write(project.root().join("schema.graphql"), "type Query {").unwrap();
    project.write("User.js", "graphql`fragment F on User { id }`");

    let err = driver().run(&project.options()).unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Error loading schema."));
    assert!(message.contains("schema.graphql"));
}

#[test]
fn excluded_directories_are_never_parsed() {
    let project = Project::new();
    project
        .write("User.js", "graphql`fragment F on User { id }`")
        .write("__generated__/F.graphql.js", "graphql`fragment {`")
        .write("__tests__/User-test.js", "graphql`fragment {`")
        .write("__mocks__/User.js", "graphql`fragment {`");

    let documents = parse_project(&driver(), &project.options()).unwrap();
    assert_eq!(documents.len(), 1);
}

#[test]
fn stages_run_in_declaration_order() {
    let mut registry = StageRegistry::with_defaults();
    // `gql` becomes `graphql`, then `graphql.exp` becomes `graphql.experimental`
    registry.register(
        "alias",
        "",
        Arc::new(|_: &Path| Arc::new(|_: &Path, text: &str| text.replace("gql`", "graphql`")) as TextStage),
    );
    registry.register(
        "experimental",
        "",
        Arc::new(|_: &Path| {
            Arc::new(|_: &Path, text: &str| text.replace("graphql`", "graphql.experimental`"))
                as TextStage
        }),
    );

    let project = Project::new();
    project.write(
        "User.js",
        "import graphql from 'x';\ngql`fragment F on User @argumentDefinitions(a: {type: \"Int\"}) { id }`",
    );
    let driver = Driver::new(Box::new(CodegenRunner::new())).with_stages(registry);

    let mut options = project.options();
    options.transforms = vec!["alias".into(), "experimental".into()];
    assert!(parse_project(&driver, &options).is_ok());

    options.transforms = vec!["experimental".into(), "alias".into()];
    assert!(matches!(
        parse_project(&driver, &options),
        Err(RunError::Parse(ParseError::FragmentVariables { .. }))
    ));
}

#[test]
fn compile_all_reports_planned_outputs() {
    let project = Project::new();
    project.write(
        "components/App.js",
        "graphql`query AppQuery { me { ...App_user } }`;\ngraphql`fragment App_user on User { name }`;\n",
    );
    let mut options = project.options();
    options.output_dir = Some(project.root().join("out"));
    options.extra_content_generator = Some("source-banner".into());

    let (parsers, writers) = driver().configure(&options).unwrap();
    let summary = CodegenRunner::new().compile_all(&parsers, &writers).unwrap();
    let outputs = &summary.reports[DEFAULT_PIPELINE].outputs;

    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0].path, project.root().join("out/AppQuery.graphql.js"));
    assert_eq!(
        outputs[1].extra_content.as_deref(),
        Some("// App_user was extracted from components/App.js")
    );
    // Nothing is generated
    assert!(!project.root().join("out").exists());
}
