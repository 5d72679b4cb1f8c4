//! Command-line interface for tagql
//! Finds the GraphQL literals embedded in an application's sources, validates them against
//! a schema and reports what a code generator would produce.
//!
//! Usage:
//!   tagql --schema `<path>` --src `<path>` [--watch]   - Compile once, or keep watching
//!   tagql --list-transforms                           - List source transforms and generators

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tagql_config::{Loader, TagqlConfig, PROJECT_FILE};
use tagql_parser::tagql::pipeline::{Driver, ExtraContentRegistry};
use tagql_parser::tagql::runner::CodegenRunner;
use tagql_parser::tagql::transforms::StageRegistry;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "TAGQL_LOG";

fn main() {
    let matches = build_cli().get_matches();
    init_tracing();

    if matches.get_flag("list-transforms") {
        handle_list_transforms_command();
        return;
    }

    let config = load_config(&matches).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });
    handle_compile_command(&matches, &config);
}

fn build_cli() -> Command {
    Command::new("tagql")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extract and validate GraphQL literals embedded in application sources")
        .arg_required_else_help(true)
        .arg(
            Arg::new("schema")
                .long("schema")
                .help("Path to schema.graphql or schema.json")
                .required_unless_present("list-transforms"),
        )
        .arg(
            Arg::new("src")
                .long("src")
                .help("Root directory of application code")
                .required_unless_present("list-transforms"),
        )
        .arg(
            Arg::new("extensions")
                .long("extensions")
                .help("File extensions to compile (--extensions js jsx)")
                .num_args(1..),
        )
        .arg(
            Arg::new("output-extension")
                .long("output-extension")
                .help("File extension to output generated files with"),
        )
        .arg(
            Arg::new("transform")
                .long("transform")
                .help("Source transform applied to every file before extraction (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("extra-content-generator")
                .long("extra-content-generator")
                .help("Registered generator for extra artifact content"),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .help("Directory to output generated files in"),
        )
        .arg(
            Arg::new("watch")
                .long("watch")
                .help("If specified, watches files and recompiles on changes")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Configuration file (default: tagql.toml in the working directory, if present)"),
        )
        .arg(
            Arg::new("list-transforms")
                .long("list-transforms")
                .help("List available source transforms and extra content generators")
                .action(ArgAction::SetTrue),
        )
}

/// Logs go to stderr; `TAGQL_LOG` takes the usual filter directives
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Defaults, then the project file, then command line flags
fn load_config(matches: &ArgMatches) -> Result<TagqlConfig, Box<dyn std::error::Error>> {
    let mut loader = Loader::new();
    loader = match matches.get_one::<String>("config") {
        Some(path) => loader.with_file(path),
        None => loader.with_optional_file(std::env::current_dir()?.join(PROJECT_FILE)),
    };

    for (flag, key) in [
        ("output-extension", "compiler.output_extension"),
        ("output-dir", "compiler.output_dir"),
        ("extra-content-generator", "compiler.extra_content_generator"),
    ] {
        if let Some(value) = matches.get_one::<String>(flag) {
            loader = loader.set_override(key, value.as_str())?;
        }
    }

    let mut config = loader.build()?;
    if let Some(extensions) = matches.get_many::<String>("extensions") {
        config.compiler.extensions = extensions.cloned().collect();
    }
    if let Some(transforms) = matches.get_many::<String>("transform") {
        config.compiler.transforms = transforms.cloned().collect();
    }
    Ok(config)
}

/// Handle the compile command
fn handle_compile_command(matches: &ArgMatches, config: &TagqlConfig) {
    let schema = matches
        .get_one::<String>("schema")
        .map(PathBuf::from)
        .unwrap_or_default();
    let src = matches
        .get_one::<String>("src")
        .map(PathBuf::from)
        .unwrap_or_default();
    let watch = matches.get_flag("watch");

    let cwd = std::env::current_dir().unwrap_or_else(|e| {
        eprintln!("Cannot determine the working directory: {}", e);
        std::process::exit(1);
    });
    let options = config.pipeline_options(schema, src, watch).resolve(&cwd);
    tracing::debug!(?options, "resolved options");

    if !watch {
        println!("HINT: pass --watch to keep watching for changes.");
    }

    let runner = CodegenRunner::new().with_debounce(config.watch.debounce_ms);
    if let Err(e) = Driver::new(Box::new(runner)).run(&options) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

/// Handle the list-transforms command
fn handle_list_transforms_command() {
    println!("Available source transforms:\n");
    for (name, description) in StageRegistry::with_defaults().list_all() {
        println!("  {}", name);
        println!("    {}", description);
        println!();
    }

    println!("Available extra content generators:\n");
    for (name, description) in ExtraContentRegistry::with_defaults().list_all() {
        println!("  {}", name);
        println!("    {}", description);
        println!();
    }
}
