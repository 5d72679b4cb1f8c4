use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

const SCHEMA: &str = "type Query { me: User }\ntype User { id: ID }\n";

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("schema.graphql"), SCHEMA).unwrap();
    fs::create_dir(dir.path().join("src")).unwrap();
    dir
}

fn write_source(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join("src").join(name), contents).unwrap();
}

#[test]
fn lists_transforms_and_generators() {
    let mut cmd = cargo_bin_cmd!("tagql");
    cmd.arg("--list-transforms");

    cmd.assert().success().stdout(
        predicate::str::contains("strip-bom")
            .and(predicate::str::contains("vue-script"))
            .and(predicate::str::contains("source-banner")),
    );
}

#[test]
fn compiles_a_project_once() {
    let dir = project();
    write_source(dir.path(), "User.js", "export default graphql`fragment User_user on User { id }`;\n");

    let mut cmd = cargo_bin_cmd!("tagql");
    cmd.current_dir(dir.path())
        .args(["--schema", "schema.graphql", "--src", "src"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("HINT: pass --watch to keep watching for changes."));
}

#[test]
fn missing_schema_reports_absolute_path() {
    let dir = project();
    let mut cmd = cargo_bin_cmd!("tagql");
    cmd.current_dir(dir.path())
        .args(["--schema", "nope.graphql", "--src", "src"]);

    let expected = dir.path().canonicalize().unwrap().join("nope.graphql");
    cmd.assert().failure().stderr(
        predicate::str::contains("--schema path does not exist: ")
            .and(predicate::str::contains(expected.display().to_string())),
    );
}

#[test]
fn missing_source_directory() {
    let dir = project();
    let mut cmd = cargo_bin_cmd!("tagql");
    cmd.current_dir(dir.path())
        .args(["--schema", "schema.graphql", "--src", "missing"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--source path does not exist: "));
}

#[test]
fn fragment_arguments_need_the_experimental_tag() {
    let dir = project();
    write_source(
        dir.path(),
        "User.js",
        "graphql`fragment User_user on User @argumentDefinitions(a: {type: \"Int\"}) { id }`;\n",
    );

    let mut cmd = cargo_bin_cmd!("tagql");
    cmd.current_dir(dir.path())
        .args(["--schema", "schema.graphql", "--src", "src"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Unexpected use of fragment variables in User.js"));
}

#[test]
fn unknown_transform_is_named() {
    let dir = project();
    let mut cmd = cargo_bin_cmd!("tagql");
    cmd.current_dir(dir.path())
        .args(["--schema", "schema.graphql", "--src", "src", "--transform", "nope"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Can not resolve transformer module \"nope\""));
}

#[test]
fn project_file_is_layered() {
    let dir = project();
    fs::write(
        dir.path().join("tagql.toml"),
        "[compiler]\ntransforms = [\"from-project-file\"]\n",
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("tagql");
    cmd.current_dir(dir.path())
        .args(["--schema", "schema.graphql", "--src", "src"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("\"from-project-file\""));
}

#[test]
fn watch_without_root_marker() {
    let dir = project();
    fs::write(
        dir.path().join("custom.toml"),
        "[watch]\nroot_markers = [\".tagql-test-marker-none\"]\n",
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("tagql");
    cmd.current_dir(dir.path()).args([
        "--schema",
        "schema.graphql",
        "--src",
        "src",
        "--watch",
        "--config",
        "custom.toml",
    ]);

    cmd.assert().failure().stderr(
        predicate::str::contains("--watch requires that the src directory")
            .and(predicate::str::contains("or its parents.")),
    );
}
