use assert_cmd::Command;
use indoc::indoc;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn builderize_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("builderize"))
}

const CONCAT_SOURCE: &str = indoc! {r#"
    package main

    func main() {
    	s := ""
    	for i := 0; i < 3; i++ {
    		s += "x"
    	}
    	println(s)
    }
"#};

const PLAIN_SOURCE: &str = indoc! {r#"
    package main

    func main() {
    	println((1 + 2))
    }
"#};

/// Test rewriting a single file in place
#[test]
fn test_rewrites_single_file() {
    let temp_dir = TempDir::new().unwrap();
    let input_file = temp_dir.path().join("main.go");
    fs::write(&input_file, CONCAT_SOURCE).unwrap();

    builderize_cmd()
        .arg(&input_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed:"))
        .stdout(predicate::str::contains("main.go"));

    let output = fs::read_to_string(&input_file).unwrap();
    assert!(
        output.contains("var sBuilder strings.Builder"),
        "Got:\n{}",
        output
    );
    assert!(output.contains("import \"strings\""));
}

/// Test that files with nothing to rewrite are not touched
#[test]
fn test_untouched_file_not_rewritten() {
    let temp_dir = TempDir::new().unwrap();
    let input_file = temp_dir.path().join("plain.go");
    fs::write(&input_file, PLAIN_SOURCE).unwrap();

    builderize_cmd()
        .arg(&input_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed:").not());

    // Redundant parentheses alone do not trigger a write.
    assert_eq!(fs::read_to_string(&input_file).unwrap(), PLAIN_SOURCE);
}

/// Test that --dry-run reports but writes nothing
#[test]
fn test_dry_run_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let input_file = temp_dir.path().join("main.go");
    fs::write(&input_file, CONCAT_SOURCE).unwrap();

    builderize_cmd()
        .arg("--dry-run")
        .arg(&input_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Would rewrite:"));

    assert_eq!(fs::read_to_string(&input_file).unwrap(), CONCAT_SOURCE);
}

/// Test that unparsable files are left unchanged and do not fail the run
#[test]
fn test_unparsable_file_left_unchanged() {
    let temp_dir = TempDir::new().unwrap();
    let bad_file = temp_dir.path().join("bad.go");
    let good_file = temp_dir.path().join("good.go");
    let bad_source = "package main\n\nfunc main( {\n";
    fs::write(&bad_file, bad_source).unwrap();
    fs::write(&good_file, CONCAT_SOURCE).unwrap();

    builderize_cmd()
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("good.go"))
        .stdout(predicate::str::contains("1 failed"))
        .stderr(predicate::str::contains("bad.go"));

    assert_eq!(fs::read_to_string(&bad_file).unwrap(), bad_source);
    assert_ne!(fs::read_to_string(&good_file).unwrap(), CONCAT_SOURCE);
}

/// Test that a file nested too deeply is reported and the walk continues
#[test]
fn test_deeply_nested_file_does_not_abort_run() {
    let temp_dir = TempDir::new().unwrap();
    let deep_file = temp_dir.path().join("a_deep.go");
    let ok_file = temp_dir.path().join("b_ok.go");
    let depth = 3000;
    let deep_source = format!(
        "package main\n\nvar v = {}x{}\n",
        "(".repeat(depth),
        ")".repeat(depth)
    );
    fs::write(&deep_file, &deep_source).unwrap();
    fs::write(&ok_file, CONCAT_SOURCE).unwrap();

    builderize_cmd()
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 failed"))
        .stderr(predicate::str::contains("nesting deeper than"));

    assert_eq!(fs::read_to_string(&deep_file).unwrap(), deep_source);
    assert!(fs::read_to_string(&ok_file)
        .unwrap()
        .contains("sBuilder.WriteString(\"x\")"));
}

/// Test that a very long concatenation chain is rewritten
#[test]
fn test_long_concatenation_chain_is_rewritten() {
    let temp_dir = TempDir::new().unwrap();
    let input_file = temp_dir.path().join("long.go");
    let terms = vec!["x"; 3000].join(" + ");
    let source = format!("package main\n\nfunc f(x string) string {{\n\ts := \"\"\n\ts += {terms}\n\treturn s\n}}\n");
    fs::write(&input_file, &source).unwrap();

    builderize_cmd()
        .arg(&input_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 failed"));

    let output = fs::read_to_string(&input_file).unwrap();
    assert!(output.contains(&format!("sBuilder.WriteString({terms})")), "Got:\n{}", output);
}

/// Test directory walking picks up only .go files outside vendor
#[test]
fn test_directory_walk_filters_files() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("pkg")).unwrap();
    fs::create_dir_all(root.join("vendor/lib")).unwrap();
    fs::write(root.join("pkg/a.go"), CONCAT_SOURCE).unwrap();
    fs::write(root.join("notes.txt"), CONCAT_SOURCE).unwrap();
    fs::write(root.join("vendor/lib/b.go"), CONCAT_SOURCE).unwrap();

    builderize_cmd().arg(root).assert().success();

    assert_ne!(fs::read_to_string(root.join("pkg/a.go")).unwrap(), CONCAT_SOURCE);
    assert_eq!(fs::read_to_string(root.join("notes.txt")).unwrap(), CONCAT_SOURCE);
    assert_eq!(fs::read_to_string(root.join("vendor/lib/b.go")).unwrap(), CONCAT_SOURCE);
}

/// Test that --chunk-size overrides the config file
#[test]
fn test_chunk_size_flag_overrides_config() {
    let temp_dir = TempDir::new().unwrap();
    let input_file = temp_dir.path().join("main.go");
    let config_file = temp_dir.path().join("builderize.yaml");
    fs::write(&input_file, "package main\n\nvar v = \"abcdef\" + \"g\"\n").unwrap();
    fs::write(&config_file, "chunk_size: 4\n").unwrap();

    builderize_cmd()
        .arg("--config")
        .arg(&config_file)
        .arg("--chunk-size")
        .arg("2")
        .arg(&input_file)
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(&input_file).unwrap(),
        "package main\n\nvar v = \"ab\" + \"cd\" + \"ef\" + \"g\"\n"
    );
}

/// Test that a config file is honored on its own
#[test]
fn test_config_file_sets_chunk_size() {
    let temp_dir = TempDir::new().unwrap();
    let input_file = temp_dir.path().join("main.go");
    let config_file = temp_dir.path().join("builderize.yaml");
    fs::write(&input_file, "package main\n\nvar v = \"abcdef\" + \"g\"\n").unwrap();
    fs::write(&config_file, "chunk_size: 4\n").unwrap();

    builderize_cmd()
        .arg("--config")
        .arg(&config_file)
        .arg(&input_file)
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(&input_file).unwrap(),
        "package main\n\nvar v = \"abcd\" + \"ef\" + \"g\"\n"
    );
}

/// Test fatal errors: missing path and invalid configuration
#[test]
fn test_fatal_errors_fail_the_run() {
    let temp_dir = TempDir::new().unwrap();

    builderize_cmd()
        .arg(temp_dir.path().join("missing.go"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("path does not exist"));

    let input_file = temp_dir.path().join("main.go");
    fs::write(&input_file, CONCAT_SOURCE).unwrap();
    builderize_cmd()
        .arg("--chunk-size")
        .arg("0")
        .arg(&input_file)
        .assert()
        .failure();
    assert_eq!(fs::read_to_string(&input_file).unwrap(), CONCAT_SOURCE);
}
