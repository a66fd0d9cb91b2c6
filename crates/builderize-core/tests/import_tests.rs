use builderize_core::{parse, print, transform, TransformConfig};
use indoc::indoc;

fn rewrite(source: &str) -> String {
    let mut tree = parse(source).unwrap();
    transform(&mut tree, &TransformConfig::default());
    print(&tree).unwrap()
}

#[test]
fn test_import_added_to_grouped_declaration() {
    let source = indoc! {r#"
        // Package main greets.
        package main

        import (
        	"fmt"
        	"os"
        )

        func main() {
        	msg := "hello"
        	msg += os.Args[0]
        	fmt.Println(msg)
        }
    "#};

    let output = rewrite(source);

    assert!(
        output.starts_with(
            "// Package main greets.\npackage main\n\nimport (\n\t\"fmt\"\n\t\"os\"\n\t\"strings\"\n)\n\nfunc main() {\n"
        ),
        "Got:\n{}",
        output
    );
}

#[test]
fn test_existing_strings_import_not_duplicated() {
    let source = indoc! {r#"
        package main

        import "strings"

        func f(xs []string) string {
        	s := strings.Join(xs, ",")
        	s += "!"
        	return s
        }
    "#};

    let output = rewrite(source);

    assert_eq!(output.matches("\"strings\"").count(), 1);
    assert!(output.starts_with("package main\n\nimport \"strings\"\n\nfunc f"));
}

#[test]
fn test_import_added_before_first_declaration_comment() {
    let source = indoc! {r#"
        package main

        // f extends s.
        func f(s string) string {
        	s += "x"
        	return s
        }
    "#};

    let output = rewrite(source);

    assert!(
        output.starts_with("package main\n\nimport \"strings\"\n\n// f extends s.\nfunc f(s string) string {\n"),
        "Got:\n{}",
        output
    );
}
