//! End-to-end scan of a small on-disk codebase fixture.

use std::fs;
use std::path::Path;

use cblocks::block::Category;
use cblocks::report::{render_outline, CodebaseReport};
use cblocks::walk::find_codebase_root;
use cblocks::{load_config, scan_codebase};

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

/// A miniature autotools-flavored project with the usual clutter: vcs
/// metadata, a test dir, a non-C file, and real declarations to find.
fn fixture_codebase() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write(root, "Makefile", "all:\n\t$(CC) src/main.c\n");
    write(
        root,
        "src/main.c",
        "#include \"widget.h\"\n\n/* entry point */\nint main(int argc, char ** argv) {\n  if (argc > 1) {\n    run(argv[1]);\n  }\n  return 0;\n}\n",
    );
    write(
        root,
        "src/widget.h",
        "/* a widget */\nclass Widget {\npublic:\nWidget(int w) : m_w(w) {\n}\n~Widget()\n{\n}\nint width() const {\n  return m_w;\n}\nprivate:\nint m_w;\n};\n",
    );
    write(root, "src/notes.txt", "not code\n");
    write(root, ".git/config", "[core]\n");
    write(root, "tests/check_widget.c", "void test_widget() {\n}\n");
    tmp
}

#[test]
fn test_scan_fixture_codebase() {
    let tmp = fixture_codebase();
    let config = load_config(tmp.path());
    let scan = scan_codebase(&config);

    let paths: Vec<&str> = scan.sources.iter().map(|s| s.rel_path.as_str()).collect();
    assert_eq!(paths, vec!["src/main.c", "src/widget.h"], "clutter filtered, order stable");

    let report = CodebaseReport::build(&scan);
    assert_eq!(report.file_count, 2);
    assert_eq!(report.udt_count, 1);
    // main, Widget's ctor, dtor, and width().
    assert_eq!(report.function_count, 4);
    assert_eq!(report.skipped_count, 0);

    let main_c = &report.files[0];
    assert_eq!(main_c.comment_count, 1);
    assert_eq!(main_c.blocks.len(), 1);
    assert_eq!(main_c.blocks[0].name, "main");
    assert_eq!(main_c.blocks[0].start_line, 4);
    // The if-body nests one level under main.
    assert_eq!(main_c.deepest_nesting, 2);

    let widget_h = &report.files[1];
    let widget = &widget_h.blocks[0];
    assert_eq!(widget.category, Category::Udt);
    assert_eq!(widget.name, "Widget");
    let members: Vec<&str> = widget.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(members, vec!["Widget", "~Widget", "width"]);
    assert!(widget.header.contains("/* ... */"), "doc comment should be attached");
}

#[test]
fn test_scan_headers_only() {
    let tmp = fixture_codebase();
    let mut config = load_config(tmp.path());
    config.headers_only = true;
    let scan = scan_codebase(&config);
    let paths: Vec<&str> = scan.sources.iter().map(|s| s.rel_path.as_str()).collect();
    assert_eq!(paths, vec!["src/widget.h"]);
}

#[test]
fn test_scan_config_file_respected() {
    let tmp = fixture_codebase();
    write(tmp.path(), ".cblocks.toml", "scan_dirs = [\"src\"]\nextensions = [\"h\"]\n");
    let config = load_config(tmp.path());
    let scan = scan_codebase(&config);
    let paths: Vec<&str> = scan.sources.iter().map(|s| s.rel_path.as_str()).collect();
    assert_eq!(paths, vec!["src/widget.h"]);
}

#[test]
fn test_root_detection_from_nested_dir() {
    let tmp = fixture_codebase();
    assert_eq!(find_codebase_root(&tmp.path().join("src")), tmp.path());
}

#[test]
fn test_outline_of_fixture() {
    let tmp = fixture_codebase();
    let scan = scan_codebase(&load_config(tmp.path()));
    let outline = render_outline(&scan);
    assert!(outline.contains("file \"src/main.c\""), "got:\n{outline}");
    assert!(outline.contains("class Widget {"), "got:\n{outline}");
    assert!(outline.contains("int width() const {...}"), "got:\n{outline}");
}

#[test]
fn test_unreadable_sibling_does_not_abort_scan() {
    let tmp = fixture_codebase();
    // An oversized file is skipped with a warning; siblings still parse.
    let big = vec![b' '; 3 * 1024 * 1024];
    fs::write(tmp.path().join("src/huge.c"), big).unwrap();
    let scan = scan_codebase(&load_config(tmp.path()));
    assert_eq!(scan.skipped, 1);
    assert_eq!(scan.sources.len(), 2);
}
