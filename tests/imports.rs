//! Import resolution across files, using tempdir-backed modules

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use chtl::{CompileOptions, Compiler};

fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write module file");
    path
}

fn compile_main(dir: &TempDir, main: &str) -> chtl::CompileResult {
    let main_path = write_file(dir.path(), "main.chtl", main);
    Compiler::default().compile_file(&main_path)
}

#[test]
fn test_whole_file_import_by_relative_path() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "widgets.chtl",
        "[Template] @Style W { color: red; }",
    );
    let result = compile_main(
        &dir,
        "[Import] @Chtl from \"widgets.chtl\";\n\
         div { style { @Style W; } }",
    );
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.css, ".chtl-s1 {\n  color: red;\n}\n");
}

#[test]
fn test_aliased_import_prefixes_names() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "widgets.chtl",
        "[Template] @Style W { color: red; }",
    );
    let result = compile_main(
        &dir,
        "[Import] @Chtl from \"widgets.chtl\" as ui;\n\
         div { style { @Style ui.W; } }",
    );
    assert!(result.success, "{:?}", result.errors);

    // The unprefixed name must not leak in.
    let unprefixed = compile_main(
        &dir,
        "[Import] @Chtl from \"widgets.chtl\" as ui;\n\
         div { style { @Style W; } }",
    );
    assert!(!unprefixed.success);
}

#[test]
fn test_named_template_import_with_alias() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "widgets.chtl",
        "[Template] @Style W { color: red; }\n[Template] @Style Unwanted { color: blue; }",
    );
    let result = compile_main(
        &dir,
        "[Import] @Style W from \"widgets.chtl\" as Local;\n\
         div { style { @Style Local; } }",
    );
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.css, ".chtl-s1 {\n  color: red;\n}\n");
}

#[test]
fn test_except_removes_symbols_from_view() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "widgets.chtl",
        "[Template] @Style Keep { color: red; }\n[Template] @Style Drop { color: blue; }",
    );
    let result = compile_main(
        &dir,
        "[Import] @Chtl from \"widgets.chtl\" except Drop;\n\
         div { style { @Style Drop; } }",
    );
    assert!(!result.success);
    assert!(result
        .errors
        .iter()
        .any(|e| e.message.contains("unresolved template")));
}

#[test]
fn test_export_list_limits_visibility() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "widgets.chtl",
        "[Export] { @Style Public }\n\
         [Template] @Style Public { color: red; }\n\
         [Template] @Style Private { color: blue; }",
    );
    let hidden = compile_main(
        &dir,
        "[Import] @Chtl from \"widgets.chtl\";\n\
         div { style { @Style Private; } }",
    );
    assert!(!hidden.success);

    let visible = compile_main(
        &dir,
        "[Import] @Chtl from \"widgets.chtl\";\n\
         div { style { @Style Public; } }",
    );
    assert!(visible.success, "{:?}", visible.errors);
}

#[test]
fn test_import_cycle_is_reported_with_chain() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.chtl", "[Import] @Chtl from \"b.chtl\";");
    write_file(dir.path(), "b.chtl", "[Import] @Chtl from \"a.chtl\";");
    let result = compile_main(&dir, "[Import] @Chtl from \"a.chtl\";\ndiv { }");
    assert!(!result.success);
    let cycle = result
        .errors
        .iter()
        .find(|e| e.message.contains("import cycle"))
        .expect("cycle diagnostic");
    assert!(cycle.message.contains("a.chtl"));
    assert!(cycle.message.contains("b.chtl"));
}

#[test]
fn test_transitive_imports_resolve_once() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "base.chtl",
        "[Template] @Style Base { margin: 0; }",
    );
    write_file(
        dir.path(),
        "mid.chtl",
        "[Import] @Chtl from \"base.chtl\";\n[Template] @Style Mid { inherit @Style Base; color: red; }",
    );
    let result = compile_main(
        &dir,
        "[Import] @Chtl from \"mid.chtl\";\n\
         div { style { @Style Mid; } }",
    );
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.css, ".chtl-s1 {\n  margin: 0;\n  color: red;\n}\n");
}

#[test]
fn test_missing_import_path_is_diagnosed() {
    let dir = TempDir::new().unwrap();
    let result = compile_main(&dir, "[Import] @Chtl from \"nope.chtl\";\ndiv { }");
    assert!(!result.success);
    assert!(result
        .errors
        .iter()
        .any(|e| e.message.contains("not found")));
}

#[test]
fn test_logical_import_through_search_path() {
    let dir = TempDir::new().unwrap();
    let modules = dir.path().join("modules");
    fs::create_dir_all(&modules).unwrap();
    write_file(&modules, "Widgets.chtl", "[Template] @Style W { color: red; }");

    let main_path = write_file(
        dir.path(),
        "main.chtl",
        "[Import] @Chtl from Widgets;\ndiv { style { @Style W; } }",
    );
    let mut compiler = Compiler::new(CompileOptions {
        import_paths: vec![modules],
        ..Default::default()
    });
    let result = compiler.compile_file(&main_path);
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.css, ".chtl-s1 {\n  color: red;\n}\n");
}

#[test]
fn test_javascript_file_import_registers_origin() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "lib.js", "function lib() { return 1; }");
    let result = compile_main(
        &dir,
        "[Import] @JavaScript from \"lib.js\" as lib;\n\
         div { }\n\
         [Origin] @JavaScript lib;",
    );
    assert!(result.success, "{:?}", result.errors);
    assert!(result.js.contains("function lib()"));
}

#[test]
fn test_html_file_import_registers_origin() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "banner.html", "<header>site</header>");
    let result = compile_main(
        &dir,
        "[Import] @Html from \"banner.html\" as banner;\n\
         div { [Origin] @Html banner; }",
    );
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.html, "<div><header>site</header></div>");
}
