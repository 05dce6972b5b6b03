//! Template and specialisation semantics, end to end through `compile`

use chtl::{compile, CompileOptions, Compiler};

fn compile_lenient(source: &str) -> chtl::CompileResult {
    Compiler::new(CompileOptions {
        strict_mode: false,
        ..Default::default()
    })
    .compile(source, None)
}

#[test]
fn test_self_inheriting_template_reports_one_cycle() {
    let result = compile(
        "[Template] @Style T { inherit @Style T; color: red; }\n\
         div { style { @Style T; } }",
    );
    assert!(!result.success);
    let cycles: Vec<_> = result
        .errors
        .iter()
        .filter(|e| e.message.contains("cycle"))
        .collect();
    assert_eq!(cycles.len(), 1);
    // No hang, and the non-cyclic part still emits.
    assert!(result.css.contains("color: red;"));
}

#[test]
fn test_insert_with_missing_anchor_applies_other_ops() {
    let result = compile(
        "[Custom] @Element Card { div { text { \"a\" } } }\n\
         @Element Card {\n\
           insert after nav { span { text { \"x\" } } }\n\
           insert at bottom { footer { text { \"b\" } } }\n\
         }",
    );
    assert!(!result.success);
    assert!(result
        .errors
        .iter()
        .any(|e| e.message.contains("insert anchor")));
    // The failed op is skipped; the following insert still applied.
    assert_eq!(result.html, "<div>a</div><footer>b</footer>");
}

#[test]
fn test_delete_property_specialisation() {
    let result = compile(
        "[Template] @Style T { color: red; margin: 0; }\n\
         div { style { @Style T { delete color; } } }",
    );
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.css, ".chtl-s1 {\n  margin: 0;\n}\n");
}

#[test]
fn test_property_override_specialisation() {
    let result = compile(
        "[Template] @Style T { color: red; }\n\
         div { style { @Style T { color: navy; padding: 2px; } } }",
    );
    assert!(result.success);
    assert_eq!(result.css, ".chtl-s1 {\n  color: navy;\n  padding: 2px;\n}\n");
}

#[test]
fn test_required_property_must_be_filled() {
    let unfilled = compile(
        "[Custom] @Style Frame { border-color; }\n\
         div { style { @Style Frame; } }",
    );
    assert!(!unfilled.success);
    assert!(unfilled
        .errors
        .iter()
        .any(|e| e.message.contains("required property 'border-color'")));

    let filled = compile(
        "[Custom] @Style Frame { border-color; }\n\
         div { style { @Style Frame { border-color: teal; } } }",
    );
    assert!(filled.success, "{:?}", filled.errors);
    assert_eq!(filled.css, ".chtl-s1 {\n  border-color: teal;\n}\n");
}

#[test]
fn test_insert_before_and_replace() {
    let result = compile(
        "[Custom] @Element Nav { a { text { \"one\" } } a { text { \"two\" } } }\n\
         @Element Nav {\n\
           insert before a[1] { hr { } }\n\
           insert replace a[0] { b { text { \"ONE\" } } }\n\
         }",
    );
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.html, "<b>ONE</b><hr/><a>two</a>");
}

#[test]
fn test_element_patch_by_index() {
    let result = compile(
        "[Custom] @Element Cols { div { } div { } }\n\
         @Element Cols { div[1] { id: second; text { \"x\" } } }",
    );
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.html, "<div></div><div id=\"second\">x</div>");
}

#[test]
fn test_element_patch_can_add_scoped_style() {
    let result = compile(
        "[Custom] @Element Card { div { text { \"c\" } } }\n\
         @Element Card { div { style { color: red; } } }",
    );
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.html, "<div class=\"chtl-s1\">c</div>");
    assert_eq!(result.css, ".chtl-s1 {\n  color: red;\n}\n");
}

#[test]
fn test_custom_definition_body_specialises_base() {
    let result = compile(
        "[Template] @Element Page { header { } main { } footer { } }\n\
         [Custom] @Element Lean { @Element Page; delete footer; }\n\
         @Element Lean;",
    );
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.html, "<header></header><main></main>");
}

#[test]
fn test_fully_qualified_use_selects_category() {
    let result = compile(
        "[Template] @Style T { color: red; }\n\
         [Custom] @Style T { color: blue; }\n\
         div { style { [Template] @Style T; } }\n\
         span { style { [Custom] @Style T; } }",
    );
    assert!(result.success, "{:?}", result.errors);
    assert!(result.css.contains(".chtl-s1 {\n  color: red;\n}\n"));
    assert!(result.css.contains(".chtl-s2 {\n  color: blue;\n}\n"));
}

#[test]
fn test_namespaced_template_reference() {
    let result = compile(
        "[Namespace] ui { [Template] @Style T { color: red; } }\n\
         div { style { @Style ui.T; } }",
    );
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.css, ".chtl-s1 {\n  color: red;\n}\n");
}

#[test]
fn test_from_qualifier_resolves_namespace() {
    let result = compile(
        "[Namespace] ui { [Template] @Element Chip { span { text { \"c\" } } } }\n\
         div { @Element Chip from ui; }",
    );
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.html, "<div><span>c</span></div>");
}

#[test]
fn test_unresolved_template_is_diagnosed_not_fatal() {
    let result = compile_lenient("div { style { @Style Nope; } text { \"still here\" } }");
    assert!(!result.success);
    assert!(result
        .errors
        .iter()
        .any(|e| e.message.contains("unresolved template")));
    // Emission continued past the failure.
    assert!(result.html.contains("still here"));
}

#[test]
fn test_transitive_variable_reference() {
    let result = compile(
        "[Template] @Var Base { unit: 4px; }\n\
         [Template] @Var Spacing { gap: Base(unit); }\n\
         div { style { padding: Spacing(gap); } }",
    );
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.css, ".chtl-s1 {\n  padding: 4px;\n}\n");
}

#[test]
fn test_self_referential_variable_reports_depth() {
    let result = compile(
        "[Template] @Var V { x: V(x); }\n\
         div { style { width: V(x); } }",
    );
    assert!(!result.success);
    assert!(result
        .errors
        .iter()
        .any(|e| e.message.contains("nested levels")));
}

#[test]
fn test_var_use_in_attribute_value() {
    let result = compile(
        "[Template] @Var Ids { main: content; }\n\
         div { id: Ids(main); }",
    );
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.html, "<div id=\"content\"></div>");
}

#[test]
fn test_except_clause_rejects_element() {
    let result = compile_lenient("div { except span; span { } p { } }");
    assert!(!result.success);
    assert!(result
        .errors
        .iter()
        .any(|e| e.message.contains("not allowed here")));
    // The offending element still emits; the constraint is a diagnostic.
    assert!(result.html.contains("<p></p>"));
}
