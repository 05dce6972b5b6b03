//! Cross-cutting property tests: CE-equivalence, determinism, totality

use proptest::prelude::*;

use chtl::parser::parse;
use chtl::tokenizer::tokenize;

fn parse_ast(source: &str) -> chtl::ast::DocumentNode {
    let (tokens, _) = tokenize(source);
    let (document, _) = parse(source, tokens);
    document
}

proptest! {
    // CE-equivalence: for attribute/property syntax, `:` and `=` produce
    // an identical AST. The two forms are the same byte length, so even
    // recorded positions agree.
    #[test]
    fn test_ce_equivalence_on_attributes(
        name in "[a-z][a-z0-9]{0,8}",
        value in "[a-z0-9]{1,8}",
    ) {
        prop_assume!(chtl::tokenizer::tokens::word_keyword_kind(&name).is_none());
        prop_assume!(name != "at");
        let with_colon = format!("div {{ {}: {}; }}", name, value);
        let with_equals = format!("div {{ {}= {}; }}", name, value);
        prop_assert_eq!(parse_ast(&with_colon), parse_ast(&with_equals));
    }

    #[test]
    fn test_ce_equivalence_on_style_properties(
        name in "[a-z][a-z-]{0,8}",
        value in "[a-z0-9]{1,8}",
    ) {
        prop_assume!(chtl::tokenizer::tokens::word_keyword_kind(&name).is_none());
        prop_assume!(name != "at" && !name.ends_with('-'));
        let with_colon = format!("div {{ style {{ {}: {}; }} }}", name, value);
        let with_equals = format!("div {{ style {{ {}= {}; }} }}", name, value);
        prop_assert_eq!(parse_ast(&with_colon), parse_ast(&with_equals));
    }

    // Compilation is byte-deterministic for a fixed input.
    #[test]
    fn test_compile_deterministic(text in "[a-z ]{0,20}") {
        let source = format!(
            "[Template] @Style T {{ color: red; }}\n\
             div {{ style {{ @Style T; }} text {{ \"{}\" }} }}",
            text
        );
        let first = chtl::compile(&source);
        let second = chtl::compile(&source);
        prop_assert_eq!(&first.html, &second.html);
        prop_assert_eq!(&first.css, &second.css);
        prop_assert_eq!(&first.js, &second.js);
    }

    // The full pipeline is total: arbitrary input produces a result, not
    // a panic, and failure always comes with diagnostics.
    #[test]
    fn test_compile_never_panics(source in ".{0,120}") {
        let result = chtl::compile(&source);
        if !result.success {
            prop_assert!(!result.errors.is_empty());
        }
    }
}

#[test]
fn test_ce_equivalence_full_document() {
    let with_colon = "[Template] @Var V { primary: red; }\n\
                      div { id: box; style { color: red; margin: 0; } }";
    let with_equals = "[Template] @Var V { primary= red; }\n\
                       div { id= box; style { color= red; margin= 0; } }";
    assert_eq!(parse_ast(with_colon), parse_ast(with_equals));
}

#[test]
fn test_unlex_roundtrip_on_wellformed_stream() {
    // Re-rendering the token stream and lexing again yields the same
    // kinds and lexemes (whitespace-insensitive round trip).
    let source = "[Template] @Style T { color: red; }\ndiv { style { @Style T; } }";
    let (tokens, _) = tokenize(source);

    let mut rendered = String::new();
    for token in &tokens {
        match token.kind {
            chtl::tokenizer::TokenKind::Eof => {}
            chtl::tokenizer::TokenKind::StringLit => {
                rendered.push_str(&format!("{:?} ", token.lexeme));
            }
            _ => {
                rendered.push_str(&token.lexeme);
                rendered.push(' ');
            }
        }
    }

    let (relexed, _) = tokenize(&rendered);
    let originals: Vec<_> = tokens.iter().map(|t| (t.kind, t.lexeme.clone())).collect();
    let roundtripped: Vec<_> = relexed.iter().map(|t| (t.kind, t.lexeme.clone())).collect();
    assert_eq!(originals, roundtripped);
}
