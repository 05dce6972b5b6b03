//! Unit tests for the tokenizer

use super::{tokenize, TokenKind};

fn kinds(source: &str) -> Vec<TokenKind> {
    let (tokens, _) = tokenize(source);
    tokens.iter().map(|t| t.kind).collect()
}

#[test]
fn test_empty_input() {
    let (tokens, diagnostics) = tokenize("");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::Eof);
    assert!(diagnostics.is_empty());
}

#[test]
fn test_simple_element() {
    assert_eq!(
        kinds("div { }"),
        vec![
            TokenKind::Identifier,
            TokenKind::LeftBrace,
            TokenKind::RightBrace,
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_ce_pair_distinct_kinds() {
    let (tokens, _) = tokenize("id: a; id = a;");
    let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
    assert!(kinds.contains(&TokenKind::Colon));
    assert!(kinds.contains(&TokenKind::Equals));
}

#[test]
fn test_string_escapes() {
    let (tokens, diagnostics) = tokenize(r#""a\"b\n""#);
    assert!(diagnostics.is_empty());
    assert_eq!(tokens[0].kind, TokenKind::StringLit);
    assert_eq!(tokens[0].lexeme, "a\"b\n");
}

#[test]
fn test_unterminated_string() {
    let (tokens, diagnostics) = tokenize("\"abc");
    assert_eq!(tokens[0].kind, TokenKind::Invalid);
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.contains("unterminated string"));
}

#[test]
fn test_number_and_dimension() {
    let (tokens, _) = tokenize("12 1.5 12px 100%");
    assert_eq!(tokens[0].kind, TokenKind::Number);
    assert_eq!(tokens[0].lexeme, "12");
    assert_eq!(tokens[1].kind, TokenKind::Number);
    assert_eq!(tokens[1].lexeme, "1.5");
    assert_eq!(tokens[2].kind, TokenKind::UnquotedLit);
    assert_eq!(tokens[2].lexeme, "12px");
    assert_eq!(tokens[3].kind, TokenKind::UnquotedLit);
    assert_eq!(tokens[3].lexeme, "100%");
}

#[test]
fn test_bracket_prefixes() {
    let (tokens, diagnostics) = tokenize("[Template] [Custom] [Origin] [Import] [Namespace]");
    assert!(diagnostics.is_empty());
    assert_eq!(tokens[0].kind, TokenKind::Template);
    assert_eq!(tokens[0].lexeme, "[Template]");
    assert_eq!(tokens[1].kind, TokenKind::Custom);
    assert_eq!(tokens[2].kind, TokenKind::Origin);
    assert_eq!(tokens[3].kind, TokenKind::Import);
    assert_eq!(tokens[4].kind, TokenKind::Namespace);
}

#[test]
fn test_unknown_bracket_prefix() {
    let (tokens, diagnostics) = tokenize("[Bogus]");
    assert_eq!(tokens[0].kind, TokenKind::Invalid);
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn test_index_brackets_are_punctuation() {
    assert_eq!(
        kinds("[0]"),
        vec![
            TokenKind::LeftBracket,
            TokenKind::Number,
            TokenKind::RightBracket,
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_type_tags_case_insensitive() {
    let (tokens, _) = tokenize("@Style @STYLE @style @Element @Var @Html @JavaScript @Config");
    assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::TagStyle));
    assert!(tokens[..3].iter().all(|t| t.lexeme == "@Style"));
    assert_eq!(tokens[3].kind, TokenKind::TagElement);
    assert_eq!(tokens[4].kind, TokenKind::TagVar);
    assert_eq!(tokens[5].kind, TokenKind::TagHtml);
    assert_eq!(tokens[6].kind, TokenKind::TagJavaScript);
    assert_eq!(tokens[7].kind, TokenKind::TagConfig);
}

#[test]
fn test_selectors() {
    let (tokens, _) = tokenize(".box #top");
    assert_eq!(tokens[0].kind, TokenKind::ClassSelector);
    assert_eq!(tokens[0].lexeme, ".box");
    assert_eq!(tokens[1].kind, TokenKind::IdSelector);
    assert_eq!(tokens[1].lexeme, "#top");
}

#[test]
fn test_hash_before_digit_is_punctuation() {
    let (tokens, _) = tokenize("#07f");
    assert_eq!(tokens[0].kind, TokenKind::Hash);
    assert_eq!(tokens[1].kind, TokenKind::UnquotedLit);
    assert_eq!(tokens[1].lexeme, "07f");
}

#[test]
fn test_comments() {
    let (tokens, _) = tokenize("// line\n/* block */\n-- generator note");
    assert_eq!(tokens[0].kind, TokenKind::LineComment);
    assert_eq!(tokens[0].lexeme, "line");
    assert_eq!(tokens[1].kind, TokenKind::BlockComment);
    assert_eq!(tokens[1].lexeme, "block");
    assert_eq!(tokens[2].kind, TokenKind::GeneratorComment);
    assert_eq!(tokens[2].lexeme, "generator note");
}

#[test]
fn test_dash_starts_unquoted_literal() {
    let (tokens, _) = tokenize("-webkit-box");
    assert_eq!(tokens[0].kind, TokenKind::UnquotedLit);
    assert_eq!(tokens[0].lexeme, "-webkit-box");
}

#[test]
fn test_at_top_and_at_bottom() {
    let (tokens, _) = tokenize("insert at top at  bottom");
    assert_eq!(tokens[0].kind, TokenKind::Insert);
    assert_eq!(tokens[1].kind, TokenKind::AtTop);
    assert_eq!(tokens[1].lexeme, "at top");
    assert_eq!(tokens[2].kind, TokenKind::AtBottom);
}

#[test]
fn test_at_alone_is_identifier() {
    let (tokens, _) = tokenize("at x");
    assert_eq!(tokens[0].kind, TokenKind::Identifier);
    assert_eq!(tokens[0].lexeme, "at");
    assert_eq!(tokens[1].kind, TokenKind::Identifier);
}

#[test]
fn test_keywords() {
    let (tokens, _) = tokenize("text style script use inherit delete insert from as except html5");
    let expected = [
        TokenKind::Text,
        TokenKind::Style,
        TokenKind::Script,
        TokenKind::Use,
        TokenKind::Inherit,
        TokenKind::Delete,
        TokenKind::Insert,
        TokenKind::From,
        TokenKind::As,
        TokenKind::Except,
        TokenKind::Html5,
    ];
    for (token, kind) in tokens.iter().zip(expected.iter()) {
        assert_eq!(token.kind, *kind, "keyword {:?}", token.lexeme);
    }
}

#[test]
fn test_identifier_with_hyphen() {
    let (tokens, _) = tokenize("font-size: 12px;");
    assert_eq!(tokens[0].kind, TokenKind::Identifier);
    assert_eq!(tokens[0].lexeme, "font-size");
}

#[test]
fn test_script_body_is_raw() {
    let (tokens, diagnostics) = tokenize("script { if (a) { b(); } }");
    assert!(diagnostics.is_empty());
    assert_eq!(tokens[0].kind, TokenKind::Script);
    assert_eq!(tokens[1].kind, TokenKind::LeftBrace);
    assert_eq!(tokens[2].kind, TokenKind::RawContent);
    assert!(tokens[2].lexeme.contains("if (a) { b(); }"));
    assert_eq!(tokens[3].kind, TokenKind::RightBrace);
    assert_eq!(tokens[4].kind, TokenKind::Eof);
}

#[test]
fn test_raw_capture_ignores_braces_in_strings() {
    let (tokens, _) = tokenize("script { var s = \"}\"; }");
    assert_eq!(tokens[2].kind, TokenKind::RawContent);
    assert!(tokens[2].lexeme.contains("\"}\""));
    assert_eq!(tokens[3].kind, TokenKind::RightBrace);
}

#[test]
fn test_origin_body_is_raw() {
    let (tokens, diagnostics) = tokenize("[Origin] @Html box { <div>&</div> }");
    assert!(diagnostics.is_empty());
    assert_eq!(tokens[0].kind, TokenKind::Origin);
    assert_eq!(tokens[1].kind, TokenKind::TagHtml);
    assert_eq!(tokens[2].kind, TokenKind::Identifier);
    assert_eq!(tokens[3].kind, TokenKind::LeftBrace);
    assert_eq!(tokens[4].kind, TokenKind::RawContent);
    assert!(tokens[4].lexeme.contains("<div>&</div>"));
}

#[test]
fn test_style_body_is_not_raw() {
    let (tokens, _) = tokenize("style { color: red; }");
    assert!(tokens.iter().all(|t| t.kind != TokenKind::RawContent));
}

#[test]
fn test_positions_track_lines_and_offsets() {
    let (tokens, _) = tokenize("a\n  b");
    assert_eq!(tokens[0].position.line, 1);
    assert_eq!(tokens[0].position.column, 1);
    assert_eq!(tokens[0].position.offset, 0);
    assert_eq!(tokens[1].position.line, 2);
    assert_eq!(tokens[1].position.column, 3);
    assert_eq!(tokens[1].position.offset, 4);
}

#[test]
fn test_invalid_character_recovers() {
    let (tokens, diagnostics) = tokenize("a ! b");
    assert_eq!(tokens[0].kind, TokenKind::Identifier);
    assert_eq!(tokens[1].kind, TokenKind::Invalid);
    assert_eq!(tokens[2].kind, TokenKind::Identifier);
    assert_eq!(diagnostics.len(), 1);
}
