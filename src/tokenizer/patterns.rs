//! Centralized patterns shared by the tokenizer, the variable resolver,
//! and the test suites.

/// Pattern for valid CHTL identifiers: letter or underscore start, then
/// letters, digits, underscores, and hyphens (CSS property names).
pub const IDENTIFIER_PATTERN: &str = r"[A-Za-z_][A-Za-z0-9_\-]*";

/// Characters permitted inside an unquoted CSS-style literal.
pub const UNQUOTED_LITERAL_CHARS: &str = r"[A-Za-z0-9_\-%]";

/// Variable usage inside a value position: `Group(name)` or
/// `Group(name = value)`. Capture 1 = group, 2 = variable, 3 = override.
pub const VAR_USE_PATTERN: &str =
    r"([A-Za-z_][A-Za-z0-9_\-]*)\(\s*([A-Za-z_][A-Za-z0-9_\-]*)\s*(?:[:=]\s*([^)]*?)\s*)?\)";

/// True when the character can start an identifier.
pub fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

/// True when the character can continue an identifier.
pub fn is_identifier_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

/// True when the character can appear in an unquoted literal.
pub fn is_unquoted_literal_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || ch == '%'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_chars() {
        assert!(is_identifier_start('a'));
        assert!(is_identifier_start('_'));
        assert!(!is_identifier_start('1'));
        assert!(is_identifier_continue('-'));
        assert!(!is_identifier_continue('%'));
    }

    #[test]
    fn test_var_use_pattern_matches() {
        let re = regex::Regex::new(VAR_USE_PATTERN).unwrap();
        let caps = re.captures("ThemeColor(tableColor)").unwrap();
        assert_eq!(&caps[1], "ThemeColor");
        assert_eq!(&caps[2], "tableColor");
        assert!(caps.get(3).is_none());

        let caps = re.captures("V(primary = #fff)").unwrap();
        assert_eq!(&caps[3], "#fff");
    }
}
