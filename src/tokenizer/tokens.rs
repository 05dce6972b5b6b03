//! Token definitions for the CHTL lexer
//!
//! Tokens carry their kind, the processed lexeme, and a [`Position`].
//! Keyword recognition is table-driven: bracket prefixes (`[Template]`),
//! type tags (`@Style`, case-insensitive on the tag part), and bare word
//! keywords each have their own lookup function.

use serde::{Deserialize, Serialize};

/// Source position: 1-based line and column, 0-based byte offset.
///
/// Positions are immutable after creation; the lexer stamps one onto every
/// token and the parser copies them onto AST nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }

    /// Position of the first byte of a source file.
    pub fn start() -> Self {
        Self::new(1, 1, 0)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Token kinds of the CHTL language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals
    StringLit,
    UnquotedLit,
    Number,
    Identifier,

    // Structural punctuation
    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LessThan,
    GreaterThan,
    Semicolon,
    Comma,
    Dot,
    Slash,
    Star,
    Ampersand,
    Hash,

    // CE-equivalent pair: distinct kinds, accepted interchangeably by the
    // parser wherever either may appear
    Colon,
    Equals,

    // Comments
    LineComment,
    BlockComment,
    GeneratorComment,

    // Bracket-prefix keywords (lexeme includes the brackets)
    Template,
    Custom,
    Origin,
    Configuration,
    Namespace,
    Import,
    Info,
    Export,
    Name,
    OriginType,

    // Type tags (lexeme is the canonical spelling, e.g. "@Style")
    TagStyle,
    TagElement,
    TagVar,
    TagHtml,
    TagJavaScript,
    TagChtl,
    TagCjmod,
    TagConfig,

    // Word keywords
    Text,
    Style,
    Script,
    Use,
    Inherit,
    Delete,
    Insert,
    After,
    Before,
    Replace,
    From,
    As,
    Except,
    Html5,
    AtTop,
    AtBottom,

    // Selectors (lexeme includes the sigil: ".box", "#top")
    ClassSelector,
    IdSelector,

    // Raw foreign content captured whole (script and origin bodies)
    RawContent,

    // Sentinels
    Newline,
    Eof,
    Invalid,
}

impl TokenKind {
    /// Both halves of the CE-equivalence pair.
    pub fn is_colon_or_equals(self) -> bool {
        matches!(self, TokenKind::Colon | TokenKind::Equals)
    }

    /// Bracket-prefix keywords double as parser synchronisation points.
    pub fn is_bracket_prefix(self) -> bool {
        matches!(
            self,
            TokenKind::Template
                | TokenKind::Custom
                | TokenKind::Origin
                | TokenKind::Configuration
                | TokenKind::Namespace
                | TokenKind::Import
                | TokenKind::Info
                | TokenKind::Export
                | TokenKind::Name
                | TokenKind::OriginType
        )
    }

    pub fn is_type_tag(self) -> bool {
        matches!(
            self,
            TokenKind::TagStyle
                | TokenKind::TagElement
                | TokenKind::TagVar
                | TokenKind::TagHtml
                | TokenKind::TagJavaScript
                | TokenKind::TagChtl
                | TokenKind::TagCjmod
                | TokenKind::TagConfig
        )
    }

    pub fn is_comment(self) -> bool {
        matches!(
            self,
            TokenKind::LineComment | TokenKind::BlockComment | TokenKind::GeneratorComment
        )
    }
}

/// A single token with its processed lexeme and source position.
///
/// For string literals the lexeme holds the unescaped content; for
/// selectors it includes the sigil; for bracket prefixes the brackets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            position,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.lexeme.is_empty() {
            write!(f, "Token({:?}, {})", self.kind, self.position)
        } else {
            write!(
                f,
                "Token({:?}, {:?}, {})",
                self.kind, self.lexeme, self.position
            )
        }
    }
}

/// Look up a bracket prefix word (without brackets), e.g. "Template".
pub fn bracket_prefix_kind(word: &str) -> Option<TokenKind> {
    match word {
        "Template" => Some(TokenKind::Template),
        "Custom" => Some(TokenKind::Custom),
        "Origin" => Some(TokenKind::Origin),
        "Configuration" => Some(TokenKind::Configuration),
        "Namespace" => Some(TokenKind::Namespace),
        "Import" => Some(TokenKind::Import),
        "Info" => Some(TokenKind::Info),
        "Export" => Some(TokenKind::Export),
        "Name" => Some(TokenKind::Name),
        "OriginType" => Some(TokenKind::OriginType),
        _ => None,
    }
}

/// Look up a type tag word (without the `@`), case-insensitively.
/// Returns the kind together with its canonical spelling.
pub fn type_tag_kind(word: &str) -> Option<(TokenKind, &'static str)> {
    match word.to_ascii_lowercase().as_str() {
        "style" => Some((TokenKind::TagStyle, "@Style")),
        "element" => Some((TokenKind::TagElement, "@Element")),
        "var" => Some((TokenKind::TagVar, "@Var")),
        "html" => Some((TokenKind::TagHtml, "@Html")),
        "javascript" => Some((TokenKind::TagJavaScript, "@JavaScript")),
        "chtl" => Some((TokenKind::TagChtl, "@Chtl")),
        "cjmod" => Some((TokenKind::TagCjmod, "@CJmod")),
        "config" => Some((TokenKind::TagConfig, "@Config")),
        _ => None,
    }
}

/// Look up a bare word keyword. `at` is handled separately by the lexer
/// because `at top` / `at bottom` are matched as single tokens.
pub fn word_keyword_kind(word: &str) -> Option<TokenKind> {
    match word {
        "text" => Some(TokenKind::Text),
        "style" => Some(TokenKind::Style),
        "script" => Some(TokenKind::Script),
        "use" => Some(TokenKind::Use),
        "inherit" => Some(TokenKind::Inherit),
        "delete" => Some(TokenKind::Delete),
        "insert" => Some(TokenKind::Insert),
        "after" => Some(TokenKind::After),
        "before" => Some(TokenKind::Before),
        "replace" => Some(TokenKind::Replace),
        "from" => Some(TokenKind::From),
        "as" => Some(TokenKind::As),
        "except" => Some(TokenKind::Except),
        "html5" => Some(TokenKind::Html5),
        _ => None,
    }
}
