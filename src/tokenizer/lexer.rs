//! CHTL Lexer - character stream to token stream
//!
//! The lexer consumes a UTF-8 source string and produces a finite token
//! vector ending in `Eof`. It never fails hard: an unrecognised character
//! becomes one `Invalid` token with a diagnostic and scanning resumes at
//! the next character.
//!
//! Two constructs are captured raw rather than tokenized: the body of a
//! `script { ... }` block and the body of an `[Origin]` block. Their
//! contents belong to foreign languages, so the lexer tracks a small
//! amount of context and swallows the whole brace-balanced body into a
//! single `RawContent` token (string- and comment-aware so stray braces
//! inside them do not unbalance the scan).

use crate::diagnostics::{Diagnostic, Phase};
use crate::tokenizer::patterns::{
    is_identifier_continue, is_identifier_start, is_unquoted_literal_char,
};
use crate::tokenizer::tokens::{
    bracket_prefix_kind, type_tag_kind, word_keyword_kind, Position, Token, TokenKind,
};

/// Raw-capture context tracked across tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
enum RawPending {
    /// `script` keyword seen; capture after the next `{`
    Script,
    /// `[Origin]` seen; a type tag and an optional name may intervene
    /// before the `{`
    Origin,
}

/// Main CHTL lexer
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    offset: usize,
    diagnostics: Vec<Diagnostic>,
    raw_pending: Option<RawPending>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            offset: 0,
            diagnostics: Vec::new(),
            raw_pending: None,
        }
    }

    /// Tokenize the whole input. Always ends with an `Eof` token.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            self.skip_whitespace();
            if self.is_at_end() {
                break;
            }

            let token = self.next_token();
            self.update_raw_state(&token);
            let capture_now =
                token.kind == TokenKind::LeftBrace && self.raw_pending.is_some();
            tokens.push(token);

            if capture_now {
                self.raw_pending = None;
                tokens.push(self.read_raw_content());
                if self.peek() == Some('}') {
                    let pos = self.current_position();
                    self.advance();
                    tokens.push(Token::new(TokenKind::RightBrace, "}", pos));
                }
            }
        }

        tokens.push(Token::new(TokenKind::Eof, "", self.current_position()));
        tokens
    }

    /// Diagnostics collected while scanning.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    // Raw-capture context transitions. A `script` keyword or `[Origin]`
    // prefix arms the capture; the type tag and optional name after
    // `[Origin]` keep it armed; anything else disarms it.
    fn update_raw_state(&mut self, token: &Token) {
        match token.kind {
            TokenKind::Script => self.raw_pending = Some(RawPending::Script),
            TokenKind::Origin => self.raw_pending = Some(RawPending::Origin),
            TokenKind::Identifier => {
                if self.raw_pending != Some(RawPending::Origin) {
                    self.raw_pending = None;
                }
            }
            TokenKind::LeftBrace => {}
            _ if token.kind.is_type_tag() => {
                if self.raw_pending != Some(RawPending::Origin) {
                    self.raw_pending = None;
                }
            }
            _ => self.raw_pending = None,
        }
    }

    fn next_token(&mut self) -> Token {
        let pos = self.current_position();
        let ch = match self.peek() {
            Some(c) => c,
            None => return Token::new(TokenKind::Eof, "", pos),
        };

        match ch {
            '"' | '\'' => self.read_string(),
            '0'..='9' => self.read_number(),
            '[' => self.read_bracket(),
            '@' => self.read_type_tag(),
            '.' => self.read_dot_or_class_selector(),
            '#' => self.read_hash_or_id_selector(),
            '/' => self.read_slash_or_comment(),
            '-' => self.read_dash(),
            '{' => self.punct(TokenKind::LeftBrace, "{"),
            '}' => self.punct(TokenKind::RightBrace, "}"),
            '(' => self.punct(TokenKind::LeftParen, "("),
            ')' => self.punct(TokenKind::RightParen, ")"),
            ']' => self.punct(TokenKind::RightBracket, "]"),
            '<' => self.punct(TokenKind::LessThan, "<"),
            '>' => self.punct(TokenKind::GreaterThan, ">"),
            ';' => self.punct(TokenKind::Semicolon, ";"),
            ',' => self.punct(TokenKind::Comma, ","),
            '*' => self.punct(TokenKind::Star, "*"),
            '&' => self.punct(TokenKind::Ampersand, "&"),
            ':' => self.punct(TokenKind::Colon, ":"),
            '=' => self.punct(TokenKind::Equals, "="),
            c if is_identifier_start(c) => self.read_word(),
            c => {
                self.advance();
                self.diagnostics.push(Diagnostic::error(
                    Phase::Lex,
                    pos,
                    format!("unrecognised character '{}'", c),
                ));
                Token::new(TokenKind::Invalid, c.to_string(), pos)
            }
        }
    }

    fn punct(&mut self, kind: TokenKind, lexeme: &str) -> Token {
        let pos = self.current_position();
        self.advance();
        Token::new(kind, lexeme, pos)
    }

    /// Scan a quoted string, honouring `\n \t \r \\ \" \'` escapes.
    fn read_string(&mut self) -> Token {
        let pos = self.current_position();
        let quote = self.advance().unwrap_or('"');
        let mut content = String::new();

        loop {
            match self.peek() {
                None | Some('\n') => {
                    self.diagnostics.push(Diagnostic::error(
                        Phase::Lex,
                        pos,
                        "unterminated string literal",
                    ));
                    return Token::new(TokenKind::Invalid, content, pos);
                }
                Some(c) if c == quote => {
                    self.advance();
                    return Token::new(TokenKind::StringLit, content, pos);
                }
                Some('\\') => {
                    self.advance();
                    match self.peek() {
                        Some('n') => content.push('\n'),
                        Some('t') => content.push('\t'),
                        Some('r') => content.push('\r'),
                        Some('\\') => content.push('\\'),
                        Some('"') => content.push('"'),
                        Some('\'') => content.push('\''),
                        Some(other) => {
                            content.push('\\');
                            content.push(other);
                        }
                        None => continue,
                    }
                    self.advance();
                }
                Some(c) => {
                    content.push(c);
                    self.advance();
                }
            }
        }
    }

    /// Scan an integer or decimal. A number that runs directly into
    /// identifier characters or `%` is a CSS dimension and becomes one
    /// unquoted literal (`12px`, `100%`).
    fn read_number(&mut self) -> Token {
        let pos = self.current_position();
        let mut content = String::new();

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                content.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            content.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    content.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if self.peek().is_some_and(is_unquoted_literal_char) {
            while let Some(c) = self.peek() {
                if is_unquoted_literal_char(c) {
                    content.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            return Token::new(TokenKind::UnquotedLit, content, pos);
        }

        Token::new(TokenKind::Number, content, pos)
    }

    /// Scan `[...]`. A purely alphabetic word in the prefix table becomes a
    /// single atomic token including the brackets; an unknown alphabetic
    /// word is an `Invalid` token; anything else (e.g. the index form
    /// `[0]`) is plain bracket punctuation.
    fn read_bracket(&mut self) -> Token {
        let pos = self.current_position();

        let mut lookahead = self.position + 1;
        let mut word = String::new();
        while let Some(&c) = self.input.get(lookahead) {
            if c == ']' {
                break;
            }
            word.push(c);
            lookahead += 1;
        }
        let closed = self.input.get(lookahead) == Some(&']');

        if closed && !word.is_empty() && word.chars().all(|c| c.is_ascii_alphabetic()) {
            // Consume the whole `[Word]`
            for _ in 0..(lookahead - self.position + 1) {
                self.advance();
            }
            let lexeme = format!("[{}]", word);
            return match bracket_prefix_kind(&word) {
                Some(kind) => Token::new(kind, lexeme, pos),
                None => {
                    self.diagnostics.push(Diagnostic::error(
                        Phase::Lex,
                        pos,
                        format!("unknown bracket prefix '{}'", lexeme),
                    ));
                    Token::new(TokenKind::Invalid, lexeme, pos)
                }
            };
        }

        self.advance();
        Token::new(TokenKind::LeftBracket, "[", pos)
    }

    /// Scan `@Word` and look it up in the type tag table.
    fn read_type_tag(&mut self) -> Token {
        let pos = self.current_position();
        self.advance();
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }

        match type_tag_kind(&word) {
            Some((kind, canonical)) => Token::new(kind, canonical, pos),
            None => {
                self.diagnostics.push(Diagnostic::error(
                    Phase::Lex,
                    pos,
                    format!("unknown type tag '@{}'", word),
                ));
                Token::new(TokenKind::Invalid, format!("@{}", word), pos)
            }
        }
    }

    fn read_dot_or_class_selector(&mut self) -> Token {
        let pos = self.current_position();
        if self.peek_at(1).is_some_and(is_identifier_start) {
            self.advance();
            let name = self.read_identifier_chars();
            Token::new(TokenKind::ClassSelector, format!(".{}", name), pos)
        } else {
            self.punct(TokenKind::Dot, ".")
        }
    }

    fn read_hash_or_id_selector(&mut self) -> Token {
        let pos = self.current_position();
        if self.peek_at(1).is_some_and(is_identifier_start) {
            self.advance();
            let name = self.read_identifier_chars();
            Token::new(TokenKind::IdSelector, format!("#{}", name), pos)
        } else {
            self.punct(TokenKind::Hash, "#")
        }
    }

    /// `//` line comment, `/* */` block comment (not nested), or `/`.
    fn read_slash_or_comment(&mut self) -> Token {
        let pos = self.current_position();
        match self.peek_at(1) {
            Some('/') => {
                self.advance();
                self.advance();
                let mut content = String::new();
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    content.push(c);
                    self.advance();
                }
                Token::new(TokenKind::LineComment, content.trim().to_string(), pos)
            }
            Some('*') => {
                self.advance();
                self.advance();
                let mut content = String::new();
                loop {
                    match self.peek() {
                        None => {
                            self.diagnostics.push(Diagnostic::error(
                                Phase::Lex,
                                pos,
                                "unterminated block comment",
                            ));
                            break;
                        }
                        Some('*') if self.peek_at(1) == Some('/') => {
                            self.advance();
                            self.advance();
                            break;
                        }
                        Some(c) => {
                            content.push(c);
                            self.advance();
                        }
                    }
                }
                Token::new(TokenKind::BlockComment, content.trim().to_string(), pos)
            }
            _ => self.punct(TokenKind::Slash, "/"),
        }
    }

    /// `--` generator comment to end of line, else an unquoted literal
    /// beginning with `-` (negative values, vendor prefixes).
    fn read_dash(&mut self) -> Token {
        let pos = self.current_position();
        if self.peek_at(1) == Some('-') {
            self.advance();
            self.advance();
            let mut content = String::new();
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                content.push(c);
                self.advance();
            }
            return Token::new(TokenKind::GeneratorComment, content.trim().to_string(), pos);
        }

        let mut content = String::new();
        content.push('-');
        self.advance();
        while let Some(c) = self.peek() {
            if is_unquoted_literal_char(c) {
                content.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Token::new(TokenKind::UnquotedLit, content, pos)
    }

    /// Identifier or keyword. `at` peeks one word ahead for the two-word
    /// forms `at top` and `at bottom`.
    fn read_word(&mut self) -> Token {
        let pos = self.current_position();
        let word = self.read_identifier_chars();

        if word == "at" {
            let saved = self.save_state();
            self.skip_whitespace_no_newline();
            let next = self.read_identifier_chars();
            match next.as_str() {
                "top" => return Token::new(TokenKind::AtTop, "at top", pos),
                "bottom" => return Token::new(TokenKind::AtBottom, "at bottom", pos),
                _ => self.restore_state(saved),
            }
        }

        match word_keyword_kind(&word) {
            Some(kind) => Token::new(kind, word, pos),
            None => Token::new(TokenKind::Identifier, word, pos),
        }
    }

    fn read_identifier_chars(&mut self) -> String {
        let mut word = String::new();
        if self.peek().is_some_and(is_identifier_start) {
            word.push(self.advance().unwrap());
            while let Some(c) = self.peek() {
                if is_identifier_continue(c) {
                    word.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        word
    }

    /// Capture a brace-balanced foreign body verbatim. The opening `{` has
    /// already been consumed; scanning stops before the matching `}`.
    /// Strings, line comments and block comments are honoured so braces
    /// inside them do not unbalance the scan.
    fn read_raw_content(&mut self) -> Token {
        let pos = self.current_position();
        let mut content = String::new();
        let mut depth: usize = 1;

        while let Some(c) = self.peek() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                '"' | '\'' | '`' => {
                    let quote = c;
                    content.push(c);
                    self.advance();
                    while let Some(inner) = self.peek() {
                        content.push(inner);
                        self.advance();
                        if inner == '\\' {
                            if let Some(escaped) = self.peek() {
                                content.push(escaped);
                                self.advance();
                            }
                            continue;
                        }
                        if inner == quote || (inner == '\n' && quote != '`') {
                            break;
                        }
                    }
                    continue;
                }
                '/' => {
                    if self.peek_at(1) == Some('/') {
                        while let Some(cc) = self.peek() {
                            if cc == '\n' {
                                break;
                            }
                            content.push(cc);
                            self.advance();
                        }
                        continue;
                    }
                    if self.peek_at(1) == Some('*') {
                        content.push('/');
                        self.advance();
                        content.push('*');
                        self.advance();
                        while let Some(cc) = self.peek() {
                            if cc == '*' && self.peek_at(1) == Some('/') {
                                content.push('*');
                                self.advance();
                                content.push('/');
                                self.advance();
                                break;
                            }
                            content.push(cc);
                            self.advance();
                        }
                        continue;
                    }
                }
                _ => {}
            }
            content.push(c);
            self.advance();
        }

        if self.is_at_end() {
            self.diagnostics.push(Diagnostic::error(
                Phase::Lex,
                pos,
                "unterminated raw block",
            ));
        }

        Token::new(TokenKind::RawContent, content, pos)
    }

    // --- character-level helpers ---

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.input.get(self.position + ahead).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.input.get(self.position).copied()?;
        self.position += 1;
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' || c == '\r' || c == '\n' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_whitespace_no_newline(&mut self) {
        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' || c == '\r' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn current_position(&self) -> Position {
        Position::new(self.line, self.column, self.offset)
    }

    fn save_state(&self) -> (usize, usize, usize, usize) {
        (self.position, self.line, self.column, self.offset)
    }

    fn restore_state(&mut self, state: (usize, usize, usize, usize)) {
        self.position = state.0;
        self.line = state.1;
        self.column = state.2;
        self.offset = state.3;
    }
}
