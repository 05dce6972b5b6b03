//! Diagnostic types shared by every compiler phase
//!
//! All phases report problems through the same [`Diagnostic`] value instead
//! of failing hard. A diagnostic carries the source position it refers to,
//! the phase that produced it, a severity, and a human-readable message.
//! The driver partitions collected diagnostics into errors and warnings
//! when building the final compile result.

use serde::{Deserialize, Serialize};

use crate::tokenizer::Position;

/// Compiler phase that produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Lexical analysis (character stream → tokens)
    Lex,
    /// Parsing (tokens → AST)
    Parse,
    /// Symbol collection, name resolution, imports
    Resolve,
    /// HTML/CSS/JS generation
    Emit,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Lex => write!(f, "lex"),
            Phase::Parse => write!(f, "parse"),
            Phase::Resolve => write!(f, "resolve"),
            Phase::Emit => write!(f, "emit"),
        }
    }
}

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single compiler diagnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub position: Position,
    pub phase: Phase,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(phase: Phase, position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            phase,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(phase: Phase, position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            phase,
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {} {}: {}",
            self.position.line, self.position.column, self.phase, self.severity, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::error(Phase::Parse, Position::new(3, 7, 42), "unexpected token");
        assert_eq!(diag.to_string(), "3:7: parse error: unexpected token");
    }

    #[test]
    fn test_severity_partition() {
        let err = Diagnostic::error(Phase::Lex, Position::start(), "bad char");
        let warn = Diagnostic::warning(Phase::Emit, Position::start(), "empty style block");
        assert!(err.is_error());
        assert!(!warn.is_error());
    }
}
