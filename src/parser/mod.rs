//! CHTL Parser
//!
//! Syntactic analysis phase: the token vector from the tokenizer becomes
//! a typed [`DocumentNode`](crate::ast::DocumentNode) plus a diagnostics
//! list. Parsing is total: malformed input degrades into diagnostics and
//! skipped regions, never a panic or an early abort.
//!
//! # Usage
//!
//! ```rust
//! use chtl::parser::parse;
//! use chtl::tokenizer::tokenize;
//!
//! let source = "div { id: box; text { \"hi\" } }";
//! let (tokens, _) = tokenize(source);
//! let (document, diagnostics) = parse(source, tokens);
//! assert!(diagnostics.is_empty());
//! assert_eq!(document.children.len(), 1);
//! ```

pub mod parser;

pub use parser::{parse, Parser};
