//! CHTL Compiler
//!
//! A source-to-source compiler for CHTL ("C-style Hypertext Language"):
//! a brace-delimited authoring language that augments plain HTML with
//! templates, customisation with inheritance and specialisation, scoped
//! style and script blocks, raw embeds, and a module/import system with
//! namespaces. One compilation produces three artifacts: HTML markup, a
//! CSS stylesheet, and JavaScript.
//!
//! # Architecture
//!
//! The compiler is a three-phase pipeline over a shared symbol
//! environment:
//!
//! 1. **Lexing** ([`tokenizer`]) - character stream → positioned tokens
//! 2. **Parsing** ([`parser`]) - tokens → typed AST ([`ast`]) with
//!    recovery and diagnostics
//! 3. **Resolution** ([`symbols`]) - one walk registers templates,
//!    customs, variable groups, origins, and configurations, and splices
//!    imports
//! 4. **Generation** ([`generator`]) - emits HTML/CSS/JS, instantiating
//!    templates on demand through the [`template`] engine
//!
//! Phase orchestration lives in [`pipeline`]; the embedder-facing entry
//! points, options, and the compilation cache live in [`api`].
//!
//! # Usage
//!
//! ```rust
//! let result = chtl::compile("html { body { text { \"hi\" } } }");
//! assert!(result.success);
//! assert_eq!(result.html, "<html><body>hi</body></html>");
//! ```
//!
//! Scripted blocks are handed to the CHTL-JS collaborator, which is
//! injected as a plain function at the driver layer; without one, script
//! content passes through unchanged.

pub mod api;
pub mod ast;
pub mod cache;
pub mod diagnostics;
pub mod generator;
pub mod parser;
pub mod pipeline;
pub mod symbols;
pub mod template;
pub mod tokenizer;

pub use api::{
    compile, compile_file, dump, CompileOptions, CompileResult, Compiler, DumpFormat,
};
pub use diagnostics::{Diagnostic, Phase, Severity};
