//! Pipeline orchestration
//!
//! The compiler is a three-phase pipeline over a shared symbol
//! environment:
//!
//! 1. **Lex + Parse** (`parse_pipeline`): source text → tokens → AST,
//!    accumulating lex and parse diagnostics.
//! 2. **Resolve** (`resolve_pipeline`): one walk over the AST registers
//!    templates, customs, variable groups, origins, and configurations,
//!    and splices imports (recursively compiled, cached, cycle-checked).
//! 3. **Generate** (`generate_pipeline`): emits HTML/CSS/JS, invoking
//!    the template engine on demand for every use site.
//!
//! Each phase can be run on its own for testing and debugging; the
//! [`api`](crate::api) module composes them behind `compile`.
//!
//! Data flows strictly forward. The environment is mutated only during
//! resolve; generation reads it immutably.

use std::path::{Path, PathBuf};

use crate::ast::nodes::DocumentNode;
use crate::diagnostics::Diagnostic;
use crate::generator::{Generator, GeneratorConfig, GeneratorOutput, JsTranspiler};
use crate::parser::parse;
use crate::symbols::{collect, ImportResolver, SymbolEnv};
use crate::tokenizer::tokenize;

/// Fatal pipeline failure. Only I/O on the main source aborts a compile;
/// everything else degrades into diagnostics.
#[derive(Debug)]
pub enum PipelineError {
    Io(std::io::Error),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err)
    }
}

/// Phase 1: source text → AST. Lex and parse diagnostics are combined in
/// source order (lex first).
pub fn parse_pipeline(source: &str) -> (DocumentNode, Vec<Diagnostic>) {
    let (tokens, mut diagnostics) = tokenize(source);
    let (document, parse_diagnostics) = parse(source, tokens);
    diagnostics.extend(parse_diagnostics);
    (document, diagnostics)
}

/// Phase 2: AST → symbol environment. `base_dir` anchors relative
/// imports; `search_paths` feeds logical module resolution.
pub fn resolve_pipeline(
    document: &DocumentNode,
    base_dir: &Path,
    search_paths: Vec<PathBuf>,
) -> (SymbolEnv, Vec<Diagnostic>) {
    let mut env = SymbolEnv::new();
    let mut resolver = ImportResolver::new(search_paths);
    let mut diagnostics = Vec::new();
    collect(document, &mut env, &mut resolver, base_dir, &mut diagnostics);
    (env, diagnostics)
}

/// Phase 3: AST + environment → HTML/CSS/JS.
pub fn generate_pipeline(
    document: &DocumentNode,
    env: &SymbolEnv,
    config: GeneratorConfig,
    js_transpiler: Option<&JsTranspiler>,
) -> GeneratorOutput {
    let mut generator = Generator::new(env, config);
    if let Some(transpiler) = js_transpiler {
        generator = generator.with_js_transpiler(transpiler);
    }
    generator.generate(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pipeline_basic() {
        let (document, diagnostics) = parse_pipeline("div { text { \"hi\" } }");
        assert!(diagnostics.is_empty());
        assert_eq!(document.children.len(), 1);
    }

    #[test]
    fn test_resolve_pipeline_registers_templates() {
        let (document, _) = parse_pipeline("[Template] @Style T { color: red; }");
        let (env, diagnostics) = resolve_pipeline(&document, Path::new("."), Vec::new());
        assert!(diagnostics.is_empty());
        assert_eq!(env.templates.len(), 1);
    }

    #[test]
    fn test_generate_pipeline_minimal_element() {
        let (document, _) = parse_pipeline("html { body { text { \"hi\" } } }");
        let (env, _) = resolve_pipeline(&document, Path::new("."), Vec::new());
        let output = generate_pipeline(&document, &env, GeneratorConfig::default(), None);
        assert_eq!(output.html, "<html><body>hi</body></html>");
        assert!(output.css.is_empty());
        assert!(output.js.is_empty());
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_js_transpiler_is_called() {
        let transpiler = |source: &str| (format!("/*t*/{}", source), Vec::new());
        let (document, _) = parse_pipeline("div { script { alert(1); } }");
        let (env, _) = resolve_pipeline(&document, Path::new("."), Vec::new());
        let output =
            generate_pipeline(&document, &env, GeneratorConfig::default(), Some(&transpiler));
        assert!(output.html.contains("<script>/*t*/alert(1);</script>"));
        assert!(output.js.contains("/*t*/alert(1);"));
    }
}
