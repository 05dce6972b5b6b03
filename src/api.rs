//! Compiler API
//!
//! Entry points for drivers and embedders. The free functions
//! [`compile`] and [`compile_file`] run with default options; a
//! [`Compiler`] value owns options, the compilation cache, and the
//! optional CHTL-JS transpiler for callers that need configuration.
//!
//! The debug surface ([`dump`]) exposes intermediate pipeline states as
//! JSON (token stream, AST, diagnostics) or a plain-text tree, mirroring
//! the stages a build can be inspected at.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::ast::nodes::{DocumentNode, Node, UseNode, UseTarget};
use crate::ast::DocumentIndex;
use crate::cache::{CachedResult, CompilationCache};
use crate::diagnostics::{Diagnostic, Phase, Severity};
use crate::generator::GeneratorConfig;
use crate::pipeline::{generate_pipeline, parse_pipeline, resolve_pipeline};
use crate::symbols::SymbolEnv;
use crate::tokenizer::tokenize;

/// Compile options with the documented defaults.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Keep generator comments in the HTML output
    pub preserve_comments: bool,
    /// Collapse CSS rules onto single lines
    pub minify_output: bool,
    /// Charset for the `<meta>` tag of full html5 documents
    pub output_charset: String,
    /// Indentation unit for non-minified output
    pub indent_string: String,
    /// Treat warnings as errors
    pub strict_mode: bool,
    /// Abort between phases on the first error
    pub stop_on_first_error: bool,
    /// Keep the compilation cache
    pub enable_caching: bool,
    /// LRU capacity of the compilation cache
    pub cache_size_max: usize,
    /// Search roots for logical (`Name.Subname`) imports
    pub import_paths: Vec<PathBuf>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            preserve_comments: true,
            minify_output: false,
            output_charset: "utf-8".to_string(),
            indent_string: "  ".to_string(),
            strict_mode: true,
            stop_on_first_error: false,
            enable_caching: true,
            cache_size_max: 256,
            import_paths: Vec::new(),
        }
    }
}

impl CompileOptions {
    fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            preserve_comments: self.preserve_comments,
            minify_output: self.minify_output,
            output_charset: self.output_charset.clone(),
            indent_string: self.indent_string.clone(),
        }
    }
}

/// Compilation metadata attached to every result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationInfo {
    pub source_path: Option<String>,
    pub compiled_at: String,
    pub compiler_version: String,
}

impl CompilationInfo {
    fn now(source_path: Option<&str>) -> Self {
        Self {
            source_path: source_path.map(str::to_string),
            compiled_at: chrono::Utc::now().to_rfc3339(),
            compiler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// The result of one compilation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileResult {
    pub success: bool,
    pub html: String,
    pub css: String,
    pub js: String,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub from_cache: bool,
    pub compilation_time_ms: u64,
    pub info: CompilationInfo,
}

/// The injected CHTL-JS collaborator.
pub type JsTranspiler = Box<dyn Fn(&str) -> (String, Vec<Diagnostic>)>;

/// A configured compiler with its own cache and JS hook.
pub struct Compiler {
    options: CompileOptions,
    cache: CompilationCache,
    js_transpiler: Option<JsTranspiler>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        let cache = CompilationCache::new(options.cache_size_max);
        Self {
            options,
            cache,
            js_transpiler: None,
        }
    }

    pub fn with_js_transpiler(mut self, transpiler: JsTranspiler) -> Self {
        self.js_transpiler = Some(transpiler);
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile CHTL source text. `filename` is used for cache keying,
    /// relative import resolution, and result metadata.
    pub fn compile(&mut self, source: &str, filename: Option<&str>) -> CompileResult {
        let started = Instant::now();
        let key = CompilationCache::key(source, filename);

        if self.options.enable_caching {
            if let Some(hit) = self.cache.get(key) {
                return CompileResult {
                    success: hit.errors.is_empty(),
                    html: hit.html,
                    css: hit.css,
                    js: hit.js,
                    errors: hit.errors,
                    warnings: hit.warnings,
                    from_cache: true,
                    compilation_time_ms: started.elapsed().as_millis() as u64,
                    info: CompilationInfo::now(filename),
                };
            }
        }

        let (document, mut diagnostics) = parse_pipeline(source);

        if self.options.stop_on_first_error && diagnostics.iter().any(Diagnostic::is_error) {
            return self.finish(
                filename,
                started,
                key,
                String::new(),
                String::new(),
                String::new(),
                diagnostics,
                &self.options.clone(),
            );
        }

        let base_dir = filename
            .and_then(|f| Path::new(f).parent().map(Path::to_path_buf))
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from("."));
        let (env, resolve_diagnostics) =
            resolve_pipeline(&document, &base_dir, self.options.import_paths.clone());
        diagnostics.extend(resolve_diagnostics);

        let mut effective = self.options.clone();
        apply_use_configs(&document, &env, &mut effective, &mut diagnostics);

        if effective.stop_on_first_error && diagnostics.iter().any(Diagnostic::is_error) {
            return self.finish(
                filename,
                started,
                key,
                String::new(),
                String::new(),
                String::new(),
                diagnostics,
                &effective,
            );
        }

        let output = generate_pipeline(
            &document,
            &env,
            effective.generator_config(),
            self.js_transpiler.as_deref(),
        );
        diagnostics.extend(output.diagnostics);

        self.finish(
            filename,
            started,
            key,
            output.html,
            output.css,
            output.js,
            diagnostics,
            &effective,
        )
    }

    /// Compile a `.chtl` file. An unreadable main source is the one
    /// fatal condition: it returns `success == false` immediately.
    pub fn compile_file(&mut self, path: impl AsRef<Path>) -> CompileResult {
        let path = path.as_ref();
        let started = Instant::now();
        match std::fs::read_to_string(path) {
            Ok(source) => self.compile(&source, Some(&path.display().to_string())),
            Err(err) => CompileResult {
                success: false,
                html: String::new(),
                css: String::new(),
                js: String::new(),
                errors: vec![Diagnostic::error(
                    Phase::Resolve,
                    crate::tokenizer::Position::start(),
                    format!("cannot read '{}': {}", path.display(), err),
                )],
                warnings: Vec::new(),
                from_cache: false,
                compilation_time_ms: started.elapsed().as_millis() as u64,
                info: CompilationInfo::now(Some(&path.display().to_string())),
            },
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &mut self,
        filename: Option<&str>,
        started: Instant,
        key: u64,
        html: String,
        css: String,
        js: String,
        diagnostics: Vec<Diagnostic>,
        effective: &CompileOptions,
    ) -> CompileResult {
        let (mut errors, mut warnings): (Vec<Diagnostic>, Vec<Diagnostic>) =
            diagnostics.into_iter().partition(Diagnostic::is_error);

        if effective.strict_mode {
            errors.extend(warnings.drain(..).map(|mut diagnostic| {
                diagnostic.severity = Severity::Error;
                diagnostic
            }));
        }

        if self.options.enable_caching {
            self.cache.insert(
                key,
                CachedResult {
                    html: html.clone(),
                    css: css.clone(),
                    js: js.clone(),
                    errors: errors.clone(),
                    warnings: warnings.clone(),
                },
            );
        }

        CompileResult {
            success: errors.is_empty(),
            html,
            css,
            js,
            errors,
            warnings,
            from_cache: false,
            compilation_time_ms: started.elapsed().as_millis() as u64,
            info: CompilationInfo::now(filename),
        }
    }
}

/// Apply `use @Config Name;` declarations to the effective options.
fn apply_use_configs(
    document: &DocumentNode,
    env: &SymbolEnv,
    options: &mut CompileOptions,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for node in &document.children {
        let Node::Use(UseNode {
            target: UseTarget::Config(name),
            position,
        }) = node
        else {
            continue;
        };
        let Some(config) = env.configs.get(name) else {
            diagnostics.push(Diagnostic::error(
                Phase::Resolve,
                *position,
                format!("unknown configuration '{}'", name),
            ));
            continue;
        };

        for setting in &config.settings {
            let value = setting.value.as_str();
            match setting.name.to_ascii_uppercase().as_str() {
                "PRESERVE_COMMENTS" => {
                    apply_bool(&mut options.preserve_comments, setting, diagnostics)
                }
                "MINIFY_OUTPUT" => apply_bool(&mut options.minify_output, setting, diagnostics),
                "STRICT_MODE" => apply_bool(&mut options.strict_mode, setting, diagnostics),
                "STOP_ON_FIRST_ERROR" => {
                    apply_bool(&mut options.stop_on_first_error, setting, diagnostics)
                }
                "OUTPUT_CHARSET" => options.output_charset = value.to_string(),
                "INDENT_STRING" => options.indent_string = value.to_string(),
                _ => diagnostics.push(Diagnostic::warning(
                    Phase::Resolve,
                    setting.position,
                    format!("unknown configuration key '{}'", setting.name),
                )),
            }
        }
    }
}

fn apply_bool(
    slot: &mut bool,
    setting: &crate::ast::nodes::ConfigSetting,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match setting.value.to_ascii_lowercase().as_str() {
        "true" => *slot = true,
        "false" => *slot = false,
        other => diagnostics.push(Diagnostic::warning(
            Phase::Resolve,
            setting.position,
            format!(
                "configuration key '{}' expects true or false, got '{}'",
                setting.name, other
            ),
        )),
    }
}

/// Compile with default options.
pub fn compile(source: &str) -> CompileResult {
    Compiler::default().compile(source, None)
}

/// Compile a file with default options.
pub fn compile_file(path: impl AsRef<Path>) -> CompileResult {
    Compiler::default().compile_file(path)
}

/// Debug output formats for pipeline inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpFormat {
    TokenStream,
    Ast,
    Diagnostics,
    Tree,
}

impl std::str::FromStr for DumpFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tokens" => Ok(DumpFormat::TokenStream),
            "ast" => Ok(DumpFormat::Ast),
            "diagnostics" => Ok(DumpFormat::Diagnostics),
            "tree" => Ok(DumpFormat::Tree),
            _ => Err(format!("unknown dump format: {}", s)),
        }
    }
}

/// Render an intermediate pipeline state for debugging.
pub fn dump(source: &str, format: DumpFormat) -> Result<String, serde_json::Error> {
    match format {
        DumpFormat::TokenStream => {
            let (tokens, diagnostics) = tokenize(source);
            serde_json::to_string_pretty(&serde_json::json!({
                "tokens": tokens,
                "diagnostics": diagnostics,
            }))
        }
        DumpFormat::Ast => {
            let (document, diagnostics) = parse_pipeline(source);
            serde_json::to_string_pretty(&serde_json::json!({
                "document": document,
                "diagnostics": diagnostics,
            }))
        }
        DumpFormat::Diagnostics => {
            let (_, diagnostics) = parse_pipeline(source);
            serde_json::to_string_pretty(&serde_json::json!({ "diagnostics": diagnostics }))
        }
        DumpFormat::Tree => {
            let (document, _) = parse_pipeline(source);
            Ok(DocumentIndex::build(&document).render_tree())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_minimal_element() {
        let result = compile("html { body { text { \"hi\" } } }");
        assert!(result.success);
        assert_eq!(result.html, "<html><body>hi</body></html>");
        assert!(result.css.is_empty());
        assert!(result.js.is_empty());
        assert!(!result.from_cache);
    }

    #[test]
    fn test_empty_document_succeeds_with_empty_outputs() {
        let result = compile("");
        assert!(result.success);
        assert!(result.html.is_empty());
        assert!(result.css.is_empty());
        assert!(result.js.is_empty());
    }

    #[test]
    fn test_cache_hit_on_second_compile() {
        let mut compiler = Compiler::default();
        let first = compiler.compile("div { }", Some("a.chtl"));
        let second = compiler.compile("div { }", Some("a.chtl"));
        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(first.html, second.html);
    }

    #[test]
    fn test_caching_can_be_disabled() {
        let mut compiler = Compiler::new(CompileOptions {
            enable_caching: false,
            ..Default::default()
        });
        compiler.compile("div { }", None);
        let second = compiler.compile("div { }", None);
        assert!(!second.from_cache);
    }

    #[test]
    fn test_strict_mode_promotes_warnings() {
        let source = "div { style { } }"; // empty style block warns
        let strict = Compiler::new(CompileOptions {
            strict_mode: true,
            ..Default::default()
        })
        .compile(source, None);
        assert!(!strict.success);
        assert!(strict.warnings.is_empty());
        assert!(!strict.errors.is_empty());

        let lenient = Compiler::new(CompileOptions {
            strict_mode: false,
            ..Default::default()
        })
        .compile(source, None);
        assert!(lenient.success);
        assert_eq!(lenient.warnings.len(), 1);
    }

    #[test]
    fn test_stop_on_first_error_skips_generation() {
        let result = Compiler::new(CompileOptions {
            stop_on_first_error: true,
            ..Default::default()
        })
        .compile("div { id }\nspan { }", None);
        assert!(!result.success);
        assert!(result.html.is_empty());
    }

    #[test]
    fn test_use_config_applies_minify() {
        let source = "[Configuration] @Config C { MINIFY_OUTPUT: true; }\n\
                      use @Config C;\n\
                      div { style { color: red; } }";
        let result = Compiler::new(CompileOptions {
            strict_mode: false,
            ..Default::default()
        })
        .compile(source, None);
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.css, ".chtl-s1{color:red}");
    }

    #[test]
    fn test_unknown_config_key_warns() {
        let source = "[Configuration] @Config C { NO_SUCH_KEY: 1; }\nuse @Config C;";
        let result = Compiler::new(CompileOptions {
            strict_mode: false,
            ..Default::default()
        })
        .compile(source, None);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.message.contains("NO_SUCH_KEY")));
    }

    #[test]
    fn test_dump_formats() {
        let tokens = dump("div { }", DumpFormat::TokenStream).unwrap();
        assert!(tokens.contains("Identifier"));
        let ast = dump("div { }", DumpFormat::Ast).unwrap();
        assert!(ast.contains("Element"));
        let tree = dump("div { }", DumpFormat::Tree).unwrap();
        assert!(tree.starts_with("Document"));
        assert!("bogus".parse::<DumpFormat>().is_err());
    }

    #[test]
    fn test_compile_file_missing_is_fatal() {
        let result = compile_file("definitely-missing.chtl");
        assert!(!result.success);
        assert!(result.errors[0].message.contains("cannot read"));
    }

    #[test]
    fn test_compilation_info_populated() {
        let result = compile("div { }");
        assert_eq!(result.info.compiler_version, env!("CARGO_PKG_VERSION"));
        assert!(result.info.compiled_at.contains('T'));
    }

    #[test]
    fn test_js_transpiler_injection() {
        let mut compiler = Compiler::default().with_js_transpiler(Box::new(|src: &str| {
            (src.replace("{{", "document.querySelector("), Vec::new())
        }));
        let result = compiler.compile("div { script { var x = 1; } }", None);
        assert!(result.js.contains("var x = 1;"));
    }
}
