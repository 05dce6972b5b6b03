//! Import resolution
//!
//! An `[Import]` statement splices a view of another file's symbols into
//! the current environment. Target files are loaded once per compilation
//! (an import cache keyed by canonical path), parsed and collected
//! recursively, and cycles are detected with an in-progress set that
//! reports the full chain.
//!
//! Path forms:
//! - quoted relative paths resolve against the importing file's directory
//! - logical dotted names (`Name.Subname`) resolve against the driver's
//!   search path list, first by direct candidates and then by walking
//!   each root for a matching file name

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::ast::nodes::*;
use crate::diagnostics::{Diagnostic, Phase};
use crate::parser::parse;
use crate::symbols::{collect, SymbolEnv};
use crate::tokenizer::tokenize;

pub struct ImportResolver {
    search_paths: Vec<PathBuf>,
    cache: HashMap<PathBuf, SymbolEnv>,
    in_progress: Vec<PathBuf>,
}

impl ImportResolver {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            cache: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    /// Resolve one import statement into `env`.
    pub fn resolve(
        &mut self,
        import: &ImportNode,
        base_dir: &Path,
        env: &mut SymbolEnv,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        match import.kind {
            ImportKind::Chtl => self.resolve_chtl(import, base_dir, env, diagnostics),
            ImportKind::Style | ImportKind::Element | ImportKind::Var => {
                self.resolve_named_template(import, base_dir, env, diagnostics)
            }
            ImportKind::Html | ImportKind::JavaScript => {
                self.resolve_raw_file(import, base_dir, env, diagnostics)
            }
            ImportKind::Config => self.resolve_config(import, base_dir, env, diagnostics),
            ImportKind::CJmod => {
                diagnostics.push(Diagnostic::warning(
                    Phase::Resolve,
                    import.position,
                    "CJmod modules are loaded by the module runtime, not the compiler; import ignored",
                ));
            }
        }
    }

    fn resolve_chtl(
        &mut self,
        import: &ImportNode,
        base_dir: &Path,
        env: &mut SymbolEnv,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let Some(path) = self.locate(&import.path, base_dir, "chtl", import, diagnostics) else {
            return;
        };
        let Some(module) = self.load_module(&path, import.position, diagnostics) else {
            return;
        };

        let alias = import.alias.as_deref();
        let renamed = |name: &str| match alias {
            Some(a) => format!("{}.{}", a, name),
            None => name.to_string(),
        };
        let excluded = |name: &str| {
            import
                .except
                .iter()
                .any(|e| e == name || name.rsplit('.').next() == Some(e.as_str()))
        };

        // Splice in a stable order so collision diagnostics are
        // deterministic across runs.
        for table in [&module.templates, &module.customs] {
            let mut defs: Vec<_> = table.values().collect();
            defs.sort_by(|a, b| (a.kind, &a.name).cmp(&(b.kind, &b.name)));
            for def in defs {
                if !module.is_exported(def.kind, &def.name) || excluded(&def.name) {
                    continue;
                }
                let mut def = def.clone();
                def.name = renamed(&def.name);
                env.register_template(def, diagnostics);
            }
        }
        let mut origins: Vec<_> = module.origins.values().collect();
        origins.sort_by_key(|def| def.name.clone());
        for def in origins {
            if let Some(name) = &def.name {
                if excluded(name) {
                    continue;
                }
                let mut def = def.clone();
                def.name = Some(renamed(name));
                env.register_origin(def, diagnostics);
            }
        }
        let mut configs: Vec<_> = module.configs.iter().collect();
        configs.sort_by_key(|(name, _)| name.clone());
        for (name, config) in configs {
            if excluded(name) {
                continue;
            }
            let mut config = config.clone();
            config.name = Some(renamed(name));
            env.register_config(config, diagnostics);
        }
    }

    fn resolve_named_template(
        &mut self,
        import: &ImportNode,
        base_dir: &Path,
        env: &mut SymbolEnv,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let kind = match import.kind {
            ImportKind::Style => TemplateKind::Style,
            ImportKind::Element => TemplateKind::Element,
            _ => TemplateKind::Var,
        };
        let target = match &import.target {
            ImportTarget::Named(name) => name.clone(),
            _ => {
                diagnostics.push(Diagnostic::error(
                    Phase::Resolve,
                    import.position,
                    format!("a {:?} import needs a symbol name", import.kind),
                ));
                return;
            }
        };

        let Some(path) = self.locate(&import.path, base_dir, "chtl", import, diagnostics) else {
            return;
        };
        let Some(module) = self.load_module(&path, import.position, diagnostics) else {
            return;
        };

        match module.lookup_template(None, kind, &target) {
            Some(def) if module.is_exported(kind, &target) => {
                let mut def = def.clone();
                if let Some(alias) = &import.alias {
                    def.name = alias.clone();
                }
                env.register_template(def, diagnostics);
            }
            _ => {
                diagnostics.push(Diagnostic::error(
                    Phase::Resolve,
                    import.position,
                    format!("'{} {}' not found in {}", kind, target, path.display()),
                ));
            }
        }
    }

    fn resolve_raw_file(
        &mut self,
        import: &ImportNode,
        base_dir: &Path,
        env: &mut SymbolEnv,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let extension = if import.kind == ImportKind::Html {
            "html"
        } else {
            "js"
        };
        let Some(path) = self.locate(&import.path, base_dir, extension, import, diagnostics)
        else {
            return;
        };
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                diagnostics.push(Diagnostic::error(
                    Phase::Resolve,
                    import.position,
                    format!("cannot read '{}': {}", path.display(), err),
                ));
                return;
            }
        };

        let kind = if import.kind == ImportKind::Html {
            OriginKind::Html
        } else {
            OriginKind::JavaScript
        };
        let name = import
            .alias
            .clone()
            .or_else(|| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .unwrap_or_default();

        env.register_origin(
            OriginDefNode {
                kind,
                name: Some(name),
                content,
                position: import.position,
            },
            diagnostics,
        );
    }

    fn resolve_config(
        &mut self,
        import: &ImportNode,
        base_dir: &Path,
        env: &mut SymbolEnv,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let Some(path) = self.locate(&import.path, base_dir, "chtl", import, diagnostics) else {
            return;
        };
        let Some(module) = self.load_module(&path, import.position, diagnostics) else {
            return;
        };

        let wanted = match &import.target {
            ImportTarget::Named(name) => Some(name.clone()),
            _ => None,
        };
        let mut found = false;
        for (name, config) in &module.configs {
            if wanted.as_deref().map_or(true, |w| w == name) {
                let mut config = config.clone();
                if let Some(alias) = &import.alias {
                    config.name = Some(alias.clone());
                }
                env.register_config(config, diagnostics);
                found = true;
            }
        }
        if !found {
            diagnostics.push(Diagnostic::error(
                Phase::Resolve,
                import.position,
                format!("no matching configuration in {}", path.display()),
            ));
        }
    }

    /// Load, parse, and collect a module, with caching and cycle
    /// detection. Diagnostics from the module are reported prefixed with
    /// its path.
    fn load_module(
        &mut self,
        path: &Path,
        position: crate::tokenizer::Position,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<SymbolEnv> {
        let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

        if self.in_progress.contains(&canonical) {
            let mut chain: Vec<String> = self
                .in_progress
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            chain.push(canonical.display().to_string());
            diagnostics.push(Diagnostic::error(
                Phase::Resolve,
                position,
                format!("import cycle: {}", chain.join(" -> ")),
            ));
            return None;
        }
        if let Some(cached) = self.cache.get(&canonical) {
            return Some(cached.clone());
        }

        let source = match fs::read_to_string(&canonical) {
            Ok(source) => source,
            Err(err) => {
                diagnostics.push(Diagnostic::error(
                    Phase::Resolve,
                    position,
                    format!("cannot read '{}': {}", canonical.display(), err),
                ));
                return None;
            }
        };

        self.in_progress.push(canonical.clone());
        let (tokens, lex_diagnostics) = tokenize(&source);
        let (document, parse_diagnostics) = parse(&source, tokens);
        for diagnostic in lex_diagnostics.into_iter().chain(parse_diagnostics) {
            diagnostics.push(Diagnostic {
                message: format!("{}: {}", canonical.display(), diagnostic.message),
                ..diagnostic
            });
        }

        let mut module_env = SymbolEnv::new();
        let module_dir = canonical
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        let mut module_diagnostics = Vec::new();
        collect(
            &document,
            &mut module_env,
            self,
            &module_dir,
            &mut module_diagnostics,
        );
        diagnostics.extend(module_diagnostics);
        self.in_progress.pop();

        self.cache.insert(canonical, module_env.clone());
        Some(module_env)
    }

    /// Turn an import path into a file path. Paths with a separator or an
    /// extension are relative; bare dotted names are logical and go
    /// through the search path list.
    fn locate(
        &self,
        spec: &str,
        base_dir: &Path,
        extension: &str,
        import: &ImportNode,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<PathBuf> {
        let looks_like_path =
            spec.contains('/') || spec.contains('\\') || Path::new(spec).extension().is_some();

        if looks_like_path {
            let candidate = base_dir.join(spec);
            if candidate.is_file() {
                return Some(candidate);
            }
            diagnostics.push(Diagnostic::error(
                Phase::Resolve,
                import.position,
                format!("import path '{}' not found", candidate.display()),
            ));
            return None;
        }

        if let Some(found) = self.locate_logical(spec, base_dir, extension) {
            return Some(found);
        }
        diagnostics.push(Diagnostic::error(
            Phase::Resolve,
            import.position,
            format!("module '{}' not found on the import search path", spec),
        ));
        None
    }

    fn locate_logical(&self, name: &str, base_dir: &Path, extension: &str) -> Option<PathBuf> {
        let slashed = name.replace('.', "/");
        let leaf = name.rsplit('.').next().unwrap_or(name);
        let file_name = format!("{}.{}", leaf, extension);

        let mut roots: Vec<&Path> = vec![base_dir];
        roots.extend(self.search_paths.iter().map(|p| p.as_path()));

        for root in roots {
            for candidate in [
                root.join(format!("{}.{}", name, extension)),
                root.join(format!("{}.{}", slashed, extension)),
            ] {
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
            for entry in WalkDir::new(root).max_depth(6).into_iter().flatten() {
                if entry.file_type().is_file()
                    && entry.file_name() == std::ffi::OsStr::new(&file_name)
                {
                    return Some(entry.into_path());
                }
            }
        }
        None
    }
}
