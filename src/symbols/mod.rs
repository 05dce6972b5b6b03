//! Symbol environment and collection pass
//!
//! Pass 1 of the pipeline walks the parsed document once and registers
//! every template, custom, variable group, origin, and configuration
//! under its fully-qualified (namespace-prefixed, dotted) name. Imports
//! are resolved here too, by recursively loading and collecting the
//! target file (see [`imports`]).
//!
//! The environment is mutated only during this pass; template
//! instantiation and generation read it immutably.
//!
//! Invariants enforced here:
//! - a name is unique within `(category, kind)`; redefinition is a
//!   diagnostic and the first definition wins
//! - inheritance edges are recorded but not resolved (the template
//!   engine linearises them on demand)

pub mod imports;

use std::collections::HashMap;
use std::path::Path;

use crate::ast::nodes::*;
use crate::diagnostics::{Diagnostic, Phase};

pub use imports::ImportResolver;

/// Per-compilation symbol tables
#[derive(Debug, Clone, Default)]
pub struct SymbolEnv {
    pub templates: HashMap<(TemplateKind, String), TemplateDefNode>,
    pub customs: HashMap<(TemplateKind, String), TemplateDefNode>,
    /// Variable groups: `@Var` definitions from either table, by name
    pub variables: HashMap<String, TemplateDefNode>,
    pub origins: HashMap<(OriginKind, String), OriginDefNode>,
    pub configs: HashMap<String, ConfigurationNode>,
    pub info: Vec<ConfigSetting>,
    /// `[Export]` visibility list; `None` means everything is exported
    pub exports: Option<Vec<(TemplateKind, String)>>,
}

impl SymbolEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a template reference. A category prefix consults exactly
    /// one table; a short reference tries customs before templates.
    pub fn lookup_template(
        &self,
        category: Option<Category>,
        kind: TemplateKind,
        name: &str,
    ) -> Option<&TemplateDefNode> {
        match category {
            Some(Category::Template) => self.templates.get(&(kind, name.to_string())),
            Some(Category::Custom) => self.customs.get(&(kind, name.to_string())),
            None => self
                .customs
                .get(&(kind, name.to_string()))
                .or_else(|| self.templates.get(&(kind, name.to_string()))),
        }
    }

    pub fn lookup_variables(&self, group: &str) -> Option<&TemplateDefNode> {
        self.variables.get(group)
    }

    pub fn lookup_origin(&self, kind: &OriginKind, name: &str) -> Option<&OriginDefNode> {
        self.origins.get(&(kind.clone(), name.to_string()))
    }

    /// True when the module's export list (if any) covers the symbol.
    pub fn is_exported(&self, kind: TemplateKind, name: &str) -> bool {
        match &self.exports {
            None => true,
            Some(entries) => entries.iter().any(|(k, n)| *k == kind && n == name),
        }
    }

    fn register_template(&mut self, def: TemplateDefNode, diagnostics: &mut Vec<Diagnostic>) {
        let key = (def.kind, def.name.clone());
        let table = if def.is_custom {
            &mut self.customs
        } else {
            &mut self.templates
        };
        if table.contains_key(&key) {
            diagnostics.push(Diagnostic::error(
                Phase::Resolve,
                def.position,
                format!(
                    "duplicate {} definition '{} {}'",
                    if def.is_custom { "custom" } else { "template" },
                    def.kind,
                    def.name
                ),
            ));
            return;
        }
        if def.kind == TemplateKind::Var && !self.variables.contains_key(&def.name) {
            self.variables.insert(def.name.clone(), def.clone());
        }
        table.insert(key, def);
    }

    fn register_origin(&mut self, def: OriginDefNode, diagnostics: &mut Vec<Diagnostic>) {
        let name = match &def.name {
            Some(name) => name.clone(),
            None => return, // anonymous origins emit in place, nothing to register
        };
        let key = (def.kind.clone(), name);
        if self.origins.contains_key(&key) {
            diagnostics.push(Diagnostic::error(
                Phase::Resolve,
                def.position,
                format!("duplicate origin definition '{} {}'", key.0, key.1),
            ));
            return;
        }
        self.origins.insert(key, def);
    }

    fn register_config(&mut self, config: ConfigurationNode, diagnostics: &mut Vec<Diagnostic>) {
        let name = config.name.clone().unwrap_or_default();
        if self.configs.contains_key(&name) {
            diagnostics.push(Diagnostic::error(
                Phase::Resolve,
                config.position,
                format!("duplicate configuration '{}'", name),
            ));
            return;
        }
        self.configs.insert(name, config);
    }
}

/// Collect every definition in `document` into `env`, resolving imports
/// through `resolver`. `base_dir` anchors relative import paths.
pub fn collect(
    document: &DocumentNode,
    env: &mut SymbolEnv,
    resolver: &mut ImportResolver,
    base_dir: &Path,
    diagnostics: &mut Vec<Diagnostic>,
) {
    collect_children(&document.children, "", env, resolver, base_dir, diagnostics);
}

fn qualified(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn collect_children(
    children: &[Node],
    prefix: &str,
    env: &mut SymbolEnv,
    resolver: &mut ImportResolver,
    base_dir: &Path,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // A braceless `[Namespace] name` re-scopes the remainder of the list.
    let mut current_prefix = prefix.to_string();

    for node in children {
        match node {
            Node::Namespace(ns) => {
                let inner = qualified(&current_prefix, &ns.name);
                if ns.block {
                    collect_children(&ns.children, &inner, env, resolver, base_dir, diagnostics);
                } else {
                    current_prefix = inner;
                }
            }
            Node::TemplateDef(def) => {
                let mut def = def.clone();
                def.name = qualified(&current_prefix, &def.name);
                env.register_template(def, diagnostics);
            }
            Node::OriginDef(def) => {
                let mut def = def.clone();
                if let Some(name) = &def.name {
                    def.name = Some(qualified(&current_prefix, name));
                }
                env.register_origin(def, diagnostics);
            }
            Node::Configuration(config) => {
                env.register_config(config.clone(), diagnostics);
            }
            Node::Info(info) => {
                env.info.extend(info.entries.iter().cloned());
            }
            Node::Export(export) => match &mut env.exports {
                Some(entries) => entries.extend(export.entries.iter().cloned()),
                None => env.exports = Some(export.entries.clone()),
            },
            Node::Import(import) => {
                resolver.resolve(import, base_dir, env, diagnostics);
            }
            Node::Element(element) => {
                // Named origin definitions may sit inside elements; they
                // both emit in place and register for later references.
                collect_element_origins(element, &current_prefix, env, diagnostics);
            }
            _ => {}
        }
    }
}

fn collect_element_origins(
    element: &ElementNode,
    prefix: &str,
    env: &mut SymbolEnv,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for child in &element.children {
        match child {
            Node::OriginDef(def) if def.name.is_some() => {
                let mut def = def.clone();
                if let Some(name) = &def.name {
                    def.name = Some(qualified(prefix, name));
                }
                env.register_origin(def, diagnostics);
            }
            Node::Element(inner) => collect_element_origins(inner, prefix, env, diagnostics),
            _ => {}
        }
    }
}
