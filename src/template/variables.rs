//! Variable group substitution
//!
//! Value text may reference variable groups with `Group(name)` or
//! `Group(name = override)`. Substitution is textual and recursive: a
//! substituted value may itself contain variable references, bounded by
//! [`MAX_SUBSTITUTION_DEPTH`] to keep self-referential definitions from
//! looping.
//!
//! Only names registered as variable groups are substituted; anything
//! else that merely looks like a call (`rgb(...)`, `calc(...)`) is left
//! untouched as ordinary CSS.

use regex::Regex;

use crate::diagnostics::{Diagnostic, Phase};
use crate::symbols::SymbolEnv;
use crate::template::TemplateEngine;
use crate::tokenizer::patterns::VAR_USE_PATTERN;
use crate::tokenizer::Position;

/// Hard cap on nested substitutions.
pub const MAX_SUBSTITUTION_DEPTH: usize = 32;

pub struct VariableResolver<'env> {
    engine: TemplateEngine<'env>,
    pattern: Regex,
}

impl<'env> VariableResolver<'env> {
    pub fn new(env: &'env SymbolEnv) -> Self {
        Self {
            engine: TemplateEngine::new(env),
            pattern: Regex::new(VAR_USE_PATTERN).expect("variable pattern is valid"),
        }
    }

    /// Substitute every variable reference in `value`.
    pub fn substitute(
        &self,
        value: &str,
        position: Position,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> String {
        self.substitute_at_depth(value, 0, position, diagnostics)
    }

    fn substitute_at_depth(
        &self,
        value: &str,
        depth: usize,
        position: Position,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> String {
        if !self.pattern.is_match(value) {
            return value.to_string();
        }
        if depth >= MAX_SUBSTITUTION_DEPTH {
            diagnostics.push(Diagnostic::error(
                Phase::Emit,
                position,
                format!(
                    "variable substitution exceeded {} nested levels; check for self-referential variables",
                    MAX_SUBSTITUTION_DEPTH
                ),
            ));
            return value.to_string();
        }

        let mut out = String::with_capacity(value.len());
        let mut last = 0;
        for caps in self.pattern.captures_iter(value) {
            let whole = caps.get(0).unwrap();
            let group = &caps[1];
            let name = &caps[2];
            let override_value = caps.get(3).map(|m| m.as_str());

            out.push_str(&value[last..whole.start()]);
            last = whole.end();

            match self.resolve_one(group, name, override_value, position, diagnostics) {
                Some(resolved) => {
                    out.push_str(&self.substitute_at_depth(
                        &resolved,
                        depth + 1,
                        position,
                        diagnostics,
                    ));
                }
                // Unknown group or missing variable: keep the text as
                // written so the output still shows what was meant.
                None => out.push_str(whole.as_str()),
            }
        }
        out.push_str(&value[last..]);
        out
    }

    fn resolve_one(
        &self,
        group: &str,
        name: &str,
        override_value: Option<&str>,
        position: Position,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<String> {
        // A use-site override wins without consulting the group, but the
        // group must still exist for this to be a variable reference.
        let vars = self.engine.resolve_var_group(group, diagnostics)?;

        if let Some(value) = override_value {
            return Some(value.to_string());
        }
        match vars.iter().find(|v| v.name == name) {
            Some(var) => Some(var.value.clone()),
            None => {
                diagnostics.push(Diagnostic::error(
                    Phase::Emit,
                    position,
                    format!("variable group '{}' has no member '{}'", group, name),
                ));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::symbols::{collect, ImportResolver};
    use crate::tokenizer::tokenize;
    use std::path::Path;

    fn env_of(source: &str) -> SymbolEnv {
        let (tokens, _) = tokenize(source);
        let (document, _) = parse(source, tokens);
        let mut env = SymbolEnv::new();
        let mut resolver = ImportResolver::new(Vec::new());
        let mut diagnostics = Vec::new();
        collect(
            &document,
            &mut env,
            &mut resolver,
            Path::new("."),
            &mut diagnostics,
        );
        env
    }

    fn substitute(env: &SymbolEnv, value: &str) -> (String, Vec<Diagnostic>) {
        let resolver = VariableResolver::new(env);
        let mut diagnostics = Vec::new();
        let out = resolver.substitute(value, Position::start(), &mut diagnostics);
        (out, diagnostics)
    }

    #[test]
    fn test_simple_substitution() {
        let env = env_of("[Template] @Var V { primary: #07f; }");
        let (out, diagnostics) = substitute(&env, "V(primary)");
        assert!(diagnostics.is_empty());
        assert_eq!(out, "#07f");
    }

    #[test]
    fn test_substitution_inside_larger_value() {
        let env = env_of("[Template] @Var V { w: 1px; }");
        let (out, _) = substitute(&env, "V(w) solid V(w)");
        assert_eq!(out, "1px solid 1px");
    }

    #[test]
    fn test_override_wins() {
        let env = env_of("[Template] @Var V { primary: #07f; }");
        let (out, diagnostics) = substitute(&env, "V(primary = #fff)");
        assert!(diagnostics.is_empty());
        assert_eq!(out, "#fff");
    }

    #[test]
    fn test_css_functions_left_alone() {
        let env = env_of("[Template] @Var V { x: 1; }");
        let (out, diagnostics) = substitute(&env, "rgb(0, 0, 0) calc(100% - 10px) url(a.png)");
        assert!(diagnostics.is_empty());
        assert_eq!(out, "rgb(0, 0, 0) calc(100% - 10px) url(a.png)");
    }

    #[test]
    fn test_missing_member_diagnosed() {
        let env = env_of("[Template] @Var V { x: 1; }");
        let (out, diagnostics) = substitute(&env, "V(missing)");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("no member 'missing'"));
        assert_eq!(out, "V(missing)");
    }

    #[test]
    fn test_recursive_substitution() {
        let env = env_of(
            "[Template] @Var Base { unit: 4px; }\n\
             [Template] @Var V { pad: Base(unit); }",
        );
        let (out, diagnostics) = substitute(&env, "V(pad)");
        assert!(diagnostics.is_empty());
        assert_eq!(out, "4px");
    }

    #[test]
    fn test_self_reference_hits_depth_limit() {
        let env = env_of("[Template] @Var V { x: V(x); }");
        let (_, diagnostics) = substitute(&env, "V(x)");
        assert!(diagnostics
            .iter()
            .any(|d| d.message.contains("nested levels")));
    }

    #[test]
    fn test_var_group_inheritance_later_wins() {
        let env = env_of(
            "[Template] @Var A { primary: red; size: 10px; }\n\
             [Template] @Var B { inherit @Var A; primary: blue; }",
        );
        let (out, _) = substitute(&env, "B(primary) B(size)");
        assert_eq!(out, "blue 10px");
    }
}
