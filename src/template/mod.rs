//! Template instantiation engine
//!
//! The hardest subsystem of the compiler: resolves inheritance chains,
//! merges inherited content, and applies specialisation operations when a
//! template or custom is used.
//!
//! Merging is base-first with later-wins semantics: bases contribute
//! first (in edge declaration order), the definition's own members
//! override them, and specialisations run last in source order. Cycles
//! are detected along the current resolution path and reported instead of
//! hanging; recursion is additionally capped at
//! [`MAX_INHERITANCE_DEPTH`].
//!
//! Instantiation produces *transient* data (property lists, child node
//! vectors) that the generator emits and discards; the source AST and the
//! symbol environment are never mutated.

pub mod specialize;
pub mod variables;

use std::collections::HashSet;

use crate::ast::nodes::*;
use crate::diagnostics::{Diagnostic, Phase};
use crate::symbols::SymbolEnv;
use crate::tokenizer::Position;

pub use variables::{VariableResolver, MAX_SUBSTITUTION_DEPTH};

/// Hard cap on inheritance recursion.
pub const MAX_INHERITANCE_DEPTH: usize = 10;

pub struct TemplateEngine<'env> {
    env: &'env SymbolEnv,
}

impl<'env> TemplateEngine<'env> {
    pub fn new(env: &'env SymbolEnv) -> Self {
        Self { env }
    }

    /// The environment this engine resolves against.
    pub fn env(&self) -> &'env SymbolEnv {
        self.env
    }

    /// Resolve a `@Style` use: merged properties with use-site
    /// specialisations applied. Required properties left unfilled are
    /// diagnosed and dropped.
    pub fn resolve_style_use(
        &self,
        use_node: &TemplateUseNode,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Vec<StyleProp>> {
        let def = self.lookup(
            use_node.category,
            use_node.kind,
            &use_node.name,
            use_node.position,
            diagnostics,
        )?;

        let removed_edges = edge_deletions(&use_node.specialisations);
        let mut path = HashSet::new();
        let mut props =
            self.merged_properties(def, &removed_edges, &mut path, 0, diagnostics);

        specialize::apply_property_ops(
            &mut props,
            &use_node.specialisations,
            diagnostics,
        );
        self.drop_unfilled(&mut props, &use_node.name, diagnostics);
        Some(props)
    }

    /// Resolve an `@Element` use: merged children with use-site
    /// specialisations applied. The returned subtree is transient.
    pub fn resolve_element_use(
        &self,
        use_node: &TemplateUseNode,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Vec<Node>> {
        let def = self.lookup(
            use_node.category,
            use_node.kind,
            &use_node.name,
            use_node.position,
            diagnostics,
        )?;

        let removed_edges = edge_deletions(&use_node.specialisations);
        let mut path = HashSet::new();
        let mut children =
            self.merged_children(def, &removed_edges, &mut path, 0, diagnostics);

        specialize::apply_element_ops(
            &mut children,
            &use_node.specialisations,
            diagnostics,
        );
        Some(children)
    }

    /// Merged, fully-resolved variable map of a `@Var` group. Returns
    /// `None` for an unknown group so callers can tell a variable use
    /// apart from an ordinary CSS function call.
    pub fn resolve_var_group(
        &self,
        group: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Vec<StyleProp>> {
        let def = self.env.lookup_variables(group)?;
        let mut path = HashSet::new();
        let mut vars = self.merged_properties(def, &[], &mut path, 0, diagnostics);
        self.drop_unfilled(&mut vars, group, diagnostics);
        Some(vars)
    }

    fn lookup(
        &self,
        category: Option<Category>,
        kind: TemplateKind,
        name: &str,
        position: Position,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<&'env TemplateDefNode> {
        let def = self.env.lookup_template(category, kind, name);
        if def.is_none() {
            diagnostics.push(Diagnostic::error(
                Phase::Emit,
                position,
                format!("unresolved template reference '{} {}'", kind, name),
            ));
        }
        def
    }

    /// Base-first merge of a style/var definition's property map.
    /// `removed_edges` carries `delete @Kind Name` operations from the
    /// use site; they remove the *direct* edge only.
    fn merged_properties(
        &self,
        def: &TemplateDefNode,
        removed_edges: &[(TemplateKind, String)],
        path: &mut HashSet<(TemplateKind, String)>,
        depth: usize,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<StyleProp> {
        if depth >= MAX_INHERITANCE_DEPTH {
            diagnostics.push(Diagnostic::error(
                Phase::Emit,
                def.position,
                format!(
                    "inheritance of '{} {}' exceeds the depth limit of {}",
                    def.kind, def.name, MAX_INHERITANCE_DEPTH
                ),
            ));
            return Vec::new();
        }
        let key = (def.kind, def.name.clone());
        if !path.insert(key.clone()) {
            diagnostics.push(Diagnostic::error(
                Phase::Emit,
                def.position,
                format!("inheritance cycle through '{} {}'", def.kind, def.name),
            ));
            return Vec::new();
        }

        let def_removed = edge_deletions(&def.specialisations);
        let mut props: Vec<StyleProp> = Vec::new();

        for edge in &def.inherits {
            if edge_is_removed(edge, removed_edges) || edge_is_removed(edge, &def_removed) {
                continue;
            }
            match self.env.lookup_template(edge.category, edge.kind, &edge.name) {
                Some(parent) => {
                    let inherited =
                        self.merged_properties(parent, &[], path, depth + 1, diagnostics);
                    for prop in inherited {
                        merge_property(&mut props, prop);
                    }
                }
                None => diagnostics.push(Diagnostic::error(
                    Phase::Emit,
                    edge.position,
                    format!("unresolved inherited template '{} {}'", edge.kind, edge.name),
                )),
            }
        }

        let own = match &def.body {
            TemplateBody::Style(props) | TemplateBody::Var(props) => props.as_slice(),
            TemplateBody::Element(_) => &[],
        };
        for prop in own {
            merge_property(&mut props, prop.clone());
        }

        specialize::apply_property_ops(&mut props, &def.specialisations, diagnostics);

        path.remove(&key);
        props
    }

    /// Base-first merge of an element definition's child list: inherited
    /// children first (deep-cloned, order preserved), own children after.
    fn merged_children(
        &self,
        def: &TemplateDefNode,
        removed_edges: &[(TemplateKind, String)],
        path: &mut HashSet<(TemplateKind, String)>,
        depth: usize,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<Node> {
        if depth >= MAX_INHERITANCE_DEPTH {
            diagnostics.push(Diagnostic::error(
                Phase::Emit,
                def.position,
                format!(
                    "inheritance of '{} {}' exceeds the depth limit of {}",
                    def.kind, def.name, MAX_INHERITANCE_DEPTH
                ),
            ));
            return Vec::new();
        }
        let key = (def.kind, def.name.clone());
        if !path.insert(key.clone()) {
            diagnostics.push(Diagnostic::error(
                Phase::Emit,
                def.position,
                format!("inheritance cycle through '{} {}'", def.kind, def.name),
            ));
            return Vec::new();
        }

        let def_removed = edge_deletions(&def.specialisations);
        let mut children: Vec<Node> = Vec::new();

        for edge in &def.inherits {
            if edge_is_removed(edge, removed_edges) || edge_is_removed(edge, &def_removed) {
                continue;
            }
            match self.env.lookup_template(edge.category, edge.kind, &edge.name) {
                Some(parent) => {
                    children.extend(self.merged_children(parent, &[], path, depth + 1, diagnostics));
                }
                None => diagnostics.push(Diagnostic::error(
                    Phase::Emit,
                    edge.position,
                    format!("unresolved inherited template '{} {}'", edge.kind, edge.name),
                )),
            }
        }

        if let TemplateBody::Element(own) = &def.body {
            children.extend(own.iter().cloned());
        }

        specialize::apply_element_ops(&mut children, &def.specialisations, diagnostics);

        path.remove(&key);
        children
    }

    /// Required properties (empty values) that survive to emission are a
    /// diagnostic; the property is dropped so partial output stays valid.
    fn drop_unfilled(
        &self,
        props: &mut Vec<StyleProp>,
        owner: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        props.retain(|prop| {
            if prop.value.is_empty() {
                diagnostics.push(Diagnostic::error(
                    Phase::Emit,
                    prop.position,
                    format!(
                        "required property '{}' of '{}' was not given a value",
                        prop.name, owner
                    ),
                ));
                false
            } else {
                true
            }
        });
    }
}

/// Later-wins merge: an existing property keeps its position but takes
/// the new value; new names append.
fn merge_property(props: &mut Vec<StyleProp>, prop: StyleProp) {
    match props.iter_mut().find(|p| p.name == prop.name) {
        Some(existing) => existing.value = prop.value,
        None => props.push(prop),
    }
}

fn edge_deletions(ops: &[SpecOp]) -> Vec<(TemplateKind, String)> {
    let mut removed = Vec::new();
    for op in ops {
        if let SpecOp::Delete { targets, .. } = op {
            for target in targets {
                if let DeleteTarget::Inheritance { kind, name } = target {
                    removed.push((*kind, name.clone()));
                }
            }
        }
    }
    removed
}

fn edge_is_removed(edge: &InheritRef, removed: &[(TemplateKind, String)]) -> bool {
    removed
        .iter()
        .any(|(kind, name)| *kind == edge.kind && *name == edge.name)
}
