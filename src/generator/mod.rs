//! HTML/CSS/JS generation
//!
//! Walks a resolved document and produces the three output strings.
//! Template uses are instantiated on demand through the template engine;
//! the instantiated subtrees are emitted and discarded.
//!
//! Output contract:
//! - HTML is compact: no synthesized inter-tag whitespace, so text nodes
//!   are never perturbed. Attribute values are double-quoted and
//!   entity-escaped. Void elements self-close.
//! - CSS is pretty by default (one property per line, indented);
//!   `minify_output` collapses each rule onto one line.
//! - Script sources go through the injected CHTL-JS transpiler (identity
//!   when absent); local blocks also emit a `<script>` element in place.
//!
//! Emission never aborts: a failed region is marked with an HTML comment
//! and a diagnostic, and generation continues.

pub mod encode;
pub mod scope;

use crate::ast::nodes::*;
use crate::diagnostics::{Diagnostic, Phase};
use crate::symbols::SymbolEnv;
use crate::template::{TemplateEngine, VariableResolver};

pub use encode::{escape_html, is_void_element};
pub use scope::{scope_selector, ScopeAllocator};

/// Formatting knobs the generator cares about; the driver derives this
/// from the full compile options.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub preserve_comments: bool,
    pub minify_output: bool,
    pub output_charset: String,
    pub indent_string: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            preserve_comments: true,
            minify_output: false,
            output_charset: "utf-8".to_string(),
            indent_string: "  ".to_string(),
        }
    }
}

/// The three output artifacts plus emission diagnostics.
#[derive(Debug, Clone, Default)]
pub struct GeneratorOutput {
    pub html: String,
    pub css: String,
    pub js: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// The CHTL-JS collaborator, injected by the driver. The compiler core
/// only ever calls it by reference.
pub type JsTranspiler = dyn Fn(&str) -> (String, Vec<Diagnostic>);

pub struct Generator<'a> {
    config: GeneratorConfig,
    engine: TemplateEngine<'a>,
    variables: VariableResolver<'a>,
    scopes: ScopeAllocator,
    js_transpiler: Option<&'a JsTranspiler>,
    html: String,
    css: String,
    js: String,
    diagnostics: Vec<Diagnostic>,
    doctype: bool,
}

impl<'a> Generator<'a> {
    pub fn new(env: &'a SymbolEnv, config: GeneratorConfig) -> Self {
        Self {
            config,
            engine: TemplateEngine::new(env),
            variables: VariableResolver::new(env),
            scopes: ScopeAllocator::new(),
            js_transpiler: None,
            html: String::new(),
            css: String::new(),
            js: String::new(),
            diagnostics: Vec::new(),
            doctype: false,
        }
    }

    pub fn with_js_transpiler(mut self, transpiler: &'a JsTranspiler) -> Self {
        self.js_transpiler = Some(transpiler);
        self
    }

    pub fn generate(mut self, document: &DocumentNode) -> GeneratorOutput {
        self.doctype = document.children.iter().any(|n| {
            matches!(
                n,
                Node::Use(UseNode {
                    target: UseTarget::Html5,
                    ..
                })
            )
        });
        if self.doctype {
            self.html.push_str("<!DOCTYPE html>");
        }

        self.check_except(&document.children);
        self.emit_children(&document.children, false);

        GeneratorOutput {
            html: self.html,
            css: self.css,
            js: self.js,
            diagnostics: self.diagnostics,
        }
    }

    fn emit_children(&mut self, children: &[Node], in_element: bool) {
        for child in children {
            self.emit_node(child, in_element);
        }
    }

    fn emit_node(&mut self, node: &Node, in_element: bool) {
        match node {
            Node::Element(element) => self.emit_element(element),
            Node::Text(text) => {
                let substituted =
                    self.variables
                        .substitute(&text.value, text.position, &mut self.diagnostics);
                self.html.push_str(&escape_html(&substituted));
            }
            Node::Comment(comment) => {
                if comment.kind == CommentKind::Generator && self.config.preserve_comments {
                    self.html.push_str("<!-- ");
                    self.html.push_str(&comment.text);
                    self.html.push_str(" -->");
                }
            }
            Node::StyleBlock(block) if !block.local => self.emit_global_style(block),
            Node::StyleBlock(block) => {
                // A local block can only sit inside an element.
                self.diagnostics.push(Diagnostic::warning(
                    Phase::Emit,
                    block.position,
                    "local style block outside an element is ignored",
                ));
            }
            Node::ScriptBlock(block) => self.emit_script(block),
            Node::TemplateUse(use_node) => self.emit_template_use(use_node),
            Node::OriginDef(def) => {
                // Anonymous origins always emit in place; named ones are
                // definitions, emitted in place only where content can
                // appear (inside an element).
                if def.name.is_none() || in_element {
                    self.emit_origin_content(&def.kind, &def.content);
                }
            }
            Node::OriginUse(use_node) => self.emit_origin_use(use_node),
            Node::Namespace(ns) => self.emit_children(&ns.children, false),
            Node::Document(inner) => self.emit_children(&inner.children, false),
            Node::TemplateDef(_)
            | Node::Import(_)
            | Node::Use(_)
            | Node::Configuration(_)
            | Node::Info(_)
            | Node::Export(_)
            | Node::Except(_) => {}
        }
    }

    fn emit_element(&mut self, element: &ElementNode) {
        let mut attrs = element.attrs.clone();
        for attr in &mut attrs {
            attr.value =
                self.variables
                    .substitute(&attr.value, attr.position, &mut self.diagnostics);
        }

        self.check_except(&element.children);

        // A local style block forces a scope selector: the element's #id
        // when present, else a fresh class appended to `class`.
        let local_style = element.children.iter().any(
            |c| matches!(c, Node::StyleBlock(block) if block.local),
        );
        let scope = if local_style {
            Some(self.assign_scope(&mut attrs))
        } else {
            None
        };

        self.html.push('<');
        self.html.push_str(&element.tag);
        for attr in &attrs {
            self.html.push(' ');
            self.html.push_str(&attr.name);
            self.html.push_str("=\"");
            self.html.push_str(&escape_html(&attr.value));
            self.html.push('"');
        }

        if is_void_element(&element.tag) {
            self.html.push_str("/>");
            for child in &element.children {
                match (child, &scope) {
                    (Node::StyleBlock(block), Some(scope)) if block.local => {
                        self.emit_local_style(block, &scope.clone());
                    }
                    (Node::Comment(_), _) => {}
                    (other, _) => self.diagnostics.push(Diagnostic::warning(
                        Phase::Emit,
                        other.position(),
                        format!("void element '{}' cannot have content", element.tag),
                    )),
                }
            }
            return;
        }

        self.html.push('>');
        if self.doctype && element.tag.eq_ignore_ascii_case("head") {
            self.html.push_str("<meta charset=\"");
            self.html.push_str(&self.config.output_charset);
            self.html.push_str("\"/>");
        }

        for child in &element.children {
            match (child, &scope) {
                (Node::StyleBlock(block), Some(scope)) if block.local => {
                    self.emit_local_style(block, &scope.clone());
                }
                (other, _) => self.emit_node(other, true),
            }
        }

        self.html.push_str("</");
        self.html.push_str(&element.tag);
        self.html.push('>');
    }

    /// Scope selector for an element with a local style block.
    fn assign_scope(&mut self, attrs: &mut Vec<Attribute>) -> String {
        if let Some(id) = attrs.iter().find(|a| a.name == "id") {
            return format!("#{}", id.value);
        }

        let class = self.scopes.fresh_class();
        match attrs.iter_mut().find(|a| a.name == "class") {
            Some(attr) => {
                attr.value.push(' ');
                attr.value.push_str(&class);
            }
            None => attrs.push(Attribute {
                name: "class".to_string(),
                value: class.clone(),
                position: crate::tokenizer::Position::start(),
            }),
        }
        format!(".{}", class)
    }

    fn emit_template_use(&mut self, use_node: &TemplateUseNode) {
        match use_node.kind {
            TemplateKind::Element => {
                if let Some(children) = self
                    .engine
                    .resolve_element_use(use_node, &mut self.diagnostics)
                {
                    self.emit_children(&children, true);
                } else {
                    self.emit_error_marker(&format!(
                        "unresolved template '{} {}'",
                        use_node.kind, use_node.name
                    ));
                }
            }
            TemplateKind::Style | TemplateKind::Var => {
                self.diagnostics.push(Diagnostic::error(
                    Phase::Emit,
                    use_node.position,
                    format!(
                        "'{} {}' cannot be used in content position",
                        use_node.kind, use_node.name
                    ),
                ));
            }
        }
    }

    fn emit_local_style(&mut self, block: &StyleBlockNode, scope: &str) {
        let mut scope_props: Vec<StyleProp> = Vec::new();
        let mut rules: Vec<(String, Vec<StyleProp>)> = Vec::new();

        for item in &block.items {
            match item {
                StyleItem::Property(prop) => {
                    let value = self.variables.substitute(
                        &prop.value,
                        prop.position,
                        &mut self.diagnostics,
                    );
                    scope_props.push(StyleProp {
                        name: prop.name.clone(),
                        value,
                        position: prop.position,
                    });
                }
                StyleItem::Use(use_node) => {
                    match self
                        .engine
                        .resolve_style_use(use_node, &mut self.diagnostics)
                    {
                        Some(props) => {
                            for prop in props {
                                let value = self.variables.substitute(
                                    &prop.value,
                                    prop.position,
                                    &mut self.diagnostics,
                                );
                                scope_props.push(StyleProp { value, ..prop });
                            }
                        }
                        None => self.emit_error_marker(&format!(
                            "unresolved template '{} {}'",
                            use_node.kind, use_node.name
                        )),
                    }
                }
                StyleItem::Inherit(edge) => {
                    let as_use = TemplateUseNode {
                        category: edge.category,
                        kind: edge.kind,
                        name: edge.name.clone(),
                        specialisations: Vec::new(),
                        position: edge.position,
                    };
                    if let Some(props) = self
                        .engine
                        .resolve_style_use(&as_use, &mut self.diagnostics)
                    {
                        for prop in props {
                            let value = self.variables.substitute(
                                &prop.value,
                                prop.position,
                                &mut self.diagnostics,
                            );
                            scope_props.push(StyleProp { value, ..prop });
                        }
                    }
                }
                StyleItem::Rule(rule) => {
                    let scoped = scope_selector(&rule.selector, scope);
                    let props = rule
                        .properties
                        .iter()
                        .map(|prop| StyleProp {
                            name: prop.name.clone(),
                            value: self.variables.substitute(
                                &prop.value,
                                prop.position,
                                &mut self.diagnostics,
                            ),
                            position: prop.position,
                        })
                        .collect();
                    rules.push((scoped, props));
                }
            }
        }

        if !scope_props.is_empty() {
            self.write_css_rule(scope, &scope_props);
        }
        for (selector, props) in rules {
            self.write_css_rule(&selector, &props);
        }
    }

    fn emit_global_style(&mut self, block: &StyleBlockNode) {
        for item in &block.items {
            match item {
                StyleItem::Rule(rule) => {
                    let props: Vec<StyleProp> = rule
                        .properties
                        .iter()
                        .map(|prop| StyleProp {
                            name: prop.name.clone(),
                            value: self.variables.substitute(
                                &prop.value,
                                prop.position,
                                &mut self.diagnostics,
                            ),
                            position: prop.position,
                        })
                        .collect();
                    self.write_css_rule(&rule.selector, &props);
                }
                StyleItem::Property(prop) => {
                    self.diagnostics.push(Diagnostic::warning(
                        Phase::Emit,
                        prop.position,
                        format!(
                            "property '{}' outside a rule in a global style block is ignored",
                            prop.name
                        ),
                    ));
                }
                StyleItem::Use(use_node) => {
                    self.diagnostics.push(Diagnostic::warning(
                        Phase::Emit,
                        use_node.position,
                        "a template use in a global style block has no selector to attach to",
                    ));
                }
                StyleItem::Inherit(edge) => {
                    self.diagnostics.push(Diagnostic::warning(
                        Phase::Emit,
                        edge.position,
                        "an inherit in a global style block has no selector to attach to",
                    ));
                }
            }
        }
    }

    fn write_css_rule(&mut self, selector: &str, props: &[StyleProp]) {
        if props.is_empty() {
            return;
        }
        if self.config.minify_output {
            self.css.push_str(selector);
            self.css.push('{');
            let joined: Vec<String> = props
                .iter()
                .map(|p| format!("{}:{}", p.name, p.value))
                .collect();
            self.css.push_str(&joined.join(";"));
            self.css.push('}');
        } else {
            self.css.push_str(selector);
            self.css.push_str(" {\n");
            for prop in props {
                self.css.push_str(&self.config.indent_string);
                self.css.push_str(&prop.name);
                self.css.push_str(": ");
                self.css.push_str(&prop.value);
                self.css.push_str(";\n");
            }
            self.css.push_str("}\n");
        }
    }

    fn emit_script(&mut self, block: &ScriptBlockNode) {
        let source = block.source.trim();
        if source.is_empty() {
            return;
        }

        let transpiled = match self.js_transpiler {
            Some(transpiler) => {
                let (js, diagnostics) = transpiler(source);
                self.diagnostics.extend(diagnostics);
                js
            }
            None => source.to_string(),
        };

        if block.local {
            self.html.push_str("<script>");
            self.html.push_str(&transpiled);
            self.html.push_str("</script>");
        }
        if !self.js.is_empty() {
            self.js.push('\n');
        }
        self.js.push_str(&transpiled);
    }

    fn emit_origin_use(&mut self, use_node: &OriginUseNode) {
        let content = self
            .engine
            .env()
            .lookup_origin(&use_node.kind, &use_node.name)
            .map(|def| def.content.clone());
        match content {
            Some(content) => {
                self.emit_origin_content(&use_node.kind, &content);
            }
            None => {
                self.diagnostics.push(Diagnostic::error(
                    Phase::Emit,
                    use_node.position,
                    format!(
                        "unresolved origin reference '{} {}'",
                        use_node.kind, use_node.name
                    ),
                ));
                self.emit_error_marker(&format!(
                    "missing origin '{} {}'",
                    use_node.kind, use_node.name
                ));
            }
        }
    }

    /// Inline raw origin content into the stream matching its kind.
    fn emit_origin_content(&mut self, kind: &OriginKind, content: &str) {
        let trimmed = content.trim();
        match kind {
            OriginKind::Html | OriginKind::Custom(_) => self.html.push_str(trimmed),
            OriginKind::Style => {
                self.css.push_str(trimmed);
                self.css.push('\n');
            }
            OriginKind::JavaScript => {
                if !self.js.is_empty() {
                    self.js.push('\n');
                }
                self.js.push_str(trimmed);
            }
        }
    }

    fn emit_error_marker(&mut self, message: &str) {
        self.html.push_str("<!-- chtl-error: ");
        self.html.push_str(message);
        self.html.push_str(" -->");
    }

    /// Enforce `except` constraint clauses against their sibling scope.
    fn check_except(&mut self, children: &[Node]) {
        let mut targets: Vec<&str> = Vec::new();
        for child in children {
            if let Node::Except(except) = child {
                targets.extend(except.targets.iter().map(|t| t.as_str()));
            }
        }
        if targets.is_empty() {
            return;
        }

        for child in children {
            match child {
                Node::Element(element) if targets.contains(&element.tag.as_str()) => {
                    self.diagnostics.push(Diagnostic::error(
                        Phase::Emit,
                        element.position,
                        format!("element '{}' is not allowed here (except clause)", element.tag),
                    ));
                }
                Node::TemplateUse(use_node) => {
                    let qualified = format!("{} {}", use_node.kind, use_node.name);
                    if targets.contains(&use_node.name.as_str())
                        || targets.contains(&qualified.as_str())
                    {
                        self.diagnostics.push(Diagnostic::error(
                            Phase::Emit,
                            use_node.position,
                            format!("'{}' is not allowed here (except clause)", qualified),
                        ));
                    }
                }
                _ => {}
            }
        }
    }
}
