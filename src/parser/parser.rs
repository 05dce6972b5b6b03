//! Recursive-descent parser for CHTL
//!
//! Consumes the token vector produced by the tokenizer and builds a
//! [`DocumentNode`] plus a diagnostics list. The parser never aborts
//! before `Eof`: on a recoverable error it emits a diagnostic and skips
//! to the next synchronisation point (`;`, `}`, or a bracket-prefix
//! keyword), then resumes.
//!
//! CE-equivalence is resolved here: every rule that takes `:` accepts `=`
//! through one predicate, so the written form stays visible to
//! diagnostics but never changes the resulting AST.
//!
//! Attribute and property values are reconstructed from the raw source
//! via token byte offsets, so multi-token CSS values (`0 auto`,
//! `1px solid #ccc`) survive exactly as written. A value that is a single
//! quoted string uses the unescaped lexeme instead when the caller asks
//! for stripped strings (attributes, text, configuration settings).

use crate::ast::nodes::*;
use crate::diagnostics::{Diagnostic, Phase};
use crate::tokenizer::{Position, Token, TokenKind};

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        // Line and block comments are semantically discarded before
        // parsing; generator comments stay and become AST nodes.
        let tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|t| !matches!(t.kind, TokenKind::LineComment | TokenKind::BlockComment))
            .collect();
        Self {
            source,
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn parse_document(mut self) -> (DocumentNode, Vec<Diagnostic>) {
        let position = self
            .tokens
            .first()
            .map(|t| t.position)
            .unwrap_or_else(Position::start);
        let mut children = Vec::new();

        while !self.at_end() {
            let before = self.pos;
            if let Some(node) = self.parse_top_level() {
                children.push(node);
            }
            if self.pos == before && !self.at_end() {
                // Whatever it was, do not loop on it.
                self.bump();
            }
        }

        (DocumentNode { children, position }, self.diagnostics)
    }

    fn parse_top_level(&mut self) -> Option<Node> {
        match self.peek_kind() {
            TokenKind::Eof => None,
            TokenKind::GeneratorComment => Some(self.parse_generator_comment()),
            TokenKind::Use => self.parse_use(),
            TokenKind::Namespace => self.parse_namespace(),
            TokenKind::Import => self.parse_import(),
            TokenKind::Template => self.parse_template_def(Category::Template),
            TokenKind::Custom => self.parse_template_def(Category::Custom),
            TokenKind::Origin => self.parse_origin(),
            TokenKind::Configuration => self.parse_configuration(),
            TokenKind::Info => self.parse_info(),
            TokenKind::Export => self.parse_export(),
            TokenKind::Style => self.parse_style_block(false).map(Node::StyleBlock),
            TokenKind::Script => self.parse_script_block(false).map(Node::ScriptBlock),
            TokenKind::Except => self.parse_except(),
            k if k.is_type_tag() => self.parse_template_use(None).map(Node::TemplateUse),
            TokenKind::Identifier => {
                if self.peek_at(1).kind == TokenKind::LeftBrace {
                    self.parse_element()
                } else {
                    self.error_here("expected a declaration or an element");
                    self.sync();
                    None
                }
            }
            TokenKind::Invalid => {
                // The lexer already diagnosed this token.
                self.bump();
                None
            }
            _ => {
                self.error_here("unexpected token at top level");
                self.bump();
                self.sync();
                None
            }
        }
    }

    // --- declarations ---

    fn parse_use(&mut self) -> Option<Node> {
        let position = self.bump().position; // `use`
        let target = match self.peek_kind() {
            TokenKind::Html5 => {
                self.bump();
                UseTarget::Html5
            }
            TokenKind::TagConfig => {
                self.bump();
                let name = self.expect_identifier("configuration name")?;
                UseTarget::Config(name)
            }
            _ => {
                self.error_here("expected `html5` or `@Config <name>` after `use`");
                self.sync();
                return None;
            }
        };
        self.expect_semicolon();
        Some(Node::Use(UseNode { target, position }))
    }

    fn parse_namespace(&mut self) -> Option<Node> {
        let position = self.bump().position; // `[Namespace]`
        let name = self.parse_dotted_name("namespace name")?;

        if self.peek_kind() == TokenKind::LeftBrace {
            self.bump();
            let mut children = Vec::new();
            while !self.check(TokenKind::RightBrace) && !self.at_end() {
                let before = self.pos;
                if let Some(node) = self.parse_top_level() {
                    children.push(node);
                }
                if self.pos == before && !self.at_end() {
                    self.bump();
                }
            }
            self.expect(TokenKind::RightBrace, "`}` to close namespace");
            Some(Node::Namespace(NamespaceNode {
                name,
                block: true,
                children,
                position,
            }))
        } else {
            self.eat(TokenKind::Semicolon);
            Some(Node::Namespace(NamespaceNode {
                name,
                block: false,
                children: Vec::new(),
                position,
            }))
        }
    }

    fn parse_import(&mut self) -> Option<Node> {
        let position = self.bump().position; // `[Import]`
        let kind = match self.peek_kind() {
            TokenKind::TagChtl => ImportKind::Chtl,
            TokenKind::TagStyle => ImportKind::Style,
            TokenKind::TagElement => ImportKind::Element,
            TokenKind::TagVar => ImportKind::Var,
            TokenKind::TagHtml => ImportKind::Html,
            TokenKind::TagJavaScript => ImportKind::JavaScript,
            TokenKind::TagCjmod => ImportKind::CJmod,
            TokenKind::TagConfig => ImportKind::Config,
            _ => {
                self.error_here("expected a type tag after `[Import]`");
                self.sync();
                return None;
            }
        };
        self.bump();

        let target = match self.peek_kind() {
            TokenKind::From => ImportTarget::Whole,
            TokenKind::Star => {
                self.bump();
                ImportTarget::Wildcard
            }
            TokenKind::Identifier => ImportTarget::Named(self.bump().lexeme),
            _ => {
                self.error_here("expected a symbol name, `*`, or `from` in import");
                self.sync();
                return None;
            }
        };

        if self.expect(TokenKind::From, "`from` in import").is_none() {
            self.sync();
            return None;
        }

        let path = match self.peek_kind() {
            TokenKind::StringLit | TokenKind::UnquotedLit => self.bump().lexeme,
            TokenKind::Identifier => self.parse_dotted_name("import path")?,
            _ => {
                self.error_here("expected an import path");
                self.sync();
                return None;
            }
        };

        let alias = if self.eat(TokenKind::As).is_some() {
            Some(self.expect_identifier("import alias")?)
        } else {
            None
        };

        let mut except = Vec::new();
        if self.eat(TokenKind::Except).is_some() {
            loop {
                if self.peek_kind().is_type_tag() {
                    self.bump(); // tag is informative only; names are unique per kind
                }
                except.push(self.expect_identifier("excepted name")?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }

        self.expect_semicolon();
        Some(Node::Import(ImportNode {
            kind,
            target,
            path,
            alias,
            except,
            position,
        }))
    }

    fn parse_template_def(&mut self, category: Category) -> Option<Node> {
        let position = self.bump().position; // `[Template]` / `[Custom]`
        let is_custom = category == Category::Custom;

        let kind = match self.peek_kind() {
            TokenKind::TagStyle => TemplateKind::Style,
            TokenKind::TagElement => TemplateKind::Element,
            TokenKind::TagVar => TemplateKind::Var,
            _ => {
                self.error_here("expected `@Style`, `@Element`, or `@Var` in definition");
                self.sync();
                return None;
            }
        };
        self.bump();

        let name = self.expect_identifier("definition name")?;
        self.expect(TokenKind::LeftBrace, "`{` to open definition body")?;

        let mut inherits = Vec::new();
        let mut specialisations = Vec::new();
        let body = match kind {
            TemplateKind::Style | TemplateKind::Var => {
                let props =
                    self.parse_property_body(is_custom, &mut inherits, &mut specialisations);
                if kind == TemplateKind::Style {
                    TemplateBody::Style(props)
                } else {
                    TemplateBody::Var(props)
                }
            }
            TemplateKind::Element => {
                let children =
                    self.parse_element_template_body(is_custom, &mut inherits, &mut specialisations);
                TemplateBody::Element(children)
            }
        };

        self.expect(TokenKind::RightBrace, "`}` to close definition body");
        Some(Node::TemplateDef(TemplateDefNode {
            kind,
            name,
            is_custom,
            body,
            inherits,
            specialisations,
            position,
        }))
    }

    /// Body of a `@Style` or `@Var` definition: properties, inheritance
    /// edges, and (for customs) delete operations.
    fn parse_property_body(
        &mut self,
        is_custom: bool,
        inherits: &mut Vec<InheritRef>,
        specialisations: &mut Vec<SpecOp>,
    ) -> Vec<StyleProp> {
        let mut props = Vec::new();

        while !self.check(TokenKind::RightBrace) && !self.at_end() {
            let before = self.pos;
            match self.peek_kind() {
                TokenKind::Inherit => {
                    if let Some(edge) = self.parse_inherit_ref(true) {
                        inherits.push(edge);
                    }
                }
                TokenKind::Template | TokenKind::Custom => {
                    if let Some(edge) = self.parse_inherit_ref(false) {
                        inherits.push(edge);
                    }
                }
                k if k.is_type_tag() => {
                    if let Some(edge) = self.parse_inherit_ref(false) {
                        inherits.push(edge);
                    }
                }
                TokenKind::Delete => {
                    if !is_custom {
                        self.error_here("`delete` is only allowed in [Custom] definitions");
                    }
                    if let Some(op) = self.parse_delete(TemplateKind::Style) {
                        specialisations.push(op);
                    }
                }
                TokenKind::Identifier => {
                    props.extend(self.parse_property_entry(is_custom));
                }
                TokenKind::GeneratorComment | TokenKind::Semicolon => {
                    self.bump();
                }
                _ => {
                    self.error_here("unexpected token in definition body");
                    self.sync_in_block();
                }
            }
            if self.pos == before && !self.at_end() {
                self.bump();
            }
        }

        props
    }

    /// One property entry. `name: value;` is the normal form; the
    /// valueless forms `name;` and `name, other;` declare required
    /// properties and are only legal in customs.
    fn parse_property_entry(&mut self, allow_empty: bool) -> Vec<StyleProp> {
        let first = self.bump();
        let mut props = vec![StyleProp {
            name: first.lexeme,
            value: String::new(),
            position: first.position,
        }];

        if self.peek_kind().is_colon_or_equals() {
            self.bump();
            let value = self.parse_value_verbatim();
            props[0].value = value;
            self.expect_semicolon();
            return props;
        }

        // Valueless: possibly a comma-separated list of required names.
        while self.eat(TokenKind::Comma).is_some() {
            if let Some(name) = self.expect_identifier("property name") {
                let position = self.prev_position();
                props.push(StyleProp {
                    name,
                    value: String::new(),
                    position,
                });
            } else {
                break;
            }
        }
        self.expect_semicolon();

        if !allow_empty {
            for prop in &props {
                self.diagnostics.push(Diagnostic::error(
                    Phase::Parse,
                    prop.position,
                    format!(
                        "property '{}' has no value; required properties are only allowed in [Custom] definitions",
                        prop.name
                    ),
                ));
            }
        }
        props
    }

    /// Body of an `@Element` definition: children plus inheritance edges
    /// and (for customs) delete/insert operations.
    fn parse_element_template_body(
        &mut self,
        is_custom: bool,
        inherits: &mut Vec<InheritRef>,
        specialisations: &mut Vec<SpecOp>,
    ) -> Vec<Node> {
        let mut children = Vec::new();

        while !self.check(TokenKind::RightBrace) && !self.at_end() {
            let before = self.pos;
            match self.peek_kind() {
                TokenKind::Inherit => {
                    if let Some(edge) = self.parse_inherit_ref(true) {
                        inherits.push(edge);
                    }
                }
                TokenKind::Delete => {
                    if !is_custom {
                        self.error_here("`delete` is only allowed in [Custom] definitions");
                    }
                    if let Some(op) = self.parse_delete(TemplateKind::Element) {
                        specialisations.push(op);
                    }
                }
                TokenKind::Insert => {
                    if !is_custom {
                        self.error_here("`insert` is only allowed in [Custom] definitions");
                    }
                    if let Some(op) = self.parse_insert() {
                        specialisations.push(op);
                    }
                }
                k if k.is_type_tag()
                    || k == TokenKind::Template
                    || k == TokenKind::Custom =>
                {
                    // A bare use is an inheritance edge; a braced use is a
                    // child with use-site specialisation.
                    if self.use_has_spec_block() {
                        let category = match self.peek_kind() {
                            TokenKind::Template => {
                                self.bump();
                                Some(Category::Template)
                            }
                            TokenKind::Custom => {
                                self.bump();
                                Some(Category::Custom)
                            }
                            _ => None,
                        };
                        if let Some(use_node) = self.parse_template_use(category) {
                            children.push(Node::TemplateUse(use_node));
                        }
                    } else if let Some(edge) = self.parse_inherit_ref(false) {
                        inherits.push(edge);
                    }
                }
                _ => {
                    if let Some(node) = self.parse_element_body_item(&mut Vec::new(), &mut false) {
                        children.push(node);
                    }
                }
            }
            if self.pos == before && !self.at_end() {
                self.bump();
            }
        }

        children
    }

    /// `inherit @Style P;`, `@Style P;`, or `[Template] @Style P;`, all
    /// recorded as inheritance edges; `explicit` marks the keyword form.
    fn parse_inherit_ref(&mut self, explicit: bool) -> Option<InheritRef> {
        let position = self.peek().position;
        if explicit {
            self.bump(); // `inherit`
        }

        let category = match self.peek_kind() {
            TokenKind::Template => {
                self.bump();
                Some(Category::Template)
            }
            TokenKind::Custom => {
                self.bump();
                Some(Category::Custom)
            }
            _ => None,
        };

        let kind = match self.peek_kind() {
            TokenKind::TagStyle => TemplateKind::Style,
            TokenKind::TagElement => TemplateKind::Element,
            TokenKind::TagVar => TemplateKind::Var,
            _ => {
                self.error_here("expected a template type tag in inheritance");
                self.sync_in_block();
                return None;
            }
        };
        self.bump();

        let mut name = self.parse_dotted_name("inherited template name")?;
        if self.eat(TokenKind::From).is_some() {
            let ns = self.parse_dotted_name("namespace qualifier")?;
            name = format!("{}.{}", ns, name);
        }
        self.expect_semicolon();

        Some(InheritRef {
            category,
            kind,
            name,
            explicit,
            position,
        })
    }

    fn parse_origin(&mut self) -> Option<Node> {
        let position = self.bump().position; // `[Origin]`
        let kind = match self.peek_kind() {
            TokenKind::TagHtml => OriginKind::Html,
            TokenKind::TagStyle => OriginKind::Style,
            TokenKind::TagJavaScript => OriginKind::JavaScript,
            _ => {
                self.error_here("expected `@Html`, `@Style`, or `@JavaScript` after `[Origin]`");
                self.sync();
                return None;
            }
        };
        self.bump();

        let name = if self.check(TokenKind::Identifier) {
            Some(self.bump().lexeme)
        } else {
            None
        };

        match self.peek_kind() {
            TokenKind::LeftBrace => {
                self.bump();
                let content = if self.check(TokenKind::RawContent) {
                    self.bump().lexeme
                } else {
                    String::new()
                };
                self.expect(TokenKind::RightBrace, "`}` to close origin block");
                Some(Node::OriginDef(OriginDefNode {
                    kind,
                    name,
                    content,
                    position,
                }))
            }
            TokenKind::Semicolon => {
                self.bump();
                match name {
                    Some(name) => Some(Node::OriginUse(OriginUseNode {
                        kind,
                        name,
                        position,
                    })),
                    None => {
                        self.diagnostics.push(Diagnostic::error(
                            Phase::Parse,
                            position,
                            "an origin reference needs a name",
                        ));
                        None
                    }
                }
            }
            _ => {
                self.error_here("expected `{` or `;` after origin head");
                self.sync();
                None
            }
        }
    }

    fn parse_configuration(&mut self) -> Option<Node> {
        let position = self.bump().position; // `[Configuration]`
        let name = if self.eat(TokenKind::TagConfig).is_some() {
            Some(self.expect_identifier("configuration name")?)
        } else {
            None
        };
        self.expect(TokenKind::LeftBrace, "`{` to open configuration")?;

        let mut settings = Vec::new();
        let mut groups = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.at_end() {
            let before = self.pos;
            match self.peek_kind() {
                TokenKind::Identifier => {
                    if let Some(setting) = self.parse_setting() {
                        settings.push(setting);
                    }
                }
                TokenKind::Name | TokenKind::OriginType => {
                    let label = self.bump().lexeme;
                    let mut group = ConfigGroup {
                        label,
                        settings: Vec::new(),
                    };
                    if self.expect(TokenKind::LeftBrace, "`{` to open group").is_some() {
                        while !self.check(TokenKind::RightBrace) && !self.at_end() {
                            let inner_before = self.pos;
                            if let Some(setting) = self.parse_setting() {
                                group.settings.push(setting);
                            }
                            if self.pos == inner_before && !self.at_end() {
                                self.bump();
                            }
                        }
                        self.expect(TokenKind::RightBrace, "`}` to close group");
                    }
                    groups.push(group);
                }
                TokenKind::GeneratorComment | TokenKind::Semicolon => {
                    self.bump();
                }
                _ => {
                    self.error_here("unexpected token in configuration block");
                    self.sync_in_block();
                }
            }
            if self.pos == before && !self.at_end() {
                self.bump();
            }
        }
        self.expect(TokenKind::RightBrace, "`}` to close configuration");

        Some(Node::Configuration(ConfigurationNode {
            name,
            settings,
            groups,
            position,
        }))
    }

    fn parse_setting(&mut self) -> Option<ConfigSetting> {
        let name_token = self.bump();
        if !self.peek_kind().is_colon_or_equals() {
            self.error_here("expected `:` or `=` in setting");
            self.sync_in_block();
            return None;
        }
        self.bump();
        let value = self.parse_value_stripped();
        self.expect_semicolon();
        Some(ConfigSetting {
            name: name_token.lexeme,
            value,
            position: name_token.position,
        })
    }

    fn parse_info(&mut self) -> Option<Node> {
        let position = self.bump().position; // `[Info]`
        self.expect(TokenKind::LeftBrace, "`{` to open info block")?;
        let mut entries = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.at_end() {
            let before = self.pos;
            if self.check(TokenKind::Identifier) {
                if let Some(setting) = self.parse_setting() {
                    entries.push(setting);
                }
            } else {
                self.bump();
            }
            if self.pos == before && !self.at_end() {
                self.bump();
            }
        }
        self.expect(TokenKind::RightBrace, "`}` to close info block");
        Some(Node::Info(InfoNode { entries, position }))
    }

    fn parse_export(&mut self) -> Option<Node> {
        let position = self.bump().position; // `[Export]`
        self.expect(TokenKind::LeftBrace, "`{` to open export block")?;
        let mut entries = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.at_end() {
            let before = self.pos;
            let kind = match self.peek_kind() {
                TokenKind::TagStyle => Some(TemplateKind::Style),
                TokenKind::TagElement => Some(TemplateKind::Element),
                TokenKind::TagVar => Some(TemplateKind::Var),
                TokenKind::Comma | TokenKind::Semicolon => {
                    self.bump();
                    None
                }
                _ => {
                    self.error_here("expected a type tag in export list");
                    self.sync_in_block();
                    None
                }
            };
            if let Some(kind) = kind {
                self.bump();
                if let Some(name) = self.expect_identifier("exported name") {
                    entries.push((kind, name));
                }
            }
            if self.pos == before && !self.at_end() {
                self.bump();
            }
        }
        self.expect(TokenKind::RightBrace, "`}` to close export block");
        Some(Node::Export(ExportNode { entries, position }))
    }

    fn parse_except(&mut self) -> Option<Node> {
        let position = self.bump().position; // `except`
        let mut targets = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Identifier => targets.push(self.bump().lexeme),
                k if k.is_type_tag() => {
                    let tag = self.bump().lexeme;
                    if self.check(TokenKind::Identifier) {
                        targets.push(format!("{} {}", tag, self.bump().lexeme));
                    } else {
                        targets.push(tag);
                    }
                }
                TokenKind::Template | TokenKind::Custom => {
                    targets.push(self.bump().lexeme);
                }
                _ => break,
            }
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect_semicolon();
        if targets.is_empty() {
            self.diagnostics.push(Diagnostic::error(
                Phase::Parse,
                position,
                "`except` needs at least one target",
            ));
            return None;
        }
        Some(Node::Except(ExceptNode { targets, position }))
    }

    // --- elements ---

    fn parse_element(&mut self) -> Option<Node> {
        let tag_token = self.bump();
        let position = tag_token.position;
        self.expect(TokenKind::LeftBrace, "`{` to open element body")?;

        let mut attrs: Vec<Attribute> = Vec::new();
        let mut children = Vec::new();
        let mut seen_style = false;
        let mut seen_script = false;

        while !self.check(TokenKind::RightBrace) && !self.at_end() {
            let before = self.pos;
            match self.peek_kind() {
                TokenKind::Style => {
                    if let Some(block) = self.parse_style_block(true) {
                        if seen_style {
                            self.diagnostics.push(Diagnostic::error(
                                Phase::Parse,
                                block.position,
                                "an element may have at most one local style block",
                            ));
                        } else {
                            seen_style = true;
                            children.push(Node::StyleBlock(block));
                        }
                    }
                }
                TokenKind::Script => {
                    if let Some(block) = self.parse_script_block(true) {
                        if seen_script {
                            self.diagnostics.push(Diagnostic::error(
                                Phase::Parse,
                                block.position,
                                "an element may have at most one local script block",
                            ));
                        } else {
                            seen_script = true;
                            children.push(Node::ScriptBlock(block));
                        }
                    }
                }
                _ => {
                    if let Some(node) = self.parse_element_body_item(&mut attrs, &mut seen_style) {
                        children.push(node);
                    }
                }
            }
            if self.pos == before && !self.at_end() {
                self.bump();
            }
        }
        self.expect(TokenKind::RightBrace, "`}` to close element body");

        Some(Node::Element(ElementNode {
            tag: tag_token.lexeme,
            attrs,
            children,
            position,
        }))
    }

    /// One item of an element body other than style/script blocks (those
    /// are handled by the caller so uniqueness can be enforced).
    fn parse_element_body_item(
        &mut self,
        attrs: &mut Vec<Attribute>,
        _seen_style: &mut bool,
    ) -> Option<Node> {
        match self.peek_kind() {
            TokenKind::Text => self.parse_text_block().map(Node::Text),
            TokenKind::GeneratorComment => Some(self.parse_generator_comment()),
            TokenKind::Origin => self.parse_origin(),
            TokenKind::Except => self.parse_except(),
            TokenKind::Template | TokenKind::Custom => {
                let category = if self.peek_kind() == TokenKind::Template {
                    Category::Template
                } else {
                    Category::Custom
                };
                self.bump();
                self.parse_template_use(Some(category)).map(Node::TemplateUse)
            }
            k if k.is_type_tag() => self.parse_template_use(None).map(Node::TemplateUse),
            TokenKind::Identifier => {
                if self.peek_at(1).kind.is_colon_or_equals() {
                    let name_token = self.bump();
                    self.bump(); // `:` or `=`
                    let value = self.parse_value_stripped();
                    self.expect_semicolon();
                    if attrs.iter().any(|a| a.name == name_token.lexeme) {
                        self.diagnostics.push(Diagnostic::error(
                            Phase::Parse,
                            name_token.position,
                            format!("duplicate attribute '{}'", name_token.lexeme),
                        ));
                    } else {
                        attrs.push(Attribute {
                            name: name_token.lexeme,
                            value,
                            position: name_token.position,
                        });
                    }
                    None
                } else if self.peek_at(1).kind == TokenKind::LeftBrace {
                    self.parse_element()
                } else {
                    self.error_here("expected `:`/`=` for an attribute or `{` for a child element");
                    self.sync_in_block();
                    None
                }
            }
            TokenKind::Semicolon => {
                self.bump();
                None
            }
            TokenKind::Invalid => {
                self.bump();
                None
            }
            _ => {
                self.error_here("unexpected token in element body");
                self.sync_in_block();
                None
            }
        }
    }

    fn parse_text_block(&mut self) -> Option<TextNode> {
        let position = self.bump().position; // `text`
        self.expect(TokenKind::LeftBrace, "`{` to open text block")?;

        let mut pieces: Vec<String> = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.at_end() {
            match self.peek_kind() {
                TokenKind::StringLit
                | TokenKind::UnquotedLit
                | TokenKind::Number
                | TokenKind::Identifier => pieces.push(self.bump().lexeme),
                TokenKind::Semicolon | TokenKind::Comma => {
                    self.bump();
                }
                // Bare keywords inside a text block are ordinary words.
                k if crate::tokenizer::tokens::word_keyword_kind(
                    &self.peek().lexeme,
                )
                .map(|kk| kk == k)
                .unwrap_or(false) =>
                {
                    pieces.push(self.bump().lexeme);
                }
                _ => {
                    self.error_here("unexpected token in text block");
                    self.sync_in_block();
                    break;
                }
            }
        }
        self.expect(TokenKind::RightBrace, "`}` to close text block");

        Some(TextNode {
            value: pieces.join(" "),
            position,
        })
    }

    // --- style blocks ---

    fn parse_style_block(&mut self, local: bool) -> Option<StyleBlockNode> {
        let position = self.bump().position; // `style`
        self.expect(TokenKind::LeftBrace, "`{` to open style block")?;

        let mut items = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.at_end() {
            let before = self.pos;
            match self.peek_kind() {
                TokenKind::Inherit => {
                    if let Some(edge) = self.parse_inherit_ref(true) {
                        items.push(StyleItem::Inherit(edge));
                    }
                }
                TokenKind::Template | TokenKind::Custom => {
                    let category = if self.peek_kind() == TokenKind::Template {
                        Category::Template
                    } else {
                        Category::Custom
                    };
                    self.bump();
                    if let Some(use_node) = self.parse_template_use(Some(category)) {
                        items.push(StyleItem::Use(use_node));
                    }
                }
                k if k.is_type_tag() => {
                    if let Some(use_node) = self.parse_template_use(None) {
                        items.push(StyleItem::Use(use_node));
                    }
                }
                TokenKind::ClassSelector | TokenKind::IdSelector | TokenKind::Ampersand => {
                    if let Some(rule) = self.parse_style_rule() {
                        items.push(StyleItem::Rule(rule));
                    }
                }
                TokenKind::Identifier => {
                    if self.rule_starts_here() {
                        if let Some(rule) = self.parse_style_rule() {
                            items.push(StyleItem::Rule(rule));
                        }
                    } else {
                        let name_token = self.bump();
                        if !self.peek_kind().is_colon_or_equals() {
                            self.error_here("expected `:` or `=` after property name");
                            self.sync_in_block();
                            continue;
                        }
                        self.bump();
                        let value = self.parse_value_verbatim();
                        self.expect_semicolon();
                        if value.is_empty() {
                            self.diagnostics.push(Diagnostic::error(
                                Phase::Parse,
                                name_token.position,
                                format!("property '{}' has an empty value", name_token.lexeme),
                            ));
                        }
                        items.push(StyleItem::Property(StyleProp {
                            name: name_token.lexeme,
                            value,
                            position: name_token.position,
                        }));
                    }
                }
                TokenKind::GeneratorComment | TokenKind::Semicolon => {
                    self.bump();
                }
                _ => {
                    self.error_here("unexpected token in style block");
                    self.sync_in_block();
                }
            }
            if self.pos == before && !self.at_end() {
                self.bump();
            }
        }
        self.expect(TokenKind::RightBrace, "`}` to close style block");

        if items.is_empty() {
            self.diagnostics.push(Diagnostic::warning(
                Phase::Parse,
                position,
                "empty style block",
            ));
        }

        Some(StyleBlockNode {
            local,
            items,
            position,
        })
    }

    /// Lookahead: does a selector rule start at the cursor? True when a
    /// `{` appears before the next `;` / `}`; this covers compound
    /// selectors like `div span` and `& + div`.
    fn rule_starts_here(&self) -> bool {
        let mut i = self.pos;
        while let Some(token) = self.tokens.get(i) {
            match token.kind {
                TokenKind::LeftBrace => return true,
                TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof => return false,
                _ => i += 1,
            }
        }
        false
    }

    fn parse_style_rule(&mut self) -> Option<StyleRule> {
        let position = self.peek().position;
        let selector_start = position.offset;

        while !self.check(TokenKind::LeftBrace) && !self.at_end() {
            if matches!(
                self.peek_kind(),
                TokenKind::Semicolon | TokenKind::RightBrace
            ) {
                self.error_here("expected `{` after selector");
                return None;
            }
            self.bump();
        }
        let selector_end = self.peek().position.offset;
        let selector = self.source[selector_start..selector_end].trim().to_string();
        self.expect(TokenKind::LeftBrace, "`{` to open rule")?;

        let mut properties = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.at_end() {
            let before = self.pos;
            match self.peek_kind() {
                TokenKind::Identifier => {
                    let name_token = self.bump();
                    if !self.peek_kind().is_colon_or_equals() {
                        self.error_here("expected `:` or `=` after property name");
                        self.sync_in_block();
                        continue;
                    }
                    self.bump();
                    let value = self.parse_value_verbatim();
                    self.expect_semicolon();
                    properties.push(StyleProp {
                        name: name_token.lexeme,
                        value,
                        position: name_token.position,
                    });
                }
                TokenKind::Semicolon | TokenKind::GeneratorComment => {
                    self.bump();
                }
                _ => {
                    self.error_here("unexpected token in style rule");
                    self.sync_in_block();
                }
            }
            if self.pos == before && !self.at_end() {
                self.bump();
            }
        }
        self.expect(TokenKind::RightBrace, "`}` to close rule");

        Some(StyleRule {
            selector,
            properties,
            position,
        })
    }

    fn parse_script_block(&mut self, local: bool) -> Option<ScriptBlockNode> {
        let position = self.bump().position; // `script`
        self.expect(TokenKind::LeftBrace, "`{` to open script block")?;
        let source = if self.check(TokenKind::RawContent) {
            self.bump().lexeme
        } else {
            String::new()
        };
        self.expect(TokenKind::RightBrace, "`}` to close script block");
        Some(ScriptBlockNode {
            local,
            source,
            position,
        })
    }

    // --- template uses and specialisation ---

    /// Lookahead used in template-definition bodies to distinguish a bare
    /// use (an inheritance edge) from a use carrying a spec block.
    fn use_has_spec_block(&self) -> bool {
        let mut i = self.pos;
        // Skip an optional category prefix, the tag, and the dotted name.
        while let Some(token) = self.tokens.get(i) {
            match token.kind {
                TokenKind::Template
                | TokenKind::Custom
                | TokenKind::Identifier
                | TokenKind::Dot
                | TokenKind::From => i += 1,
                k if k.is_type_tag() => i += 1,
                TokenKind::LeftBrace => return true,
                _ => return false,
            }
        }
        false
    }

    fn parse_template_use(&mut self, category: Option<Category>) -> Option<TemplateUseNode> {
        let position = self.peek().position;
        let kind = match self.peek_kind() {
            TokenKind::TagStyle => TemplateKind::Style,
            TokenKind::TagElement => TemplateKind::Element,
            TokenKind::TagVar => TemplateKind::Var,
            _ => {
                self.error_here("expected `@Style`, `@Element`, or `@Var`");
                self.sync_in_block();
                return None;
            }
        };
        self.bump();

        let mut name = self.parse_dotted_name("template name")?;
        if self.eat(TokenKind::From).is_some() {
            let ns = self.parse_dotted_name("namespace qualifier")?;
            name = format!("{}.{}", ns, name);
        }

        let mut specialisations = Vec::new();
        match self.peek_kind() {
            TokenKind::Semicolon => {
                self.bump();
            }
            TokenKind::LeftBrace => {
                self.bump();
                specialisations = self.parse_spec_body(kind);
                self.expect(TokenKind::RightBrace, "`}` to close specialisation block");
            }
            _ => {
                self.error_here("expected `;` or `{` after template reference");
                self.sync_in_block();
            }
        }

        Some(TemplateUseNode {
            category,
            kind,
            name,
            specialisations,
            position,
        })
    }

    fn parse_spec_body(&mut self, kind: TemplateKind) -> Vec<SpecOp> {
        let mut ops = Vec::new();

        while !self.check(TokenKind::RightBrace) && !self.at_end() {
            let before = self.pos;
            match self.peek_kind() {
                TokenKind::Delete => {
                    if let Some(op) = self.parse_delete(kind) {
                        ops.push(op);
                    }
                }
                TokenKind::Insert => {
                    if let Some(op) = self.parse_insert() {
                        ops.push(op);
                    }
                }
                TokenKind::Identifier => {
                    if self.peek_at(1).kind.is_colon_or_equals() {
                        let name_token = self.bump();
                        self.bump();
                        let value = self.parse_value_verbatim();
                        self.expect_semicolon();
                        ops.push(SpecOp::PropertyFill(StyleProp {
                            name: name_token.lexeme,
                            value,
                            position: name_token.position,
                        }));
                    } else if matches!(
                        self.peek_at(1).kind,
                        TokenKind::LeftBrace | TokenKind::LeftBracket
                    ) {
                        if let Some(op) = self.parse_element_patch() {
                            ops.push(op);
                        }
                    } else {
                        self.error_here("unexpected token in specialisation block");
                        self.sync_in_block();
                    }
                }
                TokenKind::GeneratorComment | TokenKind::Semicolon => {
                    self.bump();
                }
                _ => {
                    self.error_here("unexpected token in specialisation block");
                    self.sync_in_block();
                }
            }
            if self.pos == before && !self.at_end() {
                self.bump();
            }
        }

        ops
    }

    fn parse_delete(&mut self, kind: TemplateKind) -> Option<SpecOp> {
        let position = self.bump().position; // `delete`
        let mut targets = Vec::new();

        loop {
            match self.peek_kind() {
                TokenKind::Template | TokenKind::Custom => {
                    self.bump();
                    let target = self.parse_inheritance_target()?;
                    targets.push(target);
                }
                k if k.is_type_tag() => {
                    let target = self.parse_inheritance_target()?;
                    targets.push(target);
                }
                TokenKind::LeftBracket => {
                    let index = self.parse_index()?;
                    targets.push(DeleteTarget::Element(Anchor::Index(index)));
                }
                TokenKind::Identifier => {
                    let name = self.bump().lexeme;
                    if self.check(TokenKind::LeftBracket) {
                        let index = self.parse_index()?;
                        targets.push(DeleteTarget::Element(Anchor::Tag {
                            name,
                            index: Some(index),
                        }));
                    } else if kind == TemplateKind::Element {
                        targets.push(DeleteTarget::Element(Anchor::Tag { name, index: None }));
                    } else {
                        targets.push(DeleteTarget::Property(name));
                    }
                }
                _ => {
                    self.error_here("expected a delete target");
                    self.sync_in_block();
                    return None;
                }
            }
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect_semicolon();

        Some(SpecOp::Delete { targets, position })
    }

    fn parse_inheritance_target(&mut self) -> Option<DeleteTarget> {
        let kind = match self.peek_kind() {
            TokenKind::TagStyle => TemplateKind::Style,
            TokenKind::TagElement => TemplateKind::Element,
            TokenKind::TagVar => TemplateKind::Var,
            _ => {
                self.error_here("expected a type tag in delete target");
                self.sync_in_block();
                return None;
            }
        };
        self.bump();
        let name = self.parse_dotted_name("inherited template name")?;
        Some(DeleteTarget::Inheritance { kind, name })
    }

    fn parse_insert(&mut self) -> Option<SpecOp> {
        let position = self.bump().position; // `insert`
        let placement = match self.peek_kind() {
            TokenKind::After => InsertPosition::After,
            TokenKind::Before => InsertPosition::Before,
            TokenKind::Replace => InsertPosition::Replace,
            TokenKind::AtTop => InsertPosition::AtTop,
            TokenKind::AtBottom => InsertPosition::AtBottom,
            _ => {
                self.error_here(
                    "expected `after`, `before`, `replace`, `at top`, or `at bottom`",
                );
                self.sync_in_block();
                return None;
            }
        };
        self.bump();

        let anchor = if matches!(placement, InsertPosition::AtTop | InsertPosition::AtBottom) {
            None
        } else {
            Some(self.parse_anchor()?)
        };

        self.expect(TokenKind::LeftBrace, "`{` to open insert content")?;
        let mut content = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.at_end() {
            let before = self.pos;
            if let Some(node) = self.parse_element_body_item(&mut Vec::new(), &mut false) {
                content.push(node);
            }
            if self.pos == before && !self.at_end() {
                self.bump();
            }
        }
        self.expect(TokenKind::RightBrace, "`}` to close insert content");

        Some(SpecOp::Insert {
            placement,
            anchor,
            content,
            position,
        })
    }

    fn parse_anchor(&mut self) -> Option<Anchor> {
        match self.peek_kind() {
            TokenKind::LeftBracket => {
                let index = self.parse_index()?;
                Some(Anchor::Index(index))
            }
            TokenKind::Identifier => {
                let name = self.bump().lexeme;
                if self.check(TokenKind::LeftBracket) {
                    let index = self.parse_index()?;
                    Some(Anchor::Tag {
                        name,
                        index: Some(index),
                    })
                } else {
                    Some(Anchor::Tag { name, index: None })
                }
            }
            _ => {
                self.error_here("expected an anchor (tag name or `[index]`)");
                self.sync_in_block();
                None
            }
        }
    }

    fn parse_index(&mut self) -> Option<usize> {
        self.expect(TokenKind::LeftBracket, "`[`")?;
        let number = self.expect(TokenKind::Number, "index")?;
        self.expect(TokenKind::RightBracket, "`]`")?;
        match number.lexeme.parse::<usize>() {
            Ok(index) => Some(index),
            Err(_) => {
                self.diagnostics.push(Diagnostic::error(
                    Phase::Parse,
                    number.position,
                    format!("'{}' is not a valid index", number.lexeme),
                ));
                None
            }
        }
    }

    /// Index-based element access inside an element-use spec block:
    /// `div { ... }` or `div[1] { ... }`.
    fn parse_element_patch(&mut self) -> Option<SpecOp> {
        let name_token = self.bump();
        let position = name_token.position;
        let index = if self.check(TokenKind::LeftBracket) {
            Some(self.parse_index()?)
        } else {
            None
        };
        self.expect(TokenKind::LeftBrace, "`{` to open element specialisation")?;

        let mut attrs = Vec::new();
        let mut children = Vec::new();
        let mut seen_style = false;
        while !self.check(TokenKind::RightBrace) && !self.at_end() {
            let before = self.pos;
            match self.peek_kind() {
                TokenKind::Style => {
                    if let Some(block) = self.parse_style_block(true) {
                        if !seen_style {
                            seen_style = true;
                            children.push(Node::StyleBlock(block));
                        }
                    }
                }
                TokenKind::Script => {
                    if let Some(block) = self.parse_script_block(true) {
                        children.push(Node::ScriptBlock(block));
                    }
                }
                _ => {
                    if let Some(node) = self.parse_element_body_item(&mut attrs, &mut seen_style) {
                        children.push(node);
                    }
                }
            }
            if self.pos == before && !self.at_end() {
                self.bump();
            }
        }
        self.expect(TokenKind::RightBrace, "`}` to close element specialisation");

        Some(SpecOp::ElementPatch {
            anchor: Anchor::Tag {
                name: name_token.lexeme,
                index,
            },
            attrs,
            children,
            position,
        })
    }

    // --- comments ---

    fn parse_generator_comment(&mut self) -> Node {
        let token = self.bump();
        Node::Comment(CommentNode {
            kind: CommentKind::Generator,
            text: token.lexeme,
            position: token.position,
        })
    }

    // --- values ---

    /// Value text exactly as written: the raw source slice from the
    /// cursor to the terminating `;` / `}`. Quoted strings keep their
    /// quotes (CSS `content` needs them).
    fn parse_value_verbatim(&mut self) -> String {
        self.parse_value(false)
    }

    /// Value text with a single quoted string unescaped and unquoted
    /// (attributes, text pieces, settings).
    fn parse_value_stripped(&mut self) -> String {
        self.parse_value(true)
    }

    fn parse_value(&mut self, strip_string: bool) -> String {
        if strip_string
            && self.check(TokenKind::StringLit)
            && matches!(
                self.peek_at(1).kind,
                TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof
            )
        {
            return self.bump().lexeme;
        }

        let start = self.peek().position.offset;
        let mut end = start;
        while !matches!(
            self.peek_kind(),
            TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::LeftBrace | TokenKind::Eof
        ) {
            self.bump();
            end = self.peek().position.offset;
        }
        self.source[start..end].trim().to_string()
    }

    // --- cursor helpers ---

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        let i = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[i]
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn prev_position(&self) -> Position {
        self.tokens[self.pos.saturating_sub(1)].position
    }

    fn at_end(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.bump())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Option<Token> {
        if self.check(kind) {
            Some(self.bump())
        } else {
            self.diagnostics.push(Diagnostic::error(
                Phase::Parse,
                self.peek().position,
                format!("expected {}, found {}", what, self.peek()),
            ));
            None
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Option<String> {
        self.expect(TokenKind::Identifier, what).map(|t| t.lexeme)
    }

    fn expect_semicolon(&mut self) {
        if self.eat(TokenKind::Semicolon).is_none() {
            self.diagnostics.push(Diagnostic::error(
                Phase::Parse,
                self.peek().position,
                "expected `;`",
            ));
        }
    }

    /// A dotted name: `Name` or `ns.Name` (namespace paths).
    fn parse_dotted_name(&mut self, what: &str) -> Option<String> {
        let mut name = self.expect_identifier(what)?;
        while self.check(TokenKind::Dot) && self.peek_at(1).kind == TokenKind::Identifier {
            self.bump();
            name.push('.');
            name.push_str(&self.bump().lexeme);
        }
        Some(name)
    }

    fn error_here(&mut self, message: &str) {
        let position = self.peek().position;
        let found = self.peek().to_string();
        self.diagnostics.push(Diagnostic::error(
            Phase::Parse,
            position,
            format!("{} (found {})", message, found),
        ));
    }

    /// Skip to the next statement boundary: past the next `;`, or up to a
    /// `}` / bracket-prefix keyword / Eof.
    fn sync(&mut self) {
        while !self.at_end() {
            match self.peek_kind() {
                TokenKind::Semicolon => {
                    self.bump();
                    return;
                }
                TokenKind::RightBrace => return,
                k if k.is_bracket_prefix() => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn sync_in_block(&mut self) {
        self.sync();
    }
}

/// Parse a token vector into a document. The source text is needed to
/// reconstruct multi-token values from byte offsets.
pub fn parse(source: &str, tokens: Vec<Token>) -> (DocumentNode, Vec<Diagnostic>) {
    Parser::new(source, tokens).parse_document()
}
