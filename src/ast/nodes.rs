//! Typed AST node variants for CHTL documents
//!
//! The AST is a tree of owned variants: every node owns its children
//! exclusively. Parent access is never stored on the node; the traversal
//! walker hands the parent down instead (see [`crate::ast::traversal`]).
//!
//! Every node carries the [`Position`] of its first token. Nodes derive
//! serde traits so the debug API can dump parsed documents as JSON.

use serde::{Deserialize, Serialize};

use crate::tokenizer::Position;

/// Template kind discriminator (`@Style`, `@Element`, `@Var`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TemplateKind {
    Style,
    Element,
    Var,
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateKind::Style => write!(f, "@Style"),
            TemplateKind::Element => write!(f, "@Element"),
            TemplateKind::Var => write!(f, "@Var"),
        }
    }
}

/// Definition category for fully-qualified references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Template,
    Custom,
}

/// Origin (raw embed) kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OriginKind {
    Html,
    Style,
    JavaScript,
    /// User-defined origin type; registered and passed through verbatim.
    Custom(String),
}

impl std::fmt::Display for OriginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OriginKind::Html => write!(f, "@Html"),
            OriginKind::Style => write!(f, "@Style"),
            OriginKind::JavaScript => write!(f, "@JavaScript"),
            OriginKind::Custom(name) => write!(f, "@{}", name),
        }
    }
}

/// Root node of a parsed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub children: Vec<Node>,
    pub position: Position,
}

/// One HTML attribute. The CE form used in the source (`:` or `=`) is
/// normalised away; key and value are stored as written otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub position: Position,
}

/// An HTML element with attributes and owned children. Local style and
/// script blocks appear in `children` at their source position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub tag: String,
    pub attrs: Vec<Attribute>,
    pub children: Vec<Node>,
    pub position: Position,
}

impl ElementNode {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

/// Contents of a `text { ... }` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub value: String,
    pub position: Position,
}

/// One style property. An empty value marks a "required" property and is
/// only legal inside `[Custom]` definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleProp {
    pub name: String,
    pub value: String,
    pub position: Position,
}

/// A selector rule inside a style block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRule {
    pub selector: String,
    pub properties: Vec<StyleProp>,
    pub position: Position,
}

/// An inheritance edge recorded during parsing. `explicit` distinguishes
/// `inherit @Style P;` from the bare `@Style P;` form for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InheritRef {
    pub category: Option<Category>,
    pub kind: TemplateKind,
    pub name: String,
    pub explicit: bool,
    pub position: Position,
}

/// Ordered contents of a style block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StyleItem {
    Property(StyleProp),
    Rule(StyleRule),
    Use(TemplateUseNode),
    Inherit(InheritRef),
}

/// A `style { ... }` block; `local` is true inside an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleBlockNode {
    pub local: bool,
    pub items: Vec<StyleItem>,
    pub position: Position,
}

/// A `script { ... }` block; source is passed verbatim to the CHTL-JS
/// collaborator at emission time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptBlockNode {
    pub local: bool,
    pub source: String,
    pub position: Position,
}

/// Body of a template or custom definition, shaped by its kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplateBody {
    Style(Vec<StyleProp>),
    Element(Vec<Node>),
    Var(Vec<StyleProp>),
}

/// A `[Template]` or `[Custom]` definition. Custom definitions may carry
/// required (empty-valued) properties and specialisation operations that
/// apply to their merged base content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDefNode {
    pub kind: TemplateKind,
    pub name: String,
    pub is_custom: bool,
    pub body: TemplateBody,
    pub inherits: Vec<InheritRef>,
    pub specialisations: Vec<SpecOp>,
    pub position: Position,
}

/// Anchor for specialisation operations: a tag name with an optional
/// occurrence index (`div`, `div[1]`) or a bare child index (`[2]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Anchor {
    Tag { name: String, index: Option<usize> },
    Index(usize),
}

impl std::fmt::Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anchor::Tag { name, index: None } => write!(f, "{}", name),
            Anchor::Tag {
                name,
                index: Some(i),
            } => write!(f, "{}[{}]", name, i),
            Anchor::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// One target of a `delete` operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeleteTarget {
    /// Property name (style/var templates)
    Property(String),
    /// Element anchor (element templates)
    Element(Anchor),
    /// Direct inheritance edge
    Inheritance { kind: TemplateKind, name: String },
}

/// Placement of an `insert` operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertPosition {
    Before,
    After,
    Replace,
    AtTop,
    AtBottom,
}

/// One use-site (or custom-definition) specialisation operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpecOp {
    Delete {
        targets: Vec<DeleteTarget>,
        position: Position,
    },
    Insert {
        placement: InsertPosition,
        anchor: Option<Anchor>,
        content: Vec<Node>,
        position: Position,
    },
    /// Fill a required property or override a merged one (style/var)
    PropertyFill(StyleProp),
    /// Index-based element access: merge attributes/children into the
    /// anchored child of the merged template
    ElementPatch {
        anchor: Anchor,
        attrs: Vec<Attribute>,
        children: Vec<Node>,
        position: Position,
    },
}

/// A template or custom use site. A `[Template]`/`[Custom]` prefix makes
/// the reference fully qualified; `from ns` qualifiers are folded into
/// `name` as a dotted path during parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateUseNode {
    pub category: Option<Category>,
    pub kind: TemplateKind,
    pub name: String,
    pub specialisations: Vec<SpecOp>,
    pub position: Position,
}

/// An `[Origin]` definition; content is an unparsed string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginDefNode {
    pub kind: OriginKind,
    pub name: Option<String>,
    pub content: String,
    pub position: Position,
}

/// A reference to a named origin (`[Origin] @Html name;`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginUseNode {
    pub kind: OriginKind,
    pub name: String,
    pub position: Position,
}

/// What an import statement brings in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportKind {
    Chtl,
    Style,
    Element,
    Var,
    Html,
    JavaScript,
    CJmod,
    Config,
}

/// Import target: the whole file, one named symbol, or everything (`*`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportTarget {
    Whole,
    Named(String),
    Wildcard,
}

/// An `[Import]` statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportNode {
    pub kind: ImportKind,
    pub target: ImportTarget,
    pub path: String,
    pub alias: Option<String>,
    pub except: Vec<String>,
    pub position: Position,
}

/// A `[Namespace]` declaration. `block` is false for the braceless form,
/// which applies to the remainder of the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceNode {
    pub name: String,
    pub block: bool,
    pub children: Vec<Node>,
    pub position: Position,
}

/// Target of a `use` declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UseTarget {
    Html5,
    Config(String),
}

/// A `use ...;` declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UseNode {
    pub target: UseTarget,
    pub position: Position,
}

/// One `KEY: value;` setting inside a configuration, info, or nested group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSetting {
    pub name: String,
    pub value: String,
    pub position: Position,
}

/// A nested `[Name]` / `[OriginType]` group inside a configuration block.
/// Parsed and retained; carries no semantics yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigGroup {
    pub label: String,
    pub settings: Vec<ConfigSetting>,
}

/// A `[Configuration] @Config Name { ... }` definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationNode {
    pub name: Option<String>,
    pub settings: Vec<ConfigSetting>,
    pub groups: Vec<ConfigGroup>,
    pub position: Position,
}

/// `[Info] { ... }` document metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoNode {
    pub entries: Vec<ConfigSetting>,
    pub position: Position,
}

/// `[Export] { @Style A, @Element B }` visibility list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportNode {
    pub entries: Vec<(TemplateKind, String)>,
    pub position: Position,
}

/// An `except` constraint clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptNode {
    pub targets: Vec<String>,
    pub position: Position,
}

/// Comment kind; only generator comments survive into output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentKind {
    Line,
    Block,
    Generator,
}

/// A comment that was kept in the AST
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentNode {
    pub kind: CommentKind,
    pub text: String,
    pub position: Position,
}

/// The CHTL AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Document(DocumentNode),
    Element(ElementNode),
    Text(TextNode),
    StyleBlock(StyleBlockNode),
    ScriptBlock(ScriptBlockNode),
    TemplateDef(TemplateDefNode),
    TemplateUse(TemplateUseNode),
    OriginDef(OriginDefNode),
    OriginUse(OriginUseNode),
    Import(ImportNode),
    Namespace(NamespaceNode),
    Use(UseNode),
    Configuration(ConfigurationNode),
    Info(InfoNode),
    Export(ExportNode),
    Except(ExceptNode),
    Comment(CommentNode),
}

impl Node {
    /// Source position of the node's first token.
    pub fn position(&self) -> Position {
        match self {
            Node::Document(n) => n.position,
            Node::Element(n) => n.position,
            Node::Text(n) => n.position,
            Node::StyleBlock(n) => n.position,
            Node::ScriptBlock(n) => n.position,
            Node::TemplateDef(n) => n.position,
            Node::TemplateUse(n) => n.position,
            Node::OriginDef(n) => n.position,
            Node::OriginUse(n) => n.position,
            Node::Import(n) => n.position,
            Node::Namespace(n) => n.position,
            Node::Use(n) => n.position,
            Node::Configuration(n) => n.position,
            Node::Info(n) => n.position,
            Node::Export(n) => n.position,
            Node::Except(n) => n.position,
            Node::Comment(n) => n.position,
        }
    }

    /// Stable name of the node kind, used by tree dumps.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Document(_) => "Document",
            Node::Element(_) => "Element",
            Node::Text(_) => "Text",
            Node::StyleBlock(_) => "StyleBlock",
            Node::ScriptBlock(_) => "ScriptBlock",
            Node::TemplateDef(n) if n.is_custom => "CustomDef",
            Node::TemplateDef(_) => "TemplateDef",
            Node::TemplateUse(_) => "TemplateUse",
            Node::OriginDef(_) => "OriginDef",
            Node::OriginUse(_) => "OriginUse",
            Node::Import(_) => "Import",
            Node::Namespace(_) => "Namespace",
            Node::Use(_) => "Use",
            Node::Configuration(_) => "Configuration",
            Node::Info(_) => "Info",
            Node::Export(_) => "Export",
            Node::Except(_) => "Except",
            Node::Comment(_) => "Comment",
        }
    }

    /// Structural children, for traversal. Template bodies of element
    /// kind expose their children; leaf nodes return an empty slice.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Document(n) => &n.children,
            Node::Element(n) => &n.children,
            Node::Namespace(n) => &n.children,
            Node::TemplateDef(n) => match &n.body {
                TemplateBody::Element(children) => children,
                _ => &[],
            },
            _ => &[],
        }
    }

    /// Short label for tree dumps: the detail a reader wants at a glance.
    pub fn label(&self) -> String {
        match self {
            Node::Element(n) => n.tag.clone(),
            Node::Text(n) => format!("{:?}", n.value),
            Node::TemplateDef(n) => format!("{} {}", n.kind, n.name),
            Node::TemplateUse(n) => format!("{} {}", n.kind, n.name),
            Node::OriginDef(n) => format!(
                "{} {}",
                n.kind,
                n.name.as_deref().unwrap_or("(anonymous)")
            ),
            Node::OriginUse(n) => format!("{} {}", n.kind, n.name),
            Node::Import(n) => n.path.clone(),
            Node::Namespace(n) => n.name.clone(),
            Node::StyleBlock(n) => {
                if n.local {
                    "local".to_string()
                } else {
                    "global".to_string()
                }
            }
            _ => String::new(),
        }
    }
}
