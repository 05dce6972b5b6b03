//! CHTL abstract syntax tree
//!
//! Node definitions live in [`nodes`]; traversal utilities (the walker
//! and the `ego_tree` document index) live in [`traversal`].
//!
//! Ownership is strictly downward: parents own children, children hold no
//! reference to their parent. The source AST is immutable after parsing;
//! the template engine instantiates *transient* subtrees from it during
//! generation and discards them afterwards.

pub mod nodes;
pub mod traversal;

pub use nodes::{
    Anchor, Attribute, Category, CommentKind, CommentNode, ConfigGroup, ConfigSetting,
    ConfigurationNode, DeleteTarget, DocumentNode, ElementNode, ExceptNode, ExportNode,
    ImportKind, ImportNode, ImportTarget, InfoNode, InheritRef, InsertPosition, NamespaceNode,
    Node, OriginDefNode, OriginKind, OriginUseNode, ScriptBlockNode, SpecOp, StyleBlockNode,
    StyleItem, StyleProp, StyleRule, TemplateBody, TemplateDefNode, TemplateKind,
    TemplateUseNode, TextNode, UseNode, UseTarget,
};
pub use traversal::{walk, DocumentIndex};
