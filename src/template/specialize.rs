//! Specialisation operations
//!
//! Applies use-site (and custom-definition) operations to merged template
//! content, in source order. A failed anchor match is a diagnostic and
//! the operation is skipped; the remaining operations still run.

use crate::ast::nodes::*;
use crate::diagnostics::{Diagnostic, Phase};
use crate::tokenizer::Position;

/// Apply property-shaped operations (style and var templates): deletes
/// and fills/overrides. Element-shaped operations are diagnosed.
pub fn apply_property_ops(
    props: &mut Vec<StyleProp>,
    ops: &[SpecOp],
    diagnostics: &mut Vec<Diagnostic>,
) {
    for op in ops {
        match op {
            SpecOp::Delete { targets, position } => {
                for target in targets {
                    match target {
                        DeleteTarget::Property(name) => {
                            let before = props.len();
                            props.retain(|p| p.name != *name);
                            if props.len() == before {
                                diagnostics.push(Diagnostic::error(
                                    Phase::Emit,
                                    *position,
                                    format!("cannot delete unknown property '{}'", name),
                                ));
                            }
                        }
                        // Inheritance deletions are consumed before merging.
                        DeleteTarget::Inheritance { .. } => {}
                        DeleteTarget::Element(anchor) => {
                            diagnostics.push(Diagnostic::error(
                                Phase::Emit,
                                *position,
                                format!(
                                    "cannot delete element '{}' from a style template",
                                    anchor
                                ),
                            ));
                        }
                    }
                }
            }
            SpecOp::PropertyFill(fill) => {
                match props.iter_mut().find(|p| p.name == fill.name) {
                    Some(existing) => existing.value = fill.value.clone(),
                    None => props.push(fill.clone()),
                }
            }
            SpecOp::Insert { position, .. } => {
                diagnostics.push(Diagnostic::error(
                    Phase::Emit,
                    *position,
                    "`insert` does not apply to style templates",
                ));
            }
            SpecOp::ElementPatch { position, .. } => {
                diagnostics.push(Diagnostic::error(
                    Phase::Emit,
                    *position,
                    "element specialisation does not apply to style templates",
                ));
            }
        }
    }
}

/// Apply element-shaped operations to a merged child list.
pub fn apply_element_ops(
    children: &mut Vec<Node>,
    ops: &[SpecOp],
    diagnostics: &mut Vec<Diagnostic>,
) {
    for op in ops {
        match op {
            SpecOp::Delete { targets, position } => {
                for target in targets {
                    match target {
                        DeleteTarget::Element(anchor) => {
                            delete_anchor(children, anchor, *position, diagnostics)
                        }
                        DeleteTarget::Inheritance { .. } => {}
                        DeleteTarget::Property(name) => {
                            diagnostics.push(Diagnostic::error(
                                Phase::Emit,
                                *position,
                                format!(
                                    "cannot delete property '{}' from an element template",
                                    name
                                ),
                            ));
                        }
                    }
                }
            }
            SpecOp::Insert {
                placement,
                anchor,
                content,
                position,
            } => apply_insert(children, *placement, anchor.as_ref(), content, *position, diagnostics),
            SpecOp::ElementPatch {
                anchor,
                attrs,
                children: patch_children,
                position,
            } => apply_patch(children, anchor, attrs, patch_children, *position, diagnostics),
            SpecOp::PropertyFill(fill) => {
                diagnostics.push(Diagnostic::error(
                    Phase::Emit,
                    fill.position,
                    format!(
                        "property '{}' does not apply to an element template",
                        fill.name
                    ),
                ));
            }
        }
    }
}

/// Find the child position an anchor refers to. A bare `[i]` addresses
/// the i-th top-level child; `tag` / `tag[i]` address occurrences of a
/// tag. First match wins.
fn find_anchor(children: &[Node], anchor: &Anchor) -> Option<usize> {
    match anchor {
        Anchor::Index(index) => {
            if *index < children.len() {
                Some(*index)
            } else {
                None
            }
        }
        Anchor::Tag { name, index } => {
            let wanted = index.unwrap_or(0);
            let mut seen = 0;
            for (i, child) in children.iter().enumerate() {
                if let Node::Element(element) = child {
                    if element.tag == *name {
                        if seen == wanted {
                            return Some(i);
                        }
                        seen += 1;
                    }
                }
            }
            None
        }
    }
}

fn delete_anchor(
    children: &mut Vec<Node>,
    anchor: &Anchor,
    position: Position,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match anchor {
        // A tag without an index deletes every matching element.
        Anchor::Tag { name, index: None } => {
            let before = children.len();
            children.retain(|c| !matches!(c, Node::Element(e) if e.tag == *name));
            if children.len() == before {
                diagnostics.push(Diagnostic::error(
                    Phase::Emit,
                    position,
                    format!("no element matches delete target '{}'", name),
                ));
            }
        }
        _ => match find_anchor(children, anchor) {
            Some(i) => {
                children.remove(i);
            }
            None => diagnostics.push(Diagnostic::error(
                Phase::Emit,
                position,
                format!("no element matches delete target '{}'", anchor),
            )),
        },
    }
}

fn apply_insert(
    children: &mut Vec<Node>,
    placement: InsertPosition,
    anchor: Option<&Anchor>,
    content: &[Node],
    position: Position,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match placement {
        InsertPosition::AtTop => {
            children.splice(0..0, content.iter().cloned());
        }
        InsertPosition::AtBottom => {
            children.extend(content.iter().cloned());
        }
        InsertPosition::Before | InsertPosition::After | InsertPosition::Replace => {
            let Some(anchor) = anchor else {
                diagnostics.push(Diagnostic::error(
                    Phase::Emit,
                    position,
                    "this insert form needs an anchor",
                ));
                return;
            };
            let Some(index) = find_anchor(children, anchor) else {
                diagnostics.push(Diagnostic::error(
                    Phase::Emit,
                    position,
                    format!("no element matches insert anchor '{}'", anchor),
                ));
                return;
            };
            match placement {
                InsertPosition::Before => {
                    children.splice(index..index, content.iter().cloned());
                }
                InsertPosition::After => {
                    children.splice(index + 1..index + 1, content.iter().cloned());
                }
                InsertPosition::Replace => {
                    children.splice(index..index + 1, content.iter().cloned());
                }
                _ => unreachable!(),
            }
        }
    }
}

/// Merge a patch into the anchored child: attributes override, children
/// append, and a patch style block folds into the child's existing one.
fn apply_patch(
    children: &mut [Node],
    anchor: &Anchor,
    attrs: &[Attribute],
    patch_children: &[Node],
    position: Position,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(index) = find_anchor(children, anchor) else {
        diagnostics.push(Diagnostic::error(
            Phase::Emit,
            position,
            format!("no element matches specialisation target '{}'", anchor),
        ));
        return;
    };
    let Node::Element(element) = &mut children[index] else {
        return;
    };

    for attr in attrs {
        match element.attrs.iter_mut().find(|a| a.name == attr.name) {
            Some(existing) => existing.value = attr.value.clone(),
            None => element.attrs.push(attr.clone()),
        }
    }

    for patch_child in patch_children {
        match patch_child {
            Node::StyleBlock(patch_style) => {
                let existing = element
                    .children
                    .iter_mut()
                    .find_map(|c| match c {
                        Node::StyleBlock(s) => Some(s),
                        _ => None,
                    });
                match existing {
                    Some(style) => style.items.extend(patch_style.items.iter().cloned()),
                    None => element.children.push(patch_child.clone()),
                }
            }
            _ => element.children.push(patch_child.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str) -> Node {
        Node::Element(ElementNode {
            tag: tag.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
            position: Position::start(),
        })
    }

    fn tags(children: &[Node]) -> Vec<&str> {
        children
            .iter()
            .filter_map(|n| match n {
                Node::Element(e) => Some(e.tag.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_delete_by_index() {
        let mut children = vec![element("div"), element("span")];
        apply_element_ops(
            &mut children,
            &[SpecOp::Delete {
                targets: vec![DeleteTarget::Element(Anchor::Index(0))],
                position: Position::start(),
            }],
            &mut Vec::new(),
        );
        assert_eq!(tags(&children), vec!["span"]);
    }

    #[test]
    fn test_delete_by_tag_removes_all_matches() {
        let mut children = vec![element("div"), element("span"), element("div")];
        apply_element_ops(
            &mut children,
            &[SpecOp::Delete {
                targets: vec![DeleteTarget::Element(Anchor::Tag {
                    name: "div".to_string(),
                    index: None,
                })],
                position: Position::start(),
            }],
            &mut Vec::new(),
        );
        assert_eq!(tags(&children), vec!["span"]);
    }

    #[test]
    fn test_delete_indexed_tag_removes_one_occurrence() {
        let mut children = vec![element("div"), element("span"), element("div")];
        apply_element_ops(
            &mut children,
            &[SpecOp::Delete {
                targets: vec![DeleteTarget::Element(Anchor::Tag {
                    name: "div".to_string(),
                    index: Some(1),
                })],
                position: Position::start(),
            }],
            &mut Vec::new(),
        );
        assert_eq!(tags(&children), vec!["div", "span"]);
    }

    #[test]
    fn test_insert_before_and_after() {
        let mut children = vec![element("main")];
        apply_element_ops(
            &mut children,
            &[
                SpecOp::Insert {
                    placement: InsertPosition::Before,
                    anchor: Some(Anchor::Tag {
                        name: "main".to_string(),
                        index: None,
                    }),
                    content: vec![element("header")],
                    position: Position::start(),
                },
                SpecOp::Insert {
                    placement: InsertPosition::After,
                    anchor: Some(Anchor::Tag {
                        name: "main".to_string(),
                        index: None,
                    }),
                    content: vec![element("footer")],
                    position: Position::start(),
                },
            ],
            &mut Vec::new(),
        );
        assert_eq!(tags(&children), vec!["header", "main", "footer"]);
    }

    #[test]
    fn test_insert_replace() {
        let mut children = vec![element("old")];
        apply_element_ops(
            &mut children,
            &[SpecOp::Insert {
                placement: InsertPosition::Replace,
                anchor: Some(Anchor::Index(0)),
                content: vec![element("new"), element("newer")],
                position: Position::start(),
            }],
            &mut Vec::new(),
        );
        assert_eq!(tags(&children), vec!["new", "newer"]);
    }

    #[test]
    fn test_insert_at_top_and_bottom() {
        let mut children = vec![element("main")];
        apply_element_ops(
            &mut children,
            &[
                SpecOp::Insert {
                    placement: InsertPosition::AtTop,
                    anchor: None,
                    content: vec![element("first")],
                    position: Position::start(),
                },
                SpecOp::Insert {
                    placement: InsertPosition::AtBottom,
                    anchor: None,
                    content: vec![element("last")],
                    position: Position::start(),
                },
            ],
            &mut Vec::new(),
        );
        assert_eq!(tags(&children), vec!["first", "main", "last"]);
    }

    #[test]
    fn test_failed_anchor_is_diagnosed_and_skipped() {
        let mut children = vec![element("main")];
        let mut diagnostics = Vec::new();
        apply_element_ops(
            &mut children,
            &[
                SpecOp::Insert {
                    placement: InsertPosition::After,
                    anchor: Some(Anchor::Tag {
                        name: "aside".to_string(),
                        index: None,
                    }),
                    content: vec![element("x")],
                    position: Position::start(),
                },
                SpecOp::Insert {
                    placement: InsertPosition::AtBottom,
                    anchor: None,
                    content: vec![element("footer")],
                    position: Position::start(),
                },
            ],
            &mut diagnostics,
        );
        // The failed insert is skipped; the following one still applies.
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("insert anchor"));
        assert_eq!(tags(&children), vec!["main", "footer"]);
    }

    #[test]
    fn test_property_delete_and_fill() {
        let mut props = vec![
            StyleProp {
                name: "color".to_string(),
                value: "red".to_string(),
                position: Position::start(),
            },
            StyleProp {
                name: "margin".to_string(),
                value: "0".to_string(),
                position: Position::start(),
            },
        ];
        let mut diagnostics = Vec::new();
        apply_property_ops(
            &mut props,
            &[
                SpecOp::Delete {
                    targets: vec![DeleteTarget::Property("color".to_string())],
                    position: Position::start(),
                },
                SpecOp::PropertyFill(StyleProp {
                    name: "padding".to_string(),
                    value: "4px".to_string(),
                    position: Position::start(),
                }),
            ],
            &mut diagnostics,
        );
        assert!(diagnostics.is_empty());
        let names: Vec<&str> = props.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["margin", "padding"]);
    }

    #[test]
    fn test_patch_merges_attrs_and_children() {
        let mut children = vec![element("div")];
        apply_element_ops(
            &mut children,
            &[SpecOp::ElementPatch {
                anchor: Anchor::Tag {
                    name: "div".to_string(),
                    index: None,
                },
                attrs: vec![Attribute {
                    name: "id".to_string(),
                    value: "patched".to_string(),
                    position: Position::start(),
                }],
                children: vec![element("span")],
                position: Position::start(),
            }],
            &mut Vec::new(),
        );
        match &children[0] {
            Node::Element(e) => {
                assert_eq!(e.attr("id"), Some("patched"));
                assert_eq!(tags(&e.children), vec!["span"]);
            }
            _ => panic!("expected element"),
        }
    }
}
