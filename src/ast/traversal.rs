//! AST traversal primitives
//!
//! Two complementary tools live here:
//!
//! - [`walk`] - a depth-first, left-to-right walker that hands each node
//!   to a callback together with its parent and depth. Passes that only
//!   care about a few node kinds match on the tag and ignore the rest;
//!   this replaces a per-kind visitor interface with one primitive.
//! - [`DocumentIndex`] - an `ego_tree`-backed index over the document for
//!   parent queries and tree rendering without back-pointers in the AST.

use ego_tree::{NodeId, Tree};

use crate::ast::nodes::{DocumentNode, Node};
use crate::tokenizer::Position;

/// Walk `node` and every structural descendant depth-first. The callback
/// receives `(node, parent, depth)`; the parent is handed down during the
/// walk, never stored on the node.
pub fn walk<'a, F>(node: &'a Node, f: &mut F)
where
    F: FnMut(&'a Node, Option<&'a Node>, usize),
{
    fn inner<'a, F>(node: &'a Node, parent: Option<&'a Node>, depth: usize, f: &mut F)
    where
        F: FnMut(&'a Node, Option<&'a Node>, usize),
    {
        f(node, parent, depth);
        for child in node.children() {
            inner(child, Some(node), depth + 1, f);
        }
    }
    inner(node, None, 0, f);
}

/// Summary stored per node in the index
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    pub kind: &'static str,
    pub label: String,
    pub position: Position,
}

/// Arena-style index over a document: parent lookups by handle, and a
/// plain-text tree rendering for the debug surface.
pub struct DocumentIndex {
    tree: Tree<NodeInfo>,
    order: Vec<NodeId>,
}

impl DocumentIndex {
    /// Build the index from a document root. Node handles are assigned in
    /// depth-first pre-order, matching [`walk`]'s visit order.
    pub fn build(document: &DocumentNode) -> Self {
        fn add(
            tree: &mut Tree<NodeInfo>,
            parent: NodeId,
            node: &Node,
            order: &mut Vec<NodeId>,
        ) {
            let info = NodeInfo {
                kind: node.kind_name(),
                label: node.label(),
                position: node.position(),
            };
            let id = tree.get_mut(parent).unwrap().append(info).id();
            order.push(id);
            for child in node.children() {
                add(tree, id, child, order);
            }
        }

        let root_info = NodeInfo {
            kind: "Document",
            label: String::new(),
            position: document.position,
        };
        let mut tree = Tree::new(root_info);
        let root_id = tree.root().id();
        let mut order = vec![root_id];
        for child in &document.children {
            add(&mut tree, root_id, child, &mut order);
        }

        Self { tree, order }
    }

    /// Number of indexed nodes (including the document root).
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.len() <= 1
    }

    /// Pre-order handle of the document root.
    pub const ROOT: usize = 0;

    /// The info recorded for the node with the given pre-order handle.
    pub fn info(&self, handle: usize) -> Option<&NodeInfo> {
        let id = *self.order.get(handle)?;
        self.tree.get(id).map(|n| n.value())
    }

    /// Pre-order handle of the parent, if any.
    pub fn parent_of(&self, handle: usize) -> Option<usize> {
        let id = *self.order.get(handle)?;
        let parent_id = self.tree.get(id)?.parent()?.id();
        self.order.iter().position(|&i| i == parent_id)
    }

    /// Render the document structure as an indented tree.
    pub fn render_tree(&self) -> String {
        fn render(node: ego_tree::NodeRef<'_, NodeInfo>, depth: usize, out: &mut String) {
            let info = node.value();
            out.push_str(&"  ".repeat(depth));
            if info.label.is_empty() {
                out.push_str(info.kind);
            } else {
                out.push_str(&format!("{} {}", info.kind, info.label));
            }
            out.push('\n');
            for child in node.children() {
                render(child, depth + 1, out);
            }
        }

        let mut out = String::new();
        render(self.tree.root(), 0, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::tokenizer::tokenize;

    fn parse_document(source: &str) -> DocumentNode {
        let (tokens, _) = tokenize(source);
        let (document, _) = parse(source, tokens);
        document
    }

    #[test]
    fn test_walk_visits_in_preorder_with_parents() {
        let document = parse_document("html { body { div { } } }");
        let root = Node::Document(document);

        let mut visited = Vec::new();
        walk(&root, &mut |node, parent, depth| {
            visited.push((
                node.kind_name(),
                node.label(),
                parent.map(|p| p.label()),
                depth,
            ));
        });

        assert_eq!(visited.len(), 4);
        assert_eq!(visited[0].0, "Document");
        assert_eq!(visited[1].1, "html");
        assert_eq!(visited[2].2.as_deref(), Some("html"));
        assert_eq!(visited[3], ("Element", "div".into(), Some("body".into()), 3));
    }

    #[test]
    fn test_index_parent_matches_walk_parent() {
        let document = parse_document("html { head { } body { div { } span { } } }");
        let root = Node::Document(document.clone());
        let index = DocumentIndex::build(&document);

        // Collect (node position, parent position) pairs from the walk and
        // check the index reports the same parent for every handle.
        let mut pairs = Vec::new();
        walk(&root, &mut |node, parent, _| {
            pairs.push((node.position(), parent.map(|p| p.position())));
        });

        assert_eq!(index.len(), pairs.len());
        for (handle, (position, parent_position)) in pairs.iter().enumerate() {
            let info = index.info(handle).unwrap();
            assert_eq!(info.position, *position);
            let indexed_parent = index
                .parent_of(handle)
                .and_then(|p| index.info(p))
                .map(|i| i.position);
            assert_eq!(indexed_parent, *parent_position);
        }
    }

    #[test]
    fn test_render_tree() {
        let document = parse_document("div { text { \"hi\" } }");
        let index = DocumentIndex::build(&document);
        let rendered = index.render_tree();
        assert!(rendered.starts_with("Document\n"));
        assert!(rendered.contains("  Element div\n"));
    }
}
