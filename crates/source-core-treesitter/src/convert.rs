use source_core::SyntaxNode;
use tree_sitter::{Node, TreeCursor};

struct Pending<'t> {
    node: Node<'t>,
    remaining: std::vec::IntoIter<Node<'t>>,
    children: Vec<SyntaxNode>,
}

impl<'t> Pending<'t> {
    fn new(node: Node<'t>, cursor: &mut TreeCursor<'t>) -> Self {
        let remaining: Vec<_> = node.children(cursor).collect();
        Self {
            node,
            remaining: remaining.into_iter(),
            children: Vec::new(),
        }
    }
}

/// Convert a Tree-sitter node (and its subtree) into a [`SyntaxNode`].
///
/// Walks with an explicit stack: deeply nested input must not overflow the thread stack.
pub(crate) fn to_syntax_node(root: Node<'_>, named_only: bool) -> SyntaxNode {
    let mut cursor = root.walk();
    let mut stack = vec![Pending::new(root, &mut cursor)];

    while let Some(top) = stack.last_mut() {
        if let Some(child) = top.remaining.next() {
            if keep(child, named_only) {
                let pending = Pending::new(child, &mut cursor);
                stack.push(pending);
            }
            continue;
        }

        let Some(done) = stack.pop() else {
            break;
        };
        let mut built = leaf(done.node);
        for child in done.children {
            built.push_child(child);
        }
        match stack.last_mut() {
            Some(parent) => parent.children.push(built),
            None => return built,
        }
    }
    leaf(root)
}

fn keep(node: Node<'_>, named_only: bool) -> bool {
    !named_only || node.is_named() || node.is_error() || node.is_missing()
}

fn leaf(node: Node<'_>) -> SyntaxNode {
    let range = node.start_byte()..node.end_byte();
    if node.is_missing() {
        SyntaxNode::error(format!("missing `{}`", node.kind()), range)
    } else if node.is_error() {
        SyntaxNode::error("unexpected input", range)
    } else {
        SyntaxNode::new(node.kind(), range)
    }
}
