//! Generic depth-first and breadth-first traversal over any [`NodeHandler`].

use crate::node::NodeHandler;
use std::collections::VecDeque;

/// What a visitor wants the walker to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    Continue,
    /// Do not descend into the children of the node just visited.
    SkipChildren,
    /// Abort the traversal immediately.
    Stop,
}

/// Callbacks invoked while walking a tree.
///
/// Breadth-first walks only call [`visit_before_children`](NodeVisitor::visit_before_children).
pub trait NodeVisitor<H: NodeHandler + ?Sized> {
    fn visit_before_children(&mut self, _node: H::Node, _handler: &H) -> WalkControl {
        WalkControl::Continue
    }

    /// Called once all children are done, also when they were skipped.
    fn visit_after_children(&mut self, _node: H::Node, _handler: &H) -> WalkControl {
        WalkControl::Continue
    }
}

/// Adapts a closure into a pre-order visitor.
pub struct FnVisitor<F>(pub F);

impl<H, F> NodeVisitor<H> for FnVisitor<F>
where
    H: NodeHandler + ?Sized,
    F: FnMut(H::Node, &H) -> WalkControl,
{
    fn visit_before_children(&mut self, node: H::Node, handler: &H) -> WalkControl {
        (self.0)(node, handler)
    }
}

/// Walks the subtree below `root` depth-first.
///
/// Returns `true` if the walk ran to completion, `false` if a visitor stopped it.
pub fn walk_dfs<H, V>(root: H::Node, visitor: &mut V, handler: &H) -> bool
where
    H: NodeHandler + ?Sized,
    V: NodeVisitor<H> + ?Sized,
{
    match visitor.visit_before_children(root, handler) {
        WalkControl::Stop => return false,
        WalkControl::SkipChildren => {}
        WalkControl::Continue => {
            for child in handler.children(root) {
                if !walk_dfs(child, visitor, handler) {
                    return false;
                }
            }
        }
    }
    visitor.visit_after_children(root, handler) != WalkControl::Stop
}

/// Walks the subtree below `root` level by level.
///
/// Returns `true` if the walk ran to completion, `false` if a visitor stopped it.
pub fn walk_bfs<H, V>(root: H::Node, visitor: &mut V, handler: &H) -> bool
where
    H: NodeHandler + ?Sized,
    V: NodeVisitor<H> + ?Sized,
{
    let mut queue = VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        match visitor.visit_before_children(node, handler) {
            WalkControl::Stop => return false,
            WalkControl::SkipChildren => {}
            WalkControl::Continue => queue.extend(handler.children(node)),
        }
    }
    true
}

/// Returns true if `node` or any node below it carries a value or an attribute.
///
/// Shallow content is found first: the search is breadth-first and stops at
/// the first defined node.
pub fn is_subtree_defined<H: NodeHandler + ?Sized>(node: H::Node, handler: &H) -> bool {
    let mut defined = false;
    walk_bfs(
        node,
        &mut FnVisitor(|n: H::Node, h: &H| {
            defined = h.is_defined(n);
            if defined {
                WalkControl::Stop
            } else {
                WalkControl::Continue
            }
        }),
        handler,
    );
    defined
}
