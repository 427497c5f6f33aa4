//! Depth-first node lookup by identifier

use crate::tree::node::Node;

/// Find the node with `target_id`, pre-order: a level's nodes are checked
/// before descending into any folder's children at that position.
pub fn locate<'a>(nodes: &'a [Node], target_id: &str) -> Option<&'a Node> {
    for node in nodes {
        if node.id() == Some(target_id) {
            return Some(node);
        }
        if let Node::Folder(folder) = node {
            if let Some(found) = locate(&folder.children, target_id) {
                return Some(found);
            }
        }
    }
    None
}

/// Mutable variant of [`locate`], same visiting order
pub fn locate_mut<'a>(nodes: &'a mut [Node], target_id: &str) -> Option<&'a mut Node> {
    for node in nodes.iter_mut() {
        if node.id() == Some(target_id) {
            return Some(node);
        }
        if let Node::Folder(folder) = node {
            if let Some(found) = locate_mut(&mut folder.children, target_id) {
                return Some(found);
            }
        }
    }
    None
}
