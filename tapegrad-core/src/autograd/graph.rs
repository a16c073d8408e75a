use std::collections::HashMap;

use log::trace;

use crate::autograd::node::{Node, NodeId};
use crate::error::TapeError;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Sorts the graph reachable from `root` so that every node comes before all of its parents.
///
/// The first element is `root` itself; iterating the result in order is the order in which
/// backward replay must visit nodes.
///
/// # Errors
/// `TapeError::CycleDetected` if a node is reachable from itself.
pub(crate) fn topological_sort(root: &Node) -> Result<Vec<Node>, TapeError> {
    let mut marks: HashMap<NodeId, Mark> = HashMap::new();
    let mut post_order: Vec<Node> = Vec::new();
    // (node, parents already pushed?)
    let mut stack: Vec<(Node, bool)> = vec![(root.clone(), false)];

    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            marks.insert(node.id(), Mark::Done);
            post_order.push(node);
            continue;
        }
        match marks.get(&node.id()) {
            Some(Mark::Done) => continue,
            Some(Mark::InProgress) => return Err(TapeError::CycleDetected),
            None => {}
        }
        marks.insert(node.id(), Mark::InProgress);
        stack.push((node.clone(), true));
        for parent in node.parents() {
            match marks.get(&parent.id()) {
                Some(Mark::Done) => {}
                Some(Mark::InProgress) => return Err(TapeError::CycleDetected),
                None => stack.push((parent.clone(), false)),
            }
        }
    }

    post_order.reverse();
    trace!("Topological sort from {:?}: {} nodes", root.id(), post_order.len());
    Ok(post_order)
}
