//! Iterative traversals over the snapshot tree.
//!
//! The payload is a tree by construction, but the walks still carry an
//! explicit visited set so a malformed payload can never loop them.

use std::collections::{BTreeSet, HashSet};

use crate::snapshot::{Node, TrafficSnapshot};

/// Identity of a connection: `"source-target"`.
pub fn connection_name(source: &str, target: &str) -> String {
    format!("{source}-{target}")
}

/// All nodes whose renderer marks them as a region, in document order,
/// at any depth of the tree.
pub fn collect_region_nodes(snapshot: &TrafficSnapshot) -> Vec<&Node> {
    let mut regions = Vec::new();
    for_each_node(&snapshot.nodes, |node| {
        if node.is_region() {
            regions.push(node);
        }
    });
    regions
}

/// Sorted, de-duplicated set of node classes across the whole tree.
/// Classless nodes contribute the empty string.
pub fn collect_node_classes(snapshot: &TrafficSnapshot) -> Vec<String> {
    let mut classes = BTreeSet::new();
    for_each_node(&snapshot.nodes, |node| {
        classes.insert(node.class.clone());
    });
    classes.into_iter().collect()
}

fn for_each_node<'a, F>(roots: &'a [Node], mut visit: F)
where
    F: FnMut(&'a Node),
{
    let mut stack: Vec<&Node> = roots.iter().rev().collect();
    let mut seen: HashSet<*const Node> = HashSet::new();
    while let Some(node) = stack.pop() {
        if !seen.insert(node as *const Node) {
            continue;
        }
        visit(node);
        for child in node.nodes.iter().rev() {
            stack.push(child);
        }
    }
}
