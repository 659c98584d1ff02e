//! Per node bounds and geometric error, computed in one post-order pass.

use crate::input::Input;
use crate::tree::{OctreeNode, SpatialTree};
use crate::Bounds;

/// Aggregated information about the subtree rooted at a node
#[derive(Clone, Debug, PartialEq)]
pub struct NodeAggregate {
    /// Tight bounds of all items in the subtree
    pub bounds: Bounds,
    /// No item in the subtree
    pub empty: bool,
    /// Geometric error, 0 for leaves
    pub geometric_error: f64,
}

impl Default for NodeAggregate {
    fn default() -> Self {
        NodeAggregate {
            bounds: Bounds::default(),
            empty: true,
            geometric_error: 0.0,
        }
    }
}

/// Aggregates for every node of a tree, indexed by node id
#[derive(Clone, Debug)]
pub struct TreeInformation {
    nodes: Vec<NodeAggregate>,
}

impl TreeInformation {
    /// Runs the combined bounds and error pass over `tree`.
    ///
    /// `input` must have been validated against `tree`.
    pub fn compute(tree: &SpatialTree, input: &Input<'_>) -> Self {
        let mut info = TreeInformation {
            nodes: vec![NodeAggregate::default(); tree.number_of_nodes()],
        };
        tree.post_order(|node| info.visit(tree, input, node));
        info
    }

    fn visit(&mut self, tree: &SpatialTree, input: &Input<'_>, node: &OctreeNode) {
        let mut aggregate = NodeAggregate::default();
        let items = node.items();
        if !items.is_empty() {
            // items without any vertex leave the node empty
            let bounds = input.tight_bounds(items);
            if bounds.is_valid() {
                aggregate.bounds = bounds;
                aggregate.empty = false;
            }
        }
        if !node.is_leaf() {
            aggregate.geometric_error = input.node_error(
                tree.children(node)
                    .map(|child| (child, self.nodes[child.id].geometric_error)),
            );
            for child in tree.children(node) {
                let child = &self.nodes[child.id];
                if !child.empty {
                    aggregate.bounds.expand(&child.bounds);
                    aggregate.empty = false;
                }
            }
        }
        self.nodes[node.id] = aggregate;
        self.log_node(tree, node);
    }

    fn log_node(&self, tree: &SpatialTree, node: &OctreeNode) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        let children: Vec<usize> = tree.children(node).map(|c| c.id).collect();
        let aggregate = &self.nodes[node.id];
        log::debug!(
            "Node: {} items: {:?} children: {:?} empty: {} error: {}",
            node.id,
            node.items(),
            children,
            aggregate.empty,
            aggregate.geometric_error
        );
    }

    pub fn get(&self, id: usize) -> &NodeAggregate {
        &self.nodes[id]
    }

    pub fn is_empty(&self, id: usize) -> bool {
        self.nodes[id].empty
    }

    /// Tight bounds of a node, `None` if it has no content
    pub fn node_bounds(&self, id: usize) -> Option<&Bounds> {
        let node = &self.nodes[id];
        (!node.empty).then_some(&node.bounds)
    }

    pub fn geometric_error(&self, id: usize) -> f64 {
        self.nodes[id].geometric_error
    }

    /// Geometric error of the whole tileset, including the items of the root itself
    pub fn tileset_geometric_error(&self, tree: &SpatialTree, input: &Input<'_>) -> f64 {
        let root = tree.root();
        input.tileset_error(root, self.nodes[root.id].geometric_error)
    }
}
