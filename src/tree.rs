//! Octree partition of the input items.

use crate::Bounds;

/// Octree node
///
/// Nodes live in the arena of a [SpatialTree] and refer to their children by id.
#[derive(Clone, Debug)]
pub struct OctreeNode {
    /// Dense identifier, equal to the position of the node in the arena
    pub id: usize,
    /// Spatial cell of the node in source coordinates
    pub cell: Bounds,
    /// Ids of the 8 children, `None` for a leaf
    pub children: Option<[usize; 8]>,
    /// Indices of the items directly assigned to this node.
    ///
    /// An empty list is equivalent to no list.
    pub items: Option<Vec<usize>>,
}

impl OctreeNode {
    pub fn leaf(id: usize, cell: Bounds, items: Vec<usize>) -> Self {
        OctreeNode {
            id,
            cell,
            children: None,
            items: Some(items),
        }
    }

    pub fn internal(id: usize, cell: Bounds, children: [usize; 8]) -> Self {
        OctreeNode {
            id,
            cell,
            children: Some(children),
            items: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Assigned item indices, empty if there are none
    pub fn items(&self) -> &[usize] {
        self.items.as_deref().unwrap_or(&[])
    }
}

/// An 8-ary spatial tree stored as an arena indexed by node id.
///
/// The tree is supplied fully built; it is validated once and never mutated.
#[derive(Clone, Debug)]
pub struct SpatialTree {
    nodes: Vec<OctreeNode>,
    root: usize,
}

impl SpatialTree {
    /// Validates the topology: ids are dense, every child id is in range and every
    /// non-root node has exactly one parent.
    pub fn new(nodes: Vec<OctreeNode>, root: usize) -> crate::Result<Self> {
        if nodes.is_empty() {
            return Err(crate::Error::EmptyTree);
        }
        if root >= nodes.len() {
            return Err(crate::Error::InvalidNodeId(root));
        }
        let mut referenced = vec![false; nodes.len()];
        referenced[root] = true;
        for (i, node) in nodes.iter().enumerate() {
            if node.id != i {
                return Err(crate::Error::InvalidNodeId(node.id));
            }
            for &child in node.children.iter().flatten() {
                if child >= nodes.len() {
                    return Err(crate::Error::InvalidNodeId(child));
                }
                if referenced[child] {
                    return Err(crate::Error::NodeReferencedTwice(child));
                }
                referenced[child] = true;
            }
        }
        // a node that nobody references is not reachable from the root
        if let Some(orphan) = referenced.iter().position(|r| !r) {
            return Err(crate::Error::InvalidNodeId(orphan));
        }
        Ok(SpatialTree { nodes, root })
    }

    /// A tree made of a single leaf
    pub fn single_leaf(cell: Bounds, items: Vec<usize>) -> Self {
        SpatialTree {
            nodes: vec![OctreeNode::leaf(0, cell, items)],
            root: 0,
        }
    }

    pub fn root(&self) -> &OctreeNode {
        &self.nodes[self.root]
    }

    pub fn node(&self, id: usize) -> &OctreeNode {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    pub fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Children of `node` in index order 0..7, empty for a leaf
    pub fn children<'a>(
        &'a self,
        node: &'a OctreeNode,
    ) -> impl Iterator<Item = &'a OctreeNode> + 'a {
        node.children
            .iter()
            .flatten()
            .map(move |&child| &self.nodes[child])
    }

    /// Visits every node after all of its children, children in index order 0..7
    pub fn post_order<F: FnMut(&OctreeNode)>(&self, mut visit: F) {
        self.post_order_from(self.root(), &mut visit);
    }

    fn post_order_from<F: FnMut(&OctreeNode)>(&self, node: &OctreeNode, visit: &mut F) {
        for child in self.children(node) {
            self.post_order_from(child, visit);
        }
        visit(node);
    }
}
