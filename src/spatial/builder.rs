//! Offline construction of [`StaticIndex`] blobs from an owned node tree.

use crate::{
    core::bounds::MapRect,
    spatial::index::StaticIndex,
    Result,
};

/// One node of the tree to flatten.
///
/// The builder copies bounds verbatim: every node's bounds must already
/// cover those of its descendants, or queries will miss pruned subtrees.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexNode {
    pub id: i32,
    pub offset: i32,
    pub node_type: i32,
    pub bounds: MapRect,
    pub children: Vec<IndexNode>,
}

impl IndexNode {
    pub fn new(id: i32, node_type: i32, bounds: MapRect) -> Self {
        Self {
            id,
            offset: 0,
            node_type,
            bounds,
            children: Vec::new(),
        }
    }

    pub fn with_offset(mut self, offset: i32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_child(mut self, child: IndexNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn push_child(&mut self, child: IndexNode) {
        self.children.push(child);
    }

    /// Total number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(IndexNode::node_count).sum::<usize>()
    }

    /// Flattens the tree rooted here into a [`StaticIndex`].
    pub fn build(&self) -> Result<StaticIndex> {
        let mut arrays = Arrays::with_capacity(self.node_count());
        arrays.push(self, 0);
        StaticIndex::from_parts(
            arrays.ids,
            arrays.offsets,
            arrays.types,
            arrays.bounds,
            arrays.siblings,
            arrays.parents,
        )
    }

    /// Flattens and encodes in one step.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.build()?.to_bytes())
    }
}

#[derive(Default)]
struct Arrays {
    ids: Vec<i32>,
    offsets: Vec<i32>,
    types: Vec<i32>,
    bounds: Vec<i32>,
    siblings: Vec<i32>,
    parents: Vec<i32>,
}

impl Arrays {
    fn with_capacity(n: usize) -> Self {
        Self {
            ids: Vec::with_capacity(n),
            offsets: Vec::with_capacity(n),
            types: Vec::with_capacity(n),
            bounds: Vec::with_capacity(n * 4),
            siblings: Vec::with_capacity(n),
            parents: Vec::with_capacity(n),
        }
    }

    /// Appends `node` and its subtree in pre-order, returning its slot.
    fn push(&mut self, node: &IndexNode, parent: usize) -> usize {
        let slot = self.ids.len();
        self.ids.push(node.id);
        self.offsets.push(node.offset);
        self.types.push(node.node_type);
        self.bounds.extend_from_slice(&[
            node.bounds.min_x,
            node.bounds.min_y,
            node.bounds.max_x,
            node.bounds.max_y,
        ]);
        self.siblings.push(0);
        self.parents.push(parent as i32);

        let mut previous: Option<usize> = None;
        for child in &node.children {
            let child_slot = self.push(child, slot);
            if let Some(prev) = previous {
                self.siblings[prev] = child_slot as i32;
            }
            previous = Some(child_slot);
        }
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::{BASE, MASK};
    use crate::spatial::index::TypeFilter;

    #[test]
    fn test_preorder_layout() {
        let h = BASE / 2;
        let tree = IndexNode::new(1, 0, MapRect::world())
            .with_child(
                IndexNode::new(2, 0, MapRect::new(0, 0, h - 1, MASK))
                    .with_child(IndexNode::new(3, 5, MapRect::new(10, 10, 10, 10)).with_offset(7))
                    .with_child(IndexNode::new(4, 5, MapRect::new(20, 20, 20, 20))),
            )
            .with_child(IndexNode::new(5, 0, MapRect::new(h, 0, MASK, MASK)));
        assert_eq!(tree.node_count(), 5);

        let index = tree.build().unwrap();
        assert_eq!(index.len(), 5);
        assert_eq!((0..5).map(|s| index.id(s)).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert_eq!(index.children(0).collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(index.children(1).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(index.parent(3), Some(1));
        assert_eq!(index.offset(2), 7);

        assert_eq!(
            index.query(&MapRect::world(), TypeFilter::Exact(5), 10),
            vec![2, 3]
        );
    }

    #[test]
    fn test_single_node() {
        let bytes = IndexNode::new(9, 1, MapRect::world()).to_bytes().unwrap();
        let index = StaticIndex::from_bytes(&bytes).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.query(&MapRect::new(1, 1, 2, 2), TypeFilter::Any, 5), vec![0]);
    }
}
