//! Tree Builder
//!
//! Nodes are added bottom up, children before their parent, and `build` freezes
//! the arena into an immutable [`Tree`] once every structural invariant holds.
use crate::constants::TASK_SPLIT_COLUMN;
use crate::errors::TreeError;
use crate::node::Node;
use crate::tree::Tree;
use hashbrown::HashSet;
use log::debug;
use std::cmp::max;

#[derive(Debug, Clone)]
pub struct TreeBuilder<D> {
    nodes: Vec<Node<D>>,
}

impl<D> Default for TreeBuilder<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> TreeBuilder<D> {
    pub fn new() -> Self {
        TreeBuilder { nodes: Vec::new() }
    }

    pub fn with_capacity(n_nodes: usize) -> Self {
        TreeBuilder {
            nodes: Vec::with_capacity(n_nodes),
        }
    }

    /// Start from nodes that were assembled elsewhere, node numbers are reset to their position.
    pub fn from_nodes(mut nodes: Vec<Node<D>>) -> Self {
        for (i, node) in nodes.iter_mut().enumerate() {
            node.num = i;
        }
        TreeBuilder { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a leaf carrying `value`, returns its index.
    pub fn leaf(&mut self, value: D) -> usize {
        let num = self.nodes.len();
        self.nodes.push(Node::leaf(num, value));
        num
    }

    /// Add a node sending `input[column] < threshold` to `left`, everything else to `right`.
    pub fn feature_split(
        &mut self,
        column: usize,
        threshold: f64,
        left: usize,
        right: usize,
    ) -> Result<usize, TreeError> {
        let split_column = isize::try_from(column).map_err(|_| {
            TreeError::InvalidParameter(
                "column".to_string(),
                format!("a column index below {}", isize::MAX),
                column.to_string(),
            )
        })?;
        if threshold.is_nan() {
            return Err(TreeError::NanThreshold(self.nodes.len()));
        }
        self.split(split_column, threshold, left, right)
    }

    /// Add a node routing on the task, tasks in the active set of `left` go left.
    pub fn task_split(&mut self, left: usize, right: usize) -> Result<usize, TreeError> {
        self.split(TASK_SPLIT_COLUMN, 0.0, left, right)
    }

    fn split(&mut self, split_column: isize, threshold: f64, left: usize, right: usize) -> Result<usize, TreeError> {
        self.get(left)?;
        self.get(right)?;
        if left == right {
            return Err(TreeError::SharedChild(left));
        }
        let num = self.nodes.len();
        self.nodes.push(Node::parent(num, split_column, threshold, left, right));
        Ok(num)
    }

    pub fn set_active_tasks<I: IntoIterator<Item = usize>>(&mut self, idx: usize, tasks: I) -> Result<(), TreeError> {
        self.get_mut(idx)?.active_tasks = Some(tasks.into_iter().collect::<HashSet<usize>>());
        Ok(())
    }

    pub fn set_na(&mut self, idx: usize, na: D) -> Result<(), TreeError> {
        self.get_mut(idx)?.na_value = Some(na);
        Ok(())
    }

    pub fn set_successor_count(&mut self, idx: usize, successor_count: usize) -> Result<(), TreeError> {
        self.get_mut(idx)?.successor_count = successor_count;
        Ok(())
    }

    fn get(&self, idx: usize) -> Result<&Node<D>, TreeError> {
        self.nodes.get(idx).ok_or(TreeError::UnknownNode(idx))
    }

    fn get_mut(&mut self, idx: usize) -> Result<&mut Node<D>, TreeError> {
        self.nodes.get_mut(idx).ok_or(TreeError::UnknownNode(idx))
    }

    /// Freeze the nodes reachable from `root` into a tree.
    ///
    /// Every node added to the builder has to be part of the tree, each one
    /// owned by exactly one parent.
    pub fn build(mut self, root: usize) -> Result<Tree<D>, TreeError> {
        let n_nodes = self.nodes.len();
        if n_nodes == 0 {
            return Err(TreeError::EmptyTree);
        }
        self.get(root)?;

        let mut parents: Vec<Option<usize>> = vec![None; n_nodes];
        for node in self.nodes.iter() {
            if let Some((left, right)) = node.children {
                for child in [left, right] {
                    if child >= n_nodes {
                        return Err(TreeError::UnknownNode(child));
                    }
                    if child == node.num {
                        return Err(TreeError::Cycle(child));
                    }
                    if parents[child].replace(node.num).is_some() {
                        return Err(TreeError::SharedChild(child));
                    }
                }
            }
        }
        if parents[root].is_some() {
            return Err(TreeError::Cycle(root));
        }

        // With at most one parent per node and none for the root,
        // the walk below visits every reachable node once.
        let mut visited = vec![false; n_nodes];
        let mut depth = 0;
        let mut n_leaves = 0;
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        while let Some((idx, node_depth)) = stack.pop() {
            visited[idx] = true;
            depth = max(depth, node_depth);
            let node = &self.nodes[idx];
            match node.children {
                None => {
                    if node.value.is_none() {
                        return Err(TreeError::MissingLeafValue(idx));
                    }
                    n_leaves += 1;
                }
                Some((left, right)) => {
                    if node.split_column < 0 {
                        if self.nodes[left].active_tasks.is_none() {
                            return Err(TreeError::MissingActiveTasks(left));
                        }
                    } else if node.threshold.is_nan() {
                        return Err(TreeError::NanThreshold(idx));
                    }
                    stack.push((right, node_depth + 1));
                    stack.push((left, node_depth + 1));
                }
            }
            self.nodes[idx].depth = node_depth;
        }
        if let Some(unreachable) = visited.iter().position(|v| !v) {
            return Err(TreeError::UnreachableNode(unreachable));
        }
        if self.nodes[root].na_value.is_none() {
            return Err(TreeError::NaUndefined(root));
        }

        debug!(
            "Froze tree with {} nodes, {} leaves and depth {}.",
            n_nodes, n_leaves, depth
        );
        Ok(Tree::from_parts(self.nodes, root, depth, n_leaves))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> (TreeBuilder<f64>, usize) {
        let mut b = TreeBuilder::new();
        let left = b.leaf(-1.0);
        let right = b.leaf(1.0);
        let root = b.feature_split(0, 5.0, left, right).unwrap();
        b.set_na(root, 0.0).unwrap();
        (b, root)
    }

    #[test]
    fn test_build_stump() {
        let (mut b, root) = stump();
        b.set_successor_count(root, 10).unwrap();
        let tree = b.build(root).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.root().idx(), 2);
        assert_eq!(tree.root().node().successor_count, 10);
        assert_eq!(tree.nodes()[0].depth, 1);
    }

    #[test]
    fn test_build_single_leaf() {
        let mut b = TreeBuilder::new();
        let leaf = b.leaf(4.0);
        b.set_na(leaf, 0.0).unwrap();
        let tree = b.build(leaf).unwrap();
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.n_leaves(), 1);
    }

    #[test]
    fn test_empty_tree() {
        let b: TreeBuilder<f64> = TreeBuilder::new();
        assert_eq!(b.build(0).unwrap_err(), TreeError::EmptyTree);
    }

    #[test]
    fn test_unknown_nodes() {
        let mut b = TreeBuilder::new();
        let leaf = b.leaf(1.0);
        assert_eq!(b.feature_split(0, 1.0, leaf, 7).unwrap_err(), TreeError::UnknownNode(7));
        assert_eq!(b.set_na(3, 0.0).unwrap_err(), TreeError::UnknownNode(3));
        assert_eq!(b.build(5).unwrap_err(), TreeError::UnknownNode(5));
    }

    #[test]
    fn test_same_child_twice() {
        let mut b = TreeBuilder::new();
        let leaf = b.leaf(1.0);
        assert_eq!(b.task_split(leaf, leaf).unwrap_err(), TreeError::SharedChild(leaf));
    }

    #[test]
    fn test_shared_child() {
        let mut b = TreeBuilder::new();
        let a = b.leaf(1.0);
        let c = b.leaf(2.0);
        let d = b.leaf(3.0);
        let left = b.feature_split(0, 0.0, a, c).unwrap();
        let right = b.feature_split(0, 0.0, c, d).unwrap();
        let root = b.feature_split(1, 0.0, left, right).unwrap();
        b.set_na(root, 0.0).unwrap();
        assert_eq!(b.build(root).unwrap_err(), TreeError::SharedChild(c));
    }

    #[test]
    fn test_root_with_parent() {
        let (b, _) = stump();
        assert_eq!(b.build(0).unwrap_err(), TreeError::Cycle(0));
    }

    #[test]
    fn test_cycle_from_raw_nodes() {
        let mut a: Node<f64> = Node::parent(0, 0, 0.0, 1, 2);
        a.na_value = Some(0.0);
        let b: Node<f64> = Node::parent(1, 0, 0.0, 0, 2);
        let c = Node::leaf(2, 1.0);
        let builder = TreeBuilder::from_nodes(vec![a, b, c]);
        assert_eq!(builder.build(0).unwrap_err(), TreeError::SharedChild(2));

        let self_loop: Node<f64> = Node::parent(0, 0, 0.0, 0, 1);
        let builder = TreeBuilder::from_nodes(vec![self_loop, Node::leaf(1, 1.0)]);
        assert_eq!(builder.build(0).unwrap_err(), TreeError::Cycle(0));
    }

    #[test]
    fn test_unreachable_node() {
        let (mut b, root) = stump();
        let orphan = b.leaf(9.0);
        assert_eq!(b.build(root).unwrap_err(), TreeError::UnreachableNode(orphan));
    }

    #[test]
    fn test_missing_na() {
        let mut b = TreeBuilder::new();
        let left = b.leaf(-1.0);
        let right = b.leaf(1.0);
        let root = b.feature_split(0, 5.0, left, right).unwrap();
        assert_eq!(b.build(root).unwrap_err(), TreeError::NaUndefined(root));
    }

    #[test]
    fn test_missing_leaf_value() {
        let mut leaf: Node<f64> = Node::leaf(1, 1.0);
        leaf.value = None;
        let mut root: Node<f64> = Node::parent(0, 0, 0.0, 1, 2);
        root.na_value = Some(0.0);
        let builder = TreeBuilder::from_nodes(vec![root, leaf, Node::leaf(2, 2.0)]);
        assert_eq!(builder.build(0).unwrap_err(), TreeError::MissingLeafValue(1));
    }

    #[test]
    fn test_nan_threshold() {
        let mut b = TreeBuilder::new();
        let left = b.leaf(-1.0);
        let right = b.leaf(1.0);
        assert_eq!(
            b.feature_split(0, f64::NAN, left, right).unwrap_err(),
            TreeError::NanThreshold(2)
        );
    }

    #[test]
    fn test_task_split_needs_left_tasks() {
        let mut b = TreeBuilder::new();
        let left = b.leaf(-1.0);
        let right = b.leaf(1.0);
        b.set_active_tasks(right, [3]).unwrap();
        let root = b.task_split(left, right).unwrap();
        b.set_na(root, 0.0).unwrap();
        assert_eq!(b.clone().build(root).unwrap_err(), TreeError::MissingActiveTasks(left));

        b.set_active_tasks(left, [1, 2]).unwrap();
        let tree = b.build(root).unwrap();
        assert!(tree.is_multitask());
    }
}
