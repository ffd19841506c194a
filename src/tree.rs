use crate::config::PredictConfig;
use crate::data::Matrix;
use crate::errors::TreeError;
use crate::node::{Node, NodeValue};
use log::debug;
use rayon::prelude::*;
use std::fmt::{self, Debug, Display};

/// A frozen binary tree, stored as an arena of nodes.
///
/// Trees are created through [`TreeBuilder`](crate::TreeBuilder) and never change afterwards, so
/// any number of threads can run lookups on the same tree without locking.
///
/// Inputs are feature vectors indexed by split column, they have to be at
/// least [`Tree::n_features`] long for every lookup to be able to read its
/// split features. `NaN` marks a missing feature.
#[derive(Clone, Debug)]
pub struct Tree<D> {
    nodes: Vec<Node<D>>,
    root: usize,
    depth: usize,
    n_leaves: usize,
}

/// Regression flavor, leaves carry a scalar estimate.
pub type RegressionTree = Tree<f64>;
/// Classification flavor, leaves carry a class distribution.
pub type ClassificationTree = Tree<Vec<f64>>;

impl<D> Tree<D> {
    pub(crate) fn from_parts(nodes: Vec<Node<D>>, root: usize, depth: usize, n_leaves: usize) -> Self {
        Tree {
            nodes,
            root,
            depth,
            n_leaves,
        }
    }

    pub fn root(&self) -> NodeRef<'_, D> {
        NodeRef {
            tree: self,
            idx: self.root,
        }
    }

    pub fn node(&self, idx: usize) -> Option<NodeRef<'_, D>> {
        if idx < self.nodes.len() {
            Some(NodeRef { tree: self, idx })
        } else {
            None
        }
    }

    pub fn nodes(&self) -> &[Node<D>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    /// Minimum input length, one past the largest split column.
    pub fn n_features(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| !n.is_leaf() && n.split_column >= 0)
            .map(|n| n.split_column as usize + 1)
            .max()
            .unwrap_or(0)
    }

    /// Whether any node routes on the task.
    pub fn is_multitask(&self) -> bool {
        self.nodes.iter().any(|n| n.is_task_split())
    }

    pub fn leaf_for(&self, input: &[f64]) -> Result<Option<NodeRef<'_, D>>, TreeError> {
        self.root().leaf_for(input)
    }

    pub fn value_for(&self, input: &[f64]) -> Result<&D, TreeError> {
        self.root().value_for(input)
    }

    pub fn leaf_for_task(&self, input: &[f64], task: usize) -> Result<Option<NodeRef<'_, D>>, TreeError> {
        self.root().leaf_for_task(input, task)
    }

    pub fn value_for_task(&self, input: &[f64], task: usize) -> Result<&D, TreeError> {
        self.root().value_for_task(input, task)
    }
}

impl<D> Tree<D>
where
    D: Clone + Send + Sync,
{
    /// Look up the value of every row in `data`.
    pub fn predict(&self, data: &Matrix<f64>, config: &PredictConfig) -> Result<Vec<D>, TreeError> {
        self.predict_rows(data, config, |row| self.value_for(row))
    }

    /// Look up the value of every row in `data` for a single task.
    pub fn predict_task(&self, data: &Matrix<f64>, task: usize, config: &PredictConfig) -> Result<Vec<D>, TreeError> {
        self.predict_rows(data, config, |row| self.value_for_task(row, task))
    }

    fn predict_rows<'t, F>(&'t self, data: &Matrix<f64>, config: &PredictConfig, lookup: F) -> Result<Vec<D>, TreeError>
    where
        F: Fn(&[f64]) -> Result<&'t D, TreeError> + Sync,
    {
        config.validate()?;
        let row_value = |i: &usize| lookup(&data.get_row(*i)).cloned();
        if !config.parallel {
            debug!("Predicting {} rows on a single thread.", data.index.len());
            return data.index.iter().map(row_value).collect();
        }
        match config.thread_pool()? {
            Some(pool) => {
                debug!(
                    "Predicting {} rows on {} threads.",
                    data.index.len(),
                    pool.current_num_threads()
                );
                pool.install(|| data.index.par_iter().map(row_value).collect())
            }
            None => {
                debug!("Predicting {} rows on the global thread pool.", data.index.len());
                data.index.par_iter().map(row_value).collect()
            }
        }
    }
}

impl<D: Debug> Display for Tree<D> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut print_buffer: Vec<usize> = vec![self.root];
        let mut r = String::new();
        while let Some(idx) = print_buffer.pop() {
            let node = &self.nodes[idx];
            r += format!("{}{}\n", "      ".repeat(node.depth).as_str(), node).as_str();
            if let Some((left, right)) = node.children {
                print_buffer.push(right);
                print_buffer.push(left);
            }
        }
        write!(f, "{}", r)
    }
}

/// Borrowed handle on one node of a [`Tree`].
///
/// Lookups can start at any node, the subtree below it is walked and the NA
/// value of the starting node is the fallback for missing features.
pub struct NodeRef<'a, D> {
    tree: &'a Tree<D>,
    idx: usize,
}

impl<D> Clone for NodeRef<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for NodeRef<'_, D> {}

impl<D> PartialEq for NodeRef<'_, D> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.idx == other.idx
    }
}

impl<D: Debug> Debug for NodeRef<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("idx", &self.idx)
            .field("node", self.node())
            .finish()
    }
}

impl<'a, D> NodeRef<'a, D> {
    pub fn idx(&self) -> usize {
        self.idx
    }

    pub fn node(&self) -> &'a Node<D> {
        &self.tree.nodes[self.idx]
    }

    pub fn is_leaf(&self) -> bool {
        self.node().is_leaf()
    }

    pub fn left(&self) -> Option<NodeRef<'a, D>> {
        self.node().left_child().map(|idx| self.at(idx))
    }

    pub fn right(&self) -> Option<NodeRef<'a, D>> {
        self.node().right_child().map(|idx| self.at(idx))
    }

    fn at(&self, idx: usize) -> NodeRef<'a, D> {
        NodeRef { tree: self.tree, idx }
    }

    /// Walk feature splits down to the leaf `input` falls in.
    ///
    /// Returns `Ok(None)` when a split feature along the way is `NaN`.
    /// Task splits can't be resolved without a task and are reported as an error.
    pub fn leaf_for(&self, input: &[f64]) -> Result<Option<NodeRef<'a, D>>, TreeError> {
        self.descend(input, None).map(|(leaf, _)| leaf)
    }

    /// The value of the leaf `input` falls in, or this node's NA value when a feature is missing.
    pub fn value_for(&self, input: &[f64]) -> Result<&'a D, TreeError> {
        let leaf = self.leaf_for(input)?;
        self.resolve(leaf)
    }

    /// Walk down to the leaf `input` falls in for `task`.
    ///
    /// Task splits send the task left when it is in the active set of the left
    /// child, every other task goes right, including tasks neither child knows.
    pub fn leaf_for_task(&self, input: &[f64], task: usize) -> Result<Option<NodeRef<'a, D>>, TreeError> {
        self.descend(input, Some(task)).map(|(leaf, _)| leaf)
    }

    /// Shared walk of both lookups, also returns the number of edges followed.
    pub(crate) fn descend(
        &self,
        input: &[f64],
        task: Option<usize>,
    ) -> Result<(Option<NodeRef<'a, D>>, usize), TreeError> {
        let nodes = &self.tree.nodes;
        let mut node_idx = self.idx;
        let mut steps = 0;
        loop {
            let node = &nodes[node_idx];
            let Some((left, right)) = node.children else {
                return Ok((Some(self.at(node_idx)), steps));
            };
            node_idx = match task {
                Some(task) if node.split_column < 0 => {
                    let left_tasks = nodes[left]
                        .active_tasks
                        .as_ref()
                        .ok_or(TreeError::MissingActiveTasks(left))?;
                    if left_tasks.contains(&task) {
                        left
                    } else {
                        right
                    }
                }
                _ => match node.get_child_idx(input)? {
                    Some(child) => child,
                    None => return Ok((None, steps)),
                },
            };
            steps += 1;
        }
    }

    pub fn value_for_task(&self, input: &[f64], task: usize) -> Result<&'a D, TreeError> {
        let leaf = self.leaf_for_task(input, task)?;
        self.resolve(leaf)
    }

    fn resolve(&self, leaf: Option<NodeRef<'a, D>>) -> Result<&'a D, TreeError> {
        match leaf {
            Some(leaf) => leaf.node().value.as_ref().ok_or(TreeError::MissingLeafValue(leaf.idx)),
            None => self.node().na_value.as_ref().ok_or(TreeError::NaUndefined(self.idx)),
        }
    }
}

impl<'a, D> NodeValue for NodeRef<'a, D> {
    type Value = D;

    fn value(&self) -> Option<&D> {
        self.node().value.as_ref()
    }

    fn na(&self) -> Option<&D> {
        self.node().na_value.as_ref()
    }
}
