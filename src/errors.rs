//! Errors
//!
//! Custom error types used throughout the `tasktree` crate.
use thiserror::Error;

/// Errors raised while freezing a tree or looking values up in it.
#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    /// The input vector is shorter than a split column visited during a lookup.
    #[error("Split column {column} is out of bounds for an input of length {len}.")]
    FeatureOutOfBounds { column: usize, len: usize },
    /// A single-task lookup reached a node that splits on the task.
    #[error("Node {0} splits on the task, use a multitask lookup instead.")]
    TaskSplitInSingleTaskLookup(usize),
    /// A task split was found whose left child carries no active task set.
    #[error("Node {0} is the left child of a task split, but has no active tasks.")]
    MissingActiveTasks(usize),
    /// A lookup aborted on a missing feature, and the queried node has no NA value.
    #[error("Node {0} has no NA value to fall back on.")]
    NaUndefined(usize),
    /// A leaf was built without a value.
    #[error("Leaf node {0} has no value.")]
    MissingLeafValue(usize),
    /// A feature split was given a NaN threshold.
    #[error("Node {0} has a NaN split threshold.")]
    NanThreshold(usize),
    /// A node index that does not exist in the tree.
    #[error("Node {0} does not exist.")]
    UnknownNode(usize),
    /// A node is referenced as a child by more than one parent.
    #[error("Node {0} is the child of more than one parent.")]
    SharedChild(usize),
    /// A node is its own ancestor.
    #[error("Node {0} is part of a cycle.")]
    Cycle(usize),
    /// A node cannot be reached from the root.
    #[error("Node {0} cannot be reached from the root.")]
    UnreachableNode(usize),
    /// A tree needs at least one node.
    #[error("Unable to build a tree without nodes.")]
    EmptyTree,
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Unable to read configuration.
    #[error("Unable to read configuration: {0}")]
    UnableToRead(String),
    /// Unable to build the prediction thread pool.
    #[error("Unable to build thread pool: {0}")]
    ThreadPool(String),
}
