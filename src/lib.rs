//! Binary decision-tree lookups.
//!
//! A [`Tree`] is an immutable arena of nodes produced by a [`TreeBuilder`].
//! Single-task lookups follow feature thresholds down to a leaf, multitask
//! lookups additionally route task-split nodes on the queried task. A missing
//! feature (`NaN`) stops the walk, and the value lookups then fall back to the
//! NA value of the node the lookup started from.

// Modules
pub mod builder;
pub mod config;
pub mod constants;
pub mod data;
pub mod errors;
pub mod node;
pub mod tree;

// Individual classes, and functions
pub use builder::TreeBuilder;
pub use config::PredictConfig;
pub use data::Matrix;
pub use errors::TreeError;
pub use node::{Node, NodeValue, SplitKind};
pub use tree::{ClassificationTree, NodeRef, RegressionTree, Tree};
