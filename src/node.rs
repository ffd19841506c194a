use crate::constants::TASK_SPLIT_COLUMN;
use crate::errors::TreeError;
use hashbrown::HashSet;
use std::fmt::{self, Debug};

/// Capability contract shared by every node flavor.
///
/// Regression, classification and multitask trees only differ in the payload
/// type they carry, the traversal logic is shared.
pub trait NodeValue {
    type Value;
    /// Payload of a leaf, `None` on internal nodes.
    fn value(&self) -> Option<&Self::Value>;
    /// Payload returned when a lookup started at this node hits a missing feature.
    fn na(&self) -> Option<&Self::Value>;
}

/// How an internal node routes a lookup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SplitKind {
    /// Compare `input[column]` against `threshold`.
    Feature { column: usize, threshold: f64 },
    /// Route on the queried task.
    Task,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node<D> {
    pub num: usize,
    /// Left and right child, `None` for a leaf.
    pub children: Option<(usize, usize)>,
    pub successor_count: usize,
    pub split_column: isize,
    pub threshold: f64,
    pub active_tasks: Option<HashSet<usize>>,
    pub value: Option<D>,
    pub na_value: Option<D>,
    pub depth: usize,
}

impl<D> Node<D> {
    pub(crate) fn leaf(num: usize, value: D) -> Self {
        Node {
            num,
            children: None,
            successor_count: 0,
            split_column: TASK_SPLIT_COLUMN,
            threshold: 0.0,
            active_tasks: None,
            value: Some(value),
            na_value: None,
            depth: 0,
        }
    }

    pub(crate) fn parent(num: usize, split_column: isize, threshold: f64, left: usize, right: usize) -> Self {
        Node {
            num,
            children: Some((left, right)),
            successor_count: 0,
            split_column,
            threshold,
            active_tasks: None,
            value: None,
            na_value: None,
            depth: 0,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn is_task_split(&self) -> bool {
        !self.is_leaf() && self.split_column < 0
    }

    pub fn left_child(&self) -> Option<usize> {
        self.children.map(|(l, _)| l)
    }

    pub fn right_child(&self) -> Option<usize> {
        self.children.map(|(_, r)| r)
    }

    /// The split this node routes on, `None` for a leaf.
    pub fn split_kind(&self) -> Option<SplitKind> {
        self.children?;
        if self.split_column < 0 {
            Some(SplitKind::Task)
        } else {
            Some(SplitKind::Feature {
                column: self.split_column as usize,
                threshold: self.threshold,
            })
        }
    }

    /// Get the child a feature split sends `input` to.
    /// `Ok(None)` means the split feature is missing, or the node is a leaf.
    pub fn get_child_idx(&self, input: &[f64]) -> Result<Option<usize>, TreeError> {
        let Some((left, right)) = self.children else {
            return Ok(None);
        };
        if self.split_column < 0 {
            return Err(TreeError::TaskSplitInSingleTaskLookup(self.num));
        }
        let column = self.split_column as usize;
        let v = *input.get(column).ok_or(TreeError::FeatureOutOfBounds {
            column,
            len: input.len(),
        })?;
        if v.is_nan() {
            Ok(None)
        } else if v < self.threshold {
            Ok(Some(left))
        } else {
            Ok(Some(right))
        }
    }
}

impl<D> NodeValue for Node<D> {
    type Value = D;

    fn value(&self) -> Option<&D> {
        self.value.as_ref()
    }

    fn na(&self) -> Option<&D> {
        self.na_value.as_ref()
    }
}

impl<D: Debug> fmt::Display for Node<D> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.children, &self.value) {
            (None, Some(v)) => write!(f, "{}:leaf={:?},count={}", self.num, v, self.successor_count),
            (None, None) => write!(f, "{}:leaf=?,count={}", self.num, self.successor_count),
            (Some((l, r)), _) if self.split_column < 0 => {
                write!(f, "{}:[task] yes={},no={},count={}", self.num, l, r, self.successor_count)
            }
            (Some((l, r)), _) => write!(
                f,
                "{}:[{} < {}] yes={},no={},count={}",
                self.num, self.split_column, self.threshold, l, r, self.successor_count
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_idx_feature_split() {
        let node: Node<f64> = Node::parent(0, 1, 2.5, 1, 2);
        assert_eq!(node.get_child_idx(&[9.0, 1.0]), Ok(Some(1)));
        assert_eq!(node.get_child_idx(&[9.0, 2.5]), Ok(Some(2)));
        assert_eq!(node.get_child_idx(&[9.0, f64::NAN]), Ok(None));
    }

    #[test]
    fn test_child_idx_out_of_bounds() {
        let node: Node<f64> = Node::parent(0, 3, 0.0, 1, 2);
        assert_eq!(
            node.get_child_idx(&[1.0]),
            Err(TreeError::FeatureOutOfBounds { column: 3, len: 1 })
        );
    }

    #[test]
    fn test_child_idx_task_split() {
        let node: Node<f64> = Node::parent(4, TASK_SPLIT_COLUMN, 0.0, 1, 2);
        assert!(node.is_task_split());
        assert_eq!(node.split_kind(), Some(SplitKind::Task));
        assert_eq!(node.get_child_idx(&[1.0]), Err(TreeError::TaskSplitInSingleTaskLookup(4)));
    }

    #[test]
    fn test_leaf_contract() {
        let mut node = Node::leaf(0, 3.0);
        assert!(node.is_leaf());
        assert!(!node.is_task_split());
        assert_eq!(node.split_kind(), None);
        assert_eq!(node.value(), Some(&3.0));
        assert_eq!(node.na(), None);
        node.na_value = Some(0.0);
        assert_eq!(node.na(), Some(&0.0));
    }

    #[test]
    fn test_display() {
        let mut leaf = Node::leaf(2, 1.5);
        leaf.successor_count = 7;
        assert_eq!(format!("{}", leaf), "2:leaf=1.5,count=7");
        let split: Node<f64> = Node::parent(0, 1, 0.5, 1, 2);
        assert_eq!(format!("{}", split), "0:[1 < 0.5] yes=1,no=2,count=0");
        let task: Node<f64> = Node::parent(3, TASK_SPLIT_COLUMN, 0.0, 4, 5);
        assert_eq!(format!("{}", task), "3:[task] yes=4,no=5,count=0");
    }
}
