/// Split column marking a node that routes on the task instead of a feature.
/// Any negative split column is treated as a task split.
pub const TASK_SPLIT_COLUMN: isize = -1;
pub const DEFAULT_PARALLEL: bool = true;
