//! Prediction Configuration
//!
//! Controls how batch prediction spreads rows across threads.
use crate::constants::DEFAULT_PARALLEL;
use crate::errors::TreeError;
use log::warn;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_parallel() -> bool {
    DEFAULT_PARALLEL
}
fn default_num_threads() -> Option<usize> {
    None
}

/// Configuration for `Tree::predict` and `Tree::predict_task`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictConfig {
    /// Whether rows are looked up in parallel.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Number of threads for parallel lookups, the global rayon pool is used when `None`.
    #[serde(default = "default_num_threads")]
    pub num_threads: Option<usize>,
}

impl Default for PredictConfig {
    fn default() -> Self {
        PredictConfig {
            parallel: DEFAULT_PARALLEL,
            num_threads: None,
        }
    }
}

impl PredictConfig {
    pub fn sequential() -> Self {
        PredictConfig {
            parallel: false,
            num_threads: None,
        }
    }

    pub fn validate(&self) -> Result<(), TreeError> {
        if self.num_threads == Some(0) {
            return Err(TreeError::InvalidParameter(
                "num_threads".to_string(),
                "a positive number of threads".to_string(),
                "0".to_string(),
            ));
        }
        if !self.parallel && self.num_threads.is_some() {
            warn!("num_threads is ignored, since parallel prediction is disabled.");
        }
        Ok(())
    }

    /// Load a configuration from a json string.
    pub fn from_json(json_str: &str) -> Result<Self, TreeError> {
        let config =
            serde_json::from_str::<Self>(json_str).map_err(|e| TreeError::UnableToRead(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a path to a json file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TreeError> {
        let json_str = fs::read_to_string(path).map_err(|e| TreeError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }

    /// Dedicated pool for parallel lookups, `None` when the global pool should be used.
    pub(crate) fn thread_pool(&self) -> Result<Option<ThreadPool>, TreeError> {
        match self.num_threads {
            Some(n) if self.parallel => rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map(Some)
                .map_err(|e| TreeError::ThreadPool(e.to_string())),
            _ => Ok(None),
        }
    }
}
