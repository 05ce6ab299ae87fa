//! Depth and ancestor-path checks shared by the traversals

use crate::error::{CraftError, Result};
use crate::models::TraversalLimits;

/// Tracks the ancestor chain of a depth-first, pre-order walk.
///
/// Frames must be entered in pre-order: when a frame at depth `d` is entered,
/// the first `d` slots of `path` are exactly its ancestors.
#[derive(Debug, Clone)]
pub(crate) struct PathGuard<'a> {
    limits: TraversalLimits,
    path: Vec<&'a str>,
}

impl<'a> PathGuard<'a> {
    pub(crate) fn new(limits: TraversalLimits) -> Self {
        Self {
            limits,
            path: Vec::new(),
        }
    }

    pub(crate) fn enter(&mut self, item: &'a str, depth: usize) -> Result<()> {
        if let Some(limit) = self.limits.max_depth {
            if depth > limit {
                return Err(CraftError::DepthExceeded {
                    item: item.to_string(),
                    limit,
                });
            }
        }

        if self.limits.detect_cycles {
            self.path.truncate(depth);
            if self.path.contains(&item) {
                let mut path: Vec<String> = self.path.iter().map(|s| s.to_string()).collect();
                path.push(item.to_string());
                return Err(CraftError::CycleDetected { path });
            }
            self.path.push(item);
        }

        Ok(())
    }
}
