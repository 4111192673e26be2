use serde::{Deserialize, Serialize};

use crate::planner::constants::DEFAULT_MAX_SAVE_ATTEMPTS;

/// Runtime knobs for plan generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Load-build-save attempts before a version conflict is returned.
    pub max_save_attempts: u32,
    /// Drop lowest-priority constraints instead of failing when a slot
    /// cannot otherwise be filled.
    pub allow_relaxation: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_save_attempts: DEFAULT_MAX_SAVE_ATTEMPTS,
            allow_relaxation: true,
        }
    }
}

impl PlannerConfig {
    /// Attempts actually made; at least one.
    pub fn attempts(&self) -> u32 {
        self.max_save_attempts.max(1)
    }
}
