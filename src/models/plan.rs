use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ConstraintId, InventoryId, MealId, MealPlanId, PlanTemplateId, UserId};
use crate::planner::constants::DEFAULT_PLAN_SIZE;

fn default_active() -> bool {
    true
}

fn default_size() -> usize {
    DEFAULT_PLAN_SIZE
}

/// A generated sequence of meals for one date window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    pub id: MealPlanId,
    pub user: UserId,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_size")]
    pub size: usize,
    #[serde(default)]
    pub constraints: Vec<ConstraintId>,
    pub inventory: InventoryId,
    /// Earlier cycles' selections, oldest first.
    #[serde(default)]
    pub history: Vec<Vec<MealId>>,
    pub current: Vec<MealId>,
    /// Constraints dropped while filling `current`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relaxed: Vec<ConstraintId>,
    /// Bumped on every stored change.
    #[serde(default)]
    pub version: u64,
}

impl MealPlan {
    /// Number of days covered, both ends inclusive.
    pub fn span_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// Move `current` into history and slide the window to the following
    /// span of the same length.
    pub fn rotate_window(&mut self) {
        let span = Duration::days(self.span_days());
        let finished = std::mem::take(&mut self.current);
        if !finished.is_empty() {
            self.history.push(finished);
        }
        self.start_date += span;
        self.end_date += span;
        self.relaxed.clear();
    }
}

/// Reusable size and constraint set for generating plans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTemplate {
    pub id: PlanTemplateId,
    pub user: UserId,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    pub size: usize,
    #[serde(default)]
    pub constraints: Vec<ConstraintId>,
}

impl PlanTemplate {
    pub fn new(
        user: UserId,
        name: impl Into<String>,
        size: usize,
        constraints: impl IntoIterator<Item = ConstraintId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user,
            name: name.into(),
            active: true,
            size,
            constraints: constraints.into_iter().collect(),
        }
    }
}
