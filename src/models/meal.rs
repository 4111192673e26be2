use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PlanError, Result};
use crate::models::{ConstraintId, IngredientId, MealId, UserId};
use crate::planner::constants::{
    DEFAULT_MAX_OCCURRENCE, DEFAULT_SHORTTERM_ADJ_DAYS, DEFAULT_TIME_RESET_DAYS, MAX_RULE_DAYS,
};

fn default_active() -> bool {
    true
}

fn default_max_occurrence() -> u32 {
    DEFAULT_MAX_OCCURRENCE
}

fn default_time_reset() -> u32 {
    DEFAULT_TIME_RESET_DAYS
}

fn default_shortterm_adj() -> u32 {
    DEFAULT_SHORTTERM_ADJ_DAYS
}

/// A user-defined ingredient. Only referenced by id from meals and constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub user: UserId,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Ingredient {
    pub fn new(user: UserId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user,
            name: name.into(),
            active: true,
        }
    }
}

/// Usage allowance and cooldown of one meal inside an inventory.
///
/// `time_reset` and `shortterm_adj` are whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationRules {
    #[serde(rename = "maxOccurance")]
    pub max_occurrence: u32,
    pub time_reset: u32,
    pub shortterm_adj: u32,
}

impl RotationRules {
    /// Reject rules that can never be satisfied.
    ///
    /// The reset cycle must be between one day and [`MAX_RULE_DAYS`] and the
    /// cooldown may not outlast it.
    pub fn validate(&self) -> Result<()> {
        if self.time_reset == 0 {
            return Err(PlanError::InvalidConfiguration(
                "timeReset must be at least one day".to_string(),
            ));
        }
        if self.time_reset > MAX_RULE_DAYS {
            return Err(PlanError::InvalidConfiguration(format!(
                "timeReset ({} days) exceeds the {} day limit",
                self.time_reset, MAX_RULE_DAYS
            )));
        }
        if self.shortterm_adj > self.time_reset {
            return Err(PlanError::InvalidConfiguration(format!(
                "shorttermAdj ({} days) exceeds timeReset ({} days)",
                self.shortterm_adj, self.time_reset
            )));
        }
        Ok(())
    }

    /// Length of one reset cycle.
    #[inline]
    pub fn cycle(&self) -> Duration {
        Duration::days(i64::from(self.time_reset))
    }

    /// Cooldown applied after each use.
    #[inline]
    pub fn cooldown(&self) -> Duration {
        Duration::days(i64::from(self.shortterm_adj))
    }
}

impl Default for RotationRules {
    fn default() -> Self {
        Self {
            max_occurrence: DEFAULT_MAX_OCCURRENCE,
            time_reset: DEFAULT_TIME_RESET_DAYS,
            shortterm_adj: DEFAULT_SHORTTERM_ADJ_DAYS,
        }
    }
}

/// A meal as reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: MealId,
    pub user: UserId,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub ingredients: Vec<IngredientId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "maxOccurance", default = "default_max_occurrence")]
    pub max_occurrence: u32,
    #[serde(default = "default_time_reset")]
    pub time_reset: u32,
    #[serde(default = "default_shortterm_adj")]
    pub shortterm_adj: u32,
}

impl Meal {
    /// Create an active meal with default rotation rules.
    pub fn new(user: UserId, name: impl Into<String>) -> Self {
        let rules = RotationRules::default();
        Self {
            id: Uuid::new_v4(),
            user,
            name: name.into(),
            active: true,
            ingredients: Vec::new(),
            description: None,
            max_occurrence: rules.max_occurrence,
            time_reset: rules.time_reset,
            shortterm_adj: rules.shortterm_adj,
        }
    }

    pub fn with_rules(mut self, rules: RotationRules) -> Self {
        self.max_occurrence = rules.max_occurrence;
        self.time_reset = rules.time_reset;
        self.shortterm_adj = rules.shortterm_adj;
        self
    }

    pub fn with_ingredients(mut self, ingredients: impl IntoIterator<Item = IngredientId>) -> Self {
        self.ingredients = ingredients.into_iter().collect();
        self
    }

    pub fn rules(&self) -> RotationRules {
        RotationRules {
            max_occurrence: self.max_occurrence,
            time_reset: self.time_reset,
            shortterm_adj: self.shortterm_adj,
        }
    }

    /// Canonical key for name lookups (lowercase name).
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn shares_ingredient(&self, ingredients: &[IngredientId]) -> bool {
        self.ingredients.iter().any(|i| ingredients.contains(i))
    }
}

/// Cross-meal rule limiting how often meals sharing any of `ingredients`
/// recur within the last `shortterm_adj` plan slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    pub id: ConstraintId,
    pub user: UserId,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    pub ingredients: Vec<IngredientId>,
    #[serde(rename = "maxOccurance")]
    pub max_occurrence: u32,
    pub shortterm_adj: u32,
}

impl Constraint {
    pub fn new(
        user: UserId,
        name: impl Into<String>,
        ingredients: impl IntoIterator<Item = IngredientId>,
        max_occurrence: u32,
        shortterm_adj: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user,
            name: name.into(),
            active: true,
            ingredients: ingredients.into_iter().collect(),
            max_occurrence,
            shortterm_adj,
        }
    }

    /// Whether a meal falls under this constraint.
    pub fn applies_to(&self, meal: &Meal) -> bool {
        meal.shares_ingredient(&self.ingredients)
    }
}
