use thiserror::Error;

use crate::models::{ConstraintId, InventoryId, MealId, MealPlanId, PlanTemplateId, UserId};
use crate::rotation::EntryState;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Cannot consume meal {meal}: entry is {state}")]
    InvalidStateTransition { meal: MealId, state: EntryState },

    #[error("Meal {meal} is not in inventory {inventory}")]
    EntryNotFound { inventory: InventoryId, meal: MealId },

    #[error(
        "Inventory {inventory} has {available} eligible meals, {requested} requested"
    )]
    InsufficientEligibleMeals {
        inventory: InventoryId,
        requested: usize,
        available: usize,
    },

    #[error("Inventory {inventory} was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        inventory: InventoryId,
        expected: u64,
        found: u64,
    },

    #[error("Meal plan {plan} was modified concurrently (expected version {expected}, found {found})")]
    PlanVersionConflict {
        plan: MealPlanId,
        expected: u64,
        found: u64,
    },

    #[error("Inventory not found: {0}")]
    InventoryNotFound(InventoryId),

    #[error("Meal not found: {0}")]
    MealNotFound(MealId),

    #[error("Constraint not found: {0}")]
    ConstraintNotFound(ConstraintId),

    #[error("Meal plan not found: {0}")]
    PlanNotFound(MealPlanId),

    #[error("Plan template not found: {0}")]
    TemplateNotFound(PlanTemplateId),

    #[error("Inventory {0} is inactive")]
    InactiveInventory(InventoryId),

    #[error("User {user} may not access {resource}")]
    Forbidden { user: UserId, resource: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Meal {meal} is already in inventory {inventory}")]
    DuplicateEntry { inventory: InventoryId, meal: MealId },

    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl PlanError {
    /// Whether the whole generation should be retried from a fresh load.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlanError::VersionConflict { .. } | PlanError::PlanVersionConflict { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PlanError>;
