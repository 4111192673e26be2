mod inventory;
mod meal;
mod plan;

use uuid::Uuid;

pub use inventory::{Inventory, InventoryEntry};
pub use meal::{Constraint, Ingredient, Meal, RotationRules};
pub use plan::{MealPlan, PlanTemplate};

pub type UserId = Uuid;
pub type IngredientId = Uuid;
pub type MealId = Uuid;
pub type ConstraintId = Uuid;
pub type InventoryId = Uuid;
pub type MealPlanId = Uuid;
pub type PlanTemplateId = Uuid;
