pub mod cli;
pub mod config;
pub mod error;
pub mod interface;
pub mod models;
pub mod planner;
pub mod rotation;
pub mod state;

pub use config::PlannerConfig;
pub use error::{PlanError, Result};
pub use models::{Inventory, InventoryEntry, Meal, MealPlan, RotationRules};
pub use planner::{PlanRequest, PlanService, generate_plan};
pub use rotation::{EntryState, RotationEngine};
