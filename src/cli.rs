use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::config::PlannerConfig;
use crate::planner::constants::DEFAULT_MAX_SAVE_ATTEMPTS;

/// Generate meal plans that rotate meals out of an inventory.
#[derive(Parser, Debug)]
#[command(name = "meal_rotation")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the JSON database file.
    #[arg(short, long, env = "MEAL_ROTATION_DB", default_value = "meal_rotation.json")]
    pub file: PathBuf,

    /// Acting user id.
    #[arg(short, long, env = "MEAL_ROTATION_USER")]
    pub user: Uuid,

    /// Log level used when RUST_LOG is unset.
    #[arg(long, env = "MEAL_ROTATION_LOG", default_value = "info")]
    pub log_level: String,

    /// Attempts before a concurrent-modification conflict is reported.
    #[arg(long, default_value_t = DEFAULT_MAX_SAVE_ATTEMPTS)]
    pub max_attempts: u32,

    /// Fail instead of relaxing constraints when a plan cannot be filled.
    #[arg(long)]
    pub strict: bool,
}

impl Cli {
    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            max_save_attempts: self.max_attempts,
            allow_relaxation: !self.strict,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a meal plan from an inventory.
    Plan {
        /// Inventory to draw meals from.
        #[arg(long)]
        inventory: Uuid,

        /// Constraint to apply; repeat in priority order, highest first.
        #[arg(long = "constraint")]
        constraints: Vec<Uuid>,

        /// Plan template supplying size and constraints.
        #[arg(long, conflicts_with_all = ["constraints", "size"])]
        template: Option<Uuid>,

        /// Number of meals in the plan.
        #[arg(long)]
        size: Option<usize>,

        /// First day of the plan (YYYY-MM-DD).
        #[arg(long)]
        start: NaiveDate,

        /// Last day of the plan (YYYY-MM-DD).
        #[arg(long)]
        end: NaiveDate,

        /// Plan name.
        #[arg(long)]
        name: Option<String>,

        /// Commit without asking for confirmation.
        #[arg(short, long)]
        yes: bool,
    },

    /// Advance an existing plan to its next window.
    Advance {
        /// Plan to advance.
        #[arg(long)]
        plan: Uuid,
    },

    /// Show the rotation state of each meal in an inventory.
    Status {
        #[arg(long)]
        inventory: Uuid,
    },

    /// Add one of your meals to an inventory by name.
    AddMeal {
        #[arg(long)]
        inventory: Uuid,

        /// Meal name; close misspellings are offered as suggestions.
        #[arg(long)]
        meal: String,
    },

    /// Write a plan to a CSV file.
    Export {
        #[arg(long)]
        plan: Uuid,

        /// Output CSV path.
        #[arg(long, default_value = "meal_plan.csv")]
        out: PathBuf,
    },
}
