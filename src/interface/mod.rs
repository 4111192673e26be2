pub mod export;
pub mod prompts;
pub mod render;

pub use export::write_plan_csv;
pub use prompts::{fuzzy_candidates, prompt_yes_no, resolve_meal};
pub use render::{display_inventory_status, display_meal_plan};
