pub mod assembly;
pub mod constants;
pub mod constraints;
pub mod service;

pub use assembly::{PlanOutcome, build_plan};
pub use constants::*;
pub use constraints::{first_violation, permits, recent_occurrences};
pub use service::{PlanRequest, PlanService, generate_plan};
