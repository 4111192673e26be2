pub mod availability;
pub mod engine;
pub mod entry;

pub use availability::is_eligible;
pub use engine::RotationEngine;
pub use entry::{EntryState, clamp_allowance, consume, reset_if_due, state_of};
