mod manager;
mod persistence;
mod store;

pub use manager::MealCatalog;
pub use persistence::{load_database, save_database, Database};
pub use store::{DocumentStore, PlanStore};
