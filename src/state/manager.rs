use std::collections::HashMap;

use crate::error::{PlanError, Result};
use crate::models::{Meal, MealId, UserId};

/// Read-only view over the meals an inventory or plan refers to.
#[derive(Debug, Default, Clone)]
pub struct MealCatalog {
    /// All meals keyed by id.
    meals: HashMap<MealId, Meal>,
}

impl MealCatalog {
    /// Create a catalog from a list of meals. Later duplicates of an id win.
    pub fn new(meals: Vec<Meal>) -> Self {
        let mut map = HashMap::new();
        for meal in meals {
            map.insert(meal.id, meal);
        }
        Self { meals: map }
    }

    pub fn get(&self, id: MealId) -> Option<&Meal> {
        self.meals.get(&id)
    }

    /// Like [`get`](Self::get) but missing meals are an error.
    pub fn require(&self, id: MealId) -> Result<&Meal> {
        self.get(id).ok_or(PlanError::MealNotFound(id))
    }

    /// Display name, falling back to the id for unknown meals.
    pub fn name_of(&self, id: MealId) -> String {
        self.get(id)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Active meals owned by `user`, sorted by name.
    pub fn active_for(&self, user: UserId) -> Vec<&Meal> {
        let mut meals: Vec<&Meal> = self
            .meals
            .values()
            .filter(|m| m.user == user && m.active)
            .collect();
        meals.sort_by_key(|m| m.key());
        meals
    }

    /// Get all meals.
    pub fn all_meals(&self) -> Vec<&Meal> {
        self.meals.values().collect()
    }
}
