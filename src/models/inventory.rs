use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PlanError, Result};
use crate::models::{InventoryId, Meal, MealId, RotationRules, UserId};

/// Rotation state of one meal inside an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    pub meal: MealId,
    pub remaining_uses: u32,
    pub next_reset_date: DateTime<Utc>,
    pub next_use_date: DateTime<Utc>,
    /// Per-entry override of the meal's rotation rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<RotationRules>,
}

impl InventoryEntry {
    /// Fresh entry: full allowance, usable and resettable from `now`.
    pub fn new(meal: &Meal, now: DateTime<Utc>) -> Self {
        Self {
            meal: meal.id,
            remaining_uses: meal.max_occurrence,
            next_reset_date: now,
            next_use_date: now,
            rules: None,
        }
    }

    /// Rules in force for this entry: the override if set, else the meal's.
    pub fn effective_rules(&self, meal: &Meal) -> RotationRules {
        self.rules.unwrap_or_else(|| meal.rules())
    }
}

/// A user's pool of meals that plans draw from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub id: InventoryId,
    pub user: UserId,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, alias = "content")]
    pub contents: Vec<InventoryEntry>,
    /// Document revision, bumped by every successful save.
    #[serde(default)]
    pub version: u64,
}

fn default_active() -> bool {
    true
}

impl Inventory {
    pub fn new(user: UserId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user,
            name: name.into(),
            active: true,
            contents: Vec::new(),
            version: 0,
        }
    }

    pub fn entry(&self, meal: MealId) -> Option<&InventoryEntry> {
        self.contents.iter().find(|e| e.meal == meal)
    }

    pub fn entry_mut(&mut self, meal: MealId) -> Option<&mut InventoryEntry> {
        self.contents.iter_mut().find(|e| e.meal == meal)
    }

    pub fn contains(&self, meal: MealId) -> bool {
        self.entry(meal).is_some()
    }

    /// Ids of all tracked meals in insertion order.
    pub fn meal_ids(&self) -> Vec<MealId> {
        self.contents.iter().map(|e| e.meal).collect()
    }

    /// Start tracking a meal with its full allowance.
    pub fn add_meal(&mut self, meal: &Meal, now: DateTime<Utc>) -> Result<&InventoryEntry> {
        if self.contains(meal.id) {
            return Err(PlanError::DuplicateEntry {
                inventory: self.id,
                meal: meal.id,
            });
        }
        meal.rules().validate()?;

        self.contents.push(InventoryEntry::new(meal, now));
        Ok(&self.contents[self.contents.len() - 1])
    }

    /// Stop tracking a meal, returning its last state.
    pub fn remove_meal(&mut self, meal: MealId) -> Result<InventoryEntry> {
        let idx = self
            .contents
            .iter()
            .position(|e| e.meal == meal)
            .ok_or(PlanError::EntryNotFound {
                inventory: self.id,
                meal,
            })?;
        Ok(self.contents.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_add_meal_initializes_entry() {
        let user = Uuid::new_v4();
        let meal = Meal::new(user, "Tacos").with_rules(RotationRules {
            max_occurrence: 3,
            time_reset: 7,
            shortterm_adj: 2,
        });
        let mut inventory = Inventory::new(user, "Weeknights");

        let entry = inventory.add_meal(&meal, now()).unwrap();
        assert_eq!(entry.remaining_uses, 3);
        assert_eq!(entry.next_reset_date, now());
        assert_eq!(entry.next_use_date, now());
    }

    #[test]
    fn test_add_meal_rejects_duplicates() {
        let user = Uuid::new_v4();
        let meal = Meal::new(user, "Tacos");
        let mut inventory = Inventory::new(user, "Weeknights");

        inventory.add_meal(&meal, now()).unwrap();
        let err = inventory.add_meal(&meal, now()).unwrap_err();
        assert!(matches!(err, PlanError::DuplicateEntry { .. }));
        assert_eq!(inventory.len(), 1);
    }

    #[test]
    fn test_add_meal_rejects_unsatisfiable_rules() {
        let user = Uuid::new_v4();
        let meal = Meal::new(user, "Roast").with_rules(RotationRules {
            max_occurrence: 1,
            time_reset: 2,
            shortterm_adj: 5,
        });
        let mut inventory = Inventory::new(user, "Sundays");

        assert!(matches!(
            inventory.add_meal(&meal, now()),
            Err(PlanError::InvalidConfiguration(_))
        ));
        assert!(inventory.is_empty());
    }

    #[test]
    fn test_remove_meal() {
        let user = Uuid::new_v4();
        let meal = Meal::new(user, "Tacos");
        let mut inventory = Inventory::new(user, "Weeknights");
        inventory.add_meal(&meal, now()).unwrap();

        let removed = inventory.remove_meal(meal.id).unwrap();
        assert_eq!(removed.meal, meal.id);
        assert!(matches!(
            inventory.remove_meal(meal.id),
            Err(PlanError::EntryNotFound { .. })
        ));
    }

    #[test]
    fn test_legacy_content_field_accepted() {
        let user = Uuid::new_v4();
        let json = format!(
            r#"{{"id": "{}", "user": "{user}", "name": "Old", "content": []}}"#,
            Uuid::new_v4()
        );
        let inventory: Inventory = serde_json::from_str(&json).unwrap();
        assert!(inventory.active);
        assert_eq!(inventory.version, 0);
    }
}
