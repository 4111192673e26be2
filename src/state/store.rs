use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::error::{PlanError, Result};
use crate::models::{
    Constraint, ConstraintId, Ingredient, Inventory, InventoryId, Meal, MealId, MealPlan,
    MealPlanId, PlanTemplate, PlanTemplateId, UserId,
};
use crate::state::persistence::{load_database, save_database, Database, FileLock};

/// Persistence used by the planner.
///
/// `save_inventory` is a compare-and-swap on [`Inventory::version`]: it only
/// succeeds when the stored revision still equals the one the caller loaded.
pub trait PlanStore {
    fn load_inventory(&self, id: InventoryId) -> Result<Inventory>;

    /// Store a mutated inventory and return its new version.
    fn save_inventory(&self, inventory: &Inventory) -> Result<u64>;

    /// Unconditional overwrite for manual edits (last write wins). Still bumps
    /// the version so in-flight generations notice the edit.
    fn put_inventory(&self, inventory: &Inventory) -> Result<u64>;

    fn load_meal(&self, id: MealId) -> Result<Meal>;

    fn load_constraint(&self, id: ConstraintId) -> Result<Constraint>;

    fn load_plan(&self, id: MealPlanId) -> Result<MealPlan>;

    /// Store the consumed inventory and the plan built from it in one write.
    ///
    /// Both are compare-and-swapped: the inventory on [`Inventory::version`],
    /// an existing plan on [`MealPlan::version`]. A new plan is inserted. On
    /// any conflict nothing is written. Returns the stored plan.
    fn commit_plan(&self, inventory: &Inventory, plan: &MealPlan) -> Result<MealPlan>;

    fn load_template(&self, id: PlanTemplateId) -> Result<PlanTemplate>;

    fn meals_for_user(&self, user: UserId) -> Result<Vec<Meal>>;
}

/// [`PlanStore`] over an in-memory [`Database`], optionally mirrored to a
/// JSON file after every write.
pub struct DocumentStore {
    db: Mutex<Database>,
    path: Option<PathBuf>,
}

impl DocumentStore {
    pub fn in_memory(db: Database) -> Self {
        Self {
            db: Mutex::new(db),
            path: None,
        }
    }

    /// Open a file-backed store. A missing file starts an empty database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = if path.exists() {
            load_database(&path)?
        } else {
            Database::default()
        };
        Ok(Self {
            db: Mutex::new(db),
            path: Some(path),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Database {
        self.lock().clone()
    }

    /// Apply `change` to a copy, flush it, then publish it.
    ///
    /// File-backed stores hold the file lock for the whole write and start
    /// from what is on disk, so writes from other processes are seen and
    /// version checks run against them. A failed change or flush leaves the
    /// file untouched.
    fn write<R>(&self, change: impl FnOnce(&mut Database) -> Result<R>) -> Result<R> {
        let mut guard = self.lock();
        let _file_lock = match &self.path {
            Some(path) => {
                let lock = FileLock::acquire(path)?;
                if path.exists() {
                    *guard = load_database(path)?;
                }
                Some(lock)
            }
            None => None,
        };

        let mut next = guard.clone();
        let out = change(&mut next)?;
        if let Some(path) = &self.path {
            save_database(path, &next)?;
        }
        *guard = next;
        Ok(out)
    }

    pub fn insert_ingredient(&self, ingredient: Ingredient) -> Result<()> {
        self.write(|db| {
            let key = ingredient.name.to_lowercase();
            if db
                .ingredients
                .iter()
                .any(|i| i.user == ingredient.user && i.id != ingredient.id && i.name.to_lowercase() == key)
            {
                return Err(PlanError::DuplicateName(ingredient.name.clone()));
            }
            upsert(&mut db.ingredients, ingredient, |i| i.id);
            Ok(())
        })
    }

    pub fn insert_meal(&self, meal: Meal) -> Result<()> {
        meal.rules().validate()?;
        self.write(|db| {
            let key = meal.key();
            if db
                .meals
                .iter()
                .any(|m| m.user == meal.user && m.id != meal.id && m.key() == key)
            {
                return Err(PlanError::DuplicateName(meal.name.clone()));
            }
            upsert(&mut db.meals, meal, |m| m.id);
            Ok(())
        })
    }

    pub fn insert_constraint(&self, constraint: Constraint) -> Result<()> {
        self.write(|db| {
            let key = constraint.name.to_lowercase();
            if db.constraints.iter().any(|c| {
                c.user == constraint.user && c.id != constraint.id && c.name.to_lowercase() == key
            }) {
                return Err(PlanError::DuplicateName(constraint.name.clone()));
            }
            upsert(&mut db.constraints, constraint, |c| c.id);
            Ok(())
        })
    }

    pub fn insert_template(&self, template: PlanTemplate) -> Result<()> {
        if template.size == 0 {
            return Err(PlanError::InvalidInput(
                "template size must be at least 1".to_string(),
            ));
        }
        self.write(|db| {
            upsert(&mut db.plan_templates, template, |t| t.id);
            Ok(())
        })
    }

    /// Create a new inventory at version 0.
    pub fn insert_inventory(&self, inventory: Inventory) -> Result<()> {
        self.write(|db| {
            if db.inventories.iter().any(|i| i.id == inventory.id) {
                return Err(PlanError::InvalidInput(format!(
                    "inventory {} already exists",
                    inventory.id
                )));
            }
            let key = inventory.name.to_lowercase();
            if db
                .inventories
                .iter()
                .any(|i| i.user == inventory.user && i.name.to_lowercase() == key)
            {
                return Err(PlanError::DuplicateName(inventory.name.clone()));
            }
            let mut fresh = inventory;
            fresh.version = 0;
            db.inventories.push(fresh);
            Ok(())
        })
    }

    /// Delete a meal that no inventory still tracks.
    pub fn delete_meal(&self, id: MealId) -> Result<Meal> {
        self.write(|db| {
            if let Some(holder) = db.inventories.iter().find(|i| i.contains(id)) {
                return Err(PlanError::InvalidInput(format!(
                    "meal {id} is still tracked by inventory {}",
                    holder.name
                )));
            }
            let idx = db
                .meals
                .iter()
                .position(|m| m.id == id)
                .ok_or(PlanError::MealNotFound(id))?;
            Ok(db.meals.remove(idx))
        })
    }

    pub fn delete_inventory(&self, id: InventoryId) -> Result<Inventory> {
        self.write(|db| {
            let idx = db
                .inventories
                .iter()
                .position(|i| i.id == id)
                .ok_or(PlanError::InventoryNotFound(id))?;
            Ok(db.inventories.remove(idx))
        })
    }

    pub fn delete_plan(&self, id: MealPlanId) -> Result<MealPlan> {
        self.write(|db| {
            let idx = db
                .meal_plans
                .iter()
                .position(|p| p.id == id)
                .ok_or(PlanError::PlanNotFound(id))?;
            Ok(db.meal_plans.remove(idx))
        })
    }
}

/// Compare-and-swap one inventory inside a write.
fn swap_inventory(db: &mut Database, inventory: &Inventory) -> Result<u64> {
    let stored = db
        .inventories
        .iter_mut()
        .find(|i| i.id == inventory.id)
        .ok_or(PlanError::InventoryNotFound(inventory.id))?;

    if stored.version != inventory.version {
        return Err(PlanError::VersionConflict {
            inventory: inventory.id,
            expected: inventory.version,
            found: stored.version,
        });
    }

    *stored = inventory.clone();
    stored.version += 1;
    debug!(inventory = %inventory.id, version = stored.version, "inventory saved");
    Ok(stored.version)
}

fn upsert<T>(items: &mut Vec<T>, item: T, id: impl Fn(&T) -> uuid::Uuid) {
    match items.iter().position(|existing| id(existing) == id(&item)) {
        Some(idx) => items[idx] = item,
        None => items.push(item),
    }
}

impl PlanStore for DocumentStore {
    fn load_inventory(&self, id: InventoryId) -> Result<Inventory> {
        self.lock()
            .inventories
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or(PlanError::InventoryNotFound(id))
    }

    fn save_inventory(&self, inventory: &Inventory) -> Result<u64> {
        self.write(|db| swap_inventory(db, inventory))
    }

    fn put_inventory(&self, inventory: &Inventory) -> Result<u64> {
        self.write(|db| {
            let version = match db.inventories.iter_mut().find(|i| i.id == inventory.id) {
                Some(stored) => {
                    let version = stored.version + 1;
                    *stored = inventory.clone();
                    stored.version = version;
                    version
                }
                None => {
                    let mut fresh = inventory.clone();
                    fresh.version = 0;
                    db.inventories.push(fresh);
                    0
                }
            };
            debug!(inventory = %inventory.id, version, "inventory overwritten");
            Ok(version)
        })
    }

    fn load_meal(&self, id: MealId) -> Result<Meal> {
        self.lock()
            .meals
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or(PlanError::MealNotFound(id))
    }

    fn load_constraint(&self, id: ConstraintId) -> Result<Constraint> {
        self.lock()
            .constraints
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(PlanError::ConstraintNotFound(id))
    }

    fn load_plan(&self, id: MealPlanId) -> Result<MealPlan> {
        self.lock()
            .meal_plans
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(PlanError::PlanNotFound(id))
    }

    fn commit_plan(&self, inventory: &Inventory, plan: &MealPlan) -> Result<MealPlan> {
        self.write(|db| {
            swap_inventory(db, inventory)?;

            let stored = match db.meal_plans.iter_mut().find(|p| p.id == plan.id) {
                Some(stored) => {
                    if stored.version != plan.version {
                        return Err(PlanError::PlanVersionConflict {
                            plan: plan.id,
                            expected: plan.version,
                            found: stored.version,
                        });
                    }
                    *stored = plan.clone();
                    stored.version += 1;
                    stored.clone()
                }
                None => {
                    let mut fresh = plan.clone();
                    fresh.version = 0;
                    db.meal_plans.push(fresh.clone());
                    fresh
                }
            };
            debug!(plan = %stored.id, version = stored.version, "meal plan saved");
            Ok(stored)
        })
    }

    fn load_template(&self, id: PlanTemplateId) -> Result<PlanTemplate> {
        self.lock()
            .plan_templates
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(PlanError::TemplateNotFound(id))
    }

    fn meals_for_user(&self, user: UserId) -> Result<Vec<Meal>> {
        Ok(self
            .lock()
            .meals
            .iter()
            .filter(|m| m.user == user)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn seeded() -> (DocumentStore, Inventory) {
        let user = Uuid::new_v4();
        let store = DocumentStore::in_memory(Database::default());
        let inventory = Inventory::new(user, "Pantry");
        store.insert_inventory(inventory.clone()).unwrap();
        (store, inventory)
    }

    #[test]
    fn test_save_bumps_version() {
        let (store, _) = seeded();
        let inventory = store.snapshot().inventories[0].clone();

        assert_eq!(store.save_inventory(&inventory).unwrap(), 1);
        let reloaded = store.load_inventory(inventory.id).unwrap();
        assert_eq!(reloaded.version, 1);
    }

    #[test]
    fn test_stale_save_conflicts() {
        let (store, inventory) = seeded();
        let first = store.load_inventory(inventory.id).unwrap();
        let second = store.load_inventory(inventory.id).unwrap();

        store.save_inventory(&first).unwrap();
        let err = store.save_inventory(&second).unwrap_err();
        assert!(matches!(
            err,
            PlanError::VersionConflict {
                expected: 0,
                found: 1,
                ..
            }
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_put_inventory_last_write_wins() {
        let (store, inventory) = seeded();
        let mut edit_a = store.load_inventory(inventory.id).unwrap();
        let mut edit_b = store.load_inventory(inventory.id).unwrap();
        edit_a.name = "Pantry A".to_string();
        edit_b.name = "Pantry B".to_string();

        assert_eq!(store.put_inventory(&edit_a).unwrap(), 1);
        assert_eq!(store.put_inventory(&edit_b).unwrap(), 2);

        // Edit A is lost by design; the later write is what remains.
        let stored = store.load_inventory(inventory.id).unwrap();
        assert_eq!(stored.name, "Pantry B");
        assert_eq!(stored.version, 2);
    }

    #[test]
    fn test_insert_meal_duplicate_name() {
        let store = DocumentStore::in_memory(Database::default());
        let user = Uuid::new_v4();
        store.insert_meal(Meal::new(user, "Bibimbap")).unwrap();

        let err = store.insert_meal(Meal::new(user, "bibimbap")).unwrap_err();
        assert!(matches!(err, PlanError::DuplicateName(_)));
        assert_eq!(store.meals_for_user(user).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_meal_still_tracked() {
        let (store, inventory) = seeded();
        let meal = Meal::new(inventory.user, "Ramen");
        store.insert_meal(meal.clone()).unwrap();

        let mut tracked = store.load_inventory(inventory.id).unwrap();
        tracked.add_meal(&meal, chrono::Utc::now()).unwrap();
        store.save_inventory(&tracked).unwrap();

        assert!(matches!(
            store.delete_meal(meal.id),
            Err(PlanError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        let user = Uuid::new_v4();

        {
            let store = DocumentStore::open(&path).unwrap();
            store.insert_meal(Meal::new(user, "Falafel")).unwrap();
            store.insert_inventory(Inventory::new(user, "Lunch")).unwrap();
        }

        let reopened = DocumentStore::open(&path).unwrap();
        let meals = reopened.meals_for_user(user).unwrap();
        assert_eq!(meals.len(), 1);
        assert_eq!(reopened.snapshot().inventories.len(), 1);
    }

    #[test]
    fn test_delete_inventory_and_plan() {
        let (store, inventory) = seeded();
        let plan = MealPlan {
            id: Uuid::new_v4(),
            user: inventory.user,
            name: "Week 1".to_string(),
            active: true,
            start_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            end_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 8).unwrap(),
            size: 1,
            constraints: Vec::new(),
            inventory: inventory.id,
            history: Vec::new(),
            current: Vec::new(),
            relaxed: Vec::new(),
            version: 0,
        };
        let stored = store.load_inventory(inventory.id).unwrap();
        store.commit_plan(&stored, &plan).unwrap();

        assert_eq!(store.delete_plan(plan.id).unwrap().id, plan.id);
        assert!(matches!(
            store.load_plan(plan.id),
            Err(PlanError::PlanNotFound(id)) if id == plan.id
        ));
        assert!(matches!(
            store.delete_plan(plan.id),
            Err(PlanError::PlanNotFound(_))
        ));

        assert_eq!(store.delete_inventory(inventory.id).unwrap().name, "Pantry");
        assert!(matches!(
            store.delete_inventory(inventory.id),
            Err(PlanError::InventoryNotFound(id)) if id == inventory.id
        ));
        assert!(store.snapshot().inventories.is_empty());
    }

    #[test]
    fn test_commit_plan_bumps_both_versions() {
        let (store, inventory) = seeded();
        let plan = MealPlan {
            id: Uuid::new_v4(),
            user: inventory.user,
            name: "Week 1".to_string(),
            active: true,
            start_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            end_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 8).unwrap(),
            size: 1,
            constraints: Vec::new(),
            inventory: inventory.id,
            history: Vec::new(),
            current: Vec::new(),
            relaxed: Vec::new(),
            version: 0,
        };

        let first = store.load_inventory(inventory.id).unwrap();
        let created = store.commit_plan(&first, &plan).unwrap();
        assert_eq!(created.version, 0);

        let second = store.load_inventory(inventory.id).unwrap();
        let updated = store.commit_plan(&second, &created).unwrap();
        assert_eq!(updated.version, 1);
        assert_eq!(store.load_inventory(inventory.id).unwrap().version, 2);

        // The inventory check fails first; the plan is left alone.
        let err = store.commit_plan(&second, &updated).unwrap_err();
        assert!(matches!(err, PlanError::VersionConflict { .. }));
        assert_eq!(store.load_plan(plan.id).unwrap().version, 1);
    }

    #[test]
    fn test_other_handle_writes_are_seen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        let user = Uuid::new_v4();
        let inventory = Inventory::new(user, "Shared");

        let first = DocumentStore::open(&path).unwrap();
        first.insert_inventory(inventory.clone()).unwrap();
        let second = DocumentStore::open(&path).unwrap();

        let loaded = second.load_inventory(inventory.id).unwrap();
        first.save_inventory(&first.load_inventory(inventory.id).unwrap()).unwrap();

        // `second` still caches version 0, but the write checks the file.
        assert!(matches!(
            second.save_inventory(&loaded),
            Err(PlanError::VersionConflict {
                expected: 0,
                found: 1,
                ..
            })
        ));
        second.insert_meal(Meal::new(user, "Dal")).unwrap();
        assert_eq!(second.load_inventory(inventory.id).unwrap().version, 1);

        let reopened = DocumentStore::open(&path).unwrap();
        assert_eq!(reopened.load_inventory(inventory.id).unwrap().version, 1);
        assert_eq!(reopened.meals_for_user(user).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_flush_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::open(dir.path().join("missing").join("db.json")).unwrap();

        let err = store
            .insert_inventory(Inventory::new(Uuid::new_v4(), "Nowhere"))
            .unwrap_err();
        assert!(matches!(err, PlanError::Io(_)));
        assert_eq!(store.snapshot(), Database::default());
    }

    #[test]
    fn test_failed_write_leaves_store_untouched() {
        let (store, inventory) = seeded();
        let before = store.snapshot();

        let mut stale = store.load_inventory(inventory.id).unwrap();
        stale.version = 7;
        stale.name = "Renamed".to_string();
        assert!(store.save_inventory(&stale).is_err());
        assert_eq!(store.snapshot(), before);
    }
}
