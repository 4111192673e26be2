use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Constraint, Ingredient, Inventory, Meal, MealPlan, PlanTemplate};

/// Every collection the planner persists, as one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub meals: Vec<Meal>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub inventories: Vec<Inventory>,
    #[serde(default)]
    pub meal_plans: Vec<MealPlan>,
    #[serde(default)]
    pub plan_templates: Vec<PlanTemplate>,
}

impl Database {
    /// Drop repeated ids in every collection (last occurrence wins, first
    /// position kept).
    pub fn dedup(&mut self) {
        dedup_by_id(&mut self.ingredients, |i| i.id);
        dedup_by_id(&mut self.meals, |m| m.id);
        dedup_by_id(&mut self.constraints, |c| c.id);
        dedup_by_id(&mut self.inventories, |i| i.id);
        dedup_by_id(&mut self.meal_plans, |p| p.id);
        dedup_by_id(&mut self.plan_templates, |t| t.id);
    }
}

fn dedup_by_id<T>(items: &mut Vec<T>, id: impl Fn(&T) -> Uuid) {
    let mut seen: HashMap<Uuid, usize> = HashMap::new();
    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    for item in items.drain(..) {
        match seen.get(&id(&item)) {
            Some(&idx) => kept[idx] = item,
            None => {
                seen.insert(id(&item), kept.len());
                kept.push(item);
            }
        }
    }
    *items = kept;
}

/// Load the database from a JSON file.
///
/// Deduplicates each collection by id.
pub fn load_database<P: AsRef<Path>>(path: P) -> Result<Database> {
    let content = fs::read_to_string(path)?;
    let mut db: Database = serde_json::from_str(&content)?;
    db.dedup();
    Ok(db)
}

/// Save the database to a JSON file.
///
/// Writes a sibling temp file and renames it over `path`, so readers never
/// see a half-written document.
pub fn save_database<P: AsRef<Path>>(path: P, db: &Database) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, db)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Exclusive advisory lock on `<database>.lock`, held until dropped.
///
/// Serializes writers across processes sharing one database file.
pub(crate) struct FileLock {
    file: File,
}

impl FileLock {
    pub(crate) fn acquire(db_path: &Path) -> Result<Self> {
        let mut name = db_path.as_os_str().to_owned();
        name.push(".lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(PathBuf::from(name))?;
        file.lock()?;
        Ok(Self { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_and_save_roundtrip() {
        let user = Uuid::new_v4();
        let meal = Meal::new(user, "Shakshuka");
        let db = Database {
            meals: vec![meal.clone()],
            inventories: vec![Inventory::new(user, "Brunch")],
            ..Default::default()
        };

        let file = NamedTempFile::new().unwrap();
        save_database(file.path(), &db).unwrap();

        let reloaded = load_database(file.path()).unwrap();
        assert_eq!(reloaded, db);
        assert_eq!(reloaded.meals[0].name, "Shakshuka");
    }

    #[test]
    fn test_deduplication() {
        let user = Uuid::new_v4();
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{"meals": [
                {{"id": "{id}", "user": "{user}", "name": "Chili", "maxOccurance": 1}},
                {{"id": "{other}", "user": "{user}", "name": "Stew"}},
                {{"id": "{id}", "user": "{user}", "name": "Chili", "maxOccurance": 4}}
            ]}}"#,
            other = Uuid::new_v4()
        );

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let db = load_database(file.path()).unwrap();
        assert_eq!(db.meals.len(), 2);
        // Last occurrence wins, first position kept
        assert_eq!(db.meals[0].id, id);
        assert_eq!(db.meals[0].max_occurrence, 4);
        assert!(db.inventories.is_empty());
    }
}
