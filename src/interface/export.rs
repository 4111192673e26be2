use std::path::Path;

use crate::error::Result;
use crate::models::MealPlan;
use crate::state::MealCatalog;

/// Write a plan's slots to a CSV file, one row per meal.
pub fn write_plan_csv(plan: &MealPlan, catalog: &MealCatalog, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["slot", "meal_id", "meal", "plan", "start_date", "end_date"])?;

    for (i, meal) in plan.current.iter().enumerate() {
        wtr.write_record([
            (i + 1).to_string(),
            meal.to_string(),
            catalog.name_of(*meal),
            plan.name.clone(),
            plan.start_date.to_string(),
            plan.end_date.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
