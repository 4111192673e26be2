use chrono::{DateTime, Utc};

use crate::models::{Constraint, Inventory, InventoryEntry, MealPlan};
use crate::rotation::EntryState;
use crate::state::MealCatalog;

const DATE_FMT: &str = "%Y-%m-%d %H:%M";

/// Display a meal plan as a numbered list.
pub fn display_meal_plan(plan: &MealPlan, catalog: &MealCatalog, constraints: &[Constraint]) {
    if plan.current.is_empty() {
        println!("No meals selected.");
        return;
    }

    println!();
    println!(
        "=== {} ({} to {}) ===",
        plan.name, plan.start_date, plan.end_date
    );
    println!();

    for (i, meal) in plan.current.iter().enumerate() {
        println!("{:>3}. {}", i + 1, catalog.name_of(*meal));
    }

    if !plan.relaxed.is_empty() {
        let names: Vec<String> = plan
            .relaxed
            .iter()
            .map(|id| {
                constraints
                    .iter()
                    .find(|c| c.id == *id)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| id.to_string())
            })
            .collect();
        println!();
        println!("Relaxed constraints: {}", names.join(", "));
    }

    println!();
    println!("--- Summary ---");
    println!("Slots filled: {}/{}", plan.current.len(), plan.size);
    if !plan.history.is_empty() {
        println!("Previous cycles: {}", plan.history.len());
    }
    println!();
}

/// Display the rotation state of every entry in an inventory.
pub fn display_inventory_status(
    inventory: &Inventory,
    statuses: &[(InventoryEntry, EntryState)],
    catalog: &MealCatalog,
    now: DateTime<Utc>,
) {
    if statuses.is_empty() {
        println!("{}: (no meals)", inventory.name);
        return;
    }

    let names: Vec<String> = statuses
        .iter()
        .map(|(e, _)| catalog.name_of(e.meal))
        .collect();
    let max_name_len = names.iter().map(|n| n.len()).max().unwrap_or(10);

    println!();
    println!(
        "=== {} ({} meals, as of {}) ===",
        inventory.name,
        statuses.len(),
        now.format(DATE_FMT)
    );
    println!();

    for ((entry, state), name) in statuses.iter().zip(&names) {
        let cooling = if *state == EntryState::Cooling {
            format!("  until {}", entry.next_use_date.format(DATE_FMT))
        } else {
            String::new()
        };
        println!(
            "  {:<width$}  {:<9}  {:>2} left  reset {}{}",
            name,
            state,
            entry.remaining_uses,
            entry.next_reset_date.format(DATE_FMT),
            cooling,
            width = max_name_len
        );
    }

    let available = statuses
        .iter()
        .filter(|(_, s)| *s == EntryState::Available)
        .count();
    println!();
    println!("{} of {} meals available now", available, statuses.len());
    println!();
}
