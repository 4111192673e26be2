use crate::models::{Constraint, Meal, MealId};
use crate::state::MealCatalog;

/// Meals in the constraint's lookback window that fall under it.
///
/// The window is the last `shortterm_adj` slots of `recent` (oldest first).
/// Meals unknown to the catalog are not counted.
pub fn recent_occurrences(constraint: &Constraint, catalog: &MealCatalog, recent: &[MealId]) -> usize {
    let window = constraint.shortterm_adj as usize;
    let start = recent.len().saturating_sub(window);

    recent[start..]
        .iter()
        .filter_map(|id| catalog.get(*id))
        .filter(|meal| constraint.applies_to(meal))
        .count()
}

/// Whether selecting `meal` next keeps the window's count below the cap.
///
/// A pick that would bring the count to `max_occurrence` is rejected, so a
/// cap of 1 bars every matching meal.
pub fn permits(constraint: &Constraint, meal: &Meal, catalog: &MealCatalog, recent: &[MealId]) -> bool {
    if !constraint.applies_to(meal) {
        return true;
    }
    recent_occurrences(constraint, catalog, recent) + 1 < constraint.max_occurrence as usize
}

/// First constraint in `in_force` that `meal` would violate.
pub fn first_violation<'c>(
    in_force: &[&'c Constraint],
    meal: &Meal,
    catalog: &MealCatalog,
    recent: &[MealId],
) -> Option<&'c Constraint> {
    in_force
        .iter()
        .copied()
        .find(|c| !permits(c, meal, catalog, recent))
}
