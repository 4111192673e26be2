use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::config::PlannerConfig;
use crate::error::{PlanError, Result};
use crate::models::{Constraint, ConstraintId, Inventory, InventoryEntry, MealId};
use crate::planner::constraints::first_violation;
use crate::rotation::RotationEngine;
use crate::state::MealCatalog;

/// Meals chosen for a plan, one per slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOutcome {
    pub meals: Vec<MealId>,
    /// Constraints dropped for at least one slot, in the order they were dropped.
    pub relaxed: Vec<ConstraintId>,
}

/// Eligible entry with its position in the inventory.
#[derive(Debug)]
struct Candidate<'a> {
    entry: &'a InventoryEntry,
    position: usize,
}

/// Order candidates least recently used first, then by inventory position.
fn rank_candidates<'a>(pool: &'a [InventoryEntry]) -> Vec<Candidate<'a>> {
    let mut candidates: Vec<Candidate<'a>> = pool
        .iter()
        .enumerate()
        .map(|(position, entry)| Candidate { entry, position })
        .collect();

    candidates.sort_by(|a, b| {
        a.entry
            .next_use_date
            .cmp(&b.entry.next_use_date)
            .then(a.position.cmp(&b.position))
    });
    candidates
}

/// Pick the best candidate that satisfies every constraint in `in_force`.
fn pick_permitted(
    candidates: &[Candidate<'_>],
    in_force: &[&Constraint],
    catalog: &MealCatalog,
    recent: &[MealId],
) -> Result<Option<MealId>> {
    for candidate in candidates {
        let meal = catalog.require(candidate.entry.meal)?;
        match first_violation(in_force, meal, catalog, recent) {
            None => return Ok(Some(meal.id)),
            Some(c) => debug!(meal = %meal.name, constraint = %c.name, "candidate blocked"),
        }
    }
    Ok(None)
}

/// Eligible meals that pass every constraint against `past` on their own.
fn count_satisfying(
    eligible: &[InventoryEntry],
    constraints: &[&Constraint],
    catalog: &MealCatalog,
    past: &[MealId],
) -> Result<usize> {
    let mut count = 0;
    for entry in eligible {
        let meal = catalog.require(entry.meal)?;
        if first_violation(constraints, meal, catalog, past).is_none() {
            count += 1;
        }
    }
    Ok(count)
}

/// Fill `size` slots from the inventory, consuming each pick as it is made.
///
/// Each meal appears at most once. Constraints are checked against
/// `history` (oldest cycle first) followed by the slots already filled.
/// Constraint priority is declaration order: when a slot cannot be filled,
/// the last remaining constraint is dropped for that slot until a candidate
/// passes, unless relaxation is disabled in `config`.
///
/// On error the inventory may be partially consumed; callers must discard it.
pub fn build_plan(
    inventory: &mut Inventory,
    catalog: &MealCatalog,
    constraints: &[Constraint],
    size: usize,
    history: &[Vec<MealId>],
    now: DateTime<Utc>,
    config: &PlannerConfig,
) -> Result<PlanOutcome> {
    let engine = RotationEngine::new(catalog);

    let eligible = engine.compute_eligible_set(inventory, now)?;
    if eligible.len() < size {
        return Err(PlanError::InsufficientEligibleMeals {
            inventory: inventory.id,
            requested: size,
            available: eligible.len(),
        });
    }

    let active: Vec<&Constraint> = constraints.iter().filter(|c| c.active).collect();
    let past: Vec<MealId> = history.iter().flatten().copied().collect();
    let mut recent = past.clone();
    let mut chosen: Vec<MealId> = Vec::with_capacity(size);
    let mut relaxed: Vec<ConstraintId> = Vec::new();

    for slot in 0..size {
        let pool: Vec<InventoryEntry> = engine
            .compute_eligible_set(inventory, now)?
            .into_iter()
            .filter(|e| !chosen.contains(&e.meal))
            .collect();
        let candidates = rank_candidates(&pool);

        let mut in_force = active.clone();
        let pick = loop {
            if let Some(meal) = pick_permitted(&candidates, &in_force, catalog, &recent)? {
                break meal;
            }

            let dropped = match in_force.pop() {
                Some(c) if config.allow_relaxation => c,
                _ => {
                    return Err(PlanError::InsufficientEligibleMeals {
                        inventory: inventory.id,
                        requested: size,
                        available: count_satisfying(&eligible, &active, catalog, &past)?,
                    });
                }
            };
            warn!(
                inventory = %inventory.id,
                slot,
                constraint = %dropped.name,
                "relaxing constraint to fill slot"
            );
            if !relaxed.contains(&dropped.id) {
                relaxed.push(dropped.id);
            }
        };

        engine.consume(inventory, pick, now)?;
        chosen.push(pick);
        recent.push(pick);
        debug!(slot, meal = %catalog.name_of(pick), "slot filled");
    }

    Ok(PlanOutcome {
        meals: chosen,
        relaxed,
    })
}
