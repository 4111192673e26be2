use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{PlanError, Result};
use crate::models::{Inventory, InventoryEntry, MealId, RotationRules};
use crate::rotation::availability::is_eligible;
use crate::rotation::entry::{self, EntryState};
use crate::state::MealCatalog;

/// Applies resets, eligibility and consumption across an inventory.
///
/// Works on an in-memory inventory only; persisting the result is the
/// caller's job.
pub struct RotationEngine<'a> {
    catalog: &'a MealCatalog,
}

impl<'a> RotationEngine<'a> {
    pub fn new(catalog: &'a MealCatalog) -> Self {
        Self { catalog }
    }

    fn rules_for(&self, entry: &InventoryEntry) -> Result<RotationRules> {
        let meal = self.catalog.require(entry.meal)?;
        Ok(entry.effective_rules(meal))
    }

    /// Bring one entry up to date: apply a due reset and cap the allowance.
    fn refresh_entry(&self, entry: &mut InventoryEntry, now: DateTime<Utc>) -> Result<()> {
        let rules = self.rules_for(entry)?;
        entry::reset_if_due(entry, &rules, now)?;
        entry::clamp_allowance(entry, &rules);
        Ok(())
    }

    /// Apply due resets to every entry.
    pub fn refresh(&self, inventory: &mut Inventory, now: DateTime<Utc>) -> Result<()> {
        for e in inventory.contents.iter_mut() {
            self.refresh_entry(e, now)?;
        }
        Ok(())
    }

    /// Entries selectable at `now`, in inventory order.
    ///
    /// Applies due resets first. Entries of inactive meals are left out.
    pub fn compute_eligible_set(
        &self,
        inventory: &mut Inventory,
        now: DateTime<Utc>,
    ) -> Result<Vec<InventoryEntry>> {
        self.refresh(inventory, now)?;

        let mut eligible = Vec::new();
        for e in &inventory.contents {
            let active = self.catalog.require(e.meal)?.active;
            if active && is_eligible(e, now) {
                eligible.push(e.clone());
            }
        }

        debug!(
            inventory = %inventory.id,
            entries = inventory.len(),
            eligible = eligible.len(),
            "computed eligible set"
        );
        Ok(eligible)
    }

    /// Consume one use of `meal` and return the updated entry.
    pub fn consume(
        &self,
        inventory: &mut Inventory,
        meal: MealId,
        now: DateTime<Utc>,
    ) -> Result<InventoryEntry> {
        let inventory_id = inventory.id;
        let e = inventory
            .entry_mut(meal)
            .ok_or(PlanError::EntryNotFound {
                inventory: inventory_id,
                meal,
            })?;

        self.refresh_entry(e, now)?;
        let rules = self.rules_for(e)?;
        entry::consume(e, &rules, now)?;
        Ok(e.clone())
    }

    /// Post-reset state of every entry, in inventory order.
    pub fn entry_statuses(
        &self,
        inventory: &mut Inventory,
        now: DateTime<Utc>,
    ) -> Result<Vec<(InventoryEntry, EntryState)>> {
        self.refresh(inventory, now)?;
        Ok(inventory
            .contents
            .iter()
            .map(|e| (e.clone(), entry::state_of(e, now)))
            .collect())
    }
}
