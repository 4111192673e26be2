use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PlannerConfig;
use crate::error::{PlanError, Result};
use crate::models::{
    Constraint, ConstraintId, Inventory, InventoryId, MealId, MealPlan, MealPlanId, PlanTemplate,
    PlanTemplateId, UserId,
};
use crate::planner::assembly::{build_plan, PlanOutcome};
use crate::state::{MealCatalog, PlanStore};

/// Parameters of a plan-generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    pub name: String,
    pub inventory: InventoryId,
    /// Declaration order is priority order, highest first.
    pub constraints: Vec<ConstraintId>,
    pub size: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl PlanRequest {
    pub fn new(
        name: impl Into<String>,
        inventory: InventoryId,
        constraints: Vec<ConstraintId>,
        size: usize,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            inventory,
            constraints,
            size,
            start_date,
            end_date,
        }
    }

    /// Request using a template's size and constraints.
    pub fn from_template(
        template: &PlanTemplate,
        inventory: InventoryId,
        start_date: NaiveDate,
        end_date: NaiveDate,
        name: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            inventory,
            template.constraints.clone(),
            template.size,
            start_date,
            end_date,
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(PlanError::InvalidInput(
                "plan size must be at least 1".to_string(),
            ));
        }
        if self.end_date < self.start_date {
            return Err(PlanError::InvalidInput(format!(
                "end date {} is before start date {}",
                self.end_date, self.start_date
            )));
        }
        Ok(())
    }
}

fn ensure_owner(acting_user: UserId, owner: UserId, resource: impl FnOnce() -> String) -> Result<()> {
    if acting_user != owner {
        return Err(PlanError::Forbidden {
            user: acting_user,
            resource: resource(),
        });
    }
    Ok(())
}

/// Generates and advances meal plans against a [`PlanStore`].
///
/// Every attempt loads a fresh inventory, builds the plan in memory and
/// saves the inventory with a version check. A version conflict restarts
/// the attempt, up to [`PlannerConfig::max_save_attempts`] times.
pub struct PlanService<'s, S: PlanStore + ?Sized> {
    store: &'s S,
    config: PlannerConfig,
}

impl<'s, S: PlanStore + ?Sized> PlanService<'s, S> {
    pub fn new(store: &'s S, config: PlannerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Load a template the acting user owns and turn it into a request.
    pub fn request_from_template(
        &self,
        template: PlanTemplateId,
        inventory: InventoryId,
        start_date: NaiveDate,
        end_date: NaiveDate,
        name: impl Into<String>,
        acting_user: UserId,
    ) -> Result<PlanRequest> {
        let template = self.store.load_template(template)?;
        ensure_owner(acting_user, template.user, || format!("plan template {}", template.id))?;
        if !template.active {
            return Err(PlanError::InvalidInput(format!(
                "plan template {} is inactive",
                template.name
            )));
        }
        Ok(PlanRequest::from_template(
            &template, inventory, start_date, end_date, name,
        ))
    }

    /// Generate a plan and commit it together with the consumed inventory.
    pub fn generate_plan(
        &self,
        request: &PlanRequest,
        acting_user: UserId,
        now: DateTime<Utc>,
    ) -> Result<MealPlan> {
        request.validate()?;
        let id = Uuid::new_v4();
        let plan = self.with_retry(|| {
            let (inventory, outcome) = self.attempt(request, &[], acting_user, now)?;
            let plan = new_plan(id, request, acting_user, outcome);
            self.store.commit_plan(&inventory, &plan)
        })?;

        info!(
            plan = %plan.id,
            inventory = %plan.inventory,
            size = plan.size,
            relaxed = plan.relaxed.len(),
            "meal plan generated"
        );
        Ok(plan)
    }

    /// Build the plan `generate_plan` would produce without saving anything.
    pub fn preview_plan(
        &self,
        request: &PlanRequest,
        acting_user: UserId,
        now: DateTime<Utc>,
    ) -> Result<MealPlan> {
        request.validate()?;
        let (_, outcome) = self.attempt(request, &[], acting_user, now)?;
        Ok(new_plan(Uuid::nil(), request, acting_user, outcome))
    }

    /// Move a plan to its next window: archive `current` into `history` and
    /// fill a new `current` with history feeding the constraint lookback.
    ///
    /// Each attempt reloads the plan, so a concurrent advance is built on
    /// rather than overwritten.
    pub fn advance_plan(
        &self,
        id: MealPlanId,
        acting_user: UserId,
        now: DateTime<Utc>,
    ) -> Result<MealPlan> {
        let plan = self.with_retry(|| {
            let mut plan = self.store.load_plan(id)?;
            ensure_owner(acting_user, plan.user, || format!("meal plan {}", plan.id))?;
            if !plan.active {
                return Err(PlanError::InvalidInput(format!(
                    "meal plan {} is inactive",
                    plan.name
                )));
            }

            plan.rotate_window();
            let request = PlanRequest::new(
                plan.name.clone(),
                plan.inventory,
                plan.constraints.clone(),
                plan.size,
                plan.start_date,
                plan.end_date,
            );
            request.validate()?;

            let (inventory, outcome) = self.attempt(&request, &plan.history, acting_user, now)?;
            plan.current = outcome.meals;
            plan.relaxed = outcome.relaxed;
            self.store.commit_plan(&inventory, &plan)
        })?;

        info!(
            plan = %plan.id,
            cycle = plan.history.len() + 1,
            start = %plan.start_date,
            "meal plan advanced"
        );
        Ok(plan)
    }

    fn with_retry<T>(&self, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let attempts = self.config.attempts();
        let mut attempt = 1;
        loop {
            match op() {
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(attempt, attempts, error = %e, "retrying plan generation");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// One load and build pass. The consumed inventory is returned unsaved.
    fn attempt(
        &self,
        request: &PlanRequest,
        history: &[Vec<MealId>],
        acting_user: UserId,
        now: DateTime<Utc>,
    ) -> Result<(Inventory, PlanOutcome)> {
        let mut inventory = self.store.load_inventory(request.inventory)?;
        ensure_owner(acting_user, inventory.user, || format!("inventory {}", inventory.id))?;
        if !inventory.active {
            return Err(PlanError::InactiveInventory(inventory.id));
        }

        let constraints = self.load_constraints(&request.constraints, acting_user)?;
        let catalog = self.load_catalog(&inventory, history)?;

        let outcome = build_plan(
            &mut inventory,
            &catalog,
            &constraints,
            request.size,
            history,
            now,
            &self.config,
        )?;
        Ok((inventory, outcome))
    }

    /// Load constraints in declaration order, skipping repeated ids.
    fn load_constraints(&self, ids: &[ConstraintId], acting_user: UserId) -> Result<Vec<Constraint>> {
        let mut constraints: Vec<Constraint> = Vec::with_capacity(ids.len());
        for &id in ids {
            if constraints.iter().any(|c| c.id == id) {
                continue;
            }
            let constraint = self.store.load_constraint(id)?;
            ensure_owner(acting_user, constraint.user, || format!("constraint {id}"))?;
            constraints.push(constraint);
        }
        Ok(constraints)
    }

    /// Meals the inventory tracks plus whatever history still resolves.
    fn load_catalog(&self, inventory: &Inventory, history: &[Vec<MealId>]) -> Result<MealCatalog> {
        let mut meals = Vec::with_capacity(inventory.len());
        for id in inventory.meal_ids() {
            meals.push(self.store.load_meal(id)?);
        }

        for &id in history.iter().flatten() {
            if inventory.contains(id) || meals.iter().any(|m| m.id == id) {
                continue;
            }
            match self.store.load_meal(id) {
                Ok(meal) => meals.push(meal),
                Err(PlanError::MealNotFound(_)) => {
                    debug!(meal = %id, "history meal no longer exists; not counted");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(MealCatalog::new(meals))
    }
}

fn new_plan(id: MealPlanId, request: &PlanRequest, user: UserId, outcome: PlanOutcome) -> MealPlan {
    MealPlan {
        id,
        user,
        name: request.name.clone(),
        active: true,
        start_date: request.start_date,
        end_date: request.end_date,
        size: request.size,
        constraints: request.constraints.clone(),
        inventory: request.inventory,
        history: Vec::new(),
        current: outcome.meals,
        relaxed: outcome.relaxed,
        version: 0,
    }
}

/// Generate and commit a plan with the default configuration.
pub fn generate_plan<S: PlanStore + ?Sized>(
    store: &S,
    request: &PlanRequest,
    acting_user: UserId,
    now: DateTime<Utc>,
) -> Result<MealPlan> {
    PlanService::new(store, PlannerConfig::default()).generate_plan(request, acting_user, now)
}
