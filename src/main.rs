use chrono::{DateTime, Utc};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use meal_rotation::cli::{Cli, Command};
use meal_rotation::config::PlannerConfig;
use meal_rotation::error::{PlanError, Result};
use meal_rotation::interface::{
    display_inventory_status, display_meal_plan, prompt_yes_no, resolve_meal, write_plan_csv,
};
use meal_rotation::models::{Constraint, InventoryId, MealPlanId, UserId};
use meal_rotation::planner::{PlanRequest, PlanService, DEFAULT_PLAN_SIZE};
use meal_rotation::rotation::RotationEngine;
use meal_rotation::state::{DocumentStore, MealCatalog, PlanStore};

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("meal_rotation={},info", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let store = DocumentStore::open(&cli.file)?;
    let config = cli.planner_config();
    let user = cli.user;
    let now = Utc::now();

    match cli.command {
        Command::Plan {
            inventory,
            constraints,
            template,
            size,
            start,
            end,
            name,
            yes,
        } => {
            let name = name.unwrap_or_else(|| format!("Plan {start}"));
            let service = PlanService::new(&store, config);
            let request = match template {
                Some(t) => service.request_from_template(t, inventory, start, end, name, user)?,
                None => PlanRequest::new(
                    name,
                    inventory,
                    constraints,
                    size.unwrap_or(DEFAULT_PLAN_SIZE),
                    start,
                    end,
                ),
            };
            cmd_plan(&store, &service, &request, user, now, yes)
        }
        Command::Advance { plan } => cmd_advance(&store, config, plan, user, now),
        Command::Status { inventory } => cmd_status(&store, inventory, user, now),
        Command::AddMeal { inventory, meal } => cmd_add_meal(&store, inventory, &meal, user, now),
        Command::Export { plan, out } => cmd_export(&store, plan, &out, user),
    }
}

/// Preview a plan, then commit it once confirmed.
fn cmd_plan(
    store: &DocumentStore,
    service: &PlanService<'_, DocumentStore>,
    request: &PlanRequest,
    user: UserId,
    now: DateTime<Utc>,
    yes: bool,
) -> Result<()> {
    let preview = service.preview_plan(request, user, now)?;
    let catalog = plan_catalog(store, &preview.current)?;
    let constraints = load_constraints(store, &request.constraints)?;
    display_meal_plan(&preview, &catalog, &constraints);

    if !yes && !prompt_yes_no("Save this plan?", true)? {
        println!("Plan discarded.");
        return Ok(());
    }

    // Generation reruns against the stored state, which may have moved on
    let plan = service.generate_plan(request, user, now)?;
    if plan.current != preview.current {
        println!("Inventory changed while confirming; saved plan differs:");
        display_meal_plan(&plan, &plan_catalog(store, &plan.current)?, &constraints);
    }
    println!("Saved plan {}", plan.id);
    Ok(())
}

fn cmd_advance(
    store: &DocumentStore,
    config: PlannerConfig,
    plan: MealPlanId,
    user: UserId,
    now: DateTime<Utc>,
) -> Result<()> {
    let service = PlanService::new(store, config);
    let plan = service.advance_plan(plan, user, now)?;

    let catalog = plan_catalog(store, &plan.current)?;
    let constraints = load_constraints(store, &plan.constraints)?;
    display_meal_plan(&plan, &catalog, &constraints);
    Ok(())
}

/// Show each entry's state. Due resets are displayed but not written back.
fn cmd_status(
    store: &DocumentStore,
    inventory: InventoryId,
    user: UserId,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut inventory = store.load_inventory(inventory)?;
    if inventory.user != user {
        return Err(PlanError::Forbidden {
            user,
            resource: format!("inventory {}", inventory.id),
        });
    }

    let catalog = plan_catalog(store, &inventory.meal_ids())?;
    let statuses = RotationEngine::new(&catalog).entry_statuses(&mut inventory, now)?;
    display_inventory_status(&inventory, &statuses, &catalog, now);
    Ok(())
}

/// Add a meal to an inventory by (possibly misspelled) name.
fn cmd_add_meal(
    store: &DocumentStore,
    inventory: InventoryId,
    input: &str,
    user: UserId,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut inventory = store.load_inventory(inventory)?;
    if inventory.user != user {
        return Err(PlanError::Forbidden {
            user,
            resource: format!("inventory {}", inventory.id),
        });
    }

    let catalog = MealCatalog::new(store.meals_for_user(user)?);
    let choices = catalog.active_for(user);
    let Some(meal) = resolve_meal(&choices, input)? else {
        return Ok(());
    };

    inventory.add_meal(meal, now)?;
    let version = store.put_inventory(&inventory)?;
    println!(
        "Added '{}' to {} (version {})",
        meal.name, inventory.name, version
    );
    Ok(())
}

fn cmd_export(
    store: &DocumentStore,
    plan: MealPlanId,
    out: &std::path::Path,
    user: UserId,
) -> Result<()> {
    let plan = store.load_plan(plan)?;
    if plan.user != user {
        return Err(PlanError::Forbidden {
            user,
            resource: format!("meal plan {}", plan.id),
        });
    }

    let catalog = plan_catalog(store, &plan.current)?;
    write_plan_csv(&plan, &catalog, out)?;
    println!("Wrote {} meals to {}", plan.current.len(), out.display());
    Ok(())
}

/// Catalog of the given meals; deleted meals are left out.
fn plan_catalog(store: &DocumentStore, ids: &[Uuid]) -> Result<MealCatalog> {
    let mut meals = Vec::with_capacity(ids.len());
    for &id in ids {
        match store.load_meal(id) {
            Ok(meal) => meals.push(meal),
            Err(PlanError::MealNotFound(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(MealCatalog::new(meals))
}

fn load_constraints(store: &DocumentStore, ids: &[Uuid]) -> Result<Vec<Constraint>> {
    ids.iter().map(|&id| store.load_constraint(id)).collect()
}
