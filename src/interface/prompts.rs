use dialoguer::{Confirm, Select};
use strsim::jaro_winkler;

use crate::error::Result;
use crate::models::Meal;
use crate::planner::constants::{FUZZY_MATCH_THRESHOLD, MAX_FUZZY_SUGGESTIONS};

/// Meals whose names resemble `input`, best match first.
pub fn fuzzy_candidates<'a>(meals: &[&'a Meal], input: &str) -> Vec<(&'a Meal, f64)> {
    let needle = input.trim().to_lowercase();
    let mut candidates: Vec<(&Meal, f64)> = meals
        .iter()
        .map(|m| (*m, jaro_winkler(&m.key(), &needle)))
        .filter(|(_, score)| *score > FUZZY_MATCH_THRESHOLD)
        .collect();

    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    candidates
}

/// Resolve a typed meal name, asking the user when it is not an exact match.
///
/// Returns `None` if nothing matches or the user declines every suggestion.
pub fn resolve_meal<'a>(meals: &[&'a Meal], input: &str) -> Result<Option<&'a Meal>> {
    let needle = input.trim().to_lowercase();

    // Try exact match first (case-insensitive)
    if let Some(meal) = meals.iter().find(|m| m.key() == needle) {
        return Ok(Some(*meal));
    }

    let candidates = fuzzy_candidates(meals, input);
    match candidates.as_slice() {
        [] => {
            println!("No matching meal found for '{}'", input.trim());
            Ok(None)
        }
        [(meal, _)] => {
            let confirm = prompt_yes_no(&format!("Did you mean '{}'?", meal.name), true)?;
            Ok(confirm.then_some(*meal))
        }
        many => {
            let options: Vec<&Meal> = many
                .iter()
                .take(MAX_FUZZY_SUGGESTIONS)
                .map(|(m, _)| *m)
                .collect();

            let mut labels: Vec<String> = options.iter().map(|m| m.name.clone()).collect();
            labels.push("None of these".to_string());

            let selection = Select::new()
                .with_prompt("Which did you mean?")
                .items(&labels)
                .default(0)
                .interact()?;

            Ok(options.get(selection).copied())
        }
    }
}

/// Prompt for yes/no confirmation.
pub fn prompt_yes_no(prompt: &str, default: bool) -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_fuzzy_candidates_ranked() {
        let user = Uuid::new_v4();
        let lasagna = Meal::new(user, "Lasagna");
        let lasagne = Meal::new(user, "Vegetable Lasagne");
        let pho = Meal::new(user, "Pho");
        let meals = vec![&pho, &lasagne, &lasagna];

        let found = fuzzy_candidates(&meals, "lasagana");
        assert!(!found.is_empty());
        assert_eq!(found[0].0.name, "Lasagna");
        assert!(found.iter().all(|(m, _)| m.name != "Pho"));
    }

    #[test]
    fn test_exact_match_skips_prompt() {
        let user = Uuid::new_v4();
        let pho = Meal::new(user, "Pho");
        let meals = vec![&pho];

        let found = resolve_meal(&meals, "  PHO ").unwrap();
        assert_eq!(found.map(|m| m.id), Some(pho.id));
    }

    #[test]
    fn test_no_match() {
        let user = Uuid::new_v4();
        let pho = Meal::new(user, "Pho");
        let meals = vec![&pho];

        assert!(resolve_meal(&meals, "enchiladas").unwrap().is_none());
    }
}
