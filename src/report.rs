use itertools::Itertools;

use crate::catalog::FoodCatalog;
use crate::consts::CALORIES_NUTRIENT_ID;
use crate::diet::Diet;
use crate::evolution::diet_evolution::FirstSeen;
use crate::evolution::objective::ScoreComponent;
use crate::nutrients::NutrientTargets;

/// Human readable dump of a diet: score, nutrient coverage and the foods in it.
pub fn render_diet(diet: &Diet, catalog: &FoodCatalog, targets: &NutrientTargets) -> Vec<String> {
    let mut lines = Vec::with_capacity(targets.len() + diet.food_count() + 2);

    let components = ScoreComponent::ALL
        .iter()
        .zip(diet.components.iter())
        .map(|(component, value)| format!("{}={:.4}", component.label(), value))
        .join(", ");
    lines.push(format!(
        "Solution with score {:12.4} ({})",
        diet.score, components
    ));

    for (spec, amount) in targets.iter().zip(diet.nutrition.iter()) {
        lines.push(format!(
            "  NUTR {:<15}: {:8.2} {:<5}, {:8.2}% of RDA {:8.2} (UL {:8.2})",
            spec.name,
            amount,
            spec.unit,
            amount / spec.rda * 100.0,
            spec.rda,
            spec.ul
        ));
    }

    let mut total_calories = 0.0;
    for (index, amount) in diet.foods() {
        let Some(food) = catalog.get(index) else {
            continue;
        };
        let calories = match food.nutrient(CALORIES_NUTRIENT_ID) {
            Some(per_unit) => {
                let calories = per_unit * amount;
                total_calories += calories;
                format!("{:8.2}", calories)
            }
            None => "?".repeat(8),
        };
        lines.push(format!(
            "  FOOD {:8.2} units ({} cals) of {} (grp {})",
            amount, calories, food.name, food.group
        ));
    }
    lines.push(format!("Total Calories: {:8.2}", total_calories));
    lines
}

/// Results-file block for a diet reaching the top ranks for the first time.
pub fn render_first_seen(
    first_seen: &FirstSeen,
    catalog: &FoodCatalog,
    targets: &NutrientTargets,
) -> Vec<String> {
    let mut lines = vec![format!("First Seen Generation {}", first_seen.generation)];
    lines.extend(render_diet(&first_seen.diet, catalog, targets));
    lines.push("=".repeat(78));
    lines
}
