use std::io::{self, Read};

use rand::rngs::StdRng;
use rand::SeedableRng;
use refiner_bandits::{reward, select_action, snapshot, update, LearningParams};
use refiner_core::{Category, PolicyTable, Rating, MAX_RATING, MIN_RATING};
use serde_json::json;

/// Reads `{"category": "...", "baseline": n, "actual": n}` from stdin, picks an
/// action, applies one update and prints the decision with the resulting table.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    let v: serde_json::Value = if input.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(&input)?
    };

    let category = v
        .get("category")
        .and_then(|c| c.as_str())
        .and_then(Category::from_label)
        .unwrap_or(Category::Average);
    let baseline = v
        .get("baseline")
        .and_then(serde_json::Value::as_i64)
        .map_or(5, |b| b.clamp(i64::from(MIN_RATING), i64::from(MAX_RATING)));
    let baseline = i32::try_from(baseline)?;
    let actual: Rating = v
        .get("actual")
        .and_then(serde_json::Value::as_i64)
        .and_then(|a| i32::try_from(a).ok())
        .into();

    let params = LearningParams::default();
    let mut rng = StdRng::seed_from_u64(0);
    let mut table = PolicyTable::new();

    let action = select_action(&mut table, category, params.exploration_rate, &mut rng);
    let refined = action.apply(baseline);
    let r = reward(refined, actual);
    let value = update(&mut table, category, action, r, category, &params);

    let record = json!({
        "category": category,
        "action": action,
        "refined_rating": refined,
        "reward": r,
        "value": value,
        "q_table": snapshot(&table),
    });
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
