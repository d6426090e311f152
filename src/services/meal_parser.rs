//! Meal plan response parser.
//!
//! Turns the free-form text a model returns for a meal plan request into a
//! list of [`Meal`]s. Two layouts are understood: markdown tables
//! (`| **Breakfast** | Oats, Eggs |`) and header/bullet lines
//! (`**Breakfast**` followed by `• Oats`). Anything else falls back to a
//! fixed default plan, so the result is never empty.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{Meal, NutritionTotals};

/// Maximum number of food items kept per meal.
pub const MAX_ITEMS_PER_MEAL: usize = 3;

/// Meal slots filled by the line layout, in output order.
const LINE_SLOTS: [&str; 3] = ["Breakfast", "Lunch", "Dinner"];

/// Table cells containing any of these are layout, not food.
const TABLE_NOISE: [&str; 3] = ["---", "Meal", "Food Type"];

static TABLE_ROW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\|.*\|").expect("valid regex"));
static TABLE_MEAL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\|\s*\*\*(.*?)\*\*\s*\|").expect("valid regex"));
static TABLE_FIRST_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\|\s*\*\*.*?\*\*\s*\|\s*(.*?)\s*\|").expect("valid regex"));
static TABLE_CELL_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<br>|,|\|").expect("valid regex"));
static ITEM_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<br>|,|•").expect("valid regex"));
static BOLD_HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid regex"));
static MEAL_WORD_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(Breakfast|Lunch|Dinner|Snack|Dessert)").expect("valid regex"));
static LEADING_BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[•-]\s*").expect("valid regex"));
static LEADING_ORDINAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+[.)]?\s*").expect("valid regex"));
static RULE_ONLY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-=*_]+$").expect("valid regex"));
static NUTRITION_TOTALS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Calories: ([0-9]+).*?Protein: ([0-9]+)g.*?Carbs: ([0-9]+)g.*?Fat: ([0-9]+)g").expect("valid regex")
});

/// Layout of a model response, decided once before parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Table,
    Lines,
}

/// Meals plus the whole-day totals they were derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMealPlan {
    pub meals: Vec<Meal>,
    pub total: NutritionTotals,
}

/// A table layout is assumed as soon as one line holds two pipes.
pub fn detect_format(text: &str) -> ResponseFormat {
    if text.lines().any(|line| TABLE_ROW.is_match(line)) {
        ResponseFormat::Table
    } else {
        ResponseFormat::Lines
    }
}

/// Parses a meal plan response. Never fails and never returns an empty list.
pub fn parse_meal_plan(text: &str) -> Vec<Meal> {
    parse_meal_plan_response(text).meals
}

pub fn parse_meal_plan_response(text: &str) -> ParsedMealPlan {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let format = detect_format(text);
    log::debug!("🍽️ Parsing meal plan response ({} lines) as {:?}", lines.len(), format);

    let mut meals = match format {
        ResponseFormat::Table => parse_table(&lines),
        ResponseFormat::Lines => parse_lines(&lines),
    };

    if meals.is_empty() {
        log::warn!("⚠️ No meals found in response, using default meal plan");
        meals = default_meals();
    }

    let total = extract_nutrition_totals(text);
    distribute_totals(&mut meals, total);

    ParsedMealPlan { meals, total }
}

/// Reads "Calories: N ... Protein: Ng ... Carbs: Ng ... Fat: Ng" from one line.
/// All four fields must be present in that order and fit in a `u32`,
/// otherwise every figure is 0. Only ASCII digits count.
pub fn extract_nutrition_totals(text: &str) -> NutritionTotals {
    let Some(caps) = NUTRITION_TOTALS.captures(text) else {
        return NutritionTotals::default();
    };

    let number = |i: usize| caps[i].parse::<u32>().ok();

    match (number(1), number(2), number(3), number(4)) {
        (Some(calories), Some(protein), Some(carbs), Some(fat)) => NutritionTotals {
            calories,
            protein,
            carbs,
            fat,
        },
        _ => {
            log::warn!("⚠️ Nutrition totals out of range, ignoring them");
            NutritionTotals::default()
        }
    }
}

/// Appends `candidates` to `existing`: trims, drops empty and table-noise
/// pieces, removes duplicates keeping the first occurrence, and keeps at most
/// [`MAX_ITEMS_PER_MEAL`] items. Applying it twice changes nothing.
pub fn normalize_items<I, S>(existing: &[String], candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut items: Vec<String> = Vec::with_capacity(MAX_ITEMS_PER_MEAL);

    let all = existing
        .iter()
        .map(|s| s.trim().to_string())
        .chain(candidates.into_iter().map(|s| s.as_ref().trim().to_string()));

    for item in all {
        if items.len() == MAX_ITEMS_PER_MEAL {
            break;
        }
        if item.is_empty() || is_table_noise(&item) || items.contains(&item) {
            continue;
        }
        items.push(item);
    }

    items
}

/// Plan used when nothing usable could be read from the response.
pub fn default_meals() -> Vec<Meal> {
    let meal = |name: &str, items: [&str; 3]| Meal::new(name, items.iter().map(|s| s.to_string()).collect());

    vec![
        meal("Breakfast", ["Oatmeal with berries", "Greek yogurt", "Green smoothie"]),
        meal("Lunch", ["Grilled chicken salad", "Quinoa", "Fruit"]),
        meal("Dinner", ["Baked salmon", "Steamed vegetables", "Mixed salad"]),
    ]
}

fn is_table_noise(item: &str) -> bool {
    TABLE_NOISE.iter().any(|noise| item.contains(noise))
}

fn parse_table(lines: &[&str]) -> Vec<Meal> {
    let mut meals = Vec::new();
    let mut current: Option<Meal> = None;

    for line in lines {
        if line.starts_with("|--") || line.starts_with("| Meal") || *line == "|" {
            continue;
        }

        if let Some(caps) = TABLE_MEAL_NAME.captures(line) {
            if let Some(previous) = current.take() {
                push_if_complete(&mut meals, previous);
            }

            let name = caps[1].trim().to_string();
            let mut items = Vec::new();

            if let Some(cell) = TABLE_FIRST_CELL.captures(line).and_then(|c| c.get(1)) {
                items = normalize_items(&items, TABLE_CELL_SEPARATORS.split(cell.as_str()));
            }

            current = Some(Meal::new(name, items));
        } else if let Some(meal) = current.as_mut() {
            let cells = line
                .split('|')
                .map(str::trim)
                .filter(|cell| !cell.is_empty() && *cell != "•" && !is_table_noise(cell));

            for cell in cells {
                meal.items = normalize_items(&meal.items, ITEM_SEPARATORS.split(cell));
                meal.description = meal.items.join(", ");
            }
        }
    }

    if let Some(last) = current {
        push_if_complete(&mut meals, last);
    }

    meals
}

fn push_if_complete(meals: &mut Vec<Meal>, meal: Meal) {
    if !meal.name.is_empty() && !meal.items.is_empty() {
        meals.push(meal);
    }
}

fn parse_lines(lines: &[&str]) -> Vec<Meal> {
    let mut slots: [Vec<String>; 3] = Default::default();
    let mut current: Option<usize> = None;

    for line in lines {
        if let Some(header) = header_text(line) {
            current = resolve_slot(header);
            if current.is_none() {
                log::debug!("Skipping items under unknown meal header '{}'", header);
            }
            continue;
        }

        let Some(index) = current else { continue };
        if slots[index].len() >= MAX_ITEMS_PER_MEAL {
            continue;
        }

        if let Some(item) = clean_item_line(line) {
            slots[index] = normalize_items(&slots[index], ITEM_SEPARATORS.split(&item));
        }
    }

    LINE_SLOTS
        .iter()
        .zip(slots)
        .filter(|(_, items)| !items.is_empty())
        .map(|(name, items)| Meal::new(*name, items))
        .collect()
}

/// Header text of a meal header line: the bold text, or the leading meal word.
fn header_text(line: &str) -> Option<&str> {
    if let Some(caps) = BOLD_HEADER.captures(line) {
        let inner = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        return Some(if inner.is_empty() { caps.get(0).map_or(line, |m| m.as_str()) } else { inner });
    }

    MEAL_WORD_HEADER.find(line).map(|m| m.as_str())
}

fn resolve_slot(header: &str) -> Option<usize> {
    let header = header.to_lowercase();

    LINE_SLOTS.iter().position(|slot| {
        let slot = slot.to_lowercase();
        header == slot || header.contains(&slot)
    })
}

/// Strips bullets, ordinals and pipes; `None` for lines with nothing left.
fn clean_item_line(line: &str) -> Option<String> {
    let without_bullet = LEADING_BULLET.replace(line, "");
    let without_ordinal = LEADING_ORDINAL.replace(&without_bullet, "");
    let item = without_ordinal.replace('|', "");
    let item = item.trim();

    if item.is_empty() || RULE_ONLY.is_match(item) {
        return None;
    }

    Some(item.to_string())
}

fn distribute_totals(meals: &mut [Meal], total: NutritionTotals) {
    let count = meals.len().max(1) as f64;
    let share = |value: u32| (value as f64 / count).round() as u32;

    for meal in meals.iter_mut() {
        meal.description = meal.items.join(", ");
        meal.calories = share(total.calories);
        meal.protein = share(total.protein);
        meal.carbs = share(total.carbs);
        meal.fat = share(total.fat);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(meals: &[Meal]) -> Vec<&str> {
        meals.iter().map(|m| m.name.as_str()).collect()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_line_format_example() {
        let response = "**Breakfast**\n• Oats\n• Eggs\n**Lunch**\n• Rice\n• Chicken";
        let meals = parse_meal_plan(response);

        assert_eq!(names(&meals), vec!["Breakfast", "Lunch"]);
        assert_eq!(meals[0].items, strings(&["Oats", "Eggs"]));
        assert_eq!(meals[1].items, strings(&["Rice", "Chicken"]));
        assert_eq!(meals[0].description, "Oats, Eggs");
    }

    #[test]
    fn test_table_format_example() {
        let response = "| **Breakfast** | Oats, Eggs |\n| **Lunch** | Rice, Chicken |";
        let meals = parse_meal_plan(response);

        assert_eq!(names(&meals), vec!["Breakfast", "Lunch"]);
        assert_eq!(meals[0].items, strings(&["Oats", "Eggs"]));
        assert_eq!(meals[1].items, strings(&["Rice", "Chicken"]));
        assert_eq!(meals[0].description, "Oats, Eggs");
        assert_eq!(meals[1].description, "Rice, Chicken");
    }

    #[test]
    fn test_prose_falls_back_to_defaults() {
        let meals = parse_meal_plan("random unstructured prose with no meal markers");

        assert_eq!(meals, default_meals());
        assert_eq!(meals[0].items, strings(&["Oatmeal with berries", "Greek yogurt", "Green smoothie"]));
        assert_eq!(meals[1].items, strings(&["Grilled chicken salad", "Quinoa", "Fruit"]));
        assert_eq!(meals[2].items, strings(&["Baked salmon", "Steamed vegetables", "Mixed salad"]));
        assert_eq!(meals[2].description, "Baked salmon, Steamed vegetables, Mixed salad");
    }

    #[test]
    fn test_degenerate_inputs_are_total() {
        let inputs = [
            "",
            "   \n\t \n",
            "\u{0}\u{1}\u{fffd}||\u{7f}",
            "|",
            "| **** | |",
            "**Breakfast**",
            "| **Breakfast** |",
            "----\n====\n***",
        ];

        for input in inputs {
            let meals = parse_meal_plan(input);
            assert!(!meals.is_empty(), "no meals for {:?}", input);
            for meal in &meals {
                assert!(!meal.name.is_empty(), "empty name for {:?}", input);
                assert!((1..=MAX_ITEMS_PER_MEAL).contains(&meal.items.len()), "bad items for {:?}", input);
                assert!(meal.items.iter().all(|item| !item.trim().is_empty()));
            }
        }
    }

    #[test]
    fn test_items_capped_at_three() {
        let lines = "Breakfast\n- Oats\n- Eggs\n- Toast\n- Juice\n- Coffee";
        let meals = parse_meal_plan(lines);
        assert_eq!(meals[0].items, strings(&["Oats", "Eggs", "Toast"]));

        let table = "| **Dinner** | Fish, Rice, Salad, Bread, Soup |";
        let meals = parse_meal_plan(table);
        assert_eq!(meals[0].items, strings(&["Fish", "Rice", "Salad"]));
    }

    #[test]
    fn test_duplicate_items_kept_once() {
        let lines = "**Lunch**\n• Rice\n• Rice\n• Beans";
        let meals = parse_meal_plan(lines);
        assert_eq!(meals[0].items, strings(&["Rice", "Beans"]));

        let table = "| **Lunch** | Rice, Rice |\n| | Rice <br> Beans |";
        let meals = parse_meal_plan(table);
        assert_eq!(meals[0].items, strings(&["Rice", "Beans"]));
    }

    #[test]
    fn test_table_wins_over_line_headers() {
        let response = "Breakfast\n- Oats\n| **Supper** | Soup |";

        assert_eq!(detect_format(response), ResponseFormat::Table);
        let meals = parse_meal_plan(response);
        assert_eq!(names(&meals), vec!["Supper"]);
        assert_eq!(meals[0].items, strings(&["Soup"]));
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("| a | b |"), ResponseFormat::Table);
        assert_eq!(detect_format("a | b"), ResponseFormat::Lines);
        assert_eq!(detect_format("**Breakfast**\n• Oats"), ResponseFormat::Lines);
        assert_eq!(detect_format(""), ResponseFormat::Lines);
    }

    #[test]
    fn test_nutrition_totals_split_across_meals() {
        let response = "Daily totals - Calories: 1800 kcal, Protein: 120g, Carbs: 200g, Fat: 60g\n\
                        **Breakfast**\n• Oats\n**Lunch**\n• Rice\n**Dinner**\n• Fish";
        let parsed = parse_meal_plan_response(response);

        assert_eq!(parsed.meals.len(), 3);
        assert_eq!(
            parsed.total,
            NutritionTotals { calories: 1800, protein: 120, carbs: 200, fat: 60 }
        );
        for meal in &parsed.meals {
            assert_eq!(meal.calories, 600);
            assert_eq!(meal.protein, 40);
            assert_eq!(meal.carbs, 67);
            assert_eq!(meal.fat, 20);
        }
    }

    #[test]
    fn test_nutrition_totals_rounding_with_two_meals() {
        let response = "Calories: 1801 Protein: 121g Carbs: 199g Fat: 61g\n**Breakfast**\n• Oats\n**Lunch**\n• Rice";
        let meals = parse_meal_plan(response);

        assert_eq!(meals.len(), 2);
        assert_eq!(meals[0].calories, 901);
        assert_eq!(meals[0].protein, 61);
        assert_eq!(meals[0].carbs, 100);
        assert_eq!(meals[0].fat, 31);
    }

    #[test]
    fn test_partial_nutrition_is_ignored() {
        assert_eq!(extract_nutrition_totals("Calories: 1800, Protein: 120g"), NutritionTotals::default());
        assert_eq!(
            extract_nutrition_totals("Calories: 1800\nProtein: 120g\nCarbs: 200g\nFat: 60g"),
            NutritionTotals::default()
        );
        assert_eq!(
            extract_nutrition_totals("calories: 2000 protein: 150g carbs: 180g fat: 70g"),
            NutritionTotals { calories: 2000, protein: 150, carbs: 180, fat: 70 }
        );

        let meals = parse_meal_plan("**Dinner**\n- Fish\nCalories: 900");
        assert_eq!(meals[0].calories, 0);
        assert_eq!(meals[0].fat, 0);
    }

    #[test]
    fn test_nutrition_totals_all_or_nothing() {
        assert_eq!(
            extract_nutrition_totals("Calories: 99999999999 Protein: 120g Carbs: 200g Fat: 60g"),
            NutritionTotals::default()
        );

        // non-ASCII digits do not match, so the later ASCII line is used
        let response = "Calories: \u{661}\u{668}\u{660}\u{660} Protein: 1g Carbs: 1g Fat: 1g\n\
                        Calories: 1800 Protein: 120g Carbs: 200g Fat: 60g";
        assert_eq!(
            extract_nutrition_totals(response),
            NutritionTotals { calories: 1800, protein: 120, carbs: 200, fat: 60 }
        );
    }

    #[test]
    fn test_ordinals_are_ascii_only() {
        let response = "**Lunch**\n3. Rice\n\u{663}. Lentils";
        let meals = parse_meal_plan(response);

        assert_eq!(meals[0].items, strings(&["Rice", "\u{663}. Lentils"]));
    }

    #[test]
    fn test_line_items_before_header_are_dropped() {
        let response = "Here is your plan:\n- Water\n**Dinner**\n- Salmon";
        let meals = parse_meal_plan(response);

        assert_eq!(names(&meals), vec!["Dinner"]);
        assert_eq!(meals[0].items, strings(&["Salmon"]));
    }

    #[test]
    fn test_unknown_header_stops_collection() {
        let response = "**Breakfast**\n- Oats\n**Snack**\n- Almonds\n**Dinner**\n- Pasta";
        let meals = parse_meal_plan(response);

        assert_eq!(names(&meals), vec!["Breakfast", "Dinner"]);
        assert!(meals.iter().all(|m| !m.items.contains(&"Almonds".to_string())));
    }

    #[test]
    fn test_line_cleanup_of_bullets_and_ordinals() {
        let response = "Breakfast (450 kcal):\n1. Scrambled eggs\n2) Toast | butter\n---\n- Tea, Honey";
        let meals = parse_meal_plan(response);

        assert_eq!(names(&meals), vec!["Breakfast"]);
        assert_eq!(meals[0].items, strings(&["Scrambled eggs", "Toast  butter", "Tea"]));
    }

    #[test]
    fn test_header_matching_is_case_insensitive_and_substring() {
        let response = "**Healthy LUNCH option**\n• Wrap\nDINNER:\n• Stew";
        let meals = parse_meal_plan(response);

        assert_eq!(names(&meals), vec!["Lunch", "Dinner"]);
        assert_eq!(meals[0].items, strings(&["Wrap"]));
        assert_eq!(meals[1].items, strings(&["Stew"]));
    }

    #[test]
    fn test_table_skips_layout_rows_and_reads_continuations() {
        let response = "\
| Meal | Food Type | Items |
|------|-----------|-------|
| **Breakfast** | Oats<br>Berries |
| | • | Yogurt |
| **Lunch** | Quinoa bowl |
| | Chickpeas • Spinach • Feta |";
        let meals = parse_meal_plan(response);

        assert_eq!(names(&meals), vec!["Breakfast", "Lunch"]);
        assert_eq!(meals[0].items, strings(&["Oats", "Berries", "Yogurt"]));
        assert_eq!(meals[1].items, strings(&["Quinoa bowl", "Chickpeas", "Spinach"]));
        assert_eq!(meals[1].description, "Quinoa bowl, Chickpeas, Spinach");
    }

    #[test]
    fn test_table_meal_without_items_is_dropped() {
        let response = "| **Breakfast** | |\n| **Lunch** | Soup |";
        let meals = parse_meal_plan(response);

        assert_eq!(names(&meals), vec!["Lunch"]);
    }

    #[test]
    fn test_table_without_named_rows_falls_back() {
        let meals = parse_meal_plan("| Oats | Eggs |\n| Rice | Beans |");
        assert_eq!(meals, default_meals());
    }

    #[test]
    fn test_normalize_items() {
        let existing = strings(&["Oats"]);
        let items = normalize_items(&existing, ["  Eggs ", "", "Oats", "--- ", "Meal prep", "Toast", "Jam"]);
        assert_eq!(items, strings(&["Oats", "Eggs", "Toast"]));

        // idempotent
        assert_eq!(normalize_items(&items, Vec::<String>::new()), items);
        assert_eq!(normalize_items(&[], &items), items);
    }
}
