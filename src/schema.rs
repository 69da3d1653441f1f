//! schema.org/Recipe markup extraction.
//!
//! Many recipe pages embed machine-readable JSON-LD
//! (`<script type="application/ld+json">`). When present, it yields the
//! structured fields directly and the AI extraction call is skipped
//! entirely — the schema path always takes precedence because it costs
//! no tokens and no model latency.

use scraper::{Html, Selector};
use serde_json::Value;

use crate::types::RecipeDraft;

/// Usage-stats marker recorded when embedded markup produced the draft
/// instead of an AI model.
pub const SCHEMA_MARKUP_SOURCE: &str = "schema-markup";

/// Upper bound on flattened page text handed to the AI extractor.
const MAX_PAGE_TEXT: usize = 40_000;

/// Scan a page for embedded schema.org Recipe markup.
///
/// Tolerates the forms seen in the wild: top-level arrays, `@graph`
/// wrappers, `@type` as a string or an array, instructions as plain
/// strings, `HowToStep` objects, or nested `HowToSection` lists.
/// Returns `None` when no recipe node with a usable title exists.
pub fn extract_recipe_markup(html: &str) -> Option<RecipeDraft> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    for script in doc.select(&selector) {
        let raw = script.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(raw.trim()) else {
            continue;
        };
        if let Some(draft) = find_recipe_node(&value).and_then(draft_from_node) {
            return Some(draft);
        }
    }
    None
}

/// Flatten a page to plain text for the AI extraction path.
pub fn page_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let body = Selector::parse("body").ok();

    let text: String = match body.as_ref().and_then(|sel| doc.select(sel).next()) {
        Some(node) => node.text().collect::<Vec<_>>().join(" "),
        None => doc.root_element().text().collect::<Vec<_>>().join(" "),
    };

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_PAGE_TEXT {
        collapsed.chars().take(MAX_PAGE_TEXT).collect()
    } else {
        collapsed
    }
}

fn find_recipe_node(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_recipe_node),
        Value::Object(obj) => {
            if is_recipe_type(obj.get("@type")) {
                return Some(value);
            }
            obj.get("@graph").and_then(find_recipe_node)
        }
        _ => None,
    }
}

fn is_recipe_type(type_field: Option<&Value>) -> bool {
    match type_field {
        Some(Value::String(s)) => s.eq_ignore_ascii_case("recipe"),
        Some(Value::Array(items)) => items
            .iter()
            .any(|v| v.as_str().is_some_and(|s| s.eq_ignore_ascii_case("recipe"))),
        _ => false,
    }
}

fn draft_from_node(node: &Value) -> Option<RecipeDraft> {
    let title = node
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())?
        .to_string();

    let description = node
        .get("description")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let prep_minutes = node
        .get("prepTime")
        .and_then(Value::as_str)
        .and_then(parse_iso_minutes);
    let cook_minutes = node
        .get("cookTime")
        .and_then(Value::as_str)
        .and_then(parse_iso_minutes)
        .or_else(|| {
            node.get("totalTime")
                .and_then(Value::as_str)
                .and_then(parse_iso_minutes)
        });

    Some(RecipeDraft {
        title,
        description,
        ingredients: string_list(node.get("recipeIngredient")),
        steps: instruction_list(node.get("recipeInstructions")),
        prep_minutes,
        cook_minutes,
        servings: yield_count(node.get("recipeYield")),
        tags: keyword_list(node.get("keywords")),
        image_url: image_ref(node.get("image")),
    })
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn instruction_list(value: Option<&Value>) -> Vec<String> {
    let mut steps = Vec::new();
    collect_instructions(value, &mut steps);
    steps
}

fn collect_instructions(value: Option<&Value>, out: &mut Vec<String>) {
    match value {
        Some(Value::String(s)) => {
            let step = s.trim();
            if !step.is_empty() {
                out.push(step.to_string());
            }
        }
        Some(Value::Array(items)) => {
            for item in items {
                collect_instructions(Some(item), out);
            }
        }
        Some(Value::Object(obj)) => {
            // HowToSection nests further steps; HowToStep carries "text".
            if let Some(nested) = obj.get("itemListElement") {
                collect_instructions(Some(nested), out);
            } else if let Some(text) = obj.get("text").and_then(Value::as_str) {
                let step = text.trim();
                if !step.is_empty() {
                    out.push(step.to_string());
                }
            }
        }
        _ => {}
    }
}

fn yield_count(value: Option<&Value>) -> Option<u32> {
    match value {
        Some(Value::Number(n)) => n.as_u64().map(|v| v as u32),
        Some(Value::String(s)) => first_integer(s),
        Some(Value::Array(items)) => items.iter().find_map(|v| yield_count(Some(v))),
        _ => None,
    }
}

fn first_integer(s: &str) -> Option<u32> {
    let digits: String = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn keyword_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => s
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn image_ref(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Array(items)) => items.iter().find_map(|v| image_ref(Some(v))),
        Some(Value::Object(obj)) => image_ref(obj.get("url")),
        _ => None,
    }
}

/// Parse an ISO-8601 duration (`PT1H30M`, `P1DT2H`) into whole minutes.
/// Seconds are dropped. Page markup is untrusted, so absurd values that
/// would overflow the minute count yield `None` instead.
fn parse_iso_minutes(s: &str) -> Option<u32> {
    let rest = s.trim().strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, t),
        None => (rest, ""),
    };

    let mut minutes: u32 = 0;
    let mut matched = false;

    let mut digits = String::new();
    for c in date_part.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else {
            if c == 'D' {
                let days = digits.parse::<u32>().ok()?;
                minutes = days
                    .checked_mul(24 * 60)
                    .and_then(|m| minutes.checked_add(m))?;
                matched = true;
            }
            digits.clear();
        }
    }

    digits.clear();
    for c in time_part.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else {
            match c {
                'H' => {
                    let hours = digits.parse::<u32>().ok()?;
                    minutes = hours
                        .checked_mul(60)
                        .and_then(|m| minutes.checked_add(m))?;
                    matched = true;
                }
                'M' => {
                    minutes = minutes.checked_add(digits.parse::<u32>().ok()?)?;
                    matched = true;
                }
                'S' => matched = true,
                _ => {}
            }
            digits.clear();
        }
    }

    if matched {
        Some(minutes)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(ld_json: &str) -> String {
        format!(
            r#"<html><head><script type="application/ld+json">{}</script></head><body><h1>Page</h1></body></html>"#,
            ld_json
        )
    }

    #[test]
    fn extracts_plain_recipe_node() {
        let html = page(
            r#"{
                "@context": "https://schema.org",
                "@type": "Recipe",
                "name": "Pasta Bake",
                "description": "Cheesy and fast.",
                "recipeIngredient": ["200g pasta", "100g cheese"],
                "recipeInstructions": ["Boil pasta.", "Bake with cheese."],
                "prepTime": "PT10M",
                "cookTime": "PT25M",
                "recipeYield": "4 servings",
                "keywords": "Pasta, Dinner",
                "image": "https://example.com/pasta.jpg"
            }"#,
        );

        let draft = extract_recipe_markup(&html).unwrap();
        assert_eq!(draft.title, "Pasta Bake");
        assert_eq!(draft.description.as_deref(), Some("Cheesy and fast."));
        assert_eq!(draft.ingredients, vec!["200g pasta", "100g cheese"]);
        assert_eq!(draft.steps, vec!["Boil pasta.", "Bake with cheese."]);
        assert_eq!(draft.prep_minutes, Some(10));
        assert_eq!(draft.cook_minutes, Some(25));
        assert_eq!(draft.servings, Some(4));
        assert_eq!(draft.tags, vec!["pasta", "dinner"]);
        assert_eq!(draft.image_url.as_deref(), Some("https://example.com/pasta.jpg"));
    }

    #[test]
    fn extracts_recipe_from_graph_wrapper() {
        let html = page(
            r#"{
                "@context": "https://schema.org",
                "@graph": [
                    {"@type": "WebSite", "name": "Food Blog"},
                    {"@type": ["Recipe", "Thing"], "name": "Stew",
                     "recipeInstructions": [
                        {"@type": "HowToStep", "text": "Brown the beef."},
                        {"@type": "HowToSection", "itemListElement": [
                            {"@type": "HowToStep", "text": "Simmer two hours."}
                        ]}
                     ],
                     "image": {"@type": "ImageObject", "url": "https://example.com/stew.jpg"},
                     "recipeYield": 6
                    }
                ]
            }"#,
        );

        let draft = extract_recipe_markup(&html).unwrap();
        assert_eq!(draft.title, "Stew");
        assert_eq!(draft.steps, vec!["Brown the beef.", "Simmer two hours."]);
        assert_eq!(draft.image_url.as_deref(), Some("https://example.com/stew.jpg"));
        assert_eq!(draft.servings, Some(6));
    }

    #[test]
    fn recipe_without_name_is_ignored() {
        let html = page(r#"{"@type": "Recipe", "recipeIngredient": ["salt"]}"#);
        assert!(extract_recipe_markup(&html).is_none());
    }

    #[test]
    fn page_without_markup_yields_none() {
        assert!(extract_recipe_markup("<html><body><p>Just a blog post.</p></body></html>").is_none());
    }

    #[test]
    fn invalid_json_script_is_skipped() {
        let html = r#"<html><head>
            <script type="application/ld+json">{not json</script>
            <script type="application/ld+json">{"@type": "Recipe", "name": "Valid"}</script>
            </head><body></body></html>"#;
        let draft = extract_recipe_markup(html).unwrap();
        assert_eq!(draft.title, "Valid");
    }

    #[test]
    fn iso_durations_parse_to_minutes() {
        assert_eq!(parse_iso_minutes("PT1H30M"), Some(90));
        assert_eq!(parse_iso_minutes("PT45M"), Some(45));
        assert_eq!(parse_iso_minutes("PT2H"), Some(120));
        assert_eq!(parse_iso_minutes("P1DT2H"), Some(1560));
        assert_eq!(parse_iso_minutes("PT30S"), Some(0));
        assert_eq!(parse_iso_minutes("not a duration"), None);
        assert_eq!(parse_iso_minutes("P"), None);
    }

    #[test]
    fn absurd_durations_are_rejected_not_overflowed() {
        assert_eq!(parse_iso_minutes("P4000000D"), None);
        assert_eq!(parse_iso_minutes("PT4000000000H"), None);
        assert_eq!(parse_iso_minutes("PT4294967295M"), Some(u32::MAX));
        assert_eq!(parse_iso_minutes("P1DT4294967295M"), None);
        // Digit runs past u32 entirely.
        assert_eq!(parse_iso_minutes("P99999999999999999999D"), None);
    }

    #[test]
    fn markup_with_absurd_duration_still_extracts() {
        let html = page(
            r#"{
                "@type": "Recipe",
                "name": "Forever Stew",
                "prepTime": "P4000000D",
                "cookTime": "PT25M"
            }"#,
        );
        let draft = extract_recipe_markup(&html).unwrap();
        assert_eq!(draft.title, "Forever Stew");
        assert_eq!(draft.prep_minutes, None);
        assert_eq!(draft.cook_minutes, Some(25));
    }

    #[test]
    fn page_text_flattens_and_collapses_whitespace() {
        let html = "<html><body><h1>Tomato   Soup</h1>\n<p>Serves\n4</p></body></html>";
        assert_eq!(page_text(html), "Tomato Soup Serves 4");
    }
}
