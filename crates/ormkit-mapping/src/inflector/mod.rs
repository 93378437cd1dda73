//! Module: inflector
//! Responsibility: English pluralization and derived table names.


use convert_case::{Case, Casing};

const UNCOUNTABLE: &[&str] = &[
    "audio",
    "data",
    "equipment",
    "evidence",
    "feedback",
    "information",
    "media",
    "metadata",
    "money",
    "news",
    "rice",
    "series",
    "sheep",
    "species",
    "software",
    "traffic",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("child", "children"),
    ("criterion", "criteria"),
    ("foot", "feet"),
    ("goose", "geese"),
    ("index", "indices"),
    ("man", "men"),
    ("matrix", "matrices"),
    ("mouse", "mice"),
    ("ox", "oxen"),
    ("person", "people"),
    ("quiz", "quizzes"),
    ("status", "statuses"),
    ("tooth", "teeth"),
    ("vertex", "vertices"),
    ("woman", "women"),
];

/// Words ending in `f`/`fe` that keep the `f`.
const KEEP_F: &[&str] = &["belief", "chef", "chief", "proof", "roof", "safe"];

/// Plural form of an English word. Only the last `_`-separated segment is
/// inflected; the original casing of its first letter is kept.
#[must_use]
pub fn pluralize(word: &str) -> String {
    let (head, last) = word
        .rsplit_once('_')
        .map_or(("", word), |(head, last)| (head, last));
    if last.is_empty() {
        return word.to_string();
    }

    let plural = pluralize_word(last);
    if head.is_empty() {
        plural
    } else {
        format!("{head}_{plural}")
    }
}

fn pluralize_word(word: &str) -> String {
    let lower = word.to_ascii_lowercase();

    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((singular, plural)) = IRREGULAR
        .iter()
        .find(|(singular, _)| is_irregular_match(&lower, singular))
    {
        let (stem, tail) = word.split_at(word.len() - singular.len());
        return format!("{stem}{}", match_case(tail, plural));
    }

    if let Some(stem) = lower.strip_suffix('y')
        && !stem.is_empty()
        && !stem.ends_with(['a', 'e', 'i', 'o', 'u'])
    {
        return format!("{}ies", &word[..stem.len()]);
    }
    if lower.ends_with(['s', 'x', 'z']) || lower.ends_with("ch") || lower.ends_with("sh") {
        return format!("{word}es");
    }
    if !KEEP_F.contains(&lower.as_str()) {
        if lower.ends_with("fe") {
            return format!("{}ves", &word[..word.len() - 2]);
        }
        if lower.ends_with('f') && !lower.ends_with("ff") {
            return format!("{}ves", &word[..word.len() - 1]);
        }
    }

    format!("{word}s")
}

/// Irregular forms apply to whole words, or to the tail of a compound
/// written without separators (`salesperson`).
fn is_irregular_match(lower: &str, singular: &str) -> bool {
    lower == singular || (singular.len() > 3 && lower.ends_with(singular))
}

/// Capitalize `plural` when the word it replaces starts upper case.
fn match_case(replaced: &str, plural: &str) -> String {
    if !replaced.starts_with(|c: char| c.is_ascii_uppercase()) {
        return plural.to_string();
    }

    let mut chars = plural.chars();
    chars
        .next()
        .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
        .unwrap_or_default()
}

/// Default table name for a type: its local name in snake case, pluralized.
#[must_use]
pub fn table_name(type_name: &str) -> String {
    let local = type_name.rsplit("::").next().unwrap_or(type_name);

    pluralize(&local.to_case(Case::Snake))
}
