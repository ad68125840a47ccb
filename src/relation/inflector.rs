//! English singularization for the default foreign-key convention.
//!
//! Only the last `_`-separated segment of a table name is singularized, so
//! `post_tags` becomes `post_tag`. Names the rules get wrong can always be
//! fixed with an explicit foreign-key override on the relation.

const UNCOUNTABLE: &[&str] = &[
    "audio", "data", "deer", "equipment", "feedback", "fish", "information", "media", "metadata",
    "money", "news", "rice", "series", "sheep", "species", "staff",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("analyses", "analysis"),
    ("buses", "bus"),
    ("children", "child"),
    ("cookies", "cookie"),
    ("courses", "course"),
    ("criteria", "criterion"),
    ("feet", "foot"),
    ("geese", "goose"),
    ("houses", "house"),
    ("indices", "index"),
    ("knives", "knife"),
    ("leaves", "leaf"),
    ("lives", "life"),
    ("matrices", "matrix"),
    ("men", "man"),
    ("mice", "mouse"),
    ("movies", "movie"),
    ("oxen", "ox"),
    ("people", "person"),
    ("statuses", "status"),
    ("teeth", "tooth"),
    ("wives", "wife"),
    ("women", "woman"),
];

/// Singular form of a (snake_case) table name
///
/// ```
/// use belongs_to_through::relation::inflector::singular;
///
/// assert_eq!(singular("posts"), "post");
/// assert_eq!(singular("countries"), "country");
/// assert_eq!(singular("post_tags"), "post_tag");
/// assert_eq!(singular("people"), "person");
/// ```
pub fn singular(word: &str) -> String {
    match word.rsplit_once('_') {
        Some((head, last)) => format!("{head}_{}", singular_word(last)),
        None => singular_word(word),
    }
}

fn singular_word(word: &str) -> String {
    let lower = word.to_ascii_lowercase();

    if lower.is_empty() || UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((_, single)) = IRREGULAR.iter().find(|(plural, _)| *plural == lower) {
        return (*single).to_string();
    }

    let stem = |suffix_len: usize| word[..word.len() - suffix_len].to_string();

    if lower.ends_with("ies") && lower.len() > 3 {
        return format!("{}y", stem(3));
    }
    for suffix in ["sses", "shes", "ches", "xes", "zes"] {
        if lower.ends_with(suffix) {
            return stem(2);
        }
    }
    if lower.ends_with("ss") || lower.ends_with("us") || lower.ends_with("is") {
        return word.to_string();
    }
    if lower.ends_with('s') && lower.len() > 1 {
        return stem(1);
    }
    word.to_string()
}
