/// Split text into lowercase, lightly stemmed terms.
///
/// Any non-alphanumeric character separates tokens, so "Drive - Bangalore"
/// yields `["drive", "bangalore"]`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|raw| !raw.is_empty())
        .map(|raw| stem(&raw.to_lowercase()))
        .collect()
}

/// Fold simple English plurals onto their singular form.
///
/// Deliberately small: it only has to make "trees" meet "tree" and
/// "activities" meet "activity". Words of three letters or fewer are kept.
pub fn stem(word: &str) -> String {
    if word.chars().count() <= 3 {
        return word.to_string();
    }

    if let Some(base) = word.strip_suffix("ies") {
        return format!("{}y", base);
    }
    for suffix in ["sses", "shes", "ches", "xes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    match word.strip_suffix('s') {
        Some(base) => base.to_string(),
        None => word.to_string(),
    }
}
