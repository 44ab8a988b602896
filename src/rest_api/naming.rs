//! Resource name pluralization
//!
//! Small English rule set; names already ending in a single `s` are left as
//! they are.

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("mouse", "mice"),
    ("goose", "geese"),
];

/// Pluralize a resource name, keeping the case of its first letter
pub fn pluralize(name: &str) -> String {
    let lower = name.to_lowercase();

    let irregular = IRREGULAR
        .iter()
        .find(|(s, _)| name.is_ascii() && lower.ends_with(s));
    if let Some((singular, plural)) = irregular {
        let stem = &name[..name.len() - singular.len()];
        let tail = &name[name.len() - singular.len()..];
        let plural = if stem.is_empty() && tail.starts_with(char::is_uppercase) {
            capitalize(plural)
        } else {
            plural.to_string()
        };
        return format!("{}{}", stem, plural);
    }

    if lower.ends_with("ss")
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        return format!("{}es", name);
    }

    if lower.ends_with('s') {
        return name.to_string();
    }

    if let Some(stem) = name.strip_suffix(['y', 'Y']) {
        let before = stem.chars().last().map(|c| c.to_ascii_lowercase());
        if matches!(before, Some(c) if !"aeiou".contains(c)) {
            return format!("{}ies", stem);
        }
    }

    format!("{}s", name)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_nouns() {
        assert_eq!(pluralize("Customer"), "Customers");
        assert_eq!(pluralize("invoice"), "invoices");
        assert_eq!(pluralize("Box"), "Boxes");
        assert_eq!(pluralize("Address"), "Addresses");
        assert_eq!(pluralize("Branch"), "Branches");
    }

    #[test]
    fn test_y_endings() {
        assert_eq!(pluralize("Category"), "Categories");
        assert_eq!(pluralize("Key"), "Keys");
    }

    #[test]
    fn test_irregular_and_plural() {
        assert_eq!(pluralize("Person"), "People");
        assert_eq!(pluralize("salesperson"), "salespeople");
        assert_eq!(pluralize("Products"), "Products");
    }
}
