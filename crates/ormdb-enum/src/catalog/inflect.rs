//! Naming conventions for tables, foreign keys and scopes.

use heck::ToSnakeCase;

/// English plural of a snake_case word (`status` -> `statuses`).
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        return format!("{word}es");
    }
    if let Some(stem) = word.strip_suffix('y') {
        if stem.chars().last().is_some_and(|c| !"aeiou".contains(c)) {
            return format!("{stem}ies");
        }
    }
    format!("{word}s")
}

/// Table name for a type name (`BookingStatus` -> `booking_statuses`).
pub fn tableize(type_name: &str) -> String {
    pluralize(&type_name.to_snake_case())
}

/// Default foreign key column for an attribute (`status` -> `status_id`).
pub fn foreign_key_for(attribute: &str) -> String {
    format!("{attribute}_id")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("status"), "statuses");
        assert_eq!(pluralize("state"), "states");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("match"), "matches");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("connector_type"), "connector_types");
    }

    #[test]
    fn test_tableize() {
        assert_eq!(tableize("BookingStatus"), "booking_statuses");
        assert_eq!(tableize("ConnectorType"), "connector_types");
        assert_eq!(tableize("State"), "states");
    }

    #[test]
    fn test_foreign_key_for() {
        assert_eq!(foreign_key_for("status"), "status_id");
    }
}
