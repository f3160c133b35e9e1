//! Composable list-filter predicates.
//!
//! A [`Predicate`] is a set of named field rules combined with logical
//! AND. Each rule follows one of two conventions:
//!
//! - `one_of`: an empty value set matches everything; otherwise the
//!   field's value must be a member of the set.
//! - `equals`: an absent expected value matches everything; otherwise
//!   the field must equal it.

use std::fmt;

type Extract<T> = fn(&T) -> Option<String>;
type ExtractBool<T> = fn(&T) -> bool;

enum Rule<T> {
    OneOf {
        values: Vec<String>,
        extract: Extract<T>,
    },
    Equals {
        value: bool,
        extract: ExtractBool<T>,
    },
}

impl<T> Rule<T> {
    fn matches(&self, item: &T) -> bool {
        match self {
            Rule::OneOf { values, extract } => match extract(item) {
                Some(field) => values.iter().any(|v| *v == field),
                None => false,
            },
            Rule::Equals { value, extract } => extract(item) == *value,
        }
    }
}

pub struct Predicate<T> {
    rules: Vec<(&'static str, Rule<T>)>,
}

impl<T> Predicate<T> {
    /// A predicate that matches everything.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Require `extract(item)` to be one of `values`. An empty `values`
    /// adds no constraint. Items whose field is absent never match a
    /// non-empty set.
    pub fn one_of<V: ToString>(mut self, field: &'static str, values: &[V], extract: Extract<T>) -> Self {
        if !values.is_empty() {
            let values = values.iter().map(ToString::to_string).collect();
            self.rules.push((field, Rule::OneOf { values, extract }));
        }
        self
    }

    /// Require `extract(item) == value` when `value` is present.
    pub fn equals(mut self, field: &'static str, value: Option<bool>, extract: ExtractBool<T>) -> Self {
        if let Some(value) = value {
            self.rules.push((field, Rule::Equals { value, extract }));
        }
        self
    }

    pub fn matches(&self, item: &T) -> bool {
        self.rules.iter().all(|(_, rule)| rule.matches(item))
    }

    /// Keep only the matching items, preserving order.
    pub fn filter(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().filter(|item| self.matches(item)).collect()
    }

    /// Names of the fields that actually constrain the result.
    pub fn constrained_fields(&self) -> Vec<&'static str> {
        self.rules.iter().map(|(field, _)| *field).collect()
    }
}

impl<T> Default for Predicate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("fields", &self.constrained_fields())
            .finish()
    }
}

/// `true` when `values` is empty or contains `value`.
pub fn empty_or_contains<V: PartialEq>(values: &[V], value: &V) -> bool {
    values.is_empty() || values.contains(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Item {
        app: Option<String>,
        kind: String,
        flag: bool,
    }

    fn items() -> Vec<Item> {
        vec![
            Item {
                app: Some("a1".into()),
                kind: "web".into(),
                flag: true,
            },
            Item {
                app: Some("a2".into()),
                kind: "worker".into(),
                flag: false,
            },
            Item {
                app: None,
                kind: "web".into(),
                flag: true,
            },
        ]
    }

    #[test]
    fn empty_predicate_matches_everything() {
        let predicate = Predicate::<Item>::new()
            .one_of::<String>("app", &[], |i| i.app.clone())
            .equals("flag", None, |i| i.flag);
        assert!(predicate.constrained_fields().is_empty());
        assert_eq!(predicate.filter(items()).len(), 3);
    }

    #[test]
    fn one_of_matches_members_only() {
        let predicate = Predicate::<Item>::new().one_of("app", &["a1"], |i| i.app.clone());
        let matched = predicate.filter(items());
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].app.as_deref(), Some("a1"));
    }

    #[test]
    fn rules_combine_with_and() {
        let predicate = Predicate::<Item>::new()
            .one_of("kind", &["web"], |i| Some(i.kind.clone()))
            .one_of("app", &["a1", "a2"], |i| i.app.clone());
        let matched = predicate.filter(items());
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].kind, "web");
        assert_eq!(predicate.constrained_fields(), vec!["kind", "app"]);
    }

    #[test]
    fn equals_applies_only_when_present() {
        let predicate = Predicate::<Item>::new().equals("flag", Some(false), |i| i.flag);
        let matched = predicate.filter(items());
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].app.as_deref(), Some("a2"));
    }

    #[test]
    fn empty_or_contains_rule() {
        assert!(empty_or_contains::<&str>(&[], &"x"));
        assert!(empty_or_contains(&["x", "y"], &"y"));
        assert!(!empty_or_contains(&["x"], &"z"));
    }
}
