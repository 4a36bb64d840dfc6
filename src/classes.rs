use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::errors::{FeeError, Result};

/// named group of consecutive classes (e.g. "Lower Primary")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCategory {
    pub label: String,
    pub classes: Vec<String>,
}

impl ClassCategory {
    pub fn new(label: &str, classes: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// ordered class taxonomy used for promotion and sorting
///
/// The order of classes is the order of categories, then the order of
/// classes within each category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSequence {
    categories: Vec<ClassCategory>,
}

impl ClassSequence {
    pub fn new(categories: Vec<ClassCategory>) -> Self {
        Self { categories }
    }

    /// nursery through junior high
    pub fn standard() -> Self {
        Self::new(vec![
            ClassCategory::new("Pre-School", &["Nursery1", "Nursery2", "KG1", "KG2"]),
            ClassCategory::new("Lower Primary", &["Prim1", "Prim2", "Prim3"]),
            ClassCategory::new("Upper Primary", &["Prim4", "Prim5", "Prim6"]),
            ClassCategory::new("Junior High", &["JHS1", "JHS2", "JHS3"]),
        ])
    }

    pub fn categories(&self) -> &[ClassCategory] {
        &self.categories
    }

    /// all classes in promotion order
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .flat_map(|c| c.classes.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.categories.iter().map(|c| c.classes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index_of(&self, class: &str) -> Option<usize> {
        self.classes().position(|c| c == class)
    }

    pub fn contains(&self, class: &str) -> bool {
        self.index_of(class).is_some()
    }

    pub fn first(&self) -> Option<&str> {
        self.classes().next()
    }

    pub fn last(&self) -> Option<&str> {
        self.classes().last()
    }

    /// class a student moves to on promotion; `None` for the final class
    /// and for classes outside the sequence
    pub fn next_after(&self, class: &str) -> Option<&str> {
        let index = self.index_of(class)?;
        self.classes().nth(index + 1)
    }

    pub fn category_of(&self, class: &str) -> Option<&ClassCategory> {
        self.categories
            .iter()
            .find(|c| c.classes.iter().any(|name| name == class))
    }

    /// sequence order; unknown classes sort after known ones, by name
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match (self.index_of(a), self.index_of(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }

    /// reject empty sequences and repeated class names
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(FeeError::InvalidConfiguration {
                message: "class sequence is empty".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for class in self.classes() {
            if class.trim().is_empty() {
                return Err(FeeError::InvalidConfiguration {
                    message: "class name is blank".to_string(),
                });
            }
            if !seen.insert(class) {
                return Err(FeeError::InvalidConfiguration {
                    message: format!("class {} appears more than once", class),
                });
            }
        }

        Ok(())
    }
}

impl Default for ClassSequence {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_order() {
        let seq = ClassSequence::standard();
        assert_eq!(seq.len(), 13);
        assert_eq!(seq.first(), Some("Nursery1"));
        assert_eq!(seq.last(), Some("JHS3"));
        assert_eq!(seq.index_of("Prim1"), Some(4));
        assert_eq!(seq.index_of("Prim7"), None);
    }

    #[test]
    fn test_next_after() {
        let seq = ClassSequence::standard();
        assert_eq!(seq.next_after("KG2"), Some("Prim1"));
        assert_eq!(seq.next_after("Prim3"), Some("Prim4"));
        assert_eq!(seq.next_after("JHS3"), None);
        assert_eq!(seq.next_after("Unknown"), None);
    }

    #[test]
    fn test_category_lookup() {
        let seq = ClassSequence::standard();
        assert_eq!(seq.category_of("Prim5").map(|c| c.label.as_str()), Some("Upper Primary"));
        assert!(seq.category_of("College").is_none());
    }

    #[test]
    fn test_compare_puts_unknown_last() {
        let seq = ClassSequence::standard();
        assert_eq!(seq.compare("Prim1", "KG1"), Ordering::Greater);
        assert_eq!(seq.compare("JHS3", "Alumni"), Ordering::Less);
        assert_eq!(seq.compare("Alumni", "Zeta"), Ordering::Less);
    }

    #[test]
    fn test_validate() {
        assert!(ClassSequence::standard().validate().is_ok());
        assert!(ClassSequence::new(vec![]).validate().is_err());

        let repeated = ClassSequence::new(vec![
            ClassCategory::new("A", &["One", "Two"]),
            ClassCategory::new("B", &["Two"]),
        ]);
        assert!(repeated.validate().is_err());
    }
}
