//! Category catalog: the label taxonomy a partner can be assigned to.
//!
//! The wire form is a JSON object keyed by category name:
//! `{ "Food": { "emoji": "🍽️", "subcategories": ["Supermarkets", ...] }, ... }`.
//! It is validated once on ingestion and then treated as immutable.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

/// A top-level label with its glyph and (possibly empty) subcategories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub glyph: String,
    pub subcategories: Vec<String>,
}

impl Category {
    pub fn new(name: impl Into<String>, glyph: impl Into<String>, subcategories: &[&str]) -> Self {
        Self {
            name: name.into(),
            glyph: glyph.into(),
            subcategories: subcategories.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// A category without subcategories labels a partner by itself.
    pub fn is_terminal(&self) -> bool {
        self.subcategories.is_empty()
    }

    pub fn has_subcategory(&self, name: &str) -> bool {
        self.subcategories.iter().any(|s| s == name)
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog must be a JSON object keyed by category name")]
    NotAnObject,

    #[error("catalog has no categories")]
    Empty,

    #[error("category name must not be blank")]
    BlankCategory,

    #[error("duplicate category '{0}'")]
    DuplicateCategory(String),

    #[error("category '{category}' has a blank subcategory")]
    BlankSubcategory { category: String },

    #[error("category '{category}' lists subcategory '{subcategory}' twice")]
    DuplicateSubcategory { category: String, subcategory: String },

    #[error("malformed entry for category '{category}': {source}")]
    MalformedEntry {
        category: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Subcategories arrive either as bare names or as `{ "name": ... }` objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum SubcategoryWire {
    Name(String),
    Named { name: String },
}

impl SubcategoryWire {
    fn into_name(self) -> String {
        match self {
            SubcategoryWire::Name(n) | SubcategoryWire::Named { name: n } => n,
        }
    }
}

#[derive(Deserialize)]
struct EntryWire {
    #[serde(default)]
    emoji: String,
    #[serde(default)]
    subcategories: Vec<SubcategoryWire>,
}

#[derive(Serialize)]
struct EntryOut<'a> {
    emoji: &'a str,
    subcategories: &'a [String],
}

/// Validated, ordered set of categories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCatalog {
    categories: Vec<Category>,
}

impl CategoryCatalog {
    /// Validate and build a catalog. Order is preserved.
    pub fn new(categories: Vec<Category>) -> Result<Self, CatalogError> {
        if categories.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for cat in &categories {
            if cat.name.trim().is_empty() {
                return Err(CatalogError::BlankCategory);
            }
            if !seen.insert(cat.name.as_str()) {
                return Err(CatalogError::DuplicateCategory(cat.name.clone()));
            }

            let mut subs = HashSet::new();
            for sub in &cat.subcategories {
                if sub.trim().is_empty() {
                    return Err(CatalogError::BlankSubcategory {
                        category: cat.name.clone(),
                    });
                }
                if !subs.insert(sub.as_str()) {
                    return Err(CatalogError::DuplicateSubcategory {
                        category: cat.name.clone(),
                        subcategory: sub.clone(),
                    });
                }
            }
        }

        Ok(Self { categories })
    }

    /// Ingest the wire mapping. Fails fast on the first malformed entry.
    pub fn from_json(value: Value) -> Result<Self, CatalogError> {
        let Value::Object(map) = value else {
            return Err(CatalogError::NotAnObject);
        };

        let mut categories = Vec::with_capacity(map.len());
        for (name, entry) in map {
            let entry: EntryWire = serde_json::from_value(entry).map_err(|source| {
                CatalogError::MalformedEntry {
                    category: name.clone(),
                    source,
                }
            })?;
            categories.push(Category {
                name,
                glyph: entry.emoji,
                subcategories: entry
                    .subcategories
                    .into_iter()
                    .map(SubcategoryWire::into_name)
                    .collect(),
            });
        }

        Self::new(categories)
    }

    /// Render back to the wire mapping.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for cat in &self.categories {
            let entry = EntryOut {
                emoji: &cat.glyph,
                subcategories: &cat.subcategories,
            };
            // EntryOut only holds strings, serialization cannot fail.
            let value = serde_json::to_value(entry).unwrap_or(Value::Null);
            map.insert(cat.name.clone(), value);
        }
        Value::Object(map)
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_preserves_order() {
        let catalog = CategoryCatalog::from_json(json!({
            "Income": {"emoji": "💰", "subcategories": ["Salary"]},
            "Food": {"emoji": "🍽️", "subcategories": ["Groceries", "Dining"]},
            "Uncategorized Expenses": {"emoji": "❓", "subcategories": []},
        }))
        .unwrap();

        let names: Vec<_> = catalog.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Income", "Food", "Uncategorized Expenses"]);
        assert!(catalog.get("Uncategorized Expenses").unwrap().is_terminal());
        assert!(catalog.get("Food").unwrap().has_subcategory("Dining"));
    }

    #[test]
    fn test_named_subcategories_accepted() {
        let catalog = CategoryCatalog::from_json(json!({
            "Pets": {"emoji": "🐾", "subcategories": [{"name": "Food"}, "Toys"]},
        }))
        .unwrap();
        assert_eq!(catalog.get("Pets").unwrap().subcategories, vec!["Food", "Toys"]);
    }

    #[test]
    fn test_rejects_non_object() {
        let err = CategoryCatalog::from_json(json!(["Food"])).unwrap_err();
        assert!(matches!(err, CatalogError::NotAnObject));
    }

    #[test]
    fn test_rejects_malformed_entry() {
        let err = CategoryCatalog::from_json(json!({
            "Food": {"emoji": "🍽️", "subcategories": "Groceries"},
        }))
        .unwrap_err();
        assert!(matches!(err, CatalogError::MalformedEntry { ref category, .. } if category == "Food"));
    }

    #[test]
    fn test_rejects_duplicate_subcategory() {
        let err = CategoryCatalog::new(vec![Category::new("Food", "🍽️", &["Dining", "Dining"])])
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateSubcategory { .. }));
    }

    #[test]
    fn test_rejects_blank_names() {
        assert!(matches!(
            CategoryCatalog::new(vec![Category::new("  ", "", &[])]).unwrap_err(),
            CatalogError::BlankCategory
        ));
        assert!(matches!(
            CategoryCatalog::new(vec![Category::new("Food", "", &[""])]).unwrap_err(),
            CatalogError::BlankSubcategory { .. }
        ));
    }

    #[test]
    fn test_rejects_empty_catalog() {
        assert!(matches!(
            CategoryCatalog::from_json(json!({})).unwrap_err(),
            CatalogError::Empty
        ));
    }

    #[test]
    fn test_to_json_round_trips_shape() {
        let catalog =
            CategoryCatalog::new(vec![Category::new("Food", "🍽️", &["Dining"])]).unwrap();
        assert_eq!(
            catalog.to_json(),
            json!({"Food": {"emoji": "🍽️", "subcategories": ["Dining"]}})
        );
    }
}
