//! Category-selection state machine.
//!
//! ```text
//! Browsing --(category with subcategories)--> DrillingIn(category)
//! Browsing --(terminal category)-----------> Committing(category, None)
//! DrillingIn --(subcategory)---------------> Committing(category, Some(sub))
//! DrillingIn --(back)----------------------> Browsing
//! Committing --(recorded + persisted)------> Browsing   (driven by the flow)
//! ```
//!
//! A category without subcategories is always terminal: choosing it never
//! enters `DrillingIn`, whatever state the machine is in.

use crate::catalog::CategoryCatalog;
use crate::error::FlowError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SelectionState {
    #[default]
    Browsing,
    DrillingIn {
        category: String,
    },
    Committing {
        category: String,
        subcategory: Option<String>,
    },
}

/// What a selection action asks the flow to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionStep {
    /// Show the subcategories of this category.
    DrilledIn { category: String },
    /// A terminal choice was made; hand it to the recorder.
    Commit {
        category: String,
        subcategory: Option<String>,
    },
}

impl SelectionState {
    pub fn is_committing(&self) -> bool {
        matches!(self, SelectionState::Committing { .. })
    }

    /// Pick a top-level category.
    pub fn choose_category(
        &mut self,
        catalog: &CategoryCatalog,
        name: &str,
    ) -> Result<SelectionStep, FlowError> {
        if self.is_committing() {
            return Err(FlowError::CommitPending);
        }
        let category = catalog
            .get(name)
            .ok_or_else(|| FlowError::InvalidSelection(format!("unknown category '{name}'")))?;

        if category.is_terminal() {
            *self = SelectionState::Committing {
                category: category.name.clone(),
                subcategory: None,
            };
            return Ok(SelectionStep::Commit {
                category: category.name.clone(),
                subcategory: None,
            });
        }

        *self = SelectionState::DrillingIn {
            category: category.name.clone(),
        };
        Ok(SelectionStep::DrilledIn {
            category: category.name.clone(),
        })
    }

    /// Pick a subcategory of the category currently drilled into.
    pub fn choose_subcategory(
        &mut self,
        catalog: &CategoryCatalog,
        name: &str,
    ) -> Result<SelectionStep, FlowError> {
        let parent = match self {
            SelectionState::DrillingIn { category } => category.clone(),
            SelectionState::Committing { .. } => return Err(FlowError::CommitPending),
            SelectionState::Browsing => {
                return Err(FlowError::InvalidSelection(
                    "choose a category before a subcategory".to_string(),
                ));
            }
        };

        let known = catalog
            .get(&parent)
            .map(|c| c.has_subcategory(name))
            .unwrap_or(false);
        if !known {
            return Err(FlowError::InvalidSelection(format!(
                "'{name}' is not a subcategory of '{parent}'"
            )));
        }

        *self = SelectionState::Committing {
            category: parent.clone(),
            subcategory: Some(name.to_string()),
        };
        Ok(SelectionStep::Commit {
            category: parent,
            subcategory: Some(name.to_string()),
        })
    }

    /// Leave the subcategory grid.
    pub fn back(&mut self) -> Result<(), FlowError> {
        match self {
            SelectionState::DrillingIn { .. } => {
                *self = SelectionState::Browsing;
                Ok(())
            }
            SelectionState::Committing { .. } => Err(FlowError::CommitPending),
            SelectionState::Browsing => Err(FlowError::InvalidSelection(
                "already browsing top-level categories".to_string(),
            )),
        }
    }

    pub fn reset(&mut self) {
        *self = SelectionState::Browsing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Category;

    fn catalog() -> CategoryCatalog {
        CategoryCatalog::new(vec![
            Category::new("Food", "🍽️", &["Groceries", "Dining"]),
            Category::new("Uncategorized Expenses", "❓", &[]),
        ])
        .unwrap()
    }

    #[test]
    fn test_category_with_subcategories_drills_in() {
        let mut s = SelectionState::default();
        let step = s.choose_category(&catalog(), "Food").unwrap();
        assert_eq!(step, SelectionStep::DrilledIn { category: "Food".into() });
        assert_eq!(s, SelectionState::DrillingIn { category: "Food".into() });
    }

    #[test]
    fn test_terminal_category_never_drills_in() {
        let mut s = SelectionState::default();
        let step = s.choose_category(&catalog(), "Uncategorized Expenses").unwrap();
        assert!(matches!(step, SelectionStep::Commit { subcategory: None, .. }));
        assert!(s.is_committing());
    }

    #[test]
    fn test_terminal_category_from_drilling_in_commits() {
        let mut s = SelectionState::DrillingIn { category: "Food".into() };
        s.choose_category(&catalog(), "Uncategorized Expenses").unwrap();
        assert_eq!(
            s,
            SelectionState::Committing {
                category: "Uncategorized Expenses".into(),
                subcategory: None
            }
        );
    }

    #[test]
    fn test_subcategory_commits() {
        let mut s = SelectionState::DrillingIn { category: "Food".into() };
        let step = s.choose_subcategory(&catalog(), "Dining").unwrap();
        assert_eq!(
            step,
            SelectionStep::Commit {
                category: "Food".into(),
                subcategory: Some("Dining".into())
            }
        );
    }

    #[test]
    fn test_foreign_subcategory_rejected_without_state_change() {
        let mut s = SelectionState::DrillingIn { category: "Food".into() };
        let err = s.choose_subcategory(&catalog(), "Salary").unwrap_err();
        assert!(matches!(err, FlowError::InvalidSelection(_)));
        assert_eq!(s, SelectionState::DrillingIn { category: "Food".into() });
    }

    #[test]
    fn test_subcategory_from_browsing_rejected() {
        let mut s = SelectionState::Browsing;
        assert!(s.choose_subcategory(&catalog(), "Dining").is_err());
        assert_eq!(s, SelectionState::Browsing);
    }

    #[test]
    fn test_back_returns_to_browsing() {
        let mut s = SelectionState::DrillingIn { category: "Food".into() };
        s.back().unwrap();
        assert_eq!(s, SelectionState::Browsing);
        assert!(s.back().is_err());
    }

    #[test]
    fn test_committing_blocks_new_choices() {
        let mut s = SelectionState::Committing {
            category: "Food".into(),
            subcategory: Some("Dining".into()),
        };
        assert!(matches!(
            s.choose_category(&catalog(), "Food").unwrap_err(),
            FlowError::CommitPending
        ));
        assert!(matches!(s.back().unwrap_err(), FlowError::CommitPending));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let mut s = SelectionState::Browsing;
        assert!(matches!(
            s.choose_category(&catalog(), "Nope").unwrap_err(),
            FlowError::InvalidSelection(_)
        ));
    }
}
