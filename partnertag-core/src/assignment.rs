//! The (partner, category, subcategory) triple handed to the recorder.

use serde::{Deserialize, Serialize};

use crate::partner::Partner;

/// One categorization decision. Serializes to the `/categorize` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizationAssignment {
    pub partner: String,
    pub category: String,
    /// Equals `category` when the user picked a terminal category.
    pub subcategory: String,
    pub is_expense: bool,
}

impl CategorizationAssignment {
    pub fn new(partner: &Partner, category: impl Into<String>, subcategory: Option<String>) -> Self {
        let category = category.into();
        let subcategory = subcategory.unwrap_or_else(|| category.clone());
        Self {
            partner: partner.name.clone(),
            category,
            subcategory,
            is_expense: partner.is_expense,
        }
    }

    /// Value stored in the persisted mapping table.
    pub fn mapping_label(&self) -> String {
        format!("{} - {}", self.category, self.subcategory)
    }
}
