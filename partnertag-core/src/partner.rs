//! Partner model: a recurring transaction counterparty awaiting a category.
//!
//! Partners are materialized by the backend from uncategorized transactions.
//! The core never mutates them and never interprets the visualization payload.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Amount statistics the single-partner endpoint attaches to a partner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmountStats {
    pub avg: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// A counterparty aggregated from raw transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    /// Unique key across the backlog.
    pub name: String,
    pub transaction_count: u64,
    /// Most frequent free-text memo seen on this partner's transactions.
    pub most_popular_info: String,
    /// Fixes sign polarity: expense mappings and income mappings are kept apart.
    pub is_expense: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<AmountStats>,
    /// Opaque chart payload (base64 PNG). Passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization: Option<String>,
}

impl Partner {
    pub fn new(name: impl Into<String>, is_expense: bool) -> Self {
        Self {
            name: name.into(),
            transaction_count: 0,
            most_popular_info: String::new(),
            is_expense,
            stats: None,
            visualization: None,
        }
    }

    pub fn with_transactions(mut self, count: u64, most_popular_info: impl Into<String>) -> Self {
        self.transaction_count = count;
        self.most_popular_info = most_popular_info.into();
        self
    }

    pub fn with_stats(mut self, stats: AmountStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn kind_label(&self) -> &'static str {
        if self.is_expense { "Expense" } else { "Income" }
    }
}

/// Display-only completion indicator. Never used for control decisions.
///
/// Wire format is `"<categorized>/<total>"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Progress {
    pub categorized: u64,
    pub total: u64,
}

impl Progress {
    pub fn new(categorized: u64, total: u64) -> Self {
        Self { categorized, total }
    }

    /// Percentage in 0..=100. An empty backlog counts as complete.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.categorized as f64 / self.total as f64 * 100.0).min(100.0)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.categorized, self.total)
    }
}

impl FromStr for Progress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (done, total) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| format!("progress '{s}' is not of the form N/M"))?;
        let categorized = done
            .trim()
            .parse()
            .map_err(|e| format!("progress '{s}': bad numerator: {e}"))?;
        let total = total
            .trim()
            .parse()
            .map_err(|e| format!("progress '{s}': bad denominator: {e}"))?;
        Ok(Self { categorized, total })
    }
}

impl TryFrom<String> for Progress {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Progress> for String {
    fn from(p: Progress) -> Self {
        p.to_string()
    }
}

/// One answer from the partner selector.
///
/// An empty `partners` list is the terminal signal: the backlog is exhausted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartnerBatch {
    pub partners: Vec<Partner>,
    pub progress: Progress,
}

impl PartnerBatch {
    pub fn new(partners: Vec<Partner>, progress: Progress) -> Self {
        Self { partners, progress }
    }

    pub fn exhausted(progress: Progress) -> Self {
        Self {
            partners: Vec::new(),
            progress,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.partners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_parse_and_display() {
        let p: Progress = "3/10".parse().unwrap();
        assert_eq!(p, Progress::new(3, 10));
        assert_eq!(p.to_string(), "3/10");
        assert_eq!(p.percent(), 30.0);
    }

    #[test]
    fn test_progress_rejects_garbage() {
        assert!("3 of 10".parse::<Progress>().is_err());
        assert!("x/10".parse::<Progress>().is_err());
    }

    #[test]
    fn test_progress_serde_as_string() {
        let json = serde_json::to_string(&Progress::new(1, 4)).unwrap();
        assert_eq!(json, "\"1/4\"");
        let back: Progress = serde_json::from_str(" \"2/4\"").unwrap();
        assert_eq!(back, Progress::new(2, 4));
    }

    #[test]
    fn test_empty_backlog_is_complete() {
        assert_eq!(Progress::new(0, 0).percent(), 100.0);
    }

    #[test]
    fn test_partner_kind_label() {
        assert_eq!(Partner::new("Acme Corp", true).kind_label(), "Expense");
        assert_eq!(Partner::new("Employer", false).kind_label(), "Income");
    }
}
