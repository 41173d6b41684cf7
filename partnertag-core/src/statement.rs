//! Statement summary returned by upload and insights.
//!
//! Aggregation happens in the backend. We type the headline numbers so a host
//! can print them and keep everything else (charts, breakdowns) as raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementSummary {
    #[serde(default)]
    pub total_transactions: Option<u64>,
    #[serde(default)]
    pub total_income: Option<f64>,
    #[serde(default)]
    pub total_expenses: Option<f64>,
    #[serde(default)]
    pub net_balance: Option<f64>,
    #[serde(default)]
    pub avg_transaction: Option<f64>,
    #[serde(default)]
    pub largest_expense: Option<f64>,
    #[serde(default)]
    pub largest_income: Option<f64>,
    /// Fraction in 0..=1.
    #[serde(default)]
    pub expense_ratio: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StatementSummary {
    /// Headline rows as `(label, formatted value)`, skipping absent fields.
    pub fn headline(&self) -> Vec<(&'static str, String)> {
        let money = |v: f64| format!("€{}", format_grouped(v));
        let mut rows = Vec::new();
        if let Some(n) = self.total_transactions {
            rows.push(("Total Transactions", n.to_string()));
        }
        let amounts = [
            ("Total Income", self.total_income),
            ("Total Expenses", self.total_expenses),
            ("Net Balance", self.net_balance),
            ("Average Transaction", self.avg_transaction),
            ("Largest Expense", self.largest_expense),
            ("Largest Income", self.largest_income),
        ];
        for (label, value) in amounts {
            if let Some(v) = value {
                rows.push((label, money(v)));
            }
        }
        if let Some(r) = self.expense_ratio {
            rows.push(("Expense Ratio", format!("{:.2}%", r * 100.0)));
        }
        rows
    }
}

/// Two decimals, thousands separated by spaces: `1234567.8` -> `1 234 567.80`.
pub fn format_grouped(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{dec_part}")
}
