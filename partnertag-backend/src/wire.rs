//! Partner payloads as the statement backend serves them.
//!
//! One shape covers both endpoints: `/get_next_partner` adds amount statistics,
//! `/get_next_partners` adds a base64 price distribution chart.

use anyhow::{Result, bail};
use partnertag_core::{AmountStats, Partner, PartnerBatch, Progress};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerPayload {
    pub partner: String,
    #[serde(default)]
    pub transaction_count: u64,
    pub is_expense: bool,
    #[serde(default)]
    pub most_popular_info: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_distribution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
}

impl PartnerPayload {
    pub fn into_partner(self) -> Partner {
        let stats = match (self.avg_amount, self.std_amount, self.min_amount, self.max_amount) {
            (Some(avg), std, Some(min), Some(max)) => Some(AmountStats {
                avg,
                // single-transaction partners come back without a deviation
                std: std.unwrap_or(0.0),
                min,
                max,
            }),
            _ => None,
        };

        Partner {
            name: self.partner,
            transaction_count: self.transaction_count,
            most_popular_info: self.most_popular_info,
            is_expense: self.is_expense,
            stats,
            visualization: self.price_distribution,
        }
    }
}

/// Parse the single-partner response. Anything without a `partner` field
/// (the backend answers `{"message": "All partners categorized"}`) means the
/// backlog is exhausted.
pub fn parse_single(value: Value) -> Result<PartnerBatch> {
    if value.get("partner").is_none() {
        if let Some(msg) = value.get("message").and_then(Value::as_str) {
            tracing::debug!(message = msg, "backlog exhausted");
        }
        return Ok(PartnerBatch::exhausted(Progress::default()));
    }

    let payload: PartnerPayload = serde_json::from_value(value)?;
    let progress = payload.progress.unwrap_or_default();
    Ok(PartnerBatch::new(vec![payload.into_partner()], progress))
}

/// Parse the batch response, keeping at most `size` partners in backend order.
pub fn parse_batch(value: Value, size: usize) -> Result<PartnerBatch> {
    let Value::Array(_) = value else {
        bail!("expected a JSON array of partners");
    };

    let payloads: Vec<PartnerPayload> = serde_json::from_value(value)?;
    let progress = payloads
        .iter()
        .filter_map(|p| p.progress)
        .next()
        .unwrap_or_default();

    if payloads.len() > size {
        tracing::debug!(
            served = payloads.len(),
            size,
            "backend page larger than requested; extra partners will be offered again"
        );
    }

    let partners = payloads
        .into_iter()
        .take(size)
        .map(PartnerPayload::into_partner)
        .collect();
    Ok(PartnerBatch::new(partners, progress))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_partner_with_stats() {
        let batch = parse_single(json!({
            "partner": "Rimi",
            "avg_amount": -23.5,
            "std_amount": 4.1,
            "max_amount": -12.0,
            "min_amount": -40.0,
            "transaction_count": 17,
            "is_expense": true,
            "most_popular_info": "Groceries",
            "progress": "3/20"
        }))
        .unwrap();

        assert_eq!(batch.progress, Progress::new(3, 20));
        let p = &batch.partners[0];
        assert_eq!(p.name, "Rimi");
        assert_eq!(p.transaction_count, 17);
        assert_eq!(p.stats.unwrap().min, -40.0);
    }

    #[test]
    fn test_single_partner_sentinel_means_exhausted() {
        let batch = parse_single(json!({"message": "All partners categorized"})).unwrap();
        assert!(batch.is_exhausted());
    }

    #[test]
    fn test_batch_keeps_order_and_truncates() {
        let batch = parse_batch(
            json!([
                {"partner": "B", "transaction_count": 9, "is_expense": true,
                 "most_popular_info": "", "price_distribution": "iVBOR", "progress": "0/3"},
                {"partner": "A", "transaction_count": 4, "is_expense": false,
                 "most_popular_info": "", "progress": "0/3"},
                {"partner": "C", "transaction_count": 1, "is_expense": true,
                 "most_popular_info": "", "progress": "0/3"},
            ]),
            2,
        )
        .unwrap();

        let names: Vec<_> = batch.partners.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(batch.partners[0].visualization.as_deref(), Some("iVBOR"));
        assert_eq!(batch.progress, Progress::new(0, 3));
    }

    #[test]
    fn test_empty_batch_is_exhausted() {
        assert!(parse_batch(json!([]), 10).unwrap().is_exhausted());
    }

    #[test]
    fn test_batch_rejects_object() {
        assert!(parse_batch(json!({"message": "nope"}), 10).is_err());
    }

    #[test]
    fn test_bad_progress_is_an_error() {
        assert!(parse_single(json!({"partner": "X", "is_expense": true, "progress": "soon"})).is_err());
    }
}
