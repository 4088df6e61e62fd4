use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::models::partner::Partner;

/// Aggregate usage figures from `GET /logistics/analytics/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsSummary {
    #[serde(default)]
    pub total_files: u64,
    #[serde(default)]
    pub avg_delta: f64,
    #[serde(default)]
    pub top_partner: Option<String>,
}

/// Lookup axes of a partner's rate table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PricingMetadata {
    #[serde(default)]
    pub routes: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub weights: Vec<String>,
}

/// Query string for `GET /logistics/pricing/`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct PriceQuery {
    #[garde(skip)]
    pub partner: Partner,

    #[garde(length(min = 1, max = 200))]
    pub route: String,

    #[garde(length(min = 1, max = 200))]
    pub category: String,

    #[garde(length(min = 1, max = 50))]
    pub weight_class: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    pub price: f64,
}
