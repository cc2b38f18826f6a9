use serde::Serialize;

/// One row of a price list after normalization. `item_name` is trimmed and
/// non-empty; `quantity` defaults to 0 when the source has no quantity column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub item_name: String,
    pub quantity: f64,
    pub price: f64,
}

/// One uploaded price list. `source_id` is derived from the original
/// filename; row order is preserved verbatim from the source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceTable {
    pub source_id: String,
    pub rows: Vec<NormalizedRow>,
}

/// A normalized row tagged with its originating source, as it appears in
/// the flat union the aggregation engine works over.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedRow {
    pub source_id: String,
    pub item_name: String,
    pub quantity: f64,
    pub price: f64,
}

/// Per-item summary across all sources in a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationRow {
    pub item_name: String,
    pub min_price: f64,
    pub max_price: f64,
    pub mean_price: f64,
    pub offer_count: usize,
    /// One entry per contributing row, in union order. Not deduplicated.
    pub contributing_sources: Vec<String>,
    pub min_source_id: String,
    pub max_source_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalStats {
    pub total_items: usize,
    pub single_offer_items: usize,
    pub mean_spread: f64,
    pub max_spread: f64,
}
