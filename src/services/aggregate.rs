use std::collections::HashMap;

use crate::error::SessionError;
use crate::models::{AggregationRow, GlobalStats, SourceTable, TaggedRow};

/// Cross-source aggregation: union all rows in upload order, group by exact
/// post-trim item name (case-sensitive, no fuzzy matching), and compute
/// per-item price statistics plus seller attribution for the extremal
/// prices. Summary rows come out in first-occurrence order of each item.
pub fn aggregate(
    tables: &[SourceTable],
) -> Result<(Vec<AggregationRow>, Vec<TaggedRow>, GlobalStats), SessionError> {
    let union: Vec<TaggedRow> = tables
        .iter()
        .flat_map(|table| {
            table.rows.iter().map(|row| TaggedRow {
                source_id: table.source_id.clone(),
                item_name: row.item_name.clone(),
                quantity: row.quantity,
                price: row.price,
            })
        })
        .collect();

    if union.is_empty() {
        return Err(SessionError::EmptySession);
    }

    // Group union indices by item name, remembering first-occurrence order.
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, row) in union.iter().enumerate() {
        groups
            .entry(row.item_name.clone())
            .or_insert_with(|| {
                order.push(row.item_name.clone());
                Vec::new()
            })
            .push(idx);
    }

    let mut summary = Vec::with_capacity(order.len());
    for item_name in order {
        let indices = &groups[&item_name];

        // Strict comparisons keep the first occurrence in union order on a
        // tie at the extremal price.
        let mut min_idx = indices[0];
        let mut max_idx = indices[0];
        let mut sum = 0.0;
        for &idx in indices {
            let price = union[idx].price;
            sum += price;
            if price < union[min_idx].price {
                min_idx = idx;
            }
            if price > union[max_idx].price {
                max_idx = idx;
            }
        }

        summary.push(AggregationRow {
            min_price: union[min_idx].price,
            max_price: union[max_idx].price,
            mean_price: sum / indices.len() as f64,
            offer_count: indices.len(),
            contributing_sources: indices.iter().map(|&i| union[i].source_id.clone()).collect(),
            min_source_id: union[min_idx].source_id.clone(),
            max_source_id: union[max_idx].source_id.clone(),
            item_name,
        });
    }

    let mut spread_sum = 0.0;
    let mut max_spread = 0.0;
    let mut single_offer_items = 0;
    for row in &summary {
        let spread = row.max_price - row.min_price;
        spread_sum += spread;
        if spread > max_spread {
            max_spread = spread;
        }
        if row.offer_count == 1 {
            single_offer_items += 1;
        }
    }

    let stats = GlobalStats {
        total_items: summary.len(),
        single_offer_items,
        mean_spread: spread_sum / summary.len() as f64,
        max_spread,
    };

    Ok((summary, union, stats))
}
