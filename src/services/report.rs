use rust_xlsxwriter::{Workbook, Worksheet};

use crate::error::{ReportError, SessionError};
use crate::models::{AggregationRow, GlobalStats, SourceTable, TaggedRow};

/// Each source occupies a fixed-width block of 4 output columns: name,
/// quantity, price, spacer. The filename label sits at row 0, data from
/// row 3. Fixed offsets keep the sources visually comparable side by side.
const BLOCK_WIDTH: u16 = 4;
const DATA_START_ROW: u32 = 3;

/// Lay the session's tables out side by side in a single-sheet workbook,
/// one column block per source in upload order, row order preserved.
pub fn build_combined(tables: &[SourceTable]) -> Result<Vec<u8>, ReportError> {
    if tables.is_empty() {
        return Err(SessionError::EmptySession.into());
    }

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (block, table) in tables.iter().enumerate() {
        let base = block as u16 * BLOCK_WIDTH;
        sheet.write_string(0, base, &table.source_id)?;
        for (i, row) in table.rows.iter().enumerate() {
            let r = DATA_START_ROW + i as u32;
            sheet.write_string(r, base, &row.item_name)?;
            sheet.write_number(r, base + 1, row.quantity)?;
            sheet.write_number(r, base + 2, row.price)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Render the aggregation output as a three-sheet workbook: per-item
/// summary, the tagged union of all rows, and the global statistics.
pub fn build_detailed(
    summary: &[AggregationRow],
    union: &[TaggedRow],
    stats: &GlobalStats,
) -> Result<Vec<u8>, ReportError> {
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Summary")?;
    write_header(
        sheet,
        &[
            "Item",
            "Min Price",
            "Max Price",
            "Mean Price",
            "Offers",
            "Sources",
            "Cheapest Source",
            "Most Expensive Source",
        ],
    )?;
    for (i, row) in summary.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_string(r, 0, &row.item_name)?;
        sheet.write_number(r, 1, row.min_price)?;
        sheet.write_number(r, 2, row.max_price)?;
        sheet.write_number(r, 3, row.mean_price)?;
        sheet.write_number(r, 4, row.offer_count as f64)?;
        sheet.write_string(r, 5, row.contributing_sources.join(", "))?;
        sheet.write_string(r, 6, &row.min_source_id)?;
        sheet.write_string(r, 7, &row.max_source_id)?;
    }

    let sheet = workbook.add_worksheet();
    sheet.set_name("All Data")?;
    write_header(sheet, &["Item", "Quantity", "Price", "Source"])?;
    for (i, row) in union.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_string(r, 0, &row.item_name)?;
        sheet.write_number(r, 1, row.quantity)?;
        sheet.write_number(r, 2, row.price)?;
        sheet.write_string(r, 3, &row.source_id)?;
    }

    let sheet = workbook.add_worksheet();
    sheet.set_name("Statistics")?;
    write_header(sheet, &["Metric", "Value"])?;
    let metrics: [(&str, f64); 4] = [
        ("Total items", stats.total_items as f64),
        ("Items with a single offer", stats.single_offer_items as f64),
        ("Mean price spread", stats.mean_spread),
        ("Max price spread", stats.max_spread),
    ];
    for (i, (label, value)) in metrics.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_string(r, 0, *label)?;
        sheet.write_number(r, 1, *value)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_header(sheet: &mut Worksheet, columns: &[&str]) -> Result<(), ReportError> {
    for (c, name) in columns.iter().enumerate() {
        sheet.write_string(0, c as u16, *name)?;
    }
    Ok(())
}
