use std::io::{Cursor, Read, Seek};

use bytes::Bytes;
use calamine::{open_workbook_from_rs, Data, Ods, Range, Reader, Xls, Xlsb, Xlsx};

use crate::error::SchemaError;
use crate::models::NormalizedRow;

/// Extensions the transport accepts. The declared extension only selects a
/// parsing strategy; the bytes themselves decide whether parsing succeeds.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm", "xlsb", "ods"];

/// Header keywords for column detection, matched case-insensitively as
/// substrings. Russian tokens match the price lists the service was built
/// for; English tokens cover everything else.
const NAME_KEYWORDS: &[&str] = &[
    "name", "title", "product", "item", "наименование", "название", "товар",
];
const PRICE_KEYWORDS: &[&str] = &["price", "cost", "цена", "стоимость"];
const QUANTITY_KEYWORDS: &[&str] = &["quantity", "qty", "количество"];

/// Normalize one raw price list into {item_name, quantity, price} rows.
///
/// The first row is treated as the header. The leftmost column whose header
/// contains a name keyword becomes the name column, likewise for price;
/// both must exist or the whole source is rejected. A quantity column is
/// optional and defaults to 0. Rows whose name trims to empty or whose
/// price cell cannot be coerced to a number are dropped with a warning.
pub fn normalize(file_data: Bytes, extension: &str) -> Result<Vec<NormalizedRow>, SchemaError> {
    let range = read_first_sheet(file_data, extension)?;
    let mut rows = range.rows();

    let header = rows
        .next()
        .ok_or_else(|| SchemaError::UnreadableSource("sheet contains no rows".to_string()))?;
    let headers: Vec<String> = header
        .iter()
        .map(|cell| cell.to_string().trim().to_lowercase())
        .collect();

    let name_idx = find_column(&headers, NAME_KEYWORDS)
        .ok_or(SchemaError::MissingRequiredColumn("name"))?;
    let price_idx = find_column(&headers, PRICE_KEYWORDS)
        .ok_or(SchemaError::MissingRequiredColumn("price"))?;
    let quantity_idx = find_column(&headers, QUANTITY_KEYWORDS);

    let mut normalized = Vec::new();
    let mut dropped = 0usize;
    for row in rows {
        let name = row
            .get(name_idx)
            .map(|cell| cell.to_string())
            .unwrap_or_default();
        let name = name.trim();
        let price = row.get(price_idx).and_then(coerce_numeric);

        match (name.is_empty(), price) {
            (false, Some(price)) => {
                let quantity = quantity_idx
                    .and_then(|idx| row.get(idx))
                    .and_then(coerce_numeric)
                    .map(|q| q.max(0.0))
                    .unwrap_or(0.0);
                normalized.push(NormalizedRow {
                    item_name: name.to_string(),
                    quantity,
                    price,
                });
            }
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::warn!("Dropped {} rows without a usable name or price", dropped);
    }

    Ok(normalized)
}

/// Leftmost header containing any keyword wins. Deliberately not a ranking.
fn find_column(headers: &[String], keywords: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|header| keywords.iter().any(|kw| header.contains(kw)))
}

fn coerce_numeric(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        // Price lists in the wild carry comma decimal separators.
        Data::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }
}

fn read_first_sheet(file_data: Bytes, extension: &str) -> Result<Range<Data>, SchemaError> {
    let cursor = Cursor::new(file_data);
    match extension.to_ascii_lowercase().as_str() {
        "xls" => first_range::<_, Xls<_>>(cursor),
        "xlsb" => first_range::<_, Xlsb<_>>(cursor),
        "ods" => first_range::<_, Ods<_>>(cursor),
        // xlsx and xlsm share the reader; unknown extensions get the same
        // attempt and fail as UnreadableSource if the bytes disagree.
        _ => first_range::<_, Xlsx<_>>(cursor),
    }
}

fn first_range<RS, R>(rs: RS) -> Result<Range<Data>, SchemaError>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let mut workbook: R = open_workbook_from_rs(rs)
        .map_err(|e| SchemaError::UnreadableSource(format!("failed to open workbook: {}", e)))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let sheet = sheet_names
        .first()
        .cloned()
        .ok_or_else(|| SchemaError::UnreadableSource("workbook has no sheets".to_string()))?;

    workbook
        .worksheet_range(&sheet)
        .map_err(|e| SchemaError::UnreadableSource(format!("failed to read worksheet: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn sheet_bytes(rows: &[&[&str]]) -> Bytes {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if let Ok(num) = cell.parse::<f64>() {
                    sheet.write_number(r as u32, c as u16, num).unwrap();
                } else {
                    sheet.write_string(r as u32, c as u16, *cell).unwrap();
                }
            }
        }
        Bytes::from(workbook.save_to_buffer().unwrap())
    }

    #[test]
    fn detects_columns_by_keyword_anywhere_in_header() {
        let data = sheet_bytes(&[
            &["Код", "Наименование товара", "Розничная цена"],
            &["1", "Хлеб", "50"],
            &["2", "Молоко", "30.5"],
        ]);

        let rows = normalize(data, "xlsx").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].item_name, "Хлеб");
        assert_eq!(rows[0].quantity, 0.0);
        assert_eq!(rows[0].price, 50.0);
        assert_eq!(rows[1].price, 30.5);
    }

    #[test]
    fn english_headers_and_quantity_column() {
        let data = sheet_bytes(&[
            &["Product Name", "Qty", "Unit Price"],
            &["Bread", "3", "50"],
        ]);

        let rows = normalize(data, "xlsx").unwrap();
        assert_eq!(
            rows,
            vec![NormalizedRow {
                item_name: "Bread".to_string(),
                quantity: 3.0,
                price: 50.0,
            }]
        );
    }

    #[test]
    fn leftmost_matching_column_wins() {
        let data = sheet_bytes(&[
            &["Price A", "Price B", "Name"],
            &["10", "20", "Widget"],
        ]);

        let rows = normalize(data, "xlsx").unwrap();
        assert_eq!(rows[0].price, 10.0);
    }

    #[test]
    fn missing_price_column_is_rejected_wholesale() {
        let data = sheet_bytes(&[&["Name", "Amount"], &["Bread", "50"]]);

        match normalize(data, "xlsx") {
            Err(SchemaError::MissingRequiredColumn(which)) => assert_eq!(which, "price"),
            other => panic!("expected MissingRequiredColumn, got {:?}", other),
        }
    }

    #[test]
    fn missing_name_column_is_rejected_wholesale() {
        let data = sheet_bytes(&[&["Код", "Цена"], &["1", "50"]]);

        match normalize(data, "xlsx") {
            Err(SchemaError::MissingRequiredColumn(which)) => assert_eq!(which, "name"),
            other => panic!("expected MissingRequiredColumn, got {:?}", other),
        }
    }

    #[test]
    fn garbage_bytes_are_unreadable() {
        let data = Bytes::from_static(b"this is not a workbook");
        assert!(matches!(
            normalize(data, "xlsx"),
            Err(SchemaError::UnreadableSource(_))
        ));
    }

    #[test]
    fn rows_without_usable_price_or_name_are_dropped() {
        let data = sheet_bytes(&[
            &["Name", "Price"],
            &["Bread", "50"],
            &["", "60"],
            &["Milk", "n/a"],
            &["Eggs", "70,5"],
        ]);

        let rows = normalize(data, "xlsx").unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.item_name.as_str()).collect();
        assert_eq!(names, vec!["Bread", "Eggs"]);
        assert_eq!(rows[1].price, 70.5);
    }

    #[test]
    fn item_names_are_trimmed() {
        let data = sheet_bytes(&[&["Name", "Price"], &["  Bread  ", "50"]]);

        let rows = normalize(data, "xlsx").unwrap();
        assert_eq!(rows[0].item_name, "Bread");
    }
}
