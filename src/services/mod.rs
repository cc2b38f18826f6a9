pub mod aggregate;
pub mod audit;
pub mod fetch;
pub mod normalizer;
pub mod report;
pub mod session;

#[cfg(test)]
mod pipeline_tests {
    //! Full pipeline: raw workbooks in, combined and detailed workbooks out.

    use super::{aggregate, normalizer, report, session::SessionManager};
    use bytes::Bytes;
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use rust_xlsxwriter::Workbook;
    use std::io::Cursor;

    fn price_list(header: &[&str], rows: &[(&str, f64, f64)]) -> Bytes {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (c, name) in header.iter().enumerate() {
            sheet.write_string(0, c as u16, *name).unwrap();
        }
        for (r, (name, quantity, price)) in rows.iter().enumerate() {
            let r = r as u32 + 1;
            sheet.write_string(r, 0, *name).unwrap();
            sheet.write_number(r, 1, *quantity).unwrap();
            sheet.write_number(r, 2, *price).unwrap();
        }
        Bytes::from(workbook.save_to_buffer().unwrap())
    }

    #[test]
    fn upload_report_and_detailed_analysis() {
        let sessions = SessionManager::new(10);
        let user = 99;

        let source_a = price_list(&["Товар", "Количество", "Цена"], &[("Bread", 1.0, 50.0)]);
        let source_b = price_list(
            &["Product", "Qty", "Price"],
            &[("Bread", 2.0, 70.0), ("Milk", 1.0, 30.0)],
        );

        let rows_a = normalizer::normalize(source_a, "xlsx").unwrap();
        let rows_b = normalizer::normalize(source_b, "xlsx").unwrap();
        sessions.add_source(user, "a.xlsx".to_string(), rows_a).unwrap();
        sessions.add_source(user, "b.xlsx".to_string(), rows_b).unwrap();

        // Combined report consumes the session.
        let tables = sessions.consume(user).unwrap();
        let combined = report::build_combined(&tables).unwrap();
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(combined)).unwrap();
        let sheets = workbook.sheet_names().to_vec();
        let range = workbook.worksheet_range(&sheets[0]).unwrap();
        assert_eq!(
            range.get_value((0, 0)),
            Some(&Data::String("a.xlsx".to_string()))
        );
        assert_eq!(
            range.get_value((0, 4)),
            Some(&Data::String("b.xlsx".to_string()))
        );
        assert_eq!(
            range.get_value((4, 4)),
            Some(&Data::String("Milk".to_string()))
        );

        // Detailed analysis runs off the one-shot raw snapshot.
        let snapshot = sessions.take_raw_snapshot(user).unwrap();
        let (summary, union, stats) = aggregate::aggregate(&snapshot).unwrap();

        assert_eq!(summary.len(), 2);
        let bread = &summary[0];
        assert_eq!(bread.item_name, "Bread");
        assert_eq!(bread.min_price, 50.0);
        assert_eq!(bread.max_price, 70.0);
        assert_eq!(bread.mean_price, 60.0);
        assert_eq!(bread.min_source_id, "a.xlsx");
        assert_eq!(bread.max_source_id, "b.xlsx");

        assert_eq!(union.len(), 3);
        assert_eq!(stats.total_items, 2);
        assert_eq!(stats.single_offer_items, 1);
        assert_eq!(stats.mean_spread, 10.0);
        assert_eq!(stats.max_spread, 20.0);

        let detailed = report::build_detailed(&summary, &union, &stats).unwrap();
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(detailed)).unwrap();
        assert_eq!(
            workbook.sheet_names().to_vec(),
            vec!["Summary", "All Data", "Statistics"]
        );

        // The snapshot was one-shot; the session is fully drained.
        assert!(sessions.take_raw_snapshot(user).is_err());
        assert_eq!(sessions.count(user), 0);
    }
}
