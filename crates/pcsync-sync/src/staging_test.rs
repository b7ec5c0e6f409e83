use rust_decimal::Decimal;

use super::*;

fn source_product(value: serde_json::Value) -> SourceProduct {
    serde_json::from_value(value).expect("valid source product")
}

fn keyboard() -> SourceProduct {
    source_product(serde_json::json!({
        "id": 55155,
        "sku": "KB-101",
        "title": "Mechanical\r\nKeyboard ",
        "description": "",
        "body": "<p>RGB</p>",
        "availability": { "stock": 1 },
        "price": { "price": 45.9, "currency": "USD" },
        "extraData": { "brand": "Redragon", "changes": ["stock"] },
        "categories": [{ "title": "Peripherals", "childs": [{ "title": "Keyboards" }] }],
        "images": [{ "variations": [
            { "url": "https://cdn.example.com/a.jpg" },
            { "url": "https://cdn.example.com/b.jpg" }
        ]}]
    }))
}

#[test]
fn snapshot_path_uses_day_month_year() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
    assert_eq!(
        snapshot_path(Path::new("/data"), date),
        PathBuf::from("/data/07_03_2024.csv")
    );
}

#[test]
fn parse_snapshot_date_rejects_anything_but_the_file_format() {
    assert_eq!(
        parse_snapshot_date("07_03_2024"),
        NaiveDate::from_ymd_opt(2024, 3, 7)
    );
    assert!(parse_snapshot_date("2024-03-07").is_none());
    assert!(parse_snapshot_date("7_3_2024").is_none());
    assert!(parse_snapshot_date("../../etc/pa").is_none());
    assert!(parse_snapshot_date("31_02_2024").is_none());
}

#[test]
fn clean_text_collapses_line_breaks_and_fills_blanks() {
    assert_eq!(clean_text(Some("a\r\nb\n")), "a  b");
    assert_eq!(clean_text(Some("   ")), NOT_AVAILABLE);
    assert_eq!(clean_text(None), NOT_AVAILABLE);
}

#[test]
fn stage_products_builds_rows() {
    let rows = stage_products(&[keyboard()]);
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.id, "55155");
    assert_eq!(row.title, "Mechanical  Keyboard");
    assert_eq!(row.brand, "Redragon");
    assert_eq!(row.price, Decimal::new(459, 1));
    assert_eq!(row.changes, "stock");
    assert_eq!(row.barcode, NOT_AVAILABLE);
    assert_eq!(row.category, "Peripherals > Keyboards");
    assert_eq!(row.description, NOT_AVAILABLE);
    assert_eq!(
        row.image_urls,
        "https://cdn.example.com/a.jpg, https://cdn.example.com/b.jpg"
    );
}

#[test]
fn stage_products_skips_stock_only_changes_above_one_unit() {
    let mut plenty = keyboard();
    plenty.availability.stock = 5;
    let mut price_change = plenty.clone();
    price_change.extra_data.changes = vec!["stock".to_owned(), "price".to_owned()];
    let mut sold_out = keyboard();
    sold_out.availability.stock = 0;

    let rows = stage_products(&[plenty, price_change, sold_out]);
    let stocks: Vec<i64> = rows.iter().map(|r| r.stock).collect();
    assert_eq!(stocks, vec![5, 0], "stock-only change with 5 units is dropped");
}

#[test]
fn products_without_categories_are_uncategorized() {
    let mut product = keyboard();
    product.categories.clear();
    assert_eq!(stage_products(&[product])[0].category, UNCATEGORIZED);
}

#[test]
fn snapshot_round_trips_and_sorts_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let path = snapshot_path(dir.path(), NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());

    let mut first = stage_products(&[keyboard()]).remove(0);
    first.id = "900".to_owned();
    let mut second = first.clone();
    second.id = "12".to_owned();
    write_snapshot(&path, &[first, second]).expect("write snapshot");

    let rows = read_snapshot(&path).expect("read snapshot");
    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["12", "900"]);
    assert_eq!(rows[0].price, Decimal::new(459, 1));
    assert_eq!(rows[0].image_url_list().len(), 2);

}

#[test]
fn read_snapshot_skips_malformed_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("07_03_2024.csv");
    std::fs::write(
        &path,
        "ID,SKU,Title,Brand,Stock,Currency,Price,Changes,Barcode,Category,Description,Body,Image_URLs\n\
         3,S,Good,B,2,USD,10.00,price,N/A,C,D,N/A,\n\
         4,S,Bad stock,B,lots,USD,10.00,price,N/A,C,D,N/A,\n\
         1,S,Also good,B,0,USD,5.5,stock,N/A,C,D,N/A,\n",
    )
    .unwrap();

    let rows = read_snapshot(&path).unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);

}

#[test]
fn read_snapshot_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = read_snapshot(&dir.path().join("01_01_2024.csv"));
    assert!(matches!(result, Err(SyncError::SnapshotMissing { .. })));
}

#[test]
fn empty_snapshot_still_has_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("01_01_2024.csv");
    write_snapshot(&path, &[]).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("ID,SKU,Title"));
    assert!(read_snapshot(&path).unwrap().is_empty());
}

#[test]
fn records_type_numeric_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("07_03_2024.csv");
    std::fs::write(
        &path,
        "ID,SKU,Title,Brand,Stock,Currency,Price,Changes,Barcode,Category,Description,Body,Image_URLs\n\
         3,,Good,B,2,USD,10.00,price,N/A,C,D,N/A,\n",
    )
    .unwrap();

    let records = read_snapshot_records(&path).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["ID"], serde_json::json!(3));
    assert_eq!(records[0]["SKU"], Value::String(String::new()));
    assert_eq!(records[0]["Stock"], serde_json::json!(2));
    assert_eq!(records[0]["Price"], serde_json::json!(10.0));
    assert_eq!(records[0]["Barcode"], Value::String("N/A".to_owned()));

}
