#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::fetch::FetchErrorKind;
use serde_json::json;
use tempfile::tempdir;

fn record(value: serde_json::Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

fn orders(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            record(json!({
                "DocNum": i,
                "CardCode": format!("C{i:03}"),
                "DocTotal": 10.5 + i as f64,
                "Paid": i % 2 == 0,
            }))
        })
        .collect()
}

#[test]
fn uniform_records_round_trip_with_header_order() {
    let dir = tempdir().unwrap();
    let builder = ReportBuilder::new(dir.path());
    let records = orders(5);

    let report = builder
        .build("Orders Data", ReportData::Records(&records), "orders.xlsx")
        .unwrap();
    let rows = read_rows(&report.path).unwrap();

    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0], vec!["DocNum", "CardCode", "DocTotal", "Paid"]);
    assert_eq!(rows[1], vec!["0", "C000", "10.5", "true"]);
    assert_eq!(rows[5], vec!["4", "C004", "14.5", "true"]);
    assert_eq!(report.title, "Orders Data");
    assert_eq!(report.rows.len(), 6);
}

#[test]
fn empty_dataset_writes_placeholder_row() {
    let dir = tempdir().unwrap();
    let report = ReportBuilder::new(dir.path())
        .build("Vouchers Data", ReportData::Records(&[]), "empty.xlsx")
        .unwrap();

    let rows = read_rows(&report.path).unwrap();
    assert_eq!(rows, vec![vec![NO_DATA_PLACEHOLDER.to_string()]]);
}

#[test]
fn empty_first_record_writes_placeholder_row() {
    let dir = tempdir().unwrap();
    let records = vec![
        record(json!({})),
        record(json!({"DocNum": 1, "CardCode": "C1"})),
    ];

    let report = ReportBuilder::new(dir.path())
        .build("Orders Data", ReportData::Records(&records), "keyless.xlsx")
        .unwrap();

    let rows = read_rows(&report.path).unwrap();
    assert_eq!(rows, vec![vec![NO_DATA_PLACEHOLDER.to_string()]]);
    assert_eq!(report.rows.len(), 1);
}

#[test]
fn failure_writes_single_details_cell() {
    let dir = tempdir().unwrap();
    let failure = FetchError {
        kind: FetchErrorKind::Timeout,
        message: "Request timed out while fetching orders data".into(),
        details: crate::fetch::TIMEOUT_DETAILS.into(),
        context: None,
    };
    let result: FetchResult = Err(failure);

    let report = ReportBuilder::new(dir.path())
        .build("Orders Data", ReportData::from(&result), "failed.xlsx")
        .unwrap();

    let rows = read_rows(&report.path).unwrap();
    assert_eq!(rows, vec![vec![crate::fetch::TIMEOUT_DETAILS.to_string()]]);
}

#[test]
fn heterogeneous_records_follow_first_record_headers() {
    let records = vec![
        record(json!({"A": 1, "B": "x"})),
        record(json!({"B": "y", "C": true})),
        record(json!({"A": null, "B": {"nested": [1, 2]}})),
    ];

    let rows = sheet_rows(ReportData::Records(&records));

    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0], vec![Cell::Text("A".into()), Cell::Text("B".into())]);
    // Missing key and keys outside the header are dropped to empty
    assert_eq!(rows[2], vec![Cell::Empty, Cell::Text("y".into())]);
    assert_eq!(
        rows[3],
        vec![Cell::Empty, Cell::Text(r#"{"nested":[1,2]}"#.into())]
    );
}

#[test]
fn long_titles_are_truncated() {
    let dir = tempdir().unwrap();
    let title = "A very long sheet title that Excel would reject";
    let report = ReportBuilder::new(dir.path())
        .build(title, ReportData::Records(&[]), "long.xlsx")
        .unwrap();
    assert_eq!(report.title.chars().count(), MAX_SHEET_NAME_LEN);
}

#[test]
fn path_is_absolute_and_inside_output_dir() {
    let dir = tempdir().unwrap();
    let report = ReportBuilder::new(dir.path().join("nested"))
        .build("Orders Data", ReportData::Records(&orders(1)), "abs.xlsx")
        .unwrap();

    assert!(report.path.is_absolute());
    assert!(report.path.exists());
    assert!(report.path.starts_with(dir.path()));
    assert_eq!(report.file_name(), "abs.xlsx");
}

#[test]
fn file_names_with_paths_are_rejected() {
    let dir = tempdir().unwrap();
    let err = ReportBuilder::new(dir.path())
        .build("Orders Data", ReportData::Records(&[]), "../escape.xlsx")
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn attachment_carries_file_bytes_and_remove_deletes() {
    let dir = tempdir().unwrap();
    let report = ReportBuilder::new(dir.path())
        .build("Orders Data", ReportData::Records(&orders(2)), "att.xlsx")
        .unwrap();

    let attachment = report.to_attachment().await.unwrap();
    assert_eq!(attachment.filename, "att.xlsx");
    assert_eq!(attachment.content, std::fs::read(&report.path).unwrap());
    assert_eq!(&attachment.content[..2], b"PK");

    report.remove().await.unwrap();
    assert!(!report.path.exists());
    assert!(matches!(report.remove().await, Err(Error::Report(_))));
}
