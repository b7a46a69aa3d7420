//! Export merger: combines processed receipts into one summary plus a flat
//! item list, then serializes to CSV, JSON, or Excel bytes.
//!
//! Every format reproduces the same logical rows in the same order as
//! `combined_items`; only the serialization differs.

use chrono::Utc;
use reciva_core::models::{
    CombinedItem, ExportFormat, ExportSummary, MergedExport, Receipt,
};
use reciva_core::AppError;
use rust_decimal::Decimal;
use rust_xlsxwriter::Workbook;

const CSV_HEADER: [&str; 7] = [
    "Receipt #",
    "Merchant",
    "Date",
    "Item Description",
    "Amount",
    "Category",
    "File Name",
];

/// A rendered export ready to be sent to the client.
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

/// Flatten receipts (paired with their source file names) into a
/// [`MergedExport`], preserving batch order. Receipt numbers are 1-based and
/// assigned in input order; a receipt with no items contributes to the
/// summary but adds no rows.
pub fn merge_receipts(receipts: &[(String, Receipt)]) -> MergedExport {
    let mut combined_items = Vec::new();
    let mut total_amount = Decimal::ZERO;
    let mut total_items = 0usize;

    for (index, (file_name, receipt)) in receipts.iter().enumerate() {
        total_amount += receipt.total_amount();
        total_items += receipt.items.len();

        for item in &receipt.items {
            combined_items.push(CombinedItem {
                receipt_number: index + 1,
                merchant: receipt.merchant.clone(),
                date: receipt.date.clone(),
                description: item.description.clone(),
                amount: item.amount,
                category: item
                    .category
                    .clone()
                    .unwrap_or_else(|| receipt.category.clone()),
                file_name: file_name.clone(),
            });
        }
    }

    MergedExport {
        summary: ExportSummary {
            total_files: receipts.len(),
            total_amount: total_amount.round_dp(2),
            total_items,
            processed_at: Utc::now(),
        },
        combined_items,
    }
}

/// Render a merged export in the requested format.
///
/// The Excel artifact carries raw workbook bytes; the HTTP layer
/// base64-encodes it for transport.
pub fn render(merged: &MergedExport, format: ExportFormat) -> Result<ExportArtifact, AppError> {
    let bytes = match format {
        ExportFormat::Csv => to_csv(merged)?.into_bytes(),
        ExportFormat::Json => to_json(merged)?.into_bytes(),
        ExportFormat::Excel => to_xlsx(merged)?,
    };

    Ok(ExportArtifact {
        bytes,
        content_type: format.content_type(),
        filename: format!(
            "receipts-{}.{}",
            Utc::now().date_naive(),
            format.extension()
        ),
    })
}

fn to_csv(merged: &MergedExport) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(CSV_HEADER)
        .map_err(|e| AppError::Internal(format!("CSV serialization failed: {}", e)))?;

    for item in &merged.combined_items {
        writer
            .write_record([
                item.receipt_number.to_string(),
                item.merchant.clone(),
                item.date.clone(),
                item.description.clone(),
                item.amount.to_string(),
                item.category.clone(),
                item.file_name.clone(),
            ])
            .map_err(|e| AppError::Internal(format!("CSV serialization failed: {}", e)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV serialization failed: {}", e)))?;

    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV is not UTF-8: {}", e)))
}

fn to_json(merged: &MergedExport) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(merged)?)
}

fn to_xlsx(merged: &MergedExport) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    worksheet
        .set_name("Receipts")
        .map_err(|e| AppError::Internal(format!("Excel serialization failed: {}", e)))?;

    for (col, header) in CSV_HEADER.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *header)
            .map_err(|e| AppError::Internal(format!("Excel serialization failed: {}", e)))?;
    }

    for (row_index, item) in merged.combined_items.iter().enumerate() {
        let row = (row_index + 1) as u32;
        let write = |ws: &mut rust_xlsxwriter::Worksheet, col: u16, value: &str| {
            ws.write_string(row, col, value)
                .map(|_| ())
                .map_err(|e| AppError::Internal(format!("Excel serialization failed: {}", e)))
        };

        write(worksheet, 0, &item.receipt_number.to_string())?;
        write(worksheet, 1, &item.merchant)?;
        write(worksheet, 2, &item.date)?;
        write(worksheet, 3, &item.description)?;
        write(worksheet, 4, &item.amount.to_string())?;
        write(worksheet, 5, &item.category)?;
        write(worksheet, 6, &item.file_name)?;
    }

    workbook
        .save_to_buffer()
        .map_err(|e| AppError::Internal(format!("Excel serialization failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reciva_core::models::ReceiptItem;

    fn receipt(merchant: &str, total: &str, items: Vec<(&str, &str)>) -> Receipt {
        Receipt {
            merchant: merchant.to_string(),
            date: "2026-08-20".to_string(),
            total: total.to_string(),
            items: items
                .into_iter()
                .map(|(description, amount)| ReceiptItem {
                    description: description.to_string(),
                    amount: amount.parse().unwrap(),
                    category: None,
                })
                .collect(),
            category: "dining".to_string(),
            confidence: 0.95,
        }
    }

    #[test]
    fn merge_preserves_batch_order_and_sums() {
        let receipts = vec![
            (
                "a.jpg".to_string(),
                receipt("Cafe", "10.00", vec![("Coffee", "4.00"), ("Cake", "6.00")]),
            ),
            ("b.jpg".to_string(), receipt("Deli", "5.50", vec![("Soup", "5.50")])),
        ];

        let merged = merge_receipts(&receipts);
        assert_eq!(merged.summary.total_files, 2);
        assert_eq!(merged.summary.total_items, 3);
        assert_eq!(merged.summary.total_amount, Decimal::new(1550, 2));
        assert_eq!(merged.combined_items.len(), 3);

        let numbers: Vec<usize> = merged
            .combined_items
            .iter()
            .map(|i| i.receipt_number)
            .collect();
        assert_eq!(numbers, vec![1, 1, 2]);
        assert_eq!(merged.combined_items[2].file_name, "b.jpg");
    }

    #[test]
    fn itemless_receipt_counts_in_summary_only() {
        let receipts = vec![("a.jpg".to_string(), receipt("Kiosk", "3.00", vec![]))];

        let merged = merge_receipts(&receipts);
        assert_eq!(merged.summary.total_files, 1);
        assert_eq!(merged.summary.total_items, 0);
        assert_eq!(merged.summary.total_amount, Decimal::new(300, 2));
        assert!(merged.combined_items.is_empty());
    }

    #[test]
    fn unparsable_total_counts_as_zero() {
        let receipts = vec![
            ("a.jpg".to_string(), receipt("Cafe", "not-a-number", vec![])),
            ("b.jpg".to_string(), receipt("Deli", "5.00", vec![])),
        ];

        let merged = merge_receipts(&receipts);
        assert_eq!(merged.summary.total_amount, Decimal::new(500, 2));
    }

    #[test]
    fn item_category_falls_back_to_receipt_category() {
        let mut r = receipt("Cafe", "4.00", vec![("Coffee", "4.00")]);
        r.items[0].category = Some("drinks".to_string());
        let merged = merge_receipts(&[("a.jpg".to_string(), r)]);
        assert_eq!(merged.combined_items[0].category, "drinks");

        let r = receipt("Cafe", "4.00", vec![("Coffee", "4.00")]);
        let merged = merge_receipts(&[("a.jpg".to_string(), r)]);
        assert_eq!(merged.combined_items[0].category, "dining");
    }

    #[test]
    fn csv_has_expected_header_and_rows() {
        let receipts = vec![(
            "a.jpg".to_string(),
            receipt("Cafe", "4.00", vec![("Coffee", "4.00")]),
        )];
        let merged = merge_receipts(&receipts);
        let csv = to_csv(&merged).unwrap();

        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Receipt #,Merchant,Date,Item Description,Amount,Category,File Name"
        );
        assert_eq!(lines.next().unwrap(), "1,Cafe,2026-08-20,Coffee,4.00,dining,a.jpg");
        assert!(lines.next().is_none());
    }

    #[test]
    fn json_round_trips() {
        let receipts = vec![(
            "a.jpg".to_string(),
            receipt("Cafe", "4.00", vec![("Coffee", "4.00")]),
        )];
        let merged = merge_receipts(&receipts);
        let json = to_json(&merged).unwrap();

        let parsed: MergedExport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.combined_items.len(), 1);
        assert_eq!(parsed.summary.total_files, 1);
    }

    #[test]
    fn xlsx_renders_nonempty_workbook() {
        let receipts = vec![(
            "a.jpg".to_string(),
            receipt("Cafe", "4.00", vec![("Coffee", "4.00")]),
        )];
        let merged = merge_receipts(&receipts);
        let bytes = to_xlsx(&merged).unwrap();
        // XLSX is a zip container; check the magic bytes.
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn all_formats_encode_identical_rows_in_order() {
        use calamine::{Reader, Xlsx};
        use std::io::Cursor;

        let receipts = vec![
            (
                "a.jpg".to_string(),
                receipt("Cafe", "10.00", vec![("Coffee", "4.00"), ("Cake", "6.00")]),
            ),
            ("b.jpg".to_string(), receipt("Deli", "5.50", vec![("Soup", "5.50")])),
        ];
        let merged = merge_receipts(&receipts);

        let csv_text = to_csv(&merged).unwrap();
        let mut csv_reader = csv::Reader::from_reader(csv_text.as_bytes());
        let csv_rows: Vec<Vec<String>> = csv_reader
            .records()
            .map(|record| record.unwrap().iter().map(str::to_string).collect())
            .collect();

        let parsed: MergedExport = serde_json::from_str(&to_json(&merged).unwrap()).unwrap();
        let json_rows: Vec<Vec<String>> = parsed
            .combined_items
            .iter()
            .map(|item| {
                vec![
                    item.receipt_number.to_string(),
                    item.merchant.clone(),
                    item.date.clone(),
                    item.description.clone(),
                    item.amount.to_string(),
                    item.category.clone(),
                    item.file_name.clone(),
                ]
            })
            .collect();

        let bytes = to_xlsx(&merged).unwrap();
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range("Receipts").unwrap();
        let mut sheet_rows = range.rows();
        let header: Vec<String> = sheet_rows
            .next()
            .unwrap()
            .iter()
            .map(|cell| cell.to_string())
            .collect();
        assert_eq!(header, CSV_HEADER);
        let xlsx_rows: Vec<Vec<String>> = sheet_rows
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();

        assert_eq!(csv_rows.len(), 3);
        assert_eq!(xlsx_rows, csv_rows);
        assert_eq!(json_rows, csv_rows);
    }

    #[test]
    fn render_names_artifact_by_date_and_extension() {
        let merged = merge_receipts(&[]);
        let artifact = render(&merged, ExportFormat::Csv).unwrap();
        assert!(artifact.filename.starts_with("receipts-"));
        assert!(artifact.filename.ends_with(".csv"));
        assert_eq!(artifact.content_type, "text/csv");
    }
}
