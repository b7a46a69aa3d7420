use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

/// Target serialization format for a merged export.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Excel,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Excel => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl Display for ExportFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Excel => write!(f, "excel"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            _ => Err(anyhow::anyhow!("Invalid export format: {}", s)),
        }
    }
}

/// Aggregate header of a merged export.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExportSummary {
    pub total_files: usize,
    /// Sum of per-receipt totals, rounded to 2 decimals.
    pub total_amount: Decimal,
    pub total_items: usize,
    pub processed_at: DateTime<Utc>,
}

/// One flattened line item in a merged export. Row order is batch order,
/// then item order within each receipt.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CombinedItem {
    /// 1-based position of the source receipt in the batch.
    pub receipt_number: usize,
    pub merchant: String,
    pub date: String,
    pub description: String,
    pub amount: Decimal,
    pub category: String,
    pub file_name: String,
}

/// The combined summary + flat item list used as the common input to all
/// export formats.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MergedExport {
    pub summary: ExportSummary,
    pub combined_items: Vec<CombinedItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_aliases() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("excel".parse::<ExportFormat>().unwrap(), ExportFormat::Excel);
        assert_eq!("xlsx".parse::<ExportFormat>().unwrap(), ExportFormat::Excel);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn format_metadata() {
        assert_eq!(ExportFormat::Excel.extension(), "xlsx");
        assert_eq!(ExportFormat::Csv.content_type(), "text/csv");
    }
}
