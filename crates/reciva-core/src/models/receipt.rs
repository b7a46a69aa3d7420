use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One extracted line item from a receipt.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReceiptItem {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub category: Option<String>,
}

/// A normalized receipt as produced by the extraction gateway.
///
/// `total` stays a string end to end (the upstream service returns it that
/// way); it is parsed to `Decimal` only where sums are computed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Receipt {
    pub merchant: String,
    /// ISO date (YYYY-MM-DD).
    pub date: String,
    pub total: String,
    #[serde(default)]
    pub items: Vec<ReceiptItem>,
    pub category: String,
    pub confidence: f64,
}

impl Receipt {
    /// Receipt total as a decimal; unparsable totals count as zero, matching
    /// the lenient summing behavior the exports rely on.
    pub fn total_amount(&self) -> Decimal {
        self.total.trim().parse().unwrap_or_default()
    }

    /// The "YYYY-MM" prefix of the ISO date, e.g. "2026-08". The date is an
    /// upstream passthrough string, so when the 7-byte cut would split a
    /// multibyte character (or the string is shorter), the whole string is
    /// used as the bucket key instead of panicking.
    pub fn month_year(&self) -> &str {
        self.date.get(..7).unwrap_or(&self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(date: &str, total: &str) -> Receipt {
        Receipt {
            merchant: "Store".to_string(),
            date: date.to_string(),
            total: total.to_string(),
            items: vec![],
            category: "groceries".to_string(),
            confidence: 0.95,
        }
    }

    #[test]
    fn total_amount_parses_decimal_strings() {
        assert_eq!(receipt("2026-08-01", "42.50").total_amount(), Decimal::new(4250, 2));
        assert_eq!(receipt("2026-08-01", " 7 ").total_amount(), Decimal::new(7, 0));
    }

    #[test]
    fn unparsable_total_counts_as_zero() {
        assert_eq!(receipt("2026-08-01", "n/a").total_amount(), Decimal::ZERO);
        assert_eq!(receipt("2026-08-01", "").total_amount(), Decimal::ZERO);
    }

    #[test]
    fn month_year_truncates_iso_date() {
        assert_eq!(receipt("2026-08-24", "1").month_year(), "2026-08");
        assert_eq!(receipt("2026", "1").month_year(), "2026");
    }

    #[test]
    fn month_year_tolerates_multibyte_dates() {
        // Upstream sometimes returns free-text dates; a 7-byte slice must
        // not land inside a multibyte character.
        assert_eq!(receipt("ééééé", "1").month_year(), "ééééé");
        assert_eq!(receipt("24 août 2026", "1").month_year(), "24 aoû");
    }
}
