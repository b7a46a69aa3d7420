//! Usage and tier policy.
//!
//! Upload quotas are checked at validation time against the user's persisted
//! file count; this module covers the feature gates that depend only on tier.

use reciva_core::models::{ExportFormat, Tier};
use reciva_core::AppError;

/// Freemium users may export CSV only; premium unlocks JSON and Excel.
pub fn ensure_export_allowed(tier: Tier, format: ExportFormat) -> Result<(), AppError> {
    match format {
        ExportFormat::Csv => Ok(()),
        ExportFormat::Json | ExportFormat::Excel if tier.is_premium() => Ok(()),
        ExportFormat::Json | ExportFormat::Excel => Err(AppError::SubscriptionRequired(format!(
            "{} export requires a premium subscription",
            format
        ))),
    }
}

/// Spending analytics is a premium feature.
pub fn ensure_analytics_allowed(tier: Tier) -> Result<(), AppError> {
    if tier.is_premium() {
        Ok(())
    } else {
        Err(AppError::SubscriptionRequired(
            "Spending analytics requires a premium subscription".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_export_is_always_allowed() {
        assert!(ensure_export_allowed(Tier::Freemium, ExportFormat::Csv).is_ok());
        assert!(ensure_export_allowed(Tier::Premium, ExportFormat::Csv).is_ok());
    }

    #[test]
    fn premium_formats_gated() {
        for format in [ExportFormat::Json, ExportFormat::Excel] {
            assert!(matches!(
                ensure_export_allowed(Tier::Freemium, format),
                Err(AppError::SubscriptionRequired(_))
            ));
            assert!(ensure_export_allowed(Tier::Premium, format).is_ok());
        }
    }

    #[test]
    fn analytics_is_premium_only() {
        assert!(ensure_analytics_allowed(Tier::Premium).is_ok());
        assert!(ensure_analytics_allowed(Tier::Freemium).is_err());
    }
}
