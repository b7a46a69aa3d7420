use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Subscription level governing quotas and feature access.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Freemium,
    Premium,
}

impl Tier {
    pub fn is_premium(&self) -> bool {
        matches!(self, Tier::Premium)
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Tier::Freemium => write!(f, "freemium"),
            Tier::Premium => write!(f, "premium"),
        }
    }
}

impl FromStr for Tier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "freemium" => Ok(Tier::Freemium),
            "premium" => Ok(Tier::Premium),
            _ => Err(anyhow::anyhow!("Invalid tier: {}", s)),
        }
    }
}

/// A user's subscription record, maintained by the payment-provider webhook.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Subscription {
    pub user_id: Uuid,
    pub subscribed: bool,
    pub tier: Tier,
    pub provider_subscription_id: Option<String>,
    pub status: Option<String>,
    pub renews_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_round_trips() {
        assert_eq!("premium".parse::<Tier>().unwrap(), Tier::Premium);
        assert_eq!(Tier::Freemium.to_string(), "freemium");
        assert!("gold".parse::<Tier>().is_err());
    }

    #[test]
    fn premium_flag() {
        assert!(Tier::Premium.is_premium());
        assert!(!Tier::Freemium.is_premium());
    }
}
