//! Ordered rule set for transaction scoring
//!
//! Rules are evaluated in declaration order. Each one is independent and
//! additive: a triggered rule adds its weight to the raw score and
//! contributes one explanation line.

use crate::types::TransactionInput;
use crate::{Error, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Explanation returned when no rule fires
pub const NORMAL_ACTIVITY: &str = "Normal activity detected.";

/// Scoring rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskRule {
    /// Order total above the amount threshold
    HighAmount,
    /// Several gift cards in one basket
    GiftCardBurst,
    /// Placed during the unusual-hours window (UTC)
    UnusualHours,
    /// Shipping and billing cities differ
    CityMismatch,
}

impl RiskRule {
    /// All rules in evaluation order
    pub const ALL: [RiskRule; 4] = [
        RiskRule::HighAmount,
        RiskRule::GiftCardBurst,
        RiskRule::UnusualHours,
        RiskRule::CityMismatch,
    ];

    /// Stable identifier, used for metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskRule::HighAmount => "HIGH_AMOUNT",
            RiskRule::GiftCardBurst => "GIFT_CARD_BURST",
            RiskRule::UnusualHours => "UNUSUAL_HOURS",
            RiskRule::CityMismatch => "CITY_MISMATCH",
        }
    }

    /// Weight added to the raw score when the rule fires
    pub fn weight(&self, config: &RuleConfig) -> Decimal {
        match self {
            RiskRule::HighAmount => config.high_amount_weight,
            RiskRule::GiftCardBurst => config.gift_card_weight,
            RiskRule::UnusualHours => config.unusual_hours_weight,
            RiskRule::CityMismatch => config.city_mismatch_weight,
        }
    }

    /// Human readable explanation
    pub fn explanation(&self, config: &RuleConfig) -> String {
        match self {
            RiskRule::HighAmount => "High transaction amount detected.".to_string(),
            RiskRule::GiftCardBurst => "Unusual purchase of multiple gift cards.".to_string(),
            RiskRule::UnusualHours => {
                let (start, end) = (config.unusual_hours_start, config.unusual_hours_end);
                if end < 12 {
                    format!("Transaction occurred during unusual hours ({}-{} AM).", start, end)
                } else {
                    format!(
                        "Transaction occurred during unusual hours ({:02}:00-{:02}:59 UTC).",
                        start, end
                    )
                }
            }
            RiskRule::CityMismatch => "Shipping and billing city do not match.".to_string(),
        }
    }

    /// Check the rule against a transaction
    pub fn is_triggered(&self, tx: &TransactionInput, config: &RuleConfig) -> bool {
        match self {
            RiskRule::HighAmount => tx.amount > config.amount_threshold,
            RiskRule::GiftCardBurst => gift_card_count(tx, config) > config.gift_card_threshold,
            // Missing or unparseable timestamp has no hour
            RiskRule::UnusualHours => tx
                .utc_hour()
                .map(|hour| (config.unusual_hours_start..=config.unusual_hours_end).contains(&hour))
                .unwrap_or(false),
            // Missing city on either side never counts as a mismatch
            RiskRule::CityMismatch => match (tx.shipping_city(), tx.billing_city()) {
                (Some(shipping), Some(billing)) => shipping != billing,
                _ => false,
            },
        }
    }
}

/// Number of line items whose name contains the gift card keyword
pub fn gift_card_count(tx: &TransactionInput, config: &RuleConfig) -> usize {
    let keyword = config.gift_card_keyword.to_lowercase();
    tx.items
        .iter()
        .filter(|item| item.name.to_lowercase().contains(&keyword))
        .count()
}

/// Rule configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Amount above which the high amount rule fires
    pub amount_threshold: Decimal,
    /// Weight of the high amount rule
    pub high_amount_weight: Decimal,

    /// Case-insensitive substring identifying gift cards
    pub gift_card_keyword: String,
    /// Gift card count above which the rule fires
    pub gift_card_threshold: usize,
    /// Weight of the gift card rule
    pub gift_card_weight: Decimal,

    /// First unusual hour (UTC, inclusive)
    pub unusual_hours_start: u32,
    /// Last unusual hour (UTC, inclusive)
    pub unusual_hours_end: u32,
    /// Weight of the unusual hours rule
    pub unusual_hours_weight: Decimal,

    /// Weight of the city mismatch rule
    pub city_mismatch_weight: Decimal,

    /// Cap applied to the raw score
    pub max_score: Decimal,
    /// Rounded scores strictly above this are flagged for review
    pub review_threshold: Decimal,
    /// Rounded scores strictly above this are at least medium risk
    pub medium_risk_threshold: Decimal,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            amount_threshold: dec!(1000),
            high_amount_weight: dec!(0.30),
            gift_card_keyword: "gift card".to_string(),
            gift_card_threshold: 2,
            gift_card_weight: dec!(0.40),
            unusual_hours_start: 2,
            unusual_hours_end: 5,
            unusual_hours_weight: dec!(0.20),
            city_mismatch_weight: dec!(0.25),
            max_score: dec!(1.0),
            review_threshold: dec!(0.7),
            medium_risk_threshold: dec!(0.3),
        }
    }
}

impl RuleConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for rule in RiskRule::ALL {
            if rule.weight(self).is_sign_negative() {
                return Err(Error::InvalidConfig(format!(
                    "weight of {} must not be negative",
                    rule.as_str()
                )));
            }
        }

        if self.max_score <= Decimal::ZERO || self.max_score > Decimal::ONE {
            return Err(Error::InvalidConfig(format!(
                "max_score {} must be in (0, 1]",
                self.max_score
            )));
        }

        if self.review_threshold.is_sign_negative() || self.review_threshold > self.max_score {
            return Err(Error::InvalidConfig(format!(
                "review_threshold {} must be between 0 and max_score {}",
                self.review_threshold, self.max_score
            )));
        }

        if self.medium_risk_threshold.is_sign_negative()
            || self.medium_risk_threshold > self.review_threshold
        {
            return Err(Error::InvalidConfig(format!(
                "medium_risk_threshold {} must be between 0 and review_threshold {}",
                self.medium_risk_threshold, self.review_threshold
            )));
        }

        if self.unusual_hours_end > 23 || self.unusual_hours_start > self.unusual_hours_end {
            return Err(Error::InvalidConfig(format!(
                "unusual hours window {}-{} is not a valid UTC hour range",
                self.unusual_hours_start, self.unusual_hours_end
            )));
        }

        if self.gift_card_keyword.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "gift_card_keyword must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_default_config_is_valid() {
        assert!(RuleConfig::default().validate().is_ok());
    }

    #[test]
    fn test_high_amount_is_strict() {
        let config = RuleConfig::default();

        let at_threshold = TransactionInput::new(dec!(1000));
        let above = TransactionInput::new(dec!(1000.01));

        assert!(!RiskRule::HighAmount.is_triggered(&at_threshold, &config));
        assert!(RiskRule::HighAmount.is_triggered(&above, &config));
    }

    #[test]
    fn test_gift_cards_counted_case_insensitively() {
        let config = RuleConfig::default();

        let two = TransactionInput::new(dec!(10))
            .with_item("GIFT CARD $50", 5)
            .with_item("Amazon Gift Card", 1)
            .with_item("Giftcard", 1);
        assert_eq!(gift_card_count(&two, &config), 2);
        assert!(!RiskRule::GiftCardBurst.is_triggered(&two, &config));

        let three = two.with_item("gift card", 1);
        assert_eq!(gift_card_count(&three, &config), 3);
        assert!(RiskRule::GiftCardBurst.is_triggered(&three, &config));
    }

    #[test]
    fn test_unusual_hours_window_is_inclusive() {
        let config = RuleConfig::default();

        for (hour, expected) in [(1, false), (2, true), (5, true), (6, false)] {
            let tx = TransactionInput::new(dec!(10))
                .with_timestamp(Utc.with_ymd_and_hms(2024, 6, 1, hour, 59, 59).unwrap());
            assert_eq!(
                RiskRule::UnusualHours.is_triggered(&tx, &config),
                expected,
                "hour {}",
                hour
            );
        }
    }

    #[test]
    fn test_missing_timestamp_never_unusual() {
        let config = RuleConfig {
            unusual_hours_start: 0,
            unusual_hours_end: 23,
            ..RuleConfig::default()
        };
        let tx = TransactionInput::new(dec!(10));

        assert!(!RiskRule::UnusualHours.is_triggered(&tx, &config));
    }

    #[test]
    fn test_city_mismatch_needs_both_cities() {
        let config = RuleConfig::default();

        let differ = TransactionInput::new(dec!(10))
            .with_shipping_city("Miami")
            .with_billing_city("New York");
        let same = TransactionInput::new(dec!(10))
            .with_shipping_city("Bentonville")
            .with_billing_city("Bentonville");
        let shipping_only = TransactionInput::new(dec!(10)).with_shipping_city("Miami");
        let case_differs = TransactionInput::new(dec!(10))
            .with_shipping_city("miami")
            .with_billing_city("Miami");

        assert!(RiskRule::CityMismatch.is_triggered(&differ, &config));
        assert!(!RiskRule::CityMismatch.is_triggered(&same, &config));
        assert!(!RiskRule::CityMismatch.is_triggered(&shipping_only, &config));
        assert!(RiskRule::CityMismatch.is_triggered(&case_differs, &config));
    }

    #[test]
    fn test_explanation_follows_window() {
        let mut config = RuleConfig::default();
        assert_eq!(
            RiskRule::UnusualHours.explanation(&config),
            "Transaction occurred during unusual hours (2-5 AM)."
        );

        config.unusual_hours_start = 22;
        config.unusual_hours_end = 23;
        assert_eq!(
            RiskRule::UnusualHours.explanation(&config),
            "Transaction occurred during unusual hours (22:00-23:59 UTC)."
        );
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let negative = RuleConfig {
            gift_card_weight: dec!(-0.1),
            ..RuleConfig::default()
        };
        let over_cap = RuleConfig {
            max_score: dec!(1.5),
            ..RuleConfig::default()
        };
        let inverted_window = RuleConfig {
            unusual_hours_start: 6,
            unusual_hours_end: 2,
            ..RuleConfig::default()
        };
        let empty_keyword = RuleConfig {
            gift_card_keyword: "  ".to_string(),
            ..RuleConfig::default()
        };
        let levels_swapped = RuleConfig {
            medium_risk_threshold: dec!(0.8),
            ..RuleConfig::default()
        };
        let negative_review = RuleConfig {
            review_threshold: dec!(-0.1),
            medium_risk_threshold: dec!(-0.2),
            ..RuleConfig::default()
        };
        let review_above_cap = RuleConfig {
            max_score: dec!(0.5),
            ..RuleConfig::default()
        };

        for config in [
            negative,
            over_cap,
            inverted_window,
            empty_keyword,
            levels_swapped,
            negative_review,
            review_above_cap,
        ] {
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        }
    }
}
