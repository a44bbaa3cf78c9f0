//! Risk scoring engine

use crate::rules::{RiskRule, RuleConfig, NORMAL_ACTIVITY};
use crate::{
    AssessmentStatus, Recommendation, Result, RiskAssessment, RiskFactor, RiskLevel,
    TransactionInput,
};
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

/// Risk engine
///
/// Holds only its immutable rule configuration, so it is `Send + Sync` and
/// can be shared behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    config: RuleConfig,
}

impl RiskEngine {
    /// Create engine with the default rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create engine with a custom rule set
    pub fn with_config(config: RuleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active rule configuration
    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    /// Assess a transaction
    pub fn evaluate(&self, tx: &TransactionInput) -> RiskAssessment {
        let mut raw_score = Decimal::ZERO;
        let mut factors = Vec::new();

        for rule in RiskRule::ALL {
            if !rule.is_triggered(tx, &self.config) {
                continue;
            }

            let weight = rule.weight(&self.config);
            raw_score += weight;
            factors.push(RiskFactor {
                rule,
                weight,
                description: rule.explanation(&self.config),
            });
        }

        let score = round_score(raw_score.min(self.config.max_score));

        let explanations = if factors.is_empty() {
            vec![NORMAL_ACTIVITY.to_string()]
        } else {
            factors.iter().map(|f| f.description.clone()).collect()
        };

        // Compared after rounding
        let status = if score > self.config.review_threshold {
            AssessmentStatus::FlaggedForReview
        } else {
            AssessmentStatus::Approved
        };

        RiskAssessment {
            score,
            explanations,
            transaction_id: transaction_id(tx),
            status,
            risk_level: RiskLevel::from_score(score, &self.config),
            recommendation: Recommendation::from(status),
            factors,
        }
    }
}

/// Round a score to 2 decimal places, ties away from zero
pub fn round_score(score: Decimal) -> Decimal {
    score.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn transaction_id(tx: &TransactionInput) -> String {
    match tx.id.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => format!("txn_{}", Uuid::new_v4().simple()),
    }
}
