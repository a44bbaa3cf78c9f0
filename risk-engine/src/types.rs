//! Core types for risk engine

use crate::rules::{RiskRule, RuleConfig};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Transaction submitted for risk evaluation
///
/// Every field is optional on the wire. Deserialization is lenient: a field
/// that is missing or has the wrong shape falls back to its default instead
/// of failing, and only a payload that is not a JSON object is rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    /// Caller supplied transaction id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Order total
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    /// Purchased line items, in order
    pub items: Vec<LineItem>,

    /// ISO-8601 timestamp as received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Shipping address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,

    /// Billing address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,
}

impl TransactionInput {
    /// Create a transaction with the given amount and no other fields
    pub fn new(amount: Decimal) -> Self {
        Self {
            amount,
            ..Self::default()
        }
    }

    /// Set the transaction id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Append a line item
    pub fn with_item(mut self, name: impl Into<String>, quantity: u32) -> Self {
        self.items.push(LineItem::new(name, quantity));
        self
    }

    /// Set the timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp.to_rfc3339());
        self
    }

    /// Set the shipping city
    pub fn with_shipping_city(mut self, city: impl Into<String>) -> Self {
        self.shipping_address = Some(Address::in_city(city));
        self
    }

    /// Set the billing city
    pub fn with_billing_city(mut self, city: impl Into<String>) -> Self {
        self.billing_address = Some(Address::in_city(city));
        self
    }

    /// Parse a request body
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::InvalidInput("empty body".to_string()));
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| Error::InvalidInput(format!("malformed JSON: {}", e)))?;

        Self::from_json_value(&value)
    }

    /// Build a transaction from an already parsed JSON value
    pub fn from_json_value(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            Error::InvalidInput(format!("expected a JSON object, got {}", json_kind(value)))
        })?;

        Ok(Self::from_json_object(object))
    }

    fn from_json_object(object: &Map<String, Value>) -> Self {
        Self {
            id: lenient_id(object.get("id")),
            amount: lenient_amount(object.get("amount")),
            items: lenient_items(object.get("items")),
            timestamp: lenient_timestamp(object.get("timestamp")),
            shipping_address: Address::from_json_value(object.get("shippingAddress")),
            billing_address: Address::from_json_value(object.get("billingAddress")),
        }
    }

    /// Shipping city, if known
    pub fn shipping_city(&self) -> Option<&str> {
        self.shipping_address.as_ref().and_then(Address::city)
    }

    /// Billing city, if known
    pub fn billing_city(&self) -> Option<&str> {
        self.billing_address.as_ref().and_then(Address::city)
    }

    /// UTC hour of the transaction
    ///
    /// `None` when the timestamp is missing or cannot be parsed.
    pub fn utc_hour(&self) -> Option<u32> {
        self.timestamp
            .as_deref()
            .and_then(parse_timestamp)
            .map(|ts| ts.hour())
    }
}

impl<'de> Deserialize<'de> for TransactionInput {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_json_value(&value).map_err(serde::de::Error::custom)
    }
}

/// Purchased line item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product name
    #[serde(default)]
    pub name: String,

    /// Units purchased (at least 1)
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl LineItem {
    /// Create a line item
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.max(1),
        }
    }

    fn from_json_value(value: &Value) -> Self {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let quantity = value
            .get("quantity")
            .and_then(Value::as_u64)
            .filter(|q| *q > 0)
            .map(|q| u32::try_from(q).unwrap_or(u32::MAX))
            .unwrap_or_else(default_quantity);

        Self { name, quantity }
    }
}

fn default_quantity() -> u32 {
    1
}

/// Postal address, only the city matters for scoring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// City name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl Address {
    /// Address with only a city
    pub fn in_city(city: impl Into<String>) -> Self {
        Self {
            city: Some(city.into()),
        }
    }

    /// City, if present
    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    fn from_json_value(value: Option<&Value>) -> Option<Self> {
        let object = value?.as_object()?;
        Some(Self {
            city: object.get("city").and_then(Value::as_str).map(str::to_string),
        })
    }
}

/// Parse an ISO-8601 timestamp into UTC
///
/// Accepts RFC 3339 and offset-less `YYYY-MM-DDTHH:MM:SS[.fff]`, the latter
/// read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn lenient_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_amount(value: Option<&Value>) -> Decimal {
    let parsed = match value {
        Some(Value::Number(n)) => parse_decimal(&n.to_string()),
        Some(Value::String(s)) => parse_decimal(s.trim()),
        _ => None,
    };
    parsed.unwrap_or(Decimal::ZERO)
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
        .or_else(|| saturate_decimal(raw))
}

// Finite numbers beyond the Decimal range clamp to its bounds
fn saturate_decimal(raw: &str) -> Option<Decimal> {
    let value = raw.parse::<f64>().ok().filter(|v| v.is_finite())?;
    let limit = Decimal::MAX.to_f64().unwrap_or(f64::MAX);

    if value >= limit {
        Some(Decimal::MAX)
    } else if value <= -limit {
        Some(Decimal::MIN)
    } else {
        None
    }
}

fn lenient_items(value: Option<&Value>) -> Vec<LineItem> {
    match value {
        Some(Value::Array(items)) => items.iter().map(LineItem::from_json_value).collect(),
        _ => Vec::new(),
    }
}

fn lenient_timestamp(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        // Epoch milliseconds, fractions truncated
        Value::Number(n) => Some(
            n.as_i64()
                .or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v.trunc() as i64))
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_else(|| n.to_string()),
        ),
        other => Some(other.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Review decision for an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssessmentStatus {
    /// Score is within the accepted range
    #[serde(rename = "Approved")]
    Approved,
    /// Score exceeds the review threshold
    #[serde(rename = "Flagged for Review")]
    FlaggedForReview,
}

impl AssessmentStatus {
    /// Label used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentStatus::Approved => "Approved",
            AssessmentStatus::FlaggedForReview => "Flagged for Review",
        }
    }

    /// Check if flagged
    pub fn is_flagged(&self) -> bool {
        matches!(self, AssessmentStatus::FlaggedForReview)
    }
}

impl fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Low risk
    Low,
    /// Medium risk
    Medium,
    /// High risk
    High,
}

impl RiskLevel {
    /// Bucket a rounded score
    pub fn from_score(score: Decimal, config: &RuleConfig) -> Self {
        if score > config.review_threshold {
            RiskLevel::High
        } else if score > config.medium_risk_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Action suggested to the checkout flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    /// Let the transaction through
    Approve,
    /// Hold the transaction
    BlockTransaction,
}

impl From<AssessmentStatus> for Recommendation {
    fn from(status: AssessmentStatus) -> Self {
        match status {
            AssessmentStatus::Approved => Recommendation::Approve,
            AssessmentStatus::FlaggedForReview => Recommendation::BlockTransaction,
        }
    }
}

/// Contribution of one triggered rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    /// Rule that fired
    pub rule: RiskRule,

    /// Weight added to the raw score
    #[serde(with = "rust_decimal::serde::float")]
    pub weight: Decimal,

    /// Explanation text
    pub description: String,
}

/// Risk assessment result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    /// Score in [0, 1], rounded to 2 decimal places
    #[serde(with = "rust_decimal::serde::float")]
    pub score: Decimal,

    /// One line per triggered rule
    pub explanations: Vec<String>,

    /// Echoed or generated transaction id
    pub transaction_id: String,

    /// Review decision
    pub status: AssessmentStatus,

    /// Risk level
    pub risk_level: RiskLevel,

    /// Suggested action
    pub recommendation: Recommendation,

    /// Triggered rules with their weights
    pub factors: Vec<RiskFactor>,
}

impl RiskAssessment {
    /// Check if flagged for review
    pub fn is_flagged(&self) -> bool {
        self.status.is_flagged()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_full_transaction() {
        let tx = TransactionInput::from_json_value(&json!({
            "id": "TX-1",
            "amount": 1500.25,
            "items": [{"name": "Gift Card", "quantity": 2}, {"name": "Milk"}],
            "timestamp": "2024-03-01T03:15:00Z",
            "shippingAddress": {"city": "Miami", "zip": "33101"},
            "billingAddress": {"city": "New York"}
        }))
        .unwrap();

        assert_eq!(tx.id.as_deref(), Some("TX-1"));
        assert_eq!(tx.amount, dec!(1500.25));
        assert_eq!(tx.items, vec![LineItem::new("Gift Card", 2), LineItem::new("Milk", 1)]);
        assert_eq!(tx.shipping_city(), Some("Miami"));
        assert_eq!(tx.billing_city(), Some("New York"));
        assert_eq!(tx.utc_hour(), Some(3));
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let tx = TransactionInput::from_json_value(&json!({})).unwrap();

        assert_eq!(tx, TransactionInput::default());
        assert_eq!(tx.amount, Decimal::ZERO);
        assert!(tx.items.is_empty());
        assert!(tx.shipping_city().is_none());
    }

    #[test]
    fn test_malformed_fields_fall_back() {
        let tx = TransactionInput::from_json_value(&json!({
            "id": "",
            "amount": {"value": 10},
            "items": "Gift Card",
            "shippingAddress": "Miami",
            "billingAddress": {"city": 42}
        }))
        .unwrap();

        assert!(tx.id.is_none());
        assert_eq!(tx.amount, Decimal::ZERO);
        assert!(tx.items.is_empty());
        assert!(tx.shipping_address.is_none());
        assert_eq!(tx.billing_address, Some(Address::default()));
        assert!(tx.billing_city().is_none());
    }

    #[test]
    fn test_numeric_strings_and_ids() {
        let tx = TransactionInput::from_json_value(&json!({
            "id": 42,
            "amount": "1200.50",
            "items": [{"quantity": 0}, 7]
        }))
        .unwrap();

        assert_eq!(tx.id.as_deref(), Some("42"));
        assert_eq!(tx.amount, dec!(1200.50));
        assert_eq!(tx.items, vec![LineItem::new("", 1), LineItem::new("", 1)]);
    }

    #[test]
    fn test_non_object_is_rejected() {
        for value in [json!(null), json!(5), json!("tx"), json!([{"amount": 1}])] {
            let err = TransactionInput::from_json_value(&value).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)));
        }
    }

    #[test]
    fn test_from_slice_rejects_empty_and_garbage() {
        assert!(matches!(
            TransactionInput::from_slice(b"  \n").unwrap_err(),
            Error::InvalidInput(_)
        ));
        assert!(matches!(
            TransactionInput::from_slice(b"{amount: 1").unwrap_err(),
            Error::InvalidInput(_)
        ));
        assert!(TransactionInput::from_slice(br#"{"amount": 1}"#).is_ok());
    }

    #[test]
    fn test_serde_deserialize_is_lenient() {
        let tx: TransactionInput =
            serde_json::from_str(r#"{"amount": "abc", "items": null}"#).unwrap();
        assert_eq!(tx.amount, Decimal::ZERO);

        assert!(serde_json::from_str::<TransactionInput>("[]").is_err());
    }

    #[test]
    fn test_timestamp_hours() {
        let missing = TransactionInput::default();
        assert_eq!(missing.utc_hour(), None);

        let offset = TransactionInput {
            timestamp: Some("2024-05-01T22:30:00-05:00".to_string()),
            ..TransactionInput::default()
        };
        assert_eq!(offset.utc_hour(), Some(3));

        let naive = TransactionInput {
            timestamp: Some("2024-05-01T02:00:00.123".to_string()),
            ..TransactionInput::default()
        };
        assert_eq!(naive.utc_hour(), Some(2));

        let garbage = TransactionInput {
            timestamp: Some("yesterday".to_string()),
            ..TransactionInput::default()
        };
        assert_eq!(garbage.utc_hour(), None);
    }

    #[test]
    fn test_epoch_millis_timestamp() {
        // 2023-11-14T22:13:20Z
        let tx = TransactionInput::from_json_value(&json!({"timestamp": 1_700_000_000_000i64}))
            .unwrap();
        assert_eq!(tx.utc_hour(), Some(22));

        let float = TransactionInput::from_json_value(&json!({"timestamp": 1.7e12})).unwrap();
        assert_eq!(float.utc_hour(), Some(22));

        let fractional =
            TransactionInput::from_json_value(&json!({"timestamp": 1_700_000_000_000.9})).unwrap();
        assert_eq!(fractional.utc_hour(), Some(22));
    }

    #[test]
    fn test_amount_beyond_decimal_range_saturates() {
        for amount in [json!(1e30), json!("1e30"), json!(" 1e30 ")] {
            let tx = TransactionInput::from_json_value(&json!({"amount": amount})).unwrap();
            assert_eq!(tx.amount, Decimal::MAX, "amount {}", amount);
        }

        let negative = TransactionInput::from_json_value(&json!({"amount": -1e30})).unwrap();
        assert_eq!(negative.amount, Decimal::MIN);

        let tiny = TransactionInput::from_json_value(&json!({"amount": "1e-40"})).unwrap();
        assert!(tiny.amount < dec!(1));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(
            serde_json::to_value(AssessmentStatus::FlaggedForReview).unwrap(),
            json!("Flagged for Review")
        );
        assert_eq!(AssessmentStatus::Approved.to_string(), "Approved");
        assert_eq!(
            Recommendation::from(AssessmentStatus::FlaggedForReview),
            Recommendation::BlockTransaction
        );
        assert_eq!(serde_json::to_value(RiskLevel::Medium).unwrap(), json!("MEDIUM"));
        assert_eq!(
            serde_json::to_value(Recommendation::BlockTransaction).unwrap(),
            json!("BLOCK_TRANSACTION")
        );
    }
}
