//! Risk Engine for TrustShield Cortex
//!
//! Rule-based transaction risk scoring for the retail checkout flow.
//! Evaluation is pure: no I/O and no shared mutable state, so a single
//! [`RiskEngine`] can be shared across any number of request handlers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod types;
pub mod rules;
pub mod scoring;

pub use error::{Error, Result};
pub use types::*;
pub use rules::{RiskRule, RuleConfig};
pub use scoring::RiskEngine;
