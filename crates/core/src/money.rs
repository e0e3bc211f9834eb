//! Currency amounts held as integer minor units.
//!
//! Request payloads carry major units (`25.00`); everything past validation
//! works in [`MinorUnits`] and each adapter converts to its own wire unit.

use crate::error::MoneyError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of decimal places between major and minor units for an ISO 4217 code.
pub fn currency_exponent(currency: &str) -> u32 {
    match currency.to_ascii_uppercase().as_str() {
        "JPY" | "KRW" | "VND" | "CLP" | "ISK" | "UGX" | "XAF" | "XOF" | "PYG" => 0,
        "KWD" | "BHD" | "OMR" | "JOD" | "TND" | "LYD" | "IQD" => 3,
        _ => 2,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct MinorUnits(pub i64);

impl MinorUnits {
    /// Convert a major-unit amount, rejecting values finer than the currency allows.
    pub fn from_major(amount: f64, currency: &str) -> Result<Self, MoneyError> {
        if !amount.is_finite() {
            return Err(MoneyError::NotFinite(amount));
        }
        if amount <= 0.0 {
            return Err(MoneyError::NotPositive(amount));
        }
        let scale = 10f64.powi(currency_exponent(currency) as i32);
        let scaled = amount * scale;
        let rounded = scaled.round();
        if (scaled - rounded).abs() > 1e-6 {
            return Err(MoneyError::TooPrecise {
                amount,
                currency: currency.to_ascii_uppercase(),
            });
        }
        if rounded > i64::MAX as f64 {
            return Err(MoneyError::Overflow(amount));
        }
        Ok(Self(rounded as i64))
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn to_major(&self, currency: &str) -> f64 {
        self.0 as f64 / 10f64.powi(currency_exponent(currency) as i32)
    }

    /// Google Ads amounts: one millionth of the major unit.
    pub fn to_micros(&self, currency: &str) -> Result<i64, MoneyError> {
        let exp = currency_exponent(currency);
        self.0
            .checked_mul(10i64.pow(6 - exp.min(6)))
            .ok_or(MoneyError::Overflow(self.to_major(currency)))
    }

    /// Fixed-point decimal string in major units, e.g. `25.00`.
    pub fn format_major(&self, currency: &str) -> String {
        let exp = currency_exponent(currency) as usize;
        format!("{:.*}", exp, self.to_major(currency))
    }
}

impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
