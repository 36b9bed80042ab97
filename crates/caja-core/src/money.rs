//! # Money Types
//!
//! All amounts inside the core are integer minor currency units (centavos,
//! cents). Conversion to whatever major/minor convention a provider's API
//! expects happens at the adapter boundary only, via [`Money::major_units_string`].

use serde::{Deserialize, Serialize};

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    COP,
    USD,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::COP => "COP",
            Currency::USD => "USD",
        }
    }

    /// Returns the number of minor-unit decimal places for this currency
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::COP | Currency::USD => 2,
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::COP
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An amount in integer minor currency units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in minor units (centavos for COP)
    pub minor_units: i64,
    /// Currency
    pub currency: Currency,
}

impl Money {
    /// Create an amount from minor units
    pub fn from_minor(minor_units: i64, currency: Currency) -> Self {
        Self {
            minor_units,
            currency,
        }
    }

    /// Zero in the given currency
    pub fn zero(currency: Currency) -> Self {
        Self::from_minor(0, currency)
    }

    /// Checked addition; both sides must share a currency
    pub fn checked_add(self, other: Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        Some(Money {
            minor_units: self.minor_units.checked_add(other.minor_units)?,
            currency: self.currency,
        })
    }

    /// Checked multiplication by a quantity
    pub fn checked_mul(self, quantity: u32) -> Option<Money> {
        Some(Money {
            minor_units: self.minor_units.checked_mul(i64::from(quantity))?,
            currency: self.currency,
        })
    }

    /// Format as a decimal major-unit string ("500.00") without going
    /// through floating point. This is the only sanctioned way to hand an
    /// amount to a provider API.
    pub fn major_units_string(&self) -> String {
        let places = self.currency.decimal_places();
        let divisor = 10_i64.pow(places);
        let sign = if self.minor_units < 0 { "-" } else { "" };
        let abs = self.minor_units.unsigned_abs();
        let whole = abs / divisor as u64;
        let frac = abs % divisor as u64;
        format!("{}{}.{:0width$}", sign, whole, frac, width = places as usize)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.major_units_string(), self.currency)
    }
}
