use {
    super::error::PaymentError,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Charge amount in currency minor units (cents). Always positive;
/// a zero or negative charge is rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount(i64);

/// Upper bound on accepted amounts, in major units. Keeps minor-unit
/// arithmetic comfortably inside i64.
const MAX_MAJOR_UNITS: f64 = 1.0e12;

impl Amount {
    /// Coerce a raw decimal (as entered by the caller) into minor units.
    pub fn from_decimal(raw: f64) -> Result<Self, PaymentError> {
        if !raw.is_finite() || raw <= 0.0 {
            return Err(PaymentError::Validation(
                "invalid amount: must be a positive number".into(),
            ));
        }
        if raw > MAX_MAJOR_UNITS {
            return Err(PaymentError::Validation(
                "invalid amount: out of supported range".into(),
            ));
        }
        let minor = (raw * 100.0).round() as i64;
        if minor <= 0 {
            return Err(PaymentError::Validation(
                "invalid amount: must be a positive number".into(),
            ));
        }
        Ok(Self(minor))
    }

    pub fn minor(&self) -> i64 {
        self.0
    }

    /// Whole currency units, rounded half-up. The push provider only
    /// accepts integral amounts.
    pub fn whole_units(&self) -> i64 {
        (self.0 + 50) / 100
    }

    /// Major units as a decimal. The redirect provider takes fractional
    /// amounts.
    pub fn major_units(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Kes,
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kes => "KES",
            Self::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Currency {
    type Error = PaymentError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "KES" => Ok(Self::Kes),
            "USD" => Ok(Self::Usd),
            other => Err(PaymentError::Validation(format!(
                "unknown currency: {other}"
            ))),
        }
    }
}
