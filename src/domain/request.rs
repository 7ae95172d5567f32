use {
    super::error::PaymentError,
    super::money::Amount,
    derive_more::Display,
    serde::{Deserialize, Serialize},
};

/// Raw payment request as submitted by a caller. Nothing here is trusted
/// until `validate` has produced a [`ValidatedRequest`].
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub amount: f64,
    #[serde(alias = "phoneNumber")]
    pub phone_number: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(alias = "transactionDesc")]
    pub description: String,
    /// Opaque reference to the business object being paid for
    /// (e.g. a lab-test order id).
    #[serde(alias = "accountReference")]
    pub reference: String,
}

impl PaymentRequest {
    /// Field checks run in a fixed order (amount, then email, then phone)
    /// and fail on the first invalid field. Pure: no network, no side
    /// effects.
    pub fn validate(self) -> Result<ValidatedRequest, PaymentError> {
        let amount = Amount::from_decimal(self.amount)?;
        let email = self.email.as_deref().map(EmailAddress::parse).transpose()?;
        let msisdn = Msisdn::normalize(&self.phone_number)?;

        Ok(ValidatedRequest {
            amount,
            msisdn,
            email,
            first_name: self.first_name,
            last_name: self.last_name,
            description: self.description,
            reference: self.reference,
        })
    }
}

/// A request that passed validation. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub amount: Amount,
    pub msisdn: Msisdn,
    pub email: Option<EmailAddress>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub description: String,
    pub reference: String,
}

/// Canonical subscriber number: exactly 12 digits with the `254` country
/// prefix. The domestic trunk `0` is rewritten during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Msisdn(String);

impl Msisdn {
    pub fn normalize(raw: &str) -> Result<Self, PaymentError> {
        let mut digits: String = raw.chars().filter(char::is_ascii_digit).collect();

        if digits.starts_with('0') {
            digits.replace_range(..1, "254");
        }
        if !digits.starts_with("254") {
            digits.insert_str(0, "254");
        }

        if digits.len() != 12 {
            return Err(PaymentError::Validation(format!(
                "invalid phone number: '{raw}' does not normalize to a 12-digit subscriber number (e.g. 0712345678)"
            )));
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Payer email, checked against the usual `local@domain.tld` grammar.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(raw: &str) -> Result<Self, PaymentError> {
        if is_valid_email(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(PaymentError::Validation(format!(
                "invalid email address: '{raw}'"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// local and domain parts non-empty, no whitespace, single '@', and the
// domain carries at least one interior dot.
fn is_valid_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((head, tld)) => !head.is_empty() && !tld.is_empty(),
        None => false,
    }
}
