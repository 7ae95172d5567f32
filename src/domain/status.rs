use {
    super::gateway::ProviderStatus,
    serde::{Deserialize, Serialize},
    std::collections::HashSet,
    std::fmt,
};

/// Behavioral category of a provider result code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum StatusClassification {
    Success {
        code: String,
        receipt: Option<String>,
    },
    Processing {
        code: String,
        description: String,
    },
    Failure {
        code: String,
        description: String,
    },
}

impl StatusClassification {
    pub fn code(&self) -> &str {
        match self {
            Self::Success { code, .. }
            | Self::Processing { code, .. }
            | Self::Failure { code, .. } => code,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing { .. })
    }
}

impl fmt::Display for StatusClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { code, .. } => write!(f, "success ({code})"),
            Self::Processing { code, .. } => write!(f, "processing ({code})"),
            Self::Failure { code, .. } => write!(f, "failure ({code})"),
        }
    }
}

/// How to classify a code found in neither the success nor the processing
/// set. Defaulting to `Failure` bounds worst-case polling duration even
/// against codes the provider added after this table was written, at the
/// cost of misreading a genuinely new "still pending" code as terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownCodePolicy {
    #[default]
    Failure,
    Processing,
}

/// Provider-specific result-code sets. Injected into the poller rather
/// than read from module globals so several provider integrations (or
/// provider API revisions) can coexist without cross-talk.
#[derive(Debug, Clone)]
pub struct CodeTable {
    success: HashSet<String>,
    processing: HashSet<String>,
    unknown: UnknownCodePolicy,
}

impl CodeTable {
    pub fn new<S, P>(success: S, processing: P) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            success: success.into_iter().map(Into::into).collect(),
            processing: processing.into_iter().map(Into::into).collect(),
            unknown: UnknownCodePolicy::default(),
        }
    }

    pub fn with_unknown_policy(mut self, policy: UnknownCodePolicy) -> Self {
        self.unknown = policy;
        self
    }

    /// Push-provider result codes. "0" is the single completed code;
    /// the processing set covers "user has not yet entered a PIN" and
    /// request-routing states.
    pub fn mpesa() -> Self {
        Self::new(["0"], ["1037", "4999", "1032", "1001"])
    }

    /// Redirect-provider status words, compared after uppercasing. An
    /// empty status means the hosted page has not reported back yet.
    pub fn pesapal() -> Self {
        Self::new(
            ["COMPLETED", "SUCCESS"],
            ["PENDING", "PROCESSING", "INITIATED", ""],
        )
    }

    /// Map a raw provider response to its behavioral category. Pure and
    /// deterministic: equal inputs always classify equally.
    pub fn classify(&self, status: &ProviderStatus) -> StatusClassification {
        if self.success.contains(&status.code) {
            return StatusClassification::Success {
                code: status.code.clone(),
                receipt: status.receipt.clone(),
            };
        }
        if self.processing.contains(&status.code) {
            return StatusClassification::Processing {
                code: status.code.clone(),
                description: status.description.clone(),
            };
        }
        match self.unknown {
            UnknownCodePolicy::Failure => StatusClassification::Failure {
                code: status.code.clone(),
                description: if status.description.is_empty() {
                    format!("payment failed with code {}", status.code)
                } else {
                    status.description.clone()
                },
            },
            UnknownCodePolicy::Processing => StatusClassification::Processing {
                code: status.code.clone(),
                description: status.description.clone(),
            },
        }
    }
}
