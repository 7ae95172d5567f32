use {
    crate::domain::{
        error::PaymentError,
        gateway::{InitiateAck, PaymentGateway, ProviderStatus},
        id::CheckoutId,
        request::ValidatedRequest,
    },
    base64::Engine,
    chrono::Utc,
    serde::Deserialize,
    std::{
        env,
        future::Future,
        pin::Pin,
        time::{Duration, Instant},
    },
    tokio::sync::Mutex,
};

/// Refresh the OAuth token this long before the provider-reported expiry.
const TOKEN_SAFETY_MARGIN: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct DarajaConfig {
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub short_code: String,
    pub passkey: String,
    pub callback_url: String,
}

impl DarajaConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("DARAJA_BASE_URL")
                .unwrap_or_else(|_| "https://sandbox.safaricom.co.ke".to_string()),
            consumer_key: env::var("DARAJA_CONSUMER_KEY").expect("DARAJA_CONSUMER_KEY must be set"),
            consumer_secret: env::var("DARAJA_CONSUMER_SECRET")
                .expect("DARAJA_CONSUMER_SECRET must be set"),
            short_code: env::var("DARAJA_SHORT_CODE").expect("DARAJA_SHORT_CODE must be set"),
            passkey: env::var("DARAJA_PASSKEY").expect("DARAJA_PASSKEY must be set"),
            callback_url: env::var("DARAJA_CALLBACK_URL").expect("DARAJA_CALLBACK_URL must be set"),
        }
    }
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Push-mode gateway client (STK push). Stateless with respect to
/// payment sessions; the only internal state is the cached OAuth token.
pub struct DarajaGateway {
    http: reqwest::Client,
    config: DarajaConfig,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct StkPushResponse {
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: Option<String>,
    #[serde(rename = "ResponseCode")]
    response_code: String,
    #[serde(rename = "ResponseDescription")]
    response_description: Option<String>,
    #[serde(rename = "CustomerMessage")]
    customer_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StkQueryResponse {
    #[serde(rename = "ResultCode")]
    result_code: Option<serde_json::Value>,
    #[serde(rename = "ResultDesc")]
    result_desc: Option<String>,
    #[serde(rename = "MpesaReceiptNumber")]
    mpesa_receipt_number: Option<String>,
}

impl DarajaGateway {
    pub fn new(http: reqwest::Client, config: DarajaConfig) -> Self {
        Self {
            http,
            config,
            token: Mutex::new(None),
        }
    }

    /// Client-credentials token, cached until shortly before expiry.
    /// The lock is held across a refresh so concurrent callers never
    /// race duplicate token requests.
    async fn access_token(&self) -> Result<String, PaymentError> {
        let mut slot = self.token.lock().await;
        if let Some(cached) = slot.as_ref() {
            if Instant::now() < cached.expires_at {
                return Ok(cached.value.clone());
            }
        }

        let url = format!(
            "{}/oauth/v1/generate?grant_type=client_credentials",
            self.config.base_url
        );
        let resp = self
            .http
            .get(url)
            .basic_auth(&self.config.consumer_key, Some(&self.config.consumer_secret))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PaymentError::Gateway(format!(
                "authentication failed with {status}: {}",
                error_detail(&body)
            )));
        }

        let auth: AuthResponse = resp.json().await?;
        let expires_in = auth.expires_in.parse::<u64>().unwrap_or(3600);
        let ttl = Duration::from_secs(expires_in).saturating_sub(TOKEN_SAFETY_MARGIN);
        *slot = Some(CachedToken {
            value: auth.access_token.clone(),
            expires_at: Instant::now() + ttl,
        });
        tracing::debug!(ttl_secs = ttl.as_secs(), "daraja token refreshed");
        Ok(auth.access_token)
    }

    fn password_and_timestamp(&self) -> (String, String) {
        let timestamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
        let password = base64::engine::general_purpose::STANDARD.encode(format!(
            "{}{}{}",
            self.config.short_code, self.config.passkey, timestamp
        ));
        (password, timestamp)
    }

    async fn initiate_inner(&self, request: &ValidatedRequest) -> Result<InitiateAck, PaymentError> {
        let token = self.access_token().await?;
        let (password, timestamp) = self.password_and_timestamp();

        let payload = serde_json::json!({
            "BusinessShortCode": self.config.short_code,
            "Password": password,
            "Timestamp": timestamp,
            "TransactionType": "CustomerPayBillOnline",
            "Amount": request.amount.whole_units(),
            "PartyA": request.msisdn.as_str(),
            "PartyB": self.config.short_code,
            "PhoneNumber": request.msisdn.as_str(),
            "CallBackURL": self.config.callback_url,
            "AccountReference": request.reference,
            "TransactionDesc": request.description,
        });

        let resp = self
            .http
            .post(format!(
                "{}/mpesa/stkpush/v1/processrequest",
                self.config.base_url
            ))
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PaymentError::Gateway(format!(
                "STK push rejected with {status}: {}",
                error_detail(&body)
            )));
        }

        let ack: StkPushResponse = resp.json().await?;
        if ack.response_code != "0" {
            return Err(PaymentError::Gateway(ack.response_description.unwrap_or_else(
                || format!("STK push rejected with code {}", ack.response_code),
            )));
        }
        let checkout_request_id = ack.checkout_request_id.ok_or_else(|| {
            PaymentError::Gateway("accepted response carried no CheckoutRequestID".into())
        })?;

        Ok(InitiateAck::Accepted {
            checkout_id: CheckoutId::new(checkout_request_id)?,
            accepted_immediately: true,
            description: ack.customer_message.unwrap_or_default(),
        })
    }

    async fn check_status_inner(
        &self,
        checkout_id: &CheckoutId,
    ) -> Result<ProviderStatus, PaymentError> {
        let token = self.access_token().await?;
        let (password, timestamp) = self.password_and_timestamp();

        let payload = serde_json::json!({
            "BusinessShortCode": self.config.short_code,
            "Password": password,
            "Timestamp": timestamp,
            "CheckoutRequestID": checkout_id.as_str(),
        });

        let resp = self
            .http
            .post(format!(
                "{}/mpesa/stkpushquery/v1/query",
                self.config.base_url
            ))
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        // The query endpoint answers non-2xx while the push is still on
        // the payer's device. Surfaced as a gateway error; the poller
        // absorbs it as still-processing.
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PaymentError::Gateway(format!(
                "status query answered {status}: {}",
                error_detail(&body)
            )));
        }

        let parsed: StkQueryResponse = resp.json().await?;
        let Some(code) = parsed.result_code.map(code_to_string) else {
            return Err(PaymentError::Gateway(
                "status response carried no ResultCode".into(),
            ));
        };

        Ok(ProviderStatus {
            code,
            description: parsed.result_desc.unwrap_or_default(),
            receipt: parsed.mpesa_receipt_number,
        })
    }
}

impl PaymentGateway for DarajaGateway {
    fn initiate(
        &self,
        request: &ValidatedRequest,
    ) -> Pin<Box<dyn Future<Output = Result<InitiateAck, PaymentError>> + Send + '_>> {
        let request = request.clone();
        Box::pin(async move { self.initiate_inner(&request).await })
    }

    fn check_status(
        &self,
        checkout_id: &CheckoutId,
    ) -> Pin<Box<dyn Future<Output = Result<ProviderStatus, PaymentError>> + Send + '_>> {
        let id = checkout_id.clone();
        Box::pin(async move { self.check_status_inner(&id).await })
    }
}

/// The provider reports result codes as strings on some endpoints and
/// bare numbers on others.
fn code_to_string(v: serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("errorMessage")
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}
