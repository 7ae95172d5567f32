use {
    crate::domain::{
        error::PaymentError,
        gateway::{InitiateAck, PaymentGateway, ProviderStatus},
        id::CheckoutId,
        money::Currency,
        request::ValidatedRequest,
    },
    serde::Deserialize,
    std::{env, future::Future, pin::Pin},
    tokio::sync::Mutex,
    uuid::Uuid,
};

#[derive(Debug, Clone)]
pub struct PesapalConfig {
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub callback_url: String,
    pub ipn_url: String,
    pub currency: Currency,
}

impl PesapalConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("PESAPAL_BASE_URL")
                .unwrap_or_else(|_| "https://cybqa.pesapal.com/pesapalv3".to_string()),
            consumer_key: env::var("PESAPAL_CONSUMER_KEY")
                .expect("PESAPAL_CONSUMER_KEY must be set"),
            consumer_secret: env::var("PESAPAL_CONSUMER_SECRET")
                .expect("PESAPAL_CONSUMER_SECRET must be set"),
            callback_url: env::var("PESAPAL_CALLBACK_URL")
                .expect("PESAPAL_CALLBACK_URL must be set"),
            ipn_url: env::var("PESAPAL_IPN_URL").expect("PESAPAL_IPN_URL must be set"),
            currency: env::var("PESAPAL_CURRENCY")
                .ok()
                .and_then(|v| Currency::try_from(v.as_str()).ok())
                .unwrap_or(Currency::Kes),
        }
    }
}

/// Redirect-mode gateway client: the payer is sent to a hosted page and
/// the caller probes the order status after control returns. No polling
/// loop on this path.
pub struct PesapalGateway {
    http: reqwest::Client,
    config: PesapalConfig,
    /// Registered once per process; the provider keys callback delivery
    /// on this id.
    ipn_id: Mutex<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IpnResponse {
    ipn_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmitOrderResponse {
    order_tracking_id: Option<String>,
    redirect_url: Option<String>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TransactionStatusResponse {
    payment_status_description: Option<String>,
    confirmation_code: Option<String>,
}

impl PesapalGateway {
    pub fn new(http: reqwest::Client, config: PesapalConfig) -> Self {
        Self {
            http,
            config,
            ipn_id: Mutex::new(None),
        }
    }

    async fn request_token(&self) -> Result<String, PaymentError> {
        let resp = self
            .http
            .post(format!("{}/api/Auth/RequestToken", self.config.base_url))
            .json(&serde_json::json!({
                "consumer_key": self.config.consumer_key,
                "consumer_secret": self.config.consumer_secret,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PaymentError::Gateway(format!(
                "authentication failed with {status}: {}",
                truncated(&body)
            )));
        }

        let parsed: TokenResponse = resp.json().await?;
        parsed
            .token
            .ok_or_else(|| PaymentError::Gateway("token not found in auth response".into()))
    }

    async fn notification_id(&self, token: &str) -> Result<String, PaymentError> {
        let mut slot = self.ipn_id.lock().await;
        if let Some(id) = slot.as_ref() {
            return Ok(id.clone());
        }

        let resp = self
            .http
            .post(format!("{}/api/URLSetup/RegisterIPN", self.config.base_url))
            .bearer_auth(token)
            .json(&serde_json::json!({
                "url": self.config.ipn_url,
                "ipn_notification_type": "POST",
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PaymentError::Gateway(format!(
                "IPN registration failed with {status}: {}",
                truncated(&body)
            )));
        }

        let parsed: IpnResponse = resp.json().await?;
        let id = parsed
            .ipn_id
            .ok_or_else(|| PaymentError::Gateway("ipn_id not found in response".into()))?;
        tracing::info!(ipn_id = %id, "pesapal IPN registered");
        *slot = Some(id.clone());
        Ok(id)
    }

    async fn initiate_inner(&self, request: &ValidatedRequest) -> Result<InitiateAck, PaymentError> {
        let Some(email) = request.email.as_ref() else {
            return Err(PaymentError::Validation(
                "email is required for hosted checkout".into(),
            ));
        };

        let token = self.request_token().await?;
        let notification_id = self.notification_id(&token).await?;
        let merchant_reference = format!("{}-{}", request.reference, Uuid::now_v7().simple());

        let payload = serde_json::json!({
            "id": merchant_reference,
            "currency": self.config.currency.as_str(),
            "amount": request.amount.major_units(),
            "description": request.description,
            "redirect_mode": "PARENT_WINDOW",
            "callback_url": self.config.callback_url,
            "notification_id": notification_id,
            "billing_address": {
                "email_address": email.as_str(),
                "phone_number": request.msisdn.as_str(),
                "country_code": "KE",
                "first_name": request.first_name.as_deref().unwrap_or_default(),
                "middle_name": "",
                "last_name": request.last_name.as_deref().unwrap_or_default(),
                "line_1": "",
                "line_2": "",
                "city": "Nairobi",
                "state": "Nairobi",
                "postal_code": "00100",
                "zip_code": "00100",
            },
        });

        let resp = self
            .http
            .post(format!(
                "{}/api/Transactions/SubmitOrderRequest",
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
                "order submission failed with {status}: {}",
                truncated(&body)
            )));
        }

        let parsed: SubmitOrderResponse = resp.json().await?;
        if let Some(error) = parsed.error.filter(|e| !e.is_null()) {
            return Err(PaymentError::Gateway(format!(
                "order submission rejected: {error}"
            )));
        }
        let (Some(tracking), Some(redirect_url)) = (parsed.order_tracking_id, parsed.redirect_url)
        else {
            return Err(PaymentError::Gateway(
                "order response missing tracking id or redirect url".into(),
            ));
        };

        Ok(InitiateAck::Redirect {
            reference: CheckoutId::new(tracking)?,
            redirect_url,
        })
    }

    async fn check_status_inner(
        &self,
        checkout_id: &CheckoutId,
    ) -> Result<ProviderStatus, PaymentError> {
        let token = self.request_token().await?;

        let resp = self
            .http
            .get(format!(
                "{}/api/Transactions/GetTransactionStatus",
                self.config.base_url
            ))
            .bearer_auth(&token)
            .query(&[("orderTrackingId", checkout_id.as_str())])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PaymentError::Gateway(format!(
                "transaction status answered {status}: {}",
                truncated(&body)
            )));
        }

        let parsed: TransactionStatusResponse = resp.json().await?;
        let raw_status = parsed.payment_status_description.unwrap_or_default();

        Ok(ProviderStatus {
            // Status words are matched case-insensitively against the
            // code table.
            code: raw_status.to_uppercase(),
            description: raw_status,
            receipt: parsed.confirmation_code,
        })
    }
}

impl PaymentGateway for PesapalGateway {
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

fn truncated(body: &str) -> String {
    body.chars().take(200).collect()
}
