//! WiPay hosted checkout

use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, Client};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::WiPayConfig;
use crate::error::{AppError, AppResult};

const WIPAY_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Clone)]
pub struct WiPayClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
}

#[derive(Debug, Serialize)]
pub struct CreatePaymentRequest {
    pub order_id: String,
    pub amount: f64,
    pub currency: &'static str,
    pub redirect_url: String,
    pub callback_url: String,
}

#[derive(Debug, Deserialize)]
struct CreatePaymentResponse {
    payment_url: Option<String>,
}

impl CreatePaymentRequest {
    /// Payment for an order total, in TTD, returning the shopper to
    /// `public_url`
    pub fn new(order_id: &str, amount: Decimal, public_url: &str) -> Self {
        let base = public_url.trim_end_matches('/');
        Self {
            order_id: order_id.to_string(),
            amount: amount.round_dp(2).to_f64().unwrap_or_default(),
            currency: "TTD",
            redirect_url: format!("{}/payment-success", base),
            callback_url: format!("{}/payment-callback", base),
        }
    }
}

impl WiPayClient {
    pub fn new(config: &WiPayConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            endpoint: config.endpoint.clone(),
        }
    }

    /// Create a hosted payment and return the URL to send the shopper to
    pub async fn create_payment(&self, request: &CreatePaymentRequest) -> AppResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::PaymentGateway("WIPAY_API_KEY is missing".into()))?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .timeout(WIPAY_TIMEOUT)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::PaymentGateway(format!("Request failed: {}", e)))?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));

        if status.is_success() && is_json {
            let body: CreatePaymentResponse = response
                .json()
                .await
                .map_err(|e| AppError::PaymentGateway(format!("Failed to parse response: {}", e)))?;
            if let Some(url) = body.payment_url.filter(|u| !u.is_empty()) {
                return Ok(url);
            }
            return Err(AppError::PaymentGateway("Response had no payment_url".into()));
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(AppError::PaymentGateway(format!(
            "WiPay error {}: {}",
            status,
            body.chars().take(400).collect::<String>()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_payment_request() {
        let req = CreatePaymentRequest::new(
            "42",
            Decimal::from_str("1250.505").unwrap(),
            "https://shop.example.tt/",
        );
        assert_eq!(req.amount, 1250.5);
        assert_eq!(req.currency, "TTD");
        assert_eq!(req.redirect_url, "https://shop.example.tt/payment-success");
        assert_eq!(req.callback_url, "https://shop.example.tt/payment-callback");
    }

    #[tokio::test]
    async fn test_missing_key_is_gateway_error() {
        let client = WiPayClient::new(&WiPayConfig {
            api_key: None,
            endpoint: "http://127.0.0.1:9".into(),
        });
        let req = CreatePaymentRequest::new("1", Decimal::ONE, "http://localhost:5000");
        let err = client.create_payment(&req).await.unwrap_err();
        assert!(matches!(err, AppError::PaymentGateway(_)));
    }
}
