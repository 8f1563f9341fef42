use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, info};

use super::models::{CreatePaymentIntentResponse, StripeErrorBody};
use crate::payment_client::{PaymentError, PaymentGateway, PaymentIntent, PaymentIntentRequest};

const STRIPE_API_URL: &str = "https://api.stripe.com/v1";

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    base_url: String,
}

impl StripeClient {
    pub fn new(secret_key: String, timeout: Duration) -> Result<Self, PaymentError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(StripeClient {
            client,
            secret_key,
            base_url: STRIPE_API_URL.to_string(),
        })
    }

    /// Points the client at another API root, e.g. a local stripe-mock.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Stripe takes form-encoded bodies with bracketed keys for lists and maps.
    fn form_params(request: &PaymentIntentRequest) -> Vec<(String, String)> {
        let mut params = vec![
            ("amount".to_string(), request.amount.to_string()),
            ("currency".to_string(), request.currency.clone()),
        ];
        for method in &request.payment_method_types {
            params.push(("payment_method_types[]".to_string(), method.clone()));
        }
        for (key, value) in &request.metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
        }
        params
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        info!(
            "Creating payment intent for {} {}",
            request.amount, request.currency
        );

        let response = self
            .client
            .post(format!("{}/payment_intents", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&Self::form_params(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<StripeErrorBody>().await {
                Ok(body) => body
                    .error
                    .message
                    .unwrap_or_else(|| format!("Stripe returned {}", status)),
                Err(_) => format!("Stripe returned {}", status),
            };
            error!("Stripe rejected payment intent: {}", message);
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let intent: CreatePaymentIntentResponse = response.json().await?;
        let client_secret = intent
            .client_secret
            .ok_or_else(|| PaymentError::MissingClientSecret(intent.id.clone()))?;

        Ok(PaymentIntent {
            id: intent.id,
            client_secret,
            amount: intent.amount,
            currency: intent.currency,
            status: intent.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_params_encode_methods_and_metadata() {
        let request = PaymentIntentRequest::card(2500, "usd")
            .with_metadata("userEmail", "a@x.com")
            .with_metadata("purpose", "Charity Role Request");

        let params = StripeClient::form_params(&request);
        let pairs: Vec<(&str, &str)> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        assert_eq!(
            pairs,
            vec![
                ("amount", "2500"),
                ("currency", "usd"),
                ("payment_method_types[]", "card"),
                ("metadata[purpose]", "Charity Role Request"),
                ("metadata[userEmail]", "a@x.com"),
            ]
        );
    }

    #[test]
    fn decodes_stripe_error_body() {
        let body: StripeErrorBody = serde_json::from_str(
            r#"{"error":{"message":"Invalid API Key provided","type":"invalid_request_error"}}"#,
        )
        .unwrap();
        assert_eq!(body.error.message.as_deref(), Some("Invalid API Key provided"));
        assert_eq!(body.error.kind.as_deref(), Some("invalid_request_error"));
        assert!(body.error.code.is_none());
    }

    #[tokio::test]
    async fn unreachable_gateway_is_an_http_error() {
        let client = StripeClient::new("sk_test".into(), Duration::from_millis(500))
            .unwrap()
            .with_base_url("http://127.0.0.1:9");

        let result = client
            .create_payment_intent(&PaymentIntentRequest::card(2500, "usd"))
            .await;
        assert!(matches!(result, Err(PaymentError::Http(_))));
    }
}
