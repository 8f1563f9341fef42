use std::collections::BTreeMap;

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntentRequest {
    /// Amount in currency subunits.
    pub amount: u32,
    /// ISO currency code, lowercase.
    pub currency: String,
    pub payment_method_types: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

impl PaymentIntentRequest {
    pub fn card(amount: u32, currency: &str) -> Self {
        Self {
            amount,
            currency: currency.to_string(),
            payment_method_types: vec!["card".to_string()],
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: u32,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment gateway unreachable: {0}")]
    Http(#[from] reqwest::Error),
    /// The gateway answered with an error; `message` is its own description.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("payment intent {0} has no client secret")]
    MissingClientSecret(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError>;
}
