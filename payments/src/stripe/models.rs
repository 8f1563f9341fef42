use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePaymentIntentResponse {
    pub id: String,
    /// Amount intended to be collected, in currency subunits.
    pub amount: u32,
    pub currency: String,
    pub status: String,
    /// Handed to the browser to confirm the payment. Absent when the intent is
    /// fetched with a publishable key.
    #[serde(default)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StripeErrorBody {
    pub error: StripeErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StripeErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}
