mod models;
mod stripe_client;

pub use models::{CreatePaymentIntentResponse, StripeErrorBody, StripeErrorDetail};
pub use stripe_client::StripeClient;
