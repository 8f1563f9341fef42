//! Payment gateway abstraction and the Stripe client behind it.

mod payment_client;
pub mod stripe;

pub use payment_client::{PaymentError, PaymentGateway, PaymentIntent, PaymentIntentRequest};
pub use stripe::StripeClient;
