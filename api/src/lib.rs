//! HTTP API for the food donation platform: donations, pickup requests,
//! users, and paid charity role applications.

use std::sync::Arc;

use actix_web::web;
use common::DocumentStore;
use payments::PaymentGateway;

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod security;

use auth::IdentityVerifier;

/// Collaborators shared by every handler. Built once at startup and handed to
/// the app as `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub payments: Arc<dyn PaymentGateway>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        verifier: Arc<dyn IdentityVerifier>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            store,
            verifier,
            payments,
        }
    }
}

/// Registers every route together with the JSON and query extractor settings.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(error::json_config())
        .app_data(error::query_config());
    routes::configure(cfg);
}
