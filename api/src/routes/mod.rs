//! Every endpoint of the API. Each handler declares its access level through
//! the `wrap` argument of its route attribute.

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::auth::{Access, AuthGate};

pub mod charity;
pub mod donations;
pub mod roles;
pub mod users;

/// `?email=` on listing endpoints.
#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(health_check)
        // Users
        .service(users::upsert_user)
        .service(users::list_users)
        .service(users::get_user_role)
        .service(users::update_user_role)
        .service(users::delete_user)
        // Donations
        .service(donations::list_donations)
        .service(donations::list_all_donations)
        .service(donations::create_donation)
        .service(donations::my_donations)
        .service(donations::delete_donation)
        .service(donations::pending_donations)
        .service(donations::accepted_pickups)
        // Pickup requests
        .service(charity::create_charity_request)
        .service(charity::requested_charity_requests)
        .service(charity::delete_charity_request)
        .service(charity::restaurant_requests)
        .service(charity::resolve_request)
        // Charity role applications
        .service(roles::create_payment_intent)
        .service(roles::apply_charity_role)
        .service(roles::pending_role_requests)
        .service(roles::review_role_request)
        .service(roles::transaction_status)
        .service(roles::transaction_history);
}

#[actix_web::get("/", wrap = "AuthGate::new(Access::Public)")]
async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain")
        .body("Hello, server is running!")
}

#[actix_web::get("/health", wrap = "AuthGate::new(Access::Public)")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().content_type("text/plain").body("OK")
}
