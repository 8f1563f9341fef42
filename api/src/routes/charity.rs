//! Pickup requests: a charity asks for a donation, the donor accepts or
//! rejects, and the charity may withdraw while the request is open.

use actix_web::{web, HttpResponse};
use common::{
    db::{from_document, to_document, Document},
    models::CharityRequest,
    utils::{Collection, DonationStatus, RequestStatus},
    Filter,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::EmailQuery;
use crate::{
    auth::{Access, AuthGate, AuthenticatedUser},
    error::ApiError,
    AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    request_status: RequestStatus,
    #[serde(default)]
    charity_email: Option<String>,
}

#[actix_web::post("/charity/request", wrap = "AuthGate::new(Access::Public)")]
pub async fn create_charity_request(
    req: web::Json<Document>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    // Typed round trip fills in the default status and keeps unknown fields.
    let request: CharityRequest = from_document(req.into_inner())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let id = app_state
        .store
        .insert_one(Collection::CharityRequests, to_document(&request)?)
        .await?;
    info!(
        "Charity request {} for donation {}",
        id,
        request.donation_id.as_deref().unwrap_or("-")
    );

    Ok(HttpResponse::Created().json(json!({
        "message": "Charity request created",
        "requestId": id,
    })))
}

/// Open requests that charities may still cancel.
#[actix_web::get("/charity/request/cancel", wrap = "AuthGate::new(Access::Public)")]
pub async fn requested_charity_requests(
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let requests = app_state
        .store
        .find(
            Collection::CharityRequests,
            &Filter::all().eq("requestStatus", RequestStatus::Requested.as_str()),
        )
        .await?;
    Ok(HttpResponse::Ok().json(requests))
}

/// Cancels the request made for donation `id`.
#[actix_web::delete("/charity/request/{id}", wrap = "AuthGate::new(Access::Public)")]
pub async fn delete_charity_request(
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let donation_id = path.into_inner();
    let deleted = app_state
        .store
        .delete_one(
            Collection::CharityRequests,
            &Filter::all().eq("donationId", donation_id.as_str()),
        )
        .await?;

    if deleted == 0 {
        return Err(ApiError::NotFound("Request not found"));
    }
    info!("Charity request for donation {} canceled", donation_id);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Charity request canceled",
    })))
}

/// Requests awaiting a decision from the donor identified by `email`.
#[actix_web::get("/restaurant/request", wrap = "AuthGate::new(Access::User)")]
pub async fn restaurant_requests(
    user: AuthenticatedUser,
    query: web::Query<EmailQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let email = query.into_inner().email;
    info!("{} listing open requests for {}", user.user_id, email);

    let requests = app_state
        .store
        .find(
            Collection::CharityRequests,
            &Filter::all()
                .eq("restaurantEmail", email)
                .eq("requestStatus", RequestStatus::Requested.as_str()),
        )
        .await?;
    Ok(HttpResponse::Ok().json(requests))
}

/// Donor decision on the request for donation `id`.
///
/// The request update and the donation write are separate store calls with
/// no rollback. If the second fails the request keeps its new status and the
/// donation is left as it was.
#[actix_web::put("/restaurant/request/{id}", wrap = "AuthGate::new(Access::Public)")]
pub async fn resolve_request(
    path: web::Path<String>,
    req: web::Json<ResolveRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let donation_id = path.into_inner();
    let ResolveRequest {
        request_status,
        charity_email,
    } = req.into_inner();

    if request_status == RequestStatus::Accepted && charity_email.is_none() {
        return Err(ApiError::BadRequest(
            "charityEmail is required to accept a request".into(),
        ));
    }

    let updated = app_state
        .store
        .update_one(
            Collection::CharityRequests,
            &Filter::all().eq("donationId", donation_id.as_str()),
            to_document(&json!({ "requestStatus": request_status }))?,
        )
        .await?;
    if updated.matched == 0 {
        warn!("No charity request found for donation {}", donation_id);
    }

    match request_status {
        RequestStatus::Accepted => {
            app_state
                .store
                .update_one(
                    Collection::Donations,
                    &Filter::by_id(donation_id.as_str()),
                    to_document(&json!({
                        "status": DonationStatus::Accepted,
                        "charityEmail": charity_email,
                    }))?,
                )
                .await?;
        }
        RequestStatus::Rejected => {
            app_state
                .store
                .delete_one(Collection::Donations, &Filter::by_id(donation_id.as_str()))
                .await?;
        }
        RequestStatus::Requested => {}
    }
    info!("Request for donation {} is now {}", donation_id, request_status);

    Ok(HttpResponse::Ok().json(json!({ "message": "Request status updated successfully" })))
}
