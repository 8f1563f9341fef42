use actix_web::{web, HttpResponse};
use common::{
    db::to_document,
    models::{Donation, DonationDetails},
    utils::{Collection, DonationStatus},
    Filter,
};
use serde_json::json;
use tracing::info;

use super::EmailQuery;
use crate::{
    auth::{Access, AuthGate},
    error::ApiError,
    AppState,
};

async fn all_donations(app_state: &AppState) -> Result<HttpResponse, ApiError> {
    let donations = app_state
        .store
        .find(Collection::Donations, &Filter::all())
        .await?;
    Ok(HttpResponse::Ok().json(donations))
}

#[actix_web::get("/donations", wrap = "AuthGate::new(Access::Public)")]
pub async fn list_donations(app_state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    all_donations(&app_state).await
}

// Same listing under the path the dashboard uses.
#[actix_web::get("/all/donation", wrap = "AuthGate::new(Access::Public)")]
pub async fn list_all_donations(app_state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    all_donations(&app_state).await
}

/// Posts a donation. It starts out pending, waiting for a charity to request it.
#[actix_web::post("/donation/post", wrap = "AuthGate::new(Access::Public)")]
pub async fn create_donation(
    req: web::Json<DonationDetails>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let donation = Donation::new(req.into_inner());
    let id = app_state
        .store
        .insert_one(Collection::Donations, to_document(&donation)?)
        .await?;
    info!(
        "Donation {} posted by {}",
        id,
        donation.details.email.as_deref().unwrap_or("unknown donor")
    );

    Ok(HttpResponse::Created().json(json!({ "message": "Donation created", "insertedId": id })))
}

#[actix_web::get("/my/donations", wrap = "AuthGate::new(Access::Public)")]
pub async fn my_donations(
    query: web::Query<EmailQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let donations = app_state
        .store
        .find(
            Collection::Donations,
            &Filter::all().eq("email", query.into_inner().email),
        )
        .await?;
    Ok(HttpResponse::Ok().json(donations))
}

#[actix_web::delete("/donation/{id}", wrap = "AuthGate::new(Access::Public)")]
pub async fn delete_donation(
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let deleted = app_state
        .store
        .delete_one(Collection::Donations, &Filter::by_id(id.as_str()))
        .await?;

    if deleted == 0 {
        return Err(ApiError::NotFound("Donation not found"));
    }
    info!("Deleted donation {}", id);

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// Donations still waiting for a charity, for charities browsing what to request.
#[actix_web::get("/charity/request/donation", wrap = "AuthGate::new(Access::Public)")]
pub async fn pending_donations(app_state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let donations = app_state
        .store
        .find(
            Collection::Donations,
            &Filter::all().eq("status", DonationStatus::Pending.as_str()),
        )
        .await?;
    Ok(HttpResponse::Ok().json(donations))
}

/// Donations a charity has been handed, i.e. accepted pickups.
#[actix_web::get("/api/pickup", wrap = "AuthGate::new(Access::Public)")]
pub async fn accepted_pickups(
    query: web::Query<EmailQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let donations = app_state
        .store
        .find(
            Collection::Donations,
            &Filter::all().eq("charityEmail", query.into_inner().email),
        )
        .await?;
    Ok(HttpResponse::Ok().json(donations))
}
