//! Charity role applications: fee payment, application, admin review, and
//! the applicant's view of their transaction.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use common::{
    db::{from_document, to_document},
    models::{CharityRoleRequest, TransactionRecord},
    utils::{
        Collection, ReviewStatus, Role, ROLE_FEE_AMOUNT, ROLE_FEE_CURRENCY, ROLE_FEE_MINOR_UNITS,
        ROLE_REQUEST_PURPOSE,
    },
    Filter,
};
use payments::PaymentIntentRequest;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use validator::Validate;

use super::EmailQuery;
use crate::{
    auth::{Access, AuthGate, AuthenticatedUser},
    error::ApiError,
    AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentBody {
    user_email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CharityRoleApplication {
    #[validate(email)]
    user_email: String,
    #[validate(length(min = 1, message = "orgName is required"))]
    org_name: String,
    #[validate(length(min = 1, message = "mission is required"))]
    mission: String,
    #[validate(length(min = 1, message = "transactionId is required"))]
    transaction_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    status: ReviewStatus,
}

/// Starts the fee payment for a charity role application. The amount and
/// currency are fixed.
#[actix_web::post("/charity/create-payment-intent", wrap = "AuthGate::new(Access::Public)")]
pub async fn create_payment_intent(
    req: web::Json<PaymentIntentBody>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let user_email = req.into_inner().user_email;
    let request = PaymentIntentRequest::card(ROLE_FEE_MINOR_UNITS, ROLE_FEE_CURRENCY)
        .with_metadata("userEmail", &user_email)
        .with_metadata("purpose", ROLE_REQUEST_PURPOSE);

    let intent = app_state
        .payments
        .create_payment_intent(&request)
        .await
        .map_err(|e| {
            error!("Stripe error: {}", e);
            ApiError::Payment(e.to_string())
        })?;
    info!("Payment intent {} created for {}", intent.id, user_email);

    Ok(HttpResponse::Ok().json(json!({ "clientSecret": intent.client_secret })))
}

/// Records a paid application. Writes the role request and then its
/// transaction record; the two inserts are not atomic.
#[actix_web::post("/apply/charity-request", wrap = "AuthGate::new(Access::Public)")]
pub async fn apply_charity_role(
    req: web::Json<CharityRoleApplication>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let application = req.into_inner();
    application
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    info!(
        "Charity role application from {} ({})",
        application.user_email, application.transaction_id
    );

    let previous = app_state
        .store
        .find(
            Collection::CharityRoleRequests,
            &Filter::all().eq("userEmail", application.user_email.as_str()),
        )
        .await?;
    for doc in previous {
        let existing: CharityRoleRequest = from_document(doc)?;
        if existing.status != ReviewStatus::Rejected {
            return Err(ApiError::Conflict(
                "A pending or approved charity request already exists",
            ));
        }
    }

    let now = Utc::now();
    let role_request = CharityRoleRequest {
        id: None,
        user_email: application.user_email.clone(),
        org_name: application.org_name,
        mission: application.mission,
        transaction_id: application.transaction_id.clone(),
        status: ReviewStatus::Pending,
        create_at: now,
    };
    app_state
        .store
        .insert_one(Collection::CharityRoleRequests, to_document(&role_request)?)
        .await?;

    let transaction = TransactionRecord {
        id: None,
        transaction_id: application.transaction_id,
        amount: ROLE_FEE_AMOUNT,
        date: now,
        user_email: application.user_email,
        purpose: ROLE_REQUEST_PURPOSE.to_string(),
        status: ReviewStatus::Pending,
    };
    app_state
        .store
        .insert_one(Collection::TransactionHistory, to_document(&transaction)?)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[actix_web::get("/admin/approve-request", wrap = "AuthGate::new(Access::Admin)")]
pub async fn pending_role_requests(
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let requests = app_state
        .store
        .find(
            Collection::CharityRoleRequests,
            &Filter::all().eq("status", ReviewStatus::Pending.as_str()),
        )
        .await?;
    Ok(HttpResponse::Ok().json(requests))
}

/// Approves or rejects role request `id`. Only pending requests can be
/// reviewed. Approval grants the applicant the charity role. The request,
/// its transaction record and the user are updated one after another.
#[actix_web::patch("/admin/approve-request/{id}", wrap = "AuthGate::new(Access::Admin)")]
pub async fn review_role_request(
    admin: AuthenticatedUser,
    path: web::Path<String>,
    req: web::Json<ReviewBody>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let status = req.into_inner().status;
    if status == ReviewStatus::Pending {
        return Err(ApiError::BadRequest(
            "status must be approved or rejected".into(),
        ));
    }

    let role_request: CharityRoleRequest = app_state
        .store
        .find_one(Collection::CharityRoleRequests, &Filter::by_id(id.as_str()))
        .await?
        .map(from_document::<CharityRoleRequest>)
        .transpose()?
        .ok_or(ApiError::NotFound("Role request not found"))?;
    if role_request.status != ReviewStatus::Pending {
        return Err(ApiError::Conflict("Role request has already been reviewed"));
    }

    let set_status = to_document(&json!({ "status": status }))?;
    app_state
        .store
        .update_one(
            Collection::CharityRoleRequests,
            &Filter::by_id(id.as_str()),
            set_status.clone(),
        )
        .await?;
    app_state
        .store
        .update_one(
            Collection::TransactionHistory,
            &Filter::all()
                .eq("transactionId", role_request.transaction_id.as_str())
                .eq("userEmail", role_request.user_email.as_str()),
            set_status,
        )
        .await?;

    if status == ReviewStatus::Approved {
        let granted = app_state
            .store
            .update_one(
                Collection::Users,
                &Filter::all().eq("email", role_request.user_email.as_str()),
                to_document(&json!({ "role": Role::Charity }))?,
            )
            .await?;
        if granted.matched == 0 {
            warn!("Approved {} but no user has that email", role_request.user_email);
        }
    }
    info!(
        "Role request {} {} by {}",
        id,
        status,
        admin.email.as_deref().unwrap_or(&admin.user_id)
    );

    Ok(HttpResponse::Ok().json(json!({ "message": format!("Role request {}", status) })))
}

async fn transaction_for(
    app_state: &AppState,
    email: String,
) -> Result<HttpResponse, ApiError> {
    let transactions = app_state
        .store
        .find(
            Collection::TransactionHistory,
            &Filter::all().eq("userEmail", email),
        )
        .await?;
    // A rejected applicant may pay again; report the latest payment.
    // Ties keep the later insert.
    let latest = transactions.into_iter().max_by_key(|doc| {
        doc.get("date")
            .and_then(Value::as_str)
            .and_then(|date| DateTime::parse_from_rfc3339(date).ok())
    });
    // `null` when the user has not paid yet
    Ok(HttpResponse::Ok().json(latest))
}

#[actix_web::get("/user/show/status", wrap = "AuthGate::new(Access::Public)")]
pub async fn transaction_status(
    query: web::Query<EmailQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    transaction_for(&app_state, query.into_inner().email).await
}

#[actix_web::get("/transaction/history", wrap = "AuthGate::new(Access::Public)")]
pub async fn transaction_history(
    query: web::Query<EmailQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    transaction_for(&app_state, query.into_inner().email).await
}
