use actix_web::{web, HttpResponse};
use common::{
    db::{from_document, to_document},
    models::User,
    utils::{Collection, Role},
    Filter,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    auth::{Access, AuthGate},
    error::ApiError,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct UpsertUserRequest {
    #[serde(default)]
    name: Option<String>,
    email: String,
    #[serde(default)]
    photo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleQuery {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    role: String,
}

/// Creates the user on first sign-in. Calling it again with the same email
/// is a no-op.
#[actix_web::post("/users", wrap = "AuthGate::new(Access::Public)")]
pub async fn upsert_user(
    req: web::Json<UpsertUserRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let req = req.into_inner();
    if req.email.trim().is_empty() {
        return Err(ApiError::BadRequest("Email is required".into()));
    }

    let existing = app_state
        .store
        .find_one(Collection::Users, &Filter::all().eq("email", req.email.as_str()))
        .await?;
    if existing.is_some() {
        return Ok(HttpResponse::Ok().json(json!({ "message": "User already exists" })));
    }

    let user = User {
        id: None,
        name: req.name,
        email: req.email,
        photo: req.photo,
        role: Role::User.to_string(),
    };
    let id = app_state
        .store
        .insert_one(Collection::Users, to_document(&user)?)
        .await?;
    info!("Created user {} ({})", user.email, id);

    Ok(HttpResponse::Created().json(json!({ "message": "User created", "insertedId": id })))
}

#[actix_web::get("/users", wrap = "AuthGate::new(Access::Public)")]
pub async fn list_users(app_state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let users = app_state
        .store
        .find(Collection::Users, &Filter::all())
        .await?;
    Ok(HttpResponse::Ok().json(users))
}

#[actix_web::get("/api/user/role", wrap = "AuthGate::new(Access::Public)")]
pub async fn get_user_role(
    query: web::Query<RoleQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let email = query
        .into_inner()
        .email
        .filter(|email| !email.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Email is required".into()))?;

    let user = app_state
        .store
        .find_one(Collection::Users, &Filter::all().eq("email", email))
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;
    let user: User = from_document(user)?;

    Ok(HttpResponse::Ok().json(json!({ "role": user.role })))
}

#[actix_web::patch("/users/{id}", wrap = "AuthGate::new(Access::Public)")]
pub async fn update_user_role(
    path: web::Path<String>,
    req: web::Json<UpdateRoleRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let role = req.into_inner().role;
    if role.trim().is_empty() {
        return Err(ApiError::BadRequest("Role is required".into()));
    }

    let result = app_state
        .store
        .update_one(
            Collection::Users,
            &Filter::by_id(id.as_str()),
            to_document(&json!({ "role": role }))?,
        )
        .await?;

    if result.modified == 0 {
        return Err(ApiError::NotFound("User not found or role unchanged"));
    }
    info!("Set role of user {} to {}", id, role);

    Ok(HttpResponse::Ok().json(json!({ "message": "Role updated successfully" })))
}

#[actix_web::delete("/users/{id}", wrap = "AuthGate::new(Access::Public)")]
pub async fn delete_user(
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let deleted = app_state
        .store
        .delete_one(Collection::Users, &Filter::by_id(id.as_str()))
        .await?;

    if deleted == 0 {
        return Err(ApiError::NotFound("User not found"));
    }
    info!("Deleted user {}", id);

    Ok(HttpResponse::Ok().json(json!({ "message": "User deleted successfully" })))
}
