use std::{
    rc::Rc,
    task::{Context, Poll},
};

use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage, ResponseError,
};
use common::{
    db::from_document,
    models::User,
    utils::{Collection, Role},
    Filter,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use tracing::{debug, warn};

use super::{bearer_token, Claims};
use crate::{error::ApiError, AppState};

/// Who may call a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Any caller with a verified bearer token.
    User,
    /// A verified caller whose stored user record has the admin role.
    Admin,
}

/// Per-route guard. Every route declares one, `Public` included, so the
/// access level of each endpoint is visible where it is defined.
pub struct AuthGate {
    access: Access,
}

impl AuthGate {
    pub fn new(access: Access) -> Self {
        Self { access }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthGateService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthGateService {
            service: Rc::new(service),
            access: self.access,
        })
    }
}

pub struct AuthGateService<S> {
    service: Rc<S>,
    access: Access,
}

impl<S, B> Service<ServiceRequest> for AuthGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let access = self.access;

        Box::pin(async move {
            let outcome = authorize(&req, access).await;
            match outcome {
                Ok(Some(claims)) => {
                    debug!("Authenticated {} for {}", claims.sub, req.path());
                    req.extensions_mut().insert(claims);
                }
                Ok(None) => {}
                Err(e) => {
                    // Answer here; the route never runs
                    return Ok(req.into_response(e.error_response().map_into_right_body()));
                }
            }

            service.call(req).await.map(ServiceResponse::map_into_left_body)
        })
    }
}

/// Returns the verified claims, or `None` for public routes.
async fn authorize(req: &ServiceRequest, access: Access) -> Result<Option<Claims>, ApiError> {
    if access == Access::Public {
        return Ok(None);
    }

    let token = bearer_token(req.headers()).ok_or(ApiError::Unauthorized)?;

    let app_state = req
        .app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| ApiError::Internal("application state not registered".into()))?;

    let claims = app_state.verifier.verify(&token).await.map_err(|e| {
        warn!("Error verifying token: {}", e);
        ApiError::Forbidden
    })?;

    if access == Access::Admin {
        ensure_admin(&app_state, &claims).await?;
    }

    Ok(Some(claims))
}

async fn ensure_admin(app_state: &AppState, claims: &Claims) -> Result<(), ApiError> {
    let email = claims.email.as_deref().ok_or(ApiError::Forbidden)?;

    let user = app_state
        .store
        .find_one(Collection::Users, &Filter::all().eq("email", email))
        .await?;

    let is_admin = match user {
        Some(doc) => from_document::<User>(doc)?.role == Role::Admin.as_str(),
        None => false,
    };

    if is_admin {
        Ok(())
    } else {
        warn!("{} is not an admin", email);
        Err(ApiError::Forbidden)
    }
}
