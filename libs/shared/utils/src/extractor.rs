use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Anything that can hand the auth middleware the JWT secret.
pub trait AuthConfigProvider: Send + Sync + 'static {
    fn jwt_secret(&self) -> &str;
}

impl AuthConfigProvider for AppConfig {
    fn jwt_secret(&self) -> &str {
        &self.supabase_jwt_secret
    }
}

pub async fn auth_middleware<S>(
    State(state): State<Arc<S>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError>
where
    S: AuthConfigProvider,
{
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let user = validate_token(token, state.jwt_secret()).map_err(AppError::Auth)?;

    if user.parsed_role().is_none() {
        return Err(AppError::Forbidden(format!(
            "Unrecognised role: {}",
            user.role.as_deref().unwrap_or("none")
        )));
    }

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub fn extract_user<B>(request: &Request<B>) -> Result<User, AppError> {
    request
        .extensions()
        .get::<User>()
        .cloned()
        .ok_or_else(|| AppError::Auth("User not found in request extensions".to_string()))
}

/// Role gate used at the top of handlers.
pub fn require_role(user: &User, allowed: &[Role]) -> Result<Role, AppError> {
    match user.parsed_role() {
        Some(role) if allowed.contains(&role) => Ok(role),
        Some(role) => Err(AppError::Forbidden(format!(
            "Role {} is not allowed to perform this action",
            role
        ))),
        None => Err(AppError::Forbidden("Missing role".to_string())),
    }
}

/// Facility the caller acts within; tenant resolution arrives via the token.
pub fn require_facility(user: &User) -> Result<uuid::Uuid, AppError> {
    user.facility_id
        .ok_or_else(|| AppError::BadRequest("Missing facility ID".to_string()))
}
