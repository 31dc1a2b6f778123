use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{self, AuthUser, Claims};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::handlers::response::{ApiResponse, ApiResult};
use crate::models::User;
use crate::store::Repository;
use crate::tenancy::TenantContext;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub tenant: String,
    pub username: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub tenant: String,
    pub username: String,
    pub role: String,
}

/// Pre-authentication login. No token exists yet, so the tenant comes from
/// the untrusted header or the hostname; the user lookup is still scoped to
/// that tenant, so credentials of one tenant never unlock another.
pub async fn login(
    Extension(pool): Extension<PgPool>,
    Extension(context): Extension<TenantContext>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let tenant = context
        .get()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("No tenant resolved for this request"))?;

    let repo = Repository::<User>::for_context(pool, &context)?;
    let user = repo
        .find_one(FilterData::where_eq("username", payload.username.as_str()))
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    if auth::hash_password(&payload.password) != user.password_hash {
        return Err(ApiError::unauthorized("Invalid username or password"));
    }

    let claims = Claims::new(
        tenant.to_string(),
        user.username.clone(),
        user.role.clone(),
        user.id,
    );
    let token = auth::generate_jwt(&claims)?;

    Ok(ApiResponse::success(LoginResponse {
        token,
        tenant: tenant.to_string(),
        username: user.username,
        role: user.role,
    }))
}

/// Identity of the validated caller, from the claims the scoping middleware
/// already extracted.
pub async fn whoami(auth_user: Option<Extension<AuthUser>>) -> ApiResult<WhoamiResponse> {
    let Extension(user) =
        auth_user.ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    Ok(ApiResponse::success(WhoamiResponse {
        tenant: user.tenant.to_string(),
        username: user.user,
        role: user.role,
    }))
}
