use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use crate::auth::{self, AuthUser};
use crate::config;
use crate::tenancy::context::TenantContext;
use crate::tenancy::resolver::{resolve, RequestSignals};

/// Tenant scoping middleware: resolves the tenant exactly once per request,
/// before any handler runs, and publishes it through a fresh [`TenantContext`]
/// in request extensions.
///
/// The middleware is permissive: it always invokes the rest of the pipeline,
/// scoped or not. Failing to resolve a tenant is not an authentication
/// failure; call sites that require a tenant reject unscoped requests
/// themselves. Invalid or unverifiable bearer tokens contribute no claim and
/// never abort the request here.
pub async fn tenant_scope_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let tenancy = &config::config().tenancy;

    let auth_user = bearer_token(&headers).and_then(|token| match auth::validate_jwt(&token) {
        Ok(claims) => Some(AuthUser::from(claims)),
        Err(reason) => {
            tracing::debug!("ignoring unverifiable bearer token: {}", reason);
            None
        }
    });

    let tenant_header = headers
        .get(tenancy.header_name.as_str())
        .and_then(|v| v.to_str().ok());
    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());

    let signals = RequestSignals {
        claim: auth_user.as_ref().map(|u| u.tenant.as_str()),
        header: tenant_header,
        host,
    };
    let resolved = resolve(&signals, tenancy);

    let context = TenantContext::new();
    if let Some(tenant) = resolved.clone() {
        // The cell was just allocated, so the set-once transition cannot fail.
        let _ = context.scope(tenant);
    }

    let span = tracing::info_span!(
        "request",
        tenant_id = resolved.as_ref().map(|t| t.as_str()).unwrap_or("-")
    );

    if let Some(user) = auth_user {
        request.extensions_mut().insert(user);
    }
    request.extensions_mut().insert(context);

    next.run(request).instrument(span).await
}

/// Extract the bearer token from the Authorization header, if well-formed.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_requires_bearer_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn bearer_token_rejects_empty_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn bearer_token_extracts_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi".to_string()));
    }
}
