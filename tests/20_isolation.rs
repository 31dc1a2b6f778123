// Concurrency test for the ambient context: many simultaneous requests for
// distinct tenants through the same router must each observe exactly their
// own tenant. A process-global ambient cell would fail this under load.

use anyhow::Result;
use axum::{body::Body, extract::Extension, http::Request, middleware, routing::get, Router};
use http_body_util::BodyExt;
use tower::ServiceExt;

use storefront_api::tenancy::{tenant_scope_middleware, TenantContext};

async fn echo_tenant(Extension(context): Extension<TenantContext>) -> String {
    context
        .get()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "<unscoped>".to_string())
}

fn test_app() -> Router {
    Router::new()
        .route("/echo", get(echo_tenant))
        .layer(middleware::from_fn(tenant_scope_middleware))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_never_observe_each_others_tenant() -> Result<()> {
    let app = test_app();

    let mut tasks = Vec::new();
    for i in 0..64 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            let tenant = format!("tenant-{}", i);
            for _ in 0..10 {
                let request = Request::builder()
                    .uri("/echo")
                    .header("X-Tenant-Id", &tenant)
                    .body(Body::empty())
                    .unwrap();
                let response = app.clone().oneshot(request).await.unwrap();
                let body = response.into_body().collect().await.unwrap().to_bytes();
                let observed = String::from_utf8(body.to_vec()).unwrap();
                assert_eq!(observed, tenant, "request observed another tenant");
                tokio::task::yield_now().await;
            }
        }));
    }

    for task in tasks {
        task.await?;
    }
    Ok(())
}
