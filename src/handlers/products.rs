use axum::{
    extract::{Extension, Path},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::response::{ApiResponse, ApiResult};
use crate::models::Product;
use crate::store::Repository;
use crate::tenancy::TenantContext;

/// Transport shape for products. Explicit conversion from the entity, and no
/// `tenant_id`: the owning tenant is ambient, never part of the payload.
#[derive(Debug, Serialize)]
pub struct ProductDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductDto {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price_cents: product.price_cents,
            is_available: product.is_available,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub is_available: Option<bool>,
}

pub async fn list(
    Extension(pool): Extension<PgPool>,
    Extension(context): Extension<TenantContext>,
) -> ApiResult<Vec<ProductDto>> {
    let repo = Repository::<Product>::for_context(pool, &context)?;
    let products = repo.get_all().await?;
    Ok(ApiResponse::success(
        products.into_iter().map(ProductDto::from).collect(),
    ))
}

pub async fn get(
    Extension(pool): Extension<PgPool>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ProductDto> {
    let repo = Repository::<Product>::for_context(pool, &context)?;
    let product = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    Ok(ApiResponse::success(product.into()))
}

pub async fn create(
    Extension(pool): Extension<PgPool>,
    Extension(context): Extension<TenantContext>,
    Json(payload): Json<CreateProduct>,
) -> ApiResult<ProductDto> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::bad_request("Product name is required"));
    }
    if payload.price_cents < 0 {
        return Err(ApiError::bad_request("Price must be non-negative"));
    }

    let repo = Repository::<Product>::for_context(pool.clone(), &context)?;
    let product = Product::new(payload.name, payload.description, payload.price_cents);

    let mut uow = repo.unit_of_work();
    uow.add(&product)?;
    uow.save_changes(&pool).await?;

    Ok(ApiResponse::created(product.into()))
}

pub async fn update(
    Extension(pool): Extension<PgPool>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProduct>,
) -> ApiResult<ProductDto> {
    let repo = Repository::<Product>::for_context(pool.clone(), &context)?;
    let mut product = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(ApiError::bad_request("Product name is required"));
        }
        product.name = name;
    }
    if let Some(description) = payload.description {
        product.description = Some(description);
    }
    if let Some(price_cents) = payload.price_cents {
        if price_cents < 0 {
            return Err(ApiError::bad_request("Price must be non-negative"));
        }
        product.price_cents = price_cents;
    }
    if let Some(is_available) = payload.is_available {
        product.is_available = is_available;
    }

    let mut uow = repo.unit_of_work();
    uow.update(&product)?;
    uow.save_changes(&pool).await?;

    Ok(ApiResponse::success(product.into()))
}

pub async fn delete(
    Extension(pool): Extension<PgPool>,
    Extension(context): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let repo = Repository::<Product>::for_context(pool.clone(), &context)?;
    let mut uow = repo.unit_of_work();
    uow.delete::<Product>(id);
    uow.save_changes(&pool).await?;

    Ok(ApiResponse::<()>::no_content())
}
