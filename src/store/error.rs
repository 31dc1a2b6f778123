use thiserror::Error;

use crate::filter::FilterError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    /// A repository was asked to scope itself from a request that resolved to
    /// no tenant. Raised before anything reaches the pool; platform-admin
    /// paths must opt out via `QueryScope::unscoped`.
    #[error("no ambient tenant resolved for this request; tenant-owned access requires a tenant or an explicit unscoped bypass")]
    NoAmbientTenant,

    /// A bypassed write did not name the owning tenant on the row itself.
    #[error("tenant-owned row for table '{0}' carries no tenant_id")]
    MissingTenantStamp(&'static str),

    /// The entity claims a different owner than the ambient tenant.
    #[error("entity is owned by tenant '{owner}' but the request is scoped to '{scope}'")]
    CrossTenantWrite { scope: String, owner: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
