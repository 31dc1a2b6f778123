use std::sync::Arc;
use std::sync::OnceLock;

use thiserror::Error;

use crate::tenancy::tenant::TenantId;

#[derive(Debug, Error)]
pub enum TenancyError {
    #[error("request is already scoped to tenant '{0}'")]
    AlreadyScoped(TenantId),
}

/// Per-request ambient tenant cell.
///
/// Allocated fresh by the scoping middleware for every request and carried in
/// request extensions, so concurrent requests can never observe each other's
/// tenant. The cell transitions Unscoped -> Scoped at most once; repository
/// code only ever reads it.
#[derive(Debug, Clone, Default)]
pub struct TenantContext {
    cell: Arc<OnceLock<TenantId>>,
}

impl TenantContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope the request to a tenant. Valid exactly once per request.
    pub fn scope(&self, tenant: TenantId) -> Result<(), TenancyError> {
        self.cell
            .set(tenant)
            .map_err(|rejected| TenancyError::AlreadyScoped(rejected))
    }

    /// The resolved tenant, or None for the global/unscoped context.
    pub fn get(&self) -> Option<&TenantId> {
        self.cell.get()
    }

    pub fn is_scoped(&self) -> bool {
        self.cell.get().is_some()
    }
}
