use serde_json::{json, Map, Value};

use crate::store::error::StoreError;
use crate::tenancy::{TenantContext, TenantId};

/// The tenant boundary applied to every data-access call.
///
/// `Tenant` conjoins a `tenant_id` equality predicate onto reads, updates and
/// deletes, and stamps inserts. `Unscoped` is the explicit platform-admin
/// bypass; it is never the silent default. Deriving a scope from a request
/// that resolved to no tenant fails with [`StoreError::NoAmbientTenant`], so
/// call sites must consciously choose the bypass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryScope {
    Tenant(TenantId),
    Unscoped,
}

impl QueryScope {
    pub fn tenant(tenant: TenantId) -> Self {
        Self::Tenant(tenant)
    }

    /// Explicit opt-out of tenant scoping for platform-level operations.
    pub fn unscoped() -> Self {
        Self::Unscoped
    }

    pub fn tenant_id(&self) -> Option<&TenantId> {
        match self {
            Self::Tenant(t) => Some(t),
            Self::Unscoped => None,
        }
    }

    /// Conjoin the scoping predicate onto a caller's JSON where clause.
    /// Under bypass the clause is returned untouched.
    pub fn apply_where(&self, where_clause: Option<Value>) -> Option<Value> {
        match self {
            Self::Unscoped => where_clause,
            Self::Tenant(tenant) => {
                let predicate = json!({ "tenant_id": tenant.as_str() });
                Some(match where_clause {
                    None => predicate,
                    Some(existing) => json!({ "$and": [existing, predicate] }),
                })
            }
        }
    }

    /// Stamp (or verify) the `tenant_id` column of a row about to be
    /// inserted. Rows must always end up owned by exactly the tenant that
    /// created them:
    /// - scoped + unset  -> stamped with the ambient tenant
    /// - scoped + equal  -> accepted
    /// - scoped + other  -> rejected, the row may not claim another owner
    /// - bypass + set    -> accepted, admin named the owner explicitly
    /// - bypass + unset  -> rejected, an unowned row must never persist
    pub fn stamp_insert(
        &self,
        table: &'static str,
        row: &mut Map<String, Value>,
    ) -> Result<(), StoreError> {
        let current = row.get("tenant_id").filter(|v| !v.is_null()).cloned();

        match (self, current) {
            (Self::Tenant(tenant), None) => {
                row.insert("tenant_id".to_string(), json!(tenant.as_str()));
                Ok(())
            }
            (Self::Tenant(tenant), Some(existing)) => {
                if existing.as_str() == Some(tenant.as_str()) {
                    Ok(())
                } else {
                    Err(StoreError::CrossTenantWrite {
                        scope: tenant.to_string(),
                        owner: existing.as_str().unwrap_or_default().to_string(),
                    })
                }
            }
            (Self::Unscoped, Some(_)) => Ok(()),
            (Self::Unscoped, None) => Err(StoreError::MissingTenantStamp(table)),
        }
    }
}

impl TryFrom<&TenantContext> for QueryScope {
    type Error = StoreError;

    fn try_from(context: &TenantContext) -> Result<Self, Self::Error> {
        match context.get() {
            Some(tenant) => Ok(Self::Tenant(tenant.clone())),
            None => Err(StoreError::NoAmbientTenant),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn scoped_where_conjoins_tenant_predicate() {
        let scope = QueryScope::tenant(TenantId::new("acme"));
        let applied = scope.apply_where(Some(json!({ "name": "milk" })));
        assert_eq!(
            applied,
            Some(json!({ "$and": [ { "name": "milk" }, { "tenant_id": "acme" } ] }))
        );
    }

    #[test]
    fn scoped_where_without_caller_filter() {
        let scope = QueryScope::tenant(TenantId::new("acme"));
        assert_eq!(scope.apply_where(None), Some(json!({ "tenant_id": "acme" })));
    }

    #[test]
    fn bypass_leaves_where_untouched() {
        let scope = QueryScope::unscoped();
        assert_eq!(scope.apply_where(None), None);
        assert_eq!(
            scope.apply_where(Some(json!({ "name": "milk" }))),
            Some(json!({ "name": "milk" }))
        );
    }

    #[test]
    fn stamp_fills_unset_tenant() {
        let scope = QueryScope::tenant(TenantId::new("acme"));
        let mut r = row(json!({ "name": "milk" }));
        scope.stamp_insert("products", &mut r).unwrap();
        assert_eq!(r.get("tenant_id"), Some(&json!("acme")));
    }

    #[test]
    fn stamp_accepts_matching_tenant() {
        let scope = QueryScope::tenant(TenantId::new("acme"));
        let mut r = row(json!({ "tenant_id": "acme", "name": "milk" }));
        assert!(scope.stamp_insert("products", &mut r).is_ok());
    }

    #[test]
    fn stamp_rejects_foreign_tenant() {
        let scope = QueryScope::tenant(TenantId::new("acme"));
        let mut r = row(json!({ "tenant_id": "globex", "name": "milk" }));
        let err = scope.stamp_insert("products", &mut r).unwrap_err();
        assert!(matches!(err, StoreError::CrossTenantWrite { .. }));
    }

    #[test]
    fn bypass_requires_explicit_owner() {
        let scope = QueryScope::unscoped();
        let mut r = row(json!({ "name": "milk" }));
        let err = scope.stamp_insert("products", &mut r).unwrap_err();
        assert!(matches!(err, StoreError::MissingTenantStamp("products")));

        let mut owned = row(json!({ "tenant_id": "acme", "name": "milk" }));
        assert!(scope.stamp_insert("products", &mut owned).is_ok());
    }

    #[test]
    fn unresolved_context_cannot_become_a_scope() {
        let context = TenantContext::new();
        let err = QueryScope::try_from(&context).unwrap_err();
        assert!(matches!(err, StoreError::NoAmbientTenant));
    }

    #[test]
    fn scoped_context_becomes_tenant_scope() {
        let context = TenantContext::new();
        context.scope(TenantId::new("acme")).unwrap();
        let scope = QueryScope::try_from(&context).unwrap();
        assert_eq!(scope.tenant_id(), Some(&TenantId::new("acme")));
    }
}
