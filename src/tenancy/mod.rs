pub mod context;
pub mod middleware;
pub mod resolver;
pub mod tenant;

pub use context::TenantContext;
pub use middleware::tenant_scope_middleware;
pub use resolver::{resolve, RequestSignals};
pub use tenant::TenantId;
