pub mod error;
pub mod pool;
pub mod repository;
pub mod scope;

pub use error::StoreError;
pub use repository::{Entity, Repository, UnitOfWork};
pub use scope::QueryScope;
