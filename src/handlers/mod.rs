pub mod auth;
pub mod products;
pub mod response;

pub use response::{ApiResponse, ApiResult};
