pub mod auth;
pub mod authorize;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthStaff};
pub use authorize::{policy, Authorizer};
pub use response::{ApiResponse, ApiResult};
