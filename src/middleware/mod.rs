pub mod auth;
pub mod response;

pub use auth::{AuthUser, MaybeAuthUser};
pub use response::ApiResponse;

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
