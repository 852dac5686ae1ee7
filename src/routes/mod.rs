mod api_response;
pub mod health_check;
pub mod home;
pub mod init_db;
pub mod subscriptions;

pub use api_response::{ApiError, ApiResponse, Envelope};
