//! HTTP middleware shared by every route
//!
//! Author: hephaex@gmail.com

pub mod rate_limit;
pub mod security_headers;

pub use rate_limit::{limit_api, limit_login};
pub use security_headers::security_headers_middleware;
