//! Administration services with their business-rule guards
//!
//! Author: hephaex@gmail.com

pub mod roles;
pub mod users;

pub use roles::{CreateRoleRequest, RoleService, UpdateRoleRequest};
pub use users::{CreateUserRequest, UpdateUserRequest, UserService};
