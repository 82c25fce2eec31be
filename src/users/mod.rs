// User module
// Email login plus the role-assignment endpoints the auth layer reads from

pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use repository::{RoleChange, UserRepository, UserStore};
pub use service::UserService;
