// Asset API library crate
// Bearer-token authentication, token rotation and role gates for the
// inventory/employee backend

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod users;
