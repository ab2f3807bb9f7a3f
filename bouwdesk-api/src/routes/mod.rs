/// API route handlers
///
/// Each module owns one resource family. Routers are assembled in
/// [`crate::app::build_router`].
pub mod api;
pub mod api_keys;
pub mod auth;
pub mod billing;
pub mod calculations;
pub mod documents;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod team;
pub mod usage;
pub mod users;
pub mod webhooks;
