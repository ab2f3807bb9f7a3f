/// Database models
///
/// Each model is a `sqlx::FromRow` struct with inherent async CRUD methods
/// taking a `&PgPool`. Domain rules that belong to the data itself (role
/// ranks, the last-owner guard, key usability) live here; cross-cutting
/// authorization lives in `auth::permissions`.
pub mod api_key;
pub mod calculation;
pub mod company;
pub mod document;
pub mod project;
pub mod request_log;
pub mod session;
pub mod subscription;
pub mod task;
pub mod team_member;
pub mod user;
