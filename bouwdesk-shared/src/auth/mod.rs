/// Authentication and authorization
///
/// - [`password`]: Argon2id hashing and password strength rules
/// - [`jwt`]: HS256 token issuing and validation
/// - [`api_key`]: API key generation, hashing and scope matching
/// - [`middleware`]: Axum layers that turn credentials into an [`middleware::AuthContext`]
/// - [`permissions`]: the project permission engine

pub mod api_key;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod permissions;
