/// HTTP middleware for the API server

pub mod analytics;
pub mod rate_limit;
pub mod security;
