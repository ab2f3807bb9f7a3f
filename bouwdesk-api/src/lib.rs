//! # BouwDesk API Server
//!
//! HTTP server for the BouwDesk construction project platform: JWT and
//! API key authentication, project and team management with role-based
//! permissions, plan quotas, rate limiting and billing.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Rate limiting, security headers, request logging
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
