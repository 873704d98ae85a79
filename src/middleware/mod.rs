//! HTTP middleware components.
//!
//! Middleware run before route handlers. Here they authenticate callers
//! and short-circuit unauthorized requests.

/// Bearer-token authentication middleware
pub mod auth;
