//! Middleware for the admin routes.
//!
//! Execution order (outermost → innermost):
//! 1. Admin gate: session cookie + allowlist
//! 2. Audit logger: logs after auth, has the actor's email

pub mod audit;
pub mod auth;
