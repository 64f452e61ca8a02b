//! HTTP surface of the referral service.
//!
//! Public routes handle submission, referrer lookup, sign-in and the
//! scheduler's rollup trigger. Admin routes are nested under
//! `/api/admin/` and gated by session + allowlist: Admin gate → Audit → Handler.
//!
//! The router is composable: `api_router()` returns a `Router` that can be
//! mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{serve, ServerError};
pub use types::ApiContext;
