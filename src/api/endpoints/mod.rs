//! HTTP endpoint handlers, one module per surface.

pub mod admin;
pub mod auth;
pub mod health;
pub mod referrals;
pub mod rollup;
