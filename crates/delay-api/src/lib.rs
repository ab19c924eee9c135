//! Flight delay prediction HTTP service
//!
//! Exposes the router and configuration so the binary and the integration
//! tests build the same application.

pub mod api;
pub mod config;
pub mod error;
