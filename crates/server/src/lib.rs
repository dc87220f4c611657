//! HTTP serving adapter for the property price model
//!
//! Exposes the router, configuration, authentication and request schemas so
//! integration tests can drive the same router the binary serves.

pub mod api;
pub mod auth;
pub mod config;
pub mod schemas;
