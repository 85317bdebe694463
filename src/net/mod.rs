//! Networking modules for the backend REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` performs authenticated calls, `call_log` records one diagnostic
//! entry per call, and `types` holds the request/response envelope types.

pub mod api;
pub mod call_log;
pub mod types;
