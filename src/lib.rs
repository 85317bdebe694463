//! # bilco
//!
//! Client core for the Bilco waterpark equipment, maintenance, and inventory
//! backend: the authenticated REST client with its bounded call log, the
//! session context, and route-level access control.
//!
//! Record payloads (equipment, materials, tickets, ...) stay opaque JSON; this
//! crate guarantees the envelope (headers, serialization, status handling),
//! not any resource schema.

pub mod config;
pub mod diagnostics;
pub mod net;
pub mod resources;
pub mod routes;
pub mod session;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use config::ClientConfig;
pub use net::api::{ApiClient, ApiError};
pub use net::call_log::{CallLog, CallLogEntry};
pub use net::types::RequestOptions;
pub use session::{Role, Session, SessionManager};
pub use storage::{FileStorage, MemoryStorage, Storage};
