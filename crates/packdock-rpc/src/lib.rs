//! packdock-rpc
//!
//! The plugin surface of the packdock adapter: line-delimited JSON-RPC
//! 2.0 over stdin/stdout, dispatching to the reconciliation engine and
//! streaming its events back as notifications.

pub mod methods;
pub mod protocol;
pub mod schema;
pub mod server;

pub use crate::methods::{BackendFactory, Handler};
pub use crate::server::Server;
