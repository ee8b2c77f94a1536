//! Store FFI helper
//!
//! Lets an external process request privileged store operations without
//! linking against the store library. The helper speaks a minimal binary
//! protocol over a pair of byte streams (normally its stdin and stdout):
//! each request is a one-byte command tag followed by a length-prefixed
//! payload, and each success is answered by a single zero byte.

pub mod client;
pub mod config;
pub mod helper;
pub mod protocol;
pub mod store;
pub mod testsuite;

pub use client::{ClientError, HelperClient, HelperProcess};
pub use config::Config;
pub use helper::{serve_stdio, Dispatcher, HelperError};
pub use protocol::ProtocolError;
pub use store::{LocalStore, MemoryStore, Store, StoreError, StorePath};
