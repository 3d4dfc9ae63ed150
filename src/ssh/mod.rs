//! SSH module - establishes the authenticated connection a run fetches over
//!
//! This module provides the connection side using the russh library.
//!
//! # Features
//! - TCP dial with a bounded timeout
//! - Password authentication
//! - Host key trust policy: accept any, or one pinned SHA256 fingerprint
//! - Optional per-firing retry of transient connect failures

mod client;
mod error;
mod host_key;
pub mod retry;

pub use client::{ClientHandler, Connector, SshClient, SshConnector};
pub use error::SshError;
pub use host_key::{fingerprint, fingerprint_bytes, HostKeyPolicy, HostKeyVerification};
pub use retry::{calculate_backoff, connect_with_retry, RetryConfig};
