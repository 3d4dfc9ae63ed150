//! SFTP file transfer module
//!
//! Provides the SFTP session a run reads through and the engine that copies
//! remote files into the local directory.

pub mod error;
pub mod path_utils;
pub mod session;
pub mod transfer;
pub mod types;

pub use error::SftpError;
pub use session::{RemoteFs, RemoteReader, RemoteSession, SftpSession};
pub use transfer::TransferEngine;
pub use types::*;
