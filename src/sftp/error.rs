//! SFTP Error types

use thiserror::Error;

/// Per-file failure causes, attached to a failed transfer outcome
#[derive(Error, Debug)]
pub enum SftpError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("SFTP protocol error: {0}")]
    ProtocolError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
