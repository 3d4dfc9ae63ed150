//! SSH Error types

use thiserror::Error;

/// Connection-phase errors. Any of these aborts the run before a single file
/// is attempted; the scheduler keeps firing.
#[derive(Error, Debug)]
pub enum SshError {
    /// TCP dial, dial timeout or SSH transport handshake failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Server rejected the credentials
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Session channel or `sftp` subsystem could not be opened
    #[error("SFTP negotiation failed: {0}")]
    ProtocolNegotiationFailed(String),

    /// Host key did not match the pinned fingerprint
    #[error("Host key rejected: {0}")]
    HostKeyRejected(String),

    #[error("SSH protocol error: {0}")]
    ProtocolError(String),
}

impl SshError {
    /// Whether another connect attempt within the same firing can help.
    ///
    /// Credentials, host keys and subsystem support do not change between
    /// attempts, so only transport failures qualify.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SshError::ConnectionFailed(_) | SshError::ProtocolError(_)
        )
    }
}

impl From<russh::Error> for SshError {
    fn from(err: russh::Error) -> Self {
        SshError::ProtocolError(err.to_string())
    }
}
