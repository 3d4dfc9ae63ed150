//! SFTP Session management
//!
//! Provides the read side of SFTP over an authenticated SSH connection, and
//! the traits the transfer engine works against.

use async_trait::async_trait;
use russh::client::Handle;
use russh::Disconnect;
use russh_sftp::client::error::Error as SftpErrorInner;
use russh_sftp::client::SftpSession as RusshSftpSession;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use super::error::SftpError;
use crate::ssh::{ClientHandler, SshError};

/// Readable remote file handle. Dropping it releases the remote handle.
pub type RemoteReader = Box<dyn AsyncRead + Send + Unpin>;

/// Read access to a remote filesystem
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// Open a remote file for reading.
    async fn open(&self, path: &str) -> Result<RemoteReader, SftpError>;
}

/// A [`RemoteFs`] owned by exactly one run.
///
/// `close` is idempotent: only the first call tears anything down.
#[async_trait]
pub trait RemoteSession: RemoteFs {
    async fn close(&mut self);
}

/// SFTP Session wrapper owning the SSH connection it runs on
pub struct SftpSession {
    /// russh SFTP session
    sftp: RusshSftpSession,
    /// SSH connection; `None` once closed
    handle: Option<Handle<ClientHandler>>,
    /// `host:port`, for log lines
    address: String,
}

impl SftpSession {
    /// Open a session channel and negotiate the `sftp` subsystem on it.
    ///
    /// On failure the SSH connection is disconnected before returning, so the
    /// caller never holds a half-open connection.
    pub async fn negotiate(
        handle: Handle<ClientHandler>,
        address: String,
    ) -> Result<Self, SshError> {
        info!("Opening SFTP subsystem on {}", address);

        match open_subsystem(&handle).await {
            Ok(sftp) => {
                info!("SFTP subsystem opened on {}", address);
                Ok(Self {
                    sftp,
                    handle: Some(handle),
                    address,
                })
            }
            Err(e) => {
                disconnect(handle, &address).await;
                Err(e)
            }
        }
    }

    /// Map SFTP errors to our error type
    fn map_sftp_error(&self, err: SftpErrorInner, path: &str) -> SftpError {
        let err_str = err.to_string();
        if err_str.contains("No such file") || err_str.contains("not found") {
            SftpError::FileNotFound(path.to_string())
        } else if err_str.contains("Permission denied") {
            SftpError::PermissionDenied(path.to_string())
        } else {
            SftpError::ProtocolError(err_str)
        }
    }
}

#[async_trait]
impl RemoteFs for SftpSession {
    async fn open(&self, path: &str) -> Result<RemoteReader, SftpError> {
        debug!("Opening remote file: {}", path);
        let file = self
            .sftp
            .open(path)
            .await
            .map_err(|e| self.map_sftp_error(e, path))?;
        Ok(Box::new(file))
    }
}

#[async_trait]
impl RemoteSession for SftpSession {
    async fn close(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if let Err(e) = self.sftp.close().await {
            debug!("SFTP close on {} failed: {}", self.address, e);
        }
        disconnect(handle, &self.address).await;
    }
}

impl Drop for SftpSession {
    fn drop(&mut self) {
        // Reached only when the run unwound without calling close().
        if let Some(handle) = self.handle.take() {
            warn!("SFTP session to {} dropped without close, disconnecting", self.address);
            let address = self.address.clone();
            if let Ok(rt) = tokio::runtime::Handle::try_current() {
                rt.spawn(async move { disconnect(handle, &address).await });
            }
        }
    }
}

async fn open_subsystem(handle: &Handle<ClientHandler>) -> Result<RusshSftpSession, SshError> {
    let channel = handle
        .channel_open_session()
        .await
        .map_err(|e| SshError::ProtocolNegotiationFailed(format!("Failed to open channel: {}", e)))?;

    channel.request_subsystem(true, "sftp").await.map_err(|e| {
        SshError::ProtocolNegotiationFailed(format!("Failed to request SFTP subsystem: {}", e))
    })?;

    RusshSftpSession::new(channel.into_stream())
        .await
        .map_err(|e| SshError::ProtocolNegotiationFailed(e.to_string()))
}

async fn disconnect(handle: Handle<ClientHandler>, address: &str) {
    match handle
        .disconnect(Disconnect::ByApplication, "", "English")
        .await
    {
        Ok(()) => info!("Disconnected from {}", address),
        Err(e) => debug!("Disconnect from {} reported: {}", address, e),
    }
}
