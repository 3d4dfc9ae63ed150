//! SSH Client implementation using russh

use std::sync::Arc;

use async_trait::async_trait;
use russh::client;
use russh::keys::PublicKey;
use russh::Disconnect;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use super::error::SshError;
use super::host_key::{HostKeyPolicy, HostKeyVerification};
use crate::config::ConnectionParams;
use crate::sftp::{RemoteSession, SftpSession};

/// Produces a ready session for one run.
///
/// A single attempt per call; retrying is the caller's business.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Session: RemoteSession + 'static;

    async fn connect(&self, params: &ConnectionParams) -> Result<Self::Session, SshError>;
}

/// [`Connector`] speaking SSH + SFTP over TCP
#[derive(Debug, Clone, Copy, Default)]
pub struct SshConnector;

#[async_trait]
impl Connector for SshConnector {
    type Session = SftpSession;

    async fn connect(&self, params: &ConnectionParams) -> Result<SftpSession, SshError> {
        SshClient::new(params.clone()).connect().await
    }
}

/// SSH Client for one connection attempt
pub struct SshClient {
    params: ConnectionParams,
}

impl SshClient {
    pub fn new(params: ConnectionParams) -> Self {
        Self { params }
    }

    /// Dial, authenticate and negotiate SFTP.
    ///
    /// Only the TCP dial is bounded by a timeout. Authentication and
    /// negotiation wait for the server or the network stack.
    pub async fn connect(self) -> Result<SftpSession, SshError> {
        let addr = self.params.address();
        let dial_timeout = self.params.connect_timeout();

        info!("Connecting to SSH server at {}", addr);

        let stream = tokio::time::timeout(
            dial_timeout,
            TcpStream::connect((self.params.host.as_str(), self.params.port)),
        )
        .await
        .map_err(|_| {
            SshError::ConnectionFailed(format!("Dial to {} timed out after {:?}", addr, dial_timeout))
        })?
        .map_err(|e| SshError::ConnectionFailed(format!("Dial to {} failed: {}", addr, e)))?;

        let ssh_config = client::Config {
            inactivity_timeout: None,
            ..Default::default()
        };

        let handler = ClientHandler::new(
            self.params.host.clone(),
            self.params.port,
            self.params.host_key_policy(),
        );

        let mut handle = client::connect_stream(Arc::new(ssh_config), stream, handler)
            .await
            .map_err(|e| match e {
                SshError::HostKeyRejected(_) => e,
                other => SshError::ConnectionFailed(format!(
                    "SSH handshake with {} failed: {}",
                    addr, other
                )),
            })?;

        debug!("SSH handshake completed");

        let authenticated = handle
            .authenticate_password(&self.params.user, &self.params.secret)
            .await
            .map_err(|e| SshError::AuthenticationFailed(e.to_string()))?;

        if !authenticated.success() {
            let _ = handle
                .disconnect(Disconnect::ByApplication, "", "English")
                .await;
            return Err(SshError::AuthenticationFailed(format!(
                "Server rejected credentials for user '{}'",
                self.params.user
            )));
        }

        info!("SSH authentication successful for {}@{}", self.params.user, addr);

        SftpSession::negotiate(handle, addr).await
    }
}

/// Client handler for russh callbacks
///
/// Judges the server's host key with the configured [`HostKeyPolicy`].
pub struct ClientHandler {
    /// Target host, for log lines
    host: String,
    /// Target port
    port: u16,
    policy: HostKeyPolicy,
}

impl ClientHandler {
    pub fn new(host: String, port: u16, policy: HostKeyPolicy) -> Self {
        Self { host, port, policy }
    }
}

impl client::Handler for ClientHandler {
    type Error = SshError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        match self.policy.verify(server_public_key) {
            HostKeyVerification::Verified => {
                info!("Host key verified for {}:{}", self.host, self.port);
                Ok(true)
            }
            HostKeyVerification::Unverified { fingerprint } => {
                // Accepted risk: the peer may not be the intended host.
                warn!(
                    "Host key for {}:{} NOT verified, accepting (fingerprint: {})",
                    self.host, self.port, fingerprint
                );
                Ok(true)
            }
            HostKeyVerification::Mismatch {
                expected_fingerprint,
                actual_fingerprint,
            } => {
                warn!(
                    "HOST KEY MISMATCH for {}:{}! Expected {}, got {}",
                    self.host, self.port, expected_fingerprint, actual_fingerprint
                );
                Err(SshError::HostKeyRejected(format!(
                    "Key for {}:{} does not match the pinned fingerprint. \
                     Expected: {}, Actual: {}",
                    self.host, self.port, expected_fingerprint, actual_fingerprint
                )))
            }
        }
    }
}
