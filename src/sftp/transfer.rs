//! Transfer engine
//!
//! Copies a list of remote files into a local directory, one after the
//! other, and reports one [`TransferOutcome`] per attempted file.
//!
//! Handle lifetimes are scoped: the remote reader and the local file are
//! plain owned values inside [`TransferEngine::transfer_one`], so both are
//! released on every return path, including the success path.

use std::path::PathBuf;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use super::error::SftpError;
use super::path_utils::local_destination;
use super::session::RemoteFs;
use super::types::{TransferOutcome, TransferStatus};
use crate::config::FailurePolicy;

/// Copy buffer size
const CHUNK_SIZE: usize = 64 * 1024;

/// Downloads remote files into `local_dir`
#[derive(Debug, Clone)]
pub struct TransferEngine {
    local_dir: PathBuf,
    on_failure: FailurePolicy,
}

impl TransferEngine {
    /// Engine with the stop-on-first-failure policy
    pub fn new(local_dir: impl Into<PathBuf>) -> Self {
        Self {
            local_dir: local_dir.into(),
            on_failure: FailurePolicy::Stop,
        }
    }

    pub fn with_failure_policy(mut self, on_failure: FailurePolicy) -> Self {
        self.on_failure = on_failure;
        self
    }

    /// Fetch `remote_files` in order.
    ///
    /// Under [`FailurePolicy::Stop`] the first failed file ends the run: the
    /// returned vector holds the outcomes up to and including that file and
    /// nothing for the files after it. Under [`FailurePolicy::Continue`]
    /// every file gets an outcome.
    pub async fn run<S>(&self, session: &S, remote_files: &[String]) -> Vec<TransferOutcome>
    where
        S: RemoteFs + ?Sized,
    {
        let mut outcomes = Vec::with_capacity(remote_files.len());

        for (idx, remote_path) in remote_files.iter().enumerate() {
            let outcome = self.transfer_one(session, remote_path).await;
            let failed = !outcome.is_success();
            outcomes.push(outcome);

            if failed && self.on_failure == FailurePolicy::Stop {
                let skipped = remote_files.len() - idx - 1;
                if skipped > 0 {
                    warn!(
                        "Stopping after failed transfer of {}; {} remaining file(s) not attempted",
                        remote_path, skipped
                    );
                }
                break;
            }
        }

        outcomes
    }

    /// Fetch a single remote file.
    pub async fn transfer_one<S>(&self, session: &S, remote_path: &str) -> TransferOutcome
    where
        S: RemoteFs + ?Sized,
    {
        let local_path = local_destination(&self.local_dir, remote_path);
        info!("Downloading {} to {}", remote_path, local_path.display());

        let mut remote_file = match session.open(remote_path).await {
            Ok(file) => file,
            Err(e) => {
                error!("Failed to open remote file {}: {}", remote_path, e);
                return TransferOutcome::failed(
                    remote_path,
                    local_path,
                    TransferStatus::OpenFailed,
                    0,
                    e,
                );
            }
        };

        let mut local_file = match tokio::fs::File::create(&local_path).await {
            Ok(file) => file,
            Err(e) => {
                error!(
                    "Failed to create local file {}: {}",
                    local_path.display(),
                    e
                );
                return TransferOutcome::failed(
                    remote_path,
                    local_path,
                    TransferStatus::CreateFailed,
                    0,
                    SftpError::IoError(e),
                );
            }
        };

        match copy_stream(&mut remote_file, &mut local_file).await {
            Ok(bytes) => {
                info!(
                    "Downloaded {} to {} ({} bytes)",
                    remote_path,
                    local_path.display(),
                    bytes
                );
                TransferOutcome::success(remote_path, local_path, bytes)
            }
            Err((bytes, e)) => {
                // The partial local file stays on disk.
                error!(
                    "Failed to copy {} to {} after {} bytes: {}",
                    remote_path,
                    local_path.display(),
                    bytes,
                    e
                );
                TransferOutcome::failed(
                    remote_path,
                    local_path,
                    TransferStatus::CopyFailed,
                    bytes,
                    e,
                )
            }
        }
    }
}

/// Copy everything from `reader` to `writer` and flush.
///
/// On error, returns the number of bytes already written alongside the cause.
/// Those bytes are flushed to `writer` first.
async fn copy_stream<R, W>(reader: &mut R, writer: &mut W) -> Result<u64, (u64, SftpError)>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut transferred: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer).await {
            Ok(n) => n,
            Err(e) => {
                // Land what was already written before reporting.
                if let Err(flush_err) = writer.flush().await {
                    debug!("Flush after read error failed: {}", flush_err);
                }
                return Err((transferred, SftpError::ProtocolError(e.to_string())));
            }
        };

        if bytes_read == 0 {
            break; // EOF
        }

        if let Err(e) = writer.write_all(&buffer[..bytes_read]).await {
            return Err((transferred, SftpError::IoError(e)));
        }

        transferred += bytes_read as u64;
    }

    if let Err(e) = writer.flush().await {
        return Err((transferred, SftpError::IoError(e)));
    }

    debug!("Copy finished: {} bytes", transferred);
    Ok(transferred)
}
