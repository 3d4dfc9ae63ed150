//! Transfer result types

use std::fmt;
use std::path::PathBuf;

use super::error::SftpError;
use crate::ssh::SshError;

/// Classification of one file's transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferStatus {
    Success,
    /// Remote file could not be opened; no local file was touched
    OpenFailed,
    /// Local file could not be created or truncated
    CreateFailed,
    /// Copy broke off; a partial local file may remain
    CopyFailed,
}

impl TransferStatus {
    pub fn is_success(self) -> bool {
        self == TransferStatus::Success
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransferStatus::Success => "success",
            TransferStatus::OpenFailed => "open failed",
            TransferStatus::CreateFailed => "create failed",
            TransferStatus::CopyFailed => "copy failed",
        };
        f.write_str(s)
    }
}

/// Result of one remote file within a run
#[derive(Debug)]
pub struct TransferOutcome {
    pub remote_path: String,
    pub local_path: PathBuf,
    pub status: TransferStatus,
    /// Bytes written to the local file (partial on `CopyFailed`)
    pub bytes: u64,
    /// Underlying cause for failed outcomes
    pub error: Option<SftpError>,
}

impl TransferOutcome {
    pub fn success(remote_path: &str, local_path: PathBuf, bytes: u64) -> Self {
        Self {
            remote_path: remote_path.to_string(),
            local_path,
            status: TransferStatus::Success,
            bytes,
            error: None,
        }
    }

    pub fn failed(
        remote_path: &str,
        local_path: PathBuf,
        status: TransferStatus,
        bytes: u64,
        error: SftpError,
    ) -> Self {
        Self {
            remote_path: remote_path.to_string(),
            local_path,
            status,
            bytes,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Aggregate of one run
#[derive(Debug)]
pub enum RunResult {
    /// Connect failed; no file was attempted
    ConnectionFailed(SshError),
    /// One outcome per attempted file, in request order
    Completed(Vec<TransferOutcome>),
    /// Firing skipped because the previous run was still in flight
    Skipped,
}

impl RunResult {
    /// Outcomes of the run; empty for connection failures and skips.
    pub fn outcomes(&self) -> &[TransferOutcome] {
        match self {
            RunResult::Completed(outcomes) => outcomes,
            RunResult::ConnectionFailed(_) | RunResult::Skipped => &[],
        }
    }

    pub fn connection_error(&self) -> Option<&SshError> {
        match self {
            RunResult::ConnectionFailed(e) => Some(e),
            _ => None,
        }
    }

    /// True when the run connected and every attempted file succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, RunResult::Completed(outcomes) if outcomes.iter().all(|o| o.is_success()))
    }
}
