//! Host key trust policy
//!
//! The fetcher does not consult `~/.ssh/known_hosts`. A deployment either
//! accepts whatever key the server presents, or pins one SHA256 fingerprint.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use russh::keys::{PublicKey, PublicKeyBase64};
use sha2::{Digest, Sha256};

/// How the server's host key is judged during the handshake
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HostKeyPolicy {
    /// Accept any host key. The peer's identity is not verified.
    #[default]
    AcceptAny,
    /// Accept only the key with this `SHA256:<base64>` fingerprint
    Pinned(String),
}

/// Outcome of checking a presented key against a [`HostKeyPolicy`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKeyVerification {
    /// Fingerprint matches the pinned one
    Verified,
    /// Key accepted without verification
    Unverified { fingerprint: String },
    /// Fingerprint differs from the pinned one
    Mismatch {
        expected_fingerprint: String,
        actual_fingerprint: String,
    },
}

impl HostKeyPolicy {
    /// Check a fingerprint in `SHA256:<base64>` form.
    pub fn verify_fingerprint(&self, fingerprint: &str) -> HostKeyVerification {
        match self {
            HostKeyPolicy::AcceptAny => HostKeyVerification::Unverified {
                fingerprint: fingerprint.to_string(),
            },
            HostKeyPolicy::Pinned(expected) => {
                if normalize(expected) == normalize(fingerprint) {
                    HostKeyVerification::Verified
                } else {
                    HostKeyVerification::Mismatch {
                        expected_fingerprint: expected.clone(),
                        actual_fingerprint: fingerprint.to_string(),
                    }
                }
            }
        }
    }

    pub fn verify(&self, key: &PublicKey) -> HostKeyVerification {
        self.verify_fingerprint(&fingerprint(key))
    }
}

/// Compute SHA256 fingerprint of public key
pub fn fingerprint(key: &PublicKey) -> String {
    fingerprint_bytes(&key.public_key_bytes())
}

/// SHA256 fingerprint of raw public key bytes, OpenSSH style (no padding)
pub fn fingerprint_bytes(key_bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key_bytes);
    let hash = hasher.finalize();
    format!("SHA256:{}", BASE64.encode(hash).trim_end_matches('='))
}

// Pinned values pasted from other tools sometimes keep the base64 padding.
fn normalize(fingerprint: &str) -> &str {
    fingerprint.trim().trim_end_matches('=')
}
