//! Path utilities for mapping remote SFTP paths to local files
//!
//! Remote SFTP paths always use `/` as separator (per SFTP protocol), even
//! when the server runs on Windows.

use std::path::{Path, PathBuf};

/// Last element of a remote path.
///
/// Trailing slashes are ignored. An empty path yields `"."` and a path made
/// only of slashes yields `"/"`.
///
/// # Examples
/// ```
/// use sftpcron_lib::sftp::path_utils::remote_base_name;
/// assert_eq!(remote_base_name("/data/a.txt"), "a.txt");
/// assert_eq!(remote_base_name("logs/"), "logs");
/// assert_eq!(remote_base_name("b.txt"), "b.txt");
/// ```
pub fn remote_base_name(path: &str) -> &str {
    if path.is_empty() {
        return ".";
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Local destination for a remote file: `local_dir` joined with the remote
/// base name. Directory components of the remote path are discarded, so
/// `/x/a.txt` and `/y/a.txt` map to the same local file.
pub fn local_destination(local_dir: &Path, remote_path: &str) -> PathBuf {
    local_dir.join(remote_base_name(remote_path))
}
