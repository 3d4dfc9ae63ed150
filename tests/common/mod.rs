//! Shared fakes for integration tests: an in-memory remote filesystem and a
//! scripted connector that hands out sessions over it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, ReadBuf};

use sftpcron_lib::config::{AppConfig, ConnectionParams, TransferSettings};
use sftpcron_lib::sftp::{RemoteFs, RemoteReader, RemoteSession, SftpError};
use sftpcron_lib::ssh::{Connector, SshError};

/// Remote file contents
#[derive(Clone)]
pub enum RemoteEntry {
    File(Vec<u8>),
    /// Yields these bytes, then the read fails
    Broken(Vec<u8>),
}

/// In-memory remote filesystem keyed by full remote path
#[derive(Clone, Default)]
pub struct MemoryFs {
    entries: HashMap<String, RemoteEntry>,
    opened: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, contents: &[u8]) -> Self {
        self.entries
            .insert(path.to_string(), RemoteEntry::File(contents.to_vec()));
        self
    }

    pub fn with_broken_file(mut self, path: &str, good_prefix: &[u8]) -> Self {
        self.entries
            .insert(path.to_string(), RemoteEntry::Broken(good_prefix.to_vec()));
        self
    }

    /// Number of successful `open` calls so far
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of opened readers dropped so far
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteFs for MemoryFs {
    async fn open(&self, path: &str) -> Result<RemoteReader, SftpError> {
        let entry = self
            .entries
            .get(path)
            .cloned()
            .ok_or_else(|| SftpError::FileNotFound(path.to_string()))?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        let inner: RemoteReader = match entry {
            RemoteEntry::File(data) => Box::new(io::Cursor::new(data)),
            RemoteEntry::Broken(good) => Box::new(BrokenReader { good, pos: 0 }),
        };
        Ok(Box::new(TrackedReader {
            inner,
            released: self.released.clone(),
        }))
    }
}

/// Counts its own drop, standing in for the remote file handle close
struct TrackedReader {
    inner: RemoteReader,
    released: Arc<AtomicUsize>,
}

impl AsyncRead for TrackedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl Drop for TrackedReader {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

struct BrokenReader {
    good: Vec<u8>,
    pos: usize,
}

impl AsyncRead for BrokenReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.pos < self.good.len() {
            let n = (self.good.len() - self.pos).min(buf.remaining());
            let start = self.pos;
            buf.put_slice(&self.good[start..start + n]);
            self.pos += n;
            Poll::Ready(Ok(()))
        } else {
            Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "connection lost",
            )))
        }
    }
}

/// Session over a [`MemoryFs`] that counts real closes
pub struct FakeSession {
    fs: MemoryFs,
    closed: bool,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl RemoteFs for FakeSession {
    async fn open(&self, path: &str) -> Result<RemoteReader, SftpError> {
        self.fs.open(path).await
    }
}

#[async_trait]
impl RemoteSession for FakeSession {
    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// How the fake connector answers
#[derive(Clone)]
pub enum ConnectBehavior {
    Succeed,
    Refuse,
    RejectCredentials,
}

/// Connector handing out [`FakeSession`]s
#[derive(Clone)]
pub struct FakeConnector {
    fs: MemoryFs,
    behavior: ConnectBehavior,
    delay: Duration,
    pub connects: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl FakeConnector {
    pub fn new(fs: MemoryFs) -> Self {
        Self {
            fs,
            behavior: ConnectBehavior::Succeed,
            delay: Duration::ZERO,
            connects: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(behavior: ConnectBehavior) -> Self {
        Self {
            behavior,
            ..Self::new(MemoryFs::new())
        }
    }

    /// Sleep this long inside every connect
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Session = FakeSession;

    async fn connect(&self, params: &ConnectionParams) -> Result<FakeSession, SshError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.behavior {
            ConnectBehavior::Succeed => Ok(FakeSession {
                fs: self.fs.clone(),
                closed: false,
                closes: self.closes.clone(),
            }),
            ConnectBehavior::Refuse => Err(SshError::ConnectionFailed(format!(
                "Dial to {} failed: connection refused",
                params.address()
            ))),
            ConnectBehavior::RejectCredentials => Err(SshError::AuthenticationFailed(
                "Server rejected credentials".to_string(),
            )),
        }
    }
}

/// Configuration fetching `files` into `local_dir`
pub fn app_config(files: &[&str], local_dir: &Path) -> AppConfig {
    AppConfig {
        connection: ConnectionParams::new("alice", "pw", "files.example.com", 22)
            .with_remote_files(files.iter().copied()),
        transfer: TransferSettings {
            local_dir: local_dir.to_path_buf(),
            ..TransferSettings::default()
        },
    }
}

/// Names of the entries in `dir`, sorted
pub fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
