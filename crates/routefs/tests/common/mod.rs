#![allow(dead_code)]

//! Shared test support: a recording backend wrapper and handle helpers.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::SystemTime;

use async_trait::async_trait;
use routefs::{Backend, DirEntry, FileHandle, Metadata, MemoryFs, OpenFlags};

/// Wraps a [`MemoryFs`] and records every operation that reaches it,
/// so tests can assert what a backend actually received.
pub struct RecordingFs {
    inner: MemoryFs,
    ops: Mutex<Vec<(String, String)>>,
    renames: AtomicUsize,
}

impl Default for RecordingFs {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingFs {
    pub fn new() -> Self {
        Self {
            inner: MemoryFs::new(),
            ops: Mutex::new(Vec::new()),
            renames: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &MemoryFs {
        &self.inner
    }

    /// Paths recorded for a given operation, in call order.
    pub fn calls(&self, op: &str) -> Vec<String> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == op)
            .map(|(_, path)| path.clone())
            .collect()
    }

    pub fn rename_count(&self) -> usize {
        self.renames.load(Ordering::SeqCst)
    }

    fn record(&self, op: &str, path: &str) {
        self.ops
            .lock()
            .unwrap()
            .push((op.to_string(), path.to_string()));
    }
}

#[async_trait]
impl Backend for RecordingFs {
    async fn open_file(
        &self,
        path: &str,
        flags: OpenFlags,
        mode: u32,
    ) -> io::Result<Box<dyn FileHandle>> {
        self.record("open_file", path);
        self.inner.open_file(path, flags, mode).await
    }

    async fn mkdir(&self, path: &str, mode: u32) -> io::Result<()> {
        self.record("mkdir", path);
        self.inner.mkdir(path, mode).await
    }

    async fn mkdir_all(&self, path: &str, mode: u32) -> io::Result<()> {
        self.record("mkdir_all", path);
        self.inner.mkdir_all(path, mode).await
    }

    async fn remove(&self, path: &str) -> io::Result<()> {
        self.record("remove", path);
        self.inner.remove(path).await
    }

    async fn remove_all(&self, path: &str) -> io::Result<()> {
        self.record("remove_all", path);
        self.inner.remove_all(path).await
    }

    async fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        self.record("rename", from);
        self.renames.fetch_add(1, Ordering::SeqCst);
        self.inner.rename(from, to).await
    }

    async fn stat(&self, path: &str) -> io::Result<Metadata> {
        self.record("stat", path);
        self.inner.stat(path).await
    }

    async fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        self.record("read_dir", path);
        self.inner.read_dir(path).await
    }

    async fn chmod(&self, path: &str, mode: u32) -> io::Result<()> {
        self.record("chmod", path);
        self.inner.chmod(path, mode).await
    }

    async fn chtimes(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> io::Result<()> {
        self.record("chtimes", path);
        self.inner.chtimes(path, atime, mtime).await
    }

    async fn chown(&self, path: &str, uid: u32, gid: u32) -> io::Result<()> {
        self.record("chown", path);
        self.inner.chown(path, uid, gid).await
    }

    async fn truncate(&self, path: &str, size: u64) -> io::Result<()> {
        self.record("truncate", path);
        self.inner.truncate(path, size).await
    }
}

/// Drain a handle to the end.
pub async fn read_all(handle: &mut Box<dyn FileHandle>) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = handle.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    out
}
