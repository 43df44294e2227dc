//! Backend contract: the filesystem operation surface routes dispatch to.
//!
//! A backend is an independent filesystem (in-memory store, local disk,
//! object store) reached through [`Backend`]. All paths handed to a
//! backend are absolute, forward-slash-delimited, and already rewritten
//! by the owning route. Backend errors are `std::io::Error` and are
//! propagated to callers unchanged.

use std::io;
use std::io::SeekFrom;
use std::time::SystemTime;

use async_trait::async_trait;

/// Metadata for a file or directory.
#[derive(Debug, Clone)]
pub struct Metadata {
    /// True for directories.
    pub is_dir: bool,
    /// True for regular files.
    pub is_file: bool,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Unix permission bits (e.g. `0o644`).
    pub mode: u32,
    /// Last modification time, when the backend tracks one.
    pub modified: Option<SystemTime>,
}

impl Metadata {
    /// Metadata for a regular file.
    pub fn file(size: u64, mode: u32, modified: Option<SystemTime>) -> Self {
        Self {
            is_dir: false,
            is_file: true,
            size,
            mode,
            modified,
        }
    }

    /// Metadata for a directory.
    pub fn directory(mode: u32, modified: Option<SystemTime>) -> Self {
        Self {
            is_dir: true,
            is_file: false,
            size: 0,
            mode,
            modified,
        }
    }
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
}

/// A single entry returned by [`Backend::read_dir`].
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// Entry name (not the full path).
    pub name: String,
    pub entry_type: EntryType,
    /// Size in bytes (0 for directories).
    pub size: u64,
}

/// Open disposition for [`Backend::open_file`].
///
/// A plain struct rather than platform flag bits, so every backend
/// interprets the same fields the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    /// Read access requested.
    pub read: bool,
    /// Write access requested.
    pub write: bool,
    /// Writes go to the end of the file.
    pub append: bool,
    /// Create the file if it does not exist.
    pub create: bool,
    /// Truncate to zero length on open.
    pub truncate: bool,
    /// Fail if the file already exists (implies `create`).
    pub exclusive: bool,
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self {
            read: true,
            write: false,
            append: false,
            create: false,
            truncate: false,
            exclusive: false,
        }
    }
}

impl OpenFlags {
    /// Read-only access.
    pub fn read() -> Self {
        Self::default()
    }

    /// Read-write access to an existing file.
    pub fn write() -> Self {
        Self {
            write: true,
            ..Default::default()
        }
    }

    /// Read-write, creating the file if missing.
    pub fn create() -> Self {
        Self {
            write: true,
            create: true,
            ..Default::default()
        }
    }

    /// Read-write, creating if missing and truncating if present.
    pub fn create_truncate() -> Self {
        Self {
            write: true,
            create: true,
            truncate: true,
            ..Default::default()
        }
    }

    /// Exclusive create: fail if the file already exists.
    pub fn create_exclusive() -> Self {
        Self {
            write: true,
            create: true,
            exclusive: true,
            ..Default::default()
        }
    }

    /// Append-only writes, creating the file if missing.
    pub fn append() -> Self {
        Self {
            write: true,
            append: true,
            create: true,
            ..Default::default()
        }
    }
}

/// An open file on a backend.
///
/// Dropping a handle releases it; `close` exists so callers can observe
/// flush errors.
#[async_trait]
pub trait FileHandle: Send + std::fmt::Debug {
    /// Read into `buf` at the current cursor, advancing it. Returns the
    /// number of bytes read; 0 means end of file.
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write from `buf` at the current cursor, advancing it.
    async fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Read at an absolute offset without moving the cursor.
    async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Write at an absolute offset without moving the cursor.
    async fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize>;

    /// Reposition the cursor. Returns the new position from the start.
    async fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;

    /// Flush buffered writes to durable storage.
    async fn sync(&mut self) -> io::Result<()>;

    /// Flush and release the handle.
    async fn close(&mut self) -> io::Result<()>;

    /// Metadata for the open file.
    async fn stat(&self) -> io::Result<Metadata>;
}

/// Abstract filesystem backend.
///
/// Implementations must be safe for concurrent use; the facade invokes
/// them from arbitrary tasks without external serialization.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Open a file with explicit flags. `mode` applies only when the
    /// call creates the file.
    async fn open_file(
        &self,
        path: &str,
        flags: OpenFlags,
        mode: u32,
    ) -> io::Result<Box<dyn FileHandle>>;

    /// Open an existing file for reading.
    async fn open(&self, path: &str) -> io::Result<Box<dyn FileHandle>> {
        self.open_file(path, OpenFlags::read(), 0).await
    }

    /// Create (or truncate) a file for writing.
    async fn create(&self, path: &str) -> io::Result<Box<dyn FileHandle>> {
        self.open_file(path, OpenFlags::create_truncate(), 0o666).await
    }

    /// Create a directory. Fails if the parent is missing.
    async fn mkdir(&self, path: &str, mode: u32) -> io::Result<()>;

    /// Create a directory and any missing parents.
    async fn mkdir_all(&self, path: &str, mode: u32) -> io::Result<()>;

    /// Remove a file or empty directory.
    async fn remove(&self, path: &str) -> io::Result<()>;

    /// Remove a path and all children. Removing a missing path is not
    /// an error.
    async fn remove_all(&self, path: &str) -> io::Result<()>;

    /// Rename (move) within this backend.
    async fn rename(&self, from: &str, to: &str) -> io::Result<()>;

    /// Metadata for a path.
    async fn stat(&self, path: &str) -> io::Result<Metadata>;

    /// List entries in a directory.
    async fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>>;

    /// Change permission bits.
    async fn chmod(&self, path: &str, mode: u32) -> io::Result<()>;

    /// Change access and modification times.
    async fn chtimes(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> io::Result<()>;

    /// Change owner and group.
    async fn chown(&self, path: &str, uid: u32, gid: u32) -> io::Result<()>;

    /// Resize a file, zero-filling on extension.
    async fn truncate(&self, path: &str, size: u64) -> io::Result<()>;

    /// Check if a path exists.
    async fn exists(&self, path: &str) -> bool {
        self.stat(path).await.is_ok()
    }
}
