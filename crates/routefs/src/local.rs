//! Local filesystem backend.
//!
//! Provides access to real filesystem paths under a fixed root, with an
//! optional read-only mode. Paths that escape the root via `..` or
//! symlinks are rejected.

use std::io;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use filetime::FileTime;
use tokio::fs;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::backend::{Backend, DirEntry, EntryType, FileHandle, Metadata, OpenFlags};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Local filesystem backend rooted at a host directory.
///
/// All operations are relative to `root`: if `root` is
/// `/srv/storage`, then `open("/blobs/a.bin")` opens
/// `/srv/storage/blobs/a.bin`.
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
    read_only: bool,
}

impl LocalFs {
    /// Create a local backend rooted at the given path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            read_only: false,
        }
    }

    /// Create a read-only local backend.
    pub fn read_only(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            read_only: true,
        }
    }

    /// Set whether this backend rejects writes.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// The root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a backend path to an absolute host path within the root.
    ///
    /// Returns an error if the path escapes the root (via `..`).
    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let relative = path.trim_start_matches('/');
        let full = self.root.join(relative);

        // Canonicalize to resolve symlinks and `..`. Non-existent leaves
        // canonicalize their parent instead.
        let canonical = if full.exists() {
            full.canonicalize()?
        } else {
            let parent = full
                .parent()
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid path"))?;
            let filename = full
                .file_name()
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid path"))?;

            if parent.exists() {
                parent.canonicalize()?.join(filename)
            } else {
                // Parent doesn't exist either; the actual operation
                // will surface the error
                full
            }
        };

        let canonical_root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());
        if !canonical.starts_with(&canonical_root) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!(
                    "path escapes root: {} is not under {}",
                    canonical.display(),
                    canonical_root.display()
                ),
            ));
        }

        Ok(canonical)
    }

    fn check_writable(&self) -> io::Result<()> {
        if self.read_only {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "filesystem is read-only",
            ))
        } else {
            Ok(())
        }
    }

    fn metadata_from(meta: &std::fs::Metadata) -> Metadata {
        #[cfg(unix)]
        let mode = meta.permissions().mode() & 0o7777;
        #[cfg(not(unix))]
        let mode = 0;

        Metadata {
            is_dir: meta.is_dir(),
            is_file: meta.is_file(),
            size: meta.len(),
            mode,
            modified: meta.modified().ok(),
        }
    }
}

#[async_trait]
impl Backend for LocalFs {
    async fn open_file(
        &self,
        path: &str,
        flags: OpenFlags,
        mode: u32,
    ) -> io::Result<Box<dyn FileHandle>> {
        if flags.write || flags.append {
            self.check_writable()?;
        }
        let full_path = self.resolve(path)?;

        if flags.create {
            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut options = fs::OpenOptions::new();
        options
            .read(flags.read)
            .write(flags.write)
            .append(flags.append)
            .create(flags.create)
            .truncate(flags.truncate)
            .create_new(flags.exclusive);
        #[cfg(unix)]
        if flags.create && mode != 0 {
            options.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        let file = options.open(&full_path).await?;
        Ok(Box::new(LocalFileHandle { file }))
    }

    async fn mkdir(&self, path: &str, mode: u32) -> io::Result<()> {
        self.check_writable()?;
        let full_path = self.resolve(path)?;
        fs::create_dir(&full_path).await?;
        #[cfg(unix)]
        if mode != 0 {
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(mode)).await?;
        }
        #[cfg(not(unix))]
        let _ = mode;
        Ok(())
    }

    async fn mkdir_all(&self, path: &str, mode: u32) -> io::Result<()> {
        self.check_writable()?;
        let full_path = self.resolve(path)?;
        fs::create_dir_all(&full_path).await?;
        #[cfg(unix)]
        if mode != 0 {
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(mode)).await?;
        }
        #[cfg(not(unix))]
        let _ = mode;
        Ok(())
    }

    async fn remove(&self, path: &str) -> io::Result<()> {
        self.check_writable()?;
        let full_path = self.resolve(path)?;
        let meta = fs::metadata(&full_path).await?;

        if meta.is_dir() {
            fs::remove_dir(&full_path).await
        } else {
            fs::remove_file(&full_path).await
        }
    }

    async fn remove_all(&self, path: &str) -> io::Result<()> {
        self.check_writable()?;
        let full_path = self.resolve(path)?;
        let meta = match fs::metadata(&full_path).await {
            Ok(meta) => meta,
            // Removing a missing path is not an error
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        if meta.is_dir() {
            fs::remove_dir_all(&full_path).await
        } else {
            fs::remove_file(&full_path).await
        }
    }

    async fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        self.check_writable()?;
        let from_path = self.resolve(from)?;
        let to_path = self.resolve(to)?;

        if let Some(parent) = to_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::rename(&from_path, &to_path).await
    }

    async fn stat(&self, path: &str) -> io::Result<Metadata> {
        let full_path = self.resolve(path)?;
        let meta = fs::metadata(&full_path).await?;
        Ok(Self::metadata_from(&meta))
    }

    async fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        let full_path = self.resolve(path)?;
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&full_path).await?;

        while let Some(entry) = dir.next_entry().await? {
            let meta = fs::metadata(entry.path()).await?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                entry_type: if meta.is_dir() {
                    EntryType::Directory
                } else {
                    EntryType::File
                },
                size: meta.len(),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn chmod(&self, path: &str, mode: u32) -> io::Result<()> {
        self.check_writable()?;
        let full_path = self.resolve(path)?;
        #[cfg(unix)]
        {
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(mode)).await
        }
        #[cfg(not(unix))]
        {
            let _ = (full_path, mode);
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "chmod not supported on this platform",
            ))
        }
    }

    async fn chtimes(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> io::Result<()> {
        self.check_writable()?;
        let full_path = self.resolve(path)?;
        filetime::set_file_times(
            &full_path,
            FileTime::from_system_time(atime),
            FileTime::from_system_time(mtime),
        )
    }

    async fn chown(&self, path: &str, uid: u32, gid: u32) -> io::Result<()> {
        self.check_writable()?;
        let full_path = self.resolve(path)?;
        #[cfg(unix)]
        {
            std::os::unix::fs::chown(&full_path, Some(uid), Some(gid))
        }
        #[cfg(not(unix))]
        {
            let _ = (full_path, uid, gid);
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "chown not supported on this platform",
            ))
        }
    }

    async fn truncate(&self, path: &str, size: u64) -> io::Result<()> {
        self.check_writable()?;
        let full_path = self.resolve(path)?;
        let file = fs::OpenOptions::new().write(true).open(&full_path).await?;
        file.set_len(size).await
    }
}

/// A file handle over a host file.
#[derive(Debug)]
struct LocalFileHandle {
    file: File,
}

#[async_trait]
impl FileHandle for LocalFileHandle {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf).await
    }

    async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf).await
    }

    async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        // Emulated with seeks; the cursor is restored afterwards
        let saved = self.file.seek(SeekFrom::Current(0)).await?;
        self.file.seek(SeekFrom::Start(offset)).await?;
        let result = self.file.read(buf).await;
        self.file.seek(SeekFrom::Start(saved)).await?;
        result
    }

    async fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        let saved = self.file.seek(SeekFrom::Current(0)).await?;
        self.file.seek(SeekFrom::Start(offset)).await?;
        let result = self.file.write(buf).await;
        self.file.seek(SeekFrom::Start(saved)).await?;
        result
    }

    async fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos).await
    }

    async fn sync(&mut self) -> io::Result<()> {
        self.file.sync_all().await
    }

    async fn close(&mut self) -> io::Result<()> {
        self.file.flush().await
    }

    async fn stat(&self) -> io::Result<Metadata> {
        let meta = self.file.metadata().await?;
        Ok(LocalFs::metadata_from(&meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup() -> (LocalFs, TempDir) {
        let dir = TempDir::new().unwrap();
        (LocalFs::new(dir.path()), dir)
    }

    async fn write_all(fs: &LocalFs, path: &str, data: &[u8]) {
        let mut handle = fs.create(path).await.unwrap();
        handle.write(data).await.unwrap();
        handle.close().await.unwrap();
    }

    async fn read_all(fs: &LocalFs, path: &str) -> Vec<u8> {
        let mut handle = fs.open(path).await.unwrap();
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

    #[tokio::test]
    async fn write_and_read() {
        let (fs, _dir) = setup().await;
        write_all(&fs, "test.txt", b"hello").await;
        assert_eq!(read_all(&fs, "test.txt").await, b"hello");
    }

    #[tokio::test]
    async fn nested_create_makes_parents() {
        let (fs, _dir) = setup().await;
        write_all(&fs, "a/b/c.txt", b"nested").await;
        assert_eq!(read_all(&fs, "a/b/c.txt").await, b"nested");
    }

    #[tokio::test]
    async fn read_only_rejects_writes() {
        let (_, dir) = setup().await;
        let fs = LocalFs::read_only(dir.path());

        let result = fs.create("test.txt").await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::PermissionDenied);

        let result = fs.mkdir("d", 0o755).await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn path_escape_blocked() {
        let (fs, _dir) = setup().await;
        let result = fs.open("../../../etc/passwd").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn list_directory() {
        let (fs, _dir) = setup().await;
        write_all(&fs, "a.txt", b"a").await;
        write_all(&fs, "b.txt", b"b").await;
        fs.mkdir("subdir", 0o755).await.unwrap();

        let entries = fs.read_dir("").await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "subdir"]);
    }

    #[tokio::test]
    async fn stat_file_and_dir() {
        let (fs, _dir) = setup().await;
        write_all(&fs, "file.txt", b"content").await;
        fs.mkdir("dir", 0o755).await.unwrap();

        let meta = fs.stat("file.txt").await.unwrap();
        assert!(meta.is_file);
        assert_eq!(meta.size, 7);

        let meta = fs.stat("dir").await.unwrap();
        assert!(meta.is_dir);
    }

    #[tokio::test]
    async fn remove_and_remove_all() {
        let (fs, _dir) = setup().await;
        write_all(&fs, "f.txt", b"x").await;
        write_all(&fs, "tree/sub/leaf.txt", b"y").await;

        fs.remove("f.txt").await.unwrap();
        assert!(!fs.exists("f.txt").await);

        fs.remove_all("tree").await.unwrap();
        assert!(!fs.exists("tree").await);

        // Missing path is tolerated
        fs.remove_all("tree").await.unwrap();
    }

    #[tokio::test]
    async fn rename_moves_file() {
        let (fs, _dir) = setup().await;
        write_all(&fs, "old.txt", b"data").await;

        fs.rename("old.txt", "sub/new.txt").await.unwrap();
        assert!(!fs.exists("old.txt").await);
        assert_eq!(read_all(&fs, "sub/new.txt").await, b"data");
    }

    #[tokio::test]
    async fn truncate_changes_length() {
        let (fs, _dir) = setup().await;
        write_all(&fs, "f", b"0123456789").await;

        fs.truncate("f", 4).await.unwrap();
        assert_eq!(fs.stat("f").await.unwrap().size, 4);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn chmod_applies_mode() {
        let (fs, _dir) = setup().await;
        write_all(&fs, "f", b"x").await;

        fs.chmod("f", 0o600).await.unwrap();
        assert_eq!(fs.stat("f").await.unwrap().mode, 0o600);
    }

    #[tokio::test]
    async fn chtimes_sets_mtime() {
        let (fs, _dir) = setup().await;
        write_all(&fs, "f", b"x").await;

        let past = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        fs.chtimes("f", past, past).await.unwrap();

        let meta = fs.stat("f").await.unwrap();
        assert_eq!(meta.modified, Some(past));
    }

    #[tokio::test]
    async fn positional_io_preserves_cursor() {
        let (fs, _dir) = setup().await;
        write_all(&fs, "f", b"abcdefgh").await;

        let mut handle = fs
            .open_file("f", OpenFlags::write(), 0)
            .await
            .unwrap();
        let mut buf = [0u8; 2];
        handle.read_at(&mut buf, 2).await.unwrap();
        assert_eq!(&buf, b"cd");
        assert_eq!(handle.seek(SeekFrom::Current(0)).await.unwrap(), 0);

        handle.write_at(b"XY", 4).await.unwrap();
        handle.close().await.unwrap();
        assert_eq!(read_all(&fs, "f").await, b"abcdXYgh");
    }
}
