//! In-memory filesystem backend.
//!
//! Thread-safe via an internal `RwLock`; all data is lost on drop.
//! Useful for tests and scratch space.

use std::collections::HashMap;
use std::io;
use std::io::SeekFrom;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::backend::{Backend, DirEntry, EntryType, FileHandle, Metadata, OpenFlags};

#[derive(Debug, Clone, Copy)]
struct NodeAttrs {
    mode: u32,
    modified: SystemTime,
    uid: u32,
    gid: u32,
}

impl NodeAttrs {
    fn new(mode: u32) -> Self {
        Self {
            mode,
            modified: SystemTime::now(),
            uid: 0,
            gid: 0,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8>, attrs: NodeAttrs },
    Directory { attrs: NodeAttrs },
}

impl Node {
    fn attrs_mut(&mut self) -> &mut NodeAttrs {
        match self {
            Node::File { attrs, .. } | Node::Directory { attrs } => attrs,
        }
    }

    fn metadata(&self) -> Metadata {
        match self {
            Node::File { data, attrs } => {
                Metadata::file(data.len() as u64, attrs.mode, Some(attrs.modified))
            }
            Node::Directory { attrs } => Metadata::directory(attrs.mode, Some(attrs.modified)),
        }
    }
}

type NodeMap = HashMap<String, Node>;

/// In-memory filesystem.
///
/// Nodes are keyed by normalized relative path; the root is the empty
/// key and always exists.
#[derive(Debug)]
pub struct MemoryFs {
    nodes: Arc<RwLock<NodeMap>>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("not found: {}", path))
}

fn already_exists(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::AlreadyExists, format!("file exists: {}", path))
}

fn is_a_directory(path: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::IsADirectory,
        format!("is a directory: {}", path),
    )
}

fn not_a_directory(path: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotADirectory,
        format!("not a directory: {}", path),
    )
}

impl MemoryFs {
    /// Create a new empty in-memory filesystem.
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        // Root directory always exists
        nodes.insert(
            String::new(),
            Node::Directory {
                attrs: NodeAttrs::new(0o755),
            },
        );
        Self {
            nodes: Arc::new(RwLock::new(nodes)),
        }
    }

    /// Normalize a path to its storage key: strip leading `/`, resolve
    /// `.` and `..` (which cannot climb above the root).
    fn normalize(path: &str) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                other => parts.push(other),
            }
        }
        parts.join("/")
    }

    fn parent_of(key: &str) -> &str {
        key.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
    }

    /// Create missing ancestor directories for `key`.
    fn ensure_parents(nodes: &mut NodeMap, key: &str) -> io::Result<()> {
        let Some((parents, _)) = key.rsplit_once('/') else {
            return Ok(());
        };
        let mut current = String::new();
        for component in parents.split('/') {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(component);
            match nodes.get(&current) {
                Some(Node::Directory { .. }) => {}
                Some(Node::File { .. }) => return Err(not_a_directory(&current)),
                None => {
                    nodes.insert(
                        current.clone(),
                        Node::Directory {
                            attrs: NodeAttrs::new(0o755),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    /// Write an entire file, creating it and any parents.
    pub async fn write_file(&self, path: &str, data: &[u8]) -> io::Result<()> {
        let key = Self::normalize(path);
        let mut nodes = self.nodes.write().await;

        if let Some(Node::Directory { .. }) = nodes.get(&key) {
            return Err(is_a_directory(path));
        }
        Self::ensure_parents(&mut nodes, &key)?;
        nodes.insert(
            key,
            Node::File {
                data: data.to_vec(),
                attrs: NodeAttrs::new(0o644),
            },
        );
        Ok(())
    }

    /// Read an entire file.
    pub async fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        let key = Self::normalize(path);
        let nodes = self.nodes.read().await;
        match nodes.get(&key) {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            Some(Node::Directory { .. }) => Err(is_a_directory(path)),
            None => Err(not_found(path)),
        }
    }
}

#[async_trait]
impl Backend for MemoryFs {
    async fn open_file(
        &self,
        path: &str,
        flags: OpenFlags,
        mode: u32,
    ) -> io::Result<Box<dyn FileHandle>> {
        let key = Self::normalize(path);
        let mut nodes = self.nodes.write().await;

        if !nodes.contains_key(&key) {
            if !flags.create {
                return Err(not_found(path));
            }
            Self::ensure_parents(&mut nodes, &key)?;
            let mode = if mode == 0 { 0o666 } else { mode };
            nodes.insert(
                key.clone(),
                Node::File {
                    data: Vec::new(),
                    attrs: NodeAttrs::new(mode),
                },
            );
            return Ok(Box::new(MemFileHandle::new(
                Arc::clone(&self.nodes),
                key,
                flags,
            )));
        }

        match nodes.get_mut(&key) {
            Some(Node::Directory { .. }) => Err(is_a_directory(path)),
            Some(Node::File { data, attrs }) => {
                if flags.exclusive {
                    return Err(already_exists(path));
                }
                if flags.truncate && flags.write {
                    data.clear();
                    attrs.modified = SystemTime::now();
                }
                Ok(Box::new(MemFileHandle::new(
                    Arc::clone(&self.nodes),
                    key,
                    flags,
                )))
            }
            None => Err(not_found(path)),
        }
    }

    async fn mkdir(&self, path: &str, mode: u32) -> io::Result<()> {
        let key = Self::normalize(path);
        let mut nodes = self.nodes.write().await;

        if nodes.contains_key(&key) {
            return Err(already_exists(path));
        }
        match nodes.get(Self::parent_of(&key)) {
            Some(Node::Directory { .. }) => {}
            Some(Node::File { .. }) => return Err(not_a_directory(path)),
            None => return Err(not_found(path)),
        }
        let mode = if mode == 0 { 0o755 } else { mode };
        nodes.insert(
            key,
            Node::Directory {
                attrs: NodeAttrs::new(mode),
            },
        );
        Ok(())
    }

    async fn mkdir_all(&self, path: &str, mode: u32) -> io::Result<()> {
        let key = Self::normalize(path);
        if key.is_empty() {
            return Ok(());
        }
        let mut nodes = self.nodes.write().await;
        Self::ensure_parents(&mut nodes, &key)?;
        if let Some(existing) = nodes.get(&key) {
            return match existing {
                Node::Directory { .. } => Ok(()),
                Node::File { .. } => Err(not_a_directory(path)),
            };
        }
        let mode = if mode == 0 { 0o755 } else { mode };
        nodes.insert(
            key,
            Node::Directory {
                attrs: NodeAttrs::new(mode),
            },
        );
        Ok(())
    }

    async fn remove(&self, path: &str) -> io::Result<()> {
        let key = Self::normalize(path);
        if key.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot remove root directory",
            ));
        }
        let mut nodes = self.nodes.write().await;

        if let Some(Node::Directory { .. }) = nodes.get(&key) {
            let prefix = format!("{}/", key);
            if nodes.keys().any(|k| k.starts_with(&prefix)) {
                return Err(io::Error::new(
                    io::ErrorKind::DirectoryNotEmpty,
                    format!("directory not empty: {}", path),
                ));
            }
        }

        nodes.remove(&key).ok_or_else(|| not_found(path))?;
        Ok(())
    }

    async fn remove_all(&self, path: &str) -> io::Result<()> {
        let key = Self::normalize(path);
        let mut nodes = self.nodes.write().await;

        if key.is_empty() {
            nodes.clear();
            nodes.insert(
                String::new(),
                Node::Directory {
                    attrs: NodeAttrs::new(0o755),
                },
            );
            return Ok(());
        }

        let prefix = format!("{}/", key);
        nodes.retain(|k, _| *k != key && !k.starts_with(&prefix));
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let from_key = Self::normalize(from);
        let to_key = Self::normalize(to);

        if from_key.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot rename root directory",
            ));
        }

        let mut nodes = self.nodes.write().await;
        if !nodes.contains_key(&from_key) {
            return Err(not_found(from));
        }
        Self::ensure_parents(&mut nodes, &to_key)?;

        let Some(entry) = nodes.remove(&from_key) else {
            return Err(not_found(from));
        };

        // A file cannot replace a directory, nor a directory a file
        if let Some(existing) = nodes.get(&to_key) {
            match (&entry, existing) {
                (Node::File { .. }, Node::Directory { .. }) => {
                    nodes.insert(from_key, entry);
                    return Err(is_a_directory(to));
                }
                (Node::Directory { .. }, Node::File { .. }) => {
                    nodes.insert(from_key, entry);
                    return Err(not_a_directory(to));
                }
                _ => {}
            }
        }

        // Directories carry their whole subtree along
        if matches!(entry, Node::Directory { .. }) {
            let prefix = format!("{}/", from_key);
            let children: Vec<(String, Node)> = nodes
                .iter()
                .filter(|(k, _)| k.starts_with(&prefix))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            for (old_key, child) in children {
                nodes.remove(&old_key);
                let new_key = format!("{}{}", to_key, &old_key[from_key.len()..]);
                nodes.insert(new_key, child);
            }
        }

        nodes.insert(to_key, entry);
        Ok(())
    }

    async fn stat(&self, path: &str) -> io::Result<Metadata> {
        let key = Self::normalize(path);
        let nodes = self.nodes.read().await;
        nodes
            .get(&key)
            .map(Node::metadata)
            .ok_or_else(|| not_found(path))
    }

    async fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        let key = Self::normalize(path);
        let nodes = self.nodes.read().await;

        match nodes.get(&key) {
            Some(Node::Directory { .. }) => {}
            Some(Node::File { .. }) => return Err(not_a_directory(path)),
            None => return Err(not_found(path)),
        }

        let mut entries = Vec::new();
        for (node_key, node) in nodes.iter() {
            if node_key.is_empty() || Self::parent_of(node_key) != key {
                continue;
            }
            let name = node_key
                .rsplit_once('/')
                .map(|(_, name)| name)
                .unwrap_or(node_key);
            let entry = match node {
                Node::File { data, .. } => DirEntry {
                    name: name.to_string(),
                    entry_type: EntryType::File,
                    size: data.len() as u64,
                },
                Node::Directory { .. } => DirEntry {
                    name: name.to_string(),
                    entry_type: EntryType::Directory,
                    size: 0,
                },
            };
            entries.push(entry);
        }

        // Sort for consistent ordering
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn chmod(&self, path: &str, mode: u32) -> io::Result<()> {
        let key = Self::normalize(path);
        let mut nodes = self.nodes.write().await;
        let node = nodes.get_mut(&key).ok_or_else(|| not_found(path))?;
        node.attrs_mut().mode = mode;
        Ok(())
    }

    async fn chtimes(&self, path: &str, _atime: SystemTime, mtime: SystemTime) -> io::Result<()> {
        let key = Self::normalize(path);
        let mut nodes = self.nodes.write().await;
        let node = nodes.get_mut(&key).ok_or_else(|| not_found(path))?;
        // Access times are not tracked
        node.attrs_mut().modified = mtime;
        Ok(())
    }

    async fn chown(&self, path: &str, uid: u32, gid: u32) -> io::Result<()> {
        let key = Self::normalize(path);
        let mut nodes = self.nodes.write().await;
        let node = nodes.get_mut(&key).ok_or_else(|| not_found(path))?;
        let attrs = node.attrs_mut();
        attrs.uid = uid;
        attrs.gid = gid;
        Ok(())
    }

    async fn truncate(&self, path: &str, size: u64) -> io::Result<()> {
        let key = Self::normalize(path);
        let mut nodes = self.nodes.write().await;
        match nodes.get_mut(&key) {
            Some(Node::File { data, attrs }) => {
                data.resize(size as usize, 0);
                attrs.modified = SystemTime::now();
                Ok(())
            }
            Some(Node::Directory { .. }) => Err(is_a_directory(path)),
            None => Err(not_found(path)),
        }
    }
}

/// Open-file state: a cursor over a node in the shared map.
#[derive(Debug)]
struct MemFileHandle {
    nodes: Arc<RwLock<NodeMap>>,
    key: String,
    flags: OpenFlags,
    pos: u64,
    closed: bool,
}

impl MemFileHandle {
    fn new(nodes: Arc<RwLock<NodeMap>>, key: String, flags: OpenFlags) -> Self {
        Self {
            nodes,
            key,
            flags,
            pos: 0,
            closed: false,
        }
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.closed {
            Err(io::Error::other("file handle is closed"))
        } else {
            Ok(())
        }
    }

    fn ensure_readable(&self) -> io::Result<()> {
        self.ensure_open()?;
        if !self.flags.read {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "handle not open for reading",
            ));
        }
        Ok(())
    }

    fn ensure_writable(&self) -> io::Result<()> {
        self.ensure_open()?;
        if !self.flags.write {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "handle not open for writing",
            ));
        }
        Ok(())
    }

    fn read_from(data: &[u8], offset: u64, buf: &mut [u8]) -> usize {
        let start = (offset.min(data.len() as u64)) as usize;
        let n = (data.len() - start).min(buf.len());
        buf[..n].copy_from_slice(&data[start..start + n]);
        n
    }

    fn write_into(data: &mut Vec<u8>, offset: u64, buf: &[u8]) -> usize {
        let start = offset as usize;
        if data.len() < start {
            data.resize(start, 0);
        }
        let end = start + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        buf.len()
    }
}

#[async_trait]
impl FileHandle for MemFileHandle {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.ensure_readable()?;
        let nodes = self.nodes.read().await;
        let Some(Node::File { data, .. }) = nodes.get(&self.key) else {
            return Err(not_found(&self.key));
        };
        let n = Self::read_from(data, self.pos, buf);
        self.pos += n as u64;
        Ok(n)
    }

    async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.ensure_writable()?;
        let mut nodes = self.nodes.write().await;
        let Some(Node::File { data, attrs }) = nodes.get_mut(&self.key) else {
            return Err(not_found(&self.key));
        };
        let start = if self.flags.append {
            data.len() as u64
        } else {
            self.pos
        };
        let n = Self::write_into(data, start, buf);
        attrs.modified = SystemTime::now();
        self.pos = start + n as u64;
        Ok(n)
    }

    async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.ensure_readable()?;
        let nodes = self.nodes.read().await;
        let Some(Node::File { data, .. }) = nodes.get(&self.key) else {
            return Err(not_found(&self.key));
        };
        Ok(Self::read_from(data, offset, buf))
    }

    async fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        self.ensure_writable()?;
        let mut nodes = self.nodes.write().await;
        let Some(Node::File { data, attrs }) = nodes.get_mut(&self.key) else {
            return Err(not_found(&self.key));
        };
        let n = Self::write_into(data, offset, buf);
        attrs.modified = SystemTime::now();
        Ok(n)
    }

    async fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.ensure_open()?;
        let new_pos: i64 = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(delta) => self.pos as i64 + delta,
            SeekFrom::End(delta) => {
                let nodes = self.nodes.read().await;
                let len = match nodes.get(&self.key) {
                    Some(Node::File { data, .. }) => data.len() as i64,
                    _ => 0,
                };
                len + delta
            }
        };
        if new_pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative position",
            ));
        }
        self.pos = new_pos as u64;
        Ok(self.pos)
    }

    async fn sync(&mut self) -> io::Result<()> {
        self.ensure_open()
    }

    async fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }

    async fn stat(&self) -> io::Result<Metadata> {
        self.ensure_open()?;
        let nodes = self.nodes.read().await;
        nodes
            .get(&self.key)
            .map(Node::metadata)
            .ok_or_else(|| not_found(&self.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_and_read() {
        let fs = MemoryFs::new();
        fs.write_file("test.txt", b"hello world").await.unwrap();
        let data = fs.read_file("test.txt").await.unwrap();
        assert_eq!(data, b"hello world");
    }

    #[tokio::test]
    async fn read_not_found() {
        let fs = MemoryFs::new();
        let result = fs.read_file("nonexistent.txt").await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn nested_write_creates_parents() {
        let fs = MemoryFs::new();
        fs.write_file("a/b/c/file.txt", b"nested").await.unwrap();

        assert!(fs.stat("a").await.unwrap().is_dir);
        assert!(fs.stat("a/b").await.unwrap().is_dir);
        assert!(fs.stat("a/b/c").await.unwrap().is_dir);
        assert_eq!(fs.read_file("a/b/c/file.txt").await.unwrap(), b"nested");
    }

    #[tokio::test]
    async fn path_normalization() {
        let fs = MemoryFs::new();
        fs.write_file("/a/b/c.txt", b"data").await.unwrap();

        assert!(fs.read_file("a/b/c.txt").await.is_ok());
        assert!(fs.read_file("/a/b/c.txt").await.is_ok());
        assert!(fs.read_file("a/./b/c.txt").await.is_ok());
        assert!(fs.read_file("a/b/../b/c.txt").await.is_ok());
    }

    #[tokio::test]
    async fn open_missing_without_create() {
        let fs = MemoryFs::new();
        let result = fs.open("missing.txt").await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn handle_read_in_chunks() {
        let fs = MemoryFs::new();
        fs.write_file("f", b"0123456789").await.unwrap();

        let mut handle = fs.open("f").await.unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(handle.read(&mut buf).await.unwrap(), 4);
        assert_eq!(&buf, b"0123");
        assert_eq!(handle.read(&mut buf).await.unwrap(), 4);
        assert_eq!(&buf, b"4567");
        assert_eq!(handle.read(&mut buf).await.unwrap(), 2);
        assert_eq!(&buf[..2], b"89");
        assert_eq!(handle.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn handle_write_and_seek() {
        let fs = MemoryFs::new();
        let mut handle = fs.create("f").await.unwrap();
        handle.write(b"hello world").await.unwrap();

        handle.seek(SeekFrom::Start(6)).await.unwrap();
        handle.write(b"rust!").await.unwrap();
        handle.close().await.unwrap();

        assert_eq!(fs.read_file("f").await.unwrap(), b"hello rust!");
    }

    #[tokio::test]
    async fn handle_positional_io() {
        let fs = MemoryFs::new();
        fs.write_file("f", b"abcdefgh").await.unwrap();

        let mut handle = fs
            .open_file("f", OpenFlags::write(), 0)
            .await
            .unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(handle.read_at(&mut buf, 2).await.unwrap(), 2);
        assert_eq!(&buf, b"cd");
        // Cursor was not moved by read_at
        assert_eq!(handle.seek(SeekFrom::Current(0)).await.unwrap(), 0);

        handle.write_at(b"XY", 4).await.unwrap();
        handle.close().await.unwrap();
        assert_eq!(fs.read_file("f").await.unwrap(), b"abcdXYgh");
    }

    #[tokio::test]
    async fn handle_append_mode() {
        let fs = MemoryFs::new();
        fs.write_file("log", b"one\n").await.unwrap();

        let mut handle = fs.open_file("log", OpenFlags::append(), 0).await.unwrap();
        handle.write(b"two\n").await.unwrap();
        handle.close().await.unwrap();

        assert_eq!(fs.read_file("log").await.unwrap(), b"one\ntwo\n");
    }

    #[tokio::test]
    async fn handle_closed_rejects_io() {
        let fs = MemoryFs::new();
        let mut handle = fs.create("f").await.unwrap();
        handle.close().await.unwrap();

        let mut buf = [0u8; 1];
        assert!(handle.read(&mut buf).await.is_err());
        assert!(handle.write(b"x").await.is_err());
    }

    #[tokio::test]
    async fn create_truncates_existing() {
        let fs = MemoryFs::new();
        fs.write_file("f", b"previous contents").await.unwrap();

        let mut handle = fs.create("f").await.unwrap();
        handle.write(b"new").await.unwrap();
        handle.close().await.unwrap();

        assert_eq!(fs.read_file("f").await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn exclusive_create_fails_on_existing() {
        let fs = MemoryFs::new();
        fs.write_file("f", b"here").await.unwrap();

        let result = fs
            .open_file("f", OpenFlags::create_exclusive(), 0o644)
            .await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn open_directory_fails() {
        let fs = MemoryFs::new();
        fs.mkdir("dir", 0o755).await.unwrap();
        let result = fs.open("dir").await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::IsADirectory);
    }

    #[tokio::test]
    async fn mkdir_requires_parent() {
        let fs = MemoryFs::new();
        let result = fs.mkdir("a/b", 0o755).await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);

        fs.mkdir_all("a/b", 0o755).await.unwrap();
        assert!(fs.stat("a/b").await.unwrap().is_dir);
    }

    #[tokio::test]
    async fn mkdir_existing_fails_mkdir_all_tolerates() {
        let fs = MemoryFs::new();
        fs.mkdir("dir", 0o755).await.unwrap();

        let result = fs.mkdir("dir", 0o755).await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::AlreadyExists);

        fs.mkdir_all("dir", 0o755).await.unwrap();
    }

    #[tokio::test]
    async fn read_dir_lists_children() {
        let fs = MemoryFs::new();
        fs.write_file("a.txt", b"a").await.unwrap();
        fs.write_file("b.txt", b"bb").await.unwrap();
        fs.mkdir("subdir", 0o755).await.unwrap();
        fs.write_file("subdir/nested.txt", b"deep").await.unwrap();

        let entries = fs.read_dir("").await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[0].entry_type, EntryType::File);
        assert_eq!(entries[0].size, 1);
        assert_eq!(entries[2].name, "subdir");
        assert_eq!(entries[2].entry_type, EntryType::Directory);
    }

    #[tokio::test]
    async fn remove_file_and_empty_dir() {
        let fs = MemoryFs::new();
        fs.write_file("file.txt", b"data").await.unwrap();
        fs.mkdir("emptydir", 0o755).await.unwrap();

        fs.remove("file.txt").await.unwrap();
        fs.remove("emptydir").await.unwrap();

        assert!(!fs.exists("file.txt").await);
        assert!(!fs.exists("emptydir").await);
    }

    #[tokio::test]
    async fn remove_non_empty_directory_fails() {
        let fs = MemoryFs::new();
        fs.write_file("dir/file.txt", b"data").await.unwrap();

        let result = fs.remove("dir").await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::DirectoryNotEmpty);
    }

    #[tokio::test]
    async fn remove_all_takes_subtree() {
        let fs = MemoryFs::new();
        fs.write_file("dir/a.txt", b"a").await.unwrap();
        fs.write_file("dir/sub/b.txt", b"b").await.unwrap();
        fs.write_file("dirty", b"untouched").await.unwrap();

        fs.remove_all("dir").await.unwrap();

        assert!(!fs.exists("dir").await);
        assert!(!fs.exists("dir/a.txt").await);
        assert!(!fs.exists("dir/sub/b.txt").await);
        // Sibling with a shared name prefix survives
        assert!(fs.exists("dirty").await);

        // Removing a missing path is not an error
        fs.remove_all("gone").await.unwrap();
    }

    #[tokio::test]
    async fn rename_file() {
        let fs = MemoryFs::new();
        fs.write_file("old.txt", b"content").await.unwrap();

        fs.rename("old.txt", "new.txt").await.unwrap();

        assert_eq!(fs.read_file("new.txt").await.unwrap(), b"content");
        assert!(!fs.exists("old.txt").await);
    }

    #[tokio::test]
    async fn rename_directory_moves_subtree() {
        let fs = MemoryFs::new();
        fs.write_file("dir/a.txt", b"a").await.unwrap();
        fs.write_file("dir/sub/c.txt", b"c").await.unwrap();

        fs.rename("dir", "renamed").await.unwrap();

        assert!(fs.exists("renamed/a.txt").await);
        assert!(fs.exists("renamed/sub/c.txt").await);
        assert!(!fs.exists("dir").await);
        assert!(!fs.exists("dir/a.txt").await);
        assert_eq!(fs.read_file("renamed/a.txt").await.unwrap(), b"a");
    }

    #[tokio::test]
    async fn rename_not_found() {
        let fs = MemoryFs::new();
        let result = fs.rename("nonexistent", "dest").await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn rename_file_over_directory_fails() {
        let fs = MemoryFs::new();
        fs.write_file("f", b"x").await.unwrap();
        fs.mkdir("d", 0o755).await.unwrap();

        let result = fs.rename("f", "d").await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::IsADirectory);
        // Source is untouched after the failed rename
        assert!(fs.exists("f").await);
    }

    #[tokio::test]
    async fn stat_reports_size_and_kind() {
        let fs = MemoryFs::new();
        fs.write_file("f", b"12345").await.unwrap();
        fs.mkdir("d", 0o700).await.unwrap();

        let meta = fs.stat("f").await.unwrap();
        assert!(meta.is_file);
        assert_eq!(meta.size, 5);
        assert!(meta.modified.is_some());

        let meta = fs.stat("d").await.unwrap();
        assert!(meta.is_dir);
        assert_eq!(meta.mode, 0o700);

        // Root always exists
        assert!(fs.stat("/").await.unwrap().is_dir);
    }

    #[tokio::test]
    async fn chmod_chtimes_chown() {
        let fs = MemoryFs::new();
        fs.write_file("f", b"x").await.unwrap();

        fs.chmod("f", 0o600).await.unwrap();
        assert_eq!(fs.stat("f").await.unwrap().mode, 0o600);

        let epoch = SystemTime::UNIX_EPOCH;
        fs.chtimes("f", epoch, epoch).await.unwrap();
        assert_eq!(fs.stat("f").await.unwrap().modified, Some(epoch));

        fs.chown("f", 1000, 1000).await.unwrap();

        assert_eq!(
            fs.chmod("missing", 0o600).await.unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn truncate_shrinks_and_extends() {
        let fs = MemoryFs::new();
        fs.write_file("f", b"0123456789").await.unwrap();

        fs.truncate("f", 4).await.unwrap();
        assert_eq!(fs.read_file("f").await.unwrap(), b"0123");

        fs.truncate("f", 6).await.unwrap();
        assert_eq!(fs.read_file("f").await.unwrap(), b"0123\0\0");
    }

    #[tokio::test]
    async fn handle_stat_and_seek_end() {
        let fs = MemoryFs::new();
        fs.write_file("f", b"abcdef").await.unwrap();

        let mut handle = fs.open("f").await.unwrap();
        let meta = handle.stat().await.unwrap();
        assert_eq!(meta.size, 6);

        assert_eq!(handle.seek(SeekFrom::End(-2)).await.unwrap(), 4);
        let mut buf = [0u8; 4];
        assert_eq!(handle.read(&mut buf).await.unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
    }
}
