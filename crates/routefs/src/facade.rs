//! The filesystem facade: one surface over many routed backends.
//!
//! Every operation resolves its path through the router, applies the
//! selected route's rewriter, and invokes the single corresponding
//! backend operation. The route lookup happens under the router's
//! reader lock; the backend call happens after it is released. Rename
//! is the one exception to single-backend dispatch: when source and
//! destination resolve to different backends it becomes a
//! copy-then-delete move.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::RwLock;

use crate::backend::{Backend, DirEntry, EntryType, FileHandle, Metadata, OpenFlags};
use crate::errors::{Error, Result};
use crate::paths;
use crate::rewriter::PathRewriter;
use crate::route::Route;
use crate::router::{Router, TableRouter};

/// Buffer size for cross-backend streaming copies.
const COPY_BUF_SIZE: usize = 64 * 1024;

/// A virtual filesystem that routes each operation to one of several
/// backends by path.
///
/// Construct with [`RouteFs::builder`]. The current working directory
/// is per-instance state starting at `/`, changed only by [`chdir`].
///
/// [`chdir`]: RouteFs::chdir
pub struct RouteFs {
    router: Arc<dyn Router>,
    default_backend: Option<Arc<dyn Backend>>,
    current_dir: RwLock<String>,
    temp_dir: String,
    separator: char,
    list_separator: char,
}

impl RouteFs {
    pub fn builder() -> RouteFsBuilder {
        RouteFsBuilder {
            router: None,
            routes: Vec::new(),
            default_backend: None,
            temp_dir: String::from("/tmp"),
        }
    }

    /// The router in use, for inspection or direct route mutation.
    pub fn router(&self) -> Arc<dyn Router> {
        Arc::clone(&self.router)
    }

    /// Register a routing rule on the live facade.
    pub async fn add_route(&self, route: Route) -> Result<()> {
        self.router.add_route(route).await
    }

    /// Remove a routing rule by pattern.
    pub async fn remove_route(&self, pattern: &str) -> Result<()> {
        self.router.remove_route(pattern).await
    }

    /// Resolve the backend and rewriter for a path: the matching route
    /// if any, else the default backend with the identity rewriter.
    async fn backend_for(&self, path: &str) -> Result<(Arc<dyn Backend>, Option<Arc<dyn PathRewriter>>)> {
        match self.router.route_with_info(path, None).await {
            Ok(route) => Ok((Arc::clone(route.backend()), route.rewriter().cloned())),
            Err(Error::NoRoute) => match &self.default_backend {
                Some(backend) => Ok((Arc::clone(backend), None)),
                None => Err(Error::NoRoute),
            },
            Err(other) => Err(other),
        }
    }

    fn apply_rewrite(rewriter: &Option<Arc<dyn PathRewriter>>, path: &str) -> String {
        match rewriter {
            Some(rewriter) => rewriter.rewrite(path),
            None => path.to_string(),
        }
    }

    /// Open an existing file for reading.
    pub async fn open(&self, path: &str) -> Result<Box<dyn FileHandle>> {
        let (backend, rewriter) = self.backend_for(path).await?;
        let target = Self::apply_rewrite(&rewriter, path);
        Ok(backend.open(&target).await?)
    }

    /// Create (or truncate) a file for writing.
    pub async fn create(&self, path: &str) -> Result<Box<dyn FileHandle>> {
        let (backend, rewriter) = self.backend_for(path).await?;
        let target = Self::apply_rewrite(&rewriter, path);
        Ok(backend.create(&target).await?)
    }

    /// Open a file with explicit flags and creation mode.
    pub async fn open_file(
        &self,
        path: &str,
        flags: OpenFlags,
        mode: u32,
    ) -> Result<Box<dyn FileHandle>> {
        let (backend, rewriter) = self.backend_for(path).await?;
        let target = Self::apply_rewrite(&rewriter, path);
        Ok(backend.open_file(&target, flags, mode).await?)
    }

    /// Create a directory.
    pub async fn mkdir(&self, path: &str, mode: u32) -> Result<()> {
        let (backend, rewriter) = self.backend_for(path).await?;
        let target = Self::apply_rewrite(&rewriter, path);
        Ok(backend.mkdir(&target, mode).await?)
    }

    /// Create a directory and any missing parents.
    pub async fn mkdir_all(&self, path: &str, mode: u32) -> Result<()> {
        let (backend, rewriter) = self.backend_for(path).await?;
        let target = Self::apply_rewrite(&rewriter, path);
        Ok(backend.mkdir_all(&target, mode).await?)
    }

    /// Remove a file or empty directory.
    pub async fn remove(&self, path: &str) -> Result<()> {
        let (backend, rewriter) = self.backend_for(path).await?;
        let target = Self::apply_rewrite(&rewriter, path);
        Ok(backend.remove(&target).await?)
    }

    /// Remove a path and all children.
    pub async fn remove_all(&self, path: &str) -> Result<()> {
        let (backend, rewriter) = self.backend_for(path).await?;
        let target = Self::apply_rewrite(&rewriter, path);
        Ok(backend.remove_all(&target).await?)
    }

    /// Metadata for a path.
    pub async fn stat(&self, path: &str) -> Result<Metadata> {
        let (backend, rewriter) = self.backend_for(path).await?;
        let target = Self::apply_rewrite(&rewriter, path);
        Ok(backend.stat(&target).await?)
    }

    /// List entries in a directory.
    pub async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let (backend, rewriter) = self.backend_for(path).await?;
        let target = Self::apply_rewrite(&rewriter, path);
        Ok(backend.read_dir(&target).await?)
    }

    /// Change permission bits.
    pub async fn chmod(&self, path: &str, mode: u32) -> Result<()> {
        let (backend, rewriter) = self.backend_for(path).await?;
        let target = Self::apply_rewrite(&rewriter, path);
        Ok(backend.chmod(&target, mode).await?)
    }

    /// Change access and modification times.
    pub async fn chtimes(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> Result<()> {
        let (backend, rewriter) = self.backend_for(path).await?;
        let target = Self::apply_rewrite(&rewriter, path);
        Ok(backend.chtimes(&target, atime, mtime).await?)
    }

    /// Change owner and group.
    pub async fn chown(&self, path: &str, uid: u32, gid: u32) -> Result<()> {
        let (backend, rewriter) = self.backend_for(path).await?;
        let target = Self::apply_rewrite(&rewriter, path);
        Ok(backend.chown(&target, uid, gid).await?)
    }

    /// Resize a file.
    pub async fn truncate(&self, path: &str, size: u64) -> Result<()> {
        let (backend, rewriter) = self.backend_for(path).await?;
        let target = Self::apply_rewrite(&rewriter, path);
        Ok(backend.truncate(&target, size).await?)
    }

    /// Check if a path exists on its routed backend.
    pub async fn exists(&self, path: &str) -> bool {
        match self.backend_for(path).await {
            Ok((backend, rewriter)) => {
                let target = Self::apply_rewrite(&rewriter, path);
                backend.exists(&target).await
            }
            Err(_) => false,
        }
    }

    /// Rename (move) `oldpath` to `newpath`.
    ///
    /// When both paths resolve to the same backend this is the
    /// backend's native rename. Otherwise the object is copied to the
    /// destination backend and then deleted from the source; a failure
    /// mid-move leaves any partially written destination in place.
    pub async fn rename(&self, oldpath: &str, newpath: &str) -> Result<()> {
        let (old_backend, old_rewriter) = self.backend_for(oldpath).await?;
        let (new_backend, new_rewriter) = self.backend_for(newpath).await?;

        let old_target = Self::apply_rewrite(&old_rewriter, oldpath);
        let new_target = Self::apply_rewrite(&new_rewriter, newpath);

        if Arc::ptr_eq(&old_backend, &new_backend) {
            return Ok(old_backend.rename(&old_target, &new_target).await?);
        }

        tracing::debug!("cross-backend move: {} -> {}", old_target, new_target);
        let info = old_backend.stat(&old_target).await?;
        if info.is_dir {
            copy_tree(&old_backend, &new_backend, &old_target, &new_target, info.mode).await?;
            old_backend.remove_all(&old_target).await?;
        } else {
            copy_file(&old_backend, &new_backend, &old_target, &new_target).await?;
            old_backend.remove(&old_target).await?;
        }
        Ok(())
    }

    /// Change the current working directory. Relative inputs are joined
    /// against the current value; the router is not consulted.
    pub async fn chdir(&self, dir: &str) -> Result<()> {
        let mut current = self.current_dir.write().await;
        *current = if dir.starts_with('/') {
            paths::clean(dir)
        } else {
            paths::join(&current, dir)
        };
        Ok(())
    }

    /// The current working directory.
    pub async fn getwd(&self) -> String {
        self.current_dir.read().await.clone()
    }

    /// The configured temporary directory.
    pub fn temp_dir(&self) -> &str {
        &self.temp_dir
    }

    /// The path separator.
    pub fn separator(&self) -> char {
        self.separator
    }

    /// The path-list separator.
    pub fn list_separator(&self) -> char {
        self.list_separator
    }
}

/// Stream one regular file across backends with a bounded buffer.
///
/// Both handles are released on every exit path; a copy error takes
/// precedence over close errors.
async fn copy_file(
    src_backend: &Arc<dyn Backend>,
    dst_backend: &Arc<dyn Backend>,
    src_path: &str,
    dst_path: &str,
) -> Result<()> {
    let mut src = src_backend.open(src_path).await?;
    let mut dst = match dst_backend.create(dst_path).await {
        Ok(handle) => handle,
        Err(err) => {
            let _ = src.close().await;
            return Err(err.into());
        }
    };

    let copied = stream_copy(src.as_mut(), dst.as_mut()).await;
    let src_closed = src.close().await;
    let dst_closed = dst.close().await;

    copied?;
    src_closed?;
    dst_closed?;
    Ok(())
}

async fn stream_copy(src: &mut dyn FileHandle, dst: &mut dyn FileHandle) -> io::Result<()> {
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    loop {
        let n = src.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        let mut written = 0;
        while written < n {
            let w = dst.write(&buf[written..n]).await?;
            if w == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "backend wrote zero bytes",
                ));
            }
            written += w;
        }
    }
}

/// Depth-first copy of a directory tree across backends. Destination
/// directories are created (with the source's mode) before their
/// children are copied. The source tree is left in place; the caller
/// removes it after the whole copy succeeds.
fn copy_tree<'a>(
    src_backend: &'a Arc<dyn Backend>,
    dst_backend: &'a Arc<dyn Backend>,
    src_path: &'a str,
    dst_path: &'a str,
    mode: u32,
) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        dst_backend.mkdir_all(dst_path, mode).await?;

        for entry in src_backend.read_dir(src_path).await? {
            let src_child = join_child(src_path, &entry.name);
            let dst_child = join_child(dst_path, &entry.name);
            match entry.entry_type {
                EntryType::Directory => {
                    let info = src_backend.stat(&src_child).await?;
                    copy_tree(src_backend, dst_backend, &src_child, &dst_child, info.mode)
                        .await?;
                }
                EntryType::File => {
                    tracing::trace!("copying {} -> {}", src_child, dst_child);
                    copy_file(src_backend, dst_backend, &src_child, &dst_child).await?;
                }
            }
        }
        Ok(())
    })
}

fn join_child(parent: &str, name: &str) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), name)
}

/// Builder for [`RouteFs`].
pub struct RouteFsBuilder {
    router: Option<Arc<dyn Router>>,
    routes: Vec<Route>,
    default_backend: Option<Arc<dyn Backend>>,
    temp_dir: String,
}

impl RouteFsBuilder {
    /// Queue a routing rule; registered in order at build time, so
    /// insertion order stays the priority tie-break.
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Backend used when no route matches.
    pub fn default_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.default_backend = Some(backend);
        self
    }

    /// Temporary directory reported by [`RouteFs::temp_dir`].
    pub fn temp_dir(mut self, dir: impl Into<String>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Install a custom router instead of the default table router.
    pub fn router(mut self, router: Arc<dyn Router>) -> Self {
        self.router = Some(router);
        self
    }

    /// Build the facade, registering queued routes. Pattern and
    /// duplicate validation errors surface here.
    pub async fn build(self) -> Result<RouteFs> {
        let router = self
            .router
            .unwrap_or_else(|| Arc::new(TableRouter::new()) as Arc<dyn Router>);

        for route in self.routes {
            router.add_route(route).await?;
        }

        Ok(RouteFs {
            router,
            default_backend: self.default_backend,
            current_dir: RwLock::new(String::from("/")),
            temp_dir: self.temp_dir,
            separator: '/',
            list_separator: ':',
        })
    }
}
