//! Depth-first traversal with a stable sibling order.
//!
//! The walk is expressed as a list of [`Partition`]s: the root's children,
//! sorted by file name, each either a single entry ([`Partition::Leaf`]) or a
//! real directory whose whole subtree is walked with
//! [`ignore::WalkBuilder`] ([`Partition::Subtree`]). Walking the partitions
//! one after the other visits exactly the entries of a single depth-first
//! walk of the root, in the same order, which is what lets the scheduler hand
//! partitions to different threads and still concatenate their output.
//!
//! Symlinks are never followed below the root. A partition never has a
//! symlink as its own root either: `ignore` (through `walkdir`) follows a
//! symlinked walk root, so those are always turned into leaves here.
use ignore::WalkBuilder;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use super::policy::ErrorPolicy;
use crate::errors::{SearchError, SearchResult};
use crate::results::PathType;

/// Rounds of directory splitting before giving up on reaching the target
const MAX_SPLIT_ROUNDS: usize = 3;

/// One classified entry produced by the walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub path_type: PathType,
}

impl WalkEntry {
    pub fn new(path: PathBuf, path_type: PathType) -> Self {
        Self { path, path_type }
    }

    /// The base name used for name matching. Falls back to the whole path
    /// for paths without a final component (such as `..`).
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(OsStr::to_str)
            .or_else(|| self.path.to_str())
            .unwrap_or_default()
    }

    /// A regular file, or a symlink whose target is one
    pub fn is_scannable(&self) -> bool {
        match self.path_type {
            PathType::File => true,
            PathType::Symlink => fs::metadata(&self.path).is_ok_and(|m| m.is_file()),
            PathType::Directory | PathType::Other => false,
        }
    }
}

/// An independent unit of traversal work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Partition {
    /// An entry with nothing to descend into (or not to be descended into)
    Leaf(WalkEntry),
    /// A directory; the directory itself comes first, then its subtree
    Subtree(PathBuf),
}

#[derive(Debug, Clone, Copy)]
pub struct Walker {
    ignore_hidden: bool,
    only_files: bool,
}

impl Walker {
    pub fn new(ignore_hidden: bool, only_files: bool) -> Self {
        Self {
            ignore_hidden,
            only_files,
        }
    }

    /// Splits the traversal of `root` into ordered partitions.
    ///
    /// A root that cannot be stat'ed or listed is fatal. A root that is not a
    /// directory becomes a single leaf. A symlinked root is resolved.
    pub fn partitions(&self, root: &Path, policy: &ErrorPolicy) -> SearchResult<Vec<Partition>> {
        let metadata = match fs::metadata(root) {
            Ok(metadata) => metadata,
            // a dangling symlink is still a walkable single entry
            Err(err) => match fs::symlink_metadata(root) {
                Ok(metadata) => metadata,
                Err(_) => return Err(SearchError::root_inaccessible(root, err)),
            },
        };

        if !metadata.is_dir() {
            debug!("Root {} is not a directory", root.display());
            let entry = WalkEntry::new(
                root.to_path_buf(),
                PathType::from_file_type(metadata.file_type()),
            );
            return Ok(vec![Partition::Leaf(entry)]);
        }

        let partitions = self
            .list_children(root, policy)
            .map_err(|e| SearchError::root_inaccessible(root, e))?;
        debug!(
            "Root {} split into {} partitions",
            root.display(),
            partitions.len()
        );
        Ok(partitions)
    }

    /// Replaces subtree partitions by their directory entry plus their
    /// children until there are at least `target` partitions.
    ///
    /// The resulting list visits the same entries in the same order.
    pub fn split(
        &self,
        mut partitions: Vec<Partition>,
        target: usize,
        policy: &ErrorPolicy,
    ) -> Vec<Partition> {
        for _ in 0..MAX_SPLIT_ROUNDS {
            if partitions.len() >= target
                || !partitions.iter().any(|p| matches!(p, Partition::Subtree(_)))
            {
                break;
            }
            let mut next = Vec::with_capacity(partitions.len() * 2);
            for partition in partitions {
                match partition {
                    Partition::Subtree(dir) => match self.list_children(&dir, policy) {
                        Ok(children) => {
                            next.push(Partition::Leaf(WalkEntry::new(dir, PathType::Directory)));
                            next.extend(children);
                        }
                        // left for the subtree walk to report
                        Err(_) => next.push(Partition::Subtree(dir)),
                    },
                    leaf => next.push(leaf),
                }
            }
            partitions = next;
        }
        debug!("Walk split into {} partitions", partitions.len());
        partitions
    }

    /// Lists the direct children of `dir` as partitions, sorted by name
    fn list_children(&self, dir: &Path, policy: &ErrorPolicy) -> io::Result<Vec<Partition>> {
        let mut children = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    policy.absorb(dir, SearchError::from_io(dir, err));
                    continue;
                }
            };
            let name = entry.file_name();
            if self.ignore_hidden && is_hidden(&name) {
                trace!("Skipping hidden entry: {}", entry.path().display());
                continue;
            }
            let path = entry.path();
            match entry.file_type() {
                Ok(file_type) => {
                    let partition = match PathType::from_file_type(file_type) {
                        PathType::Directory => Partition::Subtree(path),
                        path_type => Partition::Leaf(WalkEntry::new(path, path_type)),
                    };
                    children.push((name, partition));
                }
                Err(err) => policy.absorb(&path, SearchError::from_io(&path, err)),
            }
        }
        children.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(children.into_iter().map(|(_, p)| p).collect())
    }

    /// Walks one partition, calling `visit` for every entry that should be
    /// evaluated, in depth-first order.
    pub fn walk_partition<F>(&self, partition: &Partition, policy: &ErrorPolicy, mut visit: F)
    where
        F: FnMut(WalkEntry),
    {
        match partition {
            Partition::Leaf(entry) => self.emit(entry.clone(), policy, &mut visit),
            Partition::Subtree(dir) => self.walk_subtree(dir, policy, &mut visit),
        }
    }

    fn walk_subtree<F>(&self, dir: &Path, policy: &ErrorPolicy, visit: &mut F)
    where
        F: FnMut(WalkEntry),
    {
        let mut builder = WalkBuilder::new(dir);
        builder
            .standard_filters(false)
            .hidden(self.ignore_hidden)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b));

        // A directory is only emitted once its listing is known to have
        // opened: an unreadable directory shows up as an error right after
        // its own entry.
        let mut pending_dir: Option<WalkEntry> = None;

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    if let Some(dir_entry) = pending_dir.take() {
                        self.emit(dir_entry, policy, visit);
                    }
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    let walk_entry =
                        WalkEntry::new(entry.into_path(), PathType::from_file_type(file_type));
                    if walk_entry.path_type == PathType::Directory {
                        pending_dir = Some(walk_entry);
                    } else {
                        self.emit(walk_entry, policy, visit);
                    }
                }
                Err(err) => {
                    let err_path = error_path(&err).map(Path::to_path_buf);
                    if failed_listing(pending_dir.as_ref(), err_path.as_deref()) {
                        pending_dir = None;
                    }
                    let path = err_path.unwrap_or_else(|| dir.to_path_buf());
                    policy.absorb(&path, into_search_error(err, &path));
                }
            }
        }

        if let Some(dir_entry) = pending_dir {
            self.emit(dir_entry, policy, visit);
        }
    }

    fn emit<F>(&self, entry: WalkEntry, policy: &ErrorPolicy, visit: &mut F)
    where
        F: FnMut(WalkEntry),
    {
        if self.only_files && entry.path_type == PathType::Directory {
            return;
        }
        if entry.path.to_str().is_none() {
            let err = SearchError::encoding_error(&entry.path);
            policy.absorb(&entry.path, err);
            return;
        }
        visit(entry);
    }
}

/// Dot-prefixed names are hidden
fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// True if an error about `err_path` means the pending directory could not
/// be listed. Errors without a path never discard it.
fn failed_listing(pending: Option<&WalkEntry>, err_path: Option<&Path>) -> bool {
    match (pending, err_path) {
        (Some(dir), Some(path)) => dir.path == path,
        _ => false,
    }
}

/// The path an `ignore` error is about, if it carries one
fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Loop { child, .. } => Some(child.as_path()),
        _ => None,
    }
}

fn into_search_error(err: ignore::Error, path: &Path) -> SearchError {
    let message = err.to_string();
    match err.into_io_error() {
        Some(io_err) => SearchError::from_io(path, io_err),
        None => SearchError::IoError(io::Error::new(io::ErrorKind::Other, message)),
    }
}
