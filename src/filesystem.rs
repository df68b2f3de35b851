mod copy;
mod find;
mod list;
mod lookup;
mod mk;
mod read;
mod rename;
mod result;
mod rm;
mod setattr;
mod write;

pub use self::find::*;
pub use self::list::*;
pub use self::result::*;
use crate::{permission, Access, Attrs, CacheStats, DiskManager, FsConfig, Identity, Mode};
use crate::{Node, NodeId, Nodes, VfsPath};
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use std::sync::Arc;
use tracing::{info, instrument};

/// The namespace: one tree of nodes plus the disk manager accounting for
/// their content.
///
/// Callers share it by reference (typically through an `Arc`); every
/// operation takes the caller's effective [`Identity`].
///
/// There's no lock over the whole tree. An operation locks the entries of
/// the directories it changes plus the attributes or content of the node it
/// touches, so mutations of disjoint subtrees run in parallel and readers
/// only ever wait for the one directory or file they look at.
#[derive(Debug)]
pub struct Filesystem {
    nodes: Nodes,
    disk: DiskManager,

    /// Shared by every mutation, taken exclusively by [`Self::freeze`].
    gate: RwLock<()>,

    /// Serializes renames across directories and recursive removals, so that
    /// ancestry can't change between checking it and relinking, and two
    /// unrelated directories are only ever locked together by one thread.
    renames: Mutex<()>,
}

impl Filesystem {
    /// Bootstraps a fresh namespace: the root plus the configured top-level
    /// directories, all owned by root.
    #[instrument(skip(config))]
    pub fn new(config: &FsConfig) -> Self {
        info!("bootstrapping namespace");

        let root = Identity::root();
        let nodes = Nodes::new(Attrs::new(&root, Mode::DIR_DEFAULT));

        for (name, mode) in &config.top_level_dirs {
            // Unwrap-safety: the root exists and is a directory
            nodes
                .alloc(Node::directory(
                    name.clone(),
                    Some(NodeId::ROOT),
                    Attrs::new(&root, *mode),
                ))
                .unwrap();
        }

        Self::from_parts(nodes, DiskManager::new(config.capacity, config.cache_entries))
    }

    pub(crate) fn from_parts(nodes: Nodes, disk: DiskManager) -> Self {
        Self {
            nodes,
            disk,
            gate: RwLock::new(()),
            renames: Mutex::new(()),
        }
    }

    pub(crate) fn nodes(&self) -> &Nodes {
        &self.nodes
    }

    /// Waits for in-flight mutations and holds off new ones for as long as
    /// the guard lives; reads carry on.
    pub(crate) fn freeze(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write()
    }

    /// Returns `(used, capacity)` in bytes.
    pub fn usage(&self) -> (u64, u64) {
        (self.disk.used(), self.disk.capacity())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.disk.cache_stats()
    }

    /// Walks `path` from the root, requiring execute permission on every
    /// directory passed through.
    ///
    /// Only one directory's entries are locked at a time.
    fn walk(&self, path: &VfsPath, who: &Identity) -> FsResult<(NodeId, Arc<Node>)> {
        let mut id = NodeId::ROOT;
        let mut node = self.nodes.get(id)?;

        for name in path.segments() {
            let entries = Self::entries_of(&node, path)?;

            Self::check(&node, who, Access::Execute, path)?;

            id = self
                .nodes
                .child(&entries.read(), name)?
                .ok_or_else(|| FsError::NotFound(path.to_string()))?;

            // removed since we've seen it in the entries
            node = self
                .nodes
                .get(id)
                .map_err(|_| FsError::NotFound(path.to_string()))?;
        }

        Ok((id, node))
    }

    /// Resolves the directory that would contain `path`, returning it along
    /// with the final segment.
    ///
    /// The root has no parent: creating it again is `AlreadyExists`.
    fn walk_parent<'p>(
        &self,
        path: &'p VfsPath,
        who: &Identity,
    ) -> FsResult<(NodeId, Arc<Node>, &'p str)> {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return Err(FsError::AlreadyExists(path.to_string()));
        };

        let (parent_id, parent_node) = self.walk(&parent, who)?;

        Self::entries_of(&parent_node, path)?;
        Self::check(&parent_node, who, Access::Execute, path)?;

        Ok((parent_id, parent_node, name))
    }

    fn entries_of<'n>(
        node: &'n Node,
        path: &VfsPath,
    ) -> FsResult<&'n Arc<RwLock<Vec<NodeId>>>> {
        node.entries()
            .ok_or_else(|| FsError::NotADirectory(path.to_string()))
    }

    /// Fails when `id` got removed after the caller resolved it; checked
    /// under the lock the removal also takes.
    fn ensure_alive(&self, id: NodeId, path: &VfsPath) -> FsResult<()> {
        if self.nodes.contains(id) {
            Ok(())
        } else {
            Err(FsError::NotFound(path.to_string()))
        }
    }

    /// Like [`crate::Nodes::is_ancestor`], but a node removed halfway
    /// through means the path is gone.
    fn is_ancestor(&self, ancestor: NodeId, id: NodeId, path: &VfsPath) -> FsResult<bool> {
        self.nodes
            .is_ancestor(ancestor, id)
            .map_err(|_| FsError::NotFound(path.to_string()))
    }

    fn check(node: &Node, who: &Identity, access: Access, path: &VfsPath) -> FsResult<()> {
        if permission::can(&node.attrs.read(), who, access) {
            Ok(())
        } else {
            Err(FsError::PermissionDenied(path.to_string()))
        }
    }

    /// Extra check when taking `child` out of `parent` (remove, rename).
    fn check_unlink(parent: &Node, child: &Node, who: &Identity, path: &VfsPath) -> FsResult<()> {
        Self::check(parent, who, Access::Write, path)?;

        if permission::can_unlink(&parent.attrs.read(), &child.attrs.read(), who) {
            Ok(())
        } else {
            Err(FsError::PermissionDenied(path.to_string()))
        }
    }
}
