use crate::{Identity, Mode, NodeId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// A file or a directory.
///
/// Every part that can change has its own lock. When more than one is held,
/// they're taken in this order:
///
/// 1. directory entries (an ancestor's before a descendant's),
/// 2. `link`,
/// 3. `attrs`,
/// 4. file content.
#[derive(Debug)]
pub struct Node {
    pub link: RwLock<Link>,
    pub body: NodeBody,
    pub attrs: RwLock<Attrs>,
}

/// Where a node hangs in the tree; `parent` is `None` only for the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub name: String,
    pub parent: Option<NodeId>,
}

#[derive(Debug)]
pub enum NodeBody {
    File(RwLock<Arc<[u8]>>),

    /// Children in insertion order.
    Directory(Arc<RwLock<Vec<NodeId>>>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Directory,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attrs {
    pub uid: u32,
    pub gid: u32,
    pub mode: Mode,
    pub size: u64,
    pub created_at: SystemTime,
    pub modified_at: SystemTime,
}

impl Attrs {
    pub fn new(owner: &Identity, mode: Mode) -> Self {
        let now = SystemTime::now();

        Self {
            uid: owner.uid,
            gid: owner.gid,
            mode,
            size: 0,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.modified_at = SystemTime::now();
    }
}

impl Node {
    pub fn file(name: String, parent: NodeId, attrs: Attrs, content: Arc<[u8]>) -> Self {
        Self {
            link: RwLock::new(Link {
                name,
                parent: Some(parent),
            }),
            body: NodeBody::File(RwLock::new(content)),
            attrs: RwLock::new(attrs),
        }
    }

    pub fn directory(name: String, parent: Option<NodeId>, attrs: Attrs) -> Self {
        Self {
            link: RwLock::new(Link { name, parent }),
            body: NodeBody::Directory(Default::default()),
            attrs: RwLock::new(attrs),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self.body {
            NodeBody::File(_) => NodeKind::File,
            NodeBody::Directory(_) => NodeKind::Directory,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.body, NodeBody::Directory(_))
    }

    pub fn entries(&self) -> Option<&Arc<RwLock<Vec<NodeId>>>> {
        match &self.body {
            NodeBody::Directory(entries) => Some(entries),
            NodeBody::File(_) => None,
        }
    }

    /// Copy of the current children; empty for files.
    pub fn children(&self) -> Vec<NodeId> {
        self.entries()
            .map(|entries| entries.read().clone())
            .unwrap_or_default()
    }

    pub fn name(&self) -> String {
        self.link.read().name.clone()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.link.read().parent
    }
}

/// Point-in-time view of a node, handed out instead of live references.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stat {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub uid: u32,
    pub gid: u32,
    pub mode: Mode,
    pub size: u64,
    pub children: usize,
    pub created_at: SystemTime,
    pub modified_at: SystemTime,
}

impl Stat {
    pub fn new(id: NodeId, node: &Node) -> Self {
        let children = node.entries().map_or(0, |entries| entries.read().len());
        let name = node.name();
        let attrs = node.attrs.read();

        Self {
            id,
            name,
            kind: node.kind(),
            uid: attrs.uid,
            gid: attrs.gid,
            mode: attrs.mode,
            size: attrs.size,
            children,
            created_at: attrs.created_at,
            modified_at: attrs.modified_at,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}
