use crate::{Attrs, Node, NodeId, VfsPath};
use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{instrument, trace};

/// Arena owning every node of the tree.
///
/// Parents refer to children (and children to parents) through [`NodeId`]s
/// only; a node's path is always derived by walking `parent` links.
///
/// The map itself is locked only for the duration of a single insert, remove
/// or lookup, and never while waiting on a node's lock. A node is alive for
/// as long as it's in the map.
#[derive(Debug)]
pub struct Nodes {
    nodes: RwLock<HashMap<NodeId, Arc<Node>>>,
    next_id: AtomicU64,
}

impl Nodes {
    pub fn new(root: Attrs) -> Self {
        let nodes = HashMap::from_iter([(
            NodeId::ROOT,
            Arc::new(Node::directory(String::new(), None, root)),
        )]);

        Self {
            nodes: RwLock::new(nodes),
            next_id: AtomicU64::new(2),
        }
    }

    pub fn get(&self, id: NodeId) -> Result<Arc<Node>> {
        self.nodes
            .read()
            .get(&id)
            .cloned()
            .with_context(|| format!("{:?} is dead", id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// Finds the child called `name` among `entries`, which the caller reads
    /// under the parent's entries lock.
    pub fn child(&self, entries: &[NodeId], name: &str) -> Result<Option<NodeId>> {
        for &id in entries {
            if self.get(id)?.link.read().name == name {
                return Ok(Some(id));
            }
        }

        Ok(None)
    }

    /// Adds `node` to the arena without linking it anywhere; the caller
    /// pushes the returned id into the parent's entries.
    pub fn insert(&self, node: Node) -> NodeId {
        let id = NodeId::new(self.next_id.fetch_add(1, Ordering::Relaxed));

        self.nodes.write().insert(id, Arc::new(node));
        trace!("inserted node {:?}", id);

        id
    }

    /// Inserts `node` as the last child of its parent.
    #[instrument(skip(self, node))]
    pub fn alloc(&self, node: Node) -> Result<NodeId> {
        let parent_id = node.parent().context("tried to alloc a second root")?;
        let parent = self.get(parent_id)?;

        let entries = parent
            .entries()
            .with_context(|| format!("{:?} is not a directory", parent_id))?;

        let mut entries = entries.write();
        let id = self.insert(node);

        entries.push(id);

        Ok(id)
    }

    /// Drops `id` from the arena; unlinking it from its parent is up to the
    /// caller.
    pub fn remove(&self, id: NodeId) -> Option<Arc<Node>> {
        trace!("removing node {:?}", id);

        self.nodes.write().remove(&id)
    }

    /// Reconstructs the path of `id` by walking up to the root.
    pub fn path_of(&self, mut id: NodeId) -> Result<VfsPath> {
        let mut names = Vec::new();

        loop {
            let link = self.get(id)?.link.read().clone();

            match link.parent {
                Some(parent) => {
                    names.push(link.name);
                    id = parent;
                }

                None => break,
            }
        }

        Ok(names
            .iter()
            .rev()
            .fold(VfsPath::root(), |path, name| path.join(name)))
    }

    /// Whether `ancestor` is `id` itself or one of its ancestors.
    pub fn is_ancestor(&self, ancestor: NodeId, mut id: NodeId) -> Result<bool> {
        loop {
            if id == ancestor {
                return Ok(true);
            }

            match self.get(id)?.parent() {
                Some(parent) => id = parent,
                None => return Ok(false),
            }
        }
    }
}
