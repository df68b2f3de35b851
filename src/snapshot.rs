use crate::{Attrs, DiskManager, Filesystem, FsConfig, Mode, Node, NodeBody, NodeId, Nodes, VfsPath};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{info, instrument};

/// Serializable image of the whole namespace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,

    /// Fixed when the namespace is created; survives every restart.
    pub capacity: u64,

    pub root: SnapshotNode,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub mode: Mode,
    pub created_at: SystemTime,
    pub modified_at: SystemTime,
    pub body: SnapshotBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SnapshotBody {
    File { content: Vec<u8> },
    Directory { children: Vec<SnapshotNode> },
}

impl Snapshot {
    pub const VERSION: u32 = 2;
}

impl SnapshotNode {
    fn attrs(&self) -> Attrs {
        Attrs {
            uid: self.uid,
            gid: self.gid,
            mode: self.mode,
            size: match &self.body {
                SnapshotBody::File { content } => content.len() as u64,
                SnapshotBody::Directory { .. } => 0,
            },
            created_at: self.created_at,
            modified_at: self.modified_at,
        }
    }
}

impl Filesystem {
    /// Captures the current tree.
    ///
    /// Mutations are held off for the duration, so the image is consistent;
    /// readers carry on.
    #[instrument(skip(self))]
    pub fn snapshot(&self) -> Result<Snapshot> {
        let _frozen = self.freeze();

        Ok(Snapshot {
            version: Snapshot::VERSION,
            capacity: self.usage().1,
            root: Self::snapshot_node(self.nodes(), NodeId::ROOT)?,
        })
    }

    fn snapshot_node(nodes: &Nodes, id: NodeId) -> Result<SnapshotNode> {
        let node = nodes.get(id)?;
        let attrs = node.attrs.read().clone();

        let body = match &node.body {
            NodeBody::File(content) => SnapshotBody::File {
                content: content.read().to_vec(),
            },

            NodeBody::Directory(_) => SnapshotBody::Directory {
                children: node
                    .children()
                    .into_iter()
                    .map(|child| Self::snapshot_node(nodes, child))
                    .collect::<Result<_>>()?,
            },
        };

        Ok(SnapshotNode {
            name: node.name(),
            uid: attrs.uid,
            gid: attrs.gid,
            mode: attrs.mode,
            created_at: attrs.created_at,
            modified_at: attrs.modified_at,
            body,
        })
    }

    /// Rebuilds a namespace from `snapshot`.
    ///
    /// The capacity comes from the snapshot itself; only the cache size is
    /// taken from `config`. Fails on unknown versions, non-directory roots,
    /// duplicate or invalid names and on content that doesn't fit the
    /// recorded capacity.
    #[instrument(skip(config, snapshot))]
    pub fn restore(config: &FsConfig, snapshot: &Snapshot) -> Result<Self> {
        if snapshot.version != Snapshot::VERSION {
            bail!("unsupported snapshot version: {}", snapshot.version);
        }

        let SnapshotBody::Directory { children } = &snapshot.root.body else {
            bail!("snapshot root is not a directory");
        };

        let nodes = Nodes::new(snapshot.root.attrs());
        let mut used = 0u64;
        let mut pending: Vec<(NodeId, &SnapshotNode)> =
            children.iter().rev().map(|chd| (NodeId::ROOT, chd)).collect();

        while let Some((parent, snap)) = pending.pop() {
            VfsPath::check_name(&snap.name).context("invalid name in snapshot")?;

            if nodes.child(&nodes.get(parent)?.children(), &snap.name)?.is_some() {
                bail!("duplicate name in snapshot: {:?}", snap.name);
            }

            let node = match &snap.body {
                SnapshotBody::File { content } => {
                    used += content.len() as u64;

                    Node::file(
                        snap.name.clone(),
                        parent,
                        snap.attrs(),
                        Arc::from(content.as_slice()),
                    )
                }

                SnapshotBody::Directory { .. } => {
                    Node::directory(snap.name.clone(), Some(parent), snap.attrs())
                }
            };

            let id = nodes.alloc(node)?;

            if let SnapshotBody::Directory { children } = &snap.body {
                pending.extend(children.iter().rev().map(|chd| (id, chd)));
            }
        }

        let disk = DiskManager::new(snapshot.capacity, config.cache_entries);

        disk.reserve(used).with_context(|| {
            format!(
                "snapshot holds {} bytes over a capacity of {}",
                used, snapshot.capacity
            )
        })?;

        info!(nodes = nodes.len(), used, "restored snapshot");

        Ok(Self::from_parts(nodes, disk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::tests::*;

    #[test]
    fn restore_reproduces_tree_and_usage() {
        let fs = fs();

        fs.mkdir(&path("/home/alice/docs"), Mode::new(0o750), &alice())
            .unwrap();
        fs.touch(&path("/home/alice/docs/a"), Mode::new(0o600), &alice())
            .unwrap();
        fs.write(&path("/home/alice/docs/a"), b"alpha", &alice())
            .unwrap();

        let snapshot = fs.snapshot().unwrap();
        let restored = Filesystem::restore(&FsConfig::default(), &snapshot).unwrap();

        assert_eq!(snapshot.capacity, FsConfig::DEFAULT_CAPACITY);
        assert_eq!(restored.snapshot().unwrap(), snapshot);
        assert_eq!(restored.usage(), fs.usage());
        assert_eq!(
            restored.read(&path("/home/alice/docs/a"), &alice()).unwrap(),
            b"alpha"
        );
    }

    #[test]
    fn restore_rejects_content_over_capacity() {
        let fs = fs();

        fs.touch(&path("/home/alice/big"), Mode::FILE_DEFAULT, &alice())
            .unwrap();
        fs.write(&path("/home/alice/big"), &[0; 64], &alice())
            .unwrap();

        let mut snapshot = fs.snapshot().unwrap();
        snapshot.capacity = 32;

        assert!(Filesystem::restore(&FsConfig::default(), &snapshot).is_err());
    }

    #[test]
    fn restore_keeps_recorded_capacity() {
        let fs = fs_with_capacity(4096);
        let snapshot = fs.snapshot().unwrap();

        let config = FsConfig::default().with_capacity(16);
        let restored = Filesystem::restore(&config, &snapshot).unwrap();

        assert_eq!(restored.usage(), (0, 4096));
    }

    #[test]
    fn restore_rejects_names_lookup_would_reject() {
        let long = "x".repeat(VfsPath::NAME_MAX + 1);

        for name in ["a\0b", long.as_str(), "..", "a/b"] {
            let mut snapshot = fs().snapshot().unwrap();

            if let SnapshotBody::Directory { children } = &mut snapshot.root.body {
                children[0].name = name.to_owned();
            }

            assert!(
                Filesystem::restore(&FsConfig::default(), &snapshot).is_err(),
                "name: {name:?}"
            );
        }
    }

    #[test]
    fn restore_rejects_duplicate_names() {
        let mut snapshot = fs().snapshot().unwrap();

        if let SnapshotBody::Directory { children } = &mut snapshot.root.body {
            let dup = children[0].clone();
            children.push(dup);
        }

        assert!(Filesystem::restore(&FsConfig::default(), &snapshot).is_err());
    }

    #[test]
    fn restore_rejects_unknown_version() {
        let mut snapshot = fs().snapshot().unwrap();
        snapshot.version = 99;

        assert!(Filesystem::restore(&FsConfig::default(), &snapshot).is_err());
    }
}
