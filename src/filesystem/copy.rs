use super::{FsError, FsResult};
use crate::{Access, Attrs, Filesystem, Identity, Node, NodeBody, NodeId, VfsPath};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, instrument};

/// Detached image of a source subtree, taken before the destination is
/// locked.
struct Plan {
    attrs: Attrs,
    body: PlanBody,
}

enum PlanBody {
    File(Arc<[u8]>),
    Directory(Vec<(String, Plan)>),
}

impl Filesystem {
    /// Duplicates the node at `src` (recursively, for directories) as `dst`.
    ///
    /// Copies keep owner and mode, get fresh timestamps and share nothing
    /// with the originals; the quota for the whole subtree is reserved before
    /// any node is created.
    #[instrument(skip(self))]
    pub fn copy(&self, src: &VfsPath, dst: &VfsPath, who: &Identity) -> FsResult<()> {
        debug!("op: copy()");

        let _gate = self.gate.read();
        let (src_id, src_node) = self.walk(src, who)?;
        let (dst_dir_id, dst_dir, dst_name) = self.walk_parent(dst, who)?;

        if self.is_ancestor(src_id, dst_dir_id, dst)? {
            return Err(FsError::InvalidArgument(format!(
                "cannot copy {} into itself",
                src
            )));
        }

        let mut total = 0;
        let plan = self.plan(&src_node, src, who, &mut total)?;
        let mut entries = Self::entries_of(&dst_dir, dst)?.write();

        self.ensure_alive(dst_dir_id, dst)?;
        Self::check(&dst_dir, who, Access::Write, dst)?;

        if self.nodes.child(&entries, dst_name)?.is_some() {
            return Err(FsError::AlreadyExists(dst.to_string()));
        }

        self.disk.reserve(total)?;

        let now = SystemTime::now();
        let id = self.materialize(dst_name.to_owned(), dst_dir_id, plan, now);

        entries.push(id);
        dst_dir.attrs.write().touch();

        Ok(())
    }

    /// Copies out the subtree of `node`, checking read (and, for
    /// directories, execute) permission on every node on the way.
    ///
    /// Each directory is locked only while its entries are read; a child
    /// removed in the meantime is left out of the copy.
    fn plan(
        &self,
        node: &Node,
        path: &VfsPath,
        who: &Identity,
        total: &mut u64,
    ) -> FsResult<Plan> {
        Self::check(node, who, Access::Read, path)?;

        let body = match &node.body {
            NodeBody::File(content) => {
                let content = content.read().clone();

                *total += content.len() as u64;
                PlanBody::File(content)
            }

            NodeBody::Directory(entries) => {
                Self::check(node, who, Access::Execute, path)?;

                let entries = entries.read().clone();
                let mut children = Vec::with_capacity(entries.len());

                for id in entries {
                    let Ok(child) = self.nodes.get(id) else {
                        continue;
                    };

                    let name = child.name();
                    let child_path = path.join(&name);

                    children.push((name, self.plan(&child, &child_path, who, total)?));
                }

                PlanBody::Directory(children)
            }
        };

        Ok(Plan {
            attrs: node.attrs.read().clone(),
            body,
        })
    }

    /// Puts the copy into the arena, returning the id of its top node; the
    /// caller links that one into the destination directory.
    fn materialize(&self, name: String, parent: NodeId, plan: Plan, now: SystemTime) -> NodeId {
        let attrs = Attrs {
            created_at: now,
            modified_at: now,
            ..plan.attrs
        };

        match plan.body {
            PlanBody::File(content) => self.nodes.insert(Node::file(name, parent, attrs, content)),

            PlanBody::Directory(children) => {
                let dir = Node::directory(name, Some(parent), attrs);
                let entries = dir.entries().cloned();
                let id = self.nodes.insert(dir);

                // nothing can reach the copy yet, so its entries are ours alone
                let child_ids = children
                    .into_iter()
                    .map(|(name, child)| self.materialize(name, id, child, now))
                    .collect();

                if let Some(entries) = entries {
                    *entries.write() = child_ids;
                }

                id
            }
        }
    }
}
