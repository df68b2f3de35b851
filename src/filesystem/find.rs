use super::FsResult;
use crate::{permission, Access, Filesystem, Identity, NodeId, NodeKind, VfsPath};
use tracing::{debug, instrument, trace};

/// What `find` matches on; an empty predicate matches everything.
#[derive(Clone, Debug, Default)]
pub struct FindPredicate {
    /// Glob over the node's name, supporting `*` and `?`.
    pub name: Option<String>,
    pub kind: Option<NodeKind>,
}

impl FindPredicate {
    pub fn name(mut self, pattern: impl Into<String>) -> Self {
        self.name = Some(pattern.into());
        self
    }

    pub fn kind(mut self, kind: NodeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    fn matches(&self, name: &str, kind: NodeKind) -> bool {
        self.kind.map_or(true, |k| k == kind)
            && self
                .name
                .as_deref()
                .map_or(true, |pattern| glob_match(pattern, name))
    }
}

/// Depth-first walk over a subtree, yielding matching paths.
///
/// The walk is lazy: every step locks only the one node it looks at, so
/// nodes removed mid-walk are simply skipped. Directories the caller may not
/// read or enter are not descended into.
#[derive(Debug)]
pub struct Find<'a> {
    fs: &'a Filesystem,
    who: Identity,
    predicate: FindPredicate,
    pending: Vec<(NodeId, VfsPath)>,
}

impl Filesystem {
    #[instrument(skip(self))]
    pub fn find(
        &self,
        root: &VfsPath,
        predicate: FindPredicate,
        who: &Identity,
    ) -> FsResult<Find<'_>> {
        debug!("op: find()");

        let (id, _) = self.walk(root, who)?;

        Ok(Find {
            fs: self,
            who: who.clone(),
            predicate,
            pending: vec![(id, root.clone())],
        })
    }
}

impl Iterator for Find<'_> {
    type Item = VfsPath;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((id, path)) = self.pending.pop() {
            let Ok(node) = self.fs.nodes().get(id) else {
                trace!(?id, "vanished during find");
                continue;
            };

            if node.is_dir() {
                let searchable = {
                    let attrs = node.attrs.read();

                    permission::can(&attrs, &self.who, Access::Read)
                        && permission::can(&attrs, &self.who, Access::Execute)
                };

                if searchable {
                    for child in node.children().into_iter().rev() {
                        if let Ok(child_node) = self.fs.nodes().get(child) {
                            self.pending.push((child, path.join(&child_node.name())));
                        }
                    }
                }
            }

            let name = path.file_name().unwrap_or("/");

            if self.predicate.matches(name, node.kind()) {
                return Some(path);
            }
        }

        None
    }
}

/// Shell-style wildcard match: `*` is any run of characters, `?` exactly
/// one.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    let (mut p, mut n) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, n));
                p += 1;
            }

            Some(&c) if c == '?' || c == name[n] => {
                p += 1;
                n += 1;
            }

            _ => match backtrack {
                Some((star_p, star_n)) => {
                    p = star_p + 1;
                    n = star_n + 1;
                    backtrack = Some((star_p, star_n + 1));
                }

                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
