//! Copy-on-write node trees shared between revisions.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{Checksum, Depth, NodeKind, PropertyList};

/// Property marking a file as a special node (a symlink).
pub(crate) const SPECIAL_PROP: &str = "svn:special";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct DirNode {
    pub props: PropertyList,
    pub entries: BTreeMap<String, Node>,
    pub created_rev: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct FileNode {
    pub props: PropertyList,
    pub contents: Vec<u8>,
    pub md5: Checksum,
    pub sha1: Checksum,
    pub created_rev: u64,
}

impl FileNode {
    pub(crate) fn new(contents: Vec<u8>, props: PropertyList, created_rev: u64) -> Self {
        Self {
            md5: Checksum::md5(&contents),
            sha1: Checksum::sha1(&contents),
            props,
            contents,
            created_rev,
        }
    }

    pub(crate) fn is_special(&self) -> bool {
        self.props.contains_key(SPECIAL_PROP)
    }
}

/// A node in a revision tree. Cloning is cheap; mutation copies on write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Node {
    Dir(Arc<DirNode>),
    File(Arc<FileNode>),
}

impl Node {
    pub(crate) fn empty_dir(created_rev: u64) -> Self {
        Self::Dir(Arc::new(DirNode {
            created_rev,
            ..DirNode::default()
        }))
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Self::Dir(_) => NodeKind::Dir,
            Self::File(_) => NodeKind::File,
        }
    }

    pub(crate) fn created_rev(&self) -> u64 {
        match self {
            Self::Dir(dir) => dir.created_rev,
            Self::File(file) => file.created_rev,
        }
    }

    pub(crate) fn props(&self) -> &PropertyList {
        match self {
            Self::Dir(dir) => &dir.props,
            Self::File(file) => &file.props,
        }
    }

    pub(crate) fn as_dir(&self) -> Option<&DirNode> {
        match self {
            Self::Dir(dir) => Some(dir),
            Self::File(_) => None,
        }
    }

    pub(crate) fn as_file(&self) -> Option<&FileNode> {
        match self {
            Self::File(file) => Some(file),
            Self::Dir(_) => None,
        }
    }

    /// Returns `true` if both handles share the same storage.
    pub(crate) fn same(&self, other: &Node) -> bool {
        match (self, other) {
            (Self::Dir(a), Self::Dir(b)) => Arc::ptr_eq(a, b),
            (Self::File(a), Self::File(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn set_created_rev(&mut self, rev: u64) {
        match self {
            Self::Dir(dir) => Arc::make_mut(dir).created_rev = rev,
            Self::File(file) => Arc::make_mut(file).created_rev = rev,
        }
    }

    pub(crate) fn set_props(&mut self, props: PropertyList) {
        match self {
            Self::Dir(dir) => Arc::make_mut(dir).props = props,
            Self::File(file) => Arc::make_mut(file).props = props,
        }
    }

    /// Looks up a canonical path below this node (`""` is the node itself).
    pub(crate) fn lookup(&self, path: &str) -> Option<&Node> {
        let mut cur = self;
        if path.is_empty() {
            return Some(cur);
        }
        for seg in path.split('/') {
            cur = cur.as_dir()?.entries.get(seg)?;
        }
        Some(cur)
    }

    /// Kind of the node at `path`, [`NodeKind::None`] when absent.
    pub(crate) fn kind_at(&self, path: &str) -> NodeKind {
        self.lookup(path).map_or(NodeKind::None, Node::kind)
    }

    /// Number of nodes beneath this one.
    pub(crate) fn descendant_count(&self) -> usize {
        match self {
            Self::File(_) => 0,
            Self::Dir(dir) => dir
                .entries
                .values()
                .map(|child| 1 + child.descendant_count())
                .sum(),
        }
    }

    /// Copy of this node with children dropped according to `depth`.
    ///
    /// `start_empty` drops every child.
    pub(crate) fn pruned(&self, depth: Depth, start_empty: bool) -> Node {
        let Self::Dir(dir) = self else {
            return self.clone();
        };
        if depth == Depth::Infinity && !start_empty {
            return self.clone();
        }
        let mut pruned = DirNode {
            props: dir.props.clone(),
            entries: BTreeMap::new(),
            created_rev: dir.created_rev,
        };
        if !start_empty {
            for (name, child) in &dir.entries {
                match (child, depth) {
                    (_, Depth::Empty) => {}
                    (Node::File(_), _) => {
                        pruned.entries.insert(name.clone(), child.clone());
                    }
                    (Node::Dir(_), Depth::Immediates) => {
                        pruned
                            .entries
                            .insert(name.clone(), child.pruned(Depth::Empty, false));
                    }
                    (Node::Dir(_), _) => {}
                }
            }
        }
        Node::Dir(Arc::new(pruned))
    }
}

/// Walks to the node at `path`, copying every directory on the way and
/// stamping it with `stamp` when given.
///
/// Returns `None` if a path component is missing or is not a directory.
pub(crate) fn node_mut<'a>(
    root: &'a mut Node,
    path: &str,
    stamp: Option<u64>,
) -> Option<&'a mut Node> {
    let mut cur = root;
    if path.is_empty() {
        return Some(cur);
    }
    for seg in path.split('/') {
        cur = match cur {
            Node::Dir(dir) => {
                let dir = Arc::make_mut(dir);
                if let Some(rev) = stamp {
                    dir.created_rev = rev;
                }
                dir.entries.get_mut(seg)?
            }
            Node::File(_) => return None,
        };
    }
    Some(cur)
}

/// Like [`node_mut`], but for a directory that is to receive or lose an
/// entry. The directory itself is stamped too.
pub(crate) fn dir_mut<'a>(
    root: &'a mut Node,
    path: &str,
    stamp: Option<u64>,
) -> Option<&'a mut DirNode> {
    match node_mut(root, path, stamp)? {
        Node::Dir(dir) => {
            let dir = Arc::make_mut(dir);
            if let Some(rev) = stamp {
                dir.created_rev = rev;
            }
            Some(dir)
        }
        Node::File(_) => None,
    }
}
