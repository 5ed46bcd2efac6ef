//! Transaction building: replays [`EditorCommand`] values onto a mutable
//! copy of the youngest tree.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;

use super::Revision;
use super::tree::{self, DirNode, FileNode, Node};
use crate::editor::FileText;
use crate::path;
use crate::{ChangedPath, Checksum, EditorCommand, NodeKind, SvnError};

/// A transaction under construction.
///
/// Every node written by the transaction is stamped with `new_rev`, and
/// writes bubble that stamp up through the ancestors. Base revisions are
/// therefore checked against `base`, the tree the transaction started from.
#[derive(Clone, Debug)]
pub(crate) struct Txn {
    history: Vec<Arc<Revision>>,
    base: Node,
    root: Node,
    new_rev: u64,
    changes: BTreeMap<String, ChangedPath>,
}

impl Txn {
    /// Starts a transaction on top of the last revision in `history`.
    pub(crate) fn new(history: Vec<Arc<Revision>>) -> Self {
        let (root, new_rev) = match history.last() {
            Some(last) => (last.root.clone(), last.number + 1),
            None => (Node::empty_dir(0), 0),
        };
        Self {
            history,
            base: root.clone(),
            root,
            new_rev,
            changes: BTreeMap::new(),
        }
    }

    /// Revision number the transaction will commit as.
    pub(crate) fn new_rev(&self) -> u64 {
        self.new_rev
    }

    fn youngest(&self) -> u64 {
        self.new_rev.saturating_sub(1)
    }

    /// Applies one command whose paths are relative to the repository root.
    pub(crate) fn apply(&mut self, cmd: &EditorCommand) -> Result<(), SvnError> {
        trace!(command = cmd.name(), new_rev = self.new_rev, "applying editor command");
        match cmd {
            EditorCommand::AddDirectory {
                path,
                children,
                props,
                replaces_rev,
            } => {
                trace!(path = %path, children = ?children, "add-directory");
                self.prepare_target(path, *replaces_rev)?;
                let node = Node::Dir(Arc::new(DirNode {
                    props: props.clone(),
                    entries: BTreeMap::new(),
                    created_rev: self.new_rev,
                }));
                self.insert(path, node)?;
                self.record_add(path, NodeKind::Dir, None, false, !props.is_empty());
            }
            EditorCommand::AddFile {
                path,
                text,
                props,
                replaces_rev,
            } => {
                verify_text(path, text)?;
                self.prepare_target(path, *replaces_rev)?;
                let node = Node::File(Arc::new(FileNode::new(
                    text.contents.clone(),
                    props.clone(),
                    self.new_rev,
                )));
                self.insert(path, node)?;
                self.record_add(path, NodeKind::File, None, true, !props.is_empty());
            }
            EditorCommand::AlterDirectory {
                path,
                rev,
                children,
                props,
            } => {
                let node = self.existing(path)?;
                expect_kind(path, node, NodeKind::Dir)?;
                self.check_current(path, *rev)?;
                if let Some(children) = children {
                    trace!(path = %path, children = ?children, "alter-directory child order");
                }
                if let Some(props) = props
                    && props != node.props()
                {
                    let new_rev = self.new_rev;
                    let node = self.node_mut(path)?;
                    node.set_props(props.clone());
                    node.set_created_rev(new_rev);
                    self.record_modify(path, NodeKind::Dir, false, true);
                }
            }
            EditorCommand::AlterFile {
                path,
                rev,
                text,
                props,
            } => {
                let node = self.existing(path)?;
                expect_kind(path, node, NodeKind::File)?;
                self.check_current(path, *rev)?;
                let Some(file) = node.as_file() else {
                    return Err(kind_mismatch(path, NodeKind::File, node.kind()));
                };
                if let Some(text) = text {
                    verify_text(path, text)?;
                }
                let text_mod = text
                    .as_ref()
                    .is_some_and(|text| text.contents != file.contents);
                let prop_mod = props.as_ref().is_some_and(|props| *props != file.props);
                if text_mod || prop_mod {
                    let contents = match text {
                        Some(text) => text.contents.clone(),
                        None => file.contents.clone(),
                    };
                    let props = props.clone().unwrap_or_else(|| file.props.clone());
                    let new_rev = self.new_rev;
                    let node = self.node_mut(path)?;
                    *node = Node::File(Arc::new(FileNode::new(contents, props, new_rev)));
                    self.record_modify(path, NodeKind::File, text_mod, prop_mod);
                }
            }
            EditorCommand::Copy {
                src_path,
                src_rev,
                dst_path,
                replaces_rev,
            } => {
                let mut node = self.committed(src_path, *src_rev)?.clone();
                self.prepare_target(dst_path, *replaces_rev)?;
                node.set_created_rev(self.new_rev);
                let kind = node.kind();
                self.insert(dst_path, node)?;
                self.record_add(
                    dst_path,
                    kind,
                    Some((src_path.clone(), *src_rev)),
                    false,
                    false,
                );
            }
            EditorCommand::Move {
                src_path,
                src_rev,
                dst_path,
                replaces_rev,
            } => {
                if src_path.is_empty() {
                    return Err(SvnError::InvalidPath(
                        "cannot move the repository root".into(),
                    ));
                }
                if path::is_ancestor(src_path, dst_path) {
                    return Err(SvnError::InvalidArgument(format!(
                        "cannot move '{src_path}' into itself ('{dst_path}')"
                    )));
                }
                self.check_rev(*src_rev)?;
                let node = self.existing(src_path)?;
                self.check_current(src_path, *src_rev)?;
                let mut node = node.clone();
                let kind = node.kind();
                self.remove(src_path)?;
                self.record_delete(src_path, kind);
                self.prepare_target(dst_path, *replaces_rev)?;
                node.set_created_rev(self.new_rev);
                self.insert(dst_path, node)?;
                self.record_add(
                    dst_path,
                    kind,
                    Some((src_path.clone(), *src_rev)),
                    false,
                    false,
                );
            }
            EditorCommand::Delete { path, rev } => {
                if path.is_empty() {
                    return Err(SvnError::InvalidPath(
                        "cannot delete the repository root".into(),
                    ));
                }
                let node = self.existing(path)?;
                self.check_current(path, *rev)?;
                let kind = node.kind();
                self.remove(path)?;
                self.record_delete(path, kind);
            }
        }
        Ok(())
    }

    /// Finishes the transaction, returning the new root and the changed paths
    /// sorted by path.
    pub(crate) fn finish(mut self) -> (Node, Vec<ChangedPath>) {
        self.root.set_created_rev(self.new_rev);
        (self.root, self.changes.into_values().collect())
    }

    fn check_rev(&self, rev: u64) -> Result<(), SvnError> {
        if rev > self.youngest() {
            return Err(SvnError::NoSuchRevision(rev));
        }
        Ok(())
    }

    /// Fails with [`SvnError::OutOfDate`] when the node at `path` changed
    /// after `rev`. Nodes added or replaced by this transaction, and
    /// everything beneath them, have no older state to conflict with.
    fn check_current(&self, path: &str, rev: u64) -> Result<(), SvnError> {
        self.check_rev(rev)?;
        if self.added_here(path) {
            return Ok(());
        }
        let Some(base) = self.base.lookup(path) else {
            return Ok(());
        };
        let changed_rev = base.created_rev();
        if changed_rev > rev {
            return Err(SvnError::OutOfDate {
                path: path.to_string(),
                base_rev: rev,
                changed_rev,
            });
        }
        Ok(())
    }

    fn added_here(&self, path: &str) -> bool {
        self.changes.iter().any(|(changed, change)| {
            matches!(change.action.as_str(), "A" | "R") && path::is_ancestor(changed, path)
        })
    }

    fn existing(&self, path: &str) -> Result<&Node, SvnError> {
        self.root
            .lookup(path)
            .ok_or_else(|| SvnError::not_found(path, self.youngest()))
    }

    fn committed(&self, path: &str, rev: u64) -> Result<&Node, SvnError> {
        let revision = self
            .history
            .get(rev as usize)
            .ok_or(SvnError::NoSuchRevision(rev))?;
        revision
            .root
            .lookup(path)
            .ok_or_else(|| SvnError::not_found(path, rev))
    }

    fn node_mut(&mut self, path: &str) -> Result<&mut Node, SvnError> {
        let youngest = self.youngest();
        tree::node_mut(&mut self.root, path, Some(self.new_rev))
            .ok_or_else(|| SvnError::not_found(path, youngest))
    }

    /// Checks that `path` can receive a new node, removing the node it
    /// replaces.
    fn prepare_target(&mut self, path: &str, replaces_rev: Option<u64>) -> Result<(), SvnError> {
        if path.is_empty() {
            return Err(SvnError::InvalidPath(
                "cannot add or replace the repository root".into(),
            ));
        }
        let parent = path::parent_dir(path);
        match self.root.lookup(parent) {
            None => return Err(SvnError::not_found(parent, self.youngest())),
            Some(node) => expect_kind(parent, node, NodeKind::Dir)?,
        }
        match (self.root.lookup(path), replaces_rev) {
            (None, None) => Ok(()),
            (Some(_), None) => Err(SvnError::AlreadyExists(path.to_string())),
            (Some(node), Some(rev)) => {
                self.check_current(path, rev)?;
                let kind = node.kind();
                self.remove(path)?;
                self.record_delete(path, kind);
                Ok(())
            }
            (None, Some(rev)) => {
                self.check_rev(rev)?;
                Err(SvnError::not_found(path, rev))
            }
        }
    }

    fn insert(&mut self, path: &str, node: Node) -> Result<(), SvnError> {
        let (parent, name) = path::split(path)
            .ok_or_else(|| SvnError::InvalidPath("cannot insert the repository root".into()))?;
        let youngest = self.youngest();
        let dir = tree::dir_mut(&mut self.root, parent, Some(self.new_rev))
            .ok_or_else(|| SvnError::not_found(parent, youngest))?;
        dir.entries.insert(name.to_string(), node);
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<Node, SvnError> {
        let (parent, name) = path::split(path)
            .ok_or_else(|| SvnError::InvalidPath("cannot remove the repository root".into()))?;
        let youngest = self.youngest();
        tree::dir_mut(&mut self.root, parent, Some(self.new_rev))
            .and_then(|dir| dir.entries.remove(name))
            .ok_or_else(|| SvnError::not_found(path, youngest))
    }

    fn drop_changes_below(&mut self, path: &str) {
        self.changes
            .retain(|p, _| p == path || !path::is_ancestor(path, p));
    }

    fn record_add(
        &mut self,
        path: &str,
        kind: NodeKind,
        copy_from: Option<(String, u64)>,
        text_mods: bool,
        prop_mods: bool,
    ) {
        // a node removed earlier in this transaction turns the add into a replace
        let replaces = self
            .changes
            .get(path)
            .is_some_and(|change| change.action == "D");
        let action = if replaces { "R" } else { "A" };
        self.drop_changes_below(path);
        let (copy_from_path, copy_from_rev) = match copy_from {
            Some((p, r)) => (Some(p), Some(r)),
            None => (None, None),
        };
        self.changes.insert(
            path.to_string(),
            ChangedPath {
                action: action.to_string(),
                path: path.to_string(),
                copy_from_path,
                copy_from_rev,
                node_kind: Some(kind),
                text_mods: Some(text_mods),
                prop_mods: Some(prop_mods),
            },
        );
    }

    fn record_modify(&mut self, path: &str, kind: NodeKind, text_mods: bool, prop_mods: bool) {
        let change = self
            .changes
            .entry(path.to_string())
            .or_insert_with(|| ChangedPath {
                action: "M".to_string(),
                path: path.to_string(),
                copy_from_path: None,
                copy_from_rev: None,
                node_kind: Some(kind),
                text_mods: Some(false),
                prop_mods: Some(false),
            });
        change.text_mods = Some(change.text_mods.unwrap_or(false) || text_mods);
        change.prop_mods = Some(change.prop_mods.unwrap_or(false) || prop_mods);
    }

    fn record_delete(&mut self, path: &str, kind: NodeKind) {
        let prior = self.changes.remove(path);
        self.drop_changes_below(path);
        if prior.is_some_and(|change| change.action == "A") {
            return;
        }
        self.changes.insert(
            path.to_string(),
            ChangedPath {
                action: "D".to_string(),
                path: path.to_string(),
                copy_from_path: None,
                copy_from_rev: None,
                node_kind: Some(kind),
                text_mods: None,
                prop_mods: None,
            },
        );
    }
}

fn verify_text(path: &str, text: &FileText) -> Result<(), SvnError> {
    if text.checksum.matches(&text.contents) {
        return Ok(());
    }
    Err(SvnError::ChecksumMismatch {
        path: path.to_string(),
        expected: text.checksum.to_hex(),
        actual: Checksum::compute(text.checksum.kind, &text.contents).to_hex(),
    })
}

fn kind_mismatch(path: &str, expected: NodeKind, found: NodeKind) -> SvnError {
    SvnError::KindMismatch {
        path: path.to_string(),
        expected,
        found,
    }
}

fn expect_kind(path: &str, node: &Node, expected: NodeKind) -> Result<(), SvnError> {
    if node.kind() != expected {
        return Err(kind_mismatch(path, expected, node.kind()));
    }
    Ok(())
}
