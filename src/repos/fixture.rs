//! Revision histories for unit tests.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use super::txn::Txn;
use super::{PROP_AUTHOR, Revision};
use crate::editor::FileText;
use crate::{EditorCommand, PropertyList};

pub(crate) fn props(pairs: &[(&str, &str)]) -> PropertyList {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
        .collect()
}

pub(crate) fn add_dir(path: &str) -> EditorCommand {
    EditorCommand::AddDirectory {
        path: path.into(),
        children: Vec::new(),
        props: PropertyList::new(),
        replaces_rev: None,
    }
}

pub(crate) fn add_file(path: &str, text: &str) -> EditorCommand {
    EditorCommand::AddFile {
        path: path.into(),
        text: FileText::new(text.as_bytes()),
        props: PropertyList::new(),
        replaces_rev: None,
    }
}

pub(crate) fn alter_file(path: &str, rev: u64, text: Option<&str>, props: Option<PropertyList>) -> EditorCommand {
    EditorCommand::AlterFile {
        path: path.into(),
        rev,
        text: text.map(|t| FileText::new(t.as_bytes())),
        props,
    }
}

pub(crate) fn commit(history: &mut Vec<Arc<Revision>>, cmds: &[EditorCommand]) {
    let mut txn = Txn::new(history.clone());
    for cmd in cmds {
        txn.apply(cmd).unwrap();
    }
    let number = txn.new_rev();
    let (root, changes) = txn.finish();
    history.push(Arc::new(Revision {
        number,
        root,
        props: props(&[(PROP_AUTHOR, "jrandom")]),
        changes,
    }));
}

/// r1 holds a small tree:
///
/// ```text
/// iota
/// A/mu
/// A/B/lambda
/// A/B/E/alpha
/// A/C/
/// ```
pub(crate) fn small_tree() -> Vec<Arc<Revision>> {
    let mut history = vec![Arc::new(Revision::genesis(PropertyList::new()))];
    commit(
        &mut history,
        &[
            add_file("iota", "This is the file 'iota'.\n"),
            add_dir("A"),
            add_file("A/mu", "This is the file 'mu'.\n"),
            add_dir("A/B"),
            add_file("A/B/lambda", "This is the file 'lambda'.\n"),
            add_dir("A/B/E"),
            add_file("A/B/E/alpha", "This is the file 'alpha'.\n"),
            add_dir("A/C"),
        ],
    );
    history
}
