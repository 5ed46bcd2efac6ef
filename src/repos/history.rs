//! Node history: log queries and file revisions.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::{PROP_AUTHOR, PROP_DATE, PROP_LOG, Revision};
use crate::path;
use crate::{
    ChangedPath, FileRev, FileRevContents, LogEntry, LogRevProps, NodeKind, PropDelta,
    PropertyList, SvnError,
};

/// Revisions in which `path@peg` (or the node it was copied from) changed,
/// newest first, down to revision `lo`. Each entry carries the node's path
/// in that revision.
///
/// Copies are followed to their source unless `strict`; a plain add ends the
/// history.
pub(crate) fn path_history(
    history: &[Arc<Revision>],
    path: &str,
    peg: u64,
    lo: u64,
    strict: bool,
) -> Result<Vec<(u64, String)>, SvnError> {
    let peg_revision = history
        .get(peg as usize)
        .ok_or(SvnError::NoSuchRevision(peg))?;
    if peg_revision.root.lookup(path).is_none() {
        return Err(SvnError::not_found(path, peg));
    }

    let mut out = Vec::new();
    let mut cur = path.to_string();
    let mut rev = peg;
    while rev >= lo {
        let Some(revision) = history.get(rev as usize) else {
            break;
        };
        if cur.is_empty() {
            out.push((rev, cur.clone()));
        } else {
            let touched = revision
                .changes
                .iter()
                .any(|change| path::is_ancestor(&cur, &change.path));
            // the deepest add at or above the node is where it came from
            let origin = revision
                .changes
                .iter()
                .filter(|change| matches!(change.action.as_str(), "A" | "R"))
                .filter(|change| path::is_ancestor(&change.path, &cur))
                .max_by_key(|change| change.path.len());
            if touched || origin.is_some() {
                out.push((rev, cur.clone()));
            }
            if let Some(origin) = origin {
                match (&origin.copy_from_path, origin.copy_from_rev) {
                    (Some(from_path), Some(from_rev)) if !strict => {
                        let rest = path::skip_ancestor(&origin.path, &cur).unwrap_or("");
                        cur = path::join(from_path, rest);
                        rev = from_rev;
                        continue;
                    }
                    _ => break,
                }
            }
        }
        if rev == 0 {
            break;
        }
        rev -= 1;
    }
    Ok(out)
}

/// A log request with repository-relative paths and resolved revisions.
#[derive(Clone, Debug)]
pub(crate) struct LogQuery<'a> {
    pub paths: &'a [String],
    pub start: u64,
    pub end: u64,
    pub strict_node: bool,
    pub changed_paths: bool,
    pub limit: u64,
    pub revprops: &'a LogRevProps,
}

pub(crate) fn log(history: &[Arc<Revision>], query: &LogQuery<'_>) -> Result<Vec<LogEntry>, SvnError> {
    let peg = query.start.max(query.end);
    let lo = query.start.min(query.end);
    let mut revs = BTreeSet::new();
    for path in query.paths {
        for (rev, _) in path_history(history, path, peg, lo, query.strict_node)? {
            if rev >= lo {
                revs.insert(rev);
            }
        }
    }
    let ordered: Vec<u64> = if query.start <= query.end {
        revs.into_iter().collect()
    } else {
        revs.into_iter().rev().collect()
    };
    let limit = if query.limit == 0 {
        usize::MAX
    } else {
        usize::try_from(query.limit).unwrap_or(usize::MAX)
    };
    ordered
        .into_iter()
        .take(limit)
        .map(|rev| {
            let revision = history
                .get(rev as usize)
                .ok_or(SvnError::NoSuchRevision(rev))?;
            Ok(log_entry(revision, query.changed_paths, query.revprops))
        })
        .collect()
}

fn log_entry(revision: &Revision, changed_paths: bool, revprops: &LogRevProps) -> LogEntry {
    let rev_props: PropertyList = match revprops {
        LogRevProps::All => revision.props.clone(),
        LogRevProps::Custom(names) => revision
            .props
            .iter()
            .filter(|(name, _)| names.contains(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
    };
    let text = |name: &str| {
        rev_props
            .get(name)
            .map(|value| String::from_utf8_lossy(value).into_owned())
    };
    LogEntry {
        rev: revision.number,
        changed_paths: if changed_paths {
            revision.changes.iter().map(absolute_change).collect()
        } else {
            Vec::new()
        },
        author: text(PROP_AUTHOR),
        date: text(PROP_DATE),
        message: text(PROP_LOG),
        rev_props,
    }
}

/// Changed paths are shown with a leading `/` in log output.
fn absolute_change(change: &ChangedPath) -> ChangedPath {
    ChangedPath {
        path: format!("/{}", change.path),
        copy_from_path: change.copy_from_path.as_ref().map(|p| format!("/{p}")),
        ..change.clone()
    }
}

/// Interesting revisions of a file between `start` and `end`, oldest first.
///
/// The first entry is the last change at or before `start`; each entry
/// carries the full contents and the changes relative to the previous one.
pub(crate) fn file_revs(
    history: &[Arc<Revision>],
    path: &str,
    start: u64,
    end: u64,
) -> Result<Vec<FileRevContents>, SvnError> {
    if start > end {
        return Err(SvnError::InvalidArgument(format!(
            "file revisions need start <= end (got r{start}:r{end})"
        )));
    }
    let peg = history
        .get(end as usize)
        .ok_or(SvnError::NoSuchRevision(end))?;
    let kind = peg.root.kind_at(path);
    if kind != NodeKind::File {
        if kind == NodeKind::None {
            return Err(SvnError::not_found(path, end));
        }
        return Err(SvnError::KindMismatch {
            path: path.to_string(),
            expected: NodeKind::File,
            found: kind,
        });
    }

    let mut selected = Vec::new();
    for (rev, node_path) in path_history(history, path, end, 0, false)? {
        let at_or_before_start = rev <= start;
        selected.push((rev, node_path));
        if at_or_before_start {
            break;
        }
    }
    selected.reverse();

    let mut out = Vec::with_capacity(selected.len());
    let mut prev: Option<(PropertyList, Vec<u8>)> = None;
    for (rev, node_path) in selected {
        let revision = history
            .get(rev as usize)
            .ok_or(SvnError::NoSuchRevision(rev))?;
        let file = revision
            .root
            .lookup(&node_path)
            .and_then(|node| node.as_file())
            .ok_or_else(|| SvnError::not_found(&node_path, rev))?;
        let empty = PropertyList::new();
        let (prev_props, prev_contents) = match &prev {
            Some((props, contents)) => (props, Some(contents)),
            None => (&empty, None),
        };
        let file_rev = FileRev {
            path: node_path.clone(),
            rev,
            rev_props: revision.props.clone(),
            prop_deltas: prop_deltas(prev_props, &file.props),
            text_changed: prev_contents.is_none_or(|contents| *contents != file.contents),
        };
        out.push(FileRevContents {
            file_rev,
            contents: file.contents.clone(),
        });
        prev = Some((file.props.clone(), file.contents.clone()));
    }
    Ok(out)
}

fn prop_deltas(old: &PropertyList, new: &PropertyList) -> Vec<PropDelta> {
    let mut deltas: Vec<PropDelta> = new
        .iter()
        .filter(|(name, value)| old.get(*name) != Some(*value))
        .map(|(name, value)| PropDelta {
            name: name.clone(),
            value: Some(value.clone()),
        })
        .collect();
    deltas.extend(
        old.keys()
            .filter(|name| !new.contains_key(*name))
            .map(|name| PropDelta {
                name: name.clone(),
                value: None,
            }),
    );
    deltas
}
