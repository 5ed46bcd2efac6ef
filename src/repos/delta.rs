//! Status computation: rebuilds the tree a client reported and compares it
//! with a committed revision.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::Revision;
use super::tree::{self, Node};
use crate::path;
use crate::{Depth, Report, ReportCommand, StatusEvent, SvnError, SvnUrl};

/// Where the comparison happens.
#[derive(Clone, Copy, Debug)]
pub(crate) struct StatusScope<'a> {
    /// Repository-relative status target.
    pub target: &'a str,
    /// Revision to compare the baseline against.
    pub rev: u64,
    /// Requested depth.
    pub depth: Depth,
}

/// Computes the events describing how revision `scope.rev` differs from
/// the reported baseline.
///
/// Fails before producing any event if the report names a missing path or
/// revision.
pub(crate) fn status(
    history: &[Arc<Revision>],
    root_url: &SvnUrl,
    scope: StatusScope<'_>,
    report: &Report,
) -> Result<Vec<StatusEvent>, SvnError> {
    let baseline = build_baseline(history, root_url, scope.target, report)?;
    let revision = history
        .get(scope.rev as usize)
        .ok_or(SvnError::NoSuchRevision(scope.rev))?;

    let mut events = Vec::new();
    match revision.root.lookup(scope.target) {
        None => events.push(StatusEvent::Deleted {
            path: String::new(),
        }),
        Some(target) if target.kind() == baseline.kind() => {
            diff_node(&baseline, target, "", scope.depth, &mut events);
        }
        Some(target) => {
            events.push(StatusEvent::Deleted {
                path: String::new(),
            });
            added(target, "", scope.depth, &mut events);
        }
    }
    Ok(events)
}

/// Rebuilds the client's tree from the report commands.
fn build_baseline(
    history: &[Arc<Revision>],
    root_url: &SvnUrl,
    target: &str,
    report: &Report,
) -> Result<Node, SvnError> {
    let mut commands: Vec<&ReportCommand> = report.commands.iter().collect();
    // parents sort before their descendants; later commands for the same
    // path keep their order
    commands.sort_by(|a, b| a.path().cmp(b.path()));

    let mut baseline: Option<Node> = None;
    for cmd in commands {
        match cmd {
            ReportCommand::SetPath {
                path,
                rev,
                start_empty,
                depth,
                ..
            } => {
                let source = path::join(target, path);
                let node = reported_node(history, &source, *rev)?.pruned(*depth, *start_empty);
                graft(&mut baseline, path, node)?;
            }
            ReportCommand::LinkPath {
                path,
                url,
                rev,
                start_empty,
                depth,
                ..
            } => {
                let linked = SvnUrl::parse(url)?;
                let source = root_url.relative(&linked).ok_or_else(|| {
                    SvnError::InvalidUrl(format!(
                        "'{url}' is not in repository '{}'",
                        root_url.url
                    ))
                })?;
                let node = reported_node(history, source, *rev)?.pruned(*depth, *start_empty);
                graft(&mut baseline, path, node)?;
            }
            ReportCommand::DeletePath { path } => {
                let Some((parent, name)) = path::split(path) else {
                    return Err(SvnError::InvalidArgument(
                        "the report target cannot be deleted".into(),
                    ));
                };
                if let Some(root) = baseline.as_mut()
                    && let Some(dir) = tree::dir_mut(root, parent, None)
                {
                    dir.entries.remove(name);
                }
            }
        }
    }
    baseline.ok_or_else(|| {
        SvnError::InvalidArgument("a report must start by setting the target path ''".into())
    })
}

fn reported_node<'a>(
    history: &'a [Arc<Revision>],
    path: &str,
    rev: u64,
) -> Result<&'a Node, SvnError> {
    let revision = history
        .get(rev as usize)
        .ok_or(SvnError::NoSuchRevision(rev))?;
    revision
        .root
        .lookup(path)
        .ok_or_else(|| SvnError::not_found(path, rev))
}

fn graft(baseline: &mut Option<Node>, path: &str, node: Node) -> Result<(), SvnError> {
    let Some((parent, name)) = path::split(path) else {
        *baseline = Some(node);
        return Ok(());
    };
    let dir = baseline
        .as_mut()
        .and_then(|root| tree::dir_mut(root, parent, None))
        .ok_or_else(|| {
            SvnError::InvalidArgument(format!(
                "reported path '{path}' has no reported parent directory"
            ))
        })?;
    dir.entries.insert(name.to_string(), node);
    Ok(())
}

fn in_scope(node: &Node, depth: Depth) -> bool {
    match node {
        Node::File(_) => depth.includes_files(),
        Node::Dir(_) => depth.for_child_dir().is_some(),
    }
}

fn diff_node(base: &Node, target: &Node, path: &str, depth: Depth, out: &mut Vec<StatusEvent>) {
    if base.same(target) {
        return;
    }
    match (base, target) {
        (Node::File(old), Node::File(new)) => {
            let text_modified = old.md5 != new.md5;
            let props_modified = old.props != new.props;
            if !text_modified && !props_modified {
                return;
            }
            let path = path.to_string();
            out.push(if new.is_special() {
                StatusEvent::ModifiedSymlink {
                    path,
                    target_modified: text_modified,
                    props_modified,
                }
            } else {
                StatusEvent::ModifiedFile {
                    path,
                    text_modified,
                    props_modified,
                }
            });
        }
        (Node::Dir(old), Node::Dir(new)) => {
            let props_modified = old.props != new.props;
            let child_depth = depth.for_child_dir().unwrap_or(Depth::Empty);
            let names: BTreeSet<&String> = old.entries.keys().chain(new.entries.keys()).collect();
            let mut children = Vec::new();
            for name in names {
                let old_child = old.entries.get(name).filter(|n| in_scope(n, depth));
                let new_child = new.entries.get(name).filter(|n| in_scope(n, depth));
                let child_path = path::join(path, name);
                match (old_child, new_child) {
                    (Some(o), Some(n)) if o.kind() == n.kind() => {
                        diff_node(o, n, &child_path, child_depth, &mut children);
                    }
                    (o, n) => {
                        if o.is_some() {
                            children.push(StatusEvent::Deleted {
                                path: child_path.clone(),
                            });
                        }
                        if let Some(n) = n {
                            added(n, &child_path, child_depth, &mut children);
                        }
                    }
                }
            }
            if props_modified || !children.is_empty() {
                out.push(StatusEvent::ModifiedDirectory {
                    path: path.to_string(),
                    children_modified: !children.is_empty(),
                    props_modified,
                });
                out.append(&mut children);
            }
        }
        _ => {
            out.push(StatusEvent::Deleted {
                path: path.to_string(),
            });
            added(target, path, depth, out);
        }
    }
}

fn added(node: &Node, path: &str, depth: Depth, out: &mut Vec<StatusEvent>) {
    let path_owned = path.to_string();
    match node {
        Node::File(file) if file.is_special() => {
            out.push(StatusEvent::AddedSymlink { path: path_owned })
        }
        Node::File(_) => out.push(StatusEvent::AddedFile { path: path_owned }),
        Node::Dir(dir) => {
            out.push(StatusEvent::AddedDirectory { path: path_owned });
            let child_depth = depth.for_child_dir().unwrap_or(Depth::Empty);
            for (name, child) in &dir.entries {
                if in_scope(child, depth) {
                    added(child, &path::join(path, name), child_depth, out);
                }
            }
        }
    }
}
