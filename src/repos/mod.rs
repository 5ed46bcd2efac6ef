//! In-process versioned repository.
//!
//! A [`Repository`] keeps every revision as an immutable, structurally
//! shared tree. Sessions read snapshots without blocking each other; commits
//! and lock changes take the write lock for the duration of one transaction.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::path;
use crate::{
    Capability, ChangedPath, CommitInfo, Depth, EditorCommand, LockDesc, LockOptions, NodeKind,
    PropertyList, ReposConfig, RepositoryInfo, SvnError, SvnUrl, UnlockOptions,
};

pub(crate) mod delta;
#[cfg(test)]
pub(crate) mod fixture;
pub(crate) mod history;
pub(crate) mod tree;
pub(crate) mod txn;

use tree::Node;
use txn::Txn;

pub(crate) const PROP_DATE: &str = "svn:date";
pub(crate) const PROP_AUTHOR: &str = "svn:author";
pub(crate) const PROP_LOG: &str = "svn:log";

pub(crate) fn now_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// One committed revision.
#[derive(Clone, Debug)]
pub(crate) struct Revision {
    pub number: u64,
    pub root: Node,
    pub props: PropertyList,
    /// Changed paths, repository-relative without a leading `/`, sorted.
    pub changes: Vec<ChangedPath>,
}

impl Revision {
    /// Revision 0: an empty root directory.
    pub(crate) fn genesis(props: PropertyList) -> Self {
        Self {
            number: 0,
            root: Node::empty_dir(0),
            props,
            changes: Vec::new(),
        }
    }

    pub(crate) fn prop_string(&self, name: &str) -> Option<String> {
        self.props
            .get(name)
            .map(|value| String::from_utf8_lossy(value).into_owned())
    }

    pub(crate) fn date(&self) -> Option<DateTime<Utc>> {
        let raw = self.props.get(PROP_DATE)?;
        let raw = std::str::from_utf8(raw).ok()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|date| date.with_timezone(&Utc))
    }
}

/// A commit ready to be applied. Paths are repository-relative.
#[derive(Clone, Debug, Default)]
pub(crate) struct CommitRequest {
    pub commands: Vec<EditorCommand>,
    pub rev_props: PropertyList,
    pub author: Option<String>,
    /// Presented lock tokens keyed by repository-relative path.
    pub lock_tokens: BTreeMap<String, String>,
    pub keep_locks: bool,
}

#[derive(Debug)]
struct ReposState {
    revisions: Vec<Arc<Revision>>,
    locks: BTreeMap<String, LockDesc>,
}

#[derive(Debug)]
struct ReposInner {
    uuid: String,
    root_url: SvnUrl,
    config: ReposConfig,
    state: RwLock<ReposState>,
}

/// A shared handle to an in-process repository.
///
/// Cloning is cheap; every clone refers to the same revision history.
///
/// # Examples
///
/// ```
/// # use svn_ra::Repository;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> svn_ra::Result<()> {
/// let repos = Repository::create("svn://example.com/repo")?;
/// assert_eq!(repos.youngest().await, 0);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Repository {
    inner: Arc<ReposInner>,
}

impl Repository {
    /// Creates an empty repository rooted at `url` with the default
    /// configuration.
    pub fn create(url: &str) -> Result<Self, SvnError> {
        Self::create_with_config(url, ReposConfig::default())
    }

    /// Creates an empty repository rooted at `url`.
    pub fn create_with_config(url: &str, config: ReposConfig) -> Result<Self, SvnError> {
        let root_url = SvnUrl::parse(url)?;
        let uuid = config
            .uuid
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let props = PropertyList::from([(PROP_DATE.to_string(), now_string().into_bytes())]);
        debug!(url = %root_url, uuid = %uuid, "created repository");
        Ok(Self {
            inner: Arc::new(ReposInner {
                uuid,
                root_url,
                config,
                state: RwLock::new(ReposState {
                    revisions: vec![Arc::new(Revision::genesis(props))],
                    locks: BTreeMap::new(),
                }),
            }),
        })
    }

    /// Repository UUID.
    pub fn uuid(&self) -> &str {
        &self.inner.uuid
    }

    /// Repository root URL.
    pub fn root_url(&self) -> &SvnUrl {
        &self.inner.root_url
    }

    /// Repository configuration.
    pub fn config(&self) -> &ReposConfig {
        &self.inner.config
    }

    /// Returns `true` if the repository advertises `capability`.
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.inner.config.capabilities.contains(&capability)
    }

    /// Repository metadata.
    pub fn info(&self) -> RepositoryInfo {
        RepositoryInfo {
            uuid: self.inner.uuid.clone(),
            root_url: self.inner.root_url.url.clone(),
            capabilities: self
                .inner
                .config
                .capabilities
                .iter()
                .map(|cap| cap.as_word().to_string())
                .collect(),
        }
    }

    /// Youngest committed revision.
    pub async fn youngest(&self) -> u64 {
        let state = self.inner.state.read().await;
        state.revisions.len() as u64 - 1
    }

    /// Every revision, oldest first.
    pub(crate) async fn history(&self) -> Vec<Arc<Revision>> {
        self.inner.state.read().await.revisions.clone()
    }

    /// A single revision; `None` means HEAD.
    pub(crate) async fn revision(&self, rev: Option<u64>) -> Result<Arc<Revision>, SvnError> {
        let state = self.inner.state.read().await;
        select_revision(&state.revisions, rev).cloned()
    }

    /// Applies a transaction on top of HEAD and appends the new revision.
    ///
    /// Nothing is changed unless every command applies cleanly and every
    /// affected lock is satisfied.
    pub(crate) async fn commit(&self, request: CommitRequest) -> Result<CommitInfo, SvnError> {
        let mut state = self.inner.state.write().await;
        let mut txn = Txn::new(state.revisions.clone());
        for cmd in &request.commands {
            txn.apply(cmd)?;
        }
        let new_rev = txn.new_rev();
        let (root, changes) = txn.finish();
        check_locks(&state.locks, &changes, &request)?;
        let released = release_locks(&mut state.locks, &root, &changes, &request);

        let date = now_string();
        let mut props = request.rev_props;
        props.insert(PROP_DATE.to_string(), date.clone().into_bytes());
        match &request.author {
            Some(author) => {
                props.insert(PROP_AUTHOR.to_string(), author.clone().into_bytes());
            }
            None => {
                props.remove(PROP_AUTHOR);
            }
        }

        let change_count = changes.len();
        state.revisions.push(Arc::new(Revision {
            number: new_rev,
            root,
            props,
            changes,
        }));
        debug!(
            new_rev,
            changes = change_count,
            released_locks = released,
            author = request.author.as_deref().unwrap_or(""),
            "committed revision"
        );
        Ok(CommitInfo {
            new_rev,
            date: Some(date),
            author: request.author,
        })
    }

    /// Sets (or with `value == None` deletes) a revision property.
    ///
    /// With `expected_old == Some(old)` the change only applies if the
    /// property currently has value `old` (`None` meaning absent).
    pub(crate) async fn change_rev_prop(
        &self,
        rev: u64,
        name: &str,
        value: Option<Vec<u8>>,
        expected_old: Option<Option<Vec<u8>>>,
    ) -> Result<(), SvnError> {
        let mut state = self.inner.state.write().await;
        let revision = state
            .revisions
            .get_mut(rev as usize)
            .ok_or(SvnError::NoSuchRevision(rev))?;
        if !self.inner.config.allow_rev_prop_changes {
            return Err(SvnError::Policy(format!(
                "Disabled repository feature: revision property '{name}' cannot be changed"
            )));
        }
        if let Some(expected) = expected_old
            && revision.props.get(name) != expected.as_ref()
        {
            return Err(SvnError::PropertyConflict {
                rev,
                name: name.to_string(),
            });
        }
        let revision = Arc::make_mut(revision);
        match value {
            Some(value) => {
                revision.props.insert(name.to_string(), value);
            }
            None => {
                revision.props.remove(name);
            }
        }
        debug!(rev, name, "changed revision property");
        Ok(())
    }

    /// Youngest revision committed at or before `date` (0 if none).
    pub(crate) async fn dated_rev(&self, date: DateTime<Utc>) -> u64 {
        let state = self.inner.state.read().await;
        state
            .revisions
            .iter()
            .rev()
            .find(|revision| revision.date().is_some_and(|d| d <= date))
            .map_or(0, |revision| revision.number)
    }

    /// Locks the file at the repository-relative `path` for `owner`.
    pub(crate) async fn lock(
        &self,
        path: &str,
        owner: &str,
        options: &LockOptions,
    ) -> Result<LockDesc, SvnError> {
        let mut state = self.inner.state.write().await;
        let head = head(&state.revisions)?;
        let node = head
            .root
            .lookup(path)
            .ok_or_else(|| SvnError::not_found(path, head.number))?;
        if node.kind() != NodeKind::File {
            return Err(SvnError::KindMismatch {
                path: path.to_string(),
                expected: NodeKind::File,
                found: node.kind(),
            });
        }
        if let Some(current_rev) = options.current_rev {
            if current_rev > head.number {
                return Err(SvnError::NoSuchRevision(current_rev));
            }
            if node.created_rev() > current_rev {
                return Err(SvnError::OutOfDate {
                    path: path.to_string(),
                    base_rev: current_rev,
                    changed_rev: node.created_rev(),
                });
            }
        }
        if let Some(existing) = state.locks.get(path)
            && !options.steal_lock
        {
            return Err(SvnError::Locked {
                path: path.to_string(),
                owner: existing.owner.clone(),
            });
        }
        let lock = LockDesc {
            path: path.to_string(),
            token: format!("opaquelocktoken:{}", uuid::Uuid::new_v4()),
            owner: owner.to_string(),
            comment: options.comment.clone(),
            created: now_string(),
        };
        state.locks.insert(path.to_string(), lock.clone());
        debug!(path, owner, stolen = options.steal_lock, "locked path");
        Ok(lock)
    }

    /// Removes the lock on `path`.
    pub(crate) async fn unlock(
        &self,
        path: &str,
        user: Option<&str>,
        options: &UnlockOptions,
    ) -> Result<(), SvnError> {
        let mut state = self.inner.state.write().await;
        let Some(lock) = state.locks.get(path) else {
            return Err(SvnError::InvalidArgument(format!("no lock on path '{path}'")));
        };
        if !options.break_lock {
            let token_ok = options.token.as_deref() == Some(lock.token.as_str());
            let owner_ok = user == Some(lock.owner.as_str());
            if !token_ok || !owner_ok {
                return Err(SvnError::Locked {
                    path: path.to_string(),
                    owner: lock.owner.clone(),
                });
            }
        }
        state.locks.remove(path);
        debug!(path, broken = options.break_lock, "unlocked path");
        Ok(())
    }

    pub(crate) async fn get_lock(&self, path: &str) -> Option<LockDesc> {
        self.inner.state.read().await.locks.get(path).cloned()
    }

    /// Locks on `path` and beneath it, limited by `depth`.
    pub(crate) async fn get_locks(&self, path: &str, depth: Depth) -> Vec<LockDesc> {
        let state = self.inner.state.read().await;
        state
            .locks
            .values()
            .filter(|lock| {
                let Some(rest) = path::skip_ancestor(path, &lock.path) else {
                    return false;
                };
                match depth {
                    _ if rest.is_empty() => true,
                    Depth::Empty => false,
                    Depth::Files | Depth::Immediates => !rest.contains('/'),
                    Depth::Infinity => true,
                }
            })
            .cloned()
            .collect()
    }
}

fn head(revisions: &[Arc<Revision>]) -> Result<&Arc<Revision>, SvnError> {
    revisions
        .last()
        .ok_or_else(|| SvnError::InvalidState("repository has no revisions".into()))
}

pub(crate) fn select_revision(
    revisions: &[Arc<Revision>],
    rev: Option<u64>,
) -> Result<&Arc<Revision>, SvnError> {
    match rev {
        None => head(revisions),
        Some(rev) => revisions
            .get(rev as usize)
            .ok_or(SvnError::NoSuchRevision(rev)),
    }
}

fn touches_lock(change: &ChangedPath, lock_path: &str) -> bool {
    if change.path == lock_path {
        return true;
    }
    matches!(change.action.as_str(), "D" | "R") && path::is_ancestor(&change.path, lock_path)
}

fn check_locks(
    locks: &BTreeMap<String, LockDesc>,
    changes: &[ChangedPath],
    request: &CommitRequest,
) -> Result<(), SvnError> {
    for lock in locks.values() {
        if !changes.iter().any(|change| touches_lock(change, &lock.path)) {
            continue;
        }
        let token_ok = request.lock_tokens.get(&lock.path) == Some(&lock.token);
        let owner_ok = request.author.as_deref() == Some(lock.owner.as_str());
        if !token_ok || !owner_ok {
            return Err(SvnError::Locked {
                path: lock.path.clone(),
                owner: lock.owner.clone(),
            });
        }
    }
    Ok(())
}

/// Drops locks whose tokens were presented for committed paths, and locks
/// whose files no longer exist. Returns the number of released locks.
fn release_locks(
    locks: &mut BTreeMap<String, LockDesc>,
    root: &Node,
    changes: &[ChangedPath],
    request: &CommitRequest,
) -> usize {
    let before = locks.len();
    locks.retain(|path, lock| {
        if root.kind_at(path) != NodeKind::File {
            return false;
        }
        if request.keep_locks {
            return true;
        }
        let presented = request.lock_tokens.get(path) == Some(&lock.token);
        !(presented && changes.iter().any(|change| touches_lock(change, path)))
    });
    before - locks.len()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::editor::FileText;

    fn run_async<T>(f: impl std::future::Future<Output = T>) -> T {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f)
    }

    fn add_file(path: &str, text: &str) -> EditorCommand {
        EditorCommand::AddFile {
            path: path.into(),
            text: FileText::new(text.as_bytes()),
            props: PropertyList::new(),
            replaces_rev: None,
        }
    }

    fn request(commands: Vec<EditorCommand>, author: &str) -> CommitRequest {
        CommitRequest {
            commands,
            author: Some(author.to_string()),
            ..CommitRequest::default()
        }
    }

    #[test]
    fn commit_appends_revision_with_props() {
        run_async(async {
            let repos = Repository::create("svn://example.com/repo").unwrap();
            let info = repos
                .commit(request(vec![add_file("iota", "iota\n")], "jrandom"))
                .await
                .unwrap();
            assert_eq!(info.new_rev, 1);
            assert_eq!(info.author.as_deref(), Some("jrandom"));
            assert_eq!(repos.youngest().await, 1);

            let r1 = repos.revision(Some(1)).await.unwrap();
            assert_eq!(r1.prop_string(PROP_AUTHOR).as_deref(), Some("jrandom"));
            assert!(r1.date().is_some());
            assert_eq!(r1.root.kind_at("iota"), NodeKind::File);
            assert!(matches!(
                repos.revision(Some(5)).await.unwrap_err(),
                SvnError::NoSuchRevision(5)
            ));
        });
    }

    #[test]
    fn failed_commit_changes_nothing() {
        run_async(async {
            let repos = Repository::create("svn://example.com/repo").unwrap();
            let err = repos
                .commit(request(
                    vec![add_file("iota", "iota\n"), add_file("missing/x", "x")],
                    "jrandom",
                ))
                .await
                .unwrap_err();
            assert!(matches!(err, SvnError::NotFound { .. }));
            assert_eq!(repos.youngest().await, 0);
        });
    }

    #[test]
    fn empty_commit_still_creates_a_revision() {
        run_async(async {
            let repos = Repository::create("svn://example.com/repo").unwrap();
            let info = repos.commit(CommitRequest::default()).await.unwrap();
            assert_eq!(info.new_rev, 1);
            assert!(repos.revision(None).await.unwrap().changes.is_empty());
        });
    }

    #[test]
    fn locks_guard_commits() {
        run_async(async {
            let repos = Repository::create("svn://example.com/repo").unwrap();
            repos
                .commit(request(vec![add_file("iota", "iota\n")], "jrandom"))
                .await
                .unwrap();
            let lock = repos
                .lock("iota", "jrandom", &LockOptions::new().with_comment("mine"))
                .await
                .unwrap();
            assert!(lock.token.starts_with("opaquelocktoken:"));

            let edit = || EditorCommand::AlterFile {
                path: "iota".into(),
                rev: 1,
                text: Some(FileText::new(&b"changed\n"[..])),
                props: None,
            };
            let err = repos
                .commit(request(vec![edit()], "jrandom"))
                .await
                .unwrap_err();
            assert!(matches!(err, SvnError::Locked { .. }));

            let mut with_token = request(vec![edit()], "jrandom");
            with_token
                .lock_tokens
                .insert("iota".into(), lock.token.clone());
            let mut other_user = with_token.clone();
            other_user.author = Some("harry".into());
            assert!(repos.commit(other_user).await.is_err());

            repos.commit(with_token).await.unwrap();
            assert!(repos.get_lock("iota").await.is_none());
        });
    }

    #[test]
    fn lock_rules() {
        run_async(async {
            let repos = Repository::create("svn://example.com/repo").unwrap();
            repos
                .commit(request(
                    vec![
                        EditorCommand::AddDirectory {
                            path: "A".into(),
                            children: Vec::new(),
                            props: PropertyList::new(),
                            replaces_rev: None,
                        },
                        add_file("A/mu", "mu\n"),
                    ],
                    "jrandom",
                ))
                .await
                .unwrap();
            assert!(matches!(
                repos.lock("A", "jrandom", &LockOptions::new()).await,
                Err(SvnError::KindMismatch { .. })
            ));
            assert!(matches!(
                repos.lock("nope", "jrandom", &LockOptions::new()).await,
                Err(SvnError::NotFound { .. })
            ));
            let first = repos.lock("A/mu", "jrandom", &LockOptions::new()).await.unwrap();
            assert!(matches!(
                repos.lock("A/mu", "harry", &LockOptions::new()).await,
                Err(SvnError::Locked { .. })
            ));
            let stolen = repos
                .lock("A/mu", "harry", &LockOptions::new().steal_lock())
                .await
                .unwrap();
            assert_ne!(first.token, stolen.token);

            assert_eq!(repos.get_locks("", Depth::Infinity).await.len(), 1);
            assert_eq!(repos.get_locks("", Depth::Immediates).await.len(), 0);
            assert_eq!(repos.get_locks("A", Depth::Files).await.len(), 1);

            let wrong = UnlockOptions::new().with_token(first.token);
            assert!(repos.unlock("A/mu", Some("harry"), &wrong).await.is_err());
            repos
                .unlock("A/mu", None, &UnlockOptions::new().break_lock())
                .await
                .unwrap();
            assert!(matches!(
                repos.unlock("A/mu", None, &UnlockOptions::new()).await,
                Err(SvnError::InvalidArgument(_))
            ));
        });
    }

    #[test]
    fn rev_prop_changes_follow_policy() {
        run_async(async {
            let frozen = Repository::create("svn://example.com/repo").unwrap();
            let err = frozen
                .change_rev_prop(0, PROP_LOG, Some(b"x".to_vec()), None)
                .await
                .unwrap_err();
            assert!(matches!(err, SvnError::Policy(_)));

            let open = Repository::create_with_config(
                "svn://example.com/repo",
                ReposConfig::new().allow_rev_prop_changes(),
            )
            .unwrap();
            open.change_rev_prop(0, PROP_LOG, Some(b"first".to_vec()), Some(None))
                .await
                .unwrap();
            let err = open
                .change_rev_prop(0, PROP_LOG, Some(b"second".to_vec()), Some(None))
                .await
                .unwrap_err();
            assert!(matches!(err, SvnError::PropertyConflict { rev: 0, .. }));
            let r0 = open.revision(Some(0)).await.unwrap();
            assert_eq!(r0.prop_string(PROP_LOG).as_deref(), Some("first"));
        });
    }

    #[test]
    fn dated_rev_finds_youngest_before_date() {
        run_async(async {
            let repos = Repository::create("svn://example.com/repo").unwrap();
            repos.commit(CommitRequest::default()).await.unwrap();
            assert_eq!(repos.dated_rev(Utc::now()).await, 1);
            let long_ago = DateTime::parse_from_rfc3339("2000-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc);
            assert_eq!(repos.dated_rev(long_ago).await, 0);
        });
    }
}
