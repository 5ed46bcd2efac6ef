use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::commit::CommitEditor;
use crate::path::{self, validate_rel_dir_path, validate_rel_path};
use crate::repos::delta::{self, StatusScope};
use crate::repos::history::{self, LogQuery};
use crate::repos::tree::Node;
use crate::repos::txn::Txn;
use crate::repos::{
    CommitRequest, PROP_AUTHOR, PROP_DATE, PROP_LOG, Repository, Revision, select_revision,
};
use crate::status::StatusReporter;
use crate::{
    Capability, CommitInfo, CommitOptions, Depth, DirEntry, DirListing, DirentField,
    EditorCommand, FileRevContents, GetFileOptions, GetFileResult, ListOptions, LockDesc,
    LockOptions, LogEntry, LogOptions, LogRevProps, NodeKind, PropertyList, Report,
    RepositoryInfo, StatEntry, StatusHandler, StatusOptions, SvnError, SvnUrl, UnlockOptions,
};

const ENTRY_COMMITTED_REV: &str = "svn:entry:committed-rev";
const ENTRY_COMMITTED_DATE: &str = "svn:entry:committed-date";
const ENTRY_LAST_AUTHOR: &str = "svn:entry:last-author";
const ENTRY_UUID: &str = "svn:entry:uuid";

/// A reusable configuration object for opening sessions on a [`Repository`].
///
/// Use [`RaClient::open_session`] to create a [`RaSession`].
#[derive(Clone, Debug)]
pub struct RaClient {
    repos: Repository,
    base_url: SvnUrl,
    username: Option<String>,
    ra_client: String,
}

/// A stateful session rooted at a URL inside a repository.
///
/// Operations take `&mut self` and run serially. Paths passed to session
/// operations are relative to [`RaSession::session_url`].
#[derive(Clone, Debug)]
pub struct RaSession {
    client: RaClient,
    session_url: SvnUrl,
    base_path: String,
}

impl RaClient {
    /// Creates a client configuration for a URL inside `repos`.
    ///
    /// The URL is checked when a session is opened.
    pub fn new(repos: Repository, base_url: SvnUrl) -> Self {
        Self {
            repos,
            base_url,
            username: None,
            ra_client: "svn-ra".to_string(),
        }
    }

    /// Returns the repository this client opens sessions on.
    pub fn repository(&self) -> &Repository {
        &self.repos
    }

    /// Returns the configured base URL.
    pub fn base_url(&self) -> &SvnUrl {
        &self.base_url
    }

    /// Returns the configured username, if any.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the configured client identification string.
    pub fn ra_client(&self) -> &str {
        &self.ra_client
    }

    /// Sets the username used as commit author and lock owner.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the client identification string recorded in session logs.
    #[must_use]
    pub fn with_ra_client(mut self, ra_client: impl Into<String>) -> Self {
        self.ra_client = ra_client.into();
        self
    }

    /// Opens a session at [`RaClient::base_url`].
    ///
    /// Fails with [`SvnError::InvalidUrl`] if the URL is not inside the
    /// repository.
    pub async fn open_session(&self) -> Result<RaSession, SvnError> {
        let base_path = relative_to_root(&self.repos, &self.base_url)?;
        debug!(
            url = %self.base_url,
            user = self.username.as_deref().unwrap_or(""),
            ra_client = %self.ra_client,
            "opened session"
        );
        Ok(RaSession {
            client: self.clone(),
            session_url: self.base_url.clone(),
            base_path,
        })
    }

    /// Convenience wrapper for [`RaSession::get_latest_rev`].
    pub async fn get_latest_rev(&self) -> Result<u64, SvnError> {
        let mut session = self.open_session().await?;
        session.get_latest_rev().await
    }

    /// Convenience wrapper for [`RaSession::check_path`].
    pub async fn check_path(&self, path: &str, rev: Option<u64>) -> Result<NodeKind, SvnError> {
        let mut session = self.open_session().await?;
        session.check_path(path, rev).await
    }

    /// Convenience wrapper for [`RaSession::get_file`].
    pub async fn get_file<W: AsyncWrite + Unpin>(
        &self,
        path: &str,
        rev: Option<u64>,
        out: &mut W,
    ) -> Result<u64, SvnError> {
        let mut session = self.open_session().await?;
        session.get_file(path, rev, out).await
    }

    /// Convenience wrapper for [`RaSession::list_dir`].
    pub async fn list_dir(&self, path: &str, rev: Option<u64>) -> Result<DirListing, SvnError> {
        let mut session = self.open_session().await?;
        session.list_dir(path, rev).await
    }

    /// Convenience wrapper for [`RaSession::log`].
    pub async fn log(&self, start_rev: u64, end_rev: u64) -> Result<Vec<LogEntry>, SvnError> {
        let mut session = self.open_session().await?;
        session.log(start_rev, end_rev).await
    }

    /// Convenience wrapper for [`RaSession::log_with_options`].
    pub async fn log_with_options(&self, options: &LogOptions) -> Result<Vec<LogEntry>, SvnError> {
        let mut session = self.open_session().await?;
        session.log_with_options(options).await
    }

    /// Convenience wrapper for [`RaSession::commit`].
    pub async fn commit(
        &self,
        options: &CommitOptions,
        commands: Vec<EditorCommand>,
    ) -> Result<CommitInfo, SvnError> {
        let mut session = self.open_session().await?;
        session.commit(options, commands).await
    }
}

fn relative_to_root(repos: &Repository, url: &SvnUrl) -> Result<String, SvnError> {
    repos
        .root_url()
        .relative(url)
        .map(str::to_string)
        .ok_or_else(|| {
            SvnError::InvalidUrl(format!(
                "'{url}' is not inside repository '{}'",
                repos.root_url()
            ))
        })
}

impl RaSession {
    /// Returns the [`RaClient`] configuration used to create this session.
    pub fn client(&self) -> &RaClient {
        &self.client
    }

    /// Returns the repository this session is bound to.
    pub fn repository(&self) -> &Repository {
        &self.client.repos
    }

    /// Returns the session URL.
    pub fn session_url(&self) -> &SvnUrl {
        &self.session_url
    }

    /// Returns the repository root URL.
    pub fn repos_root_url(&self) -> &SvnUrl {
        self.client.repos.root_url()
    }

    /// Returns the repository UUID.
    pub fn repos_uuid(&self) -> &str {
        self.client.repos.uuid()
    }

    /// Returns repository metadata.
    pub fn repository_info(&self) -> RepositoryInfo {
        self.client.repos.info()
    }

    /// Returns `true` if the repository advertises the given capability.
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.client.repos.has_capability(capability)
    }

    pub(crate) fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Repository-relative form of a session-relative path.
    pub(crate) fn repos_path(&self, path: &str) -> Result<String, SvnError> {
        Ok(path::join(&self.base_path, &validate_rel_dir_path(path)?))
    }

    fn repos_node_path(&self, path: &str) -> Result<String, SvnError> {
        Ok(path::join(&self.base_path, &validate_rel_path(path)?))
    }

    /// Moves the session to another URL inside the same repository.
    pub async fn reparent(&mut self, new_url: SvnUrl) -> Result<(), SvnError> {
        let base_path = relative_to_root(&self.client.repos, &new_url)?;
        debug!(from = %self.session_url, to = %new_url, "reparented session");
        self.session_url = new_url;
        self.base_path = base_path;
        Ok(())
    }

    /// Returns the path of `url` relative to the session URL.
    pub fn session_relative_path(&self, url: &SvnUrl) -> Result<String, SvnError> {
        self.session_url
            .relative(url)
            .map(str::to_string)
            .ok_or_else(|| {
                SvnError::InvalidUrl(format!(
                    "'{url}' is not a child of session URL '{}'",
                    self.session_url
                ))
            })
    }

    /// Returns the path of `url` relative to the repository root.
    pub fn repos_relative_path(&self, url: &SvnUrl) -> Result<String, SvnError> {
        relative_to_root(&self.client.repos, url)
    }

    /// Returns the latest (HEAD) revision number.
    pub async fn get_latest_rev(&mut self) -> Result<u64, SvnError> {
        Ok(self.client.repos.youngest().await)
    }

    /// Returns the youngest revision committed at or before `date`.
    pub async fn get_dated_rev(&mut self, date: DateTime<Utc>) -> Result<u64, SvnError> {
        Ok(self.client.repos.dated_rev(date).await)
    }

    /// Returns the kind of the node at `path` (`None` means HEAD).
    pub async fn check_path(&mut self, path: &str, rev: Option<u64>) -> Result<NodeKind, SvnError> {
        let path = self.repos_path(path)?;
        let revision = self.client.repos.revision(rev).await?;
        Ok(revision.root.kind_at(&path))
    }

    /// Returns metadata for the node at `path`, or `None` if it does not exist.
    pub async fn stat(&mut self, path: &str, rev: Option<u64>) -> Result<Option<StatEntry>, SvnError> {
        let path = self.repos_path(path)?;
        let history = self.client.repos.history().await;
        let revision = select_revision(&history, rev)?;
        let Some(node) = revision.root.lookup(&path) else {
            return Ok(None);
        };
        let (created_date, last_author) = last_change(&history, node);
        Ok(Some(StatEntry {
            kind: node.kind(),
            size: node.as_file().map(|file| file.contents.len() as u64),
            has_props: !node.props().is_empty(),
            created_rev: node.created_rev(),
            created_date,
            last_author,
        }))
    }

    /// Writes the contents of the file at `path` to `out` and returns the
    /// number of bytes written.
    pub async fn get_file<W: AsyncWrite + Unpin>(
        &mut self,
        path: &str,
        rev: Option<u64>,
        out: &mut W,
    ) -> Result<u64, SvnError> {
        let result = self
            .get_file_with_options(path, &GetFileOptions::new(rev), out)
            .await?;
        Ok(result.bytes_written)
    }

    /// Like [`RaSession::get_file`], returning the served revision, checksum
    /// and (optionally) properties.
    pub async fn get_file_with_result<W: AsyncWrite + Unpin>(
        &mut self,
        path: &str,
        rev: Option<u64>,
        want_props: bool,
        out: &mut W,
    ) -> Result<GetFileResult, SvnError> {
        let mut options = GetFileOptions::new(rev);
        options.want_props = want_props;
        self.get_file_with_options(path, &options, out).await
    }

    /// Fetches a file with a [`GetFileOptions`] builder.
    pub async fn get_file_with_options<W: AsyncWrite + Unpin>(
        &mut self,
        path: &str,
        options: &GetFileOptions,
        out: &mut W,
    ) -> Result<GetFileResult, SvnError> {
        let path = self.repos_path(path)?;
        let history = self.client.repos.history().await;
        let revision = select_revision(&history, options.rev)?;
        let node = revision
            .root
            .lookup(&path)
            .ok_or_else(|| SvnError::not_found(&path, revision.number))?;
        let Some(file) = node.as_file() else {
            return Err(SvnError::KindMismatch {
                path,
                expected: NodeKind::File,
                found: node.kind(),
            });
        };
        let size = file.contents.len() as u64;
        if let Some(max_bytes) = options.max_bytes
            && size > max_bytes
        {
            return Err(SvnError::InvalidArgument(format!(
                "file '{path}' ({size} bytes) exceeds limit {max_bytes}"
            )));
        }
        out.write_all(&file.contents).await?;
        out.flush().await?;

        let props = if options.want_props {
            self.node_props(&history, node)
        } else {
            PropertyList::new()
        };
        debug!(path = %path, rev = revision.number, bytes = size, "fetched file");
        Ok(GetFileResult {
            rev: revision.number,
            checksum: Some(file.md5.clone()),
            props,
            bytes_written: size,
        })
    }

    /// Reads a whole file into memory.
    pub(crate) async fn file_contents(
        &mut self,
        path: &str,
        rev: Option<u64>,
    ) -> Result<(GetFileResult, Vec<u8>), SvnError> {
        let mut contents = Vec::new();
        let result = self
            .get_file_with_options(path, &GetFileOptions::new(rev).with_props(), &mut contents)
            .await?;
        Ok((result, contents))
    }

    /// Lists a directory with every [`DirentField`].
    pub async fn list_dir(&mut self, path: &str, rev: Option<u64>) -> Result<DirListing, SvnError> {
        self.list_dir_with_fields(path, rev, &DirentField::ALL).await
    }

    /// Lists a directory, filling in only the requested entry fields.
    pub async fn list_dir_with_fields(
        &mut self,
        path: &str,
        rev: Option<u64>,
        fields: &[DirentField],
    ) -> Result<DirListing, SvnError> {
        let path = self.repos_path(path)?;
        let history = self.client.repos.history().await;
        let revision = select_revision(&history, rev)?;
        let node = revision
            .root
            .lookup(&path)
            .ok_or_else(|| SvnError::not_found(&path, revision.number))?;
        let Some(dir) = node.as_dir() else {
            return Err(SvnError::KindMismatch {
                path,
                expected: NodeKind::Dir,
                found: node.kind(),
            });
        };
        let entries = dir
            .entries
            .iter()
            .map(|(name, child)| dirent(&history, name, name.clone(), child, fields))
            .collect();
        Ok(DirListing {
            rev: revision.number,
            entries,
            props: self.node_props(&history, node),
        })
    }

    /// Lists `options.path` and its descendants down to `options.depth`.
    ///
    /// The first entry is the listed node itself (path `""`); the rest
    /// follow in depth-first, name-sorted order.
    pub async fn list(&mut self, options: &ListOptions) -> Result<Vec<DirEntry>, SvnError> {
        let path = self.repos_path(&options.path)?;
        let history = self.client.repos.history().await;
        let revision = select_revision(&history, options.rev)?;
        let node = revision
            .root
            .lookup(&path)
            .ok_or_else(|| SvnError::not_found(&path, revision.number))?;
        let name = path::split(&path).map_or("", |(_, name)| name);
        let mut out = vec![dirent(&history, name, String::new(), node, &options.fields)];
        list_children(&history, node, "", options.depth, &options.fields, &mut out);
        Ok(out)
    }

    /// Returns the regular properties of the node at `path`, or `None` if the
    /// node does not exist.
    pub async fn proplist(
        &mut self,
        path: &str,
        rev: Option<u64>,
    ) -> Result<Option<PropertyList>, SvnError> {
        let path = self.repos_path(path)?;
        let revision = self.client.repos.revision(rev).await?;
        Ok(revision.root.lookup(&path).map(|node| node.props().clone()))
    }

    /// Returns a single node property.
    pub async fn propget(
        &mut self,
        path: &str,
        name: &str,
        rev: Option<u64>,
    ) -> Result<Option<Vec<u8>>, SvnError> {
        let props = self.proplist(path, rev).await?;
        Ok(props.and_then(|mut props| props.remove(name)))
    }

    /// Returns all revision properties for `rev`.
    pub async fn rev_proplist(&mut self, rev: u64) -> Result<PropertyList, SvnError> {
        let revision = self.client.repos.revision(Some(rev)).await?;
        Ok(revision.props.clone())
    }

    /// Returns a single revision property value.
    pub async fn rev_prop(&mut self, rev: u64, name: &str) -> Result<Option<Vec<u8>>, SvnError> {
        let revision = self.client.repos.revision(Some(rev)).await?;
        Ok(revision.props.get(name).cloned())
    }

    /// Sets or deletes a revision property unconditionally.
    pub async fn change_rev_prop(
        &mut self,
        rev: u64,
        name: &str,
        value: Option<Vec<u8>>,
    ) -> Result<(), SvnError> {
        self.client
            .repos
            .change_rev_prop(rev, name, value, None)
            .await
    }

    /// Sets or deletes a revision property, optionally only if its current
    /// value is `previous_value` (`None` meaning absent).
    ///
    /// The conditional form (`dont_care == false`) requires the repository
    /// to support [`Capability::AtomicRevProps`].
    pub async fn change_rev_prop2(
        &mut self,
        rev: u64,
        name: &str,
        value: Option<Vec<u8>>,
        dont_care: bool,
        previous_value: Option<Vec<u8>>,
    ) -> Result<(), SvnError> {
        if dont_care && previous_value.is_some() {
            return Err(SvnError::InvalidArgument(
                "change_rev_prop2 previous_value must be None when dont_care is true".into(),
            ));
        }
        if !dont_care && !self.has_capability(Capability::AtomicRevProps) {
            return Err(SvnError::InvalidArgument(
                "repository does not support atomic revision property changes".into(),
            ));
        }
        let expected = (!dont_care).then_some(previous_value);
        self.client
            .repos
            .change_rev_prop(rev, name, value, expected)
            .await
    }

    /// Returns the lock on `path`, if any.
    pub async fn get_lock(&mut self, path: &str) -> Result<Option<LockDesc>, SvnError> {
        let path = self.repos_node_path(path)?;
        Ok(self.client.repos.get_lock(&path).await)
    }

    /// Returns the locks on `path` and beneath it, limited by `depth`.
    pub async fn get_locks(&mut self, path: &str, depth: Depth) -> Result<Vec<LockDesc>, SvnError> {
        let path = self.repos_path(path)?;
        Ok(self.client.repos.get_locks(&path, depth).await)
    }

    /// Locks a file for the session user.
    pub async fn lock(&mut self, path: &str, options: &LockOptions) -> Result<LockDesc, SvnError> {
        let Some(owner) = self.client.username.clone() else {
            return Err(SvnError::InvalidArgument(
                "locking requires a username".into(),
            ));
        };
        let path = self.repos_node_path(path)?;
        self.client.repos.lock(&path, &owner, options).await
    }

    /// Releases a lock.
    pub async fn unlock(&mut self, path: &str, options: &UnlockOptions) -> Result<(), SvnError> {
        let path = self.repos_node_path(path)?;
        self.client
            .repos
            .unlock(&path, self.client.username.as_deref(), options)
            .await
    }

    /// Convenience wrapper for [`RaSession::log_with_options`] over a revision range.
    pub async fn log(&mut self, start_rev: u64, end_rev: u64) -> Result<Vec<LogEntry>, SvnError> {
        let options = LogOptions::between(start_rev, end_rev);
        self.log_with_options(&options).await
    }

    /// Returns the log of the target paths with a [`LogOptions`] builder.
    ///
    /// Fails with [`SvnError::NotFound`] if a target path does not exist at
    /// the younger end of the range.
    pub async fn log_with_options(
        &mut self,
        options: &LogOptions,
    ) -> Result<Vec<LogEntry>, SvnError> {
        let history = self.client.repos.history().await;
        let head = select_revision(&history, None)?.number;
        let start = options.start_rev.unwrap_or(head);
        let end = options.end_rev.unwrap_or(head);
        for rev in [start, end] {
            if rev > head {
                return Err(SvnError::NoSuchRevision(rev));
            }
        }
        let paths = if options.target_paths.is_empty() {
            vec![self.base_path.clone()]
        } else {
            options
                .target_paths
                .iter()
                .map(|path| self.repos_path(path))
                .collect::<Result<Vec<_>, _>>()?
        };
        let revprops = if self.has_capability(Capability::LogRevProps) {
            options.revprops.clone()
        } else {
            standard_revprops(&options.revprops)
        };
        let entries = history::log(
            &history,
            &LogQuery {
                paths: &paths,
                start,
                end,
                strict_node: options.strict_node,
                changed_paths: options.changed_paths,
                limit: options.limit,
                revprops: &revprops,
            },
        )?;
        debug!(start, end, paths = ?paths, entries = entries.len(), "log");
        Ok(entries)
    }

    /// Returns the interesting revisions of a file with full contents,
    /// oldest first (`None` means HEAD).
    pub async fn get_file_revs(
        &mut self,
        path: &str,
        start_rev: Option<u64>,
        end_rev: Option<u64>,
    ) -> Result<Vec<FileRevContents>, SvnError> {
        let path = self.repos_node_path(path)?;
        let history = self.client.repos.history().await;
        let head = select_revision(&history, None)?.number;
        history::file_revs(
            &history,
            &path,
            start_rev.unwrap_or(head),
            end_rev.unwrap_or(head),
        )
    }

    /// Opens a commit editor on this session.
    ///
    /// Edits are validated as they are made against HEAD at the time the
    /// editor was opened; [`CommitEditor::complete`] replays them against
    /// the HEAD current at that point.
    pub async fn commit_editor(
        &mut self,
        options: &CommitOptions,
    ) -> Result<CommitEditor<'_>, SvnError> {
        self.check_commit_options(options)?;
        let staging = Txn::new(self.client.repos.history().await);
        debug!(
            url = %self.session_url,
            base_rev = staging.new_rev().saturating_sub(1),
            "opened commit editor"
        );
        Ok(CommitEditor::new(self, options.clone(), staging))
    }

    /// Commits a prepared list of editor commands as one revision.
    ///
    /// Command paths are relative to the session URL. Either every command
    /// applies and a new revision is created, or nothing changes.
    pub async fn commit(
        &mut self,
        options: &CommitOptions,
        commands: Vec<EditorCommand>,
    ) -> Result<CommitInfo, SvnError> {
        let commands = commands
            .into_iter()
            .map(|cmd| cmd.rebase(&self.base_path))
            .collect::<Result<Vec<_>, _>>()?;
        self.commit_rebased(options, commands).await
    }

    /// Commits commands whose paths are already repository-relative.
    pub(crate) async fn commit_rebased(
        &mut self,
        options: &CommitOptions,
        commands: Vec<EditorCommand>,
    ) -> Result<CommitInfo, SvnError> {
        self.check_commit_options(options)?;
        let mut rev_props = options.rev_props.clone();
        rev_props.insert(PROP_LOG.to_string(), options.log_message.as_bytes().to_vec());
        let lock_tokens = options
            .lock_tokens
            .iter()
            .map(|lock| Ok((self.repos_node_path(&lock.path)?, lock.token.clone())))
            .collect::<Result<BTreeMap<_, _>, SvnError>>()?;
        let command_count = commands.len();
        let info = self
            .client
            .repos
            .commit(CommitRequest {
                commands,
                rev_props,
                author: self.client.username.clone(),
                lock_tokens,
                keep_locks: options.keep_locks,
            })
            .await?;
        debug!(
            new_rev = info.new_rev,
            commands = command_count,
            url = %self.session_url,
            "commit finished"
        );
        Ok(info)
    }

    fn check_commit_options(&self, options: &CommitOptions) -> Result<(), SvnError> {
        let has_custom_revprops = options.rev_props.keys().any(|name| name != PROP_LOG);
        if has_custom_revprops && !self.has_capability(Capability::CommitRevProps) {
            return Err(SvnError::InvalidArgument(
                "repository does not support setting revision properties during commit".into(),
            ));
        }
        Ok(())
    }

    /// Starts a status report against `options.target`.
    ///
    /// Describe the client's tree with [`StatusReporter::set_path`] and
    /// friends, then call [`StatusReporter::finish_report`] to receive the
    /// differences through `handler`.
    pub fn status<H: StatusHandler>(
        &mut self,
        options: &StatusOptions,
        handler: H,
    ) -> Result<StatusReporter<'_, H>, SvnError> {
        validate_rel_dir_path(&options.target)?;
        debug!(status_target = %options.target, depth = options.depth.as_word(), "started status report");
        Ok(StatusReporter::new(self, options.clone(), handler))
    }

    /// Runs a complete status report and returns the revision compared
    /// against.
    ///
    /// Every event is computed before the first `handler` call, so a bad
    /// report fails without delivering anything.
    pub async fn run_status<H: StatusHandler + ?Sized>(
        &mut self,
        options: &StatusOptions,
        report: &Report,
        handler: &mut H,
    ) -> Result<u64, SvnError> {
        let target = self.repos_path(&options.target)?;
        let history = self.client.repos.history().await;
        let rev = select_revision(&history, options.rev)?.number;
        let events = delta::status(
            &history,
            self.client.repos.root_url(),
            StatusScope {
                target: &target,
                rev,
                depth: options.depth,
            },
            report,
        )?;
        debug!(
            status_target = %target,
            rev,
            commands = report.commands.len(),
            events = events.len(),
            "status report finished"
        );
        for event in events {
            handler.on_status(event)?;
        }
        Ok(rev)
    }

    /// Regular properties plus the `svn:entry:*` properties of `node`.
    fn node_props(&self, history: &[Arc<Revision>], node: &Node) -> PropertyList {
        let mut props = node.props().clone();
        let (date, author) = last_change(history, node);
        props.insert(
            ENTRY_COMMITTED_REV.to_string(),
            node.created_rev().to_string().into_bytes(),
        );
        if let Some(date) = date {
            props.insert(ENTRY_COMMITTED_DATE.to_string(), date.into_bytes());
        }
        if let Some(author) = author {
            props.insert(ENTRY_LAST_AUTHOR.to_string(), author.into_bytes());
        }
        props.insert(
            ENTRY_UUID.to_string(),
            self.client.repos.uuid().as_bytes().to_vec(),
        );
        props
    }
}

/// Revision properties a repository without `log-revprops` can return.
fn standard_revprops(requested: &LogRevProps) -> LogRevProps {
    let standard = [PROP_AUTHOR, PROP_DATE, PROP_LOG];
    match requested {
        LogRevProps::All => {
            LogRevProps::Custom(standard.iter().map(|name| name.to_string()).collect())
        }
        LogRevProps::Custom(names) => LogRevProps::Custom(
            names
                .iter()
                .filter(|name| standard.contains(&name.as_str()))
                .cloned()
                .collect(),
        ),
    }
}

/// Date and author of the revision that last changed `node`.
fn last_change(history: &[Arc<Revision>], node: &Node) -> (Option<String>, Option<String>) {
    match history.get(node.created_rev() as usize) {
        Some(revision) => (
            revision.prop_string(PROP_DATE),
            revision.prop_string(PROP_AUTHOR),
        ),
        None => (None, None),
    }
}

fn dirent(
    history: &[Arc<Revision>],
    name: &str,
    path: String,
    node: &Node,
    fields: &[DirentField],
) -> DirEntry {
    let want = |field: DirentField| fields.contains(&field);
    let (date, author) = last_change(history, node);
    DirEntry {
        name: name.to_string(),
        path,
        kind: node.kind(),
        size: if want(DirentField::Size) {
            node.as_file().map(|file| file.contents.len() as u64)
        } else {
            None
        },
        has_props: want(DirentField::HasProps).then(|| !node.props().is_empty()),
        created_rev: want(DirentField::CreatedRev).then(|| node.created_rev()),
        created_date: date.filter(|_| want(DirentField::Time)),
        last_author: author.filter(|_| want(DirentField::LastAuthor)),
    }
}

fn list_children(
    history: &[Arc<Revision>],
    node: &Node,
    prefix: &str,
    depth: Depth,
    fields: &[DirentField],
    out: &mut Vec<DirEntry>,
) {
    let Some(dir) = node.as_dir() else {
        return;
    };
    for (name, child) in &dir.entries {
        let include = match child.kind() {
            NodeKind::Dir => depth.for_child_dir().is_some(),
            _ => depth.includes_files(),
        };
        if !include {
            continue;
        }
        let child_path = path::join(prefix, name);
        out.push(dirent(history, name, child_path.clone(), child, fields));
        if depth == Depth::Infinity {
            list_children(history, child, &child_path, depth, fields, out);
        }
    }
}
