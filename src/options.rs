//! Request parameters for session operations and repository setup.
//!
//! Every type starts from a constructor or `Default` and is refined with
//! consuming `with_*` methods.

use crate::{Capability, Depth, DirentField, PropertyList};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
/// Options for [`crate::RaSession::get_file_with_options`].
pub struct GetFileOptions {
    /// `None` reads HEAD.
    pub rev: Option<u64>,
    /// Fill [`crate::GetFileResult::props`].
    pub want_props: bool,
    /// Refuse files larger than this instead of writing a prefix.
    pub max_bytes: Option<u64>,
}

impl GetFileOptions {
    /// Contents only, at `rev`.
    pub fn new(rev: Option<u64>) -> Self {
        Self {
            rev,
            want_props: false,
            max_bytes: None,
        }
    }

    pub fn with_props(mut self) -> Self {
        self.want_props = true;
        self
    }

    /// Fails with [`crate::SvnError::InvalidArgument`] for larger files.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
/// Revision properties to attach to each [`crate::LogEntry`].
pub enum LogRevProps {
    /// Everything the repository lets the session see.
    All,
    /// Only these names; an empty list leaves author, date and message
    /// unset too.
    Custom(Vec<String>),
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
/// Options for [`crate::RaSession::log_with_options`].
pub struct LogOptions {
    /// Session-relative paths whose history is wanted; empty means the
    /// session URL. Each must exist in the younger end of the range.
    pub target_paths: Vec<String>,
    /// Inclusive; `None` means HEAD. Entries run from here toward
    /// `end_rev`, so `start_rev > end_rev` lists youngest first.
    pub start_rev: Option<u64>,
    /// Inclusive; `None` means HEAD.
    pub end_rev: Option<u64>,
    pub changed_paths: bool,
    /// Do not follow a path back through the copy that created it.
    pub strict_node: bool,
    /// `0` means no limit.
    pub limit: u64,
    pub revprops: LogRevProps,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            target_paths: Vec::new(),
            start_rev: None,
            end_rev: None,
            changed_paths: false,
            strict_node: false,
            limit: 0,
            revprops: LogRevProps::All,
        }
    }
}

impl LogOptions {
    /// History between two revisions, both inclusive.
    pub fn between(start_rev: u64, end_rev: u64) -> Self {
        Self {
            start_rev: Some(start_rev),
            end_rev: Some(end_rev),
            ..Self::default()
        }
    }

    /// Follows these paths instead of the session URL.
    pub fn with_paths(mut self, target_paths: Vec<String>) -> Self {
        self.target_paths = target_paths;
        self
    }

    /// Fills [`crate::LogEntry::changed_paths`].
    pub fn with_changed_paths(mut self) -> Self {
        self.changed_paths = true;
        self
    }

    /// Stops each path's history at the copy that created it.
    pub fn strict_node(mut self) -> Self {
        self.strict_node = true;
        self
    }

    /// Returns at most `limit` entries.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_revprops(mut self, revprops: LogRevProps) -> Self {
        self.revprops = revprops;
        self
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
/// Options for [`crate::RaSession::list`].
pub struct ListOptions {
    /// Session-relative directory.
    pub path: String,
    /// `None` lists HEAD.
    pub rev: Option<u64>,
    pub depth: Depth,
    /// Columns to fill in beyond name and kind.
    pub fields: Vec<DirentField>,
}

impl ListOptions {
    /// Lists `path` at HEAD, names and kinds only.
    pub fn new(path: impl Into<String>, depth: Depth) -> Self {
        Self {
            path: path.into(),
            rev: None,
            depth,
            fields: Vec::new(),
        }
    }

    pub fn with_rev(mut self, rev: u64) -> Self {
        self.rev = Some(rev);
        self
    }

    /// Replaces the requested columns.
    pub fn with_fields(mut self, fields: Vec<DirentField>) -> Self {
        self.fields = fields;
        self
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
/// Options for [`crate::RaSession::status`].
pub struct StatusOptions {
    /// Session-relative directory the report describes. Reported paths and
    /// event paths are relative to it.
    pub target: String,
    /// Revision the report is compared against; `None` means HEAD.
    pub rev: Option<u64>,
    /// How far below the target differences are reported.
    pub depth: Depth,
}

impl StatusOptions {
    /// Compares `target` with HEAD down to `depth`.
    pub fn new(target: impl Into<String>, depth: Depth) -> Self {
        Self {
            target: target.into(),
            rev: None,
            depth,
        }
    }

    /// Compares with `rev` instead of HEAD.
    pub fn with_rev(mut self, rev: u64) -> Self {
        self.rev = Some(rev);
        self
    }
}

impl Default for StatusOptions {
    fn default() -> Self {
        Self::new("", Depth::Infinity)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Default)]
/// Options for [`crate::RaSession::lock`].
pub struct LockOptions {
    pub comment: Option<String>,
    /// Replace a lock held by someone else.
    pub steal_lock: bool,
    /// Revision of the file the caller has seen.
    pub current_rev: Option<u64>,
}

impl LockOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Takes the lock even if another user holds it.
    pub fn steal_lock(mut self) -> Self {
        self.steal_lock = true;
        self
    }

    /// Fails the lock with [`crate::SvnError::OutOfDate`] if the file
    /// changed after `current_rev`.
    pub fn with_current_rev(mut self, current_rev: u64) -> Self {
        self.current_rev = Some(current_rev);
        self
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Default)]
/// Options for [`crate::RaSession::unlock`].
pub struct UnlockOptions {
    /// Token returned by [`crate::RaSession::lock`]; required unless
    /// `break_lock` is set.
    pub token: Option<String>,
    /// Remove the lock regardless of owner and token.
    pub break_lock: bool,
}

impl UnlockOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Removes someone else's lock.
    pub fn break_lock(mut self) -> Self {
        self.break_lock = true;
        self
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
/// Proof that the committer holds the lock on `path`.
pub struct CommitLockToken {
    /// Session-relative path of the locked file.
    pub path: String,
    pub token: String,
}

impl CommitLockToken {
    pub fn new(path: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            token: token.into(),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
/// Options for [`crate::RaSession::commit_editor`] and
/// [`crate::RaSession::commit`].
///
/// `svn:log` always comes from `log_message` and `svn:author` from the
/// session username; `rev_props` may not override either.
pub struct CommitOptions {
    pub log_message: String,
    /// Tokens for locked files the commit touches.
    pub lock_tokens: Vec<CommitLockToken>,
    /// Leave presented locks in place after the commit.
    pub keep_locks: bool,
    /// Extra revision properties; needs [`Capability::CommitRevProps`].
    pub rev_props: PropertyList,
}

impl CommitOptions {
    /// A commit with message `log_message` and nothing else.
    pub fn new(log_message: impl Into<String>) -> Self {
        Self {
            log_message: log_message.into(),
            lock_tokens: Vec::new(),
            keep_locks: false,
            rev_props: PropertyList::new(),
        }
    }

    /// Presents `lock_tokens` with the commit.
    pub fn with_lock_tokens(mut self, lock_tokens: Vec<CommitLockToken>) -> Self {
        self.lock_tokens = lock_tokens;
        self
    }

    /// Keeps the presented locks instead of releasing them.
    pub fn keep_locks(mut self) -> Self {
        self.keep_locks = true;
        self
    }

    /// Attaches extra revision properties.
    pub fn with_rev_props(mut self, rev_props: PropertyList) -> Self {
        self.rev_props = rev_props;
        self
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
/// Configuration of a [`crate::Repository`].
pub struct ReposConfig {
    /// Capabilities the repository advertises.
    pub capabilities: Vec<Capability>,
    /// Whether revision properties may be changed after commit.
    pub allow_rev_prop_changes: bool,
    /// Fixed repository UUID; a random v4 UUID is generated when unset.
    pub uuid: Option<String>,
}

impl Default for ReposConfig {
    fn default() -> Self {
        Self {
            capabilities: Capability::ALL.to_vec(),
            allow_rev_prop_changes: false,
            uuid: None,
        }
    }
}

impl ReposConfig {
    /// Creates the default configuration: every capability, revision
    /// properties frozen after commit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the advertised capabilities.
    pub fn with_capabilities(mut self, capabilities: Vec<Capability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Allows revision property changes after commit.
    pub fn allow_rev_prop_changes(mut self) -> Self {
        self.allow_rev_prop_changes = true;
        self
    }

    /// Uses a fixed repository UUID.
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }
}
