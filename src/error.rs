use thiserror::Error;

use crate::NodeKind;

/// Broad error categories used to classify [`SvnError`] values.
///
/// Several concrete errors map to the same category; for example both
/// [`SvnError::OutOfDate`] and [`SvnError::AlreadyExists`] are conflicts.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A path or revision does not exist.
    NotFound,
    /// The request conflicts with the current repository state.
    Conflict,
    /// The operation is not implemented.
    NotImplemented,
    /// The object the operation was invoked on can no longer accept it.
    InvalidState,
    /// The repository refused the request.
    Policy,
    /// Anything else (bad input, I/O).
    Other,
}

#[derive(Debug, Error)]
#[non_exhaustive]
/// Errors returned by this crate.
pub enum SvnError {
    /// The provided URL is syntactically invalid or outside the repository.
    #[error("invalid svn url: {0}")]
    InvalidUrl(String),
    /// The provided repository path is invalid or unsafe.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// An I/O error occurred while reading or writing file contents.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The revision is newer than the youngest revision.
    #[error("no such revision {0}")]
    NoSuchRevision(u64),
    /// The path does not exist at the given revision.
    #[error("filesystem has no item: '{path}'@{rev}")]
    NotFound {
        /// Repository path.
        path: String,
        /// Revision that was searched.
        rev: u64,
    },
    /// A node already exists where one was about to be added.
    #[error("path already exists: '{0}'")]
    AlreadyExists(String),
    /// The node exists but has the wrong kind for the operation.
    #[error("expected {expected} at '{path}' (got {found})")]
    KindMismatch {
        /// Repository path.
        path: String,
        /// Kind required by the operation.
        expected: NodeKind,
        /// Kind actually found.
        found: NodeKind,
    },
    /// The node changed after the base revision asserted by the caller.
    #[error("out of date: '{path}' was changed in r{changed_rev} (base r{base_rev})")]
    OutOfDate {
        /// Repository path.
        path: String,
        /// Base revision asserted by the caller.
        base_rev: u64,
        /// Revision that last changed the node.
        changed_rev: u64,
    },
    /// File contents do not match the supplied checksum.
    #[error("checksum mismatch for '{path}': expected {expected}, actual {actual}")]
    ChecksumMismatch {
        /// Repository path.
        path: String,
        /// Checksum supplied by the caller (hex).
        expected: String,
        /// Checksum of the received contents (hex).
        actual: String,
    },
    /// An atomic revision property change found an unexpected old value.
    #[error("revision property '{name}' on r{rev} has an unexpected value")]
    PropertyConflict {
        /// Revision number.
        rev: u64,
        /// Property name.
        name: String,
    },
    /// The path is locked and no usable lock token was supplied.
    #[error("path '{path}' is locked by '{owner}'")]
    Locked {
        /// Locked repository path.
        path: String,
        /// Lock owner.
        owner: String,
    },
    /// The operation is not implemented.
    #[error("not implemented: {operation}")]
    NotImplemented {
        /// Name of the operation, for example `CommitEditor.add_symlink`.
        operation: &'static str,
    },
    /// The editor or reporter can no longer accept the request.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// An argument is not acceptable for this repository or operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The repository refused the request by policy.
    #[error("rejected by repository policy: {0}")]
    Policy(String),
}

impl SvnError {
    /// Returns the broad category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoSuchRevision(_) | Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists(_)
            | Self::KindMismatch { .. }
            | Self::OutOfDate { .. }
            | Self::ChecksumMismatch { .. }
            | Self::PropertyConflict { .. }
            | Self::Locked { .. } => ErrorKind::Conflict,
            Self::NotImplemented { .. } => ErrorKind::NotImplemented,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Policy(_) => ErrorKind::Policy,
            Self::InvalidUrl(_)
            | Self::InvalidPath(_)
            | Self::Io(_)
            | Self::InvalidArgument(_) => ErrorKind::Other,
        }
    }

    /// Returns `true` if this error reports a stale base revision or a
    /// concurrent modification.
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    pub(crate) fn not_found(path: &str, rev: u64) -> Self {
        Self::NotFound {
            path: path.to_string(),
            rev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_groups_conflicts() {
        let err = SvnError::OutOfDate {
            path: "iota".into(),
            base_rev: 1,
            changed_rev: 2,
        };
        assert!(err.is_conflict());
        assert!(SvnError::AlreadyExists("A".into()).is_conflict());
        assert!(!SvnError::not_found("A", 1).is_conflict());
        assert_eq!(SvnError::not_found("A", 1).kind(), ErrorKind::NotFound);
    }

    #[test]
    fn not_implemented_names_the_operation() {
        let err = SvnError::NotImplemented {
            operation: "CommitEditor.add_symlink",
        };
        assert_eq!(err.to_string(), "not implemented: CommitEditor.add_symlink");
        assert_eq!(err.kind(), ErrorKind::NotImplemented);
    }

    #[test]
    fn not_found_message_names_path_and_revision() {
        let err = SvnError::not_found("X", 1);
        assert_eq!(err.to_string(), "filesystem has no item: 'X'@1");
    }
}
