//! Types for commit and status-report flows.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::path::{validate_rel_dir_path, validate_rel_path};
use crate::{Checksum, Depth, PropertyList, SvnError};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
/// Client-to-server report commands used by [`crate::StatusReporter`].
///
/// Paths are relative to the status target.
pub enum ReportCommand {
    /// Describes the baseline of a path.
    SetPath {
        /// Path relative to the status target (`""` is the target).
        path: String,
        /// Revision the client has for this path.
        rev: u64,
        /// Whether this path should start empty.
        start_empty: bool,
        /// Optional lock token the client holds.
        lock_token: Option<String>,
        /// Depth of the client's copy of this path.
        depth: Depth,
    },
    /// Marks a path as absent from the baseline.
    DeletePath {
        /// Path relative to the status target.
        path: String,
    },
    /// Describes a path whose baseline comes from another repository location.
    LinkPath {
        /// Path relative to the status target.
        path: String,
        /// URL the baseline comes from.
        url: String,
        /// Revision of `url`.
        rev: u64,
        /// Whether this path should start empty.
        start_empty: bool,
        /// Optional lock token the client holds.
        lock_token: Option<String>,
        /// Depth of the client's copy of this path.
        depth: Depth,
    },
}

impl ReportCommand {
    /// Path the command describes.
    pub fn path(&self) -> &str {
        match self {
            Self::SetPath { path, .. }
            | Self::DeletePath { path }
            | Self::LinkPath { path, .. } => path,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// A sequence of [`ReportCommand`] values.
pub struct Report {
    /// Commands in the report. The first command must be a
    /// [`ReportCommand::SetPath`] for `""`.
    pub commands: Vec<ReportCommand>,
}

impl Report {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Appends a command to the report.
    ///
    /// The path is canonicalized; the first command must set the target
    /// itself.
    pub fn push(&mut self, cmd: ReportCommand) -> Result<&mut Self, SvnError> {
        let cmd = match cmd {
            ReportCommand::SetPath {
                path,
                rev,
                start_empty,
                lock_token,
                depth,
            } => ReportCommand::SetPath {
                path: validate_rel_dir_path(&path)?,
                rev,
                start_empty,
                lock_token,
                depth,
            },
            ReportCommand::DeletePath { path } => ReportCommand::DeletePath {
                path: validate_rel_path(&path)?,
            },
            ReportCommand::LinkPath {
                path,
                url,
                rev,
                start_empty,
                lock_token,
                depth,
            } => ReportCommand::LinkPath {
                path: validate_rel_dir_path(&path)?,
                url,
                rev,
                start_empty,
                lock_token,
                depth,
            },
        };
        let is_root_set = matches!(&cmd, ReportCommand::SetPath { path, .. } if path.is_empty());
        if self.commands.is_empty() && !is_root_set {
            return Err(SvnError::InvalidArgument(
                "a report must start by setting the target path ''".into(),
            ));
        }
        self.commands.push(cmd);
        Ok(self)
    }

    /// Returns `true` if no commands were pushed.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
/// Full text of a file along with the checksum the caller computed for it.
pub struct FileText {
    /// Checksum of `contents` (MD5 or SHA-1).
    pub checksum: Checksum,
    /// File contents.
    pub contents: Vec<u8>,
}

impl FileText {
    /// Wraps `contents`, computing its SHA-1 checksum.
    pub fn new(contents: impl Into<Vec<u8>>) -> Self {
        let contents = contents.into();
        Self {
            checksum: Checksum::sha1(&contents),
            contents,
        }
    }

    /// Reads `reader` to the end, keeping the caller's checksum.
    ///
    /// The checksum is verified when the text is applied, not here.
    pub async fn read_from<R: AsyncRead + Unpin + ?Sized>(
        checksum: Checksum,
        reader: &mut R,
    ) -> Result<Self, SvnError> {
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).await?;
        Ok(Self { checksum, contents })
    }
}

/// Staged tree edits replayed by [`crate::RaSession::commit`].
///
/// Paths are relative to the session URL. Every command carries the base
/// revision the caller believes is current for the node it touches:
/// `rev` must not be older than the node's last change, and `replaces_rev`
/// names the revision of a node being replaced (`None` means the
/// destination must not exist).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditorCommand {
    /// Adds a directory.
    AddDirectory {
        /// Path of the new directory.
        path: String,
        /// Child names the caller intends to add (informational).
        children: Vec<String>,
        /// Initial properties.
        props: PropertyList,
        /// Revision of the node being replaced, if any.
        replaces_rev: Option<u64>,
    },
    /// Adds a file.
    AddFile {
        /// Path of the new file.
        path: String,
        /// File contents and checksum.
        text: FileText,
        /// Initial properties.
        props: PropertyList,
        /// Revision of the node being replaced, if any.
        replaces_rev: Option<u64>,
    },
    /// Changes an existing directory.
    AlterDirectory {
        /// Directory path.
        path: String,
        /// Base revision.
        rev: u64,
        /// New child ordering (informational).
        children: Option<Vec<String>>,
        /// Replacement property list.
        props: Option<PropertyList>,
    },
    /// Changes an existing file.
    AlterFile {
        /// File path.
        path: String,
        /// Base revision.
        rev: u64,
        /// Replacement contents.
        text: Option<FileText>,
        /// Replacement property list.
        props: Option<PropertyList>,
    },
    /// Copies `src_path@src_rev` to `dst_path`.
    Copy {
        /// Copy source.
        src_path: String,
        /// Committed revision of the source.
        src_rev: u64,
        /// Copy destination.
        dst_path: String,
        /// Revision of the node being replaced, if any.
        replaces_rev: Option<u64>,
    },
    /// Moves `src_path` to `dst_path`.
    Move {
        /// Move source.
        src_path: String,
        /// Base revision of the source.
        src_rev: u64,
        /// Move destination.
        dst_path: String,
        /// Revision of the node being replaced, if any.
        replaces_rev: Option<u64>,
    },
    /// Deletes a node and its subtree.
    Delete {
        /// Path to delete.
        path: String,
        /// Base revision.
        rev: u64,
    },
}

impl EditorCommand {
    /// Short command name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddDirectory { .. } => "add-directory",
            Self::AddFile { .. } => "add-file",
            Self::AlterDirectory { .. } => "alter-directory",
            Self::AlterFile { .. } => "alter-file",
            Self::Copy { .. } => "copy",
            Self::Move { .. } => "move",
            Self::Delete { .. } => "delete",
        }
    }

    /// Rewrites every path of the command to be relative to the repository
    /// root, given the session's repository-relative `base`.
    pub(crate) fn rebase(self, base: &str) -> Result<Self, SvnError> {
        let node = |p: &str| -> Result<String, SvnError> {
            Ok(crate::path::join(base, &validate_rel_dir_path(p)?))
        };
        Ok(match self {
            Self::AddDirectory {
                path,
                children,
                props,
                replaces_rev,
            } => Self::AddDirectory {
                path: node(&path)?,
                children,
                props,
                replaces_rev,
            },
            Self::AddFile {
                path,
                text,
                props,
                replaces_rev,
            } => Self::AddFile {
                path: node(&path)?,
                text,
                props,
                replaces_rev,
            },
            Self::AlterDirectory {
                path,
                rev,
                children,
                props,
            } => Self::AlterDirectory {
                path: node(&path)?,
                rev,
                children,
                props,
            },
            Self::AlterFile {
                path,
                rev,
                text,
                props,
            } => Self::AlterFile {
                path: node(&path)?,
                rev,
                text,
                props,
            },
            Self::Copy {
                src_path,
                src_rev,
                dst_path,
                replaces_rev,
            } => Self::Copy {
                src_path: node(&src_path)?,
                src_rev,
                dst_path: node(&dst_path)?,
                replaces_rev,
            },
            Self::Move {
                src_path,
                src_rev,
                dst_path,
                replaces_rev,
            } => Self::Move {
                src_path: node(&src_path)?,
                src_rev,
                dst_path: node(&dst_path)?,
                replaces_rev,
            },
            Self::Delete { path, rev } => Self::Delete {
                path: node(&path)?,
                rev,
            },
        })
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
/// One difference between a reported baseline and the repository.
///
/// Paths are relative to the status target (`""` is the target itself).
pub enum StatusEvent {
    /// A directory exists in the repository but not in the baseline.
    AddedDirectory {
        /// Node path.
        path: String,
    },
    /// A file exists in the repository but not in the baseline.
    AddedFile {
        /// Node path.
        path: String,
    },
    /// A symlink (a file with `svn:special`) exists in the repository but
    /// not in the baseline.
    AddedSymlink {
        /// Node path.
        path: String,
    },
    /// A directory differs from the baseline.
    ModifiedDirectory {
        /// Node path.
        path: String,
        /// Whether anything beneath the directory differs.
        children_modified: bool,
        /// Whether the directory's properties differ.
        props_modified: bool,
    },
    /// A file differs from the baseline.
    ModifiedFile {
        /// Node path.
        path: String,
        /// Whether the contents differ.
        text_modified: bool,
        /// Whether the properties differ.
        props_modified: bool,
    },
    /// A symlink differs from the baseline.
    ModifiedSymlink {
        /// Node path.
        path: String,
        /// Whether the link target differs.
        target_modified: bool,
        /// Whether the properties differ.
        props_modified: bool,
    },
    /// A node exists in the baseline but not in the repository.
    Deleted {
        /// Node path.
        path: String,
    },
}

impl StatusEvent {
    /// Path the event describes.
    pub fn path(&self) -> &str {
        match self {
            Self::AddedDirectory { path }
            | Self::AddedFile { path }
            | Self::AddedSymlink { path }
            | Self::ModifiedDirectory { path, .. }
            | Self::ModifiedFile { path, .. }
            | Self::ModifiedSymlink { path, .. }
            | Self::Deleted { path } => path,
        }
    }
}

/// Receiver for [`StatusEvent`] values delivered by
/// [`crate::StatusReporter::finish_report`].
pub trait StatusHandler {
    /// Called once per difference, on the caller's task.
    ///
    /// Returning an error stops delivery and fails the report.
    fn on_status(&mut self, event: StatusEvent) -> Result<(), SvnError>;
}

impl StatusHandler for Vec<StatusEvent> {
    fn on_status(&mut self, event: StatusEvent) -> Result<(), SvnError> {
        self.push(event);
        Ok(())
    }
}

impl<H: StatusHandler + ?Sized> StatusHandler for &mut H {
    fn on_status(&mut self, event: StatusEvent) -> Result<(), SvnError> {
        (**self).on_status(event)
    }
}
