use std::fmt;

use tokio::io::AsyncRead;
use tracing::{debug, trace};

use crate::repos::txn::Txn;
use crate::{
    Checksum, CommitInfo, CommitOptions, EditorCommand, FileText, PropertyList, RaSession,
    SvnError,
};

type CommitCallback<'s> = Box<dyn FnOnce(&CommitInfo) + Send + 's>;

/// A pending commit: a single-use, staged set of tree edits that becomes
/// one new revision on [`CommitEditor::complete`].
///
/// Created by [`RaSession::commit_editor`]. Every edit is checked as it is
/// made against a private copy of HEAD plus the edits staged so far; the
/// first failing edit poisons the editor, after which every further edit
/// and `complete` fail with [`SvnError::InvalidState`]. Nothing reaches the
/// repository until `complete`, which replays the staged edits against the
/// HEAD current at that moment, so an edit whose base revision was
/// overtaken by another commit fails the whole transaction.
///
/// Dropping an editor without completing it abandons the transaction.
pub struct CommitEditor<'s> {
    session: &'s mut RaSession,
    options: CommitOptions,
    staging: Txn,
    commands: Vec<EditorCommand>,
    failed: Option<String>,
    callback: Option<CommitCallback<'s>>,
    done: bool,
}

impl<'s> CommitEditor<'s> {
    pub(crate) fn new(session: &'s mut RaSession, options: CommitOptions, staging: Txn) -> Self {
        Self {
            session,
            options,
            staging,
            commands: Vec::new(),
            failed: None,
            callback: None,
            done: false,
        }
    }

    /// Registers a callback invoked with the [`CommitInfo`] of a successful
    /// commit, on the caller's task, before `complete` returns.
    #[must_use]
    pub fn with_callback(mut self, callback: impl FnOnce(&CommitInfo) + Send + 's) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Youngest revision at the time the editor was opened.
    pub fn base_rev(&self) -> u64 {
        self.staging.new_rev().saturating_sub(1)
    }

    /// Edits staged so far, with repository-relative paths.
    pub fn staged(&self) -> &[EditorCommand] {
        &self.commands
    }

    /// Returns `true` once an edit has failed.
    pub fn is_poisoned(&self) -> bool {
        self.failed.is_some()
    }

    /// Adds a directory at `path`.
    ///
    /// `replaces_rev` names the revision of an existing node to replace;
    /// `None` requires `path` to be absent.
    pub async fn add_directory(
        &mut self,
        path: &str,
        children: Vec<String>,
        props: PropertyList,
        replaces_rev: Option<u64>,
    ) -> Result<(), SvnError> {
        self.stage(EditorCommand::AddDirectory {
            path: path.to_string(),
            children,
            props,
            replaces_rev,
        })
    }

    /// Adds a file at `path`, reading its contents from `contents`.
    ///
    /// The contents must match `checksum` (MD5 or SHA-1).
    pub async fn add_file<R: AsyncRead + Unpin>(
        &mut self,
        path: &str,
        checksum: Checksum,
        mut contents: R,
        props: PropertyList,
        replaces_rev: Option<u64>,
    ) -> Result<(), SvnError> {
        self.ensure_usable()?;
        let text = match FileText::read_from(checksum, &mut contents).await {
            Ok(text) => text,
            Err(err) => return Err(self.poison(err)),
        };
        self.stage(EditorCommand::AddFile {
            path: path.to_string(),
            text,
            props,
            replaces_rev,
        })
    }

    /// Changes the properties (and informational child list) of the
    /// directory at `path`, last changed at or before `rev`.
    pub async fn alter_directory(
        &mut self,
        path: &str,
        rev: u64,
        children: Option<Vec<String>>,
        props: Option<PropertyList>,
    ) -> Result<(), SvnError> {
        self.stage(EditorCommand::AlterDirectory {
            path: path.to_string(),
            rev,
            children,
            props,
        })
    }

    /// Replaces the contents and/or properties of the file at `path`, last
    /// changed at or before `rev`.
    ///
    /// New contents are read from the stream in `contents` and must match
    /// its checksum. `None` keeps the current contents.
    pub async fn alter_file(
        &mut self,
        path: &str,
        rev: u64,
        contents: Option<(Checksum, &mut (dyn AsyncRead + Unpin + Send))>,
        props: Option<PropertyList>,
    ) -> Result<(), SvnError> {
        self.ensure_usable()?;
        let text = match contents {
            Some((checksum, reader)) => match FileText::read_from(checksum, reader).await {
                Ok(text) => Some(text),
                Err(err) => return Err(self.poison(err)),
            },
            None => None,
        };
        self.stage(EditorCommand::AlterFile {
            path: path.to_string(),
            rev,
            text,
            props,
        })
    }

    /// Copies `src_path` as it was in `src_rev` to `dst_path`.
    pub async fn copy(
        &mut self,
        src_path: &str,
        src_rev: u64,
        dst_path: &str,
        replaces_rev: Option<u64>,
    ) -> Result<(), SvnError> {
        self.stage(EditorCommand::Copy {
            src_path: src_path.to_string(),
            src_rev,
            dst_path: dst_path.to_string(),
            replaces_rev,
        })
    }

    /// Moves `src_path`, unchanged since `src_rev`, to `dst_path`.
    pub async fn move_node(
        &mut self,
        src_path: &str,
        src_rev: u64,
        dst_path: &str,
        replaces_rev: Option<u64>,
    ) -> Result<(), SvnError> {
        self.stage(EditorCommand::Move {
            src_path: src_path.to_string(),
            src_rev,
            dst_path: dst_path.to_string(),
            replaces_rev,
        })
    }

    /// Deletes the node at `path` and everything beneath it.
    pub async fn delete(&mut self, path: &str, rev: u64) -> Result<(), SvnError> {
        self.stage(EditorCommand::Delete {
            path: path.to_string(),
            rev,
        })
    }

    /// Symlinks cannot be created through this editor.
    ///
    /// Always fails with [`SvnError::NotImplemented`]; the editor stays
    /// usable.
    pub async fn add_symlink(
        &mut self,
        path: &str,
        target: &str,
        props: PropertyList,
        replaces_rev: Option<u64>,
    ) -> Result<(), SvnError> {
        self.ensure_usable()?;
        debug!(path, target, props = props.len(), ?replaces_rev, "add_symlink unsupported");
        Err(SvnError::NotImplemented {
            operation: "CommitEditor.add_symlink",
        })
    }

    /// Symlinks cannot be changed through this editor.
    ///
    /// Always fails with [`SvnError::NotImplemented`]; the editor stays
    /// usable.
    pub async fn alter_symlink(
        &mut self,
        path: &str,
        rev: u64,
        target: Option<&str>,
        props: Option<PropertyList>,
    ) -> Result<(), SvnError> {
        self.ensure_usable()?;
        debug!(path, rev, ?target, props = props.is_some(), "alter_symlink unsupported");
        Err(SvnError::NotImplemented {
            operation: "CommitEditor.alter_symlink",
        })
    }

    /// Commits every staged edit as one new revision.
    ///
    /// An editor with no edits still creates a revision. On failure nothing
    /// is committed.
    pub async fn complete(mut self) -> Result<CommitInfo, SvnError> {
        self.ensure_usable()?;
        let commands = std::mem::take(&mut self.commands);
        let info = self.session.commit_rebased(&self.options, commands).await?;
        self.done = true;
        if let Some(callback) = self.callback.take() {
            callback(&info);
        }
        Ok(info)
    }

    /// Abandons the transaction. Never fails.
    pub fn dispose(mut self) {
        self.abort("disposed");
    }

    fn ensure_usable(&self) -> Result<(), SvnError> {
        match &self.failed {
            Some(reason) => Err(SvnError::InvalidState(format!(
                "commit editor is unusable after an earlier failure: {reason}"
            ))),
            None => Ok(()),
        }
    }

    fn poison(&mut self, err: SvnError) -> SvnError {
        debug!(error = %err, staged = self.commands.len(), "commit editor poisoned");
        self.failed = Some(err.to_string());
        err
    }

    fn stage(&mut self, cmd: EditorCommand) -> Result<(), SvnError> {
        self.ensure_usable()?;
        let staged = cmd
            .rebase(self.session.base_path())
            .and_then(|cmd| self.staging.apply(&cmd).map(|()| cmd));
        match staged {
            Ok(cmd) => {
                trace!(command = cmd.name(), staged = self.commands.len() + 1, "staged edit");
                self.commands.push(cmd);
                Ok(())
            }
            Err(err) => Err(self.poison(err)),
        }
    }

    fn abort(&mut self, reason: &str) {
        if self.done {
            return;
        }
        self.done = true;
        debug!(
            url = %self.session.session_url(),
            staged = self.commands.len(),
            reason,
            "commit editor aborted"
        );
    }
}

impl Drop for CommitEditor<'_> {
    fn drop(&mut self) {
        self.abort("dropped");
    }
}

impl fmt::Debug for CommitEditor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitEditor")
            .field("session_url", &self.session.session_url().url)
            .field("base_rev", &self.base_rev())
            .field("staged", &self.commands.len())
            .field("failed", &self.failed)
            .field("has_callback", &self.callback.is_some())
            .field("done", &self.done)
            .finish()
    }
}
