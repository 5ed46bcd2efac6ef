use tracing::debug;

use crate::{
    Depth, RaSession, Report, ReportCommand, StatusHandler, StatusOptions, SvnError, SvnUrl,
};

/// A single-use description of the client's tree, compared against the
/// repository on [`StatusReporter::finish_report`].
///
/// Created by [`RaSession::status`]. The first call must be
/// [`StatusReporter::set_path`] for `""` (the status target); later calls
/// refine the baseline of individual subtrees, which makes mixed-revision
/// and sparse trees expressible.
///
/// Dropping a reporter without finishing it abandons the report; the
/// handler is never called.
pub struct StatusReporter<'s, H: StatusHandler> {
    session: &'s mut RaSession,
    options: StatusOptions,
    handler: H,
    report: Report,
    finished: bool,
}

impl<'s, H: StatusHandler> StatusReporter<'s, H> {
    pub(crate) fn new(session: &'s mut RaSession, options: StatusOptions, handler: H) -> Self {
        Self {
            session,
            options,
            handler,
            report: Report::new(),
            finished: false,
        }
    }

    /// Declares that the client has `path` at `rev`, populated to `depth`.
    ///
    /// With `start_empty`, the node's children are absent from the baseline
    /// unless reported separately.
    pub fn set_path(
        &mut self,
        path: &str,
        rev: u64,
        depth: Depth,
        start_empty: bool,
        lock_token: Option<&str>,
    ) -> Result<(), SvnError> {
        self.report.push(ReportCommand::SetPath {
            path: path.to_string(),
            rev,
            start_empty,
            lock_token: lock_token.map(str::to_string),
            depth,
        })?;
        Ok(())
    }

    /// Declares that `path` is missing from the client's tree.
    pub fn delete_path(&mut self, path: &str) -> Result<(), SvnError> {
        self.report.push(ReportCommand::DeletePath {
            path: path.to_string(),
        })?;
        Ok(())
    }

    /// Declares that the client's `path` holds `url` at `rev` (a switched
    /// subtree).
    pub fn link_path(
        &mut self,
        path: &str,
        url: &SvnUrl,
        rev: u64,
        depth: Depth,
        start_empty: bool,
        lock_token: Option<&str>,
    ) -> Result<(), SvnError> {
        self.report.push(ReportCommand::LinkPath {
            path: path.to_string(),
            url: url.url.clone(),
            rev,
            start_empty,
            lock_token: lock_token.map(str::to_string),
            depth,
        })?;
        Ok(())
    }

    /// Report commands collected so far.
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Compares the reported tree with the repository, delivering every
    /// difference to the handler, and returns the revision compared
    /// against.
    ///
    /// A report naming a missing path or revision fails before the handler
    /// is called.
    pub async fn finish_report(mut self) -> Result<u64, SvnError> {
        self.finished = true;
        self.session
            .run_status(&self.options, &self.report, &mut self.handler)
            .await
    }

    /// Abandons the report without calling the handler.
    pub fn abort_report(mut self) {
        self.abandon("aborted");
    }

    /// Releases the reporter. Never fails.
    pub fn dispose(mut self) {
        self.abandon("disposed");
    }

    fn abandon(&mut self, reason: &str) {
        if self.finished {
            return;
        }
        self.finished = true;
        debug!(
            status_target = %self.options.target,
            commands = self.report.commands.len(),
            reason,
            "status report abandoned"
        );
    }
}

impl<H: StatusHandler> Drop for StatusReporter<'_, H> {
    fn drop(&mut self) {
        self.abandon("dropped");
    }
}

impl<H: StatusHandler> std::fmt::Debug for StatusReporter<'_, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusReporter")
            .field("target", &self.options.target)
            .field("rev", &self.options.rev)
            .field("depth", &self.options.depth)
            .field("report", &self.report)
            .field("finished", &self.finished)
            .finish()
    }
}
