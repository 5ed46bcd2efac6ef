//! Remote repository access for Subversion-style repositories.
//!
//! This crate models the client side of Subversion's remote access layer
//! against an in-process, versioned repository: a staged commit editor
//! ([`CommitEditor`]) that turns tree edits into one atomic revision, and a
//! status reporter ([`StatusReporter`]) that compares a client-described
//! tree with a committed revision. Around those two sit the usual session
//! operations (log, properties, locks, listings).
//!
//! Most users should start with [`RaClient`] to open a [`RaSession`].
//!
//! ## Getting started
//!
//! ```rust
//! use svn_ra::{CommitOptions, FileText, PropertyList, RaClient, Repository};
//!
//! fn main() -> svn_ra::Result<()> {
//!     let rt = tokio::runtime::Builder::new_current_thread()
//!         .enable_all()
//!         .build()?;
//!
//!     rt.block_on(async {
//!         let repos = Repository::create("svn://example.com/repo")?;
//!         let client = RaClient::new(repos.clone(), repos.root_url().clone())
//!             .with_username("jrandom");
//!
//!         let mut session = client.open_session().await?;
//!         let mut editor = session
//!             .commit_editor(&CommitOptions::new("add iota"))
//!             .await?;
//!         let text = FileText::new(&b"This is the file 'iota'.\n"[..]);
//!         editor
//!             .add_file("iota", text.checksum, &text.contents[..], PropertyList::new(), None)
//!             .await?;
//!         let info = editor.complete().await?;
//!         assert_eq!(info.new_rev, 1);
//!         Ok(())
//!     })
//! }
//! ```
//!
//! ## Features
//!
//! - `serde`: enables `Serialize`/`Deserialize` for public data types.
//!
//! ## Concurrency
//!
//! A [`Repository`] handle is cheap to clone and can be shared by any number
//! of sessions and tasks. An editor or reporter borrows its session mutably,
//! so at most one of them is pending per session.

#![deny(unsafe_code)]

mod client;
mod commit;
mod editor;
mod error;
mod highlevel;
mod options;
mod path;
mod repos;
mod status;
mod subst;
mod types;
mod url;

pub use client::{RaClient, RaSession};
pub use commit::CommitEditor;
pub use editor::{
    EditorCommand, FileText, Report, ReportCommand, StatusEvent, StatusHandler,
};
pub use error::{ErrorKind, SvnError};
/// Convenience alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, SvnError>;
pub use options::{
    CommitLockToken, CommitOptions, GetFileOptions, ListOptions, LockOptions, LogOptions,
    LogRevProps, ReposConfig, StatusOptions, UnlockOptions,
};
pub use repos::Repository;
pub use status::StatusReporter;
pub use subst::{EolStyle, Keywords};
pub use types::{
    BlameLine, Capability, ChangedPath, Checksum, ChecksumKind, CommitInfo, Depth, DirEntry,
    DirListing, DirentField, FileRev, FileRevContents, GetFileResult, LockDesc, LogEntry,
    NodeKind, PropDelta, PropertyList, RepositoryInfo, StatEntry,
};
pub use url::SvnUrl;
