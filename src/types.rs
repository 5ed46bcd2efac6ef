//! Values exchanged with a session: node metadata, log entries, locks,
//! checksums and the enums that parameterize requests.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use md5::Md5;
use sha1::{Digest, Sha1};

use crate::SvnError;

/// Node or revision properties, keyed by name.
///
/// Values are raw bytes; only `svn:*` properties are known to be text.
pub type PropertyList = BTreeMap<String, Vec<u8>>;

/// Identity and feature set of a repository, as seen by a session.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepositoryInfo {
    pub uuid: String,
    /// Canonical root URL.
    pub root_url: String,
    /// Advertised capabilities, as [`Capability::as_word`] strings.
    pub capabilities: Vec<String>,
}

/// A successful commit result returned by [`crate::CommitEditor::complete`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitInfo {
    /// Revision created by the commit.
    pub new_rev: u64,
    /// Value of `svn:date` on the new revision.
    pub date: Option<String>,
    /// Value of `svn:author`; `None` for anonymous sessions.
    pub author: Option<String>,
}

/// Result metadata returned by [`crate::RaSession::get_file_with_result`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetFileResult {
    /// Revision the contents were read from (HEAD resolved).
    pub rev: u64,
    /// MD5 of the full contents.
    pub checksum: Option<Checksum>,
    /// Node properties plus `svn:entry:*`; empty unless requested.
    pub props: PropertyList,
    pub bytes_written: u64,
}

/// One property change between consecutive file revisions.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropDelta {
    pub name: String,
    /// `None` when the property was removed.
    pub value: Option<Vec<u8>>,
}

/// A file revision entry as returned by [`crate::RaSession::get_file_revs`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRev {
    /// Path of the file in `rev`; differs from the requested path across
    /// copies.
    pub path: String,
    pub rev: u64,
    pub rev_props: PropertyList,
    /// Property changes relative to the previous entry.
    pub prop_deltas: Vec<PropDelta>,
    /// Whether the file text changed relative to the previous entry.
    pub text_changed: bool,
}

/// A [`FileRev`] together with the file's full text in that revision.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRevContents {
    pub file_rev: FileRev,
    pub contents: Vec<u8>,
}

/// One annotated line as returned by [`crate::RaSession::blame_file`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlameLine {
    /// Youngest revision in the range that introduced this line.
    pub rev: u64,
    /// `svn:author` of `rev`.
    pub author: Option<String>,
    /// `svn:date` of `rev`.
    pub date: Option<String>,
    /// Line text with its terminator, if any.
    pub line: String,
}

/// A lock held on a file. Locks never expire; they end with an unlock or a
/// commit that presents the token.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockDesc {
    /// Locked path, relative to the repository root.
    pub path: String,
    /// `opaquelocktoken:` URI identifying the lock.
    pub token: String,
    /// Username that took the lock.
    pub owner: String,
    pub comment: Option<String>,
    /// When the lock was taken (RFC 3339).
    pub created: String,
}

/// One revision of history, as returned by [`crate::RaSession::log`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub rev: u64,
    /// Every path the revision touched; only filled with
    /// [`crate::LogOptions::with_changed_paths`].
    pub changed_paths: Vec<ChangedPath>,
    /// `svn:author`, when selected.
    pub author: Option<String>,
    /// `svn:date`, when selected.
    pub date: Option<String>,
    /// `svn:log`, when selected.
    pub message: Option<String>,
    /// Every selected revision property, including the three above.
    pub rev_props: PropertyList,
}

/// How one path changed in a revision.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangedPath {
    /// `A`dded, `D`eleted, `M`odified or `R`eplaced.
    pub action: String,
    /// Absolute repository path (leading `/`).
    pub path: String,
    /// Source of a copy or move, absolute like `path`.
    pub copy_from_path: Option<String>,
    pub copy_from_rev: Option<u64>,
    pub node_kind: Option<NodeKind>,
    pub text_mods: Option<bool>,
    pub prop_mods: Option<bool>,
}

/// What, if anything, lives at a path.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeKind {
    /// Nothing.
    None,
    /// A file; symlinks are files carrying `svn:special`.
    File,
    Dir,
}

impl NodeKind {
    /// Lowercase name used in messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::File => "file",
            Self::Dir => "dir",
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One node in a directory listing.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    /// Path below the listed directory; equals `name` for
    /// [`crate::RaSession::list_dir`].
    pub path: String,
    pub kind: NodeKind,
    // The remaining fields are `None` unless their DirentField was requested.
    pub size: Option<u64>,
    pub has_props: Option<bool>,
    /// Revision that last changed the node.
    pub created_rev: Option<u64>,
    pub created_date: Option<String>,
    pub last_author: Option<String>,
}

/// Result of [`crate::RaSession::list_dir`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirListing {
    /// Revision the listing was taken from (HEAD resolved).
    pub rev: u64,
    /// Children in byte order of their names.
    pub entries: Vec<DirEntry>,
    /// The directory's own properties plus `svn:entry:*`.
    pub props: PropertyList,
}

/// How far below a directory an operation reaches.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum Depth {
    /// The directory alone.
    Empty,
    /// Plus its files.
    Files,
    /// Plus its files and subdirectories, which are themselves `Empty`.
    Immediates,
    /// Everything below.
    Infinity,
}

impl Depth {
    /// Name of the depth as Subversion spells it.
    pub fn as_word(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Files => "files",
            Self::Immediates => "immediates",
            Self::Infinity => "infinity",
        }
    }

    /// Depth that applies to a child directory of a node at this depth.
    ///
    /// Returns `None` when directory children are excluded.
    pub(crate) fn for_child_dir(self) -> Option<Depth> {
        match self {
            Self::Empty | Self::Files => None,
            Self::Immediates => Some(Self::Empty),
            Self::Infinity => Some(Self::Infinity),
        }
    }

    /// Returns `true` if file children are included at this depth.
    pub(crate) fn includes_files(self) -> bool {
        self != Self::Empty
    }
}

/// Optional [`DirEntry`] columns a listing can fill in.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DirentField {
    /// Always filled; accepted for symmetry.
    Kind,
    Size,
    HasProps,
    CreatedRev,
    /// `created_date`.
    Time,
    LastAuthor,
}

impl DirentField {
    pub const ALL: [DirentField; 6] = [
        Self::Kind,
        Self::Size,
        Self::HasProps,
        Self::CreatedRev,
        Self::Time,
        Self::LastAuthor,
    ];
}

/// Metadata of a single node, from [`crate::RaSession::stat`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatEntry {
    pub kind: NodeKind,
    /// Byte length; `None` for directories.
    pub size: Option<u64>,
    pub has_props: bool,
    /// Revision that last changed the node.
    pub created_rev: u64,
    /// `svn:date` of `created_rev`.
    pub created_date: Option<String>,
    /// `svn:author` of `created_rev`.
    pub last_author: Option<String>,
}

/// A repository capability.
///
/// Capabilities gate optional features; see
/// [`crate::ReposConfig::with_capabilities`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Depth-limited listings and reports.
    Depth,
    /// Arbitrary revision properties in log entries.
    LogRevProps,
    /// Compare-and-swap revision property changes.
    AtomicRevProps,
    /// Custom revision properties attached at commit time.
    CommitRevProps,
}

impl Capability {
    /// Every capability this crate knows about.
    pub const ALL: [Capability; 4] = [
        Self::Depth,
        Self::LogRevProps,
        Self::AtomicRevProps,
        Self::CommitRevProps,
    ];

    /// Name of the capability as Subversion spells it.
    pub fn as_word(self) -> &'static str {
        match self {
            Self::Depth => "depth",
            Self::LogRevProps => "log-revprops",
            Self::AtomicRevProps => "atomic-revprops",
            Self::CommitRevProps => "commit-revprops",
        }
    }
}

/// Digest algorithm of a [`Checksum`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChecksumKind {
    Md5,
    Sha1,
}

impl ChecksumKind {
    fn digest_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
        }
    }
}

/// A digest of file contents, checked when text enters a commit.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Checksum {
    pub kind: ChecksumKind,
    /// Raw digest, 16 bytes for MD5 and 20 for SHA-1.
    pub digest: Vec<u8>,
}

impl Checksum {
    pub fn compute(kind: ChecksumKind, data: &[u8]) -> Self {
        let digest = match kind {
            ChecksumKind::Md5 => Md5::digest(data).to_vec(),
            ChecksumKind::Sha1 => Sha1::digest(data).to_vec(),
        };
        Self { kind, digest }
    }

    /// Computes the MD5 checksum of `data`.
    pub fn md5(data: &[u8]) -> Self {
        Self::compute(ChecksumKind::Md5, data)
    }

    /// Computes the SHA-1 checksum of `data`.
    pub fn sha1(data: &[u8]) -> Self {
        Self::compute(ChecksumKind::Sha1, data)
    }

    /// Parses a hex digest, rejecting digests of the wrong length.
    pub fn from_hex(kind: ChecksumKind, hex_digest: &str) -> Result<Self, SvnError> {
        let digest = hex::decode(hex_digest.trim())
            .map_err(|err| SvnError::InvalidArgument(format!("invalid checksum: {err}")))?;
        if digest.len() != kind.digest_len() {
            return Err(SvnError::InvalidArgument(format!(
                "invalid {kind:?} checksum length {}",
                digest.len()
            )));
        }
        Ok(Self { kind, digest })
    }

    /// Returns the digest as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.digest)
    }

    /// Returns `true` if `data` hashes to this checksum.
    pub fn matches(&self, data: &[u8]) -> bool {
        Self::compute(self.kind, data) == *self
    }
}

impl Display for Checksum {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}
