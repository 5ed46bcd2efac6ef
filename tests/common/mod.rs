//! Shared fixture: a repository holding the standard "Greek tree" at r1.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use svn_ra::{
    CommitOptions, FileText, PropertyList, RaClient, RaSession, ReposConfig, Repository, SvnUrl,
};

pub const USERNAME: &str = "jrandom";
pub const REPOS_URL: &str = "svn://localhost/greek";

/// Every node of the Greek tree, parents before children.
pub const GREEK_TREE: [(&str, bool); 20] = [
    ("iota", false),
    ("A", true),
    ("A/mu", false),
    ("A/B", true),
    ("A/B/lambda", false),
    ("A/B/E", true),
    ("A/B/E/alpha", false),
    ("A/B/E/beta", false),
    ("A/B/F", true),
    ("A/C", true),
    ("A/D", true),
    ("A/D/gamma", false),
    ("A/D/G", true),
    ("A/D/G/pi", false),
    ("A/D/G/rho", false),
    ("A/D/G/tau", false),
    ("A/D/H", true),
    ("A/D/H/chi", false),
    ("A/D/H/omega", false),
    ("A/D/H/psi", false),
];

pub const GREEK_FILES: [&str; 12] = [
    "iota",
    "A/mu",
    "A/B/lambda",
    "A/B/E/alpha",
    "A/B/E/beta",
    "A/D/gamma",
    "A/D/G/pi",
    "A/D/G/rho",
    "A/D/G/tau",
    "A/D/H/chi",
    "A/D/H/omega",
    "A/D/H/psi",
];

pub fn run_async<T>(f: impl std::future::Future<Output = T>) -> T {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(f)
}

/// Contents of a Greek tree file.
pub fn greek_text(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap();
    format!("This is the file '{name}'.")
}

pub struct Greek {
    pub repos: Repository,
    pub client: RaClient,
}

impl Greek {
    pub async fn session(&self) -> RaSession {
        self.client.open_session().await.unwrap()
    }

    pub fn url(&self, rel: &str) -> SvnUrl {
        self.repos.root_url().join(rel).unwrap()
    }
}

pub async fn greek() -> Greek {
    greek_with_config(ReposConfig::default()).await
}

/// Creates a repository and commits the Greek tree as r1 through a commit
/// editor, as user [`USERNAME`].
pub async fn greek_with_config(config: ReposConfig) -> Greek {
    let repos = Repository::create_with_config(REPOS_URL, config).unwrap();
    let client = RaClient::new(repos.clone(), repos.root_url().clone()).with_username(USERNAME);
    let mut session = client.open_session().await.unwrap();

    let mut editor = session
        .commit_editor(&CommitOptions::new("Log message for revision 1."))
        .await
        .unwrap();
    for (path, is_dir) in GREEK_TREE {
        if is_dir {
            editor
                .add_directory(path, Vec::new(), PropertyList::new(), None)
                .await
                .unwrap();
        } else {
            let text = FileText::new(greek_text(path));
            editor
                .add_file(path, text.checksum, &text.contents[..], PropertyList::new(), None)
                .await
                .unwrap();
        }
    }
    let info = editor.complete().await.unwrap();
    assert_eq!(info.new_rev, 1);

    Greek { repos, client }
}
