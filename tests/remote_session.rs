//! Session, commit editor and status reporter behavior against a Greek tree
//! repository.

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use svn_ra::{
    Capability, Checksum, CommitInfo, CommitLockToken, CommitOptions, Depth, ErrorKind,
    FileText, LockOptions, LogOptions, NodeKind, PropertyList, ReposConfig, StatusEvent,
    StatusOptions, SvnError,
};

use common::{GREEK_FILES, GREEK_TREE, USERNAME, greek, greek_text, greek_with_config, run_async};

fn props(pairs: &[(&str, &str)]) -> PropertyList {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.as_bytes().to_vec()))
        .collect()
}

fn capture() -> (Arc<Mutex<Option<CommitInfo>>>, impl FnOnce(&CommitInfo) + Send + 'static) {
    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    (seen, move |info: &CommitInfo| {
        *sink.lock().unwrap() = Some(info.clone());
    })
}

fn committed_rev(seen: &Arc<Mutex<Option<CommitInfo>>>) -> u64 {
    seen.lock().unwrap().as_ref().unwrap().new_rev
}

#[test]
fn fixture_has_one_revision() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        assert_eq!(session.get_latest_rev().await.unwrap(), 1);
        assert!(!session.repos_uuid().is_empty());
        assert_eq!(session.session_url(), greek.repos.root_url());
        assert_eq!(session.repository_info().uuid, session.repos_uuid());
    });
}

#[test]
fn dated_rev() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        assert_eq!(session.get_dated_rev(Utc::now()).await.unwrap(), 1);
        let long_ago = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(session.get_dated_rev(long_ago).await.unwrap(), 0);
    });
}

#[test]
fn get_locks() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        session
            .lock("iota", &LockOptions::new().with_comment("foo"))
            .await
            .unwrap();

        let locks = session.get_locks("iota", Depth::Infinity).await.unwrap();
        assert_eq!(locks.len(), 1);
        assert_eq!(locks[0].path, "iota");
        assert_eq!(locks[0].owner, USERNAME);
        assert_eq!(locks[0].comment.as_deref(), Some("foo"));

        assert_eq!(session.get_locks("", Depth::Files).await.unwrap().len(), 1);
        assert!(session.get_locks("A", Depth::Infinity).await.unwrap().is_empty());
    });
}

#[test]
fn check_path() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        assert_eq!(session.check_path("iota", Some(1)).await.unwrap(), NodeKind::File);
        assert_eq!(session.check_path("iota", Some(0)).await.unwrap(), NodeKind::None);
        assert_eq!(session.check_path("A", Some(1)).await.unwrap(), NodeKind::Dir);
        assert!(matches!(
            session.check_path("A", Some(7)).await,
            Err(SvnError::NoSuchRevision(7))
        ));
    });
}

#[test]
fn reparent_keeps_root_url() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let new_url = greek.url("A/B/E");
        session.reparent(new_url.clone()).await.unwrap();
        assert_eq!(session.session_url(), &new_url);
        assert_eq!(session.repos_root_url(), greek.repos.root_url());
    });
}

#[test]
fn relative_paths() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let base = greek.url("A/B/E");
        session.reparent(base.clone()).await.unwrap();

        let alpha = base.join("alpha").unwrap();
        assert_eq!(session.session_relative_path(&alpha).unwrap(), "alpha");
        let beta = base.join("beta").unwrap();
        assert_eq!(session.repos_relative_path(&beta).unwrap(), "A/B/E/beta");
        assert!(session.session_relative_path(&greek.url("A/D")).is_err());
    });
}

#[test]
fn disposed_editor_leaves_repository_alone() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let editor = session
            .commit_editor(&CommitOptions::new(""))
            .await
            .unwrap();
        editor.dispose();
        assert_eq!(session.get_latest_rev().await.unwrap(), 1);
    });
}

#[test]
fn has_capability() {
    run_async(async {
        let greek = greek().await;
        let session = greek.session().await;
        assert!(session.has_capability(Capability::Depth));

        let bare = greek_with_config(ReposConfig::new().with_capabilities(Vec::new())).await;
        let session = bare.session().await;
        assert!(!session.has_capability(Capability::Depth));
    });
}

#[test]
fn change_revprop_without_atomic_capability() {
    run_async(async {
        let config = ReposConfig::new()
            .with_capabilities(vec![Capability::Depth])
            .allow_rev_prop_changes();
        let greek = greek_with_config(config).await;
        let mut session = greek.session().await;
        let err = session
            .change_rev_prop2(
                1,
                "svn:author",
                Some(b"bee".to_vec()),
                false,
                Some(b"bumble".to_vec()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SvnError::InvalidArgument(_)));
        assert_eq!(
            session.rev_prop(1, "svn:author").await.unwrap(),
            Some(USERNAME.as_bytes().to_vec())
        );
    });
}

#[test]
fn change_revprop_atomic_is_disabled_by_default() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        assert!(session.has_capability(Capability::AtomicRevProps));
        let old = session.rev_prop(1, "svn:author").await.unwrap();
        let err = session
            .change_rev_prop2(1, "svn:author", Some(b"rayjandom".to_vec()), false, old)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Policy);
        assert!(err.to_string().contains("Disabled repository feature"));
    });
}

#[test]
fn change_revprop_atomic() {
    run_async(async {
        let greek = greek_with_config(ReposConfig::new().allow_rev_prop_changes()).await;
        let mut session = greek.session().await;
        let old = session.rev_prop(1, "svn:author").await.unwrap();
        session
            .change_rev_prop2(1, "svn:author", Some(b"rayjandom".to_vec()), false, old)
            .await
            .unwrap();
        assert_eq!(
            session.rev_prop(1, "svn:author").await.unwrap(),
            Some(b"rayjandom".to_vec())
        );

        let err = session
            .change_rev_prop2(
                1,
                "svn:author",
                Some(b"someone".to_vec()),
                false,
                Some(b"stale".to_vec()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SvnError::PropertyConflict { rev: 1, .. }));
    });
}

#[test]
fn revprops() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let list = session.rev_proplist(1).await.unwrap();
        assert_eq!(list["svn:author"], USERNAME.as_bytes());
        assert_eq!(list["svn:log"], b"Log message for revision 1.");
        assert!(list.contains_key("svn:date"));
        assert_eq!(
            session.rev_prop(1, "svn:author").await.unwrap(),
            Some(USERNAME.as_bytes().to_vec())
        );
        assert_eq!(session.rev_prop(1, "nope").await.unwrap(), None);
    });
}

#[test]
fn get_file() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let mut contents: Vec<u8> = Vec::new();
        let result = session
            .get_file_with_result("A/B/lambda", None, true, &mut contents)
            .await
            .unwrap();
        assert_eq!(result.rev, 1);
        assert_eq!(contents, b"This is the file 'lambda'.");
        assert!(!result.props.is_empty());
        assert!(result.props.keys().all(|name| name.starts_with("svn:entry:")));
    });
}

#[test]
fn get_directory() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let listing = session.list_dir("A/B", None).await.unwrap();
        assert_eq!(listing.rev, 1);
        let paths: Vec<&str> = listing.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["E", "F", "lambda"]);
        assert!(listing.props.keys().all(|name| name.starts_with("svn:entry:")));
        let lambda = &listing.entries[2];
        assert_eq!(lambda.kind, NodeKind::File);
        assert_eq!(lambda.last_author.as_deref(), Some(USERNAME));
    });
}

#[test]
fn editor_copy() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let (seen, callback) = capture();
        let mut editor = session
            .commit_editor(&CommitOptions::new("Copy A/B/lambda -> A/B/omega"))
            .await
            .unwrap()
            .with_callback(callback);
        editor.copy("A/B/lambda", 1, "A/B/omega", None).await.unwrap();
        editor.complete().await.unwrap();

        assert_eq!(committed_rev(&seen), 2);
        assert_eq!(session.get_latest_rev().await.unwrap(), 2);
        assert_eq!(session.check_path("A/B/lambda", None).await.unwrap(), NodeKind::File);
        assert_eq!(session.check_path("A/B/omega", None).await.unwrap(), NodeKind::File);
    });
}

#[test]
fn editor_move() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let (seen, callback) = capture();
        let mut editor = session
            .commit_editor(&CommitOptions::new("Move A/B/lambda -> A/B/omega"))
            .await
            .unwrap()
            .with_callback(callback);
        editor
            .move_node("A/B/lambda", 1, "A/B/omega", None)
            .await
            .unwrap();
        editor.complete().await.unwrap();

        assert_eq!(committed_rev(&seen), 2);
        assert_eq!(session.get_latest_rev().await.unwrap(), 2);
        assert_eq!(session.check_path("A/B/lambda", None).await.unwrap(), NodeKind::None);
        assert_eq!(session.check_path("A/B/omega", None).await.unwrap(), NodeKind::File);

        let log = session
            .log_with_options(&LogOptions::between(2, 2).with_changed_paths())
            .await
            .unwrap();
        let omega = log[0]
            .changed_paths
            .iter()
            .find(|change| change.path == "/A/B/omega")
            .unwrap();
        assert_eq!(omega.copy_from_path.as_deref(), Some("/A/B/lambda"));
        assert_eq!(omega.copy_from_rev, Some(1));
    });
}

#[test]
fn editor_delete() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let mut editor = session
            .commit_editor(&CommitOptions::new("Delete all greek files"))
            .await
            .unwrap();
        for path in GREEK_FILES {
            editor.delete(path, 1).await.unwrap();
        }
        let info = editor.complete().await.unwrap();

        assert_eq!(info.new_rev, 2);
        assert_eq!(session.get_latest_rev().await.unwrap(), 2);
        for path in GREEK_FILES {
            assert_eq!(session.check_path(path, None).await.unwrap(), NodeKind::None);
        }
    });
}

#[test]
fn editor_mkdir() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let mut editor = session
            .commit_editor(&CommitOptions::new("Make hebrew dir"))
            .await
            .unwrap();
        editor
            .add_directory("ALEPH", Vec::new(), PropertyList::new(), None)
            .await
            .unwrap();
        assert_eq!(editor.complete().await.unwrap().new_rev, 2);
        assert_eq!(session.check_path("ALEPH", None).await.unwrap(), NodeKind::Dir);
    });
}

#[test]
fn editor_set_dir_props() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let ignore = "*.pyc\n.gitignore\n";
        let mut editor = session
            .commit_editor(&CommitOptions::new("Add svn:ignore"))
            .await
            .unwrap();
        editor
            .alter_directory("", 1, None, Some(props(&[("svn:ignore", ignore)])))
            .await
            .unwrap();
        assert_eq!(editor.complete().await.unwrap().new_rev, 2);
        assert_eq!(
            session.propget("", "svn:ignore", None).await.unwrap(),
            Some(ignore.as_bytes().to_vec())
        );
    });
}

#[test]
fn editor_add_file() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let contents = b"This is file 'xi'.";
        let mut editor = session
            .commit_editor(&CommitOptions::new("Add A/xi"))
            .await
            .unwrap();
        editor
            .add_file(
                "A/xi",
                Checksum::sha1(contents),
                &contents[..],
                props(&[("svn:eol-style", "native")]),
                None,
            )
            .await
            .unwrap();
        assert_eq!(editor.complete().await.unwrap().new_rev, 2);
        assert_eq!(session.check_path("A/xi", None).await.unwrap(), NodeKind::File);
        assert_eq!(
            session.propget("A/xi", "svn:eol-style", None).await.unwrap(),
            Some(b"native".to_vec())
        );
    });
}

#[test]
fn editor_set_file_props() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let mut editor = session
            .commit_editor(&CommitOptions::new("Change eol-style on A/B/E/alpha"))
            .await
            .unwrap();
        editor
            .alter_file("A/B/E/alpha", 1, None, Some(props(&[("svn:eol-style", "CRLF")])))
            .await
            .unwrap();
        assert_eq!(editor.complete().await.unwrap().new_rev, 2);
        assert_eq!(
            session.propget("A/B/E/alpha", "svn:eol-style", None).await.unwrap(),
            Some(b"CRLF".to_vec())
        );

        let mut contents: Vec<u8> = Vec::new();
        session.get_file("A/B/E/alpha", None, &mut contents).await.unwrap();
        assert_eq!(contents, greek_text("alpha").as_bytes());
    });
}

#[test]
fn editor_not_implemented() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let mut editor = session
            .commit_editor(&CommitOptions::new("not implemented"))
            .await
            .unwrap();

        let err = editor
            .add_symlink("", "", PropertyList::new(), Some(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotImplemented);
        assert_eq!(err.to_string(), "not implemented: CommitEditor.add_symlink");

        let err = editor.alter_symlink("", 1, Some(""), None).await.unwrap_err();
        assert_eq!(err.to_string(), "not implemented: CommitEditor.alter_symlink");

        editor.dispose();
        assert_eq!(session.get_latest_rev().await.unwrap(), 1);
    });
}

#[test]
fn stale_base_revision_conflicts() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let mut editor = session
            .commit_editor(&CommitOptions::new("touch iota"))
            .await
            .unwrap();
        editor
            .alter_file(
                "iota",
                1,
                Some((Checksum::md5(b"new iota\n"), &mut &b"new iota\n"[..])),
                None,
            )
            .await
            .unwrap();
        editor.complete().await.unwrap();

        let mut editor = session
            .commit_editor(&CommitOptions::new("stale"))
            .await
            .unwrap();
        let err = editor.delete("iota", 1).await.unwrap_err();
        assert!(matches!(
            err,
            SvnError::OutOfDate {
                base_rev: 1,
                changed_rev: 2,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(matches!(
            editor.complete().await,
            Err(SvnError::InvalidState(_))
        ));

        // unrelated nodes can still use r1 as their base
        let mut editor = session
            .commit_editor(&CommitOptions::new("fresh"))
            .await
            .unwrap();
        editor.delete("A/mu", 1).await.unwrap();
        editor.delete("iota", 2).await.unwrap();
        assert_eq!(editor.complete().await.unwrap().new_rev, 3);
    });
}

#[test]
fn stale_directory_conflicts_after_edits_beneath_it() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let mut editor = session
            .commit_editor(&CommitOptions::new("touch gamma"))
            .await
            .unwrap();
        editor
            .alter_file("A/D/gamma", 1, None, Some(props(&[("foo", "bar")])))
            .await
            .unwrap();
        assert_eq!(editor.complete().await.unwrap().new_rev, 2);

        let mut editor = session
            .commit_editor(&CommitOptions::new("stale A"))
            .await
            .unwrap();
        editor.delete("A/mu", 1).await.unwrap();
        let err = editor
            .alter_directory("A", 1, None, Some(props(&[("svn:ignore", "*.o\n")])))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        editor.dispose();

        let mut editor = session
            .commit_editor(&CommitOptions::new("stale A/D"))
            .await
            .unwrap();
        let text = FileText::new("This is the file 'zeta'.");
        editor
            .add_file("A/D/zeta", text.checksum, &text.contents[..], PropertyList::new(), None)
            .await
            .unwrap();
        let err = editor.delete("A/D", 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        editor.dispose();

        // a commit landing between staging and completion is caught on replay
        let mut other = greek.session().await;
        let mut editor = session
            .commit_editor(&CommitOptions::new("mine"))
            .await
            .unwrap();
        editor.delete("A/D/G/pi", 2).await.unwrap();
        editor
            .alter_directory("A/D", 2, None, Some(props(&[("svn:ignore", "*.o\n")])))
            .await
            .unwrap();
        other
            .commit(
                &CommitOptions::new("theirs"),
                vec![svn_ra::EditorCommand::AlterFile {
                    path: "A/D/H/chi".into(),
                    rev: 2,
                    text: Some(FileText::new(&b"theirs\n"[..])),
                    props: None,
                }],
            )
            .await
            .unwrap();
        let err = editor.complete().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(other.get_latest_rev().await.unwrap(), 3);
        assert_eq!(other.check_path("A/D/G/pi", None).await.unwrap(), NodeKind::File);
    });
}

#[test]
fn failed_transaction_commits_nothing() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let mut editor = session
            .commit_editor(&CommitOptions::new("half"))
            .await
            .unwrap();
        editor
            .add_directory("ALEPH", Vec::new(), PropertyList::new(), None)
            .await
            .unwrap();
        let err = editor.delete("A/nope", 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(editor.complete().await.is_err());

        assert_eq!(session.get_latest_rev().await.unwrap(), 1);
        assert_eq!(session.check_path("ALEPH", None).await.unwrap(), NodeKind::None);
    });
}

#[test]
fn empty_commit_creates_revision() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let editor = session
            .commit_editor(&CommitOptions::new("nothing"))
            .await
            .unwrap();
        let info = editor.complete().await.unwrap();
        assert_eq!(info.new_rev, 2);
        assert_eq!(info.author.as_deref(), Some(USERNAME));
        let log = session.log(2, 2).await.unwrap();
        assert!(log[0].changed_paths.is_empty());
    });
}

#[test]
fn locked_files_need_their_token() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let lock = session.lock("iota", &LockOptions::new()).await.unwrap();

        let mut editor = session
            .commit_editor(&CommitOptions::new("no token"))
            .await
            .unwrap();
        editor.delete("iota", 1).await.unwrap();
        assert!(matches!(
            editor.complete().await,
            Err(SvnError::Locked { .. })
        ));
        assert_eq!(session.get_latest_rev().await.unwrap(), 1);

        let options = CommitOptions::new("with token")
            .with_lock_tokens(vec![CommitLockToken::new("iota", lock.token)]);
        let mut editor = session.commit_editor(&options).await.unwrap();
        editor
            .alter_file(
                "iota",
                1,
                Some((Checksum::md5(b"locked edit"), &mut &b"locked edit"[..])),
                None,
            )
            .await
            .unwrap();
        assert_eq!(editor.complete().await.unwrap().new_rev, 2);
        assert!(session.get_lock("iota").await.unwrap().is_none());
    });
}

#[test]
fn get_log() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let log = session.log_with_options(&LogOptions::default()).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].rev, 1);
        assert_eq!(log[0].author.as_deref(), Some(USERNAME));
        assert_eq!(log[0].message.as_deref(), Some("Log message for revision 1."));
    });
}

#[test]
fn get_log_missing() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let err = session
            .log_with_options(&LogOptions::default().with_paths(vec!["X".into()]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().starts_with("filesystem has no item"));
    });
}

#[test]
fn simple_status() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let mut events: Vec<StatusEvent> = Vec::new();
        let mut reporter = session
            .status(&StatusOptions::new("", Depth::Infinity), &mut events)
            .unwrap();
        reporter.set_path("", 0, Depth::Infinity, true, None).unwrap();
        assert_eq!(reporter.finish_report().await.unwrap(), 1);

        assert_eq!(events.len(), 1 + GREEK_TREE.len());
        assert!(matches!(
            &events[0],
            StatusEvent::ModifiedDirectory { path, children_modified: true, .. } if path.is_empty()
        ));
        for (path, is_dir) in GREEK_TREE {
            let event = events.iter().find(|e| e.path() == path).unwrap();
            match event {
                StatusEvent::AddedDirectory { .. } => assert!(is_dir),
                StatusEvent::AddedFile { .. } => assert!(!is_dir),
                other => panic!("unexpected event {other:?}"),
            }
        }
    });
}

#[test]
fn propchange_status() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let mut editor = session
            .commit_editor(&CommitOptions::new("Property change on A/D/gamma"))
            .await
            .unwrap();
        editor
            .alter_file("A/D/gamma", 1, None, Some(props(&[("foo", "bar")])))
            .await
            .unwrap();
        editor.complete().await.unwrap();

        let mut events: Vec<StatusEvent> = Vec::new();
        let mut reporter = session
            .status(&StatusOptions::new("", Depth::Infinity), &mut events)
            .unwrap();
        reporter.set_path("", 1, Depth::Infinity, false, None).unwrap();
        assert_eq!(reporter.finish_report().await.unwrap(), 2);

        assert_eq!(events.len(), 4);
        assert_eq!(
            events[3],
            StatusEvent::ModifiedFile {
                path: "A/D/gamma".into(),
                text_modified: false,
                props_modified: true,
            }
        );
    });
}

#[test]
fn current_shape_reports_nothing() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        session
            .commit(
                &CommitOptions::new("edit iota"),
                vec![svn_ra::EditorCommand::AlterFile {
                    path: "iota".into(),
                    rev: 1,
                    text: Some(FileText::new(&b"changed"[..])),
                    props: None,
                }],
            )
            .await
            .unwrap();

        // mixed-revision tree: everything at r1 except iota at r2
        let mut events: Vec<StatusEvent> = Vec::new();
        let mut reporter = session
            .status(&StatusOptions::default(), &mut events)
            .unwrap();
        reporter.set_path("", 1, Depth::Infinity, false, None).unwrap();
        reporter.set_path("iota", 2, Depth::Infinity, false, None).unwrap();
        assert_eq!(reporter.finish_report().await.unwrap(), 2);
        assert!(events.is_empty(), "{events:?}");
    });
}

#[test]
fn missing_reported_path_fails_before_delivery() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let mut events: Vec<StatusEvent> = Vec::new();
        let mut reporter = session
            .status(&StatusOptions::default(), &mut events)
            .unwrap();
        reporter.set_path("", 0, Depth::Infinity, true, None).unwrap();
        reporter.set_path("A/nope", 1, Depth::Infinity, false, None).unwrap();
        let err = reporter.finish_report().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(events.is_empty());
    });
}

#[test]
fn status_of_subtree_with_limited_depth() {
    run_async(async {
        let greek = greek().await;
        let mut session = greek.session().await;
        let mut events: Vec<StatusEvent> = Vec::new();
        let mut reporter = session
            .status(&StatusOptions::new("A/D", Depth::Immediates), &mut events)
            .unwrap();
        reporter.set_path("", 1, Depth::Infinity, true, None).unwrap();
        assert_eq!(reporter.finish_report().await.unwrap(), 1);
        let paths: Vec<&str> = events.iter().map(StatusEvent::path).collect();
        assert_eq!(paths, vec!["", "G", "H", "gamma"]);
    });
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn deleted_files_are_reported_under_modified_parents(
        deleted in proptest::sample::subsequence(GREEK_FILES.to_vec(), 0..=GREEK_FILES.len())
    ) {
        let events = run_async(async {
            let greek = greek().await;
            let mut session = greek.session().await;
            let mut editor = session
                .commit_editor(&CommitOptions::new("random deletes"))
                .await
                .unwrap();
            for path in &deleted {
                editor.delete(path, 1).await.unwrap();
            }
            assert_eq!(editor.complete().await.unwrap().new_rev, 2);

            let mut events: Vec<StatusEvent> = Vec::new();
            let mut reporter = session
                .status(&StatusOptions::default(), &mut events)
                .unwrap();
            reporter.set_path("", 1, Depth::Infinity, false, None).unwrap();
            assert_eq!(reporter.finish_report().await.unwrap(), 2);
            events
        });

        let mut expected_dirs: Vec<String> = Vec::new();
        for path in &deleted {
            let mut parent = *path;
            while let Some((dir, _)) = parent.rsplit_once('/') {
                expected_dirs.push(dir.to_string());
                parent = dir;
            }
            expected_dirs.push(String::new());
        }
        expected_dirs.sort();
        expected_dirs.dedup();

        let mut seen_deleted: Vec<&str> = Vec::new();
        let mut seen_dirs: Vec<String> = Vec::new();
        for (idx, event) in events.iter().enumerate() {
            match event {
                StatusEvent::Deleted { path } => seen_deleted.push(path),
                StatusEvent::ModifiedDirectory { path, children_modified, props_modified } => {
                    prop_assert!(*children_modified);
                    prop_assert!(!*props_modified);
                    seen_dirs.push(path.clone());
                }
                other => prop_assert!(false, "unexpected event {:?}", other),
            }
            if !event.path().is_empty() {
                let parent = event.path().rsplit_once('/').map_or("", |(dir, _)| dir);
                let parent_idx = events.iter().position(|e| e.path() == parent);
                prop_assert!(parent_idx.is_some_and(|p| p < idx));
            }
        }
        seen_deleted.sort_unstable();
        let mut want_deleted = deleted.clone();
        want_deleted.sort_unstable();
        prop_assert_eq!(seen_deleted, want_deleted);
        seen_dirs.sort();
        prop_assert_eq!(seen_dirs, expected_dirs);
    }
}
