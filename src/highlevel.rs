use similar::{ChangeTag, TextDiff};

use crate::repos::{PROP_AUTHOR, PROP_DATE};
use crate::{BlameLine, NodeKind, PropertyList, RaClient, RaSession, SvnError};

const EQUAL_LINE: &str = "===================================================================";
const UNDER_LINE: &str = "___________________________________________________________________";
const MIME_TYPE_PROP: &str = "svn:mime-type";

fn prop_string(props: &PropertyList, name: &str) -> Option<String> {
    props
        .get(name)
        .and_then(|v| (!v.is_empty()).then(|| String::from_utf8_lossy(v).into_owned()))
}

/// A file is binary when its `svn:mime-type` is set and not `text/*`.
fn is_binary(props: &PropertyList) -> Option<String> {
    prop_string(props, MIME_TYPE_PROP).filter(|mime| !mime.starts_with("text/"))
}

impl RaSession {
    /// Computes a unified diff of `path` between `old_rev` and `new_rev`,
    /// followed by its property changes.
    ///
    /// A side where the file does not exist diffs as empty. The result is
    /// empty when nothing differs. Contents are decoded as UTF-8 lossily.
    pub async fn diff_file_unified(
        &mut self,
        path: &str,
        old_rev: u64,
        new_rev: u64,
    ) -> Result<String, SvnError> {
        let old = self.diff_side(path, old_rev).await?;
        let new = self.diff_side(path, new_rev).await?;
        if old.is_none() && new.is_none() {
            return Err(SvnError::NotFound {
                path: path.to_string(),
                rev: new_rev,
            });
        }
        let (old_props, old_bytes) = old.unwrap_or_default();
        let (new_props, new_bytes) = new.unwrap_or_default();

        let label = if path.is_empty() { "." } else { path };
        let mut out = String::new();
        if old_bytes != new_bytes {
            out.push_str(&format!("Index: {label}\n{EQUAL_LINE}\n"));
            match is_binary(&new_props).or_else(|| is_binary(&old_props)) {
                Some(mime) => {
                    out.push_str("Cannot display: file marked as a binary type.\n");
                    out.push_str(&format!("{MIME_TYPE_PROP} = {mime}\n"));
                }
                None => {
                    let old_text = String::from_utf8_lossy(&old_bytes);
                    let new_text = String::from_utf8_lossy(&new_bytes);
                    let diff = TextDiff::from_lines(&old_text, &new_text);
                    let unified = diff
                        .unified_diff()
                        .header(
                            &format!("{label}\t(revision {old_rev})"),
                            &format!("{label}\t(revision {new_rev})"),
                        )
                        .to_string();
                    out.push_str(&unified);
                }
            }
        }
        write_prop_changes(&mut out, label, &old_props, &new_props);
        Ok(out)
    }

    async fn diff_side(
        &mut self,
        path: &str,
        rev: u64,
    ) -> Result<Option<(PropertyList, Vec<u8>)>, SvnError> {
        if self.check_path(path, Some(rev)).await? != NodeKind::File {
            return Ok(None);
        }
        let (_, contents) = self.file_contents(path, Some(rev)).await?;
        let props = self.proplist(path, Some(rev)).await?.unwrap_or_default();
        Ok(Some((props, contents)))
    }

    /// Returns a line-based blame for `path` across a revision range.
    ///
    /// Built from [`RaSession::get_file_revs`]; every line is attributed to
    /// the latest revision that changed it.
    pub async fn blame_file(
        &mut self,
        path: &str,
        start_rev: Option<u64>,
        end_rev: Option<u64>,
    ) -> Result<Vec<BlameLine>, SvnError> {
        let revs = self.get_file_revs(path, start_rev, end_rev).await?;

        let mut prev_text = String::new();
        let mut blame: Vec<BlameLine> = Vec::new();
        for rev in &revs {
            let author = prop_string(&rev.file_rev.rev_props, PROP_AUTHOR);
            let date = prop_string(&rev.file_rev.rev_props, PROP_DATE);
            let cur_text = String::from_utf8_lossy(&rev.contents).into_owned();

            let diff = TextDiff::from_lines(&prev_text, &cur_text);
            let mut next = Vec::with_capacity(blame.len());
            let mut old_idx = 0usize;
            for change in diff.iter_all_changes() {
                match change.tag() {
                    ChangeTag::Equal => {
                        let prev = blame.get(old_idx).ok_or_else(|| {
                            SvnError::InvalidState("blame diff out of bounds".into())
                        })?;
                        next.push(prev.clone());
                        old_idx += 1;
                    }
                    ChangeTag::Delete => old_idx += 1,
                    ChangeTag::Insert => next.push(BlameLine {
                        rev: rev.file_rev.rev,
                        author: author.clone(),
                        date: date.clone(),
                        line: change.value().to_string(),
                    }),
                }
            }
            blame = next;
            prev_text = cur_text;
        }
        Ok(blame)
    }
}

fn write_prop_changes(out: &mut String, label: &str, old: &PropertyList, new: &PropertyList) {
    let names: std::collections::BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    let mut header_written = false;
    for name in names {
        let (before, after) = (old.get(name), new.get(name));
        let action = match (before, after) {
            (Some(a), Some(b)) if a == b => continue,
            (None, Some(_)) => "Added",
            (Some(_), None) => "Deleted",
            _ => "Modified",
        };
        if !header_written {
            out.push_str(&format!("\nProperty changes on: {label}\n{UNDER_LINE}\n"));
            header_written = true;
        }
        out.push_str(&format!("{action}: {name}\n"));

        let before = String::from_utf8_lossy(before.map_or(&[][..], Vec::as_slice));
        let after = String::from_utf8_lossy(after.map_or(&[][..], Vec::as_slice));
        let missing_eol = !after.is_empty() && !after.ends_with('\n');
        let before = with_eol(&before);
        let after = with_eol(&after);
        let diff = TextDiff::from_lines(before.as_str(), after.as_str());
        for hunk in diff.unified_diff().iter_hunks() {
            let header = hunk.header().to_string();
            let ranges = header.trim_start_matches("@@").trim_end_matches("@@").trim();
            out.push_str(&format!("## {ranges} ##\n"));
            for change in hunk.iter_changes() {
                let sign = match change.tag() {
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                    ChangeTag::Equal => ' ',
                };
                out.push(sign);
                out.push_str(change.value());
            }
        }
        if missing_eol {
            out.push_str("\\ No newline at end of property\n");
        }
    }
}

fn with_eol(value: &str) -> String {
    if value.is_empty() || value.ends_with('\n') {
        value.to_string()
    } else {
        format!("{value}\n")
    }
}

impl RaClient {
    /// Convenience wrapper for [`RaSession::diff_file_unified`].
    pub async fn diff_file_unified(
        &self,
        path: &str,
        old_rev: u64,
        new_rev: u64,
    ) -> Result<String, SvnError> {
        let mut session = self.open_session().await?;
        session.diff_file_unified(path, old_rev, new_rev).await
    }

    /// Convenience wrapper for [`RaSession::blame_file`].
    pub async fn blame_file(
        &self,
        path: &str,
        start_rev: Option<u64>,
        end_rev: Option<u64>,
    ) -> Result<Vec<BlameLine>, SvnError> {
        let mut session = self.open_session().await?;
        session.blame_file(path, start_rev, end_rev).await
    }
}
