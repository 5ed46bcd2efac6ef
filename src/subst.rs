//! Keyword expansion and end-of-line translation for file contents.
//!
//! Files carrying `svn:keywords` have `$Keyword$` anchors expanded to
//! `$Keyword: value $`, and files carrying `svn:eol-style` have their line
//! endings normalized. [`RaSession::cat`] applies both to a repository file.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::repos::tree::SPECIAL_PROP;
use crate::{RaSession, SvnError};

const EOL_STYLE_PROP: &str = "svn:eol-style";
const KEYWORDS_PROP: &str = "svn:keywords";

/// Longest keyword anchor, from the opening `$` to the closing `$`.
const KEYWORD_MAX_LEN: usize = 255;

/// Line-ending style selected by `svn:eol-style`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EolStyle {
    /// The platform's native line ending.
    Native,
    /// `\n`.
    Lf,
    /// `\r`.
    Cr,
    /// `\r\n`.
    Crlf,
}

impl EolStyle {
    /// Parses an `svn:eol-style` value. Unknown values yield `None`.
    pub fn from_prop(value: &str) -> Option<Self> {
        match value.trim() {
            "native" => Some(Self::Native),
            "LF" => Some(Self::Lf),
            "CR" => Some(Self::Cr),
            "CRLF" => Some(Self::Crlf),
            _ => None,
        }
    }

    /// Line terminator written for this style.
    pub fn eol(self) -> &'static str {
        match self {
            Self::Native if cfg!(windows) => "\r\n",
            Self::Native | Self::Lf => "\n",
            Self::Cr => "\r",
            Self::Crlf => "\r\n",
        }
    }

    /// Rewrites every `\n`, `\r` and `\r\n` in `contents` as this style's
    /// terminator.
    pub fn translate(self, contents: &[u8]) -> Vec<u8> {
        let eol = self.eol().as_bytes();
        let mut out = Vec::with_capacity(contents.len());
        let mut bytes = contents.iter().copied().peekable();
        while let Some(byte) = bytes.next() {
            match byte {
                b'\r' => {
                    bytes.next_if_eq(&b'\n');
                    out.extend_from_slice(eol);
                }
                b'\n' => out.extend_from_slice(eol),
                other => out.push(other),
            }
        }
        out
    }
}

/// Keyword values for one file, keyed by every name that selects them.
///
/// Built from an `svn:keywords` property value, e.g. `"Id Rev Author"`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Keywords {
    values: BTreeMap<String, String>,
}

impl Keywords {
    /// Builds the keyword table for a file last changed in `rev` by `author`
    /// at `date`, living at `url`.
    pub fn build(
        keywords_prop: &str,
        rev: u64,
        url: &str,
        date: Option<DateTime<Utc>>,
        author: Option<&str>,
    ) -> Self {
        let mut values = BTreeMap::new();
        let mut set = |names: &[&str], value: String| {
            for name in names {
                values.insert(name.to_string(), value.clone());
            }
        };
        for word in keywords_prop.split_ascii_whitespace() {
            if word == "LastChangedRevision"
                || word == "Revision"
                || word.eq_ignore_ascii_case("Rev")
            {
                set(
                    &["LastChangedRevision", "Revision", "Rev"],
                    rev.to_string(),
                );
            } else if word == "LastChangedDate" || word.eq_ignore_ascii_case("Date") {
                set(
                    &["LastChangedDate", "Date"],
                    date.map(long_date).unwrap_or_default(),
                );
            } else if word == "LastChangedBy" || word.eq_ignore_ascii_case("Author") {
                set(
                    &["LastChangedBy", "Author"],
                    author.unwrap_or_default().to_string(),
                );
            } else if word == "HeadURL" || word.eq_ignore_ascii_case("URL") {
                set(&["HeadURL", "URL"], url.to_string());
            } else if word.eq_ignore_ascii_case("Id") {
                let base_name = url.rsplit('/').next().unwrap_or_default();
                let date = date.map(short_date).unwrap_or_default();
                let author = author.unwrap_or_default();
                set(&["Id"], format!("{base_name} {rev} {date} {author}"));
            }
        }
        Self { values }
    }

    /// Value for a keyword name, if the keyword is enabled.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Returns `true` when no keyword is enabled.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Expands every enabled keyword anchor in `contents`.
    pub fn expand(&self, contents: &[u8]) -> Vec<u8> {
        self.translate(contents, true)
    }

    /// Returns every enabled keyword anchor to its unexpanded `$Keyword$`
    /// form.
    pub fn contract(&self, contents: &[u8]) -> Vec<u8> {
        self.translate(contents, false)
    }

    fn translate(&self, contents: &[u8], expand: bool) -> Vec<u8> {
        if self.is_empty() {
            return contents.to_vec();
        }
        let mut out = Vec::with_capacity(contents.len());
        let mut pos = 0;
        while pos < contents.len() {
            let byte = contents[pos];
            if byte != b'$' {
                out.push(byte);
                pos += 1;
                continue;
            }
            let closing = contents[pos + 1..]
                .iter()
                .take(KEYWORD_MAX_LEN - 1)
                .take_while(|b| **b != b'\n' && **b != b'\r')
                .position(|b| *b == b'$');
            let Some(offset) = closing else {
                out.push(byte);
                pos += 1;
                continue;
            };
            let end = pos + 1 + offset;
            match self.substitute(&contents[pos..=end], expand) {
                Some(replacement) => {
                    out.extend_from_slice(&replacement);
                    pos = end + 1;
                }
                // the closing `$` may open the next anchor
                None => {
                    out.extend_from_slice(&contents[pos..end]);
                    pos = end;
                }
            }
        }
        out
    }

    /// Substitutes one `$...$` anchor, or returns `None` if it is not an
    /// enabled keyword.
    fn substitute(&self, anchor: &[u8], expand: bool) -> Option<Vec<u8>> {
        let inner = &anchor[1..anchor.len() - 1];
        let name_len = inner.iter().position(|b| *b == b':').unwrap_or(inner.len());
        let name = std::str::from_utf8(&inner[..name_len]).ok()?;
        let value = self.get(name)?;
        let rest = &inner[name_len..];

        // "$Name:: value $": fixed-width field
        if rest.len() > 4
            && rest.starts_with(b":: ")
            && matches!(rest[rest.len() - 1], b' ' | b'#')
        {
            let width = rest.len() - 3;
            let mut field = vec![b' '; width];
            if expand {
                let value = value.as_bytes();
                if value.len() < width {
                    field[..value.len()].copy_from_slice(value);
                } else {
                    field[..width - 1].copy_from_slice(&value[..width - 1]);
                    field[width - 1] = b'#';
                }
            }
            let mut out = Vec::with_capacity(anchor.len());
            out.push(b'$');
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b":: ");
            out.extend_from_slice(&field);
            out.push(b'$');
            return Some(out);
        }

        let unexpanded = rest.is_empty() || rest == b":";
        let expanded = rest.len() >= 2 && rest.starts_with(b": ") && rest.ends_with(b" ");
        if !unexpanded && !expanded {
            return None;
        }
        let mut out = Vec::new();
        out.push(b'$');
        out.extend_from_slice(name.as_bytes());
        if expand {
            out.extend_from_slice(b": ");
            if !value.is_empty() {
                let max = KEYWORD_MAX_LEN - 5 - name.len();
                let value = &value.as_bytes()[..value.len().min(max)];
                out.extend_from_slice(value);
                out.push(b' ');
            }
        } else if unexpanded {
            return Some(anchor.to_vec());
        }
        out.push(b'$');
        Some(out)
    }
}

fn long_date(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d %H:%M:%S %z (%a, %d %b %Y)").to_string()
}

fn short_date(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d %H:%M:%SZ").to_string()
}

impl RaSession {
    /// Returns the contents of the file at `path` as a client would see
    /// them: keywords expanded per `svn:keywords` and line endings
    /// translated per `svn:eol-style`.
    ///
    /// Special files (symlinks) are returned untranslated.
    pub async fn cat(&mut self, path: &str, rev: Option<u64>) -> Result<Vec<u8>, SvnError> {
        let (result, contents) = self.file_contents(path, rev).await?;
        let props = &result.props;
        if props.contains_key(SPECIAL_PROP) {
            return Ok(contents);
        }
        let text_prop = |name: &str| {
            props
                .get(name)
                .map(|value| String::from_utf8_lossy(value).into_owned())
        };

        let mut contents = contents;
        if let Some(keywords_prop) = text_prop(KEYWORDS_PROP) {
            let committed_rev = text_prop("svn:entry:committed-rev")
                .and_then(|rev| rev.parse().ok())
                .unwrap_or(result.rev);
            let date = text_prop("svn:entry:committed-date")
                .and_then(|date| DateTime::parse_from_rfc3339(&date).ok())
                .map(|date| date.with_timezone(&Utc));
            let author = text_prop("svn:entry:last-author");
            let url = self.session_url().join(path)?;
            let keywords =
                Keywords::build(&keywords_prop, committed_rev, &url.url, date, author.as_deref());
            contents = keywords.expand(&contents);
        }
        if let Some(style) = text_prop(EOL_STYLE_PROP).and_then(|v| EolStyle::from_prop(&v)) {
            contents = style.translate(&contents);
        }
        Ok(contents)
    }
}
