//! Changelog rendering.
//!
//! One [`render`] function drives every output format; a [`Template`] value
//! supplies the pieces that differ.

use super::ServiceDiff;
use crate::error::HerderError;
use std::fmt;
use std::str::FromStr;

/// Length hashes are shortened to in reports and compare links.
pub const SHORT_HASH_LEN: usize = 8;

/// `git log --format` of the lines [`Commit::parse`] reads.
pub const COMMIT_LOG_FORMAT: &str = "%H%x1f%h%x1f%s";

const FIELD_SEPARATOR: char = '\u{1f}';

/// Shortens `revision` when it is a commit hash; branch and tag names are kept.
///
/// ```
/// use libherder::changelog::short_rev;
///
/// assert_eq!(short_rev("0123456789abcdef0123"), "01234567");
/// assert_eq!(short_rev("production"), "production");
/// ```
pub fn short_rev(revision: &str) -> &str {
    let is_hash = revision.len() > SHORT_HASH_LEN
        && revision.chars().all(|c| c.is_ascii_hexdigit());
    if is_hash {
        &revision[..SHORT_HASH_LEN]
    } else {
        revision
    }
}

/// Output format of a changelog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    Plain,
    #[default]
    Markdown,
    Html,
}

impl Format {
    /// The template strategy for this format.
    pub fn template(self) -> &'static Template {
        match self {
            Self::Plain => &PLAIN,
            Self::Markdown => &MARKDOWN,
            Self::Html => &HTML,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plain => "plain",
            Self::Markdown => "markdown",
            Self::Html => "html",
        })
    }
}

impl FromStr for Format {
    type Err = HerderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(Self::Plain),
            "markdown" | "md" => Ok(Self::Markdown),
            "html" => Ok(Self::Html),
            other => Err(HerderError::validation(format!(
                "Unknown changelog format '{}'",
                other
            ))),
        }
    }
}

/// Range covered by the whole report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportHeader {
    /// https URL of the tracking repository
    pub url: String,
    pub old: String,
    pub new: String,
}

/// One commit between the old and new hash of a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub hash: String,
    pub short_hash: String,
    /// Raw subject line; escaping is up to the template
    pub subject: String,
}

impl Commit {
    /// Parses one line of [`COMMIT_LOG_FORMAT`] output.
    ///
    /// ```
    /// use libherder::changelog::Commit;
    ///
    /// let commit = Commit::parse("0123456789abcdef\u{1f}0123456\u{1f}Fix <b> & co").unwrap();
    /// assert_eq!(commit.short_hash, "0123456");
    /// assert_eq!(commit.subject, "Fix <b> & co");
    /// ```
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.splitn(3, FIELD_SEPARATOR);
        let hash = fields.next().filter(|h| !h.is_empty())?;
        let short_hash = fields.next()?;
        let subject = fields.next().unwrap_or_default();
        Some(Self {
            hash: hash.to_string(),
            short_hash: short_hash.to_string(),
            subject: subject.to_string(),
        })
    }
}

/// One changed repository with its commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
    pub diff: ServiceDiff,
    /// Committer date of the new hash
    pub last_updated: String,
    /// Commits from new to old
    pub commits: Vec<Commit>,
}

/// Data rendered into a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub header: ReportHeader,
    pub entries: Vec<ChangelogEntry>,
}

/// The format-specific pieces of a report.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub header: fn(&ReportHeader) -> String,
    pub section: fn(&ChangelogEntry) -> String,
    /// Renders a commit of the repository at the given URL
    pub commit_line: fn(&Commit, &str) -> String,
    pub section_end: &'static str,
    pub empty: &'static str,
    pub footer: &'static str,
}

/// Renders `report` with `template`.
pub fn render(report: &Report, template: &Template) -> String {
    let mut out = (template.header)(&report.header);

    if report.entries.is_empty() {
        out.push_str(template.empty);
    }
    for entry in &report.entries {
        out.push_str(&(template.section)(entry));
        for commit in &entry.commits {
            out.push_str(&(template.commit_line)(commit, &entry.diff.url));
        }
        out.push_str(template.section_end);
    }

    out.push_str(template.footer);
    out
}

fn compare_url(url: &str, old: &str, new: &str) -> String {
    format!("{}/compare/{}...{}", url, short_rev(old), short_rev(new))
}

pub const PLAIN: Template = Template {
    header: plain_header,
    section: plain_section,
    commit_line: plain_commit,
    section_end: "\n",
    empty: "No services changed.\n",
    footer: "",
};

fn plain_header(h: &ReportHeader) -> String {
    format!(
        "{}: {}..{}\n{}\n\n",
        h.url,
        short_rev(&h.old),
        short_rev(&h.new),
        compare_url(&h.url, &h.old, &h.new)
    )
}

fn plain_section(e: &ChangelogEntry) -> String {
    let d = &e.diff;
    format!(
        "{} ({}): {}..{}\n{}\nLast updated: {}\n",
        d.names.join(", "),
        d.url,
        short_rev(&d.old_hash),
        short_rev(&d.new_hash),
        compare_url(&d.url, &d.old_hash, &d.new_hash),
        e.last_updated
    )
}

fn plain_commit(commit: &Commit, _url: &str) -> String {
    format!("  {} {}\n", commit.short_hash, commit.subject)
}

pub const MARKDOWN: Template = Template {
    header: markdown_header,
    section: markdown_section,
    commit_line: markdown_commit,
    section_end: "\n",
    empty: "No services changed.\n",
    footer: "",
};

fn markdown_header(h: &ReportHeader) -> String {
    format!(
        "# [{}]({}): [{}..{}]({})\n\n",
        h.url.rsplit('/').next().unwrap_or(&h.url),
        h.url,
        short_rev(&h.old),
        short_rev(&h.new),
        compare_url(&h.url, &h.old, &h.new)
    )
}

fn markdown_section(e: &ChangelogEntry) -> String {
    let d = &e.diff;
    format!(
        "## [{}]({}): [{}..{}]({})\n\nLast updated: {}\n\n",
        d.names.join(", "),
        d.url,
        short_rev(&d.old_hash),
        short_rev(&d.new_hash),
        compare_url(&d.url, &d.old_hash, &d.new_hash),
        e.last_updated
    )
}

fn markdown_commit(commit: &Commit, url: &str) -> String {
    format!(
        "* [{}]({}/commit/{}) {}\n",
        commit.short_hash, url, commit.hash, commit.subject
    )
}

pub const HTML: Template = Template {
    header: html_header,
    section: html_section,
    commit_line: html_commit,
    section_end: "</ul>\n",
    empty: "<p>No services changed.</p>\n",
    footer: "</body>\n</html>\n",
};

fn html_header(h: &ReportHeader) -> String {
    let url = escape_html(&h.url);
    format!(
        "<html>\n<body>\n<h1><a href=\"{url}\">{url}</a>: <a href=\"{}\">{}..{}</a></h1>\n",
        escape_html(&compare_url(&h.url, &h.old, &h.new)),
        escape_html(short_rev(&h.old)),
        escape_html(short_rev(&h.new)),
    )
}

fn html_section(e: &ChangelogEntry) -> String {
    let d = &e.diff;
    format!(
        "<h2><a href=\"{}\">{}</a>: <a href=\"{}\">{}..{}</a></h2>\n<p>Last updated: {}</p>\n<ul>\n",
        escape_html(&d.url),
        escape_html(&d.names.join(", ")),
        escape_html(&compare_url(&d.url, &d.old_hash, &d.new_hash)),
        escape_html(short_rev(&d.old_hash)),
        escape_html(short_rev(&d.new_hash)),
        escape_html(&e.last_updated),
    )
}

fn html_commit(commit: &Commit, url: &str) -> String {
    format!(
        "<li><a href=\"{}/commit/{}\">{}</a> {}</li>\n",
        escape_html(url),
        escape_html(&commit.hash),
        escape_html(&commit.short_hash),
        escape_html(&commit.subject),
    )
}

/// Escapes text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
