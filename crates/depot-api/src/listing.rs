//! Fixed-width HTML directory index.

use chrono::{DateTime, Utc};

use depot_vfs::{Entry, EntryStat};

const NAME_COL_WIDTH: usize = 50;
const SIZE_COL_WIDTH: usize = 20;

/// One row of the index.
#[derive(Debug, Clone)]
pub struct IndexRow {
    pub entry: Entry,
    pub stat: Option<EntryStat>,
}

/// Render the index page for `title_path` (context path plus directory).
pub fn render(title_path: &str, has_parent: bool, rows: &[IndexRow], now: DateTime<Utc>) -> String {
    let title = escape(title_path);
    let mut out = String::with_capacity(256 + rows.len() * 128);
    out.push_str("<html>\n  <head>\n");
    out.push_str(&format!("    <title>Index of {title}</title>\n"));
    out.push_str("    <meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\"/>\n");
    out.push_str("</head>\n<body>\n");
    out.push_str(&format!("<h1>Index of {title}</h1>\n  <hr/>\n<pre>"));

    if has_parent {
        out.push_str("<a href='../'>../</a>\n");
    }
    for row in rows {
        out.push_str(&render_row(row, now));
        out.push('\n');
    }

    out.push_str("</pre>  <hr/>\n</body>\n</html>\n");
    out
}

fn render_row(row: &IndexRow, now: DateTime<Utc>) -> String {
    let name = row.entry.name();
    let (href, label) = if row.entry.is_directory() {
        (format!("./{}/", encode_segment(name)), format!("{name}/"))
    } else {
        (format!("./{}", encode_segment(name)), name.to_string())
    };
    let padding = NAME_COL_WIDTH.saturating_sub(label.chars().count());
    let modified = row.stat.map(|s| s.last_modified).unwrap_or(now);
    let size = match row.stat.and_then(|s| s.size) {
        Some(size) if !row.entry.is_directory() => size.to_string(),
        _ => "-".to_string(),
    };
    format!(
        "<a href=\"{href}\">{}</a>{} {}{size:>width$}",
        escape(&truncate_name(&label)),
        " ".repeat(padding),
        modified.format("%d-%b-%Y %H:%M"),
        width = SIZE_COL_WIDTH,
    )
}

/// Names of 50 characters or more are cut to 49 plus `>`.
fn truncate_name(name: &str) -> String {
    if name.chars().count() < NAME_COL_WIDTH {
        return name.to_string();
    }
    let mut cut: String = name.chars().take(NAME_COL_WIDTH - 1).collect();
    cut.push('>');
    cut
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for b in segment.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use depot_vfs::{FileKind, VfsPath};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).single().unwrap()
    }

    fn file(name: &str, size: u64) -> IndexRow {
        IndexRow {
            entry: Entry::File {
                path: VfsPath::root().join(name),
                kind: FileKind::Catalog,
            },
            stat: Some(EntryStat {
                size: Some(size),
                last_modified: at(),
            }),
        }
    }

    #[test]
    fn file_row_layout() {
        let row = render_row(&file("lib-1.0.jar", 1234), at());
        let expected = format!(
            "<a href=\"./lib-1.0.jar\">lib-1.0.jar</a>{} 05-Mar-2024 14:30{:>20}",
            " ".repeat(50 - "lib-1.0.jar".len()),
            "1234"
        );
        assert_eq!(row, expected);
    }

    #[test]
    fn directory_row_has_slash_and_dash() {
        let row = IndexRow {
            entry: Entry::Directory(VfsPath::root().join("org")),
            stat: None,
        };
        let rendered = render_row(&row, at());
        assert!(rendered.starts_with("<a href=\"./org/\">org/</a>"));
        assert!(rendered.ends_with(&format!("{:>20}", "-")));
    }

    #[test]
    fn long_names_are_truncated() {
        let long = "x".repeat(60);
        let truncated = truncate_name(&long);
        assert_eq!(truncated.chars().count(), 50);
        assert!(truncated.ends_with('>'));
        assert_eq!(truncate_name("short"), "short");
    }

    #[test]
    fn page_has_title_and_parent_link() {
        let page = render("/repo/org/", true, &[file("a.jar", 1)], at());
        assert!(page.contains("<title>Index of /repo/org/</title>"));
        assert!(page.contains("<h1>Index of /repo/org/</h1>"));
        assert!(page.contains("<a href='../'>../</a>"));

        let root = render("/", false, &[], at());
        assert!(!root.contains("../"));
    }

    #[test]
    fn special_characters_are_encoded() {
        assert_eq!(encode_segment("a b+c"), "a%20b%2Bc");
        assert_eq!(escape("<a&b>"), "&lt;a&amp;b&gt;");
    }
}
