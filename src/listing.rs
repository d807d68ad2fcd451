//! HTML directory listings.
use std::{io::Result, path::Path};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

// characters left alone when quoting a link target.
const HREF: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub name: String,
    pub is_dir: bool,
    pub is_symlink: bool,
}

impl Entry {
    fn display_name(&self) -> String {
        if self.is_symlink {
            format!("{}@", self.name)
        } else if self.is_dir {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }

    fn href(&self) -> String {
        let name = if self.is_dir {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        };
        utf8_percent_encode(&name, HREF).to_string()
    }
}

/// Read `dir` and render its listing; `uri_path` is the request path it was reached by.
pub async fn render(dir: &Path, uri_path: &str) -> Result<String> {
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        let file_type = entry.file_type().await?;
        // a symlink to a directory is listed as a directory
        let is_dir = if file_type.is_symlink() {
            tokio::fs::metadata(entry.path())
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false)
        } else {
            file_type.is_dir()
        };
        entries.push(Entry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
            is_symlink: file_type.is_symlink(),
        });
    }
    Ok(render_entries(uri_path, entries))
}

pub fn render_entries(uri_path: &str, mut entries: Vec<Entry>) -> String {
    entries.sort_by_key(|e| e.name.to_lowercase());
    let display_path = percent_decode_str(uri_path).decode_utf8_lossy();
    let title = format!("Directory listing for {}", escape_html(&display_path));
    let mut html = String::with_capacity(256 + entries.len() * 64);
    html.push_str("<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{title}</title>\n</head>\n<body>\n"));
    html.push_str(&format!("<h1>{title}</h1>\n<hr>\n<ul>\n"));
    for entry in &entries {
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            escape_html(&entry.href()),
            escape_html(&entry.display_name()),
        ));
    }
    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    html
}

pub(crate) fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod test {
    use super::*;

    fn entry(name: &str, is_dir: bool) -> Entry {
        Entry {
            name: name.into(),
            is_dir,
            is_symlink: false,
        }
    }

    #[test]
    fn test_render_entries() {
        let html = render_entries(
            "/tools/",
            vec![entry("b.js", false), entry("Assets", true), entry("a b.html", false)],
        );
        assert!(html.contains("<title>Directory listing for /tools/</title>"));
        let a = html.find("a%20b.html").unwrap();
        let assets = html.find("<a href=\"Assets/\">Assets/</a>").unwrap();
        let b = html.find("<a href=\"b.js\">b.js</a>").unwrap();
        assert!(a < assets && assets < b);
    }

    #[test]
    fn test_render_escapes_names() {
        let html = render_entries("/%3Cx%3E/", vec![entry("<script>.js", false)]);
        assert!(html.contains("Directory listing for /&lt;x&gt;/"));
        assert!(html.contains(">&lt;script&gt;.js</a>"));
        assert!(html.contains("href=\"%3Cscript%3E.js\""));
        assert!(!html.contains("<script>"));
    }

    #[tokio::test]
    async fn test_render_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), b"").unwrap();
        std::fs::create_dir(dir.path().join("img")).unwrap();
        let html = render(dir.path(), "/").await.unwrap();
        assert!(html.contains("<a href=\"app.js\">app.js</a>"));
        assert!(html.contains("<a href=\"img/\">img/</a>"));
    }
}
