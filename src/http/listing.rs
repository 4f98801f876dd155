//! HTML directory listings.
//!
//! Directories come first, then files, each sorted by name. `.git` is never
//! listed.

use std::fmt::Write as _;
use std::path::Path;

use html_escape::{encode_double_quoted_attribute, encode_text};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped in a single path segment of an `href`.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\')
    .add(b'^')
    .add(b'|')
    .add(b'[')
    .add(b']');

pub(crate) const HIDDEN: &[&str] = &[".git"];

#[derive(Debug)]
struct Entry {
    name: String,
    is_dir: bool,
    size: u64,
}

/// Render the listing of `dir`, which is served at `url_path` (raw, ending in `/`).
pub async fn render(url_path: &str, dir: &Path) -> std::io::Result<String> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if HIDDEN.contains(&name.as_str()) {
            continue;
        }
        // Follow symlinks; skip dangling ones.
        let Ok(meta) = tokio::fs::metadata(entry.path()).await else {
            continue;
        };
        entries.push(Entry {
            name,
            is_dir: meta.is_dir(),
            size: meta.len(),
        });
    }
    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));

    let title = encode_text(&percent_decode_str(url_path).decode_utf8_lossy()).into_owned();
    let mut html = String::with_capacity(512 + entries.len() * 96);
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Index of {title}</title></head>\n\
         <body>\n<h1>Index of {title}</h1>\n<ul>\n"
    );
    if url_path != "/" {
        html.push_str("<li><a href=\"../\">../</a></li>\n");
    }
    for entry in &entries {
        let encoded = utf8_percent_encode(&entry.name, SEGMENT).to_string();
        let href = encode_double_quoted_attribute(&encoded);
        let name = encode_text(&entry.name);
        if entry.is_dir {
            let _ = writeln!(html, "<li><a href=\"{href}/\">{name}/</a></li>");
        } else {
            let _ = writeln!(html, "<li><a href=\"{href}\">{name}</a> ({} bytes)</li>", entry.size);
        }
    }
    html.push_str("</ul>\n</body>\n</html>\n");
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_dirs_first_and_hides_git() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "bb").unwrap();
        std::fs::write(dir.path().join("a <1>.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("zeta")).unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();

        let html = render("/seen/", dir.path()).await.unwrap();

        let zeta = html.find("zeta/").unwrap();
        let a = html.find("a%20%3C1%3E.txt").unwrap();
        let b = html.find("b.txt").unwrap();
        assert!(zeta < a && a < b);
        assert!(html.contains("a &lt;1&gt;.txt"));
        assert!(html.contains("(2 bytes)"));
        assert!(html.contains("href=\"../\""));
        assert!(!html.contains(".git"));
        assert!(html.contains("<title>Index of /seen/</title>"));
    }

    #[tokio::test]
    async fn markup_in_names_is_escaped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x&\"y\".txt"), "").unwrap();

        let html = render("/a&b/", dir.path()).await.unwrap();

        assert!(html.contains("<title>Index of /a&amp;b/</title>"));
        assert!(html.contains("href=\"x&amp;%22y%22.txt\""));
        assert!(html.contains(">x&amp;\"y\".txt</a>"));
    }

    #[tokio::test]
    async fn root_has_no_parent_link() {
        let dir = tempfile::tempdir().unwrap();
        let html = render("/", dir.path()).await.unwrap();
        assert!(!html.contains("../"));
    }
}
