//! Article text as Markdown.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::{Captures, Regex};
use tokio_util::sync::CancellationToken;

use crate::api::{ArticleInfo, Item};
use crate::cancel::ensure_active;
use crate::download::Format;
use crate::engine::TextExtractor;
use crate::error::Result;
use crate::fs::{column_file_name, write_file_atomic};

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("static pattern")
}

static SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?is)<(script|style)[^>]*>.*?</(script|style)>"));
static PRE: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?is)<pre[^>]*>(.*?)</pre>"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?is)<h([1-6])[^>]*>(.*?)</h[1-6]>"));
static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r#"(?is)<img[^>]*?src\s*=\s*["']([^"']*)["'][^>]*>"#));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| pattern(r#"(?is)<a[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a>"#));
static STRONG: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?is)<(strong|b)(\s[^>]*)?>(.*?)</(strong|b)>"));
static EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?is)<(em|i)(\s[^>]*)?>(.*?)</(em|i)>"));
static CODE: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?is)<code[^>]*>(.*?)</code>"));
static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?is)<li[^>]*>(.*?)</li>"));
static BREAK: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)<br\s*/?>"));
static BLOCK_END: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?i)</(p|div|ul|ol|blockquote|section|table|tr)>"));
static TAG: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?s)<[^>]+>"));
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| pattern(r"\n[ \t]*(\n[ \t]*)+\n"));

/// Placeholder marker for code blocks while the rest is converted.
const CODE_MARK: char = '\u{0}';

/// Writes article HTML as `<title>.md`.
#[derive(Debug, Default, Clone)]
pub struct MarkdownExtractor;

impl MarkdownExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for MarkdownExtractor {
    async fn extract(
        &self,
        item: &Item,
        content: &ArticleInfo,
        project_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        ensure_active(cancel)?;

        let markdown = format!(
            "# {}\n\n{}\n",
            item.title.trim(),
            html_to_markdown(&content.content_html)
        );

        let output_path = project_dir.join(column_file_name(&item.title, Format::Text));
        write_file_atomic(&output_path, markdown.as_bytes()).await?;

        tracing::debug!("Saved text: {}", output_path.display());
        Ok(output_path)
    }
}

/// Convert article HTML into Markdown.
///
/// Covers the markup articles actually use: headings, paragraphs, emphasis,
/// links, images, lists and code. Anything else is reduced to its text.
pub fn html_to_markdown(html: &str) -> String {
    let text = SCRIPT.replace_all(html, "");

    // Code blocks are set aside so later rules leave their contents alone.
    let mut blocks = Vec::new();
    let text = PRE.replace_all(&text, |caps: &Captures| {
        let code = decode_entities(&TAG.replace_all(&BREAK.replace_all(&caps[1], "\n"), ""));
        blocks.push(format!("\n\n```\n{}\n```\n\n", code.trim_matches('\n')));
        format!("{}{}{}", CODE_MARK, blocks.len() - 1, CODE_MARK)
    });

    let text = HEADING.replace_all(&text, |caps: &Captures| {
        let level: usize = caps[1].parse().unwrap_or(1);
        format!("\n\n{} {}\n\n", "#".repeat(level), inline_text(&caps[2]))
    });
    let text = IMAGE.replace_all(&text, "![]($1)");
    let text = LINK.replace_all(&text, |caps: &Captures| {
        format!("[{}]({})", inline_text(&caps[2]), &caps[1])
    });
    let text = STRONG.replace_all(&text, "**$3**");
    let text = EMPHASIS.replace_all(&text, "*$3*");
    let text = CODE.replace_all(&text, "`$1`");
    let text = LIST_ITEM.replace_all(&text, |caps: &Captures| {
        format!("\n- {}", inline_text(&caps[1]))
    });
    let text = BREAK.replace_all(&text, "\n");
    let text = BLOCK_END.replace_all(&text, "\n\n");
    let text = TAG.replace_all(&text, "");
    let text = decode_entities(&text);

    let mut text = BLANK_LINES.replace_all(&text, "\n\n").trim().to_string();
    for (index, block) in blocks.iter().enumerate() {
        text = text.replace(&format!("{}{}{}", CODE_MARK, index, CODE_MARK), block);
    }

    BLANK_LINES.replace_all(&text, "\n\n").trim().to_string()
}

/// Text content of an inline fragment, single line.
fn inline_text(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_and_paragraphs() {
        let md = html_to_markdown("<h2>Why Rust</h2><p>First.</p><p>Second.</p>");
        assert_eq!(md, "## Why Rust\n\nFirst.\n\nSecond.");
    }

    #[test]
    fn test_inline_markup() {
        let md = html_to_markdown(
            r#"<p><strong>bold</strong>, <em>it</em>, <code>x &lt; y</code> and <a href="https://example.com">a <b>link</b></a></p>"#,
        );
        assert_eq!(
            md,
            "**bold**, *it*, `x < y` and [a link](https://example.com)"
        );
    }

    #[test]
    fn test_images_and_lists() {
        let md = html_to_markdown(
            r#"<p><img src="https://static001.geekbang.org/a.png" alt="x"></p><ul><li>one</li><li>two</li></ul>"#,
        );
        assert_eq!(
            md,
            "![](https://static001.geekbang.org/a.png)\n\n- one\n- two"
        );
    }

    #[test]
    fn test_code_blocks_kept_verbatim() {
        let md = html_to_markdown(
            "<p>Example:</p><pre><code>fn main() {\n    let v = a &amp;&amp; b;\n}</code></pre><p>Done</p>",
        );
        assert_eq!(
            md,
            "Example:\n\n```\nfn main() {\n    let v = a && b;\n}\n```\n\nDone"
        );
    }

    #[test]
    fn test_scripts_dropped() {
        let md = html_to_markdown("<script>alert(1)</script><p>kept</p><style>p{}</style>");
        assert_eq!(md, "kept");
    }

    #[tokio::test]
    async fn test_extract_writes_markdown_file() {
        let dir = tempfile::tempdir().unwrap();
        let item = Item {
            id: 1,
            title: "01 | Start".into(),
            index: 0,
        };
        let content = ArticleInfo {
            content_html: "<p>Hello</p>".into(),
            audio_url: None,
        };

        let path = MarkdownExtractor::new()
            .extract(&item, &content, dir.path(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("01 _ Start.md"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "# 01 | Start\n\nHello\n");
    }

    #[tokio::test]
    async fn test_extract_respects_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = MarkdownExtractor::new()
            .extract(&Item::back(), &ArticleInfo::default(), dir.path(), &cancel)
            .await;
        assert!(matches!(result, Err(crate::Error::Cancelled)));
    }
}
