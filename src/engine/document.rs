//! Article pages printed to PDF.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::api::{SiteCookie, TIME_BASE};
use crate::cancel::ensure_active;
use crate::download::{Format, PageRequest, RenderSession};
use crate::engine::{DocumentRenderer, DocumentRequest};
use crate::error::{Error, Result};
use crate::fs::{column_file_name, write_file_atomic};

/// Prints column articles through the batch's browser session.
pub struct PdfRenderer {
    cookies: Vec<SiteCookie>,
}

impl PdfRenderer {
    /// Create a renderer that signs pages in with the given cookies.
    pub fn new(cookies: Vec<SiteCookie>) -> Self {
        Self { cookies }
    }
}

/// Address of the reading page of an article.
pub fn article_url(article_id: i64) -> String {
    format!("{}/column/article/{}", TIME_BASE, article_id)
}

#[async_trait]
impl DocumentRenderer for PdfRenderer {
    async fn render(
        &self,
        request: &DocumentRequest<'_>,
        session: &dyn RenderSession,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        ensure_active(cancel)?;

        let url = article_url(request.item.id);
        let page = PageRequest {
            url: &url,
            cookies: &self.cookies,
            strip_comments: !request.include_comments,
        };

        let pdf = session.print_page(&page, cancel).await?;
        if pdf.is_empty() {
            return Err(Error::Download(format!("Empty PDF for {}", url)));
        }

        let output_path = request
            .project_dir
            .join(column_file_name(&request.item.title, Format::Document));
        write_file_atomic(&output_path, &pdf).await?;

        tracing::debug!("Saved document: {}", output_path.display());
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Item;
    use crate::testing::FakeSession;

    fn item() -> Item {
        Item {
            id: 100,
            title: "02 | Ownership".into(),
            index: 1,
        }
    }

    #[test]
    fn test_article_url() {
        assert_eq!(
            article_url(100),
            "https://time.geekbang.org/column/article/100"
        );
    }

    #[tokio::test]
    async fn test_render_writes_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let session = FakeSession::default();
        let item = item();
        let request = DocumentRequest {
            item: &item,
            project_dir: dir.path(),
            include_comments: false,
        };

        let path = PdfRenderer::new(Vec::new())
            .render(&request, &session, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("02 _ Ownership.pdf"));
        assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF"));
        assert_eq!(
            session.printed(),
            vec![(article_url(100), true)]
        );
    }

    #[tokio::test]
    async fn test_render_keeps_comments_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let session = FakeSession::default();
        let item = item();
        let request = DocumentRequest {
            item: &item,
            project_dir: dir.path(),
            include_comments: true,
        };

        PdfRenderer::new(Vec::new())
            .render(&request, &session, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(session.printed(), vec![(article_url(100), false)]);
    }
}
