//! Content engines.
//!
//! Each engine turns one catalog item into one output file. The coordinator
//! only sees the traits below; the implementations in this module are the
//! production engines:
//! - [`document::PdfRenderer`] prints article pages through a [`browser`] session
//! - [`text::MarkdownExtractor`] converts article HTML to Markdown
//! - [`audio::Mp3Fetcher`] streams narration audio
//! - [`video::StandardVideoEngine`] and [`video::TrainingVideoEngine`] fetch HLS
//!   streams via [`hls::HlsDownloader`]

pub mod audio;
pub mod browser;
pub mod document;
pub mod hls;
pub mod text;
pub mod video;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::api::{ArticleInfo, Item, Product};
use crate::config::VideoQuality;
use crate::download::RenderSession;
use crate::error::Result;

pub use audio::Mp3Fetcher;
pub use browser::ChromeLauncher;
pub use document::PdfRenderer;
pub use hls::HlsDownloader;
pub use text::MarkdownExtractor;
pub use video::{StandardVideoEngine, TrainingVideoEngine};

/// A column article to render as a document.
#[derive(Debug, Clone)]
pub struct DocumentRequest<'a> {
    pub item: &'a Item,
    pub project_dir: &'a Path,
    pub include_comments: bool,
}

/// Renders column articles to documents using the batch's shared session.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(
        &self,
        request: &DocumentRequest<'_>,
        session: &dyn RenderSession,
        cancel: &CancellationToken,
    ) -> Result<PathBuf>;
}

/// Writes the text of a column article.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(
        &self,
        item: &Item,
        content: &ArticleInfo,
        project_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf>;
}

/// Fetches the narration audio of a column article.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Returns `None` when the article has no audio.
    async fn fetch(
        &self,
        item: &Item,
        content: &ArticleInfo,
        project_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<PathBuf>>;
}

/// A video item to download.
#[derive(Debug, Clone)]
pub struct VideoRequest<'a> {
    pub product: &'a Product,
    pub item: &'a Item,
    pub project_dir: &'a Path,
    pub quality: VideoQuality,
    /// Parallelism hint for segment downloads.
    pub concurrency: usize,
}

/// Downloads one video item.
#[async_trait]
pub trait VideoFetcher: Send + Sync {
    async fn fetch(&self, request: &VideoRequest<'_>, cancel: &CancellationToken)
        -> Result<PathBuf>;
}
