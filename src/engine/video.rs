//! Video course engines.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::api::{Catalog, VideoInfo};
use crate::cancel::ensure_active;
use crate::engine::hls::HlsDownloader;
use crate::engine::{VideoFetcher, VideoRequest};
use crate::error::Result;
use crate::fs::video_file_name;

/// Downloads regular video course lessons.
pub struct StandardVideoEngine {
    catalog: Arc<dyn Catalog>,
    hls: HlsDownloader,
}

impl StandardVideoEngine {
    pub fn new(catalog: Arc<dyn Catalog>, hls: HlsDownloader) -> Self {
        Self { catalog, hls }
    }
}

#[async_trait]
impl VideoFetcher for StandardVideoEngine {
    async fn fetch(&self, request: &VideoRequest<'_>, cancel: &CancellationToken) -> Result<PathBuf> {
        ensure_active(cancel)?;
        let info = self
            .catalog
            .video_info(request.item.id, request.quality)
            .await?;
        download(&self.hls, &info, request, cancel).await
    }
}

/// Downloads training-program lessons hosted by the video vendor.
pub struct TrainingVideoEngine {
    catalog: Arc<dyn Catalog>,
    hls: HlsDownloader,
}

impl TrainingVideoEngine {
    pub fn new(catalog: Arc<dyn Catalog>, hls: HlsDownloader) -> Self {
        Self { catalog, hls }
    }
}

#[async_trait]
impl VideoFetcher for TrainingVideoEngine {
    async fn fetch(&self, request: &VideoRequest<'_>, cancel: &CancellationToken) -> Result<PathBuf> {
        ensure_active(cancel)?;
        let info = self
            .catalog
            .training_video_info(request.product.id, request.item.id, request.quality)
            .await?;
        download(&self.hls, &info, request, cancel).await
    }
}

async fn download(
    hls: &HlsDownloader,
    info: &VideoInfo,
    request: &VideoRequest<'_>,
    cancel: &CancellationToken,
) -> Result<PathBuf> {
    let output_path = request
        .project_dir
        .join(video_file_name(&request.item.title, request.quality));
    tracing::debug!(
        "Fetching '{}' ({} bytes) from {}",
        request.item.title,
        info.size,
        info.playlist_url
    );
    hls.download(&info.playlist_url, &output_path, request.concurrency, cancel)
        .await
}
