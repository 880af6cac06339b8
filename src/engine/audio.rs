//! Narration audio download.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use indicatif::ProgressBar;
use reqwest::{Client, Response};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::api::{ArticleInfo, Item};
use crate::cancel::{ensure_active, run_cancellable};
use crate::download::Format;
use crate::engine::AudioFetcher;
use crate::error::{Error, Result};
use crate::fs::{column_file_name, partial_path};
use crate::output::create_download_bar;

/// Minimum file size to show progress bar (5 MB).
const PROGRESS_THRESHOLD: u64 = 5 * 1024 * 1024;

/// Streams article audio into `<title>.mp3`.
pub struct Mp3Fetcher {
    client: Client,
}

impl Mp3Fetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AudioFetcher for Mp3Fetcher {
    async fn fetch(
        &self,
        item: &Item,
        content: &ArticleInfo,
        project_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<PathBuf>> {
        let Some(url) = content.audio_url.as_deref().filter(|u| !u.is_empty()) else {
            return Ok(None);
        };

        let output_path = project_dir.join(column_file_name(&item.title, Format::Audio));
        download_to_file(&self.client, url, &output_path, cancel).await?;

        tracing::debug!("Saved audio: {}", output_path.display());
        Ok(Some(output_path))
    }
}

/// Stream `url` into `output_path`, checking for interrupts between chunks.
///
/// Data lands in a `.part` sibling first so an interrupted transfer never
/// leaves a file that looks complete.
async fn download_to_file(
    client: &Client,
    url: &str,
    output_path: &Path,
    cancel: &CancellationToken,
) -> Result<()> {
    tracing::debug!("GET {}", url);
    let response = run_cancellable(cancel, async { Ok(client.get(url).send().await?) }).await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Download(format!("HTTP {} for {}", status, url)));
    }

    let content_length = response.content_length();
    let progress = content_length
        .filter(|&len| len > PROGRESS_THRESHOLD)
        .map(|len| {
            let name = output_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            create_download_bar(len, &name)
        });

    let partial = partial_path(output_path);
    let result = run_cancellable(
        cancel,
        write_stream(response, &partial, progress.as_ref(), cancel),
    )
    .await;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    if let Err(e) = result {
        if let Err(remove) = tokio::fs::remove_file(&partial).await {
            tracing::debug!("Failed to remove {}: {}", partial.display(), remove);
        }
        return Err(e);
    }

    tokio::fs::rename(&partial, output_path).await?;
    Ok(())
}

async fn write_stream(
    response: Response,
    partial: &Path,
    progress: Option<&ProgressBar>,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut file = File::create(partial).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        ensure_active(cancel)?;
        let chunk = chunk.map_err(|e| Error::Download(format!("Stream error: {}", e)))?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if let Some(pb) = progress {
            pb.set_position(downloaded);
        }
    }

    file.flush().await?;
    Ok(())
}
