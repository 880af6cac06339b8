//! HLS stream downloading.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use futures::stream::{self, StreamExt, TryStreamExt};
use m3u8_rs::{KeyMethod, MasterPlaylist, MediaPlaylist, Playlist, VariantStream};
use reqwest::Client;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::cancel::{ensure_active, run_cancellable};
use crate::error::{Error, Result};
use crate::fs::partial_path;
use crate::output::create_segment_bar;

/// Name of the rewritten playlist inside the working directory.
const LOCAL_PLAYLIST: &str = "index.m3u8";

/// Downloads an HLS stream and remuxes it into a single MPEG-TS file.
///
/// Segments and keys are fetched with the shared client, then ffmpeg reads a
/// local copy of the playlist. Encrypted streams are decrypted by ffmpeg.
#[derive(Clone)]
pub struct HlsDownloader {
    client: Client,
}

impl HlsDownloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Download `playlist_url` into `output_path` fetching up to
    /// `concurrency` segments at a time.
    pub async fn download(
        &self,
        playlist_url: &str,
        output_path: &Path,
        concurrency: usize,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        ensure_active(cancel)?;

        let (media_url, mut playlist) = self.media_playlist(playlist_url).await?;
        if playlist.segments.is_empty() {
            return Err(Error::M3U8("No segments found in playlist".into()));
        }

        // Create temp directory for segments
        let parent = output_path
            .parent()
            .ok_or_else(|| Error::M3U8("Output path has no parent directory".into()))?;
        let temp_dir = parent.join(format!(".m3u8_temp_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&temp_dir).await?;

        let result = self
            .fetch_and_remux(
                &media_url,
                &mut playlist,
                &temp_dir,
                output_path,
                concurrency,
                cancel,
            )
            .await;

        // Clean up temp directory
        let _ = fs::remove_dir_all(&temp_dir).await;

        result?;
        Ok(output_path.to_path_buf())
    }

    /// Fetch the playlist, following a master playlist to its best variant.
    async fn media_playlist(&self, url: &str) -> Result<(String, MediaPlaylist)> {
        match parse_playlist(&self.fetch_text(url).await?)? {
            Playlist::MediaPlaylist(media) => Ok((url.to_string(), media)),
            Playlist::MasterPlaylist(master) => {
                let variant = best_variant(&master)
                    .ok_or_else(|| Error::M3U8("No variants in master playlist".into()))?;
                let variant_url = resolve_url(url, &variant.uri)?;
                tracing::debug!("Using variant {} ({} bps)", variant_url, variant.bandwidth);

                match parse_playlist(&self.fetch_text(&variant_url).await?)? {
                    Playlist::MediaPlaylist(media) => Ok((variant_url, media)),
                    Playlist::MasterPlaylist(_) => {
                        Err(Error::M3U8("Expected media playlist".into()))
                    }
                }
            }
        }
    }

    async fn fetch_and_remux(
        &self,
        base_url: &str,
        playlist: &mut MediaPlaylist,
        temp_dir: &Path,
        output_path: &Path,
        concurrency: usize,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut key_files = HashMap::new();
        for (index, key_url) in key_urls(playlist, base_url)?.into_iter().enumerate() {
            ensure_active(cancel)?;
            let name = format!("key_{}.key", index);
            let bytes = self.fetch_bytes(&key_url).await?;
            fs::write(temp_dir.join(&name), &bytes).await?;
            key_files.insert(key_url, name);
        }

        let segment_urls = localize(playlist, base_url, &key_files)?;
        let label = output_path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.download_segments(&segment_urls, temp_dir, concurrency, &label, cancel)
            .await?;

        let local_playlist = temp_dir.join(LOCAL_PLAYLIST);
        let mut rendered = Vec::new();
        playlist.write_to(&mut rendered)?;
        fs::write(&local_playlist, &rendered).await?;

        ensure_active(cancel)?;
        remux(&local_playlist, output_path).await
    }

    /// Download all segments concurrently.
    async fn download_segments(
        &self,
        urls: &[String],
        temp_dir: &Path,
        concurrency: usize,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let bar = create_segment_bar(urls.len() as u64, label);

        let fetches = stream::iter(urls.iter().cloned().enumerate())
            .map(|(i, url)| {
                let segment_path = temp_dir.join(segment_file_name(i));
                let bar = &bar;
                async move {
                    ensure_active(cancel)?;
                    let bytes = self.fetch_bytes(&url).await?;
                    let mut file = File::create(&segment_path).await?;
                    file.write_all(&bytes).await?;
                    file.flush().await?;
                    bar.inc(1);
                    Ok::<(), Error>(())
                }
            })
            .buffer_unordered(concurrency.max(1))
            .try_collect::<Vec<()>>();

        let result = run_cancellable(cancel, fetches).await;
        bar.finish_and_clear();
        result.map(|_| ())
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let bytes = self.fetch_bytes(url).await?;
        String::from_utf8(bytes)
            .map_err(|e| Error::M3U8(format!("Playlist is not UTF-8: {}", e)))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        tracing::trace!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Download(format!("HTTP {} for {}", status, url)));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Download(format!("Failed to read {}: {}", url, e)))?;
        Ok(bytes.to_vec())
    }
}

fn parse_playlist(content: &str) -> Result<Playlist> {
    m3u8_rs::parse_playlist_res(content.as_bytes())
        .map_err(|e| Error::M3U8(format!("Failed to parse playlist: {:?}", e)))
}

/// Highest-bandwidth variant of a master playlist.
fn best_variant(master: &MasterPlaylist) -> Option<&VariantStream> {
    master
        .variants
        .iter()
        .filter(|v| !v.is_i_frame)
        .max_by_key(|v| v.bandwidth)
}

/// Resolve a potentially relative URL against a base URL.
fn resolve_url(base: &str, path: &str) -> Result<String> {
    if path.starts_with("http://") || path.starts_with("https://") {
        return Ok(path.to_string());
    }

    let base_url = url::Url::parse(base)?;
    let resolved = base_url.join(path)?;
    Ok(resolved.to_string())
}

fn segment_file_name(index: usize) -> String {
    format!("segment_{:05}.ts", index)
}

fn is_encrypted(method: &KeyMethod) -> bool {
    !matches!(method, KeyMethod::None)
}

/// Absolute URLs of the distinct decryption keys, in playlist order.
fn key_urls(playlist: &MediaPlaylist, base_url: &str) -> Result<Vec<String>> {
    let mut urls: Vec<String> = Vec::new();
    for key in playlist.segments.iter().filter_map(|s| s.key.as_ref()) {
        if !is_encrypted(&key.method) {
            continue;
        }
        if let Some(uri) = &key.uri {
            let url = resolve_url(base_url, uri)?;
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
    }
    Ok(urls)
}

/// Point the playlist at local segment and key files.
///
/// Returns the remote segment URLs in playlist order; segment `i` is expected
/// at [`segment_file_name`]`(i)` next to the rewritten playlist.
fn localize(
    playlist: &mut MediaPlaylist,
    base_url: &str,
    key_files: &HashMap<String, String>,
) -> Result<Vec<String>> {
    let mut urls = Vec::with_capacity(playlist.segments.len());

    for (index, segment) in playlist.segments.iter_mut().enumerate() {
        urls.push(resolve_url(base_url, &segment.uri)?);
        segment.uri = segment_file_name(index);

        if let Some(key) = segment.key.as_mut() {
            if !is_encrypted(&key.method) {
                continue;
            }
            if let Some(uri) = key.uri.as_mut() {
                let url = resolve_url(base_url, uri)?;
                let local = key_files
                    .get(&url)
                    .ok_or_else(|| Error::M3U8(format!("Key {} was not downloaded", url)))?;
                *uri = local.clone();
            }
        }
    }

    Ok(urls)
}

/// Remux a local playlist into `output` using ffmpeg.
async fn remux(playlist: &Path, output: &Path) -> Result<()> {
    let partial = partial_path(output);

    let playlist_str = playlist
        .to_str()
        .ok_or_else(|| Error::M3U8("Invalid path encoding for playlist".into()))?;
    let partial_str = partial
        .to_str()
        .ok_or_else(|| Error::M3U8("Invalid path encoding for output".into()))?;

    let status = Command::new("ffmpeg")
        .args([
            "-y",
            "-loglevel",
            "error",
            "-allowed_extensions",
            "ALL",
            "-protocol_whitelist",
            "file,crypto,data",
            "-i",
            playlist_str,
            "-c",
            "copy",
            "-f",
            "mpegts",
            partial_str,
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FFmpegNotFound
            } else {
                Error::FFmpeg(format!("Failed to run ffmpeg: {}", e))
            }
        })?;

    if !status.success() {
        let _ = fs::remove_file(&partial).await;
        return Err(Error::FFmpeg(format!(
            "ffmpeg exited with status: {}",
            status
        )));
    }

    fs::rename(&partial, output).await?;
    Ok(())
}
