//! Detection of outputs already present in a project directory.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::api::Item;
use crate::config::VideoQuality;
use crate::download::format::{Format, FormatMask};
use crate::error::Result;
use crate::fs::{column_file_name, video_file_name};

/// File names found in a project directory at batch start.
///
/// Taken once per batch; every item of the batch is judged against the same
/// snapshot.
#[derive(Debug, Clone, Default)]
pub struct ResumeSnapshot {
    files: HashSet<String>,
}

impl ResumeSnapshot {
    /// Read the directory once. A missing directory is an empty snapshot.
    pub async fn capture(dir: &Path) -> Result<Self> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Project directory {} does not exist yet", dir.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = HashSet::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                files.insert(name.to_string());
            }
        }

        tracing::debug!("Found {} files in {}", files.len(), dir.display());
        Ok(Self { files })
    }

    /// Snapshot over a fixed set of names.
    #[cfg(test)]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a file with this exact name exists.
    pub fn contains(&self, file_name: &str) -> bool {
        self.files.contains(file_name)
    }

    /// Formats of a column item already on disk.
    pub fn column_formats(&self, title: &str) -> FormatMask {
        let mut mask = FormatMask::EMPTY;
        for format in Format::ALL {
            if self.contains(&column_file_name(title, format)) {
                mask.insert(format);
            }
        }
        mask
    }

    /// Whether a video item exists at the given quality.
    pub fn has_video(&self, title: &str, quality: VideoQuality) -> bool {
        self.contains(&video_file_name(title, quality))
    }

    /// Existing formats of every column item, keyed by item id.
    pub fn column_states(&self, items: &[Item]) -> HashMap<i64, FormatMask> {
        items
            .iter()
            .map(|item| (item.id, self.column_formats(&item.title)))
            .collect()
    }

    /// Presence of every video item at the given quality, keyed by item id.
    pub fn video_states(&self, items: &[Item], quality: VideoQuality) -> HashMap<i64, bool> {
        items
            .iter()
            .map(|item| (item.id, self.has_video(&item.title, quality)))
            .collect()
    }
}
