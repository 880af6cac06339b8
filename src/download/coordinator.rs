//! Batch download coordination.
//!
//! A batch is an ordered run over items of one product. Items are resolved one
//! at a time in catalog order: outputs already on disk are skipped, missing ones
//! are produced by the engines, and the first engine failure aborts the batch.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::api::{Catalog, Item, Product, ProductType};
use crate::cancel::{ensure_active, run_cancellable, sleep_cancellable};
use crate::config::{Config, VideoQuality};
use crate::download::delay::{random_jitter, DelayPolicy, COLUMN_JITTER_MAX};
use crate::download::format::{missing, FormatMask};
use crate::download::resume::ResumeSnapshot;
use crate::download::session::{SessionLauncher, SessionManager, SessionOptions};
use crate::download::state::BatchState;
use crate::engine::{
    AudioFetcher, DocumentRenderer, DocumentRequest, TextExtractor, VideoFetcher, VideoRequest,
};
use crate::error::Result;
use crate::fs::ensure_dir;
use crate::output::{print_batch_summary, print_progress};

/// The engines a coordinator dispatches to.
#[derive(Clone)]
pub struct Engines {
    pub document: Arc<dyn DocumentRenderer>,
    pub text: Arc<dyn TextExtractor>,
    pub audio: Arc<dyn AudioFetcher>,
    pub standard_video: Arc<dyn VideoFetcher>,
    pub training_video: Arc<dyn VideoFetcher>,
}

/// Per-run settings derived from the configuration.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub formats: FormatMask,
    pub quality: VideoQuality,
    pub concurrency: usize,
    pub include_comments: bool,
    pub session: SessionOptions,
}

impl BatchSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            formats: config.format_mask()?,
            quality: config.options.quality,
            concurrency: config.options.concurrency,
            include_comments: config.options.comments,
            session: SessionOptions {
                proxy: config.options.proxy.clone(),
                visible: config.options.debug,
            },
        })
    }
}

/// Items of one product to download into a project directory.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    pub product: &'a Product,
    pub items: &'a [Item],
    pub project_dir: &'a Path,
}

/// Runs download batches.
pub struct Coordinator {
    catalog: Arc<dyn Catalog>,
    engines: Engines,
    launcher: Arc<dyn SessionLauncher>,
    settings: BatchSettings,
    delay: DelayPolicy,
    cancel: CancellationToken,
}

impl Coordinator {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        engines: Engines,
        launcher: Arc<dyn SessionLauncher>,
        settings: BatchSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            catalog,
            engines,
            launcher,
            settings,
            delay: random_jitter(COLUMN_JITTER_MAX),
            cancel,
        }
    }

    /// Replace the pause policy between column items.
    pub fn with_delay(mut self, delay: DelayPolicy) -> Self {
        self.delay = delay;
        self
    }

    /// Download every item of `batch` that is not yet complete on disk.
    ///
    /// `state` keeps the progress reached even when the batch aborts.
    pub async fn run(&self, batch: &Batch<'_>, state: &mut BatchState) -> Result<()> {
        let result = self.run_batch(batch, state).await;
        print_batch_summary(state);
        result
    }

    async fn run_batch(&self, batch: &Batch<'_>, state: &mut BatchState) -> Result<()> {
        ensure_active(&self.cancel)?;

        let snapshot = ResumeSnapshot::capture(batch.project_dir).await?;
        ensure_dir(batch.project_dir).await?;

        match batch.product.kind {
            ProductType::Column => self.run_column(batch, &snapshot, state).await,
            ProductType::StandardVideo => {
                self.run_video(batch, &snapshot, self.engines.standard_video.as_ref(), state)
                    .await
            }
            ProductType::TrainingVideo => {
                self.run_video(batch, &snapshot, self.engines.training_video.as_ref(), state)
                    .await
            }
        }
    }

    async fn run_column(
        &self,
        batch: &Batch<'_>,
        snapshot: &ResumeSnapshot,
        state: &mut BatchState,
    ) -> Result<()> {
        let existing = snapshot.column_states(batch.items);
        let mut session = SessionManager::new(self.launcher.as_ref(), self.settings.session.clone());

        let result = self
            .column_items(batch, &existing, &mut session, state)
            .await;

        if let Err(e) = session.release().await {
            if result.is_err() {
                tracing::warn!("Failed to stop rendering session: {}", e);
            } else {
                return Err(e);
            }
        }

        result
    }

    async fn column_items(
        &self,
        batch: &Batch<'_>,
        existing: &HashMap<i64, FormatMask>,
        session: &mut SessionManager<'_>,
        state: &mut BatchState,
    ) -> Result<()> {
        let last = batch.items.len().saturating_sub(1);

        for (index, item) in batch.items.iter().enumerate() {
            ensure_active(&self.cancel)?;

            let already = existing.get(&item.id).copied().unwrap_or_default();
            let todo = missing(self.settings.formats, already);

            if todo.is_empty() {
                tracing::debug!("Skipping '{}': {} already present", item.title, already);
                state.record_skipped();
                print_progress(state);
                continue;
            }

            tracing::debug!("Downloading {} for '{}'", todo, item.title);
            self.download_column_item(batch, item, todo, session).await?;

            state.record_downloaded();
            print_progress(state);

            if index < last {
                let pause = (self.delay)(index);
                if !pause.is_zero() {
                    sleep_cancellable(&self.cancel, pause).await?;
                }
            }
        }

        Ok(())
    }

    async fn download_column_item(
        &self,
        batch: &Batch<'_>,
        item: &Item,
        todo: FormatMask,
        session: &mut SessionManager<'_>,
    ) -> Result<()> {
        if todo.wants_document() {
            let render_session = run_cancellable(&self.cancel, session.acquire()).await?;
            let request = DocumentRequest {
                item,
                project_dir: batch.project_dir,
                include_comments: self.settings.include_comments,
            };
            self.engines
                .document
                .render(&request, render_session, &self.cancel)
                .await
                .map_err(|e| e.in_engine("document", &item.title))?;
        }

        if todo.wants_text() || todo.wants_audio() {
            let content =
                run_cancellable(&self.cancel, self.catalog.article_info(item.id)).await?;

            if todo.wants_text() {
                ensure_active(&self.cancel)?;
                self.engines
                    .text
                    .extract(item, &content, batch.project_dir, &self.cancel)
                    .await
                    .map_err(|e| e.in_engine("text", &item.title))?;
            }

            if todo.wants_audio() {
                ensure_active(&self.cancel)?;
                let written = self
                    .engines
                    .audio
                    .fetch(item, &content, batch.project_dir, &self.cancel)
                    .await
                    .map_err(|e| e.in_engine("audio", &item.title))?;
                if written.is_none() {
                    tracing::warn!("'{}' has no audio", item.title);
                }
            }
        }

        Ok(())
    }

    async fn run_video(
        &self,
        batch: &Batch<'_>,
        snapshot: &ResumeSnapshot,
        engine: &dyn VideoFetcher,
        state: &mut BatchState,
    ) -> Result<()> {
        let present = snapshot.video_states(batch.items, self.settings.quality);

        for item in batch.items {
            ensure_active(&self.cancel)?;

            if present.get(&item.id).copied().unwrap_or(false) {
                tracing::debug!("Skipping '{}': video already present", item.title);
                state.record_skipped();
                print_progress(state);
                continue;
            }

            let request = VideoRequest {
                product: batch.product,
                item,
                project_dir: batch.project_dir,
                quality: self.settings.quality,
                concurrency: self.settings.concurrency,
            };
            engine
                .fetch(&request, &self.cancel)
                .await
                .map_err(|e| e.in_engine("video", &item.title))?;

            state.record_downloaded();
            print_progress(state);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Harness {
        catalog: Arc<FakeCatalog>,
        engines: RecordingEngines,
        launcher: Arc<FakeLauncher>,
        cancel: CancellationToken,
        delays: Arc<AtomicUsize>,
        dir: tempfile::TempDir,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                catalog: Arc::new(FakeCatalog::default()),
                engines: RecordingEngines::default(),
                launcher: Arc::new(FakeLauncher::default()),
                cancel: CancellationToken::new(),
                delays: Arc::new(AtomicUsize::new(0)),
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn coordinator(&self, formats: u8) -> Coordinator {
            let settings = BatchSettings {
                formats: FormatMask::from_bits_truncate(formats),
                quality: VideoQuality::Sd,
                concurrency: 2,
                include_comments: true,
                session: SessionOptions::default(),
            };
            let delays = Arc::clone(&self.delays);
            Coordinator::new(
                self.catalog.clone(),
                self.engines.engines(),
                self.launcher.clone(),
                settings,
                self.cancel.clone(),
            )
            .with_delay(Arc::new(move |_| {
                delays.fetch_add(1, Ordering::SeqCst);
                Duration::ZERO
            }))
        }

        fn touch(&self, name: &str) {
            std::fs::write(self.dir.path().join(name), b"done").unwrap();
        }

        async fn run(&self, formats: u8, product: &Product) -> (Result<()>, BatchState) {
            let coordinator = self.coordinator(formats);
            let mut state = BatchState::new(product.items.len());
            let batch = Batch {
                product,
                items: &product.items,
                project_dir: self.dir.path(),
            };
            let result = coordinator.run(&batch, &mut state).await;
            (result, state)
        }
    }

    #[tokio::test]
    async fn test_complete_batch_makes_no_engine_calls() {
        let h = Harness::new();
        let product = column(&["A", "B"]);
        for name in ["A.pdf", "A.md", "A.mp3", "B.pdf", "B.md", "B.mp3"] {
            h.touch(name);
        }

        let (result, state) = h.run(7, &product).await;

        assert!(result.is_ok());
        assert!(h.engines.calls().is_empty());
        assert_eq!(h.catalog.article_info_calls(), 0);
        assert_eq!(h.delays.load(Ordering::SeqCst), 0);
        assert_eq!(h.launcher.launches(), 0);
        assert_eq!((state.completed, state.skipped), (2, 2));
    }

    #[tokio::test]
    async fn test_only_missing_formats_are_dispatched() {
        let h = Harness::new();
        let product = column(&["A"]);
        h.touch("A.pdf");

        let (result, state) = h.run(5, &product).await;

        assert!(result.is_ok());
        assert_eq!(h.engines.calls(), vec!["audio:A"]);
        assert_eq!(h.launcher.launches(), 0);
        assert_eq!(state.downloaded, 1);
    }

    #[tokio::test]
    async fn test_items_dispatched_in_catalog_order() {
        let h = Harness::new();
        let product = column(&["A", "B", "C"]);

        let (result, _) = h.run(3, &product).await;

        assert!(result.is_ok());
        assert_eq!(
            h.engines.calls(),
            vec!["document:A", "text:A", "document:B", "text:B", "document:C", "text:C"]
        );
        assert_eq!(h.catalog.article_info_calls(), 3);
        // Pauses between items, none after the last one.
        assert_eq!(h.delays.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_engine_failure_aborts_batch() {
        let h = Harness::new();
        h.engines.fail_on("document:B");
        let product = column(&["A", "B", "C"]);

        let (result, state) = h.run(1, &product).await;

        assert!(matches!(result, Err(Error::Engine { engine: "document", .. })));
        assert_eq!(h.engines.calls(), vec!["document:A", "document:B"]);
        assert_eq!(state.completed, 1);
        assert_eq!(h.launcher.launches(), 1);
        assert_eq!(h.launcher.shutdowns(), 1);
    }

    #[tokio::test]
    async fn test_session_shared_across_items() {
        let h = Harness::new();
        let product = column(&["A", "B", "C"]);
        h.touch("A.pdf");

        let (result, _) = h.run(1, &product).await;

        assert!(result.is_ok());
        assert_eq!(h.engines.calls(), vec!["document:B", "document:C"]);
        assert_eq!(h.launcher.launches(), 1);
        assert_eq!(h.launcher.shutdowns(), 1);
    }

    #[tokio::test]
    async fn test_session_launch_failure_is_fatal() {
        let mut h = Harness::new();
        h.launcher = Arc::new(FakeLauncher::failing());
        let product = column(&["A", "B"]);

        let (result, state) = h.run(1, &product).await;

        assert!(matches!(result, Err(Error::Session(_))));
        assert!(h.engines.calls().is_empty());
        assert_eq!(state.completed, 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_dispatches_nothing() {
        let h = Harness::new();
        h.cancel.cancel();
        let product = column(&["A"]);

        let (result, _) = h.run(1, &product).await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(h.engines.calls().is_empty());
        assert_eq!(h.launcher.launches(), 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_stops_dispatch_and_releases() {
        let h = Harness::new();
        h.engines.cancel_on("document:A", h.cancel.clone());
        let product = column(&["A", "B"]);

        let (result, _) = h.run(1, &product).await;

        assert!(result.unwrap_err().is_cancellation());
        assert_eq!(h.engines.calls(), vec!["document:A"]);
        assert_eq!(h.launcher.launches(), 1);
        assert_eq!(h.launcher.shutdowns(), 1);
    }

    #[tokio::test]
    async fn test_cancel_during_session_launch() {
        let mut h = Harness::new();
        h.launcher = Arc::new(FakeLauncher::hanging());
        let trigger = h.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let product = column(&["A", "B"]);

        let (result, state) = h.run(1, &product).await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(h.engines.calls().is_empty());
        assert_eq!(h.launcher.shutdowns(), 0);
        assert_eq!(state.completed, 0);
    }

    #[tokio::test]
    async fn test_unusable_project_dir_aborts_before_dispatch() {
        let h = Harness::new();
        let blocker = h.dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();
        let product = column(&["A"]);
        let coordinator = h.coordinator(1);
        let mut state = BatchState::new(1);
        let batch = Batch {
            product: &product,
            items: &product.items,
            project_dir: &blocker.join("Column"),
        };

        let result = coordinator.run(&batch, &mut state).await;

        assert!(matches!(result, Err(Error::Io(_))));
        assert!(h.engines.calls().is_empty());
        assert_eq!(state, BatchState::new(1));
    }

    #[tokio::test]
    async fn test_standard_video_uses_segment_engine() {
        let h = Harness::new();
        let product = video(ProductType::StandardVideo, &["V1", "V2"]);
        h.touch("V1_sd.ts");
        h.touch("V2_hd.ts");

        let (result, state) = h.run(1, &product).await;

        assert!(result.is_ok());
        assert_eq!(h.engines.calls(), vec!["standard_video:V2"]);
        assert_eq!(h.delays.load(Ordering::SeqCst), 0);
        assert_eq!(h.launcher.launches(), 0);
        assert_eq!((state.skipped, state.downloaded), (1, 1));
    }

    #[tokio::test]
    async fn test_training_video_uses_vendor_engine() {
        let h = Harness::new();
        let product = video(ProductType::TrainingVideo, &["T1"]);

        let (result, _) = h.run(1, &product).await;

        assert!(result.is_ok());
        assert_eq!(h.engines.calls(), vec!["training_video:T1"]);
    }

    #[tokio::test]
    async fn test_video_failure_aborts_batch() {
        let h = Harness::new();
        h.engines.fail_on("standard_video:V1");
        let product = video(ProductType::StandardVideo, &["V1", "V2"]);

        let (result, state) = h.run(1, &product).await;

        assert!(matches!(result, Err(Error::Engine { engine: "video", .. })));
        assert_eq!(h.engines.calls(), vec!["standard_video:V1"]);
        assert_eq!(state.completed, 0);
    }
}
