//! Batch progress tracking.

/// Progress of one batch.
///
/// Owned by the caller so counts stay available after a batch aborts.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchState {
    /// Items in the batch.
    pub total: usize,
    /// Items resolved so far, downloaded or already complete.
    pub completed: usize,
    /// Items that needed no download.
    pub skipped: usize,
    /// Items for which at least one engine ran.
    pub downloaded: usize,
}

impl BatchState {
    /// Create the state for a batch of `total` items.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Record an item whose outputs were all present.
    pub fn record_skipped(&mut self) {
        self.skipped += 1;
        self.completed += 1;
    }

    /// Record an item that was downloaded.
    pub fn record_downloaded(&mut self) {
        self.downloaded += 1;
        self.completed += 1;
    }

    /// Whether every item has been resolved.
    pub fn is_finished(&self) -> bool {
        self.completed == self.total
    }
}
