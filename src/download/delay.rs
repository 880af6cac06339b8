//! Throttling between column item downloads.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

/// Upper bound of the pause after each downloaded column item.
pub const COLUMN_JITTER_MAX: Duration = Duration::from_millis(2000);

/// Maps the index of the item just downloaded to the pause before the next one.
pub type DelayPolicy = Arc<dyn Fn(usize) -> Duration + Send + Sync>;

/// Uniformly random pause in `[0, max)`.
pub fn random_jitter(max: Duration) -> DelayPolicy {
    let max_ms = max.as_millis() as u64;
    Arc::new(move |_| {
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
    })
}

/// No pause at all.
pub fn no_delay() -> DelayPolicy {
    Arc::new(|_| Duration::ZERO)
}
