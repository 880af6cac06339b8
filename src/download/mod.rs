//! Download module for batch downloading.
//!
//! This module provides:
//! - Output formats and the requested/existing format masks
//! - Resume snapshots of a project directory
//! - The per-batch rendering session lifecycle
//! - Throttling between column items
//! - Batch coordination and progress tracking

pub mod coordinator;
pub mod delay;
pub mod format;
pub mod resume;
pub mod session;
pub mod state;

pub use coordinator::{Batch, BatchSettings, Coordinator, Engines};
pub use delay::{no_delay, random_jitter, DelayPolicy, COLUMN_JITTER_MAX};
pub use format::{missing, Format, FormatMask};
pub use resume::ResumeSnapshot;
pub use session::{PageRequest, RenderSession, SessionLauncher, SessionManager, SessionOptions};
pub use state::BatchState;
