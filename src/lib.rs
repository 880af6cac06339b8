//! geektime-downloader - download purchased Geektime content for offline use
//!
//! This library provides an interactive downloader for Geektime columns and
//! video courses.
//!
//! # Features
//!
//! - Interactive product and item selection
//! - Column articles as PDF, Markdown and/or MP3
//! - Video courses and training programs via HLS
//! - Resumable batches: outputs already on disk are skipped
//! - Clean shutdown on Ctrl+C
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use geektime_downloader::api::{Catalog, GeektimeApi};
//! use geektime_downloader::api::auth::cookie_pair;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = Arc::new(GeektimeApi::new(cookie_pair("gcid", "gcess"), None)?);
//!     api.check_auth().await?;
//!
//!     let product = api.product(100).await?;
//!     let items = api.items(&product).await?;
//!     println!("{}: {} items", product.title, items.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod download;
pub mod engine;
pub mod error;
pub mod fs;
pub mod login;
pub mod navigation;
pub mod output;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use api::{Catalog, GeektimeApi};
pub use config::Config;
pub use download::{Batch, BatchState, Coordinator, FormatMask};
pub use error::{Error, Result};
pub use navigation::Navigator;
