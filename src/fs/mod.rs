//! Filesystem module.
//!
//! Provides:
//! - Path and directory management
//! - Filename generation from catalog titles

pub mod naming;
pub mod paths;

pub use naming::{column_file_name, filenamify, video_file_name, VIDEO_EXTENSION};
pub use paths::{account_folder, ensure_dir, partial_path, project_dir, write_file_atomic};
