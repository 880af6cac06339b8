//! Geektime API module.
//!
//! This module provides:
//! - The [`Catalog`] abstraction over purchased products
//! - HTTP client for the Geektime services
//! - Site cookie handling
//! - API response types

pub mod auth;
pub mod catalog;
pub mod client;
pub mod types;

pub use catalog::Catalog;
pub use client::{GeektimeApi, TIME_BASE};
pub use types::*;
