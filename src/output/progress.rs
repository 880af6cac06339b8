//! Progress indicators for catalog calls and media transfers.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";
const BYTES_TEMPLATE: &str =
    "{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})";
const SEGMENTS_TEMPLATE: &str = "{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} segments";

/// Spinner shown while waiting on the catalog.
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template(SPINNER_TEMPLATE).unwrap());
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Bar counting bytes of a single file transfer.
pub fn create_download_bar(total: u64, name: &str) -> ProgressBar {
    transfer_bar(total, name, BYTES_TEMPLATE)
}

/// Bar counting downloaded stream segments of a video.
pub fn create_segment_bar(total: u64, name: &str) -> ProgressBar {
    transfer_bar(total, name, SEGMENTS_TEMPLATE)
}

fn transfer_bar(total: u64, name: &str, template: &str) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(template)
            .unwrap()
            .progress_chars("#>-"),
    );
    bar.set_message(name.to_string());
    bar
}
