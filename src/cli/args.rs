//! Command-line argument definitions using clap.

use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::{Config, VideoQuality};

/// Geektime course downloader CLI.
#[derive(Parser, Debug)]
#[command(
    name = "geektime-downloader",
    version,
    about = "Download purchased Geektime columns and video courses",
    long_about = "An interactive CLI tool to download purchased Geektime content.\n\n\
                  Columns are saved as PDF, Markdown and/or MP3; video courses as MPEG-TS.\n\
                  Content already on disk is skipped, so interrupted downloads can be resumed."
)]
pub struct Args {
    /// Account (phone number) to log in with. The password is prompted for.
    #[arg(short = 'u', long = "phone", conflicts_with_all = ["gcid", "gcess"])]
    pub phone: Option<String>,

    /// GCID cookie value of an existing session.
    #[arg(long, requires = "gcess", env = "GEEKTIME_GCID")]
    pub gcid: Option<String>,

    /// GCESS cookie value of an existing session.
    #[arg(long, requires = "gcid", env = "GEEKTIME_GCESS")]
    pub gcess: Option<String>,

    /// Destination folder [default: <home>/geektime-downloader].
    #[arg(short = 'f', long = "folder")]
    pub folder: Option<PathBuf>,

    /// Video quality.
    #[arg(short, long, value_enum)]
    pub quality: Option<QualityArg>,

    /// Include the first page of comments in PDF documents.
    #[arg(long, action = ArgAction::Set, value_name = "BOOL")]
    pub comments: Option<bool>,

    /// Treat product ids as training programs.
    #[arg(long)]
    pub university: bool,

    /// Column outputs: 1 PDF, 2 Markdown, 4 MP3; add to combine (e.g. 7 for all).
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=7))]
    pub output: Option<u8>,

    /// Download this product and exit instead of prompting.
    #[arg(short = 'p', long = "product-id")]
    pub product_id: Option<i64>,

    /// Download every item right after a product is loaded.
    #[arg(long, action = ArgAction::Set, value_name = "BOOL")]
    pub download_all: Option<bool>,

    /// Show the browser window and enable debug logging.
    #[arg(long)]
    pub debug: bool,

    /// Proxy URL for the browser and HTTP requests.
    #[arg(long)]
    pub proxy: Option<String>,

    /// Parallel segment downloads per video.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Path to a TOML settings file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// CLI video quality argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum QualityArg {
    /// Low definition.
    Ld,
    /// Standard definition.
    Sd,
    /// High definition.
    Hd,
}

impl From<QualityArg> for VideoQuality {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::Ld => VideoQuality::Ld,
            QualityArg::Sd => VideoQuality::Sd,
            QualityArg::Hd => VideoQuality::Hd,
        }
    }
}

impl Args {
    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(self, config: &mut Config) {
        // Credentials only come from the command line
        config.account.phone = self.phone;
        config.account.gcid = self.gcid;
        config.account.gcess = self.gcess;

        if let Some(folder) = self.folder {
            config.options.download_folder = Some(folder);
        }

        if let Some(quality) = self.quality {
            config.options.quality = quality.into();
        }

        if let Some(comments) = self.comments {
            config.options.comments = comments;
        }

        if let Some(output) = self.output {
            config.options.output = output;
        }

        if let Some(product_id) = self.product_id {
            config.options.product_id = Some(product_id);
        }

        if let Some(download_all) = self.download_all {
            config.options.download_all = download_all;
        }

        if let Some(proxy) = self.proxy {
            config.options.proxy = Some(proxy);
        }

        if let Some(concurrency) = self.concurrency {
            config.options.concurrency = concurrency;
        }

        // Boolean flags (only override if set to non-default)
        if self.university {
            config.options.university = true;
        }

        if self.debug {
            config.options.debug = true;
        }
    }
}
