//! Configuration validation logic.

use crate::config::loader::Config;
use crate::download::FormatMask;
use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static PRODUCT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,18}$").expect("static pattern"));

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    config.credentials()?;
    FormatMask::parse_requested(config.options.output)?;

    if let Some(id) = config.options.product_id {
        if id <= 0 {
            return Err(Error::validation(
                "product_id",
                format!("Product ID must be positive (got {})", id),
            ));
        }
    }

    if let Some(proxy) = &config.options.proxy {
        validate_proxy(proxy)?;
    }

    if config.options.concurrency == 0 {
        return Err(Error::validation(
            "concurrency",
            "Concurrency must be at least 1",
        ));
    }

    Ok(())
}

/// Validate a proxy URL for the rendering session.
pub fn validate_proxy(proxy: &str) -> Result<()> {
    let url = Url::parse(proxy).map_err(|e| {
        Error::validation("proxy", format!("Invalid proxy URL '{}': {}", proxy, e))
    })?;

    match url.scheme() {
        "http" | "https" | "socks4" | "socks5" => Ok(()),
        other => Err(Error::validation(
            "proxy",
            format!("Unsupported proxy scheme '{}'", other),
        )),
    }
}

/// Parse a product id typed by the user.
pub fn parse_product_id(input: &str) -> Result<i64> {
    let input = input.trim();

    if input.is_empty() {
        return Err(Error::validation("product_id", "Product ID cannot be empty"));
    }

    if !PRODUCT_ID.is_match(input) {
        return Err(Error::validation(
            "product_id",
            format!("Invalid product ID: '{}'. Must be a number.", input),
        ));
    }

    input
        .parse()
        .map_err(|_| Error::validation("product_id", format!("Invalid product ID: '{}'", input)))
}
