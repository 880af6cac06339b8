//! Catalog abstraction consumed by navigation, the coordinator and engines.

use async_trait::async_trait;

use crate::api::types::{ArticleInfo, Item, Product, VideoInfo};
use crate::config::VideoQuality;
use crate::error::Result;

/// Remote catalog of purchased products.
///
/// Product lookups report ownership through [`Product::access`]; implementations
/// may also fail with [`crate::Error::AccessDenied`] when the platform refuses
/// the request outright.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Load a column or video course.
    async fn product(&self, id: i64) -> Result<Product>;

    /// Load a training-program product together with its lessons.
    async fn training_product(&self, id: i64) -> Result<Product>;

    /// List the items of a product in catalog order.
    async fn items(&self, product: &Product) -> Result<Vec<Item>>;

    /// Fetch article content for the text and audio engines.
    async fn article_info(&self, item_id: i64) -> Result<ArticleInfo>;

    /// Resolve the HLS playlist of a standard video item.
    async fn video_info(&self, item_id: i64, quality: VideoQuality) -> Result<VideoInfo>;

    /// Resolve the playlist of a training-program video item.
    async fn training_video_info(
        &self,
        product_id: i64,
        item_id: i64,
        quality: VideoQuality,
    ) -> Result<VideoInfo>;
}
