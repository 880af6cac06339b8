//! Catalog domain types and API response definitions.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Identity of the sentinel entry placed at the head of item lists.
pub const BACK_ITEM_ID: i64 = -1;

/// Kind of purchased product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductType {
    /// Article column (document, text and audio outputs).
    Column,
    /// Regular video course delivered as HLS.
    StandardVideo,
    /// Training-program video hosted by the video vendor.
    TrainingVideo,
}

impl ProductType {
    /// Whether items of this product are videos.
    pub fn is_video(&self) -> bool {
        matches!(self, ProductType::StandardVideo | ProductType::TrainingVideo)
    }
}

/// A purchased course or column.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub kind: ProductType,
    pub access: bool,
    /// Ordered items. Empty until loaded, except for training programs whose
    /// lesson list comes with the product itself.
    pub items: Vec<Item>,
}

/// A single downloadable article or video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: i64,
    pub title: String,
    /// Position in the product's sequence.
    pub index: usize,
}

impl Item {
    /// The "back" entry shown first in item selection lists.
    pub fn back() -> Self {
        Self {
            id: BACK_ITEM_ID,
            title: "back".to_string(),
            index: 0,
        }
    }

    /// Whether this is the navigation sentinel rather than real content.
    pub fn is_back(&self) -> bool {
        self.id == BACK_ITEM_ID
    }
}

/// Content of a column article needed by the text and audio engines.
#[derive(Debug, Clone, Default)]
pub struct ArticleInfo {
    pub content_html: String,
    pub audio_url: Option<String>,
}

/// Playback information for a video item.
#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub playlist_url: String,
    pub size: u64,
}

/// A site cookie carried between login, the API client and the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
}

/// Envelope wrapping every API response.
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub code: i64,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub error: Value,
}

impl ApiResponse {
    /// Error code reported by the API, if any.
    pub fn error_code(&self) -> Option<i64> {
        self.error.get("code").and_then(Value::as_i64)
    }

    /// Error message reported by the API, if any.
    pub fn error_message(&self) -> String {
        self.error
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string()
    }

    /// Decode the payload, failing on a non-zero code.
    pub fn into_data<T: DeserializeOwned>(self, what: &str) -> Result<T> {
        if self.code != 0 {
            return Err(Error::Api(format!(
                "Failed to get {}: {} (code {})",
                what,
                self.error_message(),
                self.error_code().unwrap_or(self.code)
            )));
        }
        serde_json::from_value(self.data)
            .map_err(|e| Error::Api(format!("Failed to parse {}: {}", what, e)))
    }
}

/// Column or video course info.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnInfo {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub is_video: bool,
    #[serde(default)]
    pub extra: ColumnExtra,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnExtra {
    #[serde(default)]
    pub sub: Subscription,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Subscription {
    #[serde(default)]
    pub access_mask: i64,
}

impl From<ColumnInfo> for Product {
    fn from(info: ColumnInfo) -> Self {
        Self {
            id: info.id,
            title: info.title,
            kind: if info.is_video {
                ProductType::StandardVideo
            } else {
                ProductType::Column
            },
            access: info.extra.sub.access_mask > 0,
            items: Vec::new(),
        }
    }
}

/// Article list page.
#[derive(Debug, Deserialize)]
pub struct ArticleList {
    #[serde(default)]
    pub list: Vec<ArticleSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArticleSummary {
    pub id: i64,
    pub article_title: String,
}

/// Full article payload.
#[derive(Debug, Deserialize)]
pub struct ArticleDetail {
    #[serde(default)]
    pub article_content: String,
    #[serde(default)]
    pub audio_download_url: String,
    #[serde(default)]
    pub hls_videos: Option<HlsVideos>,
}

/// HLS variants of a video article, keyed by quality.
#[derive(Debug, Default, Deserialize)]
pub struct HlsVideos {
    pub ld: Option<HlsVideo>,
    pub sd: Option<HlsVideo>,
    pub hd: Option<HlsVideo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HlsVideo {
    pub url: String,
    #[serde(default)]
    pub size: u64,
}

impl From<ArticleDetail> for ArticleInfo {
    fn from(detail: ArticleDetail) -> Self {
        Self {
            content_html: detail.article_content,
            audio_url: Some(detail.audio_download_url).filter(|url| !url.is_empty()),
        }
    }
}

/// Training program ("university") class info.
#[derive(Debug, Deserialize)]
pub struct ClassInfo {
    pub title: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Deserialize)]
pub struct Lesson {
    #[serde(default)]
    pub article_list: Vec<LessonArticle>,
}

#[derive(Debug, Deserialize)]
pub struct LessonArticle {
    pub article: LessonArticleRef,
}

#[derive(Debug, Deserialize)]
pub struct LessonArticleRef {
    pub id: i64,
    pub title: String,
}

impl ClassInfo {
    /// Convert to a product, flattening lessons into one ordered item list.
    pub fn into_product(self, id: i64) -> Product {
        let items = self
            .lessons
            .into_iter()
            .flat_map(|lesson| lesson.article_list)
            .enumerate()
            .map(|(index, entry)| Item {
                id: entry.article.id,
                title: entry.article.title,
                index,
            })
            .collect();

        Product {
            id,
            title: self.title,
            kind: ProductType::TrainingVideo,
            access: true,
            items,
        }
    }
}

/// Training program video article.
#[derive(Debug, Deserialize)]
pub struct ClassArticle {
    pub video: ClassVideo,
}

#[derive(Debug, Deserialize)]
pub struct ClassVideo {
    #[serde(default)]
    pub hls_medias: Vec<ClassMedia>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassMedia {
    pub quality: String,
    pub url: String,
    #[serde(default)]
    pub size: u64,
}
