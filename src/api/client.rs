//! Geektime API HTTP client.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{header, Client};
use serde_json::{json, Value};
use url::Url;

use crate::api::auth::{has_session, parse_cookie_header, COOKIE_DOMAIN};
use crate::api::catalog::Catalog;
use crate::api::types::*;
use crate::config::VideoQuality;
use crate::error::{Error, Result};

/// Account service base URL.
const ACCOUNT_BASE: &str = "https://account.geekbang.org";

/// Column and video course service base URL.
pub const TIME_BASE: &str = "https://time.geekbang.org";

/// Training program service base URL.
const UNIVERSITY_BASE: &str = "https://u.geekbang.org";

/// Maximum articles requested per column listing.
const ARTICLES_PAGE_SIZE: usize = 500;

/// Error code returned for products the account has not purchased.
const NOT_PURCHASED_CODE: i64 = -3050;

/// Browser user agent sent with every request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Geektime API client authenticated by site cookies.
pub struct GeektimeApi {
    client: Client,
    cookies: Vec<SiteCookie>,
}

impl GeektimeApi {
    /// Create a client carrying the given session cookies, optionally routed
    /// through a proxy.
    pub fn new(cookies: Vec<SiteCookie>, proxy: Option<&str>) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        for base in [ACCOUNT_BASE, TIME_BASE, UNIVERSITY_BASE] {
            let url = Url::parse(base)?;
            for cookie in &cookies {
                jar.add_cookie_str(
                    &format!(
                        "{}={}; Domain={}; Path=/",
                        cookie.name, cookie.value, cookie.domain
                    ),
                    &url,
                );
            }
        }

        let mut builder = Client::builder().user_agent(USER_AGENT).cookie_provider(jar);
        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| Error::Config(format!("Invalid proxy '{}': {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Api(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, cookies })
    }

    /// Log in with account and password, returning the issued session cookies.
    pub async fn login(account: &str, password: &str) -> Result<Vec<SiteCookie>> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|e| Error::Api(format!("Failed to create HTTP client: {}", e)))?;

        let url = format!("{}/account/ticket/login", ACCOUNT_BASE);
        tracing::debug!("POST {}", url);

        let response = client
            .post(&url)
            .header(header::ORIGIN, ACCOUNT_BASE)
            .header(header::REFERER, format!("{}/login", ACCOUNT_BASE))
            .json(&json!({
                "country": 86,
                "cellphone": account,
                "password": password,
                "captcha": "",
                "remember": 1,
                "platform": 3,
                "appid": 1,
                "source": "",
            }))
            .send()
            .await?;

        let text = response.text().await?;
        let envelope: ApiResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Authentication(format!("Unexpected login response: {}", e)))?;

        if envelope.code != 0 {
            return Err(Error::Authentication(envelope.error_message()));
        }

        let account_url = Url::parse(ACCOUNT_BASE)?;
        let cookies = jar
            .cookies(&account_url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
            .map(|value| parse_cookie_header(&value, COOKIE_DOMAIN))
            .unwrap_or_default();

        if !has_session(&cookies) {
            return Err(Error::Authentication(
                "Login succeeded but no session cookie was issued".into(),
            ));
        }

        Ok(cookies)
    }

    /// The underlying HTTP client, shared with the media engines.
    pub fn http_client(&self) -> Client {
        self.client.clone()
    }

    /// Cookies this client authenticates with.
    pub fn site_cookies(&self) -> &[SiteCookie] {
        &self.cookies
    }

    /// Verify the session is still valid.
    pub async fn check_auth(&self) -> Result<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let url = format!("{}/serv/v1/user/auth?t={}", ACCOUNT_BASE, now);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(header::ORIGIN, TIME_BASE)
            .header(header::REFERER, TIME_BASE)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Authentication(format!("HTTP {}", status)));
        }

        let envelope: ApiResponse = response.json().await?;
        if envelope.code != 0 {
            return Err(Error::Authentication(envelope.error_message()));
        }

        Ok(())
    }

    /// Make an authenticated POST request to a service.
    async fn post(&self, base: &str, path: &str, body: Value) -> Result<ApiResponse> {
        let url = format!("{}{}", base, path);
        tracing::debug!("POST {} {}", url, body);

        let response = self
            .client
            .post(&url)
            .header(header::ORIGIN, base)
            .header(header::REFERER, base)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Response status: {}", status);

        if status == 429 {
            return Err(Error::Api("Rate limited by the server".into()));
        }

        if status == 401 || status == 403 {
            return Err(Error::Authentication(format!("HTTP {}", status)));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            Error::Api(format!(
                "Failed to parse response from {}: {} - Response: {}",
                path,
                e,
                text.chars().take(500).collect::<String>()
            ))
        })
    }
}

#[async_trait]
impl Catalog for GeektimeApi {
    async fn product(&self, id: i64) -> Result<Product> {
        let envelope = self
            .post(
                TIME_BASE,
                "/serv/v3/column/info",
                json!({ "product_id": id, "with_recommend_article": true }),
            )
            .await?;

        if envelope.error_code() == Some(NOT_PURCHASED_CODE) {
            return Err(Error::AccessDenied(id));
        }

        let info: ColumnInfo = envelope.into_data("column info")?;
        Ok(info.into())
    }

    async fn training_product(&self, id: i64) -> Result<Product> {
        let envelope = self
            .post(
                UNIVERSITY_BASE,
                "/serv/v1/myclass/info",
                json!({ "class_id": id }),
            )
            .await?;

        if envelope.error_code() == Some(NOT_PURCHASED_CODE) {
            return Err(Error::AccessDenied(id));
        }

        let info: ClassInfo = envelope.into_data("class info")?;
        Ok(info.into_product(id))
    }

    async fn items(&self, product: &Product) -> Result<Vec<Item>> {
        if product.kind == ProductType::TrainingVideo {
            return Ok(product.items.clone());
        }

        let envelope = self
            .post(
                TIME_BASE,
                "/serv/v1/column/articles",
                json!({
                    "cid": product.id.to_string(),
                    "order": "earliest",
                    "prev": 0,
                    "sample": false,
                    "size": ARTICLES_PAGE_SIZE,
                }),
            )
            .await?;

        let list: ArticleList = envelope.into_data("article list")?;
        Ok(list
            .list
            .into_iter()
            .enumerate()
            .map(|(index, a)| Item {
                id: a.id,
                title: a.article_title,
                index,
            })
            .collect())
    }

    async fn article_info(&self, item_id: i64) -> Result<ArticleInfo> {
        let detail = self.article_detail(item_id).await?;
        Ok(detail.into())
    }

    async fn video_info(&self, item_id: i64, quality: VideoQuality) -> Result<VideoInfo> {
        let detail = self.article_detail(item_id).await?;
        let videos = detail.hls_videos.unwrap_or_default();
        let video = match quality {
            VideoQuality::Ld => videos.ld,
            VideoQuality::Sd => videos.sd,
            VideoQuality::Hd => videos.hd,
        }
        .ok_or_else(|| {
            Error::Api(format!(
                "No {} video available for article {}",
                quality, item_id
            ))
        })?;

        Ok(VideoInfo {
            playlist_url: video.url,
            size: video.size,
        })
    }

    async fn training_video_info(
        &self,
        product_id: i64,
        item_id: i64,
        quality: VideoQuality,
    ) -> Result<VideoInfo> {
        let envelope = self
            .post(
                UNIVERSITY_BASE,
                "/serv/v1/myclass/article",
                json!({ "class_id": product_id, "article_id": item_id }),
            )
            .await?;

        let article: ClassArticle = envelope.into_data("class article")?;
        let media = article
            .video
            .hls_medias
            .into_iter()
            .find(|m| m.quality == quality.as_str())
            .ok_or_else(|| {
                Error::Api(format!(
                    "No {} video available for lesson {}",
                    quality, item_id
                ))
            })?;

        Ok(VideoInfo {
            playlist_url: media.url,
            size: media.size,
        })
    }
}

impl GeektimeApi {
    async fn article_detail(&self, item_id: i64) -> Result<ArticleDetail> {
        let envelope = self
            .post(
                TIME_BASE,
                "/serv/v1/article",
                json!({ "id": item_id.to_string(), "include_neighbors": true, "is_freelyread": true }),
            )
            .await?;
        envelope.into_data("article")
    }
}
