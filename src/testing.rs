//! In-memory fakes shared by unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::api::{ArticleInfo, Catalog, Item, Product, ProductType, VideoInfo};
use crate::config::VideoQuality;
use crate::download::{Engines, PageRequest, RenderSession, SessionLauncher, SessionOptions};
use crate::engine::{
    AudioFetcher, DocumentRenderer, DocumentRequest, TextExtractor, VideoFetcher, VideoRequest,
};
use crate::error::{Error, Result};
use crate::navigation::{MenuChoice, Prompter};

/// Column product with id 1 whose items are titled `titles`, ids from 100.
pub fn column(titles: &[&str]) -> Product {
    product(1, "Column", ProductType::Column, titles)
}

/// Video product with id 2 of the given kind.
pub fn video(kind: ProductType, titles: &[&str]) -> Product {
    product(2, "Video course", kind, titles)
}

pub fn product(id: i64, title: &str, kind: ProductType, titles: &[&str]) -> Product {
    Product {
        id,
        title: title.to_string(),
        kind,
        access: true,
        items: titles
            .iter()
            .enumerate()
            .map(|(index, t)| Item {
                id: 100 + index as i64,
                title: t.to_string(),
                index,
            })
            .collect(),
    }
}

/// Catalog serving products from memory and recording every lookup.
///
/// Unknown product ids are refused with [`Error::AccessDenied`]. Video
/// lookups always fail so engine tests never touch the network.
#[derive(Default)]
pub struct FakeCatalog {
    products: Mutex<HashMap<i64, Product>>,
    product_calls: Mutex<Vec<i64>>,
    items_calls: AtomicUsize,
    article_info_calls: AtomicUsize,
    video_info_calls: Mutex<Vec<(i64, VideoQuality)>>,
    training_video_info_calls: Mutex<Vec<(i64, i64, VideoQuality)>>,
}

impl FakeCatalog {
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let catalog = Self::default();
        for product in products {
            catalog.add_product(product);
        }
        catalog
    }

    pub fn add_product(&self, product: Product) {
        self.products.lock().unwrap().insert(product.id, product);
    }

    pub fn product_calls(&self) -> Vec<i64> {
        self.product_calls.lock().unwrap().clone()
    }

    pub fn items_calls(&self) -> usize {
        self.items_calls.load(Ordering::SeqCst)
    }

    pub fn article_info_calls(&self) -> usize {
        self.article_info_calls.load(Ordering::SeqCst)
    }

    pub fn video_info_calls(&self) -> Vec<(i64, VideoQuality)> {
        self.video_info_calls.lock().unwrap().clone()
    }

    pub fn training_video_info_calls(&self) -> Vec<(i64, i64, VideoQuality)> {
        self.training_video_info_calls.lock().unwrap().clone()
    }

    fn lookup(&self, id: i64) -> Result<Product> {
        self.product_calls.lock().unwrap().push(id);
        self.products
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(Error::AccessDenied(id))
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn product(&self, id: i64) -> Result<Product> {
        let mut product = self.lookup(id)?;
        product.items.clear();
        Ok(product)
    }

    async fn training_product(&self, id: i64) -> Result<Product> {
        self.lookup(id)
    }

    async fn items(&self, product: &Product) -> Result<Vec<Item>> {
        self.items_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .products
            .lock()
            .unwrap()
            .get(&product.id)
            .map(|p| p.items.clone())
            .unwrap_or_default())
    }

    async fn article_info(&self, _item_id: i64) -> Result<ArticleInfo> {
        self.article_info_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ArticleInfo {
            content_html: "<p>text</p>".to_string(),
            audio_url: Some("https://static001.geekbang.org/audio.mp3".to_string()),
        })
    }

    async fn video_info(&self, item_id: i64, quality: VideoQuality) -> Result<VideoInfo> {
        self.video_info_calls
            .lock()
            .unwrap()
            .push((item_id, quality));
        Err(Error::Api(format!("No {} video for {}", quality, item_id)))
    }

    async fn training_video_info(
        &self,
        product_id: i64,
        item_id: i64,
        quality: VideoQuality,
    ) -> Result<VideoInfo> {
        self.training_video_info_calls
            .lock()
            .unwrap()
            .push((product_id, item_id, quality));
        Err(Error::Api(format!("No {} video for {}", quality, item_id)))
    }
}

/// Engines that only record calls as `"<engine>:<item title>"`.
#[derive(Default, Clone)]
pub struct RecordingEngines {
    log: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<HashSet<String>>>,
    cancels: Arc<Mutex<Vec<(String, CancellationToken)>>>,
}

impl RecordingEngines {
    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Make the given call fail.
    pub fn fail_on(&self, call: &str) {
        self.failures.lock().unwrap().insert(call.to_string());
    }

    /// Fire `token` while the given call runs; the call itself succeeds.
    pub fn cancel_on(&self, call: &str, token: CancellationToken) {
        self.cancels.lock().unwrap().push((call.to_string(), token));
    }

    pub fn engines(&self) -> Engines {
        let engine = |kind| {
            Arc::new(RecordingEngine {
                kind,
                recorder: self.clone(),
            })
        };
        Engines {
            document: engine("document"),
            text: engine("text"),
            audio: engine("audio"),
            standard_video: engine("standard_video"),
            training_video: engine("training_video"),
        }
    }

    fn record(&self, kind: &str, item: &Item) -> Result<()> {
        let call = format!("{}:{}", kind, item.title);
        self.log.lock().unwrap().push(call.clone());

        for (name, token) in self.cancels.lock().unwrap().iter() {
            if *name == call {
                token.cancel();
            }
        }
        if self.failures.lock().unwrap().contains(&call) {
            return Err(Error::Download(format!("injected failure for {}", call)));
        }
        Ok(())
    }
}

struct RecordingEngine {
    kind: &'static str,
    recorder: RecordingEngines,
}

impl RecordingEngine {
    fn output(&self, dir: &Path, item: &Item) -> PathBuf {
        dir.join(format!("{}.{}", item.title, self.kind))
    }
}

#[async_trait]
impl DocumentRenderer for RecordingEngine {
    async fn render(
        &self,
        request: &DocumentRequest<'_>,
        _session: &dyn RenderSession,
        _cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        self.recorder.record(self.kind, request.item)?;
        Ok(self.output(request.project_dir, request.item))
    }
}

#[async_trait]
impl TextExtractor for RecordingEngine {
    async fn extract(
        &self,
        item: &Item,
        _content: &ArticleInfo,
        project_dir: &Path,
        _cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        self.recorder.record(self.kind, item)?;
        Ok(self.output(project_dir, item))
    }
}

#[async_trait]
impl AudioFetcher for RecordingEngine {
    async fn fetch(
        &self,
        item: &Item,
        _content: &ArticleInfo,
        project_dir: &Path,
        _cancel: &CancellationToken,
    ) -> Result<Option<PathBuf>> {
        self.recorder.record(self.kind, item)?;
        Ok(Some(self.output(project_dir, item)))
    }
}

#[async_trait]
impl VideoFetcher for RecordingEngine {
    async fn fetch(&self, request: &VideoRequest<'_>, _cancel: &CancellationToken) -> Result<PathBuf> {
        self.recorder.record(self.kind, request.item)?;
        Ok(self.output(request.project_dir, request.item))
    }
}

/// Rendering session that returns a stub PDF.
#[derive(Default)]
pub struct FakeSession {
    printed: Mutex<Vec<(String, bool)>>,
    shutdowns: Arc<AtomicUsize>,
}

impl FakeSession {
    /// Printed pages as `(url, strip_comments)`.
    pub fn printed(&self) -> Vec<(String, bool)> {
        self.printed.lock().unwrap().clone()
    }
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn print_page(
        &self,
        page: &PageRequest<'_>,
        _cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        self.printed
            .lock()
            .unwrap()
            .push((page.url.to_string(), page.strip_comments));
        Ok(b"%PDF-1.4 stub".to_vec())
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Launcher counting launches and shutdowns of its sessions.
#[derive(Default)]
pub struct FakeLauncher {
    fail: bool,
    hang: bool,
    launches: AtomicUsize,
    shutdowns: Arc<AtomicUsize>,
    last_options: Mutex<Option<SessionOptions>>,
}

impl FakeLauncher {
    /// A launcher whose every launch fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// A launcher whose launches never complete.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Default::default()
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<SessionOptions> {
        self.last_options.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self, options: &SessionOptions) -> Result<Box<dyn RenderSession>> {
        *self.last_options.lock().unwrap() = Some(options.clone());
        if self.fail {
            return Err(Error::Session("browser unavailable".into()));
        }
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            printed: Mutex::new(Vec::new()),
            shutdowns: Arc::clone(&self.shutdowns),
        }))
    }
}

/// A scripted answer to one prompt.
#[derive(Debug, Clone)]
pub enum Answer {
    ProductId(&'static str),
    Menu(MenuChoice),
    /// Index into the offered list, the back entry being 0.
    Item(usize),
    Password(&'static str),
}

/// Prompter replaying a fixed script.
///
/// Running out of answers behaves like an interrupt, which ends navigation.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Answer>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Prompts shown so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }

    fn next(&self, prompt: String) -> Result<Answer> {
        self.asked.lock().unwrap().push(prompt);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(Error::Cancelled)
    }
}

impl Prompter for ScriptedPrompter {
    fn product_id(&self, university: bool) -> Result<String> {
        match self.next(format!("product_id(university={})", university))? {
            Answer::ProductId(id) => Ok(id.to_string()),
            other => panic!("unexpected answer {:?} to product prompt", other),
        }
    }

    fn product_menu(&self, product: &Product) -> Result<MenuChoice> {
        match self.next(format!("menu:{}", product.title))? {
            Answer::Menu(choice) => Ok(choice),
            other => panic!("unexpected answer {:?} to product menu", other),
        }
    }

    fn select_item(&self, kind: ProductType, entries: &[Item]) -> Result<usize> {
        let titles: Vec<&str> = entries.iter().map(|i| i.title.as_str()).collect();
        match self.next(format!("select:{:?}:{}", kind, titles.join(",")))? {
            Answer::Item(index) => Ok(index),
            other => panic!("unexpected answer {:?} to item selection", other),
        }
    }

    fn password(&self, account: &str) -> Result<String> {
        match self.next(format!("password:{}", account))? {
            Answer::Password(password) => Ok(password.to_string()),
            other => panic!("unexpected answer {:?} to password prompt", other),
        }
    }
}

/// Read an HTTP request head and return its path.
async fn read_request_path(socket: &mut TcpStream) -> Option<String> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    let head = String::from_utf8_lossy(&request);
    Some(head.split_whitespace().nth(1).unwrap_or("/").to_string())
}

/// Local HTTP server answering each request with its own path as the body.
pub async fn echo_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Some(path) = read_request_path(&mut socket).await else {
                    return;
                };
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    path.len(),
                    path
                );
                let _ = socket.write_all(response.as_bytes()).await;
            });
        }
    });
    format!("http://{}", addr)
}

/// Local HTTP server that announces `declared` bytes, sends `sent`, then
/// holds the connection open without sending the rest.
pub async fn stalled_server(declared: usize, sent: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                if read_request_path(&mut socket).await.is_none() {
                    return;
                }
                let head = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n", declared);
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(sent).await;
                let _ = socket.flush().await;
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            });
        }
    });
    format!("http://{}", addr)
}

/// HTTP client that never routes through a system proxy.
pub fn local_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
