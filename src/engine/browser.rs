//! Headless Chrome driven over the DevTools protocol.
//!
//! One browser process backs a whole batch. Each printed article gets its own
//! tab, attached in flat session mode so every command travels over the single
//! browser WebSocket.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::cancel::run_cancellable;
use crate::download::{PageRequest, RenderSession, SessionLauncher, SessionOptions};
use crate::error::{Error, Result};

/// How long the browser gets to announce its DevTools endpoint.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(20);

/// How long a page gets to fire its load event.
const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Pause after the load event so client-side rendering can finish.
const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// How long the browser gets to exit after `Browser.close`.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const LOAD_EVENT: &str = "Page.loadEventFired";

/// Removes the reader comment section before printing.
const STRIP_COMMENTS_SCRIPT: &str = r#"
document.querySelectorAll('[class*="comment"], [class*="Comment"]').forEach(e => e.remove());
"#;

/// Executable names searched on `PATH`.
const CHROME_NAMES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
    "msedge",
];

/// Well-known install locations checked when nothing is on `PATH`.
const CHROME_LOCATIONS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
];

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Starts Chrome/Chromium rendering sessions.
#[derive(Debug, Default, Clone)]
pub struct ChromeLauncher {
    executable: Option<PathBuf>,
}

impl ChromeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific browser binary instead of searching for one.
    #[cfg(test)]
    pub fn with_executable(path: impl Into<PathBuf>) -> Self {
        Self {
            executable: Some(path.into()),
        }
    }

    fn resolve_executable(&self) -> Result<PathBuf> {
        if let Some(path) = &self.executable {
            return Ok(path.clone());
        }
        if let Some(path) = std::env::var_os("CHROME_PATH") {
            return Ok(PathBuf::from(path));
        }
        find_chrome().ok_or_else(|| {
            Error::Session(
                "Chrome not found. Install Chrome or Chromium, or set CHROME_PATH.".into(),
            )
        })
    }
}

/// Locate a Chrome-compatible browser.
fn find_chrome() -> Option<PathBuf> {
    if let Some(paths) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&paths) {
            for name in CHROME_NAMES {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
                let exe = candidate.with_extension("exe");
                if exe.is_file() {
                    return Some(exe);
                }
            }
        }
    }

    CHROME_LOCATIONS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

/// Command-line flags for a browser instance.
fn launch_args(options: &SessionOptions, user_data_dir: &Path) -> Vec<String> {
    let mut args = vec![
        "--remote-debugging-port=0".to_string(),
        format!("--user-data-dir={}", user_data_dir.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-gpu".to_string(),
        "--hide-scrollbars".to_string(),
        "--mute-audio".to_string(),
    ];
    if !options.visible {
        args.push("--headless=new".to_string());
    }
    if let Some(proxy) = &options.proxy {
        args.push(format!("--proxy-server={}", proxy));
    }
    args.push("about:blank".to_string());
    args
}

/// Extract the browser WebSocket URL from a stderr line.
fn devtools_url(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix("DevTools listening on ")
        .map(str::trim)
        .filter(|url| url.starts_with("ws://"))
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    async fn launch(&self, options: &SessionOptions) -> Result<Box<dyn RenderSession>> {
        let executable = self.resolve_executable()?;
        let user_data_dir =
            std::env::temp_dir().join(format!("geektime-downloader-{}", uuid::Uuid::new_v4()));

        tracing::debug!("Launching {}", executable.display());
        let mut child = Command::new(&executable)
            .args(launch_args(options, &user_data_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::Session(format!(
                    "Failed to start {}: {}",
                    executable.display(),
                    e
                ))
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Session("Browser stderr unavailable".into()))?;
        let mut lines = BufReader::new(stderr).lines();

        let ws_url = tokio::time::timeout(STARTUP_TIMEOUT, read_devtools_url(&mut lines))
            .await
            .map_err(|_| Error::Session("Timed out waiting for the browser to start".into()))??;

        // Keep draining stderr so the browser never blocks on a full pipe.
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::trace!("browser: {}", line);
            }
        });

        tracing::debug!("Connecting to {}", ws_url);
        let (socket, _) = tokio::time::timeout(STARTUP_TIMEOUT, connect_async(ws_url.as_str()))
            .await
            .map_err(|_| Error::Session("Timed out connecting to the browser".into()))??;

        Ok(Box::new(BrowserSession {
            child,
            connection: Mutex::new(Connection::new(socket)),
            user_data_dir,
        }))
    }
}

/// Read browser stderr until the DevTools endpoint is announced.
async fn read_devtools_url(lines: &mut Lines<BufReader<ChildStderr>>) -> Result<String> {
    while let Some(line) = lines.next_line().await? {
        if let Some(url) = devtools_url(&line) {
            return Ok(url.to_string());
        }
        tracing::trace!("browser: {}", line);
    }
    Err(Error::Session(
        "Browser exited before opening its DevTools endpoint".into(),
    ))
}

/// A running browser.
pub struct BrowserSession {
    child: Child,
    connection: Mutex<Connection>,
    user_data_dir: PathBuf,
}

#[async_trait]
impl RenderSession for BrowserSession {
    async fn print_page(
        &self,
        page: &PageRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        let mut connection = self.connection.lock().await;
        run_cancellable(cancel, connection.print(page)).await
    }

    async fn shutdown(&mut self) -> Result<()> {
        let connection = self.connection.get_mut();
        let close = async {
            if let Err(e) = connection.call("Browser.close", json!({}), None).await {
                tracing::debug!("Browser.close failed: {}", e);
            }
            let _ = connection.socket.close(None).await;
        };
        if tokio::time::timeout(SHUTDOWN_GRACE, close).await.is_err() {
            tracing::debug!("Browser did not acknowledge Browser.close");
        }

        match tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => tracing::debug!("Browser exited with {}", status),
            _ => {
                tracing::debug!("Killing browser");
                self.child.kill().await?;
            }
        }

        if let Err(e) = tokio::fs::remove_dir_all(&self.user_data_dir).await {
            tracing::debug!(
                "Failed to remove {}: {}",
                self.user_data_dir.display(),
                e
            );
        }
        Ok(())
    }
}

/// DevTools protocol connection to the browser endpoint.
struct Connection {
    socket: Socket,
    next_id: u64,
    /// Load events that arrived while waiting for a command response.
    events: VecDeque<Value>,
}

impl Connection {
    fn new(socket: Socket) -> Self {
        Self {
            socket,
            next_id: 0,
            events: VecDeque::new(),
        }
    }

    /// Open a tab, print `page` in it, and close it again.
    async fn print(&mut self, page: &PageRequest<'_>) -> Result<Vec<u8>> {
        let target = self
            .call("Target.createTarget", json!({ "url": "about:blank" }), None)
            .await?;
        let target_id = string_field(&target, "targetId")?;

        let result = self.attach_and_print(&target_id, page).await;

        if let Err(e) = self
            .call("Target.closeTarget", json!({ "targetId": target_id }), None)
            .await
        {
            tracing::warn!("Failed to close tab: {}", e);
        }

        result
    }

    async fn attach_and_print(&mut self, target_id: &str, page: &PageRequest<'_>) -> Result<Vec<u8>> {
        let attached = self
            .call(
                "Target.attachToTarget",
                json!({ "targetId": target_id, "flatten": true }),
                None,
            )
            .await?;
        let session_id = string_field(&attached, "sessionId")?;
        self.print_in_tab(&session_id, page).await
    }

    async fn print_in_tab(&mut self, session_id: &str, page: &PageRequest<'_>) -> Result<Vec<u8>> {
        let sid = Some(session_id);

        self.call("Network.enable", json!({}), sid).await?;
        if !page.cookies.is_empty() {
            let cookies: Vec<Value> = page
                .cookies
                .iter()
                .map(|c| {
                    json!({
                        "name": c.name,
                        "value": c.value,
                        "domain": c.domain,
                        "path": "/",
                    })
                })
                .collect();
            self.call("Network.setCookies", json!({ "cookies": cookies }), sid)
                .await?;
        }
        self.call("Page.enable", json!({}), sid).await?;

        self.events.clear();
        let navigation = self
            .call("Page.navigate", json!({ "url": page.url }), sid)
            .await?;
        if let Some(error) = navigation
            .get("errorText")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty())
        {
            return Err(Error::Session(format!(
                "Failed to load {}: {}",
                page.url, error
            )));
        }

        tokio::time::timeout(PAGE_LOAD_TIMEOUT, self.wait_event(LOAD_EVENT, session_id))
            .await
            .map_err(|_| Error::Session(format!("Timed out loading {}", page.url)))??;
        tokio::time::sleep(SETTLE_DELAY).await;

        if page.strip_comments {
            self.call(
                "Runtime.evaluate",
                json!({ "expression": STRIP_COMMENTS_SCRIPT }),
                sid,
            )
            .await?;
        }

        let printed = self
            .call(
                "Page.printToPDF",
                json!({
                    "printBackground": true,
                    "paperWidth": 8.27,
                    "paperHeight": 11.69,
                }),
                sid,
            )
            .await?;
        let data = string_field(&printed, "data")?;

        BASE64
            .decode(data)
            .map_err(|e| Error::Session(format!("Invalid PDF data: {}", e)))
    }

    /// Send a command and wait for its response.
    async fn call(&mut self, method: &str, params: Value, session_id: Option<&str>) -> Result<Value> {
        self.next_id += 1;
        let id = self.next_id;

        let mut command = json!({ "id": id, "method": method, "params": params });
        if let Some(session_id) = session_id {
            command["sessionId"] = json!(session_id);
        }
        tracing::trace!("CDP -> {}", command);
        self.socket.send(Message::Text(command.to_string())).await?;

        loop {
            let message = self.receive().await?;
            if message.get("id").and_then(Value::as_u64) == Some(id) {
                if let Some(error) = message.get("error") {
                    return Err(Error::Session(format!("{} failed: {}", method, error)));
                }
                return Ok(message.get("result").cloned().unwrap_or(Value::Null));
            }
            if message.get("method").and_then(Value::as_str) == Some(LOAD_EVENT) {
                self.events.push_back(message);
            }
        }
    }

    /// Wait for an event from the given tab session.
    async fn wait_event(&mut self, method: &str, session_id: &str) -> Result<Value> {
        let matches = |message: &Value| {
            message.get("method").and_then(Value::as_str) == Some(method)
                && message.get("sessionId").and_then(Value::as_str) == Some(session_id)
        };

        if let Some(position) = self.events.iter().position(matches) {
            return Ok(self.events.remove(position).unwrap_or_default());
        }

        loop {
            let message = self.receive().await?;
            if matches(&message) {
                return Ok(message);
            }
        }
    }

    async fn receive(&mut self) -> Result<Value> {
        loop {
            match self.socket.next().await {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(Message::Close(_))) | None => {
                    return Err(Error::Session("DevTools connection closed".into()))
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }
}

fn string_field(value: &Value, field: &str) -> Result<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::Session(format!("DevTools response missing '{}'", field)))
}
