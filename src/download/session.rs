//! Lifecycle of the shared rendering session used for document output.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::api::SiteCookie;
use crate::error::Result;

/// Options for starting a rendering session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Proxy server URL.
    pub proxy: Option<String>,
    /// Show the browser window instead of running headless.
    pub visible: bool,
}

/// A page to print.
#[derive(Debug, Clone)]
pub struct PageRequest<'a> {
    pub url: &'a str,
    pub cookies: &'a [SiteCookie],
    /// Remove the comment section before printing.
    pub strip_comments: bool,
}

/// A running rendering session (a headless browser).
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// Load a page and print it to PDF bytes.
    async fn print_page(&self, page: &PageRequest<'_>, cancel: &CancellationToken)
        -> Result<Vec<u8>>;

    /// Terminate the session.
    async fn shutdown(&mut self) -> Result<()>;
}

/// Starts rendering sessions.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self, options: &SessionOptions) -> Result<Box<dyn RenderSession>>;
}

enum SessionState {
    Idle,
    Active(Box<dyn RenderSession>),
    Released,
}

/// Owns the rendering session of one batch.
///
/// The session is launched on the first [`acquire`](Self::acquire) and reused
/// afterwards. [`release`](Self::release) is called exactly once when the batch
/// ends; a session that was never launched is released without side effects.
pub struct SessionManager<'a> {
    launcher: &'a dyn SessionLauncher,
    options: SessionOptions,
    state: SessionState,
}

impl<'a> SessionManager<'a> {
    pub fn new(launcher: &'a dyn SessionLauncher, options: SessionOptions) -> Self {
        Self {
            launcher,
            options,
            state: SessionState::Idle,
        }
    }

    /// Get the session, launching it on first use.
    ///
    /// # Panics
    ///
    /// Panics when called after [`release`](Self::release).
    pub async fn acquire(&mut self) -> Result<&dyn RenderSession> {
        match self.state {
            SessionState::Released => panic!("rendering session used after release"),
            SessionState::Idle => {
                tracing::debug!("Starting rendering session ({:?})", self.options);
                let session = self.launcher.launch(&self.options).await?;
                self.state = SessionState::Active(session);
            }
            SessionState::Active(_) => {}
        }

        match &self.state {
            SessionState::Active(session) => Ok(session.as_ref()),
            SessionState::Idle | SessionState::Released => {
                unreachable!("session state set above")
            }
        }
    }

    /// Whether a session is currently running.
    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active(_))
    }

    /// Shut the session down if one was started.
    ///
    /// # Panics
    ///
    /// Panics when called twice.
    pub async fn release(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, SessionState::Released) {
            SessionState::Released => panic!("rendering session released twice"),
            SessionState::Idle => Ok(()),
            SessionState::Active(mut session) => {
                tracing::debug!("Stopping rendering session");
                session.shutdown().await
            }
        }
    }
}
