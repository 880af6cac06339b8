//! Sign-in flow.
//!
//! Resolves the configured credentials into a set of site cookies the
//! platform accepts. Account logins reuse cached cookies while the server
//! still accepts them and only prompt for the password otherwise.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::api::auth::cookie_pair;
use crate::api::{GeektimeApi, SiteCookie};
use crate::cancel::{ensure_active, run_cancellable};
use crate::config::{CredentialStore, Credentials};
use crate::error::{Error, Result};
use crate::navigation::Prompter;
use crate::output::{create_spinner, print_info, print_warning};

/// Account endpoints used while signing in.
#[async_trait]
pub trait AccountGateway: Send + Sync {
    /// Exchange account and password for session cookies.
    async fn login(&self, account: &str, password: &str) -> Result<Vec<SiteCookie>>;

    /// Check that the platform accepts `cookies`.
    async fn check(&self, cookies: &[SiteCookie]) -> Result<()>;
}

/// Gateway backed by the Geektime account service.
pub struct GeektimeGateway {
    proxy: Option<String>,
}

impl GeektimeGateway {
    pub fn new(proxy: Option<String>) -> Self {
        Self { proxy }
    }
}

#[async_trait]
impl AccountGateway for GeektimeGateway {
    async fn login(&self, account: &str, password: &str) -> Result<Vec<SiteCookie>> {
        GeektimeApi::login(account, password).await
    }

    async fn check(&self, cookies: &[SiteCookie]) -> Result<()> {
        GeektimeApi::new(cookies.to_vec(), self.proxy.as_deref())?
            .check_auth()
            .await
    }
}

/// Drives sign-in for one run.
pub struct SignIn<'a> {
    gateway: &'a dyn AccountGateway,
    store: &'a CredentialStore,
    prompter: Arc<dyn Prompter>,
    cancel: &'a CancellationToken,
}

impl<'a> SignIn<'a> {
    pub fn new(
        gateway: &'a dyn AccountGateway,
        store: &'a CredentialStore,
        prompter: Arc<dyn Prompter>,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            gateway,
            store,
            prompter,
            cancel,
        }
    }

    /// Cookies to authenticate the catalog client with.
    pub async fn run(&self, credentials: Credentials) -> Result<Vec<SiteCookie>> {
        let account = match credentials {
            Credentials::CookiePair { gcid, gcess } => {
                let cookies = cookie_pair(&gcid, &gcess);
                self.check(&cookies).await?;
                return Ok(cookies);
            }
            Credentials::Account(account) => account,
        };

        if let Some(cookies) = self.store.read(&account)? {
            tracing::debug!("Using cached credentials from {}", self.store.path().display());
            match self.check(&cookies).await {
                Ok(()) => return Ok(cookies),
                Err(Error::Authentication(reason)) => {
                    print_warning(&format!(
                        "Cached session rejected ({}), logging in again",
                        reason
                    ));
                    self.store.remove(&account)?;
                }
                Err(e) => return Err(e),
            }
        }

        let password = self.prompt_password(&account).await?;

        let spinner = create_spinner("Logging in...");
        let login = run_cancellable(self.cancel, self.gateway.login(&account, &password)).await;
        spinner.finish_and_clear();
        let cookies = login?;

        self.check(&cookies).await?;
        self.store.write(&account, &cookies)?;
        print_info(&format!("Session cached in {}", self.store.path().display()));
        Ok(cookies)
    }

    async fn check(&self, cookies: &[SiteCookie]) -> Result<()> {
        let spinner = create_spinner("Checking session...");
        let result = run_cancellable(self.cancel, self.gateway.check(cookies)).await;
        spinner.finish_and_clear();

        result.map_err(|e| match e {
            Error::Authentication(_) | Error::Cancelled => e,
            other => Error::Authentication(other.to_string()),
        })
    }

    async fn prompt_password(&self, account: &str) -> Result<String> {
        ensure_active(self.cancel)?;
        let prompter = Arc::clone(&self.prompter);
        let account = account.to_string();
        let task = tokio::task::spawn_blocking(move || prompter.password(&account));

        run_cancellable(self.cancel, async {
            task.await
                .map_err(|e| Error::Prompt(format!("Prompt task failed: {}", e)))?
        })
        .await
    }
}
