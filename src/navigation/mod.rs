//! Interactive navigation.
//!
//! The controller is an explicit state loop: choose a product, pick what to
//! download from its menu, run the batch, then return to wherever the download
//! was started from. A product given on the command line skips the product
//! prompt and ends the session after its first batch.

pub mod prompt;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub use prompt::{MenuChoice, Prompter, TerminalPrompter};
pub use state::{ReturnTarget, Scope, State};

use crate::api::{Catalog, Item, Product};
use crate::cancel::{ensure_active, run_cancellable};
use crate::config::parse_product_id;
use crate::download::{Batch, BatchState, Coordinator};
use crate::error::{Error, Result};
use crate::fs::project_dir;
use crate::output::{create_spinner, print_info, print_success, print_warning};

/// Options steering the navigation flow.
#[derive(Debug, Clone, Default)]
pub struct NavigationOptions {
    /// Product to download without prompting.
    pub preset_product: Option<i64>,
    /// Look products up as training programs.
    pub university: bool,
    /// Download every item right after a product is loaded.
    pub download_all: bool,
}

/// Drives the interactive session.
pub struct Navigator<'a> {
    catalog: Arc<dyn Catalog>,
    prompter: Arc<dyn Prompter>,
    coordinator: &'a Coordinator,
    account_folder: PathBuf,
    options: NavigationOptions,
    cancel: CancellationToken,
    product: Option<Product>,
    items_loaded: bool,
}

impl<'a> Navigator<'a> {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        prompter: Arc<dyn Prompter>,
        coordinator: &'a Coordinator,
        account_folder: PathBuf,
        options: NavigationOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            catalog,
            prompter,
            coordinator,
            account_folder,
            options,
            cancel,
            product: None,
            items_loaded: false,
        }
    }

    /// Run until the flow exits or fails.
    pub async fn run(&mut self) -> Result<()> {
        let mut state = State::SelectProduct;
        loop {
            tracing::debug!("Navigation state: {:?}", state);
            state = match state {
                State::SelectProduct => self.select_product().await?,
                State::ProductMenu => self.product_menu().await?,
                State::SelectItem => self.select_item().await?,
                State::Downloading { scope, return_to } => self.download(scope, return_to).await?,
                State::Exit => return Ok(()),
            };
        }
    }

    async fn select_product(&mut self) -> Result<State> {
        let id = match self.options.preset_product {
            Some(id) => id,
            None => self.prompt_product_id().await?,
        };

        let spinner = create_spinner("Loading product...");
        let loaded = run_cancellable(&self.cancel, self.load_product(id)).await;
        spinner.finish_and_clear();

        let product = match loaded {
            Ok(product) if product.access => product,
            Ok(_) | Err(Error::AccessDenied(_)) => {
                if self.options.preset_product.is_some() {
                    return Err(Error::AccessDenied(id));
                }
                print_warning(&format!("Product {} has not been purchased", id));
                return Ok(State::SelectProduct);
            }
            Err(e) => return Err(e),
        };

        print_info(&format!("Loaded '{}'", product.title));
        self.product = Some(product);
        self.items_loaded = false;

        if self.options.download_all {
            Ok(State::Downloading {
                scope: Scope::All,
                return_to: ReturnTarget::SelectProduct,
            })
        } else {
            Ok(State::ProductMenu)
        }
    }

    async fn load_product(&self, id: i64) -> Result<Product> {
        if self.options.university {
            self.catalog.training_product(id).await
        } else {
            self.catalog.product(id).await
        }
    }

    /// Prompt until a well-formed product id is entered.
    async fn prompt_product_id(&self) -> Result<i64> {
        let university = self.options.university;
        loop {
            let input = self.ask(move |p| p.product_id(university)).await?;
            match parse_product_id(&input) {
                Ok(id) => return Ok(id),
                Err(e) => print_warning(&e.to_string()),
            }
        }
    }

    async fn product_menu(&mut self) -> Result<State> {
        let Some(product) = self.product.clone() else {
            return Ok(State::SelectProduct);
        };

        let choice = self.ask(move |p| p.product_menu(&product)).await?;
        Ok(match choice {
            MenuChoice::Back => State::SelectProduct,
            MenuChoice::DownloadAll => State::Downloading {
                scope: Scope::All,
                return_to: ReturnTarget::SelectProduct,
            },
            MenuChoice::ChooseItems => State::SelectItem,
        })
    }

    async fn select_item(&mut self) -> Result<State> {
        self.ensure_items().await?;
        let Some(product) = &self.product else {
            return Ok(State::SelectProduct);
        };

        let kind = product.kind;
        let entries: Vec<Item> = std::iter::once(Item::back())
            .chain(product.items.iter().cloned())
            .collect();
        let count = entries.len();

        let (index, chosen) = self
            .ask(move |p| {
                let index = p.select_item(kind, &entries)?;
                Ok((index, entries.get(index).cloned()))
            })
            .await?;

        match chosen {
            Some(item) if item.is_back() => Ok(State::ProductMenu),
            Some(_) => Ok(State::Downloading {
                scope: Scope::Single(index - 1),
                return_to: ReturnTarget::SelectItem,
            }),
            None => Err(Error::Prompt(format!(
                "Selection {} out of range ({} entries)",
                index, count
            ))),
        }
    }

    async fn download(&mut self, scope: Scope, return_to: ReturnTarget) -> Result<State> {
        self.ensure_items().await?;
        let Some(product) = &self.product else {
            return Ok(State::SelectProduct);
        };

        let items: &[Item] = match scope {
            Scope::All => &product.items,
            Scope::Single(index) => product
                .items
                .get(index)
                .map(std::slice::from_ref)
                .ok_or_else(|| Error::Prompt(format!("No item at position {}", index)))?,
        };

        let project_dir = project_dir(&self.account_folder, &product.title);
        let batch = Batch {
            product,
            items,
            project_dir: &project_dir,
        };
        let mut state = BatchState::new(items.len());
        self.coordinator.run(&batch, &mut state).await?;

        if let (Scope::Single(_), [item]) = (scope, items) {
            print_success(&format!("{} downloaded", item.title));
        }

        if self.options.preset_product.is_some() {
            return Ok(State::Exit);
        }
        Ok(return_to.into())
    }

    /// Load the current product's items on first use.
    async fn ensure_items(&mut self) -> Result<()> {
        if self.items_loaded {
            return Ok(());
        }
        let Some(product) = self.product.as_mut() else {
            return Ok(());
        };

        let spinner = create_spinner("Loading items...");
        let items = run_cancellable(&self.cancel, self.catalog.items(product)).await;
        spinner.finish_and_clear();

        product.items = items?;
        self.items_loaded = true;
        tracing::debug!("Loaded {} items for '{}'", product.items.len(), product.title);
        Ok(())
    }

    /// Show a prompt on a blocking thread, abandoning it on interrupt.
    async fn ask<T, F>(&self, prompt: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Prompter) -> Result<T> + Send + 'static,
    {
        ensure_active(&self.cancel)?;
        let prompter = Arc::clone(&self.prompter);
        let task = tokio::task::spawn_blocking(move || prompt(prompter.as_ref()));

        run_cancellable(&self.cancel, async {
            task.await
                .map_err(|e| Error::Prompt(format!("Prompt task failed: {}", e)))?
        })
        .await
    }
}
