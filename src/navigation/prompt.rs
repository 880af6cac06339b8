//! Interactive prompts.

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password, Select};

use crate::api::{Item, Product, ProductType};
use crate::error::Result;

/// Rows visible at once in selection lists.
const LIST_PAGE_SIZE: usize = 20;

/// Choice made in the product menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Back,
    DownloadAll,
    ChooseItems,
}

impl MenuChoice {
    /// Menu entries in display order.
    pub const ALL: [MenuChoice; 3] = [
        MenuChoice::Back,
        MenuChoice::DownloadAll,
        MenuChoice::ChooseItems,
    ];

    /// Entry label for a product of the given kind.
    pub fn label(self, kind: ProductType) -> &'static str {
        match (self, kind) {
            (MenuChoice::Back, _) => "Back to product selection",
            (MenuChoice::DownloadAll, ProductType::Column) => "Download all articles",
            (MenuChoice::DownloadAll, ProductType::StandardVideo) => "Download all videos",
            (MenuChoice::DownloadAll, ProductType::TrainingVideo) => "Download all lessons",
            (MenuChoice::ChooseItems, ProductType::Column) => "Choose an article",
            (MenuChoice::ChooseItems, ProductType::StandardVideo) => "Choose a video",
            (MenuChoice::ChooseItems, ProductType::TrainingVideo) => "Choose a lesson",
        }
    }
}

/// Source of user decisions during navigation.
///
/// Calls block until the user answers; callers run them off the async runtime.
pub trait Prompter: Send + Sync + 'static {
    /// Raw product identity as typed by the user.
    fn product_id(&self, university: bool) -> Result<String>;

    fn product_menu(&self, product: &Product) -> Result<MenuChoice>;

    /// Index of the chosen entry in `entries`.
    fn select_item(&self, kind: ProductType, entries: &[Item]) -> Result<usize>;

    /// Masked, non-empty password.
    fn password(&self, account: &str) -> Result<String>;
}

/// Terminal prompts backed by `dialoguer`.
#[derive(Default)]
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompter for TerminalPrompter {
    fn product_id(&self, university: bool) -> Result<String> {
        let prompt = if university {
            "Training program id"
        } else {
            "Course id"
        };
        Ok(Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?)
    }

    fn product_menu(&self, product: &Product) -> Result<MenuChoice> {
        let labels: Vec<&str> = MenuChoice::ALL
            .iter()
            .map(|choice| choice.label(product.kind))
            .collect();
        let index = Select::with_theme(&self.theme)
            .with_prompt(product.title.as_str())
            .items(&labels)
            .default(1)
            .interact()?;
        Ok(MenuChoice::ALL[index])
    }

    fn select_item(&self, kind: ProductType, entries: &[Item]) -> Result<usize> {
        let prompt = match kind {
            ProductType::Column => "Select an article",
            ProductType::StandardVideo => "Select a video",
            ProductType::TrainingVideo => "Select a lesson",
        };
        let labels: Vec<&str> = entries.iter().map(|item| item.title.as_str()).collect();
        Ok(Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(&labels)
            .default(0)
            .max_length(LIST_PAGE_SIZE)
            .interact()?)
    }

    fn password(&self, account: &str) -> Result<String> {
        Ok(Password::with_theme(&self.theme)
            .with_prompt(format!("Password for {}", account))
            .validate_with(|input: &String| -> std::result::Result<(), &'static str> {
                if input.is_empty() {
                    Err("Password must not be empty")
                } else {
                    Ok(())
                }
            })
            .interact()?)
    }
}
