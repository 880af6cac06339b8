//! Navigation states.

/// Items a download covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every item of the product.
    All,
    /// The item at this index of the product's item list.
    Single(usize),
}

/// Where navigation continues once a download finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnTarget {
    SelectProduct,
    SelectItem,
}

/// A step of the interactive flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    SelectProduct,
    ProductMenu,
    SelectItem,
    Downloading {
        scope: Scope,
        return_to: ReturnTarget,
    },
    Exit,
}

impl From<ReturnTarget> for State {
    fn from(target: ReturnTarget) -> Self {
        match target {
            ReturnTarget::SelectProduct => State::SelectProduct,
            ReturnTarget::SelectItem => State::SelectItem,
        }
    }
}
