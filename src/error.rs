use thiserror::Error;

/// Rejected menu configuration. These produce a control that is either
/// inaccessible or does nothing, so they are refused up front.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MenuError {
    #[error("menu trigger needs a non-empty accessible label")]
    MissingLabel,
    #[error("menu needs at least one item")]
    NoItems,
    #[error("menu item at position {0} has a blank name")]
    BlankItemName(usize),
    #[error("menu item name {0:?} is used more than once")]
    DuplicateItemName(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid duration {0:?} (expected e.g. 200ms, 0.2s or 150)")]
    InvalidDuration(String),
    #[error("duration {0:?} must be greater than zero")]
    ZeroDuration(String),
}
