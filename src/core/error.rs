//! Defines the custom error type for the `core` module.

use thiserror::Error;

use crate::platform::PlatformError;

/// The primary error type for the `core` module.
///
/// Structural errors (`NameCollision`, `InvalidIndex`, `InvalidOption`, ...)
/// are raised before anything is mutated. `NativeResourceExhausted` and
/// `Callback` can surface after part of an operation has been committed; the
/// clone chains are consistent either way.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MenuError {
    /// A live menu already owns the requested name.
    #[error("menu name \"{0}\" is already in use")]
    NameCollision(String),

    /// An index is out of range, unparsable, or points at a protected entry.
    #[error("bad menu entry index \"{0}\"")]
    InvalidIndex(String),

    /// The platform layer could not allocate a native menu handle.
    #[error("native menu resources exhausted while creating \"{0}\"")]
    NativeResourceExhausted(String),

    /// A post-command, entry command or tear-off callback failed.
    #[error("callback \"{command}\" failed: {message}")]
    Callback { command: String, message: String },

    /// The name does not resolve to a live menu.
    #[error("menu \"{0}\" does not exist")]
    UnknownMenu(String),

    /// The handle refers to a menu that has been destroyed.
    #[error("menu handle is no longer live")]
    StaleMenu,

    #[error("invalid menu name \"{0}\"")]
    InvalidName(String),

    /// An option was given that the entry's type does not support.
    #[error("option \"{option}\" is not valid for {entry_type} entries")]
    InvalidOption {
        option: &'static str,
        entry_type: &'static str,
    },

    #[error("bad menu entry type \"{0}\"")]
    InvalidEntryType(String),
}

impl MenuError {
    /// A short, stable identifier used in IPC replies.
    pub fn kind(&self) -> &'static str {
        match self {
            MenuError::NameCollision(_) => "name_collision",
            MenuError::InvalidIndex(_) => "invalid_index",
            MenuError::NativeResourceExhausted(_) => "native_resource_exhausted",
            MenuError::Callback { .. } => "callback",
            MenuError::UnknownMenu(_) => "unknown_menu",
            MenuError::StaleMenu => "stale_menu",
            MenuError::InvalidName(_) => "invalid_name",
            MenuError::InvalidOption { .. } => "invalid_option",
            MenuError::InvalidEntryType(_) => "invalid_entry_type",
        }
    }

    pub(crate) fn from_platform(name: &str, err: PlatformError) -> Self {
        tracing::warn!("Native handle allocation for {} failed: {}", name, err);
        MenuError::NativeResourceExhausted(name.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MenuError>;
