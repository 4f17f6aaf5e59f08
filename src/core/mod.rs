pub mod arena;
pub mod entry;
pub mod error;
pub mod idle;
pub mod index;
pub mod menu;
pub mod naming;
pub mod registry;
pub mod system;

mod clone;
mod invoke;
mod menubar;

use std::fmt;

use serde::{Deserialize, Serialize};

use arena::arena_key;

arena_key!(
    /// Weak handle to a menu instance; goes stale when the menu is destroyed.
    MenuId,
    "menu#"
);

arena_key!(
    /// Weak handle to a menu entry; goes stale when the entry is destroyed.
    EntryId,
    "entry#"
);

/// Path name of a toplevel window, e.g. `.main`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub String);

impl WindowId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WindowId {
    fn from(path: &str) -> Self {
        WindowId(path.to_string())
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub use entry::{
    EntryConfig, EntryKind, EntryOptions, EntryState, EntryType, MenuEntry, RadioBinding,
    ToggleBinding,
};
pub use error::{MenuError, Result};
pub use idle::{IdleQueue, IdleTask};
pub use index::MenuIndex;
pub use invoke::{CallbackContext, MenuCallback};
pub use menu::{Menu, MenuConfig, MenuOptions, MenuState, MenuType};
pub use registry::{MenuReferenceRegistry, MenuReferences};
pub use system::MenuSystem;
