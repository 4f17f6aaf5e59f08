//! Menu instances and their menu-level options.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{EntryId, MenuId, WindowId};
use crate::platform::NativeHandle;

/// The presentation type of a menu instance, fixed at creation.
///
/// `Master` is the ordinary popup/pulldown type. Whether a menu is the
/// master of its clone chain is a separate question, see [`Menu::is_master`];
/// cascade clones are `Master`-typed instances of another chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuType {
    Master,
    Tearoff,
    Menubar,
}

impl fmt::Display for MenuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MenuType::Master => "normal",
            MenuType::Tearoff => "tearoff",
            MenuType::Menubar => "menubar",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    Unconfigured,
    Configured,
}

/// Menu-level options, shared by every instance of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MenuOptions {
    pub tearoff: bool,
    pub title: Option<String>,
    pub post_command: Option<String>,
    pub tearoff_command: Option<String>,
}

/// A partial menu configuration; an empty string clears a string option.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MenuConfig {
    pub tearoff: Option<bool>,
    pub title: Option<String>,
    pub post_command: Option<String>,
    pub tearoff_command: Option<String>,
}

impl MenuConfig {
    pub fn with_tearoff(tearoff: bool) -> Self {
        Self {
            tearoff: Some(tearoff),
            ..Default::default()
        }
    }
}

impl MenuOptions {
    pub(crate) fn apply(&mut self, config: &MenuConfig) {
        let non_empty = |value: &String| (!value.is_empty()).then(|| value.clone());
        if let Some(tearoff) = config.tearoff {
            self.tearoff = tearoff;
        }
        if let Some(title) = &config.title {
            self.title = non_empty(title);
        }
        if let Some(post_command) = &config.post_command {
            self.post_command = non_empty(post_command);
        }
        if let Some(tearoff_command) = &config.tearoff_command {
            self.tearoff_command = non_empty(tearoff_command);
        }
    }
}

/// One menu instance: either the master of a clone chain or one of its clones.
#[derive(Debug, Clone)]
pub struct Menu {
    pub(crate) id: MenuId,
    pub(crate) name: String,
    pub(crate) menu_type: MenuType,
    pub(crate) state: MenuState,
    /// Own id for a master, otherwise the chain's master.
    pub(crate) master: MenuId,
    /// Clones in creation order; only populated on the master.
    pub(crate) instances: Vec<MenuId>,
    pub(crate) entries: Vec<EntryId>,
    pub(crate) active: Option<usize>,
    /// The toplevel owning a menubar clone.
    pub(crate) parent_toplevel: Option<WindowId>,
    pub(crate) options: MenuOptions,
    pub(crate) native: Option<NativeHandle>,
}

impl Menu {
    pub(crate) fn new(id: MenuId, name: &str, menu_type: MenuType, master: Option<MenuId>) -> Self {
        Self {
            id,
            name: name.to_string(),
            menu_type,
            state: MenuState::Unconfigured,
            master: master.unwrap_or(id),
            instances: Vec::new(),
            entries: Vec::new(),
            active: None,
            parent_toplevel: None,
            options: MenuOptions::default(),
            native: None,
        }
    }

    pub fn id(&self) -> MenuId {
        self.id
    }

    /// The menu's own name, which is also its registry key.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn menu_type(&self) -> MenuType {
        self.menu_type
    }

    pub fn state(&self) -> MenuState {
        self.state
    }

    pub fn master(&self) -> MenuId {
        self.master
    }

    pub fn is_master(&self) -> bool {
        self.master == self.id
    }

    pub fn instances(&self) -> &[MenuId] {
        &self.instances
    }

    pub fn entry_ids(&self) -> &[EntryId] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn parent_toplevel(&self) -> Option<&WindowId> {
        self.parent_toplevel.as_ref()
    }

    pub fn options(&self) -> &MenuOptions {
        &self.options
    }

    pub fn native_handle(&self) -> Option<NativeHandle> {
        self.native
    }

    /// Whether index 0 holds the tear-off entry that deletions must spare.
    pub fn has_tearoff_entry(&self) -> bool {
        self.options.tearoff && !self.entries.is_empty()
    }
}
