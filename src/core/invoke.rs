//! Activation, posting, invocation and the callbacks they run.
//!
//! Callbacks receive the whole [`MenuSystem`] and may destroy or reconfigure
//! anything, including the menu that triggered them. Every handle is
//! re-checked once a callback returns.

use std::rc::Rc;

use super::entry::{EntryKind, EntryState};
use super::error::{MenuError, Result};
use super::menu::MenuType;
use super::naming::derive_clone_name;
use super::system::MenuSystem;
use super::{EntryId, MenuId};

/// What a callback was invoked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackContext {
    pub menu: MenuId,
    pub menu_name: String,
    pub entry: Option<usize>,
    /// The new tear-off clone, for `tearoff_command` callbacks.
    pub tearoff: Option<MenuId>,
}

/// A named script callback. An `Err` message is reported as
/// [`MenuError::Callback`].
pub type MenuCallback = Rc<dyn Fn(&mut MenuSystem, &CallbackContext) -> std::result::Result<(), String>>;

impl MenuSystem {
    pub fn register_command<F>(&mut self, name: &str, callback: F)
    where
        F: Fn(&mut MenuSystem, &CallbackContext) -> std::result::Result<(), String> + 'static,
    {
        self.commands.insert(name.to_string(), Rc::new(callback));
    }

    pub fn unregister_command(&mut self, name: &str) -> bool {
        self.commands.remove(name).is_some()
    }

    fn run_callback(&mut self, command: &str, context: CallbackContext) -> Result<()> {
        let Some(callback) = self.commands.get(command).cloned() else {
            return Err(MenuError::Callback {
                command: command.to_string(),
                message: "no such command".to_string(),
            });
        };
        tracing::debug!("Running callback {} for {}", command, context.menu_name);
        callback(self, &context).map_err(|message| {
            tracing::warn!("Callback {} failed: {}", command, message);
            MenuError::Callback {
                command: command.to_string(),
                message,
            }
        })
    }

    fn context(&self, menu: MenuId, entry: Option<usize>) -> CallbackContext {
        CallbackContext {
            menu,
            menu_name: self.menu(menu).map(|m| m.name().to_string()).unwrap_or_default(),
            entry,
            tearoff: None,
        }
    }

    /// Makes entry `index` the active entry of this one instance. Disabled
    /// entries, and `None`, leave the menu without an active entry.
    pub fn activate(&mut self, menu: MenuId, index: Option<usize>) -> Result<()> {
        let menu_ref = self.menus.get(menu).ok_or(MenuError::StaleMenu)?;
        if let Some(index) = index.filter(|i| *i >= menu_ref.len()) {
            return Err(MenuError::InvalidIndex(index.to_string()));
        }
        let index = index.filter(|i| {
            self.entry_at(menu, *i)
                .is_some_and(|entry| entry.state() != EntryState::Disabled)
        });
        let previous = menu_ref.active;
        if previous == index {
            return Ok(());
        }

        if let Some(previous) = previous {
            self.set_entry_state(menu, previous, EntryState::Active, EntryState::Normal);
        }
        if let Some(menu_ref) = self.menus.get_mut(menu) {
            menu_ref.active = index;
        }
        if let Some(index) = index {
            self.set_entry_state(menu, index, EntryState::Normal, EntryState::Active);
        }
        Ok(())
    }

    fn set_entry_state(&mut self, menu: MenuId, index: usize, from: EntryState, to: EntryState) {
        let Some(entry_id) = self.entry_at(menu, index).map(|e| e.id()) else {
            return;
        };
        if let Some(entry) = self.entries.get_mut(entry_id).filter(|e| e.options.state == from) {
            entry.options.state = to;
            self.schedule_redraw(menu, Some(index));
        }
    }

    /// Reconciles `menu`'s active index with the state entry `index` was just
    /// configured to: an Active entry becomes the active one, any other state
    /// on the active index leaves the menu without one.
    pub(crate) fn sync_active(&mut self, menu: MenuId, index: usize) {
        let Some(state) = self.entry_at(menu, index).map(|e| e.state()) else {
            return;
        };
        let active = self.menus.get(menu).and_then(|m| m.active);
        let result = match state {
            EntryState::Active => self.activate(menu, Some(index)),
            _ if active == Some(index) => self.activate(menu, None),
            _ => Ok(()),
        };
        if let Err(err) = result {
            tracing::warn!("Could not update active entry of {:?}: {}", menu, err);
        }
    }

    /// Runs the menu's post command, then schedules a geometry pass if the
    /// menu survived it.
    pub fn post(&mut self, menu: MenuId) -> Result<()> {
        let menu_ref = self.menus.get(menu).ok_or(MenuError::StaleMenu)?;
        if let Some(command) = menu_ref.options.post_command.clone() {
            let context = self.context(menu, None);
            self.run_callback(&command, context)?;
        }
        if !self.is_live(menu) {
            tracing::debug!("Menu {:?} was destroyed by its post command", menu);
            return Ok(());
        }
        self.schedule_recompute(menu);
        Ok(())
    }

    /// Invokes entry `index`: tears off, toggles or selects as the entry type
    /// requires, then runs the entry's command. Returns the tear-off clone
    /// when one was made.
    pub fn invoke(&mut self, menu: MenuId, index: usize) -> Result<Option<MenuId>> {
        let entry = self
            .entry_at(menu, index)
            .ok_or_else(|| MenuError::InvalidIndex(index.to_string()))?;
        if entry.state() == EntryState::Disabled {
            return Ok(None);
        }
        let entry_id = entry.id();
        let command = entry.options.command.clone();

        match &entry.kind {
            EntryKind::Tearoff => return self.tear_off(menu).map(Some),
            EntryKind::Check(binding) => {
                let variable = entry.variable();
                let current = variable.as_deref().and_then(|v| self.variables.get(v));
                let next = if current == Some(&binding.on_value) {
                    binding.off_value.clone()
                } else {
                    binding.on_value.clone()
                };
                if let Some(variable) = variable {
                    self.set_variable(&variable, &next);
                }
            }
            EntryKind::Radio(_) => {
                if let (Some(variable), Some(value)) = (entry.variable(), entry.radio_value()) {
                    self.set_variable(&variable, &value);
                }
            }
            EntryKind::Command | EntryKind::Cascade { .. } | EntryKind::Separator => {}
        }

        if let Some(command) = command {
            let context = self.context(menu, Some(index));
            self.run_callback(&command, context)?;
        }
        if !self.entries.contains(entry_id) {
            tracing::debug!("Entry {:?} was deleted by its own command", entry_id);
        }
        Ok(None)
    }

    /// Creates a tear-off clone of `menu` and runs the chain's tear-off
    /// command with it.
    pub fn tear_off(&mut self, menu: MenuId) -> Result<MenuId> {
        let master = self.master_of(menu)?;
        let name = self.menus.get(menu).map(|m| m.name.clone()).unwrap_or_default();
        let clone_name = derive_clone_name(&self.registry, &name, "tearoff");
        let clone = self.clone_menu(menu, &clone_name, MenuType::Tearoff)?;

        let command = self.menus.get(master).and_then(|m| m.options.tearoff_command.clone());
        if let Some(command) = command {
            let context = CallbackContext {
                tearoff: Some(clone),
                ..self.context(menu, Some(0))
            };
            self.run_callback(&command, context)?;
        }
        Ok(clone)
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Writes a script variable and redraws every entry bound to it.
    pub fn set_variable(&mut self, name: &str, value: &str) {
        self.variables.insert(name.to_string(), value.to_string());
        let bound: Vec<(MenuId, usize)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.variable().as_deref() == Some(name))
            .map(|(_, entry)| (entry.owner, entry.index))
            .collect();
        for (menu, index) in bound {
            self.schedule_redraw(menu, Some(index));
        }
    }

    /// Whether a check or radio entry currently shows as selected.
    pub fn is_selected(&self, entry_id: EntryId) -> bool {
        let Some(entry) = self.entry(entry_id) else {
            return false;
        };
        let current = entry.variable().and_then(|v| self.variables.get(&v).cloned());
        match &entry.kind {
            EntryKind::Check(binding) => current.as_ref() == Some(&binding.on_value),
            EntryKind::Radio(_) => current.is_some() && current == entry.radio_value(),
            _ => false,
        }
    }
}
