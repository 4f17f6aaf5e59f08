//! Binding menus to toplevels as their menubar.

use super::error::{MenuError, Result};
use super::menu::MenuType;
use super::naming::derive_clone_name;
use super::system::MenuSystem;
use super::{MenuId, WindowId};

impl MenuSystem {
    /// Moves `window`'s menubar from `old` to `new`.
    ///
    /// The toplevel's menubar clone of `old` is destroyed. If `new` names a
    /// live menu, a menubar-typed clone of it is made for the toplevel and
    /// bound natively; if it does not exist yet, the toplevel is recorded and
    /// bound once a menu of that name is created. The toplevel is recorded
    /// under the master's name even when `new` names one of its clones.
    /// Returns the new menubar clone, if one was made.
    pub fn set_window_menubar(
        &mut self,
        window: &WindowId,
        old: Option<&str>,
        new: Option<&str>,
    ) -> Result<Option<MenuId>> {
        if old.is_some_and(|name| !name.is_empty()) {
            if let Some(menubar) = self.window_menubar(window) {
                self.recursively_delete_menu(menubar);
            }
            self.registry.remove_window(window);
        }

        let Some(new) = new.filter(|name| !name.is_empty()) else {
            self.platform.bind_window_menubar(window, None);
            return Ok(None);
        };
        let Some(source) = self.menu_by_name(new) else {
            self.registry.add_top_level(new, window);
            self.platform.bind_window_menubar(window, None);
            tracing::info!("Menubar {} for {} is pending until the menu exists", new, window);
            return Ok(None);
        };

        let master = self.master_of(source)?;
        let master_name = self.menus.get(master).map(|m| m.name.clone()).ok_or(MenuError::StaleMenu)?;
        let clone_name = derive_clone_name(&self.registry, window.as_str(), new);
        let clone = match self.clone_recursive(master, &clone_name, MenuType::Menubar, &mut vec![master]) {
            Ok(clone) => clone,
            Err(err) => {
                tracing::warn!("Could not build menubar {} for {}: {}", new, window, err);
                self.platform.bind_window_menubar(window, None);
                return Err(err);
            }
        };

        let handle = match self.menus.get_mut(clone) {
            Some(menu) => {
                menu.parent_toplevel = Some(window.clone());
                menu.native
            }
            None => return Err(MenuError::StaleMenu),
        };
        self.registry.add_top_level(&master_name, window);
        self.platform.bind_window_menubar(window, handle);
        tracing::info!("Bound menubar {} to {} as {}", new, window, clone_name);
        Ok(Some(clone))
    }

    /// The menubar clone `window` currently displays, if any.
    pub fn window_menubar(&self, window: &WindowId) -> Option<MenuId> {
        self.menus
            .iter()
            .find(|(_, menu)| {
                menu.menu_type == MenuType::Menubar && menu.parent_toplevel.as_ref() == Some(window)
            })
            .map(|(id, _)| id)
    }
}
