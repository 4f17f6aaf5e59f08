//! Clone chains: copying a menu, and propagating entry insertion,
//! configuration and deletion to every instance of a chain.
//!
//! Every instance of a chain keeps the same entry sequence. A cascade entry
//! in a clone never posts the master's target; it posts a parallel clone of
//! it that the entry owns and destroys with itself.

use super::entry::{EntryConfig, EntryKind, EntryType, MenuEntry};
use super::error::{MenuError, Result};
use super::index::MenuIndex;
use super::menu::{Menu, MenuState, MenuType};
use super::naming::derive_clone_name;
use super::system::MenuSystem;
use super::{EntryId, MenuId};
use crate::config::TearoffDeletePolicy;

impl MenuSystem {
    /// Clones `source` (master or clone) as `new_name`, recursively cloning
    /// every live cascade child. On failure nothing created by this call
    /// survives.
    pub fn clone_menu(&mut self, source: MenuId, new_name: &str, new_type: MenuType) -> Result<MenuId> {
        let master = self.master_of(source)?;
        if new_name.is_empty() {
            return Err(MenuError::InvalidName(new_name.to_string()));
        }
        if self.menu_by_name(new_name).is_some() {
            return Err(MenuError::NameCollision(new_name.to_string()));
        }
        self.clone_recursive(source, new_name, new_type, &mut vec![master])
    }

    /// `path` holds the masters of every menu being cloned above this one;
    /// cascades back into any of them are left unlinked.
    pub(crate) fn clone_recursive(
        &mut self,
        source: MenuId,
        new_name: &str,
        new_type: MenuType,
        path: &mut Vec<MenuId>,
    ) -> Result<MenuId> {
        let src = self.menus.get(source).ok_or(MenuError::StaleMenu)?;
        let master = src.master;
        let options = src.options.clone();
        let source_entries = src.entries.clone();

        let clone = self.create_instance(new_name, new_type, Some(master))?;
        if let Some(menu) = self.menus.get_mut(clone) {
            menu.options = options;
            menu.state = MenuState::Configured;
        }

        for (index, source_entry) in source_entries.into_iter().enumerate() {
            let Some(entry) = self.entries.get(source_entry) else {
                continue;
            };
            let kind = EntryKind::new(entry.entry_type());
            let config = entry.to_config();
            let child = entry
                .child_instance
                .or_else(|| entry.cascade_target().and_then(|t| self.menu_by_name(t)));

            let Some(new_entry) = self.new_entry(clone, index, kind) else {
                break;
            };
            self.configure_entry(new_entry, &config);

            let Some(child) = child.filter(|c| self.is_live(*c)) else {
                continue;
            };
            match self.clone_cascade_child(child, new_name, path) {
                Ok(Some(child_clone)) => self.set_child_instance(new_entry, child_clone),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!("Rolling back clone {}: {}", new_name, err);
                    self.recursively_delete_menu(clone);
                    return Err(err);
                }
            }
        }

        self.schedule_recompute(clone);
        tracing::info!(
            "Cloned {} as {} ({})",
            self.menus.get(master).map_or("?", Menu::name),
            new_name,
            new_type
        );
        Ok(clone)
    }

    /// Clones the menu a cascade posts, under a name derived from the
    /// instance that will own the clone. Returns `Ok(None)` when the child
    /// belongs to a chain already being cloned.
    pub(crate) fn clone_cascade_child(
        &mut self,
        child: MenuId,
        parent_name: &str,
        path: &mut Vec<MenuId>,
    ) -> Result<Option<MenuId>> {
        let child_menu = self.menus.get(child).ok_or(MenuError::StaleMenu)?;
        let child_master = child_menu.master;
        if path.contains(&child_master) {
            tracing::warn!(
                "Cascade cycle through {}; leaving the clone of it unlinked under {}",
                child_menu.name,
                parent_name
            );
            return Ok(None);
        }
        let master_name = self
            .menus
            .get(child_master)
            .map_or_else(|| child_menu.name.clone(), |m| m.name.clone());
        let name = derive_clone_name(&self.registry, parent_name, &master_name);

        path.push(child_master);
        let result = self.clone_recursive(child, &name, MenuType::Master, path);
        path.pop();
        result.map(Some)
    }

    /// Applies `config` to entry `index` of every instance of the chain.
    ///
    /// When the cascade target changes, each clone's old child clone is torn
    /// down and a new one built. Clones whose child is missing get one too.
    /// Every instance is visited even if one fails; the first error is
    /// returned.
    pub fn configure_clone_entries(&mut self, menu: MenuId, index: usize, config: &EntryConfig) -> Result<()> {
        let master = self.master_of(menu)?;
        let master_entry = self
            .entry_at(master, index)
            .ok_or_else(|| MenuError::InvalidIndex(index.to_string()))?;
        config.validate_for(master_entry.entry_type())?;
        let master_entry_id = master_entry.id();

        let changed = self.configure_entry(master_entry_id, config);
        if config.state.is_some() {
            self.sync_active(master, index);
        }
        let target = self
            .entries
            .get(master_entry_id)
            .and_then(MenuEntry::child_instance)
            .filter(|c| self.is_live(*c));

        let mut first_error = None;
        let instances = self.menus.get(master).map(|m| m.instances.clone()).unwrap_or_default();
        for instance in instances {
            let Some(entry_id) = self.entry_at(instance, index).map(MenuEntry::id) else {
                continue;
            };
            if changed {
                let old_child = self.entries.get(entry_id).and_then(MenuEntry::child_instance);
                if let Some(old_child) = old_child.filter(|c| self.is_clone(*c)) {
                    self.recursively_delete_menu(old_child);
                }
            }
            self.configure_entry(entry_id, config);
            if config.state.is_some() {
                self.sync_active(instance, index);
            }

            let Some(target) = target else {
                continue;
            };
            let missing = self.entries.get(entry_id).is_some_and(|entry| {
                entry.entry_type() == EntryType::Cascade
                    && !entry.child_instance.is_some_and(|c| self.is_live(c))
            });
            if !missing {
                continue;
            }
            let Some(instance_name) = self.menus.get(instance).map(|m| m.name.clone()) else {
                continue;
            };
            match self.clone_cascade_child(target, &instance_name, &mut vec![master]) {
                Ok(Some(child)) => self.set_child_instance(entry_id, child),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!("Cascade in {} left unlinked: {}", instance_name, err);
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Deletes the inclusive range `[first, last]` from every instance.
    pub fn delete_clone_entries(&mut self, menu: MenuId, first: usize, last: usize) -> Result<()> {
        let master = self.master_of(menu)?;
        let len = self.menus.get(master).map_or(0, Menu::len);
        if first > last || last >= len {
            return Err(MenuError::InvalidIndex(format!("{first}..{last}")));
        }
        for instance in self.chain(master) {
            self.remove_entries(instance, first, last);
        }
        tracing::debug!("Deleted entries {}..={} across the chain", first, last);
        Ok(())
    }

    /// Destroys `menu` after first destroying every clone its cascades post.
    /// Masters reached through cascades are left alone.
    pub fn recursively_delete_menu(&mut self, menu: MenuId) {
        let children: Vec<MenuId> = self
            .entries_of(menu)
            .into_iter()
            .filter(|entry| entry.entry_type() == EntryType::Cascade)
            .filter_map(MenuEntry::child_instance)
            .collect();
        for child in children {
            if self.is_clone(child) {
                self.recursively_delete_menu(child);
            }
        }
        self.destroy_menu_instance(menu);
    }

    /// Drops a cascade entry's registry hook and posted instance.
    pub fn unhook_cascade_entry(&mut self, entry_id: EntryId) {
        let Some(entry) = self.entries.get_mut(entry_id) else {
            return;
        };
        entry.child_instance = None;
        if let Some(name) = entry.child_ref.take() {
            self.registry.unhook_entry(&name, entry_id);
            tracing::debug!("Unhooked cascade {:?} from {}", entry_id, name);
        }
    }

    fn is_clone(&self, menu: MenuId) -> bool {
        self.menus.get(menu).is_some_and(|m| !m.is_master())
    }

    /// Inserts a new entry at `index` in every instance of the chain and
    /// returns the index it landed at.
    ///
    /// Insertion before a tear-off entry is moved after it. Cascade entries in
    /// clones get a parallel clone of the target.
    pub fn insert_entry(
        &mut self,
        menu: MenuId,
        index: usize,
        entry_type: EntryType,
        config: EntryConfig,
    ) -> Result<usize> {
        if entry_type == EntryType::Tearoff {
            return Err(MenuError::InvalidEntryType(entry_type.to_string()));
        }
        config.validate_for(entry_type)?;
        let master = self.master_of(menu)?;
        let master_menu = self.menus.get(master).ok_or(MenuError::StaleMenu)?;
        let mut index = index.min(master_menu.len());
        if index == 0 && master_menu.has_tearoff_entry() {
            index = 1;
        }

        let mut first_error = None;
        let mut target = None;
        for instance in self.chain(master) {
            let Some(entry_id) = self.new_entry(instance, index, EntryKind::new(entry_type)) else {
                continue;
            };
            self.configure_entry(entry_id, &config);
            if instance == master {
                target = self.entries.get(entry_id).and_then(MenuEntry::child_instance);
                continue;
            }
            let Some(child) = target.filter(|c| self.is_live(*c)) else {
                continue;
            };
            let Some(instance_name) = self.menus.get(instance).map(|m| m.name.clone()) else {
                continue;
            };
            match self.clone_cascade_child(child, &instance_name, &mut vec![master]) {
                Ok(Some(child_clone)) => self.set_child_instance(entry_id, child_clone),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!("Cascade in {} left unlinked: {}", instance_name, err);
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(index), Err)
    }

    /// Appends an entry to every instance of the chain.
    pub fn add_entry(&mut self, menu: MenuId, entry_type: EntryType, config: EntryConfig) -> Result<usize> {
        self.insert_entry(menu, usize::MAX, entry_type, config)
    }

    /// Inserts before the entry `index` resolves to; `end` appends.
    pub fn insert_entry_at(
        &mut self,
        menu: MenuId,
        index: &MenuIndex,
        entry_type: EntryType,
        config: EntryConfig,
    ) -> Result<usize> {
        let position = self
            .resolve_index(menu, index, true)?
            .ok_or_else(|| MenuError::InvalidIndex(index.to_string()))?;
        self.insert_entry(menu, position, entry_type, config)
    }

    /// Configures the entry `index` resolves to; `none` is a no-op.
    pub fn configure_entry_at(&mut self, menu: MenuId, index: &MenuIndex, config: &EntryConfig) -> Result<()> {
        match self.resolve_index(menu, index, false)? {
            Some(position) => self.configure_clone_entries(menu, position, config),
            None => Ok(()),
        }
    }

    /// Deletes the entries from `first` through `last` (or just `first`) in
    /// every instance and returns how many were removed from each.
    ///
    /// An empty range is a no-op. A range starting at a tear-off entry is
    /// handled per the configured [`TearoffDeletePolicy`].
    pub fn delete_entries(&mut self, menu: MenuId, first: &MenuIndex, last: Option<&MenuIndex>) -> Result<usize> {
        let Some(mut first_index) = self.resolve_index(menu, first, false)? else {
            return Ok(0);
        };
        let last_index = match last {
            Some(last) => self.resolve_index(menu, last, false)?,
            None => Some(first_index),
        };
        let Some(last_index) = last_index else {
            return Ok(0);
        };

        if first_index == 0 && self.menu(menu).is_some_and(Menu::has_tearoff_entry) {
            match self.config.tearoff_delete_policy {
                TearoffDeletePolicy::Skip => first_index = 1,
                TearoffDeletePolicy::Reject => return Err(MenuError::InvalidIndex(first.to_string())),
            }
        }
        if last_index < first_index {
            return Ok(0);
        }
        self.delete_clone_entries(menu, first_index, last_index)?;
        Ok(last_index - first_index + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::MenuConfig;

    fn system() -> MenuSystem {
        MenuSystem::headless(EngineConfig::default())
    }

    fn labels(system: &MenuSystem, menu: MenuId) -> Vec<String> {
        system
            .entries_of(menu)
            .iter()
            .map(|entry| entry.label().unwrap_or(entry.entry_type().as_str()).to_string())
            .collect()
    }

    #[test]
    fn test_clone_copies_entries_and_options() {
        let mut system = system();
        let menu = system
            .create_menu(".m", MenuConfig {
                title: Some("File".into()),
                ..Default::default()
            })
            .unwrap();
        system.add_entry(menu, EntryType::Command, EntryConfig::label("Open")).unwrap();
        system.add_entry(menu, EntryType::Separator, EntryConfig::default()).unwrap();

        let clone = system.clone_menu(menu, ".m.tear", MenuType::Tearoff).unwrap();
        assert_eq!(labels(&system, clone), vec!["tearoff", "Open", "separator"]);
        assert_eq!(system.menu(clone).unwrap().options().title.as_deref(), Some("File"));
        assert_eq!(system.menu(menu).unwrap().instances(), &[clone]);
        system.verify_consistency().unwrap();
    }

    #[test]
    fn test_clone_rejects_taken_name() {
        let mut system = system();
        let menu = system.create_menu(".m", MenuConfig::default()).unwrap();
        system.create_menu(".other", MenuConfig::default()).unwrap();
        assert_eq!(
            system.clone_menu(menu, ".other", MenuType::Tearoff),
            Err(MenuError::NameCollision(".other".to_string()))
        );
    }

    #[test]
    fn test_insert_before_tearoff_moves_after_it() {
        let mut system = system();
        let menu = system.create_menu(".m", MenuConfig::default()).unwrap();
        let clone = system.clone_menu(menu, ".m.c", MenuType::Tearoff).unwrap();
        let index = system
            .insert_entry(menu, 0, EntryType::Command, EntryConfig::label("First"))
            .unwrap();
        assert_eq!(index, 1);
        assert_eq!(labels(&system, clone), vec!["tearoff", "First"]);
    }

    #[test]
    fn test_tearoff_entries_cannot_be_inserted() {
        let mut system = system();
        let menu = system.create_menu(".m", MenuConfig::default()).unwrap();
        assert_eq!(
            system.add_entry(menu, EntryType::Tearoff, EntryConfig::default()),
            Err(MenuError::InvalidEntryType("tearoff".to_string()))
        );
    }

    #[test]
    fn test_invalid_option_mutates_nothing() {
        let mut system = system();
        let menu = system.create_menu(".m", MenuConfig::with_tearoff(false)).unwrap();
        system.add_entry(menu, EntryType::Command, EntryConfig::label("A")).unwrap();
        let before = system.describe();
        assert!(system
            .configure_clone_entries(menu, 0, &EntryConfig::cascade("A", ".s"))
            .is_err());
        assert_eq!(system.describe(), before);
    }

    #[test]
    fn test_delete_skips_tearoff_by_default() {
        let mut system = system();
        let menu = system.create_menu(".m", MenuConfig::default()).unwrap();
        system.add_entry(menu, EntryType::Command, EntryConfig::label("A")).unwrap();
        system.add_entry(menu, EntryType::Command, EntryConfig::label("B")).unwrap();
        let removed = system
            .delete_entries(menu, &MenuIndex::Number(0), Some(&MenuIndex::End))
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(labels(&system, menu), vec!["tearoff"]);
        assert_eq!(system.delete_entries(menu, &MenuIndex::Number(0), None).unwrap(), 0);
    }

    #[test]
    fn test_delete_rejects_tearoff_when_configured() {
        let config = EngineConfig {
            tearoff_delete_policy: TearoffDeletePolicy::Reject,
            ..EngineConfig::default()
        };
        let mut system = MenuSystem::headless(config);
        let menu = system.create_menu(".m", MenuConfig::default()).unwrap();
        system.add_entry(menu, EntryType::Command, EntryConfig::label("A")).unwrap();
        assert_eq!(
            system.delete_entries(menu, &MenuIndex::Number(0), Some(&MenuIndex::End)),
            Err(MenuError::InvalidIndex("0".to_string()))
        );
        assert_eq!(system.menu(menu).unwrap().len(), 2);
    }

    #[test]
    fn test_delete_shifts_active_entry() {
        let mut system = system();
        let menu = system.create_menu(".m", MenuConfig::with_tearoff(false)).unwrap();
        for label in ["A", "B", "C", "D"] {
            system.add_entry(menu, EntryType::Command, EntryConfig::label(label)).unwrap();
        }
        system.activate(menu, Some(3)).unwrap();
        system.delete_clone_entries(menu, 0, 1).unwrap();
        assert_eq!(system.menu(menu).unwrap().active(), Some(1));

        system.delete_clone_entries(menu, 1, 1).unwrap();
        assert_eq!(system.menu(menu).unwrap().active(), None);
        assert_eq!(labels(&system, menu), vec!["C"]);
    }

    #[test]
    fn test_configure_repairs_missing_child_clone() {
        let mut system = system();
        let menu = system.create_menu(".m", MenuConfig::with_tearoff(false)).unwrap();
        system.add_entry(menu, EntryType::Cascade, EntryConfig::cascade("Sub", ".s")).unwrap();
        let clone = system.clone_menu(menu, ".m.c", MenuType::Tearoff).unwrap();
        assert_eq!(system.entry_at(clone, 0).unwrap().child_instance(), None);

        let sub = system.create_menu(".s", MenuConfig::with_tearoff(false)).unwrap();
        let posted = system.entry_at(clone, 0).unwrap().child_instance().unwrap();
        assert_eq!(system.menu(posted).unwrap().master(), sub);

        system.destroy_menu(posted).unwrap();
        system
            .configure_clone_entries(menu, 0, &EntryConfig::label("Sub"))
            .unwrap();
        let repaired = system.entry_at(clone, 0).unwrap().child_instance().unwrap();
        assert_eq!(system.menu(repaired).unwrap().master(), sub);
        system.verify_consistency().unwrap();
    }
}
