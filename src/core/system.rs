//! The `MenuSystem` context: owns the registry, every menu instance and
//! entry, the deferred-work queue and the platform layer.
//!
//! All operations run on one thread. Handles (`MenuId`, `EntryId`) are weak;
//! any multi-step operation re-checks them after each step that could have
//! destroyed something.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;

use super::arena::Arena;
use super::entry::{EntryConfig, EntryKind, EntryType, MenuEntry};
use super::error::{MenuError, Result};
use super::idle::{IdleQueue, IdleTask};
use super::invoke::MenuCallback;
use super::menu::{Menu, MenuConfig, MenuState, MenuType};
use super::registry::MenuReferenceRegistry;
use super::{EntryId, MenuId};
use crate::config::EngineConfig;
use crate::platform::{HeadlessPlatform, MenuPlatform};

pub struct MenuSystem {
    pub(crate) config: EngineConfig,
    pub(crate) registry: MenuReferenceRegistry,
    pub(crate) menus: Arena<MenuId, Menu>,
    pub(crate) entries: Arena<EntryId, MenuEntry>,
    pub(crate) platform: Box<dyn MenuPlatform>,
    pub(crate) idle: IdleQueue,
    pub(crate) commands: HashMap<String, MenuCallback>,
    pub(crate) variables: BTreeMap<String, String>,
}

impl MenuSystem {
    pub fn new(config: EngineConfig, platform: Box<dyn MenuPlatform>) -> Self {
        Self {
            config,
            registry: MenuReferenceRegistry::new(),
            menus: Arena::new(),
            entries: Arena::new(),
            platform,
            idle: IdleQueue::new(),
            commands: HashMap::new(),
            variables: BTreeMap::new(),
        }
    }

    /// A system backed by a [`HeadlessPlatform`] honouring the configured
    /// handle and journal limits.
    pub fn headless(config: EngineConfig) -> Self {
        let platform = HeadlessPlatform::new()
            .with_handle_limit(config.max_native_handles)
            .with_journal_limit(config.journal_limit);
        Self::new(config, Box::new(platform))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &MenuReferenceRegistry {
        &self.registry
    }

    pub fn menu(&self, id: MenuId) -> Option<&Menu> {
        self.menus.get(id)
    }

    pub fn entry(&self, id: EntryId) -> Option<&MenuEntry> {
        self.entries.get(id)
    }

    pub fn is_live(&self, id: MenuId) -> bool {
        self.menus.contains(id)
    }

    pub fn menu_count(&self) -> usize {
        self.menus.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// The live menu registered under `name`.
    pub fn menu_by_name(&self, name: &str) -> Option<MenuId> {
        self.registry
            .find(name)
            .and_then(|record| record.menu)
            .filter(|id| self.menus.contains(*id))
    }

    /// Like [`MenuSystem::menu_by_name`] but reports a missing menu as an error.
    pub fn lookup(&self, name: &str) -> Result<MenuId> {
        self.menu_by_name(name)
            .ok_or_else(|| MenuError::UnknownMenu(name.to_string()))
    }

    pub fn entry_at(&self, menu: MenuId, index: usize) -> Option<&MenuEntry> {
        self.menus
            .get(menu)
            .and_then(|m| m.entries.get(index))
            .and_then(|id| self.entries.get(*id))
    }

    /// Entries of `menu` in index order.
    pub fn entries_of(&self, menu: MenuId) -> Vec<&MenuEntry> {
        self.menus
            .get(menu)
            .map(|m| {
                m.entries
                    .iter()
                    .filter_map(|id| self.entries.get(*id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn master_of(&self, menu: MenuId) -> Result<MenuId> {
        self.menus
            .get(menu)
            .map(|m| m.master)
            .ok_or(MenuError::StaleMenu)
    }

    /// The master followed by its clones in creation order.
    pub fn chain(&self, menu: MenuId) -> Vec<MenuId> {
        let Some(master) = self.menus.get(menu).and_then(|m| self.menus.get(m.master)) else {
            return Vec::new();
        };
        std::iter::once(master.id)
            .chain(master.instances.iter().copied())
            .collect()
    }

    /// Creates a master menu named `name`.
    ///
    /// Cascade entries and toplevels that referenced the name before it
    /// existed are bound to the new menu.
    pub fn create_menu(&mut self, name: &str, config: MenuConfig) -> Result<MenuId> {
        if name.is_empty() {
            return Err(MenuError::InvalidName(name.to_string()));
        }
        if self.menu_by_name(name).is_some() {
            return Err(MenuError::NameCollision(name.to_string()));
        }

        let id = self.create_instance(name, MenuType::Master, None)?;
        let mut config = config;
        config.tearoff.get_or_insert(self.config.tearoff_by_default);
        self.apply_menu_config(id, &config);
        tracing::info!("Created menu {}", name);

        self.bind_pending_references(id, name);
        Ok(id)
    }

    /// Allocates a menu instance, its native handle and its registry link.
    /// Clones are appended to their master's instance chain.
    pub(crate) fn create_instance(
        &mut self,
        name: &str,
        menu_type: MenuType,
        master: Option<MenuId>,
    ) -> Result<MenuId> {
        let native = self
            .platform
            .create_native_handle(name, menu_type)
            .map_err(|err| MenuError::from_platform(name, err))?;
        let id = self.menus.insert_with(|id| {
            let mut menu = Menu::new(id, name, menu_type, master);
            menu.native = Some(native);
            menu
        });
        self.registry.get_or_create(name).menu = Some(id);
        if let Some(master) = master.and_then(|m| self.menus.get_mut(m)) {
            master.instances.push(id);
        }
        Ok(id)
    }

    fn bind_pending_references(&mut self, id: MenuId, name: &str) {
        let Some(record) = self.registry.find(name) else {
            return;
        };
        let parents = record.parent_entries.clone();
        let windows = record.top_levels.clone();

        for entry_id in parents {
            if !self.is_live(id) {
                return;
            }
            let Some(owner) = self.entries.get(entry_id).map(|e| e.owner) else {
                continue;
            };
            let Some(owner_menu) = self.menus.get(owner) else {
                continue;
            };
            if owner_menu.is_master() {
                self.set_child_instance(entry_id, id);
                continue;
            }
            let owner_master = owner_menu.master;
            let owner_name = owner_menu.name.clone();
            match self.clone_cascade_child(id, &owner_name, &mut vec![owner_master]) {
                Ok(Some(child)) => self.set_child_instance(entry_id, child),
                Ok(None) => {}
                Err(err) => tracing::warn!(
                    "Could not clone {} for pending cascade in {}: {}",
                    name,
                    owner_name,
                    err
                ),
            }
        }

        for window in windows {
            if let Err(err) = self.set_window_menubar(&window, Some(name), Some(name)) {
                tracing::warn!("Could not bind pending menubar {} to {}: {}", name, window, err);
            }
        }
    }

    /// Applies menu-level options to every instance of the chain.
    pub fn configure_menu(&mut self, menu: MenuId, config: &MenuConfig) -> Result<()> {
        let master = self.master_of(menu)?;
        for instance in self.chain(master) {
            self.apply_menu_config(instance, config);
        }
        Ok(())
    }

    /// Applies menu-level options to a single instance and keeps the
    /// tear-off entry in step with the `tearoff` option.
    pub(crate) fn apply_menu_config(&mut self, id: MenuId, config: &MenuConfig) {
        let Some(menu) = self.menus.get_mut(id) else {
            return;
        };
        menu.options.apply(config);
        menu.state = MenuState::Configured;
        let wants_tearoff = menu.options.tearoff;
        let has_tearoff = menu
            .entries
            .first()
            .and_then(|e| self.entries.get(*e))
            .is_some_and(|e| e.entry_type() == EntryType::Tearoff);

        if wants_tearoff && !has_tearoff {
            self.new_entry(id, 0, EntryKind::Tearoff);
        } else if !wants_tearoff && has_tearoff {
            self.remove_entries(id, 0, 0);
        }
        self.schedule_recompute(id);
    }

    /// Destroys a menu. Destroying a master takes its whole clone chain with it.
    pub fn destroy_menu(&mut self, menu: MenuId) -> Result<()> {
        if !self.is_live(menu) {
            return Err(MenuError::StaleMenu);
        }
        self.destroy_menu_instance(menu);
        Ok(())
    }

    pub(crate) fn destroy_menu_instance(&mut self, id: MenuId) {
        let Some(menu) = self.menus.get(id) else {
            return;
        };
        let name = menu.name.clone();
        let master = menu.master;
        tracing::debug!("Destroying menu instance {} ({:?})", name, id);

        if menu.is_master() {
            for instance in menu.instances.clone() {
                self.destroy_menu_instance(instance);
            }
        }

        let entries = self
            .menus
            .get(id)
            .map(|m| m.entries.clone())
            .unwrap_or_default();
        for entry_id in entries.into_iter().rev() {
            self.destroy_entry(entry_id);
        }

        let master_name = self
            .menus
            .get(master)
            .filter(|_| master != id)
            .map(|m| m.name.clone());
        self.detach_referrers(id, &name, master_name.as_deref());

        if master != id {
            if let Some(master_menu) = self.menus.get_mut(master) {
                master_menu.instances.retain(|instance| *instance != id);
            }
        }

        let Some(menu) = self.menus.remove(id) else {
            return;
        };
        if let Some(window) = menu.parent_toplevel.as_ref() {
            if menu.menu_type == MenuType::Menubar {
                self.platform.bind_window_menubar(window, None);
            }
        }
        if let Some(handle) = menu.native {
            self.platform.destroy_native_handle(handle);
        }
        self.idle.cancel_menu(id);
        if let Some(record) = self.registry.find_mut(&name) {
            if record.menu == Some(id) {
                record.menu = None;
            }
        }
        self.registry.release_if_empty(&name);
        tracing::info!("Destroyed menu {}", name);
    }

    /// Clears the posted instance of every cascade entry that pointed at `id`.
    /// Those entries stay hooked under the target name.
    fn detach_referrers(&mut self, id: MenuId, name: &str, master_name: Option<&str>) {
        let referrers: Vec<EntryId> = [Some(name), master_name]
            .into_iter()
            .flatten()
            .filter_map(|n| self.registry.find(n))
            .flat_map(|record| record.parent_entries.iter().copied())
            .collect();
        for entry_id in referrers {
            let Some(entry) = self.entries.get_mut(entry_id) else {
                continue;
            };
            if entry.child_instance == Some(id) {
                entry.child_instance = None;
                let (owner, index) = (entry.owner, entry.index);
                self.schedule_redraw(owner, Some(index));
            }
        }
    }

    /// Frees one entry. A clone's cascade entry takes the child clone it owns
    /// down with it.
    pub(crate) fn destroy_entry(&mut self, entry_id: EntryId) {
        let Some(entry) = self.entries.get(entry_id) else {
            return;
        };
        let owner_is_clone = self.menus.get(entry.owner).is_some_and(|m| !m.is_master());
        if let Some(child) = entry.child_instance {
            if owner_is_clone && self.menus.get(child).is_some_and(|m| !m.is_master()) {
                self.recursively_delete_menu(child);
            }
        }
        self.unhook_cascade_entry(entry_id);
        self.entries.remove(entry_id);
    }

    /// Inserts a fresh, unconfigured entry into one instance.
    pub(crate) fn new_entry(
        &mut self,
        menu: MenuId,
        index: usize,
        kind: EntryKind,
    ) -> Option<EntryId> {
        let len = self.menus.get(menu)?.entries.len();
        let index = index.min(len);
        let id = self
            .entries
            .insert_with(|id| MenuEntry::new(id, menu, index, kind));
        let menu_ref = self.menus.get_mut(menu)?;
        menu_ref.entries.insert(index, id);
        if let Some(active) = menu_ref.active.filter(|active| *active >= index) {
            menu_ref.active = Some(active + 1);
        }
        self.renumber(menu, index + 1);
        self.schedule_recompute(menu);
        Some(id)
    }

    /// Removes the inclusive range `[first, last]` from one instance,
    /// compacting indices and adjusting that instance's active entry.
    pub(crate) fn remove_entries(&mut self, menu: MenuId, first: usize, last: usize) {
        let Some(menu_ref) = self.menus.get_mut(menu) else {
            return;
        };
        if first > last || last >= menu_ref.entries.len() {
            return;
        }
        let removed: Vec<EntryId> = menu_ref.entries.drain(first..=last).collect();
        let count = removed.len();
        menu_ref.active = match menu_ref.active {
            Some(active) if (first..=last).contains(&active) => None,
            Some(active) if active > last => Some(active - count),
            active => active,
        };
        for entry_id in removed.into_iter().rev() {
            self.destroy_entry(entry_id);
        }
        self.renumber(menu, first);
        self.schedule_recompute(menu);
    }

    fn renumber(&mut self, menu: MenuId, from: usize) {
        let Some(menu_ref) = self.menus.get(menu) else {
            return;
        };
        for (index, entry_id) in menu_ref.entries.iter().enumerate().skip(from) {
            if let Some(entry) = self.entries.get_mut(*entry_id) {
                entry.index = index;
            }
        }
    }

    /// Applies a validated configuration to a single entry, rewiring its
    /// registry hook when the cascade target changes. Returns whether it did.
    pub(crate) fn configure_entry(&mut self, entry_id: EntryId, config: &EntryConfig) -> bool {
        let Some(entry) = self.entries.get_mut(entry_id) else {
            return false;
        };
        let old_target = entry.cascade_target().map(str::to_string);
        let new_target = entry.apply(config);
        let (owner, index) = (entry.owner, entry.index);

        let changed = match new_target {
            Some(new_target) if new_target != old_target => {
                self.link_cascade(entry_id, new_target.as_deref());
                true
            }
            _ => false,
        };
        self.schedule_redraw(owner, Some(index));
        self.schedule_recompute(owner);
        changed
    }

    /// Hooks a cascade entry under `target`. Entries of a master menu post
    /// the target's live menu directly; entries of clones are given a
    /// parallel clone by the caller.
    fn link_cascade(&mut self, entry_id: EntryId, target: Option<&str>) {
        self.unhook_cascade_entry(entry_id);
        let Some(target) = target else {
            return;
        };
        self.registry.hook_entry(target, entry_id);
        let live = self.menu_by_name(target);
        let Some(entry) = self.entries.get_mut(entry_id) else {
            return;
        };
        entry.child_ref = Some(target.to_string());
        if self.menus.get(entry.owner).is_some_and(Menu::is_master) {
            entry.child_instance = live;
        }
        tracing::debug!("Hooked cascade {:?} under {}", entry_id, target);
    }

    pub(crate) fn set_child_instance(&mut self, entry_id: EntryId, child: MenuId) {
        if let Some(entry) = self.entries.get_mut(entry_id) {
            entry.child_instance = Some(child);
            let (owner, index) = (entry.owner, entry.index);
            self.schedule_redraw(owner, Some(index));
        }
    }

    pub fn schedule_recompute(&mut self, menu: MenuId) {
        if self.is_live(menu) {
            self.idle.schedule(IdleTask::Recompute(menu));
        }
    }

    pub fn schedule_redraw(&mut self, menu: MenuId, entry: Option<usize>) {
        if self.is_live(menu) {
            self.idle.schedule(IdleTask::Redraw(menu, entry));
        }
    }

    pub fn idle_queue(&self) -> &IdleQueue {
        &self.idle
    }

    /// Runs all deferred work whose menu is still live. Returns how many
    /// requests reached the platform.
    pub fn run_idle(&mut self) -> usize {
        let tasks = self.idle.drain();
        let mut ran = 0;
        for task in tasks {
            let Some(menu) = self.menus.get(task.menu()) else {
                continue;
            };
            let Some(handle) = menu.native else {
                continue;
            };
            match task {
                IdleTask::Recompute(_) => self.platform.recompute_geometry(&menu.name, handle),
                IdleTask::Redraw(_, entry) => self.platform.redraw(&menu.name, handle, entry),
            }
            ran += 1;
        }
        if ran > 0 {
            tracing::debug!("Idle flush ran {} deferred requests", ran);
        }
        ran
    }

    /// Lists every broken structural invariant; empty when consistent.
    pub fn consistency_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut listed_entries = HashSet::new();

        for (id, menu) in self.menus.iter() {
            if menu.id != id {
                problems.push(format!("{}: stored id {:?} != {:?}", menu.name, menu.id, id));
            }
            match self.registry.find(&menu.name) {
                Some(record) if record.menu == Some(id) => {}
                _ => problems.push(format!("{}: registry does not point at menu", menu.name)),
            }
            if menu.active.is_some_and(|active| active >= menu.entries.len()) {
                problems.push(format!("{}: active index out of range", menu.name));
            }

            for (index, entry_id) in menu.entries.iter().enumerate() {
                listed_entries.insert(*entry_id);
                match self.entries.get(*entry_id) {
                    Some(entry) if entry.owner == id && entry.index == index => {}
                    Some(_) => problems.push(format!("{}[{}]: wrong owner or index", menu.name, index)),
                    None => problems.push(format!("{}[{}]: dangling entry", menu.name, index)),
                }
            }

            if menu.is_master() {
                self.check_chain(id, menu, &mut problems);
            } else {
                match self.menus.get(menu.master) {
                    Some(master) if master.is_master() && master.instances.contains(&id) => {}
                    _ => problems.push(format!("{}: not linked into its master's chain", menu.name)),
                }
                if !menu.instances.is_empty() {
                    problems.push(format!("{}: clone carries instances", menu.name));
                }
            }

            if menu.menu_type == MenuType::Menubar {
                let master_name = self.menus.get(menu.master).map(|m| m.name.as_str());
                let bound = menu.parent_toplevel.as_ref().is_some_and(|window| {
                    master_name
                        .and_then(|n| self.registry.find(n))
                        .is_some_and(|record| record.top_levels.contains(window))
                });
                if !bound {
                    problems.push(format!("{}: menubar clone without a bound toplevel", menu.name));
                }
            }
        }

        for (entry_id, entry) in self.entries.iter() {
            if !listed_entries.contains(&entry_id) {
                problems.push(format!("{:?}: entry not listed by any menu", entry_id));
            }
            if entry.child_ref.as_deref() != entry.cascade_target() {
                problems.push(format!("{:?}: hook does not match cascade target", entry_id));
            }
            if let Some(name) = &entry.child_ref {
                let hooked = self
                    .registry
                    .find(name)
                    .is_some_and(|record| record.parent_entries.contains(&entry_id));
                if !hooked {
                    problems.push(format!("{:?}: missing from referrers of {}", entry_id, name));
                }
            }
            if entry.child_instance.is_some_and(|child| !self.is_live(child)) {
                problems.push(format!("{:?}: posts a destroyed menu", entry_id));
            }
        }

        for (name, record) in self.registry.iter() {
            if record.is_empty() {
                problems.push(format!("{}: empty registry record was not released", name));
            }
            if record.menu.is_some_and(|id| !self.is_live(id)) {
                problems.push(format!("{}: registry points at a destroyed menu", name));
            }
            let mut seen = HashSet::new();
            for entry_id in &record.parent_entries {
                if !seen.insert(*entry_id) {
                    problems.push(format!("{}: referrer {:?} listed twice", name, entry_id));
                }
                let matches = self
                    .entries
                    .get(*entry_id)
                    .is_some_and(|entry| entry.child_ref.as_deref() == Some(name));
                if !matches {
                    problems.push(format!("{}: referrer {:?} does not cascade here", name, entry_id));
                }
            }
        }
        problems
    }

    fn check_chain(&self, id: MenuId, master: &Menu, problems: &mut Vec<String>) {
        let master_entries: Vec<&MenuEntry> = self.entries_of(id);
        for instance_id in &master.instances {
            let Some(instance) = self.menus.get(*instance_id) else {
                problems.push(format!("{}: chain lists a destroyed instance", master.name));
                continue;
            };
            if instance.master != id {
                problems.push(format!("{}: instance {} names another master", master.name, instance.name));
            }
            let clone_entries = self.entries_of(*instance_id);
            if clone_entries.len() != master_entries.len() {
                problems.push(format!(
                    "{}: {} has {} entries, master has {}",
                    master.name,
                    instance.name,
                    clone_entries.len(),
                    master_entries.len()
                ));
                continue;
            }
            for (index, (original, copy)) in master_entries.iter().zip(&clone_entries).enumerate() {
                if !original.same_configuration(copy) {
                    problems.push(format!("{}[{}]: diverges from master", instance.name, index));
                }
                let parallel = match (original.child_instance, copy.child_instance) {
                    (Some(a), Some(b)) => {
                        a != b && self.menus.get(a).map(|m| m.master) == self.menus.get(b).map(|m| m.master)
                    }
                    (_, None) => true,
                    (None, Some(_)) => false,
                };
                if !parallel {
                    problems.push(format!("{}[{}]: cascade is not a parallel clone", instance.name, index));
                }
            }
        }
    }

    /// Checks every structural invariant, reporting all violations at once.
    pub fn verify_consistency(&self) -> std::result::Result<(), String> {
        let problems = self.consistency_violations();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("\n"))
        }
    }

    /// Renders the registry and every menu as deterministic text.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let name_of = |id: MenuId| {
            self.menus
                .get(id)
                .map(|m| m.name.clone())
                .unwrap_or_else(|| "?".to_string())
        };

        out.push_str("registry:\n");
        for (name, record) in self.registry.iter() {
            let menu = if record.menu.is_some() { "live" } else { "-" };
            let windows: Vec<&str> = record.top_levels.iter().map(|w| w.as_str()).collect();
            let _ = writeln!(
                out,
                "  {name} menu={menu} referrers={} toplevels=[{}]",
                record.parent_entries.len(),
                windows.join(" ")
            );
        }

        out.push_str("menus:\n");
        let mut menus: Vec<&Menu> = self.menus.iter().map(|(_, m)| m).collect();
        menus.sort_by(|a, b| a.name.cmp(&b.name));
        for menu in menus {
            let role = if menu.is_master() {
                "master".to_string()
            } else {
                format!("clone of {}", name_of(menu.master))
            };
            let _ = writeln!(out, "  {} ({}, {})", menu.name, menu.menu_type, role);
            for entry in self.entries_of(menu.id) {
                let _ = write!(out, "    {} {}", entry.index, entry.entry_type());
                if let Some(label) = entry.label() {
                    let _ = write!(out, " \"{label}\"");
                }
                if let Some(target) = entry.cascade_target() {
                    let posted = entry
                        .child_instance
                        .map(name_of)
                        .unwrap_or_else(|| "-".to_string());
                    let _ = write!(out, " -> {target} [{posted}]");
                }
                out.push('\n');
            }
        }
        out
    }
}
