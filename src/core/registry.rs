//! The name-keyed registry unifying a menu name's live menu, the toplevels
//! using it as a menubar, and the cascade entries pointing at it.

use std::collections::BTreeMap;

use super::{EntryId, MenuId, WindowId};

/// Everything known about one menu name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuReferences {
    pub(crate) menu: Option<MenuId>,
    pub(crate) top_levels: Vec<WindowId>,
    pub(crate) parent_entries: Vec<EntryId>,
}

impl MenuReferences {
    /// The live menu registered under this name, if it has been realized.
    pub fn menu(&self) -> Option<MenuId> {
        self.menu
    }

    /// Toplevels using this name as their menubar, in binding order.
    pub fn top_levels(&self) -> &[WindowId] {
        &self.top_levels
    }

    /// Cascade entries (in any menu or clone) targeting this name, in hook order.
    pub fn parent_entries(&self) -> &[EntryId] {
        &self.parent_entries
    }

    pub fn is_empty(&self) -> bool {
        self.menu.is_none() && self.top_levels.is_empty() && self.parent_entries.is_empty()
    }
}

/// Maps menu names to their [`MenuReferences`].
///
/// Records are reference-counted by hand: whoever empties one of the three
/// fields calls [`MenuReferenceRegistry::release_if_empty`].
#[derive(Debug, Default)]
pub struct MenuReferenceRegistry {
    records: BTreeMap<String, MenuReferences>,
}

impl MenuReferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, name: &str) -> &mut MenuReferences {
        if !self.records.contains_key(name) {
            tracing::debug!("Registry: new references record for {}", name);
        }
        self.records.entry(name.to_string()).or_default()
    }

    pub fn find(&self, name: &str) -> Option<&MenuReferences> {
        self.records.get(name)
    }

    pub(crate) fn find_mut(&mut self, name: &str) -> Option<&mut MenuReferences> {
        self.records.get_mut(name)
    }

    /// Drops the record when all three fields are empty. Returns whether it
    /// was removed.
    pub fn release_if_empty(&mut self, name: &str) -> bool {
        if self.records.get(name).is_some_and(MenuReferences::is_empty) {
            self.records.remove(name);
            tracing::debug!("Registry: released references record for {}", name);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MenuReferences)> {
        self.records.iter().map(|(name, record)| (name.as_str(), record))
    }

    pub(crate) fn hook_entry(&mut self, name: &str, entry: EntryId) {
        let record = self.get_or_create(name);
        if !record.parent_entries.contains(&entry) {
            record.parent_entries.push(entry);
        }
    }

    /// Removes `entry` from the referrers of `name`, releasing the record if
    /// that emptied it.
    pub(crate) fn unhook_entry(&mut self, name: &str, entry: EntryId) {
        match self.records.get_mut(name) {
            Some(record) => record.parent_entries.retain(|e| *e != entry),
            None => {
                tracing::warn!("Registry: unhooking {:?} from missing record {}", entry, name);
                return;
            }
        }
        self.release_if_empty(name);
    }

    pub(crate) fn add_top_level(&mut self, name: &str, window: &WindowId) {
        let record = self.get_or_create(name);
        if !record.top_levels.contains(window) {
            record.top_levels.push(window.clone());
        }
    }

    pub(crate) fn remove_top_level(&mut self, name: &str, window: &WindowId) {
        if let Some(record) = self.records.get_mut(name) {
            record.top_levels.retain(|w| w != window);
            self.release_if_empty(name);
        }
    }

    /// Drops `window` from every record; a toplevel has a single menubar.
    pub(crate) fn remove_window(&mut self, window: &WindowId) {
        let names: Vec<String> = self
            .records
            .iter()
            .filter(|(_, record)| record.top_levels.contains(window))
            .map(|(name, _)| name.clone())
            .collect();
        for name in names {
            self.remove_top_level(&name, window);
        }
    }
}
