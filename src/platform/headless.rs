//! A platform layer without a display.
//!
//! Every boundary call is appended to a shared [`Journal`], which tests and
//! the scripting driver inspect after handing the platform to the engine.
//! With a journal limit only the most recent calls are kept.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use super::{MenuPlatform, NativeHandle, PlatformError};
use crate::core::{MenuType, WindowId};

/// One recorded boundary call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Create {
        name: String,
        menu_type: MenuType,
        handle: NativeHandle,
    },
    Destroy(NativeHandle),
    Recompute {
        name: String,
        handle: NativeHandle,
    },
    Redraw {
        name: String,
        handle: NativeHandle,
        entry: Option<usize>,
    },
    BindMenubar {
        window: WindowId,
        handle: Option<NativeHandle>,
    },
}

/// The observable state of a [`HeadlessPlatform`].
#[derive(Debug, Default)]
pub struct Journal {
    pub calls: Vec<PlatformCall>,
    /// Handles currently allocated, with the menu name they were made for.
    pub live_handles: BTreeMap<NativeHandle, String>,
    /// The native menubar each toplevel currently displays.
    pub menubars: BTreeMap<WindowId, NativeHandle>,
}

impl Journal {
    pub fn recompute_count(&self, name: &str) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, PlatformCall::Recompute { name: n, .. } if n == name))
            .count()
    }
}

/// Platform layer that hands out sequential handles and records every call.
#[derive(Debug)]
pub struct HeadlessPlatform {
    journal: Rc<RefCell<Journal>>,
    next_handle: u64,
    max_handles: Option<usize>,
    max_calls: Option<usize>,
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        Self {
            journal: Rc::new(RefCell::new(Journal::default())),
            next_handle: 1,
            max_handles: None,
            max_calls: None,
        }
    }

    /// Fails handle creation once `limit` handles are live at the same time.
    pub fn with_handle_limit(mut self, limit: Option<usize>) -> Self {
        self.max_handles = limit;
        self
    }

    /// Keeps at most `limit` recorded calls, dropping the oldest first.
    pub fn with_journal_limit(mut self, limit: Option<usize>) -> Self {
        self.max_calls = limit;
        self
    }

    fn record(&self, call: PlatformCall) {
        let mut journal = self.journal.borrow_mut();
        journal.calls.push(call);
        if let Some(limit) = self.max_calls {
            let excess = journal.calls.len().saturating_sub(limit);
            if excess > 0 {
                journal.calls.drain(..excess);
            }
        }
    }

    /// A shared view of the journal that stays valid after boxing the platform.
    pub fn journal(&self) -> Rc<RefCell<Journal>> {
        Rc::clone(&self.journal)
    }
}

impl MenuPlatform for HeadlessPlatform {
    fn create_native_handle(
        &mut self,
        name: &str,
        menu_type: MenuType,
    ) -> Result<NativeHandle, PlatformError> {
        let mut journal = self.journal.borrow_mut();
        if let Some(limit) = self.max_handles {
            if journal.live_handles.len() >= limit {
                return Err(PlatformError::HandleLimit { limit });
            }
        }
        let handle = NativeHandle(self.next_handle);
        self.next_handle += 1;
        journal.live_handles.insert(handle, name.to_string());
        drop(journal);
        self.record(PlatformCall::Create {
            name: name.to_string(),
            menu_type,
            handle,
        });
        tracing::debug!("Headless: created native handle {:?} for {}", handle, name);
        Ok(handle)
    }

    fn destroy_native_handle(&mut self, handle: NativeHandle) {
        if self.journal.borrow_mut().live_handles.remove(&handle).is_none() {
            tracing::warn!("Headless: destroying unknown native handle {:?}", handle);
        }
        self.record(PlatformCall::Destroy(handle));
    }

    fn recompute_geometry(&mut self, name: &str, handle: NativeHandle) {
        self.record(PlatformCall::Recompute {
            name: name.to_string(),
            handle,
        });
    }

    fn redraw(&mut self, name: &str, handle: NativeHandle, entry: Option<usize>) {
        self.record(PlatformCall::Redraw {
            name: name.to_string(),
            handle,
            entry,
        });
    }

    fn bind_window_menubar(&mut self, window: &WindowId, handle: Option<NativeHandle>) {
        {
            let mut journal = self.journal.borrow_mut();
            match handle {
                Some(handle) => {
                    journal.menubars.insert(window.clone(), handle);
                }
                None => {
                    journal.menubars.remove(window);
                }
            }
        }
        self.record(PlatformCall::BindMenubar {
            window: window.clone(),
            handle,
        });
    }
}
