//! Defines the central, mutable state of the scripting driver.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::config::EngineConfig;
use crate::core::{MenuSystem, WindowId};
use crate::platform::{HeadlessPlatform, Journal};

/// Holds the complete, mutable state of the driver.
///
/// The engine is single-threaded, so the state is owned by the input loop
/// and lent to each command handler in turn.
pub struct AppState {
    /// The menu engine itself, on a headless platform.
    pub system: MenuSystem,
    /// The headless platform's record of boundary calls.
    pub journal: Rc<RefCell<Journal>>,
    /// The menu name each toplevel was last given as its menubar.
    pub window_menus: BTreeMap<WindowId, String>,
    /// Callback names in the order they ran.
    pub callback_log: Rc<RefCell<Vec<String>>>,
}

impl AppState {
    pub fn new(config: EngineConfig) -> Self {
        let platform = HeadlessPlatform::new()
            .with_handle_limit(config.max_native_handles)
            .with_journal_limit(config.journal_limit);
        let journal = platform.journal();
        Self {
            system: MenuSystem::new(config, Box::new(platform)),
            journal,
            window_menus: BTreeMap::new(),
            callback_log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Registers a callback that records its own name and fails with
    /// `failure` when one is given.
    pub fn bind_callback(&mut self, command: &str, failure: Option<String>) {
        let log = Rc::clone(&self.callback_log);
        let name = command.to_string();
        self.system.register_command(command, move |_, _| {
            log.borrow_mut().push(name.clone());
            match &failure {
                Some(message) => Err(message.clone()),
                None => Ok(()),
            }
        });
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
