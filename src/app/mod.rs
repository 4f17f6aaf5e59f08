//! The scripting driver: line-delimited JSON commands in, replies out.

pub mod commands;
pub mod events;
pub mod helpers;
pub mod proxy;
pub mod state;

use anyhow::anyhow;

use events::{IpcMessage, Reply, UserEvent};
use helpers::with_state_and_notify;
use proxy::EventProxy;
use state::AppState;

/// Handles one raw IPC message and sends exactly one reply through `proxy`.
pub fn handle_ipc_message<P: EventProxy>(message: &str, proxy: &P, state: &mut AppState) {
    let message = match serde_json::from_str::<IpcMessage>(message) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!("Failed to parse IPC message: {}", e);
            proxy.send_event(UserEvent::Reply(Reply::error("invalid_message", e.to_string())));
            return;
        }
    };

    tracing::debug!("IPC command: {}", message.command);
    with_state_and_notify(state, proxy, |s| {
        let IpcMessage { command, payload } = message;
        match command.as_str() {
            "create" => commands::create_menu(s, payload),
            "destroy" => commands::destroy_menu(s, payload),
            "configure" => commands::configure_menu(s, payload),
            "add" => commands::add_entry(s, payload),
            "insert" => commands::insert_entry(s, payload),
            "delete" => commands::delete_entries(s, payload),
            "entryconfigure" => commands::entry_configure(s, payload),
            "entrycget" => commands::entry_cget(s, payload),
            "index" => commands::entry_index(s, payload),
            "type" => commands::entry_type(s, payload),
            "clone" => commands::clone_menu(s, payload),
            "activate" => commands::activate(s, payload),
            "post" => commands::post(s, payload),
            "invoke" => commands::invoke(s, payload),
            "menubar" => commands::set_menubar(s, payload),
            "idle" => commands::run_idle(s, payload),
            "dump" => commands::dump(s, payload),
            "verify" => commands::verify(s, payload),
            "setvar" => commands::set_variable(s, payload),
            "bind" => commands::bind_callback(s, payload),
            "callbacks" => commands::callbacks(s, payload),
            other => {
                tracing::warn!("Unknown IPC command: {}", other);
                Err(anyhow!("Unknown command: {other}"))
            }
        }
    });
}
