//! Contains helper functions to reduce boilerplate code in other `app` modules.

use anyhow::Result;

use super::events::{Reply, UserEvent};
use super::proxy::EventProxy;
use super::state::AppState;
use crate::core::MenuError;

/// Runs a command against the `AppState` and sends its outcome as a
/// [`Reply`].
///
/// Engine errors keep their stable kind; anything else (a malformed payload,
/// an unknown command) is reported as `invalid_payload`.
pub fn with_state_and_notify<F, P: EventProxy>(state: &mut AppState, proxy: &P, update_fn: F)
where
    F: FnOnce(&mut AppState) -> Result<serde_json::Value>,
{
    let reply = match update_fn(state) {
        Ok(result) => Reply::Ok { result },
        Err(err) => match err.downcast_ref::<MenuError>() {
            Some(menu_err) => Reply::error(menu_err.kind(), menu_err.to_string()),
            None => Reply::error("invalid_payload", format!("{err:#}")),
        },
    };
    proxy.send_event(UserEvent::Reply(reply));
}
