// src/app/commands.rs
//! Contains all the command handlers that are callable by the driver via IPC.
//!
//! Each function in this module corresponds to a specific `IpcMessage::command`
//! and turns its JSON payload into calls on the `MenuSystem`.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::state::AppState;
use crate::core::{EntryConfig, EntryType, MenuConfig, MenuError, MenuId, MenuIndex, MenuType, WindowId};

#[derive(Deserialize)]
struct MenuRef {
    name: String,
}

#[derive(Deserialize)]
struct CreatePayload {
    name: String,
    #[serde(default)]
    config: MenuConfig,
}

#[derive(Deserialize)]
struct ConfigurePayload {
    name: String,
    config: MenuConfig,
}

#[derive(Deserialize)]
struct AddPayload {
    name: String,
    #[serde(rename = "type")]
    entry_type: String,
    #[serde(default)]
    config: EntryConfig,
}

#[derive(Deserialize)]
struct InsertPayload {
    name: String,
    index: String,
    #[serde(rename = "type")]
    entry_type: String,
    #[serde(default)]
    config: EntryConfig,
}

#[derive(Deserialize)]
struct IndexPayload {
    name: String,
    index: String,
}

#[derive(Deserialize)]
struct DeletePayload {
    name: String,
    first: String,
    last: Option<String>,
}

#[derive(Deserialize)]
struct EntryConfigurePayload {
    name: String,
    index: String,
    config: EntryConfig,
}

#[derive(Deserialize)]
struct ClonePayload {
    name: String,
    new_name: String,
    #[serde(rename = "type", default = "default_clone_type")]
    menu_type: MenuType,
}

fn default_clone_type() -> MenuType {
    MenuType::Tearoff
}

#[derive(Deserialize)]
struct MenubarPayload {
    window: String,
    menu: Option<String>,
}

#[derive(Deserialize)]
struct VariablePayload {
    name: String,
    value: Option<String>,
}

#[derive(Deserialize)]
struct BindPayload {
    command: String,
    fail: Option<String>,
}

fn parse<T: DeserializeOwned>(payload: Value) -> Result<T> {
    serde_json::from_value(payload).context("Malformed payload")
}

fn lookup(state: &AppState, name: &str) -> Result<MenuId> {
    Ok(state.system.lookup(name)?)
}

fn menu_name(state: &AppState, menu: Option<MenuId>) -> Value {
    menu.and_then(|id| state.system.menu(id))
        .map_or(Value::Null, |m| json!(m.name()))
}

/// Resolves an index that must name an existing entry.
fn existing_index(state: &AppState, menu: MenuId, index: &str) -> Result<usize> {
    Ok(state
        .system
        .index_of(menu, index, false)?
        .ok_or_else(|| MenuError::InvalidIndex(index.to_string()))?)
}

pub fn create_menu(state: &mut AppState, payload: Value) -> Result<Value> {
    let payload: CreatePayload = parse(payload)?;
    state.system.create_menu(&payload.name, payload.config)?;
    Ok(json!({ "name": payload.name }))
}

pub fn destroy_menu(state: &mut AppState, payload: Value) -> Result<Value> {
    let payload: MenuRef = parse(payload)?;
    let menu = lookup(state, &payload.name)?;
    state.system.destroy_menu(menu)?;
    Ok(Value::Null)
}

pub fn configure_menu(state: &mut AppState, payload: Value) -> Result<Value> {
    let payload: ConfigurePayload = parse(payload)?;
    let menu = lookup(state, &payload.name)?;
    state.system.configure_menu(menu, &payload.config)?;
    Ok(Value::Null)
}

pub fn add_entry(state: &mut AppState, payload: Value) -> Result<Value> {
    let payload: AddPayload = parse(payload)?;
    let menu = lookup(state, &payload.name)?;
    let entry_type: EntryType = payload.entry_type.parse()?;
    let index = state.system.add_entry(menu, entry_type, payload.config)?;
    Ok(json!({ "index": index }))
}

pub fn insert_entry(state: &mut AppState, payload: Value) -> Result<Value> {
    let payload: InsertPayload = parse(payload)?;
    let menu = lookup(state, &payload.name)?;
    let entry_type: EntryType = payload.entry_type.parse()?;
    let index: MenuIndex = payload.index.parse()?;
    let index = state
        .system
        .insert_entry_at(menu, &index, entry_type, payload.config)?;
    Ok(json!({ "index": index }))
}

pub fn delete_entries(state: &mut AppState, payload: Value) -> Result<Value> {
    let payload: DeletePayload = parse(payload)?;
    let menu = lookup(state, &payload.name)?;
    let first: MenuIndex = payload.first.parse()?;
    let last: Option<MenuIndex> = payload.last.as_deref().map(str::parse::<MenuIndex>).transpose()?;
    let removed = state.system.delete_entries(menu, &first, last.as_ref())?;
    Ok(json!({ "removed": removed }))
}

pub fn entry_configure(state: &mut AppState, payload: Value) -> Result<Value> {
    let payload: EntryConfigurePayload = parse(payload)?;
    let menu = lookup(state, &payload.name)?;
    let index: MenuIndex = payload.index.parse()?;
    state.system.configure_entry_at(menu, &index, &payload.config)?;
    Ok(Value::Null)
}

pub fn entry_cget(state: &mut AppState, payload: Value) -> Result<Value> {
    let payload: IndexPayload = parse(payload)?;
    let menu = lookup(state, &payload.name)?;
    let index = existing_index(state, menu, &payload.index)?;
    let entry = state
        .system
        .entry_at(menu, index)
        .ok_or_else(|| MenuError::InvalidIndex(payload.index.clone()))?;
    Ok(json!({
        "type": entry.entry_type().as_str(),
        "state": entry.state(),
        "config": entry.to_config(),
        "posts": menu_name(state, entry.child_instance()),
    }))
}

pub fn entry_index(state: &mut AppState, payload: Value) -> Result<Value> {
    let payload: IndexPayload = parse(payload)?;
    let menu = lookup(state, &payload.name)?;
    let index = state.system.index_of(menu, &payload.index, false)?;
    Ok(json!({ "index": index }))
}

pub fn entry_type(state: &mut AppState, payload: Value) -> Result<Value> {
    let payload: IndexPayload = parse(payload)?;
    let menu = lookup(state, &payload.name)?;
    let index = existing_index(state, menu, &payload.index)?;
    let entry_type = state
        .system
        .entry_at(menu, index)
        .map(|entry| entry.entry_type().as_str());
    Ok(json!({ "type": entry_type }))
}

pub fn clone_menu(state: &mut AppState, payload: Value) -> Result<Value> {
    let payload: ClonePayload = parse(payload)?;
    let menu = lookup(state, &payload.name)?;
    state
        .system
        .clone_menu(menu, &payload.new_name, payload.menu_type)?;
    Ok(json!({ "name": payload.new_name }))
}

pub fn activate(state: &mut AppState, payload: Value) -> Result<Value> {
    let payload: IndexPayload = parse(payload)?;
    let menu = lookup(state, &payload.name)?;
    let index = state.system.index_of(menu, &payload.index, false)?;
    state.system.activate(menu, index)?;
    Ok(Value::Null)
}

pub fn post(state: &mut AppState, payload: Value) -> Result<Value> {
    let payload: MenuRef = parse(payload)?;
    let menu = lookup(state, &payload.name)?;
    state.system.post(menu)?;
    Ok(Value::Null)
}

pub fn invoke(state: &mut AppState, payload: Value) -> Result<Value> {
    let payload: IndexPayload = parse(payload)?;
    let menu = lookup(state, &payload.name)?;
    let Some(index) = state.system.index_of(menu, &payload.index, false)? else {
        return Ok(json!({ "tearoff": null }));
    };
    let tearoff = state.system.invoke(menu, index)?;
    Ok(json!({ "tearoff": menu_name(state, tearoff) }))
}

/// Sets (or with a null `menu` clears) a toplevel's menubar, remembering the
/// previous name the way a toplevel's `-menu` option would. A menubar that
/// could not be built is not remembered.
pub fn set_menubar(state: &mut AppState, payload: Value) -> Result<Value> {
    let payload: MenubarPayload = parse(payload)?;
    let window = WindowId::from(payload.window.as_str());
    let old = state.window_menus.remove(&window);
    let clone = state
        .system
        .set_window_menubar(&window, old.as_deref(), payload.menu.as_deref())?;
    if let Some(menu) = payload.menu.filter(|name| !name.is_empty()) {
        state.window_menus.insert(window, menu);
    }
    Ok(json!({ "clone": menu_name(state, clone) }))
}

pub fn run_idle(state: &mut AppState, _payload: Value) -> Result<Value> {
    Ok(json!({ "ran": state.system.run_idle() }))
}

pub fn dump(state: &mut AppState, _payload: Value) -> Result<Value> {
    Ok(json!({ "text": state.system.describe() }))
}

pub fn verify(state: &mut AppState, _payload: Value) -> Result<Value> {
    Ok(json!({ "violations": state.system.consistency_violations() }))
}

pub fn set_variable(state: &mut AppState, payload: Value) -> Result<Value> {
    let payload: VariablePayload = parse(payload)?;
    if let Some(value) = &payload.value {
        state.system.set_variable(&payload.name, value);
    }
    Ok(json!({ "value": state.system.variable(&payload.name) }))
}

pub fn bind_callback(state: &mut AppState, payload: Value) -> Result<Value> {
    let payload: BindPayload = parse(payload)?;
    state.bind_callback(&payload.command, payload.fail);
    Ok(Value::Null)
}

pub fn callbacks(state: &mut AppState, _payload: Value) -> Result<Value> {
    Ok(json!({ "ran": state.callback_log.borrow().clone() }))
}
