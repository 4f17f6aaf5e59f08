//! Menu entries: the tagged entry variant and its partial configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{MenuError, Result};
use super::{EntryId, MenuId};

/// The type of a menu entry, without its type-specific data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Command,
    Check,
    Radio,
    Cascade,
    Separator,
    Tearoff,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Command => "command",
            EntryType::Check => "checkbutton",
            EntryType::Radio => "radiobutton",
            EntryType::Cascade => "cascade",
            EntryType::Separator => "separator",
            EntryType::Tearoff => "tearoff",
        }
    }

    /// Whether the entry carries a label, command and accelerator.
    fn is_labelled(&self) -> bool {
        !matches!(self, EntryType::Separator | EntryType::Tearoff)
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = MenuError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "command" => Ok(EntryType::Command),
            "checkbutton" | "check" => Ok(EntryType::Check),
            "radiobutton" | "radio" => Ok(EntryType::Radio),
            "cascade" => Ok(EntryType::Cascade),
            "separator" => Ok(EntryType::Separator),
            "tearoff" => Ok(EntryType::Tearoff),
            other => Err(MenuError::InvalidEntryType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    #[default]
    Normal,
    Active,
    Disabled,
}

/// Variable binding of a check entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleBinding {
    pub variable: Option<String>,
    pub on_value: String,
    pub off_value: String,
    pub indicator_on: bool,
}

impl Default for ToggleBinding {
    fn default() -> Self {
        Self {
            variable: None,
            on_value: "1".to_string(),
            off_value: "0".to_string(),
            indicator_on: true,
        }
    }
}

/// Variable binding of a radio entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioBinding {
    pub variable: Option<String>,
    pub value: Option<String>,
    pub indicator_on: bool,
}

impl Default for RadioBinding {
    fn default() -> Self {
        Self {
            variable: None,
            value: None,
            indicator_on: true,
        }
    }
}

/// Type-specific entry data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Command,
    Check(ToggleBinding),
    Radio(RadioBinding),
    /// `menu` is the configured target name. Every instance of a chain keeps
    /// the same name here; the instance it actually posts is resolved
    /// separately.
    Cascade { menu: Option<String> },
    Separator,
    Tearoff,
}

impl EntryKind {
    pub fn new(entry_type: EntryType) -> Self {
        match entry_type {
            EntryType::Command => EntryKind::Command,
            EntryType::Check => EntryKind::Check(ToggleBinding::default()),
            EntryType::Radio => EntryKind::Radio(RadioBinding::default()),
            EntryType::Cascade => EntryKind::Cascade { menu: None },
            EntryType::Separator => EntryKind::Separator,
            EntryType::Tearoff => EntryKind::Tearoff,
        }
    }

    pub fn entry_type(&self) -> EntryType {
        match self {
            EntryKind::Command => EntryType::Command,
            EntryKind::Check(_) => EntryType::Check,
            EntryKind::Radio(_) => EntryType::Radio,
            EntryKind::Cascade { .. } => EntryType::Cascade,
            EntryKind::Separator => EntryType::Separator,
            EntryKind::Tearoff => EntryType::Tearoff,
        }
    }
}

/// Options shared by every labelled entry type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntryOptions {
    pub label: Option<String>,
    pub accelerator: Option<String>,
    pub underline: Option<usize>,
    pub command: Option<String>,
    pub state: EntryState,
    pub column_break: bool,
    pub hide_margin: bool,
}

/// A partial entry configuration; `None` leaves an option untouched and an
/// empty string clears a string option.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EntryConfig {
    pub label: Option<String>,
    pub accelerator: Option<String>,
    pub underline: Option<usize>,
    pub command: Option<String>,
    pub state: Option<EntryState>,
    pub column_break: Option<bool>,
    pub hide_margin: Option<bool>,
    pub variable: Option<String>,
    pub on_value: Option<String>,
    pub off_value: Option<String>,
    pub value: Option<String>,
    pub indicator_on: Option<bool>,
    pub menu: Option<String>,
}

impl EntryConfig {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn cascade(label: impl Into<String>, menu: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            menu: Some(menu.into()),
            ..Default::default()
        }
    }

    /// Rejects options the entry type does not carry.
    pub fn validate_for(&self, entry_type: EntryType) -> Result<()> {
        let reject = |option: &'static str| MenuError::InvalidOption {
            option,
            entry_type: entry_type.as_str(),
        };

        if !entry_type.is_labelled() {
            if self.label.is_some() {
                return Err(reject("label"));
            }
            if self.accelerator.is_some() {
                return Err(reject("accelerator"));
            }
            if self.command.is_some() {
                return Err(reject("command"));
            }
            if self.underline.is_some() {
                return Err(reject("underline"));
            }
        }
        if entry_type != EntryType::Cascade && self.menu.is_some() {
            return Err(reject("menu"));
        }
        if !matches!(entry_type, EntryType::Check | EntryType::Radio) {
            if self.variable.is_some() {
                return Err(reject("variable"));
            }
            if self.indicator_on.is_some() {
                return Err(reject("indicatoron"));
            }
        }
        if entry_type != EntryType::Check {
            if self.on_value.is_some() {
                return Err(reject("onvalue"));
            }
            if self.off_value.is_some() {
                return Err(reject("offvalue"));
            }
        }
        if entry_type != EntryType::Radio && self.value.is_some() {
            return Err(reject("value"));
        }
        Ok(())
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// One line item of a menu instance.
#[derive(Debug, Clone)]
pub struct MenuEntry {
    pub(crate) id: EntryId,
    pub(crate) owner: MenuId,
    pub(crate) index: usize,
    pub(crate) kind: EntryKind,
    pub(crate) options: EntryOptions,
    /// Registry key this entry is hooked under as a cascade referrer.
    pub(crate) child_ref: Option<String>,
    /// The menu instance this cascade posts: the master target for entries of
    /// a master menu, a parallel clone for entries of a clone.
    pub(crate) child_instance: Option<MenuId>,
}

impl MenuEntry {
    pub(crate) fn new(id: EntryId, owner: MenuId, index: usize, kind: EntryKind) -> Self {
        Self {
            id,
            owner,
            index,
            kind,
            options: EntryOptions::default(),
            child_ref: None,
            child_instance: None,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn owner(&self) -> MenuId {
        self.owner
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    pub fn entry_type(&self) -> EntryType {
        self.kind.entry_type()
    }

    pub fn options(&self) -> &EntryOptions {
        &self.options
    }

    pub fn label(&self) -> Option<&str> {
        self.options.label.as_deref()
    }

    pub fn state(&self) -> EntryState {
        self.options.state
    }

    /// The configured cascade target name, if this is a linked cascade.
    pub fn cascade_target(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Cascade { menu } => menu.as_deref(),
            _ => None,
        }
    }

    pub fn child_ref(&self) -> Option<&str> {
        self.child_ref.as_deref()
    }

    pub fn child_instance(&self) -> Option<MenuId> {
        self.child_instance
    }

    /// The variable this entry reads its indicator from, with legacy defaults.
    pub fn variable(&self) -> Option<String> {
        match &self.kind {
            EntryKind::Check(binding) => binding
                .variable
                .clone()
                .or_else(|| self.options.label.clone()),
            EntryKind::Radio(binding) => Some(
                binding
                    .variable
                    .clone()
                    .unwrap_or_else(|| "selectedButton".to_string()),
            ),
            _ => None,
        }
    }

    /// The value a radio entry writes when invoked.
    pub fn radio_value(&self) -> Option<String> {
        match &self.kind {
            EntryKind::Radio(binding) => binding
                .value
                .clone()
                .or_else(|| self.options.label.clone()),
            _ => None,
        }
    }

    /// Applies the non-cascade part of a validated configuration.
    ///
    /// Returns the new cascade target when `config.menu` was given, so the
    /// caller can rewire registry links; `Some(None)` means the target was
    /// cleared.
    pub(crate) fn apply(&mut self, config: &EntryConfig) -> Option<Option<String>> {
        let options = &mut self.options;
        if let Some(label) = &config.label {
            options.label = non_empty(label);
        }
        if let Some(accelerator) = &config.accelerator {
            options.accelerator = non_empty(accelerator);
        }
        if let Some(underline) = config.underline {
            options.underline = Some(underline);
        }
        if let Some(command) = &config.command {
            options.command = non_empty(command);
        }
        if let Some(state) = config.state {
            options.state = state;
        }
        if let Some(column_break) = config.column_break {
            options.column_break = column_break;
        }
        if let Some(hide_margin) = config.hide_margin {
            options.hide_margin = hide_margin;
        }

        match &mut self.kind {
            EntryKind::Check(binding) => {
                if let Some(variable) = &config.variable {
                    binding.variable = non_empty(variable);
                }
                if let Some(on_value) = &config.on_value {
                    binding.on_value = on_value.clone();
                }
                if let Some(off_value) = &config.off_value {
                    binding.off_value = off_value.clone();
                }
                if let Some(indicator_on) = config.indicator_on {
                    binding.indicator_on = indicator_on;
                }
                None
            }
            EntryKind::Radio(binding) => {
                if let Some(variable) = &config.variable {
                    binding.variable = non_empty(variable);
                }
                if let Some(value) = &config.value {
                    binding.value = Some(value.clone());
                }
                if let Some(indicator_on) = config.indicator_on {
                    binding.indicator_on = indicator_on;
                }
                None
            }
            EntryKind::Cascade { menu } => config.menu.as_ref().map(|target| {
                *menu = non_empty(target);
                menu.clone()
            }),
            EntryKind::Command | EntryKind::Separator | EntryKind::Tearoff => None,
        }
    }

    /// Rebuilds the configuration that reproduces this entry on a fresh entry
    /// of the same type.
    pub(crate) fn to_config(&self) -> EntryConfig {
        let options = &self.options;
        let mut config = EntryConfig {
            state: Some(match options.state {
                EntryState::Active => EntryState::Normal,
                state => state,
            }),
            column_break: Some(options.column_break),
            hide_margin: Some(options.hide_margin),
            ..Default::default()
        };
        if self.entry_type().is_labelled() {
            config.label = options.label.clone();
            config.accelerator = options.accelerator.clone();
            config.underline = options.underline;
            config.command = options.command.clone();
        }
        match &self.kind {
            EntryKind::Check(binding) => {
                config.variable = binding.variable.clone();
                config.on_value = Some(binding.on_value.clone());
                config.off_value = Some(binding.off_value.clone());
                config.indicator_on = Some(binding.indicator_on);
            }
            EntryKind::Radio(binding) => {
                config.variable = binding.variable.clone();
                config.value = binding.value.clone();
                config.indicator_on = Some(binding.indicator_on);
            }
            EntryKind::Cascade { menu } => config.menu = menu.clone(),
            EntryKind::Command | EntryKind::Separator | EntryKind::Tearoff => {}
        }
        config
    }

    /// Compares the configured options of two entries, ignoring per-instance
    /// activation state.
    pub fn same_configuration(&self, other: &MenuEntry) -> bool {
        let normalize = |state: EntryState| match state {
            EntryState::Active => EntryState::Normal,
            state => state,
        };
        self.kind == other.kind
            && EntryOptions {
                state: normalize(self.options.state),
                ..self.options.clone()
            } == EntryOptions {
                state: normalize(other.options.state),
                ..other.options.clone()
            }
    }
}
