//! Camera controls as presented to the user
//!
//! A [`Ctrl`] is addressed by a stable text id and carries its value as text for menus and as
//! a number otherwise. Each [`Source`] owns a disjoint set of controls and knows how to read
//! and write them on the device.

use std::fmt;

use crate::error::Error;

pub mod kiyo;
pub mod logitech;
pub mod v4l2;

pub use kiyo::KiyoProCtrls;
pub use logitech::LogitechCtrls;
pub use v4l2::V4l2Ctrls;

/// Kind of a control
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CtrlType {
    Integer,
    Boolean,
    Menu,
}

impl fmt::Display for CtrlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CtrlType::Integer => write!(f, "integer"),
            CtrlType::Boolean => write!(f, "boolean"),
            CtrlType::Menu => write!(f, "menu"),
        }
    }
}

/// Current or default value of a control
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Numeric value of an integer or boolean control, or an unresolved menu value
    Integer(i64),
    /// Text id of a menu entry
    Menu(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Menu(id) => write!(f, "{}", id),
        }
    }
}

/// What a menu entry means to the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuValue {
    /// Driver menu index
    Index(u32),
    /// Fixed command frame, optionally preceded by a preparatory frame
    Command {
        frame: [u8; 8],
        before: Option<[u8; 8]>,
    },
    /// Register byte
    Byte(u8),
}

/// Menu entry of a [`Ctrl`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtrlMenu {
    pub text_id: String,
    pub name: String,
    pub value: MenuValue,
}

impl CtrlMenu {
    pub fn new(text_id: impl Into<String>, name: impl Into<String>, value: MenuValue) -> Self {
        CtrlMenu {
            text_id: text_id.into(),
            name: name.into(),
            value,
        }
    }
}

/// A camera control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ctrl {
    /// Stable identifier used on the command line
    pub text_id: String,
    /// Name intended for the user
    pub name: String,
    pub typ: CtrlType,
    /// `None` if the device can't report it
    pub value: Option<Value>,
    pub default: Option<Value>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub step: Option<i64>,
    /// Entries of a menu control, in display order
    pub menu: Vec<CtrlMenu>,
    /// Changing this control may change whether other controls are active
    pub updater: bool,
    /// The control currently has no effect
    pub inactive: bool,
}

impl Ctrl {
    pub fn new(text_id: impl Into<String>, name: impl Into<String>, typ: CtrlType) -> Self {
        Ctrl {
            text_id: text_id.into(),
            name: name.into(),
            typ,
            value: None,
            default: None,
            min: None,
            max: None,
            step: None,
            menu: Vec::new(),
            updater: false,
            inactive: false,
        }
    }

    pub fn with_menu(mut self, menu: Vec<CtrlMenu>) -> Self {
        self.menu = menu;
        self
    }

    /// Returns the menu entry with text id `text_id`
    pub fn find_menu(&self, text_id: &str) -> Option<&CtrlMenu> {
        self.menu.iter().find(|m| m.text_id == text_id)
    }

    /// Returns the menu entry that carries `value`
    pub fn find_menu_by_value(&self, value: &MenuValue) -> Option<&CtrlMenu> {
        self.menu.iter().find(|m| &m.value == value)
    }

    /// Like [`Ctrl::find_menu`], but reports an unknown entry as an error
    pub fn menu_entry(&self, text_id: &str) -> Result<&CtrlMenu, Error> {
        self.find_menu(text_id).ok_or_else(|| Error::UnknownMenuValue {
            ctrl: self.text_id.clone(),
            value: text_id.to_string(),
            valid: self.menu.iter().map(|m| m.text_id.clone()).collect(),
        })
    }

    /// Maps a menu value to the text id of its entry, leaving unknown values numeric
    pub fn menu_value(&self, value: &MenuValue, raw: i64) -> Value {
        match self.find_menu_by_value(value) {
            Some(menu) => Value::Menu(menu.text_id.clone()),
            None => Value::Integer(raw),
        }
    }

    pub(crate) fn invalid_value(&self, value: &str) -> Error {
        Error::InvalidValue {
            ctrl: self.text_id.clone(),
            value: value.to_string(),
        }
    }
}

fn fmt_opt<T: fmt::Display>(f: &mut fmt::Formatter<'_>, v: &Option<T>) -> fmt::Result {
    match v {
        Some(v) => write!(f, "{}", v),
        None => write!(f, "unknown"),
    }
}

/// One line per control: `id = value\t( details )` plus `| updater` and `| inactive` markers
impl fmt::Display for Ctrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = ", self.text_id)?;
        fmt_opt(f, &self.value)?;
        match self.typ {
            CtrlType::Menu => {
                write!(f, "\t( ")?;
                if let Some(default) = &self.default {
                    write!(f, "default: {} ", default)?;
                }
                let values: Vec<&str> = self.menu.iter().map(|m| m.text_id.as_str()).collect();
                write!(f, "values: {} )", values.join(", "))?;
            }
            CtrlType::Integer | CtrlType::Boolean => {
                write!(f, "\t( default: ")?;
                fmt_opt(f, &self.default)?;
                write!(f, " min: ")?;
                fmt_opt(f, &self.min)?;
                write!(f, " max: ")?;
                fmt_opt(f, &self.max)?;
                if let Some(step) = self.step.filter(|&s| s != 1) {
                    write!(f, " step: {}", step)?;
                }
                write!(f, " )")?;
            }
        }
        if self.updater {
            write!(f, " | updater")?;
        }
        if self.inactive {
            write!(f, " | inactive")?;
        }
        Ok(())
    }
}

/// Folds a control or menu name into a text id
///
/// ASCII letters and digits are lower-cased, `,&().` and `/` are dropped and everything else
/// becomes a single `_`: `"White Balance Temperature, Auto"` -> `white_balance_temperature_auto`.
pub fn to_text_id(name: &str) -> String {
    let mut id = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            ',' | '&' | '(' | ')' | '.' | '/' => {}
            c if c.is_ascii_alphanumeric() => id.push(c.to_ascii_lowercase()),
            _ => {
                if !id.ends_with('_') {
                    id.push('_');
                }
            }
        }
    }
    id
}

/// Control assignments, kept in the order they were given
///
/// Inserting an existing id replaces its value in place.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Params(Vec::new())
    }

    pub fn insert(&mut self, text_id: impl Into<String>, value: impl Into<String>) {
        let text_id = text_id.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == text_id) {
            Some(entry) => entry.1 = value,
            None => self.0.push((text_id, value)),
        }
    }

    pub fn get(&self, text_id: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == text_id)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// A provider of camera controls
///
/// Sources discover their controls when they are created, against the device channel they
/// are handed. A source that is not [`supported`](Source::supported) on the device contributes
/// no controls and ignores every request.
pub trait Source {
    /// Whether this source applies to the device at all
    fn supported(&self) -> bool;

    /// Returns the controls of this source in presentation order
    fn ctrls(&self) -> Vec<&Ctrl>;

    /// Applies every assignment whose id belongs to this source, ignoring the rest
    fn set_ctrls(&mut self, params: &Params);

    /// Re-reads volatile state, e.g. whether a control is inactive
    fn refresh(&mut self);
}
