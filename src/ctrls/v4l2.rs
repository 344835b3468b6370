use std::io;
use std::sync::Arc;

use log::{debug, warn};

use crate::control::{self, Description, MenuItem};
use crate::ctrls::{to_text_id, Ctrl, CtrlMenu, CtrlType, MenuValue, Params, Source, Value};
use crate::device::Channel;
use crate::error::{Error, Result};
use crate::v4l2::videodev::*;

// The driver's own UPDATE flag is not reliable (uvcvideo leaves it unset), so the controls that
// toggle other controls between active and inactive are listed explicitly.
const UPDATERS: [u32; 4] = [
    V4L2_CID_EXPOSURE_AUTO,
    V4L2_CID_FOCUS_AUTO,
    V4L2_CID_AUTO_WHITE_BALANCE,
    V4L2_CID_ISO_SENSITIVITY_AUTO,
];

// (auto control, the control it governs): the auto control is listed right before it
const REORDERS: [(u32, u32); 2] = [
    (V4L2_CID_FOCUS_AUTO, V4L2_CID_FOCUS_ABSOLUTE),
    (V4L2_CID_AUTO_WHITE_BALANCE, V4L2_CID_WHITE_BALANCE_TEMPERATURE),
];

#[derive(Debug)]
struct V4l2Ctrl {
    /// Driver control id
    id: u32,
    ctrl: Ctrl,
}

/// Controls of the driver's own control registry
pub struct V4l2Ctrls {
    chan: Arc<dyn Channel>,
    ctrls: Vec<V4l2Ctrl>,
}

impl V4l2Ctrls {
    /// Enumerates the integer, boolean and menu controls of the device
    pub fn new(chan: Arc<dyn Channel>) -> Self {
        let mut ctrls = query_ctrls(&*chan);
        for (what, before) in REORDERS.iter() {
            move_before(&mut ctrls, |c| c.id, *what, *before);
        }
        debug!("V4L2Ctrls: found {} controls", ctrls.len());

        V4l2Ctrls { chan, ctrls }
    }

    fn set_ctrl(chan: &dyn Channel, c: &mut V4l2Ctrl, value: &str) -> Result<()> {
        let ctrl = &c.ctrl;
        let (raw, new_value) = match ctrl.typ {
            CtrlType::Integer => {
                let v: i32 = value.trim().parse().map_err(|_| ctrl.invalid_value(value))?;
                (v, Value::Integer(i64::from(v)))
            }
            CtrlType::Boolean => {
                let v = parse_bool(value).ok_or_else(|| ctrl.invalid_value(value))?;
                (i32::from(v), Value::Integer(i64::from(v)))
            }
            CtrlType::Menu => {
                let menu = ctrl.menu_entry(value)?;
                let index = match menu.value {
                    MenuValue::Index(index) => index,
                    _ => {
                        return Err(Error::UnsupportedType {
                            ctrl: ctrl.text_id.clone(),
                            typ: ctrl.typ.to_string(),
                        })
                    }
                };
                let index = i32::try_from(index).map_err(|_| ctrl.invalid_value(value))?;
                (index, Value::Menu(menu.text_id.clone()))
            }
        };

        let applied = chan
            .set_control(c.id, raw)
            .map_err(|e| Error::device_io(format!("VIDIOC_S_CTRL ({})", ctrl.text_id), e))?;

        if applied != raw {
            let current = match ctrl.typ {
                CtrlType::Menu => ctrl.menu_value(&index_value(applied), i64::from(applied)),
                _ => Value::Integer(i64::from(applied)),
            };
            return Err(Error::ValueMismatch {
                ctrl: ctrl.text_id.clone(),
                requested: value.to_string(),
                current: current.to_string(),
            });
        }

        c.ctrl.value = Some(new_value);
        Ok(())
    }
}

impl Source for V4l2Ctrls {
    fn supported(&self) -> bool {
        true
    }

    fn ctrls(&self) -> Vec<&Ctrl> {
        self.ctrls.iter().map(|c| &c.ctrl).collect()
    }

    fn set_ctrls(&mut self, params: &Params) {
        for (text_id, value) in params.iter() {
            let c = match self.ctrls.iter_mut().find(|c| c.ctrl.text_id == text_id) {
                Some(c) => c,
                None => continue,
            };
            if let Err(e) = Self::set_ctrl(&*self.chan, c, value) {
                warn!("V4L2Ctrls: {}", e);
            }
        }
    }

    fn refresh(&mut self) {
        for c in self.ctrls.iter_mut() {
            match self.chan.query_control(c.id) {
                Ok(desc) => c.ctrl.inactive = desc.flags.contains(control::Flags::INACTIVE),
                Err(e) => warn!("V4L2Ctrls: can't update ctrl {}: {}", c.ctrl.name, e),
            }
        }
    }
}

fn query_ctrls(chan: &dyn Channel) -> Vec<V4l2Ctrl> {
    let next_flag = V4L2_CTRL_FLAG_NEXT_CTRL | V4L2_CTRL_FLAG_NEXT_COMPOUND;
    let mut ctrls: Vec<V4l2Ctrl> = Vec::new();
    let mut id = next_flag;

    loop {
        let desc = match chan.query_control(id) {
            Ok(desc) => desc,
            // EINVAL marks the end of the registry
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => break,
            Err(e) => {
                warn!("V4L2Ctrls: VIDIOC_QUERYCTRL failed after {:#x}: {}", id, e);
                break;
            }
        };
        id = desc.id | next_flag;

        let typ = match desc.typ {
            control::Type::Integer => CtrlType::Integer,
            control::Type::Boolean => CtrlType::Boolean,
            control::Type::Menu | control::Type::IntegerMenu => CtrlType::Menu,
            _ => continue,
        };

        let ctrl = describe(chan, &desc, typ);
        if ctrls.iter().any(|c| c.ctrl.text_id == ctrl.text_id) {
            warn!(
                "V4L2Ctrls: ignoring {:?}: {}",
                desc.name,
                Error::DuplicateControl(ctrl.text_id)
            );
            continue;
        }

        ctrls.push(V4l2Ctrl { id: desc.id, ctrl });
    }

    ctrls
}

fn describe(chan: &dyn Channel, desc: &Description, typ: CtrlType) -> Ctrl {
    let value = chan.control(desc.id).unwrap_or_else(|e| {
        warn!("V4L2Ctrls: can't get ctrl {} value: {}", desc.name, e);
        0
    });

    let mut ctrl = Ctrl::new(to_text_id(&desc.name), desc.name.clone(), typ);
    ctrl.value = Some(Value::Integer(i64::from(value)));
    ctrl.default = Some(Value::Integer(i64::from(desc.default)));
    ctrl.min = Some(i64::from(desc.minimum));
    ctrl.max = Some(i64::from(desc.maximum));
    ctrl.step = Some(i64::from(desc.step));
    ctrl.updater = UPDATERS.contains(&desc.id);
    ctrl.inactive = desc.flags.contains(control::Flags::INACTIVE);

    if typ == CtrlType::Menu {
        for index in desc.minimum.max(0)..=desc.maximum {
            // Drivers may reject indices inside [minimum, maximum] they don't support.
            // Those are skipped, the remaining entries keep their real index.
            let item = match chan.query_menu(desc, index as u32) {
                Ok(item) => item,
                Err(_) => continue,
            };
            let (text_id, name) = match item {
                MenuItem::Name(name) => (to_text_id(&name), name),
                MenuItem::Value(value) => (value.to_string(), value.to_string()),
            };
            ctrl.menu
                .push(CtrlMenu::new(text_id, name, MenuValue::Index(index as u32)));
        }

        ctrl.value = Some(ctrl.menu_value(&index_value(value), i64::from(value)));
        ctrl.default = Some(ctrl.menu_value(&index_value(desc.default), i64::from(desc.default)));
    }

    ctrl
}

fn index_value(raw: i32) -> MenuValue {
    // negative values never match a menu index
    MenuValue::Index(u32::try_from(raw).unwrap_or(u32::MAX))
}

/// Parses a boolean control value
///
/// Accepts the numbers printed for boolean controls as well as the usual words.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" => Some(true),
        "false" | "off" | "no" => Some(false),
        v => v.parse::<i64>().ok().map(|v| v != 0),
    }
}

/// Moves the item keyed `what` right before the item keyed `before`
///
/// Does nothing unless both are present. All other items keep their relative order.
fn move_before<T, F>(items: &mut Vec<T>, key: F, what: u32, before: u32)
where
    F: Fn(&T) -> u32,
{
    let from = match items.iter().position(|item| key(item) == what) {
        Some(from) => from,
        None => return,
    };
    if !items.iter().any(|item| key(item) == before) {
        return;
    }

    let item = items.remove(from);
    if let Some(to) = items.iter().position(|item| key(item) == before) {
        items.insert(to, item);
    }
}
