//! Logitech peripheral extension unit controls
//!
//! Each control is a single byte inside a multi-byte register frame. Reads return the whole
//! frame, so a write is a read-modify-write of that frame followed by a verifying read.

use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};

use crate::ctrls::{Ctrl, CtrlMenu, CtrlType, MenuValue, Params, Source, Value};
use crate::device::Channel;
use crate::error::{Error, Result};
use crate::sysfs::{Sysfs, GUID_LEN};
use crate::uvc::{query_xu_control, query_xu_control_or_warn, Request};

/// Logitech peripheral: ffe52d21-8030-4e2c-82d9-f587d00540bd
pub const LOGITECH_PERIPHERAL_GUID: [u8; GUID_LEN] = [
    0x21, 0x2d, 0xe5, 0xff, 0x30, 0x80, 0x2c, 0x4e, 0x82, 0xd9, 0xf5, 0x87, 0xd0, 0x05, 0x40, 0xbd,
];

pub const LOGITECH_PERIPHERAL_LED1_SEL: u8 = 0x09;
pub const LOGITECH_PERIPHERAL_LED1_LEN: usize = 5;

pub const LOGITECH_PERIPHERAL_LED1_MODE_OFFSET: usize = 1;
pub const LOGITECH_PERIPHERAL_LED1_MODE_OFF: u8 = 0x00;
pub const LOGITECH_PERIPHERAL_LED1_MODE_ON: u8 = 0x01;
pub const LOGITECH_PERIPHERAL_LED1_MODE_BLINK: u8 = 0x02;
pub const LOGITECH_PERIPHERAL_LED1_MODE_AUTO: u8 = 0x03;

pub const LOGITECH_PERIPHERAL_LED1_FREQUENCY_OFFSET: usize = 3;

/// Location of a control inside an extension unit register
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Register {
    selector: u8,
    len: usize,
    offset: usize,
}

const LED1_MODE: Register = Register {
    selector: LOGITECH_PERIPHERAL_LED1_SEL,
    len: LOGITECH_PERIPHERAL_LED1_LEN,
    offset: LOGITECH_PERIPHERAL_LED1_MODE_OFFSET,
};

const LED1_FREQUENCY: Register = Register {
    selector: LOGITECH_PERIPHERAL_LED1_SEL,
    len: LOGITECH_PERIPHERAL_LED1_LEN,
    offset: LOGITECH_PERIPHERAL_LED1_FREQUENCY_OFFSET,
};

#[derive(Debug)]
struct LogitechCtrl {
    reg: Register,
    ctrl: Ctrl,
}

fn logitech_ctrls() -> Vec<LogitechCtrl> {
    vec![
        LogitechCtrl {
            reg: LED1_MODE,
            ctrl: Ctrl::new("logitech_led1_mode", "LED1 Mode", CtrlType::Menu).with_menu(vec![
                CtrlMenu::new(
                    "off",
                    "Off",
                    MenuValue::Byte(LOGITECH_PERIPHERAL_LED1_MODE_OFF),
                ),
                CtrlMenu::new("on", "On", MenuValue::Byte(LOGITECH_PERIPHERAL_LED1_MODE_ON)),
                CtrlMenu::new(
                    "blink",
                    "Blink",
                    MenuValue::Byte(LOGITECH_PERIPHERAL_LED1_MODE_BLINK),
                ),
                CtrlMenu::new(
                    "auto",
                    "Auto",
                    MenuValue::Byte(LOGITECH_PERIPHERAL_LED1_MODE_AUTO),
                ),
            ]),
        },
        LogitechCtrl {
            reg: LED1_FREQUENCY,
            ctrl: Ctrl::new("logitech_led1_frequency", "LED1 Frequency", CtrlType::Integer),
        },
    ]
}

/// Converts a register byte into the value presented for `ctrl`
fn to_value(ctrl: &Ctrl, byte: u8) -> Value {
    match ctrl.typ {
        CtrlType::Menu => ctrl.menu_value(&MenuValue::Byte(byte), i64::from(byte)),
        _ => Value::Integer(i64::from(byte)),
    }
}

/// Logitech LED controls
pub struct LogitechCtrls {
    chan: Arc<dyn Channel>,
    unit_id: u8,
    ctrls: Vec<LogitechCtrl>,
}

impl LogitechCtrls {
    pub fn new<P: AsRef<Path>>(chan: Arc<dyn Channel>, sysfs: &Sysfs, device: P) -> Self {
        let mut logitech = LogitechCtrls {
            chan,
            unit_id: sysfs.find_unit_id(device, &LOGITECH_PERIPHERAL_GUID),
            ctrls: Vec::new(),
        };
        if logitech.supported() {
            debug!("LogitechCtrls: extension unit {}", logitech.unit_id);
            logitech.ctrls = logitech_ctrls();
            logitech.query_ctrls();
        }
        logitech
    }

    /// Reads a whole register frame, zeroed if the device doesn't answer
    fn read_or_zero(&self, reg: &Register, query: Request) -> Vec<u8> {
        let mut frame = vec![0u8; reg.len];
        query_xu_control_or_warn(&*self.chan, self.unit_id, reg.selector, query, &mut frame);
        frame
    }

    fn query_ctrls(&mut self) {
        let mut values = Vec::with_capacity(self.ctrls.len());
        for c in self.ctrls.iter() {
            let byte = |query| self.read_or_zero(&c.reg, query)[c.reg.offset];
            let default = byte(Request::GetDef);
            let min = byte(Request::GetMin);
            let max = byte(Request::GetMax);
            let current = byte(Request::GetCur);
            values.push((default, min, max, current));
        }

        for (c, (default, min, max, current)) in self.ctrls.iter_mut().zip(values) {
            c.ctrl.default = Some(to_value(&c.ctrl, default));
            c.ctrl.min = Some(i64::from(min));
            c.ctrl.max = Some(i64::from(max));
            c.ctrl.value = Some(to_value(&c.ctrl, current));
        }
    }

    fn set_ctrl(&mut self, idx: usize, value: &str) -> Result<()> {
        let c = &self.ctrls[idx];
        let desired = match c.ctrl.typ {
            CtrlType::Menu => match c.ctrl.menu_entry(value)?.value {
                MenuValue::Byte(byte) => byte,
                _ => return Err(c.ctrl.invalid_value(value)),
            },
            CtrlType::Integer => value
                .trim()
                .parse::<u8>()
                .map_err(|_| c.ctrl.invalid_value(value))?,
            CtrlType::Boolean => {
                return Err(Error::UnsupportedType {
                    ctrl: c.ctrl.text_id.clone(),
                    typ: c.ctrl.typ.to_string(),
                })
            }
        };

        let reg = c.reg;
        let chan = &*self.chan;
        let mut frame = vec![0u8; reg.len];
        query_xu_control(chan, self.unit_id, reg.selector, Request::GetCur, &mut frame)?;
        frame[reg.offset] = desired;
        query_xu_control(chan, self.unit_id, reg.selector, Request::SetCur, &mut frame)?;

        let mut readback = vec![0u8; reg.len];
        query_xu_control(chan, self.unit_id, reg.selector, Request::GetCur, &mut readback)?;
        let current = readback[reg.offset];

        if current != desired {
            return Err(Error::ValueMismatch {
                ctrl: c.ctrl.text_id.clone(),
                requested: to_value(&c.ctrl, desired).to_string(),
                current: to_value(&c.ctrl, current).to_string(),
            });
        }

        let value = to_value(&c.ctrl, current);
        self.ctrls[idx].ctrl.value = Some(value);
        Ok(())
    }
}

impl Source for LogitechCtrls {
    fn supported(&self) -> bool {
        self.unit_id != 0
    }

    fn ctrls(&self) -> Vec<&Ctrl> {
        self.ctrls.iter().map(|c| &c.ctrl).collect()
    }

    fn set_ctrls(&mut self, params: &Params) {
        if !self.supported() {
            return;
        }

        for (text_id, value) in params.iter() {
            let idx = match self.ctrls.iter().position(|c| c.ctrl.text_id == text_id) {
                Some(idx) => idx,
                None => continue,
            };
            if let Err(e) = self.set_ctrl(idx, value) {
                warn!("LogitechCtrls: {}", e);
            }
        }
    }

    fn refresh(&mut self) {}
}
