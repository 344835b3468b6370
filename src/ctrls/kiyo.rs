//! Razer Kiyo Pro extension unit controls
//!
//! The camera's ISP is driven by fixed 8 byte command frames written to one selector of its
//! extension unit. Commands can't be read back, so the state of these controls is only known
//! after they were set in this session.

use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};

use crate::ctrls::{Ctrl, CtrlMenu, CtrlType, MenuValue, Params, Source, Value};
use crate::device::Channel;
use crate::error::{Error, Result};
use crate::sysfs::{Sysfs, GUID_LEN};
use crate::uvc::{query_xu_control, Request};

/// UVC extension unit 1: 23e49ed0-1178-4f31-ae52-d2fb8a8d3b48
pub const UVC_EU1_GUID: [u8; GUID_LEN] = [
    0xd0, 0x9e, 0xe4, 0x23, 0x78, 0x11, 0x31, 0x4f, 0xae, 0x52, 0xd2, 0xfb, 0x8a, 0x8d, 0x3b, 0x48,
];

pub const KIYO_PRO_USB_ID: &str = "1532:0e05";

pub const EU1_SET_ISP: u8 = 0x01;

pub type Frame = [u8; 8];

pub const AF_RESPONSIVE: Frame = [0xff, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
pub const AF_PASSIVE: Frame = [0xff, 0x06, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00];

pub const HDR_OFF: Frame = [0xff, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
pub const HDR_ON: Frame = [0xff, 0x02, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00];

pub const HDR_DARK: Frame = [0xff, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
pub const HDR_BRIGHT: Frame = [0xff, 0x07, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00];

pub const FOV_WIDE: Frame = [0xff, 0x01, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00];
pub const FOV_MEDIUM_PRE: Frame = [0xff, 0x01, 0x00, 0x03, 0x01, 0x00, 0x00, 0x00];
pub const FOV_MEDIUM: Frame = [0xff, 0x01, 0x01, 0x03, 0x01, 0x00, 0x00, 0x00];
pub const FOV_NARROW_PRE: Frame = [0xff, 0x01, 0x00, 0x03, 0x02, 0x00, 0x00, 0x00];
pub const FOV_NARROW: Frame = [0xff, 0x01, 0x01, 0x03, 0x02, 0x00, 0x00, 0x00];

/// Persists the current settings across power cycles
pub const SAVE: Frame = [0xc0, 0x03, 0xa8, 0x00, 0x00, 0x00, 0x00, 0x00];

fn command(text_id: &str, name: &str, frame: Frame) -> CtrlMenu {
    CtrlMenu::new(text_id, name, MenuValue::Command { frame, before: None })
}

fn command_after(text_id: &str, name: &str, frame: Frame, before: Frame) -> CtrlMenu {
    CtrlMenu::new(
        text_id,
        name,
        MenuValue::Command {
            frame,
            before: Some(before),
        },
    )
}

fn kiyo_pro_ctrls() -> Vec<Ctrl> {
    vec![
        Ctrl::new("kiyo_pro_af_mode", "AF Mode", CtrlType::Menu).with_menu(vec![
            command("passive", "Passive", AF_PASSIVE),
            command("responsive", "Responsive", AF_RESPONSIVE),
        ]),
        Ctrl::new("kiyo_pro_hdr", "HDR", CtrlType::Menu).with_menu(vec![
            command("off", "Off", HDR_OFF),
            command("on", "On", HDR_ON),
        ]),
        Ctrl::new("kiyo_pro_hdr_mode", "HDR Mode", CtrlType::Menu).with_menu(vec![
            command("bright", "Bright", HDR_BRIGHT),
            command("dark", "Dark", HDR_DARK),
        ]),
        Ctrl::new("kiyo_pro_fov", "FOV", CtrlType::Menu).with_menu(vec![
            command("wide", "Wide", FOV_WIDE),
            command_after("medium", "Medium", FOV_MEDIUM, FOV_MEDIUM_PRE),
            command_after("narrow", "Narrow", FOV_NARROW, FOV_NARROW_PRE),
        ]),
    ]
}

/// Razer Kiyo Pro ISP controls
pub struct KiyoProCtrls {
    chan: Arc<dyn Channel>,
    unit_id: u8,
    usb_ids: String,
    ctrls: Vec<Ctrl>,
}

impl KiyoProCtrls {
    pub fn new<P: AsRef<Path>>(chan: Arc<dyn Channel>, sysfs: &Sysfs, device: P) -> Self {
        let device = device.as_ref();
        let mut kiyo = KiyoProCtrls {
            chan,
            unit_id: sysfs.find_unit_id(device, &UVC_EU1_GUID),
            usb_ids: sysfs.find_usb_ids(device),
            ctrls: Vec::new(),
        };
        if kiyo.supported() {
            debug!("KiyoProCtrls: extension unit {}", kiyo.unit_id);
            kiyo.ctrls = kiyo_pro_ctrls();
        }
        kiyo
    }

    fn write(&self, frame: &Frame) -> Result<()> {
        let mut buf = *frame;
        query_xu_control(&*self.chan, self.unit_id, EU1_SET_ISP, Request::SetCur, &mut buf)
    }

    fn set_ctrl(&mut self, idx: usize, value: &str) -> Result<()> {
        let menu = self.ctrls[idx].menu_entry(value)?;
        let (frame, before) = match menu.value {
            MenuValue::Command { frame, before } => (frame, before),
            _ => {
                return Err(Error::UnsupportedType {
                    ctrl: self.ctrls[idx].text_id.clone(),
                    typ: self.ctrls[idx].typ.to_string(),
                })
            }
        };
        let text_id = menu.text_id.clone();

        if let Some(before) = before {
            self.write(&before)?;
        }
        self.write(&frame)?;

        // there is no readback, assume the camera took it
        self.ctrls[idx].value = Some(Value::Menu(text_id));
        Ok(())
    }
}

impl Source for KiyoProCtrls {
    fn supported(&self) -> bool {
        self.unit_id != 0 && self.usb_ids == KIYO_PRO_USB_ID
    }

    fn ctrls(&self) -> Vec<&Ctrl> {
        self.ctrls.iter().collect()
    }

    fn set_ctrls(&mut self, params: &Params) {
        if !self.supported() {
            return;
        }

        for (text_id, value) in params.iter() {
            let idx = match self.ctrls.iter().position(|c| c.text_id == text_id) {
                Some(idx) => idx,
                None => continue,
            };
            if let Err(e) = self.set_ctrl(idx, value) {
                warn!("KiyoProCtrls: {}", e);
            }
        }

        if let Err(e) = self.write(&SAVE) {
            warn!("KiyoProCtrls: can't save settings: {}", e);
        }
    }

    fn refresh(&mut self) {}
}
