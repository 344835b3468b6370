#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use cameractrls::control::{Description, Flags, MenuItem, Type};
use cameractrls::sysfs::{Sysfs, GUID_LEN};
use cameractrls::uvc::Request;
use cameractrls::v4l2::videodev::*;
use cameractrls::Channel;

pub const V4L2_CID_BRIGHTNESS: u32 = V4L2_CID_BASE;
pub const V4L2_CID_CONTRAST: u32 = V4L2_CID_BASE + 1;
pub const V4L2_CID_GAIN: u32 = V4L2_CID_BASE + 19;
pub const V4L2_CID_POWER_LINE_FREQUENCY: u32 = V4L2_CID_BASE + 24;
pub const V4L2_CID_EXPOSURE_ABSOLUTE: u32 = V4L2_CID_CAMERA_CLASS_BASE + 2;
pub const V4L2_CID_PAN_RESET: u32 = V4L2_CID_CAMERA_CLASS_BASE + 7;
pub const V4L2_CID_ZOOM_ABSOLUTE: u32 = V4L2_CID_CAMERA_CLASS_BASE + 13;

/// A driver control of the fake registry
#[derive(Debug, Clone)]
pub struct FakeCtrl {
    pub id: u32,
    pub typ: Type,
    pub name: String,
    pub minimum: i32,
    pub maximum: i32,
    pub step: i32,
    pub default: i32,
    pub value: i32,
    pub menu: Vec<(u32, MenuItem)>,
    /// Inactive unless control `.0` holds value `.1`
    pub active_when: Option<(u32, i32)>,
    /// The driver clamps written values to this
    pub clamp: Option<i32>,
    /// Reading the current value fails with EIO
    pub failing_get: bool,
}

impl FakeCtrl {
    pub fn integer(id: u32, name: &str, min: i32, max: i32, default: i32) -> Self {
        FakeCtrl {
            id,
            typ: Type::Integer,
            name: name.to_string(),
            minimum: min,
            maximum: max,
            step: 1,
            default,
            value: default,
            menu: Vec::new(),
            active_when: None,
            clamp: None,
            failing_get: false,
        }
    }

    pub fn boolean(id: u32, name: &str, default: i32) -> Self {
        FakeCtrl {
            typ: Type::Boolean,
            ..Self::integer(id, name, 0, 1, default)
        }
    }

    pub fn menu(id: u32, name: &str, entries: &[(u32, &str)], default: i32) -> Self {
        let max = entries.iter().map(|(i, _)| *i as i32).max().unwrap_or(0);
        FakeCtrl {
            typ: Type::Menu,
            menu: entries
                .iter()
                .map(|(i, n)| (*i, MenuItem::Name(n.to_string())))
                .collect(),
            ..Self::integer(id, name, 0, max, default)
        }
    }

    pub fn integer_menu(id: u32, name: &str, entries: &[(u32, i64)], default: i32) -> Self {
        let max = entries.iter().map(|(i, _)| *i as i32).max().unwrap_or(0);
        FakeCtrl {
            typ: Type::IntegerMenu,
            menu: entries
                .iter()
                .map(|(i, v)| (*i, MenuItem::Value(*v)))
                .collect(),
            ..Self::integer(id, name, 0, max, default)
        }
    }

    pub fn button(id: u32, name: &str) -> Self {
        FakeCtrl {
            typ: Type::Button,
            ..Self::integer(id, name, 0, 0, 0)
        }
    }

    pub fn step(mut self, step: i32) -> Self {
        self.step = step;
        self
    }

    pub fn value(mut self, value: i32) -> Self {
        self.value = value;
        self
    }

    pub fn active_when(mut self, governor: u32, value: i32) -> Self {
        self.active_when = Some((governor, value));
        self
    }

    pub fn clamp(mut self, value: i32) -> Self {
        self.clamp = Some(value);
        self
    }

    pub fn failing_get(mut self) -> Self {
        self.failing_get = true;
        self
    }
}

/// An extension unit register of the fake device
#[derive(Debug, Clone)]
pub struct XuRegister {
    pub cur: Vec<u8>,
    pub def: Vec<u8>,
    pub min: Vec<u8>,
    pub max: Vec<u8>,
    /// Writes are accepted but have no effect
    pub stuck: bool,
    /// Writes of these frames fail with EIO
    pub rejected: Vec<Vec<u8>>,
}

impl XuRegister {
    pub fn new(cur: &[u8], def: &[u8], min: &[u8], max: &[u8]) -> Self {
        XuRegister {
            cur: cur.to_vec(),
            def: def.to_vec(),
            min: min.to_vec(),
            max: max.to_vec(),
            stuck: false,
            rejected: Vec::new(),
        }
    }

    pub fn rejecting(mut self, frame: &[u8]) -> Self {
        self.rejected.push(frame.to_vec());
        self
    }

    /// A register that only takes command frames
    pub fn write_only(len: usize) -> Self {
        let zero = vec![0u8; len];
        Self::new(&zero, &zero, &zero, &zero)
    }
}

/// One extension unit request as seen by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XuCall {
    pub unit: u8,
    pub selector: u8,
    pub query: Request,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
struct State {
    ctrls: Vec<FakeCtrl>,
    registers: HashMap<(u8, u8), XuRegister>,
    /// Walking the registry past this control fails with EIO
    walk_error_after: Option<u32>,
    xu_calls: Vec<XuCall>,
    set_calls: Vec<(u32, i32)>,
}

/// An in-memory device: a driver control registry plus extension unit registers
#[derive(Debug, Default)]
pub struct FakeChannel {
    state: Mutex<State>,
}

impl FakeChannel {
    pub fn new(mut ctrls: Vec<FakeCtrl>) -> Self {
        ctrls.sort_by_key(|c| c.id);
        FakeChannel {
            state: Mutex::new(State {
                ctrls,
                ..State::default()
            }),
        }
    }

    pub fn with_register(self, unit: u8, selector: u8, reg: XuRegister) -> Self {
        self.state
            .lock()
            .unwrap()
            .registers
            .insert((unit, selector), reg);
        self
    }

    pub fn with_walk_error_after(self, id: u32) -> Self {
        self.state.lock().unwrap().walk_error_after = Some(id);
        self
    }

    pub fn register(&self, unit: u8, selector: u8) -> XuRegister {
        self.state.lock().unwrap().registers[&(unit, selector)].clone()
    }

    pub fn value(&self, id: u32) -> i32 {
        let state = self.state.lock().unwrap();
        state.ctrls.iter().find(|c| c.id == id).unwrap().value
    }

    /// Extension unit requests, without the GET_LEN requests
    pub fn xu_calls(&self) -> Vec<XuCall> {
        self.state
            .lock()
            .unwrap()
            .xu_calls
            .iter()
            .filter(|c| c.query != Request::GetLen)
            .cloned()
            .collect()
    }

    pub fn xu_writes(&self) -> Vec<Vec<u8>> {
        self.xu_calls()
            .into_iter()
            .filter(|c| c.query == Request::SetCur)
            .map(|c| c.data)
            .collect()
    }

    pub fn set_calls(&self) -> Vec<(u32, i32)> {
        self.state.lock().unwrap().set_calls.clone()
    }

    pub fn clear_calls(&self) {
        let mut state = self.state.lock().unwrap();
        state.xu_calls.clear();
        state.set_calls.clear();
    }
}

fn describe(state: &State, c: &FakeCtrl) -> Description {
    let mut flags = Flags::empty();
    if let Some((governor, value)) = c.active_when {
        let active = state
            .ctrls
            .iter()
            .any(|g| g.id == governor && g.value == value);
        if !active {
            flags |= Flags::INACTIVE;
        }
    }

    Description {
        id: c.id,
        typ: c.typ,
        name: c.name.clone(),
        minimum: c.minimum,
        maximum: c.maximum,
        step: c.step,
        default: c.default,
        flags,
    }
}

fn einval() -> io::Error {
    io::Error::from_raw_os_error(libc::EINVAL)
}

fn eio() -> io::Error {
    io::Error::from_raw_os_error(libc::EIO)
}

impl Channel for FakeChannel {
    fn query_control(&self, id: u32) -> io::Result<Description> {
        let state = self.state.lock().unwrap();
        let next = V4L2_CTRL_FLAG_NEXT_CTRL | V4L2_CTRL_FLAG_NEXT_COMPOUND;
        let c = if id & next != 0 {
            let after = id & !next;
            if state.walk_error_after == Some(after) {
                return Err(eio());
            }
            state.ctrls.iter().find(|c| c.id > after)
        } else {
            state.ctrls.iter().find(|c| c.id == id)
        };
        c.map(|c| describe(&state, c)).ok_or_else(einval)
    }

    fn query_menu(&self, desc: &Description, index: u32) -> io::Result<MenuItem> {
        let state = self.state.lock().unwrap();
        state
            .ctrls
            .iter()
            .find(|c| c.id == desc.id)
            .and_then(|c| c.menu.iter().find(|(i, _)| *i == index))
            .map(|(_, item)| item.clone())
            .ok_or_else(einval)
    }

    fn control(&self, id: u32) -> io::Result<i32> {
        let state = self.state.lock().unwrap();
        state
            .ctrls
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(einval)
            .and_then(|c| if c.failing_get { Err(eio()) } else { Ok(c.value) })
    }

    fn set_control(&self, id: u32, value: i32) -> io::Result<i32> {
        let mut state = self.state.lock().unwrap();
        state.set_calls.push((id, value));
        let c = state
            .ctrls
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(einval)?;
        c.value = c.clamp.unwrap_or(value);
        Ok(c.value)
    }

    fn xu_query(&self, unit: u8, selector: u8, query: Request, data: &mut [u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.xu_calls.push(XuCall {
            unit,
            selector,
            query,
            data: data.to_vec(),
        });

        let reg = state
            .registers
            .get_mut(&(unit, selector))
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOENT))?;
        let src = match query {
            Request::GetLen => {
                let len = reg.cur.len() as u16;
                data.copy_from_slice(&len.to_le_bytes());
                return Ok(());
            }
            Request::SetCur => {
                if reg.rejected.iter().any(|f| f.as_slice() == &*data) {
                    return Err(eio());
                }
                if !reg.stuck {
                    reg.cur = data.to_vec();
                }
                return Ok(());
            }
            Request::GetCur => &reg.cur,
            Request::GetDef => &reg.def,
            Request::GetMin => &reg.min,
            Request::GetMax => &reg.max,
            Request::GetRes | Request::GetInfo => return Err(einval()),
        };
        data.copy_from_slice(src);
        Ok(())
    }
}

/// A sysfs tree for one camera below a temporary directory
///
/// Layout: `class/video0` links to `devices/1-1/1-1:1.0/video4linux/video0`, so the USB
/// device directory `devices/1-1` is three levels up from the class entry.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub sysfs: Sysfs,
    /// Device node, a plain file named video0
    pub device: PathBuf,
}

impl Fixture {
    pub fn new(descriptors: Option<&[u8]>, usb_ids: Option<(&str, &str)>) -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let usb = dir.path().join("devices").join("1-1");
        let node = usb.join("1-1:1.0").join("video4linux").join("video0");
        fs::create_dir_all(&node).unwrap();

        if let Some(descriptors) = descriptors {
            fs::write(usb.join("descriptors"), descriptors).unwrap();
        }
        if let Some((vendor, product)) = usb_ids {
            fs::write(usb.join("idVendor"), format!("{}\n", vendor)).unwrap();
            fs::write(usb.join("idProduct"), format!("{}\n", product)).unwrap();
        }

        let class = dir.path().join("class");
        fs::create_dir_all(&class).unwrap();
        std::os::unix::fs::symlink(&node, class.join("video0")).unwrap();

        let dev = dir.path().join("dev");
        fs::create_dir_all(&dev).unwrap();
        let device = dev.join("video0");
        fs::write(&device, b"").unwrap();

        Fixture {
            sysfs: Sysfs::new(&class),
            device,
            dir,
        }
    }

    /// A camera without any extension unit the sources know about
    pub fn plain() -> Self {
        Self::new(Some(&descriptors(&[])), Some(("046d", "0825")))
    }
}

/// A configuration descriptor blob with one extension unit per `(unit id, guid)`
pub fn descriptors(units: &[(u8, [u8; GUID_LEN])]) -> Vec<u8> {
    // configuration, interface association and interface descriptors
    let mut blob = vec![
        0x09, 0x02, 0x00, 0x00, 0x02, 0x01, 0x00, 0x80, 0xfa, 0x08, 0x0b, 0x00, 0x02, 0x0e, 0x03,
        0x00, 0x02, 0x09, 0x04, 0x00, 0x00, 0x01, 0x0e, 0x01, 0x00, 0x02,
    ];
    for (unit, guid) in units {
        // bLength, bDescriptorType (CS_INTERFACE), bDescriptorSubtype (VC_EXTENSION_UNIT)
        blob.extend_from_slice(&[0x1b, 0x24, 0x06, *unit]);
        blob.extend_from_slice(guid);
        blob.extend_from_slice(&[0x02, 0x01, 0x02, 0x02, 0xff, 0xff, 0x00]);
    }
    blob
}

/// A small webcam driver registry
pub fn webcam_ctrls() -> Vec<FakeCtrl> {
    vec![
        FakeCtrl::integer(V4L2_CID_BRIGHTNESS, "Brightness", 0, 255, 128),
        FakeCtrl::integer(V4L2_CID_CONTRAST, "Contrast", 0, 255, 32).value(40),
        FakeCtrl::integer(V4L2_CID_GAIN, "Gain", 0, 255, 0),
        FakeCtrl::menu(
            V4L2_CID_POWER_LINE_FREQUENCY,
            "Power Line Frequency",
            &[(0, "Disabled"), (1, "50 Hz"), (2, "60 Hz")],
            2,
        )
        .value(1),
        FakeCtrl::boolean(V4L2_CID_AUTO_WHITE_BALANCE, "White Balance Temperature, Auto", 1),
        FakeCtrl::integer(
            V4L2_CID_WHITE_BALANCE_TEMPERATURE,
            "White Balance Temperature",
            2000,
            6500,
            4000,
        )
        .step(10)
        .active_when(V4L2_CID_AUTO_WHITE_BALANCE, 0),
        FakeCtrl::menu(
            V4L2_CID_EXPOSURE_AUTO,
            "Exposure, Auto",
            &[(1, "Manual Mode"), (3, "Aperture Priority Mode")],
            3,
        ),
        FakeCtrl::integer(V4L2_CID_EXPOSURE_ABSOLUTE, "Exposure (Absolute)", 3, 2047, 250)
            .active_when(V4L2_CID_EXPOSURE_AUTO, 1),
        FakeCtrl::button(V4L2_CID_PAN_RESET, "Pan, Reset"),
        FakeCtrl::integer(V4L2_CID_FOCUS_ABSOLUTE, "Focus (absolute)", 0, 250, 0)
            .step(5)
            .active_when(V4L2_CID_FOCUS_AUTO, 0),
        FakeCtrl::boolean(V4L2_CID_FOCUS_AUTO, "Focus, Auto", 1),
        FakeCtrl::integer(V4L2_CID_ZOOM_ABSOLUTE, "Zoom, Absolute", 100, 500, 100),
    ]
}
