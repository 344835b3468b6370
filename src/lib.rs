//! This crate lists and sets the controls of video4linux cameras.
//!
//! Besides the controls the driver exposes, some cameras carry vendor specific UVC extension
//! units. Those are located through the USB descriptors in sysfs and presented as ordinary
//! controls next to the driver's own.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cameractrls::{parse_controls, CameraCtrls, Device};
//!
//! let dev = Device::new(0).expect("failed to open device");
//! let mut camera = CameraCtrls::new(dev.path().to_path_buf(), Arc::new(dev));
//!
//! camera.set_ctrls(&parse_controls("brightness=128,kiyo_pro_fov=wide"));
//! camera.print_ctrls().expect("failed to print controls");
//! ```

pub mod v4l2;

pub mod capability;
pub use capability::Capabilities;

pub mod control;

mod device;
pub use device::{Channel, Device};

mod error;
pub use error::{Error, Result};

pub mod ctrls;
pub use ctrls::{Ctrl, CtrlMenu, CtrlType, MenuValue, Params, Source, Value};

pub mod sysfs;
pub use sysfs::Sysfs;

pub mod uvc;

mod camera;
pub use camera::{parse_controls, CameraCtrls};
