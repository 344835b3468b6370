use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{io, mem};

use log::warn;

use crate::capability::Capabilities;
use crate::control::{Description, MenuItem};
use crate::uvc::Request;
use crate::v4l2;
use crate::v4l2::videodev::*;

/// Control channel of an opened device
///
/// Every request is a complete, blocking request/response round trip. Implementations are not
/// expected to multiplex: callers must not issue requests concurrently on the same channel.
pub trait Channel {
    /// Returns the description of control `id`
    ///
    /// `id` may carry [`V4L2_CTRL_FLAG_NEXT_CTRL`] and friends to walk the control registry, in
    /// which case the description of the next control after `id` is returned.
    fn query_control(&self, id: u32) -> io::Result<Description>;

    /// Returns menu item `index` of a menu or integer menu control
    fn query_menu(&self, desc: &Description, index: u32) -> io::Result<MenuItem>;

    /// Returns the current value of control `id`
    fn control(&self, id: u32) -> io::Result<i32>;

    /// Sets control `id` and returns the value the driver actually applied
    fn set_control(&self, id: u32, value: i32) -> io::Result<i32>;

    /// Issues a UVC extension unit request
    ///
    /// `data` doubles as input and output buffer, its length is sent as the request size.
    fn xu_query(&self, unit: u8, selector: u8, query: Request, data: &mut [u8]) -> io::Result<()>;
}

/// Linux video device
#[derive(Clone, Debug)]
pub struct Device {
    /// Raw handle
    handle: Arc<Handle>,
    /// Device node path as given by the user
    path: PathBuf,
}

impl Device {
    /// Returns a device by index
    ///
    /// # Arguments
    ///
    /// * `index` - Index (0: first, 1: second, ..)
    ///
    /// # Example
    ///
    /// ```no_run
    /// use cameractrls::Device;
    /// let dev = Device::new(0);
    /// ```
    pub fn new(index: usize) -> io::Result<Self> {
        Self::with_path(format!("/dev/video{}", index))
    }

    /// Returns a device by path
    ///
    /// The device is opened in read/write mode since setting controls requires it.
    ///
    /// # Arguments
    ///
    /// * `path` - Path (e.g. "/dev/video0" or a /dev/v4l/by-id/ link)
    ///
    /// # Example
    ///
    /// ```no_run
    /// use cameractrls::Device;
    /// let dev = Device::with_path("/dev/video0");
    /// ```
    pub fn with_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let fd = v4l2::open(&path, libc::O_RDWR)?;

        Ok(Device {
            handle: Arc::new(Handle::new(fd)),
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the path the device was opened with
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns video4linux framework defined information such as card, driver, etc.
    pub fn query_caps(&self) -> io::Result<Capabilities> {
        unsafe {
            let mut v4l2_caps: v4l2_capability = mem::zeroed();
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_QUERYCAP,
                &mut v4l2_caps as *mut _ as *mut std::os::raw::c_void,
            )?;

            Ok(Capabilities::from(v4l2_caps))
        }
    }
}

impl Channel for Device {
    fn query_control(&self, id: u32) -> io::Result<Description> {
        unsafe {
            let mut v4l2_ctrl: v4l2_queryctrl = mem::zeroed();
            v4l2_ctrl.id = id;
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_QUERYCTRL,
                &mut v4l2_ctrl as *mut _ as *mut std::os::raw::c_void,
            )?;

            Ok(Description::from(v4l2_ctrl))
        }
    }

    fn query_menu(&self, desc: &Description, index: u32) -> io::Result<MenuItem> {
        unsafe {
            let mut v4l2_menu: v4l2_querymenu = mem::zeroed();
            v4l2_menu.id = desc.id;
            v4l2_menu.index = index;
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_QUERYMENU,
                &mut v4l2_menu as *mut _ as *mut std::os::raw::c_void,
            )?;

            MenuItem::try_from((desc.typ, v4l2_menu)).map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("{} is not a menu control", desc.typ),
                )
            })
        }
    }

    fn control(&self, id: u32) -> io::Result<i32> {
        let mut v4l2_ctrl = v4l2_control { id, value: 0 };
        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_G_CTRL,
                &mut v4l2_ctrl as *mut _ as *mut std::os::raw::c_void,
            )?;
        }

        Ok(v4l2_ctrl.value)
    }

    fn set_control(&self, id: u32, value: i32) -> io::Result<i32> {
        let mut v4l2_ctrl = v4l2_control { id, value };
        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_S_CTRL,
                &mut v4l2_ctrl as *mut _ as *mut std::os::raw::c_void,
            )?;
        }

        // the driver writes back what it actually applied, e.g. after clamping
        Ok(v4l2_ctrl.value)
    }

    fn xu_query(&self, unit: u8, selector: u8, query: Request, data: &mut [u8]) -> io::Result<()> {
        let size = u16::try_from(data.len())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let mut xu_query = uvc_xu_control_query {
            unit,
            selector,
            query: query.into(),
            size,
            data: data.as_mut_ptr(),
        };
        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::UVCIOC_CTRL_QUERY,
                &mut xu_query as *mut _ as *mut std::os::raw::c_void,
            )
        }
    }
}

/// Device handle for low-level access.
///
/// The file descriptor is closed when the last reference goes away.
#[derive(Debug, PartialEq, Eq, Hash)]
pub(crate) struct Handle {
    fd: std::os::raw::c_int,
}

impl Handle {
    fn new(fd: std::os::raw::c_int) -> Self {
        Self { fd }
    }

    /// Returns the raw file descriptor
    pub fn fd(&self) -> std::os::raw::c_int {
        self.fd
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Err(e) = v4l2::close(self.fd) {
            warn!("close({}) failed: {}", self.fd, e);
        }
    }
}
