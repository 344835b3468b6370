//! Device identity lookups in sysfs
//!
//! The video4linux class entry of a UVC camera sits three directories below its USB device
//! directory, which exposes the raw configuration descriptors and the vendor/product ids.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{Error, Result};

/// Default location of the video4linux class entries
pub const VIDEO4LINUX_CLASS: &str = "/sys/class/video4linux";

/// Size of a UVC extension unit GUID
pub const GUID_LEN: usize = 16;

/// sysfs lookups relative to a video4linux class directory
#[derive(Debug, Clone)]
pub struct Sysfs {
    root: PathBuf,
}

impl Default for Sysfs {
    fn default() -> Self {
        Sysfs::new(VIDEO4LINUX_CLASS)
    }
}

impl Sysfs {
    /// Returns a scanner rooted at `root` instead of [`VIDEO4LINUX_CLASS`]
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Sysfs {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Returns the USB device directory of a device node
    ///
    /// A symbolic link (e.g. from /dev/v4l/by-id/) is followed one level.
    fn usb_device_dir(&self, device: &Path) -> Option<PathBuf> {
        let is_link = fs::symlink_metadata(device)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        let device = if is_link {
            fs::read_link(device).ok()?
        } else {
            device.to_path_buf()
        };

        let name = device.file_name()?;
        Some(self.root.join(name).join("..").join("..").join(".."))
    }

    fn read(&self, device: &Path, file: &str) -> Result<Vec<u8>> {
        let path = self
            .usb_device_dir(device)
            .map(|dir| dir.join(file))
            .ok_or_else(|| Error::DescriptorUnavailable {
                path: device.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "no device name"),
            })?;

        fs::read(&path).map_err(|source| Error::DescriptorUnavailable { path, source })
    }

    /// Returns the unit id of the extension unit identified by `guid`
    ///
    /// The descriptor blob is searched for the GUID; the byte right before it is the unit id
    /// (bUnitID precedes guidExtensionCode in the extension unit descriptor).
    /// Returns 0, which is never a valid unit id, if the unit can't be found.
    pub fn find_unit_id<P: AsRef<Path>>(&self, device: P, guid: &[u8; GUID_LEN]) -> u8 {
        let descriptors = match self.read(device.as_ref(), "descriptors") {
            Ok(descriptors) => descriptors,
            Err(Error::DescriptorUnavailable { path, source })
                if source.kind() == io::ErrorKind::NotFound =>
            {
                debug!("{} does not exist", path.display());
                return 0;
            }
            Err(e) => {
                warn!("Failed to read uvc xu unit id: {}", e);
                return 0;
            }
        };

        match find_guid(&descriptors, guid) {
            Some(pos) if pos > 0 => descriptors[pos - 1],
            _ => 0,
        }
    }

    /// Returns the USB ids of a device as `vendor:product`, e.g. `1532:0e05`
    ///
    /// Returns an empty string if either id can't be read.
    pub fn find_usb_ids<P: AsRef<Path>>(&self, device: P) -> String {
        let device = device.as_ref();
        let read_id = |file: &str| -> Option<String> {
            match self.read(device, file) {
                Ok(id) => Some(String::from_utf8_lossy(&id).trim().to_string()),
                Err(Error::DescriptorUnavailable { source, .. })
                    if source.kind() == io::ErrorKind::NotFound =>
                {
                    None
                }
                Err(e) => {
                    warn!("Failed to read usb id: {}", e);
                    None
                }
            }
        };

        match (read_id("idVendor"), read_id("idProduct")) {
            (Some(vendor), Some(product)) => format!("{}:{}", vendor, product),
            _ => String::new(),
        }
    }
}

/// Returns the offset of the first occurrence of `guid` in `haystack`
pub fn find_guid(haystack: &[u8], guid: &[u8; GUID_LEN]) -> Option<usize> {
    haystack.windows(GUID_LEN).position(|w| w == guid)
}

/// [`Sysfs::find_unit_id`] against the default sysfs location
pub fn find_unit_id<P: AsRef<Path>>(device: P, guid: &[u8; GUID_LEN]) -> u8 {
    Sysfs::default().find_unit_id(device, guid)
}

/// [`Sysfs::find_usb_ids`] against the default sysfs location
pub fn find_usb_ids<P: AsRef<Path>>(device: P) -> String {
    Sysfs::default().find_usb_ids(device)
}
