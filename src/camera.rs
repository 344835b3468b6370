use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::warn;

use crate::ctrls::{Ctrl, KiyoProCtrls, LogitechCtrls, Params, Source, V4l2Ctrls};
use crate::device::Channel;
use crate::error::Error;
use crate::sysfs::Sysfs;

/// All controls of one camera
///
/// Merges the driver's controls with those of the vendor extension units the camera carries.
/// The sources are consulted in a fixed order: driver controls first, then the Razer Kiyo Pro
/// and Logitech extension units.
pub struct CameraCtrls {
    device: PathBuf,
    sources: Vec<Box<dyn Source>>,
}

impl CameraCtrls {
    /// Discovers the controls of the camera at `device`
    ///
    /// # Arguments
    ///
    /// * `device` - Device node path, used to locate the camera in sysfs
    /// * `chan` - Control channel of the opened device
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use cameractrls::{CameraCtrls, Device};
    ///
    /// let dev = Device::with_path("/dev/video0").expect("failed to open device");
    /// let camera = CameraCtrls::new(dev.path().to_path_buf(), Arc::new(dev));
    /// camera.print_ctrls().expect("failed to print controls");
    /// ```
    pub fn new<P: AsRef<Path>>(device: P, chan: Arc<dyn Channel>) -> Self {
        Self::with_sysfs(device, chan, &Sysfs::default())
    }

    /// Like [`CameraCtrls::new`], but looks the camera up below another sysfs root
    pub fn with_sysfs<P: AsRef<Path>>(device: P, chan: Arc<dyn Channel>, sysfs: &Sysfs) -> Self {
        let device = device.as_ref();
        let sources: Vec<Box<dyn Source>> = vec![
            Box::new(V4l2Ctrls::new(chan.clone())),
            Box::new(KiyoProCtrls::new(chan.clone(), sysfs, device)),
            Box::new(LogitechCtrls::new(chan, sysfs, device)),
        ];

        let camera = CameraCtrls {
            device: device.to_path_buf(),
            sources,
        };
        for dup in camera.duplicates() {
            warn!("CameraCtrls: ignoring later {}", Error::DuplicateControl(dup));
        }
        camera
    }

    /// Returns the device node path
    pub fn device(&self) -> &Path {
        &self.device
    }

    /// Returns every control in presentation order
    ///
    /// A text id offered by more than one source belongs to the first of them.
    pub fn ctrls(&self) -> Vec<&Ctrl> {
        let mut seen = HashSet::new();
        let mut ctrls = Vec::new();
        for c in self.sources.iter().flat_map(|s| s.ctrls()) {
            if seen.insert(c.text_id.as_str()) {
                ctrls.push(c);
            }
        }
        ctrls
    }

    /// Returns the control with text id `text_id`
    pub fn find_ctrl(&self, text_id: &str) -> Option<&Ctrl> {
        self.ctrls().into_iter().find(|c| c.text_id == text_id)
    }

    /// Text ids owned by more than one control
    pub fn duplicates(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut dups = Vec::new();
        for c in self.sources.iter().flat_map(|s| s.ctrls()) {
            if !seen.insert(c.text_id.as_str()) && !dups.contains(&c.text_id) {
                dups.push(c.text_id.clone());
            }
        }
        dups
    }

    /// Applies `params` to the camera
    ///
    /// Every source sees the batch and applies the ids it owns, minus those already owned by
    /// an earlier source. Failures of single assignments are logged and don't stop the rest.
    /// Returns the ids no source knows, which are also logged as one warning.
    pub fn set_ctrls(&mut self, params: &Params) -> Vec<String> {
        let mut claimed: HashSet<String> = HashSet::new();
        for source in self.sources.iter_mut() {
            let own: Params = params
                .iter()
                .filter(|(k, _)| !claimed.contains(*k))
                .collect();
            source.set_ctrls(&own);
            claimed.extend(source.ctrls().iter().map(|c| c.text_id.clone()));
        }

        let unknown: Vec<String> = params
            .keys()
            .filter(|k| !claimed.contains(*k))
            .map(str::to_string)
            .collect();
        if !unknown.is_empty() {
            warn!("CameraCtrls: {}", Error::UnknownControls(unknown.clone()));
        }
        unknown
    }

    /// Re-reads the volatile state of all controls
    pub fn refresh(&mut self) {
        for source in self.sources.iter_mut() {
            source.refresh();
        }
    }

    /// Writes one line per control to `w`
    pub fn write_ctrls<W: Write>(&self, mut w: W) -> io::Result<()> {
        for c in self.ctrls() {
            writeln!(w, "{}", c)?;
        }
        Ok(())
    }

    /// Prints all controls to stdout
    pub fn print_ctrls(&self) -> io::Result<()> {
        let stdout = io::stdout();
        self.write_ctrls(stdout.lock())
    }
}

/// Parses `id=value[,id=value...]` assignments
///
/// Items are split on the first `=` only. Items without one are logged and skipped, a
/// repeated id keeps its first position and takes the last value.
pub fn parse_controls(controls: &str) -> Params {
    let mut params = Params::new();
    for item in controls.split(',') {
        match item.split_once('=') {
            Some((k, v)) => params.insert(k, v),
            None => warn!("invalid value: {}", item),
        }
    }
    params
}
