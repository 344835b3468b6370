use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while discovering or setting camera controls
///
/// None of these are fatal: they are logged and the remaining controls are processed.
#[derive(Debug, Error)]
pub enum Error {
    /// A device control request was rejected or could not be serviced
    #[error("{op} failed: {source}")]
    DeviceIo {
        op: String,
        #[source]
        source: io::Error,
    },

    /// A sysfs descriptor or USB id file is missing or unreadable
    #[error("can't read {}: {source}", path.display())]
    DescriptorUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Requested controls that no source knows about
    #[error("can't find {0:?} controls")]
    UnknownControls(Vec<String>),

    /// A menu entry name that the control does not offer
    #[error("can't find {value} in {valid:?} for {ctrl}")]
    UnknownMenuValue {
        ctrl: String,
        value: String,
        valid: Vec<String>,
    },

    /// The value read back after a write differs from the requested one
    #[error("failed to set {ctrl} to {requested}, current value {current}")]
    ValueMismatch {
        ctrl: String,
        requested: String,
        current: String,
    },

    /// The requested value text can't be converted for this control
    #[error("can't set {ctrl} to {value} (invalid value)")]
    InvalidValue { ctrl: String, value: String },

    /// The control exists but its kind can't be set through this source
    #[error("can't set {ctrl} (unsupported control type {typ})")]
    UnsupportedType { ctrl: String, typ: String },

    /// Two controls fold to the same text id
    #[error("duplicate control id {0}")]
    DuplicateControl(String),
}

impl Error {
    pub(crate) fn device_io(op: impl Into<String>, source: io::Error) -> Self {
        Error::DeviceIo {
            op: op.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
