//! UVC extension unit requests
//!
//! Extension units are addressed by (unit id, selector). Their payload size is device defined,
//! so every payload transfer is preceded by a `GET_LEN` request.

use std::io;

use log::warn;

use crate::device::Channel;
use crate::error::{Error, Result};

/// Video class-specific request codes (UVC 1.5, A.8)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Request {
    SetCur,
    GetCur,
    GetMin,
    GetMax,
    GetRes,
    GetLen,
    GetInfo,
    GetDef,
}

impl From<Request> for u8 {
    fn from(req: Request) -> Self {
        match req {
            Request::SetCur => 0x01,
            Request::GetCur => 0x81,
            Request::GetMin => 0x82,
            Request::GetMax => 0x83,
            Request::GetRes => 0x84,
            Request::GetLen => 0x85,
            Request::GetInfo => 0x86,
            Request::GetDef => 0x87,
        }
    }
}

/// Returns the payload length of an extension unit control
pub fn xu_control_len(chan: &dyn Channel, unit: u8, selector: u8) -> io::Result<u16> {
    let mut len = [0u8; 2];
    chan.xu_query(unit, selector, Request::GetLen, &mut len)?;
    Ok(u16::from_le_bytes(len))
}

/// Issues `query` against an extension unit control
///
/// The payload length is queried first; `data` must be at least that long. Only the first
/// `len` bytes of `data` take part in the transfer.
pub fn query_xu_control(
    chan: &dyn Channel,
    unit: u8,
    selector: u8,
    query: Request,
    data: &mut [u8],
) -> Result<()> {
    let len = xu_control_len(chan, unit, selector)
        .map_err(|e| Error::device_io(format!("UVCIOC_CTRL_QUERY ({:?})", Request::GetLen), e))?;
    let len = usize::from(len);

    if len > data.len() {
        return Err(Error::device_io(
            format!("UVCIOC_CTRL_QUERY ({:?})", query),
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("control length {} exceeds buffer of {}", len, data.len()),
            ),
        ));
    }

    chan.xu_query(unit, selector, query, &mut data[..len])
        .map_err(|e| Error::device_io(format!("UVCIOC_CTRL_QUERY ({:?})", query), e))
}

/// Like [`query_xu_control`], but a failure only logs a warning.
///
/// Reads leave `data` untouched on failure, so callers see zeroes when they start from a
/// zeroed buffer.
pub fn query_xu_control_or_warn(
    chan: &dyn Channel,
    unit: u8,
    selector: u8,
    query: Request,
    data: &mut [u8],
) -> bool {
    match query_xu_control(chan, unit, selector, query, data) {
        Ok(()) => true,
        Err(e) => {
            warn!("unit {} selector {}: {}", unit, selector, e);
            false
        }
    }
}
