//! Wire protocol for the presence stream.
//!
//! Every message travels as `[length: 4 bytes BE][payload]`. The payload is a
//! single tag byte followed by the message body: `list` carries a u32 count
//! and that many application records, the three event kinds carry one record.
//! An application record is: name (u32 length + UTF-8), pid (i32 BE),
//! icon path (u32 length + UTF-8), active (1 byte), bundle path
//! (u32 length + UTF-8).

use thiserror::Error;

use crate::presence::Application;

const TAG_LIST: u8 = 0;
const TAG_LAUNCH: u8 = 1;
const TAG_CLOSE: u8 = 2;
const TAG_ACTIVATE: u8 = 3;

/// Upper bound on a single frame; anything larger is a corrupt stream.
pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown message tag {0}")]
    UnknownTag(u8),
    #[error("message truncated")]
    UnexpectedEof,
    #[error("string field is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("{0} trailing bytes after message end")]
    TrailingBytes(usize),
    #[error("frame of {0} bytes exceeds limit")]
    Oversized(u32),
}

/// One framed message on the presence socket.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketMessage {
    /// Full canonical list, sent once when a client connects.
    List(Vec<Application>),
    Launch(Application),
    Close(Application),
    Activate(Application),
}

impl SocketMessage {
    /// Encode the payload without the length prefix.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        match self {
            SocketMessage::List(apps) => {
                buf.push(TAG_LIST);
                buf.extend_from_slice(&(apps.len() as u32).to_be_bytes());
                for app in apps {
                    encode_app(&mut buf, app);
                }
            }
            SocketMessage::Launch(app) => {
                buf.push(TAG_LAUNCH);
                encode_app(&mut buf, app);
            }
            SocketMessage::Close(app) => {
                buf.push(TAG_CLOSE);
                encode_app(&mut buf, app);
            }
            SocketMessage::Activate(app) => {
                buf.push(TAG_ACTIVATE);
                encode_app(&mut buf, app);
            }
        }
        buf
    }

    /// Encode the payload with the 4-byte big-endian length prefix prepended.
    pub fn encode_frame(&self) -> Vec<u8> {
        let payload = self.encode();
        let mut frame = Vec::with_capacity(payload.len() + 4);
        frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        frame.extend_from_slice(&payload);
        frame
    }

    /// Decode one payload (without length prefix). The whole buffer must be
    /// consumed; trailing bytes mean a framing bug on the other side.
    pub fn decode(payload: &[u8]) -> Result<SocketMessage, ProtocolError> {
        let mut buf = payload;
        let tag = take_u8(&mut buf)?;
        let message = match tag {
            TAG_LIST => {
                let count = take_u32(&mut buf)?;
                let mut apps = Vec::new();
                for _ in 0..count {
                    apps.push(decode_app(&mut buf)?);
                }
                SocketMessage::List(apps)
            }
            TAG_LAUNCH => SocketMessage::Launch(decode_app(&mut buf)?),
            TAG_CLOSE => SocketMessage::Close(decode_app(&mut buf)?),
            TAG_ACTIVATE => SocketMessage::Activate(decode_app(&mut buf)?),
            other => return Err(ProtocolError::UnknownTag(other)),
        };
        if !buf.is_empty() {
            return Err(ProtocolError::TrailingBytes(buf.len()));
        }
        Ok(message)
    }
}

fn encode_app(buf: &mut Vec<u8>, app: &Application) {
    encode_str(buf, &app.name);
    buf.extend_from_slice(&app.pid.to_be_bytes());
    encode_str(buf, &app.icon_path);
    buf.push(app.active as u8);
    encode_str(buf, &app.bundle_path);
}

fn encode_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn decode_app(buf: &mut &[u8]) -> Result<Application, ProtocolError> {
    let name = take_string(buf)?;
    let pid = take_i32(buf)?;
    let icon_path = take_string(buf)?;
    let active = take_u8(buf)? != 0;
    let bundle_path = take_string(buf)?;
    Ok(Application {
        name,
        pid,
        icon_path,
        active,
        bundle_path,
    })
}

fn take<'a>(buf: &mut &'a [u8], n: usize) -> Result<&'a [u8], ProtocolError> {
    if buf.len() < n {
        return Err(ProtocolError::UnexpectedEof);
    }
    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

fn take_u8(buf: &mut &[u8]) -> Result<u8, ProtocolError> {
    Ok(take(buf, 1)?[0])
}

fn take_u32(buf: &mut &[u8]) -> Result<u32, ProtocolError> {
    let b = take(buf, 4)?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn take_i32(buf: &mut &[u8]) -> Result<i32, ProtocolError> {
    let b = take(buf, 4)?;
    Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn take_string(buf: &mut &[u8]) -> Result<String, ProtocolError> {
    let len = take_u32(buf)? as usize;
    let bytes = take(buf, len)?;
    Ok(String::from_utf8(bytes.to_vec())?)
}
