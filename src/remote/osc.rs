//! OSC 1.0 message codec.
//!
//! Packets are big-endian. Strings are NUL-terminated and padded to a
//! multiple of four bytes. Supported argument tags are `f`, `i`, `s`, `T`
//! and `F`; bundles (`#bundle`) are flattened into their messages.

use glam::Vec3;

use crate::error::{Result, SculptError};
use crate::params::ParamValue;

const BUNDLE_TAG: &str = "#bundle";

#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    Float(f32),
    Int(i32),
    Str(String),
    Bool(bool),
}

impl OscArg {
    fn tag(&self) -> char {
        match self {
            Self::Float(_) => 'f',
            Self::Int(_) => 'i',
            Self::Str(_) => 's',
            Self::Bool(true) => 'T',
            Self::Bool(false) => 'F',
        }
    }

    fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f32),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    pub address: String,
    pub args: Vec<OscArg>,
}

impl OscMessage {
    pub fn new(address: impl Into<String>, args: Vec<OscArg>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }

    /// Message carrying a parameter value (vec3 as three floats)
    pub fn from_param(address: &str, value: &ParamValue) -> Self {
        let args = match value {
            ParamValue::Float(v) => vec![OscArg::Float(*v)],
            ParamValue::Int(v) => vec![OscArg::Int(*v)],
            ParamValue::Bool(v) => vec![OscArg::Bool(*v)],
            ParamValue::Vec3(v) => vec![
                OscArg::Float(v.x),
                OscArg::Float(v.y),
                OscArg::Float(v.z),
            ],
            ParamValue::Choice(v) => vec![OscArg::Str(v.clone())],
        };
        Self::new(address, args)
    }

    /// Interpret the arguments as a parameter value.
    ///
    /// Three numbers form a vec3; a single argument maps onto its own kind.
    pub fn to_param_value(&self) -> Option<ParamValue> {
        match self.args.as_slice() {
            [a, b, c] => Some(ParamValue::Vec3(Vec3::new(
                a.as_f32()?,
                b.as_f32()?,
                c.as_f32()?,
            ))),
            [OscArg::Float(v)] => Some(ParamValue::Float(*v)),
            [OscArg::Int(v)] => Some(ParamValue::Int(*v)),
            [OscArg::Bool(v)] => Some(ParamValue::Bool(*v)),
            [OscArg::Str(v)] => Some(ParamValue::Choice(v.clone())),
            _ => None,
        }
    }
}

fn write_padded_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
    // At least one NUL, then pad to 4
    let pad = 4 - s.len() % 4;
    out.extend(std::iter::repeat(0u8).take(pad));
}

pub fn encode_message(msg: &OscMessage) -> Vec<u8> {
    let mut out = Vec::with_capacity(32 + msg.address.len());
    write_padded_str(&mut out, &msg.address);

    let tags: String = std::iter::once(',')
        .chain(msg.args.iter().map(OscArg::tag))
        .collect();
    write_padded_str(&mut out, &tags);

    for arg in &msg.args {
        match arg {
            OscArg::Float(v) => out.extend_from_slice(&v.to_be_bytes()),
            OscArg::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
            OscArg::Str(s) => write_padded_str(&mut out, s),
            OscArg::Bool(_) => {}
        }
    }
    out
}

/// Cursor over a packet buffer
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos + n;
        let bytes = self
            .buf
            .get(self.pos..end)
            .ok_or_else(|| SculptError::Protocol(format!("packet truncated at byte {}", self.pos)))?;
        self.pos = end;
        Ok(bytes)
    }

    fn word(&mut self) -> Result<[u8; 4]> {
        let bytes = self.take(4)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn string(&mut self) -> Result<String> {
        let rest = &self.buf[self.pos.min(self.buf.len())..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| SculptError::Protocol("unterminated string".into()))?;
        let text = std::str::from_utf8(&rest[..len])
            .map_err(|e| SculptError::Protocol(format!("invalid UTF-8: {}", e)))?
            .to_string();
        self.take((len / 4 + 1) * 4)?;
        Ok(text)
    }
}

pub fn decode_message(buf: &[u8]) -> Result<OscMessage> {
    let mut reader = Reader::new(buf);
    let address = reader.string()?;
    if !address.starts_with('/') {
        return Err(SculptError::Protocol(format!(
            "address '{}' must start with '/'",
            address
        )));
    }

    // Type tags are optional in very old senders
    if reader.is_empty() {
        return Ok(OscMessage::new(address, Vec::new()));
    }
    let tags = reader.string()?;
    let tags = tags
        .strip_prefix(',')
        .ok_or_else(|| SculptError::Protocol(format!("bad type tag string '{}'", tags)))?;

    let mut args = Vec::with_capacity(tags.len());
    for tag in tags.chars() {
        let arg = match tag {
            'f' => OscArg::Float(f32::from_be_bytes(reader.word()?)),
            'i' => OscArg::Int(i32::from_be_bytes(reader.word()?)),
            's' => OscArg::Str(reader.string()?),
            'T' => OscArg::Bool(true),
            'F' => OscArg::Bool(false),
            other => {
                return Err(SculptError::Protocol(format!(
                    "unsupported argument type '{}'",
                    other
                )))
            }
        };
        args.push(arg);
    }
    Ok(OscMessage::new(address, args))
}

/// Decode a message or a (possibly nested) bundle into its messages
pub fn decode_packet(buf: &[u8]) -> Result<Vec<OscMessage>> {
    let mut messages = Vec::new();
    decode_into(buf, &mut messages)?;
    Ok(messages)
}

fn decode_into(buf: &[u8], out: &mut Vec<OscMessage>) -> Result<()> {
    if !buf.starts_with(BUNDLE_TAG.as_bytes()) {
        out.push(decode_message(buf)?);
        return Ok(());
    }

    let mut reader = Reader::new(buf);
    reader.string()?;
    // Time tag is ignored, elements apply immediately
    reader.take(8)?;
    while !reader.is_empty() {
        let size = i32::from_be_bytes(reader.word()?);
        let size = usize::try_from(size)
            .map_err(|_| SculptError::Protocol(format!("negative element size {}", size)))?;
        decode_into(reader.take(size)?, out)?;
    }
    Ok(())
}
