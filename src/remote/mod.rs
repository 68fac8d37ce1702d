//! Remote parameter control over OSC/UDP.

mod listener;
mod osc;

pub use listener::{ParamUpdate, RemoteListener, RemoteSender, DEFAULT_PORT};
pub use osc::{decode_message, decode_packet, encode_message, OscArg, OscMessage};
