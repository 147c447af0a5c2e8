//! Socket.IO v4 text framing, limited to the packets the client exchanges.
//!
//! Engine.IO packet types are the first character of a text frame; a
//! Socket.IO packet rides inside an Engine.IO `message` (`4`) and carries its
//! own type digit, so an event on the default namespace starts with `42`.

use std::fmt::Write as _;

/// Engine.IO ping sent by the server.
pub const PING: &str = "2";
/// Engine.IO pong the client answers a ping with.
pub const PONG: &str = "3";
/// Socket.IO CONNECT for the default namespace.
pub const NAMESPACE_CONNECT: &str = "40";
/// Engine.IO message + Socket.IO EVENT.
pub const EVENT_PREFIX: &str = "42";
pub const TOGGLE_BITS_EVENT: &str = "toggle_bits";

/// Builds the bulk toggle event for `indices`.
///
/// The layout is fixed by the remote service and must not change, including
/// the space after the event name and the lack of spaces between entries:
/// `42["toggle_bits", [{"index": 3},{"index": 7}]]`.
pub fn toggle_bits_frame(indices: &[usize]) -> String {
    let mut frame = String::with_capacity(24 + indices.len() * 16);
    frame.push_str(EVENT_PREFIX);
    frame.push_str("[\"");
    frame.push_str(TOGGLE_BITS_EVENT);
    frame.push_str("\", [");
    for (position, index) in indices.iter().enumerate() {
        if position > 0 {
            frame.push(',');
        }
        let _ = write!(frame, "{{\"index\": {index}}}");
    }
    frame.push_str("]]");
    frame
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet<'a> {
    /// `0{...}` handshake carrying the session parameters.
    Open(&'a str),
    Close,
    Ping,
    Pong,
    /// `40...` acknowledgement of the namespace connect.
    Connected,
    /// `42[...]` event with its JSON array payload.
    Event(&'a str),
    Other(&'a str),
}

impl<'a> Packet<'a> {
    pub fn parse(frame: &'a str) -> Self {
        if let Some(payload) = frame.strip_prefix(EVENT_PREFIX) {
            return Packet::Event(payload);
        }
        if frame.starts_with(NAMESPACE_CONNECT) {
            return Packet::Connected;
        }
        match frame.as_bytes().first() {
            Some(b'0') => Packet::Open(&frame[1..]),
            Some(b'1') => Packet::Close,
            Some(b'2') => Packet::Ping,
            Some(b'3') => Packet::Pong,
            _ => Packet::Other(frame),
        }
    }
}
