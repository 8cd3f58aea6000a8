//! Wire protocol: fixed-width frames, record keys and acknowledgements.
//!
//! Clients send frames of exactly [`FRAME_LEN`] bytes: a [`PAYLOAD_LEN`]-byte
//! payload followed by `\n`.
//!
//! ```text
//!  0                               8   9
//! ┌───┬───┬───┬───┬───┬───┬───┬───┬───┬────┐
//! │ 0 │ 0 │ 1 │ 2 │ 3 │ 4 │ 5 │ 6 │ 7 │ \n │   record 001234567
//! └───┴───┴───┴───┴───┴───┴───┴───┴───┴────┘
//! ```
//!
//! A payload is a record when every byte is an ASCII digit, except that a
//! single `'.'` is accepted anywhere in it (`12345.789` is a record). The
//! literal `terminate` is only recognised after validation has failed; it
//! asks the server to shut down.
//!
//! The server answers a first-seen record with
//! `message received: <key without leading zeros>\n` and says nothing for
//! duplicates. Violations are answered by closing the connection.

use std::fmt;
use std::str;

use thiserror::Error;

/// Size of one frame on the wire.
pub const FRAME_LEN: usize = 10;

/// Size of the payload inside a frame.
pub const PAYLOAD_LEN: usize = 9;

/// Last byte of every frame.
pub const TERMINATOR: u8 = b'\n';

/// Payload that requests a server-wide shutdown. Case-sensitive.
pub const TERMINATE: &[u8; PAYLOAD_LEN] = b"terminate";

/// Prefix of the acknowledgement sent for a first-seen record.
pub const ACK_PREFIX: &str = "message received: ";

/// Reasons a session stops reading from its peer.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The peer closed the stream in the middle of a frame.
    #[error("truncated frame: got {read} of 10 bytes")]
    Truncated { read: usize },

    /// A `\n` arrived before the tenth byte: the line is shorter than a frame.
    #[error("short frame: line ended after {len} bytes")]
    ShortFrame { len: usize },

    /// The tenth byte of the frame is not `\n`.
    #[error("missing frame terminator, found {found:#04x}")]
    MissingTerminator { found: u8 },

    /// The payload is neither a record nor the terminate command.
    #[error("invalid payload")]
    InvalidPayload,

    /// The socket failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Identity of a submitted number: the raw nine payload bytes.
///
/// Leading zeros are part of the identity; `000000001` and `000000011` are
/// different keys. They are only dropped by [`display`](Self::display).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey([u8; PAYLOAD_LEN]);

impl RecordKey {
    /// Validates a payload and wraps it.
    pub fn parse(payload: &[u8; PAYLOAD_LEN]) -> Option<Self> {
        is_valid_payload(payload).then_some(Self(*payload))
    }

    /// Returns the raw payload bytes.
    pub fn as_bytes(&self) -> &[u8; PAYLOAD_LEN] {
        &self.0
    }

    /// Returns the key with leading zeros, as received.
    pub fn as_str(&self) -> &str {
        // Validated payloads are ASCII.
        str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Returns the key with leading `'0'` characters stripped.
    ///
    /// `000000000` displays as the empty string.
    pub fn display(&self) -> &str {
        self.as_str().trim_start_matches('0')
    }

    /// Builds the acknowledgement line sent back for a first-seen key.
    pub fn ack(&self) -> String {
        format!("{}{}\n", ACK_PREFIX, self.display())
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}

impl TryFrom<&str> for RecordKey {
    type Error = ProtocolError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let payload: &[u8; PAYLOAD_LEN] = value
            .as_bytes()
            .try_into()
            .map_err(|_| ProtocolError::InvalidPayload)?;
        Self::parse(payload).ok_or(ProtocolError::InvalidPayload)
    }
}

/// A decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// A valid record.
    Record(RecordKey),
    /// The shutdown sentinel.
    Terminate,
}

impl Frame {
    /// Decodes one frame.
    ///
    /// The terminator is checked first, then the payload characters, and
    /// only when those fail is the payload compared with [`TERMINATE`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use numeri::protocol::{Frame, ProtocolError};
    ///
    /// assert!(matches!(Frame::decode(b"123456789\n"), Ok(Frame::Record(_))));
    /// assert!(matches!(Frame::decode(b"terminate\n"), Ok(Frame::Terminate)));
    /// assert!(matches!(
    ///     Frame::decode(b"Terminate\n"),
    ///     Err(ProtocolError::InvalidPayload)
    /// ));
    /// ```
    pub fn decode(frame: &[u8; FRAME_LEN]) -> Result<Self, ProtocolError> {
        let (payload, terminator) = frame.split_at(PAYLOAD_LEN);
        if terminator[0] != TERMINATOR {
            return Err(ProtocolError::MissingTerminator {
                found: terminator[0],
            });
        }

        let payload: &[u8; PAYLOAD_LEN] = payload
            .try_into()
            .map_err(|_| ProtocolError::InvalidPayload)?;

        match RecordKey::parse(payload) {
            Some(key) => Ok(Frame::Record(key)),
            None if payload == TERMINATE => Ok(Frame::Terminate),
            None => Err(ProtocolError::InvalidPayload),
        }
    }

    /// Encodes a payload into a frame.
    pub fn encode(payload: &[u8; PAYLOAD_LEN]) -> [u8; FRAME_LEN] {
        let mut frame = [TERMINATOR; FRAME_LEN];
        frame[..PAYLOAD_LEN].copy_from_slice(payload);
        frame
    }
}

/// Accepts ASCII digits with at most one `'.'` anywhere in the payload.
pub fn is_valid_payload(payload: &[u8]) -> bool {
    let mut dots = 0;
    for &byte in payload {
        match byte {
            b'0'..=b'9' => {}
            b'.' if dots == 0 => dots += 1,
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(s: &str) -> [u8; FRAME_LEN] {
        s.as_bytes().try_into().unwrap()
    }

    #[test]
    fn test_valid_digits() {
        assert!(is_valid_payload(b"123456789"));
        assert!(is_valid_payload(b"000000000"));
    }

    #[test]
    fn test_single_dot_is_accepted() {
        assert!(is_valid_payload(b"12345.789"));
        assert!(is_valid_payload(b".23456789"));
        assert!(is_valid_payload(b"12345678."));
    }

    #[test]
    fn test_second_dot_is_rejected() {
        assert!(!is_valid_payload(b"1234..789"));
        assert!(!is_valid_payload(b".2345678."));
    }

    #[test]
    fn test_other_bytes_are_rejected() {
        assert!(!is_valid_payload(b"this is a"));
        assert!(!is_valid_payload(b"-12345678"));
        assert!(!is_valid_payload(b"1234 6789"));
        assert!(!is_valid_payload(b"12345678\n"));
    }

    #[test]
    fn test_decode_record() {
        let decoded = Frame::decode(&frame("123456789\n")).unwrap();
        assert_eq!(decoded, Frame::Record(RecordKey(*b"123456789")));
    }

    #[test]
    fn test_decode_terminate() {
        assert_eq!(
            Frame::decode(&frame("terminate\n")).unwrap(),
            Frame::Terminate
        );
    }

    #[test]
    fn test_terminate_is_case_sensitive() {
        assert!(matches!(
            Frame::decode(&frame("Terminate\n")),
            Err(ProtocolError::InvalidPayload)
        ));
        assert!(matches!(
            Frame::decode(&frame("TERMINATE\n")),
            Err(ProtocolError::InvalidPayload)
        ));
    }

    #[test]
    fn test_missing_terminator() {
        assert!(matches!(
            Frame::decode(&frame("1234567890")),
            Err(ProtocolError::MissingTerminator { found: b'0' })
        ));
        assert!(matches!(
            Frame::decode(&frame("terminate!")),
            Err(ProtocolError::MissingTerminator { found: b'!' })
        ));
    }

    #[test]
    fn test_display_strips_leading_zeros() {
        let key = RecordKey::try_from("000000001").unwrap();
        assert_eq!(key.display(), "1");
        assert_eq!(key.as_str(), "000000001");
        assert_eq!(key.to_string(), "1");
    }

    #[test]
    fn test_all_zeros_display_empty() {
        let key = RecordKey::try_from("000000000").unwrap();
        assert_eq!(key.display(), "");
        assert_eq!(key.ack(), "message received: \n");
    }

    #[test]
    fn test_leading_zeros_are_identity() {
        let a = RecordKey::try_from("000000001").unwrap();
        let b = RecordKey::try_from("000000011").unwrap();
        let c = RecordKey::try_from("100000000").unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_ack() {
        let key = RecordKey::try_from("007654321").unwrap();
        assert_eq!(key.ack(), "message received: 7654321\n");
        let dotted = RecordKey::try_from("00000.123").unwrap();
        assert_eq!(dotted.ack(), "message received: .123\n");
    }

    #[test]
    fn test_try_from_rejects_bad_length() {
        assert!(RecordKey::try_from("12345678").is_err());
        assert!(RecordKey::try_from("1234567890").is_err());
        assert!(RecordKey::try_from("abcdefghi").is_err());
    }

    #[test]
    fn test_encode() {
        assert_eq!(&Frame::encode(b"123456789"), b"123456789\n");
        assert_eq!(&Frame::encode(TERMINATE), b"terminate\n");
    }
}
