//! Domain model module declarations and shared helpers.

use chrono::Utc;
use uuid::Uuid;

pub mod channel;
pub mod job;
pub mod preference;
pub mod status;
pub mod system;
pub mod team;
pub mod team_member;

/// Length of every generated identifier.
pub const ID_LENGTH: usize = 26;

const ID_ALPHABET: &[u8; 32] = b"ybndrfg8ejkmcpqxot1uwisza345h769";

/// Generate a new 26-character identifier.
///
/// The identifier is the base32 rendering (human-friendly alphabet) of a
/// random UUID, truncated to [`ID_LENGTH`] characters.
#[must_use]
pub fn new_id() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    let mut id = String::with_capacity(ID_LENGTH);
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for byte in bytes {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            id.push(char::from(ID_ALPHABET[((buffer >> bits) & 0x1f) as usize]));
        }
    }
    if bits > 0 {
        id.push(char::from(ID_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize]));
    }
    id.truncate(ID_LENGTH);
    id
}

/// Whether `id` has the shape of a generated identifier.
#[must_use]
pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LENGTH && id.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Current time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub(crate) fn char_len(value: &str) -> usize {
    value.chars().count()
}
