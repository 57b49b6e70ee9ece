//! Key handler trait and key sequence splitting

use crate::state::Reader;
use crate::Result;

/// Action to take after processing a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerAction {
    /// Key was handled, redraw
    Handled,
    /// No binding for this key
    Ignored,
    /// Leave the main loop
    Quit,
}

/// A key handler processes keyboard input
pub trait KeyHandler {
    /// Process one key sequence against the reader state
    fn process(&mut self, key: &[u8], reader: &mut Reader) -> Result<HandlerAction>;
}

/// Split a raw read from stdin into individual key sequences
///
/// A single read can hold several keys when typing fast. CSI and SS3
/// sequences (`ESC [ ... final`, `ESC O x`) stay together, as do the bytes
/// of one UTF-8 character.
pub fn split_keys(buf: &[u8]) -> Vec<&[u8]> {
    let mut keys = Vec::new();
    let mut i = 0;

    while i < buf.len() {
        let len = match buf[i] {
            0x1b => escape_len(&buf[i..]),
            b if b >= 0xf0 => 4,
            b if b >= 0xe0 => 3,
            b if b >= 0xc0 => 2,
            _ => 1,
        };
        let end = (i + len).min(buf.len());
        keys.push(&buf[i..end]);
        i = end;
    }
    keys
}

fn escape_len(seq: &[u8]) -> usize {
    match seq.get(1) {
        Some(b'[') => {
            // Parameters and intermediates until the final byte
            seq[2..]
                .iter()
                .position(|b| (0x40..=0x7e).contains(b))
                .map(|p| p + 3)
                .unwrap_or(seq.len())
        }
        Some(b'O') if seq.len() >= 3 => 3,
        _ => 1,
    }
}
