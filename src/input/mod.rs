//! Input handling and key bindings
//!
//! Raw stdin bytes are split into key sequences, looked up in the keymap and
//! executed against the [`Reader`](crate::state::Reader) by a key handler.

pub mod default_handler;
pub mod handler;
pub mod keymap;

pub use default_handler::DefaultKeyHandler;
pub use handler::{split_keys, HandlerAction, KeyHandler};
pub use keymap::{create_default_keymap, KeyAction};
