//! Default key handler for the reader
//!
//! Maps key sequences to playback, focus, voice and document commands.

use super::{HandlerAction, KeyAction, KeyHandler};
use crate::state::Reader;
use crate::Result;
use log::{debug, trace};
use std::collections::HashMap;

const HELP: &str = "space play/pause  enter read  p play from here  s stop  \
j/k move  v/V voice  a auto voice  t test voice  [ ] speed  { } pitch  - + volume  \
^V paste  r reload  q quit";

/// Default key handler for reader commands
pub struct DefaultKeyHandler {
    /// Key bindings map
    keymap: HashMap<Vec<u8>, KeyAction>,
}

impl DefaultKeyHandler {
    pub fn new(keymap: HashMap<Vec<u8>, KeyAction>) -> Self {
        debug!(
            "Creating default key handler with {} bindings",
            keymap.len()
        );
        Self { keymap }
    }

    /// Look up and execute the binding for `key`
    pub fn process_key(&mut self, key: &[u8], reader: &mut Reader) -> Result<HandlerAction> {
        match self.keymap.get(key).copied() {
            Some(action) => {
                trace!("Key action: {:?}", action);
                self.execute_action(action, reader)
            }
            None => {
                trace!("Unbound key {:?}", key);
                Ok(HandlerAction::Ignored)
            }
        }
    }

    fn execute_action(&mut self, action: KeyAction, reader: &mut Reader) -> Result<HandlerAction> {
        use KeyAction::*;

        match action {
            PlayAll => reader.controller.play_all(None)?,
            PlayFromCursor => {
                let cursor = reader.cursor();
                // Starting over from the focus point, even mid-run
                if reader.controller.state().is_sequential() {
                    reader.controller.stop()?;
                }
                reader.controller.play_all(Some(cursor))?;
            }
            ReadCursor => {
                let cursor = reader.cursor();
                reader.controller.read_one(cursor)?;
            }
            Stop => reader.controller.stop()?,

            PrevParagraph => reader.move_cursor(-1),
            NextParagraph => reader.move_cursor(1),
            FirstParagraph => reader.cursor_to_start(),
            LastParagraph => reader.cursor_to_end(),

            NextVoice => reader.cycle_voice(true),
            PrevVoice => reader.cycle_voice(false),
            AutoVoice => reader.auto_voice(),
            TestVoice => {
                if reader.controller.catalog().selected().is_none() {
                    reader.set_message("no voice to test");
                }
                reader.controller.test_voice()?;
            }

            RateUp => reader.adjust_rate(1),
            RateDown => reader.adjust_rate(-1),
            PitchUp => reader.adjust_pitch(1),
            PitchDown => reader.adjust_pitch(-1),
            VolumeUp => reader.adjust_volume(1),
            VolumeDown => reader.adjust_volume(-1),

            Paste => {
                debug!("Pasting document from clipboard");
                reader.controller.stop()?;
                reader.paste_from_clipboard()?;
            }
            Reload => reader.reload()?,

            Help => reader.set_message(HELP),
            Quit => {
                debug!("Quit requested");
                reader.quit = true;
                return Ok(HandlerAction::Quit);
            }
        }
        Ok(HandlerAction::Handled)
    }
}

impl KeyHandler for DefaultKeyHandler {
    fn process(&mut self, key: &[u8], reader: &mut Reader) -> Result<HandlerAction> {
        self.process_key(key, reader)
    }
}
