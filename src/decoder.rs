/// A logical key decoded from raw terminal bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Char(u8),
    Enter,
    Backspace,
    Tab,
    CtrlR,
    Up,
    Down,
    Right,
    CtrlUp,
    CtrlDown,
    /// Only produced while bare escape mode is on.
    Escape,
    Other(u8),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecodeState {
    Normal,
    SawEscape,
    /// After `ESC [` or `ESC O`.
    SawIntroducer,
    SawDigit5,
    SawDigit1,
    SawSemicolon,
    SawModifier,
}

/// Advances the escape sequence state machine by one byte.
///
/// Sequences that stop matching part way through are dropped along with the byte that broke
/// them, and the machine goes back to `Normal`.
pub fn step(state: DecodeState, byte: u8) -> (DecodeState, Option<Key>) {
    use DecodeState::*;
    match state {
        Normal => match byte {
            b'\x1B' => (SawEscape, None),
            _ => (Normal, Some(plain_key(byte))),
        },
        SawEscape => match byte {
            // Some terminals drop the introducer for plain arrows.
            b'A' => (Normal, Some(Key::Up)),
            b'B' => (Normal, Some(Key::Down)),
            b'[' | b'O' => (SawIntroducer, None),
            _ => (Normal, None),
        },
        SawIntroducer => match byte {
            b'A' => (Normal, Some(Key::Up)),
            b'B' => (Normal, Some(Key::Down)),
            b'C' => (Normal, Some(Key::Right)),
            b'5' => (SawDigit5, None),
            b'1' => (SawDigit1, None),
            _ => (Normal, None),
        },
        SawDigit5 | SawModifier => match byte {
            b'A' => (Normal, Some(Key::CtrlUp)),
            b'B' => (Normal, Some(Key::CtrlDown)),
            _ => (Normal, None),
        },
        SawDigit1 => match byte {
            b';' => (SawSemicolon, None),
            _ => (Normal, None),
        },
        SawSemicolon => match byte {
            b'5' => (SawModifier, None),
            _ => (Normal, None),
        },
    }
}

fn plain_key(byte: u8) -> Key {
    match byte {
        b'\r' | b'\n' => Key::Enter,
        b'\x7F' | b'\x08' => Key::Backspace,
        b'\t' => Key::Tab,
        b'\x12' => Key::CtrlR,
        0x20..=0x7E => Key::Char(byte),
        _ => Key::Other(byte),
    }
}

#[derive(Debug)]
pub struct Decoder {
    state: DecodeState,
    bare_escape: bool,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            state: DecodeState::Normal,
            bare_escape: false,
        }
    }

    /// When on, a lone ESC byte is reported as [`Key::Escape`] right away instead of starting
    /// a lookahead.
    pub fn set_bare_escape(&mut self, on: bool) {
        self.bare_escape = on;
    }

    pub fn feed(&mut self, byte: u8) -> Option<Key> {
        if self.bare_escape && self.state == DecodeState::Normal && byte == b'\x1B' {
            return Some(Key::Escape);
        }
        let (next, key) = step(self.state, byte);
        if next == DecodeState::Normal && key.is_none() {
            tracing::trace!(state = ?self.state, byte, "discarded escape sequence");
        }
        self.state = next;
        key
    }
}

/// Detects `5A`/`5B` typed out as plain text at the end of a buffer.
///
/// Some terminals hand the tail of a Ctrl+arrow sequence over as ordinary characters. This is
/// a guess: it also fires when someone really types those two characters.
pub fn trailing_ctrl_arrow(buffer: &str) -> Option<Key> {
    if buffer.ends_with("5A") {
        Some(Key::CtrlUp)
    } else if buffer.ends_with("5B") {
        Some(Key::CtrlDown)
    } else {
        None
    }
}
