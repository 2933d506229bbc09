/// The text typed since the last commit. Editing only ever happens at the end.
#[derive(Debug, Default, Clone)]
pub struct LineBuffer {
    text: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a printable ASCII byte. Anything else is ignored and `false` is returned.
    pub fn append(&mut self, byte: u8) -> bool {
        if !is_printable(byte) {
            return false;
        }
        self.text.push(byte as char);
        true
    }

    pub fn delete_last(&mut self) -> bool {
        self.text.pop().is_some()
    }

    pub fn reset(&mut self) {
        self.text.clear();
    }

    /// Replaces the contents with `text`, minus any control characters.
    /// Non-ASCII text is kept, unlike with [`append`](Self::append).
    pub fn replace(&mut self, text: &str) {
        self.text = text.chars().filter(|c| !c.is_control()).collect();
    }

    pub fn strip_suffix(&mut self, suffix: &str) -> bool {
        if self.text.ends_with(suffix) {
            self.text.truncate(self.text.len() - suffix.len());
            true
        } else {
            false
        }
    }

    pub fn contents(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

pub fn is_printable(byte: u8) -> bool {
    (0x20..=0x7E).contains(&byte)
}
