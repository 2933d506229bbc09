/// Incremental reverse search over history.
#[derive(Debug, Default)]
pub struct SearchSession {
    active: bool,
    query: String,
    matches: Vec<String>,
    cursor: Option<usize>,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.active = true;
        self.query.clear();
        self.matches.clear();
        self.cursor = None;
    }

    pub fn exit(&mut self) {
        self.active = false;
        self.query.clear();
        self.matches.clear();
        self.cursor = None;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn matches(&self) -> &[String] {
        &self.matches
    }

    /// Recomputes the matches for `query`, newest first, and returns the best one.
    pub fn update_query(&mut self, query: &str, history: &[String]) -> Option<&str> {
        self.query = query.to_string();
        let needle = query.to_lowercase();
        self.matches = history
            .iter()
            .rev()
            .filter(|entry| entry.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        self.cursor = if self.matches.is_empty() { None } else { Some(0) };
        self.current()
    }

    pub fn push_char(&mut self, ch: char, history: &[String]) -> Option<&str> {
        let mut query = std::mem::take(&mut self.query);
        query.push(ch);
        self.update_query(&query, history)
    }

    /// Drops the last query character. Does nothing when the query is already empty.
    pub fn pop_char(&mut self, history: &[String]) -> Option<&str> {
        let mut query = self.query.clone();
        query.pop()?;
        self.update_query(&query, history)
    }

    pub fn current(&self) -> Option<&str> {
        self.cursor.map(|idx| self.matches[idx].as_str())
    }

    pub fn next(&mut self) -> Option<&str> {
        let idx = self.cursor?;
        self.cursor = Some((idx + 1) % self.matches.len());
        self.current()
    }

    pub fn previous(&mut self) -> Option<&str> {
        let idx = self.cursor?;
        let len = self.matches.len();
        self.cursor = Some((idx + len - 1) % len);
        self.current()
    }

    pub fn prompt(&self) -> String {
        format!("(reverse-i-search)`{}': ", self.query)
    }
}
