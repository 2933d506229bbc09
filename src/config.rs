use std::path::PathBuf;

pub const HISTORY_FILE_NAME: &str = ".ghostline_history";
pub const DEFAULT_PROMPT: &str = "> ";
pub const DEFAULT_SUGGESTION_COLUMN: u16 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub history_path: PathBuf,
    pub prompt: String,
    pub suggestion_column: u16,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_path: default_history_path(),
            prompt: DEFAULT_PROMPT.to_string(),
            suggestion_column: DEFAULT_SUGGESTION_COLUMN,
            log_file: None,
        }
    }
}

/// `~/.ghostline_history`, or the working directory when there's no home directory.
pub fn default_history_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(HISTORY_FILE_NAME)
}
