use crate::builtins::BUILTINS;
use std::{
    collections::{BTreeSet, HashSet},
    env, fmt, fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

pub const MAX_HISTORY_MATCHES: usize = 3;
pub const MAX_COMMANDS_WITH_HISTORY: usize = 3;
pub const MAX_COMMANDS: usize = 6;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Source {
    History,
    Command,
}

impl Source {
    pub fn tag(self) -> &'static str {
        match self {
            Source::History => "HIST: ",
            Source::Command => "CMD: ",
        }
    }
}

/// A completion for the whole input line. Displays with its source tag in front.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub source: Source,
    pub text: String,
}

impl Candidate {
    pub fn history(text: impl Into<String>) -> Self {
        Self {
            source: Source::History,
            text: text.into(),
        }
    }

    pub fn command(text: impl Into<String>) -> Self {
        Self {
            source: Source::Command,
            text: text.into(),
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.source.tag(), self.text)
    }
}

#[derive(Debug, Clone)]
pub struct CompletionEngine {
    search_path: Vec<PathBuf>,
    home: Option<PathBuf>,
    working_dir: Option<PathBuf>,
}

impl CompletionEngine {
    pub fn new(search_path: Vec<PathBuf>, home: Option<PathBuf>) -> Self {
        Self {
            search_path,
            home,
            working_dir: None,
        }
    }

    /// Uses `PATH` and the current user's home directory.
    pub fn from_env() -> Self {
        let search_path = env::var_os("PATH")
            .map(|p| env::split_paths(&p).collect())
            .unwrap_or_default();
        Self::new(search_path, dirs::home_dir())
    }

    /// Resolve relative paths against `dir` instead of the process working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn complete(&self, input: &str, history: &[String]) -> Vec<Candidate> {
        if input.is_empty() {
            return history_matches(history, |_| true);
        }
        if !input.contains(char::is_whitespace) {
            let needle = input.to_lowercase();
            let hist = history_matches(history, |entry| entry.to_lowercase().starts_with(&needle));
            return merge(hist, self.commands(input));
        }

        let token = if input.ends_with(char::is_whitespace) {
            ""
        } else {
            input.split_whitespace().last().unwrap_or("")
        };
        let hist = history_matches(history, |entry| entry.contains(token));
        let line_prefix = &input[..input.len() - token.len()];
        merge(hist, self.paths(line_prefix, token))
    }

    fn commands(&self, prefix: &str) -> BTreeSet<String> {
        let mut found: BTreeSet<String> = BUILTINS
            .keys()
            .filter(|name| name.starts_with(prefix))
            .map(|name| name.to_string())
            .collect();
        for dir in &self.search_path {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                if name.starts_with(prefix) && is_executable(&entry.path()) {
                    found.insert(name);
                }
            }
        }
        found
    }

    /// Lists directory entries matching `token`, each rendered as a full line.
    fn paths(&self, line_prefix: &str, token: &str) -> BTreeSet<String> {
        // A bare `~` lists the home directory.
        let token = if token == "~" && self.home.is_some() {
            "~/"
        } else {
            token
        };
        let (dir_part, name_prefix) = match token.rfind('/') {
            Some(idx) => token.split_at(idx + 1),
            None => ("", token),
        };
        let dir = self.resolve_dir(dir_part);
        let Ok(entries) = fs::read_dir(&dir) else {
            tracing::debug!(dir = %dir.display(), "cannot list directory for completion");
            return BTreeSet::new();
        };

        let mut found = BTreeSet::new();
        for entry in entries.flatten() {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !name.starts_with(name_prefix) {
                continue;
            }
            let slash = if entry.path().is_dir() { "/" } else { "" };
            found.insert(format!("{line_prefix}{dir_part}{name}{slash}"));
        }
        found
    }

    fn resolve_dir(&self, dir_part: &str) -> PathBuf {
        let expanded = match (dir_part.strip_prefix('~'), &self.home) {
            (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
                home.join(rest.trim_start_matches('/'))
            }
            _ => PathBuf::from(dir_part),
        };
        if expanded.is_absolute() {
            return expanded;
        }
        let base = self
            .working_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        base.join(expanded)
    }
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Newest first, skipping entries already seen.
fn history_matches(history: &[String], matches: impl Fn(&str) -> bool) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    history
        .iter()
        .rev()
        .filter(|entry| matches(entry))
        .filter(|entry| seen.insert(entry.as_str()))
        .take(MAX_HISTORY_MATCHES)
        .map(|entry| Candidate::history(entry.as_str()))
        .collect()
}

fn merge(mut hist: Vec<Candidate>, commands: BTreeSet<String>) -> Vec<Candidate> {
    let limit = if hist.is_empty() {
        MAX_COMMANDS
    } else {
        MAX_COMMANDS_WITH_HISTORY
    };
    hist.extend(commands.into_iter().take(limit).map(Candidate::command));
    hist
}

/// The candidate list currently offered in the dropdown.
#[derive(Debug, Default)]
pub struct CompletionState {
    candidates: Vec<Candidate>,
    selected: usize,
}

impl CompletionState {
    pub fn set(&mut self, candidates: Vec<Candidate>) {
        self.candidates = candidates;
        self.selected = 0;
    }

    pub fn clear(&mut self) {
        self.candidates.clear();
        self.selected = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&Candidate> {
        self.candidates.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if !self.candidates.is_empty() {
            self.selected = (self.selected + 1) % self.candidates.len();
        }
    }

    pub fn select_previous(&mut self) {
        if !self.candidates.is_empty() {
            let len = self.candidates.len();
            self.selected = (self.selected + len - 1) % len;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Suggestion {
    pub text: String,
    /// The part of `text` not typed yet.
    pub suffix: String,
}

/// Picks the first candidate that extends `buffer`, ignoring case.
pub fn inline_suggestion(buffer: &str, candidates: &[Candidate]) -> Option<Suggestion> {
    if buffer.is_empty() {
        return None;
    }
    let needle = buffer.to_lowercase();
    let mut seen = HashSet::new();
    candidates
        .iter()
        .map(|c| c.text.as_str())
        .filter(|text| seen.insert(*text))
        .find(|text| text.to_lowercase().starts_with(&needle))
        .map(|text| Suggestion {
            text: text.to_string(),
            suffix: text.chars().skip(buffer.chars().count()).collect(),
        })
}

#[cfg(test)]
mod tests {
    use super::{Candidate, CompletionEngine, CompletionState, inline_suggestion};
    use std::{fs, os::unix::fs::PermissionsExt, path::Path};

    fn history(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    fn tagged(candidates: &[Candidate]) -> Vec<String> {
        candidates.iter().map(|c| c.to_string()).collect()
    }

    fn make_executable(dir: &Path, name: &str) {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn empty_engine() -> CompletionEngine {
        CompletionEngine::new(Vec::new(), None)
    }

    #[test]
    fn empty_buffer_offers_recent_distinct_history() {
        let engine = empty_engine();
        let result = engine.complete("", &history(&["ls", "ls", "git status"]));
        assert_eq!(tagged(&result), ["HIST: git status", "HIST: ls"]);
    }

    #[test]
    fn empty_buffer_caps_history_at_three() {
        let engine = empty_engine();
        let result = engine.complete("", &history(&["a", "b", "c", "d", "c"]));
        assert_eq!(tagged(&result), ["HIST: c", "HIST: d", "HIST: b"]);
    }

    #[test]
    fn history_match_limits_commands_to_three() {
        let bin = tempfile::tempdir().unwrap();
        for i in 0..10 {
            make_executable(bin.path(), &format!("g{i}"));
        }
        let engine = CompletionEngine::new(vec![bin.path().to_path_buf()], None);
        let result = engine.complete("g", &history(&["git status"]));
        assert_eq!(
            tagged(&result),
            ["HIST: git status", "CMD: g0", "CMD: g1", "CMD: g2"]
        );
    }

    #[test]
    fn commands_alone_are_capped_at_six() {
        let bin = tempfile::tempdir().unwrap();
        for i in 0..10 {
            make_executable(bin.path(), &format!("g{i}"));
        }
        let engine = CompletionEngine::new(vec![bin.path().to_path_buf()], None);
        let result = engine.complete("g", &history(&["ls"]));
        assert_eq!(result.len(), 6);
        assert_eq!(result[5], Candidate::command("g5"));
    }

    #[test]
    fn commands_merge_builtins_and_skip_non_executables() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        make_executable(first.path(), "cat");
        make_executable(second.path(), "cat");
        fs::write(second.path().join("cargo.txt"), "").unwrap();
        fs::create_dir(second.path().join("cdir")).unwrap();
        let engine = CompletionEngine::new(
            vec![
                first.path().to_path_buf(),
                second.path().join("missing"),
                second.path().to_path_buf(),
            ],
            None,
        );
        let result = engine.complete("c", &[]);
        assert_eq!(tagged(&result), ["CMD: cat", "CMD: cd", "CMD: clear"]);
    }

    #[test]
    fn command_history_match_ignores_case() {
        let engine = empty_engine();
        let result = engine.complete("GI", &history(&["git log", "ls", "Git push"]));
        assert_eq!(tagged(&result), ["HIST: Git push", "HIST: git log"]);
    }

    #[test]
    fn path_completion_lists_matching_entries() {
        let work = tempfile::tempdir().unwrap();
        fs::create_dir(work.path().join("src")).unwrap();
        fs::create_dir(work.path().join("scripts")).unwrap();
        fs::write(work.path().join("setup.sh"), "").unwrap();
        fs::write(work.path().join("README"), "").unwrap();
        let engine = empty_engine().with_working_dir(work.path());
        let result = engine.complete("ls s", &[]);
        assert_eq!(
            tagged(&result),
            ["CMD: ls scripts/", "CMD: ls setup.sh", "CMD: ls src/"]
        );
    }

    #[test]
    fn trailing_space_lists_working_directory() {
        let work = tempfile::tempdir().unwrap();
        fs::write(work.path().join("a.txt"), "").unwrap();
        let engine = empty_engine().with_working_dir(work.path());
        let result = engine.complete("cat ", &history(&["cat a.txt", "ls"]));
        assert_eq!(
            tagged(&result),
            ["HIST: ls", "HIST: cat a.txt", "CMD: cat a.txt"]
        );
    }

    #[test]
    fn path_completion_in_subdirectory() {
        let work = tempfile::tempdir().unwrap();
        fs::create_dir_all(work.path().join("src/bin")).unwrap();
        fs::write(work.path().join("src/lib.rs"), "").unwrap();
        let engine = empty_engine().with_working_dir(work.path());
        let result = engine.complete("vim src/", &history(&["vim src/lib.rs"]));
        assert_eq!(
            tagged(&result),
            ["HIST: vim src/lib.rs", "CMD: vim src/bin/", "CMD: vim src/lib.rs"]
        );
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = tempfile::tempdir().unwrap();
        fs::write(home.path().join("notes.txt"), "").unwrap();
        fs::write(home.path().join("other"), "").unwrap();
        let engine = CompletionEngine::new(Vec::new(), Some(home.path().to_path_buf()));
        let result = engine.complete("cat ~/no", &[]);
        assert_eq!(tagged(&result), ["CMD: cat ~/notes.txt"]);
    }

    #[test]
    fn bare_tilde_lists_home() {
        let home = tempfile::tempdir().unwrap();
        fs::write(home.path().join("notes.txt"), "").unwrap();
        fs::create_dir(home.path().join("src")).unwrap();
        let engine = CompletionEngine::new(Vec::new(), Some(home.path().to_path_buf()));
        let result = engine.complete("cat ~", &[]);
        assert_eq!(tagged(&result), ["CMD: cat ~/notes.txt", "CMD: cat ~/src/"]);
    }

    #[test]
    fn unreadable_directory_yields_nothing() {
        let engine = empty_engine();
        let result = engine.complete("ls /definitely/not/here/x", &[]);
        assert!(result.is_empty());
    }

    #[test]
    fn selection_wraps_both_ways() {
        let mut state = CompletionState::default();
        state.select_next();
        assert_eq!(state.selected(), None);
        state.set(vec![Candidate::command("a"), Candidate::command("b")]);
        state.select_previous();
        assert_eq!(state.selected_index(), 1);
        state.select_next();
        assert_eq!(state.selected(), Some(&Candidate::command("a")));
        state.clear();
        assert!(state.is_empty());
    }

    #[test]
    fn suggestion_uses_first_case_insensitive_match() {
        let candidates = vec![Candidate::command("git"), Candidate::command("gimp")];
        let suggestion = inline_suggestion("gi", &candidates).unwrap();
        assert_eq!(suggestion.text, "git");
        assert_eq!(suggestion.suffix, "t");

        let candidates = vec![Candidate::history("ls"), Candidate::command("Make")];
        let suggestion = inline_suggestion("ma", &candidates).unwrap();
        assert_eq!(suggestion.text, "Make");
        assert_eq!(suggestion.suffix, "ke");
    }

    #[test]
    fn no_suggestion_without_match_or_input() {
        let candidates = vec![Candidate::command("git")];
        assert_eq!(inline_suggestion("x", &candidates), None);
        assert_eq!(inline_suggestion("", &candidates), None);
    }
}
