use crate::completion::{Candidate, Source, Suggestion};
use std::io::Write;
use unicode_segmentation::UnicodeSegmentation;

pub const PANEL_ROWS: usize = 6;
/// Candidate rows plus the top and bottom border.
pub const PANEL_HEIGHT: usize = PANEL_ROWS + 2;
pub const PANEL_INNER_WIDTH: usize = 36;

const SAVE_CURSOR: &str = "\x1B7";
const RESTORE_CURSOR: &str = "\x1B8";
const CLEAR_TO_EOL: &str = "\x1B[K";
const CLEAR_LINE: &str = "\x1B[2K";
const RESET: &str = "\x1B[0m";
const SUGGESTION_STYLE: &str = "\x1B[90m";
const COMMAND_ROW_STYLE: &str = "\x1B[30;43m";
const HISTORY_ROW_STYLE: &str = "\x1B[30;46m";
const SELECTED_ROW_STYLE: &str = "\x1B[1;97;44m";

/// Draws the input line and its decorations.
///
/// Writes never fail from the caller's point of view: a terminal that can't be written to
/// right now shouldn't end the session, so errors are logged and dropped.
#[derive(Debug)]
pub struct Renderer {
    suggestion_column: u16,
    width: u16,
    panel_visible: bool,
}

impl Renderer {
    pub fn new(suggestion_column: u16, width: u16) -> Self {
        Self {
            suggestion_column,
            width,
            panel_visible: false,
        }
    }

    pub fn set_width(&mut self, width: u16) {
        self.width = width;
    }

    /// 1-based column of the panel's left border.
    pub fn panel_column(&self) -> usize {
        (self.width as usize)
            .saturating_sub(PANEL_INNER_WIDTH + 3)
            .max(1)
    }

    pub fn prompt(&mut self, out: &mut dyn Write, prompt: &str) {
        emit(out, prompt.as_bytes());
    }

    pub fn redraw_line(&mut self, out: &mut dyn Write, prompt: &str, text: &str) {
        emit(out, format!("\r{CLEAR_TO_EOL}{prompt}{text}").as_bytes());
    }

    pub fn echo(&mut self, out: &mut dyn Write, byte: u8) {
        emit(out, &[byte]);
    }

    pub fn erase_last(&mut self, out: &mut dyn Write) {
        emit(out, b"\x08 \x08");
    }

    pub fn newline(&mut self, out: &mut dyn Write) {
        emit(out, b"\r\n");
    }

    pub fn write_line(&mut self, out: &mut dyn Write, text: &str) {
        emit(out, format!("{text}\r\n").as_bytes());
    }

    pub fn clear_screen(&mut self, out: &mut dyn Write) {
        self.panel_visible = false;
        emit(out, b"\x1B[2J\x1B[H");
    }

    /// Shows the full suggestion at the suggestion column and its untyped tail right after the
    /// cursor, leaving the cursor where it was.
    pub fn show_suggestion(&mut self, out: &mut dyn Write, suggestion: &Suggestion) {
        let mut seq = String::new();
        seq.push_str(CLEAR_TO_EOL);
        seq.push_str(SAVE_CURSOR);
        seq.push_str(&format!("\x1B[{}G", self.suggestion_column));
        seq.push_str(&format!(
            "{SUGGESTION_STYLE}[{}]{RESET}{CLEAR_TO_EOL}",
            suggestion.text
        ));
        seq.push_str(RESTORE_CURSOR);
        if !suggestion.suffix.is_empty() {
            seq.push_str(&format!("{SUGGESTION_STYLE}{}{RESET}", suggestion.suffix));
            seq.push_str(&"\x08".repeat(suggestion.suffix.chars().count()));
        }
        emit(out, seq.as_bytes());
    }

    pub fn clear_suggestion(&mut self, out: &mut dyn Write) {
        emit(out, CLEAR_TO_EOL.as_bytes());
    }

    pub fn show_panel(&mut self, out: &mut dyn Write, candidates: &[Candidate], selected: usize) {
        if candidates.is_empty() {
            self.clear_panel(out);
            return;
        }
        let mut seq = String::new();
        // Make sure there are rows below the prompt, scrolling if we're at the bottom.
        seq.push_str(&"\n".repeat(PANEL_HEIGHT));
        seq.push_str(&format!("\x1B[{PANEL_HEIGHT}A"));
        seq.push_str(SAVE_CURSOR);
        push_region_clear(&mut seq);

        let col = self.panel_column();
        let border = "─".repeat(PANEL_INNER_WIDTH);
        push_row(&mut seq, 1, col, &format!("┌{border}┐"));
        let shown = candidates.iter().take(PANEL_ROWS).enumerate();
        let mut row = 2;
        for (i, candidate) in shown {
            let style = if i == selected {
                SELECTED_ROW_STYLE
            } else {
                match candidate.source {
                    Source::Command => COMMAND_ROW_STYLE,
                    Source::History => HISTORY_ROW_STYLE,
                }
            };
            let cell = fit(&candidate.to_string(), PANEL_INNER_WIDTH);
            push_row(&mut seq, row, col, &format!("│{style}{cell}{RESET}│"));
            row += 1;
        }
        push_row(&mut seq, row, col, &format!("└{border}┘"));
        seq.push_str(RESTORE_CURSOR);
        emit(out, seq.as_bytes());
        self.panel_visible = true;
    }

    pub fn clear_panel(&mut self, out: &mut dyn Write) {
        if !self.panel_visible {
            return;
        }
        let mut seq = String::from(SAVE_CURSOR);
        push_region_clear(&mut seq);
        seq.push_str(RESTORE_CURSOR);
        emit(out, seq.as_bytes());
        self.panel_visible = false;
    }
}

fn push_region_clear(seq: &mut String) {
    for row in 1..=PANEL_HEIGHT {
        seq.push_str(&format!("{RESTORE_CURSOR}\x1B[{row}B\r{CLEAR_LINE}"));
    }
}

fn push_row(seq: &mut String, offset: usize, col: usize, text: &str) {
    seq.push_str(&format!("{RESTORE_CURSOR}\x1B[{offset}B\x1B[{col}G{text}"));
}

/// Pads `text` to `width` graphemes, or cuts it short with an ellipsis.
pub fn fit(text: &str, width: usize) -> String {
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() > width {
        let mut cut: String = graphemes[..width.saturating_sub(1)].concat();
        cut.push('…');
        cut
    } else {
        let mut padded = text.to_string();
        padded.push_str(&" ".repeat(width - graphemes.len()));
        padded
    }
}

fn emit(out: &mut dyn Write, bytes: &[u8]) {
    if let Err(e) = out.write_all(bytes).and_then(|_| out.flush()) {
        tracing::debug!(error = %e, "terminal write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::{PANEL_HEIGHT, PANEL_INNER_WIDTH, Renderer, fit};
    use crate::completion::{Candidate, Suggestion};
    use std::io::{self, Write};

    struct BrokenTerminal;

    impl Write for BrokenTerminal {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn text(out: &[u8]) -> String {
        String::from_utf8(out.to_vec()).unwrap()
    }

    #[test]
    fn fit_pads_and_truncates() {
        assert_eq!(fit("ls", 4), "ls  ");
        assert_eq!(fit("abcdef", 4), "abc…");
        assert_eq!(fit("abcd", 4), "abcd");
    }

    #[test]
    fn suggestion_prints_suffix_then_backs_up() {
        let mut renderer = Renderer::new(60, 80);
        let mut out = Vec::new();
        let suggestion = Suggestion {
            text: "git".to_string(),
            suffix: "t".to_string(),
        };
        renderer.show_suggestion(&mut out, &suggestion);
        let out = text(&out);
        assert!(out.starts_with("\x1B[K\x1B7\x1B[60G"));
        assert!(out.contains("[git]"));
        assert!(out.ends_with("\x1B8\x1B[90mt\x1B[0m\x08"));
    }

    #[test]
    fn panel_marks_sources_and_selection() {
        let mut renderer = Renderer::new(60, 80);
        let mut out = Vec::new();
        let candidates = vec![
            Candidate::history("git status"),
            Candidate::command("git"),
            Candidate::command("gitk"),
        ];
        renderer.show_panel(&mut out, &candidates, 1);
        assert!(renderer.panel_visible);
        let out = text(&out);
        assert!(out.starts_with(&"\n".repeat(PANEL_HEIGHT)));
        let cell = |text: &str| fit(text, PANEL_INNER_WIDTH);
        assert!(out.contains(&format!("\x1B[30;46m{}", cell("HIST: git status"))));
        assert!(out.contains(&format!("\x1B[1;97;44m{}", cell("CMD: git"))));
        assert!(out.contains(&format!("\x1B[30;43m{}", cell("CMD: gitk"))));
        assert!(out.ends_with("┘\x1B8"));
    }

    #[test]
    fn panel_shows_at_most_six_rows() {
        let mut renderer = Renderer::new(60, 80);
        let mut out = Vec::new();
        let candidates: Vec<Candidate> =
            (0..8).map(|i| Candidate::command(format!("cmd{i}"))).collect();
        renderer.show_panel(&mut out, &candidates, 0);
        let out = text(&out);
        assert!(out.contains("CMD: cmd5"));
        assert!(!out.contains("CMD: cmd6"));
    }

    #[test]
    fn clear_panel_only_when_drawn() {
        let mut renderer = Renderer::new(60, 80);
        let mut out = Vec::new();
        renderer.clear_panel(&mut out);
        assert!(out.is_empty());
        renderer.show_panel(&mut out, &[Candidate::command("ls")], 0);
        out.clear();
        renderer.clear_panel(&mut out);
        assert!(!out.is_empty());
        assert!(!renderer.panel_visible);
    }

    #[test]
    fn panel_column_follows_width() {
        let mut renderer = Renderer::new(60, 120);
        assert_eq!(renderer.panel_column(), 120 - PANEL_INNER_WIDTH - 3);
        renderer.set_width(20);
        assert_eq!(renderer.panel_column(), 1);
    }

    #[test]
    fn write_errors_are_absorbed() {
        let mut renderer = Renderer::new(60, 80);
        let mut out = BrokenTerminal;
        renderer.redraw_line(&mut out, "> ", "ls");
        renderer.show_panel(&mut out, &[Candidate::command("ls")], 0);
        renderer.write_line(&mut out, "done");
    }
}
