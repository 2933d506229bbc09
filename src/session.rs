use crate::{
    builtins::{self, Builtin},
    completion::{CompletionEngine, CompletionState, Suggestion, inline_suggestion},
    decoder::{Decoder, Key, trailing_ctrl_arrow},
    executor::Executor,
    history::HistoryStore,
    line_buffer::LineBuffer,
    render::Renderer,
    search::SearchSession,
};
use anyhow::{Context, Result, anyhow};
use std::{env, io::Write, path::PathBuf};

pub const BANNER: &str = "ghostline (type 'help' for commands, 'exit' to quit)";

/// Ctrl+S steps back through search matches.
const SEARCH_PREVIOUS: u8 = 0x13;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Exit,
}

pub struct Session<E: Executor> {
    prompt: String,
    decoder: Decoder,
    buffer: LineBuffer,
    history: HistoryStore,
    search: SearchSession,
    /// What was typed before reverse search started, restored on abort.
    saved_line: String,
    engine: CompletionEngine,
    completion: CompletionState,
    renderer: Renderer,
    executor: E,
}

impl<E: Executor> Session<E> {
    pub fn new(
        prompt: impl Into<String>,
        history: HistoryStore,
        engine: CompletionEngine,
        renderer: Renderer,
        executor: E,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            decoder: Decoder::new(),
            buffer: LineBuffer::new(),
            history,
            search: SearchSession::new(),
            saved_line: String::new(),
            engine,
            completion: CompletionState::default(),
            renderer,
            executor,
        }
    }

    pub fn buffer(&self) -> &str {
        self.buffer.contents()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn completion(&self) -> &CompletionState {
        &self.completion
    }

    pub fn is_searching(&self) -> bool {
        self.search.is_active()
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    pub fn start(&mut self, out: &mut dyn Write) {
        self.renderer.clear_screen(out);
        self.renderer.write_line(out, BANNER);
        self.renderer.write_line(out, "");
    }

    pub fn notice(&mut self, out: &mut dyn Write, text: &str) {
        self.renderer.write_line(out, text);
    }

    pub fn show_prompt(&mut self, out: &mut dyn Write) {
        self.renderer.prompt(out, &self.prompt);
    }

    pub fn handle_bytes(&mut self, bytes: &[u8], out: &mut dyn Write) -> Outcome {
        for &b in bytes {
            let Some(key) = self.decoder.feed(b) else {
                continue;
            };
            if self.handle_key(key, out) == Outcome::Exit {
                return Outcome::Exit;
            }
        }
        Outcome::Continue
    }

    pub fn handle_key(&mut self, key: Key, out: &mut dyn Write) -> Outcome {
        if self.search.is_active() {
            self.handle_search_key(key, out)
        } else {
            self.handle_edit_key(key, out)
        }
    }

    fn handle_edit_key(&mut self, key: Key, out: &mut dyn Write) -> Outcome {
        if let Key::Char(_) | Key::Other(_) = key {
            if let Some(ctrl) = trailing_ctrl_arrow(self.buffer.contents()) {
                let tail = if ctrl == Key::CtrlUp { "5A" } else { "5B" };
                self.buffer.strip_suffix(tail);
                self.completion.clear();
                self.renderer.redraw_line(out, &self.prompt, self.buffer.contents());
                self.navigate_panel(ctrl == Key::CtrlDown, out);
                return Outcome::Continue;
            }
        }

        match key {
            Key::Char(b) => self.insert(b, out),
            Key::Backspace => self.backspace(out),
            Key::Tab => {
                if self.completion.is_empty() {
                    self.refresh_completions(out);
                } else {
                    self.accept_selected(out);
                }
            }
            Key::Right => self.accept_selected(out),
            Key::Up => {
                if self.completion.is_empty() {
                    self.recall(false, out);
                } else {
                    self.completion.select_previous();
                    self.draw_panel(out);
                }
            }
            Key::Down => {
                if self.completion.is_empty() {
                    self.recall(true, out);
                } else {
                    self.completion.select_next();
                    self.draw_panel(out);
                }
            }
            Key::CtrlUp => self.navigate_panel(false, out),
            Key::CtrlDown => self.navigate_panel(true, out),
            Key::CtrlR => self.start_search(out),
            Key::Enter => return self.commit(out),
            Key::Escape | Key::Other(_) => {}
        }
        Outcome::Continue
    }

    fn handle_search_key(&mut self, key: Key, out: &mut dyn Write) -> Outcome {
        let preview = match key {
            Key::Char(b) => self
                .search
                .push_char(b as char, self.history.entries())
                .map(str::to_string),
            Key::Backspace => self
                .search
                .pop_char(self.history.entries())
                .map(str::to_string),
            Key::Tab => self.search.next().map(str::to_string),
            Key::Other(SEARCH_PREVIOUS) => self.search.previous().map(str::to_string),
            Key::Enter => {
                self.finish_search();
                return self.commit(out);
            }
            Key::Escape | Key::CtrlR => {
                self.finish_search();
                let saved = std::mem::take(&mut self.saved_line);
                self.buffer.replace(&saved);
                self.redraw_with_suggestion(out);
                return Outcome::Continue;
            }
            _ => return Outcome::Continue,
        };
        if let Some(preview) = preview {
            self.buffer.replace(&preview);
        }
        let prompt = self.search.prompt();
        self.renderer.redraw_line(out, &prompt, self.buffer.contents());
        Outcome::Continue
    }

    fn start_search(&mut self, out: &mut dyn Write) {
        self.saved_line = self.buffer.contents().to_string();
        self.search.start();
        self.decoder.set_bare_escape(true);
        self.completion.clear();
        self.renderer.clear_panel(out);
        let prompt = self.search.prompt();
        self.renderer.redraw_line(out, &prompt, self.buffer.contents());
    }

    fn finish_search(&mut self) {
        self.search.exit();
        self.decoder.set_bare_escape(false);
    }

    fn insert(&mut self, byte: u8, out: &mut dyn Write) {
        if !self.buffer.append(byte) {
            return;
        }
        self.renderer.echo(out, byte);
        self.history.reset_navigation();
        self.refresh_completions(out);
    }

    fn backspace(&mut self, out: &mut dyn Write) {
        self.renderer.clear_panel(out);
        if !self.buffer.delete_last() {
            self.completion.clear();
            return;
        }
        self.renderer.erase_last(out);
        self.refresh_completions(out);
    }

    /// Steps through history, replacing the line when there's an entry to show.
    fn recall(&mut self, forward: bool, out: &mut dyn Write) {
        let entry = if forward {
            self.history.next()
        } else {
            self.history.previous()
        };
        let Some(entry) = entry.map(str::to_string) else {
            return;
        };
        self.buffer.replace(&entry);
        self.redraw_with_suggestion(out);
    }

    /// Redraws a line that was replaced wholesale. The dropdown is dropped until asked for.
    fn redraw_with_suggestion(&mut self, out: &mut dyn Write) {
        self.completion.clear();
        self.renderer.clear_panel(out);
        self.renderer.redraw_line(out, &self.prompt, self.buffer.contents());
        let candidates = self
            .engine
            .complete(self.buffer.contents(), self.history.entries());
        let suggestion = inline_suggestion(self.buffer.contents(), &candidates);
        self.draw_suggestion(suggestion, out);
    }

    fn refresh_completions(&mut self, out: &mut dyn Write) {
        let candidates = self
            .engine
            .complete(self.buffer.contents(), self.history.entries());
        self.completion.set(candidates);
        self.draw_panel(out);
        let suggestion = inline_suggestion(self.buffer.contents(), self.completion.candidates());
        self.draw_suggestion(suggestion, out);
    }

    fn draw_panel(&mut self, out: &mut dyn Write) {
        self.renderer.show_panel(
            out,
            self.completion.candidates(),
            self.completion.selected_index(),
        );
    }

    fn draw_suggestion(&mut self, suggestion: Option<Suggestion>, out: &mut dyn Write) {
        match suggestion {
            Some(suggestion) => self.renderer.show_suggestion(out, &suggestion),
            None => self.renderer.clear_suggestion(out),
        }
    }

    fn navigate_panel(&mut self, forward: bool, out: &mut dyn Write) {
        if self.completion.is_empty() {
            let candidates = self
                .engine
                .complete(self.buffer.contents(), self.history.entries());
            self.completion.set(candidates);
            if self.completion.is_empty() {
                return;
            }
        }
        if forward {
            self.completion.select_next();
        } else {
            self.completion.select_previous();
        }
        self.draw_panel(out);
    }

    fn accept_selected(&mut self, out: &mut dyn Write) {
        let Some(selected) = self.completion.selected() else {
            return;
        };
        let mut text = selected.text.clone();
        // A bare command name is ready for its first argument.
        if !text.contains(' ') {
            text.push(' ');
        }
        self.buffer.replace(&text);
        self.renderer.clear_panel(out);
        self.renderer.redraw_line(out, &self.prompt, self.buffer.contents());
        self.refresh_completions(out);
    }

    fn commit(&mut self, out: &mut dyn Write) -> Outcome {
        self.renderer.clear_panel(out);
        self.renderer.clear_suggestion(out);
        self.completion.clear();
        self.renderer.newline(out);
        self.history.reset_navigation();

        let line = self.buffer.contents().to_string();
        self.buffer.reset();
        if !line.is_empty() && self.run_line(&line, out) == Outcome::Exit {
            return Outcome::Exit;
        }
        self.renderer.prompt(out, &self.prompt);
        Outcome::Continue
    }

    fn run_line(&mut self, line: &str, out: &mut dyn Write) -> Outcome {
        if let Err(e) = self.history.add(line) {
            tracing::warn!(error = %format!("{e:#}"), "cannot save history");
            self.renderer.write_line(out, &format!("Error saving history: {e:#}"));
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some((&program, args)) = fields.split_first() else {
            return Outcome::Continue;
        };
        match Builtin::lookup(program) {
            Some(Builtin::Exit | Builtin::Quit) => return Outcome::Exit,
            Some(Builtin::Clear) => self.renderer.clear_screen(out),
            Some(Builtin::Help) => {
                for help_line in builtins::help_lines() {
                    self.renderer.write_line(out, &help_line);
                }
            }
            Some(Builtin::Cd) => {
                if let Err(e) = change_dir(args.first().copied()) {
                    self.renderer.write_line(out, &format!("Error: {e:#}"));
                }
            }
            None => {
                let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
                if let Err(e) = self.executor.execute(program, &args, out) {
                    tracing::warn!(program, error = %format!("{e:#}"), "command failed");
                    self.renderer.write_line(out, &format!("Error: {e:#}"));
                }
            }
        }
        Outcome::Continue
    }
}

fn change_dir(target: Option<&str>) -> Result<()> {
    let home = || dirs::home_dir().ok_or_else(|| anyhow!("cannot find home directory"));
    let dir = match target {
        None | Some("~") => home()?,
        Some(path) => match path.strip_prefix("~/") {
            Some(rest) => home()?.join(rest),
            None => PathBuf::from(path),
        },
    };
    env::set_current_dir(&dir).with_context(|| format!("cd {}", dir.display()))
}
