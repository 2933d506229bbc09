use phf::phf_map;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Builtin {
    Cd,
    Clear,
    Exit,
    Help,
    Quit,
}

pub static BUILTINS: phf::Map<&'static str, Builtin> = phf_map! {
    "cd" => Builtin::Cd,
    "clear" => Builtin::Clear,
    "exit" => Builtin::Exit,
    "help" => Builtin::Help,
    "quit" => Builtin::Quit,
};

impl Builtin {
    pub fn lookup(name: &str) -> Option<Builtin> {
        BUILTINS.get(name).copied()
    }

    pub fn help_text(&self) -> &'static str {
        match self {
            Builtin::Cd => "Change the working directory",
            Builtin::Clear => "Clear the screen",
            Builtin::Exit => "Exit the terminal",
            Builtin::Help => "Show this help message",
            Builtin::Quit => "Same as exit",
        }
    }
}

/// Lines printed by the `help` builtin.
pub fn help_lines() -> Vec<String> {
    let mut names: Vec<&str> = BUILTINS.keys().copied().collect();
    names.sort_unstable();
    let mut lines = vec!["Available commands:".to_string()];
    for name in names {
        if let Some(builtin) = Builtin::lookup(name) {
            lines.push(format!("  {:<6} - {}", name, builtin.help_text()));
        }
    }
    lines.push(String::new());
    lines.push("Any other input will be executed as a shell command".to_string());
    lines.push(String::new());
    lines
}
