use anyhow::{Context, Result, bail};
use clap::Parser;
use ghostline::{
    completion::CompletionEngine,
    config::{self, Config},
    executor::ProcessExecutor,
    history::HistoryStore,
    render::Renderer,
    session::{Outcome, Session},
    terminal::Terminal,
};
use signal_hook::consts::signal::*;
use signal_hook_mio::v1_0::Signals;
use std::{
    io::{ErrorKind, Read, Write},
    os::fd::AsRawFd,
    path::PathBuf,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// File that past commands are read from and saved to
    #[clap(long, env = "GHOSTLINE_HISTORY")]
    history_file: Option<PathBuf>,
    /// Text shown before the input line
    #[clap(long, env = "GHOSTLINE_PROMPT", default_value = config::DEFAULT_PROMPT)]
    prompt: String,
    /// Write logs here; logging is off without it
    #[clap(long, env = "GHOSTLINE_LOG_FILE")]
    log_file: Option<PathBuf>,
    /// Column where the bracketed suggestion is drawn
    #[clap(long, default_value_t = config::DEFAULT_SUGGESTION_COLUMN)]
    suggestion_column: u16,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            history_path: cli
                .history_file
                .unwrap_or_else(config::default_history_path),
            prompt: cli.prompt,
            suggestion_column: cli.suggestion_column,
            log_file: cli.log_file,
        }
    }
}

fn main() -> Result<()> {
    let config = Config::from(Cli::parse());
    let _log_guard = match &config.log_file {
        Some(path) => Some(init_logging(path)?),
        None => None,
    };
    tracing::info!(
        history = %config.history_path.display(),
        prompt = %config.prompt,
        suggestion_column = config.suggestion_column,
        "starting"
    );

    let mut terminal = Terminal::open().context("set up terminal")?;
    let result = run(&config, &mut terminal);
    terminal.restore()?;
    result
}

fn init_logging(path: &std::path::Path) -> Result<WorkerGuard> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("install log subscriber")?;
    Ok(guard)
}

fn run(config: &Config, terminal: &mut Terminal) -> Result<()> {
    let mut history = HistoryStore::new(config.history_path.clone());
    let load_warning = match history.load() {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "cannot load history");
            Some(format!("Warning: could not load history: {e:#}"))
        }
    };

    let renderer = Renderer::new(config.suggestion_column, Terminal::columns());
    let mut session = Session::new(
        config.prompt.clone(),
        history,
        CompletionEngine::from_env(),
        renderer,
        ProcessExecutor,
    );

    let mut stdout = std::io::stdout().lock();
    session.start(&mut stdout);
    if let Some(warning) = load_warning {
        session.notice(&mut stdout, &warning);
    }
    session.show_prompt(&mut stdout);

    // Signals come through the same poll as keyboard input.
    let mut signals = Signals::new([SIGINT, SIGTERM, SIGWINCH])?;
    const TTY_TOKEN: mio::Token = mio::Token(0);
    const SIGNALS_TOKEN: mio::Token = mio::Token(1);
    let mut poll = mio::Poll::new()?;
    poll.registry().register(
        &mut mio::unix::SourceFd(&terminal.as_raw_fd()),
        TTY_TOKEN,
        mio::Interest::READABLE,
    )?;
    poll.registry()
        .register(&mut signals, SIGNALS_TOKEN, mio::Interest::READABLE)?;

    let mut events = mio::Events::with_capacity(64);
    loop {
        poll.poll(&mut events, None).or_else(|e| {
            if e.kind() == ErrorKind::Interrupted {
                events.clear();
                Ok(())
            } else {
                Err(e)
            }
        })?;

        for event in events.iter() {
            match event.token() {
                TTY_TOKEN => {
                    let mut buf = [0; 8192];
                    let n = match terminal.read(&mut buf) {
                        Ok(0) => return Ok(()),
                        Ok(n) => n,
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(e) => bail!("error reading from terminal: {}", e),
                    };
                    if session.handle_bytes(&buf[..n], &mut stdout) == Outcome::Exit {
                        tracing::info!("exit requested");
                        return Ok(());
                    }
                }
                SIGNALS_TOKEN => {
                    for signal in signals.pending() {
                        match signal {
                            SIGINT | SIGTERM => {
                                tracing::info!(signal, "interrupted");
                                let _ = stdout.write_all(b"\r\n");
                                let _ = stdout.flush();
                                return Ok(());
                            }
                            SIGWINCH => {
                                let cols = Terminal::columns();
                                tracing::info!(cols, "terminal resized");
                                session.renderer_mut().set_width(cols);
                            }
                            _ => unreachable!("unknown signal"),
                        }
                    }
                }
                _ => unreachable!("encountered unknown event"),
            }
        }
    }
}
