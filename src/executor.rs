use anyhow::{Context, Result, bail};
use std::io::{Read, Write};
use std::process::{Command, Stdio};

/// Runs committed command lines that aren't builtins.
pub trait Executor {
    fn execute(&mut self, program: &str, args: &[String], out: &mut dyn Write) -> Result<()>;
}

/// Spawns the program as a child process and streams its standard output.
#[derive(Debug, Default)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    fn execute(&mut self, program: &str, args: &[String], out: &mut dyn Write) -> Result<()> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("run {}", program))?;
        let mut stdout = child.stdout.take().context("capture child stdout")?;

        if let Err(e) = stream(&mut stdout, out) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }

        let status = child.wait().context("wait for child")?;
        if !status.success() {
            bail!("{} exited with {}", program, status);
        }
        Ok(())
    }
}

fn stream(from: &mut impl Read, out: &mut dyn Write) -> Result<()> {
    let mut buf = [0; 8192];
    loop {
        let n = from.read(&mut buf).context("read child output")?;
        if n == 0 {
            return Ok(());
        }
        out.write_all(&crlf(&buf[..n])).context("write child output")?;
        out.flush().context("flush child output")?;
    }
}

/// Output processing is off in raw mode, so a bare `\n` wouldn't return the carriage.
pub fn crlf(bytes: &[u8]) -> Vec<u8> {
    let mut converted = Vec::with_capacity(bytes.len());
    for &b in bytes {
        if b == b'\n' {
            converted.push(b'\r');
        }
        converted.push(b);
    }
    converted
}

#[cfg(test)]
mod tests {
    use super::{Executor, ProcessExecutor, crlf};
    use std::io::{self, Write};

    struct ClosedTerminal;

    impl Write for ClosedTerminal {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn crlf_rewrites_line_feeds() {
        assert_eq!(crlf(b"a\nb\n"), b"a\r\nb\r\n");
        assert_eq!(crlf(b"none"), b"none");
    }

    #[test]
    fn streams_child_output_with_crlf() {
        let mut out = Vec::new();
        ProcessExecutor
            .execute("printf", &["one\\ntwo\\n".to_string()], &mut out)
            .unwrap();
        assert_eq!(out, b"one\r\ntwo\r\n");
    }

    #[test]
    fn missing_program_is_an_error() {
        let mut out = Vec::new();
        let err = ProcessExecutor
            .execute("definitely-not-a-real-program", &[], &mut out)
            .unwrap_err();
        assert!(err.to_string().contains("definitely-not-a-real-program"));
    }

    #[test]
    fn failing_status_is_an_error() {
        let mut out = Vec::new();
        assert!(ProcessExecutor.execute("false", &[], &mut out).is_err());
    }

    #[test]
    fn output_failure_stops_the_child() {
        // `yes` never exits on its own, so this only returns if the child is killed and reaped.
        let err = ProcessExecutor
            .execute("yes", &[], &mut ClosedTerminal)
            .unwrap_err();
        assert!(format!("{err:#}").contains("write child output"));
    }
}
