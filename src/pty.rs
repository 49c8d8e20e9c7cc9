use anyhow::{Context, Result, anyhow};
use nix::sys::termios::{
    self, InputFlags, LocalFlags, OutputFlags, SetArg, SpecialCharacterIndices, Termios,
};
use portable_pty::{Child, CommandBuilder, MasterPty, PtySize};
use std::io::{Read, Write};
use std::os::fd::BorrowedFd;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Reader and writer halves of the pty master, handed out by [`PtySession::spawn`].
pub type PtyStreams = (Box<dyn Read + Send>, Box<dyn Write + Send>);

/// Manages a program running inside a PTY
pub struct PtySession {
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
}

impl PtySession {
    /// Spawn `program` in a new PTY, returning the session and the master's
    /// reader and writer separately
    pub fn spawn(program: &str, args: &[String], size: PtySize) -> Result<(Self, PtyStreams)> {
        let executable = resolve_executable(program)?;
        let pty_system = portable_pty::native_pty_system();

        let pair = pty_system.openpty(size).context("Failed to open PTY")?;

        let mut cmd = CommandBuilder::new(&executable);
        cmd.args(args);
        if let Ok(cwd) = std::env::current_dir() {
            cmd.cwd(cwd);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("Failed to spawn {}", executable.display()))?;
        drop(pair.slave);

        let writer = pair
            .master
            .take_writer()
            .context("Failed to get PTY writer")?;

        let reader = pair
            .master
            .try_clone_reader()
            .context("Failed to get PTY reader")?;

        info!(
            program = %executable.display(),
            pid = child.process_id(),
            "child started"
        );

        let session = PtySession {
            master: pair.master,
            child,
        };

        Ok((session, (reader, writer)))
    }

    /// Put the pty line discipline into byte-at-a-time mode with no output
    /// post-processing and no signal generation.
    pub fn configure_raw(&self) -> Result<()> {
        let Some(fd) = self.master.as_raw_fd() else {
            return Ok(());
        };
        // SAFETY: the descriptor is owned by `self.master`, which outlives this borrow.
        let fd = unsafe { BorrowedFd::borrow_raw(fd) };

        let mut attrs = termios::tcgetattr(fd).context("Failed to read PTY attributes")?;
        attrs.output_flags.remove(OutputFlags::OPOST);
        attrs.local_flags.remove(LocalFlags::ISIG);
        attrs
            .input_flags
            .remove(InputFlags::INLCR | InputFlags::IGNCR);
        attrs.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        attrs.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        termios::tcsetattr(fd, SetArg::TCSANOW, &attrs).context("Failed to configure PTY")?;
        Ok(())
    }

    pub fn process_id(&self) -> Option<u32> {
        self.child.process_id()
    }

    /// Collect the child's exit status once its output has closed.
    ///
    /// Gives up after a short grace period if the child keeps running.
    pub async fn reap(&mut self) {
        for _ in 0..50 {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    info!(code = status.exit_code(), "child exited");
                    return;
                }
                Ok(None) => tokio::time::sleep(Duration::from_millis(10)).await,
                Err(e) => {
                    warn!("cannot collect child status: {e}");
                    return;
                }
            }
        }
        debug!(pid = self.process_id(), "child still running after its output closed");
    }
}

/// Raw mode for the controlling terminal, undone exactly once on drop.
///
/// Canonical mode and echo are switched off so every keystroke reaches the
/// child immediately. Output post-processing and Ctrl-C signal generation stay
/// on: the relay's own SIGINT handling forwards the interrupt to the child.
pub struct TerminalGuard {
    saved: Termios,
}

impl TerminalGuard {
    /// Switch stdin to raw mode. Returns `None` when stdin is not a terminal.
    pub fn enter() -> Result<Option<Self>> {
        let saved = match termios::tcgetattr(std::io::stdin()) {
            Ok(attrs) => attrs,
            Err(e) => {
                debug!("stdin is not a terminal ({e}), leaving its mode alone");
                return Ok(None);
            }
        };

        let mut raw = saved.clone();
        raw.local_flags.remove(
            LocalFlags::ICANON | LocalFlags::ECHO | LocalFlags::ECHONL | LocalFlags::IEXTEN,
        );
        raw.input_flags.remove(InputFlags::IXON);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        // Only Ctrl-C may signal the relay; Ctrl-\ and Ctrl-Z go to the child as bytes.
        raw.control_chars[SpecialCharacterIndices::VQUIT as usize] = 0;
        raw.control_chars[SpecialCharacterIndices::VSUSP as usize] = 0;

        termios::tcsetattr(std::io::stdin(), SetArg::TCSANOW, &raw)
            .context("Failed to set terminal raw mode")?;
        Ok(Some(Self { saved }))
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = termios::tcsetattr(std::io::stdin(), SetArg::TCSANOW, &self.saved) {
            warn!("Failed to restore terminal mode: {e}");
        } else {
            debug!("terminal mode restored");
        }
    }
}

/// Size of the controlling terminal, or 80x24 when there is none.
pub fn terminal_size() -> PtySize {
    let (cols, rows) = crossterm::terminal::size().unwrap_or((80, 24));
    PtySize {
        rows,
        cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

/// Locate `program`: paths containing `/` are taken as given, bare names are
/// looked up in `PATH`.
pub fn resolve_executable(program: &str) -> Result<PathBuf> {
    if program.contains('/') {
        let path = PathBuf::from(program);
        return if is_executable(&path) {
            Ok(path)
        } else {
            Err(anyhow!("{program}: not an executable file"))
        };
    }
    let search = std::env::var_os("PATH").ok_or_else(|| anyhow!("PATH is not set"))?;
    std::env::split_paths(&search)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
        .ok_or_else(|| anyhow!("{program}: command not found"))
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_from_path() {
        let sh = resolve_executable("sh").unwrap();
        assert!(sh.is_absolute());
        assert!(sh.ends_with("sh"));
    }

    #[test]
    fn test_resolve_explicit_path() {
        assert_eq!(
            resolve_executable("/bin/sh").unwrap(),
            PathBuf::from("/bin/sh")
        );
    }

    #[test]
    fn test_resolve_missing() {
        assert!(resolve_executable("definitely-not-a-real-program-zcra").is_err());
        assert!(resolve_executable("/nonexistent/prog").is_err());
    }

    #[test]
    fn test_non_executable_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script");
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(resolve_executable(path.to_str().unwrap()).is_err());
    }

    #[tokio::test]
    async fn test_spawn_and_read_output() {
        let size = PtySize {
            rows: 24,
            cols: 80,
            pixel_width: 0,
            pixel_height: 0,
        };
        let (mut session, (mut reader, _writer)) =
            PtySession::spawn("sh", &["-c".into(), "printf ready".into()], size).unwrap();
        session.configure_raw().unwrap();

        let output = tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            let mut buf = [0u8; 256];
            while let Ok(n) = reader.read(&mut buf) {
                if n == 0 {
                    break;
                }
                out.extend_from_slice(&buf[..n]);
            }
            out
        })
        .await
        .unwrap();

        assert!(String::from_utf8_lossy(&output).contains("ready"));
        session.reap().await;
    }
}
