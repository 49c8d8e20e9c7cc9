//! The event loop.
//!
//! One task waits on every source at once: keyboard input, child output,
//! trigger datagrams, transcript watch events, SIGINT and the deadline of the
//! active wait. Each event is handed to the [`Relay`]. SIGTERM ends the session
//! like a closed child would, so the terminal is restored on the way out.

use crate::config::Config;
use crate::listener::TriggerListener;
use crate::pty::{PtySession, TerminalGuard, terminal_size};
use crate::pty_reader::spawn_reader;
use crate::relay::Relay;
use crate::store::Store;
use crate::transcript::Transcript;
use anyhow::{Context, Result};
use std::io::Write;
use std::time::Instant;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Run one relay session until the child's output closes or SIGTERM arrives.
///
/// A fatal error is logged before it is returned.
pub async fn run(config: Config) -> Result<()> {
    session(config).await.inspect_err(|e| error!("{e:#}"))
}

async fn session(config: Config) -> Result<()> {
    let mut listener = match config.trigger {
        Some(addr) => Some(TriggerListener::bind(addr).await?),
        None => None,
    };

    let (mut session, (reader, writer)) =
        PtySession::spawn(&config.program, &config.args, terminal_size())?;

    let (log_tx, mut log_rx) = mpsc::unbounded_channel();
    let transcript = match &config.log {
        Some(path) => Transcript::new(path, log_tx),
        None => Transcript::disabled(),
    };
    let mut relay = Relay::new(writer, Store::new(&config.config_dir), transcript);

    // Registering the handler replaces the default disposition, so Ctrl-C no
    // longer kills the relay.
    let mut interrupts =
        signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    let mut terminations =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    let terminal = TerminalGuard::enter()?;
    session.configure_raw()?;

    let mut child_output = spawn_reader(reader);
    let mut keyboard = spawn_reader(std::io::stdin());
    let mut keyboard_open = true;
    let mut stdout = std::io::stdout();

    loop {
        let deadline = relay.deadline();
        tokio::select! {
            chunk = child_output.recv() => {
                let Some(chunk) = chunk else {
                    info!("child output closed");
                    break;
                };
                stdout.write_all(&chunk).context("Failed to write to stdout")?;
                stdout.flush().context("Failed to write to stdout")?;
                relay.on_output(&chunk);
            }

            input = keyboard.recv(), if keyboard_open => match input {
                Some(data) => {
                    if let Err(e) = relay.on_input(&data) {
                        warn!("cannot forward input to child: {e}");
                    }
                }
                None => keyboard_open = false,
            },

            datagram = next_trigger(listener.as_mut()) => {
                let datagram = datagram.context("Trigger socket failed")?;
                relay.on_trigger(&datagram);
            }

            Some(event) = log_rx.recv() => relay.on_log_event(&event),

            () = wait_until(deadline) => relay.on_deadline(),

            _ = interrupts.recv() => {
                if let Err(e) = relay.on_interrupt() {
                    warn!("cannot forward interrupt to child: {e}");
                }
            }

            _ = terminations.recv() => {
                info!("terminated, shutting down");
                break;
            }
        }
    }

    drop(terminal);
    session.reap().await;
    Ok(())
}

async fn next_trigger(listener: Option<&mut TriggerListener>) -> std::io::Result<Vec<u8>> {
    match listener {
        Some(listener) => listener.recv().await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}
