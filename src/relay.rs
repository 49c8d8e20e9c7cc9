//! The relay session: one explicit context that every event is dispatched to.
//!
//! [`Relay`] owns the interpreter, the matcher, the transcript and the child's
//! input stream. The reactor feeds it events from real descriptors; tests feed
//! it the same events with a `Vec<u8>` standing in for the child.

use crate::command::Context;
use crate::interpreter::{Interpreter, InterpreterState};
use crate::listener::parse_trigger;
use crate::matcher::{MatchResult, Matcher};
use crate::store::Store;
use crate::transcript::Transcript;
use std::fmt::Display;
use std::io::{self, Write};
use std::time::Instant;
use tracing::debug;

/// The byte a terminal sends for Ctrl-C.
pub const INTERRUPT: u8 = 0x03;

pub struct Relay<W: Write> {
    child: W,
    store: Store,
    transcript: Transcript,
    interpreter: Interpreter,
    matcher: Matcher,
}

impl<W: Write> Relay<W> {
    pub fn new(child: W, store: Store, transcript: Transcript) -> Self {
        Self {
            child,
            store,
            transcript,
            interpreter: Interpreter::new(),
            matcher: Matcher::new(),
        }
    }

    pub fn child(&self) -> &W {
        &self.child
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn state(&self) -> InterpreterState {
        self.interpreter.state()
    }

    /// When the reactor must call [`on_deadline`](Self::on_deadline).
    pub fn deadline(&self) -> Option<Instant> {
        self.interpreter.deadline()
    }

    /// Keyboard input, forwarded to the child as is.
    pub fn on_input(&mut self, data: &[u8]) -> io::Result<()> {
        self.child.write_all(data)?;
        self.child.flush()
    }

    /// Child output: recorded, then fed to the matcher one byte at a time.
    pub fn on_output(&mut self, data: &[u8]) {
        self.transcript.write(data);
        for &byte in data {
            if self.matcher.push(byte) == MatchResult::Matched {
                let (interpreter, mut ctx) = self.split();
                interpreter.on_match(&mut ctx);
                self.sync_matcher();
            }
        }
    }

    /// A trigger datagram naming a script to load.
    pub fn on_trigger(&mut self, datagram: &[u8]) {
        let name = parse_trigger(datagram);
        debug!(script = %name, "trigger received");
        let (interpreter, mut ctx) = self.split();
        match interpreter.load(&name, &mut ctx) {
            Ok(()) => self.sync_matcher(),
            Err(e) => ctx.report(format_args!("cannot run script {name:?}: {e}")),
        }
    }

    /// The active wait's deadline has passed.
    pub fn on_deadline(&mut self) {
        let (interpreter, mut ctx) = self.split();
        interpreter.on_timeout(&mut ctx);
        self.sync_matcher();
    }

    /// Keyboard interrupt: hand the child a Ctrl-C byte instead of dying.
    pub fn on_interrupt(&mut self) -> io::Result<()> {
        debug!("forwarding interrupt to child");
        self.on_input(&[INTERRUPT])
    }

    pub fn on_log_event(&mut self, event: &notify::Event) {
        self.transcript.on_fs_event(event);
    }

    /// Report a recoverable condition the same way script errors are reported.
    pub fn report(&mut self, message: impl Display) {
        self.split().1.report(message);
    }

    fn split(&mut self) -> (&mut Interpreter, Context<'_>) {
        (
            &mut self.interpreter,
            Context::new(&mut self.child, &self.store, &mut self.transcript),
        )
    }

    /// Point the matcher at whatever the interpreter now waits for.
    fn sync_matcher(&mut self) {
        match self.interpreter.waiting_on() {
            Some(pattern) => self.matcher.arm(pattern),
            None => self.matcher.disarm(),
        }
    }
}
