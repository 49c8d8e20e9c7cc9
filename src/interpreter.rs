//! Resumable script interpreter.
//!
//! A loaded script is consumed line by line until an instruction suspends it
//! on a [`WaitState`]. The relay resumes it through [`Interpreter::on_match`]
//! or [`Interpreter::on_timeout`]. Once the last line has run the script
//! buffer is dropped and the interpreter is idle again.

use crate::command::{Context, Step};
use crate::error::InterpreterError;
use crate::parser::parse_line;
use std::ops::Range;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info};

/// What to do when a timed wait expires without a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// Resume the script with the next line.
    Continue,
    /// Terminate the script.
    Exit,
}

impl FromStr for TimeoutPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONTINUE" => Ok(Self::Continue),
            "EXIT" => Ok(Self::Exit),
            other => Err(anyhow::anyhow!(
                "expected CONTINUE or EXIT, got {other:?}"
            )),
        }
    }
}

/// The suspension record of a waiting script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitState {
    pub pattern: String,
    pub deadline: Option<Instant>,
    pub on_timeout: TimeoutPolicy,
}

impl WaitState {
    pub fn untimed(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            deadline: None,
            on_timeout: TimeoutPolicy::Continue,
        }
    }

    pub fn timed(
        pattern: impl Into<String>,
        deadline: Instant,
        on_timeout: TimeoutPolicy,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            deadline: Some(deadline),
            on_timeout,
        }
    }
}

/// A script held in memory with a cursor on the next unconsumed line.
#[derive(Debug)]
pub struct Script {
    name: String,
    text: String,
    cursor: usize,
    line_no: usize,
}

impl Script {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            cursor: 0,
            line_no: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.text.len()
    }

    /// Move past the next line and return its number and byte range.
    fn advance(&mut self) -> Option<(usize, Range<usize>)> {
        if self.is_exhausted() {
            return None;
        }
        let start = self.cursor;
        let end = self.text[start..]
            .find('\n')
            .map_or(self.text.len(), |i| start + i);
        self.cursor = (end + 1).min(self.text.len());
        self.line_no += 1;
        Some((self.line_no, start..end))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterState {
    Idle,
    Running,
    Waiting,
}

/// Holds at most one script and at most one wait.
#[derive(Debug, Default)]
pub struct Interpreter {
    script: Option<Script>,
    wait: Option<WaitState>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InterpreterState {
        match (&self.script, &self.wait) {
            (None, _) => InterpreterState::Idle,
            (Some(_), Some(_)) => InterpreterState::Waiting,
            (Some(_), None) => InterpreterState::Running,
        }
    }

    pub fn wait_state(&self) -> Option<&WaitState> {
        self.wait.as_ref()
    }

    /// The pattern the active wait is looking for.
    pub fn waiting_on(&self) -> Option<&str> {
        self.wait.as_ref().map(|w| w.pattern.as_str())
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.wait.as_ref().and_then(|w| w.deadline)
    }

    pub fn script(&self) -> Option<&Script> {
        self.script.as_ref()
    }

    /// Load the script called `name` from the store and run it up to its
    /// first wait.
    ///
    /// Rejected with [`InterpreterError::Busy`] while another script waits;
    /// the pending wait is left untouched.
    pub fn load(&mut self, name: &str, ctx: &mut Context<'_>) -> Result<(), InterpreterError> {
        if let Some(active) = &self.script {
            return Err(InterpreterError::Busy(active.name.clone()));
        }
        let text = ctx.store().load_script(name)?;
        info!(script = name, "script loaded");
        self.start(Script::new(name, text), ctx);
        Ok(())
    }

    fn start(&mut self, script: Script, ctx: &mut Context<'_>) {
        self.script = Some(script);
        self.wait = None;
        self.resume(ctx);
    }

    /// Consume lines from the cursor until a wait suspends the script or the
    /// script is exhausted.
    pub fn resume(&mut self, ctx: &mut Context<'_>) {
        while self.wait.is_none() {
            let Some(script) = self.script.as_mut() else {
                return;
            };
            let Some((line_no, range)) = script.advance() else {
                self.finish();
                return;
            };

            let line = script.text[range].trim_start_matches(' ');
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let instruction = match parse_line(line) {
                Ok(instruction) => instruction,
                Err(e) => {
                    ctx.report(format_args!("{}:{line_no}: {e:#}", script.name));
                    continue;
                }
            };

            match instruction.execute(ctx) {
                Ok(Step::Next) => {}
                Ok(Step::Suspend(wait)) => {
                    debug!(
                        script = %script.name,
                        line = line_no,
                        pattern = %wait.pattern,
                        timed = wait.deadline.is_some(),
                        "script waiting"
                    );
                    self.wait = Some(wait);
                }
                Err(e) => {
                    ctx.report(format_args!(
                        "{}:{line_no}: {} failed: {e:#}",
                        script.name,
                        instruction.name()
                    ));
                }
            }
        }
    }

    /// The pattern of the active wait was seen.
    pub fn on_match(&mut self, ctx: &mut Context<'_>) {
        if self.wait.take().is_some() {
            debug!("wait satisfied");
            self.resume(ctx);
        }
    }

    /// The deadline of the active wait elapsed. Untimed waits are unaffected.
    pub fn on_timeout(&mut self, ctx: &mut Context<'_>) {
        let Some(wait) = self.wait.take_if(|w| w.deadline.is_some()) else {
            return;
        };
        match wait.on_timeout {
            TimeoutPolicy::Continue => {
                debug!(pattern = %wait.pattern, "wait timed out, continuing");
                self.resume(ctx);
            }
            TimeoutPolicy::Exit => {
                info!(pattern = %wait.pattern, "wait timed out, ending script");
                self.finish();
            }
        }
    }

    fn finish(&mut self) {
        if let Some(script) = self.script.take() {
            info!(script = %script.name, "script finished");
        }
        self.wait = None;
    }
}
