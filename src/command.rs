//! The [`ScriptCommand`] trait and the [`Context`] type commands receive when executed.

use crate::interpreter::WaitState;
use crate::store::Store;
use crate::transcript::Transcript;
use anyhow::Result;
use std::fmt::Display;
use std::io::Write;
use tracing::warn;

/// Execution context passed to [`ScriptCommand::execute`].
///
/// Borrows the child's input stream, the script/password store and the
/// transcript for the duration of one interpreter step.
pub struct Context<'a> {
    pub(crate) child: &'a mut dyn Write,
    pub(crate) store: &'a Store,
    pub(crate) transcript: &'a mut Transcript,
}

impl<'a> Context<'a> {
    pub fn new(
        child: &'a mut dyn Write,
        store: &'a Store,
        transcript: &'a mut Transcript,
    ) -> Self {
        Self {
            child,
            store,
            transcript,
        }
    }

    /// Write raw bytes to the program's stdin, unbuffered.
    pub fn write_to_child(&mut self, data: &[u8]) -> Result<()> {
        self.child.write_all(data)?;
        self.child.flush()?;
        Ok(())
    }

    pub fn store(&self) -> &Store {
        self.store
    }

    /// Surface a recoverable condition without interrupting the relay.
    ///
    /// The message is emitted as a warning and mirrored into the transcript
    /// when logging is enabled.
    pub fn report(&mut self, message: impl Display) {
        warn!("{message}");
        self.transcript.write(format!("zcra: {message}\n").as_bytes());
    }
}

/// What the interpreter does after a command ran.
#[derive(Debug)]
pub enum Step {
    /// Go on with the next line.
    Next,
    /// Suspend until the wait is satisfied or times out.
    Suspend(WaitState),
}

/// One instruction kind of the script language.
///
/// To add an instruction:
///
/// 1. Define `pub const NAME: &'static str` on your struct (the line keyword,
///    e.g. `"TYPE"`).
/// 2. Re-export the struct from `src/commands/mod.rs`.
/// 3. Add one entry to the `REGISTRY` in [`crate::parser`]:
///    `(MyCmd::NAME, MyCmd::parse_boxed)`.
pub trait ScriptCommand: 'static {
    /// The keyword, accessible at runtime through a trait object.
    fn name(&self) -> &'static str;

    /// Parse this command from everything after the keyword on the line.
    fn parse(args: &str) -> Result<Self>
    where
        Self: Sized;

    /// Parse and box this command. Used as the function-pointer type stored
    /// in the registry.
    fn parse_boxed(args: &str) -> Result<Box<dyn ScriptCommand>>
    where
        Self: Sized,
    {
        Ok(Box::new(Self::parse(args)?))
    }

    /// Run the command. Errors abort only this instruction.
    fn execute(&self, ctx: &mut Context<'_>) -> Result<Step>;
}

/// A parsed script line.
pub type Instruction = Box<dyn ScriptCommand>;
