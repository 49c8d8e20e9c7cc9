//! # zcra
//!
//! A terminal relay that runs an interactive program inside a PTY, passes
//! keystrokes and output through untouched, and runs small scripts against
//! the program when asked to over UDP.
//!
//! Scripts can type lines, type stored passwords, and wait for text to show
//! up in the program's output before going on. Waits can carry a deadline and
//! a fallback for when it expires.
//!
//! ## Files
//!
//! Everything lives below `~/.config/zcra` (see [`config::default_config_dir`]):
//!
//! | Path | Content |
//! |------|---------|
//! | `scripts/<name>.zcra` | a script |
//! | `passwords/<alias>` | a secret on its first line |
//!
//! Neither may be accessible by group or others; such files are refused.
//! Names containing `/` or `..` are refused before anything is opened.
//!
//! ## Script syntax
//!
//! One instruction per line, leading spaces ignored, `#` starts a comment line.
//!
//! | Instruction | Description |
//! |-------------|-------------|
//! | `TYPE text` | Send `text` and a carriage return |
//! | `PASSWORD alias` | Send the secret stored for `alias` and a carriage return |
//! | `WAIT pattern` | Suspend until `pattern` appears in the output |
//! | `WAIT_TIME 500 ms CONTINUE pattern` | As `WAIT`, resume anyway after 500 ms |
//! | `WAIT_TIME 2 s EXIT pattern` | As `WAIT`, end the script after 2 s |
//!
//! A pattern is matched against the output seen since the wait started or
//! since the last newline, whichever is later.
//!
//! ## Triggers
//!
//! With `--id N` the relay listens on UDP port `40000 + N`. The first line of
//! each datagram is the name of the script to run:
//!
//! ```text
//! echo login | nc -u -q0 127.0.0.1 40001
//! ```
//!
//! ## Driving a relay without a terminal
//!
//! [`Relay`] holds all session state and accepts the same events the reactor
//! produces, so any [`std::io::Write`] can stand in for the child:
//!
//! ```no_run
//! use zcra::{Relay, Store, Transcript};
//!
//! let store = Store::new("/home/me/.config/zcra");
//! let mut relay = Relay::new(Vec::new(), store, Transcript::disabled());
//! relay.on_trigger(b"login\n");
//! relay.on_output(b"Password: ");
//! println!("{:?}", relay.child());
//! ```

pub mod command;
pub mod commands;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod listener;
pub mod matcher;
pub mod parser;
pub(crate) mod pty;
pub(crate) mod pty_reader;
pub mod reactor;
pub mod relay;
pub mod store;
pub mod transcript;

pub use command::{Context, Instruction, ScriptCommand, Step};
pub use commands::{Password, TypeText, Wait, WaitTime};
pub use config::Config;
pub use error::{InterpreterError, StoreError};
pub use interpreter::{Interpreter, InterpreterState, Script, TimeoutPolicy, WaitState};
pub use matcher::{MatchBuffer, MatchResult, Matcher};
pub use parser::parse_line;
pub use reactor::run;
pub use relay::Relay;
pub use store::Store;
pub use transcript::Transcript;
