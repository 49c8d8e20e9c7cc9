//! [`WaitTime`] command: waits for a pattern, with a deadline and a fallback.
//!
//! Script syntax:
//! - `WAIT_TIME 100 ms CONTINUE login:` resumes the script if the deadline passes
//! - `WAIT_TIME 2 s EXIT $ ` ends the script if the deadline passes
//! - `WAIT_TIME 1.5s EXIT ok` joined value and unit

use crate::command::{Context, ScriptCommand, Step};
use crate::interpreter::{TimeoutPolicy, WaitState};
use crate::parser::parse_duration;
use anyhow::{Result, anyhow};
use std::time::{Duration, Instant};

/// Suspends until `pattern` appears or `timeout` elapses, then applies
/// `on_timeout` in the latter case.
pub struct WaitTime {
    pub pattern: String,
    pub timeout: Duration,
    pub on_timeout: TimeoutPolicy,
}

impl WaitTime {
    pub const NAME: &'static str = "WAIT_TIME";
}

/// Split off the first space-delimited word. The remainder starts right after
/// the single separating space.
fn next_word(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start_matches(' ');
    if s.is_empty() {
        return None;
    }
    Some(s.split_once(' ').unwrap_or((s, "")))
}

impl ScriptCommand for WaitTime {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        let (value, rest) = next_word(args)
            .ok_or_else(|| anyhow!("WAIT_TIME needs a duration"))?;

        let (timeout, rest) = match next_word(rest) {
            Some((unit @ ("ms" | "s"), after)) => {
                (parse_duration(&format!("{value}{unit}"))?, after)
            }
            _ => (parse_duration(value)?, rest),
        };

        let (policy, pattern) = next_word(rest)
            .ok_or_else(|| anyhow!("WAIT_TIME needs CONTINUE or EXIT"))?;
        let on_timeout = policy.parse()?;

        if pattern.is_empty() {
            return Err(anyhow!("WAIT_TIME needs a pattern"));
        }

        Ok(Self {
            pattern: pattern.to_string(),
            timeout,
            on_timeout,
        })
    }

    fn execute(&self, _ctx: &mut Context<'_>) -> Result<Step> {
        let deadline = Instant::now()
            .checked_add(self.timeout)
            .ok_or_else(|| anyhow!("timeout {:?} is out of range", self.timeout))?;
        Ok(Step::Suspend(WaitState::timed(
            &self.pattern,
            deadline,
            self.on_timeout,
        )))
    }
}
