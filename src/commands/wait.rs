//! [`Wait`] command: suspends the script until a pattern shows up.
//!
//! Script syntax: `WAIT login:`

use crate::command::{Context, ScriptCommand, Step};
use crate::interpreter::WaitState;
use anyhow::{Result, anyhow};

/// Suspends the script until `pattern` appears in the program output.
/// There is no timeout.
pub struct Wait {
    pub pattern: String,
}

impl Wait {
    pub const NAME: &'static str = "WAIT";
}

impl ScriptCommand for Wait {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        if args.is_empty() {
            return Err(anyhow!("WAIT needs a pattern"));
        }
        Ok(Self {
            pattern: args.to_string(),
        })
    }

    fn execute(&self, _ctx: &mut Context<'_>) -> Result<Step> {
        Ok(Step::Suspend(WaitState::untimed(&self.pattern)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ScriptCommand;

    #[test]
    fn test_parse_keeps_trailing_space() {
        assert_eq!(Wait::parse("$ ").unwrap().pattern, "$ ");
    }

    #[test]
    fn test_parse_empty() {
        assert!(Wait::parse("").is_err());
    }
}
