//! [`TypeText`] command: types a line into the program.
//!
//! Script syntax: `TYPE text here`

use crate::command::{Context, ScriptCommand, Step};
use anyhow::Result;

/// Sends `text` followed by a carriage return, as if typed and submitted.
pub struct TypeText {
    pub data: Vec<u8>,
}

impl TypeText {
    pub const NAME: &'static str = "TYPE";

    /// Create a `TypeText` command. The carriage return is appended here.
    pub fn new(text: impl Into<String>) -> Self {
        let mut bytes = text.into().into_bytes();
        bytes.push(b'\r');
        Self { data: bytes }
    }
}

impl ScriptCommand for TypeText {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        Ok(Self::new(args))
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Result<Step> {
        ctx.write_to_child(&self.data)?;
        Ok(Step::Next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ScriptCommand;

    #[test]
    fn test_parse() {
        let cmd = TypeText::parse("hello world").unwrap();
        assert_eq!(cmd.data, b"hello world\r");
    }

    #[test]
    fn test_text_kept_verbatim() {
        let cmd = TypeText::parse("  ls -la  ").unwrap();
        assert_eq!(cmd.data, b"  ls -la  \r");
    }

    #[test]
    fn test_empty_text_is_bare_return() {
        let cmd = TypeText::parse("").unwrap();
        assert_eq!(cmd.data, b"\r");
    }
}
