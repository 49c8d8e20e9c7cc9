//! [`Password`] command: types a stored secret into the program.
//!
//! Script syntax: `PASSWORD alias`

use crate::command::{Context, ScriptCommand, Step};
use anyhow::{Context as _, Result, anyhow};
use zeroize::Zeroizing;

/// Reads `passwords/<alias>` from the store and sends it followed by a
/// carriage return. The secret is wiped from memory right after the write.
pub struct Password {
    pub alias: String,
}

impl Password {
    pub const NAME: &'static str = "PASSWORD";
}

impl ScriptCommand for Password {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(args: &str) -> Result<Self> {
        let alias = args.trim();
        if alias.is_empty() {
            return Err(anyhow!("PASSWORD needs an alias"));
        }
        Ok(Self {
            alias: alias.to_string(),
        })
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Result<Step> {
        let secret = ctx
            .store()
            .load_password(&self.alias)
            .with_context(|| format!("password {:?} unavailable", self.alias))?;

        let mut line = Zeroizing::new(Vec::with_capacity(secret.len() + 1));
        line.extend_from_slice(&secret);
        line.push(b'\r');
        drop(secret);

        ctx.write_to_child(&line)?;
        Ok(Step::Next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ScriptCommand;

    #[test]
    fn test_parse() {
        assert_eq!(Password::parse("db").unwrap().alias, "db");
        assert_eq!(Password::parse(" db ").unwrap().alias, "db");
    }

    #[test]
    fn test_parse_missing_alias() {
        assert!(Password::parse("").is_err());
        assert!(Password::parse("   ").is_err());
    }
}
