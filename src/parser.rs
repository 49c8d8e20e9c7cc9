//! Line parser for the zcra script language.
//!
//! A script is read one line at a time by the interpreter; [`parse_line`]
//! turns a single line into an [`Instruction`].

use crate::command::{Instruction, ScriptCommand};
use crate::commands::{Password, TypeText, Wait, WaitTime};
use anyhow::{Context as _, Result, anyhow};
use std::time::Duration;

type ParseFn = fn(&str) -> Result<Instruction>;

static REGISTRY: &[(&str, ParseFn)] = &[
    (TypeText::NAME, TypeText::parse_boxed),
    (Password::NAME, Password::parse_boxed),
    (Wait::NAME, Wait::parse_boxed),
    (WaitTime::NAME, WaitTime::parse_boxed),
];

/// Dispatch one line (leading spaces already stripped) to the parser of its
/// keyword.
///
/// Unknown keywords are an error naming only the keyword, never the rest of
/// the line.
///
/// # Example
///
/// ```
/// use zcra::parser::parse_line;
///
/// let instruction = parse_line("WAIT_TIME 100 ms CONTINUE login:").unwrap();
/// assert_eq!(instruction.name(), "WAIT_TIME");
/// ```
pub fn parse_line(line: &str) -> Result<Instruction> {
    let (name, args) = line.split_once(' ').unwrap_or((line, ""));
    REGISTRY
        .iter()
        .find(|(cmd_name, _)| *cmd_name == name)
        .map(|(_, parse)| parse(args))
        .unwrap_or_else(|| Err(anyhow!("unrecognized instruction {name:?}")))
}

/// Parse a duration string: `1s`, `500ms`, `1.5s`.
pub(crate) fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if let Some(ms_str) = s.strip_suffix("ms") {
        let ms: u64 = ms_str
            .trim()
            .parse()
            .context("Invalid milliseconds value")?;
        Ok(Duration::from_millis(ms))
    } else if let Some(s_str) = s.strip_suffix('s') {
        let secs: f64 = s_str.trim().parse().context("Invalid seconds value")?;
        Duration::try_from_secs_f64(secs).context("Invalid seconds value")
    } else {
        Err(anyhow!("Duration must end with 's' or 'ms', got: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(
            parse_duration("1.5s").unwrap(),
            Duration::from_secs_f64(1.5)
        );
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("5minutes").is_err());
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("ms").is_err());
    }

    #[test]
    fn test_parse_all_instructions() {
        let lines = [
            "TYPE ssh host",
            "PASSWORD db",
            "WAIT login:",
            "WAIT_TIME 100 ms EXIT $",
        ];
        let names: Vec<_> = lines
            .iter()
            .map(|l| parse_line(l).unwrap().name())
            .collect();
        assert_eq!(names, ["TYPE", "PASSWORD", "WAIT", "WAIT_TIME"]);
    }

    #[test]
    fn test_bare_keyword() {
        assert_eq!(parse_line("TYPE").unwrap().name(), "TYPE");
        assert!(parse_line("WAIT").is_err());
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        assert!(parse_line("type hello").is_err());
    }

    #[test]
    fn test_unknown_instruction_hides_arguments() {
        let err = parse_line("PASWORD hunter2").err().unwrap().to_string();
        assert!(err.contains("PASWORD"), "got: {err}");
        assert!(!err.contains("hunter2"), "got: {err}");
    }
}
