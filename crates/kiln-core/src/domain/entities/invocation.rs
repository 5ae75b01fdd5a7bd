use serde::Serialize;
use std::fmt;

/// An external program call, kept as an argument vector.
///
/// `tool` names the logical tool for error reports (`ruff`, `pytest`); the
/// process actually spawned is `program` (usually the package manager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInvocation {
    pub tool: String,
    pub program: String,
    pub args: Vec<String>,
}

impl ToolInvocation {
    pub fn new(tool: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_as_command_line() {
        let inv = ToolInvocation::new("ruff", "uv")
            .args(["run", "ruff"])
            .arg("check");
        assert_eq!(inv.to_string(), "uv run ruff check");
        assert_eq!(inv.tool, "ruff");
    }
}
