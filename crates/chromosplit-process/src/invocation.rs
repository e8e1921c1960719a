//! Argument vectors for external programs.

use std::fmt;
use std::process::Command;

/// A fully resolved argument vector: a program followed by its arguments.
///
/// The program slot is always present, so an `Invocation` can never describe an
/// empty command line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Invocation {
    argv: Vec<String>,
}

impl Invocation {
    /// Starts an invocation of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self { argv: vec![program.into()] }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    /// Appends several arguments in order.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    /// The program to execute.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// The arguments following the program.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.argv[1..]
    }

    /// The complete argv, program first.
    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Creates a [`Command`] for this invocation with default stdio.
    #[must_use]
    pub fn command(&self) -> Command {
        let mut command = Command::new(self.program());
        command.args(self.arguments());
        command
    }
}

impl fmt::Display for Invocation {
    /// Renders the argv as a shell-like line, quoting tokens that contain whitespace.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, token) in self.argv.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            if token.is_empty() || token.chars().any(|c| c.is_whitespace() || c == '\'') {
                write!(f, "'{}'", token.replace('\'', r"'\''"))?;
            } else {
                f.write_str(token)?;
            }
        }
        Ok(())
    }
}
