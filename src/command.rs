//! Command arrays sent to the service

use serde::Serialize;

/// One remote command: the command name followed by its arguments.
///
/// Serializes as a flat JSON array of strings, which is the body format
/// the REST API expects on the write path.
///
/// ```
/// use kv_rest_client::Command;
///
/// let cmd = Command::new("set").arg("greeting").arg("hello").arg("ex").arg(60);
/// assert_eq!(cmd.parts(), ["set", "greeting", "hello", "ex", "60"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Command {
    parts: Vec<String>,
}

impl Command {
    /// Start a command with the given name
    pub fn new(name: &str) -> Self {
        Self {
            parts: vec![name.to_string()],
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl ToString) -> Self {
        self.parts.push(arg.to_string());
        self
    }

    /// Append several arguments
    pub fn args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        self.parts.extend(args.into_iter().map(|a| a.to_string()));
        self
    }

    /// The command name
    pub fn name(&self) -> &str {
        &self.parts[0]
    }

    /// Name and arguments, in order
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Consume the command, returning name and arguments
    pub fn into_parts(self) -> Vec<String> {
        self.parts
    }
}
