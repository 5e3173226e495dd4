use std::fmt;

use super::lexer::RedirectOp;

/// What the executor runs for one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Command(Command),
    Pipeline(Pipeline),
    Redirect(Redirection),
    Background(Box<Node>),
}

impl Node {
    /// Name shown for the line in job listings.
    pub fn command_name(&self) -> &str {
        match self {
            Node::Command(command) => &command.program,
            Node::Pipeline(pipeline) => pipeline.first().program.as_str(),
            Node::Redirect(redirection) => &redirection.command.program,
            Node::Background(inner) => inner.command_name(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub program: String,
    pub arguments: Vec<String>,
}

impl Command {
    pub fn new(program: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            program: program.into(),
            arguments,
        }
    }

    /// argv as handed to exec: the program name followed by its arguments.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.arguments.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

/// Two or more commands joined by pipes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Command>,
}

impl Pipeline {
    /// Returns `None` for fewer than two stages.
    pub fn new(stages: Vec<Command>) -> Option<Self> {
        if stages.len() < 2 {
            None
        } else {
            Some(Self { stages })
        }
    }

    pub fn stages(&self) -> &[Command] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn first(&self) -> &Command {
        &self.stages[0]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub command: Command,
    pub operator: RedirectOp,
    pub filename: String,
}
