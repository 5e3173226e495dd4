use std::error::Error;
use std::{fmt, io};

use nix::unistd::Pid;

use super::executor::outcome::STATUS_ERROR;
use super::parser::ParseError;
use super::readline::ReadlineError;

#[derive(Debug)]
pub enum ShellError {
    Parse(ParseError),
    /// A process-creation syscall (fork, pipe, dup2, ...) failed in the shell.
    Spawn {
        action: &'static str,
        command: String,
        source: nix::Error,
    },
    Wait {
        pid: Pid,
        source: nix::Error,
    },
    /// A builtin was misused; the message is shown as-is.
    Builtin(String),
    Io(io::Error),
    Readline(ReadlineError),
}

impl ShellError {
    /// Builds a `map_err` adapter for a failed syscall made on behalf of
    /// `command`.
    pub fn spawn(
        action: &'static str,
        command: impl Into<String>,
    ) -> impl FnOnce(nix::Error) -> ShellError {
        let command = command.into();
        move |source| ShellError::Spawn {
            action,
            command,
            source,
        }
    }

    pub fn builtin(message: impl Into<String>) -> ShellError {
        ShellError::Builtin(message.into())
    }

    pub fn status(&self) -> i32 {
        STATUS_ERROR
    }
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellError::Parse(e) => write!(f, "{}", e),
            ShellError::Spawn {
                action,
                command,
                source,
            } => write!(f, "Error {} for {}. Error#{}", action, command, *source as i32),
            ShellError::Wait { pid, source } => {
                write!(f, "Error in child process {}. Error#{}", pid, *source as i32)
            }
            ShellError::Builtin(message) => write!(f, "{}", message),
            ShellError::Io(e) => write!(f, "IO error: {}", e),
            ShellError::Readline(e) => write!(f, "readline error: {}", e),
        }
    }
}

impl Error for ShellError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ShellError::Parse(e) => Some(e),
            ShellError::Spawn { source, .. } | ShellError::Wait { source, .. } => Some(source),
            ShellError::Builtin(_) => None,
            ShellError::Io(e) => Some(e),
            ShellError::Readline(e) => Some(e),
        }
    }
}

impl From<ParseError> for ShellError {
    fn from(e: ParseError) -> ShellError {
        ShellError::Parse(e)
    }
}

impl From<io::Error> for ShellError {
    fn from(e: io::Error) -> ShellError {
        ShellError::Io(e)
    }
}

impl From<ReadlineError> for ShellError {
    fn from(e: ReadlineError) -> ShellError {
        ShellError::Readline(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::errno::Errno;

    #[test]
    fn test_diagnostics_carry_errno() {
        let fork = ShellError::spawn("forking child", "sleep")(Errno::EAGAIN);
        assert_eq!(fork.to_string(), "Error forking child for sleep. Error#11");

        let pipe = ShellError::spawn("creating pipe", "ls")(Errno::EMFILE);
        assert_eq!(pipe.to_string(), "Error creating pipe for ls. Error#24");

        let wait = ShellError::Wait {
            pid: Pid::from_raw(42),
            source: Errno::ECHILD,
        };
        assert_eq!(wait.to_string(), "Error in child process 42. Error#10");
        assert_eq!(wait.status(), 1);
    }
}
