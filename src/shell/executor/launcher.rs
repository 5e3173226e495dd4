use std::ffi::CString;
use std::fmt;
use std::io::{self, Write};

use log::{debug, info, warn};
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{execvp, fork, ForkResult, Pid};

use super::outcome::{ExitOutcome, EXIT_EXEC_FAILED, EXIT_NOT_FOUND};
use crate::shell::error::ShellError;
use crate::shell::parser::Command;
use crate::shell::signals::{self, InterruptGuard};

/// A descriptor-setup step that failed inside a child before exec.
#[derive(Debug)]
pub struct SetupError {
    action: String,
    errno: i32,
}

impl SetupError {
    pub fn new(action: impl Into<String>, errno: i32) -> Self {
        Self {
            action: action.into(),
            errno,
        }
    }

    pub fn from_io(action: impl Into<String>, err: &io::Error) -> Self {
        Self::new(action, err.raw_os_error().unwrap_or(0))
    }
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {}. Error#{}", self.action, self.errno)
    }
}

/// Leaves the child without running atexit handlers or flushing stdio
/// buffers copied from the parent.
pub fn child_exit(code: i32) -> ! {
    // SAFETY: `_exit` is async-signal-safe and never returns.
    unsafe { libc::_exit(code) }
}

fn to_cstrings(command: &Command) -> Result<Vec<CString>, std::ffi::NulError> {
    command.argv().into_iter().map(CString::new).collect()
}

/// Replaces the current process with `command`, searching `PATH`. Only
/// returns to report a failure, and then by exiting the process.
pub fn exec_or_die(command: &Command) -> ! {
    let argv = match to_cstrings(command) {
        Ok(argv) => argv,
        Err(_) => {
            eprintln!("Error execing {}. Error#{}", command.program, Errno::EINVAL as i32);
            child_exit(EXIT_EXEC_FAILED);
        }
    };

    let err = match execvp::<CString>(&argv[0], &argv) {
        Ok(never) => match never {},
        Err(e) => e,
    };
    if err == Errno::ENOENT {
        eprintln!("{} not found.", command.program);
        child_exit(EXIT_NOT_FOUND);
    }
    eprintln!("Error execing {}. Error#{}", command.program, err as i32);
    child_exit(EXIT_EXEC_FAILED)
}

/// Forks a child that runs `setup` and then execs `command`. The parent gets
/// the child's pid back; the child never returns from this function.
pub fn fork_command<F>(command: &Command, setup: F) -> Result<Pid, ShellError>
where
    F: FnOnce() -> Result<(), SetupError>,
{
    // Buffered output would otherwise be written twice, once by each process.
    let _ = io::stdout().flush();

    // SAFETY: the interpreter is single-threaded; the child only performs
    // descriptor setup before exec or _exit.
    let forked = unsafe { fork() };
    match forked.map_err(ShellError::spawn("forking child", command.program.as_str()))? {
        ForkResult::Parent { child } => {
            debug!("forked {} for `{}`", child, command);
            Ok(child)
        }
        ForkResult::Child => {
            signals::reset_for_child();
            if let Err(e) = setup() {
                eprintln!("{}", e);
                child_exit(libc::EXIT_FAILURE);
            }
            exec_or_die(command)
        }
    }
}

/// Blocks until `pid` terminates and translates its wait status.
pub fn wait_for(pid: Pid) -> Result<ExitOutcome, ShellError> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(ExitOutcome::from_exit_code(code)),
            Ok(WaitStatus::Signaled(_, signal, _core_dumped)) => {
                return Ok(ExitOutcome::Signaled(signal))
            }
            Ok(other) => debug!("ignoring wait status {:?}", other),
            Err(Errno::EINTR) => continue,
            Err(source) => return Err(ShellError::Wait { pid, source }),
        }
    }
}

/// Suppresses SIGINT in the interpreter for the lifetime of the returned
/// guard. Failure to install it is logged and the command runs anyway.
pub fn foreground_interrupt_guard() -> Option<InterruptGuard> {
    match InterruptGuard::ignore() {
        Ok(guard) => Some(guard),
        Err(e) => {
            warn!("could not ignore SIGINT for foreground command: {}", e);
            None
        }
    }
}

/// Runs one command in the foreground with inherited stdio.
pub fn run_command(command: &Command) -> Result<ExitOutcome, ShellError> {
    let _interrupt = foreground_interrupt_guard();
    let pid = fork_command(command, || Ok(()))?;
    let outcome = wait_for(pid)?;
    if !outcome.success() {
        info!("{} ({}) {}", command.program, pid, outcome);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::executor::outcome::LaunchFailure;

    fn cmd(line: &str) -> Command {
        let mut words = line.split_whitespace().map(str::to_string);
        let program = words.next().unwrap_or_default();
        Command::new(program, words.collect())
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_success() {
        assert_eq!(run_command(&cmd("true")).unwrap(), ExitOutcome::NormalExit(0));
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_nonzero_exit() {
        let outcome = run_command(&cmd("false")).unwrap();
        assert_eq!(outcome, ExitOutcome::NormalExit(1));
        assert_eq!(outcome.status(), 2);
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_arguments_are_passed() {
        let command = Command::new("sh", vec!["-c".into(), "exit 3".into()]);
        assert_eq!(run_command(&command).unwrap(), ExitOutcome::NormalExit(3));
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_not_found() {
        let outcome = run_command(&cmd("quash-definitely-not-a-program")).unwrap();
        assert_eq!(outcome, ExitOutcome::LaunchFailed(LaunchFailure::NotFound));
        assert_eq!(outcome.status(), EXIT_NOT_FOUND);
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_signaled() {
        let command = Command::new("sh", vec!["-c".into(), "kill -9 $$".into()]);
        assert!(matches!(
            run_command(&command).unwrap(),
            ExitOutcome::Signaled(nix::sys::signal::Signal::SIGKILL)
        ));
    }

    #[test]
    fn test_setup_error_message() {
        let err = SetupError::new("opening missing.txt", 2);
        assert_eq!(err.to_string(), "Error opening missing.txt. Error#2");
    }
}
