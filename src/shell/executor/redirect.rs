use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;

use log::debug;
use nix::unistd::dup2;

use super::launcher::{foreground_interrupt_guard, fork_command, wait_for, SetupError};
use super::outcome::ExitOutcome;
use crate::shell::error::ShellError;
use crate::shell::parser::{RedirectOp, Redirection};

/// rw-r--r--, before the umask.
const OUTPUT_MODE: u32 = 0o644;

fn open_target(filename: &str, operator: RedirectOp) -> std::io::Result<File> {
    match operator {
        RedirectOp::Input => OpenOptions::new().read(true).open(filename),
        RedirectOp::Output => OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(OUTPUT_MODE)
            .open(filename),
    }
}

/// Child-side setup: binds the opened target onto stdin or stdout. The
/// original descriptor is closed when `file` drops.
fn bind_target(filename: &str, operator: RedirectOp) -> Result<(), SetupError> {
    let file = open_target(filename, operator)
        .map_err(|e| SetupError::from_io(format!("opening {}", filename), &e))?;
    let (target, stream) = match operator {
        RedirectOp::Input => (libc::STDIN_FILENO, "stdin"),
        RedirectOp::Output => (libc::STDOUT_FILENO, "stdout"),
    };
    dup2(file.as_raw_fd(), target).map_err(|e| {
        SetupError::new(format!("resetting {} to {}", stream, filename), e as i32)
    })?;
    drop(file);
    Ok(())
}

/// Runs `redirection.command` in the foreground with one stream bound to
/// the target file. The command's argv never contains the operator or the
/// filename; the parser already split them off.
pub fn run_redirection(redirection: &Redirection) -> Result<ExitOutcome, ShellError> {
    let Redirection {
        command,
        operator,
        filename,
    } = redirection;

    let _interrupt = foreground_interrupt_guard();
    let pid = fork_command(command, || bind_target(filename, *operator))?;
    let outcome = wait_for(pid)?;
    debug!("{:?} {} {}: {}", command.argv(), operator_symbol(*operator), filename, outcome);
    Ok(outcome)
}

fn operator_symbol(operator: RedirectOp) -> &'static str {
    match operator {
        RedirectOp::Input => "<",
        RedirectOp::Output => ">",
    }
}
