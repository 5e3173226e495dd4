use std::os::fd::{AsRawFd, OwnedFd};

use log::{debug, error};
use nix::fcntl::OFlag;
use nix::unistd::{close, dup2, pipe2, Pid};

use super::launcher::{foreground_interrupt_guard, fork_command, wait_for, SetupError};
use super::outcome::ExitOutcome;
use crate::shell::error::ShellError;
use crate::shell::parser::Pipeline;

/// Read and write ends of one pipe.
type PipeEnds = (OwnedFd, OwnedFd);

/// Wires stage `index` of `count` to its neighbouring pipes, then closes every
/// pipe descriptor this process holds. Runs in the child, which never returns
/// to drop the `OwnedFd`s, so the ends are closed by raw descriptor here.
fn wire_stage(pipes: &[PipeEnds], index: usize, count: usize) -> Result<(), SetupError> {
    if index > 0 {
        let read = pipes[index - 1].0.as_raw_fd();
        dup2(read, libc::STDIN_FILENO)
            .map_err(|e| SetupError::new(format!("setting stdin to pipe {}", index - 1), e as i32))?;
    }
    if index + 1 < count {
        let write = pipes[index].1.as_raw_fd();
        dup2(write, libc::STDOUT_FILENO)
            .map_err(|e| SetupError::new(format!("setting stdout to pipe {}", index), e as i32))?;
    }
    for (read, write) in pipes {
        close(read.as_raw_fd()).map_err(|e| SetupError::new("closing pipe", e as i32))?;
        close(write.as_raw_fd()).map_err(|e| SetupError::new("closing pipe", e as i32))?;
    }
    Ok(())
}

/// Reaps every pid, in order, even after a wait error so no zombie is left.
fn reap_all(pids: &[Pid]) -> Result<Vec<ExitOutcome>, ShellError> {
    let mut outcomes = Vec::with_capacity(pids.len());
    let mut first_error = None;
    for &pid in pids {
        match wait_for(pid) {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                error!("{}", e);
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(outcomes),
    }
}

/// Runs an N-stage pipeline in the foreground: N-1 pipes, N children, all
/// pipe ends closed in every process, all children reaped. One outcome per
/// stage, in stage order.
pub fn run_pipeline(pipeline: &Pipeline) -> Result<Vec<ExitOutcome>, ShellError> {
    let count = pipeline.len();
    // Close-on-exec, so no end survives into a program other than the stage
    // it was dup'ed into.
    let pipes = (1..count)
        .map(|_| {
            pipe2(OFlag::O_CLOEXEC)
                .map_err(ShellError::spawn("creating pipe", pipeline.first().program.as_str()))
        })
        .collect::<Result<Vec<PipeEnds>, ShellError>>()?;
    debug!("created {} pipes for {} stages", pipes.len(), count);

    let _interrupt = foreground_interrupt_guard();
    let mut pids = Vec::with_capacity(count);
    let mut spawn_error = None;
    for (index, command) in pipeline.stages().iter().enumerate() {
        match fork_command(command, || wire_stage(&pipes, index, count)) {
            Ok(pid) => pids.push(pid),
            Err(e) => {
                spawn_error = Some(e);
                break;
            }
        }
    }

    // Readers only see EOF once the parent's copies of the write ends are gone.
    drop(pipes);

    let outcomes = reap_all(&pids);
    match spawn_error {
        Some(e) => Err(e),
        None => outcomes,
    }
}
