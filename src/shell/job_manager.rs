use std::fmt;
use std::io::{self, Write};

use log::{debug, info, warn};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{fork, setpgid, ForkResult, Pid};

use super::error::ShellError;
use super::executor::launcher::{child_exit, exec_or_die};
use super::executor::run_foreground;
use super::parser::Node;
use super::signals::{self, SigchldBlock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: usize,
    pub pid: Pid,
    pub command: String,
    pub state: JobState,
}

impl Job {
    fn new(id: usize, pid: Pid, command: String) -> Self {
        Self {
            id,
            pid,
            command,
            state: JobState::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == JobState::Running
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.id, self.pid, self.command)
    }
}

/// Table of background jobs. Finished jobs stay in the table but are skipped
/// by listings and lookups, and their ids become free again.
#[derive(Debug, Default)]
pub struct JobManager {
    jobs: Vec<Job>,
}

impl JobManager {
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    pub fn running(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter().filter(|job| job.is_running())
    }

    pub fn find_running(&self, id: usize) -> Option<&Job> {
        self.running().find(|job| job.id == id)
    }

    fn find_available_id(&self) -> usize {
        let mut id = 1;
        while self.find_running(id).is_some() {
            id += 1;
        }
        id
    }

    fn add_job(&mut self, pid: Pid, command: String) -> Job {
        let job = Job::new(self.find_available_id(), pid, command);
        self.jobs.push(job.clone());
        job
    }

    /// Starts `node` without waiting for it. SIGCHLD stays blocked from
    /// before the fork until the job is in the table, so its completion can
    /// never be observed for an unknown pid.
    pub fn launch(&mut self, node: &Node, out: &mut dyn Write) -> Result<Job, ShellError> {
        let name = node.command_name();
        let block = SigchldBlock::new().map_err(ShellError::spawn("blocking SIGCHLD", name))?;
        let _ = io::stdout().flush();

        // SAFETY: the interpreter is single-threaded; the child only sets up
        // its process group and signals before exec or running the line.
        let child = match unsafe { fork() }.map_err(ShellError::spawn("forking child", name))? {
            ForkResult::Parent { child } => child,
            ForkResult::Child => run_job_child(node),
        };
        // Both sides set the group so it exists before either one proceeds.
        if let Err(e) = setpgid(child, child) {
            debug!("setpgid({}) from parent: {}", child, e);
        }

        let job = self.add_job(child, name.to_string());
        info!("started background job {}", job);
        announce(out, format_args!("[{}] {} running in background", job.id, job.pid));

        drop(block);
        self.report(out);
        Ok(job)
    }

    /// Polls every running job without blocking and marks the exited ones
    /// finished. Returns the jobs that finished during this call.
    pub fn reap(&mut self) -> Vec<Job> {
        let mut finished = Vec::new();
        for job in self.jobs.iter_mut().filter(|job| job.is_running()) {
            match waitpid(job.pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::Exited(_, code)) => {
                    debug!("job {} exited with {}", job, code);
                    job.state = JobState::Finished;
                }
                Ok(WaitStatus::Signaled(_, signal, _)) => {
                    debug!("job {} killed by {}", job, signal);
                    job.state = JobState::Finished;
                }
                Ok(_) => continue,
                Err(Errno::ECHILD) => {
                    warn!("job {} was already reaped", job);
                    job.state = JobState::Finished;
                }
                Err(e) => {
                    warn!("waitpid for job {} failed: {}", job, e);
                    continue;
                }
            }
            finished.push(job.clone());
        }
        finished
    }

    /// Reaps and announces finished jobs on `out`.
    pub fn report(&mut self, out: &mut dyn Write) {
        for job in self.reap() {
            info!("background job {} finished", job);
            announce(
                out,
                format_args!("[{}] {} finished {}", job.id, job.pid, job.command),
            );
        }
    }

    /// Sends `signal` (0 only checks for existence) to the process group of
    /// running job `id`.
    pub fn kill(&mut self, signal: i32, id: usize) -> Result<Job, ShellError> {
        let signal = match signal {
            0 => None,
            n => Some(
                Signal::try_from(n)
                    .map_err(|_| ShellError::builtin(format!("kill: {}: invalid signal", n)))?,
            ),
        };
        let job = self
            .find_running(id)
            .cloned()
            .ok_or_else(|| ShellError::builtin(format!("kill: {}: no such job", id)))?;

        killpg(job.pid, signal).map_err(|e| {
            ShellError::builtin(format!("kill: ({}) - {}", job.pid, e.desc()))
        })?;
        info!("sent {:?} to job {}", signal, job);
        Ok(job)
    }
}

fn announce(out: &mut dyn Write, line: fmt::Arguments<'_>) {
    if let Err(e) = writeln!(out, "{}", line) {
        warn!("could not write job notice: {}", e);
    }
}

/// Body of a background child. It leads its own process group so terminal
/// interrupts and `kill` address the whole job.
fn run_job_child(node: &Node) -> ! {
    signals::enter_job_child();
    let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));
    signals::reset_for_child();
    match node {
        Node::Command(command) => exec_or_die(command),
        other => {
            let status = run_foreground(other).unwrap_or_else(|e| {
                eprintln!("{}", e);
                e.status()
            });
            let _ = io::stdout().flush();
            child_exit(status)
        }
    }
}
