use std::fmt;

use nix::sys::signal::Signal;

/// Exit status used by a child whose program could not be found on `PATH`.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit status used by a child whose exec failed for any other reason.
pub const EXIT_EXEC_FAILED: i32 = 126;

/// Status reported to the interpreter loop when a command ran and succeeded.
pub const STATUS_SUCCESS: i32 = 0;
/// Status for failures inside the interpreter (wait, fork, builtins, syntax).
pub const STATUS_ERROR: i32 = 1;
/// Status for a child that exited non-zero or died from a signal.
pub const STATUS_CHILD_FAILED: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchFailure {
    NotFound,
    ExecFailed,
}

/// How a single spawned process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    NormalExit(i32),
    Signaled(Signal),
    LaunchFailed(LaunchFailure),
}

impl ExitOutcome {
    /// Launch failures travel back as the child's exit code.
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            EXIT_NOT_FOUND => ExitOutcome::LaunchFailed(LaunchFailure::NotFound),
            EXIT_EXEC_FAILED => ExitOutcome::LaunchFailed(LaunchFailure::ExecFailed),
            code => ExitOutcome::NormalExit(code),
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, ExitOutcome::NormalExit(0))
    }

    pub fn is_launch_failure(&self) -> bool {
        matches!(self, ExitOutcome::LaunchFailed(_))
    }

    pub fn status(&self) -> i32 {
        match self {
            ExitOutcome::NormalExit(0) => STATUS_SUCCESS,
            ExitOutcome::NormalExit(_) | ExitOutcome::Signaled(_) => STATUS_CHILD_FAILED,
            ExitOutcome::LaunchFailed(LaunchFailure::NotFound) => EXIT_NOT_FOUND,
            ExitOutcome::LaunchFailed(LaunchFailure::ExecFailed) => EXIT_EXEC_FAILED,
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::NormalExit(code) => write!(f, "exited with {}", code),
            ExitOutcome::Signaled(sig) => write!(f, "killed by {}", sig),
            ExitOutcome::LaunchFailed(LaunchFailure::NotFound) => write!(f, "not found"),
            ExitOutcome::LaunchFailed(LaunchFailure::ExecFailed) => write!(f, "exec failed"),
        }
    }
}

/// A pipeline fails only when one of its stages could not be launched.
pub fn pipeline_status(outcomes: &[ExitOutcome]) -> i32 {
    outcomes
        .iter()
        .find(|outcome| outcome.is_launch_failure())
        .map_or(STATUS_SUCCESS, ExitOutcome::status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ExitOutcome::from_exit_code(0).status(), 0);
        assert_eq!(ExitOutcome::from_exit_code(1).status(), 2);
        assert_eq!(ExitOutcome::from_exit_code(3).status(), 2);
        assert_eq!(ExitOutcome::Signaled(Signal::SIGKILL).status(), 2);
        assert_eq!(
            ExitOutcome::from_exit_code(127),
            ExitOutcome::LaunchFailed(LaunchFailure::NotFound)
        );
        assert_eq!(ExitOutcome::from_exit_code(126).status(), 126);
    }

    #[test]
    fn test_pipeline_status_ignores_exit_codes() {
        let ran = [ExitOutcome::NormalExit(1), ExitOutcome::NormalExit(0)];
        assert_eq!(pipeline_status(&ran), 0);

        let missing = [
            ExitOutcome::NormalExit(0),
            ExitOutcome::LaunchFailed(LaunchFailure::NotFound),
        ];
        assert_eq!(pipeline_status(&missing), EXIT_NOT_FOUND);
    }
}
