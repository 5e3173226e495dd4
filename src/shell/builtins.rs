use std::env;
use std::io::Write;

use log::debug;
use nix::unistd::chdir;

use super::error::ShellError;
use super::executor::outcome::STATUS_SUCCESS;
use super::job_manager::JobManager;

/// What the interpreter loop does after a builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue(i32),
    Exit,
}

const SET_USAGE: &str = "Usage: set <envVariable>=<newValue>";
const KILL_USAGE: &str = "Usage: kill <signal> <job_id>";

/// Runs the builtin named by `args[0]`. Callers only pass lines the
/// classifier reported as builtins.
pub fn run_builtin(
    args: &[String],
    jobs: &mut JobManager,
    out: &mut dyn Write,
) -> Result<Flow, ShellError> {
    let (name, rest) = match args.split_first() {
        Some((name, rest)) => (name.as_str(), rest),
        None => return Ok(Flow::Continue(STATUS_SUCCESS)),
    };
    debug!("builtin {} {:?}", name, rest);

    match name {
        "exit" | "quit" => return Ok(Flow::Exit),
        "cd" => builtin_cd(rest)?,
        "jobs" => builtin_jobs(jobs, out)?,
        "set" => builtin_set(rest, out)?,
        "kill" => builtin_kill(rest, jobs)?,
        other => return Err(ShellError::builtin(format!("{}: not a builtin", other))),
    }
    Ok(Flow::Continue(STATUS_SUCCESS))
}

fn builtin_cd(args: &[String]) -> Result<(), ShellError> {
    let target = match args.first() {
        Some(path) => shellexpand::tilde(path).into_owned(),
        None => env::var("HOME").map_err(|_| ShellError::builtin("cd: HOME not set"))?,
    };
    chdir(target.as_str())
        .map_err(|e| ShellError::builtin(format!("cd: {}: {}", target, e.desc())))?;
    debug!("changed directory to {}", target);
    Ok(())
}

fn builtin_jobs(jobs: &JobManager, out: &mut dyn Write) -> Result<(), ShellError> {
    for job in jobs.running() {
        writeln!(out, "{}", job)?;
    }
    Ok(())
}

fn builtin_set(args: &[String], out: &mut dyn Write) -> Result<(), ShellError> {
    let assignment = match args {
        [] => {
            writeln!(out, "PATH:{}", env::var("PATH").unwrap_or_default())?;
            writeln!(out, "HOME:{}", env::var("HOME").unwrap_or_default())?;
            return Ok(());
        }
        [assignment] => assignment,
        _ => return Err(ShellError::builtin(SET_USAGE)),
    };

    let (name, value) = assignment
        .split_once('=')
        .ok_or_else(|| ShellError::builtin(SET_USAGE))?;
    match name {
        "PATH" | "HOME" if !value.is_empty() => {
            debug!("set {}={}", name, value);
            env::set_var(name, value);
            Ok(())
        }
        "PATH" | "HOME" | "" => Err(ShellError::builtin(SET_USAGE)),
        _ => Err(ShellError::builtin("set can be used for PATH or HOME")),
    }
}

fn builtin_kill(args: &[String], jobs: &mut JobManager) -> Result<(), ShellError> {
    let (signal, id) = match args {
        [signal, id] => (signal, id),
        _ => return Err(ShellError::builtin(KILL_USAGE)),
    };
    let signal: i32 = signal
        .trim_start_matches('-')
        .parse()
        .map_err(|_| ShellError::builtin(format!("kill: {}: invalid signal", signal)))?;
    let id: usize = id
        .trim_start_matches('%')
        .parse()
        .map_err(|_| ShellError::builtin(format!("kill: {}: invalid job id", id)))?;

    jobs.kill(signal, id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    fn run(line: &str) -> (Result<Flow, ShellError>, String) {
        let mut jobs = JobManager::new();
        let mut out = Vec::new();
        let result = run_builtin(&args(line), &mut jobs, &mut out);
        (result, String::from_utf8_lossy(&out).into_owned())
    }

    #[test]
    fn test_exit_and_quit() {
        assert!(matches!(run("exit").0, Ok(Flow::Exit)));
        assert!(matches!(run("quit").0, Ok(Flow::Exit)));
    }

    #[test]
    fn test_set_without_arguments_is_idempotent() {
        let (first, first_out) = run("set");
        let (second, second_out) = run("set");
        assert!(matches!(first, Ok(Flow::Continue(0))));
        assert!(matches!(second, Ok(Flow::Continue(0))));
        assert_eq!(first_out, second_out);
        assert!(first_out.starts_with("PATH:"));
        assert!(first_out.contains("\nHOME:"));
    }

    #[test]
    fn test_set_rejects_other_variables() {
        let (result, _) = run("set FOO=bar");
        assert_eq!(
            result.map_err(|e| e.to_string()),
            Err("set can be used for PATH or HOME".to_string())
        );
        assert!(env::var("FOO").is_err());
    }

    #[test]
    fn test_set_usage_errors() {
        for line in ["set PATH", "set PATH=", "set =x", "set a=b c=d"] {
            let (result, _) = run(line);
            assert_eq!(
                result.map_err(|e| e.to_string()),
                Err(SET_USAGE.to_string()),
                "{}",
                line
            );
        }
    }

    #[test]
    fn test_cd_failure() {
        let (result, _) = run("cd /quash/does/not/exist");
        assert_eq!(
            result.map_err(|e| e.to_string()),
            Err("cd: /quash/does/not/exist: No such file or directory".to_string())
        );
    }

    #[test]
    fn test_jobs_empty() {
        let (result, out) = run("jobs");
        assert!(matches!(result, Ok(Flow::Continue(0))));
        assert!(out.is_empty());
    }

    #[test]
    fn test_kill_usage() {
        for line in ["kill", "kill 9", "kill x 1", "kill 9 y", "kill 9 1 2"] {
            assert!(matches!(run(line).0, Err(ShellError::Builtin(_))), "{}", line);
        }
        assert_eq!(
            run("kill 9 4").0.map_err(|e| e.to_string()),
            Err("kill: 4: no such job".to_string())
        );
    }
}
