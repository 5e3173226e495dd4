pub mod launcher;
pub mod outcome;
pub mod pipeline;
pub mod redirect;

use std::io::Write;

use log::debug;

use crate::shell::error::ShellError;
use crate::shell::job_manager::{Job, JobManager};
use crate::shell::parser::{Node, ParseError, Token};

use self::outcome::pipeline_status;

/// Result of executing one parsed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    /// A foreground command finished with this status.
    Completed(i32),
    /// A background job was started.
    Started(Job),
}

pub struct Executor {
    jobs: JobManager,
}

impl Executor {
    pub fn new(jobs: JobManager) -> Self {
        Self { jobs }
    }

    pub fn jobs_mut(&mut self) -> &mut JobManager {
        &mut self.jobs
    }

    /// Runs `node`. Foreground work blocks until every child is reaped;
    /// background work returns as soon as the job is recorded. `out` receives
    /// the job announcement.
    pub fn execute(&mut self, node: &Node, out: &mut dyn Write) -> Result<Execution, ShellError> {
        match node {
            Node::Background(inner) => {
                let job = self.jobs.launch(inner, out)?;
                Ok(Execution::Started(job))
            }
            node => run_foreground(node).map(Execution::Completed),
        }
    }
}

/// Runs a non-background node to completion and returns its status.
pub fn run_foreground(node: &Node) -> Result<i32, ShellError> {
    debug!("running in foreground: {:?}", node);
    match node {
        Node::Command(command) => launcher::run_command(command).map(|o| o.status()),
        Node::Pipeline(pipeline) => {
            pipeline::run_pipeline(pipeline).map(|outcomes| pipeline_status(&outcomes))
        }
        Node::Redirect(redirection) => redirect::run_redirection(redirection).map(|o| o.status()),
        Node::Background(_) => Err(ParseError::UnexpectedOperator(Token::Background).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::parser::{parse, Lexer};

    #[allow(clippy::unwrap_used)]
    fn run(executor: &mut Executor, line: &str) -> Execution {
        let node = parse(&Lexer::tokenize(line).unwrap()).unwrap();
        executor.execute(&node, &mut Vec::new()).unwrap()
    }

    #[test]
    fn test_foreground_statuses() {
        let mut executor = Executor::new(JobManager::new());
        assert_eq!(run(&mut executor, "true"), Execution::Completed(0));
        assert_eq!(run(&mut executor, "false"), Execution::Completed(2));
        assert_eq!(run(&mut executor, "true | false"), Execution::Completed(0));
        assert_eq!(
            run(&mut executor, "quash-missing-cmd"),
            Execution::Completed(outcome::EXIT_NOT_FOUND)
        );
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_background_returns_immediately() {
        let mut executor = Executor::new(JobManager::new());
        let started = std::time::Instant::now();
        let job = match run(&mut executor, "sleep 5 &") {
            Execution::Started(job) => job,
            other => panic!("Expected background job, got {:?}", other),
        };
        assert!(started.elapsed() < std::time::Duration::from_secs(4));
        assert_eq!(executor.jobs_mut().running().count(), 1);

        executor.jobs_mut().kill(9, job.id).unwrap();
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while executor.jobs_mut().running().count() > 0 {
            assert!(std::time::Instant::now() < deadline, "job was not reaped");
            executor.jobs_mut().reap();
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
    }

    #[test]
    fn test_nested_background_is_rejected() {
        let node = Node::Background(Box::new(Node::Command(Default::default())));
        assert!(run_foreground(&node).is_err());
    }
}
