use log::{debug, error, info, warn};
use std::error::Error;
use std::io::{self, Write};

use crate::shell::builtins::{run_builtin, Flow};
use crate::shell::error::ShellError;
use crate::shell::executor::outcome::STATUS_ERROR;
use crate::shell::executor::{Execution, Executor};
use crate::shell::job_manager::JobManager;
use crate::shell::parser::classifier::is_builtin;
use crate::shell::parser::{parse, Lexer, Token};
use crate::shell::readline::{ReadlineError, ReadlineManager};
use crate::shell::signals;
use crate::utils::config::Config;
use crate::utils::path::current_dir;
use crate::utils::theme::Theme;

/// Consecutive read failures after which batch input is treated as ended.
const MAX_READ_FAILURES: u32 = 3;

pub struct Shell<'a> {
    theme: Theme,
    readline: ReadlineManager<'a>,
    executor: Executor,
    /// Without a SIGCHLD handler jobs are polled before every prompt.
    sigchld_handler: bool,
    last_status: i32,
}

impl<'a> Shell<'a> {
    pub fn new(config: &'a Config) -> Result<Self, ShellError> {
        let readline = ReadlineManager::new(config)?;
        let theme = if readline.is_interactive() {
            Theme::default()
        } else {
            Theme::plain()
        };
        Ok(Self {
            theme,
            readline,
            executor: Executor::new(JobManager::new()),
            sigchld_handler: false,
            last_status: 0,
        })
    }

    /// Runs the interpreter until `exit`/`quit` or end of input and returns
    /// the status the process should exit with.
    pub fn run(&mut self) -> Result<i32, Box<dyn Error>> {
        debug!("initialising quash...");

        self.sigchld_handler = match signals::setup_sigchld_handler() {
            Ok(()) => true,
            Err(e) => {
                warn!("could not install SIGCHLD handler, polling jobs instead: {}", e);
                false
            }
        };

        self.readline.load_history();
        debug!("quash ready");

        let status = self.run_loop()?;
        self.readline.save_history();

        debug!("leaving quash with status {}", status);
        Ok(status)
    }

    fn run_loop(&mut self) -> Result<i32, Box<dyn Error>> {
        let mut read_failures = 0;
        loop {
            self.drain_jobs();
            io::stdout().flush()?;
            let prompt = if self.readline.is_interactive() {
                self.theme.prompt(&current_dir())
            } else {
                String::new()
            };

            let read = self.readline.readline(&prompt);
            if read.is_ok() {
                read_failures = 0;
            }
            match read {
                Ok(line) => match self.handle_input(&line) {
                    Flow::Exit => {
                        info!("exit requested");
                        return Ok(0);
                    }
                    Flow::Continue(status) => self.last_status = status,
                },
                Err(ReadlineError::Eof) => {
                    debug!("end of input");
                    if self.readline.is_interactive() {
                        println!();
                    }
                    return Ok(self.last_status);
                }
                Err(ReadlineError::Interrupted) => {
                    debug!("line discarded by interrupt");
                }
                Err(err) => {
                    error!("failed to read command: {}", err);
                    self.report_error(&ShellError::from(err));
                    self.last_status = STATUS_ERROR;
                    read_failures += 1;
                    if !self.readline.is_interactive() && read_failures >= MAX_READ_FAILURES {
                        warn!("giving up on input after {} read failures", read_failures);
                        return Ok(self.last_status);
                    }
                }
            }
        }
    }

    /// Safe point for background bookkeeping: picks up completions the
    /// SIGCHLD handler flagged and announces them.
    fn drain_jobs(&mut self) {
        if self.sigchld_handler && !signals::take_child_event() {
            return;
        }
        for job in self.executor.jobs_mut().reap() {
            info!("background job {} finished", job);
            println!(
                "{}",
                self.theme
                    .notice(&format!("[{}] {} finished {}", job.id, job.pid, job.command))
            );
        }
    }

    fn handle_input(&mut self, line: &str) -> Flow {
        let tokens = match Lexer::tokenize(line) {
            Ok(tokens) => tokens,
            Err(_) => return Flow::Continue(self.last_status),
        };

        self.readline.add_history(line.trim_end());
        debug!("executing: {}", line.trim_end());
        self.drain_jobs();

        match self.dispatch(&tokens) {
            Ok(flow) => flow,
            Err(e) => {
                self.report_error(&e);
                Flow::Continue(e.status())
            }
        }
    }

    fn dispatch(&mut self, tokens: &[Token]) -> Result<Flow, ShellError> {
        let mut stdout = io::stdout();
        if is_builtin(tokens) {
            let args: Vec<String> = tokens.iter().map(ToString::to_string).collect();
            return run_builtin(&args, self.executor.jobs_mut(), &mut stdout);
        }

        let node = parse(tokens)?;
        match self.executor.execute(&node, &mut stdout)? {
            Execution::Completed(status) => {
                debug!("status {}", status);
                Ok(Flow::Continue(status))
            }
            Execution::Started(job) => {
                debug!("started {}", job);
                Ok(Flow::Continue(0))
            }
        }
    }

    fn report_error(&self, e: &ShellError) {
        warn!("{}", e);
        eprintln!("{}", self.theme.error(&e.to_string()));
    }
}
