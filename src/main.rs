use log::debug;
use std::process;

use crate::shell::Shell;
use crate::utils::config::Config;
use crate::utils::log::init_logger;

mod shell;
mod utils;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::new();
    init_logger(&config);
    debug!("config loaded, logging to {}", config.logger_dir.display());

    let mut shell = Shell::new(&config)?;
    let status = shell.run()?;
    process::exit(status)
}
