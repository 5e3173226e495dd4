use std::borrow::Cow;
use std::io::{self, BufRead, IsTerminal};

use crate::utils::config::Config;
use log::{debug, error, warn};
pub use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::Editor;
use rustyline::{CompletionType, Config as RLConfig};

/// Where command lines come from: a line editor on a terminal, or plain
/// stdin lines when input is piped in.
enum Source {
    Interactive(Box<Editor<(), FileHistory>>),
    Batch(io::StdinLock<'static>),
}

pub struct ReadlineManager<'a> {
    config: &'a Config,
    source: Source,
}

impl<'a> ReadlineManager<'a> {
    pub fn new(config: &'a Config) -> Result<Self, ReadlineError> {
        let source = if io::stdin().is_terminal() {
            let rl_config = RLConfig::builder()
                .history_ignore_space(true)
                .auto_add_history(false)
                .completion_type(CompletionType::List)
                .edit_mode(config.get_edit_mode())
                .build();
            let editor = Editor::with_config(rl_config).map_err(|err| {
                error!("failed to initialise line editor: {}", err);
                err
            })?;
            Source::Interactive(Box::new(editor))
        } else {
            debug!("stdin is not a terminal, reading commands in batch mode");
            Source::Batch(io::stdin().lock())
        };
        Ok(Self { config, source })
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self.source, Source::Interactive(_))
    }

    pub fn load_history(&mut self) {
        if let Source::Interactive(editor) = &mut self.source {
            if let Err(err) = editor.load_history(&self.config.history_file) {
                warn!(
                    "could not load history: {} {}",
                    self.config.history_file.display(),
                    err
                );
            } else {
                debug!("history loaded");
            }
        }
    }

    /// Reads one line. The line may be arbitrarily long. End of input is
    /// reported as [`ReadlineError::Eof`] in both modes.
    pub fn readline(&mut self, prompt: &str) -> Result<String, ReadlineError> {
        match &mut self.source {
            Source::Interactive(editor) => editor.readline(prompt),
            Source::Batch(stdin) => read_batch_line(stdin),
        }
    }

    pub fn add_history(&mut self, line: &str) {
        if let Source::Interactive(editor) = &mut self.source {
            if let Err(err) = editor.add_history_entry(line) {
                warn!("could not add history entry: {}", err);
            }
        }
    }

    pub fn save_history(&mut self) {
        if let Source::Interactive(editor) = &mut self.source {
            if let Err(err) = editor.save_history(&self.config.history_file) {
                error!("failed to save history: {}", err);
            } else {
                debug!("history saved");
            }
        }
    }
}

/// Piped input is not guaranteed to be UTF-8; bytes that are not become
/// U+FFFD instead of failing the whole line.
fn read_batch_line<R: BufRead>(input: &mut R) -> Result<String, ReadlineError> {
    let mut bytes = Vec::new();
    if input.read_until(b'\n', &mut bytes)? == 0 {
        return Err(ReadlineError::Eof);
    }
    match String::from_utf8_lossy(&bytes) {
        Cow::Borrowed(line) => Ok(line.to_string()),
        Cow::Owned(line) => {
            warn!("input line is not valid UTF-8: {}", line.trim_end());
            Ok(line)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_batch_lines() {
        let mut input: &[u8] = b"echo one\necho \xff\xfe\nlast";
        assert_eq!(read_batch_line(&mut input).unwrap(), "echo one\n");
        assert_eq!(
            read_batch_line(&mut input).unwrap(),
            "echo \u{FFFD}\u{FFFD}\n"
        );
        assert_eq!(read_batch_line(&mut input).unwrap(), "last");
        assert!(matches!(
            read_batch_line(&mut input),
            Err(ReadlineError::Eof)
        ));
    }
}
