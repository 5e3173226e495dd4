use colored::Colorize;

pub struct Theme {
    pub error_symbol: String,
    pub prompt_style: Box<dyn Fn(String) -> String>,
    pub notice_style: Box<dyn Fn(String) -> String>,
    pub error_style: Box<dyn Fn(String) -> String>,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            error_symbol: "✗".red().to_string(),
            prompt_style: Box::new(|s| s.bright_cyan().to_string()),
            notice_style: Box::new(|s| s.bright_magenta().to_string()),
            error_style: Box::new(|s| s.bright_red().to_string()),
        }
    }
}

impl Theme {
    /// Uncoloured output for batch mode, where stdout is usually a pipe.
    pub fn plain() -> Self {
        colored::control::set_override(false);
        Theme {
            error_symbol: String::new(),
            prompt_style: Box::new(|s| s),
            notice_style: Box::new(|s| s),
            error_style: Box::new(|s| s),
        }
    }

    /// `<cwd> > `
    pub fn prompt(&self, cwd: &str) -> String {
        format!("{} > ", (self.prompt_style)(cwd.to_string()))
    }

    pub fn notice(&self, message: &str) -> String {
        (self.notice_style)(message.to_string())
    }

    pub fn error(&self, message: &str) -> String {
        if self.error_symbol.is_empty() {
            (self.error_style)(message.to_string())
        } else {
            format!(
                "{} {}",
                self.error_symbol,
                (self.error_style)(message.to_string())
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_theme_is_unstyled() {
        let theme = Theme::plain();
        assert_eq!(theme.prompt("/tmp"), "/tmp > ");
        assert_eq!(theme.error("ls not found."), "ls not found.");
        assert_eq!(theme.notice("[1] 42 running"), "[1] 42 running");
    }
}
