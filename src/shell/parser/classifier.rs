use super::lexer::{RedirectOp, Token};

pub const BUILTINS: [&str; 6] = ["exit", "quit", "cd", "jobs", "set", "kill"];

/// How a token sequence is executed. Variants are listed in dispatch
/// precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Builtin,
    Background,
    Pipeline,
    Redirect(RedirectOp),
    Plain,
}

/// Operators present in one line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Operators {
    pub pipe: bool,
    pub input: bool,
    pub output: bool,
    pub background: bool,
}

impl Operators {
    pub fn scan(tokens: &[Token]) -> Self {
        let mut ops = Operators::default();
        for token in tokens {
            match token {
                Token::Pipe => ops.pipe = true,
                Token::Background => ops.background = true,
                Token::Redirect(RedirectOp::Input) => ops.input = true,
                Token::Redirect(RedirectOp::Output) => ops.output = true,
                Token::Word(_) | Token::EOF => {}
            }
        }
        ops
    }
}

pub fn is_builtin(tokens: &[Token]) -> bool {
    tokens
        .first()
        .and_then(Token::as_word)
        .is_some_and(|name| BUILTINS.contains(&name))
}

/// Picks the strategy for a line: builtins first, then
/// background > pipe > redirection > plain. When both redirections are
/// present input is reported; the redirection parser rejects the pair.
pub fn classify(tokens: &[Token]) -> Strategy {
    if is_builtin(tokens) {
        return Strategy::Builtin;
    }

    let ops = Operators::scan(tokens);
    if ops.background {
        Strategy::Background
    } else if ops.pipe {
        Strategy::Pipeline
    } else if ops.input {
        Strategy::Redirect(RedirectOp::Input)
    } else if ops.output {
        Strategy::Redirect(RedirectOp::Output)
    } else {
        Strategy::Plain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::parser::lexer::Lexer;

    fn classify_line(line: &str) -> Strategy {
        classify(&Lexer::tokenize(line).unwrap_or_default())
    }

    #[test]
    fn test_plain() {
        assert_eq!(classify_line("ls -l /tmp"), Strategy::Plain);
    }

    #[test]
    fn test_builtins_win_over_operators() {
        assert_eq!(classify_line("jobs &"), Strategy::Builtin);
        assert_eq!(classify_line("set > out"), Strategy::Builtin);
        assert_eq!(classify_line("quit"), Strategy::Builtin);
        assert_eq!(classify_line("kill 9 1"), Strategy::Builtin);
    }

    #[test]
    fn test_builtin_match_is_exact() {
        assert_eq!(classify_line("exit2"), Strategy::Plain);
        assert_eq!(classify_line("./cd"), Strategy::Plain);
    }

    #[test]
    fn test_precedence() {
        assert_eq!(classify_line("ls | wc &"), Strategy::Background);
        assert_eq!(classify_line("sort < a | uniq"), Strategy::Pipeline);
        assert_eq!(
            classify_line("sort < a > b"),
            Strategy::Redirect(RedirectOp::Input)
        );
        assert_eq!(
            classify_line("echo hi > b"),
            Strategy::Redirect(RedirectOp::Output)
        );
    }

    #[test]
    fn test_scan_reports_everything() {
        let tokens = Lexer::tokenize("a < b | c > d &").unwrap_or_default();
        assert_eq!(
            Operators::scan(&tokens),
            Operators {
                pipe: true,
                input: true,
                output: true,
                background: true,
            }
        );
    }
}
