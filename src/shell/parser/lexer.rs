use std::str::SplitWhitespace;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Token {
    Word(String),
    Pipe,
    Redirect(RedirectOp),
    Background,
    EOF,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedirectOp {
    Input,  // <
    Output, // >
}

impl Token {
    pub fn as_word(&self) -> Option<&str> {
        match self {
            Token::Word(word) => Some(word),
            _ => None,
        }
    }
}

/// The line held no tokens at all.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct EmptyInput;

/// Whitespace tokenizer. Quotes and escapes are not interpreted, so `a|b` is a
/// single word and only a standalone `|`, `<`, `>` or `&` is an operator.
pub struct Lexer<'a> {
    input: SplitWhitespace<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.split_whitespace(),
        }
    }

    pub fn next_token(&mut self) -> Token {
        match self.input.next() {
            None => Token::EOF,
            Some("|") => Token::Pipe,
            Some("&") => Token::Background,
            Some("<") => Token::Redirect(RedirectOp::Input),
            Some(">") => Token::Redirect(RedirectOp::Output),
            Some(word) => Token::Word(word.to_string()),
        }
    }

    /// Collects every token up to (not including) the terminator.
    pub fn tokenize(input: &'a str) -> Result<Vec<Token>, EmptyInput> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            match lexer.next_token() {
                Token::EOF => break,
                token => tokens.push(token),
            }
        }

        if tokens.is_empty() {
            Err(EmptyInput)
        } else {
            Ok(tokens)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn test_simple_command() {
        let mut lexer = Lexer::new("ls -l");
        assert_eq!(lexer.next_token(), word("ls"));
        assert_eq!(lexer.next_token(), word("-l"));
        assert_eq!(lexer.next_token(), Token::EOF);
        assert_eq!(lexer.next_token(), Token::EOF);
    }

    #[test]
    fn test_pipe() {
        let mut lexer = Lexer::new("ls | grep foo");
        assert_eq!(lexer.next_token(), word("ls"));
        assert_eq!(lexer.next_token(), Token::Pipe);
        assert_eq!(lexer.next_token(), word("grep"));
        assert_eq!(lexer.next_token(), word("foo"));
        assert_eq!(lexer.next_token(), Token::EOF);
    }

    #[test]
    fn test_redirections() {
        let mut lexer = Lexer::new("sort < in.txt > out.txt");
        assert_eq!(lexer.next_token(), word("sort"));
        assert_eq!(lexer.next_token(), Token::Redirect(RedirectOp::Input));
        assert_eq!(lexer.next_token(), word("in.txt"));
        assert_eq!(lexer.next_token(), Token::Redirect(RedirectOp::Output));
        assert_eq!(lexer.next_token(), word("out.txt"));
        assert_eq!(lexer.next_token(), Token::EOF);
    }

    #[test]
    fn test_operators_must_stand_alone() {
        let tokens = Lexer::tokenize("echo a|b >x 2>&1 &").unwrap_or_default();
        assert_eq!(
            tokens,
            vec![
                word("echo"),
                word("a|b"),
                word(">x"),
                word("2>&1"),
                Token::Background
            ]
        );
    }

    #[test]
    fn test_quotes_are_plain_characters() {
        let tokens = Lexer::tokenize(r#"echo "hello world""#).unwrap_or_default();
        assert_eq!(tokens, vec![word("echo"), word("\"hello"), word("world\"")]);
    }

    #[test]
    fn test_whitespace_runs() {
        let tokens = Lexer::tokenize("  \tcat \t  file  \n").unwrap_or_default();
        assert_eq!(tokens, vec![word("cat"), word("file")]);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(Lexer::tokenize(""), Err(EmptyInput));
        assert_eq!(Lexer::tokenize("   \t \n"), Err(EmptyInput));
    }

    #[test]
    fn test_long_line() {
        let line = vec!["x"; 10_000].join(" ");
        let tokens = Lexer::tokenize(&line).unwrap_or_default();
        assert_eq!(tokens.len(), 10_000);
    }
}
