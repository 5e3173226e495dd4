use super::ast::Command;
use super::lexer::Token;
use super::parser::ParseError;

/// Cuts `tokens` at every `separator`, dropping the separators. Each piece
/// becomes one command; an empty piece (leading, trailing or doubled
/// separator) is an error.
pub fn split_commands(tokens: &[Token], separator: &Token) -> Result<Vec<Command>, ParseError> {
    tokens
        .split(|token| token == separator)
        .map(|segment| {
            if segment.is_empty() {
                return Err(ParseError::EmptyStage(separator.clone()));
            }
            command_from_words(segment)
        })
        .collect()
}

/// Builds a command from a run of plain words.
pub fn command_from_words(segment: &[Token]) -> Result<Command, ParseError> {
    let mut words = Vec::with_capacity(segment.len());
    for token in segment {
        match token {
            Token::Word(word) => words.push(word.clone()),
            operator => return Err(ParseError::UnexpectedOperator(operator.clone())),
        }
    }

    let mut words = words.into_iter();
    match words.next() {
        Some(program) => Ok(Command::new(program, words.collect())),
        None => Err(ParseError::MissingCommand),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::parser::lexer::{Lexer, RedirectOp};

    fn split(line: &str) -> Result<Vec<Command>, ParseError> {
        split_commands(&Lexer::tokenize(line).unwrap_or_default(), &Token::Pipe)
    }

    #[test]
    fn test_two_stages() {
        let commands = split("ls -l | grep foo").unwrap_or_default();
        assert_eq!(
            commands,
            vec![
                Command::new("ls", vec!["-l".into()]),
                Command::new("grep", vec!["foo".into()]),
            ]
        );
    }

    #[test]
    fn test_many_stages_keep_order() {
        let commands = split("a | b 1 | c 2 3 | d").unwrap_or_default();
        let programs: Vec<&str> = commands.iter().map(|c| c.program.as_str()).collect();
        assert_eq!(programs, vec!["a", "b", "c", "d"]);
        assert_eq!(commands[2].arguments, vec!["2", "3"]);
    }

    #[test]
    fn test_without_separator_is_one_command() {
        assert_eq!(split("echo hi").map(|c| c.len()), Ok(1));
    }

    #[test]
    fn test_leading_separator() {
        assert_eq!(split("| ls"), Err(ParseError::EmptyStage(Token::Pipe)));
    }

    #[test]
    fn test_trailing_separator() {
        assert_eq!(split("ls |"), Err(ParseError::EmptyStage(Token::Pipe)));
    }

    #[test]
    fn test_adjacent_separators() {
        assert_eq!(split("ls | | wc"), Err(ParseError::EmptyStage(Token::Pipe)));
    }

    #[test]
    fn test_operator_inside_stage() {
        assert_eq!(
            split("sort < in | uniq"),
            Err(ParseError::UnexpectedOperator(Token::Redirect(
                RedirectOp::Input
            )))
        );
    }
}
