use std::error::Error;
use std::fmt;

use super::ast::{Command, Node, Pipeline, Redirection};
use super::classifier::{classify, Strategy};
use super::lexer::{RedirectOp, Token};
use super::splitter::{command_from_words, split_commands};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A separator with nothing on one side of it.
    EmptyStage(Token),
    /// An operator where this shell does not accept one.
    UnexpectedOperator(Token),
    MissingCommand,
    MissingRedirectTarget(RedirectOp),
    /// More than a single filename after a redirection operator.
    ExtraRedirectTarget(RedirectOp),
    MultipleRedirections,
    /// Builtins are run by the shell itself and never reach the parser.
    Builtin(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(word) => write!(f, "{}", word),
            Token::Pipe => write!(f, "|"),
            Token::Background => write!(f, "&"),
            Token::Redirect(RedirectOp::Input) => write!(f, "<"),
            Token::Redirect(RedirectOp::Output) => write!(f, ">"),
            Token::EOF => write!(f, "newline"),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::EmptyStage(sep) => {
                write!(f, "syntax error: empty command around `{}`", sep)
            }
            ParseError::UnexpectedOperator(op) => {
                write!(f, "syntax error: unexpected `{}`", op)
            }
            ParseError::MissingCommand => write!(f, "syntax error: missing command"),
            ParseError::MissingRedirectTarget(op) => write!(
                f,
                "syntax error: expected filename after `{}`",
                Token::Redirect(*op)
            ),
            ParseError::ExtraRedirectTarget(op) => write!(
                f,
                "syntax error: expected a single filename after `{}`",
                Token::Redirect(*op)
            ),
            ParseError::MultipleRedirections => {
                write!(f, "syntax error: only one redirection per command")
            }
            ParseError::Builtin(name) => write!(f, "{} is a shell builtin", name),
        }
    }
}

impl Error for ParseError {}

/// Turns a token sequence into a [`Node`] following the classifier's
/// strategy. Nothing is spawned here, so every rejection happens before fork.
pub fn parse(tokens: &[Token]) -> Result<Node, ParseError> {
    match classify(tokens) {
        Strategy::Builtin => Err(ParseError::Builtin(
            tokens
                .first()
                .map(ToString::to_string)
                .unwrap_or_default(),
        )),
        Strategy::Background => parse_background(tokens),
        Strategy::Pipeline => parse_pipeline(tokens),
        Strategy::Redirect(op) => parse_redirection(tokens, op).map(Node::Redirect),
        Strategy::Plain => command_from_words(tokens).map(Node::Command),
    }
}

fn parse_background(tokens: &[Token]) -> Result<Node, ParseError> {
    let (last, rest) = match tokens.split_last() {
        Some(split) => split,
        None => return Err(ParseError::MissingCommand),
    };
    if *last != Token::Background || rest.contains(&Token::Background) {
        return Err(ParseError::UnexpectedOperator(Token::Background));
    }
    if rest.is_empty() {
        return Err(ParseError::MissingCommand);
    }

    let inner = match classify(rest) {
        Strategy::Builtin => {
            return Err(ParseError::Builtin(
                rest.first().map(ToString::to_string).unwrap_or_default(),
            ))
        }
        Strategy::Pipeline => parse_pipeline(rest)?,
        Strategy::Redirect(op) => Node::Redirect(parse_redirection(rest, op)?),
        Strategy::Plain | Strategy::Background => Node::Command(command_from_words(rest)?),
    };
    Ok(Node::Background(Box::new(inner)))
}

fn parse_pipeline(tokens: &[Token]) -> Result<Node, ParseError> {
    let stages = split_commands(tokens, &Token::Pipe)?;
    Pipeline::new(stages)
        .map(Node::Pipeline)
        .ok_or(ParseError::EmptyStage(Token::Pipe))
}

/// Expects `program [args..] OP filename` with exactly one operator.
fn parse_redirection(tokens: &[Token], operator: RedirectOp) -> Result<Redirection, ParseError> {
    let redirects = tokens
        .iter()
        .filter(|token| matches!(token, Token::Redirect(_)))
        .count();
    if redirects > 1 {
        return Err(ParseError::MultipleRedirections);
    }

    let position = tokens
        .iter()
        .position(|token| *token == Token::Redirect(operator))
        .ok_or(ParseError::MissingRedirectTarget(operator))?;
    let (head, tail) = tokens.split_at(position);

    let filename = match &tail[1..] {
        [] => return Err(ParseError::MissingRedirectTarget(operator)),
        [Token::Word(filename)] => filename.clone(),
        [other] => return Err(ParseError::UnexpectedOperator(other.clone())),
        _ => return Err(ParseError::ExtraRedirectTarget(operator)),
    };

    let command: Command = command_from_words(head)?;
    Ok(Redirection {
        command,
        operator,
        filename,
    })
}
