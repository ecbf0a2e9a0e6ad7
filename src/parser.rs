use crate::lexer;
use std::fmt;

/// Separator between the stages of a pipeline.
pub const PIPE: char = '|';

/// Files a simple command's standard streams are redirected to.
///
/// Each side is either absent or names exactly one file, taken from the token
/// right after the `<` or `>` operator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Redirection<'a> {
    /// Target of `<`: becomes the child's standard input.
    pub input: Option<&'a str>,
    /// Target of `>`: created or truncated, becomes the child's standard output.
    pub output: Option<&'a str>,
}

impl Redirection<'_> {
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none()
    }
}

/// A classified input line, ready for dispatch.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandLine<'a> {
    /// Nothing to execute.
    Empty,
    /// A single command, possibly with redirections. `argv[0]` is the program
    /// or builtin name.
    Simple {
        argv: Vec<&'a str>,
        redirection: Redirection<'a>,
    },
    /// Commands connected by pipes, in execution order. Redirection operators
    /// are not interpreted inside stages.
    Pipeline(Vec<Vec<&'a str>>),
}

/// Errors that can occur while classifying a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    /// A line containing `|` did not yield two non-empty stages
    /// (e.g. `ls |` or `| wc`).
    InvalidPipeline,
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsingError::InvalidPipeline => write!(f, "Invalid pipe command"),
        }
    }
}

impl std::error::Error for ParsingError {}

/// Extracts `<` and `>` redirections from `argv`.
///
/// The vector is scanned left to right. When an operator is followed by another
/// token, that token is recorded as the target and the operator's slot becomes
/// the end of the vector. Nothing is shifted left, so every token after the
/// first recognized operator disappears from the effective command line:
/// `echo a > f b` runs `echo a`. An operator in last position is ignored, and
/// when an operator appears several times the last one scanned wins.
pub fn resolve_redirections<'a>(argv: &mut Vec<&'a str>) -> Redirection<'a> {
    let mut redirection = Redirection::default();
    let mut end = argv.len();
    for (i, token) in argv.iter().enumerate() {
        let Some(&target) = argv.get(i + 1) else {
            continue;
        };
        match *token {
            ">" => redirection.output = Some(target),
            "<" => redirection.input = Some(target),
            _ => continue,
        }
        end = end.min(i);
    }
    argv.truncate(end);
    redirection
}

/// Splits a line at the pipe separator into its first two stages.
///
/// Empty segments are skipped, so `a || b` is `a` piped into `b`. Only two stages
/// are produced: in `a | b | c` the text after the second separator is dropped.
pub fn split_pipeline(line: &str) -> Result<(&str, &str), ParsingError> {
    let mut segments = line.split(PIPE).filter(|segment| !segment.is_empty());
    match (segments.next(), segments.next()) {
        (Some(first), Some(second)) => Ok((first, second)),
        _ => Err(ParsingError::InvalidPipeline),
    }
}

/// Classifies one input line.
///
/// Lines containing the pipe separator become a two-stage [`CommandLine::Pipeline`];
/// everything else is tokenized and has its redirections resolved.
pub fn parse_line(line: &str, max_args: usize) -> Result<CommandLine<'_>, ParsingError> {
    if line.contains(PIPE) {
        let (first, second) = split_pipeline(line)?;
        let stages: Vec<Vec<&str>> = [first, second]
            .into_iter()
            .map(|stage| lexer::split_into_tokens(stage, max_args))
            .collect();
        if stages.iter().any(|argv| argv.is_empty()) {
            return Err(ParsingError::InvalidPipeline);
        }
        return Ok(CommandLine::Pipeline(stages));
    }

    let mut argv = lexer::split_into_tokens(line, max_args);
    let redirection = resolve_redirections(&mut argv);
    if argv.is_empty() {
        return Ok(CommandLine::Empty);
    }
    Ok(CommandLine::Simple { argv, redirection })
}
