use thiserror::Error;

/// Hard cap on processes in one pipeline; anything longer is rejected
/// before a single pipe or process exists.
pub const MAX_STAGES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirKind {
    Input,
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub kind: RedirKind,
    pub target: String,
}

/// One command segment of a pipeline, immutable once parsed. `text` keeps
/// the original trimmed segment for the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub text: String,
    pub argv: Vec<String>,
    pub redirect: Option<Redirect>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("too many pipeline stages (max 20)")]
    TooManyStages,
    #[error("empty command in pipeline")]
    EmptyStage,
    #[error("Incorrect input redirection! (has to be in this form: command < file or command > file)")]
    MalformedRedirect,
}

/// First-level split on `sep`. Pieces are trimmed; empty pieces are kept so
/// the caller rejects them instead of exec'ing a blank program name.
pub fn split_on(input: &str, sep: char) -> Vec<String> {
    input.split(sep).map(|s| s.trim().to_string()).collect()
}

pub fn split_words(input: &str) -> Vec<String> {
    input.split_whitespace().map(|s| s.to_string()).collect()
}

/// Splits a line into parsed pipeline stages. All syntax errors (stage
/// limit, empty stage, malformed redirection) surface here, before any
/// process is spawned.
pub fn parse_line(line: &str) -> Result<Vec<Stage>, ParseError> {
    let stages = split_on(line, '|');
    if stages.len() > MAX_STAGES {
        return Err(ParseError::TooManyStages);
    }
    stages.iter().map(|s| parse_stage(s)).collect()
}

fn parse_stage(text: &str) -> Result<Stage, ParseError> {
    if text.is_empty() {
        return Err(ParseError::EmptyStage);
    }
    // One redirect per stage, `<` before `>`, first level only.
    let (command, redirect) = if text.contains('<') {
        split_redirect(text, '<', RedirKind::Input)?
    } else if text.contains('>') {
        split_redirect(text, '>', RedirKind::Output)?
    } else {
        (text.to_string(), None)
    };
    let argv = split_words(&command);
    if argv.is_empty() {
        return Err(ParseError::EmptyStage);
    }
    Ok(Stage { text: text.to_string(), argv, redirect })
}

fn split_redirect(
    text: &str,
    sep: char,
    kind: RedirKind,
) -> Result<(String, Option<Redirect>), ParseError> {
    let parts = split_on(text, sep);
    if parts.len() != 2 || parts.iter().any(|p| p.is_empty()) {
        return Err(ParseError::MalformedRedirect);
    }
    let redirect = Redirect { kind, target: parts[1].clone() };
    Ok((parts[0].clone(), Some(redirect)))
}
