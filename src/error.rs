// Error types for the pattern language.
//
// Diagnostics are line-oriented: every error carries the 1-based source line
// it was raised on. The first error terminates the pass that produced it.

use std::fmt;

/// Error raised while tokenizing source text.
#[derive(Debug, Clone)]
pub struct LexerError {
    pub message: String,
    pub line: u32,
}

impl LexerError {
    pub fn new(message: impl Into<String>, line: u32) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lexer error at line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for LexerError {}

/// Error raised while parsing the token stream.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: u32) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Error raised while evaluating the AST against a byte source.
#[derive(Debug, Clone)]
pub struct EvaluateError {
    pub message: String,
    pub line: u32,
}

impl EvaluateError {
    pub fn new(message: impl Into<String>, line: u32) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for EvaluateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "evaluate error at line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for EvaluateError {}

/// Top-level error type returned by the engine façade.
#[derive(Debug, Clone)]
pub enum Error {
    Lexer(LexerError),
    Parse(ParseError),
    Evaluate(EvaluateError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Lexer(e) => write!(f, "{}", e),
            Error::Parse(e) => write!(f, "{}", e),
            Error::Evaluate(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<LexerError> for Error {
    fn from(e: LexerError) -> Self {
        Error::Lexer(e)
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e)
    }
}

impl From<EvaluateError> for Error {
    fn from(e: EvaluateError) -> Self {
        Error::Evaluate(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_carry_their_line() {
        let e = LexerError::new("unknown token", 7);
        assert_eq!(e.line, 7);
        assert_eq!(e.to_string(), "lexer error at line 7: unknown token");
    }

    #[test]
    fn top_level_error_wraps_all_kinds() {
        let e: Error = EvaluateError::new("could not find identifier 'x'", 3).into();
        assert!(matches!(e, Error::Evaluate(_)));
        assert_eq!(
            e.to_string(),
            "evaluate error at line 3: could not find identifier 'x'"
        );
    }
}
