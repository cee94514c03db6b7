//! Error types, and the pluggable error-handler traits from spec.md §6/§7.
//!
//! Modeled on librsvg's `error.rs`: plain enums and structs with hand-written
//! `Display`/`Error` impls, rather than a derive-macro crate. No exceptions
//! unwind across the pipeline for recoverable problems (spec.md §7); instead,
//! every recoverable or fatal condition is handed to one of the three
//! injected handler traits below.

use std::error;
use std::fmt;
use std::sync::Mutex;

use crate::location::{Position, SourceLocation};
use crate::token::Token;

/// A recoverable grammar violation that browser-compliant mode skipped over
/// (spec.md §7 "Parse error (recoverable)").
#[derive(Debug, Clone)]
pub struct ParseErrorRecord {
    /// The token at which the violation was detected.
    pub current_token: Token,
    /// A human-readable description of what was expected instead.
    pub expected: String,
    /// The first and last token of the range that was skipped to recover,
    /// if recovery actually skipped anything (as opposed to, say, dropping a
    /// single malformed declaration with nothing to skip over).
    pub skipped: Option<(Token, Token)>,
}

impl fmt::Display for ParseErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse error at {}: expected {}, found {:?}",
            self.current_token.begin, self.expected, self.current_token.image
        )?;
        if let Some((first, last)) = &self.skipped {
            write!(f, " (skipped {} .. {})", first.begin, last.end)?;
        }
        Ok(())
    }
}

impl error::Error for ParseErrorRecord {}

/// A fatal grammar violation (spec.md §7 "Parse exception (fatal)").
///
/// Only raised in strict mode, or for violations browser-compliant mode
/// cannot repair (an unbalanced construct at end of input, for example).
#[derive(Debug, Clone)]
pub struct ParseException {
    pub message: String,
    pub position: Position,
}

impl ParseException {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        ParseException {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for ParseException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fatal parse error at {}: {}", self.position, self.message)
    }
}

impl error::Error for ParseException {}

/// Severity of an [`InterpretationIssue`] (spec.md §4.4 error-handler interface).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Severity {
    /// Recoverable: the interpreter repaired the tree and continues.
    Warning,
    /// Unrecoverable shape violation: the interpreter also raises after
    /// reporting it.
    Error,
}

/// A problem found while walking the CST into the CSSOM (spec.md §4.4/§7).
#[derive(Debug, Clone)]
pub struct InterpretationIssue {
    pub severity: Severity,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl InterpretationIssue {
    pub fn warning(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        InterpretationIssue {
            severity: Severity::Warning,
            message: message.into(),
            location,
        }
    }

    pub fn error(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        InterpretationIssue {
            severity: Severity::Error,
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for InterpretationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Warning => write!(f, "interpretation warning: {}", self.message),
            Severity::Error => write!(f, "interpretation error: {}", self.message),
        }?;
        if let Some(loc) = &self.location {
            write!(f, " ({})", loc)?;
        }
        Ok(())
    }
}

impl error::Error for InterpretationIssue {}

/// Raised internally when an [`InterpretationIssue`] is unrecoverable; this
/// never crosses a public API boundary. [`crate::reader`] catches it and
/// turns the overall parse into `None` after notifying the handler.
#[derive(Debug, Clone)]
pub struct FatalInterpretationError(pub InterpretationIssue);

impl fmt::Display for FatalInterpretationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl error::Error for FatalInterpretationError {}

/// Receives recoverable parse errors (spec.md §6 `custom_error_handler`).
pub trait ParseErrorHandler {
    fn on_parse_error(&self, error: ParseErrorRecord);
}

/// Receives fatal parse exceptions (spec.md §6 `custom_exception_handler`).
pub trait ParseExceptionHandler {
    fn on_parse_exception(&self, exception: ParseException);
}

/// Receives interpreter warnings and errors (spec.md §6 `interpret_error_handler`,
/// §4.4 "Error-handler interface").
pub trait InterpretErrorHandler {
    fn on_css_interpretation_warning(&self, message: &str, location: Option<SourceLocation>);
    fn on_css_interpretation_error(&self, message: &str, location: Option<SourceLocation>);
}

/// A handler that silently discards everything. The default for all three
/// handler slots in [`crate::reader::ReaderOptions`] when the caller supplies
/// none, so that parsing never panics for lack of a handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullErrorHandler;

impl ParseErrorHandler for NullErrorHandler {
    fn on_parse_error(&self, _error: ParseErrorRecord) {}
}

impl ParseExceptionHandler for NullErrorHandler {
    fn on_parse_exception(&self, _exception: ParseException) {}
}

impl InterpretErrorHandler for NullErrorHandler {
    fn on_css_interpretation_warning(&self, _message: &str, _location: Option<SourceLocation>) {}
    fn on_css_interpretation_error(&self, _message: &str, _location: Option<SourceLocation>) {}
}

/// A handler that records everything it is told, guarding its internal list
/// with a mutex (spec.md §5: a collecting handler shared across concurrent
/// parses must not lose or interleave records).
#[derive(Debug, Default)]
pub struct CollectingErrorHandler {
    parse_errors: Mutex<Vec<ParseErrorRecord>>,
    parse_exceptions: Mutex<Vec<ParseException>>,
    interpretation_issues: Mutex<Vec<InterpretationIssue>>,
}

impl CollectingErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_errors(&self) -> Vec<ParseErrorRecord> {
        self.parse_errors.lock().unwrap().clone()
    }

    pub fn parse_exceptions(&self) -> Vec<ParseException> {
        self.parse_exceptions.lock().unwrap().clone()
    }

    pub fn interpretation_issues(&self) -> Vec<InterpretationIssue> {
        self.interpretation_issues.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.parse_errors.lock().unwrap().is_empty()
            && self.parse_exceptions.lock().unwrap().is_empty()
            && self.interpretation_issues.lock().unwrap().is_empty()
    }
}

impl ParseErrorHandler for CollectingErrorHandler {
    fn on_parse_error(&self, error: ParseErrorRecord) {
        self.parse_errors.lock().unwrap().push(error);
    }
}

impl ParseExceptionHandler for CollectingErrorHandler {
    fn on_parse_exception(&self, exception: ParseException) {
        self.parse_exceptions.lock().unwrap().push(exception);
    }
}

impl InterpretErrorHandler for CollectingErrorHandler {
    fn on_css_interpretation_warning(&self, message: &str, location: Option<SourceLocation>) {
        self.interpretation_issues
            .lock()
            .unwrap()
            .push(InterpretationIssue::warning(message, location));
    }

    fn on_css_interpretation_error(&self, message: &str, location: Option<SourceLocation>) {
        self.interpretation_issues
            .lock()
            .unwrap()
            .push(InterpretationIssue::error(message, location));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn dummy_token() -> Token {
        Token::new(TokenKind::Ident, "foo", Position::new(1, 1), Position::new(1, 4))
    }

    #[test]
    fn collecting_handler_records_everything() {
        let handler = CollectingErrorHandler::new();
        assert!(handler.is_empty());

        handler.on_parse_error(ParseErrorRecord {
            current_token: dummy_token(),
            expected: "';' or '}'".to_string(),
            skipped: None,
        });
        handler.on_parse_exception(ParseException::new("unexpected eof", Position::new(2, 1)));
        handler.on_css_interpretation_warning("unknown medium", None);
        handler.on_css_interpretation_error("declaration-list before selector-list", None);

        assert_eq!(handler.parse_errors().len(), 1);
        assert_eq!(handler.parse_exceptions().len(), 1);
        assert_eq!(handler.interpretation_issues().len(), 2);
        assert!(!handler.is_empty());
    }

    #[test]
    fn null_handler_discards_everything() {
        let handler = NullErrorHandler;
        handler.on_parse_error(ParseErrorRecord {
            current_token: dummy_token(),
            expected: "x".to_string(),
            skipped: None,
        });
        handler.on_parse_exception(ParseException::new("x", Position::new(1, 1)));
        handler.on_css_interpretation_warning("x", None);
        handler.on_css_interpretation_error("x", None);
    }
}
