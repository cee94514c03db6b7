//! The public entry point (spec.md §6 "External interfaces").
//!
//! Two ways in: [`parse_text`] for already-decoded source, and
//! [`parse_bytes`] for raw input whose encoding this module resolves first
//! (spec.md §6 "Encoding resolution order": BOM, then a `@charset` rule at
//! byte offset 0, then the caller's fallback, defaulting to ISO-8859-1).
//! Both drive the same `CharStream -> Lexer -> Parser -> interpreter`
//! pipeline and return `None` only when strict mode raised a fatal
//! exception before any usable tree existed (spec.md §7): the handlers
//! passed in `options` have already been notified by the time that
//! happens, so `None` is purely a "nothing more to hand back" signal, not
//! the only place an error surfaces.

use crate::cssom::CascadingStyleSheet;
use crate::error::{InterpretErrorHandler, NullErrorHandler, ParseErrorHandler, ParseExceptionHandler};
use crate::interpreter::{self, InterpreterOptions};
use crate::lexer::{Lexer, LexerOptions};
use crate::parser::{Parser, ParserOptions};
use crate::stream::CharStream;

/// The CSS grammar variant to parse against. Spec.md §6 names this as a
/// forward-compatibility slot; CSS3 is the only variant this crate
/// implements today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CssVersion {
    #[default]
    Css3,
}

/// Every knob spec.md §6's "ReaderOptions" table names, gathered in one
/// struct so a caller configures the whole pipeline (character-stream tab
/// size, lexer escaping/recovery mode, parser recovery mode and
/// deprecated-property handling, interpreter source-location tracking, and
/// all three error-handler slots) in one place rather than threading each
/// sub-module's own options type through by hand.
pub struct ReaderOptions<'h> {
    pub css_version: CssVersion,
    /// Encoding name used when `parse_bytes` finds neither a BOM nor a
    /// `@charset` rule. Defaults to `"ISO-8859-1"` (spec.md §6).
    pub fallback_charset: String,
    pub browser_compliant_mode: bool,
    pub use_source_location: bool,
    pub tab_size: u32,
    pub css_unescape: bool,
    pub keep_deprecated_properties: bool,
    pub error_handler: &'h dyn ParseErrorHandler,
    pub exception_handler: &'h dyn ParseExceptionHandler,
    pub interpret_error_handler: &'h dyn InterpretErrorHandler,
}

impl<'h> ReaderOptions<'h> {
    /// Builds a `ReaderOptions` with every scalar field at spec.md §6's
    /// stated default (CSS3, ISO-8859-1 fallback, browser-compliant mode
    /// off, source-location tracking on, tab size 8, unescaping on) and the
    /// given handlers.
    ///
    /// `keep_deprecated_properties` defaults to `false` here even though
    /// [`ParserOptions::default`] defaults it to `true` — spec.md's
    /// ReaderOptions table gives no default for this field, so this crate
    /// resolves the gap in the caller-facing direction (opt in to keeping
    /// IE-hack declarations, rather than opt out), and always passes the
    /// choice through explicitly rather than relying on
    /// `ParserOptions::default()`. Recorded as an Open Question resolution
    /// in `DESIGN.md`.
    ///
    /// A free function rather than a `Default` impl taking no arguments,
    /// since the handler fields are borrowed and so have no value that
    /// outlives every possible caller; [`ReaderOptions::default`] plugs in
    /// [`NullErrorHandler`] for callers who don't need custom handlers.
    pub fn new(
        error_handler: &'h dyn ParseErrorHandler,
        exception_handler: &'h dyn ParseExceptionHandler,
        interpret_error_handler: &'h dyn InterpretErrorHandler,
    ) -> Self {
        ReaderOptions {
            css_version: CssVersion::default(),
            fallback_charset: "ISO-8859-1".to_string(),
            browser_compliant_mode: false,
            use_source_location: true,
            tab_size: 8,
            css_unescape: true,
            keep_deprecated_properties: false,
            error_handler,
            exception_handler,
            interpret_error_handler,
        }
    }
}

impl Default for ReaderOptions<'static> {
    fn default() -> Self {
        static NULL_HANDLER: NullErrorHandler = NullErrorHandler;
        ReaderOptions::new(&NULL_HANDLER, &NULL_HANDLER, &NULL_HANDLER)
    }
}

/// Parses already-decoded CSS3 source text into a CSSOM.
pub fn parse_text(source: &str, options: &ReaderOptions<'_>) -> Option<CascadingStyleSheet> {
    let stream = CharStream::new(source, options.tab_size);
    let lexer = Lexer::new(
        stream,
        LexerOptions {
            css_unescape: options.css_unescape,
            browser_compliant_mode: options.browser_compliant_mode,
        },
    );
    let mut parser = Parser::new(
        lexer,
        ParserOptions {
            browser_compliant_mode: options.browser_compliant_mode,
            keep_deprecated_properties: options.keep_deprecated_properties,
        },
        options.error_handler,
        options.exception_handler,
    );

    let root = parser.parse_stylesheet()?;
    Some(interpreter::interpret(
        &root,
        InterpreterOptions {
            use_source_location: options.use_source_location,
        },
        options.interpret_error_handler,
    ))
}

/// Parses raw bytes of unknown encoding, resolving the encoding first
/// (spec.md §6 "Encoding resolution order"):
///
/// 1. A byte-order mark, if present.
/// 2. A literal `@charset "name";` at byte offset 0, if present.
/// 3. `options.fallback_charset`.
pub fn parse_bytes(bytes: &[u8], options: &ReaderOptions<'_>) -> Option<CascadingStyleSheet> {
    let source = decode(bytes, &options.fallback_charset);
    parse_text(&source, options)
}

/// Byte-order marks this crate recognizes, with the length to strip and the
/// charset name implied by each.
const BOMS: &[(&[u8], &str)] = &[
    (&[0xEF, 0xBB, 0xBF], "UTF-8"),
    (&[0xFF, 0xFE], "UTF-16LE"),
    (&[0xFE, 0xFF], "UTF-16BE"),
];

fn decode(bytes: &[u8], fallback_charset: &str) -> String {
    for (bom, charset) in BOMS {
        if let Some(rest) = bytes.strip_prefix(*bom) {
            return decode_with_charset(rest, charset);
        }
    }

    if let Some(charset) = sniff_charset_rule(bytes) {
        return decode_with_charset(bytes, &charset);
    }

    decode_with_charset(bytes, fallback_charset)
}

/// Looks for a literal `@charset "..."`  at byte offset 0 (spec.md §6: the
/// rule is required to be pure ASCII at the very start of the file
/// regardless of the eventual encoding, which is what lets this scan happen
/// before the encoding itself is known).
fn sniff_charset_rule(bytes: &[u8]) -> Option<String> {
    const PREFIX: &[u8] = b"@charset \"";
    let rest = bytes.strip_prefix(PREFIX)?;
    let end = rest.iter().position(|&b| b == b'"')?;
    if rest.get(end + 1) != Some(&b';') {
        return None;
    }
    String::from_utf8(rest[..end].to_vec()).ok()
}

/// Decodes `bytes` as `charset`. Only the encodings this crate can name
/// without an external dependency are supported; anything else falls back
/// to treating the bytes as ISO-8859-1, which never fails (every byte value
/// is a valid Latin-1 code point, so this always produces *some* text,
/// even if the wrong text for a truly unsupported encoding — spec.md names
/// no behavior for that case beyond "falls back").
fn decode_with_charset(bytes: &[u8], charset: &str) -> String {
    match charset.to_ascii_uppercase().as_str() {
        "UTF-8" | "UTF8" => String::from_utf8(bytes.to_vec()).unwrap_or_else(|e| decode_latin1(e.as_bytes())),
        "UTF-16LE" => decode_utf16(bytes, u16::from_le_bytes),
        "UTF-16BE" => decode_utf16(bytes, u16::from_be_bytes),
        _ => decode_latin1(bytes),
    }
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn decode_utf16(bytes: &[u8], from_bytes: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|pair| from_bytes([pair[0], pair[1]]));
    char::decode_utf16(units).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_stylesheet_from_text() {
        let options = ReaderOptions::default();
        let sheet = parse_text(".a { color: red; }", &options).expect("browser-compliant parse never returns None");
        assert_eq!(sheet.rules.len(), 1);
    }

    #[test]
    fn utf8_bom_is_stripped_before_parsing() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b".a { color: red; }");
        let options = ReaderOptions::default();
        let sheet = parse_bytes(&bytes, &options).expect("browser-compliant parse never returns None");
        assert_eq!(sheet.rules.len(), 1);
    }

    #[test]
    fn charset_rule_at_offset_zero_overrides_fallback() {
        let mut bytes = b"@charset \"UTF-8\";".to_vec();
        bytes.extend_from_slice(".a { color: red; }".as_bytes());
        let options = ReaderOptions {
            fallback_charset: "ISO-8859-1".to_string(),
            ..ReaderOptions::default()
        };
        let sheet = parse_bytes(&bytes, &options).expect("browser-compliant parse never returns None");
        assert_eq!(sheet.charset.as_deref(), Some("UTF-8"));
    }

    #[test]
    fn falls_back_to_latin1_with_no_bom_or_charset_rule() {
        let bytes = vec![b'a', 0xE9, b'b']; // 0xE9 is e-acute in Latin-1
        let decoded = decode(&bytes, "ISO-8859-1");
        assert_eq!(decoded, "a\u{E9}b");
    }

    #[test]
    fn bom_takes_priority_over_a_charset_rule() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"@charset \"ISO-8859-1\";.a{color:red}");
        let decoded = decode(&bytes, "ISO-8859-1");
        assert!(decoded.starts_with("@charset \"ISO-8859-1\""));
    }

    #[test]
    fn strict_mode_fatal_failure_returns_none() {
        use crate::error::{ParseErrorRecord, ParseException};

        struct PanicOnAnything;
        impl ParseErrorHandler for PanicOnAnything {
            fn on_parse_error(&self, _error: ParseErrorRecord) {}
        }
        impl ParseExceptionHandler for PanicOnAnything {
            fn on_parse_exception(&self, _exception: ParseException) {}
        }
        impl InterpretErrorHandler for PanicOnAnything {
            fn on_css_interpretation_warning(&self, _message: &str, _location: Option<crate::location::SourceLocation>) {}
            fn on_css_interpretation_error(&self, _message: &str, _location: Option<crate::location::SourceLocation>) {}
        }

        let handler = PanicOnAnything;
        let options = ReaderOptions {
            browser_compliant_mode: false,
            ..ReaderOptions::new(&handler, &handler, &handler)
        };
        // An unterminated string is unrecoverable even for the lexer, and
        // strict mode raises rather than repairing it.
        let result = parse_text(".a { color: \"unterminated", &options);
        assert!(result.is_none());
    }
}
