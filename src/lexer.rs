//! The token producer (spec.md §4.2 "Lexer").
//!
//! Pulls filtered characters from a [`CharStream`], applies the optional
//! escape-unescaping pass (spec.md §4.1), and emits [`Token`]s. Comments are
//! skipped internally but never silently erase position information: the
//! token that follows a comment still reports its true position in the
//! source, since [`CharStream`] positions are tracked per raw character.

use std::rc::Rc;

use crate::error::{ParseErrorRecord, ParseException};
use crate::location::Position;
use crate::stream::CharStream;
use crate::token::{Token, TokenKind};

/// Units this lexer recognizes as a CSS `<dimension-token>` suffix. Matches
/// spec.md §4.2's "configurable extensible set": anything not in this list
/// is still lexed as `Dimension` (the unit identifier is just whatever
/// follows the number), since validating units is a property-table concern
/// out of this crate's scope, not the lexer's.
pub const KNOWN_UNITS: &[&str] = &[
    "px", "em", "rem", "ex", "ch", "vw", "vh", "vmin", "vmax", "cm", "mm", "in", "pt", "pc", "q",
    "s", "ms", "deg", "rad", "grad", "turn", "fr", "dpi", "dpcm", "dppx", "%",
];

/// Outcome of lexing a single token: either a token, or a parse problem that
/// the caller routes to the appropriate handler and then decides whether to
/// recover from (browser-compliant) or abort on (strict).
pub enum LexResult {
    Token(Token),
    /// A recoverable illegal-character condition (spec.md §4.2's
    /// "Error semantics"): the lexer still produced an `IllegalCharacter`
    /// token so the parser can skip past it, but also wants the caller to
    /// notify the parse-error handler.
    IllegalCharacter(Token),
    /// An unrecoverable condition (e.g. an unterminated string or comment
    /// reaching end of input without a matching terminator).
    Fatal(ParseException),
}

/// Configuration the lexer needs from [`crate::reader::ReaderOptions`].
#[derive(Debug, Clone, Copy)]
pub struct LexerOptions {
    pub css_unescape: bool,
    pub browser_compliant_mode: bool,
}

impl Default for LexerOptions {
    fn default() -> Self {
        LexerOptions {
            css_unescape: true,
            browser_compliant_mode: false,
        }
    }
}

pub struct Lexer {
    stream: CharStream,
    options: LexerOptions,
    /// Set after emitting a `UrlOpen` token; consumed by the next call to
    /// [`Lexer::next_token`] to decide whether an unquoted URL body token
    /// should be produced before falling back to normal dispatch (so that
    /// `url("a.png")` still lexes the string the ordinary way).
    after_url_open: bool,
}

impl Lexer {
    pub fn new(stream: CharStream, options: LexerOptions) -> Self {
        Lexer {
            stream,
            options,
            after_url_open: false,
        }
    }

    /// Reads the next filtered character, applying escape-unescaping
    /// (spec.md §4.1) when enabled and the character is a `\`.
    fn next_filtered(&mut self) -> Option<char> {
        let c = self.stream.read_char()?;
        if c != '\\' || !self.options.css_unescape {
            return Some(c);
        }
        self.unescape()
    }

    /// Called right after consuming a `\`. Implements the escape-unescaping
    /// state machine from spec.md §4.1.
    fn unescape(&mut self) -> Option<char> {
        let mut hex = String::new();
        while hex.len() < 6 {
            match self.stream.peek_char() {
                Some(c) if c.is_ascii_hexdigit() => {
                    hex.push(c);
                    self.stream.read_char();
                }
                _ => break,
            }
        }

        if !hex.is_empty() {
            if self.options.browser_compliant_mode
                && hex.len() == 1
                && (hex == "0" || hex == "9")
            {
                self.stream.backup(1);
                return Some('\\');
            }

            if let Some(c) = self.stream.peek_char() {
                if c.is_whitespace() {
                    self.stream.read_char();
                }
            }

            let value = u32::from_str_radix(&hex, 16).unwrap_or(0xFFFD);
            if value > 0xFFFF {
                // spec.md §4.1/§9: escapes above U+FFFF are reported and
                // dropped, not pair-encoded or substituted. Recurse past
                // the escape entirely rather than emitting any character.
                crate::css_log!("dropping escaped code point above U+FFFF: U+{:X}", value);
                return self.next_filtered();
            }
            return char::from_u32(value).or(Some('\u{FFFD}'));
        }

        match self.stream.peek_char() {
            Some('\n') => {
                self.stream.read_char();
                self.next_filtered()
            }
            _ => Some('\\'),
        }
    }

    /// Produces the next token, skipping whitespace runs and comments into
    /// their own `Whitespace` token (the parser discards these, but their
    /// presence lets position tracking for the next real token stay exact).
    pub fn next_token(&mut self) -> LexResult {
        if let Some(ws) = self.try_lex_whitespace_or_comment() {
            return ws;
        }

        let after_url_open = self.after_url_open;
        self.after_url_open = false;
        if after_url_open && !matches!(self.stream.peek_char(), Some('"') | Some('\'') | Some(')') | None) {
            return self.lex_unquoted_url();
        }

        self.stream.begin_token();
        let Some(c) = self.next_filtered() else {
            return LexResult::Token(self.make_token(TokenKind::Eof, String::new()));
        };

        match c {
            '"' | '\'' => self.lex_string(c),
            '#' => self.lex_hash(),
            '@' => self.lex_at_keyword(),
            '(' => LexResult::Token(self.make_token(TokenKind::LeftParen, "(")),
            ')' => LexResult::Token(self.make_token(TokenKind::RightParen, ")")),
            '{' => LexResult::Token(self.make_token(TokenKind::LeftBrace, "{")),
            '}' => LexResult::Token(self.make_token(TokenKind::RightBrace, "}")),
            '[' => LexResult::Token(self.make_token(TokenKind::LeftBracket, "[")),
            ']' => LexResult::Token(self.make_token(TokenKind::RightBracket, "]")),
            ';' => LexResult::Token(self.make_token(TokenKind::Semicolon, ";")),
            ':' => LexResult::Token(self.make_token(TokenKind::Colon, ":")),
            ',' => LexResult::Token(self.make_token(TokenKind::Comma, ",")),
            '/' => LexResult::Token(self.make_token(TokenKind::Slash, "/")),
            c if c == '-' || c == '_' || is_ident_start(c) => self.lex_ident_like(c),
            c if c.is_ascii_digit() => self.lex_numeric(c),
            '.' if matches!(self.stream.peek_char(), Some(d) if d.is_ascii_digit()) => {
                self.lex_numeric(c)
            }
            other => {
                let image = self.stream.get_image();
                let begin = self.stream.get_begin_position();
                let end = self.stream.get_end_position();
                let token = Token::new(TokenKind::Delim, image, begin, end);
                if is_printable_delim(other) {
                    LexResult::Token(token)
                } else {
                    LexResult::IllegalCharacter(Token::new(
                        TokenKind::IllegalCharacter,
                        other.to_string(),
                        begin,
                        end,
                    ))
                }
            }
        }
    }

    fn try_lex_whitespace_or_comment(&mut self) -> Option<LexResult> {
        let mut consumed_any = false;
        loop {
            match self.stream.peek_char() {
                Some(c) if c.is_whitespace() => {
                    if !consumed_any {
                        self.stream.begin_token();
                    }
                    consumed_any = true;
                    self.stream.read_char();
                }
                Some('/') if self.stream.lookahead(1) == Some('*') => {
                    if !consumed_any {
                        self.stream.begin_token();
                    }
                    consumed_any = true;
                    self.stream.read_char();
                    self.stream.read_char();
                    loop {
                        match self.stream.read_char() {
                            None => {
                                let pos = self.stream.get_end_position();
                                return Some(LexResult::Fatal(ParseException::new(
                                    "unterminated comment",
                                    pos,
                                )));
                            }
                            Some('*') if self.stream.peek_char() == Some('/') => {
                                self.stream.read_char();
                                break;
                            }
                            Some(_) => {}
                        }
                    }
                }
                _ => break,
            }
        }
        if consumed_any {
            Some(LexResult::Token(self.make_token(TokenKind::Whitespace, self.stream.get_image())))
        } else {
            None
        }
    }

    /// Lexes the body of an unquoted `url(...)` (spec.md §4.2: "the URI
    /// body is either a single unquoted token (limited character set) or a
    /// string").
    fn lex_unquoted_url(&mut self) -> LexResult {
        self.stream.begin_token();
        let mut value = String::new();
        loop {
            match self.stream.peek_char() {
                None | Some(')') => break,
                Some(c) if c.is_whitespace() => break,
                _ => match self.next_filtered() {
                    Some(c) => value.push(c),
                    None => break,
                },
            }
        }
        LexResult::Token(self.make_token(TokenKind::UnquotedUrl, value))
    }

    fn lex_string(&mut self, quote: char) -> LexResult {
        let mut value = String::new();
        loop {
            match self.next_filtered() {
                None => {
                    let pos = self.stream.get_end_position();
                    return LexResult::Fatal(ParseException::new("unterminated string", pos));
                }
                Some(c) if c == quote => break,
                Some('\n') => {
                    let pos = self.stream.get_end_position();
                    return LexResult::Fatal(ParseException::new(
                        "newline inside string literal",
                        pos,
                    ));
                }
                Some(c) => value.push(c),
            }
        }
        LexResult::Token(self.make_token(TokenKind::String, value))
    }

    fn lex_hash(&mut self) -> LexResult {
        let mut image = String::from("#");
        while let Some(c) = self.stream.peek_char() {
            if is_ident_continue(c) {
                image.push(c);
                self.stream.read_char();
            } else {
                break;
            }
        }
        LexResult::Token(self.make_token(TokenKind::Hash, image))
    }

    fn lex_at_keyword(&mut self) -> LexResult {
        let mut image = String::from("@");
        while let Some(c) = self.stream.peek_char() {
            if is_ident_continue(c) || c == '-' {
                image.push(c);
                self.stream.read_char();
            } else {
                break;
            }
        }
        LexResult::Token(self.make_token(TokenKind::AtKeyword, image))
    }

    fn lex_ident_like(&mut self, first: char) -> LexResult {
        let mut image = String::new();
        image.push(first);
        while let Some(c) = self.stream.peek_char() {
            if is_ident_continue(c) {
                image.push(c);
                self.stream.read_char();
            } else {
                break;
            }
        }

        match self.stream.peek_char() {
            Some('(') => {
                self.stream.read_char();
                let is_url = image.eq_ignore_ascii_case("url");
                let kind = if is_url { TokenKind::UrlOpen } else { TokenKind::FunctionOpen };
                image.push('(');
                let token = self.make_token(kind, image);
                if is_url {
                    self.after_url_open = true;
                }
                LexResult::Token(token)
            }
            _ => {
                let kind = if image.starts_with("--") {
                    TokenKind::CustomProperty
                } else {
                    TokenKind::Ident
                };
                LexResult::Token(self.make_token(kind, image))
            }
        }
    }

    fn lex_numeric(&mut self, first: char) -> LexResult {
        let mut image = String::new();
        image.push(first);
        let mut saw_dot = first == '.';

        while let Some(c) = self.stream.peek_char() {
            if c.is_ascii_digit() {
                image.push(c);
                self.stream.read_char();
            } else if c == '.' && !saw_dot {
                saw_dot = true;
                image.push(c);
                self.stream.read_char();
            } else {
                break;
            }
        }

        if matches!(self.stream.peek_char(), Some('e') | Some('E')) {
            let la1 = self.stream.lookahead(1);
            let exponent_follows = matches!(la1, Some(d) if d.is_ascii_digit())
                || (matches!(la1, Some('+') | Some('-'))
                    && matches!(self.stream.lookahead(2), Some(d) if d.is_ascii_digit()));
            if exponent_follows {
                image.push(self.stream.read_char().unwrap());
                if matches!(self.stream.peek_char(), Some('+') | Some('-')) {
                    image.push(self.stream.read_char().unwrap());
                }
                while matches!(self.stream.peek_char(), Some(d) if d.is_ascii_digit()) {
                    image.push(self.stream.read_char().unwrap());
                }
            }
        }

        if self.stream.peek_char() == Some('%') {
            self.stream.read_char();
            image.push('%');
            return LexResult::Token(self.make_token(TokenKind::Percentage, image));
        }

        let mut unit = String::new();
        while let Some(c) = self.stream.peek_char() {
            if is_ident_continue(c) {
                unit.push(c);
                self.stream.read_char();
            } else {
                break;
            }
        }

        if unit.is_empty() {
            LexResult::Token(self.make_token(TokenKind::Number, image))
        } else {
            image.push_str(&unit);
            LexResult::Token(self.make_token(TokenKind::Dimension, image))
        }
    }

    fn make_token(&self, kind: TokenKind, image: impl Into<Rc<str>>) -> Token {
        Token::new(kind, image, self.stream.get_begin_position(), self.stream.get_end_position())
    }

    pub fn current_position(&self) -> Position {
        self.stream.get_end_position()
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn is_printable_delim(c: char) -> bool {
    !c.is_control()
}

/// Used by [`ParseErrorRecord`] construction in the parser when an illegal
/// character is encountered outside of [`Lexer::next_token`]'s own fatal
/// paths.
pub fn illegal_character_record(token: Token, expected: &str) -> ParseErrorRecord {
    ParseErrorRecord {
        current_token: token,
        expected: expected.to_string(),
        skipped: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str, options: LexerOptions) -> Vec<Token> {
        let stream = CharStream::with_default_tab_size(source);
        let mut lexer = Lexer::new(stream, options);
        let mut tokens = Vec::new();
        loop {
            match lexer.next_token() {
                LexResult::Token(t) => {
                    let is_eof = t.is_eof();
                    tokens.push(t);
                    if is_eof {
                        break;
                    }
                }
                LexResult::IllegalCharacter(t) => tokens.push(t),
                LexResult::Fatal(_) => break,
            }
        }
        tokens
    }

    fn significant(tokens: Vec<Token>) -> Vec<Token> {
        tokens
            .into_iter()
            .filter(|t| !matches!(t.kind, TokenKind::Whitespace))
            .collect()
    }

    #[test]
    fn lexes_basic_rule_tokens() {
        let tokens = significant(lex_all(".foo { color: red; }", LexerOptions::default()));
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Delim,
                TokenKind::Ident,
                TokenKind::LeftBrace,
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::Ident,
                TokenKind::Semicolon,
                TokenKind::RightBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_custom_property_name() {
        let tokens = significant(lex_all("--main-color", LexerOptions::default()));
        assert_eq!(tokens[0].kind, TokenKind::CustomProperty);
        assert_eq!(&*tokens[0].image, "--main-color");
    }

    #[test]
    fn lexes_url_open_vs_function_open() {
        let tokens = significant(lex_all("url(a.png) calc(", LexerOptions::default()));
        assert_eq!(tokens[0].kind, TokenKind::UrlOpen);
        assert_eq!(tokens[1].kind, TokenKind::UnquotedUrl);
        assert_eq!(&*tokens[1].image, "a.png");
        assert_eq!(tokens[2].kind, TokenKind::RightParen);
        assert_eq!(tokens[3].kind, TokenKind::FunctionOpen);
    }

    #[test]
    fn lexes_quoted_url_body_as_string() {
        let tokens = significant(lex_all(r#"url("a.png")"#, LexerOptions::default()));
        assert_eq!(tokens[0].kind, TokenKind::UrlOpen);
        assert_eq!(tokens[1].kind, TokenKind::String);
        assert_eq!(&*tokens[1].image, "a.png");
        assert_eq!(tokens[2].kind, TokenKind::RightParen);
    }

    #[test]
    fn lexes_dimension_and_percentage() {
        let tokens = significant(lex_all("10px 50%", LexerOptions::default()));
        assert_eq!(tokens[0].kind, TokenKind::Dimension);
        assert_eq!(&*tokens[0].image, "10px");
        assert_eq!(tokens[1].kind, TokenKind::Percentage);
        assert_eq!(&*tokens[1].image, "50%");
    }

    #[test]
    fn unescapes_hex_escape_to_code_point() {
        let tokens = significant(lex_all(r"\41 bc", LexerOptions::default()));
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(&*tokens[0].image, "Abc");
    }

    #[test]
    fn escape_above_u_ffff_is_dropped_not_substituted() {
        // \1F600 is an emoji outside the BMP; spec.md §4.1/§9 says this
        // crate drops it (reporting via `css_log!`) rather than keeping it
        // or substituting U+FFFD for it.
        let tokens = significant(lex_all(r"a\1F600 b", LexerOptions::default()));
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(&*tokens[0].image, "ab");
    }

    #[test]
    fn ie_hack_escape_preserved_in_browser_compliant_mode() {
        let options = LexerOptions {
            css_unescape: true,
            browser_compliant_mode: true,
        };
        let tokens = significant(lex_all(r"\9", options));
        assert_eq!(tokens[0].kind, TokenKind::Delim);
        assert_eq!(&*tokens[0].image, "\\");
    }

    #[test]
    fn skips_comments_between_tokens() {
        let tokens = significant(lex_all("a/* comment */b", LexerOptions::default()));
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[1].kind, TokenKind::Ident);
    }

    #[test]
    fn illegal_character_is_reported() {
        let tokens = lex_all("\u{0001}", LexerOptions::default());
        assert!(matches!(tokens[0].kind, TokenKind::IllegalCharacter));
    }
}
