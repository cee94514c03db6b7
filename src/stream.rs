//! The character-stream preprocessor (spec.md §4.1 "CharStream").
//!
//! Sits in front of the [lexer](crate::lexer): applies the CSS 3 input
//! preprocessing rules to raw source text, tracks 1-based line/column
//! positions, and exposes a small ring-buffer API (`begin_token`/`read_char`/
//! `backup`/`get_image`) that the lexer uses to carve out token images
//! without copying the whole source up front.

use crate::location::Position;

/// Default tab width used when expanding `\t` for column tracking.
pub const DEFAULT_TAB_SIZE: u32 = 8;

/// Applies the CSS 3 input-preprocessing filter to a single incoming
/// character, given the previous raw character (needed to collapse `\r\n`
/// into a single `\n`). Returns `None` when `c` was the second half of a
/// `\r\n` pair already emitted as `\n` for the `\r`.
///
/// Order, per spec.md §4.1:
/// 1. `U+0000` (NULL) -> `U+FFFD` (REPLACEMENT CHARACTER)
/// 2. `U+000C` (FF) -> `U+000A` (LF)
/// 3. `U+000D` (CR), or `U+000D U+000A` (CRLF) -> a single `U+000A` (LF)
/// 4. everything else passes through unchanged
fn filter_char(prev_raw: Option<char>, c: char) -> Option<char> {
    match c {
        '\0' => Some('\u{FFFD}'),
        '\u{000C}' => Some('\n'),
        '\r' => Some('\n'),
        '\n' if prev_raw == Some('\r') => None,
        other => Some(other),
    }
}

/// A single buffered, filtered character together with the raw source
/// position it came from. The ring buffer stores these so that `backup()`
/// can rewind both the character and the position bookkeeping exactly.
#[derive(Debug, Clone, Copy)]
struct BufferedChar {
    c: char,
    position: Position,
}

/// The character-stream preprocessor and ring buffer.
///
/// `CharStream` owns the filtered source as a `Vec<char>` (CSS source files
/// are small enough in practice that this is simpler and faster than a lazy
/// filtering iterator with its own lookback), plus a cursor and a
/// `token_start` mark. [`CharStream::begin_token`] sets `token_start` to the
/// cursor; [`CharStream::get_image`] slices `[token_start, cursor)`.
pub struct CharStream {
    chars: Vec<BufferedChar>,
    cursor: usize,
    token_start: usize,
    tab_size: u32,
}

impl CharStream {
    /// Builds a stream from raw source text, applying input preprocessing
    /// and computing line/column positions with the given tab size.
    pub fn new(source: &str, tab_size: u32) -> Self {
        let mut chars = Vec::with_capacity(source.len());
        let mut line: u32 = 1;
        let mut column: u32 = 1;
        let mut prev_raw: Option<char> = None;

        for c in source.chars() {
            if let Some(filtered) = filter_char(prev_raw, c) {
                chars.push(BufferedChar {
                    c: filtered,
                    position: Position::new(line, column),
                });
                if filtered == '\n' {
                    line += 1;
                    column = 1;
                } else if filtered == '\t' {
                    let advance = tab_size - ((column - 1) % tab_size);
                    column += advance;
                } else {
                    column += 1;
                }
            }
            prev_raw = Some(c);
        }

        CharStream {
            chars,
            cursor: 0,
            token_start: 0,
            tab_size,
        }
    }

    /// Builds a stream using the default tab size of 8.
    pub fn with_default_tab_size(source: &str) -> Self {
        Self::new(source, DEFAULT_TAB_SIZE)
    }

    pub fn tab_size(&self) -> u32 {
        self.tab_size
    }

    /// Marks the current cursor as the start of a new token's image.
    pub fn begin_token(&mut self) {
        self.token_start = self.cursor;
    }

    /// Reads and consumes the next filtered character, or `None` at end of
    /// input.
    pub fn read_char(&mut self) -> Option<char> {
        let buffered = self.chars.get(self.cursor)?;
        self.cursor += 1;
        Some(buffered.c)
    }

    /// Returns the next filtered character without consuming it.
    pub fn peek_char(&self) -> Option<char> {
        self.chars.get(self.cursor).map(|b| b.c)
    }

    /// Returns the character `offset` positions ahead without consuming
    /// anything (`lookahead(0)` is equivalent to [`peek_char`](Self::peek_char)).
    pub fn lookahead(&self, offset: usize) -> Option<char> {
        self.chars.get(self.cursor + offset).map(|b| b.c)
    }

    /// Rewinds the cursor by `n` characters. Never rewinds past
    /// `token_start`, since the lexer never needs to back up across a
    /// token boundary it has already committed with [`begin_token`](Self::begin_token).
    pub fn backup(&mut self, n: usize) {
        self.cursor = self.cursor.saturating_sub(n).max(self.token_start);
    }

    /// Returns the accumulated image since the last [`begin_token`](Self::begin_token) call.
    pub fn get_image(&self) -> String {
        self.chars[self.token_start..self.cursor].iter().map(|b| b.c).collect()
    }

    /// The position of the first character of the current token image.
    pub fn get_begin_position(&self) -> Position {
        self.chars
            .get(self.token_start)
            .map(|b| b.position)
            .unwrap_or_else(|| self.end_of_input_position())
    }

    /// The position just past the last character of the current token
    /// image (i.e. the position of the next unread character).
    pub fn get_end_position(&self) -> Position {
        self.chars
            .get(self.cursor)
            .map(|b| b.position)
            .unwrap_or_else(|| self.end_of_input_position())
    }

    /// True once the cursor has consumed every buffered character.
    pub fn is_at_end(&self) -> bool {
        self.cursor >= self.chars.len()
    }

    /// The synthesized position just past the last character in the
    /// source, used for EOF tokens and for end positions that land at or
    /// after the last buffered character.
    fn end_of_input_position(&self) -> Position {
        match self.chars.last() {
            Some(last) => {
                if last.c == '\n' {
                    Position::new(last.position.line + 1, 1)
                } else {
                    Position::new(last.position.line, last.position.column + 1)
                }
            }
            None => Position::new(1, 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_crlf_and_cr_and_ff_to_lf() {
        let stream = CharStream::with_default_tab_size("a\r\nb\rc\u{000C}d");
        let text: String = stream.chars.iter().map(|b| b.c).collect();
        assert_eq!(text, "a\nb\nc\nd");
    }

    #[test]
    fn replaces_nul_with_replacement_character() {
        let stream = CharStream::with_default_tab_size("a\0b");
        let text: String = stream.chars.iter().map(|b| b.c).collect();
        assert_eq!(text, "a\u{FFFD}b");
    }

    #[test]
    fn tracks_line_and_column_across_newlines() {
        let stream = CharStream::with_default_tab_size("ab\ncd");
        assert_eq!(stream.chars[0].position, Position::new(1, 1));
        assert_eq!(stream.chars[1].position, Position::new(1, 2));
        assert_eq!(stream.chars[2].position, Position::new(1, 3)); // the \n itself
        assert_eq!(stream.chars[3].position, Position::new(2, 1));
        assert_eq!(stream.chars[4].position, Position::new(2, 2));
    }

    #[test]
    fn expands_tabs_using_configured_tab_size() {
        let stream = CharStream::new("\tx", 4);
        assert_eq!(stream.chars[0].position, Position::new(1, 1));
        assert_eq!(stream.chars[1].position, Position::new(1, 5));
    }

    #[test]
    fn begin_token_read_and_get_image_round_trip() {
        let mut stream = CharStream::with_default_tab_size("foo bar");
        stream.begin_token();
        for _ in 0..3 {
            stream.read_char();
        }
        assert_eq!(stream.get_image(), "foo");
        assert_eq!(stream.get_begin_position(), Position::new(1, 1));
        assert_eq!(stream.get_end_position(), Position::new(1, 4));
    }

    #[test]
    fn backup_rewinds_cursor_but_not_past_token_start() {
        let mut stream = CharStream::with_default_tab_size("abcdef");
        stream.begin_token();
        for _ in 0..4 {
            stream.read_char();
        }
        stream.backup(2);
        assert_eq!(stream.get_image(), "ab");
        stream.backup(100);
        assert_eq!(stream.get_image(), "");
    }

    #[test]
    fn lookahead_does_not_consume() {
        let mut stream = CharStream::with_default_tab_size("xy");
        assert_eq!(stream.lookahead(0), Some('x'));
        assert_eq!(stream.lookahead(1), Some('y'));
        assert_eq!(stream.lookahead(2), None);
        assert_eq!(stream.read_char(), Some('x'));
    }

    #[test]
    fn end_of_input_position_follows_last_character() {
        let stream = CharStream::with_default_tab_size("ab");
        assert_eq!(stream.end_of_input_position(), Position::new(1, 3));

        let stream = CharStream::with_default_tab_size("ab\n");
        assert_eq!(stream.end_of_input_position(), Position::new(2, 1));
    }
}
