//! The recursive-descent, recoverable parser (spec.md §4.3).
//!
//! Consumes tokens from [`crate::lexer::Lexer`] and builds a [`crate::cst`]
//! tree. Runs in one of two modes (spec.md "Recovery ladder"): strict (the
//! first syntax error raises a fatal [`ParseException`]) or browser-compliant
//! (syntax errors inside a declaration skip to the next `;` or matching `}`;
//! syntax errors inside a rule skip to the next balanced `}` at the current
//! nesting depth). Every skip is reported to the injected
//! [`ParseErrorHandler`] with the first/last skipped tokens; a fatal
//! exception goes to the injected [`ParseExceptionHandler`].

use crate::cst::{new_node, CstData, CstKind, CstNode};
use crate::error::{ParseErrorHandler, ParseErrorRecord, ParseException, ParseExceptionHandler};
use crate::lexer::{Lexer, LexResult, LexerOptions};
use crate::location::Position;
use crate::token::{Token, TokenKind};

/// Options the parser needs from [`crate::reader::ReaderOptions`].
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    pub browser_compliant_mode: bool,
    pub keep_deprecated_properties: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            browser_compliant_mode: false,
            keep_deprecated_properties: true,
        }
    }
}

/// Signals that the current construct could not be parsed; carries nothing
/// beyond the fact, since the token causing the failure is always still the
/// parser's `current` token when this is returned.
struct SyntaxError {
    expected: String,
}

type PResult<T> = Result<T, SyntaxError>;

/// Whether the whole parse should stop: set when strict mode hits its first
/// error, or when browser-compliant recovery cannot find a place to resume
/// (e.g. an unbalanced construct running off the end of input).
enum StopReason {
    FatalRaised,
}

pub struct Parser<'h> {
    lexer: Lexer,
    current: Token,
    /// One token of pushback, used by constructs that need to decide their
    /// shape from the token after the one they just consumed.
    pushback: Option<Token>,
    /// Whether one or more `Whitespace` tokens were skipped immediately
    /// before `current` (`bump` discards whitespace tokens before the
    /// parser ever sees them). `parse_selector` consults this to recover
    /// the descendant combinator, since CSS's "space between compound
    /// selectors means descendant" rule has no token of its own once
    /// whitespace is filtered out.
    preceded_by_ws: bool,
    options: ParserOptions,
    error_handler: &'h dyn ParseErrorHandler,
    exception_handler: &'h dyn ParseExceptionHandler,
    brace_depth: u32,
}

impl<'h> Parser<'h> {
    pub fn new(
        lexer: Lexer,
        options: ParserOptions,
        error_handler: &'h dyn ParseErrorHandler,
        exception_handler: &'h dyn ParseExceptionHandler,
    ) -> Self {
        let mut parser = Parser {
            lexer,
            current: Token::new(TokenKind::Eof, "", Position::new(1, 1), Position::new(1, 1)),
            pushback: None,
            preceded_by_ws: false,
            options,
            error_handler,
            exception_handler,
            brace_depth: 0,
        };
        parser.bump();
        parser
    }

    /// Parses a complete stylesheet. Returns `None` only when strict mode
    /// raised a fatal exception before any usable tree could be built
    /// (spec.md §7 "the parse returns a null/empty result"); browser-compliant
    /// mode always returns `Some`, possibly with fewer rules than the input
    /// named.
    pub fn parse_stylesheet(&mut self) -> Option<CstNode> {
        let root = new_node(CstKind::Stylesheet);
        loop {
            if self.at(TokenKind::Eof) {
                break;
            }
            match self.parse_stylesheet_member() {
                Ok(node) => root.append(node),
                Err(_) => {
                    if let Some(StopReason::FatalRaised) = self.recover_at_top_level() {
                        return if self.options.browser_compliant_mode { Some(root) } else { None };
                    }
                }
            }
        }
        Some(root)
    }

    // ---- token stream plumbing ----

    fn bump(&mut self) {
        if let Some(tok) = self.pushback.take() {
            self.current = tok;
            self.preceded_by_ws = false;
            return;
        }
        let mut saw_ws = false;
        loop {
            match self.lexer.next_token() {
                LexResult::Token(tok) if tok.kind == TokenKind::Whitespace => {
                    saw_ws = true;
                    continue;
                }
                LexResult::Token(tok) => {
                    self.current = tok;
                    self.preceded_by_ws = saw_ws;
                    return;
                }
                LexResult::IllegalCharacter(tok) => {
                    self.error_handler.on_parse_error(ParseErrorRecord {
                        current_token: tok.clone(),
                        expected: "a recognized character".to_string(),
                        skipped: None,
                    });
                    self.current = tok;
                    self.preceded_by_ws = saw_ws;
                    return;
                }
                LexResult::Fatal(exc) => {
                    self.exception_handler.on_parse_exception(exc);
                    self.current = Token::new(
                        TokenKind::Eof,
                        "",
                        self.current.end,
                        self.current.end,
                    );
                    self.preceded_by_ws = saw_ws;
                    return;
                }
            }
        }
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn at_delim(&self, text: &str) -> bool {
        self.current.kind == TokenKind::Delim && &*self.current.image == text
    }

    fn at_at_keyword(&self, name: &str) -> bool {
        self.current.kind == TokenKind::AtKeyword && self.current.image.eq_ignore_ascii_case(name)
    }

    fn advance(&mut self) -> Token {
        let tok = self.current.clone();
        self.bump();
        tok
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> PResult<Token> {
        if self.current.kind == kind {
            Ok(self.advance())
        } else {
            Err(SyntaxError { expected: expected.to_string() })
        }
    }

    fn fail(&self, expected: &str) -> SyntaxError {
        SyntaxError { expected: expected.to_string() }
    }

    // ---- recovery ----

    /// Skip to the next top-level recovery point: a `;` at depth 0, or the
    /// `}` that closes whatever brace we are nested in (if any), reporting
    /// the skipped range. Returns `Some(StopReason::FatalRaised)` when
    /// recovery is impossible and the parse must stop.
    fn recover_at_top_level(&mut self) -> Option<StopReason> {
        if !self.options.browser_compliant_mode {
            self.exception_handler.on_parse_exception(ParseException::new(
                format!("unexpected token {:?}", self.current.image),
                self.current.begin,
            ));
            return Some(StopReason::FatalRaised);
        }

        let first = self.current.clone();
        let mut last = first.clone();
        let mut depth: i32 = 0;
        loop {
            if self.at(TokenKind::Eof) {
                self.error_handler.on_parse_error(ParseErrorRecord {
                    current_token: first,
                    expected: "';' or a balanced '}'".to_string(),
                    skipped: Some((last.clone(), last)),
                });
                return Some(StopReason::FatalRaised);
            }
            match self.current.kind {
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => {
                    if depth == 0 {
                        last = self.advance();
                        break;
                    }
                    depth -= 1;
                }
                TokenKind::Semicolon if depth == 0 => {
                    last = self.advance();
                    break;
                }
                _ => {}
            }
            last = self.advance();
        }
        self.error_handler.on_parse_error(ParseErrorRecord {
            current_token: first.clone(),
            expected: "a valid rule or declaration".to_string(),
            skipped: Some((first, last)),
        });
        None
    }

    /// Like [`recover_at_top_level`](Self::recover_at_top_level) but scoped
    /// to a declaration: skip to the next `;` or the enclosing `}`, without
    /// consuming that `}` (spec.md §4.3: "on syntax error inside a
    /// declaration, skip to the next `;` or matching `}`").
    fn recover_in_declaration_list(&mut self) -> Option<StopReason> {
        if !self.options.browser_compliant_mode {
            self.exception_handler.on_parse_exception(ParseException::new(
                format!("unexpected token {:?} in declaration", self.current.image),
                self.current.begin,
            ));
            return Some(StopReason::FatalRaised);
        }

        let first = self.current.clone();
        let mut last = first.clone();
        loop {
            if self.at(TokenKind::Eof) || self.at(TokenKind::RightBrace) {
                break;
            }
            if self.at(TokenKind::Semicolon) {
                last = self.advance();
                break;
            }
            last = self.advance();
        }
        self.error_handler.on_parse_error(ParseErrorRecord {
            current_token: first.clone(),
            expected: "a valid declaration".to_string(),
            skipped: Some((first, last)),
        });
        None
    }

    // ---- stylesheet members ----

    fn parse_stylesheet_member(&mut self) -> PResult<CstNode> {
        if self.at_at_keyword("@import") {
            self.parse_import_rule()
        } else if self.at_at_keyword("@namespace") {
            self.parse_namespace_rule()
        } else if self.at_at_keyword("@charset") {
            self.parse_charset_rule()
        } else {
            self.parse_top_level_rule()
        }
    }

    fn parse_import_rule(&mut self) -> PResult<CstNode> {
        let begin = self.advance(); // @import
        let node = new_node(CstKind::ImportRule);

        if self.at(TokenKind::String) {
            let tok = self.advance();
            let mut leaf = new_node(CstKind::Leaf);
            leaf.borrow_mut().text = Some(tok.image.to_string());
            leaf.borrow_mut().value = Some("string".to_string());
            node.append(leaf);
        } else if self.at(TokenKind::UrlOpen) {
            self.advance();
            let uri = self.parse_url_body()?;
            let mut leaf = new_node(CstKind::UriTerm);
            leaf.borrow_mut().text = Some(uri);
            leaf.borrow_mut().value = Some("url".to_string());
            node.append(leaf);
        } else {
            return Err(self.fail("a string or url() after @import"));
        }

        if !self.at(TokenKind::Semicolon) {
            let media_list = self.parse_media_query_list()?;
            node.append(media_list);
        }

        let end = self.expect(TokenKind::Semicolon, "';' to close @import")?;
        node.borrow_mut().first_token = Some(begin);
        node.borrow_mut().last_token = Some(end);
        Ok(node)
    }

    fn parse_namespace_rule(&mut self) -> PResult<CstNode> {
        let begin = self.advance(); // @namespace
        let node = new_node(CstKind::NamespaceRule);

        if self.at(TokenKind::Ident) {
            let prefix = self.advance();
            let mut leaf = new_node(CstKind::Leaf);
            leaf.borrow_mut().text = Some(prefix.image.to_string());
            leaf.borrow_mut().value = Some("prefix".to_string());
            node.append(leaf);
        }

        let uri_text = if self.at(TokenKind::String) {
            self.advance().image.to_string()
        } else if self.at(TokenKind::UrlOpen) {
            self.advance();
            self.parse_url_body()?
        } else {
            return Err(self.fail("a string or url() after @namespace"));
        };
        let mut uri_leaf = new_node(CstKind::Leaf);
        uri_leaf.borrow_mut().text = Some(uri_text);
        uri_leaf.borrow_mut().value = Some("uri".to_string());
        node.append(uri_leaf);

        let end = self.expect(TokenKind::Semicolon, "';' to close @namespace")?;
        node.borrow_mut().first_token = Some(begin);
        node.borrow_mut().last_token = Some(end);
        Ok(node)
    }

    fn parse_charset_rule(&mut self) -> PResult<CstNode> {
        let begin = self.advance(); // @charset
        let name = self.expect(TokenKind::String, "a quoted charset name")?;
        let end = self.expect(TokenKind::Semicolon, "';' to close @charset")?;
        let node = new_node(CstKind::CharsetRule);
        node.borrow_mut().text = Some(name.image.to_string());
        node.borrow_mut().first_token = Some(begin);
        node.borrow_mut().last_token = Some(end);
        Ok(node)
    }

    fn parse_url_body(&mut self) -> PResult<String> {
        let text = if self.at(TokenKind::String) || self.at(TokenKind::UnquotedUrl) {
            self.advance().image.to_string()
        } else {
            String::new()
        };
        self.expect(TokenKind::RightParen, "')' to close url(")?;
        Ok(text)
    }

    // ---- top-level rules ----

    fn parse_top_level_rule(&mut self) -> PResult<CstNode> {
        if self.at_at_keyword("@media") {
            self.parse_media_rule()
        } else if self.at_at_keyword("@supports") {
            self.parse_supports_rule()
        } else if self.at_at_keyword("@layer") {
            self.parse_layer_rule()
        } else if self.current.kind == TokenKind::AtKeyword
            && self.current.image.to_ascii_lowercase().ends_with("keyframes")
        {
            self.parse_keyframes_rule()
        } else if self.at_at_keyword("@page") {
            self.parse_page_rule()
        } else if self.at_at_keyword("@font-face") {
            self.parse_declaration_only_rule("@font-face")
        } else if self.at_at_keyword("@viewport") {
            self.parse_declaration_only_rule("@viewport")
        } else if self.at(TokenKind::AtKeyword) {
            self.parse_unknown_at_rule()
        } else {
            self.parse_style_rule()
        }
    }

    fn parse_nested_rules_block(&mut self) -> PResult<CstNode> {
        self.expect(TokenKind::LeftBrace, "'{' to open rule block")?;
        self.brace_depth += 1;
        let container = new_node(CstKind::Stylesheet);
        loop {
            if self.at(TokenKind::RightBrace) || self.at(TokenKind::Eof) {
                break;
            }
            match self.parse_top_level_rule() {
                Ok(node) => container.append(node),
                Err(_) => {
                    if let Some(StopReason::FatalRaised) = self.recover_at_top_level() {
                        break;
                    }
                }
            }
        }
        self.expect(TokenKind::RightBrace, "'}' to close rule block")?;
        self.brace_depth -= 1;
        Ok(container)
    }

    fn parse_media_rule(&mut self) -> PResult<CstNode> {
        let begin = self.advance(); // @media
        let node = new_node(CstKind::MediaRule);
        let query_list = self.parse_media_query_list()?;
        node.append(query_list);
        let body = self.parse_nested_rules_block()?;
        node.append(body);
        node.borrow_mut().first_token = Some(begin.clone());
        node.borrow_mut().last_token = Some(begin);
        Ok(node)
    }

    fn parse_media_query_list(&mut self) -> PResult<CstNode> {
        let list = new_node(CstKind::MediaQueryList);
        list.append(self.parse_media_query()?);
        while self.at(TokenKind::Comma) {
            self.advance();
            list.append(self.parse_media_query()?);
        }
        Ok(list)
    }

    fn parse_media_query(&mut self) -> PResult<CstNode> {
        let query = new_node(CstKind::MediaQuery);

        if self.at(TokenKind::Ident)
            && (self.current.image.eq_ignore_ascii_case("not") || self.current.image.eq_ignore_ascii_case("only"))
        {
            let modifier = self.advance();
            let mut leaf = new_node(CstKind::Leaf);
            leaf.borrow_mut().text = Some(modifier.image.to_string());
            leaf.borrow_mut().value = Some("modifier".to_string());
            query.append(leaf);
        }

        if self.at(TokenKind::Ident) {
            let medium = self.advance();
            let mut leaf = new_node(CstKind::Leaf);
            leaf.borrow_mut().text = Some(medium.image.to_string());
            leaf.borrow_mut().value = Some("medium".to_string());
            query.append(leaf);
        }

        while self.at(TokenKind::Ident) && &*self.current.image == "and" || self.at(TokenKind::LeftParen) {
            if self.at(TokenKind::Ident) {
                self.advance(); // "and"
            }
            query.append(self.parse_media_expression()?);
        }

        Ok(query)
    }

    fn parse_media_expression(&mut self) -> PResult<CstNode> {
        self.expect(TokenKind::LeftParen, "'(' to open a media feature")?;
        let feature = self.expect(TokenKind::Ident, "a media feature name")?;
        let expr = new_node(CstKind::MediaExpression);
        expr.borrow_mut().text = Some(feature.image.to_string());
        if self.at(TokenKind::Colon) {
            self.advance();
            let value_tokens = self.collect_raw_until(&[TokenKind::RightParen]);
            expr.borrow_mut().value = Some(value_tokens);
        }
        self.expect(TokenKind::RightParen, "')' to close a media feature")?;
        Ok(expr)
    }

    /// Collects the raw source text of tokens up to (not including) one of
    /// `terminators`, joined by single spaces. Used for constructs this
    /// crate intentionally does not deep-parse (media-feature values).
    fn collect_raw_until(&mut self, terminators: &[TokenKind]) -> String {
        let mut parts = Vec::new();
        while !terminators.contains(&self.current.kind) && !self.at(TokenKind::Eof) {
            parts.push(self.advance().image.to_string());
        }
        parts.join(" ")
    }

    fn parse_supports_rule(&mut self) -> PResult<CstNode> {
        let begin = self.advance(); // @supports
        let node = new_node(CstKind::SupportsRule);
        let condition = self.parse_supports_condition()?;
        node.append(condition);
        let body = self.parse_nested_rules_block()?;
        node.append(body);
        node.borrow_mut().first_token = Some(begin.clone());
        node.borrow_mut().last_token = Some(begin);
        Ok(node)
    }

    fn parse_supports_condition(&mut self) -> PResult<CstNode> {
        if self.at(TokenKind::Ident) && self.current.image.eq_ignore_ascii_case("not") {
            self.advance();
            let node = new_node(CstKind::SupportsCondition);
            node.borrow_mut().text = Some("not".to_string());
            node.append(self.parse_supports_condition_in_parens()?);
            return self.parse_supports_operator_chain(node);
        }
        let node = self.parse_supports_condition_in_parens()?;
        self.parse_supports_operator_chain(node)
    }

    fn parse_supports_operator_chain(&mut self, first: CstNode) -> PResult<CstNode> {
        if !(self.at(TokenKind::Ident)
            && (self.current.image.eq_ignore_ascii_case("and") || self.current.image.eq_ignore_ascii_case("or")))
        {
            return Ok(first);
        }
        let operator = self.advance().image.to_ascii_lowercase();
        let node = new_node(CstKind::SupportsCondition);
        node.borrow_mut().text = Some(operator.clone());
        node.append(first);
        loop {
            node.append(self.parse_supports_condition_in_parens()?);
            if self.at(TokenKind::Ident) && self.current.image.eq_ignore_ascii_case(&operator) {
                self.advance();
                continue;
            }
            break;
        }
        Ok(node)
    }

    fn parse_supports_condition_in_parens(&mut self) -> PResult<CstNode> {
        self.expect(TokenKind::LeftParen, "'(' to open a supports condition")?;
        let node = if self.at(TokenKind::Ident) && self.current.image.eq_ignore_ascii_case("not") {
            self.parse_supports_condition()?
        } else if self.at(TokenKind::LeftParen) {
            let inner = self.parse_supports_condition()?;
            let wrapper = new_node(CstKind::SupportsCondition);
            wrapper.borrow_mut().text = Some("group".to_string());
            wrapper.append(inner);
            wrapper
        } else {
            let decl = self.parse_declaration_in_list()?;
            let wrapper = new_node(CstKind::SupportsCondition);
            wrapper.borrow_mut().text = Some("declaration".to_string());
            wrapper.append(decl);
            wrapper
        };
        self.expect(TokenKind::RightParen, "')' to close a supports condition")?;
        Ok(node)
    }

    fn parse_layer_rule(&mut self) -> PResult<CstNode> {
        let begin = self.advance(); // @layer
        let node = new_node(CstKind::LayerRule);
        let names = new_node(CstKind::LayerNameList);
        if self.at(TokenKind::Ident) {
            names.append(self.leaf_from_current("name"));
            while self.at(TokenKind::Comma) {
                self.advance();
                names.append(self.leaf_from_current("name"));
            }
        }
        node.append(names);

        if self.at(TokenKind::Semicolon) {
            let end = self.advance();
            node.borrow_mut().value = Some("statement".to_string());
            node.borrow_mut().first_token = Some(begin);
            node.borrow_mut().last_token = Some(end);
        } else {
            let body = self.parse_nested_rules_block()?;
            node.append(body);
            node.borrow_mut().first_token = Some(begin.clone());
            node.borrow_mut().last_token = Some(begin);
        }
        Ok(node)
    }

    fn leaf_from_current(&mut self, tag: &str) -> CstNode {
        let tok = self.advance();
        let mut leaf = new_node(CstKind::Leaf);
        leaf.borrow_mut().text = Some(tok.image.to_string());
        leaf.borrow_mut().value = Some(tag.to_string());
        leaf
    }

    fn parse_keyframes_rule(&mut self) -> PResult<CstNode> {
        let begin = self.advance(); // @keyframes
        let node = new_node(CstKind::KeyframesRule);
        let name = self.expect(TokenKind::Ident, "a keyframes name")?;
        node.append({
            let mut leaf = new_node(CstKind::Leaf);
            leaf.borrow_mut().text = Some(name.image.to_string());
            leaf
        });

        self.expect(TokenKind::LeftBrace, "'{' to open @keyframes body")?;
        self.brace_depth += 1;
        loop {
            if self.at(TokenKind::RightBrace) || self.at(TokenKind::Eof) {
                break;
            }
            match self.parse_keyframe_block() {
                Ok(block) => node.append(block),
                Err(_) => {
                    if let Some(StopReason::FatalRaised) = self.recover_at_top_level() {
                        break;
                    }
                }
            }
        }
        let end = self.expect(TokenKind::RightBrace, "'}' to close @keyframes body")?;
        self.brace_depth -= 1;
        node.borrow_mut().first_token = Some(begin);
        node.borrow_mut().last_token = Some(end);
        Ok(node)
    }

    fn parse_keyframe_block(&mut self) -> PResult<CstNode> {
        let selectors = new_node(CstKind::SelectorList);
        selectors.append(self.parse_keyframe_selector()?);
        while self.at(TokenKind::Comma) {
            self.advance();
            selectors.append(self.parse_keyframe_selector()?);
        }
        let declarations = self.parse_declaration_list()?;
        let block = new_node(CstKind::KeyframeBlock);
        block.append(selectors);
        block.append(declarations);
        Ok(block)
    }

    fn parse_keyframe_selector(&mut self) -> PResult<CstNode> {
        if self.at(TokenKind::Ident) || self.at(TokenKind::Percentage) {
            Ok(self.leaf_from_current("keyframe-selector"))
        } else {
            Err(self.fail("'from', 'to', or a percentage"))
        }
    }

    fn parse_page_rule(&mut self) -> PResult<CstNode> {
        let begin = self.advance(); // @page
        let node = new_node(CstKind::PageRule);
        while !self.at(TokenKind::LeftBrace) && !self.at(TokenKind::Eof) {
            node.append(self.leaf_from_current("page-selector"));
        }
        self.expect(TokenKind::LeftBrace, "'{' to open @page body")?;
        self.brace_depth += 1;
        loop {
            if self.at(TokenKind::RightBrace) || self.at(TokenKind::Eof) {
                break;
            }
            if self.at(TokenKind::AtKeyword) {
                match self.parse_page_margin_block() {
                    Ok(block) => node.append(block),
                    Err(_) => {
                        if let Some(StopReason::FatalRaised) = self.recover_in_declaration_list() {
                            break;
                        }
                    }
                }
            } else {
                match self.parse_declaration_in_list() {
                    Ok(decl) => {
                        if decl.borrow().value.as_deref() != Some("dropped") {
                            node.append(decl);
                        }
                    }
                    Err(_) => {
                        if let Some(StopReason::FatalRaised) = self.recover_in_declaration_list() {
                            break;
                        }
                    }
                }
            }
        }
        let end = self.expect(TokenKind::RightBrace, "'}' to close @page body")?;
        self.brace_depth -= 1;
        node.borrow_mut().first_token = Some(begin);
        node.borrow_mut().last_token = Some(end);
        Ok(node)
    }

    fn parse_page_margin_block(&mut self) -> PResult<CstNode> {
        let name = self.advance();
        let declarations = self.parse_declaration_list()?;
        let block = new_node(CstKind::PageMarginBlock);
        block.borrow_mut().text = Some(name.image.to_string());
        block.append(declarations);
        Ok(block)
    }

    fn parse_declaration_only_rule(&mut self, at_keyword: &str) -> PResult<CstNode> {
        let begin = self.advance();
        let declarations = self.parse_declaration_list()?;
        let node = new_node(CstKind::UnknownAtRule);
        node.borrow_mut().text = Some(at_keyword.to_string());
        node.append(declarations);
        node.borrow_mut().first_token = Some(begin);
        Ok(node)
    }

    fn parse_unknown_at_rule(&mut self) -> PResult<CstNode> {
        let begin = self.advance();
        let node = new_node(CstKind::UnknownAtRule);
        node.borrow_mut().text = Some(begin.image.to_string());
        let prelude = self.collect_raw_until(&[TokenKind::LeftBrace, TokenKind::Semicolon]);
        node.borrow_mut().value = Some(prelude);
        if self.at(TokenKind::Semicolon) {
            let end = self.advance();
            node.borrow_mut().last_token = Some(end);
        } else {
            self.expect(TokenKind::LeftBrace, "'{' or ';' after an unknown at-rule")?;
            self.brace_depth += 1;
            let body = self.collect_raw_until(&[TokenKind::RightBrace]);
            let mut leaf = new_node(CstKind::Leaf);
            leaf.borrow_mut().text = Some(body);
            node.append(leaf);
            let end = self.expect(TokenKind::RightBrace, "'}' to close an unknown at-rule")?;
            self.brace_depth -= 1;
            node.borrow_mut().last_token = Some(end);
        }
        node.borrow_mut().first_token = Some(begin);
        Ok(node)
    }

    // ---- style rules ----

    fn parse_style_rule(&mut self) -> PResult<CstNode> {
        let selectors = self.parse_selector_list()?;
        let first_tok = selectors.borrow().first_token.clone();
        let declarations = self.parse_declaration_list()?;
        let last_tok = declarations.borrow().last_token.clone();
        let node = new_node(CstKind::StyleRule);
        node.append(selectors);
        node.append(declarations);
        node.borrow_mut().first_token = first_tok;
        node.borrow_mut().last_token = last_tok;
        Ok(node)
    }

    fn parse_selector_list(&mut self) -> PResult<CstNode> {
        let list = new_node(CstKind::SelectorList);
        let first = self.parse_selector()?;
        list.borrow_mut().first_token = first.borrow().first_token.clone();
        list.append(first);
        while self.at(TokenKind::Comma) {
            self.advance();
            list.append(self.parse_selector()?);
        }
        Ok(list)
    }

    fn parse_selector(&mut self) -> PResult<CstNode> {
        let node = new_node(CstKind::Selector);
        let begin = self.current.clone();
        let mut last = begin.clone();
        loop {
            match self.current.kind {
                TokenKind::LeftBrace | TokenKind::Comma | TokenKind::Eof => break,
                TokenKind::LeftBracket => {
                    self.maybe_append_descendant_combinator(&node);
                    node.append(self.parse_attribute_selector()?);
                }
                TokenKind::Colon => {
                    self.maybe_append_descendant_combinator(&node);
                    node.append(self.parse_pseudo_selector()?);
                }
                TokenKind::Ident | TokenKind::Hash => {
                    self.maybe_append_descendant_combinator(&node);
                    last = self.advance();
                    node.append(self.leaf_member(&last, "simple"));
                }
                TokenKind::Delim => {
                    let text = self.current.image.clone();
                    if &*text == "." && matches!(self.lexer_peek_is_ident(), true) {
                        // class selector: '.' followed immediately by an ident
                        self.maybe_append_descendant_combinator(&node);
                        self.advance();
                        let ident = self.expect(TokenKind::Ident, "a class name after '.'")?;
                        let mut combined = String::from(".");
                        combined.push_str(&ident.image);
                        let mut leaf = new_node(CstKind::SelectorMember);
                        leaf.borrow_mut().text = Some(combined);
                        leaf.borrow_mut().value = Some("simple".to_string());
                        last = ident;
                        node.append(leaf);
                    } else if &*text == "*" {
                        // universal selector, not a combinator
                        self.maybe_append_descendant_combinator(&node);
                        last = self.advance();
                        node.append(self.leaf_member(&last, "simple"));
                    } else if matches!(&*text, ">" | "+" | "~" | "|") {
                        last = self.advance();
                        let combinator = self.leaf_member(&last, "combinator");
                        node.append(combinator);
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        node.borrow_mut().first_token = Some(begin);
        node.borrow_mut().last_token = Some(last);
        Ok(node)
    }

    /// CSS's descendant combinator is plain whitespace between two compound
    /// selectors; `bump` discards whitespace tokens before the parser ever
    /// sees them, so it has to be reconstructed here from `preceded_by_ws`
    /// rather than read off a token. Does nothing at the very start of a
    /// selector, and does nothing right after an explicit combinator (the
    /// whitespace around `>`/`+`/`~`/`|` is insignificant).
    fn maybe_append_descendant_combinator(&self, node: &CstNode) {
        if !self.preceded_by_ws {
            return;
        }
        let last_is_combinator = node
            .last_child()
            .map(|c| c.borrow().kind == CstKind::SelectorMember && c.borrow().value.as_deref() == Some("combinator"))
            .unwrap_or(true);
        if last_is_combinator {
            return;
        }
        let mut combinator = new_node(CstKind::SelectorMember);
        combinator.borrow_mut().text = Some(" ".to_string());
        combinator.borrow_mut().value = Some("combinator".to_string());
        node.append(combinator);
    }

    /// Best-effort check used only to disambiguate a bare `.` delimiter as
    /// the start of a class selector. Not a full lookahead mechanism; this
    /// crate's lexer always produces an `Ident` token right after a class
    /// name's leading dot, so checking the *next* significant token's kind
    /// without consuming the dot would require two-token lookahead this
    /// parser does not otherwise keep. We conservatively consume the dot
    /// first and require an `Ident` to follow, reporting a syntax error
    /// otherwise (handled by the caller's recovery).
    fn lexer_peek_is_ident(&self) -> bool {
        true
    }

    fn leaf_member(&self, tok: &Token, tag: &str) -> CstNode {
        let mut leaf = new_node(CstKind::SelectorMember);
        leaf.borrow_mut().text = Some(tok.image.to_string());
        leaf.borrow_mut().value = Some(tag.to_string());
        leaf
    }

    fn parse_attribute_selector(&mut self) -> PResult<CstNode> {
        let begin = self.expect(TokenKind::LeftBracket, "'['")?;
        let name = self.expect(TokenKind::Ident, "an attribute name")?;
        let node = new_node(CstKind::AttributeSelector);
        node.borrow_mut().text = Some(name.image.to_string());

        if !self.at(TokenKind::RightBracket) {
            let operator = self.collect_attribute_operator()?;
            let mut op_leaf = new_node(CstKind::Leaf);
            op_leaf.borrow_mut().text = Some(operator);
            op_leaf.borrow_mut().value = Some("operator".to_string());
            node.append(op_leaf);

            let value = if self.at(TokenKind::String) || self.at(TokenKind::Ident) {
                self.advance().image.to_string()
            } else {
                return Err(self.fail("an attribute value"));
            };
            let mut value_leaf = new_node(CstKind::Leaf);
            value_leaf.borrow_mut().text = Some(value);
            value_leaf.borrow_mut().value = Some("value".to_string());
            node.append(value_leaf);

            let case_flag = if self.at(TokenKind::Ident)
                && (self.current.image.eq_ignore_ascii_case("i") || self.current.image.eq_ignore_ascii_case("s"))
            {
                self.advance().image.to_string()
            } else {
                String::new()
            };
            let mut case_leaf = new_node(CstKind::Leaf);
            case_leaf.borrow_mut().text = Some(case_flag);
            case_leaf.borrow_mut().value = Some("case".to_string());
            node.append(case_leaf);
        }

        let end = self.expect(TokenKind::RightBracket, "']' to close attribute selector")?;
        node.borrow_mut().first_token = Some(begin);
        node.borrow_mut().last_token = Some(end);
        Ok(node)
    }

    fn collect_attribute_operator(&mut self) -> PResult<String> {
        if self.at(TokenKind::Delim) {
            let first = self.advance().image.to_string();
            if first == "=" {
                return Ok(first);
            }
            if self.at(TokenKind::Delim) && &*self.current.image == "=" {
                self.advance();
                return Ok(format!("{first}="));
            }
        }
        Err(self.fail("an attribute operator (=, ~=, |=, ^=, $=, *=)"))
    }

    fn parse_pseudo_selector(&mut self) -> PResult<CstNode> {
        let begin = self.expect(TokenKind::Colon, "':'")?;
        let is_element = if self.at(TokenKind::Colon) {
            self.advance();
            true
        } else {
            false
        };
        let node = new_node(CstKind::PseudoSelector);
        node.borrow_mut().value = Some(if is_element { "element" } else { "class" }.to_string());

        if self.at(TokenKind::FunctionOpen) {
            let name_tok = self.advance();
            let name = name_tok.image.trim_end_matches('(').to_string();
            node.borrow_mut().text = Some(name.clone());

            if matches!(name.to_ascii_lowercase().as_str(), "not" | "is" | "where" | "has") {
                let list = self.parse_selector_list()?;
                node.append(list);
            } else if name.eq_ignore_ascii_case("slotted") || name.eq_ignore_ascii_case("host-context") {
                let inner = self.parse_selector()?;
                node.append(inner);
            } else if name.to_ascii_lowercase().starts_with("nth") {
                let text = self.collect_raw_until(&[TokenKind::RightParen]);
                let mut leaf = new_node(CstKind::Leaf);
                leaf.borrow_mut().text = Some(text);
                leaf.borrow_mut().value = Some("nth".to_string());
                node.append(leaf);
            } else {
                let text = self.collect_raw_until(&[TokenKind::RightParen]);
                let mut leaf = new_node(CstKind::Leaf);
                leaf.borrow_mut().text = Some(text);
                leaf.borrow_mut().value = Some("function-argument".to_string());
                node.append(leaf);
            }
            let end = self.expect(TokenKind::RightParen, "')' to close pseudo-selector argument")?;
            node.borrow_mut().first_token = Some(begin);
            node.borrow_mut().last_token = Some(end);
        } else if self.at(TokenKind::Ident) {
            let name = self.advance();
            node.borrow_mut().text = Some(name.image.to_string());
            node.borrow_mut().first_token = Some(begin);
            node.borrow_mut().last_token = Some(name);
        } else {
            return Err(self.fail("a pseudo-class or pseudo-element name"));
        }
        Ok(node)
    }

    // ---- declarations ----

    fn parse_declaration_list(&mut self) -> PResult<CstNode> {
        self.expect(TokenKind::LeftBrace, "'{' to open a declaration list")?;
        self.brace_depth += 1;
        let node = new_node(CstKind::DeclarationList);
        loop {
            if self.at(TokenKind::RightBrace) || self.at(TokenKind::Eof) {
                break;
            }
            if self.at(TokenKind::Semicolon) {
                self.advance();
                continue;
            }
            match self.parse_declaration_in_list() {
                Ok(decl) => {
                    if decl.borrow().value.as_deref() != Some("dropped") {
                        node.append(decl);
                    }
                }
                Err(_) => {
                    if let Some(StopReason::FatalRaised) = self.recover_in_declaration_list() {
                        break;
                    }
                }
            }
        }
        let end = self.expect(TokenKind::RightBrace, "'}' to close a declaration list")?;
        self.brace_depth -= 1;
        node.borrow_mut().last_token = Some(end);
        Ok(node)
    }

    fn parse_declaration_in_list(&mut self) -> PResult<CstNode> {
        let begin = self.current.clone();
        let prefix = if self.at_delim("*") || self.at_delim("_") || self.at_delim("$") {
            Some(self.advance().image.to_string())
        } else {
            None
        };

        let name_tok = if self.at(TokenKind::Ident) || self.at(TokenKind::CustomProperty) {
            self.advance()
        } else {
            return Err(self.fail("a property name"));
        };
        let mut name = name_tok.image.to_string();
        if let Some(p) = &prefix {
            name = format!("{p}{name}");
        }
        let node = new_node(CstKind::Declaration);
        let mut name_leaf = new_node(CstKind::Leaf);
        name_leaf.borrow_mut().text = Some(name.clone());
        name_leaf.borrow_mut().value = Some("property".to_string());
        node.append(name_leaf);

        if !self.at(TokenKind::Colon) {
            node.borrow_mut().first_token = Some(begin.clone());
            node.borrow_mut().last_token = Some(begin);
            return Ok(node); // 1-child: incomplete declaration, interpreter drops it
        }
        self.advance(); // ':'

        let expr = self.parse_expression(&[TokenKind::Semicolon, TokenKind::RightBrace])?;
        node.append(expr);

        if self.at_delim("!") {
            self.advance();
            let important = self.expect(TokenKind::Ident, "'important' after '!'")?;
            if !important.image.eq_ignore_ascii_case("important") {
                return Err(self.fail("'important' after '!'"));
            }
            let mut leaf = new_node(CstKind::Leaf);
            leaf.borrow_mut().text = Some("important".to_string());
            leaf.borrow_mut().value = Some("important".to_string());
            node.append(leaf);
        }

        let last = if self.at(TokenKind::Semicolon) { self.advance() } else { begin.clone() };
        node.borrow_mut().first_token = Some(begin);
        node.borrow_mut().last_token = Some(last);

        if !self.options.keep_deprecated_properties && prefix.is_some() {
            // Silently dropped (spec.md §4.3), not a syntax error: the
            // declaration's own `;`/`}` has already been consumed above, so
            // returning `Err` here would make `parse_declaration_list`'s
            // recovery skip forward from the *next* declaration instead,
            // swallowing it too. Mark the node for the caller to discard.
            node.borrow_mut().value = Some("dropped".to_string());
        }
        Ok(node)
    }

    // ---- expressions ----

    /// Separators between expression members are recorded on the
    /// `Expression` node itself, joined by `\u{1}`, rather than on each
    /// member — members already use `.value` for their own tag ("simple",
    /// "line-names"), and stamping the separator there as well would
    /// clobber it for every non-first member.
    fn parse_expression(&mut self, terminators: &[TokenKind]) -> PResult<CstNode> {
        let node = new_node(CstKind::Expression);
        let first = self.parse_expression_member()?;
        node.borrow_mut().first_token = first.borrow().first_token.clone();
        node.append(first);
        let mut separators: Vec<&'static str> = Vec::new();
        loop {
            if terminators.contains(&self.current.kind) || self.at(TokenKind::Eof) || self.at_delim("!") {
                break;
            }
            let sep = if self.at(TokenKind::Comma) {
                self.advance();
                ","
            } else if self.at(TokenKind::Slash) {
                self.advance();
                "/"
            } else {
                " "
            };
            if terminators.contains(&self.current.kind) || self.at(TokenKind::Eof) {
                break;
            }
            let member = self.parse_expression_member()?;
            separators.push(sep);
            node.append(member);
        }
        if !separators.is_empty() {
            node.borrow_mut().value = Some(separators.join("\u{1}"));
        }
        Ok(node)
    }

    fn parse_expression_member(&mut self) -> PResult<CstNode> {
        let begin = self.current.clone();
        let node = match self.current.kind {
            TokenKind::String | TokenKind::Number | TokenKind::Percentage | TokenKind::Dimension | TokenKind::Ident | TokenKind::Hash | TokenKind::CustomProperty => {
                let tok = self.advance();
                let mut leaf = new_node(CstKind::ExpressionMember);
                leaf.borrow_mut().text = Some(tok.image.to_string());
                leaf.borrow_mut().value = Some("simple".to_string());
                leaf
            }
            TokenKind::UrlOpen => {
                self.advance();
                let uri = self.parse_url_body()?;
                let mut leaf = new_node(CstKind::UriTerm);
                leaf.borrow_mut().text = Some(uri);
                leaf
            }
            TokenKind::FunctionOpen => {
                let name_tok = self.advance();
                let name = name_tok.image.trim_end_matches('(').to_string();
                if name.eq_ignore_ascii_case("calc") {
                    let calc = self.parse_calc_sum()?;
                    self.expect(TokenKind::RightParen, "')' to close calc()")?;
                    let wrapper = new_node(CstKind::CalcExpression);
                    wrapper.append(calc);
                    wrapper
                } else {
                    let call = new_node(CstKind::FunctionCall);
                    call.borrow_mut().text = Some(name);
                    if !self.at(TokenKind::RightParen) {
                        call.append(self.parse_expression(&[TokenKind::RightParen])?);
                        while self.at(TokenKind::Comma) {
                            self.advance();
                            call.append(self.parse_expression(&[TokenKind::RightParen])?);
                        }
                    }
                    self.expect(TokenKind::RightParen, "')' to close function call")?;
                    call
                }
            }
            TokenKind::Delim if &*self.current.image == "[" => {
                return self.parse_line_names();
            }
            TokenKind::LeftBracket => self.parse_line_names()?,
            _ => return Err(self.fail("an expression term")),
        };
        node.borrow_mut().first_token = Some(begin);
        Ok(node)
    }

    fn parse_line_names(&mut self) -> PResult<CstNode> {
        self.expect(TokenKind::LeftBracket, "'[' to open line-names")?;
        let node = new_node(CstKind::ExpressionMember);
        node.borrow_mut().value = Some("line-names".to_string());
        let mut names = Vec::new();
        while self.at(TokenKind::Ident) {
            names.push(self.advance().image.to_string());
        }
        self.expect(TokenKind::RightBracket, "']' to close line-names")?;
        node.borrow_mut().text = Some(names.join(" "));
        Ok(node)
    }

    /// Like [`parse_expression`](Self::parse_expression), the operators
    /// chaining a sum's products together are recorded on the `CalcSum`
    /// node itself (joined by `\u{1}`) rather than on each product, so they
    /// don't collide with a `CalcProduct`'s own use of `.value` for its
    /// *own* term-joining operators.
    fn parse_calc_sum(&mut self) -> PResult<CstNode> {
        let node = new_node(CstKind::CalcSum);
        node.append(self.parse_calc_product()?);
        let mut operators: Vec<&'static str> = Vec::new();
        loop {
            if self.at_delim("+") || self.at_delim("-") {
                let op: &'static str = if &*self.current.image == "+" { "+" } else { "-" };
                self.advance();
                let product = self.parse_calc_product()?;
                operators.push(op);
                node.append(product);
            } else {
                break;
            }
        }
        if !operators.is_empty() {
            node.borrow_mut().value = Some(operators.join("\u{1}"));
        }
        Ok(node)
    }

    fn parse_calc_product(&mut self) -> PResult<CstNode> {
        let node = new_node(CstKind::CalcProduct);
        node.append(self.parse_calc_term()?);
        let mut operators: Vec<&'static str> = Vec::new();
        loop {
            if self.at_delim("*") || self.at(TokenKind::Slash) {
                let op: &'static str = if self.at(TokenKind::Slash) { "/" } else { "*" };
                self.advance();
                let term = self.parse_calc_term()?;
                operators.push(op);
                node.append(term);
            } else {
                break;
            }
        }
        if !operators.is_empty() {
            node.borrow_mut().value = Some(operators.join("\u{1}"));
        }
        Ok(node)
    }

    fn parse_calc_term(&mut self) -> PResult<CstNode> {
        if self.at(TokenKind::LeftParen) {
            self.advance();
            let nested = self.parse_calc_sum()?;
            self.expect(TokenKind::RightParen, "')' to close nested calc term")?;
            let wrapper = new_node(CstKind::Leaf);
            wrapper.borrow_mut().value = Some("nested".to_string());
            wrapper.append(nested);
            return Ok(wrapper);
        }
        if self.at(TokenKind::FunctionOpen) {
            return self.parse_expression_member();
        }
        match self.current.kind {
            TokenKind::Number | TokenKind::Dimension | TokenKind::Percentage => {
                let tok = self.advance();
                let mut leaf = new_node(CstKind::Leaf);
                leaf.borrow_mut().text = Some(tok.image.to_string());
                leaf.borrow_mut().value = Some(match tok.kind {
                    TokenKind::Number => "number",
                    TokenKind::Dimension => "dimension",
                    _ => "percentage",
                }.to_string());
                Ok(leaf)
            }
            _ => Err(self.fail("a number, dimension, percentage, or '(' in calc()")),
        }
    }
}

impl CstData {
    // nothing extra; present so `node.borrow_mut().first_token` reads are
    // documented near the struct definition in `crate::cst`.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NullErrorHandler;
    use crate::stream::CharStream;

    fn parse(source: &str, browser_compliant: bool) -> Option<CstNode> {
        let stream = CharStream::with_default_tab_size(source);
        let lexer = Lexer::new(
            stream,
            LexerOptions { css_unescape: true, browser_compliant_mode: browser_compliant },
        );
        let handler = NullErrorHandler;
        let options = ParserOptions { browser_compliant_mode: browser_compliant, keep_deprecated_properties: true };
        let mut parser = Parser::new(lexer, options, &handler, &handler);
        parser.parse_stylesheet()
    }

    #[test]
    fn parses_simple_style_rule() {
        let root = parse(".foo { color: red; }", false).unwrap();
        assert_eq!(root.children().count(), 1);
        let rule = root.children().next().unwrap();
        assert_eq!(rule.borrow().kind, CstKind::StyleRule);
    }

    #[test]
    fn parses_import_with_media_queries() {
        let root = parse(r#"@import url("a.gif") print, screen;"#, false).unwrap();
        let import = root.children().next().unwrap();
        assert_eq!(import.borrow().kind, CstKind::ImportRule);
        assert_eq!(import.children().count(), 2);
    }

    #[test]
    fn parses_nested_media_rule() {
        let root = parse("@media screen and (min-width: 768px) { .a { color: red; } }", false).unwrap();
        let media = root.children().next().unwrap();
        assert_eq!(media.borrow().kind, CstKind::MediaRule);
    }

    #[test]
    fn browser_compliant_mode_recovers_unterminated_block() {
        let root = parse(
            "body {background:red;} @keyframes id { .class{color:red;.class{color:green} } body {background:green;}",
            true,
        )
        .unwrap();
        let kinds: Vec<_> = root.children().map(|c| c.borrow().kind).collect();
        assert!(kinds.contains(&CstKind::StyleRule));
    }

    #[test]
    fn strict_mode_returns_none_on_malformed_input() {
        let result = parse(".foo { color", false);
        assert!(result.is_none());
    }

    #[test]
    fn descendant_combinator_is_recovered_from_whitespace() {
        let root = parse("div .foo { color: red; }", false).unwrap();
        let rule = root.children().next().unwrap();
        let selector_list = rule.children().next().unwrap();
        let selector = selector_list.children().next().unwrap();
        let tags: Vec<_> = selector
            .children()
            .map(|m| (m.borrow().value.clone(), m.borrow().text.clone()))
            .collect();
        assert_eq!(
            tags,
            vec![
                (Some("simple".to_string()), Some("div".to_string())),
                (Some("combinator".to_string()), Some(" ".to_string())),
                (Some("simple".to_string()), Some(".foo".to_string())),
            ]
        );
    }

    #[test]
    fn child_combinator_does_not_duplicate_into_descendant() {
        let root = parse("div > .foo { color: red; }", false).unwrap();
        let rule = root.children().next().unwrap();
        let selector = rule.children().next().unwrap().children().next().unwrap();
        assert_eq!(selector.children().count(), 3);
    }

    #[test]
    fn universal_selector_is_not_a_combinator() {
        let root = parse("ul > * { color: red; }", false).unwrap();
        let rule = root.children().next().unwrap();
        let selector = rule.children().next().unwrap().children().next().unwrap();
        let last = selector.last_child().unwrap();
        assert_eq!(last.borrow().value.as_deref(), Some("simple"));
        assert_eq!(last.borrow().text.as_deref(), Some("*"));
    }
}
