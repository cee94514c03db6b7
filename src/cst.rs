//! The concrete syntax tree (spec.md §3 "CST node (`CSSNode`)").
//!
//! The parser's only output. Transient by design (spec.md §9 "CST as
//! transient"): a `CSSNode` tree is built for one parse, walked once by
//! [`crate::interpreter`], and dropped. Modeled as a tagged union per
//! spec.md §9 ("Node-type polymorphism") rather than the original's class
//! hierarchy: one enum of node kinds, with the parent-linked ownership
//! handled by [`rctree::Node`], the same crate the CSSOM's rule containers
//! use (see `DESIGN.md`).

use rctree::Node as RcNode;

use crate::location::{Position, SourceLocation};
use crate::token::Token;

/// The tag of a CST node. Unlike the original's numeric node-type ids, this
/// is a plain Rust enum — the interpreter matches on it directly instead of
/// switching on an integer constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CstKind {
    Stylesheet,
    ImportRule,
    NamespaceRule,
    CharsetRule,
    StyleRule,
    SelectorList,
    Selector,
    SelectorMember,
    AttributeSelector,
    PseudoSelector,
    DeclarationList,
    Declaration,
    Expression,
    ExpressionMember,
    UriTerm,
    FunctionCall,
    CalcExpression,
    CalcSum,
    CalcProduct,
    MediaRule,
    MediaQueryList,
    MediaQuery,
    MediaExpression,
    SupportsRule,
    SupportsCondition,
    SupportsOperator,
    LayerRule,
    LayerNameList,
    KeyframesRule,
    KeyframeBlock,
    PageRule,
    PageSelector,
    PageMarginBlock,
    UnknownAtRule,
    /// A leaf holding a single token's text verbatim (identifiers, numbers,
    /// strings, operators) when no more specific node kind applies.
    Leaf,
}

/// The payload of a `CSSNode`: its tag, optional text (spec.md's "optional
/// text" field — e.g. an identifier's spelling), and an optional
/// user-attached value used by a few constructs (the declaration's
/// `!important` flag, an attribute selector's operator).
#[derive(Debug, Clone)]
pub struct CstData {
    pub kind: CstKind,
    pub text: Option<String>,
    pub value: Option<String>,
    pub first_token: Option<Token>,
    pub last_token: Option<Token>,
}

impl CstData {
    pub fn new(kind: CstKind) -> Self {
        CstData {
            kind,
            text: None,
            value: None,
            first_token: None,
            last_token: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_span(mut self, first: Token, last: Token) -> Self {
        self.first_token = Some(first);
        self.last_token = Some(last);
        self
    }

    /// Derives this node's source location from its first/last tokens, per
    /// spec.md §4.3 "The parser writes first/last token pointers on every
    /// node so source locations can be derived."
    pub fn location(&self) -> Option<SourceLocation> {
        match (&self.first_token, &self.last_token) {
            (Some(first), Some(last)) => Some(SourceLocation::new_unchecked(first.begin, last.end)),
            _ => None,
        }
    }

    pub fn begin_position(&self) -> Option<Position> {
        self.first_token.as_ref().map(|t| t.begin)
    }
}

/// A CST node: an `rctree::Node` wrapping [`CstData`]. `rctree` gives us the
/// parent back-link and ordered child list for free, with the same
/// `Rc<RefCell<..>>`-based sharing discipline the CSSOM's rule tree uses —
/// appropriate here too, since the CST is single-owner and single-threaded
/// for the lifetime of one parse.
pub type CstNode = RcNode<CstData>;

/// Builds a fresh, childless node of the given kind.
pub fn new_node(kind: CstKind) -> CstNode {
    RcNode::new(CstData::new(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn tok(image: &str, line: u32, col: u32) -> Token {
        let end_col = col + image.chars().count() as u32;
        Token::new(TokenKind::Ident, image, Position::new(line, col), Position::new(line, end_col))
    }

    #[test]
    fn node_tracks_children_via_rctree() {
        let root = new_node(CstKind::Stylesheet);
        let child = new_node(CstKind::StyleRule);
        root.append(child.clone());
        assert_eq!(root.children().count(), 1);
        assert!(child.parent().is_some());
    }

    #[test]
    fn location_derives_from_first_and_last_tokens() {
        let mut data = CstData::new(CstKind::Declaration);
        data = data.with_span(tok("color", 1, 1), tok("red", 1, 10));
        let loc = data.location().unwrap();
        assert_eq!(loc.begin, Position::new(1, 1));
        assert_eq!(loc.end, Position::new(1, 13));
    }
}
