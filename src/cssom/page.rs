//! `CSSPageRule` (spec.md §3, §4.4 "Page rule").

use crate::location::SourceLocation;

use super::declaration::CssDeclaration;

/// One page selector, e.g. `:first`, `:left`, or a named page plus a
/// pseudo-class (`foo:first`). Carried as raw text; this crate does not
/// evaluate page selectors against anything.
#[derive(Debug, Clone, PartialEq)]
pub struct CssPageSelector(pub String);

/// A page-margin block: `@top-left { ... }` and similar (spec.md's
/// Glossary: "Page-margin block").
#[derive(Debug, Clone, Default)]
pub struct PageMarginBlock {
    pub name: String,
    pub declarations: Vec<CssDeclaration>,
}

/// One member of an `@page` rule's body: either a plain declaration, or a
/// named margin block (spec.md §4.4: "body members are declarations
/// interleaved with `@`-margin symbols each followed by a declaration-list").
#[derive(Debug, Clone)]
pub enum PageRuleMember {
    Declaration(CssDeclaration),
    MarginBlock(PageMarginBlock),
}

/// An `@page` rule: page selectors + ordered members.
#[derive(Debug, Clone, Default)]
pub struct CssPageRule {
    pub selectors: Vec<CssPageSelector>,
    pub members: Vec<PageRuleMember>,
    pub location: Option<SourceLocation>,
}

impl CssPageRule {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cssom::expression::CssExpression;

    #[test]
    fn page_rule_preserves_member_order() {
        let mut rule = CssPageRule::new();
        rule.members.push(PageRuleMember::Declaration(CssDeclaration::new(
            "size",
            CssExpression::new(),
            false,
        )));
        rule.members.push(PageRuleMember::MarginBlock(PageMarginBlock {
            name: "@top-left".to_string(),
            declarations: Vec::new(),
        }));
        assert_eq!(rule.members.len(), 2);
    }
}
