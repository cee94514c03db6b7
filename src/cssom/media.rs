//! `CSSMediaRule` and its media-query list (spec.md §3, §4.4 "Media query").

use crate::location::SourceLocation;

use super::rule::TopLevelRule;

/// A media query modifier (spec.md's Glossary: "Media query modifier —
/// `not`, `only`, or absent").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaModifier {
    #[default]
    None,
    Not,
    Only,
}

/// One `(feature: value)` media expression, e.g. `(min-width: 768px)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CssMediaExpression {
    pub feature: String,
    pub value: Option<String>,
}

/// One entry of a comma-separated media query list (spec.md §4.4 "Media
/// query"): optional modifier, optional medium, zero or more expressions.
///
/// Unknown medium names are accepted with a warning; an unknown modifier is
/// a hard interpretation error (spec.md §4.4). Both checks happen in
/// `crate::interpreter`, not here — this type just carries the already
/// shape-checked result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CssMediaQuery {
    pub modifier: MediaModifier,
    pub medium: Option<String>,
    pub expressions: Vec<CssMediaExpression>,
}

impl CssMediaQuery {
    pub fn new() -> Self {
        Self::default()
    }
}

/// An `@media` rule: a media-query list plus nested top-level rules
/// (spec.md §3; §4.3 "Nested rule containment" forbids `@import`/`@namespace`
/// among the nested rules — enforced by the parser, not this type).
#[derive(Debug, Clone, Default)]
pub struct CssMediaRule {
    pub queries: Vec<CssMediaQuery>,
    pub rules: Vec<TopLevelRule>,
    pub location: Option<SourceLocation>,
}

impl CssMediaRule {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_query_defaults_to_no_modifier() {
        let query = CssMediaQuery::new();
        assert_eq!(query.modifier, MediaModifier::None);
        assert!(query.medium.is_none());
    }
}
