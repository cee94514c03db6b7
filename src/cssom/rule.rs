//! The top-level rule union and the rule kinds that don't warrant their own
//! file (spec.md §3's "top-level rules (union type: style, page, font-face,
//! media, keyframes, viewport, supports, layer, unknown-@)").

use crate::location::SourceLocation;

use super::declaration::CssDeclaration;
use super::keyframes::CssKeyframesRule;
use super::media::CssMediaRule;
use super::page::CssPageRule;
use super::selector::CssSelector;
use super::supports::CssSupportsRule;

/// A style rule: ordered selectors + ordered declaration container
/// (spec.md §3 `CSSStyleRule`).
#[derive(Debug, Clone, Default)]
pub struct CssStyleRule {
    pub selectors: Vec<CssSelector>,
    pub declarations: Vec<CssDeclaration>,
    pub location: Option<SourceLocation>,
}

impl CssStyleRule {
    pub fn new() -> Self {
        Self::default()
    }
}

/// An `@layer` rule: owns a layer-name list plus nested top-level rules
/// (spec.md §3). A layer statement with no block (`@layer a, b;`) is
/// represented as a `CssLayerRule` with an empty `rules` vec and
/// `is_statement` set.
#[derive(Debug, Clone, Default)]
pub struct CssLayerRule {
    pub names: Vec<String>,
    pub rules: Vec<TopLevelRule>,
    pub is_statement: bool,
    pub location: Option<SourceLocation>,
}

impl CssLayerRule {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A `@font-face` or `@viewport` rule: both are just a flat declaration
/// list keyed by an at-keyword name, so they share one representation
/// rather than two near-identical structs.
#[derive(Debug, Clone)]
pub struct CssDeclarationOnlyRule {
    pub at_keyword: String,
    pub declarations: Vec<CssDeclaration>,
    pub location: Option<SourceLocation>,
}

/// An unrecognized at-rule, used both for genuinely unknown at-rules and
/// for recovery output when the interpreter cannot build a more specific
/// node (spec.md §3 `CSSUnknownRule`: "`@`-name + raw parameter list + raw
/// body, used for recovery and forward-compatibility").
#[derive(Debug, Clone)]
pub struct CssUnknownRule {
    pub at_keyword: String,
    pub prelude: String,
    pub body: Option<String>,
    pub location: Option<SourceLocation>,
}

/// The union of everything that can appear at stylesheet top level, or
/// nested inside `@media`/`@supports`/`@layer` (spec.md §3, §4.3 "Nested
/// rule containment": excludes `@import`/`@namespace`, which are not part
/// of this enum — they live only in [`super::stylesheet::CascadingStyleSheet`]'s
/// own `imports`/`namespaces` fields).
#[derive(Debug, Clone)]
pub enum TopLevelRule {
    Style(CssStyleRule),
    Page(CssPageRule),
    FontFace(CssDeclarationOnlyRule),
    Viewport(CssDeclarationOnlyRule),
    Media(CssMediaRule),
    Keyframes(CssKeyframesRule),
    Supports(CssSupportsRule),
    Layer(CssLayerRule),
    Unknown(CssUnknownRule),
}

impl TopLevelRule {
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            TopLevelRule::Style(r) => r.location,
            TopLevelRule::Page(r) => r.location,
            TopLevelRule::FontFace(r) => r.location,
            TopLevelRule::Viewport(r) => r.location,
            TopLevelRule::Media(r) => r.location,
            TopLevelRule::Keyframes(r) => r.location,
            TopLevelRule::Supports(r) => r.location,
            TopLevelRule::Layer(r) => r.location,
            TopLevelRule::Unknown(r) => r.location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_rule_location_reads_through_to_variant() {
        let mut style = CssStyleRule::new();
        style.location = Some(SourceLocation::point(crate::location::Position::new(1, 1)));
        let rule = TopLevelRule::Style(style);
        assert!(rule.location().is_some());
    }
}
