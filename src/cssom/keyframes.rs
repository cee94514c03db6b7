//! `CSSKeyframesRule` (spec.md §3, §4.4 "Keyframes rule").

use crate::location::SourceLocation;

use super::declaration::CssDeclaration;

/// One `(selectors, declarations)` pair inside `@keyframes` (spec.md's
/// Glossary: "Keyframes block"). Selectors here are keyframe selectors
/// (`from`, `to`, a percentage list), not [`super::selector::CssSelector`];
/// kept as raw text since they're never matched, only reserialized.
#[derive(Debug, Clone, Default)]
pub struct CssKeyframeBlock {
    pub selectors: Vec<String>,
    pub declarations: Vec<CssDeclaration>,
    pub location: Option<SourceLocation>,
}

impl CssKeyframeBlock {
    pub fn new() -> Self {
        Self::default()
    }
}

/// An `@keyframes` rule: identifier + ordered keyframe blocks.
///
/// Shape invariant enforced by the interpreter, not this type (spec.md
/// §4.4): "A declaration-list without a preceding selector-list is a fatal
/// shape error" — by the time a `CssKeyframesRule` is built, that has
/// already been checked, so `blocks` here is always well-formed.
#[derive(Debug, Clone)]
pub struct CssKeyframesRule {
    pub name: String,
    pub blocks: Vec<CssKeyframeBlock>,
    pub location: Option<SourceLocation>,
}

impl CssKeyframesRule {
    pub fn new(name: impl Into<String>) -> Self {
        CssKeyframesRule {
            name: name.into(),
            blocks: Vec::new(),
            location: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyframes_rule_carries_name_and_blocks_in_order() {
        let mut rule = CssKeyframesRule::new("spin");
        rule.blocks.push(CssKeyframeBlock::new());
        rule.blocks.push(CssKeyframeBlock::new());
        assert_eq!(rule.name, "spin");
        assert_eq!(rule.blocks.len(), 2);
    }
}
