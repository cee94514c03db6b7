//! Builds the CSSOM from a parsed CST (spec.md §4.4 "CST -> CSSOM
//! interpretation").
//!
//! This is a pure, recursive walk: one function per CST node kind, each
//! returning the CSSOM value that shape represents (or `None`/dropping the
//! node when the shape check in spec.md §4.4 says to). Shape violations are
//! reported to the injected [`InterpretErrorHandler`] as warnings or errors;
//! none of them actually abort the walk in practice, since every shape this
//! module pattern-matches against is one [`crate::parser::Parser`] itself
//! guarantees by construction (e.g. a `@keyframes` block's declaration-list
//! always has a preceding selector-list — the parser never builds the
//! alternative). `crate::error::FatalInterpretationError` exists for a
//! hand-built or otherwise malformed CST reaching this module some other
//! way; this crate's own pipeline never triggers it.

use crate::cst::{CstKind, CstNode};
use crate::cssom::expression::{
    CalcOperator, CalcProduct, CalcSum, CalcTerm, CssExpression, CssExpressionMember, ExpressionSeparator,
};
use crate::cssom::selector::{AttributeOperator, Combinator, CssSelector, PseudoSelector, SelectorMember};
use crate::cssom::{
    CascadingStyleSheet, CssDeclaration, CssDeclarationOnlyRule, CssKeyframeBlock, CssKeyframesRule, CssLayerRule,
    CssMediaExpression, CssMediaQuery, CssMediaRule, CssPageRule, CssPageSelector, CssStyleRule, CssSupportsCondition,
    CssSupportsRule, CssUnknownRule, ImportRule, MediaModifier, NamespaceRule, PageMarginBlock, PageRuleMember,
    TopLevelRule,
};
use crate::error::InterpretErrorHandler;
use crate::location::SourceLocation;

/// Known CSS media types (spec.md §4.4 "Media query": "an unrecognized
/// medium is accepted with a warning"). Kept short and CSS2.1-era on
/// purpose — this crate does not track the evolving media-type registry,
/// only flags names that are clearly not one.
const KNOWN_MEDIA_TYPES: &[&str] = &[
    "all", "print", "screen", "speech", "aural", "braille", "embossed", "handheld", "projection", "tty", "tv",
];

#[derive(Debug, Clone, Copy)]
pub struct InterpreterOptions {
    pub use_source_location: bool,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        InterpreterOptions { use_source_location: true }
    }
}

struct Ctx<'h> {
    options: InterpreterOptions,
    handler: &'h dyn InterpretErrorHandler,
}

impl<'h> Ctx<'h> {
    fn location(&self, node: &CstNode) -> Option<SourceLocation> {
        if !self.options.use_source_location {
            return None;
        }
        node.borrow().location()
    }

    fn warn(&self, message: impl Into<String>, node: &CstNode) {
        self.handler.on_css_interpretation_warning(&message.into(), self.location(node));
    }

    fn error(&self, message: impl Into<String>, node: &CstNode) {
        self.handler.on_css_interpretation_error(&message.into(), self.location(node));
    }
}

/// Walks a `Stylesheet`-kind root into a [`CascadingStyleSheet`].
///
/// Enforces spec.md §4.3's "`@import` precedes `@namespace` precedes
/// everything else" ordering invariant with a warning (not a rejection) on
/// violation, and spec.md's resolved Open Question that only the first
/// `@charset` is kept, with later ones reported as warnings.
pub fn interpret(root: &CstNode, options: InterpreterOptions, handler: &dyn InterpretErrorHandler) -> CascadingStyleSheet {
    let ctx = Ctx { options, handler };
    let mut sheet = CascadingStyleSheet::new();
    let mut seen_namespace = false;
    let mut seen_rule = false;

    for child in root.children() {
        let kind = child.borrow().kind;
        match kind {
            CstKind::CharsetRule => {
                let name = child.borrow().text.clone().unwrap_or_default();
                if sheet.charset.is_some() {
                    ctx.warn(format!("duplicate @charset {name:?} ignored, keeping the first"), &child);
                } else {
                    sheet.charset = Some(name);
                }
            }
            CstKind::ImportRule => {
                if seen_namespace || seen_rule {
                    ctx.warn("@import after @namespace or another rule; accepted out of order", &child);
                }
                sheet.imports.push(build_import_rule(&ctx, &child));
            }
            CstKind::NamespaceRule => {
                if seen_rule {
                    ctx.warn("@namespace after another top-level rule; accepted out of order", &child);
                }
                seen_namespace = true;
                sheet.namespaces.push(build_namespace_rule(&ctx, &child));
            }
            _ => {
                seen_rule = true;
                if let Some(rule) = build_top_level_rule(&ctx, &child) {
                    sheet.rules.push(rule);
                }
            }
        }
    }
    sheet
}

fn build_import_rule(ctx: &Ctx, node: &CstNode) -> ImportRule {
    let mut children = node.children();
    let uri_node = children.next();
    let (uri, was_string_form) = match &uri_node {
        Some(n) if n.borrow().value.as_deref() == Some("string") => {
            (n.borrow().text.clone().unwrap_or_default(), true)
        }
        Some(n) => (n.borrow().text.clone().unwrap_or_default(), false),
        None => {
            ctx.error("@import with no URI", node);
            (String::new(), false)
        }
    };
    let mut import = ImportRule::new(uri, was_string_form);
    import.location = ctx.location(node);
    if let Some(media_list) = children.next() {
        import.media_queries = build_media_query_list(ctx, &media_list);
    }
    import
}

fn build_namespace_rule(ctx: &Ctx, node: &CstNode) -> NamespaceRule {
    let children: Vec<CstNode> = node.children().collect();
    let (prefix, uri) = match children.len() {
        2 => (
            children[0].borrow().text.clone(),
            children[1].borrow().text.clone().unwrap_or_default(),
        ),
        1 => (None, children[0].borrow().text.clone().unwrap_or_default()),
        _ => {
            ctx.error("@namespace with no URI", node);
            (None, String::new())
        }
    };
    let mut ns = NamespaceRule::new(prefix, uri);
    ns.location = ctx.location(node);
    ns
}

fn build_top_level_rule(ctx: &Ctx, node: &CstNode) -> Option<TopLevelRule> {
    let kind = node.borrow().kind;
    match kind {
        CstKind::StyleRule => Some(TopLevelRule::Style(build_style_rule(ctx, node))),
        CstKind::MediaRule => Some(TopLevelRule::Media(build_media_rule(ctx, node))),
        CstKind::SupportsRule => Some(TopLevelRule::Supports(build_supports_rule(ctx, node))),
        CstKind::LayerRule => Some(TopLevelRule::Layer(build_layer_rule(ctx, node))),
        CstKind::KeyframesRule => Some(TopLevelRule::Keyframes(build_keyframes_rule(ctx, node))),
        CstKind::PageRule => Some(TopLevelRule::Page(build_page_rule(ctx, node))),
        CstKind::UnknownAtRule => Some(build_at_rule(ctx, node)),
        other => {
            ctx.error(format!("unexpected node {other:?} at stylesheet top level"), node);
            None
        }
    }
}

fn build_style_rule(ctx: &Ctx, node: &CstNode) -> CssStyleRule {
    let mut children = node.children();
    let mut rule = CssStyleRule::new();
    rule.location = ctx.location(node);
    if let Some(selector_list) = children.next() {
        rule.selectors = build_selector_list(ctx, &selector_list);
    }
    if let Some(decl_list) = children.next() {
        rule.declarations = build_declaration_list(ctx, &decl_list);
    }
    rule
}

fn build_selector_list(ctx: &Ctx, node: &CstNode) -> Vec<CssSelector> {
    node.children().map(|c| build_selector(ctx, &c)).collect()
}

fn build_selector(ctx: &Ctx, node: &CstNode) -> CssSelector {
    let mut selector = CssSelector::new();
    selector.location = ctx.location(node);
    for member in node.children() {
        selector.push(build_selector_member(ctx, &member));
    }
    selector
}

fn build_selector_member(ctx: &Ctx, node: &CstNode) -> SelectorMember {
    match node.borrow().kind {
        CstKind::SelectorMember => {
            let text = node.borrow().text.clone().unwrap_or_default();
            match node.borrow().value.as_deref() {
                Some("combinator") => SelectorMember::Combinator(match text.as_str() {
                    ">" => Combinator::Child,
                    "+" => Combinator::NextSibling,
                    "~" => Combinator::SubsequentSibling,
                    "|" => Combinator::Column,
                    _ => Combinator::Descendant,
                }),
                _ => SelectorMember::Simple(text),
            }
        }
        CstKind::AttributeSelector => build_attribute_selector(node),
        CstKind::PseudoSelector => SelectorMember::Pseudo(build_pseudo_selector(ctx, node)),
        other => {
            ctx.error(format!("unexpected selector member {other:?}"), node);
            SelectorMember::Simple(String::new())
        }
    }
}

fn build_attribute_selector(node: &CstNode) -> SelectorMember {
    let name = node.borrow().text.clone().unwrap_or_default();
    let children: Vec<CstNode> = node.children().collect();
    if children.len() < 3 {
        return SelectorMember::Attribute { name, operator: None, value: None, case_insensitive: false };
    }
    let operator = AttributeOperator::from_str(&children[0].borrow().text.clone().unwrap_or_default());
    let value = children[1].borrow().text.clone();
    let case_insensitive = children[2]
        .borrow()
        .text
        .as_deref()
        .map(|s| s.eq_ignore_ascii_case("i"))
        .unwrap_or(false);
    SelectorMember::Attribute { name, operator, value, case_insensitive }
}

fn build_pseudo_selector(ctx: &Ctx, node: &CstNode) -> PseudoSelector {
    let is_element = node.borrow().value.as_deref() == Some("element");
    let name = node.borrow().text.clone().unwrap_or_default();
    let children: Vec<CstNode> = node.children().collect();

    if children.is_empty() {
        return if name.eq_ignore_ascii_case("host") {
            PseudoSelector::Host
        } else {
            PseudoSelector::Simple { name, is_element }
        };
    }

    let child = &children[0];
    match child.borrow().kind {
        CstKind::SelectorList => PseudoSelector::Logical { name, selectors: build_selector_list(ctx, child) },
        CstKind::Selector => {
            let inner = Box::new(build_selector(ctx, child));
            if name.eq_ignore_ascii_case("slotted") {
                PseudoSelector::Slotted(inner)
            } else {
                PseudoSelector::HostContext(inner)
            }
        }
        CstKind::Leaf => match child.borrow().value.as_deref() {
            Some("nth") => PseudoSelector::Nth { name, nth_text: child.borrow().text.clone().unwrap_or_default() },
            _ => PseudoSelector::Function { name, argument: child.borrow().text.clone().unwrap_or_default() },
        },
        other => {
            ctx.error(format!("unexpected pseudo-selector argument {other:?}"), node);
            PseudoSelector::Simple { name, is_element }
        }
    }
}

fn build_declaration_list(ctx: &Ctx, node: &CstNode) -> Vec<CssDeclaration> {
    node.children().filter_map(|c| build_declaration(ctx, &c)).collect()
}

/// Returns `None` for a syntactically incomplete (1-child) declaration node
/// (spec.md §4.4 "Declaration": "1 child -> incomplete -> dropped").
fn build_declaration(ctx: &Ctx, node: &CstNode) -> Option<CssDeclaration> {
    let children: Vec<CstNode> = node.children().collect();
    let name = node_text_of(&children, 0)?;
    if children.len() < 2 {
        return None;
    }
    let expression = build_expression(ctx, &children[1]);
    let important = children.len() >= 3 && children[2].borrow().value.as_deref() == Some("important");
    let mut decl = CssDeclaration::new(name, expression, important);
    decl.location = ctx.location(node);
    Some(decl)
}

fn node_text_of(children: &[CstNode], index: usize) -> Option<String> {
    children.get(index).and_then(|c| c.borrow().text.clone())
}

fn build_expression(ctx: &Ctx, node: &CstNode) -> CssExpression {
    let mut expr = CssExpression::new();
    expr.location = ctx.location(node);
    let separators = parse_joined_tags(node);
    for (index, member) in node.children().enumerate() {
        if index > 0 {
            let sep = separators.get(index - 1).map(String::as_str);
            expr.push_separator(match sep {
                Some(",") => ExpressionSeparator::Comma,
                Some("/") => ExpressionSeparator::Slash,
                _ => ExpressionSeparator::Space,
            });
        }
        expr.push(build_expression_member(ctx, &member));
    }
    expr
}

/// Splits a node's joined-tag `.value` (see `crate::parser`'s comments on
/// `parse_expression`/`parse_calc_sum`/`parse_calc_product`) back into its
/// parts. Empty when the node has no such value.
fn parse_joined_tags(node: &CstNode) -> Vec<String> {
    node.borrow()
        .value
        .as_deref()
        .map(|s| s.split('\u{1}').map(str::to_string).collect())
        .unwrap_or_default()
}

fn build_expression_member(ctx: &Ctx, node: &CstNode) -> CssExpressionMember {
    match node.borrow().kind {
        CstKind::UriTerm => CssExpressionMember::UriTerm(node.borrow().text.clone().unwrap_or_default()),
        CstKind::FunctionCall => CssExpressionMember::FunctionCall {
            name: node.borrow().text.clone().unwrap_or_default(),
            arguments: node.children().map(|c| build_expression(ctx, &c)).collect(),
        },
        CstKind::CalcExpression => {
            let sum_node = node.children().next();
            let sum = sum_node.map(|n| build_calc_sum(ctx, &n)).unwrap_or_else(|| CalcSum {
                first: CalcProduct { first: CalcTerm::Number("0".to_string()), rest: Vec::new() },
                rest: Vec::new(),
            });
            CssExpressionMember::Calc(sum)
        }
        CstKind::ExpressionMember => match node.borrow().value.as_deref() {
            Some("line-names") => {
                let text = node.borrow().text.clone().unwrap_or_default();
                let names = text.split_whitespace().map(str::to_string).collect();
                CssExpressionMember::LineNames(names)
            }
            _ => CssExpressionMember::SimpleTerm(node.borrow().text.clone().unwrap_or_default()),
        },
        other => {
            ctx.error(format!("unexpected expression member {other:?}"), node);
            CssExpressionMember::SimpleTerm(String::new())
        }
    }
}

fn build_calc_sum(ctx: &Ctx, node: &CstNode) -> CalcSum {
    let operators = parse_joined_tags(node);
    let children: Vec<CstNode> = node.children().collect();
    let first = children
        .first()
        .map(|c| build_calc_product(ctx, c))
        .unwrap_or_else(|| CalcProduct { first: CalcTerm::Number("0".to_string()), rest: Vec::new() });
    let mut rest = Vec::new();
    for (i, child) in children.iter().enumerate().skip(1) {
        let op = match operators.get(i - 1).map(String::as_str) {
            Some("-") => CalcOperator::Subtract,
            _ => CalcOperator::Add,
        };
        rest.push((op, build_calc_product(ctx, child)));
    }
    CalcSum { first, rest }
}

fn build_calc_product(ctx: &Ctx, node: &CstNode) -> CalcProduct {
    let operators = parse_joined_tags(node);
    let children: Vec<CstNode> = node.children().collect();
    let first = children
        .first()
        .map(|c| build_calc_term(ctx, c))
        .unwrap_or_else(|| CalcTerm::Number("0".to_string()));
    let mut rest = Vec::new();
    for (i, child) in children.iter().enumerate().skip(1) {
        let op = match operators.get(i - 1).map(String::as_str) {
            Some("/") => CalcOperator::Divide,
            _ => CalcOperator::Multiply,
        };
        rest.push((op, build_calc_term(ctx, child)));
    }
    CalcProduct { first, rest }
}

fn build_calc_term(ctx: &Ctx, node: &CstNode) -> CalcTerm {
    match node.borrow().kind {
        CstKind::Leaf => match node.borrow().value.as_deref() {
            Some("nested") => {
                let inner = node.children().next().map(|n| build_calc_sum(ctx, &n)).unwrap_or(CalcSum {
                    first: CalcProduct { first: CalcTerm::Number("0".to_string()), rest: Vec::new() },
                    rest: Vec::new(),
                });
                CalcTerm::Nested(Box::new(inner))
            }
            Some("dimension") => CalcTerm::Dimension(node.borrow().text.clone().unwrap_or_default()),
            Some("percentage") => CalcTerm::Percentage(node.borrow().text.clone().unwrap_or_default()),
            _ => CalcTerm::Number(node.borrow().text.clone().unwrap_or_default()),
        },
        CstKind::FunctionCall => CalcTerm::Function {
            name: node.borrow().text.clone().unwrap_or_default(),
            arguments: node.children().map(|c| build_expression(ctx, &c)).collect(),
        },
        CstKind::CalcExpression => {
            let inner = node.children().next().map(|n| build_calc_sum(ctx, &n)).unwrap_or(CalcSum {
                first: CalcProduct { first: CalcTerm::Number("0".to_string()), rest: Vec::new() },
                rest: Vec::new(),
            });
            CalcTerm::Nested(Box::new(inner))
        }
        other => {
            ctx.error(format!("unexpected calc term {other:?}"), node);
            CalcTerm::Number("0".to_string())
        }
    }
}

fn build_media_rule(ctx: &Ctx, node: &CstNode) -> CssMediaRule {
    let mut children = node.children();
    let mut rule = CssMediaRule::new();
    rule.location = ctx.location(node);
    if let Some(list) = children.next() {
        rule.queries = build_media_query_list(ctx, &list);
    }
    if let Some(body) = children.next() {
        rule.rules = build_nested_rules(ctx, &body);
    }
    rule
}

fn build_media_query_list(ctx: &Ctx, node: &CstNode) -> Vec<CssMediaQuery> {
    node.children().map(|c| build_media_query(ctx, &c)).collect()
}

fn build_media_query(ctx: &Ctx, node: &CstNode) -> CssMediaQuery {
    let mut query = CssMediaQuery::new();
    for child in node.children() {
        match child.borrow().value.as_deref() {
            Some("modifier") => {
                let text = child.borrow().text.clone().unwrap_or_default();
                query.modifier = if text.eq_ignore_ascii_case("not") {
                    MediaModifier::Not
                } else if text.eq_ignore_ascii_case("only") {
                    MediaModifier::Only
                } else {
                    ctx.error(format!("unknown media query modifier {text:?}"), &child);
                    MediaModifier::None
                };
            }
            Some("medium") => {
                let text = child.borrow().text.clone().unwrap_or_default();
                if !KNOWN_MEDIA_TYPES.iter().any(|m| text.eq_ignore_ascii_case(m)) {
                    ctx.warn(format!("unknown media type {text:?}"), &child);
                }
                query.medium = Some(text);
            }
            _ => {
                if child.borrow().kind == CstKind::MediaExpression {
                    query.expressions.push(build_media_expression(&child));
                }
            }
        }
    }
    query
}

fn build_media_expression(node: &CstNode) -> CssMediaExpression {
    CssMediaExpression {
        feature: node.borrow().text.clone().unwrap_or_default(),
        value: node.borrow().value.clone(),
    }
}

fn build_nested_rules(ctx: &Ctx, node: &CstNode) -> Vec<TopLevelRule> {
    node.children().filter_map(|c| build_top_level_rule(ctx, &c)).collect()
}

fn build_supports_rule(ctx: &Ctx, node: &CstNode) -> CssSupportsRule {
    let mut children = node.children();
    let condition = children
        .next()
        .map(|c| build_supports_condition(ctx, &c))
        .unwrap_or_else(|| CssSupportsCondition::Group(Box::new(CssSupportsCondition::Declaration(
            CssDeclaration::new("unknown", CssExpression::new(), false),
        ))));
    let mut rule = CssSupportsRule::new(condition);
    rule.location = ctx.location(node);
    if let Some(body) = children.next() {
        rule.rules = build_nested_rules(ctx, &body);
    }
    rule
}

fn build_supports_condition(ctx: &Ctx, node: &CstNode) -> CssSupportsCondition {
    let tag = node.borrow().text.clone().unwrap_or_default();
    let children: Vec<CstNode> = node.children().collect();
    match tag.as_str() {
        "not" => CssSupportsCondition::Not(Box::new(
            children
                .first()
                .map(|c| build_supports_condition(ctx, c))
                .unwrap_or(CssSupportsCondition::And(Vec::new())),
        )),
        "and" => CssSupportsCondition::And(children.iter().map(|c| build_supports_condition(ctx, c)).collect()),
        "or" => CssSupportsCondition::Or(children.iter().map(|c| build_supports_condition(ctx, c)).collect()),
        "group" => CssSupportsCondition::Group(Box::new(
            children
                .first()
                .map(|c| build_supports_condition(ctx, c))
                .unwrap_or(CssSupportsCondition::And(Vec::new())),
        )),
        "declaration" => {
            let decl = children
                .first()
                .and_then(|c| build_declaration(ctx, c))
                .unwrap_or_else(|| CssDeclaration::new("unknown", CssExpression::new(), false));
            CssSupportsCondition::Declaration(decl)
        }
        other => {
            ctx.error(format!("unrecognized supports condition tag {other:?}"), node);
            CssSupportsCondition::And(Vec::new())
        }
    }
}

fn build_layer_rule(ctx: &Ctx, node: &CstNode) -> CssLayerRule {
    let mut children = node.children();
    let mut rule = CssLayerRule::new();
    rule.location = ctx.location(node);
    rule.is_statement = node.borrow().value.as_deref() == Some("statement");
    if let Some(names) = children.next() {
        rule.names = names.children().filter_map(|c| c.borrow().text.clone()).collect();
    }
    if !rule.is_statement {
        if let Some(body) = children.next() {
            rule.rules = build_nested_rules(ctx, &body);
        }
    }
    rule
}

fn build_keyframes_rule(ctx: &Ctx, node: &CstNode) -> CssKeyframesRule {
    let mut children = node.children();
    let name = children.next().and_then(|c| c.borrow().text.clone()).unwrap_or_default();
    let mut rule = CssKeyframesRule::new(name);
    rule.location = ctx.location(node);
    for block in children {
        rule.blocks.push(build_keyframe_block(ctx, &block));
    }
    rule
}

fn build_keyframe_block(ctx: &Ctx, node: &CstNode) -> CssKeyframeBlock {
    let mut children = node.children();
    let mut block = CssKeyframeBlock::new();
    block.location = ctx.location(node);
    if let Some(selectors) = children.next() {
        block.selectors = selectors.children().filter_map(|c| c.borrow().text.clone()).collect();
    } else {
        ctx.error("@keyframes block with no selector list", node);
    }
    if let Some(decls) = children.next() {
        block.declarations = build_declaration_list(ctx, &decls);
    }
    block
}

fn build_page_rule(ctx: &Ctx, node: &CstNode) -> CssPageRule {
    let mut rule = CssPageRule::new();
    rule.location = ctx.location(node);
    for child in node.children() {
        match child.borrow().kind {
            CstKind::Leaf if child.borrow().value.as_deref() == Some("page-selector") => {
                rule.selectors.push(CssPageSelector(child.borrow().text.clone().unwrap_or_default()));
            }
            CstKind::Declaration => {
                if let Some(decl) = build_declaration(ctx, &child) {
                    rule.members.push(PageRuleMember::Declaration(decl));
                }
            }
            CstKind::PageMarginBlock => {
                let name = child.borrow().text.clone().unwrap_or_default();
                let declarations = child
                    .children()
                    .next()
                    .map(|decls| build_declaration_list(ctx, &decls))
                    .unwrap_or_default();
                rule.members.push(PageRuleMember::MarginBlock(PageMarginBlock { name, declarations }));
            }
            other => ctx.error(format!("unexpected @page member {other:?}"), &child),
        }
    }
    rule
}

fn build_at_rule(ctx: &Ctx, node: &CstNode) -> TopLevelRule {
    let at_keyword = node.borrow().text.clone().unwrap_or_default();
    if at_keyword.eq_ignore_ascii_case("@font-face") || at_keyword.eq_ignore_ascii_case("@viewport") {
        let declarations = node
            .children()
            .next()
            .map(|decls| build_declaration_list(ctx, &decls))
            .unwrap_or_default();
        let rule = CssDeclarationOnlyRule { at_keyword: at_keyword.clone(), declarations, location: ctx.location(node) };
        return if at_keyword.eq_ignore_ascii_case("@font-face") {
            TopLevelRule::FontFace(rule)
        } else {
            TopLevelRule::Viewport(rule)
        };
    }

    let prelude = node.borrow().value.clone().unwrap_or_default();
    let body = node.children().next().and_then(|c| c.borrow().text.clone());
    TopLevelRule::Unknown(CssUnknownRule { at_keyword, prelude, body, location: ctx.location(node) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NullErrorHandler;
    use crate::lexer::{Lexer, LexerOptions};
    use crate::parser::{Parser, ParserOptions};
    use crate::stream::CharStream;

    fn interpret_source(source: &str) -> CascadingStyleSheet {
        let stream = CharStream::with_default_tab_size(source);
        let lexer = Lexer::new(stream, LexerOptions { css_unescape: true, browser_compliant_mode: false });
        let handler = NullErrorHandler;
        let options = ParserOptions { browser_compliant_mode: false, keep_deprecated_properties: true };
        let mut parser = Parser::new(lexer, options, &handler, &handler);
        let root = parser.parse_stylesheet().expect("parse failed");
        interpret(&root, InterpreterOptions::default(), &handler)
    }

    #[test]
    fn interprets_simple_style_rule() {
        let sheet = interpret_source(".foo { color: red; }");
        assert_eq!(sheet.rules.len(), 1);
        match &sheet.rules[0] {
            TopLevelRule::Style(style) => {
                assert_eq!(style.selectors.len(), 1);
                assert_eq!(style.declarations.len(), 1);
                assert_eq!(style.declarations[0].name(), "color");
            }
            other => panic!("expected a style rule, got {other:?}"),
        }
    }

    #[test]
    fn interprets_descendant_and_child_combinators() {
        let sheet = interpret_source(":where(.some-tile:not(.preserve-color)) > * { color: #161616 }");
        let style = match &sheet.rules[0] {
            TopLevelRule::Style(s) => s,
            other => panic!("expected style rule, got {other:?}"),
        };
        let members = &style.selectors[0].members;
        assert_eq!(members.len(), 2);
        assert!(matches!(members[0], SelectorMember::Pseudo(PseudoSelector::Logical { .. })));
        assert_eq!(members[1], SelectorMember::Combinator(Combinator::Child));
    }

    #[test]
    fn drops_incomplete_declaration() {
        let sheet = interpret_source(".foo { color }");
        match &sheet.rules[0] {
            TopLevelRule::Style(style) => assert!(style.declarations.is_empty()),
            other => panic!("expected a style rule, got {other:?}"),
        }
    }

    #[test]
    fn import_rule_carries_media_queries() {
        let sheet = interpret_source(r#"@import url("a.gif") print, screen;"#);
        assert_eq!(sheet.imports.len(), 1);
        assert_eq!(sheet.imports[0].uri(), "a.gif");
        assert_eq!(sheet.imports[0].media_queries.len(), 2);
    }

    #[test]
    fn keeps_only_first_charset() {
        let sheet = interpret_source("@charset \"utf-8\"; @charset \"iso-8859-1\"; .a { color: red; }");
        assert_eq!(sheet.charset.as_deref(), Some("utf-8"));
    }

    #[test]
    fn calc_expression_builds_sum_and_product() {
        let sheet = interpret_source(".a { width: calc(100% - 2 * 10px); }");
        let style = match &sheet.rules[0] {
            TopLevelRule::Style(s) => s,
            other => panic!("expected style rule, got {other:?}"),
        };
        let expr = &style.declarations[0].expression;
        match &expr.members[0] {
            CssExpressionMember::Calc(sum) => {
                assert_eq!(sum.rest.len(), 1);
                assert_eq!(sum.rest[0].0, CalcOperator::Subtract);
                assert_eq!(sum.rest[0].1.rest.len(), 1);
                assert_eq!(sum.rest[0].1.rest[0].0, CalcOperator::Multiply);
            }
            other => panic!("expected a calc member, got {other:?}"),
        }
    }

    #[test]
    fn media_query_list_flags_unknown_medium_with_a_warning() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        struct CountingHandler(AtomicUsize);
        impl InterpretErrorHandler for CountingHandler {
            fn on_css_interpretation_warning(&self, _message: &str, _location: Option<SourceLocation>) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
            fn on_css_interpretation_error(&self, _message: &str, _location: Option<SourceLocation>) {}
        }

        let stream = CharStream::with_default_tab_size("@media fooscope { .a { color: red; } }");
        let lexer = Lexer::new(stream, LexerOptions { css_unescape: true, browser_compliant_mode: false });
        let null = NullErrorHandler;
        let options = ParserOptions { browser_compliant_mode: false, keep_deprecated_properties: true };
        let mut parser = Parser::new(lexer, options, &null, &null);
        let root = parser.parse_stylesheet().unwrap();
        let handler = CountingHandler(AtomicUsize::new(0));
        interpret(&root, InterpreterOptions::default(), &handler);
        assert_eq!(handler.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn page_rule_separates_selectors_from_margin_blocks() {
        let sheet = interpret_source("@page :first { size: auto; @top-left { content: 'x'; } }");
        match &sheet.rules[0] {
            TopLevelRule::Page(page) => {
                assert_eq!(page.selectors.len(), 1);
                assert_eq!(page.members.len(), 2);
                assert!(matches!(page.members[1], PageRuleMember::MarginBlock(_)));
            }
            other => panic!("expected a page rule, got {other:?}"),
        }
    }
}
